#![allow(dead_code)]
use seqflow_core::Fact;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Key {
    Pooled,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "fact", content = "value", rename_all = "snake_case")]
pub enum Facts {
    Pooled(bool),
}

impl Fact for Facts {
    type Key = Key;
    const SCHEMA_VERSION: u32 = 1;

    fn key(&self) -> Key {
        Key::Pooled
    }
}

pub const KIND: &str = "library_annotation";
