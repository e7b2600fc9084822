#![allow(dead_code)]
use seqflow_core::{Fact, StepId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Key {
    Assay,
    Multiplexed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "fact", content = "value", rename_all = "snake_case")]
pub enum Facts {
    Assay(String),
    Multiplexed(bool),
}

impl Fact for Facts {
    type Key = Key;
    const SCHEMA_VERSION: u32 = 3;

    fn key(&self) -> Key {
        match self {
            Facts::Assay(_) => Key::Assay,
            Facts::Multiplexed(_) => Key::Multiplexed,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Samples,
    Multiplexing,
    Libraries,
    Complete,
}

impl StepId for Step {
    fn name(&self) -> &'static str {
        match self {
            Step::Samples => "samples",
            Step::Multiplexing => "multiplexing",
            Step::Libraries => "libraries",
            Step::Complete => "complete",
        }
    }
}

pub const KIND: &str = "test_workflow";
