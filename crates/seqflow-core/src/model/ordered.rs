//! Adaptador serde para `IndexMap<String, V>` como lista de pares
//! `[nombre, valor]`.
//!
//! Un objeto JSON no conserva el orden de sus claves al pasar por
//! `serde_json::Value` ni por JSONB, y el orden de steps y tablas es parte del
//! estado. Se usa con `#[serde(with = "ordered")]`.
use indexmap::IndexMap;
use serde::de::{Deserialize, Deserializer, Error as _};
use serde::ser::{SerializeSeq, Serializer};
use serde::Serialize;

pub fn serialize<S, V>(map: &IndexMap<String, V>, serializer: S) -> Result<S::Ok, S::Error>
    where S: Serializer,
          V: Serialize
{
    let mut seq = serializer.serialize_seq(Some(map.len()))?;
    for entry in map {
        seq.serialize_element(&entry)?;
    }
    seq.end()
}

pub fn deserialize<'de, D, V>(deserializer: D) -> Result<IndexMap<String, V>, D::Error>
    where D: Deserializer<'de>,
          V: Deserialize<'de>
{
    let pairs: Vec<(String, V)> = Vec::deserialize(deserializer)?;
    let mut map = IndexMap::with_capacity(pairs.len());
    for (name, value) in pairs {
        if map.insert(name.clone(), value).is_some() {
            return Err(D::Error::custom(format!("duplicate entry '{name}'")));
        }
    }
    Ok(map)
}
