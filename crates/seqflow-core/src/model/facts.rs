//! Esquema cerrado de hechos ("metadata") acumulados entre steps.
//!
//! En lugar de un mapa de strings arbitrarios, cada workflow declara un enum
//! de hechos conocidos (`Fact`) con una clave por variante. Un step posterior
//! sólo puede leer hechos que existan en ese enum; el compilador impide
//! depender de claves no declaradas.
//!
//! `SCHEMA_VERSION` se persiste en la cabecera de la sesión; un snapshot con
//! otra versión se trata como corrupto.
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt::Debug;

/// Un hecho tipado del workflow.
pub trait Fact: Clone + Debug + PartialEq + Serialize + DeserializeOwned {
    /// Clave única de la variante (una entrada por clave en el `FactSheet`).
    type Key: Copy + Ord + Debug;

    /// Versión del esquema de hechos.
    const SCHEMA_VERSION: u32;

    fn key(&self) -> Self::Key;
}

/// Conjunto de hechos, a lo sumo uno por clave.
#[derive(Debug, Clone, PartialEq)]
pub struct FactSheet<F: Fact> {
    facts: BTreeMap<F::Key, F>,
}

impl<F: Fact> Default for FactSheet<F> {
    fn default() -> Self {
        Self { facts: BTreeMap::new() }
    }
}

impl<F: Fact> FactSheet<F> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserta o reemplaza el hecho de su clave; devuelve el anterior.
    pub fn set(&mut self, fact: F) -> Option<F> {
        self.facts.insert(fact.key(), fact)
    }

    pub fn get(&self, key: F::Key) -> Option<&F> {
        self.facts.get(&key)
    }

    pub fn contains(&self, key: F::Key) -> bool {
        self.facts.contains_key(&key)
    }

    pub fn remove(&mut self, key: F::Key) -> Option<F> {
        self.facts.remove(&key)
    }

    pub fn len(&self) -> usize {
        self.facts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.facts.is_empty()
    }

    /// Hechos en orden de clave.
    pub fn iter(&self) -> impl Iterator<Item = &F> {
        self.facts.values()
    }
}

impl<F: Fact> FromIterator<F> for FactSheet<F> {
    fn from_iter<I: IntoIterator<Item = F>>(iter: I) -> Self {
        let mut sheet = FactSheet::new();
        for f in iter {
            sheet.set(f);
        }
        sheet
    }
}

// Se serializa como lista ordenada por clave: el orden es estable y el JSON no
// depende de que la clave sea representable como string.
impl<F: Fact> Serialize for FactSheet<F> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.facts.values())
    }
}

impl<'de, F: Fact> Deserialize<'de> for FactSheet<F> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let facts: Vec<F> = Vec::deserialize(deserializer)?;
        Ok(facts.into_iter().collect())
    }
}

#[cfg(test)]
pub(crate) mod test_facts {
    use super::Fact;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
    pub enum DemoKey {
        Assay,
        Pooled,
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    #[serde(tag = "fact", content = "value", rename_all = "snake_case")]
    pub enum DemoFact {
        Assay(String),
        Pooled(bool),
    }

    impl Fact for DemoFact {
        type Key = DemoKey;
        const SCHEMA_VERSION: u32 = 1;

        fn key(&self) -> DemoKey {
            match self {
                DemoFact::Assay(_) => DemoKey::Assay,
                DemoFact::Pooled(_) => DemoKey::Pooled,
            }
        }
    }
}
