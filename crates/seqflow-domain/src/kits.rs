//! Catálogo de kits de índices y de features (colaborador externo, sólo
//! lectura).
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::io::Read;

use crate::categories::{BarcodeRole, IndexType};
use crate::error::DomainError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KitBarcode {
    pub sequence: String,
    pub name: String,
    #[serde(default)]
    pub well: Option<String>,
}

/// Kit de índices: barcodes por rol, en el orden del fabricante.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexKitCatalogEntry {
    pub kit_id: i64,
    pub name: String,
    pub identifier: String,
    pub index_type: IndexType,
    pub barcodes: BTreeMap<BarcodeRole, Vec<KitBarcode>>,
}

impl IndexKitCatalogEntry {
    pub fn new(kit_id: i64, name: &str, identifier: &str, index_type: IndexType) -> Self {
        Self { kit_id,
               name: name.to_string(),
               identifier: identifier.to_string(),
               index_type,
               barcodes: BTreeMap::new() }
    }

    /// Agrega un barcode al rol; una secuencia repetida en el rol se ignora.
    pub fn with_barcode(mut self, role: BarcodeRole, sequence: &str, name: &str, well: Option<&str>) -> Self {
        let list = self.barcodes.entry(role).or_default();
        if !list.iter().any(|b| b.sequence == sequence) {
            list.push(KitBarcode { sequence: sequence.to_string(),
                                   name: name.to_string(),
                                   well: well.map(str::to_string) });
        }
        self
    }

    pub fn barcodes(&self, role: BarcodeRole) -> &[KitBarcode] {
        self.barcodes.get(&role).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn sequence_set(&self, role: BarcodeRole) -> HashSet<&str> {
        self.barcodes(role).iter().map(|b| b.sequence.as_str()).collect()
    }

    pub fn name_for(&self, role: BarcodeRole, sequence: &str) -> Option<&str> {
        self.barcodes(role).iter().find(|b| b.sequence == sequence).map(|b| b.name.as_str())
    }

    pub fn by_well(&self, role: BarcodeRole, well: &str) -> Option<&KitBarcode> {
        self.barcodes(role).iter().find(|b| b.well.as_deref() == Some(well))
    }

    pub fn by_name(&self, role: BarcodeRole, name: &str) -> Option<&KitBarcode> {
        self.barcodes(role).iter().find(|b| b.name == name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feature {
    pub name: String,
    #[serde(default)]
    pub target_name: Option<String>,
    #[serde(default)]
    pub target_id: Option<String>,
    pub sequence: String,
    pub pattern: String,
    pub read: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureKit {
    pub kit_id: i64,
    pub name: String,
    pub identifier: String,
    pub features: Vec<Feature>,
}

impl FeatureKit {
    pub fn feature(&self, name: &str) -> Option<&Feature> {
        self.features.iter().find(|f| f.name == name)
    }
}

pub trait KitCatalog {
    fn index_kit(&self, kit_id: i64) -> Option<&IndexKitCatalogEntry>;
    fn index_kits(&self) -> Vec<&IndexKitCatalogEntry>;
    fn feature_kit(&self, kit_id: i64) -> Option<&FeatureKit>;
    fn feature_kits(&self) -> Vec<&FeatureKit>;

    fn get_index_kit(&self, kit_id: i64) -> Result<&IndexKitCatalogEntry, DomainError> {
        self.index_kit(kit_id).ok_or(DomainError::KitNotFound(kit_id))
    }

    fn get_feature_kit(&self, kit_id: i64) -> Result<&FeatureKit, DomainError> {
        self.feature_kit(kit_id).ok_or(DomainError::FeatureKitNotFound(kit_id))
    }

    fn index_kits_of(&self, types: &[IndexType]) -> Vec<&IndexKitCatalogEntry> {
        self.index_kits().into_iter().filter(|k| types.contains(&k.index_type)).collect()
    }

    /// Busca un kit por identificador o nombre, sin distinguir mayúsculas.
    fn find_index_kit(&self, query: &str) -> Option<&IndexKitCatalogEntry> {
        let q = query.trim().to_lowercase();
        self.index_kits().into_iter().find(|k| k.identifier.to_lowercase() == q || k.name.to_lowercase() == q)
    }

    fn find_feature_kit(&self, query: &str) -> Option<&FeatureKit> {
        let q = query.trim().to_lowercase();
        self.feature_kits().into_iter().find(|k| k.identifier.to_lowercase() == q || k.name.to_lowercase() == q)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InMemoryKitCatalog {
    #[serde(default)]
    index_kits: Vec<IndexKitCatalogEntry>,
    #[serde(default)]
    feature_kits: Vec<FeatureKit>,
    #[serde(skip)]
    index_pos: IndexMap<i64, usize>,
    #[serde(skip)]
    feature_pos: IndexMap<i64, usize>,
}

impl InMemoryKitCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Carga un catálogo `{"index_kits": [...], "feature_kits": [...]}`.
    pub fn from_json_reader<R: Read>(reader: R) -> Result<Self, DomainError> {
        let raw: InMemoryKitCatalog = serde_json::from_reader(reader)?;
        let mut catalog = Self::new();
        for k in raw.index_kits {
            catalog.add_index_kit(k)?;
        }
        for k in raw.feature_kits {
            catalog.add_feature_kit(k)?;
        }
        Ok(catalog)
    }

    pub fn add_index_kit(&mut self, kit: IndexKitCatalogEntry) -> Result<(), DomainError> {
        if self.index_pos.contains_key(&kit.kit_id) {
            return Err(DomainError::Catalog(format!("duplicate index kit id {}", kit.kit_id)));
        }
        self.index_pos.insert(kit.kit_id, self.index_kits.len());
        self.index_kits.push(kit);
        Ok(())
    }

    pub fn add_feature_kit(&mut self, kit: FeatureKit) -> Result<(), DomainError> {
        if self.feature_pos.contains_key(&kit.kit_id) {
            return Err(DomainError::Catalog(format!("duplicate feature kit id {}", kit.kit_id)));
        }
        self.feature_pos.insert(kit.kit_id, self.feature_kits.len());
        self.feature_kits.push(kit);
        Ok(())
    }
}

impl KitCatalog for InMemoryKitCatalog {
    fn index_kit(&self, kit_id: i64) -> Option<&IndexKitCatalogEntry> {
        self.index_pos.get(&kit_id).and_then(|&i| self.index_kits.get(i))
    }

    fn index_kits(&self) -> Vec<&IndexKitCatalogEntry> {
        self.index_kits.iter().collect()
    }

    fn feature_kit(&self, kit_id: i64) -> Option<&FeatureKit> {
        self.feature_pos.get(&kit_id).and_then(|&i| self.feature_kits.get(i))
    }

    fn feature_kits(&self) -> Vec<&FeatureKit> {
        self.feature_kits.iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_catalog_from_json() {
        let json = r#"{
            "index_kits": [{
                "kit_id": 1, "name": "Dual Index Kit TT Set A", "identifier": "SI-TT-A", "index_type": "DualIndex",
                "barcodes": {
                    "i7": [{"sequence": "AGATCTCG", "name": "SI-TT-A1", "well": "A1"}],
                    "i5": [{"sequence": "CCTGATTG", "name": "SI-TT-A1", "well": "A1"}]
                }
            }],
            "feature_kits": [{
                "kit_id": 7, "name": "TotalSeq-B Human", "identifier": "TSB-HU",
                "features": [{"name": "CD3", "sequence": "CTCATTGTAACTCCT", "pattern": "5PNNNNNNNNNN(BC)", "read": "R2"}]
            }]
        }"#;
        let cat = InMemoryKitCatalog::from_json_reader(json.as_bytes()).unwrap();
        let kit = cat.get_index_kit(1).unwrap();
        assert_eq!(kit.name_for(BarcodeRole::I7, "AGATCTCG"), Some("SI-TT-A1"));
        assert_eq!(kit.by_well(BarcodeRole::I5, "A1").map(|b| b.sequence.as_str()), Some("CCTGATTG"));
        assert_eq!(cat.find_index_kit("si-tt-a").map(|k| k.kit_id), Some(1));
        assert!(cat.get_feature_kit(7).unwrap().feature("CD3").is_some());
        assert_eq!(cat.get_index_kit(2).err(), Some(DomainError::KitNotFound(2)));
    }

    #[test]
    fn duplicate_kit_ids_are_rejected() {
        let mut cat = InMemoryKitCatalog::new();
        cat.add_index_kit(IndexKitCatalogEntry::new(1, "a", "a", IndexType::DualIndex)).unwrap();
        assert!(cat.add_index_kit(IndexKitCatalogEntry::new(1, "b", "b", IndexType::DualIndex)).is_err());
    }
}
