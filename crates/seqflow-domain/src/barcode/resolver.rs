use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

use seqflow_core::{CellValue, Table};

use super::is_deleted;
use crate::categories::{BarcodeRole, IndexType};
use crate::error::DomainError;
use crate::kits::{IndexKitCatalogEntry, KitCatalog};
use crate::sequence::{normalize, reverse_complement};
use crate::validation::{CellError, CellErrorKind, ValidationReport};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchOrientation {
    Forward,
    ReverseComplement,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleMatch {
    pub forward_match_count: usize,
    pub reverse_complement_match_count: usize,
}

impl RoleMatch {
    pub fn count(&self, orientation: MatchOrientation) -> usize {
        match orientation {
            MatchOrientation::Forward => self.forward_match_count,
            MatchOrientation::ReverseComplement => self.reverse_complement_match_count,
        }
    }
}

/// Conteos de un kit para cada rol resuelto.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KitMatch {
    pub kit_id: i64,
    pub kit_name: String,
    pub kit_identifier: String,
    pub roles: BTreeMap<BarcodeRole, RoleMatch>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FullCandidate {
    pub kit_id: i64,
    pub role: BarcodeRole,
    pub orientation: MatchOrientation,
}

/// Resultado de `BarcodeResolver::resolve`.
///
/// `submitted` es N: filas enviadas (sin las marcadas como borradas). Las
/// secuencias con caracteres inválidos quedan en `invalid` como errores de
/// celda; esas filas cuentan para N pero nunca coinciden.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BarcodeMatchReport {
    pub submitted: usize,
    pub roles: Vec<BarcodeRole>,
    pub kits: Vec<KitMatch>,
    pub invalid: ValidationReport,
}

impl BarcodeMatchReport {
    pub fn kit(&self, kit_id: i64) -> Option<&KitMatch> {
        self.kits.iter().find(|k| k.kit_id == kit_id)
    }

    pub fn counts(&self, kit_id: i64, role: BarcodeRole) -> Option<RoleMatch> {
        self.kit(kit_id).and_then(|k| k.roles.get(&role).copied())
    }

    /// Kits que cubren las N filas para `role`, una entrada por orientación.
    pub fn full_candidates(&self, role: BarcodeRole) -> Vec<FullCandidate> {
        if self.submitted == 0 {
            return Vec::new();
        }
        let mut out = Vec::new();
        for kit in &self.kits {
            let Some(m) = kit.roles.get(&role) else { continue };
            for orientation in [MatchOrientation::Forward, MatchOrientation::ReverseComplement] {
                if m.count(orientation) == self.submitted {
                    out.push(FullCandidate { kit_id: kit.kit_id, role, orientation });
                }
            }
        }
        out
    }

    pub fn candidates_in(&self, role: BarcodeRole, orientation: MatchOrientation) -> Vec<FullCandidate> {
        self.full_candidates(role).into_iter().filter(|c| c.orientation == orientation).collect()
    }

    /// Sin candidatos: el usuario debe declarar la orientación.
    pub fn needs_declared_orientation(&self, role: BarcodeRole) -> bool {
        self.full_candidates(role).is_empty()
    }

    pub fn has_invalid_sequences(&self) -> bool {
        !self.invalid.is_empty()
    }
}

/// Compara las secuencias enviadas contra un conjunto de kits.
pub struct BarcodeResolver<'a> {
    kits: Vec<&'a IndexKitCatalogEntry>,
}

impl<'a> BarcodeResolver<'a> {
    pub fn new(kits: impl IntoIterator<Item = &'a IndexKitCatalogEntry>) -> Self {
        Self { kits: kits.into_iter().collect() }
    }

    /// Kits del catálogo con alguno de los tipos de índice dados.
    pub fn from_catalog<C: KitCatalog + ?Sized>(catalog: &'a C, types: &[IndexType]) -> Self {
        Self::new(catalog.index_kits_of(types))
    }

    pub fn kits(&self) -> &[&'a IndexKitCatalogEntry] {
        &self.kits
    }

    pub fn resolve(&self, table: &Table, roles: &[BarcodeRole]) -> Result<BarcodeMatchReport, DomainError> {
        log::debug!("barcode_resolver:resolve:start rows={} kits={} roles={roles:?}", table.len(), self.kits.len());
        let rows: Vec<_> = table.rows().filter(|r| !is_deleted(r)).collect();
        let mut invalid = ValidationReport::default();

        // por rol: (secuencia, reverso complementario) de cada fila enviada
        let mut submitted: BTreeMap<BarcodeRole, Vec<(Option<String>, Option<String>)>> = BTreeMap::new();
        for &role in roles {
            let column = role.sequence_column();
            let column_index = table.column_index(&column).ok_or_else(|| DomainError::MissingColumn(column.clone()))?;
            let mut pairs = Vec::with_capacity(rows.len());
            for row in &rows {
                let Some(seq) = submitted_sequence(row.get(&column)) else {
                    pairs.push((None, None));
                    continue;
                };
                let rc = match reverse_complement(&seq) {
                    Ok(rc) => Some(rc),
                    Err(e) => {
                        invalid.push_cell(CellError { row: row.index() + 1,
                                                      column_label: column.clone(),
                                                      column_index,
                                                      kind: CellErrorKind::Invalid,
                                                      message: e.to_string() });
                        None
                    }
                };
                pairs.push((Some(seq), rc));
            }
            submitted.insert(role, pairs);
        }

        let mut kits = Vec::with_capacity(self.kits.len());
        for kit in &self.kits {
            let mut per_role = BTreeMap::new();
            for (&role, pairs) in &submitted {
                let set: HashSet<&str> = kit.sequence_set(role);
                let present = |s: &Option<String>| s.as_deref().is_some_and(|s| set.contains(s));
                per_role.insert(role,
                                RoleMatch { forward_match_count: pairs.iter().filter(|(fwd, _)| present(fwd)).count(),
                                            reverse_complement_match_count: pairs.iter().filter(|(_, rc)| present(rc)).count() });
            }
            kits.push(KitMatch { kit_id: kit.kit_id,
                                 kit_name: kit.name.clone(),
                                 kit_identifier: kit.identifier.clone(),
                                 roles: per_role });
        }

        let report = BarcodeMatchReport { submitted: rows.len(),
                                          roles: roles.to_vec(),
                                          kits,
                                          invalid };
        log::debug!("barcode_resolver:resolve:done n={} invalid={}", report.submitted, report.invalid.len());
        Ok(report)
    }
}

fn submitted_sequence(cell: &CellValue) -> Option<String> {
    if cell.is_null() {
        return None;
    }
    let seq = normalize(&cell.to_string());
    (!seq.is_empty()).then_some(seq)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kit(id: i64, i7: &[&str]) -> IndexKitCatalogEntry {
        i7.iter().enumerate().fold(IndexKitCatalogEntry::new(id, &format!("kit {id}"), &format!("K{id}"), IndexType::SingleIndexI7),
                                   |k, (i, s)| k.with_barcode(BarcodeRole::I7, s, &format!("BC{i}"), None))
    }

    #[test]
    fn deleted_rows_do_not_count() {
        let t = Table::from_text_rows(&["sequence_i7", "index_well"], &[vec!["AAAA", "A1"], vec!["CCCC", "del"]]).unwrap();
        let k = kit(1, &["AAAA"]);
        let report = BarcodeResolver::new([&k]).resolve(&t, &[BarcodeRole::I7]).unwrap();
        assert_eq!(report.submitted, 1);
        assert_eq!(report.full_candidates(BarcodeRole::I7).len(), 1);
    }

    #[test]
    fn lowercase_input_is_normalized() {
        let t = Table::from_text_rows(&["sequence_i7"], &[vec![" agatctcg "]]).unwrap();
        let k = kit(1, &["AGATCTCG"]);
        let report = BarcodeResolver::new([&k]).resolve(&t, &[BarcodeRole::I7]).unwrap();
        assert_eq!(report.counts(1, BarcodeRole::I7).unwrap().forward_match_count, 1);
    }

    #[test]
    fn invalid_sequences_become_cell_errors() {
        let t = Table::from_text_rows(&["sample_name", "sequence_i7"], &[vec!["s1", "AAAA"], vec!["s2", "AANA"]]).unwrap();
        let k = kit(1, &["TTTT"]);
        let report = BarcodeResolver::new([&k]).resolve(&t, &[BarcodeRole::I7]).unwrap();
        assert!(report.has_invalid_sequences());
        let err = &report.invalid.cells[0];
        assert_eq!((err.row, err.kind, err.cell_ref().as_str()), (2, CellErrorKind::Invalid, "B2"));
        assert_eq!(report.counts(1, BarcodeRole::I7).unwrap().reverse_complement_match_count, 1);
        assert!(report.needs_declared_orientation(BarcodeRole::I7));
    }

    #[test]
    fn missing_sequence_column_is_an_error() {
        let t = Table::from_text_rows(&["sequence_i7"], &[vec!["AAAA"]]).unwrap();
        let r = BarcodeResolver::new([]).resolve(&t, &[BarcodeRole::I5]);
        assert_eq!(r.err(), Some(DomainError::MissingColumn("sequence_i5".into())));
    }

    #[test]
    fn palindromic_kits_are_reported_in_both_orientations() {
        let t = Table::from_text_rows(&["sequence_i7"], &[vec!["ACGT"]]).unwrap();
        let k = kit(4, &["ACGT"]);
        let report = BarcodeResolver::new([&k]).resolve(&t, &[BarcodeRole::I7]).unwrap();
        assert_eq!(report.full_candidates(BarcodeRole::I7).len(), 2);
    }
}
