//! Generación de la tabla de librerías a partir de las muestras.
//!
//! Cada muestra (o cada pool de muestras multiplexadas) produce una librería
//! por tipo: los del ensayo, los de servicios opcionales y, según el
//! multiplexado, la librería de captura de oligos o de anticuerpos.
//! Nombre de librería: `<muestra>_<identificador del tipo>`.
use seqflow_core::{CellType, CellValue, Table, TableError};
use seqflow_domain::{AssayType, Category, LibraryType, MuxType};

use crate::facts::AdditionalServices;

pub fn library_name(sample: &str, library_type: LibraryType) -> String {
    format!("{sample}_{}", library_type.identifier())
}

/// Tipos de librería para una muestra, sin repetidos y en orden estable.
pub fn library_types_for(assay: AssayType, services: AdditionalServices, mux: Option<MuxType>) -> Vec<LibraryType> {
    let mut out: Vec<LibraryType> = Vec::new();
    let extra = match mux {
        Some(MuxType::TenxOligo) => Some(LibraryType::TenxMuxOligo),
        Some(MuxType::TenxAbcHash) => Some(LibraryType::TenxAntibodyCapture),
        _ => None,
    };
    let all = assay.library_types().iter().copied().chain(services.library_types(assay)).chain(extra);
    for t in all {
        if !out.contains(&t) {
            out.push(t);
        }
    }
    out
}

pub fn empty_library_table() -> Result<Table, TableError> {
    Table::with_columns([("library_name", CellType::Text),
                         ("sample_name", CellType::Text),
                         ("library_type_id", CellType::Integer),
                         ("genome_id", CellType::Integer),
                         ("pool", CellType::Text)])
}

/// Tabla de librerías de una tabla de muestras validada.
///
/// Con multiplexado las librerías se generan por `sample_pool` y heredan el
/// genoma de la primera muestra del pool.
pub fn generate(samples: &Table,
                assay: AssayType,
                services: AdditionalServices,
                mux: Option<MuxType>)
                -> Result<Table, TableError> {
    let types = library_types_for(assay, services, mux);
    let key = if mux.is_some() { "sample_pool" } else { "sample_name" };
    let mut libraries = empty_library_table()?;
    let mut seen: Vec<String> = Vec::new();
    for row in samples.rows() {
        let Some(name) = row.get(key).as_str() else {
            continue;
        };
        if seen.iter().any(|s| s == name) {
            continue;
        }
        seen.push(name.to_string());
        for &t in &types {
            libraries.push_named([("library_name", CellValue::text(library_name(name, t))),
                                  ("sample_name", CellValue::text(name)),
                                  ("library_type_id", CellValue::Int(t.id())),
                                  ("genome_id", row.get("genome_id").clone())])?;
        }
    }
    log::debug!("library_table:generate:done samples={} libraries={} types={}", seen.len(), libraries.len(), types.len());
    Ok(libraries)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn samples(multiplexed: bool) -> Table {
        let mut t = Table::with_columns([("sample_name", CellType::Text), ("genome_id", CellType::Integer), ("sample_pool", CellType::Text)])
            .unwrap();
        let pool = |p: &str| if multiplexed { CellValue::text(p) } else { CellValue::Null };
        t.push_row(vec!["s1".into(), CellValue::Int(1), pool("p1")]).unwrap();
        t.push_row(vec!["s2".into(), CellValue::Int(2), pool("p1")]).unwrap();
        t
    }

    #[test]
    fn one_library_per_sample_and_type() {
        let services = AdditionalServices { antibody_capture: true, ..Default::default() };
        let t = generate(&samples(false), AssayType::TenxScGex3Prime, services, None).unwrap();
        assert_eq!(t.len(), 4);
        assert_eq!(t.get(0, "library_name"), Some(&CellValue::text("s1_10XGEX3P")));
        assert_eq!(t.get(1, "library_name"), Some(&CellValue::text("s1_10XABC")));
        assert_eq!(t.get(3, "genome_id"), Some(&CellValue::Int(2)));
        assert_eq!(t.get(0, "pool"), Some(&CellValue::Null));
    }

    #[test]
    fn multiplexed_samples_share_pool_libraries() {
        let t = generate(&samples(true), AssayType::TenxScGex3Prime, AdditionalServices::default(), Some(MuxType::TenxOligo)).unwrap();
        let names: Vec<String> = t.rows().map(|r| r.get("library_name").to_string()).collect();
        assert_eq!(names, vec!["p1_10XGEX3P", "p1_10XOMUX"]);
    }

    #[test]
    fn hashing_does_not_duplicate_antibody_capture() {
        let services = AdditionalServices { antibody_capture: true, ..Default::default() };
        let types = library_types_for(AssayType::TenxScGex5Prime, services, Some(MuxType::TenxAbcHash));
        assert_eq!(types, vec![LibraryType::TenxScGex5Prime, LibraryType::TenxAntibodyCapture]);
    }
}
