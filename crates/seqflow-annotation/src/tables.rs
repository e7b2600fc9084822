//! Nombres de tablas del workflow y registros de columnas por step.
use seqflow_core::{CellValue, TableError};
use seqflow_domain::{ColumnRegistry, ColumnSpec, GenomeRef, IndexType, LibraryType};

pub const SAMPLE_TABLE: &str = "sample_table";
pub const LIBRARY_TABLE: &str = "library_table";
pub const MUX_TABLE: &str = "mux_table";
pub const BARCODE_TABLE: &str = "barcode_table";
pub const FEATURE_TABLE: &str = "feature_table";
pub const FEATURE_KIT_TABLE: &str = "kit_table";
pub const OPENST_TABLE: &str = "openst_table";
pub const VISIUM_TABLE: &str = "visium_table";

pub const OCM_BARCODES: [&str; 4] = ["OB1", "OB2", "OB3", "OB4"];
pub const VISIUM_AREAS: [&str; 4] = ["A1", "B1", "C1", "D1"];

fn upper(value: CellValue) -> CellValue {
    match value {
        CellValue::Text(s) => CellValue::text(s.to_uppercase()),
        other => other,
    }
}

fn nucleotides(value: &CellValue) -> Option<String> {
    let s = value.as_str()?;
    s.chars()
     .find(|c| !matches!(c, 'A' | 'C' | 'G' | 'T'))
     .map(|c| format!("invalid character '{c}', only A, C, G and T are allowed"))
}

fn flex_barcodes() -> Vec<String> {
    (1..=16).map(|i| format!("BC{i:03}")).collect()
}

fn sample_name() -> ColumnSpec {
    ColumnSpec::text("sample_name", "Sample Name", 300.0).required().length(1, 64)
}

fn genome() -> ColumnSpec {
    ColumnSpec::category::<GenomeRef>("genome_id", "Genome", 250.0, "genome").required()
}

/// Muestras crudas; con multiplexado cada muestra declara su pool.
pub fn sample_columns(multiplexed: bool) -> Result<ColumnRegistry, TableError> {
    let mut r = ColumnRegistry::from_specs([sample_name().unique(),
                                            genome(),
                                            ColumnSpec::float("seq_depth", "Sequencing Depth (M)", 150.0).float_range(Some(0.0), None),
                                            ColumnSpec::text("comment", "Comment", 300.0)])?;
    if multiplexed {
        r.add(ColumnSpec::text("sample_pool", "Sample Pool", 200.0).required().length(1, 64))?;
    }
    Ok(r)
}

/// Librerías ya preparadas y agrupadas en pools por el usuario.
pub fn pooled_library_columns() -> Result<ColumnRegistry, TableError> {
    ColumnRegistry::from_specs([sample_name(),
                                ColumnSpec::text("library_name", "Library Name", 300.0).required().unique().length(1, 64),
                                ColumnSpec::category::<LibraryType>("library_type_id", "Library Type", 300.0, "library type").required(),
                                genome(),
                                ColumnSpec::text("pool", "Pool", 200.0).required(),
                                ColumnSpec::category::<IndexType>("index_type_id", "Index Type", 200.0, "index type"),
                                ColumnSpec::text("index_well", "Index Well", 100.0),
                                ColumnSpec::text("kit_i7", "i7 Kit", 200.0),
                                ColumnSpec::text("name_i7", "i7 Name", 150.0),
                                ColumnSpec::text("sequence_i7", "i7 Sequence", 200.0).clean_up_with(upper),
                                ColumnSpec::text("kit_i5", "i5 Kit", 200.0),
                                ColumnSpec::text("name_i5", "i5 Name", 150.0),
                                ColumnSpec::text("sequence_i5", "i5 Sequence", 200.0).clean_up_with(upper)])
}

pub fn ocm_columns() -> Result<ColumnRegistry, TableError> {
    ColumnRegistry::from_specs([sample_name(), ColumnSpec::dropdown("barcode_id", "OCM Barcode", 150.0, OCM_BARCODES).required()])
}

pub fn oligo_mux_columns() -> Result<ColumnRegistry, TableError> {
    ColumnRegistry::from_specs([sample_name(),
                                ColumnSpec::text("barcode", "Barcode Sequence", 200.0).required()
                                                                                      .clean_up_with(upper)
                                                                                      .validate_with(nucleotides),
                                ColumnSpec::text("pattern", "Pattern", 200.0).required(),
                                ColumnSpec::dropdown("read", "Read", 100.0, ["R1", "R2"]).required()])
}

pub fn flex_columns() -> Result<ColumnRegistry, TableError> {
    ColumnRegistry::from_specs([sample_name(), ColumnSpec::dropdown("barcode_id", "Probe Barcode", 150.0, flex_barcodes()).required()])
}

/// Features de anticuerpos: por kit (`kit` + `feature` opcional) o propias.
pub fn feature_columns() -> Result<ColumnRegistry, TableError> {
    ColumnRegistry::from_specs([ColumnSpec::text("library_name", "Library Name", 300.0).required(),
                                ColumnSpec::text("kit", "Kit", 200.0),
                                ColumnSpec::text("feature", "Feature", 200.0),
                                ColumnSpec::text("sequence", "Sequence", 200.0).clean_up_with(upper).validate_with(nucleotides),
                                ColumnSpec::text("pattern", "Pattern", 200.0),
                                ColumnSpec::dropdown("read", "Read", 100.0, ["R1", "R2"])])
}

pub fn openst_columns() -> Result<ColumnRegistry, TableError> {
    ColumnRegistry::from_specs([ColumnSpec::text("library_name", "Library Name", 300.0).required().unique(),
                                ColumnSpec::text("image", "Image", 300.0).required()])
}

pub fn visium_columns() -> Result<ColumnRegistry, TableError> {
    ColumnRegistry::from_specs([ColumnSpec::text("library_name", "Library Name", 300.0).required().unique(),
                                ColumnSpec::text("slide", "Slide", 200.0).required(),
                                ColumnSpec::dropdown("area", "Area", 100.0, VISIUM_AREAS).required(),
                                ColumnSpec::text("image", "Image", 300.0).required()])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registries_are_well_formed() {
        for r in [sample_columns(false),
                  sample_columns(true),
                  pooled_library_columns(),
                  ocm_columns(),
                  oligo_mux_columns(),
                  flex_columns(),
                  feature_columns(),
                  openst_columns(),
                  visium_columns()]
        {
            assert!(!r.unwrap().is_empty());
        }
    }

    #[test]
    fn multiplexed_samples_declare_a_pool() {
        assert!(sample_columns(true).unwrap().get("sample_pool").unwrap().required);
        assert!(sample_columns(false).unwrap().get("sample_pool").is_none());
    }

    #[test]
    fn sequences_only_accept_nucleotides() {
        assert_eq!(nucleotides(&CellValue::text("ACGT")), None);
        assert!(nucleotides(&CellValue::text("ACNT")).is_some());
        assert_eq!(upper(CellValue::text("acgt")), CellValue::text("ACGT"));
        assert_eq!(flex_barcodes().last().map(String::as_str), Some("BC016"));
    }
}
