//! Steps del workflow y su orden de ramificación.
//!
//! `rules()` es la única fuente de verdad del grafo: una lista ordenada de
//! `(step, predicado)` evaluada por `BranchResolver`. Los predicados sólo
//! leen hechos y tablas del último record.
use serde::{Deserialize, Serialize};

use seqflow_core::{BranchResolver, BranchRule, CellValue, ChainError, RowRef, StepId, StepRecord, Table};
use seqflow_domain::{Category, LibraryType, MuxType, SubmissionType};

use crate::facts::{AnnotationFact, AnnotationFacts};
use crate::handlers::barcodes::unresolved_roles;
use crate::tables::{BARCODE_TABLE, FEATURE_KIT_TABLE, LIBRARY_TABLE};

pub const WORKFLOW_KIND: &str = "library_annotation";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnnotationStep {
    ProjectSelect,
    AssaySelect,
    SampleDefinition,
    MultiplexedSampleDefinition,
    OcmAnnotation,
    OligoMuxAnnotation,
    FlexAnnotation,
    PooledLibraryAnnotation,
    BarcodeMatch,
    IndexKitMapping,
    FeatureAnnotation,
    FeatureKitMapping,
    OpenStAnnotation,
    VisiumAnnotation,
    Complete,
}

impl StepId for AnnotationStep {
    fn name(&self) -> &'static str {
        use AnnotationStep::*;
        match self {
            ProjectSelect => "project_select",
            AssaySelect => "assay_select",
            SampleDefinition => "sample_definition",
            MultiplexedSampleDefinition => "multiplexed_sample_definition",
            OcmAnnotation => "ocm_annotation",
            OligoMuxAnnotation => "oligo_mux_annotation",
            FlexAnnotation => "flex_annotation",
            PooledLibraryAnnotation => "pooled_library_annotation",
            BarcodeMatch => "barcode_match",
            IndexKitMapping => "index_kit_mapping",
            FeatureAnnotation => "feature_annotation",
            FeatureKitMapping => "feature_kit_mapping",
            OpenStAnnotation => "openst_annotation",
            VisiumAnnotation => "visium_annotation",
            Complete => "complete",
        }
    }
}

impl AnnotationStep {
    pub const ALL: [AnnotationStep; 15] = [AnnotationStep::ProjectSelect,
                                           AnnotationStep::AssaySelect,
                                           AnnotationStep::SampleDefinition,
                                           AnnotationStep::MultiplexedSampleDefinition,
                                           AnnotationStep::OcmAnnotation,
                                           AnnotationStep::OligoMuxAnnotation,
                                           AnnotationStep::FlexAnnotation,
                                           AnnotationStep::PooledLibraryAnnotation,
                                           AnnotationStep::BarcodeMatch,
                                           AnnotationStep::IndexKitMapping,
                                           AnnotationStep::FeatureAnnotation,
                                           AnnotationStep::FeatureKitMapping,
                                           AnnotationStep::OpenStAnnotation,
                                           AnnotationStep::VisiumAnnotation,
                                           AnnotationStep::Complete];

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|s| s.name() == name)
    }
}

type Record = StepRecord<AnnotationFact>;

fn always(_: &Record) -> bool {
    true
}

fn submission(r: &Record) -> Option<SubmissionType> {
    r.metadata.submission_type()
}

/// Tipos de librería presentes en `library_table`.
pub fn library_types(r: &Record) -> Vec<LibraryType> {
    let Ok(t) = r.table(LIBRARY_TABLE) else {
        return Vec::new();
    };
    let mut out: Vec<LibraryType> = Vec::new();
    for row in t.rows() {
        if let Some(lt) = row.get("library_type_id").as_i64().and_then(LibraryType::from_id) {
            if !out.contains(&lt) {
                out.push(lt);
            }
        }
    }
    out
}

fn has_library(r: &Record, pred: impl Fn(LibraryType) -> bool) -> bool {
    library_types(r).into_iter().any(pred)
}

fn defines_plain_samples(r: &Record) -> bool {
    r.metadata.mux().is_none() && submission(r) != Some(SubmissionType::PooledLibraries)
}

fn defines_mux_samples(r: &Record) -> bool {
    r.metadata.mux().is_some()
}

fn needs_ocm(r: &Record) -> bool {
    r.metadata.mux() == Some(MuxType::TenxOnChip)
}

fn needs_oligo_mux(r: &Record) -> bool {
    matches!(r.metadata.mux(), Some(MuxType::TenxOligo | MuxType::TenxAbcHash))
}

fn needs_flex(r: &Record) -> bool {
    r.metadata.mux() == Some(MuxType::TenxFlexProbe)
    || (submission(r).is_some_and(|s| s != SubmissionType::RawSamples) && has_library(r, |t| t == LibraryType::TenxScGexFlex))
}

fn submits_pooled_libraries(r: &Record) -> bool {
    submission(r) == Some(SubmissionType::PooledLibraries)
}

fn active_rows(t: &Table) -> impl Iterator<Item = RowRef<'_>> {
    t.rows().filter(|r| r.get("index_well").as_str() != Some("del"))
}

/// Algún rol tiene secuencias enviadas sin kit declarado.
fn needs_barcode_match(r: &Record) -> bool {
    r.table(BARCODE_TABLE).map(|t| !unresolved_roles(t).is_empty()).unwrap_or(false)
}

/// Kits declarados por nombre que todavía no tienen id de catálogo.
fn needs_index_kit_mapping(r: &Record) -> bool {
    let unmapped = |row: &RowRef<'_>, kit: &str, kit_id: &str| !row.get(kit).is_null() && row.get(kit_id).is_null();
    r.table(BARCODE_TABLE)
     .map(|t| active_rows(t).any(|row| unmapped(&row, "kit_i7", "kit_i7_id") || unmapped(&row, "kit_i5", "kit_i5_id")))
     .unwrap_or(false)
}

fn needs_features(r: &Record) -> bool {
    has_library(r, |t| t.needs_features())
}

fn needs_feature_kit_mapping(r: &Record) -> bool {
    r.table(FEATURE_KIT_TABLE).map(|t| t.any_in_column("kit_id", CellValue::is_null)).unwrap_or(false)
}

fn needs_openst(r: &Record) -> bool {
    has_library(r, |t| t == LibraryType::OpenSt)
}

fn needs_visium(r: &Record) -> bool {
    has_library(r, |t| t.is_visium())
}

pub fn rules() -> Vec<BranchRule<AnnotationStep, AnnotationFact>> {
    use AnnotationStep::*;
    vec![BranchRule::new(ProjectSelect, always),
         BranchRule::new(AssaySelect, always),
         BranchRule::new(SampleDefinition, defines_plain_samples),
         BranchRule::new(MultiplexedSampleDefinition, defines_mux_samples),
         BranchRule::new(OcmAnnotation, needs_ocm),
         BranchRule::new(OligoMuxAnnotation, needs_oligo_mux),
         BranchRule::new(FlexAnnotation, needs_flex),
         BranchRule::new(PooledLibraryAnnotation, submits_pooled_libraries),
         BranchRule::new(BarcodeMatch, needs_barcode_match),
         BranchRule::new(IndexKitMapping, needs_index_kit_mapping),
         BranchRule::new(FeatureAnnotation, needs_features),
         BranchRule::new(FeatureKitMapping, needs_feature_kit_mapping),
         BranchRule::new(OpenStAnnotation, needs_openst),
         BranchRule::new(VisiumAnnotation, needs_visium)]
}

pub fn resolver() -> Result<BranchResolver<AnnotationStep, AnnotationFact>, ChainError> {
    BranchResolver::new(rules(), AnnotationStep::Complete)
}
