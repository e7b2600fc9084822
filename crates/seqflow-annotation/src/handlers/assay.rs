//! Selección de proyecto y de ensayo.
use serde::{Deserialize, Serialize};

use seqflow_core::constants::COMMENT_TABLE;
use seqflow_domain::{AssayType, Category, MuxType, SubmissionType, ValidationReport};

use super::{general, reject, Record};
use crate::error::WorkflowError;
use crate::facts::{AdditionalServices, AnnotationFact, AnnotationFacts, FactKey, ProjectRef};

const ASSAY_COMMENT: &str = "assay_tech_selection";
const OLIGO_KIT_COMMENT: &str = "oligo_multiplexing_kit";
const ANTIBODY_KIT_COMMENT: &str = "antibody_capture_kit";

/// Entrada del step de ensayo.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssaySelection {
    pub assay: AssayType,
    #[serde(default)]
    pub mux: Option<MuxType>,
    #[serde(default)]
    pub services: AdditionalServices,
    #[serde(default)]
    pub oligo_multiplexing_kit: Option<String>,
    #[serde(default)]
    pub antibody_capture_kit: Option<String>,
    #[serde(default)]
    pub comment: Option<String>,
}

impl AssaySelection {
    pub fn new(assay: AssayType) -> Self {
        Self { assay,
               mux: None,
               services: AdditionalServices::default(),
               oligo_multiplexing_kit: None,
               antibody_capture_kit: None,
               comment: None }
    }

    pub fn with_mux(mut self, mux: MuxType) -> Self {
        self.mux = Some(mux);
        self
    }

    pub fn with_services(mut self, services: AdditionalServices) -> Self {
        self.services = services;
        self
    }
}

pub(crate) fn project_select(record: &mut Record, project: ProjectRef) -> Result<(), WorkflowError> {
    if project.project_id.is_none() && project.name.trim().is_empty() {
        return Err(general("Select an existing project or enter a name for a new one."));
    }
    record.metadata.set(AnnotationFact::Project(project));
    Ok(())
}

fn mux_supported(assay: AssayType, mux: MuxType) -> bool {
    match mux {
        MuxType::TenxOligo | MuxType::TenxAbcHash => assay.oligo_multiplexing(),
        MuxType::TenxOnChip => assay.ocm_multiplexing(),
        MuxType::TenxFlexProbe => assay.is_flex_multiplexed(),
    }
}

pub(crate) fn assay_select(record: &mut Record, selection: AssaySelection) -> Result<(), WorkflowError> {
    let assay = selection.assay;
    let mut report = ValidationReport::default();
    match selection.mux {
        Some(mux) if !mux_supported(assay, mux) => {
            report.push_general(format!("'{}' is not available for '{}'.", mux.name(), assay.abbreviation()))
        }
        None if assay.is_flex_multiplexed() && record.metadata.submission_type() == Some(SubmissionType::RawSamples) => {
            report.push_general(format!("'{}' requires probe barcode multiplexing.", assay.abbreviation()))
        }
        _ => {}
    }
    for t in selection.services.library_types(assay) {
        if !assay.optional_library_types().contains(&t) {
            report.push_general(format!("'{}' is not available for '{}'.", t.name(), assay.abbreviation()));
        }
    }
    reject(report)?;

    record.metadata.set(AnnotationFact::Assay(assay));
    match selection.mux {
        Some(mux) => record.metadata.set(AnnotationFact::Mux(mux)),
        None => record.metadata.remove(FactKey::Mux),
    };
    record.metadata.set(AnnotationFact::AdditionalServices(selection.services));
    match &selection.oligo_multiplexing_kit {
        Some(kit) => record.metadata.set(AnnotationFact::OligoMultiplexingKit(kit.clone())),
        None => record.metadata.remove(FactKey::OligoMultiplexingKit),
    };
    match &selection.antibody_capture_kit {
        Some(kit) => record.metadata.set(AnnotationFact::AntibodyCaptureKit(kit.clone())),
        None => record.metadata.remove(FactKey::AntibodyCaptureKit),
    };

    // un reenvío reemplaza los comentarios de este step
    let contexts = [ASSAY_COMMENT, OLIGO_KIT_COMMENT, ANTIBODY_KIT_COMMENT];
    if let Ok(comments) = record.table_mut(COMMENT_TABLE) {
        comments.retain_rows(|r| !r.get("context").as_str().is_some_and(|c| contexts.contains(&c)));
    }
    for (context, text) in [(ASSAY_COMMENT, &selection.comment),
                            (OLIGO_KIT_COMMENT, &selection.oligo_multiplexing_kit),
                            (ANTIBODY_KIT_COMMENT, &selection.antibody_capture_kit)]
    {
        if let Some(text) = text.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            record.add_comment(context, text)?;
        }
    }
    log::debug!("assay_select:done assay={} mux={:?}", assay.name(), selection.mux);
    Ok(())
}
