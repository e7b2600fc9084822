//! Hechos del workflow de anotación de librerías.
//!
//! Esquema cerrado: cada hecho que un step posterior puede consultar está
//! declarado aquí. Cambiar una variante de forma incompatible exige subir
//! `SCHEMA_VERSION`.
use serde::{Deserialize, Serialize};

use seqflow_core::{CommittedIds, Fact, FactSheet};
use seqflow_domain::{AssayType, BarcodeRole, IndexType, LibraryType, MuxType, OrientationChoice, SubmissionType};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum FactKey {
    SeqRequest,
    SubmissionType,
    Project,
    Assay,
    Mux,
    AdditionalServices,
    OligoMultiplexingKit,
    AntibodyCaptureKit,
    IndexType,
    BarcodeChoices,
    Committed,
}

/// Proyecto destino: uno existente (`project_id`) o uno nuevo por nombre.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectRef {
    pub project_id: Option<i64>,
    pub name: String,
}

/// Servicios opcionales pedidos junto al ensayo.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdditionalServices {
    #[serde(default)]
    pub nuclei_isolation: bool,
    #[serde(default)]
    pub antibody_capture: bool,
    #[serde(default)]
    pub vdj_b: bool,
    #[serde(default)]
    pub vdj_t: bool,
    #[serde(default)]
    pub vdj_t_gd: bool,
    #[serde(default)]
    pub crispr_screening: bool,
}

impl AdditionalServices {
    /// Librerías opcionales que estos servicios agregan a `assay`.
    pub fn library_types(&self, assay: AssayType) -> Vec<LibraryType> {
        let mut out = Vec::new();
        if self.antibody_capture {
            out.push(if assay.is_flex() { LibraryType::TenxScAbcFlex } else { LibraryType::TenxAntibodyCapture });
        }
        if self.crispr_screening {
            out.push(LibraryType::TenxCrisprScreening);
        }
        if self.vdj_b {
            out.push(LibraryType::TenxVdjB);
        }
        if self.vdj_t {
            out.push(LibraryType::TenxVdjT);
        }
        if self.vdj_t_gd {
            out.push(LibraryType::TenxVdjTGd);
        }
        out
    }
}

/// Orientación elegida por rol en el step de barcodes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BarcodeChoices {
    pub i7: Option<OrientationChoice>,
    pub i5: Option<OrientationChoice>,
}

impl BarcodeChoices {
    pub fn get(&self, role: BarcodeRole) -> Option<OrientationChoice> {
        match role {
            BarcodeRole::I7 => self.i7,
            BarcodeRole::I5 => self.i5,
        }
    }

    pub fn set(&mut self, role: BarcodeRole, choice: OrientationChoice) {
        match role {
            BarcodeRole::I7 => self.i7 = Some(choice),
            BarcodeRole::I5 => self.i5 = Some(choice),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "fact", content = "value", rename_all = "snake_case")]
pub enum AnnotationFact {
    SeqRequest(i64),
    SubmissionType(SubmissionType),
    Project(ProjectRef),
    Assay(AssayType),
    Mux(MuxType),
    AdditionalServices(AdditionalServices),
    OligoMultiplexingKit(String),
    AntibodyCaptureKit(String),
    IndexType(IndexType),
    BarcodeChoices(BarcodeChoices),
    /// Ids creados por el commit; un reintento de cierre no vuelve a
    /// commitear.
    Committed(CommittedIds),
}

impl Fact for AnnotationFact {
    type Key = FactKey;
    const SCHEMA_VERSION: u32 = 1;

    fn key(&self) -> FactKey {
        match self {
            AnnotationFact::SeqRequest(_) => FactKey::SeqRequest,
            AnnotationFact::SubmissionType(_) => FactKey::SubmissionType,
            AnnotationFact::Project(_) => FactKey::Project,
            AnnotationFact::Assay(_) => FactKey::Assay,
            AnnotationFact::Mux(_) => FactKey::Mux,
            AnnotationFact::AdditionalServices(_) => FactKey::AdditionalServices,
            AnnotationFact::OligoMultiplexingKit(_) => FactKey::OligoMultiplexingKit,
            AnnotationFact::AntibodyCaptureKit(_) => FactKey::AntibodyCaptureKit,
            AnnotationFact::IndexType(_) => FactKey::IndexType,
            AnnotationFact::BarcodeChoices(_) => FactKey::BarcodeChoices,
            AnnotationFact::Committed(_) => FactKey::Committed,
        }
    }
}

/// Accesos tipados sobre la hoja de hechos.
pub trait AnnotationFacts {
    fn seq_request(&self) -> Option<i64>;
    fn submission_type(&self) -> Option<SubmissionType>;
    fn project(&self) -> Option<&ProjectRef>;
    fn assay(&self) -> Option<AssayType>;
    fn mux(&self) -> Option<MuxType>;
    fn services(&self) -> AdditionalServices;
    fn index_type(&self) -> Option<IndexType>;
    fn barcode_choices(&self) -> BarcodeChoices;
    fn committed(&self) -> Option<&CommittedIds>;
}

impl AnnotationFacts for FactSheet<AnnotationFact> {
    fn seq_request(&self) -> Option<i64> {
        match self.get(FactKey::SeqRequest) {
            Some(AnnotationFact::SeqRequest(id)) => Some(*id),
            _ => None,
        }
    }

    fn submission_type(&self) -> Option<SubmissionType> {
        match self.get(FactKey::SubmissionType) {
            Some(AnnotationFact::SubmissionType(t)) => Some(*t),
            _ => None,
        }
    }

    fn project(&self) -> Option<&ProjectRef> {
        match self.get(FactKey::Project) {
            Some(AnnotationFact::Project(p)) => Some(p),
            _ => None,
        }
    }

    fn assay(&self) -> Option<AssayType> {
        match self.get(FactKey::Assay) {
            Some(AnnotationFact::Assay(a)) => Some(*a),
            _ => None,
        }
    }

    fn mux(&self) -> Option<MuxType> {
        match self.get(FactKey::Mux) {
            Some(AnnotationFact::Mux(m)) => Some(*m),
            _ => None,
        }
    }

    fn services(&self) -> AdditionalServices {
        match self.get(FactKey::AdditionalServices) {
            Some(AnnotationFact::AdditionalServices(s)) => *s,
            _ => AdditionalServices::default(),
        }
    }

    fn index_type(&self) -> Option<IndexType> {
        match self.get(FactKey::IndexType) {
            Some(AnnotationFact::IndexType(t)) => Some(*t),
            _ => None,
        }
    }

    fn barcode_choices(&self) -> BarcodeChoices {
        match self.get(FactKey::BarcodeChoices) {
            Some(AnnotationFact::BarcodeChoices(c)) => *c,
            _ => BarcodeChoices::default(),
        }
    }

    fn committed(&self) -> Option<&CommittedIds> {
        match self.get(FactKey::Committed) {
            Some(AnnotationFact::Committed(ids)) => Some(ids),
            _ => None,
        }
    }
}
