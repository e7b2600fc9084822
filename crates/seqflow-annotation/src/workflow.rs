//! `LibraryAnnotation`: orquestador del workflow sobre un `StepChain`.
//!
//! Ciclo de un step:
//! 1. `submit` recibe la entrada del step actual (el último de la cadena).
//! 2. El handler corre dentro de `StepChain::update`; un error lo descarta.
//! 3. Los errores recuperables vuelven como `StepOutcome`; el resto se propaga.
//! 4. `BranchResolver::next` elige el siguiente step y `current` lo crea
//!    heredando el record recién actualizado.
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use seqflow_core::{BranchResolver, ChainError, CommittedIds, DomainCommitter, FactSheet, SessionId, StepArgs, StepChain, StepId, StepRecord,
                   StepStore, Table};
use seqflow_domain::{BarcodeMatchReport, BarcodeRole, Category, DomainError, KitCatalog, SubmissionType, ValidationReport};

use crate::error::WorkflowError;
use crate::facts::{AnnotationFact, AnnotationFacts, BarcodeChoices, ProjectRef};
use crate::handlers::{self, assay::AssaySelection, barcodes};
use crate::steps::{self, AnnotationStep, WORKFLOW_KIND};

/// Datos de la solicitud de secuenciación con que arranca una sesión.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeqRequestInfo {
    pub seq_request_id: i64,
    pub submission_type: SubmissionType,
}

/// Entrada de cada step. El step se deduce de la variante.
#[derive(Debug, Clone, PartialEq)]
pub enum StepInput {
    ProjectSelect { project: ProjectRef },
    AssaySelect(AssaySelection),
    SampleDefinition { samples: Table },
    MultiplexedSampleDefinition { samples: Table },
    OcmAnnotation { mux: Table },
    OligoMuxAnnotation { mux: Table },
    FlexAnnotation { mux: Table },
    PooledLibraryAnnotation { libraries: Table },
    BarcodeMatch(BarcodeChoices),
    /// Kit declarado por el usuario -> id de catálogo, para los que no se
    /// encuentran por nombre.
    IndexKitMapping { kits: BTreeMap<String, i64> },
    FeatureAnnotation { features: Table },
    FeatureKitMapping { kits: BTreeMap<String, i64> },
    OpenStAnnotation { slides: Table },
    VisiumAnnotation { slides: Table },
}

impl StepInput {
    pub fn step(&self) -> AnnotationStep {
        use AnnotationStep as S;
        match self {
            StepInput::ProjectSelect { .. } => S::ProjectSelect,
            StepInput::AssaySelect(_) => S::AssaySelect,
            StepInput::SampleDefinition { .. } => S::SampleDefinition,
            StepInput::MultiplexedSampleDefinition { .. } => S::MultiplexedSampleDefinition,
            StepInput::OcmAnnotation { .. } => S::OcmAnnotation,
            StepInput::OligoMuxAnnotation { .. } => S::OligoMuxAnnotation,
            StepInput::FlexAnnotation { .. } => S::FlexAnnotation,
            StepInput::PooledLibraryAnnotation { .. } => S::PooledLibraryAnnotation,
            StepInput::BarcodeMatch(_) => S::BarcodeMatch,
            StepInput::IndexKitMapping { .. } => S::IndexKitMapping,
            StepInput::FeatureAnnotation { .. } => S::FeatureAnnotation,
            StepInput::FeatureKitMapping { .. } => S::FeatureKitMapping,
            StepInput::OpenStAnnotation { .. } => S::OpenStAnnotation,
            StepInput::VisiumAnnotation { .. } => S::VisiumAnnotation,
        }
    }
}

/// Resultado de `submit`.
#[derive(Debug, Clone, PartialEq)]
pub enum StepOutcome {
    /// El step quedó guardado y la sesión avanzó a `next`.
    Advanced { next: AnnotationStep },
    /// Errores de validación a corregir; la sesión no avanzó.
    Invalid(ValidationReport),
    /// Ningún kit cubre los barcodes de `role`: hay que declarar la
    /// orientación (o elegir un kit del reporte) y reenviar.
    NeedsOrientation { role: BarcodeRole, report: BarcodeMatchReport },
}

pub struct LibraryAnnotation<'c, S: StepStore<AnnotationFact>, C: KitCatalog + ?Sized> {
    chain: StepChain<AnnotationFact, S>,
    resolver: BranchResolver<AnnotationStep, AnnotationFact>,
    catalog: &'c C,
}

impl<'c, S: StepStore<AnnotationFact>, C: KitCatalog + ?Sized> LibraryAnnotation<'c, S, C> {
    /// Abre la sesión o la crea en `project_select` con los datos de la
    /// solicitud.
    pub fn start(store: S, catalog: &'c C, session_id: SessionId, request: SeqRequestInfo) -> Result<Self, WorkflowError> {
        log::debug!("library_annotation:start:start session={session_id} seq_request={}", request.seq_request_id);
        let chain = StepChain::open(store, WORKFLOW_KIND, session_id)?;
        let mut wf = Self { chain,
                            resolver: steps::resolver()?,
                            catalog };
        if wf.chain.is_empty() {
            let mut args = StepArgs::new();
            args.insert("seq_request_id".into(), request.seq_request_id.into());
            args.insert("submission_type_id".into(), request.submission_type.id().into());
            let first = AnnotationStep::ProjectSelect.name();
            wf.chain.current(first, args)?;
            wf.chain.update(first, |r| -> Result<(), WorkflowError> {
                        r.metadata.set(AnnotationFact::SeqRequest(request.seq_request_id));
                        r.metadata.set(AnnotationFact::SubmissionType(request.submission_type));
                        Ok(())
                    })?;
        }
        log::debug!("library_annotation:start:done session={session_id} steps={}", wf.chain.len());
        Ok(wf)
    }

    /// Reanuda una sesión existente.
    pub fn open(store: S, catalog: &'c C, session_id: SessionId) -> Result<Self, WorkflowError> {
        let chain = StepChain::open_existing(store, WORKFLOW_KIND, session_id)?;
        Ok(Self { chain,
                  resolver: steps::resolver()?,
                  catalog })
    }

    pub fn session_id(&self) -> SessionId {
        self.chain.session_id()
    }

    pub fn chain(&self) -> &StepChain<AnnotationFact, S> {
        &self.chain
    }

    /// Step pendiente de envío (el último de la cadena).
    pub fn current_step(&self) -> Result<AnnotationStep, WorkflowError> {
        let name = self.chain.last_step_name().ok_or(ChainError::EmptyChain)?;
        AnnotationStep::from_name(name).ok_or_else(|| WorkflowError::UnknownStep(name.to_string()))
    }

    pub fn record(&self) -> Result<&StepRecord<AnnotationFact>, WorkflowError> {
        Ok(self.chain.get_last()?)
    }

    pub fn facts(&self) -> Result<&FactSheet<AnnotationFact>, WorkflowError> {
        Ok(&self.record()?.metadata)
    }

    pub fn traceback(&self) -> Vec<(&str, &FactSheet<AnnotationFact>)> {
        self.chain.traceback()
    }

    pub fn is_complete(&self) -> bool {
        self.current_step().is_ok_and(|s| s == AnnotationStep::Complete)
    }

    pub fn submit(&mut self, input: StepInput) -> Result<StepOutcome, WorkflowError> {
        let current = self.current_step()?;
        let found = input.step();
        if found != current {
            return Err(WorkflowError::UnexpectedStep { expected: current, found });
        }
        let session = self.chain.session_id();
        log::debug!("library_annotation:submit:start session={session} step={}", current.name());

        let catalog = self.catalog;
        match self.chain.update(current.name(), |record| handlers::apply(record, input, catalog)) {
            Ok(()) => {}
            Err(WorkflowError::Domain(DomainError::Validation(report))) => {
                log::debug!("library_annotation:submit:invalid session={session} step={} errors={}", current.name(), report.len());
                return Ok(StepOutcome::Invalid(report));
            }
            Err(WorkflowError::Domain(e @ DomainError::InvalidSequence { .. })) => {
                let mut report = ValidationReport::default();
                report.push_general(e.to_string());
                return Ok(StepOutcome::Invalid(report));
            }
            Err(WorkflowError::Domain(DomainError::OrientationRequired { role })) => {
                log::debug!("library_annotation:submit:needs_orientation session={session} role={}", role.as_str());
                return Ok(StepOutcome::NeedsOrientation { role, report: self.barcode_report()? });
            }
            Err(e) => {
                log::error!("library_annotation:submit:failed session={session} step={} error={e}", current.name());
                return Err(e);
            }
        }

        let next = self.resolver.next(&self.chain)?;
        self.chain.current(next.name(), StepArgs::new())?;
        log::debug!("library_annotation:submit:done session={session} step={} next={}", current.name(), next.name());
        Ok(StepOutcome::Advanced { next })
    }

    /// Descarta el step pendiente y vuelve al anterior, que puede
    /// reenviarse. Sus tablas se combinan con la nueva entrada.
    pub fn back(&mut self) -> Result<AnnotationStep, WorkflowError> {
        if self.chain.len() <= 1 {
            return Err(WorkflowError::AtFirstStep);
        }
        let (popped, _) = self.chain.pop_last()?;
        let current = self.current_step()?;
        log::debug!("library_annotation:back:done session={} popped={popped} current={}", self.chain.session_id(), current.name());
        Ok(current)
    }

    /// Reporte de coincidencias de barcodes sobre el estado actual.
    pub fn barcode_report(&self) -> Result<BarcodeMatchReport, WorkflowError> {
        barcodes::match_report(self.record()?, self.catalog)
    }

    /// Cierra la sesión: commit de las entidades, archivo opcional del
    /// snapshot y borrado del store.
    ///
    /// Los ids del commit quedan como hecho `Committed` en el step terminal
    /// antes de archivar. Si el archivo o el borrado fallan, un nuevo
    /// `finish` sobre la sesión reabierta devuelve esos ids sin volver a
    /// llamar al committer.
    pub fn finish<D>(mut self, committer: &mut D, archive_to: Option<&mut dyn StepStore<AnnotationFact>>) -> Result<CommittedIds, WorkflowError>
        where D: DomainCommitter<AnnotationFact>
    {
        let current = self.current_step()?;
        if current != AnnotationStep::Complete {
            return Err(WorkflowError::UnexpectedStep { expected: current,
                                                       found: AnnotationStep::Complete });
        }
        let session = self.chain.session_id();
        let committed = self.facts()?.committed().cloned();
        let ids = match committed {
            Some(ids) => {
                log::info!("library_annotation:finish:already_committed session={session} entities={}", ids.total());
                ids
            }
            None => {
                let ids = committer.commit(self.record()?).map_err(|e| WorkflowError::Commit(e.to_string()))?;
                let marker = AnnotationFact::Committed(ids.clone());
                self.chain.update(current.name(), |r| -> Result<(), WorkflowError> {
                              r.metadata.set(marker);
                              Ok(())
                          })?;
                ids
            }
        };
        self.chain.complete(archive_to)?;
        log::debug!("library_annotation:finish:done session={session} entities={}", ids.total());
        Ok(ids)
    }
}
