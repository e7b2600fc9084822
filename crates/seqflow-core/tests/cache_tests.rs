mod common;

use common::{Facts, Key, KIND};
use seqflow_core::store::session_key;
use seqflow_core::{CachedStepStore, ChainError, InMemoryStepStore, SessionId, StepArgs, StepChain, WorkflowCache};

#[test]
fn chain_writes_keep_cache_fresh() {
    let cache: WorkflowCache<Facts> = WorkflowCache::new();
    let id = SessionId::new();
    let mut chain = StepChain::open(CachedStepStore::new(InMemoryStepStore::new(), cache.clone()), KIND, id).unwrap();
    chain.current("a", StepArgs::new()).unwrap();
    chain.update("a", |r| -> Result<(), ChainError> {
             r.metadata.set(Facts::Assay("atac".into()));
             Ok(())
         })
         .unwrap();

    let cached = cache.get(&session_key(KIND, id)).unwrap();
    assert_eq!(cached.steps["a"].metadata.get(Key::Assay), Some(&Facts::Assay("atac".into())));
}

#[test]
fn cache_serves_reads_without_backend() {
    let cache: WorkflowCache<Facts> = WorkflowCache::new();
    let id = SessionId::new();
    {
        let mut chain = StepChain::open(CachedStepStore::new(InMemoryStepStore::new(), cache.clone()), KIND, id).unwrap();
        chain.current("a", StepArgs::new()).unwrap();
    }
    // backend nuevo y vacío: la sesión sólo existe en la cache compartida
    let chain = StepChain::open_existing(CachedStepStore::new(InMemoryStepStore::new(), cache.clone()), KIND, id).unwrap();
    assert_eq!(chain.step_names(), vec!["a"]);
}

#[test]
fn completion_purges_cache() {
    let cache: WorkflowCache<Facts> = WorkflowCache::new();
    let id = SessionId::new();
    let mut chain = StepChain::open(CachedStepStore::new(InMemoryStepStore::new(), cache.clone()), KIND, id).unwrap();
    chain.current("a", StepArgs::new()).unwrap();
    chain.complete(None).unwrap();
    assert!(!cache.contains(&session_key(KIND, id)));
}
