mod common;

use common::{Facts, Key, Step, KIND};
use seqflow_core::{BranchResolver, BranchRule, ChainError, InMemoryStepStore, SessionId, StepArgs, StepChain, StepId, StepRecord};

fn multiplexed(r: &StepRecord<Facts>) -> bool {
    r.metadata.get(Key::Multiplexed) == Some(&Facts::Multiplexed(true))
}

fn has_samples(r: &StepRecord<Facts>) -> bool {
    r.has_table("sample_table")
}

fn resolver() -> BranchResolver<Step, Facts> {
    BranchResolver::new(vec![BranchRule::new(Step::Samples, |_| true),
                             BranchRule::new(Step::Multiplexing, multiplexed),
                             BranchRule::new(Step::Libraries, has_samples)],
                        Step::Complete).unwrap()
}

#[test]
fn next_is_deterministic_for_unchanged_chain() {
    let mut chain: StepChain<Facts, _> = StepChain::open(InMemoryStepStore::new(), KIND, SessionId::new()).unwrap();
    chain.current(Step::Samples.name(), StepArgs::new()).unwrap();
    chain.update(Step::Samples.name(), |r| -> Result<(), ChainError> {
             r.metadata.set(Facts::Multiplexed(true));
             Ok(())
         })
         .unwrap();

    let res = resolver();
    let first = res.next(&chain).unwrap();
    let second = res.next(&chain).unwrap();
    assert_eq!(first, second);
    assert_eq!(first, Step::Multiplexing);
}

#[test]
fn walk_reaches_terminal() {
    let res = resolver();
    let mut chain: StepChain<Facts, _> = StepChain::open(InMemoryStepStore::new(), KIND, SessionId::new()).unwrap();
    chain.current(Step::Samples.name(), StepArgs::new()).unwrap();

    let mut visited = vec![Step::Samples];
    loop {
        let next = res.next(&chain).unwrap();
        visited.push(next);
        if next == res.terminal() {
            break;
        }
        chain.current(next.name(), StepArgs::new()).unwrap();
    }
    // sin multiplexing ni tabla de muestras se va directo al terminal
    assert_eq!(visited, vec![Step::Samples, Step::Complete]);
}

#[test]
fn popping_a_step_reopens_its_branch() {
    let res = resolver();
    let mut chain: StepChain<Facts, _> = StepChain::open(InMemoryStepStore::new(), KIND, SessionId::new()).unwrap();
    chain.current(Step::Samples.name(), StepArgs::new()).unwrap();
    chain.update(Step::Samples.name(), |r| -> Result<(), ChainError> {
             r.metadata.set(Facts::Multiplexed(true));
             Ok(())
         })
         .unwrap();
    chain.current(Step::Multiplexing.name(), StepArgs::new()).unwrap();
    assert_eq!(res.next(&chain).unwrap(), Step::Complete);

    chain.pop_last().unwrap();
    assert_eq!(res.next(&chain).unwrap(), Step::Multiplexing);
}
