//! Recursive pre-order evaluator: applies processed treatments down every
//! branch of the event tree, persisting each visited node and collecting one
//! final payload per surviving terminal branch (spec §4.6, C6).
use forest_core::{BranchOutcome, ForestError, NodePath};
use forest_stand::Payload;
use forest_transport::Finalizable;
use forest_treatments::TreatmentContext;

use crate::node::TreeNode;
use crate::sink::Sink;

/// Evaluates the whole tree against one stand's starting payload, returning
/// one payload per surviving leaf. A [`ForestError`] means the run is fatal
/// for this stand (declaration or environment failure); the driver logs it
/// and moves to the next stand rather than aborting the batch (spec §4.8).
pub fn evaluate_tree(
    tree: &TreeNode,
    payload: Payload,
    ctx: &TreatmentContext,
    sink: &mut dyn Sink,
) -> Result<Vec<Payload>, ForestError> {
    let mut results = Vec::new();
    match evaluate_node(tree, payload, ctx, sink, &mut Vec::new(), &mut results) {
        Ok(()) => Ok(results),
        Err(BranchOutcome::Pruned(_)) => Ok(results),
        Err(BranchOutcome::Fatal(e)) => Err(e),
    }
}

/// Visits one node: applies its treatment, persists the result, then recurses
/// into its children (spec §4.6 steps 1-5). Terminal nodes (no children) push
/// their payload into `results`.
fn evaluate_node(
    node: &TreeNode,
    payload: Payload,
    ctx: &TreatmentContext,
    sink: &mut dyn Sink,
    path: &mut NodePath,
    results: &mut Vec<Payload>,
) -> Result<(), BranchOutcome> {
    let payload = node.processed.apply(ctx, payload)?;
    sink.record_node(path, &payload)
        .map_err(BranchOutcome::Fatal)?;

    if node.children.is_empty() {
        results.push(payload);
        return Ok(());
    }

    if node.children.len() == 1 {
        path.push(0);
        let outcome = evaluate_node(&node.children[0], payload, ctx, sink, path, results);
        path.pop();
        return outcome;
    }

    let mut all_pruned = true;
    let mut last_pruned = None;
    for (i, child) in node.children.iter().enumerate() {
        let mut shared = payload.clone();
        let branch_payload = shared.finalize();
        path.push(i);
        match evaluate_node(child, branch_payload, ctx, sink, path, results) {
            Ok(()) => all_pruned = false,
            Err(BranchOutcome::Pruned(e)) => last_pruned = Some(e),
            Err(fatal @ BranchOutcome::Fatal(_)) => {
                path.pop();
                return Err(fatal);
            }
        }
        path.pop();
    }

    if all_pruned {
        return Err(BranchOutcome::Pruned(
            last_pruned.unwrap_or(ForestError::AllChildrenAborted),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::{EventDecl, Generator, SimulationInstruction};
    use crate::node::ProcessedTreatment;
    use crate::sink::NullSink;
    use forest_stand::Stand;
    use forest_treatments::UnboundedTable;

    fn ctx() -> TreatmentContext<'static> {
        static TABLE: UnboundedTable = UnboundedTable;
        TreatmentContext {
            growth: &forest_treatments::NullGrowth,
            basal_area_limit: &TABLE,
            stems_after_thinning: &TABLE,
        }
    }

    fn do_nothing_event() -> Generator {
        Generator::Event(EventDecl {
            treatment: "do_nothing".into(),
            parameters: Default::default(),
            file_parameters: Default::default(),
            preconditions: Vec::new(),
            postconditions: Vec::new(),
            tags: Vec::new(),
            collected_data_kinds: Vec::new(),
        })
    }

    #[test]
    fn a_single_chain_produces_one_terminal_payload() {
        let instructions = vec![SimulationInstruction {
            time_points: vec![0, 1, 2, 3],
            events: Generator::Sequence(vec![
                do_nothing_event(),
                do_nothing_event(),
                do_nothing_event(),
                do_nothing_event(),
            ]),
            conditions: Vec::new(),
        }];
        let tree = crate::builder::build_tree(&instructions).unwrap();
        let payload = Payload::new(Stand::new("s1", 1.0));
        let mut sink = NullSink;
        let results = evaluate_tree(&tree, payload, &ctx(), &mut sink).unwrap();
        assert_eq!(results.len(), 1);
        // root + 4 do_nothing events = 5 history entries
        assert_eq!(results[0].history.len(), 5);
    }

    #[test]
    fn alternatives_produce_one_terminal_payload_per_branch() {
        let instructions = vec![SimulationInstruction {
            time_points: vec![0],
            events: Generator::Sequence(vec![
                do_nothing_event(),
                Generator::Alternatives(vec![do_nothing_event(), do_nothing_event(), do_nothing_event()]),
            ]),
            conditions: Vec::new(),
        }];
        let tree = crate::builder::build_tree(&instructions).unwrap();
        let payload = Payload::new(Stand::new("s1", 1.0));
        let mut sink = NullSink;
        let results = evaluate_tree(&tree, payload, &ctx(), &mut sink).unwrap();
        assert_eq!(results.len(), 3);
    }

    #[test]
    fn a_guard_failure_on_every_branch_prunes_the_whole_run() {
        use forest_treatments::Guard;
        let mut event = EventDecl {
            treatment: "do_nothing".into(),
            parameters: Default::default(),
            file_parameters: Default::default(),
            preconditions: vec![Guard::MinimumTimeInterval {
                treatment: "do_nothing".into(),
                delta: 100,
            }],
            postconditions: Vec::new(),
            tags: Vec::new(),
            collected_data_kinds: Vec::new(),
        };
        // first event always applies (no prior history); reuse it twice so
        // the second copy's guard is checked against a payload that already
        // recorded one do_nothing and so fails for any delta > 0.
        let guarded = event.clone();
        event.preconditions.clear();
        let instructions = vec![SimulationInstruction {
            time_points: vec![0, 1],
            events: Generator::Sequence(vec![Generator::Event(event), Generator::Event(guarded)]),
            conditions: Vec::new(),
        }];
        let tree = crate::builder::build_tree(&instructions).unwrap();
        let payload = Payload::new(Stand::new("s1", 1.0));
        let mut sink = NullSink;
        let results = evaluate_tree(&tree, payload, &ctx(), &mut sink).unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn alternatives_of_single_events_match_alternatives_of_sequences_of_one() {
        let a = Generator::Sequence(vec![Generator::Alternatives(vec![
            do_nothing_event(),
            do_nothing_event(),
        ])]);
        let b = Generator::Sequence(vec![Generator::Alternatives(vec![
            Generator::Sequence(vec![do_nothing_event()]),
            Generator::Sequence(vec![do_nothing_event()]),
        ])]);
        for events in [a, b] {
            let instructions = vec![SimulationInstruction {
                time_points: vec![0],
                events,
                conditions: Vec::new(),
            }];
            let tree = crate::builder::build_tree(&instructions).unwrap();
            let payload = Payload::new(Stand::new("s1", 1.0));
            let mut sink = NullSink;
            let results = evaluate_tree(&tree, payload, &ctx(), &mut sink).unwrap();
            assert_eq!(results.len(), 2);
        }
    }
}
