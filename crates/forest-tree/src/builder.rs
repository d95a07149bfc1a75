//! Compiles a unified time axis of declarative `simulation_instructions`
//! into an explicit event tree (spec §4.5).
use std::collections::BTreeSet;
use std::path::Path;

use forest_core::{ForestError, TimePoint};
use forest_treatments::{Guard, Treatment};

use crate::generator::{EventDecl, Generator, SimulationInstruction};
use crate::node::{ProcessedTreatment, TreeNode};

struct Arena {
    nodes: Vec<NodeSlot>,
}

struct NodeSlot {
    processed: ProcessedTreatment,
    children: Vec<usize>,
}

impl Arena {
    fn push(&mut self, processed: ProcessedTreatment) -> usize {
        self.nodes.push(NodeSlot { processed, children: Vec::new() });
        self.nodes.len() - 1
    }
}

/// Builds the event tree once for a run, from the control structure's
/// `simulation_instructions` (spec §4.5, §4.8 "build tree once").
pub fn build_tree(instructions: &[SimulationInstruction]) -> Result<TreeNode, ForestError> {
    let mut arena = Arena { nodes: Vec::new() };
    let root_processed = ProcessedTreatment {
        time_point: instructions
            .iter()
            .flat_map(|i| i.time_points.iter().copied())
            .min()
            .unwrap_or(0),
        treatment: Treatment::DoNothing,
        preconditions: Vec::new(),
        postconditions: Vec::new(),
        tags: Vec::new(),
    };
    let root = arena.push(root_processed);
    let mut frontier = vec![root];

    let time_points: BTreeSet<TimePoint> = instructions
        .iter()
        .flat_map(|i| i.time_points.iter().copied())
        .collect();

    for t in time_points {
        for instruction in instructions.iter().filter(|i| i.time_points.contains(&t)) {
            frontier = expand(&instruction.events, &frontier, t, &instruction.conditions, &mut arena)?;
        }
    }

    Ok(materialize(&arena, root))
}

fn expand(
    generator: &Generator,
    frontier: &[usize],
    time_point: TimePoint,
    instruction_conditions: &[Guard],
    arena: &mut Arena,
) -> Result<Vec<usize>, ForestError> {
    match generator {
        Generator::Event(decl) => {
            let mut new_frontier = Vec::with_capacity(frontier.len());
            for &parent in frontier {
                let processed = build_event(decl, time_point, instruction_conditions)?;
                let idx = arena.push(processed);
                arena.nodes[parent].children.push(idx);
                new_frontier.push(idx);
            }
            Ok(new_frontier)
        }
        Generator::Sequence(children) => {
            let mut current = frontier.to_vec();
            for child in children {
                current = expand(child, &current, time_point, instruction_conditions, arena)?;
            }
            Ok(current)
        }
        Generator::Alternatives(children) => {
            let mut result = Vec::new();
            for child in children {
                result.extend(expand(child, frontier, time_point, instruction_conditions, arena)?);
            }
            Ok(result)
        }
    }
}

/// Validates and curries one `Event` into a [`ProcessedTreatment`] (spec
/// §4.5 (a)-(e)).
fn build_event(
    decl: &EventDecl,
    time_point: TimePoint,
    instruction_conditions: &[Guard],
) -> Result<ProcessedTreatment, ForestError> {
    let overlap: Vec<String> = decl
        .parameters
        .keys()
        .filter(|k| decl.file_parameters.contains_key(*k))
        .cloned()
        .collect();
    if !overlap.is_empty() {
        return Err(ForestError::ParameterConflict(overlap));
    }

    let mut merged = serde_json::Map::new();
    merged.insert("treatment".to_string(), serde_json::Value::String(decl.treatment.clone()));
    for (k, v) in &decl.parameters {
        merged.insert(k.clone(), v.clone());
    }
    for (k, path) in &decl.file_parameters {
        let resolved = forest_core::resolve_execdir(path);
        if !Path::new(&resolved).exists() {
            return Err(ForestError::FileNotFound(resolved));
        }
        let content = std::fs::read_to_string(&resolved)
            .map_err(|e| ForestError::Environment(format!("reading file parameter '{k}' at {resolved}: {e}")))?;
        let value = serde_json::from_str(&content).unwrap_or(serde_json::Value::String(content));
        merged.insert(k.clone(), value);
    }

    let treatment: Treatment = serde_json::from_value(serde_json::Value::Object(merged))
        .map_err(|e| ForestError::InvalidParameters(format!("{}: {e}", decl.treatment)))?;

    let mut preconditions = decl.preconditions.clone();
    preconditions.extend(instruction_conditions.iter().cloned());

    Ok(ProcessedTreatment {
        time_point,
        treatment,
        preconditions,
        postconditions: decl.postconditions.clone(),
        tags: decl.tags.clone(),
    })
}

fn materialize(arena: &Arena, idx: usize) -> TreeNode {
    let slot = &arena.nodes[idx];
    TreeNode {
        processed: slot.processed.clone(),
        children: slot.children.iter().map(|&c| materialize(arena, c)).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::EventDecl;

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
    fn sequence_builds_a_linear_chain() {
        let instructions = vec![SimulationInstruction {
            time_points: vec![0, 1],
            events: Generator::Sequence(vec![do_nothing_event(), do_nothing_event()]),
            conditions: Vec::new(),
        }];
        let root = build_tree(&instructions).unwrap();
        // at t=0: one do_nothing; at t=1: one more, sequentially -> depth 2 beneath root
        assert_eq!(root.children.len(), 1);
        assert_eq!(root.children[0].children.len(), 1);
    }

    #[test]
    fn alternatives_fan_out_from_the_same_parent() {
        let instructions = vec![SimulationInstruction {
            time_points: vec![0],
            events: Generator::Sequence(vec![
                do_nothing_event(),
                Generator::Alternatives(vec![do_nothing_event(), do_nothing_event()]),
            ]),
            conditions: Vec::new(),
        }];
        let root = build_tree(&instructions).unwrap();
        assert_eq!(root.children.len(), 1);
        assert_eq!(root.children[0].children.len(), 2);
    }

    #[test]
    fn parameter_conflict_is_a_build_time_error() {
        let mut decl = EventDecl {
            treatment: "soil_surface_preparation".into(),
            parameters: Default::default(),
            file_parameters: Default::default(),
            preconditions: Vec::new(),
            postconditions: Vec::new(),
            tags: Vec::new(),
            collected_data_kinds: Vec::new(),
        };
        decl.parameters.insert("method".into(), serde_json::json!("mounding"));
        decl.file_parameters.insert("method".into(), "/tmp/does-not-matter".into());
        let instructions = vec![SimulationInstruction {
            time_points: vec![0],
            events: Generator::Event(decl),
            conditions: Vec::new(),
        }];
        let err = build_tree(&instructions).unwrap_err();
        assert!(matches!(err, ForestError::ParameterConflict(_)));
    }

    #[test]
    fn missing_file_parameter_is_a_build_time_error() {
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
        let instructions = vec![SimulationInstruction {
            time_points: vec![0],
            events: Generator::Event(decl),
            conditions: Vec::new(),
        }];
        let err = build_tree(&instructions).unwrap_err();
        assert!(matches!(err, ForestError::FileNotFound(_)));
    }
}
