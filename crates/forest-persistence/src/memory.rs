//! In-memory sink (spec §4.7 AMBIENT): the default, and the implementation
//! tests and the CLI's dry-run mode exercise, matching the teacher's
//! `BTreeMap`-backed test doubles rather than standing up a real database.
use std::collections::BTreeMap;

use forest_core::{ForestError, NodePath};
use forest_stand::{Payload, StandId};
use forest_tree::Sink;

#[derive(Debug, Clone, PartialEq)]
pub struct NodeRow {
    pub path: NodePath,
    pub stand_id: StandId,
    pub treatment: String,
    pub parameters: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StandRow {
    pub path: NodePath,
    pub stand_id: StandId,
    pub area: f64,
    pub degree_days: Option<i32>,
    pub site_class: i32,
    pub soil_class: i32,
    pub dominant_species: i32,
    pub dominant_storey_age: f64,
    pub dominant_height: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TreeRow {
    pub path: NodePath,
    pub stand_id: StandId,
    pub index: usize,
    pub record: forest_stand::TreeRecord,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StrataRow {
    pub path: NodePath,
    pub stand_id: StandId,
    pub index: usize,
    pub record: forest_stand::StratumRecord,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CollectedRow {
    pub path: NodePath,
    pub stand_id: StandId,
    pub row: serde_json::Value,
}

/// An append-only, in-process implementation of the logical schema (spec
/// §4.7): one `Vec` per fixed table, one more `Vec` per collected-data kind.
/// Used as the default sink and by tests, matching the teacher's preference
/// for a plain in-memory structure over a database in unit tests.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub nodes: Vec<NodeRow>,
    pub stands: Vec<StandRow>,
    pub trees: Vec<TreeRow>,
    pub strata: Vec<StrataRow>,
    pub collected: BTreeMap<String, Vec<CollectedRow>>,
    row_counts: BTreeMap<(NodePath, String), usize>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Sink for MemorySink {
    fn record_node(&mut self, path: &NodePath, payload: &Payload) -> Result<(), ForestError> {
        let stand_id = payload.stand.identifier.clone();
        let treatment = payload
            .history
            .last()
            .map(|h| h.treatment.clone())
            .unwrap_or_else(|| "root".to_string());
        let parameters = payload
            .history
            .last()
            .map(|h| h.parameters.clone())
            .unwrap_or(serde_json::Value::Null);

        self.nodes.push(NodeRow {
            path: path.clone(),
            stand_id: stand_id.clone(),
            treatment,
            parameters,
        });

        self.stands.push(StandRow {
            path: path.clone(),
            stand_id: stand_id.clone(),
            area: payload.stand.area,
            degree_days: payload.stand.degree_days,
            site_class: payload.stand.site_class,
            soil_class: payload.stand.soil_class,
            dominant_species: payload.stand.dominant_species,
            dominant_storey_age: payload.stand.dominant_storey_age,
            dominant_height: payload.stand.dominant_height,
        });

        for i in 0..payload.stand.reference_trees.len() {
            self.trees.push(TreeRow {
                path: path.clone(),
                stand_id: stand_id.clone(),
                index: i,
                record: payload.stand.reference_trees.read(i),
            });
        }

        for i in 0..payload.stand.tree_strata.len() {
            self.strata.push(StrataRow {
                path: path.clone(),
                stand_id: stand_id.clone(),
                index: i,
                record: payload.stand.tree_strata.read(i),
            });
        }

        let parent_path: NodePath = path[..path.len().saturating_sub(1)].to_vec();
        for kind in payload.collected.kinds().map(str::to_string).collect::<Vec<_>>() {
            let rows = payload.collected.rows(&kind);
            let total = rows.len();
            let prior = self
                .row_counts
                .get(&(parent_path.clone(), kind.clone()))
                .copied()
                .unwrap_or(0)
                .min(total);
            for row in &rows[prior..total] {
                self.collected.entry(kind.clone()).or_default().push(CollectedRow {
                    path: path.clone(),
                    stand_id: stand_id.clone(),
                    row: row.clone(),
                });
            }
            self.row_counts.insert((path.clone(), kind), total);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use forest_stand::Stand;

    #[test]
    fn records_one_node_and_stand_row_per_call() {
        let mut sink = MemorySink::new();
        let payload = Payload::new(Stand::new("s1", 1.0));
        sink.record_node(&vec![], &payload).unwrap();
        sink.record_node(&vec![0], &payload).unwrap();
        assert_eq!(sink.nodes.len(), 2);
        assert_eq!(sink.stands.len(), 2);
        assert_eq!(sink.nodes[0].path, Vec::<usize>::new());
        assert_eq!(sink.nodes[1].path, vec![0]);
    }

    #[test]
    fn collected_rows_are_only_recorded_once_per_branch() {
        let mut sink = MemorySink::new();
        let mut payload = Payload::new(Stand::new("s1", 1.0));
        payload.collected.store("removed_trees", serde_json::json!({"identifier": "t1"}));
        sink.record_node(&vec![], &payload).unwrap();
        // simulate a child that inherits the same collected rows unchanged
        sink.record_node(&vec![0], &payload).unwrap();
        assert_eq!(sink.collected.get("removed_trees").map(Vec::len), Some(1));
    }

    #[test]
    fn new_collected_rows_at_a_child_are_appended_as_a_delta() {
        let mut sink = MemorySink::new();
        let mut root_payload = Payload::new(Stand::new("s1", 1.0));
        root_payload.collected.store("removed_trees", serde_json::json!({"identifier": "t1"}));
        sink.record_node(&vec![], &root_payload).unwrap();

        let mut child_payload = root_payload.clone();
        child_payload.collected.store("removed_trees", serde_json::json!({"identifier": "t2"}));
        sink.record_node(&vec![0], &child_payload).unwrap();

        assert_eq!(sink.collected.get("removed_trees").map(Vec::len), Some(2));
    }
}
