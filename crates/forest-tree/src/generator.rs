//! Declarative generator expressions (spec §3 "Event tree node", §4.5
//! "Generator semantics").
use std::collections::BTreeMap;

use forest_treatments::Guard;
use serde::{Deserialize, Serialize};

/// One declarative node in a simulation instruction's generator expression.
/// `Sequence`/`Alternatives` compose `Event`s (and sub-generators) across a
/// shared time axis; `Event` is the leaf that becomes exactly one new tree
/// node per current parent at build time.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Generator {
    Event(EventDecl),
    Sequence(Vec<Generator>),
    Alternatives(Vec<Generator>),
}

/// An undifferentiated keyword bundle plus the file-parameters that resolve
/// to on-disk paths (spec §4.5 (a)-(e)). `treatment` names the
/// [`forest_treatments::Treatment`] variant to deserialize the merged
/// bundle into.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventDecl {
    pub treatment: String,
    #[serde(default)]
    pub parameters: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    pub file_parameters: BTreeMap<String, String>,
    #[serde(default)]
    pub preconditions: Vec<Guard>,
    #[serde(default)]
    pub postconditions: Vec<Guard>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub collected_data_kinds: Vec<String>,
}

/// One declared simulation instruction: a sorted list of time points paired
/// with the generator expression contributed at each of them, plus optional
/// guards applied to every event that instruction contributes (spec §6
/// `simulation_instructions`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationInstruction {
    pub time_points: Vec<forest_core::TimePoint>,
    pub events: Generator,
    #[serde(default)]
    pub conditions: Vec<Guard>,
}
