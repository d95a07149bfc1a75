//! Control-structure schema (spec §6: `app_configuration`,
//! `preprocessing_operations`/`_params`, `simulation_instructions`,
//! `post_processing`/`export`/`export_prepro`).
use std::collections::BTreeMap;
use std::path::Path;
use std::str::FromStr;

use forest_core::ForestError;
use forest_tree::SimulationInstruction;
use serde::{Deserialize, Serialize};

/// One of the ordered phases a run can be asked to perform (spec §6
/// `run_modes`). `Preprocess`/`Export`/`ExportPrepro`/`PostProcess` are
/// accepted and logged but executed as no-ops: their external adapters
/// (file-format conversion, output writers) live outside this workspace
/// per spec §1 Non-goals. Only `Simulate` drives the event tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    Preprocess,
    Simulate,
    Export,
    ExportPrepro,
    PostProcess,
}

impl FromStr for RunMode {
    type Err = ForestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "preprocess" => Ok(Self::Preprocess),
            "simulate" => Ok(Self::Simulate),
            "export" => Ok(Self::Export),
            "export_prepro" => Ok(Self::ExportPrepro),
            "post_process" | "postprocess" => Ok(Self::PostProcess),
            other => Err(ForestError::UnknownRunMode(other.to_string())),
        }
    }
}

/// `spec.md` §6's top-level application settings. Only `run_modes` drives
/// this binary's behavior; everything else in the section is carried
/// through opaquely since its shape belongs to the external adapters spec
/// §1 excludes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfiguration {
    #[serde(default)]
    pub run_modes: Vec<RunMode>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// The full control file (spec §6). This binary only executes
/// `simulation_instructions` (spec C5/C6) against `app_configuration`'s
/// `run_modes`; the other sections are logged and skipped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControlStructure {
    pub app_configuration: AppConfiguration,
    #[serde(default)]
    pub preprocessing_operations: Vec<serde_json::Value>,
    #[serde(default)]
    pub preprocessing_params: serde_json::Value,
    #[serde(default)]
    pub simulation_instructions: Vec<SimulationInstruction>,
    #[serde(default)]
    pub post_processing: Option<serde_json::Value>,
    #[serde(default)]
    pub export: Option<serde_json::Value>,
    #[serde(default)]
    pub export_prepro: Option<serde_json::Value>,
}

impl ControlStructure {
    pub fn load(path: &Path) -> Result<Self, ForestError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ForestError::Environment(format!("reading control file {}: {e}", path.display())))?;
        serde_json::from_str(&content)
            .map_err(|e| ForestError::Environment(format!("parsing control file {}: {e}", path.display())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_mode_accepts_hyphen_and_underscore_spellings() {
        assert_eq!(RunMode::from_str("export-prepro").unwrap(), RunMode::ExportPrepro);
        assert_eq!(RunMode::from_str("post_process").unwrap(), RunMode::PostProcess);
        assert_eq!(RunMode::from_str("SIMULATE").unwrap(), RunMode::Simulate);
    }

    #[test]
    fn run_mode_rejects_unknown_values() {
        assert!(matches!(RunMode::from_str("optimize"), Err(ForestError::UnknownRunMode(_))));
    }

    #[test]
    fn control_structure_round_trips_through_json() {
        let json = serde_json::json!({
            "app_configuration": {"run_modes": ["simulate"]},
            "simulation_instructions": [],
        });
        let control: ControlStructure = serde_json::from_value(json).unwrap();
        assert_eq!(control.app_configuration.run_modes, vec![RunMode::Simulate]);
        assert!(control.simulation_instructions.is_empty());
    }
}
