//! Event-tree nodes: a captured, guard-wrapped treatment application plus
//! its child branches (spec §3 "Event tree node", §4.5 "processed-treatment").
use forest_core::{BranchOutcome, TimePoint};
use forest_stand::Payload;
use forest_treatments::{Guard, Treatment, TreatmentContext};

/// A parameter-captured, guard-wrapped, history-appending closure of one
/// treatment at one time-point (spec GLOSSARY "Processed-treatment").
#[derive(Debug, Clone)]
pub struct ProcessedTreatment {
    pub time_point: TimePoint,
    pub treatment: Treatment,
    pub preconditions: Vec<Guard>,
    pub postconditions: Vec<Guard>,
    pub tags: Vec<String>,
}

impl ProcessedTreatment {
    /// Checks preconditions, applies the treatment, checks postconditions,
    /// and on success appends a history entry (spec §4.5(e), §4.6 step 1).
    pub fn apply(&self, ctx: &TreatmentContext, payload: Payload) -> Result<Payload, BranchOutcome> {
        for guard in &self.preconditions {
            guard.check(&payload, self.time_point).map_err(BranchOutcome::from)?;
        }
        let mut payload = forest_treatments::apply(&self.treatment, self.time_point, ctx, payload)
            .map_err(BranchOutcome::from)?;
        for guard in &self.postconditions {
            guard.check(&payload, self.time_point).map_err(BranchOutcome::from)?;
        }
        let params = serde_json::to_value(&self.treatment).unwrap_or(serde_json::Value::Null);
        payload.record(self.time_point, self.treatment.name(), params);
        Ok(payload)
    }
}

/// `{ processed-treatment, list of child branches }` (spec §3).
#[derive(Debug, Clone)]
pub struct TreeNode {
    pub processed: ProcessedTreatment,
    pub children: Vec<TreeNode>,
}

impl TreeNode {
    pub fn leaf(processed: ProcessedTreatment) -> Self {
        Self { processed, children: Vec::new() }
    }
}
