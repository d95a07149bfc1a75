//! The unit the event tree evaluator pushes through treatments: a stand plus
//! its accumulated side-effect data and operation history (spec §3
//! "Payload", §4.6).
use crate::stand::Stand;
use forest_transport::Finalizable;
use std::collections::BTreeMap;

/// One applied treatment, recorded for condition guards that look back over
/// the run (spec §4.4's minimum-time-interval-since-treatment guard).
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEntry {
    pub time_point: i32,
    pub treatment: String,
    pub parameters: serde_json::Value,
}

/// Append-only, per-payload record of side effects keyed by treatment name
/// (e.g. `"thin_basal_area"` -> one JSON row per invocation). Kept as loosely
/// typed JSON rather than an enum of known shapes because the set of
/// collected-data kinds is open — new treatments can introduce new keys
/// without touching this type (spec §4.2, "one additional table per declared
/// collected-data kind").
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CollectedData {
    rows: BTreeMap<String, Vec<serde_json::Value>>,
}

impl CollectedData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one row under `kind`.
    pub fn store(&mut self, kind: impl Into<String>, row: serde_json::Value) {
        self.rows.entry(kind.into()).or_default().push(row);
    }

    pub fn rows(&self, kind: &str) -> &[serde_json::Value] {
        self.rows.get(kind).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn kinds(&self) -> impl Iterator<Item = &str> {
        self.rows.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// `{ stand, collected-data, operation-history }`, the value the evaluator
/// threads through every processed-treatment closure (spec §3 "Payload").
#[derive(Debug, Clone)]
pub struct Payload {
    pub stand: Stand,
    pub collected: CollectedData,
    pub history: Vec<HistoryEntry>,
}

impl Payload {
    pub fn new(stand: Stand) -> Self {
        Self {
            stand,
            collected: CollectedData::new(),
            history: Vec::new(),
        }
    }

    /// True iff `treatment` has never been applied, or was last applied more
    /// than `delta` time-points before `now` — the minimum-time-interval
    /// guard's core predicate (spec §4.4).
    pub fn time_since_treatment_satisfies(&self, treatment: &str, now: i32, delta: i32) -> bool {
        match self
            .history
            .iter()
            .rev()
            .find(|entry| entry.treatment == treatment)
        {
            None => true,
            Some(entry) => now - entry.time_point >= delta,
        }
    }

    pub fn record(&mut self, time_point: i32, treatment: impl Into<String>, parameters: serde_json::Value) {
        self.history.push(HistoryEntry {
            time_point,
            treatment: treatment.into(),
            parameters,
        });
    }
}

impl Finalizable for Payload {
    /// Shares the stand's vector columns copy-on-write; history and
    /// collected-data are deep-copied outright since they're small and
    /// mutated wholesale (append-only) rather than column-wise (spec §4.6
    /// step 6).
    fn finalize(&mut self) -> Self {
        Self {
            stand: self.stand.finalize(),
            collected: self.collected.clone(),
            history: self.history.clone(),
        }
    }

    fn is_finalized(&self) -> bool {
        self.stand.is_finalized()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn time_since_treatment_is_true_when_never_applied() {
        let payload = Payload::new(Stand::new("s1", 1.0));
        assert!(payload.time_since_treatment_satisfies("thin_basal_area", 2030, 5));
    }

    #[test]
    fn time_since_treatment_respects_delta() {
        let mut payload = Payload::new(Stand::new("s1", 1.0));
        payload.record(2020, "thin_basal_area", serde_json::json!({}));
        assert!(!payload.time_since_treatment_satisfies("thin_basal_area", 2023, 5));
        assert!(payload.time_since_treatment_satisfies("thin_basal_area", 2025, 5));
    }

    #[test]
    fn finalize_branch_then_diverge_history() {
        let mut payload = Payload::new(Stand::new("s1", 1.0));
        payload.record(2020, "do_nothing", serde_json::json!({}));
        let mut branch = payload.finalize();
        branch.record(2025, "cutting", serde_json::json!({"amount": 10.0}));
        assert_eq!(payload.history.len(), 1);
        assert_eq!(branch.history.len(), 2);
    }

    #[test]
    fn collected_data_store_appends_under_kind() {
        let mut data = CollectedData::new();
        data.store("removed_trees", serde_json::json!({"identifier": "t1"}));
        data.store("removed_trees", serde_json::json!({"identifier": "t2"}));
        assert_eq!(data.rows("removed_trees").len(), 2);
        assert!(data.rows("missing").is_empty());
    }
}
