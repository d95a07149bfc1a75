//! Condition guards (spec C4): predicates checked before/after a treatment
//! applies, evaluated against the payload's operation history.
use forest_core::{ForestError, TimePoint};
use forest_stand::Payload;
use serde::{Deserialize, Serialize};

/// A guard declaration. The canonical guard is
/// `minimum_time_interval_since_treatment(delta, treatment)`: true iff
/// `treatment` has never been applied, or was last applied at least `delta`
/// time-points before the current one (spec §4.4).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Guard {
    MinimumTimeInterval { treatment: String, delta: i32 },
}

impl Guard {
    /// Evaluates the guard at `now` against `payload`'s history. A failing
    /// guard raises [`ForestError::ConditionFailed`], which the evaluator
    /// turns into branch pruning rather than a fatal error.
    pub fn check(&self, payload: &Payload, now: TimePoint) -> Result<(), ForestError> {
        match self {
            Self::MinimumTimeInterval { treatment, delta } => {
                if payload.time_since_treatment_satisfies(treatment, now, *delta) {
                    Ok(())
                } else {
                    Err(ForestError::ConditionFailed(format!(
                        "minimum_time_interval_since_treatment({treatment}, {delta})"
                    )))
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use forest_stand::Stand;

    #[test]
    fn guard_passes_when_treatment_never_applied() {
        let payload = Payload::new(Stand::new("s1", 1.0));
        let guard = Guard::MinimumTimeInterval {
            treatment: "thin_basal_area".into(),
            delta: 5,
        };
        assert!(guard.check(&payload, 2030).is_ok());
    }

    #[test]
    fn guard_fails_within_interval() {
        let mut payload = Payload::new(Stand::new("s1", 1.0));
        payload.record(2020, "thin_basal_area", serde_json::json!({}));
        let guard = Guard::MinimumTimeInterval {
            treatment: "thin_basal_area".into(),
            delta: 5,
        };
        assert_eq!(
            guard.check(&payload, 2023),
            Err(ForestError::ConditionFailed(
                "minimum_time_interval_since_treatment(thin_basal_area, 5)".into()
            ))
        );
        assert!(guard.check(&payload, 2025).is_ok());
    }
}
