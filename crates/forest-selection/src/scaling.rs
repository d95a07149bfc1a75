//! Binary-search scaling modes (spec §4.1, "four adjustment modes").
use serde::Deserialize;

/// How the binary search nudges a profile's shares toward the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScalingMode {
    /// Odds-scale a constant multiplier against each row's own share.
    /// Accepts the legacy `odds_trees` spelling as an alias (spec §9 Open
    /// Question: both names denote the same mode).
    #[serde(alias = "odds_trees")]
    OddsUnits,
    /// Odds-scale a constant multiplier against the profile's segment endpoints.
    OddsProfile,
    /// Multiply every segment's share by a constant.
    Scale,
    /// Add a constant to every segment's share.
    Level,
}

/// Whether removal proportions apply to the original stem count or to what
/// remains after earlier selection sets (spec §4.1, `select_from`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectFrom {
    All,
    Remaining,
}
