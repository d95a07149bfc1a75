//! Piecewise-linear selection profiles (spec §4.1, "profile").
use forest_core::ForestError;
use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfileXMode {
    /// x coordinates are absolute values of the order variable.
    Absolute,
    /// x coordinates are normalized against the order variable's observed range.
    Relative,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfileXScale {
    /// Normalize against the order variable's min/max over the whole stand.
    All,
    /// Normalize against the order variable's min/max within the current set.
    Set,
}

/// A piecewise-linear profile: `x` are order-variable break points, `y` are
/// the corresponding selection shares in `[0, 1]`. Adjacent points define one
/// linear segment each.
#[derive(Debug, Clone)]
pub struct Profile {
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    pub xmode: ProfileXMode,
    pub xscale: Option<ProfileXScale>,
}

impl Profile {
    pub fn new(x: Vec<f64>, y: Vec<f64>, xmode: ProfileXMode, xscale: Option<ProfileXScale>) -> Self {
        Self { x, y, xmode, xscale }
    }

    /// Validates that every y value is within `[0, 1]` (spec §4.1 invariant).
    pub fn validate(&self, set_index: usize) -> Result<(), ForestError> {
        for &v in &self.y {
            if !(0.0..=1.0).contains(&v) {
                return Err(ForestError::InvalidProfile { set_index, value: v });
            }
        }
        Ok(())
    }
}
