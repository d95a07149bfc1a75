//! Target declarations: how much of a tree-level variable a selection or
//! selection set is required to accumulate (spec §4.1, target types).
use forest_transport::ColumnSource;
use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetType {
    /// Selected stems accumulate `amount` units of the target variable.
    Absolute,
    /// Selected stems accumulate `amount` (in `[0, 1]`) of the variable's total.
    Relative,
    /// Selected stems accumulate `total - amount` units of the variable.
    AbsoluteRemain,
    /// Selected stems accumulate `(1 - amount)` of the variable's total.
    RelativeRemain,
}

/// A target declaration. Resolves to an unbounded (`+inf`) target when any
/// of its three fields is absent, per spec §9's Open-Question resolution:
/// an absent target declaration never halts the selection loop early.
#[derive(Debug, Clone, Default)]
pub struct Target {
    pub var: Option<String>,
    pub target_type: Option<TargetType>,
    pub amount: Option<f64>,
}

impl Target {
    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn new(var: impl Into<String>, target_type: TargetType, amount: f64) -> Self {
        Self {
            var: Some(var.into()),
            target_type: Some(target_type),
            amount: Some(amount),
        }
    }

    pub fn is_unbounded(&self) -> bool {
        self.var.is_none() || self.target_type.is_none() || self.amount.is_none()
    }

    /// Computes the target amount in absolute units, over the rows where
    /// `mask` is true, using `freq_var` as the stems-per-ha column.
    /// Unbounded targets evaluate to `+inf`; negative amounts clamp to zero.
    pub fn amount_for(&self, data: &dyn ColumnSource, mask: &[bool], freq_var: &str) -> f64 {
        let (var, target_type, amount) = match (&self.var, &self.target_type, self.amount) {
            (Some(v), Some(t), Some(a)) => (v, t, a),
            _ => return f64::INFINITY,
        };
        let freq = data.column(freq_var).unwrap_or(&[]);
        let sum_freq = masked_sum(freq, mask);
        let sum_weighted = || -> f64 {
            if var == freq_var {
                sum_freq
            } else {
                let values = data.column(var).unwrap_or(&[]);
                masked_weighted_sum(freq, values, mask)
            }
        };
        let amount = match target_type {
            TargetType::Absolute => amount,
            TargetType::Relative => amount * sum_weighted(),
            TargetType::AbsoluteRemain => sum_weighted() - amount,
            TargetType::RelativeRemain => (1.0 - amount) * sum_weighted(),
        };
        amount.max(0.0)
    }
}

fn masked_sum(values: &[f64], mask: &[bool]) -> f64 {
    values
        .iter()
        .zip(mask)
        .filter(|(_, &m)| m)
        .map(|(v, _)| *v)
        .sum()
}

fn masked_weighted_sum(freq: &[f64], values: &[f64], mask: &[bool]) -> f64 {
    freq.iter()
        .zip(values)
        .zip(mask)
        .filter(|((_, _), &m)| m)
        .map(|((f, v), _)| f * v)
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Cols {
        f: Vec<f64>,
        g: Vec<f64>,
    }
    impl ColumnSource for Cols {
        fn len(&self) -> usize {
            self.f.len()
        }
        fn column(&self, name: &str) -> Option<&[f64]> {
            match name {
                "f" => Some(&self.f),
                "g" => Some(&self.g),
                _ => None,
            }
        }
    }

    #[test]
    fn unbounded_target_is_infinite() {
        let target = Target::unbounded();
        let data = Cols { f: vec![1.0], g: vec![1.0] };
        assert_eq!(target.amount_for(&data, &[true], "f"), f64::INFINITY);
    }

    #[test]
    fn relative_on_freq_var() {
        let target = Target::new("f", TargetType::Relative, 0.5);
        let data = Cols {
            f: vec![100.0, 100.0],
            g: vec![1.0, 1.0],
        };
        assert_eq!(target.amount_for(&data, &[true, true], "f"), 100.0);
    }

    #[test]
    fn absolute_remain_on_weighted_variable() {
        let target = Target::new("g", TargetType::AbsoluteRemain, 10.0);
        let data = Cols {
            f: vec![10.0, 10.0],
            g: vec![2.0, 3.0],
        };
        // sum(f*g) = 20+30 = 50, remain target = 50-10 = 40
        assert_eq!(target.amount_for(&data, &[true, true], "f"), 40.0);
    }

    #[test]
    fn negative_amount_clamps_to_zero() {
        let target = Target::new("f", TargetType::AbsoluteRemain, 1000.0);
        let data = Cols { f: vec![10.0], g: vec![1.0] };
        assert_eq!(target.amount_for(&data, &[true], "f"), 0.0);
    }
}
