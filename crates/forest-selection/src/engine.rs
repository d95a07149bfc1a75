//! The tree-selection routine itself: for each reference tree, how many
//! stems (per ha) are needed to meet a declared target (spec §4.1).
use crate::profile::{Profile, ProfileXMode, ProfileXScale};
use crate::scaling::{ScalingMode, SelectFrom};
use crate::set::SelectionSet;
use crate::target::{Target, TargetType};
use forest_core::ForestError;
use forest_core::{
    ODDS_SEARCH_SCALE_HIGH, ODDS_SEARCH_SCALE_LOW, ODDS_SEARCH_STEP_HIGH, ODDS_SEARCH_STEP_LOW,
    SELECTION_STEP_FLOOR, SELECTION_TOLERANCE_CEILING, SELECTION_TOLERANCE_FACTOR,
    SELECTION_TOLERANCE_FLOOR,
};
use forest_transport::ColumnSource;

/// Selects stems per reference tree/stratum row, deploying `sets` in order
/// until `target_decl` is met or every set has been exhausted.
///
/// Only as many selection sets are used as are needed for the overall
/// target; each set's own target caps how much it contributes. Returns one
/// removed-stems value per row of `data`, in the same order.
pub fn select_units(
    data: &dyn ColumnSource,
    target_decl: &Target,
    sets: &[SelectionSet],
    freq_var: &str,
    select_from: SelectFrom,
    mode: ScalingMode,
) -> Result<Vec<f64>, ForestError> {
    for (i, set) in sets.iter().enumerate() {
        set.profile.validate(i)?;
    }

    let n = data.len();
    let all_true = vec![true; n];
    let total_target = target_decl.amount_for(data, &all_true, freq_var);

    let eps_total = SELECTION_TOLERANCE_FLOOR
        .max((total_target * SELECTION_TOLERANCE_FACTOR).min(SELECTION_TOLERANCE_CEILING));
    let eps_step = SELECTION_STEP_FLOOR;

    let freq: Vec<f64> = data.column(freq_var).unwrap_or(&[]).to_vec();
    let mut selected_units = vec![0.0; n];
    let mut total_target_selected = 0.0_f64;

    let mut i_set = 0;
    while !in_tolerance(total_target_selected, total_target, eps_total) && i_set < sets.len() {
        let set = &sets[i_set];
        if set.any_selected() {
            let (order_idx, order_values) = sorted_set_rows(data, &set.mask, &set.order_var)?;

            let cur_set_target = set.target.amount_for(data, &set.mask, freq_var);
            let eps_set = SELECTION_TOLERANCE_FLOOR.max(cur_set_target * SELECTION_TOLERANCE_FACTOR);

            let order_col_all = data.column(&set.order_var).unwrap_or(&[]);
            let prof_x = resolve_prof_x(&set.profile, order_col_all, &order_values)?;
            let prof_y = set.profile.y.clone();

            let (b, a) = segment_coeffs(&prof_x, &prof_y);
            let bounds = segment_bounds(&prof_x);
            let interval_ids: Vec<usize> = order_values
                .iter()
                .map(|&v| interval_id_for(v, &bounds))
                .collect();

            let mut y = initial_shares(n, &order_idx, &order_values, &interval_ids, &a, &b);
            let mut units = compute_units(&y, &freq, &selected_units, select_from);

            // Both the overall and the set target ask for "everything" -
            // select the full remaining frequency of this set's rows outright.
            if target_decl.target_type == Some(TargetType::Relative)
                && set.target.target_type == Some(TargetType::Relative)
                && target_decl.amount == Some(1.0)
                && set.target.amount == Some(1.0)
            {
                units = vec![0.0; n];
                for &idx in &order_idx {
                    units[idx] = freq[idx];
                }
            }

            let mut target = var_sum(&units, data, &target_decl.var, freq_var);
            let mut sub_target = var_sum(&units, data, &set.target.var, freq_var);

            let mut tmp_total_target = total_target_selected + target;
            let mut tmp_cur_set_target = sub_target;
            let mut tmp_units = add(&selected_units, &units);

            if cur_set_target.is_finite() {
                let (mut scale, mut step, y0) = init_search(
                    mode,
                    &y,
                    &prof_y,
                    total_target,
                    tmp_total_target,
                    cur_set_target,
                    tmp_cur_set_target,
                );

                while continue_search(
                    tmp_cur_set_target,
                    cur_set_target,
                    eps_set,
                    tmp_total_target,
                    total_target,
                    eps_total,
                    &freq,
                    &tmp_units,
                    &order_idx,
                    step,
                    eps_step,
                ) {
                    tmp_total_target = total_target_selected;
                    tmp_cur_set_target = 0.0;

                    y = scale_y(
                        mode,
                        &y0,
                        scale,
                        &prof_x,
                        &interval_ids,
                        &order_values,
                        &order_idx,
                        n,
                    );

                    if y.iter().any(|v| v.is_nan()) {
                        return Err(ForestError::SelectionSearchDiverged);
                    }

                    units = compute_units(&y, &freq, &selected_units, select_from);

                    target = var_sum(&units, data, &target_decl.var, freq_var);
                    sub_target = var_sum(&units, data, &set.target.var, freq_var);

                    tmp_total_target += target;
                    tmp_cur_set_target += sub_target;
                    tmp_units = add(&selected_units, &units);

                    step /= 2.0;
                    if tmp_cur_set_target > cur_set_target + eps_set
                        || tmp_total_target > total_target + eps_total
                    {
                        scale -= step;
                    } else {
                        scale += step;
                    }
                }
            }

            selected_units = tmp_units;
            total_target_selected = tmp_total_target;
        }
        i_set += 1;
    }

    Ok(selected_units)
}

fn in_tolerance(value: f64, target: f64, eps: f64) -> bool {
    value >= target - eps && value <= target + eps
}

#[allow(clippy::too_many_arguments)]
fn continue_search(
    tmp_cur_set_target: f64,
    cur_set_target: f64,
    eps_set: f64,
    tmp_total_target: f64,
    total_target: f64,
    eps_total: f64,
    freq: &[f64],
    tmp_units: &[f64],
    order_idx: &[usize],
    step: f64,
    eps_step: f64,
) -> bool {
    let remaining_capacity = order_idx.iter().map(|&i| freq[i]).sum::<f64>()
        > order_idx.iter().map(|&i| tmp_units[i]).sum::<f64>();
    let undershoot = tmp_cur_set_target < cur_set_target - eps_set
        && tmp_total_target < total_target - eps_total
        && remaining_capacity;
    let overshoot =
        (cur_set_target + eps_set) < tmp_cur_set_target || (total_target + eps_total) < tmp_total_target;
    (undershoot || overshoot) && step > eps_step
}

fn add(a: &[f64], b: &[f64]) -> Vec<f64> {
    a.iter().zip(b).map(|(x, y)| x + y).collect()
}

fn sorted_set_rows(
    data: &dyn ColumnSource,
    mask: &[bool],
    order_var: &str,
) -> Result<(Vec<usize>, Vec<f64>), ForestError> {
    let order_col = data
        .column(order_var)
        .ok_or_else(|| ForestError::Environment(format!("unknown order variable '{order_var}'")))?;
    let mut idx: Vec<usize> = mask
        .iter()
        .enumerate()
        .filter(|(_, &m)| m)
        .map(|(i, _)| i)
        .collect();
    idx.sort_by(|&a, &b| {
        order_col[a]
            .partial_cmp(&order_col[b])
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    let values = idx.iter().map(|&i| order_col[i]).collect();
    Ok((idx, values))
}

fn resolve_prof_x(
    profile: &Profile,
    order_col_all: &[f64],
    order_values_sorted: &[f64],
) -> Result<Vec<f64>, ForestError> {
    match profile.xmode {
        ProfileXMode::Absolute => Ok(profile.x.clone()),
        ProfileXMode::Relative => {
            let (ord_min, ord_max) = match profile.xscale {
                Some(ProfileXScale::All) => {
                    let min = order_col_all.iter().cloned().fold(f64::INFINITY, f64::min);
                    let max = order_col_all
                        .iter()
                        .cloned()
                        .fold(f64::NEG_INFINITY, f64::max);
                    (min, max)
                }
                _ => {
                    let min = *order_values_sorted
                        .first()
                        .ok_or_else(|| ForestError::Environment("empty selection set".into()))?;
                    let max = *order_values_sorted.last().unwrap();
                    (min, max)
                }
            };
            let d_ord = ord_max - ord_min;
            let x0 = profile.x[0];
            let d_profile_x = profile.x[profile.x.len() - 1] - x0;
            Ok(profile
                .x
                .iter()
                .map(|&px| ord_min + (px - x0) * d_ord / d_profile_x)
                .collect())
        }
    }
}

/// Slopes and intercepts of each profile segment. Degenerate (zero-width)
/// segments produce a NaN slope from `0/0`; when that happens every slope in
/// the profile is reset to zero so the segment contributes a flat share.
fn segment_coeffs(prof_x: &[f64], prof_y: &[f64]) -> (Vec<f64>, Vec<f64>) {
    let n = prof_x.len();
    let mut b: Vec<f64> = (0..n - 1)
        .map(|i| (prof_y[i + 1] - prof_y[i]) / (prof_x[i + 1] - prof_x[i]))
        .collect();
    if b.iter().any(|v| v.is_nan()) {
        b.iter_mut().for_each(|v| *v = 0.0);
    }
    let a: Vec<f64> = (0..n - 1).map(|i| prof_y[i + 1] - b[i] * prof_x[i + 1]).collect();
    (b, a)
}

fn segment_bounds(prof_x: &[f64]) -> Vec<f64> {
    let n = prof_x.len();
    let mut bounds = Vec::with_capacity(n);
    bounds.push(f64::NEG_INFINITY);
    bounds.extend_from_slice(&prof_x[1..n - 1]);
    bounds.push(f64::INFINITY);
    bounds
}

fn interval_id_for(x: f64, bounds: &[f64]) -> usize {
    for i in 0..bounds.len() - 1 {
        if x >= bounds[i] && x < bounds[i + 1] {
            return i;
        }
    }
    bounds.len() - 2
}

fn initial_shares(
    n: usize,
    order_idx: &[usize],
    order_values: &[f64],
    interval_ids: &[usize],
    a: &[f64],
    b: &[f64],
) -> Vec<f64> {
    let mut y = vec![0.0; n];
    for (k, &idx) in order_idx.iter().enumerate() {
        let iv = interval_ids[k];
        let v = a[iv] + b[iv] * order_values[k];
        y[idx] = v.max(0.0).min(1.0);
    }
    y
}

fn compute_units(y: &[f64], freq: &[f64], selected_units: &[f64], select_from: SelectFrom) -> Vec<f64> {
    (0..y.len())
        .map(|i| match select_from {
            SelectFrom::All => (y[i] * freq[i]).min(freq[i] - selected_units[i]),
            SelectFrom::Remaining => (y[i] * (freq[i] - selected_units[i])).max(0.0),
        })
        .collect()
}

fn var_sum(units: &[f64], data: &dyn ColumnSource, var: &Option<String>, freq_var: &str) -> f64 {
    match var {
        None => units.iter().sum(),
        Some(v) if v == freq_var => units.iter().sum(),
        Some(v) => {
            let col = data.column(v).unwrap_or(&[]);
            units.iter().zip(col).map(|(u, c)| u * c).sum()
        }
    }
}

fn odds(p: f64) -> f64 {
    p / (1.0 - p)
}

fn inverse_odds(o: f64) -> f64 {
    if o.is_infinite() {
        1.0
    } else {
        o / (1.0 + o)
    }
}

/// Computes the binary search's starting scale, step, and baseline share
/// vector for the given mode (spec §4.1 "four adjustment modes").
fn init_search(
    mode: ScalingMode,
    y: &[f64],
    prof_y: &[f64],
    total_target: f64,
    tmp_total_target: f64,
    cur_set_target: f64,
    tmp_cur_set_target: f64,
) -> (f64, f64, Vec<f64>) {
    match mode {
        ScalingMode::OddsUnits | ScalingMode::OddsProfile => {
            let y0: Vec<f64> = if mode == ScalingMode::OddsProfile {
                prof_y.iter().map(|&p| odds(p)).collect()
            } else {
                y.iter().map(|&p| odds(p)).collect()
            };
            let (scale, step) = if tmp_total_target > total_target || tmp_cur_set_target > cur_set_target {
                (ODDS_SEARCH_SCALE_LOW, ODDS_SEARCH_STEP_LOW)
            } else {
                (ODDS_SEARCH_SCALE_HIGH, ODDS_SEARCH_STEP_HIGH)
            };
            (scale, step, y0)
        }
        ScalingMode::Scale => {
            let mut scale_max = y
                .iter()
                .filter(|&&v| v > 0.0)
                .map(|&v| 1.0 / v)
                .fold(f64::NEG_INFINITY, f64::max);
            if y.iter().any(|&v| v == 0.0) {
                scale_max = scale_max.max(100.0);
            }
            (scale_max / 2.0, scale_max / 2.0, y.to_vec())
        }
        ScalingMode::Level => {
            let a_max = y.iter().map(|&v| 1.0 - v).fold(f64::NEG_INFINITY, f64::max);
            let a_min = y.iter().map(|&v| -v).fold(f64::INFINITY, f64::min);
            let scale = (a_max + a_min) / 2.0;
            let step = if scale == 0.0 { a_max } else { scale.abs() };
            (scale, step, y.to_vec())
        }
    }
}

/// Computes a new candidate share vector at the given scale/constant.
#[allow(clippy::too_many_arguments)]
fn scale_y(
    mode: ScalingMode,
    y0: &[f64],
    scale: f64,
    prof_x: &[f64],
    interval_ids: &[usize],
    order_values: &[f64],
    order_idx: &[usize],
    n: usize,
) -> Vec<f64> {
    let mut y = vec![0.0; n];
    match mode {
        ScalingMode::OddsProfile => {
            let new_prof_y: Vec<f64> = y0.iter().map(|&o| inverse_odds(scale * o)).collect();
            let (b, a) = segment_coeffs(prof_x, &new_prof_y);
            for (k, &idx) in order_idx.iter().enumerate() {
                let iv = interval_ids[k];
                let v = a[iv] + b[iv] * order_values[k];
                y[idx] = v.max(0.0).min(1.0);
            }
        }
        ScalingMode::OddsUnits => {
            for &idx in order_idx {
                y[idx] = inverse_odds(scale * y0[idx]);
            }
        }
        ScalingMode::Scale => {
            for &idx in order_idx {
                y[idx] = (scale * y0[idx]).max(0.0).min(1.0);
            }
        }
        ScalingMode::Level => {
            for &idx in order_idx {
                y[idx] = (y0[idx] + scale).max(0.0).min(1.0);
            }
        }
    }
    y
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Cols {
        f: Vec<f64>,
        d: Vec<f64>,
    }
    impl ColumnSource for Cols {
        fn len(&self) -> usize {
            self.f.len()
        }
        fn column(&self, name: &str) -> Option<&[f64]> {
            match name {
                "f" => Some(&self.f),
                "d" => Some(&self.d),
                _ => None,
            }
        }
    }

    fn flat_profile() -> Profile {
        Profile::new(vec![0.0, 1.0], vec![1.0, 1.0], ProfileXMode::Absolute, None)
    }

    #[test]
    fn select_all_under_unbounded_target_takes_nothing() {
        let data = Cols {
            f: vec![100.0, 100.0],
            d: vec![10.0, 20.0],
        };
        let sets = vec![SelectionSet::new(
            vec![true, true],
            "d",
            Target::unbounded(),
            flat_profile(),
        )];
        let result = select_units(
            &data,
            &Target::unbounded(),
            &sets,
            "f",
            SelectFrom::All,
            ScalingMode::OddsUnits,
        )
        .unwrap();
        assert_eq!(result, vec![0.0, 0.0]);
    }

    #[test]
    fn relative_full_target_removes_all_set_rows() {
        let data = Cols {
            f: vec![100.0, 50.0],
            d: vec![10.0, 20.0],
        };
        let sets = vec![SelectionSet::new(
            vec![true, true],
            "d",
            Target::new("f", TargetType::Relative, 1.0),
            flat_profile(),
        )];
        let result = select_units(
            &data,
            &Target::new("f", TargetType::Relative, 1.0),
            &sets,
            "f",
            SelectFrom::All,
            ScalingMode::OddsUnits,
        )
        .unwrap();
        assert_eq!(result, vec![100.0, 50.0]);
    }

    #[test]
    fn absolute_target_converges_within_tolerance() {
        let data = Cols {
            f: vec![100.0, 100.0, 100.0],
            d: vec![10.0, 20.0, 30.0],
        };
        let sets = vec![SelectionSet::new(
            vec![true, true, true],
            "d",
            Target::new("f", TargetType::Absolute, 120.0),
            flat_profile(),
        )];
        let result = select_units(
            &data,
            &Target::new("f", TargetType::Absolute, 120.0),
            &sets,
            "f",
            SelectFrom::All,
            ScalingMode::OddsUnits,
        )
        .unwrap();
        let total: f64 = result.iter().sum();
        assert!((total - 120.0).abs() < 1.0, "total={total}");
        assert!(result.iter().all(|&v| v >= 0.0));
    }

    #[test]
    fn exhausted_sets_stop_without_reaching_target() {
        let data = Cols {
            f: vec![10.0],
            d: vec![10.0],
        };
        let sets = vec![SelectionSet::new(
            vec![true],
            "d",
            Target::new("f", TargetType::Absolute, 5.0),
            flat_profile(),
        )];
        // absurdly high overall target that this single set cannot reach
        let result = select_units(
            &data,
            &Target::new("f", TargetType::Absolute, 1_000_000.0),
            &sets,
            "f",
            SelectFrom::All,
            ScalingMode::OddsUnits,
        )
        .unwrap();
        assert!(result[0] <= 10.0);
    }

    #[test]
    fn relative_half_target_on_a_twenty_tree_population_meets_tolerance() {
        let f: Vec<f64> = (0..20).map(|i| 50.0 + i as f64 * 3.0).collect();
        let d: Vec<f64> = (0..20).map(|i| 10.0 + i as f64).collect();
        let data = Cols { f: f.clone(), d };
        let target = Target::new("f", TargetType::Relative, 0.5);
        let sets = vec![SelectionSet::new(vec![true; 20], "d", target.clone(), flat_profile())];
        let result = select_units(&data, &target, &sets, "f", SelectFrom::All, ScalingMode::OddsUnits).unwrap();

        let total_f: f64 = f.iter().sum();
        let total_selected: f64 = result.iter().sum();
        let eps = (total_f * 0.5 * 0.001).max(0.005);
        assert!(
            (total_selected - total_f * 0.5).abs() < eps,
            "total_selected={total_selected} target={}",
            total_f * 0.5
        );
    }

    #[test]
    fn from_below_profile_removes_relatively_more_small_diameter_trees() {
        // 10 trees, diameters 10..19, uniform basal area-ish weight via "g" = d^2/100.
        let n = 10;
        let d: Vec<f64> = (0..n).map(|i| 10.0 + i as f64).collect();
        let f = vec![100.0; n];
        let g: Vec<f64> = d.iter().map(|x| x * x / 100.0).collect();

        struct Cols3 {
            f: Vec<f64>,
            d: Vec<f64>,
            g: Vec<f64>,
        }
        impl ColumnSource for Cols3 {
            fn len(&self) -> usize {
                self.f.len()
            }
            fn column(&self, name: &str) -> Option<&[f64]> {
                match name {
                    "f" => Some(&self.f),
                    "d" => Some(&self.d),
                    "g" => Some(&self.g),
                    _ => None,
                }
            }
        }
        let data = Cols3 { f, d: d.clone(), g: g.clone() };

        let from_below = Profile::new(vec![0.0, 1.0], vec![1.0, 0.0], ProfileXMode::Relative, None);
        let target = Target::new("g", TargetType::Relative, 0.3);
        let sets = vec![SelectionSet::new(vec![true; n], "d", target.clone(), from_below)];
        let result = select_units(&data, &target, &sets, "f", SelectFrom::All, ScalingMode::OddsUnits).unwrap();

        let total_g: f64 = g.iter().sum();
        let removed_g: f64 = result.iter().zip(&g).map(|(u, gi)| u * gi).sum();
        let eps = (total_g * 0.3 * 0.001).max(0.005);
        assert!((removed_g - total_g * 0.3).abs() < eps, "removed_g={removed_g} target={}", total_g * 0.3);

        let removed_d_weighted: f64 = result.iter().zip(&d).map(|(u, di)| u * di).sum();
        let removed_total: f64 = result.iter().sum();
        let kept: Vec<f64> = result.iter().zip(&d).map(|(u, di)| (100.0 - u) * di).collect();
        let kept_total: f64 = result.iter().map(|u| 100.0 - u).sum();
        let avg_removed = removed_d_weighted / removed_total;
        let avg_kept = kept.iter().sum::<f64>() / kept_total;
        assert!(
            avg_removed < avg_kept,
            "avg_removed={avg_removed} avg_kept={avg_kept}"
        );
    }
}
