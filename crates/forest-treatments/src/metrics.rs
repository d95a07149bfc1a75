//! Shared stand-metrics helper reused by every thinning/cutting treatment
//! (spec SPEC_FULL §4.3, grounded on `stand_metrics.py`'s `compute_stand_metrics`).
use forest_stand::ReferenceTrees;
use std::f64::consts::PI;

/// Basal area of one tree (m^2), diameter in cm: `(pi/40000) * d^2`.
pub fn tree_basal_area(diameter_cm: f64) -> f64 {
    PI / 40_000.0 * diameter_cm * diameter_cm
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StandMetrics {
    /// Stems per hectare, summed.
    pub n: f64,
    /// Basal area, m^2/ha.
    pub g: f64,
    /// Quadratic mean diameter, cm.
    pub dgm: f64,
    /// Basal-area-weighted mean height, m.
    pub hgm: f64,
    /// Species code with the largest total basal area, if any row has one.
    pub dom_spe: Option<i32>,
}

pub fn compute_stand_metrics(trees: &ReferenceTrees) -> StandMetrics {
    let f = trees.stems_per_ha();
    let d = trees.breast_height_diameter();
    let h = trees.height();
    let species = trees.species();

    let mut n = 0.0;
    let mut g = 0.0;
    let mut gd = 0.0;
    let mut gh = 0.0;
    for i in 0..trees.len() {
        if f[i].is_nan() {
            continue;
        }
        n += f[i];
        let fg = f[i] * tree_basal_area(d[i]);
        if fg.is_nan() {
            continue;
        }
        g += fg;
        gd += fg * d[i];
        gh += fg * h[i];
    }
    let (dgm, hgm) = if g > 0.0 { (gd / g, gh / g) } else { (0.0, 0.0) };

    let dom_spe = if trees.is_empty() {
        None
    } else {
        let mut totals: std::collections::BTreeMap<i32, f64> = std::collections::BTreeMap::new();
        for i in 0..trees.len() {
            let fg = f[i] * tree_basal_area(d[i]);
            if fg.is_nan() {
                continue;
            }
            *totals.entry(species[i]).or_insert(0.0) += fg;
        }
        totals
            .into_iter()
            .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
            .map(|(spe, _)| spe)
    };

    StandMetrics { n, g, dgm, hgm, dom_spe }
}

#[cfg(test)]
mod tests {
    use super::*;
    use forest_stand::TreeFields;

    fn row(d: f64, f: f64, h: f64, species: i32) -> TreeFields {
        TreeFields {
            breast_height_diameter: Some(d),
            stems_per_ha: Some(f),
            height: Some(h),
            species: Some(species),
            ..Default::default()
        }
    }

    #[test]
    fn metrics_on_empty_trees_are_zero() {
        let trees = ReferenceTrees::default();
        let m = compute_stand_metrics(&trees);
        assert_eq!(m.n, 0.0);
        assert_eq!(m.g, 0.0);
        assert_eq!(m.dom_spe, None);
    }

    #[test]
    fn metrics_weight_by_basal_area() {
        let mut trees = ReferenceTrees::default();
        trees.create(row(20.0, 200.0, 15.0, 2), None);
        trees.create(row(10.0, 400.0, 8.0, 1), None);
        let m = compute_stand_metrics(&trees);
        assert_eq!(m.n, 600.0);
        assert!(m.g > 0.0);
        // the larger-diameter tree carries more basal area weight despite fewer stems
        assert!(m.dgm > 10.0);
        assert_eq!(m.dom_spe, Some(2));
    }
}
