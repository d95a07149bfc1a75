//! The treatment library (spec C3): pure `(stand, collected-data) ->
//! (stand, collected-data)` functions, captured at event-tree build time with
//! whatever keyword parameters the control structure declared for them.
use forest_core::{ForestError, TimePoint};
use forest_selection::{select_units, Profile, ProfileXMode, ScalingMode, SelectFrom, SelectionSet, Target, TargetType};
use forest_stand::{Payload, SpeciesCode, Stand, StratumFields, TreeFields};
use serde::{Deserialize, Serialize};

use crate::columns::TreesWithBasalArea;
use crate::growth::GrowthModel;
use crate::metrics::compute_stand_metrics;
use crate::selection::SelectionDecl;
use crate::tables::{BasalAreaLowerLimit, StemsAfterThinning};

/// External collaborators a subset of treatments need at apply time. Shared
/// across every stand in a run (the tree itself is built once, spec §4.8),
/// so this is threaded through the evaluator rather than captured per-event.
pub struct TreatmentContext<'a> {
    pub growth: &'a dyn GrowthModel,
    pub basal_area_limit: &'a dyn BasalAreaLowerLimit,
    pub stems_after_thinning: &'a dyn StemsAfterThinning,
}

/// One management action, captured with its own parameter record rather than
/// compared by function pointer (spec §9 "Treatment identity in history").
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "treatment", rename_all = "snake_case")]
pub enum Treatment {
    DoNothing,
    Cutting(CuttingParams),
    ThinBasalArea(ThinBasalAreaParams),
    ThinNumberOfStems(ThinNumberOfStemsParams),
    MarkTrees(MarkTreesParams),
    Regeneration(RegenerationParams),
    SoilSurfacePreparation(SoilPrepParams),
    Growth(GrowthParams),
    ConiferPriorityThinning(ConiferPriorityParams),
    FirstThinningWithStripRoads(FirstThinningParams),
}

impl Treatment {
    /// The tag used as the collected-data key, the history entry's treatment
    /// name, and the guard-comparison tag (spec §9: compare by tag, not by
    /// pointer).
    pub fn name(&self) -> &'static str {
        match self {
            Self::DoNothing => "do_nothing",
            Self::Cutting(_) => "cutting",
            Self::ThinBasalArea(_) => "thin_basal_area",
            Self::ThinNumberOfStems(_) => "thin_number_of_stems",
            Self::MarkTrees(_) => "mark_trees",
            Self::Regeneration(_) => "regeneration",
            Self::SoilSurfacePreparation(_) => "soil_surface_preparation",
            Self::Growth(_) => "growth",
            Self::ConiferPriorityThinning(_) => "conifer_priority_thinning",
            Self::FirstThinningWithStripRoads(_) => "first_thinning_with_strip_roads",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CuttingParams {
    pub selection: SelectionDecl,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThinBasalAreaParams {
    pub selection: Option<SelectionDecl>,
    pub max_proportion: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThinNumberOfStemsParams {
    pub selection: Option<SelectionDecl>,
    pub target_stems_per_ha: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarkTreesParams {
    pub selection: SelectionDecl,
    pub management_category: Option<i32>,
    pub origin: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegenerationParams {
    pub species: SpeciesCode,
    pub origin: i32,
    pub stems_per_ha: f64,
    pub mean_height: f64,
    pub mean_diameter: f64,
    pub biological_age: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SoilPrepParams {
    pub method: String,
    pub intensity: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct GrowthParams {
    pub years: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConiferPriorityParams {
    pub preferred_species: SpeciesCode,
    pub target_type: SelectionTargetTypeForConifer,
    pub target_amount: f64,
    pub ratio: Option<f64>,
    pub min_other_basal_area: Option<f64>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionTargetTypeForConifer {
    Absolute,
    Relative,
    AbsoluteRemain,
    RelativeRemain,
}
impl From<SelectionTargetTypeForConifer> for TargetType {
    fn from(v: SelectionTargetTypeForConifer) -> Self {
        match v {
            SelectionTargetTypeForConifer::Absolute => TargetType::Absolute,
            SelectionTargetTypeForConifer::Relative => TargetType::Relative,
            SelectionTargetTypeForConifer::AbsoluteRemain => TargetType::AbsoluteRemain,
            SelectionTargetTypeForConifer::RelativeRemain => TargetType::RelativeRemain,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FirstThinningParams {
    pub strip_road_removal: Option<f64>,
    pub target_stems_per_ha: Option<f64>,
}

/// Applies one treatment to `payload`, producing the post-treatment payload.
/// Pre/postconditions are the event tree's concern (spec §4.5 step (e)); this
/// function is the bare treatment body (spec §4.6 step 1).
pub fn apply(
    treatment: &Treatment,
    time_point: TimePoint,
    ctx: &TreatmentContext,
    payload: Payload,
) -> Result<Payload, ForestError> {
    match treatment {
        Treatment::DoNothing => Ok(payload),
        Treatment::Cutting(p) => apply_cutting(payload, p),
        Treatment::ThinBasalArea(p) => apply_thin_basal_area(payload, ctx, p),
        Treatment::ThinNumberOfStems(p) => apply_thin_number_of_stems(payload, p),
        Treatment::MarkTrees(p) => apply_mark_trees(payload, p),
        Treatment::Regeneration(p) => Ok(apply_regeneration(payload, p)),
        Treatment::SoilSurfacePreparation(p) => Ok(apply_soil_prep(payload, time_point, p)),
        Treatment::Growth(p) => Ok(apply_growth(payload, ctx, p)),
        Treatment::ConiferPriorityThinning(p) => apply_conifer_priority(payload, p),
        Treatment::FirstThinningWithStripRoads(p) => apply_first_thinning(payload, ctx, p),
    }
}

/// The shared (1)-(5) pattern every cutting/thinning treatment follows (spec
/// §4.3): stand metrics before, resolved selection declaration, selection
/// engine invocation, clamp-and-subtract, snapshot + before/after metrics.
fn apply_removal(
    mut payload: Payload,
    kind: &'static str,
    target: Target,
    sets: Vec<SelectionSet>,
    select_from: SelectFrom,
    mode: ScalingMode,
) -> Result<Payload, ForestError> {
    let before = compute_stand_metrics(&payload.stand.reference_trees);
    let units = {
        let cols = TreesWithBasalArea::new(&payload.stand.reference_trees);
        select_units(&cols, &target, &sets, "stems_per_ha", select_from, mode)?
    };

    let freq_before: Vec<f64> = payload.stand.reference_trees.stems_per_ha().to_vec();
    if units
        .iter()
        .zip(freq_before.iter())
        .any(|(&u, &f)| u < -1e-9 || u > f + 1e-6)
    {
        return Err(ForestError::NegativeRemoval);
    }

    let mut removed_rows = Vec::new();
    for i in 0..payload.stand.reference_trees.len() {
        if units[i] > 0.0 {
            let row = payload.stand.reference_trees.read(i);
            removed_rows.push(serde_json::json!({
                "identifier": row.identifier,
                "species": row.species,
                "breast_height_diameter": row.breast_height_diameter,
                "stems_per_ha_removed": units[i],
            }));
        }
    }

    for (v, u) in payload
        .stand
        .reference_trees
        .stems_per_ha_mut()
        .iter_mut()
        .zip(units.iter())
    {
        *v = (*v - u).max(0.0);
    }

    let after = compute_stand_metrics(&payload.stand.reference_trees);
    payload.collected.store(
        kind,
        serde_json::json!({
            "removed_trees": removed_rows,
            "before": stand_metrics_json(&before),
            "after": stand_metrics_json(&after),
        }),
    );
    Ok(payload)
}

fn stand_metrics_json(m: &crate::metrics::StandMetrics) -> serde_json::Value {
    serde_json::json!({
        "n": m.n, "g": m.g, "dgm": m.dgm, "hgm": m.hgm, "dominant_species": m.dom_spe,
    })
}

fn apply_cutting(payload: Payload, params: &CuttingParams) -> Result<Payload, ForestError> {
    let (target, sets) = params.selection.resolve(&payload.stand.reference_trees);
    apply_removal(
        payload,
        "cutting",
        target,
        sets,
        params.selection.select_from(),
        params.selection.scaling_mode(),
    )
}

/// Default from-below selection spanning every row: relative x in `[0, 1]`,
/// linear profile `y = 1 -> 0` (spec §4.3 "Basal-area thinning target
/// derivation").
fn from_below_all_trees(n: usize, order_var: &str, target: Target) -> SelectionSet {
    SelectionSet::new(
        vec![true; n],
        order_var,
        target,
        Profile::new(vec![0.0, 1.0], vec![1.0, 0.0], ProfileXMode::Relative, None),
    )
}

fn apply_thin_basal_area(
    payload: Payload,
    ctx: &TreatmentContext,
    params: &ThinBasalAreaParams,
) -> Result<Payload, ForestError> {
    if let Some(selection) = &params.selection {
        let (target, sets) = selection.resolve(&payload.stand.reference_trees);
        return apply_removal(payload, "thin_basal_area", target, sets, selection.select_from(), selection.scaling_mode());
    }

    let metrics = compute_stand_metrics(&payload.stand.reference_trees);
    let height_bin = dominant_height_bin(&payload.stand);
    let lower_limit = ctx.basal_area_limit.lower_limit(
        payload.stand.degree_day_area(),
        payload.stand.soil_class,
        payload.stand.site_class,
        height_bin,
        payload.stand.dominant_species,
    );
    let mut rel = if metrics.g > 0.0 {
        ((metrics.g - lower_limit) / metrics.g).clamp(0.0, 1.0)
    } else {
        0.0
    };
    if let Some(cap) = params.max_proportion {
        rel = rel.min(cap);
    }

    let n = payload.stand.reference_trees.len();
    let target = Target::new("g", TargetType::Relative, rel);
    let set = from_below_all_trees(n, "breast_height_diameter", Target::new("g", TargetType::Relative, rel));
    apply_removal(payload, "thin_basal_area", target, vec![set], SelectFrom::All, ScalingMode::OddsUnits)
}

/// Diameter/height bin used to key the basal-area limit table: 5m bands
/// `[0,5) [5,10) [10,15) [15,inf)`. Spec §6 specifies the table's 4-row
/// height axis but not the exact bin edges; this resolves that gap.
fn dominant_height_bin(stand: &Stand) -> usize {
    if stand.dominant_height.is_nan() {
        0
    } else {
        ((stand.dominant_height / 5.0).floor() as i64).clamp(0, 3) as usize
    }
}

fn apply_thin_number_of_stems(payload: Payload, params: &ThinNumberOfStemsParams) -> Result<Payload, ForestError> {
    if let Some(selection) = &params.selection {
        let (target, sets) = selection.resolve(&payload.stand.reference_trees);
        return apply_removal(payload, "thin_number_of_stems", target, sets, selection.select_from(), selection.scaling_mode());
    }
    let metrics = compute_stand_metrics(&payload.stand.reference_trees);
    let target_stems = params.target_stems_per_ha.unwrap_or(metrics.n);
    let absolute_removal = (metrics.n - target_stems).max(0.0);
    let n = payload.stand.reference_trees.len();
    let target = Target::new("stems_per_ha", TargetType::Absolute, absolute_removal);
    let set = from_below_all_trees(
        n,
        "breast_height_diameter",
        Target::new("stems_per_ha", TargetType::Absolute, absolute_removal),
    );
    apply_removal(payload, "thin_number_of_stems", target, vec![set], SelectFrom::All, ScalingMode::OddsUnits)
}

/// Unlike cutting/thinning, marking conserves total stems: the selected
/// share of each row is cloned into a new row carrying the overridden
/// attributes, and subtracted from the source row (spec §4.3 step (4)).
fn apply_mark_trees(mut payload: Payload, params: &MarkTreesParams) -> Result<Payload, ForestError> {
    let (target, sets) = params.selection.resolve(&payload.stand.reference_trees);
    let units = {
        let cols = TreesWithBasalArea::new(&payload.stand.reference_trees);
        select_units(
            &cols,
            &target,
            &sets,
            "stems_per_ha",
            params.selection.select_from(),
            params.selection.scaling_mode(),
        )?
    };
    let freq_before: Vec<f64> = payload.stand.reference_trees.stems_per_ha().to_vec();
    if units
        .iter()
        .zip(freq_before.iter())
        .any(|(&u, &f)| u < -1e-9 || u > f + 1e-6)
    {
        return Err(ForestError::NegativeRemoval);
    }

    let mut marked_rows = Vec::new();
    let mut new_rows = Vec::new();
    for i in 0..payload.stand.reference_trees.len() {
        if units[i] <= 0.0 {
            continue;
        }
        let row = payload.stand.reference_trees.read(i);
        marked_rows.push(serde_json::json!({
            "identifier": row.identifier,
            "species": row.species,
            "breast_height_diameter": row.breast_height_diameter,
            "stems_per_ha_marked": units[i],
        }));
        new_rows.push(TreeFields {
            identifier: Some(row.identifier),
            species: Some(row.species),
            breast_height_diameter: Some(row.breast_height_diameter),
            height: Some(row.height),
            biological_age: Some(row.biological_age),
            breast_height_age: Some(row.breast_height_age),
            stems_per_ha: Some(units[i]),
            origin: Some(params.origin.unwrap_or(row.origin)),
            management_category: Some(params.management_category.unwrap_or(row.management_category)),
            storey: Some(row.storey),
            sapling: Some(row.sapling),
            tree_number: Some(row.tree_number),
            stand_origin_relative_position: Some(row.stand_origin_relative_position),
        });
    }

    for (v, u) in payload
        .stand
        .reference_trees
        .stems_per_ha_mut()
        .iter_mut()
        .zip(units.iter())
    {
        *v -= u;
    }
    payload.stand.reference_trees.create_many(new_rows, None);

    payload.collected.store(
        "mark_trees",
        serde_json::json!({ "marked_trees": marked_rows }),
    );
    Ok(payload)
}

fn apply_regeneration(mut payload: Payload, params: &RegenerationParams) -> Payload {
    payload.stand.tree_strata.create(StratumFields {
        species: Some(params.species),
        origin: Some(params.origin),
        stems_per_ha: Some(params.stems_per_ha),
        mean_height: Some(params.mean_height),
        mean_diameter: Some(params.mean_diameter),
        biological_age: Some(params.biological_age),
        sapling: Some(true),
        ..Default::default()
    });
    payload.collected.store(
        "regeneration",
        serde_json::json!({
            "species": params.species,
            "origin": params.origin,
            "stems_per_ha": params.stems_per_ha,
            "mean_height": params.mean_height,
            "mean_diameter": params.mean_diameter,
            "biological_age": params.biological_age,
        }),
    );
    payload
}

fn apply_soil_prep(mut payload: Payload, time_point: TimePoint, params: &SoilPrepParams) -> Payload {
    payload.stand.markers.year_of_soil_preparation = Some(time_point);
    payload.collected.store(
        "soil_surface_preparation",
        serde_json::json!({ "method": params.method, "intensity": params.intensity, "year": time_point }),
    );
    payload
}

fn apply_growth(mut payload: Payload, ctx: &TreatmentContext, params: &GrowthParams) -> Payload {
    ctx.growth.advance(&mut payload.stand, params.years);
    payload.collected.store("growth", serde_json::json!({ "years": params.years }));
    payload
}

/// Ten equal relative-diameter bins, each one segment of an otherwise linear
/// from-below profile (spec §4.3 "shared profile: piecewise from-below over
/// ten bins").
fn ten_bin_from_below_profile() -> Profile {
    let x: Vec<f64> = (0..=10).map(|i| i as f64 / 10.0).collect();
    let y: Vec<f64> = (0..=10).map(|i| 1.0 - i as f64 / 10.0).collect();
    Profile::new(x, y, ProfileXMode::Relative, None)
}

fn apply_conifer_priority(payload: Payload, params: &ConiferPriorityParams) -> Result<Payload, ForestError> {
    let trees = &payload.stand.reference_trees;
    let preferred_mask: Vec<bool> = trees.species().iter().map(|&s| s == params.preferred_species).collect();
    let other_mask: Vec<bool> = preferred_mask.iter().map(|&p| !p).collect();

    let global_target = Target::new("g", params.target_type.into(), params.target_amount);

    let other_rel = match params.min_other_basal_area {
        Some(min_ba) => {
            let cols = TreesWithBasalArea::new(trees);
            let g_other = masked_basal_area(&cols, &other_mask);
            if g_other > 0.0 {
                ((g_other - min_ba) / g_other).clamp(0.0, 1.0)
            } else {
                0.0
            }
        }
        None => params.ratio.unwrap_or(0.7),
    };

    let set_other = SelectionSet::new(
        other_mask,
        "breast_height_diameter",
        Target::new("g", TargetType::Relative, other_rel),
        ten_bin_from_below_profile(),
    );
    let set_preferred = SelectionSet::new(
        preferred_mask,
        "breast_height_diameter",
        Target::unbounded(),
        ten_bin_from_below_profile(),
    );

    apply_removal(
        payload,
        "conifer_priority_thinning",
        global_target,
        vec![set_other, set_preferred],
        SelectFrom::All,
        ScalingMode::OddsUnits,
    )
}

fn masked_basal_area(cols: &TreesWithBasalArea, mask: &[bool]) -> f64 {
    use forest_transport::ColumnSource;
    let g = cols.column("g").unwrap_or(&[]);
    g.iter().zip(mask).filter(|(_, &m)| m).map(|(v, _)| v).sum()
}

fn apply_first_thinning(
    payload: Payload,
    ctx: &TreatmentContext,
    params: &FirstThinningParams,
) -> Result<Payload, ForestError> {
    let ajourat_rel = params.strip_road_removal.unwrap_or(0.18);
    let n = payload.stand.reference_trees.len();
    let ajourat_set = SelectionSet::new(
        vec![true; n],
        "breast_height_diameter",
        Target::new("stems_per_ha", TargetType::Relative, ajourat_rel),
        Profile::new(vec![0.0, 1.0], vec![1.0, 1.0], ProfileXMode::Relative, None),
    );
    let payload = apply_removal(
        payload,
        "first_thinning_ajourat",
        Target::new("stems_per_ha", TargetType::Relative, ajourat_rel),
        vec![ajourat_set],
        SelectFrom::All,
        ScalingMode::OddsUnits,
    )?;

    let metrics = compute_stand_metrics(&payload.stand.reference_trees);
    let target_stems = params
        .target_stems_per_ha
        .unwrap_or_else(|| ctx.stems_after_thinning.target_stems_per_ha(&payload.stand));
    let max_proportion = (0.5 - ajourat_rel) / (1.0 - ajourat_rel);
    let mut rel = if metrics.n > 0.0 {
        ((metrics.n - target_stems) / metrics.n).clamp(0.0, 1.0)
    } else {
        0.0
    };
    rel = rel.min(max_proportion.max(0.0));

    let n = payload.stand.reference_trees.len();
    let strip_set = from_below_all_trees(n, "breast_height_diameter", Target::new("stems_per_ha", TargetType::Relative, rel));
    apply_removal(
        payload,
        "first_thinning_strip_roads",
        Target::new("stems_per_ha", TargetType::Relative, rel),
        vec![strip_set],
        SelectFrom::All,
        ScalingMode::OddsUnits,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tables::UnboundedTable;
    use forest_stand::{Stand, TreeFields};

    fn ctx() -> TreatmentContext<'static> {
        TreatmentContext {
            growth: &crate::growth::NullGrowth,
            basal_area_limit: &UnboundedTable,
            stems_after_thinning: &UnboundedTable,
        }
    }

    fn stand_with_trees() -> Stand {
        let mut stand = Stand::new("s1", 1.0);
        stand.reference_trees.create_many(
            vec![
                TreeFields {
                    breast_height_diameter: Some(10.0),
                    stems_per_ha: Some(200.0),
                    height: Some(8.0),
                    species: Some(forest_stand::SCOTS_PINE),
                    ..Default::default()
                },
                TreeFields {
                    breast_height_diameter: Some(20.0),
                    stems_per_ha: Some(100.0),
                    height: Some(15.0),
                    species: Some(forest_stand::SCOTS_PINE),
                    ..Default::default()
                },
            ],
            None,
        );
        stand
    }

    #[test]
    fn do_nothing_is_identity_modulo_history() {
        let payload = Payload::new(stand_with_trees());
        let before = payload.stand.reference_trees.stems_per_ha().to_vec();
        let out = apply(&Treatment::DoNothing, 2020, &ctx(), payload).unwrap();
        assert_eq!(out.stand.reference_trees.stems_per_ha(), before.as_slice());
        assert!(out.collected.is_empty());
    }

    #[test]
    fn mark_trees_conserves_total_stems() {
        let payload = Payload::new(stand_with_trees());
        let total_before: f64 = payload.stand.reference_trees.stems_per_ha().iter().sum();
        let params = MarkTreesParams {
            selection: SelectionDecl::all_flat("stems_per_ha", crate::selection::TargetTypeDecl::Relative, 0.5),
            management_category: Some(9),
            origin: None,
        };
        let out = apply(&Treatment::MarkTrees(params), 2020, &ctx(), payload).unwrap();
        let total_after: f64 = out.stand.reference_trees.stems_per_ha().iter().sum();
        assert!((total_before - total_after).abs() < 1e-6);
    }

    #[test]
    fn cutting_never_increases_stems() {
        let payload = Payload::new(stand_with_trees());
        let before: Vec<f64> = payload.stand.reference_trees.stems_per_ha().to_vec();
        let params = CuttingParams {
            selection: SelectionDecl::all_flat("stems_per_ha", crate::selection::TargetTypeDecl::Relative, 0.3),
        };
        let out = apply(&Treatment::Cutting(params), 2020, &ctx(), payload).unwrap();
        for (b, a) in before.iter().zip(out.stand.reference_trees.stems_per_ha()) {
            assert!(*a <= *b + 1e-9);
            assert!(*a >= 0.0);
        }
    }

    #[test]
    fn soil_prep_stamps_year() {
        let payload = Payload::new(stand_with_trees());
        let params = SoilPrepParams { method: "mounding".into(), intensity: 1.0 };
        let out = apply(&Treatment::SoilSurfacePreparation(params), 2025, &ctx(), payload).unwrap();
        assert_eq!(out.stand.markers.year_of_soil_preparation, Some(2025));
    }

    #[test]
    fn regeneration_appends_a_stratum() {
        let payload = Payload::new(stand_with_trees());
        let params = RegenerationParams {
            species: forest_stand::NORWAY_SPRUCE,
            origin: 2,
            stems_per_ha: 1800.0,
            mean_height: 0.3,
            mean_diameter: 0.0,
            biological_age: 0.0,
        };
        let out = apply(&Treatment::Regeneration(params), 2020, &ctx(), payload).unwrap();
        assert_eq!(out.stand.tree_strata.len(), 1);
    }
}
