//! The computational unit (spec §3 "Stand", §4.2).
use crate::strata_vector::TreeStrata;
use crate::tree_vector::ReferenceTrees;
use forest_transport::Finalizable;

/// External stand identifier, carried as a plain string since it originates
/// from the input file rather than being minted by this process (see
/// `forest_core::ID`'s doc comment).
pub type StandId = String;

/// "Last-year-of-X" bookkeeping markers a guard condition checks against the
/// current simulated year (spec §4.4 "time-since-last-treatment" guards).
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TreatmentHistoryMarkers {
    pub year_of_last_cutting: Option<i32>,
    pub year_of_last_thinning: Option<i32>,
    pub year_of_soil_preparation: Option<i32>,
    pub year_of_regeneration: Option<i32>,
}

/// One management unit. Identifier is stable across clones and branches;
/// everything else is either a scalar ecological attribute or one of the two
/// vector collections.
#[derive(Debug, Clone)]
pub struct Stand {
    pub identifier: StandId,
    pub area: f64,
    pub degree_days: Option<i32>,
    pub site_class: i32,
    pub soil_class: i32,
    pub dominant_species: i32,
    pub dominant_storey_age: f64,
    pub dominant_height: f64,
    pub markers: TreatmentHistoryMarkers,
    pub reference_trees: ReferenceTrees,
    pub tree_strata: TreeStrata,
}

impl Stand {
    pub fn new(identifier: impl Into<StandId>, area: f64) -> Self {
        Self {
            identifier: identifier.into(),
            area,
            degree_days: None,
            site_class: -1,
            soil_class: -1,
            dominant_species: -1,
            dominant_storey_age: f64::NAN,
            dominant_height: f64::NAN,
            markers: TreatmentHistoryMarkers::default(),
            reference_trees: ReferenceTrees::default(),
            tree_strata: TreeStrata::default(),
        }
    }

    /// The limit-table lookup area class, derived from degree-days when
    /// known, else the summer-temperature-sum-less fallback (area 1).
    /// Mirrors `_area_from_degree_days` in the original lookup module.
    pub fn degree_day_area(&self) -> i32 {
        match self.degree_days {
            None => 1,
            Some(dd) if dd > 1200 => 1,
            Some(dd) if dd >= 1000 => 2,
            Some(dd) if dd >= 900 => 3,
            Some(_) => 4,
        }
    }
}

impl Finalizable for Stand {
    /// Finalizes both vector collections; the identifier and scalar fields
    /// are plain `Copy`/owned data and need no special handling to share
    /// safely across branches.
    fn finalize(&mut self) -> Self {
        Self {
            identifier: self.identifier.clone(),
            area: self.area,
            degree_days: self.degree_days,
            site_class: self.site_class,
            soil_class: self.soil_class,
            dominant_species: self.dominant_species,
            dominant_storey_age: self.dominant_storey_age,
            dominant_height: self.dominant_height,
            markers: self.markers,
            reference_trees: self.reference_trees.finalize(),
            tree_strata: self.tree_strata.finalize(),
        }
    }

    fn is_finalized(&self) -> bool {
        self.reference_trees.is_finalized() && self.tree_strata.is_finalized()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn degree_day_area_thresholds() {
        let mut stand = Stand::new("stand-1", 10.0);
        stand.degree_days = None;
        assert_eq!(stand.degree_day_area(), 1);
        stand.degree_days = Some(1300);
        assert_eq!(stand.degree_day_area(), 1);
        stand.degree_days = Some(1100);
        assert_eq!(stand.degree_day_area(), 2);
        stand.degree_days = Some(950);
        assert_eq!(stand.degree_day_area(), 3);
        stand.degree_days = Some(500);
        assert_eq!(stand.degree_day_area(), 4);
    }

    #[test]
    fn finalize_keeps_identity_stable() {
        let mut stand = Stand::new("stand-1", 5.0);
        let clone = stand.finalize();
        assert_eq!(stand.identifier, clone.identifier);
    }
}
