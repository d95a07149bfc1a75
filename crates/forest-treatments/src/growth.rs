//! The growth treatment's external collaborator (spec §2 "growth models ...
//! consumed as opaque per-stand transforms", §4.3 "growth"). The real biomass
//! equations (Acta/Motti/Metsi) live outside this workspace; we specify only
//! the seam a concrete model plugs into.
use forest_stand::Stand;

/// Advances a stand by one simulation step. Implementations may mutate any
/// stand field; the treatment library only guarantees it is called with the
/// number of years elapsed since the previous step (typically 5).
///
/// `Send + Sync` so a [`TreatmentContext`](crate::TreatmentContext) can be
/// shared across `rayon`-parallel stand evaluations (spec §5, "stands are
/// independent and trivially parallelizable at the caller's discretion").
pub trait GrowthModel: Send + Sync {
    fn advance(&self, stand: &mut Stand, years: i32);
}

/// A placeholder model used when no real growth model is wired in: ages
/// every tree/stratum row and the stand's dominant-storey age by `years`,
/// leaving diameter/height untouched (those increments are exactly the
/// opaque part spec §2 carves out).
pub struct NullGrowth;

impl GrowthModel for NullGrowth {
    fn advance(&self, stand: &mut Stand, years: i32) {
        let dy = years as f64;
        if stand.dominant_storey_age.is_nan() {
            stand.dominant_storey_age = dy;
        } else {
            stand.dominant_storey_age += dy;
        }
        for age in stand.reference_trees.biological_age_mut().iter_mut() {
            if !age.is_nan() {
                *age += dy;
            }
        }
        for age in stand.reference_trees.breast_height_age_mut().iter_mut() {
            if !age.is_nan() {
                *age += dy;
            }
        }
        for age in stand.tree_strata.biological_age_mut().iter_mut() {
            if !age.is_nan() {
                *age += dy;
            }
        }
        for age in stand.tree_strata.breast_height_age_mut().iter_mut() {
            if !age.is_nan() {
                *age += dy;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_growth_ages_the_dominant_storey() {
        let mut stand = Stand::new("s1", 1.0);
        stand.dominant_storey_age = 40.0;
        NullGrowth.advance(&mut stand, 5);
        assert_eq!(stand.dominant_storey_age, 45.0);
    }
}
