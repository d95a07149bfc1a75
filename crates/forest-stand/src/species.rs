//! Species codes. The original wire formats carry species as small integers;
//! we keep the raw code as the canonical representation (so unknown/regional
//! codes round-trip losslessly) and expose named constants for the ones the
//! treatment library branches on.
use forest_core::Arbitrary;

pub type SpeciesCode = i32;

/// Species code used for absent/unset rows, matching
/// [`ReferenceTrees`](crate::ReferenceTrees)'s integer-column default.
pub const UNKNOWN: SpeciesCode = -1;
pub const SCOTS_PINE: SpeciesCode = 1;
pub const NORWAY_SPRUCE: SpeciesCode = 2;
pub const SILVER_BIRCH: SpeciesCode = 3;
pub const DOWNY_BIRCH: SpeciesCode = 4;
pub const OTHER_CONIFEROUS: SpeciesCode = 5;
pub const OTHER_DECIDUOUS: SpeciesCode = 6;

/// True for the two birch codes, used by conifer-priority thinning (spec §4.3)
/// to separate "preferred" conifer species from everything else.
pub fn is_conifer(species: SpeciesCode) -> bool {
    matches!(species, SCOTS_PINE | NORWAY_SPRUCE | OTHER_CONIFEROUS)
}

impl Arbitrary for SpeciesCode {
    fn random() -> Self {
        use rand::Rng;
        *[
            SCOTS_PINE,
            NORWAY_SPRUCE,
            SILVER_BIRCH,
            DOWNY_BIRCH,
            OTHER_CONIFEROUS,
            OTHER_DECIDUOUS,
        ]
        .get(rand::rng().random_range(0..6))
        .unwrap()
    }
}
