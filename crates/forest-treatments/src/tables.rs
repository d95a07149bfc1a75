//! Auxiliary lookup-table interfaces consumed by the treatment library
//! (spec §4.3 "Basal-area thinning target derivation", §6 "Wire format of
//! lookup tables"). The tables themselves are thin external collaborators
//! per spec §1 Non-goals; `forest-persistence` owns parsing the on-disk wire
//! format and hands back a value implementing these traits.
use forest_stand::Stand;

/// `G_after_lower_limit`, indexed by (region, soil, site, dominant-height-bin,
/// species), as loaded from the asterisk-sectioned basal-area limit files
/// (spec §6). `region` is chosen by the caller from [`Stand::degree_day_area`].
pub trait BasalAreaLowerLimit: Send + Sync {
    fn lower_limit(&self, region: i32, soil_class: i32, site_class: i32, height_bin: usize, species: i32) -> f64;
}

/// Target stems-per-ha after a first-thinning-with-strip-roads pass, looked
/// up by whatever stand attributes the concrete table keys on (species,
/// site, dominant height, etc). Kept as a single opaque query per spec's
/// "thin, well-understood adapter" framing of auxiliary table loaders.
pub trait StemsAfterThinning: Send + Sync {
    fn target_stems_per_ha(&self, stand: &Stand) -> f64;
}

/// A no-op table usable as a default/test double: every lookup returns
/// `+inf`, which `BasalAreaThinning`'s clamp then reduces to zero proportion
/// removed — i.e. "do nothing" until a real table is wired in.
pub struct UnboundedTable;

impl BasalAreaLowerLimit for UnboundedTable {
    fn lower_limit(&self, _region: i32, _soil_class: i32, _site_class: i32, _height_bin: usize, _species: i32) -> f64 {
        f64::INFINITY
    }
}

impl StemsAfterThinning for UnboundedTable {
    fn target_stems_per_ha(&self, _stand: &Stand) -> f64 {
        f64::INFINITY
    }
}
