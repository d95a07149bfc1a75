//! Minimal JSON stand-list reader. Full wire-format adapters for stand/tree
//! input files are external per spec §1 Non-goals; this is the one concrete
//! format the CLI accepts directly so a run can actually be driven end to
//! end, following the teacher's DTO-then-convert pattern (`rbp-dto`) rather
//! than deserializing straight into the domain type.
use std::path::Path;

use forest_core::ForestError;
use forest_stand::{Stand, StratumFields, TreeFields};
use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct TreeFieldsInput {
    identifier: Option<String>,
    species: Option<i32>,
    breast_height_diameter: Option<f64>,
    height: Option<f64>,
    biological_age: Option<f64>,
    breast_height_age: Option<f64>,
    stems_per_ha: Option<f64>,
    origin: Option<i32>,
    management_category: Option<i32>,
    storey: Option<i32>,
    sapling: Option<bool>,
    tree_number: Option<i32>,
    stand_origin_relative_position: Option<(f64, f64, f64)>,
}

impl From<TreeFieldsInput> for TreeFields {
    fn from(dto: TreeFieldsInput) -> Self {
        Self {
            identifier: dto.identifier,
            species: dto.species,
            breast_height_diameter: dto.breast_height_diameter,
            height: dto.height,
            biological_age: dto.biological_age,
            breast_height_age: dto.breast_height_age,
            stems_per_ha: dto.stems_per_ha,
            origin: dto.origin,
            management_category: dto.management_category,
            storey: dto.storey,
            sapling: dto.sapling,
            tree_number: dto.tree_number,
            stand_origin_relative_position: dto.stand_origin_relative_position,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct StratumFieldsInput {
    identifier: Option<String>,
    species: Option<i32>,
    mean_diameter: Option<f64>,
    mean_height: Option<f64>,
    biological_age: Option<f64>,
    breast_height_age: Option<f64>,
    stems_per_ha: Option<f64>,
    origin: Option<i32>,
    management_category: Option<i32>,
    storey: Option<i32>,
    sapling: Option<bool>,
}

impl From<StratumFieldsInput> for StratumFields {
    fn from(dto: StratumFieldsInput) -> Self {
        Self {
            identifier: dto.identifier,
            species: dto.species,
            mean_diameter: dto.mean_diameter,
            mean_height: dto.mean_height,
            biological_age: dto.biological_age,
            breast_height_age: dto.breast_height_age,
            stems_per_ha: dto.stems_per_ha,
            origin: dto.origin,
            management_category: dto.management_category,
            storey: dto.storey,
            sapling: dto.sapling,
        }
    }
}

/// One stand in the input file. Scalar fields default to the same
/// "unset" sentinels [`Stand::new`] does, so a minimal `{"identifier":
/// "...", "area": ...}` row is always valid.
#[derive(Debug, Clone, Deserialize)]
struct StandInput {
    identifier: String,
    area: f64,
    #[serde(default)]
    degree_days: Option<i32>,
    #[serde(default = "default_unset")]
    site_class: i32,
    #[serde(default = "default_unset")]
    soil_class: i32,
    #[serde(default = "default_unset")]
    dominant_species: i32,
    #[serde(default = "default_nan")]
    dominant_storey_age: f64,
    #[serde(default = "default_nan")]
    dominant_height: f64,
    #[serde(default)]
    reference_trees: Vec<TreeFieldsInput>,
    #[serde(default)]
    tree_strata: Vec<StratumFieldsInput>,
}

fn default_unset() -> i32 {
    -1
}
fn default_nan() -> f64 {
    f64::NAN
}

impl From<StandInput> for Stand {
    fn from(dto: StandInput) -> Self {
        let mut stand = Stand::new(dto.identifier, dto.area);
        stand.degree_days = dto.degree_days;
        stand.site_class = dto.site_class;
        stand.soil_class = dto.soil_class;
        stand.dominant_species = dto.dominant_species;
        stand.dominant_storey_age = dto.dominant_storey_age;
        stand.dominant_height = dto.dominant_height;
        let trees = dto.reference_trees.into_iter().map(TreeFields::from).collect();
        stand.reference_trees.create_many(trees, None);
        for row in dto.tree_strata {
            stand.tree_strata.create(row.into());
        }
        stand
    }
}

/// Loads a JSON array of stands from `path` (spec §1 "input file readers
/// ... out of scope" covers the richer wire formats; this one concrete
/// format is the CLI's own, not a claim to implement "various" formats).
pub fn load_stands(path: &Path) -> Result<Vec<Stand>, ForestError> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| ForestError::Environment(format!("reading input file {}: {e}", path.display())))?;
    let dtos: Vec<StandInput> = serde_json::from_str(&content)
        .map_err(|e| ForestError::Environment(format!("parsing input file {}: {e}", path.display())))?;
    Ok(dtos.into_iter().map(Stand::from).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn a_minimal_stand_row_takes_the_same_defaults_as_stand_new() {
        let dto: StandInput = serde_json::from_value(serde_json::json!({
            "identifier": "stand-1",
            "area": 2.5,
        }))
        .unwrap();
        let stand: Stand = dto.into();
        assert_eq!(stand.identifier, "stand-1");
        assert_eq!(stand.site_class, -1);
        assert!(stand.dominant_height.is_nan());
        assert_eq!(stand.reference_trees.len(), 0);
    }

    #[test]
    fn reference_trees_and_strata_are_appended_in_declaration_order() {
        let dto: StandInput = serde_json::from_value(serde_json::json!({
            "identifier": "stand-1",
            "area": 1.0,
            "reference_trees": [
                {"species": 1, "breast_height_diameter": 20.0, "stems_per_ha": 100.0},
                {"species": 2, "breast_height_diameter": 25.0, "stems_per_ha": 50.0},
            ],
            "tree_strata": [
                {"species": 3, "mean_diameter": 5.0, "stems_per_ha": 400.0},
            ],
        }))
        .unwrap();
        let stand: Stand = dto.into();
        assert_eq!(stand.reference_trees.len(), 2);
        assert_eq!(stand.reference_trees.read(0).species, 1);
        assert_eq!(stand.reference_trees.read(1).species, 2);
        assert_eq!(stand.tree_strata.len(), 1);
        assert_eq!(stand.tree_strata.read(0).species, 3);
    }
}
