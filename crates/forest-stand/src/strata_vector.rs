//! Structure-of-arrays tree-stratum store (spec §3 "Tree strata"). Strata
//! describe a stand as aggregate per-species/diameter-class frequencies
//! rather than individual trees; the column set mirrors [`ReferenceTrees`]
//! minus the per-tree identity fields.
use crate::species::SpeciesCode;
use forest_transport::ColumnSource;
use forest_transport::Finalizable;
use std::sync::Arc;

#[derive(Debug, Clone, Default)]
pub struct StratumFields {
    pub identifier: Option<String>,
    pub species: Option<SpeciesCode>,
    pub mean_diameter: Option<f64>,
    pub mean_height: Option<f64>,
    pub biological_age: Option<f64>,
    pub breast_height_age: Option<f64>,
    pub stems_per_ha: Option<f64>,
    pub origin: Option<i32>,
    pub management_category: Option<i32>,
    pub storey: Option<i32>,
    pub sapling: Option<bool>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StratumRecord {
    pub identifier: String,
    pub species: SpeciesCode,
    pub mean_diameter: f64,
    pub mean_height: f64,
    pub biological_age: f64,
    pub breast_height_age: f64,
    pub stems_per_ha: f64,
    pub origin: i32,
    pub management_category: i32,
    pub storey: i32,
    pub sapling: bool,
}

/// Structure-of-arrays store of tree strata, sharing [`ReferenceTrees`]'s
/// finalize-on-fork / clone-on-write discipline (spec §9).
///
/// [`ReferenceTrees`]: crate::ReferenceTrees
#[derive(Debug, Clone)]
pub struct TreeStrata {
    identifier: Arc<Vec<String>>,
    species: Arc<Vec<SpeciesCode>>,
    mean_diameter: Arc<Vec<f64>>,
    mean_height: Arc<Vec<f64>>,
    biological_age: Arc<Vec<f64>>,
    breast_height_age: Arc<Vec<f64>>,
    stems_per_ha: Arc<Vec<f64>>,
    origin: Arc<Vec<i32>>,
    management_category: Arc<Vec<i32>>,
    storey: Arc<Vec<i32>>,
    sapling: Arc<Vec<bool>>,
    finalized: bool,
}

impl Default for TreeStrata {
    fn default() -> Self {
        Self {
            identifier: Arc::new(Vec::new()),
            species: Arc::new(Vec::new()),
            mean_diameter: Arc::new(Vec::new()),
            mean_height: Arc::new(Vec::new()),
            biological_age: Arc::new(Vec::new()),
            breast_height_age: Arc::new(Vec::new()),
            stems_per_ha: Arc::new(Vec::new()),
            origin: Arc::new(Vec::new()),
            management_category: Arc::new(Vec::new()),
            storey: Arc::new(Vec::new()),
            sapling: Arc::new(Vec::new()),
            finalized: false,
        }
    }
}

impl TreeStrata {
    pub fn len(&self) -> usize {
        self.identifier.len()
    }
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn create(&mut self, row: StratumFields) {
        Arc::make_mut(&mut self.identifier).push(row.identifier.unwrap_or_default());
        Arc::make_mut(&mut self.species).push(row.species.unwrap_or(-1));
        Arc::make_mut(&mut self.mean_diameter).push(row.mean_diameter.unwrap_or(f64::NAN));
        Arc::make_mut(&mut self.mean_height).push(row.mean_height.unwrap_or(f64::NAN));
        Arc::make_mut(&mut self.biological_age).push(row.biological_age.unwrap_or(f64::NAN));
        Arc::make_mut(&mut self.breast_height_age).push(row.breast_height_age.unwrap_or(f64::NAN));
        Arc::make_mut(&mut self.stems_per_ha).push(row.stems_per_ha.unwrap_or(f64::NAN));
        Arc::make_mut(&mut self.origin).push(row.origin.unwrap_or(-1));
        Arc::make_mut(&mut self.management_category).push(row.management_category.unwrap_or(-1));
        Arc::make_mut(&mut self.storey).push(row.storey.unwrap_or(-1));
        Arc::make_mut(&mut self.sapling).push(row.sapling.unwrap_or(false));
    }

    pub fn read(&self, index: usize) -> StratumRecord {
        StratumRecord {
            identifier: self.identifier[index].clone(),
            species: self.species[index],
            mean_diameter: self.mean_diameter[index],
            mean_height: self.mean_height[index],
            biological_age: self.biological_age[index],
            breast_height_age: self.breast_height_age[index],
            stems_per_ha: self.stems_per_ha[index],
            origin: self.origin[index],
            management_category: self.management_category[index],
            storey: self.storey[index],
            sapling: self.sapling[index],
        }
    }

    pub fn update(&mut self, patch: StratumFields, index: usize) {
        if let Some(v) = patch.identifier {
            Arc::make_mut(&mut self.identifier)[index] = v;
        }
        if let Some(v) = patch.species {
            Arc::make_mut(&mut self.species)[index] = v;
        }
        if let Some(v) = patch.mean_diameter {
            Arc::make_mut(&mut self.mean_diameter)[index] = v;
        }
        if let Some(v) = patch.mean_height {
            Arc::make_mut(&mut self.mean_height)[index] = v;
        }
        if let Some(v) = patch.biological_age {
            Arc::make_mut(&mut self.biological_age)[index] = v;
        }
        if let Some(v) = patch.breast_height_age {
            Arc::make_mut(&mut self.breast_height_age)[index] = v;
        }
        if let Some(v) = patch.stems_per_ha {
            Arc::make_mut(&mut self.stems_per_ha)[index] = v;
        }
        if let Some(v) = patch.origin {
            Arc::make_mut(&mut self.origin)[index] = v;
        }
        if let Some(v) = patch.management_category {
            Arc::make_mut(&mut self.management_category)[index] = v;
        }
        if let Some(v) = patch.storey {
            Arc::make_mut(&mut self.storey)[index] = v;
        }
        if let Some(v) = patch.sapling {
            Arc::make_mut(&mut self.sapling)[index] = v;
        }
    }

    pub fn delete(&mut self, indices: &[usize]) {
        let mut sorted = indices.to_vec();
        sorted.sort_unstable();
        sorted.dedup();
        for &i in sorted.iter().rev() {
            Arc::make_mut(&mut self.identifier).remove(i);
            Arc::make_mut(&mut self.species).remove(i);
            Arc::make_mut(&mut self.mean_diameter).remove(i);
            Arc::make_mut(&mut self.mean_height).remove(i);
            Arc::make_mut(&mut self.biological_age).remove(i);
            Arc::make_mut(&mut self.breast_height_age).remove(i);
            Arc::make_mut(&mut self.stems_per_ha).remove(i);
            Arc::make_mut(&mut self.origin).remove(i);
            Arc::make_mut(&mut self.management_category).remove(i);
            Arc::make_mut(&mut self.storey).remove(i);
            Arc::make_mut(&mut self.sapling).remove(i);
        }
    }

    pub fn stems_per_ha_mut(&mut self) -> &mut Vec<f64> {
        Arc::make_mut(&mut self.stems_per_ha)
    }
    pub fn biological_age_mut(&mut self) -> &mut Vec<f64> {
        Arc::make_mut(&mut self.biological_age)
    }
    pub fn breast_height_age_mut(&mut self) -> &mut Vec<f64> {
        Arc::make_mut(&mut self.breast_height_age)
    }
    pub fn stems_per_ha(&self) -> &[f64] {
        &self.stems_per_ha
    }
    pub fn mean_diameter(&self) -> &[f64] {
        &self.mean_diameter
    }
    pub fn mean_height(&self) -> &[f64] {
        &self.mean_height
    }
    pub fn species(&self) -> &[SpeciesCode] {
        &self.species
    }
}

impl Finalizable for TreeStrata {
    fn finalize(&mut self) -> Self {
        self.finalized = true;
        Self {
            identifier: Arc::clone(&self.identifier),
            species: Arc::clone(&self.species),
            mean_diameter: Arc::clone(&self.mean_diameter),
            mean_height: Arc::clone(&self.mean_height),
            biological_age: Arc::clone(&self.biological_age),
            breast_height_age: Arc::clone(&self.breast_height_age),
            stems_per_ha: Arc::clone(&self.stems_per_ha),
            origin: Arc::clone(&self.origin),
            management_category: Arc::clone(&self.management_category),
            storey: Arc::clone(&self.storey),
            sapling: Arc::clone(&self.sapling),
            finalized: true,
        }
    }
    fn is_finalized(&self) -> bool {
        self.finalized
    }
}

impl ColumnSource for TreeStrata {
    fn len(&self) -> usize {
        self.len()
    }
    fn column(&self, name: &str) -> Option<&[f64]> {
        match name {
            "stems_per_ha" | "f" => Some(&self.stems_per_ha),
            "mean_diameter" | "d" => Some(&self.mean_diameter),
            "mean_height" | "h" => Some(&self.mean_height),
            "biological_age" => Some(&self.biological_age),
            "breast_height_age" => Some(&self.breast_height_age),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_and_read_roundtrips() {
        let mut strata = TreeStrata::default();
        strata.create(StratumFields {
            identifier: Some("s1".to_string()),
            species: Some(1),
            stems_per_ha: Some(400.0),
            ..Default::default()
        });
        let rec = strata.read(0);
        assert_eq!(rec.identifier, "s1");
        assert_eq!(rec.stems_per_ha, 400.0);
        assert!(rec.mean_diameter.is_nan());
    }

    #[test]
    fn finalize_clone_is_independent_on_write() {
        let mut strata = TreeStrata::default();
        strata.create(StratumFields {
            stems_per_ha: Some(10.0),
            ..Default::default()
        });
        let mut clone = strata.finalize();
        clone.stems_per_ha_mut()[0] = 5.0;
        assert_eq!(strata.stems_per_ha()[0], 10.0);
        assert_eq!(clone.stems_per_ha()[0], 5.0);
    }
}
