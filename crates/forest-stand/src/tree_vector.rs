//! Structure-of-arrays reference-tree store (spec §3 "Reference trees", §4.2).
use crate::species::SpeciesCode;
use forest_transport::ColumnSource;
use forest_transport::Finalizable;
use std::sync::Arc;

/// One row's worth of attributes, used for both `create` (an absent field
/// takes the type-specific default) and `update` (an absent field leaves the
/// existing value untouched).
#[derive(Debug, Clone, Default)]
pub struct TreeFields {
    pub identifier: Option<String>,
    pub species: Option<SpeciesCode>,
    pub breast_height_diameter: Option<f64>,
    pub height: Option<f64>,
    pub biological_age: Option<f64>,
    pub breast_height_age: Option<f64>,
    pub stems_per_ha: Option<f64>,
    pub origin: Option<i32>,
    pub management_category: Option<i32>,
    pub storey: Option<i32>,
    pub sapling: Option<bool>,
    pub tree_number: Option<i32>,
    pub stand_origin_relative_position: Option<(f64, f64, f64)>,
}

/// A fully-resolved row, as returned by [`ReferenceTrees::read`].
#[derive(Debug, Clone, PartialEq)]
pub struct TreeRecord {
    pub identifier: String,
    pub species: SpeciesCode,
    pub breast_height_diameter: f64,
    pub height: f64,
    pub biological_age: f64,
    pub breast_height_age: f64,
    pub stems_per_ha: f64,
    pub origin: i32,
    pub management_category: i32,
    pub storey: i32,
    pub sapling: bool,
    pub tree_number: i32,
    pub stand_origin_relative_position: (f64, f64, f64),
}

/// Structure-of-arrays store of reference trees: one column per attribute,
/// all columns the same length. Columns are `Arc`-wrapped so that
/// [`finalize`](Self::finalize) can hand out a shallow, storage-sharing clone
/// to sibling branches; [`Arc::make_mut`] clones a column lazily, only on the
/// first mutation after a share (spec §9 "Vector store ownership").
#[derive(Debug, Clone)]
pub struct ReferenceTrees {
    identifier: Arc<Vec<String>>,
    species: Arc<Vec<SpeciesCode>>,
    breast_height_diameter: Arc<Vec<f64>>,
    height: Arc<Vec<f64>>,
    biological_age: Arc<Vec<f64>>,
    breast_height_age: Arc<Vec<f64>>,
    stems_per_ha: Arc<Vec<f64>>,
    origin: Arc<Vec<i32>>,
    management_category: Arc<Vec<i32>>,
    storey: Arc<Vec<i32>>,
    sapling: Arc<Vec<bool>>,
    tree_number: Arc<Vec<i32>>,
    stand_origin_relative_position: Arc<Vec<(f64, f64, f64)>>,
    finalized: bool,
}

impl Default for ReferenceTrees {
    fn default() -> Self {
        Self {
            identifier: Arc::new(Vec::new()),
            species: Arc::new(Vec::new()),
            breast_height_diameter: Arc::new(Vec::new()),
            height: Arc::new(Vec::new()),
            biological_age: Arc::new(Vec::new()),
            breast_height_age: Arc::new(Vec::new()),
            stems_per_ha: Arc::new(Vec::new()),
            origin: Arc::new(Vec::new()),
            management_category: Arc::new(Vec::new()),
            storey: Arc::new(Vec::new()),
            sapling: Arc::new(Vec::new()),
            tree_number: Arc::new(Vec::new()),
            stand_origin_relative_position: Arc::new(Vec::new()),
            finalized: false,
        }
    }
}

impl ReferenceTrees {
    pub fn len(&self) -> usize {
        self.identifier.len()
    }
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Appends one row, or inserts it at `index` if given. Absent fields take
    /// their type-specific default: integer -> -1, float -> NaN, string ->
    /// "", boolean -> false, tuple -> all-NaN (spec §4.2).
    pub fn create(&mut self, row: TreeFields, index: Option<usize>) {
        self.create_many(vec![row], index.map(|i| vec![i]));
    }

    /// Batch insertion. With explicit `indices` (same length as `rows`),
    /// insertion is order-stable: rows are applied in ascending index order
    /// with later indices renumbered as earlier insertions shift the array,
    /// matching the original's `create(list, index: list[int])` overload
    /// (spec SPEC_FULL §4.2).
    pub fn create_many(&mut self, rows: Vec<TreeFields>, indices: Option<Vec<usize>>) {
        if rows.is_empty() {
            return;
        }
        match indices {
            None => {
                for row in rows {
                    self.push(row);
                }
            }
            Some(mut idx) => {
                let mut order: Vec<usize> = (0..idx.len()).collect();
                order.sort_by_key(|&k| idx[k]);
                for k in order {
                    let at = idx[k];
                    self.insert_at(at, rows[k].clone());
                    for slot in idx.iter_mut() {
                        if *slot >= at {
                            *slot += 1;
                        }
                    }
                }
            }
        }
    }

    fn push(&mut self, row: TreeFields) {
        let at = self.len();
        self.insert_at(at, row);
    }

    fn insert_at(&mut self, at: usize, row: TreeFields) {
        Arc::make_mut(&mut self.identifier).insert(at, row.identifier.unwrap_or_default());
        Arc::make_mut(&mut self.species).insert(at, row.species.unwrap_or(-1));
        Arc::make_mut(&mut self.breast_height_diameter)
            .insert(at, row.breast_height_diameter.unwrap_or(f64::NAN));
        Arc::make_mut(&mut self.height).insert(at, row.height.unwrap_or(f64::NAN));
        Arc::make_mut(&mut self.biological_age).insert(at, row.biological_age.unwrap_or(f64::NAN));
        Arc::make_mut(&mut self.breast_height_age)
            .insert(at, row.breast_height_age.unwrap_or(f64::NAN));
        Arc::make_mut(&mut self.stems_per_ha).insert(at, row.stems_per_ha.unwrap_or(f64::NAN));
        Arc::make_mut(&mut self.origin).insert(at, row.origin.unwrap_or(-1));
        Arc::make_mut(&mut self.management_category).insert(at, row.management_category.unwrap_or(-1));
        Arc::make_mut(&mut self.storey).insert(at, row.storey.unwrap_or(-1));
        Arc::make_mut(&mut self.sapling).insert(at, row.sapling.unwrap_or(false));
        Arc::make_mut(&mut self.tree_number).insert(at, row.tree_number.unwrap_or(-1));
        Arc::make_mut(&mut self.stand_origin_relative_position).insert(
            at,
            row.stand_origin_relative_position
                .unwrap_or((f64::NAN, f64::NAN, f64::NAN)),
        );
    }

    pub fn read(&self, index: usize) -> TreeRecord {
        TreeRecord {
            identifier: self.identifier[index].clone(),
            species: self.species[index],
            breast_height_diameter: self.breast_height_diameter[index],
            height: self.height[index],
            biological_age: self.biological_age[index],
            breast_height_age: self.breast_height_age[index],
            stems_per_ha: self.stems_per_ha[index],
            origin: self.origin[index],
            management_category: self.management_category[index],
            storey: self.storey[index],
            sapling: self.sapling[index],
            tree_number: self.tree_number[index],
            stand_origin_relative_position: self.stand_origin_relative_position[index],
        }
    }

    /// Updates the given fields at `index`. A shared (finalized) column is
    /// cloned before the first write via [`Arc::make_mut`]; untouched columns
    /// stay byte-identical (shared) with the parent payload.
    pub fn update(&mut self, patch: TreeFields, index: usize) {
        if let Some(v) = patch.identifier {
            Arc::make_mut(&mut self.identifier)[index] = v;
        }
        if let Some(v) = patch.species {
            Arc::make_mut(&mut self.species)[index] = v;
        }
        if let Some(v) = patch.breast_height_diameter {
            Arc::make_mut(&mut self.breast_height_diameter)[index] = v;
        }
        if let Some(v) = patch.height {
            Arc::make_mut(&mut self.height)[index] = v;
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
        if let Some(v) = patch.tree_number {
            Arc::make_mut(&mut self.tree_number)[index] = v;
        }
        if let Some(v) = patch.stand_origin_relative_position {
            Arc::make_mut(&mut self.stand_origin_relative_position)[index] = v;
        }
    }

    /// Removes the given (already-sorted-or-not) indices, highest first so
    /// earlier removals don't shift later ones.
    pub fn delete(&mut self, indices: &[usize]) {
        let mut sorted = indices.to_vec();
        sorted.sort_unstable();
        sorted.dedup();
        for &i in sorted.iter().rev() {
            Arc::make_mut(&mut self.identifier).remove(i);
            Arc::make_mut(&mut self.species).remove(i);
            Arc::make_mut(&mut self.breast_height_diameter).remove(i);
            Arc::make_mut(&mut self.height).remove(i);
            Arc::make_mut(&mut self.biological_age).remove(i);
            Arc::make_mut(&mut self.breast_height_age).remove(i);
            Arc::make_mut(&mut self.stems_per_ha).remove(i);
            Arc::make_mut(&mut self.origin).remove(i);
            Arc::make_mut(&mut self.management_category).remove(i);
            Arc::make_mut(&mut self.storey).remove(i);
            Arc::make_mut(&mut self.sapling).remove(i);
            Arc::make_mut(&mut self.tree_number).remove(i);
            Arc::make_mut(&mut self.stand_origin_relative_position).remove(i);
        }
    }

    /// Direct mutable access to the frequency column, cloning it first if
    /// it's shared with another payload. Every thinning/cutting/marking
    /// treatment goes through this single entry point.
    pub fn stems_per_ha_mut(&mut self) -> &mut Vec<f64> {
        Arc::make_mut(&mut self.stems_per_ha)
    }
    /// Direct mutable access to the two age columns, used by the growth
    /// treatment to advance every row by the step's number of years.
    pub fn biological_age_mut(&mut self) -> &mut Vec<f64> {
        Arc::make_mut(&mut self.biological_age)
    }
    pub fn breast_height_age_mut(&mut self) -> &mut Vec<f64> {
        Arc::make_mut(&mut self.breast_height_age)
    }
    pub fn stems_per_ha(&self) -> &[f64] {
        &self.stems_per_ha
    }
    pub fn breast_height_diameter(&self) -> &[f64] {
        &self.breast_height_diameter
    }
    pub fn height(&self) -> &[f64] {
        &self.height
    }
    pub fn species(&self) -> &[SpeciesCode] {
        &self.species
    }
    pub fn identifier(&self) -> &[String] {
        &self.identifier
    }
    pub fn management_category(&self) -> &[i32] {
        &self.management_category
    }
}

impl Finalizable for ReferenceTrees {
    fn finalize(&mut self) -> Self {
        self.finalized = true;
        Self {
            identifier: Arc::clone(&self.identifier),
            species: Arc::clone(&self.species),
            breast_height_diameter: Arc::clone(&self.breast_height_diameter),
            height: Arc::clone(&self.height),
            biological_age: Arc::clone(&self.biological_age),
            breast_height_age: Arc::clone(&self.breast_height_age),
            stems_per_ha: Arc::clone(&self.stems_per_ha),
            origin: Arc::clone(&self.origin),
            management_category: Arc::clone(&self.management_category),
            storey: Arc::clone(&self.storey),
            sapling: Arc::clone(&self.sapling),
            tree_number: Arc::clone(&self.tree_number),
            stand_origin_relative_position: Arc::clone(&self.stand_origin_relative_position),
            finalized: true,
        }
    }
    fn is_finalized(&self) -> bool {
        self.finalized
    }
}

impl ColumnSource for ReferenceTrees {
    fn len(&self) -> usize {
        self.len()
    }
    fn column(&self, name: &str) -> Option<&[f64]> {
        match name {
            "stems_per_ha" | "f" => Some(&self.stems_per_ha),
            "breast_height_diameter" | "d" => Some(&self.breast_height_diameter),
            "height" | "h" => Some(&self.height),
            "biological_age" => Some(&self.biological_age),
            "breast_height_age" => Some(&self.breast_height_age),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(id: &str, d: f64, f: f64) -> TreeFields {
        TreeFields {
            identifier: Some(id.to_string()),
            breast_height_diameter: Some(d),
            stems_per_ha: Some(f),
            ..Default::default()
        }
    }

    #[test]
    fn create_appends_and_defaults() {
        let mut trees = ReferenceTrees::default();
        trees.create(row("t1", 20.0, 100.0), None);
        assert_eq!(trees.len(), 1);
        let rec = trees.read(0);
        assert_eq!(rec.identifier, "t1");
        assert_eq!(rec.origin, -1);
        assert!(rec.height.is_nan());
        assert!(!rec.sapling);
    }

    #[test]
    fn ordered_batch_insert_is_stable() {
        let mut trees = ReferenceTrees::default();
        trees.create_many(
            vec![row("a", 10.0, 1.0), row("b", 20.0, 2.0), row("c", 30.0, 3.0)],
            None,
        );
        // insert "x" at 1 and "y" at 2 (original indices), ascending order preserved
        trees.create_many(vec![row("x", 99.0, 9.0), row("y", 98.0, 8.0)], Some(vec![1, 2]));
        let ids: Vec<String> = (0..trees.len()).map(|i| trees.read(i).identifier).collect();
        assert_eq!(ids, vec!["a", "x", "b", "y", "c"]);
    }

    #[test]
    fn finalize_then_mutate_leaves_other_columns_shared() {
        let mut trees = ReferenceTrees::default();
        trees.create(row("t1", 20.0, 100.0), None);
        let mut clone = trees.finalize();
        assert!(trees.is_finalized());
        clone.stems_per_ha_mut()[0] = 50.0;
        assert_eq!(trees.read(0).stems_per_ha, 100.0);
        assert_eq!(clone.read(0).stems_per_ha, 50.0);
        // unmutated column stays pointer-identical (shared Arc)
        assert!(Arc::ptr_eq(&trees.breast_height_diameter, &clone.breast_height_diameter));
    }

    #[test]
    fn delete_removes_rows_across_all_columns() {
        let mut trees = ReferenceTrees::default();
        trees.create_many(
            vec![row("a", 10.0, 1.0), row("b", 20.0, 2.0), row("c", 30.0, 3.0)],
            None,
        );
        trees.delete(&[1]);
        assert_eq!(trees.len(), 2);
        let ids: Vec<String> = (0..trees.len()).map(|i| trees.read(i).identifier).collect();
        assert_eq!(ids, vec!["a", "c"]);
    }
}
