//! Adapts [`ReferenceTrees`] to the selection engine's [`ColumnSource`] with
//! one addition: a derived basal-area column `g`, computed once per call
//! rather than stored on the tree vector (it is never mutated directly, only
//! read by order/target variables — spec SPEC_FULL §4.3 "stand metrics").
use crate::metrics::tree_basal_area;
use forest_stand::ReferenceTrees;
use forest_transport::ColumnSource;

pub struct TreesWithBasalArea<'a> {
    trees: &'a ReferenceTrees,
    g: Vec<f64>,
}

impl<'a> TreesWithBasalArea<'a> {
    pub fn new(trees: &'a ReferenceTrees) -> Self {
        let g = trees
            .breast_height_diameter()
            .iter()
            .map(|&d| tree_basal_area(d))
            .collect();
        Self { trees, g }
    }
}

impl ColumnSource for TreesWithBasalArea<'_> {
    fn len(&self) -> usize {
        self.trees.len()
    }
    fn column(&self, name: &str) -> Option<&[f64]> {
        match name {
            "g" => Some(&self.g),
            other => self.trees.column(other),
        }
    }
}
