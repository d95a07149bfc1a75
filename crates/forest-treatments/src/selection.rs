//! Declarative, serializable selection overrides a caller can attach to a
//! treatment at tree-build time (the `tree_selection` keyword argument in the
//! original forestry operations). Internal default selections (e.g.
//! thin-number-of-stems' three priority sets) are built directly against
//! [`forest_selection`] types instead of going through this layer — it exists
//! only where the selection itself is part of the public parameter surface:
//! `cutting` (no defaults at all) and `mark_trees` (always caller-supplied).
use forest_selection::{Profile, ProfileXMode, ProfileXScale, ScalingMode, SelectFrom, SelectionSet, Target, TargetType};
use forest_stand::{is_conifer, ReferenceTrees};
use serde::{Deserialize, Serialize};

use crate::columns::TreesWithBasalArea;

/// A row-membership test, resolved against a stand's reference trees at
/// apply time (masks cannot be precomputed at tree-build time since the tree
/// is shared across every stand in the run).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum RowPredicate {
    All,
    Conifer,
    NonConifer,
    SpeciesIn(Vec<i32>),
    DiameterAbove(f64),
    ManagementCategoryAtMost(i32),
    And(Box<RowPredicate>, Box<RowPredicate>),
    Not(Box<RowPredicate>),
}

impl RowPredicate {
    pub fn mask(&self, trees: &ReferenceTrees) -> Vec<bool> {
        match self {
            Self::All => vec![true; trees.len()],
            Self::Conifer => trees.species().iter().map(|&s| is_conifer(s)).collect(),
            Self::NonConifer => trees.species().iter().map(|&s| !is_conifer(s)).collect(),
            Self::SpeciesIn(codes) => trees.species().iter().map(|s| codes.contains(s)).collect(),
            Self::DiameterAbove(d) => trees.breast_height_diameter().iter().map(|&v| v > *d).collect(),
            Self::ManagementCategoryAtMost(cat) => {
                trees.management_category().iter().map(|&v| v <= *cat).collect()
            }
            Self::And(a, b) => {
                let ma = a.mask(trees);
                let mb = b.mask(trees);
                ma.into_iter().zip(mb).map(|(x, y)| x && y).collect()
            }
            Self::Not(a) => a.mask(trees).into_iter().map(|v| !v).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectionSetDecl {
    pub predicate: RowPredicate,
    pub order_var: String,
    pub target_var: String,
    pub target_type: TargetTypeDecl,
    pub target_amount: f64,
    pub profile_x: Vec<f64>,
    pub profile_y: Vec<f64>,
    pub profile_xmode: ProfileXModeDecl,
    pub profile_xscale: Option<ProfileXScaleDecl>,
}

/// Spec §9 Open-Question resolution: both scaling-mode spellings normalize to
/// [`ScalingMode::OddsUnits`], via the alias on that type itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectionDecl {
    pub target_var: Option<String>,
    pub target_type: Option<TargetTypeDecl>,
    pub target_amount: Option<f64>,
    pub sets: Vec<SelectionSetDecl>,
    pub select_from: SelectFromDecl,
    pub scaling_mode: ScalingModeDecl,
}

impl SelectionDecl {
    /// A single all-inclusive set with a flat (constant) profile on `var`,
    /// used by treatments whose caller supplies only a bare target amount
    /// rather than a full set declaration, and by tests.
    pub fn all_flat(var: impl Into<String>, target_type: TargetTypeDecl, amount: f64) -> Self {
        let var = var.into();
        Self {
            target_var: Some(var.clone()),
            target_type: Some(target_type.clone()),
            target_amount: Some(amount),
            sets: vec![SelectionSetDecl {
                predicate: RowPredicate::All,
                order_var: var.clone(),
                target_var: var,
                target_type,
                target_amount: amount,
                profile_x: vec![0.0, 1.0],
                profile_y: vec![1.0, 1.0],
                profile_xmode: ProfileXModeDecl::Absolute,
                profile_xscale: None,
            }],
            select_from: SelectFromDecl::All,
            scaling_mode: ScalingModeDecl::OddsUnits,
        }
    }

    pub fn resolve(&self, trees: &ReferenceTrees) -> (Target, Vec<SelectionSet>) {
        let target = match (&self.target_var, &self.target_type, self.target_amount) {
            (Some(v), Some(t), Some(a)) => Target::new(v.clone(), t.clone().into(), a),
            _ => Target::unbounded(),
        };
        let sets = self
            .sets
            .iter()
            .map(|s| {
                let mask = s.predicate.mask(trees);
                let profile = Profile::new(
                    s.profile_x.clone(),
                    s.profile_y.clone(),
                    s.profile_xmode.clone().into(),
                    s.profile_xscale.clone().map(Into::into),
                );
                SelectionSet::new(
                    mask,
                    s.order_var.clone(),
                    Target::new(s.target_var.clone(), s.target_type.clone().into(), s.target_amount),
                    profile,
                )
            })
            .collect();
        (target, sets)
    }

    pub fn select_from(&self) -> SelectFrom {
        self.select_from.clone().into()
    }

    pub fn scaling_mode(&self) -> ScalingMode {
        self.scaling_mode.clone().into()
    }

    /// Convenience for data blocks that need the derived `g` column alongside
    /// the stand's raw columns (basal-area-targeted selections).
    pub fn resolve_with_basal_area<'a>(
        &self,
        trees: &'a ReferenceTrees,
    ) -> (Target, Vec<SelectionSet>, TreesWithBasalArea<'a>) {
        let (target, sets) = self.resolve(trees);
        (target, sets, TreesWithBasalArea::new(trees))
    }
}

// Serializable mirrors of the selection engine's enums. Kept distinct from
// `forest_selection`'s own types (which don't all derive `Deserialize`) so a
// control structure can name them directly (spec SPEC_FULL §3 AMBIENT).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetTypeDecl {
    Absolute,
    Relative,
    AbsoluteRemain,
    RelativeRemain,
}
impl From<TargetTypeDecl> for TargetType {
    fn from(v: TargetTypeDecl) -> Self {
        match v {
            TargetTypeDecl::Absolute => TargetType::Absolute,
            TargetTypeDecl::Relative => TargetType::Relative,
            TargetTypeDecl::AbsoluteRemain => TargetType::AbsoluteRemain,
            TargetTypeDecl::RelativeRemain => TargetType::RelativeRemain,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfileXModeDecl {
    Absolute,
    Relative,
}
impl From<ProfileXModeDecl> for ProfileXMode {
    fn from(v: ProfileXModeDecl) -> Self {
        match v {
            ProfileXModeDecl::Absolute => ProfileXMode::Absolute,
            ProfileXModeDecl::Relative => ProfileXMode::Relative,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfileXScaleDecl {
    All,
    Set,
}
impl From<ProfileXScaleDecl> for ProfileXScale {
    fn from(v: ProfileXScaleDecl) -> Self {
        match v {
            ProfileXScaleDecl::All => ProfileXScale::All,
            ProfileXScaleDecl::Set => ProfileXScale::Set,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectFromDecl {
    All,
    Remaining,
}
impl From<SelectFromDecl> for SelectFrom {
    fn from(v: SelectFromDecl) -> Self {
        match v {
            SelectFromDecl::All => SelectFrom::All,
            SelectFromDecl::Remaining => SelectFrom::Remaining,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScalingModeDecl {
    #[serde(alias = "odds_trees")]
    OddsUnits,
    OddsProfile,
    Scale,
    Level,
}
impl From<ScalingModeDecl> for ScalingMode {
    fn from(v: ScalingModeDecl) -> Self {
        match v {
            ScalingModeDecl::OddsUnits => ScalingMode::OddsUnits,
            ScalingModeDecl::OddsProfile => ScalingMode::OddsProfile,
            ScalingModeDecl::Scale => ScalingMode::Scale,
            ScalingModeDecl::Level => ScalingMode::Level,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use forest_stand::TreeFields;

    #[test]
    fn predicate_and_negation_compose() {
        let mut trees = ReferenceTrees::default();
        trees.create(
            TreeFields {
                species: Some(forest_stand::SCOTS_PINE),
                breast_height_diameter: Some(20.0),
                ..Default::default()
            },
            None,
        );
        trees.create(
            TreeFields {
                species: Some(forest_stand::SILVER_BIRCH),
                breast_height_diameter: Some(5.0),
                ..Default::default()
            },
            None,
        );
        let predicate = RowPredicate::And(
            Box::new(RowPredicate::Conifer),
            Box::new(RowPredicate::DiameterAbove(10.0)),
        );
        assert_eq!(predicate.mask(&trees), vec![true, false]);
        assert_eq!(RowPredicate::Not(Box::new(RowPredicate::Conifer)).mask(&trees), vec![false, true]);
    }
}
