//! A selection set: one eligible-row mask, ordering variable, target, and
//! profile (spec §4.1, "1-N selection sets").
use crate::profile::Profile;
use crate::target::Target;

/// The treatment library computes `mask` up front (e.g. "conifers only",
/// "trees above breast-height-diameter 10cm") rather than handing this crate
/// a callback — selection stays generic over row predicates without needing
/// to know the stand's column layout.
#[derive(Debug, Clone)]
pub struct SelectionSet {
    pub mask: Vec<bool>,
    pub order_var: String,
    pub target: Target,
    pub profile: Profile,
}

impl SelectionSet {
    pub fn new(mask: Vec<bool>, order_var: impl Into<String>, target: Target, profile: Profile) -> Self {
        Self {
            mask,
            order_var: order_var.into(),
            target,
            profile,
        }
    }

    pub fn any_selected(&self) -> bool {
        self.mask.iter().any(|&m| m)
    }
}
