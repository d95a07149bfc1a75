//! Treatment library and condition guards (spec C3/C4).
#![allow(dead_code)]

mod columns;
mod growth;
mod guards;
mod metrics;
mod selection;
mod tables;
mod treatments;

pub use columns::TreesWithBasalArea;
pub use growth::{GrowthModel, NullGrowth};
pub use guards::Guard;
pub use metrics::{compute_stand_metrics, tree_basal_area, StandMetrics};
pub use selection::{
    ProfileXModeDecl, ProfileXScaleDecl, RowPredicate, ScalingModeDecl, SelectFromDecl, SelectionDecl,
    SelectionSetDecl, TargetTypeDecl,
};
pub use tables::{BasalAreaLowerLimit, StemsAfterThinning, UnboundedTable};
pub use treatments::{
    apply, ConiferPriorityParams, CuttingParams, FirstThinningParams, GrowthParams, MarkTreesParams,
    RegenerationParams, SelectionTargetTypeForConifer, SoilPrepParams, ThinBasalAreaParams,
    ThinNumberOfStemsParams, Treatment, TreatmentContext,
};
