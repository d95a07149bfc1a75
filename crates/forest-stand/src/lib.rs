//! Stand vector store, payload, collected-data, and operation history
//! (spec C2/C3 data model).
#![allow(dead_code)]

mod payload;
mod species;
mod stand;
mod strata_vector;
mod tree_vector;

pub use payload::CollectedData;
pub use payload::HistoryEntry;
pub use payload::Payload;
pub use species::SpeciesCode;
pub use species::{is_conifer, DOWNY_BIRCH, NORWAY_SPRUCE, OTHER_CONIFEROUS, OTHER_DECIDUOUS, SCOTS_PINE, SILVER_BIRCH, UNKNOWN};
pub use stand::Stand;
pub use stand::StandId;
pub use stand::TreatmentHistoryMarkers;
pub use strata_vector::StratumFields;
pub use strata_vector::StratumRecord;
pub use strata_vector::TreeStrata;
pub use tree_vector::ReferenceTrees;
pub use tree_vector::TreeFields;
pub use tree_vector::TreeRecord;
