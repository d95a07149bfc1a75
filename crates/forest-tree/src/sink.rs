//! The evaluator's persistence seam (spec C7, consumed at §4.6 step 2). The
//! concrete in-memory and PostgreSQL-backed implementations live in
//! `forest-persistence`; this crate only needs the trait so the evaluator
//! doesn't depend on a storage backend.
use forest_core::{ForestError, NodePath};
use forest_stand::Payload;

/// Receives one call per visited node, in pre-order, with the post-treatment
/// payload. A parent node's record is always written before any of its
/// children's (spec §4.7 "every node persisted has a parent already
/// persisted").
pub trait Sink {
    fn record_node(&mut self, path: &NodePath, payload: &Payload) -> Result<(), ForestError>;
}

/// A sink that persists nothing; useful for dry runs and as the evaluator's
/// default in tests that only care about terminal payloads.
pub struct NullSink;

impl Sink for NullSink {
    fn record_node(&mut self, _path: &NodePath, _payload: &Payload) -> Result<(), ForestError> {
        Ok(())
    }
}
