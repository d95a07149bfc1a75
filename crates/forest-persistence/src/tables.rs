//! Table name constants for the logical schema (spec §4.7), following
//! `rbp_pg`'s single constant-list module.
use forest_core::ForestError;

pub const NODES: &str = "nodes";
pub const STANDS: &str = "stands";
pub const TREES: &str = "trees";
pub const STRATA: &str = "strata";
/// Prefix for the one-table-per-collected-data-kind rows; the concrete table
/// for kind `"removed_trees"` is `collected_removed_trees`.
pub const COLLECTED_PREFIX: &str = "collected_";

/// Builds the per-kind table name for a control-file-declared collected-data
/// kind, rejecting anything that isn't a plain identifier. Unlike `NODES` and
/// friends, `kind` is a runtime string from `EventDecl::collected_data_kinds`
/// rather than a compile-time constant, so it cannot be trusted to land
/// directly in `CREATE TABLE`/`INSERT INTO` SQL the way the teacher's
/// `rbp-pg::Schema` trait only ever builds DDL from `&'static str`s.
pub fn collected_table(kind: &str) -> Result<String, ForestError> {
    if kind.is_empty()
        || kind.len() > 56
        || !kind.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
        || kind.starts_with(|c: char| c.is_ascii_digit())
    {
        return Err(ForestError::Environment(format!(
            "collected data kind {kind:?} is not a valid table-name identifier"
        )));
    }
    Ok(format!("{COLLECTED_PREFIX}{kind}"))
}
