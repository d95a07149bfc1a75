//! Persistence sink implementations and the lookup-table loader (spec C7,
//! §6 "Wire format of lookup tables"). `MemorySink` is the default; the
//! `database` feature adds a `tokio-postgres`-backed implementation,
//! following the teacher's `rbp-database`/`rbp-pg` split.
#![allow(dead_code)]

mod lookup;
mod memory;
#[cfg(feature = "database")]
mod postgres;
mod tables;

pub use lookup::{BasalAreaLimitTable, StemsAfterThinningTable};
pub use memory::{CollectedRow, MemorySink, NodeRow, StandRow, StrataRow, TreeRow};
#[cfg(feature = "database")]
pub use postgres::PostgresSink;
pub use tables::{collected_table, COLLECTED_PREFIX, NODES, STANDS, STRATA, TREES};
