//! Shared type aliases, identifiers, constants, and runtime utilities for the
//! forest simulation workspace.
#![allow(dead_code)]

mod error;

pub use error::BranchOutcome;
pub use error::ForestError;

// ============================================================================
// TYPE ALIASES
// ============================================================================
/// Stems per hectare, basal area, diameters — all numeric stand quantities.
pub type Measure = f64;
/// Simulation time points (years since an arbitrary epoch).
pub type TimePoint = i32;
/// Fractional shares, profile y-values, and search scales in `[0, 1]`-ish ranges.
pub type Share = f64;
/// A position in the event tree, rendered as dash-joined integers for persistence.
pub type NodePath = Vec<usize>;

/// Random instance generation, used by tests and by stands/trees requiring
/// placeholder data.
pub trait Arbitrary {
    fn random() -> Self;
}

/// Unique identifier trait for domain entities that carry a stable identifier.
pub trait Unique<T = Self> {
    fn id(&self) -> ID<T>;
}

// ============================================================================
// IDENTITY TYPES
// ============================================================================
use std::cmp::Ordering;
use std::fmt::Debug;
use std::fmt::Display;
use std::fmt::Formatter;
use std::hash::Hash;
use std::hash::Hasher;
use std::marker::PhantomData;

/// Generic ID wrapper providing compile-time type safety over `uuid::Uuid`.
///
/// Used for internal bookkeeping (run identifiers, node identifiers) where a
/// stable opaque handle is needed. Stand identifiers themselves are carried
/// as plain `String`s (`StandId`, see `forest-stand`) because they originate
/// from external input files, not from this process.
pub struct ID<T> {
    inner: uuid::Uuid,
    marker: PhantomData<T>,
}

impl<T> ID<T> {
    pub fn inner(&self) -> uuid::Uuid {
        self.inner
    }
    /// Cast `ID<T>` to `ID<U>` while preserving the underlying UUID.
    pub fn cast<U>(self) -> ID<U> {
        ID {
            inner: self.inner,
            marker: PhantomData,
        }
    }
}

impl<T> From<ID<T>> for uuid::Uuid {
    fn from(id: ID<T>) -> Self {
        id.inner()
    }
}
impl<T> From<uuid::Uuid> for ID<T> {
    fn from(inner: uuid::Uuid) -> Self {
        Self {
            inner,
            marker: PhantomData,
        }
    }
}

impl<T> Default for ID<T> {
    fn default() -> Self {
        Self {
            inner: uuid::Uuid::now_v7(),
            marker: PhantomData,
        }
    }
}

impl<T> Copy for ID<T> {}
impl<T> Clone for ID<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Eq for ID<T> {}
impl<T> PartialEq for ID<T> {
    fn eq(&self, other: &Self) -> bool {
        self.inner == other.inner
    }
}

impl<T> Ord for ID<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.inner.cmp(&other.inner)
    }
}
impl<T> PartialOrd for ID<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Hash for ID<T> {
    fn hash<H>(&self, state: &mut H)
    where
        H: Hasher,
    {
        self.inner.hash(state);
    }
}

impl<T> Debug for ID<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("ID").field(&self.inner).finish()
    }
}
impl<T> Display for ID<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.inner, f)
    }
}

// ============================================================================
// SELECTION ENGINE TOLERANCES (spec §4.1)
// ============================================================================
/// Relative tolerance factor applied to the global target.
pub const SELECTION_TOLERANCE_FACTOR: Measure = 0.001;
/// Absolute floor on the global-target tolerance.
pub const SELECTION_TOLERANCE_FLOOR: Measure = 0.005;
/// Absolute ceiling on the global-target tolerance.
pub const SELECTION_TOLERANCE_CEILING: Measure = 100.0;
/// Binary-search step floor; search halts once the step drops below this.
pub const SELECTION_STEP_FLOOR: Measure = 1e-4;
/// Initial scale for odds-based binary search in the "undershoot" branch.
pub const ODDS_SEARCH_SCALE_HIGH: Measure = 501.0;
/// Initial step for odds-based binary search in the "undershoot" branch.
pub const ODDS_SEARCH_STEP_HIGH: Measure = 1000.0;
/// Initial scale for odds-based binary search in the "overshoot" branch.
pub const ODDS_SEARCH_SCALE_LOW: Measure = 0.500_001;
/// Initial step for odds-based binary search in the "overshoot" branch.
pub const ODDS_SEARCH_STEP_LOW: Measure = 1.0;

// ============================================================================
// EVENT TREE PARAMETERS
// ============================================================================
/// Recursion depth above which the evaluator logs a warning (not a hard cap;
/// see spec §9 "Recursion depth").
pub const TREE_DEPTH_WARNING: usize = 200;

// ============================================================================
// RUNTIME UTILITIES
// ============================================================================
/// Initialize dual logging (terminal + file) with a timestamped log file.
/// Creates a `logs/` directory and writes DEBUG level to file, INFO to terminal.
#[cfg(feature = "server")]
pub fn log() {
    std::fs::create_dir_all("logs").expect("create logs directory");
    let config = simplelog::ConfigBuilder::new()
        .set_location_level(log::LevelFilter::Off)
        .set_target_level(log::LevelFilter::Off)
        .set_thread_level(log::LevelFilter::Off)
        .build();
    let time = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("time moves forward")
        .as_secs();
    let file = simplelog::WriteLogger::new(
        log::LevelFilter::Debug,
        config.clone(),
        std::fs::File::create(format!("logs/{}.log", time)).expect("create log file"),
    );
    let term = simplelog::TermLogger::new(
        log::LevelFilter::Info,
        config,
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    );
    simplelog::CombinedLogger::init(vec![term, file]).expect("initialize logger");
}

/// Register a Ctrl+C handler that logs and exits immediately.
#[cfg(feature = "server")]
pub fn register_interrupt() {
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        log::warn!("interrupt received, exiting");
        std::process::exit(0);
    });
}

/// Resolve `${EXECDIR}` tokens in a file-parameter path against the process's
/// current working directory (spec §6 "Environment").
pub fn resolve_execdir(path: &str) -> String {
    match std::env::current_dir() {
        Ok(dir) => path.replace("${EXECDIR}", &dir.to_string_lossy()),
        Err(_) => path.to_string(),
    }
}
