//! Error taxonomy for the forest simulation core (spec §7).
use std::fmt;

/// Declaration, guard, numerical, and environment errors raised across the
/// workspace. Declaration errors are fatal to the whole run; guard and
/// numerical failures are caught by the evaluator and prune a single branch
/// (see [`BranchOutcome`]).
#[derive(Debug, Clone, PartialEq)]
pub enum ForestError {
    /// A selection-set profile carries a y-knot outside `[0, 1]`.
    InvalidProfile { set_index: usize, value: f64 },
    /// A target declaration names a `type` the engine does not recognize.
    UnknownTargetType(String),
    /// A selection set's scaling mode is not one of the four recognized modes.
    UnknownScalingMode(String),
    /// An `Event`'s `parameters` and `file_parameters` declare the same key.
    ParameterConflict(Vec<String>),
    /// A declared file-parameter path does not exist on disk at build time.
    FileNotFound(String),
    /// The merged keyword bundle does not validate against the declared
    /// treatment variant (spec §9 "Dynamic keyword parameters").
    InvalidParameters(String),
    /// The control structure names a run mode outside the known set.
    UnknownRunMode(String),
    /// A guard precondition or postcondition evaluated to false.
    ConditionFailed(String),
    /// The selection engine's binary search produced a NaN share.
    SelectionSearchDiverged,
    /// A treatment computed a negative per-row removal.
    NegativeRemoval,
    /// Every child of a branching node aborted (guard or numerical failure).
    AllChildrenAborted,
    /// I/O, control-file parsing, or persistence-layer failure.
    Environment(String),
}

impl fmt::Display for ForestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidProfile { set_index, value } => write!(
                f,
                "invalid profile in selection set {set_index}: y = {value} is outside [0, 1]"
            ),
            Self::UnknownTargetType(t) => write!(f, "unknown target type: {t}"),
            Self::UnknownScalingMode(m) => write!(f, "unknown scaling mode: {m}"),
            Self::ParameterConflict(keys) => {
                write!(f, "parameter(s) {keys:?} declared in both parameters and file_parameters")
            }
            Self::FileNotFound(path) => write!(f, "file not found: {path}"),
            Self::InvalidParameters(msg) => write!(f, "invalid treatment parameters: {msg}"),
            Self::UnknownRunMode(mode) => write!(f, "unknown run mode: {mode}"),
            Self::ConditionFailed(name) => write!(f, "condition failed: {name}"),
            Self::SelectionSearchDiverged => write!(f, "selection binary search diverged (NaN)"),
            Self::NegativeRemoval => write!(f, "treatment computed a negative removal"),
            Self::AllChildrenAborted => write!(f, "branch aborted with all children failing"),
            Self::Environment(msg) => write!(f, "environment error: {msg}"),
        }
    }
}

impl std::error::Error for ForestError {}

/// Distinguishes "this branch is pruned" from "this run is fatal" without
/// unwinding via panics (spec §9 "Deep-copy on branch fork" design notes).
///
/// The evaluator treats [`ConditionFailed`](ForestError::ConditionFailed),
/// [`SelectionSearchDiverged`](ForestError::SelectionSearchDiverged), and
/// [`NegativeRemoval`](ForestError::NegativeRemoval) as [`BranchOutcome::Pruned`];
/// everything else propagates as [`BranchOutcome::Fatal`] to the driver, which
/// logs and moves on to the next stand.
#[derive(Debug, Clone, PartialEq)]
pub enum BranchOutcome {
    Pruned(ForestError),
    Fatal(ForestError),
}

impl BranchOutcome {
    pub fn from_error(err: ForestError) -> Self {
        match err {
            ForestError::ConditionFailed(_)
            | ForestError::SelectionSearchDiverged
            | ForestError::NegativeRemoval => Self::Pruned(err),
            other => Self::Fatal(other),
        }
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Fatal(_))
    }

    pub fn into_error(self) -> ForestError {
        match self {
            Self::Pruned(e) | Self::Fatal(e) => e,
        }
    }
}

impl From<ForestError> for BranchOutcome {
    fn from(err: ForestError) -> Self {
        Self::from_error(err)
    }
}

impl fmt::Display for BranchOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pruned(e) => write!(f, "pruned: {e}"),
            Self::Fatal(e) => write!(f, "fatal: {e}"),
        }
    }
}

impl std::error::Error for BranchOutcome {}
