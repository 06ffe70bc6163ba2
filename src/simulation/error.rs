//! Error types for the traffic simulation
//!
//! Configuration problems are fatal and surface at graph construction or
//! action-application time; invariant violations indicate a latent defect
//! in the tick pipeline and are returned as errors rather than logged.

use std::error::Error;
use std::fmt;

use super::types::Side;

/// Errors raised while building the road graph or applying an action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// An edge references an intersection index that does not exist.
    UnknownIntersection {
        /// Index of the offending edge in the edge list.
        edge: usize,
        /// The out-of-range intersection index.
        index: usize,
    },
    /// Two edges attach to the same side of the same intersection.
    OccupiedSide { intersection: usize, side: Side },
    /// An entrance has no routed exit segment to deliver cars into.
    MissingExit { intersection: usize, entrance: Side },
    /// The action vector length does not match the intersection count.
    ActionLength { expected: usize, got: usize },
    /// An action element does not index the red-duration table.
    ActionOutOfRange {
        intersection: usize,
        action: usize,
        table_len: usize,
    },
    /// A simulation parameter is outside its valid range.
    InvalidParameter {
        name: &'static str,
        reason: String,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownIntersection { edge, index } => {
                write!(f, "edge {edge} references unknown intersection {index}")
            }
            Self::OccupiedSide { intersection, side } => {
                write!(
                    f,
                    "side {side:?} of intersection {intersection} is already attached"
                )
            }
            Self::MissingExit {
                intersection,
                entrance,
            } => {
                write!(
                    f,
                    "entrance {entrance:?} of intersection {intersection} has no routed exit"
                )
            }
            Self::ActionLength { expected, got } => {
                write!(f, "action vector has {got} elements, expected {expected}")
            }
            Self::ActionOutOfRange {
                intersection,
                action,
                table_len,
            } => {
                write!(
                    f,
                    "action {action} for intersection {intersection} exceeds red-duration table of length {table_len}"
                )
            }
            Self::InvalidParameter { name, reason } => {
                write!(f, "invalid parameter {name}: {reason}")
            }
        }
    }
}

impl Error for ConfigError {}

/// Violations of internal tick-pipeline invariants.
///
/// Any of these indicates a bug in admission or hand-off bookkeeping, not
/// a recoverable runtime condition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvariantViolation {
    /// Two upstream entities delivered into one segment inbox in one tick.
    DoubleHandoff { segment: usize },
    /// A car crossed into an intersection without an admission decision.
    UnroutedHandoff { intersection: usize },
    /// A crossing car landed on an interior cell that was already taken.
    OccupiedInteriorCell { intersection: usize },
    /// Occupied interior cell count diverged from the pending-crossing count.
    InteriorDesync {
        intersection: usize,
        occupied: usize,
        pending: usize,
    },
}

impl fmt::Display for InvariantViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DoubleHandoff { segment } => {
                write!(f, "two hand-offs into segment {segment} in one tick")
            }
            Self::UnroutedHandoff { intersection } => {
                write!(
                    f,
                    "car crossed into intersection {intersection} without admission"
                )
            }
            Self::OccupiedInteriorCell { intersection } => {
                write!(
                    f,
                    "crossing car landed on an occupied interior cell of intersection {intersection}"
                )
            }
            Self::InteriorDesync {
                intersection,
                occupied,
                pending,
            } => {
                write!(
                    f,
                    "intersection {intersection} interior desync: {occupied} occupied cells, {pending} pending crossings"
                )
            }
        }
    }
}

impl Error for InvariantViolation {}

/// Top-level error type returned by the simulation boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimError {
    Config(ConfigError),
    Invariant(InvariantViolation),
}

impl fmt::Display for SimError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(e) => write!(f, "configuration error: {e}"),
            Self::Invariant(e) => write!(f, "invariant violation: {e}"),
        }
    }
}

impl Error for SimError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Config(e) => Some(e),
            Self::Invariant(e) => Some(e),
        }
    }
}

impl From<ConfigError> for SimError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

impl From<InvariantViolation> for SimError {
    fn from(e: InvariantViolation) -> Self {
        Self::Invariant(e)
    }
}
