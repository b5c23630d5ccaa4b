//! Error types for problem validation.

use alloc::string::String;
use core::fmt;

/// Faults a problem description can carry.
///
/// The solver itself never fails: malformed pieces degrade to inert entities
/// during the run. Validation exists so driver code can surface mistakes
/// before paying for a solve.
#[derive(Debug, Clone, PartialEq)]
pub enum ProblemError {
    /// Two points share an identifier.
    DuplicatePointId { id: String },
    /// Two segments share an identifier.
    DuplicateSegmentId { id: String },
    /// A point declares no layers.
    EmptyLayerSet { point: String },
    /// A point's clearance radius is negative.
    NegativeRadius { point: String },
    /// A segment's width is negative.
    NegativeWidth { segment: String },
    /// Bounds rectangle has min beyond max.
    InvalidBounds,
    /// Friction must lie in [0, 1].
    InvalidFriction,
}

impl fmt::Display for ProblemError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProblemError::DuplicatePointId { id } => {
                write!(f, "duplicate point id {:?}", id)
            }
            ProblemError::DuplicateSegmentId { id } => {
                write!(f, "duplicate segment id {:?}", id)
            }
            ProblemError::EmptyLayerSet { point } => {
                write!(f, "point {:?} declares no layers", point)
            }
            ProblemError::NegativeRadius { point } => {
                write!(f, "point {:?} has a negative radius", point)
            }
            ProblemError::NegativeWidth { segment } => {
                write!(f, "segment {:?} has a negative width", segment)
            }
            ProblemError::InvalidBounds => write!(f, "bounds min exceeds max"),
            ProblemError::InvalidFriction => write!(f, "friction must be in [0, 1]"),
        }
    }
}
