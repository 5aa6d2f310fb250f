//! Error types for the puzzle simulation.

use crate::orchestrator::SimulationState;

/// Errors returned by fallible simulation operations.
///
/// Precondition violations on UI-driven controls are not errors: those
/// calls log a warning and do nothing.
#[derive(Debug, Clone, PartialEq)]
pub enum SimulationError {
    /// Settings rejected during initialization.
    InvalidSettings(String),
    /// An operation needed a physics world that does not exist yet.
    NotInitialized,
    /// The orchestrator was not in the state an operation requires.
    InvalidState {
        expected: SimulationState,
        actual: SimulationState,
    },
    /// A piece was registered without any spheres.
    EmptyPiece(String),
    /// Sphere radius not a positive finite number.
    InvalidRadius(f32),
}

impl std::fmt::Display for SimulationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SimulationError::InvalidSettings(msg) => write!(f, "Invalid settings: {}", msg),
            SimulationError::NotInitialized => write!(f, "Physics world not initialized"),
            SimulationError::InvalidState { expected, actual } => {
                write!(f, "Invalid state: expected {:?}, was {:?}", expected, actual)
            }
            SimulationError::EmptyPiece(id) => write!(f, "Piece '{}' has no spheres", id),
            SimulationError::InvalidRadius(r) => write!(f, "Invalid sphere radius {}", r),
        }
    }
}

impl std::error::Error for SimulationError {}

/// Result type for simulation operations.
pub type SimulationResult<T> = Result<T, SimulationError>;
