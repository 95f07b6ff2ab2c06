//! Error types for wheelly_brain

use std::fmt;

/// Main error type of the robot brain
///
/// All variants are configuration or construction errors; the per-tick
/// control path never fails.
#[derive(Debug, Clone, PartialEq)]
pub enum BrainError {
    /// A state with the same name is already registered
    DuplicateState(String),
    /// A transition for (state, exit code) is already registered
    DuplicateTransition(String, String),
    /// A transition or the initial state refers to an unknown state
    UndefinedState(String),
    /// The exit code is reserved and cannot be used as transition key
    ReservedExitCode(String),
    /// Invalid parameter
    InvalidParameter(String),
}

impl fmt::Display for BrainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BrainError::DuplicateState(name) => write!(f, "State {} already defined", name),
            BrainError::DuplicateTransition(from, exit) => {
                write!(f, "Transition ({}, {}) already defined", from, exit)
            }
            BrainError::UndefinedState(name) => write!(f, "State {} undefined", name),
            BrainError::ReservedExitCode(code) => write!(f, "Exit code {} is reserved", code),
            BrainError::InvalidParameter(msg) => write!(f, "Invalid parameter: {}", msg),
        }
    }
}

impl std::error::Error for BrainError {}

/// Result type alias for brain operations
pub type BrainResult<T> = Result<T, BrainError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = BrainError::DuplicateTransition("goto".to_string(), "Timeout".to_string());
        assert_eq!(format!("{}", err), "Transition (goto, Timeout) already defined");

        let err = BrainError::UndefinedState("scan".to_string());
        assert_eq!(err.to_string(), "State scan undefined");
    }

    #[test]
    fn test_error_is_std_error() {
        let err: Box<dyn std::error::Error> = Box::new(BrainError::InvalidParameter("grid size".into()));
        assert_eq!(err.to_string(), "Invalid parameter: grid size");
    }
}
