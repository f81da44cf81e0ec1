//! Error types for manipulator tree and trajectory operations.

use thiserror::Error;

/// Errors reported by the manipulator tree and the trajectory solvers.
///
/// Every variant describes a caller-recoverable input problem. Operations that
/// fail leave the target untouched.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ManipulatorError {
    /// No world or component carries this name.
    #[error("unknown name: {0}")]
    UnknownName(String),

    /// A name is already used by the world or another component.
    #[error("duplicate name: {0}")]
    DuplicateName(String),

    /// Joint mutation on a tool, or tool mutation on a joint.
    #[error("type mismatch on '{name}': expected {expected}")]
    TypeMismatch {
        /// Component the operation targeted.
        name: String,
        /// Kind of component the operation requires.
        expected: &'static str,
    },

    /// A vector argument has the wrong length.
    #[error("dimension mismatch for {what}: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// What was being assigned.
        what: &'static str,
        /// Required length.
        expected: usize,
        /// Supplied length.
        actual: usize,
    },

    /// Timing parameters that would yield a singular or non-finite solve.
    #[error("numeric degeneracy: {0}")]
    NumericDegeneracy(String),

    /// Parent/child links of the tree are inconsistent.
    #[error("invalid tree: {0}")]
    InvalidTree(String),
}

impl ManipulatorError {
    /// Creates an unknown name error.
    #[must_use]
    pub fn unknown_name(name: impl Into<String>) -> Self {
        Self::UnknownName(name.into())
    }

    /// Creates a duplicate name error.
    #[must_use]
    pub fn duplicate_name(name: impl Into<String>) -> Self {
        Self::DuplicateName(name.into())
    }

    /// Creates a type mismatch error.
    #[must_use]
    pub fn type_mismatch(name: impl Into<String>, expected: &'static str) -> Self {
        Self::TypeMismatch {
            name: name.into(),
            expected,
        }
    }

    /// Creates a dimension mismatch error.
    #[must_use]
    pub const fn dimension_mismatch(what: &'static str, expected: usize, actual: usize) -> Self {
        Self::DimensionMismatch {
            what,
            expected,
            actual,
        }
    }

    /// Creates a numeric degeneracy error.
    #[must_use]
    pub fn numeric_degeneracy(reason: impl Into<String>) -> Self {
        Self::NumericDegeneracy(reason.into())
    }

    /// Creates an invalid tree error.
    #[must_use]
    pub fn invalid_tree(reason: impl Into<String>) -> Self {
        Self::InvalidTree(reason.into())
    }
}

/// Result type for manipulator operations.
pub type Result<T> = std::result::Result<T, ManipulatorError>;
