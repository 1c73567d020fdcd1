//! Error types for the skirmish simulation.

use thiserror::Error;

use crate::facilities::FacilityId;
use crate::pieces::PieceId;

/// Result type alias using [`SimError`].
pub type Result<T> = std::result::Result<T, SimError>;

/// Top-level error type for all simulation errors.
///
/// Every variant is raised synchronously at the call that violates the
/// precondition. None of them are retried by the engine.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SimError {
    /// `run()` was invoked before `setup()`, or after the engine was spent.
    #[error("Engine is not configured: call setup() before run()")]
    NotConfigured,

    /// Facilities request more resources than the configured limit.
    #[error("Resource budget exceeded: requested {requested}, limit {limit}")]
    BudgetExceeded {
        /// Sum of all facility resources.
        requested: u32,
        /// Configured resource limit.
        limit: u32,
    },

    /// A piece id collides with one already registered.
    #[error("Duplicate piece ID: {0}")]
    DuplicateId(PieceId),

    /// A facility id collides with one already registered.
    #[error("Duplicate facility ID: {0}")]
    DuplicateFacilityId(FacilityId),

    /// A construction parameter is outside its valid domain.
    #[error("Invalid parameter '{name}' = {value}: {reason}")]
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// Offending value, rendered for display.
        value: String,
        /// Valid domain description.
        reason: &'static str,
    },

    /// Invalid persisted state (event log I/O or decoding).
    #[error("Invalid state: {0}")]
    InvalidState(String),
}

impl SimError {
    /// Build an [`SimError::InvalidParameter`] from any displayable value.
    pub(crate) fn invalid_parameter(
        name: &'static str,
        value: impl std::fmt::Display,
        reason: &'static str,
    ) -> Self {
        Self::InvalidParameter {
            name,
            value: value.to_string(),
            reason,
        }
    }
}
