//! Error types for fitpath-core.
//!
//! Planning is deliberately forgiving: a plan that cannot reach compliance is
//! reported through [`crate::plan::PlanReport::ok`], not through an error, so
//! callers always get the closest attempt plus the full log. Errors here are
//! reserved for inputs the planner refuses to work with at all.

use thiserror::Error;

/// Result alias used across the core crate.
pub type FitpathResult<T> = Result<T, FitpathError>;

/// Errors produced before any planning work starts.
#[derive(Debug, Error)]
pub enum FitpathError {
    /// Malformed or self-contradictory policy. Caught up front; the planner
    /// never runs against an invalid policy.
    #[error("invalid policy: {0}")]
    InvalidPolicy(String),

    /// A caller-supplied value no component can work with.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Unknown destination preset name.
    #[error("unknown destination preset: {0}")]
    UnknownPreset(String),
}

impl FitpathError {
    pub fn invalid_policy(msg: impl Into<String>) -> Self {
        Self::InvalidPolicy(msg.into())
    }

    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    pub fn unknown_preset(name: impl Into<String>) -> Self {
        Self::UnknownPreset(name.into())
    }
}
