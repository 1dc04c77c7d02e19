//! Custom error types for the oscilloscope bindings.
//!
//! This module defines the primary error type, `ScopeError`, for the whole crate.
//! Using the `thiserror` crate, it provides a centralized and consistent way to handle
//! the different kinds of failures that can occur while talking to an instrument.
//!
//! ## Error Hierarchy
//!
//! - **`InvalidArgument`**: A validator rejected a candidate value, or a channel or
//!   waveform source token could not be resolved. Always raised before anything is
//!   transmitted, so the instrument state is unchanged.
//! - **`Transport`**: Wraps the `anyhow::Error` reported by the adapter. It is passed
//!   through untouched and never retried.
//! - **`Parse`**: An instrument reply (or a stored math definition) could not be decoded.
//! - **`NotSupported`**: The property does not exist on the selected model, or the
//!   descriptor is read-only / write-only for the requested direction.
//! - **`Template`**: A command template could not be filled in.
//! - **`Config`** / **`Configuration`**: Loading or validating `ScopeConfig` failed.
//!
//! By using `#[from]`, `ScopeError` can be created from the underlying error types,
//! so adapters and configuration code can use the `?` operator directly.

use thiserror::Error;

/// Convenience alias for results using the crate error type.
pub type ScopeResult<T> = std::result::Result<T, ScopeError>;

/// Errors raised by the oscilloscope bindings.
#[derive(Error, Debug)]
pub enum ScopeError {
    /// A value or token was rejected before transmission.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Failure reported by the transport adapter.
    #[error(transparent)]
    Transport(#[from] anyhow::Error),

    /// A reply could not be decoded.
    #[error("Failed to parse instrument reply: {0}")]
    Parse(String),

    /// The property is not available for this model or direction.
    #[error("Property '{0}' is not available on this device")]
    NotSupported(String),

    /// A command template could not be formatted.
    #[error("Command template error: {0}")]
    Template(String),

    /// The configuration sources could not be loaded.
    #[error("Configuration error: {0}")]
    Config(#[from] figment::Error),

    /// The configuration loaded but is semantically invalid.
    #[error("Configuration validation error: {0}")]
    Configuration(String),
}

impl ScopeError {
    /// Shorthand for an [`ScopeError::InvalidArgument`] error.
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    /// Shorthand for a [`ScopeError::Parse`] error.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }

    /// True when the error was raised before anything reached the instrument.
    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, Self::InvalidArgument(_))
    }
}

impl From<strfmt::FmtError> for ScopeError {
    fn from(err: strfmt::FmtError) -> Self {
        Self::Template(err.to_string())
    }
}
