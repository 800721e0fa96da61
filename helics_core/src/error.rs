//! Error taxonomy for the message-filtering subsystem (§7).
//!
//! These are surfaced-to-caller error kinds, not exception types: operator failures on
//! synchronous paths are caught and logged rather than propagated, and filter returns for
//! an unknown marker are logged and discarded rather than raised here.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum HelicsError {
    /// Reference to a freed or never-created object. Internal callers treat this as a
    /// programmer error; the public handle API instead returns a null handle.
    #[error("invalid identifier: {0}")]
    InvalidIdentifier(String),

    /// Malformed time string, invalid regex, or an unknown property on a clone filter.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// State-machine violation, e.g. registering a filter after execution has started.
    #[error("invalid function call: {0}")]
    InvalidFunctionCall(String),

    /// Transport could not bind or connect. The affected core enters an error-terminal
    /// state; callers should treat all further operations on it as failing fast.
    #[error("connection failure: {0}")]
    ConnectionFailure(String),

    /// Duplicate global name, or a target that never resolved after initialization.
    #[error("registration failure: {0}")]
    RegistrationFailure(String),

    /// Unrecoverable internal invariant violation. The broker-base loop responds by
    /// emitting `CMD_TERMINATE_IMMEDIATELY`.
    #[error("system failure: {0}")]
    SystemFailure(String),
}

pub type Result<T> = std::result::Result<T, HelicsError>;
