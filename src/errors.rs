//! Error types for the two external collaborators.
//!
//! Both enums are uniform result carriers: whether a failure is fatal or
//! recoverable is decided at the call site (only the startup account-list
//! fetch terminates the session), not by the error mechanism.

use thiserror::Error;

/// A gateway call failed.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("gateway request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("gateway returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("malformed gateway response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("gateway session already closed")]
    Closed,
}

/// An advisory service call or reply stream failed.
#[derive(Debug, Error)]
pub enum AdvisorError {
    #[error("advisory request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("advisory service returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("malformed advisory reply: {0}")]
    Decode(#[from] serde_json::Error),
}
