//! Domain error type.
//!
//! [`IntakeError`] covers failures caused by the caller's input (missing
//! arguments, unknown contacts, unparseable values). Transports render these
//! as a human-readable string inside a successful response; anything else is
//! an `anyhow::Error` and surfaces as a transport-level failure.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IntakeError {
    /// A required argument was absent or empty.
    #[error("missing required argument: {0}")]
    MissingArgument(&'static str),

    /// An argument was present but could not be interpreted.
    #[error("invalid argument {name}: {reason}")]
    InvalidArgument { name: &'static str, reason: String },

    /// The referenced contact does not exist.
    #[error("lead not found: {0}")]
    LeadNotFound(i64),

    /// Not enough contact data to identify or create a contact.
    #[error("insufficient contact data: a phone number or email is required")]
    InsufficientContactData,
}

impl IntakeError {
    pub fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            name,
            reason: reason.into(),
        }
    }
}
