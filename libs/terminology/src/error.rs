//! Error types for the terminology core
//!
//! Only session and transport failures are errors. Unknown code systems,
//! unresolvable versions and unknown codes are recorded on the submitted code
//! itself and never surface here.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// Grant or ticket could not be established within the retry bound.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// No API key on file for the identity.
    #[error("Identity not enrolled: {0}")]
    NotEnrolled(String),

    /// The authority failed for a reason unrelated to ticket validity.
    #[error("Upstream error{}: {message}", .status.map(|s| format!(" ({s})")).unwrap_or_default())]
    Upstream {
        status: Option<u16>,
        message: String,
    },

    #[error("Credential store error: {0}")]
    Store(String),

    #[error("Code system catalog error: {0}")]
    Catalog(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl Error {
    pub fn upstream(message: impl Into<String>) -> Self {
        Error::Upstream {
            status: None,
            message: message.into(),
        }
    }

    /// True for every failure the caller should report as an authentication error.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Error::Unauthorized(_) | Error::NotEnrolled(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upstream_display_with_and_without_status() {
        let with_status = Error::Upstream {
            status: Some(503),
            message: "VSAC unavailable".to_string(),
        };
        assert_eq!(with_status.to_string(), "Upstream error (503): VSAC unavailable");
        assert_eq!(
            Error::upstream("connection reset").to_string(),
            "Upstream error: connection reset"
        );
    }

    #[test]
    fn test_unauthorized_classification() {
        assert!(Error::Unauthorized("x".into()).is_unauthorized());
        assert!(Error::NotEnrolled("alice".into()).is_unauthorized());
        assert!(!Error::upstream("x").is_unauthorized());
        assert!(!Error::InvalidRequest("x".into()).is_unauthorized());
    }
}
