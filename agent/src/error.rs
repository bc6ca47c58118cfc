//! Error types for the IAM client.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum IamError {
    /// Credentials rejected or the token endpoint stayed unreachable.
    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("group not found: {0}")]
    GroupNotFound(String),

    /// Non-2xx answer from a list/create/delete call.
    #[error("IAM call failed (HTTP {status}): {message}")]
    Backend { status: u16, message: String },

    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Malformed defaults document or settings.
    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    InvalidRole(#[from] common::UnknownRole),
}

impl IamError {
    /// Whether retrying the same request may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Backend { status, .. } => *status == 429 || (500..600).contains(status),
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            Self::Auth(_)
            | Self::GroupNotFound(_)
            | Self::Config(_)
            | Self::InvalidRole(_) => false,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::GroupNotFound(_))
    }
}

pub type Result<T> = std::result::Result<T, IamError>;


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_errors_and_throttling_are_transient() {
        let e = IamError::Backend { status: 503, message: "unavailable".into() };
        assert!(e.is_transient());
        let e = IamError::Backend { status: 429, message: "slow down".into() };
        assert!(e.is_transient());
    }

    #[test]
    fn client_errors_are_fatal() {
        let e = IamError::Backend { status: 400, message: "bad".into() };
        assert!(!e.is_transient());
        assert!(!IamError::Auth("denied".into()).is_transient());
        assert!(IamError::GroupNotFound("Dynatrace_x_Users".into()).is_not_found());
    }
}
