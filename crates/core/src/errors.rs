use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failures a QuoteSource implementation can signal. `Unauthorized` means the
/// bearer credential was rejected and must not be retried with the same
/// credential; everything else about the transport collapses into
/// `Unreachable`.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum SourceError {
    #[error("credential rejected by the quote service")]
    Unauthorized,
    #[error("quote service unreachable: {0}")]
    Unreachable(String),
}

/// Session-terminal failures surfaced to the consumer. A session carries at
/// most one of these; per-quote failures never escalate to this level.
#[derive(Clone, Debug, Error, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum SessionError {
    #[error("authentication is no longer valid; restart the upstream flow")]
    Auth,
    #[error("quote service unreachable: {0}")]
    Network(String),
}

impl SessionError {
    pub fn requires_reauthentication(&self) -> bool {
        matches!(self, Self::Auth)
    }
}

impl From<SourceError> for SessionError {
    fn from(value: SourceError) -> Self {
        match value {
            SourceError::Unauthorized => Self::Auth,
            SourceError::Unreachable(detail) => Self::Network(detail),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{SessionError, SourceError};

    #[test]
    fn unauthorized_maps_to_the_auth_session_error() {
        let session: SessionError = SourceError::Unauthorized.into();
        assert_eq!(session, SessionError::Auth);
        assert!(session.requires_reauthentication());
    }

    #[test]
    fn unreachable_maps_to_network_and_keeps_the_detail() {
        let session: SessionError =
            SourceError::Unreachable("connection reset".to_owned()).into();
        assert_eq!(session, SessionError::Network("connection reset".to_owned()));
        assert!(!session.requires_reauthentication());
    }

    #[test]
    fn session_errors_serialize_with_stable_kind_tags() {
        let json = serde_json::to_string(&SessionError::Auth).expect("serialize");
        assert_eq!(json, "{\"kind\":\"auth\"}");

        let json =
            serde_json::to_string(&SessionError::Network("503".to_owned())).expect("serialize");
        assert_eq!(json, "{\"kind\":\"network\",\"detail\":\"503\"}");
    }
}
