use secrecy::{ExposeSecret, SecretString};

use premia_core::SourceError;

/// Bearer-credential capability consumed by [`crate::HttpQuoteSource`].
///
/// Token acquisition, storage, and refresh live upstream; the engine only
/// asks for "a currently valid bearer credential" and treats a refusal as
/// `Unauthorized`, which terminates the session and forces re-authentication.
pub trait CredentialProvider: Send + Sync {
    fn bearer_token(&self) -> Result<SecretString, SourceError>;
}

/// Provider backed by one fixed token, as configured for operator tooling
/// and tests. An empty token is reported as invalid rather than sent.
pub struct StaticCredential {
    token: SecretString,
}

impl StaticCredential {
    pub fn new(token: SecretString) -> Self {
        Self { token }
    }
}

impl CredentialProvider for StaticCredential {
    fn bearer_token(&self) -> Result<SecretString, SourceError> {
        if self.token.expose_secret().trim().is_empty() {
            return Err(SourceError::Unauthorized);
        }
        Ok(self.token.clone())
    }
}
