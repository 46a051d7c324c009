use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use secrecy::ExposeSecret;
use tracing::{debug, warn};

use premia_core::config::SourceConfig;
use premia_core::{Insurer, ProposalId, Quote, SourceError};

use crate::credentials::CredentialProvider;
use crate::wire::{InsurerDto, ProductRecordDto};
use crate::QuoteSource;

/// [`QuoteSource`] over the aggregator's HTTP API.
///
/// Endpoints: `GET /proposals/{id}/products` and `GET /insurers`, both bearer
/// authenticated. HTTP 401 maps to `Unauthorized`; every transport failure,
/// non-success status, and malformed payload maps to `Unreachable`.
pub struct HttpQuoteSource {
    client: reqwest::Client,
    base_url: String,
    credentials: Arc<dyn CredentialProvider>,
}

impl HttpQuoteSource {
    pub fn new(
        config: &SourceConfig,
        credentials: Arc<dyn CredentialProvider>,
    ) -> Result<Self, SourceError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|error| SourceError::Unreachable(error.to_string()))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_owned(),
            credentials,
        })
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T, SourceError> {
        let url = format!("{}{path}", self.base_url);
        let token = self.credentials.bearer_token()?;

        debug!(event_name = "source.request", url = %url, "requesting quote service");

        let response = self
            .client
            .get(&url)
            .bearer_auth(token.expose_secret())
            .send()
            .await
            .map_err(|error| {
                warn!(
                    event_name = "source.transport_failed",
                    url = %url,
                    error = %error,
                    "quote service request failed"
                );
                SourceError::Unreachable(error.to_string())
            })?;

        if let Some(error) = classify_status(response.status()) {
            warn!(
                event_name = "source.status_rejected",
                url = %url,
                status = %response.status(),
                error = %error,
                "quote service returned a non-success status"
            );
            return Err(error);
        }

        response.json::<T>().await.map_err(|error| {
            warn!(
                event_name = "source.malformed_payload",
                url = %url,
                error = %error,
                "quote service payload could not be decoded"
            );
            SourceError::Unreachable(format!("malformed payload: {error}"))
        })
    }
}

/// Status-to-error mapping shared by both endpoints. `None` means the status
/// is a success and the body should be decoded.
fn classify_status(status: StatusCode) -> Option<SourceError> {
    if status.is_success() {
        return None;
    }
    if status == StatusCode::UNAUTHORIZED {
        return Some(SourceError::Unauthorized);
    }
    Some(SourceError::Unreachable(format!("quote service responded with status {status}")))
}

#[async_trait]
impl QuoteSource for HttpQuoteSource {
    async fn fetch_proposal_products(
        &self,
        proposal: &ProposalId,
    ) -> Result<Vec<Quote>, SourceError> {
        let records: Vec<ProductRecordDto> =
            self.get_json(&format!("/proposals/{}/products", proposal.0)).await?;
        Ok(records.into_iter().map(ProductRecordDto::into_domain).collect())
    }

    async fn fetch_insurer_directory(&self) -> Result<Vec<Insurer>, SourceError> {
        let records: Vec<InsurerDto> = self.get_json("/insurers").await?;
        Ok(records.into_iter().map(InsurerDto::into_domain).collect())
    }
}

#[cfg(test)]
mod tests {
    use reqwest::StatusCode;

    use super::classify_status;
    use premia_core::SourceError;

    #[test]
    fn success_statuses_pass_through() {
        assert_eq!(classify_status(StatusCode::OK), None);
        assert_eq!(classify_status(StatusCode::CREATED), None);
    }

    #[test]
    fn unauthorized_is_its_own_failure_class() {
        assert_eq!(classify_status(StatusCode::UNAUTHORIZED), Some(SourceError::Unauthorized));
    }

    #[test]
    fn server_errors_and_other_statuses_are_unreachable() {
        for status in [
            StatusCode::INTERNAL_SERVER_ERROR,
            StatusCode::BAD_GATEWAY,
            StatusCode::SERVICE_UNAVAILABLE,
            StatusCode::NOT_FOUND,
            StatusCode::FORBIDDEN,
        ] {
            match classify_status(status) {
                Some(SourceError::Unreachable(detail)) => {
                    assert!(detail.contains(status.as_str()));
                }
                other => panic!("expected Unreachable for {status}, got {other:?}"),
            }
        }
    }
}
