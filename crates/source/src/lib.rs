pub mod credentials;
pub mod http;
pub mod wire;

use async_trait::async_trait;
use premia_core::{Insurer, ProposalId, Quote, SourceError};

pub use credentials::{CredentialProvider, StaticCredential};
pub use http::HttpQuoteSource;

/// The remote quote/proposal capability the engine polls. Implementations
/// translate their transport's failures into [`SourceError`]: a rejected
/// credential is `Unauthorized`, everything else is `Unreachable`.
#[async_trait]
pub trait QuoteSource: Send + Sync {
    /// Current state of every product quote fanned out for a proposal. The
    /// same proposal is fetched repeatedly; each call returns a full
    /// snapshot, not a delta.
    async fn fetch_proposal_products(
        &self,
        proposal: &ProposalId,
    ) -> Result<Vec<Quote>, SourceError>;

    /// The insurer reference directory, fetched once per polling session.
    async fn fetch_insurer_directory(&self) -> Result<Vec<Insurer>, SourceError>;
}
