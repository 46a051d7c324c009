pub mod classify;
pub mod config;
pub mod coverage;
pub mod domain;
pub mod errors;
pub mod premiums;

pub use classify::{classify, Classification, DisplayPolicy};
pub use config::{
    AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat, ProductVertical,
    VerticalConfig,
};
pub use coverage::merge;
pub use domain::coverage::{
    CanonicalCoverage, CoverageSnapshot, CoverageSnapshots, CoverageValue, DisplayBucket,
};
pub use domain::insurer::{Insurer, InsurerDirectory};
pub use domain::quote::{InsurerId, Premium, ProductId, ProposalId, Quote, QuoteId, QuoteState};
pub use errors::{SessionError, SourceError};
pub use premiums::{normalize, InstallmentSelections};
