//! Wire-level payloads of the remote aggregator and their mapping into
//! domain types. The backend is loosely typed: coverage values arrive as
//! tagged strings, duplicate premium rows are common, and fields the insurer
//! has not answered yet carry a placeholder. Everything suspicious maps to
//! a safe domain value here so the rest of the engine never sees wire noise.

use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::warn;

use premia_core::{
    CoverageSnapshot, CoverageSnapshots, CoverageValue, Insurer, InsurerId, Premium, ProductId,
    Quote, QuoteId, QuoteState,
};

/// Value the backend sends for a coverage field it has not determined yet.
pub const PENDING_VALUE: &str = "PENDING";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductRecordDto {
    pub id: String,
    pub insurer_id: String,
    pub product_id: String,
    pub state: String,
    #[serde(default)]
    pub premiums: Vec<PremiumDto>,
    #[serde(default)]
    pub coverages: CoverageSourcesDto,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub policy_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PremiumDto {
    pub installment_number: u32,
    pub net_amount: Decimal,
    pub gross_amount: Decimal,
    #[serde(default = "default_currency")]
    pub currency: String,
}

fn default_currency() -> String {
    "EUR".to_owned()
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoverageSourcesDto {
    #[serde(default)]
    pub initial: Vec<CoverageFieldDto>,
    #[serde(default)]
    pub provider_computed: Vec<CoverageFieldDto>,
    #[serde(default)]
    pub document_extracted: Vec<CoverageFieldDto>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoverageFieldDto {
    pub name: String,
    pub kind: String,
    #[serde(default)]
    pub value: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsurerDto {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub logo_url: Option<String>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

impl ProductRecordDto {
    pub fn into_domain(self) -> Quote {
        let state = parse_state(&self.state, &self.id);
        Quote {
            id: QuoteId(self.id),
            insurer_id: InsurerId(self.insurer_id),
            product_id: ProductId(self.product_id),
            state,
            premiums: self.premiums.into_iter().map(PremiumDto::into_domain).collect(),
            coverage: self.coverages.into_domain(),
            error_message: self.error_message,
            policy_id: self.policy_id,
        }
    }
}

impl PremiumDto {
    fn into_domain(self) -> Premium {
        Premium {
            installment_count: self.installment_number,
            net_amount: self.net_amount,
            gross_amount: self.gross_amount,
            currency: self.currency,
        }
    }
}

impl CoverageSourcesDto {
    fn into_domain(self) -> CoverageSnapshots {
        CoverageSnapshots {
            initial: snapshot_from_fields(self.initial),
            provider_computed: snapshot_from_fields(self.provider_computed),
            document_extracted: snapshot_from_fields(self.document_extracted),
        }
    }
}

impl InsurerDto {
    pub fn into_domain(self) -> Insurer {
        Insurer {
            id: InsurerId(self.id),
            name: self.name,
            logo_url: self.logo_url,
            enabled: self.enabled,
        }
    }
}

fn parse_state(raw: &str, quote_id: &str) -> QuoteState {
    match raw.trim().to_ascii_uppercase().as_str() {
        "WAITING" => QuoteState::Waiting,
        "ACTIVE" => QuoteState::Active,
        "FAILED" => QuoteState::Failed,
        other => {
            warn!(
                event_name = "source.unknown_quote_state",
                quote_id,
                state = other,
                "unknown quote state from the aggregator, treating as WAITING"
            );
            QuoteState::Waiting
        }
    }
}

fn snapshot_from_fields(fields: Vec<CoverageFieldDto>) -> CoverageSnapshot {
    fields
        .into_iter()
        .map(|field| {
            let value = parse_coverage_value(&field.kind, field.value.as_deref());
            (field.name, value)
        })
        .collect()
}

/// Map one loosely-typed coverage cell into a domain value. Anything that
/// cannot answer "what is covered" — the pending placeholder, a missing or
/// unparseable amount, an unknown kind tag — becomes `Undefined`, which the
/// merger treats as "ask a weaker source".
fn parse_coverage_value(kind: &str, raw: Option<&str>) -> CoverageValue {
    let usable = raw.map(str::trim).filter(|value| !value.is_empty() && *value != PENDING_VALUE);

    match kind.trim().to_ascii_uppercase().as_str() {
        "DECIMAL" => usable
            .and_then(|value| value.parse::<Decimal>().ok())
            .map(CoverageValue::Decimal)
            .unwrap_or(CoverageValue::Undefined),
        "PERCENT" => usable
            .and_then(|value| value.trim_end_matches('%').parse::<Decimal>().ok())
            .map(CoverageValue::Percent)
            .unwrap_or(CoverageValue::Undefined),
        "NUMBER" => usable
            .and_then(|value| value.parse::<i64>().ok())
            .map(CoverageValue::Number)
            .unwrap_or(CoverageValue::Undefined),
        "INCLUDED" => CoverageValue::Included,
        "LIMITLESS" => CoverageValue::Limitless,
        "NOT_INCLUDED" => CoverageValue::NotIncluded,
        _ => CoverageValue::Undefined,
    }
}
