use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::coverage::CoverageSnapshots;

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProposalId(pub String);

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct QuoteId(pub String);

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct InsurerId(pub String);

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProductId(pub String);

/// Lifecycle of one insurer's answer within a proposal. `Waiting` is the only
/// non-terminal state; the backend never reverts a quote out of `Active` or
/// `Failed`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QuoteState {
    Waiting,
    Active,
    Failed,
}

impl QuoteState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Active | Self::Failed)
    }

    /// Whether a freshly polled record is allowed to move this quote from
    /// `self` to `next`. Terminal states only ever re-deliver themselves.
    pub fn may_become(self, next: Self) -> bool {
        match self {
            Self::Waiting => true,
            Self::Active => next == Self::Active,
            Self::Failed => next == Self::Failed,
        }
    }
}

/// One payment-plan option for a quote. `installment_count` is the number of
/// installments the gross premium is split into; `1` means single payment.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Premium {
    pub installment_count: u32,
    pub net_amount: Decimal,
    pub gross_amount: Decimal,
    pub currency: String,
}

/// One insurer/product pricing response within a proposal, as observed from
/// the remote aggregator. The engine never mutates these records; it re-reads
/// them each poll cycle.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    pub id: QuoteId,
    pub insurer_id: InsurerId,
    pub product_id: ProductId,
    pub state: QuoteState,
    pub premiums: Vec<Premium>,
    pub coverage: CoverageSnapshots,
    pub error_message: Option<String>,
    pub policy_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::QuoteState;

    #[test]
    fn waiting_is_the_only_non_terminal_state() {
        assert!(!QuoteState::Waiting.is_terminal());
        assert!(QuoteState::Active.is_terminal());
        assert!(QuoteState::Failed.is_terminal());
    }

    #[test]
    fn terminal_states_never_revert() {
        assert!(QuoteState::Waiting.may_become(QuoteState::Active));
        assert!(QuoteState::Waiting.may_become(QuoteState::Failed));
        assert!(QuoteState::Waiting.may_become(QuoteState::Waiting));

        assert!(!QuoteState::Active.may_become(QuoteState::Waiting));
        assert!(!QuoteState::Active.may_become(QuoteState::Failed));
        assert!(QuoteState::Active.may_become(QuoteState::Active));

        assert!(!QuoteState::Failed.may_become(QuoteState::Waiting));
        assert!(!QuoteState::Failed.may_become(QuoteState::Active));
        assert!(QuoteState::Failed.may_become(QuoteState::Failed));
    }

    #[test]
    fn quote_state_uses_wire_spelling() {
        let json = serde_json::to_string(&QuoteState::Waiting).expect("serialize");
        assert_eq!(json, "\"WAITING\"");
        let parsed: QuoteState = serde_json::from_str("\"ACTIVE\"").expect("deserialize");
        assert_eq!(parsed, QuoteState::Active);
    }
}
