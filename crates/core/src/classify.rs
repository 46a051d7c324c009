use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::domain::quote::{ProductId, Quote, QuoteState};

/// Which quote states a product flow shows to the user. Flows with slow
/// long-tail insurers render `Waiting` quotes as placeholder cards; the rest
/// only show priced results.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisplayPolicy {
    #[default]
    ActiveOnly,
    ActiveWithPlaceholders,
}

/// One poll cycle's classification of the raw quote list.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Classification {
    /// Quotes whose product is on the channel allow-list.
    pub relevant: Vec<Quote>,
    /// The subset of `relevant` the current display policy shows.
    pub displayable: Vec<Quote>,
    /// True only when at least one relevant quote exists and every relevant
    /// quote has reached a terminal state. An empty relevant set is *not*
    /// finalized: the backend may simply not have fanned out yet.
    pub all_finalized: bool,
}

impl Classification {
    pub fn empty() -> Self {
        Self { relevant: Vec::new(), displayable: Vec::new(), all_finalized: false }
    }

    pub fn has_active(&self) -> bool {
        self.relevant.iter().any(|quote| quote.state == QuoteState::Active)
    }

    pub fn has_displayable(&self) -> bool {
        !self.displayable.is_empty()
    }

    pub fn all_relevant_failed(&self) -> bool {
        !self.relevant.is_empty()
            && self.relevant.iter().all(|quote| quote.state == QuoteState::Failed)
    }

    /// Share of relevant quotes that have finalized, in `0.0..=1.0`. Zero
    /// when nothing is relevant yet.
    pub fn finalized_fraction(&self) -> f64 {
        if self.relevant.is_empty() {
            return 0.0;
        }
        let finalized = self.relevant.iter().filter(|quote| quote.state.is_terminal()).count();
        finalized as f64 / self.relevant.len() as f64
    }
}

/// Pure classification over an immutable snapshot of polled quotes. Calling
/// this twice on the same input yields identical output; nothing is mutated.
pub fn classify(
    quotes: &[Quote],
    allowed_products: &BTreeSet<ProductId>,
    policy: DisplayPolicy,
) -> Classification {
    let relevant: Vec<Quote> = quotes
        .iter()
        .filter(|quote| allowed_products.contains(&quote.product_id))
        .cloned()
        .collect();

    let displayable: Vec<Quote> = relevant
        .iter()
        .filter(|quote| match policy {
            DisplayPolicy::ActiveOnly => quote.state == QuoteState::Active,
            DisplayPolicy::ActiveWithPlaceholders => {
                matches!(quote.state, QuoteState::Active | QuoteState::Waiting)
            }
        })
        .cloned()
        .collect();

    let all_finalized =
        !relevant.is_empty() && relevant.iter().all(|quote| quote.state.is_terminal());

    Classification { relevant, displayable, all_finalized }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::{classify, DisplayPolicy};
    use crate::domain::coverage::CoverageSnapshots;
    use crate::domain::quote::{InsurerId, ProductId, Quote, QuoteId, QuoteState};

    fn quote(id: &str, product: &str, state: QuoteState) -> Quote {
        Quote {
            id: QuoteId(id.to_owned()),
            insurer_id: InsurerId(format!("ins-{id}")),
            product_id: ProductId(product.to_owned()),
            state,
            premiums: Vec::new(),
            coverage: CoverageSnapshots::default(),
            error_message: None,
            policy_id: None,
        }
    }

    fn allowed(products: &[&str]) -> BTreeSet<ProductId> {
        products.iter().map(|product| ProductId((*product).to_owned())).collect()
    }

    #[test]
    fn filters_relevance_by_product_allow_list() {
        let quotes = vec![
            quote("q1", "mtpl", QuoteState::Active),
            quote("q2", "health", QuoteState::Active),
            quote("q3", "mtpl", QuoteState::Waiting),
        ];

        let classification = classify(&quotes, &allowed(&["mtpl"]), DisplayPolicy::ActiveOnly);

        assert_eq!(classification.relevant.len(), 2);
        assert_eq!(classification.displayable.len(), 1);
        assert_eq!(classification.displayable[0].id, QuoteId("q1".to_owned()));
        assert!(!classification.all_finalized);
    }

    #[test]
    fn placeholder_policy_also_shows_waiting_quotes() {
        let quotes =
            vec![quote("q1", "mtpl", QuoteState::Active), quote("q2", "mtpl", QuoteState::Waiting)];

        let classification =
            classify(&quotes, &allowed(&["mtpl"]), DisplayPolicy::ActiveWithPlaceholders);

        assert_eq!(classification.displayable.len(), 2);
    }

    #[test]
    fn failed_quotes_are_never_displayable() {
        let quotes = vec![quote("q1", "mtpl", QuoteState::Failed)];

        for policy in [DisplayPolicy::ActiveOnly, DisplayPolicy::ActiveWithPlaceholders] {
            let classification = classify(&quotes, &allowed(&["mtpl"]), policy);
            assert!(classification.displayable.is_empty());
        }
    }

    #[test]
    fn all_finalized_requires_every_relevant_quote_terminal() {
        let mixed =
            vec![quote("q1", "mtpl", QuoteState::Active), quote("q2", "mtpl", QuoteState::Waiting)];
        assert!(!classify(&mixed, &allowed(&["mtpl"]), DisplayPolicy::ActiveOnly).all_finalized);

        let settled =
            vec![quote("q1", "mtpl", QuoteState::Active), quote("q2", "mtpl", QuoteState::Failed)];
        assert!(classify(&settled, &allowed(&["mtpl"]), DisplayPolicy::ActiveOnly).all_finalized);
    }

    #[test]
    fn empty_relevant_set_is_not_finalized() {
        let quotes = vec![quote("q1", "health", QuoteState::Active)];
        let classification = classify(&quotes, &allowed(&["mtpl"]), DisplayPolicy::ActiveOnly);

        assert!(classification.relevant.is_empty());
        assert!(!classification.all_finalized);
    }

    #[test]
    fn classification_is_idempotent_over_the_same_snapshot() {
        let quotes = vec![
            quote("q1", "mtpl", QuoteState::Active),
            quote("q2", "mtpl", QuoteState::Waiting),
            quote("q3", "home", QuoteState::Failed),
        ];
        let allow = allowed(&["mtpl", "home"]);

        let first = classify(&quotes, &allow, DisplayPolicy::ActiveWithPlaceholders);
        let second = classify(&quotes, &allow, DisplayPolicy::ActiveWithPlaceholders);

        assert_eq!(first, second);
    }

    #[test]
    fn finalized_fraction_tracks_terminal_share() {
        let quotes = vec![
            quote("q1", "mtpl", QuoteState::Active),
            quote("q2", "mtpl", QuoteState::Waiting),
            quote("q3", "mtpl", QuoteState::Failed),
            quote("q4", "mtpl", QuoteState::Waiting),
        ];
        let classification = classify(&quotes, &allowed(&["mtpl"]), DisplayPolicy::ActiveOnly);

        assert!((classification.finalized_fraction() - 0.5).abs() < f64::EPSILON);
        assert!((super::Classification::empty().finalized_fraction()).abs() < f64::EPSILON);
    }

    #[test]
    fn all_relevant_failed_is_distinct_from_empty() {
        let failed =
            vec![quote("q1", "mtpl", QuoteState::Failed), quote("q2", "mtpl", QuoteState::Failed)];
        let classification = classify(&failed, &allowed(&["mtpl"]), DisplayPolicy::ActiveOnly);
        assert!(classification.all_relevant_failed());
        assert!(classification.all_finalized);

        assert!(!super::Classification::empty().all_relevant_failed());
    }
}
