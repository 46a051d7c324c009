use std::collections::HashMap;

use crate::domain::quote::{Premium, QuoteId};

/// Collapse duplicate installment options delivered by the source.
///
/// At most one premium survives per distinct `installment_count`; the first
/// occurrence wins and source order is preserved. The first element of the
/// normalized list is the default selection for a quote that has never been
/// selected explicitly.
pub fn normalize(premiums: &[Premium]) -> Vec<Premium> {
    let mut seen: Vec<u32> = Vec::with_capacity(premiums.len());
    let mut normalized = Vec::with_capacity(premiums.len());
    for premium in premiums {
        if !seen.contains(&premium.installment_count) {
            seen.push(premium.installment_count);
            normalized.push(premium.clone());
        }
    }
    normalized
}

/// Session-scoped installment choices, keyed by quote id.
///
/// An explicit choice sticks for the rest of the session, across every later
/// poll of the same quote, no matter how the source reorders its premium
/// list. Without a choice the first normalized premium is the default.
#[derive(Clone, Debug, Default)]
pub struct InstallmentSelections {
    chosen: HashMap<QuoteId, u32>,
}

impl InstallmentSelections {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn select(&mut self, quote_id: QuoteId, installment_count: u32) {
        self.chosen.insert(quote_id, installment_count);
    }

    pub fn chosen_for(&self, quote_id: &QuoteId) -> Option<u32> {
        self.chosen.get(quote_id).copied()
    }

    /// Resolve the premium to present for a quote given its normalized
    /// premium list. A stored choice that the latest poll no longer offers
    /// falls back to the default, but the choice itself is retained in case a
    /// later poll re-delivers that option.
    pub fn effective<'a>(
        &self,
        quote_id: &QuoteId,
        normalized_premiums: &'a [Premium],
    ) -> Option<&'a Premium> {
        if let Some(chosen) = self.chosen_for(quote_id) {
            if let Some(premium) = normalized_premiums
                .iter()
                .find(|premium| premium.installment_count == chosen)
            {
                return Some(premium);
            }
        }
        normalized_premiums.first()
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::{normalize, InstallmentSelections};
    use crate::domain::quote::{Premium, QuoteId};

    fn premium(installments: u32, gross: i64) -> Premium {
        Premium {
            installment_count: installments,
            net_amount: Decimal::new(gross - 100, 2),
            gross_amount: Decimal::new(gross, 2),
            currency: "EUR".to_owned(),
        }
    }

    #[test]
    fn duplicate_installment_counts_collapse_first_seen_wins() {
        let normalized =
            normalize(&[premium(1, 120_00), premium(3, 130_00), premium(1, 999_00)]);

        assert_eq!(normalized.len(), 2);
        assert_eq!(normalized[0].gross_amount, Decimal::new(120_00, 2));
        assert_eq!(normalized[1].installment_count, 3);
    }

    #[test]
    fn normalization_preserves_source_order() {
        let normalized = normalize(&[premium(6, 1), premium(1, 2), premium(3, 3)]);
        let counts: Vec<u32> =
            normalized.iter().map(|premium| premium.installment_count).collect();
        assert_eq!(counts, vec![6, 1, 3]);
    }

    #[test]
    fn no_two_normalized_premiums_share_an_installment_count() {
        let premiums = vec![
            premium(1, 1),
            premium(3, 2),
            premium(1, 3),
            premium(6, 4),
            premium(3, 5),
            premium(6, 6),
        ];
        let normalized = normalize(&premiums);

        for (index, left) in normalized.iter().enumerate() {
            for right in &normalized[index + 1..] {
                assert_ne!(left.installment_count, right.installment_count);
            }
        }
    }

    #[test]
    fn default_selection_is_the_first_normalized_premium() {
        let selections = InstallmentSelections::new();
        let premiums = normalize(&[premium(3, 100_00), premium(1, 110_00)]);

        let effective = selections
            .effective(&QuoteId("q1".to_owned()), &premiums)
            .expect("default premium");
        assert_eq!(effective.installment_count, 3);
    }

    #[test]
    fn explicit_selection_survives_premium_reordering() {
        let mut selections = InstallmentSelections::new();
        let quote_id = QuoteId("q1".to_owned());
        selections.select(quote_id.clone(), 3);

        let reordered = normalize(&[premium(6, 1), premium(3, 2), premium(1, 3)]);
        let effective = selections.effective(&quote_id, &reordered).expect("premium");

        assert_eq!(effective.installment_count, 3);
    }

    #[test]
    fn missing_selected_option_falls_back_without_forgetting_the_choice() {
        let mut selections = InstallmentSelections::new();
        let quote_id = QuoteId("q1".to_owned());
        selections.select(quote_id.clone(), 12);

        let without_option = normalize(&[premium(1, 1), premium(3, 2)]);
        let effective = selections.effective(&quote_id, &without_option).expect("premium");
        assert_eq!(effective.installment_count, 1);

        let with_option = normalize(&[premium(1, 1), premium(12, 2)]);
        let restored = selections.effective(&quote_id, &with_option).expect("premium");
        assert_eq!(restored.installment_count, 12);
    }

    #[test]
    fn selections_are_keyed_per_quote() {
        let mut selections = InstallmentSelections::new();
        selections.select(QuoteId("q1".to_owned()), 6);

        let premiums = normalize(&[premium(1, 1), premium(6, 2)]);
        let other = selections
            .effective(&QuoteId("q2".to_owned()), &premiums)
            .expect("default for unselected quote");
        assert_eq!(other.installment_count, 1);
    }

    #[test]
    fn empty_premium_list_yields_no_selection() {
        let selections = InstallmentSelections::new();
        assert!(selections.effective(&QuoteId("q1".to_owned()), &[]).is_none());
    }
}
