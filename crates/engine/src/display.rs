use std::cmp::Ordering;

use rust_decimal::Decimal;
use serde::Serialize;

use premia_core::{
    merge, normalize, CanonicalCoverage, InstallmentSelections, InsurerDirectory, InsurerId,
    Premium, ProductId, Quote, QuoteId, QuoteState,
};

/// One row of the consumer-facing result list: the polled quote joined with
/// its normalized premiums, canonical coverage, and resolved insurer
/// identity.
#[derive(Clone, Debug, Serialize)]
pub struct DisplayQuote {
    pub quote_id: QuoteId,
    pub insurer_id: InsurerId,
    pub insurer_name: String,
    pub insurer_logo_url: Option<String>,
    pub product_id: ProductId,
    pub state: QuoteState,
    pub premiums: Vec<Premium>,
    pub selected_installment: Option<u32>,
    pub selected_gross: Option<Decimal>,
    pub coverage: CanonicalCoverage,
    pub error_message: Option<String>,
}

/// Assemble and sort the result list for one poll cycle.
///
/// Sort key: ascending gross premium at the effective installment, ties
/// broken by insurer id ascending so consecutive polls render identically.
/// Placeholder rows without premiums sort after every priced row.
pub fn build_display_quotes(
    displayable: &[Quote],
    directory: &InsurerDirectory,
    coverage_fields: &[String],
    selections: &InstallmentSelections,
) -> Vec<DisplayQuote> {
    let mut rows: Vec<DisplayQuote> = displayable
        .iter()
        .map(|quote| {
            let premiums = normalize(&quote.premiums);
            let selected = selections.effective(&quote.id, &premiums).cloned();
            DisplayQuote {
                quote_id: quote.id.clone(),
                insurer_id: quote.insurer_id.clone(),
                insurer_name: directory.display_name(&quote.insurer_id),
                insurer_logo_url: directory.logo_url(&quote.insurer_id),
                product_id: quote.product_id.clone(),
                state: quote.state,
                selected_installment: selected.as_ref().map(|premium| premium.installment_count),
                selected_gross: selected.as_ref().map(|premium| premium.gross_amount),
                premiums,
                coverage: merge(coverage_fields, &quote.coverage),
                error_message: quote.error_message.clone(),
            }
        })
        .collect();

    rows.sort_by(|left, right| {
        compare_gross(left.selected_gross, right.selected_gross)
            .then_with(|| left.insurer_id.cmp(&right.insurer_id))
    });
    rows
}

fn compare_gross(left: Option<Decimal>, right: Option<Decimal>) -> Ordering {
    match (left, right) {
        (Some(left), Some(right)) => left.cmp(&right),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
