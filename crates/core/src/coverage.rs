use std::collections::BTreeMap;

use crate::domain::coverage::{CanonicalCoverage, CoverageSnapshot, CoverageSnapshots};

/// Merge the per-source coverage snapshots of one quote into its canonical
/// coverage record.
///
/// For each requested field the sources are consulted in fixed precedence:
/// document-extracted, then provider-computed, then the initial request-time
/// estimate. The first source holding a usable (known) value wins. Fields no
/// source can answer are absent from the result; the consumer renders absence
/// as "not included", never as an error.
///
/// Precedence is re-evaluated from scratch every poll cycle, so a field can
/// improve between polls but never degrade while a higher-precedence source
/// remains populated.
pub fn merge(field_names: &[String], sources: &CoverageSnapshots) -> CanonicalCoverage {
    let by_precedence: [&CoverageSnapshot; 3] =
        [&sources.document_extracted, &sources.provider_computed, &sources.initial];

    let mut merged = BTreeMap::new();
    for name in field_names {
        let winner = by_precedence
            .iter()
            .find_map(|snapshot| snapshot.get(name).filter(|value| !value.is_unknown()));
        if let Some(value) = winner {
            merged.insert(name.clone(), value.clone());
        }
    }

    CanonicalCoverage::from_fields(merged)
}
