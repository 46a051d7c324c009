use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A single coverage field value, tagged with the kind the backend reported.
/// The same field may arrive with different kinds from different sources;
/// merging keeps whichever source wins precedence, kind included.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CoverageValue {
    Decimal(Decimal),
    Percent(Decimal),
    Number(i64),
    Included,
    Limitless,
    NotIncluded,
    Undefined,
}

impl CoverageValue {
    /// True when the value cannot answer "what does this quote cover" yet.
    /// Unknown values never survive a merge; a lower-precedence source gets
    /// the chance to answer instead.
    pub fn is_unknown(&self) -> bool {
        matches!(self, Self::Undefined)
    }

    /// Presentation bucket for this value. Total: every kind maps to exactly
    /// one bucket, so rendering never has to special-case.
    pub fn display_bucket(&self) -> DisplayBucket {
        match self {
            Self::Decimal(_) => DisplayBucket::Amount,
            Self::Percent(_) => DisplayBucket::Percentage,
            Self::Number(_) => DisplayBucket::Count,
            Self::Included => DisplayBucket::Included,
            Self::Limitless => DisplayBucket::Limitless,
            Self::NotIncluded | Self::Undefined => DisplayBucket::NotIncluded,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisplayBucket {
    Amount,
    Percentage,
    Count,
    Included,
    Limitless,
    NotIncluded,
}

/// A sparse bag of named coverage fields from one source. Sources routinely
/// disagree and routinely omit fields the product defines.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoverageSnapshot {
    fields: BTreeMap<String, CoverageValue>,
}

impl CoverageSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, name: impl Into<String>, value: CoverageValue) {
        self.fields.insert(name.into(), value);
    }

    pub fn with(mut self, name: impl Into<String>, value: CoverageValue) -> Self {
        self.set(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&CoverageValue> {
        self.fields.get(name)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &CoverageValue)> {
        self.fields.iter()
    }
}

impl FromIterator<(String, CoverageValue)> for CoverageSnapshot {
    fn from_iter<I: IntoIterator<Item = (String, CoverageValue)>>(iter: I) -> Self {
        Self { fields: iter.into_iter().collect() }
    }
}

/// The up-to-three coverage descriptions observed for one quote, by source.
/// Document extraction is the most authoritative and the slowest to arrive;
/// the request-time initial estimate is the weakest.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoverageSnapshots {
    pub initial: CoverageSnapshot,
    pub provider_computed: CoverageSnapshot,
    pub document_extracted: CoverageSnapshot,
}

/// The single merged coverage record derived for a quote in one poll cycle.
/// Fields no source could answer are absent, never present-but-unknown.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalCoverage {
    fields: BTreeMap<String, CoverageValue>,
}

impl CanonicalCoverage {
    pub(crate) fn from_fields(fields: BTreeMap<String, CoverageValue>) -> Self {
        Self { fields }
    }

    pub fn get(&self, name: &str) -> Option<&CoverageValue> {
        self.fields.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &CoverageValue)> {
        self.fields.iter()
    }
}
