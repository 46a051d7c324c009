use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::domain::quote::InsurerId;

/// Read-only reference record for one insurer in the network. Fetched once
/// per polling session; never refreshed mid-session.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Insurer {
    pub id: InsurerId,
    pub name: String,
    pub logo_url: Option<String>,
    pub enabled: bool,
}

/// Session-lifetime lookup over the insurer list.
#[derive(Clone, Debug, Default)]
pub struct InsurerDirectory {
    by_id: HashMap<InsurerId, Insurer>,
}

impl InsurerDirectory {
    pub fn new(insurers: Vec<Insurer>) -> Self {
        Self { by_id: insurers.into_iter().map(|insurer| (insurer.id.clone(), insurer)).collect() }
    }

    pub fn get(&self, id: &InsurerId) -> Option<&Insurer> {
        self.by_id.get(id)
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    /// Display name for an insurer id; the raw id stands in when the
    /// directory has no entry, so an unknown insurer still renders.
    pub fn display_name(&self, id: &InsurerId) -> String {
        self.get(id).map(|insurer| insurer.name.clone()).unwrap_or_else(|| id.0.clone())
    }

    pub fn logo_url(&self, id: &InsurerId) -> Option<String> {
        self.get(id).and_then(|insurer| insurer.logo_url.clone())
    }
}
