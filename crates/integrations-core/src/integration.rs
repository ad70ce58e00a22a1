use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Third-party integrations the backend knows how to load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IntegrationType {
    Notion,
    Airtable,
    Hubspot,
}

impl IntegrationType {
    /// Selector order.
    pub const ALL: [IntegrationType; 3] = [
        IntegrationType::Notion,
        IntegrationType::Airtable,
        IntegrationType::Hubspot,
    ];

    pub fn label(self) -> &'static str {
        match self {
            IntegrationType::Notion => "Notion",
            IntegrationType::Airtable => "Airtable",
            IntegrationType::Hubspot => "Hubspot",
        }
    }

    /// Path segment used by the backend under `/integrations/`.
    pub fn slug(self) -> &'static str {
        match self {
            IntegrationType::Notion => "notion",
            IntegrationType::Airtable => "airtable",
            IntegrationType::Hubspot => "hubspot",
        }
    }

    /// Step through [`IntegrationType::ALL`], wrapping at both ends.
    pub fn cycle(current: Option<Self>, delta: isize) -> Self {
        let len = Self::ALL.len() as isize;
        let next = match current {
            Some(kind) => {
                let idx = Self::ALL.iter().position(|k| *k == kind).unwrap_or(0) as isize;
                (idx + delta).rem_euclid(len)
            }
            None if delta < 0 => len - 1,
            None => 0,
        };
        Self::ALL[next as usize]
    }
}

impl fmt::Display for IntegrationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Error)]
#[error("unknown integration type '{0}' (expected one of: notion, airtable, hubspot)")]
pub struct UnknownIntegration(pub String);

impl FromStr for IntegrationType {
    type Err = UnknownIntegration;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim();
        IntegrationType::ALL
            .into_iter()
            .find(|kind| {
                kind.slug().eq_ignore_ascii_case(needle) || kind.label().eq_ignore_ascii_case(needle)
            })
            .ok_or_else(|| UnknownIntegration(s.to_owned()))
    }
}
