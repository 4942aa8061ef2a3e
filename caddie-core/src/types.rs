//! Fundamental types shared by the comparison pipeline.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::catalog::CatalogItem;
use crate::normalize::FALLBACK_SUMMARY_PREFIX;

/// Which generation backend handles a comparison.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderId {
    #[default]
    Gemini,
    OpenAi,
    Perplexity,
}

impl ProviderId {
    pub const ALL: [ProviderId; 3] = [ProviderId::Gemini, ProviderId::OpenAi, ProviderId::Perplexity];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderId::Gemini => "gemini",
            ProviderId::OpenAi => "openai",
            ProviderId::Perplexity => "perplexity",
        }
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gemini" => Ok(ProviderId::Gemini),
            "openai" => Ok(ProviderId::OpenAi),
            "perplexity" => Ok(ProviderId::Perplexity),
            other => Err(format!(
                "unknown provider '{other}' (expected one of: gemini, openai, perplexity)"
            )),
        }
    }
}

/// The parts of a catalog item a prompt needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemDescriptor {
    pub brand: String,
    pub name: String,
    pub year: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_category: Option<String>,
}

impl ItemDescriptor {
    pub fn new(brand: impl Into<String>, name: impl Into<String>, year: i32) -> Self {
        Self {
            brand: brand.into(),
            name: name.into(),
            year,
            sub_category: None,
        }
    }

    pub fn with_sub_category(mut self, sub_category: impl Into<String>) -> Self {
        self.sub_category = Some(sub_category.into());
        self
    }

    /// Full label, e.g. `Ping G430 (2023) [max]`.
    ///
    /// The generator echoes this string back as a result key, so the format
    /// has to stay stable.
    pub fn label(&self) -> String {
        let base = format!("{} {} ({})", self.brand, self.name, self.year);
        match self.sub_category.as_deref() {
            Some(sub) if !sub.trim().is_empty() => format!("{base} [{sub}]"),
            _ => base,
        }
    }
}

impl From<&CatalogItem> for ItemDescriptor {
    fn from(item: &CatalogItem) -> Self {
        Self {
            brand: item.brand.clone(),
            name: item.name.clone(),
            year: item.year,
            sub_category: Some(item.sub_category.clone()),
        }
    }
}

/// Everything needed to run one comparison.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComparisonRequest {
    pub item1: ItemDescriptor,
    pub item2: ItemDescriptor,
    /// Player handicap.
    pub player_skill_level: i32,
    pub category: String,
    #[serde(default)]
    pub extra_notes: String,
    #[serde(default)]
    pub provider: ProviderId,
}

/// Pros and cons for one compared item.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProsCons {
    pub pros: Vec<String>,
    pub cons: Vec<String>,
}

/// Normalized comparison, keyed by the item names the generator echoed.
///
/// Entries keep the order they had in the reply.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComparisonResult {
    pub per_item: IndexMap<String, ProsCons>,
    pub summary: String,
}

impl ComparisonResult {
    /// True when the reply could not be parsed and the summary holds the
    /// raw reply. A parsed reply with no per-item entries is not degraded.
    pub fn is_degraded(&self) -> bool {
        self.per_item.is_empty() && self.summary.starts_with(FALLBACK_SUMMARY_PREFIX)
    }
}
