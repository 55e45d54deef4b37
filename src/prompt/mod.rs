// PromptShelf — Prompt data model
//
// Prompts live in categories (system or user) and are organized into groups.
// The on-disk shape is in `document`, the in-memory forest in `tree`.

pub mod document;
pub mod tree;

use crate::evaluator::PromptScore;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeSet;

pub use document::{CategoryRecord, GroupRecord, PromptDocument};
pub use tree::{CategoryInfo, Entry, GroupInfo, PromptTree};

/// Ownership of a category. Determines edit permissions for everything beneath it.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum CategoryKind {
    #[default]
    System,
    User,
}

impl CategoryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CategoryKind::System => "system",
            CategoryKind::User => "user",
        }
    }

    /// Whether prompts under this kind may be edited, deleted and shared.
    pub fn is_mutable(&self) -> bool {
        matches!(self, CategoryKind::User)
    }
}

/// A labeled block of reusable text with `{{variable}}` placeholders.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Prompt {
    pub id: String,
    pub label: String,
    #[serde(rename = "prompt")]
    pub body: String,
    #[serde(default, deserialize_with = "deserialize_tags")]
    pub tags: BTreeSet<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evaluation: Option<PromptScore>,
}

impl Prompt {
    pub fn new(
        id: impl Into<String>,
        label: impl Into<String>,
        body: impl Into<String>,
        tags: impl IntoIterator<Item = impl AsRef<str>>,
    ) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            body: body.into(),
            tags: normalize_tags(tags),
            evaluation: None,
        }
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(&tag.to_lowercase())
    }
}

/// Trim, lowercase and de-duplicate tags, dropping empty entries.
pub fn normalize_tags(tags: impl IntoIterator<Item = impl AsRef<str>>) -> BTreeSet<String> {
    tags.into_iter()
        .map(|t| t.as_ref().trim().to_lowercase())
        .filter(|t| !t.is_empty())
        .collect()
}

/// Split a comma-separated tag list as typed by a user.
pub fn parse_tag_list(input: &str) -> BTreeSet<String> {
    normalize_tags(input.split(','))
}

fn deserialize_tags<'de, D>(deserializer: D) -> Result<BTreeSet<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Vec<String> = Vec::deserialize(deserializer)?;
    Ok(normalize_tags(raw))
}
