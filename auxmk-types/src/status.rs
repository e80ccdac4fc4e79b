use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Section written by the exercise tool for the pass that just completed.
pub const SECTION_PRINTED: &str = "printed";

/// Section written by the exercise tool for the pass that comes next.
pub const SECTION_PRINT: &str = "print";

/// Two-valued state of one item in a status file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemState {
    True,
    False,
}

impl ItemState {
    /// Parse the literal `true` / `false` token, with or without surrounding braces.
    pub fn from_token(token: &str) -> Option<Self> {
        let token = token.trim();
        let token = token
            .strip_prefix('{')
            .and_then(|t| t.strip_suffix('}'))
            .unwrap_or(token)
            .trim();
        match token {
            "true" => Some(ItemState::True),
            "false" => Some(ItemState::False),
            _ => None,
        }
    }

    pub fn as_bool(self) -> bool {
        matches!(self, ItemState::True)
    }
}

impl From<bool> for ItemState {
    fn from(value: bool) -> Self {
        if value {
            ItemState::True
        } else {
            ItemState::False
        }
    }
}

impl fmt::Display for ItemState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemState::True => f.write_str("true"),
            ItemState::False => f.write_str("false"),
        }
    }
}

/// Item states parsed from one named section of a status file.
///
/// Snapshots are rebuilt from disk on every check and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    section: String,
    entries: BTreeMap<String, ItemState>,
}

impl StatusSnapshot {
    /// Build a snapshot; a repeated identifier keeps its last state.
    pub fn from_entries<I, K>(section: impl Into<String>, entries: I) -> Self
    where
        I: IntoIterator<Item = (K, ItemState)>,
        K: Into<String>,
    {
        Self {
            section: section.into(),
            entries: entries.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }

    pub fn empty(section: impl Into<String>) -> Self {
        Self::from_entries(section, std::iter::empty::<(String, ItemState)>())
    }

    pub fn section(&self) -> &str {
        &self.section
    }

    pub fn get(&self, id: &str) -> Option<ItemState> {
        self.entries.get(id).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in identifier order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, ItemState)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), *v))
    }
}
