// PromptShelf — User preferences (favorites, recent, search history, usage)
//
// Persisted separately from the prompt forest. Components receive a
// `PreferencesStore` instead of reaching for a global.

use crate::search::ActiveFilter;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet, VecDeque};
use std::path::PathBuf;
use std::sync::Mutex;

pub const MAX_RECENT: usize = 10;
pub const MAX_SEARCH_HISTORY: usize = 20;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct UsageStats {
    pub count: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_used: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Preferences {
    /// Favorite prompt ids in the order they were starred.
    #[serde(default)]
    pub favorites: Vec<String>,
    /// Most recently used first, no duplicates.
    #[serde(default)]
    pub recent: VecDeque<String>,
    #[serde(default)]
    pub search_history: VecDeque<String>,
    #[serde(default)]
    pub usage: HashMap<String, UsageStats>,
    /// Set by `search` and `tags`, reset by `clear-search`.
    #[serde(default)]
    pub filter: ActiveFilter,
}

impl Preferences {
    pub fn is_favorite(&self, id: &str) -> bool {
        self.favorites.iter().any(|f| f == id)
    }

    /// Flip the favorite flag. Returns the new state.
    pub fn toggle_favorite(&mut self, id: &str) -> bool {
        if self.is_favorite(id) {
            self.favorites.retain(|f| f != id);
            false
        } else {
            self.favorites.push(id.to_string());
            true
        }
    }

    /// Move `id` to the front of the recent list and bump its counters.
    pub fn record_use(&mut self, id: &str) {
        self.recent.retain(|r| r != id);
        self.recent.push_front(id.to_string());
        self.recent.truncate(MAX_RECENT);

        let stats = self.usage.entry(id.to_string()).or_default();
        stats.count += 1;
        stats.last_used = Some(Utc::now());
    }

    pub fn record_search(&mut self, query: &str) {
        let q = query.trim();
        if q.is_empty() {
            return;
        }
        self.search_history.retain(|s| s != q);
        self.search_history.push_front(q.to_string());
        self.search_history.truncate(MAX_SEARCH_HISTORY);
    }

    pub fn use_count(&self, id: &str) -> u64 {
        self.usage.get(id).map(|u| u.count).unwrap_or(0)
    }

    /// Zero-based position in the recent list.
    pub fn recent_rank(&self, id: &str) -> Option<usize> {
        self.recent.iter().position(|r| r == id)
    }

    /// Drop references to prompts that no longer exist. Returns whether anything changed.
    pub fn prune(&mut self, exists: impl Fn(&str) -> bool) -> bool {
        let before = (self.favorites.len(), self.recent.len(), self.usage.len());
        self.favorites.retain(|id| exists(id));
        self.recent.retain(|id| exists(id));
        self.usage.retain(|id, _| exists(id));
        before != (self.favorites.len(), self.recent.len(), self.usage.len())
    }
}

// ---------------------------------------------------------------------------
// Storage
// ---------------------------------------------------------------------------

pub trait PreferencesStore: Send + Sync {
    fn load(&self) -> anyhow::Result<Preferences>;
    fn save(&self, prefs: &Preferences) -> anyhow::Result<()>;
}

/// JSON file backed preferences. A missing or unreadable file yields defaults.
pub struct JsonPreferencesStore {
    path: PathBuf,
}

impl JsonPreferencesStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl PreferencesStore for JsonPreferencesStore {
    fn load(&self) -> anyhow::Result<Preferences> {
        if !self.path.exists() {
            return Ok(Preferences::default());
        }
        let content = std::fs::read_to_string(&self.path)?;
        match serde_json::from_str(&content) {
            Ok(prefs) => Ok(prefs),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Preferences file is malformed, using defaults");
                Ok(Preferences::default())
            }
        }
    }

    fn save(&self, prefs: &Preferences) -> anyhow::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let tmp_path = self.path.with_extension("json.tmp");
        std::fs::write(&tmp_path, serde_json::to_string_pretty(prefs)?)?;
        std::fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }
}

/// In-memory preferences, for tests and one-shot sessions.
#[derive(Default)]
pub struct MemoryPreferencesStore {
    inner: Mutex<Preferences>,
}

impl MemoryPreferencesStore {
    pub fn new(prefs: Preferences) -> Self {
        Self {
            inner: Mutex::new(prefs),
        }
    }
}

impl PreferencesStore for MemoryPreferencesStore {
    fn load(&self) -> anyhow::Result<Preferences> {
        self.inner
            .lock()
            .map(|p| p.clone())
            .map_err(|_| anyhow::anyhow!("preferences lock poisoned"))
    }

    fn save(&self, prefs: &Preferences) -> anyhow::Result<()> {
        let mut guard = self
            .inner
            .lock()
            .map_err(|_| anyhow::anyhow!("preferences lock poisoned"))?;
        *guard = prefs.clone();
        Ok(())
    }
}

/// Ids of `prefs.favorites` that still exist, in starred order.
pub fn existing_favorites(prefs: &Preferences, exists: impl Fn(&str) -> bool) -> Vec<String> {
    let mut seen = HashSet::new();
    prefs
        .favorites
        .iter()
        .filter(|id| exists(id) && seen.insert(id.as_str()))
        .cloned()
        .collect()
}
