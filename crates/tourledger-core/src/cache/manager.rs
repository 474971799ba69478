use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::models::Record;

/// Consider a cached collection stale after 1 hour without a write.
const CACHE_STALE_MINUTES: i64 = 60;

/// Time of the last write to a cached collection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CacheAge {
    pub written_at: DateTime<Utc>,
}

impl CacheAge {
    pub fn new(written_at: DateTime<Utc>) -> Self {
        Self { written_at }
    }

    pub fn age_minutes(&self) -> i64 {
        (Utc::now() - self.written_at).num_minutes()
    }

    pub fn age_display(&self) -> String {
        let minutes = self.age_minutes();
        if minutes < 1 {
            // Also covers clock skew
            "just now".to_string()
        } else if minutes < 60 {
            format!("{}m ago", minutes)
        } else if minutes < 1440 {
            let hours = minutes / 60;
            if minutes % 60 >= 30 {
                format!("{}h ago", hours + 1)
            } else {
                format!("{}h ago", hours)
            }
        } else {
            let days = minutes / 1440;
            if (minutes % 1440) / 60 >= 12 {
                format!("{}d ago", days + 1)
            } else {
                format!("{}d ago", days)
            }
        }
    }

    pub fn is_stale(&self) -> bool {
        self.age_minutes() > CACHE_STALE_MINUTES
    }
}

/// Durable per-collection record cache.
///
/// One file per collection, named after the collection, holding the JSON
/// array of its records in insertion order. Reads never fail: a missing or
/// unreadable entry is an empty collection.
pub struct CacheManager {
    cache_dir: PathBuf,
}

impl CacheManager {
    pub fn new(cache_dir: PathBuf) -> Result<Self> {
        std::fs::create_dir_all(&cache_dir)
            .with_context(|| format!("Failed to create cache directory {}", cache_dir.display()))?;
        Ok(Self { cache_dir })
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    fn cache_path(&self, collection: &str) -> PathBuf {
        let key: String = collection
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '-' { c } else { '_' })
            .collect();
        self.cache_dir.join(format!("{}.json", key))
    }

    fn load(&self, collection: &str) -> Result<Option<Vec<Record>>> {
        let path = self.cache_path(collection);
        if !path.exists() {
            return Ok(None);
        }

        let contents = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read cache file: {}", collection))?;

        let records: Vec<Record> = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse cache file: {}", collection))?;

        Ok(Some(records))
    }

    /// All cached records of a collection, in stored order.
    pub fn read_all(&self, collection: &str) -> Vec<Record> {
        match self.load(collection) {
            Ok(Some(records)) => records,
            Ok(None) => Vec::new(),
            Err(e) => {
                warn!(collection, error = %e, "Unreadable cache entry, treating as empty");
                Vec::new()
            }
        }
    }

    /// Replace the cached records of a collection.
    ///
    /// Written to a temporary file first and renamed into place, so a crash
    /// mid-write leaves the previous list intact.
    pub fn write_all(&self, collection: &str, records: &[Record]) -> Result<()> {
        let path = self.cache_path(collection);
        let tmp = path.with_extension("json.tmp");
        let contents = serde_json::to_string_pretty(records)?;
        std::fs::write(&tmp, contents)
            .with_context(|| format!("Failed to write cache file: {}", collection))?;
        std::fs::rename(&tmp, &path)
            .with_context(|| format!("Failed to replace cache file: {}", collection))?;
        debug!(collection, count = records.len(), "Cache written");
        Ok(())
    }

    /// Drop a cached collection entirely.
    pub fn clear(&self, collection: &str) -> Result<()> {
        let path = self.cache_path(collection);
        if path.exists() {
            std::fs::remove_file(&path)
                .with_context(|| format!("Failed to remove cache file: {}", collection))?;
        }
        Ok(())
    }

    /// When the collection was last written, if it is cached at all.
    pub fn age(&self, collection: &str) -> Option<CacheAge> {
        let path = self.cache_path(collection);
        match std::fs::metadata(&path).and_then(|m| m.modified()) {
            Ok(modified) => Some(CacheAge::new(modified.into())),
            Err(e) => {
                if path.exists() {
                    debug!(collection, error = %e, "Failed to read cache age");
                }
                None
            }
        }
    }

    /// Age display per collection, "never" for collections not cached.
    pub fn ages(&self, collections: &[&str]) -> Vec<(String, String)> {
        collections
            .iter()
            .map(|name| {
                let display = self
                    .age(name)
                    .map(|age| age.age_display())
                    .unwrap_or_else(|| "never".to_string());
                (name.to_string(), display)
            })
            .collect()
    }

    /// True if any of the collections is missing or stale.
    pub fn any_stale(&self, collections: &[&str]) -> bool {
        collections
            .iter()
            .any(|name| self.age(name).map(|age| age.is_stale()).unwrap_or(true))
    }
}

// ============================================================================
// Tests
// ============================================================================
