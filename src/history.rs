//! history.rs: rolling record of previously selected items, one JSON file per category.
//!
//! Every selected item is stored under two keys: `title:<normalized title>` and
//! `url:<literal url>`. An item counts as seen when either key is present.
//! Load and save fail soft: a broken history only degrades dedup quality.

use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use metrics::counter;
use tracing::{debug, info, warn};

use crate::ingest::parse_timestamp;
use crate::ingest::types::CandidateItem;

pub const DEFAULT_RETENTION_DAYS: i64 = 30;

const TITLE_PREFIX: &str = "title:";
const URL_PREFIX: &str = "url:";

/// Lowercase, trim, collapse internal whitespace.
pub fn normalize_title(title: &str) -> String {
    title
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn title_key(title: &str) -> String {
    format!("{TITLE_PREFIX}{}", normalize_title(title))
}

/// URLs are compared exactly as scraped.
pub fn url_key(url: &str) -> String {
    format!("{URL_PREFIX}{}", url.trim())
}

/// In-memory view of one category's history.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct History {
    entries: BTreeMap<String, DateTime<Utc>>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn get(&self, key: &str) -> Option<DateTime<Utc>> {
        self.entries.get(key).copied()
    }

    pub fn insert(&mut self, key: String, at: DateTime<Utc>) {
        self.entries.insert(key, at);
    }

    /// Drop entries selected before `now - retention_days`. An entry exactly at
    /// the cutoff is kept. A window past the calendar range keeps everything.
    pub fn prune(mut self, retention_days: i64, now: DateTime<Utc>) -> Self {
        let cutoff = Duration::try_days(retention_days).and_then(|d| now.checked_sub_signed(d));
        if let Some(cutoff) = cutoff {
            self.entries.retain(|_, at| *at >= cutoff);
        }
        self
    }

    /// True if either the title key or the url key of `item` is recorded.
    pub fn contains(&self, item: &CandidateItem) -> bool {
        self.entries.contains_key(&title_key(&item.title))
            || self.entries.contains_key(&url_key(&item.url))
    }

    /// Record both keys of `item` at `now`.
    pub fn record(mut self, item: &CandidateItem, now: DateTime<Utc>) -> Self {
        self.entries.insert(title_key(&item.title), now);
        self.entries.insert(url_key(&item.url), now);
        self
    }

    /// Build from the on-disk shape (key -> timestamp string), skipping entries
    /// whose timestamp does not parse.
    pub fn from_raw(raw: BTreeMap<String, String>) -> (Self, usize) {
        let mut entries = BTreeMap::new();
        let mut invalid = 0usize;
        for (k, v) in raw {
            match parse_timestamp(&v) {
                Some(at) => {
                    entries.insert(k, at);
                }
                None => invalid += 1,
            }
        }
        (Self { entries }, invalid)
    }

    pub fn to_raw(&self) -> BTreeMap<String, String> {
        self.entries
            .iter()
            .map(|(k, at)| (k.clone(), at.to_rfc3339()))
            .collect()
    }
}

/// File-backed history for one category.
#[derive(Debug, Clone)]
pub struct HistoryStore {
    path: PathBuf,
    retention_days: i64,
}

impl HistoryStore {
    pub fn new(path: impl Into<PathBuf>, retention_days: i64) -> Self {
        Self {
            path: path.into(),
            retention_days,
        }
    }

    /// `<history_dir>/<history_key>.json`
    pub fn in_dir(history_dir: &Path, history_key: &str, retention_days: i64) -> Self {
        Self::new(history_dir.join(format!("{history_key}.json")), retention_days)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn retention_days(&self) -> i64 {
        self.retention_days
    }

    /// Read and prune. Missing or corrupt file yields an empty history.
    pub fn load(&self, now: DateTime<Utc>) -> History {
        let raw = match fs::read_to_string(&self.path) {
            Ok(s) => s,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                info!(
                    target: "history",
                    path = %self.path.display(),
                    "no history file, starting fresh"
                );
                return History::new();
            }
            Err(e) => {
                warn!(
                    target: "history",
                    path = %self.path.display(),
                    error = %e,
                    "history unreadable, starting fresh"
                );
                counter!("digest_history_errors_total").increment(1);
                return History::new();
            }
        };

        let parsed: BTreeMap<String, String> = match serde_json::from_str(&raw) {
            Ok(m) => m,
            Err(e) => {
                warn!(
                    target: "history",
                    path = %self.path.display(),
                    error = %e,
                    "history corrupt, starting fresh"
                );
                counter!("digest_history_errors_total").increment(1);
                return History::new();
            }
        };

        let total = parsed.len();
        let (history, invalid) = History::from_raw(parsed);
        let history = history.prune(self.retention_days, now);
        info!(
            target: "history",
            path = %self.path.display(),
            kept = history.len(),
            total,
            invalid,
            retention_days = self.retention_days,
            "history loaded"
        );
        history
    }

    /// Persist via temp file + rename. Errors are logged, never returned.
    pub fn save(&self, history: &History) {
        match self.try_save(history) {
            Ok(()) => debug!(
                target: "history",
                path = %self.path.display(),
                entries = history.len(),
                "history saved"
            ),
            Err(e) => {
                warn!(
                    target: "history",
                    path = %self.path.display(),
                    error = %e,
                    "history save failed"
                );
                counter!("digest_history_errors_total").increment(1);
            }
        }
    }

    fn try_save(&self, history: &History) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_vec_pretty(&history.to_raw())
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        let tmp = self.path.with_extension("json.tmp");
        let mut f = fs::File::create(&tmp)?;
        f.write_all(&json)?;
        f.sync_all()?;
        fs::rename(tmp, &self.path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::types::Category;

    fn item(title: &str, url: &str) -> CandidateItem {
        CandidateItem::new(Category::TechNews, title, url)
    }

    #[test]
    fn title_normalization_collapses_case_and_space() {
        assert_eq!(normalize_title("  Rust   IS\tGreat "), "rust is great");
        assert_eq!(normalize_title("ÉCOLE  Numérique"), "école numérique");
        assert_eq!(title_key("A"), "title:a");
    }

    #[test]
    fn url_key_is_literal() {
        assert_eq!(url_key(" https://X.test/Path "), "url:https://X.test/Path");
        assert_ne!(url_key("https://x.test/a"), url_key("http://x.test/a"));
    }

    #[test]
    fn record_is_idempotent() {
        let now = Utc::now();
        let it = item("Title", "https://u.test/1");
        let once = History::new().record(&it, now);
        let twice = once.clone().record(&it, now);
        assert!(once.contains(&it));
        assert_eq!(once, twice);
        assert_eq!(twice.len(), 2);
    }

    #[test]
    fn dual_key_lookup() {
        let now = Utc::now();
        let h = History::new().record(&item("Same  Title", "https://u.test/1"), now);
        assert!(h.contains(&item("same title", "https://other.test/9")));
        assert!(h.contains(&item("Different", "https://u.test/1")));
        assert!(!h.contains(&item("Different", "https://other.test/9")));
    }

    #[test]
    fn prune_respects_window() {
        let now = Utc::now();
        let mut h = History::new();
        h.insert("title:old".into(), now - Duration::days(31));
        h.insert("title:recent".into(), now - Duration::days(29));
        h.insert("title:edge".into(), now - Duration::days(30));
        let h = h.prune(30, now);
        assert!(!h.contains_key("title:old"));
        assert!(h.contains_key("title:recent"));
        assert!(h.contains_key("title:edge"));
    }

    #[test]
    fn prune_with_unrepresentable_window_keeps_everything() {
        let now = Utc::now();
        let mut h = History::new();
        h.insert("title:ancient".into(), now - Duration::days(365 * 200));
        assert_eq!(h.clone().prune(100_000_000, now).len(), 1);
        assert_eq!(h.prune(i64::MAX, now).len(), 1);
    }

    #[test]
    fn from_raw_skips_bad_timestamps() {
        let mut raw = BTreeMap::new();
        raw.insert("title:a".to_string(), "2025-01-25T10:00:00.123456".to_string());
        raw.insert("title:b".to_string(), "not a date".to_string());
        let (h, invalid) = History::from_raw(raw);
        assert_eq!(h.len(), 1);
        assert_eq!(invalid, 1);
    }
}
