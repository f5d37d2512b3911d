// src/ingest/providers/json_file.rs
//! Reads a scraper's dumped candidate list (`<input_dir>/<category>.json`).

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::ingest::parse_timestamp;
use crate::ingest::types::{CandidateItem, CandidateSource, Category};

/// Loose shape of one dumped entry. Scrapers disagree on the date field name.
#[derive(Debug, Deserialize)]
struct RawEntry {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    published_at: Option<String>,
    #[serde(default)]
    date: Option<String>,
    #[serde(default)]
    summary: Option<String>,
    #[serde(flatten)]
    extra: serde_json::Map<String, serde_json::Value>,
}

pub struct JsonFileSource {
    category: Category,
    path: PathBuf,
    label: String,
}

impl JsonFileSource {
    pub fn new(category: Category, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let label = format!("json:{}", path.display());
        Self {
            category,
            path,
            label,
        }
    }

    /// Conventional dump location for a category inside `input_dir`.
    pub fn in_dir(category: Category, input_dir: &Path) -> Self {
        Self::new(category, input_dir.join(format!("{}.json", category.as_str())))
    }

    pub fn parse_str(category: Category, s: &str) -> Result<Vec<CandidateItem>> {
        let entries: Vec<RawEntry> =
            serde_json::from_str(s).context("parsing candidate dump json")?;
        let out = entries
            .into_iter()
            .filter_map(|e| {
                let title = e.title?;
                let url = e.url?;
                let published_at = e
                    .published_at
                    .as_deref()
                    .or(e.date.as_deref())
                    .and_then(parse_timestamp);
                let mut extra = e.extra;
                extra.remove("category");
                Some(CandidateItem {
                    title,
                    url,
                    published_at,
                    category,
                    summary: e.summary,
                    extra,
                })
            })
            .collect();
        Ok(out)
    }
}

#[async_trait]
impl CandidateSource for JsonFileSource {
    async fn fetch_candidates(&self) -> Result<Vec<CandidateItem>> {
        let body = tokio::fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("reading candidate dump {}", self.path.display()))?;
        Self::parse_str(self.category, &body)
    }

    fn name(&self) -> &str {
        &self.label
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_loose_entries_and_keeps_extras() {
        let s = r#"[
            {"title": "Backend Intern", "url": "https://jobs.test/1", "company": "Acme",
             "date": "2025-01-25T08:00:00"},
            {"title": "No url here"},
            {"title": "Data Intern", "url": "https://jobs.test/2", "category": "whatever"}
        ]"#;
        let out = JsonFileSource::parse_str(Category::Internship, s).unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].extra_str("company"), Some("Acme"));
        assert!(out[0].published_at.is_some());
        assert!(out[1].published_at.is_none());
        assert!(!out[1].extra.contains_key("category"));
        assert_eq!(out[1].category, Category::Internship);
    }

    #[test]
    fn rejects_non_array() {
        assert!(JsonFileSource::parse_str(Category::Job, r#"{"title":"x"}"#).is_err());
    }
}
