// src/ingest/types.rs
use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Content category. Each one has its own filter rules and history file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    TechNews,
    Internship,
    Job,
    UpskillArticle,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::TechNews,
        Category::Internship,
        Category::Job,
        Category::UpskillArticle,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::TechNews => "tech_news",
            Category::Internship => "internship",
            Category::Job => "job",
            Category::UpskillArticle => "upskill_article",
        }
    }

    /// Human label used in digest summaries and oracle prompts.
    pub fn display_name(&self) -> &'static str {
        match self {
            Category::TechNews => "Tech News",
            Category::Internship => "Internships",
            Category::Job => "Jobs",
            Category::UpskillArticle => "Upskill Articles",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One raw scraped entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CandidateItem {
    pub title: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_at: Option<DateTime<Utc>>,
    pub category: Category,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    /// Category-specific fields (e.g. `company`), passed through untouched.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl CandidateItem {
    pub fn new(category: Category, title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
            published_at: None,
            category,
            summary: None,
            extra: serde_json::Map::new(),
        }
    }

    pub fn published(mut self, at: DateTime<Utc>) -> Self {
        self.published_at = Some(at);
        self
    }

    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }

    pub fn with_extra(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        self.extra.insert(key.to_string(), value.into());
        self
    }

    /// String-valued passthrough field, if present.
    pub fn extra_str(&self, key: &str) -> Option<&str> {
        self.extra.get(key).and_then(|v| v.as_str())
    }
}

/// Boundary to the scraping collaborator.
#[async_trait::async_trait]
pub trait CandidateSource: Send + Sync {
    async fn fetch_candidates(&self) -> Result<Vec<CandidateItem>>;
    fn name(&self) -> &str;
}
