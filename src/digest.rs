// src/digest.rs
//! Digest assembly: one entry per category that produced a selection.
//!
//! On-disk shape (`daily_tech_digest.json`):
//! `{"daily_tech_digest": {"metadata": {...}, "summary": {...}, "content": {...}}}`.
//! Categories without a selection appear in `summary` with `status = "no_content"`
//! and are omitted from `content`.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ingest::types::{CandidateItem, Category};

/// Digest form of a selected item: title, url and the category's passthrough fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DigestEntry {
    pub title: String,
    pub url: String,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl From<&CandidateItem> for DigestEntry {
    fn from(it: &CandidateItem) -> Self {
        Self {
            title: it.title.clone(),
            url: it.url.clone(),
            extra: it.extra.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryStatus {
    Success,
    NoContent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategorySummary {
    pub count: usize,
    pub status: EntryStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DigestMetadata {
    pub generated_at: DateTime<Utc>,
    /// "k/N": categories with content out of categories processed.
    pub successful_sources: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DigestBody {
    pub metadata: DigestMetadata,
    pub summary: BTreeMap<Category, CategorySummary>,
    pub content: BTreeMap<Category, DigestEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Digest {
    pub daily_tech_digest: DigestBody,
}

impl Digest {
    /// Build from per-category selections (in category order). Absent ones are
    /// summarized as `no_content` and left out of `content`.
    pub fn assemble<'a, I>(selections: I, now: DateTime<Utc>) -> Self
    where
        I: IntoIterator<Item = (Category, Option<&'a CandidateItem>)>,
    {
        let mut summary = BTreeMap::new();
        let mut content = BTreeMap::new();
        for (category, item) in selections {
            let status = match item {
                Some(it) => {
                    content.insert(category, DigestEntry::from(it));
                    CategorySummary {
                        count: 1,
                        status: EntryStatus::Success,
                    }
                }
                None => CategorySummary {
                    count: 0,
                    status: EntryStatus::NoContent,
                },
            };
            summary.insert(category, status);
        }
        let successful_sources = format!("{}/{}", content.len(), summary.len());
        Self {
            daily_tech_digest: DigestBody {
                metadata: DigestMetadata {
                    generated_at: now,
                    successful_sources,
                },
                summary,
                content,
            },
        }
    }

    pub fn entry(&self, category: Category) -> Option<&DigestEntry> {
        self.daily_tech_digest.content.get(&category)
    }

    pub fn is_empty(&self) -> bool {
        self.daily_tech_digest.content.is_empty()
    }

    /// Plain-text console summary.
    pub fn render_summary(&self) -> String {
        let body = &self.daily_tech_digest;
        let mut out = format!(
            "Daily tech digest ({} categories with content, generated {})\n",
            body.metadata.successful_sources,
            body.metadata.generated_at.format("%Y-%m-%d %H:%M UTC")
        );
        for category in body.summary.keys() {
            match body.content.get(category) {
                Some(e) => {
                    out.push_str(&format!("- {}: {}", category.display_name(), e.title));
                    if let Some(company) = e.extra.get("company").and_then(|v| v.as_str()) {
                        if !company.trim().is_empty() {
                            out.push_str(&format!(" ({})", company.trim()));
                        }
                    }
                    out.push_str(&format!("\n  {}\n", e.url));
                }
                None => {
                    out.push_str(&format!("- {}: nothing new today\n", category.display_name()))
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_categories_are_summarized_but_not_in_content() {
        let job = CandidateItem::new(Category::Job, "Junior Dev", "https://j.test/1")
            .with_extra("company", "Acme");
        let digest = Digest::assemble(
            [
                (Category::TechNews, None),
                (Category::Job, Some(&job)),
            ],
            Utc::now(),
        );
        let body = &digest.daily_tech_digest;
        assert_eq!(body.metadata.successful_sources, "1/2");
        assert!(digest.entry(Category::TechNews).is_none());
        assert_eq!(body.summary[&Category::TechNews].status, EntryStatus::NoContent);

        let v = serde_json::to_value(&digest).unwrap();
        let content = &v["daily_tech_digest"]["content"];
        assert_eq!(content["job"]["company"], "Acme");
        assert!(content.get("tech_news").is_none());
        assert_eq!(v["daily_tech_digest"]["summary"]["tech_news"]["status"], "no_content");
    }

    #[test]
    fn summary_text_lists_every_category() {
        let it = CandidateItem::new(Category::UpskillArticle, "Learn Rust", "https://u.test/1");
        let d = Digest::assemble(
            [(Category::TechNews, None), (Category::UpskillArticle, Some(&it))],
            Utc::now(),
        );
        let text = d.render_summary();
        assert!(text.contains("Tech News: nothing new today"));
        assert!(text.contains("Upskill Articles: Learn Rust"));
        assert!(!text.contains("No suitable content"));
    }
}
