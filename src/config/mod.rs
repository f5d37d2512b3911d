// src/config/mod.rs
//! Pipeline configuration: per-category filter/selection rules and directory layout.
//!
//! Lookup order for the config file:
//! 1) `$DIGEST_CONFIG_PATH`
//! 2) `config/digest.toml`
//! 3) `config/digest.json`
//! 4) built-in defaults (`DigestConfig::default()`)

pub mod ai;

use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::history::DEFAULT_RETENTION_DAYS;
use crate::ingest::types::Category;

pub const ENV_CONFIG_PATH: &str = "DIGEST_CONFIG_PATH";

/// Upper bounds for the time windows (100 years).
pub const MAX_AGE_HOURS_LIMIT: i64 = 24 * 365 * 100;
pub const RETENTION_DAYS_LIMIT: i64 = 365 * 100;

/// What to do with items that carry no publication date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingDatePolicy {
    Reject,
    AcceptAsRecent,
}

/// How keyword terms are matched against title/summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeywordMatch {
    #[default]
    Substring,
    WordBoundary,
}

/// Deterministic rule used when the oracle cannot choose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackRule {
    #[default]
    KeywordScore,
    FirstEligible,
}

fn default_min_include() -> usize {
    1
}
fn default_retention_days() -> i64 {
    DEFAULT_RETENTION_DAYS
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryConfig {
    pub category: Category,
    pub max_age_hours: i64,
    pub missing_date_policy: MissingDatePolicy,
    #[serde(default)]
    pub include_keywords: Vec<String>,
    #[serde(default)]
    pub exclude_keywords: Vec<String>,
    #[serde(default)]
    pub keyword_match: KeywordMatch,
    /// Distinct include terms an item must hit (2 = "strict").
    #[serde(default = "default_min_include")]
    pub min_include_matches: usize,
    #[serde(default = "default_retention_days")]
    pub retention_days: i64,
    /// History file stem under `history_dir`.
    pub history_key: String,
    /// What "best" means for this category, handed to the oracle verbatim.
    #[serde(default)]
    pub selection_criteria: String,
    #[serde(default)]
    pub fallback: FallbackRule,
    /// RSS feeds polled in addition to the JSON dump.
    #[serde(default)]
    pub feeds: Vec<String>,
}

impl CategoryConfig {
    /// Minimal config: no keywords, first-eligible fallback, default retention.
    pub fn new(
        category: Category,
        max_age_hours: i64,
        missing_date_policy: MissingDatePolicy,
    ) -> Self {
        Self {
            category,
            max_age_hours,
            missing_date_policy,
            include_keywords: Vec::new(),
            exclude_keywords: Vec::new(),
            keyword_match: KeywordMatch::Substring,
            min_include_matches: 1,
            retention_days: DEFAULT_RETENTION_DAYS,
            history_key: format!("{}_history", category.as_str()),
            selection_criteria: String::new(),
            fallback: FallbackRule::FirstEligible,
            feeds: Vec::new(),
        }
    }

    fn validate(&mut self) -> Result<()> {
        if !(1..=MAX_AGE_HOURS_LIMIT).contains(&self.max_age_hours) {
            bail!(
                "{}: max_age_hours must be in 1..={MAX_AGE_HOURS_LIMIT}",
                self.category
            );
        }
        if !(1..=RETENTION_DAYS_LIMIT).contains(&self.retention_days) {
            bail!(
                "{}: retention_days must be in 1..={RETENTION_DAYS_LIMIT}",
                self.category
            );
        }
        let key = self.history_key.trim();
        if key.is_empty() || key.contains(['/', '\\']) || key.contains("..") {
            bail!("{}: history_key must be a plain file stem", self.category);
        }
        self.history_key = key.to_string();
        self.min_include_matches = self.min_include_matches.max(1);
        self.include_keywords = clean_list(std::mem::take(&mut self.include_keywords));
        self.exclude_keywords = clean_list(std::mem::take(&mut self.exclude_keywords));
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Scraper dumps: `<input_dir>/<category>.json`.
    pub input_dir: PathBuf,
    /// Long-lived dedup state. Never touched by output cleanup.
    pub history_dir: PathBuf,
    /// Per-run artifacts (selections, digest).
    pub output_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("data/input"),
            history_dir: PathBuf::from("data/history"),
            output_dir: PathBuf::from("data/output"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DigestConfig {
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(rename = "category")]
    pub categories: Vec<CategoryConfig>,
}

impl DigestConfig {
    pub fn category(&self, c: Category) -> Option<&CategoryConfig> {
        self.categories.iter().find(|cfg| cfg.category == c)
    }

    fn validate(mut self) -> Result<Self> {
        if self.categories.is_empty() {
            bail!("config defines no categories");
        }
        for cfg in self.categories.iter_mut() {
            cfg.validate()?;
        }
        for (i, a) in self.categories.iter().enumerate() {
            for b in &self.categories[i + 1..] {
                if a.category == b.category {
                    bail!("category {} configured twice", a.category);
                }
                if a.history_key == b.history_key {
                    bail!("categories {} and {} share a history file", a.category, b.category);
                }
            }
        }
        if self.paths.history_dir == self.paths.output_dir {
            bail!("history_dir and output_dir must differ");
        }
        Ok(self)
    }
}

/// Load config from an explicit path. Supports TOML or JSON formats.
pub fn load_config_from(path: &Path) -> Result<DigestConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading digest config from {}", path.display()))?;
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    parse_config(&content, ext.as_str())
        .with_context(|| format!("parsing digest config {}", path.display()))
}

/// Load config using env var + fallbacks (see module docs).
pub fn load_config_default() -> Result<DigestConfig> {
    if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
        let pb = PathBuf::from(p);
        if pb.exists() {
            return load_config_from(&pb);
        } else {
            return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
        }
    }
    let toml_p = PathBuf::from("config/digest.toml");
    if toml_p.exists() {
        return load_config_from(&toml_p);
    }
    let json_p = PathBuf::from("config/digest.json");
    if json_p.exists() {
        return load_config_from(&json_p);
    }
    Ok(DigestConfig::default())
}

fn parse_config(s: &str, hint_ext: &str) -> Result<DigestConfig> {
    let cfg: DigestConfig = if hint_ext == "json" {
        serde_json::from_str(s)?
    } else {
        toml::from_str(s)?
    };
    cfg.validate()
}

fn clean_list(items: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(items.len());
    for it in items {
        let t = it.trim().to_lowercase();
        if !t.is_empty() && !out.contains(&t) {
            out.push(t);
        }
    }
    out
}

fn words(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

impl Default for DigestConfig {
    fn default() -> Self {
        let tech = CategoryConfig {
            include_keywords: words(&[
                "ai", "artificial intelligence", "machine learning", "deep learning", "llm",
                "neural network", "breakthrough", "innovation", "launch", "launches", "released",
                "unveils", "introduces", "software", "hardware", "chip", "semiconductor",
                "quantum", "robotics", "open source", "github", "framework", "library", "api",
                "sdk", "compiler", "programming language", "cybersecurity", "cloud", "research",
            ]),
            exclude_keywords: words(&[
                "stock", "shares", "ipo", "acquisition", "merger", "earnings", "revenue",
                "ceo", "layoffs", "opinion", "editorial", "podcast", "interview", "lawsuit",
                "court", "rumor", "leak", "allegedly", "webinar", "conference", "top 10",
            ]),
            keyword_match: KeywordMatch::WordBoundary,
            history_key: "tech_news_history".to_string(),
            selection_criteria: "The single most significant technical development for computer \
                science students: concrete technology (new models, tools, hardware, research \
                results) over business, opinion or market news; prefer broad impact and novelty."
                .to_string(),
            fallback: FallbackRule::KeywordScore,
            ..CategoryConfig::new(Category::TechNews, 48, MissingDatePolicy::Reject)
        };

        let internship = CategoryConfig {
            include_keywords: words(&[
                "software", "developer", "development", "engineer", "programming",
                "computer science", "web", "full stack", "backend", "frontend", "data science",
                "data analyst", "machine learning", "ai", "cloud", "devops", "cybersecurity",
                "android", "python", "java", "react", "intern", "internship", "trainee",
            ]),
            exclude_keywords: words(&["senior", "sales", "telecaller", "marketing executive"]),
            keyword_match: KeywordMatch::WordBoundary,
            history_key: "internship_history".to_string(),
            selection_criteria: "The most valuable and legitimate internship for a CS/IT \
                engineering student: real technical work, reputable company, learning and \
                mentorship, no fees or commission-based schemes."
                .to_string(),
            fallback: FallbackRule::KeywordScore,
            ..CategoryConfig::new(Category::Internship, 48, MissingDatePolicy::AcceptAsRecent)
        };

        let job = CategoryConfig {
            include_keywords: words(&[
                "engineer", "developer", "analyst", "specialist", "programmer", "software",
                "technical", "it", "computer science", "technology",
            ]),
            exclude_keywords: words(&[
                "intern", "internship", "trainee", "graduate trainee", "apprentice", "senior",
                "lead", "principal", "manager", "director", "head of",
            ]),
            keyword_match: KeywordMatch::WordBoundary,
            history_key: "job_history".to_string(),
            selection_criteria: "The best entry-level job for fresh engineering graduates \
                (0-1 years): explicit junior/associate/graduate roles, training and mentorship, \
                CSE/IT/AI/ML relevance, legitimate company, clear growth path."
                .to_string(),
            fallback: FallbackRule::KeywordScore,
            ..CategoryConfig::new(Category::Job, 24, MissingDatePolicy::AcceptAsRecent)
        };

        let upskill = CategoryConfig {
            include_keywords: words(&[
                "tutorial", "guide", "how to", "step by step", "walkthrough", "learn", "learning",
                "beginner", "getting started", "introduction to", "basics", "fundamentals",
                "build", "create", "implement", "project", "hands-on", "practical", "example",
                "from scratch", "best practices", "tips", "optimization", "performance",
            ]),
            exclude_keywords: words(&[
                "funding", "acquisition", "merger", "ipo", "stock", "ceo", "layoffs", "hiring",
                "opinion", "editorial", "rant", "review", "conference", "webinar", "meetup",
                "announcement", "keynote",
            ]),
            keyword_match: KeywordMatch::Substring,
            history_key: "upskill_articles_history".to_string(),
            selection_criteria: "The most valuable learning resource for CS students: practical \
                step-by-step tutorials and implementation guides on modern, in-demand \
                technologies; concrete applicable skills and best practices over theory or \
                opinion."
                .to_string(),
            fallback: FallbackRule::KeywordScore,
            ..CategoryConfig::new(Category::UpskillArticle, 168, MissingDatePolicy::AcceptAsRecent)
        };

        Self {
            paths: PathsConfig::default(),
            categories: vec![tech, internship, job, upskill],
        }
    }
}
