// src/filter.rs
//! Time window and keyword filter. Date check runs first, then keywords.

use chrono::{DateTime, Duration, Utc};
use regex::Regex;
use tracing::debug;

use crate::config::{CategoryConfig, KeywordMatch, MissingDatePolicy};
use crate::ingest::types::CandidateItem;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterOutcome {
    pub kept: Vec<CandidateItem>,
    pub rejected_by_date: usize,
    pub rejected_by_keyword: usize,
}

enum Matcher {
    Substring(String),
    Word(Regex),
}

impl Matcher {
    fn build(term: &str, mode: KeywordMatch) -> Self {
        let term = term.to_lowercase();
        match mode {
            KeywordMatch::Substring => Matcher::Substring(term),
            KeywordMatch::WordBoundary => {
                // `\b` only holds next to a word char; `c++` or `.net` get it on one side.
                let is_word = |c: Option<char>| c.is_some_and(|c| c.is_alphanumeric() || c == '_');
                let lead = if is_word(term.chars().next()) { r"\b" } else { r"(?:^|\W)" };
                let tail = if is_word(term.chars().last()) { r"\b" } else { r"(?:$|\W)" };
                let pattern = format!("{lead}{}{tail}", regex::escape(&term));
                match Regex::new(&pattern) {
                    Ok(re) => Matcher::Word(re),
                    Err(_) => Matcher::Substring(term),
                }
            }
        }
    }

    fn is_match(&self, haystack: &str) -> bool {
        match self {
            Matcher::Substring(t) => haystack.contains(t.as_str()),
            Matcher::Word(re) => re.is_match(haystack),
        }
    }
}

/// Compiled per-category filter.
pub struct CandidateFilter {
    /// `None` when the window does not fit in a `Duration`: no cutoff.
    max_age: Option<Duration>,
    missing_date_policy: MissingDatePolicy,
    include: Vec<Matcher>,
    exclude: Vec<Matcher>,
    min_include_matches: usize,
}

impl CandidateFilter {
    pub fn new(cfg: &CategoryConfig) -> Self {
        let build = |terms: &[String]| {
            terms
                .iter()
                .filter(|t| !t.trim().is_empty())
                .map(|t| Matcher::build(t.trim(), cfg.keyword_match))
                .collect::<Vec<_>>()
        };
        Self {
            max_age: Duration::try_hours(cfg.max_age_hours),
            missing_date_policy: cfg.missing_date_policy,
            include: build(&cfg.include_keywords),
            exclude: build(&cfg.exclude_keywords),
            min_include_matches: cfg.min_include_matches.max(1),
        }
    }

    /// Inside the age window, or undated and the policy accepts it.
    pub fn is_recent(&self, item: &CandidateItem, now: DateTime<Utc>) -> bool {
        match item.published_at {
            Some(at) => match self.max_age.and_then(|d| now.checked_sub_signed(d)) {
                Some(cutoff) => at >= cutoff,
                None => true,
            },
            None => self.missing_date_policy == MissingDatePolicy::AcceptAsRecent,
        }
    }

    /// Keyword rule over title plus summary (lowercased).
    pub fn is_relevant(&self, item: &CandidateItem) -> bool {
        if self.include.is_empty() && self.exclude.is_empty() {
            return true;
        }
        let title = item.title.trim().to_lowercase();
        let haystack = match item.summary.as_deref() {
            Some(s) if !s.trim().is_empty() => format!("{title} {}", s.to_lowercase()),
            _ => title,
        };

        if self.exclude.iter().any(|m| m.is_match(&haystack)) {
            return false;
        }
        if self.include.is_empty() {
            return true;
        }
        let hits = self.include.iter().filter(|m| m.is_match(&haystack)).count();
        hits >= self.min_include_matches
    }

    /// Apply both stages, preserving input order.
    pub fn apply(&self, items: Vec<CandidateItem>, now: DateTime<Utc>) -> FilterOutcome {
        let mut out = FilterOutcome {
            kept: Vec::with_capacity(items.len()),
            ..Default::default()
        };
        for it in items {
            if !self.is_recent(&it, now) {
                out.rejected_by_date += 1;
                continue;
            }
            if !self.is_relevant(&it) {
                debug!(target: "filter", title = %it.title, "keyword reject");
                out.rejected_by_keyword += 1;
                continue;
            }
            out.kept.push(it);
        }
        out
    }
}
