// src/select/fallback.rs
//! Deterministic selection used whenever the oracle cannot choose.
//!
//! `KeywordScore` runs a per-category weighted keyword table over the lowercased
//! title (and description/company where the category uses them); the highest
//! score wins and the earliest item wins ties. `FirstEligible` takes the first item.

use chrono::{DateTime, Duration, Utc};

use crate::config::FallbackRule;
use crate::ingest::types::{CandidateItem, Category};

type Weighted = (&'static [&'static str], f64);

const TECH_TITLE: &[Weighted] = &[
    (
        &[
            "breakthrough", "innovation", "new", "launch", "release", "ai",
            "artificial intelligence", "machine learning", "deep learning", "quantum",
            "blockchain", "cryptocurrency", "cybersecurity",
        ],
        10.0,
    ),
    (
        &[
            "software", "developer", "programming", "coding", "tech", "startup", "technology",
            "algorithm", "data science", "cloud", "mobile", "web", "api", "framework",
        ],
        5.0,
    ),
    (
        &[
            "update", "feature", "tool", "platform", "service", "app", "website", "system",
            "network", "database",
        ],
        2.0,
    ),
    (
        &[
            "opinion", "editorial", "blog", "personal", "drama", "controversy", "gossip",
            "rumor", "politics", "lawsuit",
        ],
        -10.0,
    ),
];

const INTERNSHIP_CS: &[&str] = &[
    "software", "developer", "programming", "coding", "computer science", "it", "technology",
    "tech", "web development", "mobile development", "data science", "machine learning", "ai",
    "artificial intelligence",
];
const INTERNSHIP_TECH: &[&str] = &[
    "engineer", "analyst", "technical", "digital", "automation", "cloud", "database", "api",
    "frontend", "backend", "fullstack",
];
const KNOWN_TECH_COMPANIES: &[&str] = &[
    "google", "microsoft", "amazon", "apple", "facebook", "meta", "netflix", "uber", "airbnb",
    "spotify", "adobe", "salesforce", "oracle", "ibm", "intel", "nvidia", "tesla", "twitter",
];
const SUSPICIOUS: &[&str] = &[
    "work from home", "earn money", "no experience required", "easy money", "part time",
    "flexible hours", "commission based",
];

const JOB_TITLE: &[Weighted] = &[
    (
        &[
            "junior", "associate", "entry level", "graduate", "fresher", "software engineer",
            "developer", "analyst", "specialist",
        ],
        20.0,
    ),
    (
        &[
            "software", "programming", "coding", "development", "technical", "it",
            "computer science", "technology", "engineer",
        ],
        10.0,
    ),
    (
        &[
            "senior", "lead", "principal", "manager", "director", "head of", "chief", "vp",
            "vice president", "5+ years", "3+ years", "experienced",
        ],
        -25.0,
    ),
];
const JOB_EXPERIENCE: &[&str] = &[
    "0-1 year", "0-2 year", "fresher", "entry level", "graduate", "no experience",
    "fresh graduate",
];

const UPSKILL_TITLE: &[Weighted] = &[
    (
        &[
            "tutorial", "guide", "how to", "learn", "beginner", "step by step", "complete guide",
            "introduction to", "getting started", "best practices",
        ],
        15.0,
    ),
    (
        &[
            "python", "javascript", "react", "node.js", "java", "c++", "machine learning",
            "data science", "web development", "mobile development", "cloud computing",
            "docker", "kubernetes",
        ],
        10.0,
    ),
    (
        &[
            "project", "build", "create", "implement", "develop", "portfolio", "hands-on",
            "practical", "example",
        ],
        12.0,
    ),
];
const QUESTION_WORDS: &[&str] = &["how", "what", "why", "when", "where"];

/// Keyword presence. Terms of three chars or fewer must match a whole token so
/// "ai" does not fire on "paid"; longer terms match as substrings.
fn mentions(text: &str, term: &str) -> bool {
    if term.len() <= 3 {
        text.split(|c: char| !(c.is_alphanumeric() || c == '+' || c == '.'))
            .map(|t| t.trim_matches('.'))
            .any(|t| t == term)
    } else {
        text.contains(term)
    }
}

fn table_score(text: &str, table: &[Weighted]) -> f64 {
    table
        .iter()
        .map(|(terms, w)| terms.iter().filter(|t| mentions(text, t)).count() as f64 * w)
        .sum()
}

fn hits(text: &str, terms: &[&str]) -> f64 {
    terms.iter().filter(|t| mentions(text, t)).count() as f64
}

fn description(item: &CandidateItem) -> String {
    item.extra_str("description")
        .or(item.summary.as_deref())
        .unwrap_or_default()
        .to_lowercase()
}

/// Relevance score for one item, floored at zero.
pub fn score(item: &CandidateItem, now: DateTime<Utc>) -> f64 {
    let title = item.title.to_lowercase();
    let raw = match item.category {
        Category::TechNews => {
            let mut s = table_score(&title, TECH_TITLE);
            if item
                .published_at
                .is_some_and(|at| now - at < Duration::hours(24))
            {
                s += 5.0;
            }
            if (30..=100).contains(&title.chars().count()) {
                s += 3.0;
            }
            s
        }
        Category::Internship => {
            let company = item.extra_str("company").unwrap_or_default().to_lowercase();
            let desc = description(item);
            hits(&title, INTERNSHIP_CS) * 15.0
                + hits(&title, INTERNSHIP_TECH) * 10.0
                + hits(&company, KNOWN_TECH_COMPANIES) * 20.0
                + hits(&desc, INTERNSHIP_CS) * 5.0
                - SUSPICIOUS
                    .iter()
                    .filter(|p| mentions(&title, p) || mentions(&desc, p))
                    .count() as f64
                    * 15.0
        }
        Category::Job => {
            let desc = description(item);
            table_score(&title, JOB_TITLE)
                + JOB_EXPERIENCE
                    .iter()
                    .filter(|p| mentions(&title, p) || mentions(&desc, p))
                    .count() as f64
                    * 15.0
        }
        Category::UpskillArticle => {
            let mut s = table_score(&title, UPSKILL_TITLE);
            if QUESTION_WORDS.iter().any(|w| mentions(&title, w)) {
                s += 5.0;
            }
            s
        }
    };
    raw.max(0.0)
}

/// Index of the item the rule picks, `None` only for an empty slice.
pub fn pick(rule: FallbackRule, items: &[CandidateItem], now: DateTime<Utc>) -> Option<usize> {
    if items.is_empty() {
        return None;
    }
    match rule {
        FallbackRule::FirstEligible => Some(0),
        FallbackRule::KeywordScore => {
            let mut best = 0usize;
            let mut best_score = f64::MIN;
            for (i, it) in items.iter().enumerate() {
                let s = score(it, now);
                // strict: ties keep the earlier item
                if s > best_score {
                    best = i;
                    best_score = s;
                }
            }
            tracing::debug!(
                target: "selector",
                score = best_score,
                title = %items[best].title,
                "fallback scored pick"
            );
            Some(best)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tech(title: &str) -> CandidateItem {
        CandidateItem::new(Category::TechNews, title, format!("https://t.test/{}", title.len()))
    }

    #[test]
    fn short_terms_match_whole_tokens_only() {
        assert!(mentions("new ai chip", "ai"));
        assert!(!mentions("maintainers get paid", "ai"));
        assert!(mentions("learn c++ fast", "c++"));
        assert!(mentions("a rust tutorial", "tutorial"));
    }

    #[test]
    fn tech_scores_reward_substance_and_punish_opinion() {
        let now = Utc::now();
        let good = score(&tech("New AI Breakthrough in Machine Learning"), now);
        let bad = score(&tech("Opinion: Why I Think Tech is Bad"), now);
        assert!(good > bad);
        assert_eq!(bad, 0.0);
    }

    #[test]
    fn recency_bonus_applies_under_a_day() {
        let now = Utc::now();
        let base = tech("short title");
        let fresh = base.clone().published(now - Duration::hours(2));
        let stale = base.published(now - Duration::hours(30));
        assert_eq!(score(&fresh, now) - score(&stale, now), 5.0);
    }

    #[test]
    fn job_penalizes_senior_roles() {
        let now = Utc::now();
        let junior = CandidateItem::new(Category::Job, "Junior Software Engineer", "u1");
        let senior = CandidateItem::new(Category::Job, "Senior Software Engineer", "u2");
        assert!(score(&junior, now) > score(&senior, now));
    }

    #[test]
    fn internship_company_and_scam_patterns() {
        let now = Utc::now();
        let known = CandidateItem::new(Category::Internship, "Intern", "u1")
            .with_extra("company", "Google India");
        let scam = CandidateItem::new(Category::Internship, "Intern - earn money part time", "u2");
        assert_eq!(score(&known, now), 20.0);
        assert_eq!(score(&scam, now), 0.0);
    }

    #[test]
    fn pick_prefers_highest_then_earliest() {
        let now = Utc::now();
        let items = vec![tech("plain words"), tech("plain other"), tech("New AI launch")];
        assert_eq!(pick(FallbackRule::KeywordScore, &items, now), Some(2));
        let ties = vec![tech("aaa"), tech("bbb")];
        assert_eq!(pick(FallbackRule::KeywordScore, &ties, now), Some(0));
        assert_eq!(pick(FallbackRule::FirstEligible, &items, now), Some(0));
        assert_eq!(pick(FallbackRule::KeywordScore, &[], now), None);
    }
}
