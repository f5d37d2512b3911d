// tests/config_files.rs
use std::path::PathBuf;

use digest_curator::config::ai::AiConfig;
use digest_curator::config::{
    load_config_from, DigestConfig, FallbackRule, KeywordMatch, MissingDatePolicy,
};
use digest_curator::Category;

fn repo_file(rel: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join(rel)
}

#[test]
fn shipped_digest_config_matches_builtin_defaults() {
    let file =
        load_config_from(&repo_file("config/digest.toml")).expect("config/digest.toml parses");
    let builtin = DigestConfig::default();

    assert_eq!(file.paths, builtin.paths);
    for c in Category::ALL {
        let a = file.category(c).expect("category in file");
        let b = builtin.category(c).expect("category in defaults");
        assert_eq!(a.max_age_hours, b.max_age_hours, "{c}");
        assert_eq!(a.missing_date_policy, b.missing_date_policy, "{c}");
        assert_eq!(a.include_keywords, b.include_keywords, "{c}");
        assert_eq!(a.exclude_keywords, b.exclude_keywords, "{c}");
        assert_eq!(a.keyword_match, b.keyword_match, "{c}");
        assert_eq!(a.history_key, b.history_key, "{c}");
        assert_eq!(a.fallback, FallbackRule::KeywordScore);
        assert!(!a.selection_criteria.trim().is_empty());
    }

    let tech = file.category(Category::TechNews).unwrap();
    assert_eq!(tech.missing_date_policy, MissingDatePolicy::Reject);
    assert_eq!(tech.keyword_match, KeywordMatch::WordBoundary);
}

#[test]
fn shipped_ai_config_parses() {
    let cfg = AiConfig::load_from_file(repo_file("config/ai.json")).unwrap();
    assert_eq!(cfg.provider, "groq");
    assert_eq!(cfg.daily_limit, 20);
}
