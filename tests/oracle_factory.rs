// tests/oracle_factory.rs
use digest_curator::config::ai::AiConfig;
use digest_curator::select::oracle::OracleRequest;
use digest_curator::{build_oracle, CandidateItem, Category, OracleError, RankingOracle};
use std::env;

fn candidates() -> Vec<CandidateItem> {
    vec![
        CandidateItem::new(Category::TechNews, "First", "https://n.test/1"),
        CandidateItem::new(Category::TechNews, "Second", "https://n.test/2"),
    ]
}

#[tokio::test]
#[serial_test::serial]
async fn test_mode_mock_always_picks_first() {
    env::set_var("AI_TEST_MODE", "mock");
    let oracle = build_oracle(&AiConfig::default());
    env::remove_var("AI_TEST_MODE");

    assert_eq!(oracle.provider_name(), "mock");
    let c = candidates();
    let req = OracleRequest {
        category: Category::TechNews,
        candidates: &c,
        criteria: "anything",
    };
    assert_eq!(oracle.rank(&req).await.unwrap().index, 0);
}

#[tokio::test]
#[serial_test::serial]
async fn disabled_or_keyless_config_is_disabled() {
    env::remove_var("AI_TEST_MODE");
    let c = candidates();
    let req = OracleRequest {
        category: Category::TechNews,
        candidates: &c,
        criteria: "",
    };

    let off = build_oracle(&AiConfig::default());
    assert_eq!(off.rank(&req).await, Err(OracleError::Disabled));

    let keyless = AiConfig {
        enabled: true,
        api_key: String::new(),
        ..AiConfig::default()
    };
    assert_eq!(build_oracle(&keyless).provider_name(), "disabled");
}
