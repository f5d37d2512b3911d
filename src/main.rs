//! digest-curator binary entrypoint.
//! Loads config, runs every category once and writes the daily digest.
//!
//! See `README.md` for the directory layout and config files.

use anyhow::Context;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use digest_curator::app::{build_runs, run_daily};
use digest_curator::build_oracle;
use digest_curator::config::ai::AiConfig;
use digest_curator::config::load_config_default;

/// Compact logs by default, JSON lines when `DIGEST_LOG_FORMAT=json`.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("DIGEST_LOG_FORMAT")
        .ok()
        .is_some_and(|v| v.eq_ignore_ascii_case("json"));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer().compact()).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env in local/dev (API keys, config path overrides).
    let _ = dotenvy::dotenv();
    init_tracing();

    let cfg = load_config_default().context("loading digest config")?;
    let ai = AiConfig::load_default();
    let oracle = build_oracle(&ai);
    info!(
        categories = cfg.categories.len(),
        oracle = oracle.provider_name(),
        "digest-curator starting"
    );

    let runs = build_runs(&cfg, oracle);
    let outcome = run_daily(&cfg, &runs, chrono::Utc::now()).await?;

    println!("{}", outcome.digest.render_summary());
    Ok(())
}
