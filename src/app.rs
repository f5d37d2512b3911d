// src/app.rs
//! Wiring for one daily run: config -> sources + pipelines -> selections -> digest.

use std::path::PathBuf;

use anyhow::Result;
use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::config::{CategoryConfig, DigestConfig};
use crate::digest::Digest;
use crate::ingest::providers::json_file::JsonFileSource;
use crate::ingest::providers::rss::RssSource;
use crate::ingest::types::CandidateSource;
use crate::output::{
    cleanup_output_files, load_selection, save_digest, write_selection, CleanupReport,
};
use crate::pipeline::{run_categories, CategoryPipeline, CategoryRun, SelectionResult};
use crate::select::oracle::DynOracle;

/// Default sources for a category: the JSON dump in `input_dir` plus one RSS
/// source per configured feed. A feed whose client cannot be built is skipped.
pub fn default_sources(
    cfg: &CategoryConfig,
    cfg_root: &DigestConfig,
) -> Vec<Box<dyn CandidateSource>> {
    let mut sources: Vec<Box<dyn CandidateSource>> = vec![Box::new(JsonFileSource::in_dir(
        cfg.category,
        &cfg_root.paths.input_dir,
    ))];
    for feed in &cfg.feeds {
        match RssSource::from_url(cfg.category, feed) {
            Ok(src) => sources.push(Box::new(src)),
            Err(e) => warn!(
                target: "app",
                category = %cfg.category,
                feed = %feed,
                error = %e,
                "feed skipped"
            ),
        }
    }
    sources
}

/// One `CategoryRun` per configured category, in config order.
pub fn build_runs(cfg: &DigestConfig, oracle: DynOracle) -> Vec<CategoryRun> {
    cfg.categories
        .iter()
        .map(|c| CategoryRun {
            pipeline: CategoryPipeline::new(c.clone(), &cfg.paths.history_dir, oracle.clone()),
            sources: default_sources(c, cfg),
        })
        .collect()
}

/// Everything one run produced.
#[derive(Debug)]
pub struct RunOutcome {
    pub cleanup: CleanupReport,
    pub results: Vec<SelectionResult>,
    pub digest: Digest,
    pub digest_path: PathBuf,
}

/// Clear old outputs, run every category, persist selections and the digest.
///
/// Selection files that fail to write are logged and count as absent in the
/// digest. Only a digest write failure is an error.
pub async fn run_daily(
    cfg: &DigestConfig,
    runs: &[CategoryRun],
    now: DateTime<Utc>,
) -> Result<RunOutcome> {
    let cleanup = cleanup_output_files(&cfg.paths);

    let results = run_categories(runs, now).await;
    for r in &results {
        if let Err(e) = write_selection(&cfg.paths.output_dir, r) {
            warn!(target: "app", category = %r.category, error = ?e, "selection not written");
        }
    }

    // Assemble from what landed on disk; a missing selection file reads as absent.
    let loaded: Vec<_> = results
        .iter()
        .map(|r| (r.category, load_selection(&cfg.paths.output_dir, r.category)))
        .collect();
    let digest = Digest::assemble(loaded.iter().map(|(c, it)| (*c, it.as_ref())), now);
    let digest_path = save_digest(&cfg.paths.output_dir, &digest)?;
    info!(
        target: "app",
        path = %digest_path.display(),
        successful = %digest.daily_tech_digest.metadata.successful_sources,
        "digest written"
    );

    Ok(RunOutcome {
        cleanup,
        results,
        digest,
        digest_path,
    })
}
