// src/pipeline.rs
//! Per-category run: filter -> load history -> dedup -> select -> record.
//!
//! History is written at most once per category run, and only after a selection
//! exists. Categories never share state, so one category failing leaves the
//! others untouched.

use std::path::Path;

use chrono::{DateTime, Utc};
use metrics::{counter, describe_counter, describe_gauge, gauge};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::CategoryConfig;
use crate::dedup::dedup;
use crate::filter::CandidateFilter;
use crate::history::HistoryStore;
use crate::ingest::collect_candidates;
use crate::ingest::types::{CandidateItem, CandidateSource, Category};
use crate::select::oracle::DynOracle;
use crate::select::{SelectionMethod, Selector};

/// One-time metrics registration.
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("digest_scraped_total", "Candidates received from sources.");
        describe_counter!(
            "digest_filtered_total",
            "Candidates rejected by the date or keyword filter."
        );
        describe_counter!(
            "digest_duplicates_total",
            "Candidates removed as in-batch or historical duplicates."
        );
        describe_counter!(
            "digest_selections_total",
            "Selections made, by method (ai/fallback/none)."
        );
        describe_counter!(
            "digest_oracle_failures_total",
            "Oracle calls that ended in fallback, by failure kind."
        );
        describe_counter!("digest_source_errors_total", "Source fetch/parse errors.");
        describe_counter!("digest_history_errors_total", "History read/write failures.");
        describe_gauge!("digest_last_run_ts", "Unix ts of the last category run.");
    });
}

/// Counts reported for every category run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStats {
    pub scraped: usize,
    pub filtered_by_date: usize,
    pub filtered_by_keyword: usize,
    pub session_duplicates: usize,
    pub history_duplicates: usize,
    pub final_eligible: usize,
}

impl RunStats {
    /// Duplicates from both dedup passes.
    pub fn duplicates(&self) -> usize {
        self.session_duplicates + self.history_duplicates
    }
}

/// What a category run produced. Serialized as `selected_<category>.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectionResult {
    pub category: Category,
    pub selected_item: Option<CandidateItem>,
    pub method: SelectionMethod,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
    pub stats: RunStats,
    pub generated_at: DateTime<Utc>,
    /// Set when the category could not run at all (every source failed).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<String>,
}

impl SelectionResult {
    pub fn failed(category: Category, reason: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            category,
            selected_item: None,
            method: SelectionMethod::None,
            reasoning: None,
            stats: RunStats::default(),
            generated_at: now,
            failure: Some(reason.into()),
        }
    }

    pub fn is_selected(&self) -> bool {
        self.selected_item.is_some()
    }
}

pub struct CategoryPipeline {
    cfg: CategoryConfig,
    filter: CandidateFilter,
    store: HistoryStore,
    oracle: DynOracle,
}

impl CategoryPipeline {
    pub fn new(cfg: CategoryConfig, history_dir: &Path, oracle: DynOracle) -> Self {
        let filter = CandidateFilter::new(&cfg);
        let store = HistoryStore::in_dir(history_dir, &cfg.history_key, cfg.retention_days);
        Self {
            cfg,
            filter,
            store,
            oracle,
        }
    }

    pub fn category(&self) -> Category {
        self.cfg.category
    }

    pub fn history_store(&self) -> &HistoryStore {
        &self.store
    }

    /// Run over already-collected candidates.
    pub async fn run(&self, raw: Vec<CandidateItem>, now: DateTime<Utc>) -> SelectionResult {
        ensure_metrics_described();
        let category = self.cfg.category;
        let label = category.as_str();
        let mut stats = RunStats {
            scraped: raw.len(),
            ..Default::default()
        };

        let filtered = self.filter.apply(raw, now);
        stats.filtered_by_date = filtered.rejected_by_date;
        stats.filtered_by_keyword = filtered.rejected_by_keyword;

        let history = self.store.load(now);
        let deduped = dedup(filtered.kept, &history);
        stats.session_duplicates = deduped.session_duplicates;
        stats.history_duplicates = deduped.history_duplicates;
        stats.final_eligible = deduped.eligible.len();

        let selection = Selector::new(&self.cfg, self.oracle.as_ref())
            .select(&deduped.eligible, now)
            .await;

        if let Some(item) = &selection.item {
            let updated = history.record(item, now);
            self.store.save(&updated);
        }

        counter!("digest_scraped_total", "category" => label).increment(stats.scraped as u64);
        counter!("digest_filtered_total", "category" => label)
            .increment((stats.filtered_by_date + stats.filtered_by_keyword) as u64);
        counter!("digest_duplicates_total", "category" => label)
            .increment(stats.duplicates() as u64);
        counter!(
            "digest_selections_total",
            "category" => label,
            "method" => method_label(selection.method)
        )
        .increment(1);
        gauge!("digest_last_run_ts").set(now.timestamp() as f64);

        info!(
            target: "pipeline",
            %category,
            scraped = stats.scraped,
            filtered_by_date = stats.filtered_by_date,
            filtered_by_keyword = stats.filtered_by_keyword,
            duplicates = stats.duplicates(),
            eligible = stats.final_eligible,
            method = method_label(selection.method),
            "category run finished"
        );

        SelectionResult {
            category,
            selected_item: selection.item,
            method: selection.method,
            reasoning: selection.reasoning,
            stats,
            generated_at: now,
            failure: None,
        }
    }
}

fn method_label(m: SelectionMethod) -> &'static str {
    match m {
        SelectionMethod::Ai => "ai",
        SelectionMethod::Fallback => "fallback",
        SelectionMethod::None => "none",
    }
}

/// A category pipeline together with the sources that feed it.
pub struct CategoryRun {
    pub pipeline: CategoryPipeline,
    pub sources: Vec<Box<dyn CandidateSource>>,
}

impl CategoryRun {
    /// Collect from sources, then run. A category whose sources all fail yields
    /// an absent selection and leaves its history untouched.
    pub async fn execute(&self, now: DateTime<Utc>) -> SelectionResult {
        let category = self.pipeline.category();
        match collect_candidates(category, &self.sources).await {
            Ok(raw) => self.pipeline.run(raw, now).await,
            Err(e) => {
                warn!(target: "pipeline", %category, error = %e, "category skipped");
                SelectionResult::failed(category, e.to_string(), now)
            }
        }
    }
}

/// Run every category in order. Results come back in the same order.
pub async fn run_categories(runs: &[CategoryRun], now: DateTime<Utc>) -> Vec<SelectionResult> {
    let mut out = Vec::with_capacity(runs.len());
    for run in runs {
        out.push(run.execute(now).await);
    }
    let selected = out.iter().filter(|r| r.is_selected()).count();
    info!(target: "pipeline", selected, total = out.len(), "all categories processed");
    out
}
