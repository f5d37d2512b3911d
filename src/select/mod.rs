// src/select/mod.rs
//! Selector: ask the oracle, fall back to the deterministic rule on any failure.
//!
//! States: `Start` -> (`Oracle` | `Done(None)`) -> (`Done(Ai)` | `Fallback`) -> `Done(Fallback)`.
//! Every path terminates in `Done`; oracle failures never escape this module.

pub mod fallback;
pub mod oracle;

use chrono::{DateTime, Utc};
use metrics::counter;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::CategoryConfig;
use crate::ingest::types::CandidateItem;
use oracle::{OracleError, OracleRequest, RankingOracle};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionMethod {
    Ai,
    Fallback,
    None,
}

/// Outcome of one selection. `item` is `None` iff `method` is `None`; `reasoning`
/// is only set for oracle picks.
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    pub item: Option<CandidateItem>,
    pub method: SelectionMethod,
    pub reasoning: Option<String>,
}

impl Selection {
    pub fn none() -> Self {
        Self {
            item: None,
            method: SelectionMethod::None,
            reasoning: None,
        }
    }
}

enum State {
    Start,
    Oracle,
    Fallback(OracleError),
    Done(Selection),
}

pub struct Selector<'a> {
    cfg: &'a CategoryConfig,
    oracle: &'a dyn RankingOracle,
}

impl<'a> Selector<'a> {
    pub fn new(cfg: &'a CategoryConfig, oracle: &'a dyn RankingOracle) -> Self {
        Self { cfg, oracle }
    }

    /// Pick at most one item from `eligible`. The result is always a member of
    /// `eligible`; an empty slice yields `SelectionMethod::None` without
    /// consulting the oracle.
    pub async fn select(&self, eligible: &[CandidateItem], now: DateTime<Utc>) -> Selection {
        let category = self.cfg.category;
        let mut state = State::Start;
        loop {
            state = match state {
                State::Start if eligible.is_empty() => State::Done(Selection::none()),
                State::Start => State::Oracle,
                State::Oracle => {
                    let req = OracleRequest {
                        category,
                        candidates: eligible,
                        criteria: &self.cfg.selection_criteria,
                    };
                    match self.oracle.rank(&req).await {
                        Ok(choice) => match eligible.get(choice.index) {
                            Some(item) => {
                                info!(
                                    target: "selector",
                                    %category,
                                    provider = self.oracle.provider_name(),
                                    title = %item.title,
                                    "oracle selection"
                                );
                                State::Done(Selection {
                                    item: Some(item.clone()),
                                    method: SelectionMethod::Ai,
                                    reasoning: Some(choice.reasoning),
                                })
                            }
                            None => State::Fallback(OracleError::Malformed(format!(
                                "index {} out of range for {} candidates",
                                choice.index,
                                eligible.len()
                            ))),
                        },
                        Err(e) => State::Fallback(e),
                    }
                }
                State::Fallback(err) => {
                    if err == OracleError::Disabled {
                        info!(target: "selector", %category, "oracle disabled, using fallback");
                    } else {
                        warn!(
                            target: "selector",
                            %category,
                            error = %err,
                            "oracle failed, using fallback"
                        );
                    }
                    counter!(
                        "digest_oracle_failures_total",
                        "category" => category.as_str(),
                        "kind" => err.kind()
                    )
                    .increment(1);

                    State::Done(match fallback::pick(self.cfg.fallback, eligible, now) {
                        Some(i) => {
                            info!(
                                target: "selector",
                                %category,
                                rule = ?self.cfg.fallback,
                                eligible = eligible.len(),
                                title = %eligible[i].title,
                                "fallback selection"
                            );
                            Selection {
                                item: Some(eligible[i].clone()),
                                method: SelectionMethod::Fallback,
                                reasoning: None,
                            }
                        }
                        None => Selection::none(),
                    })
                }
                State::Done(selection) => return selection,
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{FallbackRule, MissingDatePolicy};
    use crate::ingest::types::Category;
    use oracle::{DisabledOracle, MockOracle, OracleChoice, OracleFuture};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct OutOfRange;
    impl RankingOracle for OutOfRange {
        fn rank<'a>(&'a self, _req: &'a OracleRequest<'a>) -> OracleFuture<'a> {
            Box::pin(async {
                Ok(OracleChoice {
                    index: 99,
                    reasoning: String::new(),
                })
            })
        }
        fn provider_name(&self) -> &'static str {
            "out-of-range"
        }
    }

    #[derive(Default)]
    struct Counting(AtomicUsize);
    impl RankingOracle for Counting {
        fn rank<'a>(&'a self, _req: &'a OracleRequest<'a>) -> OracleFuture<'a> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Box::pin(async { Err(OracleError::Timeout) })
        }
        fn provider_name(&self) -> &'static str {
            "counting"
        }
    }

    fn cfg() -> CategoryConfig {
        CategoryConfig::new(Category::Job, 24, MissingDatePolicy::AcceptAsRecent)
    }

    fn items() -> Vec<CandidateItem> {
        vec![
            CandidateItem::new(Category::Job, "Office assistant", "https://j.test/1"),
            CandidateItem::new(Category::Job, "Junior Software Engineer", "https://j.test/2"),
        ]
    }

    #[tokio::test]
    async fn empty_set_skips_oracle() {
        let c = cfg();
        let oracle = Counting::default();
        let s = Selector::new(&c, &oracle).select(&[], Utc::now()).await;
        assert_eq!(s, Selection::none());
        assert_eq!(oracle.0.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn oracle_pick_is_ai() {
        let c = cfg();
        let oracle = MockOracle { index: 1 };
        let s = Selector::new(&c, &oracle).select(&items(), Utc::now()).await;
        assert_eq!(s.method, SelectionMethod::Ai);
        assert_eq!(s.item.unwrap().url, "https://j.test/2");
    }

    #[tokio::test]
    async fn failures_fall_back_by_rule() {
        let mut c = cfg();
        let now = Utc::now();
        let s = Selector::new(&c, &DisabledOracle).select(&items(), now).await;
        assert_eq!(s.method, SelectionMethod::Fallback);
        assert_eq!(s.item.unwrap().url, "https://j.test/1");

        c.fallback = FallbackRule::KeywordScore;
        let s = Selector::new(&c, &OutOfRange).select(&items(), now).await;
        assert_eq!(s.method, SelectionMethod::Fallback);
        assert_eq!(s.item.unwrap().url, "https://j.test/2");
    }
}
