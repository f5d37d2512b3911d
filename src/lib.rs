// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod app;
pub mod config;
pub mod dedup;
pub mod digest;
pub mod filter;
pub mod history;
pub mod ingest;
pub mod output;
pub mod pipeline;
pub mod select;

// ---- Re-exports for stable public API ----
pub use crate::ingest::types::{CandidateItem, CandidateSource, Category};
pub use crate::pipeline::{CategoryPipeline, RunStats, SelectionResult};
pub use crate::select::oracle::{build_oracle, DynOracle, OracleChoice, OracleError, RankingOracle};
pub use crate::select::SelectionMethod;
