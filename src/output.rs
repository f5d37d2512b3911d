// src/output.rs
//! Per-run output files: `selected_<category>.json`, `daily_tech_digest.json`,
//! and the cleanup pass that clears them before a run.
//!
//! Cleanup only deletes files it knows by name and never anything under the
//! history directory.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{info, warn};

use crate::config::PathsConfig;
use crate::digest::Digest;
use crate::ingest::types::{CandidateItem, Category};
use crate::pipeline::SelectionResult;

pub const DIGEST_FILE: &str = "daily_tech_digest.json";

pub fn selection_path(output_dir: &Path, category: Category) -> PathBuf {
    output_dir.join(format!("selected_{}.json", category.as_str()))
}

fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
    }
    let json = serde_json::to_vec_pretty(value)?;
    let tmp = path.with_extension("json.tmp");
    let mut f = fs::File::create(&tmp).with_context(|| format!("creating {}", tmp.display()))?;
    f.write_all(&json)?;
    fs::rename(&tmp, path).with_context(|| format!("renaming into {}", path.display()))?;
    Ok(())
}

pub fn write_selection(output_dir: &Path, result: &SelectionResult) -> Result<PathBuf> {
    let path = selection_path(output_dir, result.category);
    write_json_atomic(&path, result)?;
    Ok(path)
}

/// The selected item for `category`, or `None` when the file is missing,
/// unreadable, or records no selection. All of these mean "absent".
pub fn load_selection(output_dir: &Path, category: Category) -> Option<CandidateItem> {
    let path = selection_path(output_dir, category);
    let raw = match fs::read_to_string(&path) {
        Ok(s) => s,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return None,
        Err(e) => {
            warn!(target: "output", path = %path.display(), error = %e, "selection unreadable");
            return None;
        }
    };
    match serde_json::from_str::<SelectionResult>(&raw) {
        Ok(r) => r.selected_item,
        Err(e) => {
            warn!(target: "output", path = %path.display(), error = %e, "selection malformed");
            None
        }
    }
}

pub fn save_digest(output_dir: &Path, digest: &Digest) -> Result<PathBuf> {
    let path = output_dir.join(DIGEST_FILE);
    write_json_atomic(&path, digest)?;
    Ok(path)
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanupReport {
    pub cleared: Vec<PathBuf>,
    pub not_found: Vec<PathBuf>,
    /// History files seen and left alone.
    pub preserved: Vec<PathBuf>,
    pub errors: Vec<String>,
}

/// Delete last run's output files. Only names produced by this crate are
/// removed; the history directory is listed for the report and never modified.
pub fn cleanup_output_files(paths: &PathsConfig) -> CleanupReport {
    let mut report = CleanupReport::default();

    let mut targets: Vec<PathBuf> = Category::ALL
        .iter()
        .map(|c| selection_path(&paths.output_dir, *c))
        .collect();
    targets.push(paths.output_dir.join(DIGEST_FILE));

    for path in targets {
        if is_within(&path, &paths.history_dir) {
            report.preserved.push(path);
            continue;
        }
        match fs::remove_file(&path) {
            Ok(()) => report.cleared.push(path),
            Err(e) if e.kind() == io::ErrorKind::NotFound => report.not_found.push(path),
            Err(e) => report.errors.push(format!("{}: {e}", path.display())),
        }
    }

    if let Ok(entries) = fs::read_dir(&paths.history_dir) {
        for entry in entries.flatten() {
            let p = entry.path();
            if p.extension().and_then(|e| e.to_str()) == Some("json") {
                report.preserved.push(p);
            }
        }
    }

    if report.errors.is_empty() {
        info!(
            target: "output",
            cleared = report.cleared.len(),
            preserved = report.preserved.len(),
            "output cleanup done"
        );
    } else {
        warn!(target: "output", errors = ?report.errors, "output cleanup finished with errors");
    }
    report
}

/// Lexical containment; both paths are taken as configured.
fn is_within(path: &Path, dir: &Path) -> bool {
    !dir.as_os_str().is_empty() && path.starts_with(dir)
}
