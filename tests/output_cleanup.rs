// tests/output_cleanup.rs
use std::fs;

use digest_curator::config::PathsConfig;
use digest_curator::output::{cleanup_output_files, selection_path, DIGEST_FILE};
use digest_curator::Category;

#[test]
fn clears_run_artifacts_and_preserves_history() {
    let tmp = tempfile::tempdir().unwrap();
    let paths = PathsConfig {
        input_dir: tmp.path().join("input"),
        history_dir: tmp.path().join("data/history"),
        output_dir: tmp.path().join("data"),
    };
    fs::create_dir_all(&paths.history_dir).unwrap();

    let sel = selection_path(&paths.output_dir, Category::Job);
    let digest = paths.output_dir.join(DIGEST_FILE);
    let unrelated = paths.output_dir.join("notes.txt");
    let history = paths.history_dir.join("job_history.json");
    for p in [&sel, &digest, &unrelated, &history] {
        fs::write(p, "{}").unwrap();
    }

    let report = cleanup_output_files(&paths);
    assert!(!sel.exists());
    assert!(!digest.exists());
    assert!(unrelated.exists());
    assert!(history.exists());
    assert_eq!(report.cleared.len(), 2);
    assert!(report.preserved.contains(&history));
    assert!(report.errors.is_empty());
    // three other categories had no selection file
    assert_eq!(report.not_found.len(), 3);
}
