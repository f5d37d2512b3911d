// tests/dedup_session.rs
use std::collections::HashSet;

use digest_curator::dedup::{normalize_url, session_dedup};
use digest_curator::{CandidateItem, Category};
use rand::{rngs::StdRng, seq::SliceRandom, Rng, SeedableRng};

fn batch(rng: &mut StdRng, n: usize) -> Vec<CandidateItem> {
    (0..n)
        .map(|i| {
            let slot = rng.random_range(0..12);
            let scheme = if rng.random_bool(0.5) { "https" } else { "http" };
            CandidateItem::new(
                Category::UpskillArticle,
                format!("post {i}"),
                format!("{scheme}://blog.test/p{slot}"),
            )
        })
        .collect()
}

#[test]
fn keeps_first_occurrence_and_one_per_url_for_any_order() {
    let mut rng = StdRng::seed_from_u64(7);
    for _ in 0..50 {
        let mut items = batch(&mut rng, 30);
        items.shuffle(&mut rng);

        let distinct: HashSet<String> = items.iter().map(|i| normalize_url(&i.url)).collect();
        let (kept, dropped) = session_dedup(items.clone());

        assert_eq!(kept.len(), distinct.len());
        assert_eq!(kept.len() + dropped, items.len());

        // every survivor is the first item carrying its url
        for k in &kept {
            let first = items
                .iter()
                .find(|i| normalize_url(&i.url) == normalize_url(&k.url))
                .unwrap();
            assert_eq!(first.title, k.title);
        }
    }
}
