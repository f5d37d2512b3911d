//! Ranking oracle: provider abstraction + file cache + daily budget + response parsing.
//!
//! The oracle never panics and never returns a bare error string: every failure is
//! an `OracleError` variant so the selector can branch to its fallback explicitly.

use std::fs;
use std::future::Future;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use strsim::normalized_levenshtein;

use crate::config::ai::AiConfig;
use crate::history::normalize_title;
use crate::ingest::types::{CandidateItem, Category};

// ------------------------------------------------------------
// Public surface
// ------------------------------------------------------------

/// Oracle pick: index into the candidate slice plus its explanation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OracleChoice {
    pub index: usize,
    pub reasoning: String,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OracleError {
    #[error("oracle disabled")]
    Disabled,
    #[error("daily oracle budget of {0} calls exhausted")]
    Quota(u32),
    #[error("oracle request timed out")]
    Timeout,
    #[error("oracle transport error: {0}")]
    Transport(String),
    #[error("oracle returned HTTP {0}")]
    Status(u16),
    #[error("malformed oracle response: {0}")]
    Malformed(String),
    #[error("oracle found no suitable candidate")]
    Declined,
}

impl OracleError {
    /// Short label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            OracleError::Disabled => "disabled",
            OracleError::Quota(_) => "quota",
            OracleError::Timeout => "timeout",
            OracleError::Transport(_) => "transport",
            OracleError::Status(_) => "status",
            OracleError::Malformed(_) => "malformed",
            OracleError::Declined => "declined",
        }
    }
}

/// What the oracle is asked to rank.
#[derive(Debug, Clone, Copy)]
pub struct OracleRequest<'a> {
    pub category: Category,
    pub candidates: &'a [CandidateItem],
    pub criteria: &'a str,
}

pub type OracleFuture<'a> =
    Pin<Box<dyn Future<Output = Result<OracleChoice, OracleError>> + Send + 'a>>;

/// Trait object used by the selector.
pub trait RankingOracle: Send + Sync {
    fn rank<'a>(&'a self, req: &'a OracleRequest<'a>) -> OracleFuture<'a>;
    /// Provider name for diagnostics.
    fn provider_name(&self) -> &'static str;
}

pub type DynOracle = Arc<dyn RankingOracle>;

/// Factory: build an oracle according to config and environment variables.
///
/// * If `AI_TEST_MODE=mock`, returns a deterministic mock that picks the first candidate.
/// * Else if AI is disabled or has no key, returns a disabled oracle.
/// * Else builds the chat-completions provider wrapped with caching + daily budget.
pub fn build_oracle(config: &AiConfig) -> DynOracle {
    if std::env::var("AI_TEST_MODE")
        .map(|v| v == "mock")
        .unwrap_or(false)
    {
        return Arc::new(MockOracle::default());
    }

    if !config.is_usable() {
        tracing::info!(
            target: "oracle",
            enabled = config.enabled,
            "AI selection unavailable, fallback only"
        );
        return Arc::new(DisabledOracle);
    }

    let provider = match config.provider.as_str() {
        "groq" | "openai" => ChatCompletionsProvider::from_config(config),
        other => {
            tracing::warn!(target: "oracle", provider = other, "unsupported oracle provider");
            return Arc::new(DisabledOracle);
        }
    };
    match provider {
        Ok(p) => Arc::new(CompletionOracle::new(p, config.cache_dir.clone(), config.daily_limit)),
        Err(e) => {
            tracing::warn!(target: "oracle", error = %e, "oracle http client build failed");
            Arc::new(DisabledOracle)
        }
    }
}

// ------------------------------------------------------------
// Provider abstraction + concrete providers
// ------------------------------------------------------------

/// Low-level provider: one prompt in, raw completion text out. Separated so the
/// same caching/parsing wrapper serves production and tests.
pub trait Provider: Send + Sync + 'static {
    fn complete<'a>(
        &'a self,
        prompt: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<String, OracleError>> + Send + 'a>>;
    fn name(&self) -> &'static str;
}

/// OpenAI-compatible chat completions (Groq or OpenAI).
pub struct ChatCompletionsProvider {
    http: reqwest::Client,
    endpoint: &'static str,
    api_key: String,
    model: String,
    name: &'static str,
}

impl ChatCompletionsProvider {
    pub fn from_config(cfg: &AiConfig) -> anyhow::Result<Self> {
        let (endpoint, default_model, name) = match cfg.provider.as_str() {
            "openai" => (
                "https://api.openai.com/v1/chat/completions",
                "gpt-4o-mini",
                "openai",
            ),
            _ => (
                "https://api.groq.com/openai/v1/chat/completions",
                "llama-3.1-8b-instant",
                "groq",
            ),
        };
        let http = reqwest::Client::builder()
            .user_agent("digest-curator/0.1")
            .connect_timeout(Duration::from_secs(4))
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()?;
        Ok(Self {
            http,
            endpoint,
            api_key: cfg.api_key.clone(),
            model: cfg.model.clone().unwrap_or_else(|| default_model.to_string()),
            name,
        })
    }
}

impl Provider for ChatCompletionsProvider {
    fn complete<'a>(
        &'a self,
        prompt: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<String, OracleError>> + Send + 'a>> {
        Box::pin(async move {
            #[derive(Serialize)]
            struct Msg<'a> {
                role: &'a str,
                content: &'a str,
            }
            #[derive(Serialize)]
            struct Req<'a> {
                model: &'a str,
                messages: Vec<Msg<'a>>,
                temperature: f32,
                max_tokens: u32,
            }
            #[derive(Deserialize)]
            struct Resp {
                choices: Vec<Choice>,
            }
            #[derive(Deserialize)]
            struct Choice {
                message: ChoiceMsg,
            }
            #[derive(Deserialize)]
            struct ChoiceMsg {
                content: Option<String>,
            }

            let req = Req {
                model: &self.model,
                messages: vec![Msg {
                    role: "user",
                    content: prompt,
                }],
                temperature: 0.2,
                max_tokens: 300,
            };

            let resp = self
                .http
                .post(self.endpoint)
                .bearer_auth(&self.api_key)
                .json(&req)
                .send()
                .await
                .map_err(map_transport)?;

            let status = resp.status();
            if !status.is_success() {
                return Err(OracleError::Status(status.as_u16()));
            }
            let body: Resp = resp
                .json()
                .await
                .map_err(|e| OracleError::Malformed(format!("body: {e}")))?;
            body.choices
                .into_iter()
                .next()
                .and_then(|c| c.message.content)
                .filter(|s| !s.trim().is_empty())
                .ok_or_else(|| OracleError::Malformed("empty completion".to_string()))
        })
    }

    fn name(&self) -> &'static str {
        self.name
    }
}

fn map_transport(e: reqwest::Error) -> OracleError {
    if e.is_timeout() {
        OracleError::Timeout
    } else {
        OracleError::Transport(e.to_string())
    }
}

/// Always fails with `Disabled`; used when AI is off.
pub struct DisabledOracle;

impl RankingOracle for DisabledOracle {
    fn rank<'a>(&'a self, _req: &'a OracleRequest<'a>) -> OracleFuture<'a> {
        Box::pin(async { Err(OracleError::Disabled) })
    }
    fn provider_name(&self) -> &'static str {
        "disabled"
    }
}

/// Deterministic oracle for tests/local runs: picks the candidate at `index`
/// (clamped), or declines when there are none.
#[derive(Debug, Clone, Default)]
pub struct MockOracle {
    pub index: usize,
}

impl RankingOracle for MockOracle {
    fn rank<'a>(&'a self, req: &'a OracleRequest<'a>) -> OracleFuture<'a> {
        let n = req.candidates.len();
        let index = self.index.min(n.saturating_sub(1));
        Box::pin(async move {
            if n == 0 {
                return Err(OracleError::Declined);
            }
            Ok(OracleChoice {
                index,
                reasoning: format!("Mock pick #{} of {n}", index + 1),
            })
        })
    }
    fn provider_name(&self) -> &'static str {
        "mock"
    }
}

// ------------------------------------------------------------
// Completion oracle wrapper (prompt + file cache + daily budget + parsing)
// ------------------------------------------------------------

pub struct CompletionOracle<P: Provider> {
    inner: P,
    cache_dir: PathBuf,
    daily_limit_max: u32,
    counter: Arc<Mutex<DailyCounter>>,
}

impl<P: Provider> CompletionOracle<P> {
    pub fn new(inner: P, cache_dir: PathBuf, daily_limit_max: u32) -> Self {
        let _ = fs::create_dir_all(&cache_dir); // best-effort
        let counter = Arc::new(Mutex::new(
            load_daily_counter(&cache_dir).unwrap_or_default(),
        ));
        Self {
            inner,
            cache_dir,
            daily_limit_max,
            counter,
        }
    }

    /// Real calls made today.
    pub fn calls_today(&self) -> u32 {
        let mut g = self.counter.lock().unwrap_or_else(|e| e.into_inner());
        if g.is_expired() {
            g.reset_to_today();
        }
        g.count
    }

    async fn rank_impl(&self, req: &OracleRequest<'_>) -> Result<OracleChoice, OracleError> {
        if req.candidates.is_empty() {
            return Err(OracleError::Declined);
        }
        let prompt = build_prompt(req);
        let key = cache_key(&prompt);

        // 1) Cache lookup (free).
        if let Some(hit) = read_cache_file(&self.cache_dir, &key) {
            tracing::debug!(target: "oracle", key = %key, "oracle cache hit");
            return parse_choice(&hit, req.candidates);
        }

        // 2) Budget check; only real calls count.
        {
            let mut g = self.counter.lock().unwrap_or_else(|e| e.into_inner());
            if g.is_expired() {
                g.reset_to_today();
                let _ = save_daily_counter(&self.cache_dir, &g);
            }
            if g.count >= self.daily_limit_max {
                return Err(OracleError::Quota(self.daily_limit_max));
            }
        }

        // 3) Real call.
        let text = self.inner.complete(&prompt).await?;
        {
            let mut g = self.counter.lock().unwrap_or_else(|e| e.into_inner());
            g.count = g.count.saturating_add(1);
            let _ = save_daily_counter(&self.cache_dir, &g);
        }

        let parsed = parse_choice(&text, req.candidates);
        // Only answers that parsed are worth replaying.
        if parsed.is_ok() {
            let _ = write_cache_file(&self.cache_dir, &key, &text);
        }
        parsed
    }
}

impl<P: Provider> RankingOracle for CompletionOracle<P> {
    fn rank<'a>(&'a self, req: &'a OracleRequest<'a>) -> OracleFuture<'a> {
        Box::pin(self.rank_impl(req))
    }
    fn provider_name(&self) -> &'static str {
        self.inner.name()
    }
}

// ------------------------------------------------------------
// Prompt + response parsing
// ------------------------------------------------------------

/// Numbered candidate list, criteria, and the answer format.
pub fn build_prompt(req: &OracleRequest<'_>) -> String {
    let n = req.candidates.len();
    let mut list = String::new();
    for (i, c) in req.candidates.iter().enumerate() {
        list.push_str(&format!("{}. {}", i + 1, c.title));
        if let Some(company) = c.extra_str("company").filter(|s| !s.trim().is_empty()) {
            list.push_str(&format!(" ({})", company.trim()));
        }
        list.push('\n');
    }
    format!(
        "You are curating a daily digest for computer science engineering students.\n\
         Category: {category}\n\n\
         Selection criteria:\n{criteria}\n\n\
         Candidates ({n}):\n{list}\n\
         Respond with ONLY the number (1-{n}) of the single best candidate, followed by a brief \
         explanation of why it is the best choice. If none of them is suitable, respond with NONE.",
        category = req.category.display_name(),
        criteria = req.criteria.trim(),
    )
}

static INDEX_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"^\s*\**\s*(\d+)",
        r"(\d+)\.",
        r"(?i)article\s+(\d+)",
        r"(?i)number\s+(\d+)",
        r"#(\d+)",
    ]
    .iter()
    .filter_map(|p| Regex::new(p).ok())
    .collect()
});

/// Title similarity accepted when the response names a candidate instead of a number.
const TITLE_MATCH_THRESHOLD: f64 = 0.9;

/// Turn completion text into a choice over `candidates`.
///
/// Order: explicit `NONE`, then number patterns (first in-range hit), then a
/// candidate title mentioned in the text.
pub fn parse_choice(text: &str, candidates: &[CandidateItem]) -> Result<OracleChoice, OracleError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(OracleError::Malformed("empty completion".to_string()));
    }
    let reasoning = sanitize_reasoning(trimmed, 500);

    let first_word = trimmed
        .split(|c: char| !c.is_ascii_alphanumeric())
        .find(|w| !w.is_empty())
        .unwrap_or_default();
    if first_word.eq_ignore_ascii_case("none") {
        return Err(OracleError::Declined);
    }

    let n = candidates.len();
    for re in INDEX_PATTERNS.iter() {
        let Some(caps) = re.captures(trimmed) else {
            continue;
        };
        if let Some(num) = caps.get(1).and_then(|m| m.as_str().parse::<usize>().ok()) {
            if (1..=n).contains(&num) {
                return Ok(OracleChoice {
                    index: num - 1,
                    reasoning,
                });
            }
        }
    }

    let norm_text = normalize_title(trimmed);
    let first_line = normalize_title(trimmed.lines().next().unwrap_or_default());
    for (i, c) in candidates.iter().enumerate() {
        let t = normalize_title(&c.title);
        if t.is_empty() {
            continue;
        }
        if (t.chars().count() >= 8 && norm_text.contains(&t))
            || normalized_levenshtein(&first_line, &t) >= TITLE_MATCH_THRESHOLD
        {
            return Ok(OracleChoice { index: i, reasoning });
        }
    }

    Err(OracleError::Malformed(sanitize_reasoning(trimmed, 120)))
}

/// Single line, whitespace collapsed, at most `max` chars.
pub fn sanitize_reasoning(input: &str, max: usize) -> String {
    let collapsed = input.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.chars().count() <= max {
        collapsed
    } else {
        collapsed.chars().take(max).collect::<String>().trim_end().to_string()
    }
}

// ------------------------------------------------------------
// File cache helpers
// ------------------------------------------------------------

#[derive(Debug, Serialize, Deserialize)]
struct CachedCompletion {
    text: String,
}

fn cache_key(prompt: &str) -> String {
    let digest = Sha256::digest(prompt.as_bytes());
    let mut out = String::with_capacity(32);
    for b in digest.iter().take(16) {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}

fn cache_path(dir: &Path, key: &str) -> PathBuf {
    dir.join(format!("{key}.json"))
}

fn read_cache_file(dir: &Path, key: &str) -> Option<String> {
    let s = fs::read_to_string(cache_path(dir, key)).ok()?;
    let cached: CachedCompletion = serde_json::from_str(&s).ok()?;
    Some(cached.text)
}

fn write_cache_file(dir: &Path, key: &str, text: &str) -> io::Result<()> {
    let path = cache_path(dir, key);
    let tmp = path.with_extension("json.tmp");
    let json = serde_json::to_string(&CachedCompletion {
        text: text.to_string(),
    })
    .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    let mut f = fs::File::create(&tmp)?;
    f.write_all(json.as_bytes())?;
    fs::rename(tmp, path)?;
    Ok(())
}

// ------------------------------------------------------------
// Daily counter helpers
// ------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
struct DailyCounter {
    date: String,
    count: u32,
}
impl Default for DailyCounter {
    fn default() -> Self {
        Self {
            date: today(),
            count: 0,
        }
    }
}
impl DailyCounter {
    fn is_expired(&self) -> bool {
        self.date != today()
    }
    fn reset_to_today(&mut self) {
        self.date = today();
        self.count = 0;
    }
}

fn today() -> String {
    Utc::now().date_naive().to_string()
}

fn counter_path(dir: &Path) -> PathBuf {
    dir.join("daily_count.json")
}

fn load_daily_counter(dir: &Path) -> io::Result<DailyCounter> {
    let s = fs::read_to_string(counter_path(dir))?;
    serde_json::from_str(&s).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

fn save_daily_counter(dir: &Path, dc: &DailyCounter) -> io::Result<()> {
    let p = counter_path(dir);
    let tmp = p.with_extension("json.tmp");
    let s = serde_json::to_string(dc).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    let mut f = fs::File::create(&tmp)?;
    f.write_all(s.as_bytes())?;
    fs::rename(tmp, p)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn cands(titles: &[&str]) -> Vec<CandidateItem> {
        titles
            .iter()
            .enumerate()
            .map(|(i, t)| CandidateItem::new(Category::TechNews, *t, format!("https://n.test/{i}")))
            .collect()
    }

    #[test]
    fn parses_leading_number() {
        let c = cands(&["a", "b", "c"]);
        let got = parse_choice("2\nBecause it is about compilers.", &c).unwrap();
        assert_eq!(got.index, 1);
        assert!(got.reasoning.starts_with("2 Because"));
    }

    #[test]
    fn parses_article_phrase_and_hash() {
        let c = cands(&["a", "b", "c"]);
        assert_eq!(parse_choice("I pick article 3 for depth", &c).unwrap().index, 2);
        assert_eq!(parse_choice("Best is #1 overall", &c).unwrap().index, 0);
    }

    #[test]
    fn out_of_range_number_falls_through_to_title() {
        let c = cands(&["Rust compiler gets faster", "Other"]);
        let got = parse_choice("7 looks nice but Rust compiler gets faster is best", &c).unwrap();
        assert_eq!(got.index, 0);
    }

    #[test]
    fn none_is_declined_and_noise_is_malformed() {
        let c = cands(&["a"]);
        assert_eq!(parse_choice("NONE - all spam", &c), Err(OracleError::Declined));
        assert!(matches!(
            parse_choice("I cannot decide.", &c),
            Err(OracleError::Malformed(_))
        ));
        assert!(matches!(parse_choice("   ", &c), Err(OracleError::Malformed(_))));
    }

    #[test]
    fn prompt_numbers_candidates_and_shows_company() {
        let mut c = cands(&["Backend Intern", "Data Intern"]);
        c[1] = c[1].clone().with_extra("company", "Acme");
        let req = OracleRequest {
            category: Category::Internship,
            candidates: &c,
            criteria: "best internship",
        };
        let p = build_prompt(&req);
        assert!(p.contains("1. Backend Intern\n"));
        assert!(p.contains("2. Data Intern (Acme)"));
        assert!(p.contains("(1-2)"));
        assert!(p.contains("Internships"));
    }

    struct CountingProvider {
        calls: AtomicU32,
        answer: String,
    }

    impl Provider for CountingProvider {
        fn complete<'a>(
            &'a self,
            _prompt: &'a str,
        ) -> Pin<Box<dyn Future<Output = Result<String, OracleError>> + Send + 'a>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let out = self.answer.clone();
            Box::pin(async move { Ok(out) })
        }
        fn name(&self) -> &'static str {
            "counting"
        }
    }

    #[tokio::test]
    async fn cache_hit_skips_provider_and_budget() {
        let dir = tempfile::tempdir().unwrap();
        let provider = CountingProvider {
            calls: AtomicU32::new(0),
            answer: "2 - solid".to_string(),
        };
        let oracle = CompletionOracle::new(provider, dir.path().to_path_buf(), 1);
        let c = cands(&["a", "b"]);
        let req = OracleRequest {
            category: Category::TechNews,
            candidates: &c,
            criteria: "x",
        };
        assert_eq!(oracle.rank(&req).await.unwrap().index, 1);
        assert_eq!(oracle.rank(&req).await.unwrap().index, 1);
        assert_eq!(oracle.inner.calls.load(Ordering::SeqCst), 1);
        assert_eq!(oracle.calls_today(), 1);
    }

    #[tokio::test]
    async fn budget_exhaustion_is_quota() {
        let dir = tempfile::tempdir().unwrap();
        let provider = CountingProvider {
            calls: AtomicU32::new(0),
            answer: "1".to_string(),
        };
        let oracle = CompletionOracle::new(provider, dir.path().to_path_buf(), 1);
        let first = cands(&["a", "b"]);
        let second = cands(&["c", "d"]);
        let r1 = OracleRequest {
            category: Category::Job,
            candidates: &first,
            criteria: "x",
        };
        let r2 = OracleRequest {
            candidates: &second,
            ..r1
        };
        assert!(oracle.rank(&r1).await.is_ok());
        assert_eq!(oracle.rank(&r2).await, Err(OracleError::Quota(1)));
    }

    #[tokio::test]
    async fn disabled_and_mock() {
        let c = cands(&["a", "b"]);
        let req = OracleRequest {
            category: Category::Job,
            candidates: &c,
            criteria: "",
        };
        assert_eq!(DisabledOracle.rank(&req).await, Err(OracleError::Disabled));
        let got = MockOracle { index: 5 }.rank(&req).await.unwrap();
        assert_eq!(got.index, 1);
    }
}
