// src/config/ai.rs
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::{env, fs};

pub const DEFAULT_AI_CONFIG_PATH: &str = "config/ai.json";
pub const ENV_AI_CONFIG_PATH: &str = "AI_CONFIG_PATH";

fn default_provider() -> String {
    "groq".to_string()
}
fn default_daily_limit() -> u32 {
    20
}
fn default_api_key() -> String {
    "ENV".to_string()
}
fn default_timeout_secs() -> u64 {
    20
}
fn default_cache_dir() -> PathBuf {
    PathBuf::from("cache/oracle")
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiConfig {
    pub enabled: bool,
    /// "groq" | "openai" (case-insensitive)
    #[serde(default = "default_provider")]
    pub provider: String,
    /// Chat model id; provider default when absent.
    #[serde(default)]
    pub model: Option<String>,
    /// Real remote calls allowed per UTC day. Cache hits are free.
    #[serde(default = "default_daily_limit")]
    pub daily_limit: u32,
    /// "ENV" means: read from GROQ_API_KEY / OPENAI_API_KEY (by provider)
    #[serde(default = "default_api_key")]
    pub api_key: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            provider: default_provider(),
            model: None,
            daily_limit: default_daily_limit(),
            api_key: default_api_key(),
            timeout_secs: default_timeout_secs(),
            cache_dir: default_cache_dir(),
        }
    }
}

impl AiConfig {
    /// Parse and normalize. A missing env key is not an error: the oracle is
    /// then built disabled and selection falls back.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let data = fs::read_to_string(path)?;
        let cfg: AiConfig = serde_json::from_str(&data)?;
        Ok(cfg.normalized())
    }

    /// `$AI_CONFIG_PATH`, then `config/ai.json`; unreadable or absent -> disabled default.
    pub fn load_default() -> Self {
        let path = env::var(ENV_AI_CONFIG_PATH)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_AI_CONFIG_PATH));
        match Self::load_from_file(&path) {
            Ok(cfg) => cfg,
            Err(e) => {
                tracing::info!(
                    target: "oracle",
                    path = %path.display(),
                    error = %e,
                    "ai config not loaded, AI selection disabled"
                );
                Self::default()
            }
        }
    }

    fn normalized(mut self) -> Self {
        self.provider = self.provider.trim().to_lowercase();

        if self.api_key.trim().eq_ignore_ascii_case("env") {
            let var = match self.provider.as_str() {
                "openai" => "OPENAI_API_KEY",
                _ => "GROQ_API_KEY",
            };
            self.api_key = env::var(var).unwrap_or_default();
        }
        self.api_key = self.api_key.trim().to_string();

        if self.timeout_secs == 0 {
            self.timeout_secs = default_timeout_secs();
        }
        self
    }

    /// Enabled and holding a key.
    pub fn is_usable(&self) -> bool {
        self.enabled && !self.api_key.is_empty()
    }
}
