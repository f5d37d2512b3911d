// src/ingest/providers/rss.rs
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use metrics::{counter, histogram};
use quick_xml::de::from_str;
use serde::Deserialize;
use std::time::Duration;
use time::{format_description::well_known::Rfc2822, OffsetDateTime};

use crate::ingest::normalize_text;
use crate::ingest::types::{CandidateItem, CandidateSource, Category};

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}
#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    item: Vec<Item>,
}
#[derive(Debug, Deserialize)]
struct Item {
    title: Option<String>,
    link: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    description: Option<String>,
}

fn parse_rfc2822(ts: &str) -> Option<DateTime<Utc>> {
    OffsetDateTime::parse(ts.trim(), &Rfc2822)
        .ok()
        .and_then(|dt| DateTime::from_timestamp(dt.unix_timestamp(), 0))
}

/// RSS 2.0 feed turned into candidates of one category.
pub struct RssSource {
    category: Category,
    label: String,
    mode: Mode,
}

enum Mode {
    Fixture(String),
    Http { url: String, client: reqwest::Client },
}

impl RssSource {
    pub fn from_fixture_str(category: Category, s: &str) -> Self {
        Self {
            category,
            label: format!("rss-fixture:{}", category.as_str()),
            mode: Mode::Fixture(s.to_string()),
        }
    }

    pub fn from_url(category: Category, url: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent("digest-curator/0.1")
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(30))
            .build()
            .context("building rss http client")?;
        Ok(Self {
            category,
            label: format!("rss:{url}"),
            mode: Mode::Http {
                url: url.to_string(),
                client,
            },
        })
    }

    fn parse_items_from_str(&self, s: &str) -> Result<Vec<CandidateItem>> {
        let t0 = std::time::Instant::now();
        let xml_clean = scrub_html_entities_for_xml(s);
        let rss: Rss = from_str(&xml_clean).context("parsing rss xml")?;

        let mut out = Vec::with_capacity(rss.channel.item.len());
        for it in rss.channel.item {
            let title = normalize_text(it.title.as_deref().unwrap_or_default());
            let Some(url) = it.link.map(|l| l.trim().to_string()) else {
                continue;
            };
            if title.is_empty() || url.is_empty() {
                continue;
            }
            let mut item = CandidateItem::new(self.category, title, url);
            item.published_at = it.pub_date.as_deref().and_then(parse_rfc2822);
            item.summary = it
                .description
                .as_deref()
                .map(normalize_text)
                .filter(|s| !s.is_empty());
            out.push(item);
        }

        let ms = t0.elapsed().as_secs_f64() * 1_000.0;
        histogram!("digest_rss_parse_ms").record(ms);
        counter!("digest_rss_items_total", "category" => self.category.as_str())
            .increment(out.len() as u64);
        Ok(out)
    }
}

#[async_trait]
impl CandidateSource for RssSource {
    async fn fetch_candidates(&self) -> Result<Vec<CandidateItem>> {
        match &self.mode {
            Mode::Fixture(s) => self.parse_items_from_str(s),
            Mode::Http { url, client } => {
                let resp = client
                    .get(url.as_str())
                    .send()
                    .await
                    .with_context(|| format!("rss http get {url}"))?
                    .error_for_status()
                    .with_context(|| format!("rss http status {url}"))?;
                let body = resp.text().await.context("rss http .text()")?;
                self.parse_items_from_str(&body)
            }
        }
    }

    fn name(&self) -> &str {
        &self.label
    }
}

fn scrub_html_entities_for_xml(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&ndash;", "-")
        .replace("&mdash;", "-")
        .replace("&ldquo;", "\"")
        .replace("&rdquo;", "\"")
        .replace("&lsquo;", "'")
        .replace("&rsquo;", "'")
}

#[cfg(test)]
mod tests {
    use super::*;

    const FEED: &str = r#"<?xml version="1.0"?>
<rss version="2.0"><channel><title>t</title>
<item><title>Rust&nbsp;1.80 released</title><link>https://blog.test/rust</link>
<pubDate>Sat, 25 Jan 2025 10:00:00 +0000</pubDate><description>&lt;p&gt;Notes&lt;/p&gt;</description></item>
<item><title>No link</title></item>
<item><title>Undated</title><link>https://blog.test/undated</link></item>
</channel></rss>"#;

    #[tokio::test]
    async fn parses_items_and_skips_linkless() {
        let src = RssSource::from_fixture_str(Category::TechNews, FEED);
        let out = src.fetch_candidates().await.unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].title, "Rust 1.80 released");
        assert_eq!(out[0].summary.as_deref(), Some("Notes"));
        assert_eq!(
            out[0].published_at.unwrap().timestamp(),
            parse_rfc2822("Sat, 25 Jan 2025 10:00:00 +0000")
                .unwrap()
                .timestamp()
        );
        assert!(out[1].published_at.is_none());
    }

    #[tokio::test]
    async fn broken_xml_is_an_error() {
        let src = RssSource::from_fixture_str(Category::TechNews, "<rss><channel>");
        assert!(src.fetch_candidates().await.is_err());
    }
}
