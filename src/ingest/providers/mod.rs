// src/ingest/providers/mod.rs
pub mod json_file;
pub mod rss;
