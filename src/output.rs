//! Persisted output collaborator.
//!
//! Writes one JSON document per successful fetch, named by target host and
//! UTC timestamp. This sits downstream of the orchestrator: fetch outcomes
//! are complete whether or not persistence succeeds.

use std::io;
use std::path::{Path, PathBuf};

use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::json;

use crate::strategies::FetchResult;

static UNSAFE_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^A-Za-z0-9._-]").expect("invalid filename pattern"));

/// Directory sink for fetch results.
#[derive(Debug, Clone)]
pub struct OutputSink {
    dir: PathBuf,
}

impl OutputSink {
    pub fn new(dir: impl Into<PathBuf>) -> io::Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Persist one result; returns the path written.
    pub fn write(&self, result: &FetchResult) -> io::Result<PathBuf> {
        let host = result.url.host_str().unwrap_or("unknown");
        let stamp = Utc::now().format("%Y%m%d_%H%M%S");
        let filename = format!("{}_{stamp}.json", sanitize(host));
        let path = self.dir.join(filename);

        let document = json!({
            "url": result.url.as_str(),
            "final_url": result.final_url.as_str(),
            "status": result.status,
            "method": result.strategy.as_str(),
            "fetched_at": result.fetched_at.to_rfc3339(),
            "body": result.text(),
        });

        std::fs::write(&path, serde_json::to_string_pretty(&document)?)?;
        log::info!("saved {}", path.display());
        Ok(path)
    }
}

fn sanitize(raw: &str) -> String {
    UNSAFE_CHARS.replace_all(raw, "_").into_owned()
}
