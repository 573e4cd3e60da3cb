//! Extraction boundary.
//!
//! Site extractors turn a page URL into [`MediaItem`]s. The engine never
//! interprets [`ExtractOptions`]; they are passed through untouched.

mod registry;
mod universal;

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::DownloadError;
use crate::media::MediaItem;

pub use registry::{ExtractorHandle, ExtractorRegistry};
pub use universal::UniversalExtractor;

#[derive(Debug, Error)]
pub enum ExtractorError {
    #[error("unsupported url: {0}")]
    UnsupportedUrl(String),
    #[error("invalid url: {0}")]
    InvalidUrl(String),
    #[error(transparent)]
    Request(#[from] DownloadError),
    #[error("invalid extractor pattern `{pattern}`: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
    #[error("other: {0}")]
    Other(String),
}

/// Options forwarded to extractors.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractOptions {
    /// Extract the whole playlist rather than the single item
    pub playlist: bool,
    /// Wanted playlist items, e.g. `1,5,6,8-10`
    pub items: Option<String>,
    pub item_start: Option<u32>,
    pub item_end: Option<u32>,
    /// Concurrency hint for playlist extraction
    pub thread_number: Option<usize>,
    pub cookie: Option<String>,
    /// Name episode files without the playlist title
    pub episode_title_only: bool,
    /// Per-site credentials and codes, keyed by name
    pub tokens: HashMap<String, String>,
}

#[async_trait]
pub trait Extractor: Send + Sync {
    /// Short name shown in logs and `info` output.
    fn name(&self) -> &str;

    async fn extract(
        &self,
        url: &str,
        options: &ExtractOptions,
    ) -> Result<Vec<MediaItem>, ExtractorError>;
}
