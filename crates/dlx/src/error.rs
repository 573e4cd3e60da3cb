use std::path::{Path, PathBuf};

use reqwest::StatusCode;

#[derive(Debug, thiserror::Error)]
pub enum DownloadError {
    #[error("extraction failed for {url}: {reason}")]
    Extraction { url: String, reason: String },

    #[error("no streams in title: {title}")]
    NoStreams { title: String },

    #[error("no stream named `{id}` in title: {title}")]
    NoSuchStream { id: String, title: String },

    #[error("invalid URL `{input}`: {reason}")]
    InvalidUrl { input: String, reason: String },

    #[error("invalid header `{name}`: {reason}")]
    InvalidHeader { name: String, reason: String },

    #[error("proxy configuration error: {reason}")]
    ProxyConfiguration { reason: String },

    #[error("configuration error: {reason}")]
    Configuration { reason: String },

    #[error("request error for {url} after {attempts} attempt(s): {source}")]
    Network {
        url: String,
        attempts: u32,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} request error: HTTP {status} after {attempts} attempt(s)")]
    HttpStatus {
        url: String,
        status: StatusCode,
        attempts: u32,
    },

    #[error("file copy error for {url}: {source}")]
    BodyRead {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Content-Length is not present for {url}")]
    MissingContentLength { url: String },

    #[error("failed to decode `{encoding}` body: {source}")]
    Decode {
        encoding: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error while {op} {}: {source}", path.display())]
    Io {
        op: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to download {} after {attempts} attempt(s): {source}", path.display())]
    PartDownload {
        path: PathBuf,
        attempts: u32,
        #[source]
        source: Box<DownloadError>,
    },

    #[error("merge tool `{program}` not found")]
    MergeToolMissing { program: String },

    #[error("{program} error ({status}), stdout: {stdout}, stderr: {stderr}")]
    MergeTool {
        program: String,
        status: String,
        stdout: String,
        stderr: String,
    },

    #[error("internal error: {reason}")]
    Internal { reason: String },
}

impl DownloadError {
    pub fn invalid_url(input: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidUrl {
            input: input.into(),
            reason: reason.into(),
        }
    }

    pub fn invalid_header(name: impl Into<String>, reason: impl ToString) -> Self {
        Self::InvalidHeader {
            name: name.into(),
            reason: reason.to_string(),
        }
    }

    pub fn proxy_configuration(reason: impl Into<String>) -> Self {
        Self::ProxyConfiguration {
            reason: reason.into(),
        }
    }

    pub fn configuration(reason: impl Into<String>) -> Self {
        Self::Configuration {
            reason: reason.into(),
        }
    }

    /// Attach the operation and path to an I/O error.
    pub fn io(op: &'static str, path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            op,
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    pub fn internal(reason: impl Into<String>) -> Self {
        Self::Internal {
            reason: reason.into(),
        }
    }

    /// Structural errors are reported as-is and never retried.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            Self::Extraction { .. }
                | Self::NoStreams { .. }
                | Self::NoSuchStream { .. }
                | Self::InvalidUrl { .. }
                | Self::InvalidHeader { .. }
                | Self::ProxyConfiguration { .. }
                | Self::Configuration { .. }
        )
    }
}

pub type Result<T, E = DownloadError> = std::result::Result<T, E>;
