use std::path::PathBuf;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue};

use crate::proxy::ProxyConfig;
use crate::retry::RetryPolicy;

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/142.0.0.0 Safari/537.36";

/// Program used to merge parts when none is configured.
pub const DEFAULT_MERGE_TOOL: &str = "ffmpeg";

/// HTTP transport options
#[derive(Debug, Clone)]
pub struct DownloaderConfig {
    /// Attempts per request (including the first) before giving up
    pub retry_times: u32,

    /// Pause between request attempts
    pub retry_delay: Duration,

    /// Overall timeout for a single request, body included
    pub timeout: Duration,

    /// Time allowed to establish the connection (TLS handshake included)
    pub connect_timeout: Duration,

    /// Raw cookie string, either a `Cookie` header value or Netscape cookie-file text
    pub cookie: Option<String>,

    /// Replaces the `User-Agent` of the default header set
    pub user_agent: Option<String>,

    /// Forces `Referer` on every request, overriding per-request values
    pub referer: Option<String>,

    /// Headers sent with every request; per-request headers take precedence
    pub headers: HeaderMap,

    /// Log method, URL, headers and status of every request
    pub debug: bool,

    /// Skip TLS certificate validation. Off unless explicitly requested.
    pub danger_accept_invalid_certs: bool,

    /// Proxy configuration (optional)
    pub proxy: Option<ProxyConfig>,

    /// Whether to use system proxy settings if available
    pub use_system_proxy: bool,
}

impl Default for DownloaderConfig {
    fn default() -> Self {
        Self {
            retry_times: 1,
            retry_delay: Duration::from_secs(1),
            timeout: Duration::from_secs(15 * 60),
            connect_timeout: Duration::from_secs(10),
            cookie: None,
            user_agent: None,
            referer: None,
            headers: DownloaderConfig::get_default_headers(),
            debug: false,
            danger_accept_invalid_certs: false,
            proxy: None,
            use_system_proxy: true,
        }
    }
}

impl DownloaderConfig {
    pub fn builder() -> crate::builder::DownloaderConfigBuilder {
        crate::builder::DownloaderConfigBuilder::new()
    }

    /// Merge `extra` over the default header set. Entries in `extra` win.
    pub fn merged_headers(extra: &HeaderMap) -> HeaderMap {
        let mut headers = DownloaderConfig::get_default_headers();
        for (name, value) in extra.iter() {
            headers.insert(name.clone(), value.clone());
        }
        headers
    }

    /// Retry policy for whole requests.
    pub fn request_retry(&self) -> RetryPolicy {
        RetryPolicy::new(self.retry_times, self.retry_delay)
    }

    pub fn get_default_headers() -> HeaderMap {
        let mut default_headers = HeaderMap::new();

        default_headers.insert(
            reqwest::header::ACCEPT,
            HeaderValue::from_static(
                "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
            ),
        );

        default_headers.insert(
            reqwest::header::ACCEPT_CHARSET,
            HeaderValue::from_static("UTF-8,*;q=0.5"),
        );

        default_headers.insert(
            reqwest::header::ACCEPT_ENCODING,
            HeaderValue::from_static("gzip,deflate"),
        );

        default_headers.insert(
            reqwest::header::ACCEPT_LANGUAGE,
            HeaderValue::from_static("en-US,en;q=0.8"),
        );

        default_headers.insert(
            reqwest::header::USER_AGENT,
            HeaderValue::from_static(DEFAULT_USER_AGENT),
        );
        default_headers
    }
}

/// Where and how a media item is written to disk.
#[derive(Debug, Clone)]
pub struct DownloadOptions {
    /// Directory receiving parts, temp files and the merged output
    pub output_dir: PathBuf,

    /// Replaces the media title in every derived file name
    pub output_name: Option<String>,

    /// Stream id to download instead of the largest one
    pub stream: Option<String>,

    /// Attempts and delay for a single part's body copy
    pub part_retry: RetryPolicy,

    /// External merge tool
    pub merge_tool: PathBuf,
}

impl Default for DownloadOptions {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
            output_name: None,
            stream: None,
            part_retry: RetryPolicy::part_default(),
            merge_tool: PathBuf::from(DEFAULT_MERGE_TOOL),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::{ACCEPT, USER_AGENT};

    #[test]
    fn custom_headers_override_defaults() {
        let mut extra = HeaderMap::new();
        extra.insert(USER_AGENT, HeaderValue::from_static("dlx-test"));
        let merged = DownloaderConfig::merged_headers(&extra);
        assert_eq!(merged.get(USER_AGENT).unwrap(), "dlx-test");
        assert!(merged.contains_key(ACCEPT));
    }

    #[test]
    fn certificate_validation_is_on_by_default() {
        assert!(!DownloaderConfig::default().danger_accept_invalid_certs);
    }
}
