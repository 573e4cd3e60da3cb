//! Fluent construction of [`DownloaderConfig`].

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};

use crate::config::DownloaderConfig;
use crate::proxy::ProxyConfig;
use crate::DownloadError;

#[derive(Debug, Clone, Default)]
pub struct DownloaderConfigBuilder {
    config: DownloaderConfig,
    extra_headers: HeaderMap,
}

impl DownloaderConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn retry_times(mut self, retry_times: u32) -> Self {
        self.config.retry_times = retry_times;
        self
    }

    pub fn retry_delay(mut self, delay: Duration) -> Self {
        self.config.retry_delay = delay;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = timeout;
        self
    }

    pub fn cookie(mut self, cookie: impl Into<String>) -> Self {
        let cookie = cookie.into();
        self.config.cookie = (!cookie.trim().is_empty()).then_some(cookie);
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        let user_agent = user_agent.into();
        self.config.user_agent = (!user_agent.is_empty()).then_some(user_agent);
        self
    }

    pub fn referer(mut self, referer: impl Into<String>) -> Self {
        let referer = referer.into();
        self.config.referer = (!referer.is_empty()).then_some(referer);
        self
    }

    /// Add a header sent with every request.
    pub fn header(mut self, name: &str, value: &str) -> Result<Self, DownloadError> {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| DownloadError::invalid_header(name, e))?;
        let value =
            HeaderValue::from_str(value).map_err(|e| DownloadError::invalid_header(name.as_str(), e))?;
        self.extra_headers.insert(name, value);
        Ok(self)
    }

    pub fn debug(mut self, debug: bool) -> Self {
        self.config.debug = debug;
        self
    }

    /// Disable TLS certificate validation.
    pub fn danger_accept_invalid_certs(mut self, accept: bool) -> Self {
        self.config.danger_accept_invalid_certs = accept;
        self
    }

    pub fn proxy(mut self, proxy: ProxyConfig) -> Self {
        self.config.proxy = Some(proxy);
        self
    }

    pub fn use_system_proxy(mut self, use_system_proxy: bool) -> Self {
        self.config.use_system_proxy = use_system_proxy;
        self
    }

    pub fn build(self) -> DownloaderConfig {
        DownloaderConfig {
            headers: DownloaderConfig::merged_headers(&self.extra_headers),
            ..self.config
        }
    }
}
