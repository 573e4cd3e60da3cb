use reqwest::Proxy;

use crate::DownloadError;

/// Proxy protocol.
#[derive(Debug, Clone, PartialEq, Eq, Copy)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
pub enum ProxyType {
    Http,
    Https,
    Socks5,
}

#[derive(Debug, Clone)]
pub struct ProxyAuth {
    pub username: String,
    pub password: String,
}

/// Explicit proxy. When absent the transport falls back to the system/env
/// proxy, or to no proxy at all if `use_system_proxy` is off.
#[derive(Debug, Clone)]
pub struct ProxyConfig {
    /// Proxy server URL (e.g., "http://proxy.example.com:8080")
    pub url: String,
    pub proxy_type: ProxyType,
    pub auth: Option<ProxyAuth>,
}

impl ProxyConfig {
    pub fn new(url: impl Into<String>, proxy_type: ProxyType) -> Self {
        Self {
            url: url.into(),
            proxy_type,
            auth: None,
        }
    }

    pub fn with_auth(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.auth = Some(ProxyAuth {
            username: username.into(),
            password: password.into(),
        });
        self
    }
}

/// Normalize a SOCKS5 address so reqwest recognises the scheme.
fn socks5_url(url: &str) -> String {
    if url.starts_with("socks5://") || url.starts_with("socks5h://") {
        url.to_string()
    } else {
        format!("socks5://{url}")
    }
}

pub(crate) fn build_proxy(config: &ProxyConfig) -> Result<Proxy, DownloadError> {
    let url = &config.url;
    let mut proxy = match config.proxy_type {
        ProxyType::Http => Proxy::http(url)
            .map_err(|e| DownloadError::proxy_configuration(format!("invalid HTTP proxy URL: {e}")))?,
        ProxyType::Https => Proxy::https(url).map_err(|e| {
            DownloadError::proxy_configuration(format!("invalid HTTPS proxy URL: {e}"))
        })?,
        ProxyType::Socks5 => Proxy::all(socks5_url(url)).map_err(|e| {
            DownloadError::proxy_configuration(format!("invalid SOCKS5 proxy URL: {e}"))
        })?,
    };

    if let Some(auth) = &config.auth {
        proxy = proxy.basic_auth(&auth.username, &auth.password);
    }

    Ok(proxy)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn socks5_scheme_is_added_once() {
        assert_eq!(socks5_url("127.0.0.1:1080"), "socks5://127.0.0.1:1080");
        assert_eq!(socks5_url("socks5h://host:1080"), "socks5h://host:1080");
    }

    #[test]
    fn builds_authenticated_http_proxy() {
        let config = ProxyConfig::new("http://127.0.0.1:8080", ProxyType::Http)
            .with_auth("user", "secret");
        assert!(build_proxy(&config).is_ok());
    }

    #[test]
    fn rejects_garbage_url() {
        let config = ProxyConfig::new("http://[::1", ProxyType::Https);
        assert!(matches!(
            build_proxy(&config),
            Err(DownloadError::ProxyConfiguration { .. })
        ));
    }
}
