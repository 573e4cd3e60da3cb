//! # Transport
//!
//! A thin layer over `reqwest` that applies the configured header policy to
//! every request and retries the whole request on failure.
//!
//! Header precedence, lowest to highest:
//! 1. the default header set from [`DownloaderConfig`]
//! 2. per-request headers supplied by the caller
//! 3. `Referer: <target url>` when the caller did not supply one
//! 4. the configured cookie, user agent and referer overrides
//!
//! Automatic body decompression is disabled on the client so that ranged
//! part downloads land on disk byte-for-byte; [`Transport::get_bytes`]
//! decodes `gzip`/`deflate` bodies explicitly instead.

use std::fmt;
use std::io::Read;
use std::sync::OnceLock;

use bytes::Bytes;
use flate2::read::{DeflateDecoder, GzDecoder, ZlibDecoder};
use reqwest::header::{
    CONTENT_ENCODING, CONTENT_LENGTH, CONTENT_TYPE, COOKIE, HeaderMap, HeaderValue, REFERER,
    USER_AGENT,
};
use reqwest::{Client, Method, Response, StatusCode};
use tracing::{debug, info, warn};
use url::Url;

use crate::config::DownloaderConfig;
use crate::cookies::cookie_header_value;
use crate::proxy::build_proxy;
use crate::retry::retry_fixed;
use crate::{DownloadError, Result};

/// Install the process-wide rustls crypto provider once.
pub fn install_rustls_provider() {
    static PROVIDER_INSTALLED: OnceLock<()> = OnceLock::new();
    PROVIDER_INSTALLED.get_or_init(|| {
        if let Err(e) = rustls::crypto::aws_lc_rs::default_provider().install_default() {
            // Another crate got there first.
            debug!(existing_provider = ?e, "rustls CryptoProvider already installed");
        }
    });
}

/// Why a single attempt failed.
enum AttemptFailure {
    Network(reqwest::Error),
    Status(StatusCode),
}

impl fmt::Display for AttemptFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Network(e) => write!(f, "network error: {e}"),
            Self::Status(status) => write!(f, "HTTP {status}"),
        }
    }
}

/// Shared HTTP client with the retry and header policy applied.
#[derive(Debug, Clone)]
pub struct Transport {
    client: Client,
    config: DownloaderConfig,
    cookie: Option<HeaderValue>,
    user_agent: Option<HeaderValue>,
    referer: Option<HeaderValue>,
}

fn header_value(name: &str, value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value).map_err(|e| DownloadError::invalid_header(name, e))
}

impl Transport {
    pub fn new(config: DownloaderConfig) -> Result<Self> {
        install_rustls_provider();

        let mut builder = Client::builder()
            .no_gzip()
            .no_deflate()
            .connect_timeout(config.connect_timeout)
            .danger_accept_invalid_certs(config.danger_accept_invalid_certs);

        if !config.timeout.is_zero() {
            builder = builder.timeout(config.timeout);
        }

        if config.danger_accept_invalid_certs {
            warn!("TLS certificate validation is disabled");
        }

        builder = match (&config.proxy, config.use_system_proxy) {
            (Some(proxy), _) => builder.proxy(build_proxy(proxy)?),
            (None, true) => builder,
            (None, false) => builder.no_proxy(),
        };

        let client = builder
            .build()
            .map_err(|e| DownloadError::configuration(format!("failed to build HTTP client: {e}")))?;

        let cookie = config
            .cookie
            .as_deref()
            .map(|raw| header_value("Cookie", &cookie_header_value(raw)))
            .transpose()?;
        let user_agent = config
            .user_agent
            .as_deref()
            .map(|ua| header_value("User-Agent", ua))
            .transpose()?;
        let referer = config
            .referer
            .as_deref()
            .map(|r| header_value("Referer", r))
            .transpose()?;

        Ok(Self {
            client,
            config,
            cookie,
            user_agent,
            referer,
        })
    }

    pub fn config(&self) -> &DownloaderConfig {
        &self.config
    }

    fn request_headers(&self, url: &Url, headers: &HeaderMap) -> HeaderMap {
        let mut merged = self.config.headers.clone();
        for (name, value) in headers.iter() {
            merged.insert(name.clone(), value.clone());
        }
        if !headers.contains_key(REFERER)
            && let Ok(value) = HeaderValue::from_str(url.as_str())
        {
            merged.insert(REFERER, value);
        }
        if let Some(cookie) = &self.cookie {
            merged.insert(COOKIE, cookie.clone());
        }
        if let Some(user_agent) = &self.user_agent {
            merged.insert(USER_AGENT, user_agent.clone());
        }
        if let Some(referer) = &self.referer {
            merged.insert(REFERER, referer.clone());
        }
        merged
    }

    /// Send one request, retrying the whole exchange on a network error or a
    /// status of 400 and above.
    pub async fn call(
        &self,
        method: Method,
        url: &str,
        body: Option<Bytes>,
        headers: &HeaderMap,
    ) -> Result<Response> {
        let parsed = Url::parse(url).map_err(|e| DownloadError::invalid_url(url, e.to_string()))?;
        let request_headers = self.request_headers(&parsed, headers);
        let policy = self.config.request_retry();

        let outcome = retry_fixed(&policy, |attempt| {
            let mut request = self
                .client
                .request(method.clone(), parsed.clone())
                .headers(request_headers.clone());
            if let Some(body) = &body {
                request = request.body(body.clone());
            }
            debug!(attempt, method = %method, url = %parsed, "Sending request");
            async move {
                match request.send().await {
                    Ok(response) if response.status().as_u16() < 400 => Ok(response),
                    Ok(response) => Err(AttemptFailure::Status(response.status())),
                    Err(e) => Err(AttemptFailure::Network(e)),
                }
            }
        })
        .await;

        match outcome {
            Ok(response) => {
                if self.config.debug {
                    info!(
                        method = %method,
                        url = %url,
                        headers = ?request_headers,
                        status = %response.status(),
                        "HTTP request"
                    );
                }
                Ok(response)
            }
            Err((AttemptFailure::Network(source), attempts)) => Err(DownloadError::Network {
                url: url.to_string(),
                attempts,
                source,
            }),
            Err((AttemptFailure::Status(status), attempts)) => Err(DownloadError::HttpStatus {
                url: url.to_string(),
                status,
                attempts,
            }),
        }
    }

    /// GET `url`, sending `referer` as the `Referer` header when given.
    pub async fn get(
        &self,
        url: &str,
        referer: Option<&str>,
        headers: &HeaderMap,
    ) -> Result<Response> {
        let mut headers = headers.clone();
        if let Some(referer) = referer.filter(|r| !r.is_empty()) {
            headers.insert(REFERER, header_value("Referer", referer)?);
        }
        self.call(Method::GET, url, None, &headers).await
    }

    /// GET `url` and return the body, decoded according to `Content-Encoding`.
    pub async fn get_bytes(
        &self,
        url: &str,
        referer: Option<&str>,
        headers: &HeaderMap,
    ) -> Result<Bytes> {
        let response = self.get(url, referer, headers).await?;
        let encoding = response
            .headers()
            .get(CONTENT_ENCODING)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.trim().to_ascii_lowercase());
        let body = response.bytes().await.map_err(|source| DownloadError::BodyRead {
            url: url.to_string(),
            source,
        })?;
        decode_body(encoding.as_deref(), body)
    }

    pub async fn get_text(
        &self,
        url: &str,
        referer: Option<&str>,
        headers: &HeaderMap,
    ) -> Result<String> {
        let body = self.get_bytes(url, referer, headers).await?;
        Ok(String::from_utf8_lossy(&body).into_owned())
    }

    /// Response headers of a GET to `url`. The body is discarded unread.
    pub async fn headers(&self, url: &str, referer: Option<&str>) -> Result<HeaderMap> {
        let response = self.get(url, referer, &HeaderMap::new()).await?;
        Ok(response.headers().clone())
    }

    /// Size announced by `Content-Length`. A missing header is an error.
    pub async fn size(&self, url: &str, referer: Option<&str>) -> Result<u64> {
        let headers = self.headers(url, referer).await?;
        content_length(&headers).ok_or_else(|| DownloadError::MissingContentLength {
            url: url.to_string(),
        })
    }

    /// Media type from `Content-Type`, without parameters.
    pub async fn content_type(&self, url: &str, referer: Option<&str>) -> Result<String> {
        let headers = self.headers(url, referer).await?;
        Ok(media_type(&headers))
    }
}

pub(crate) fn content_length(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok())
}

pub(crate) fn media_type(headers: &HeaderMap) -> String {
    headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .map(|v| v.trim().to_ascii_lowercase())
        .unwrap_or_default()
}

/// Decode a body according to its `Content-Encoding`.
///
/// `deflate` is tried as zlib-wrapped first and falls back to raw deflate,
/// since servers disagree on which one the token means.
pub fn decode_body(encoding: Option<&str>, body: Bytes) -> Result<Bytes> {
    match encoding {
        Some("gzip") | Some("x-gzip") => read_all(GzDecoder::new(&body[..]), "gzip"),
        Some("deflate") => read_all(ZlibDecoder::new(&body[..]), "deflate")
            .or_else(|_| read_all(DeflateDecoder::new(&body[..]), "deflate")),
        _ => Ok(body),
    }
}

fn read_all(mut reader: impl Read, encoding: &'static str) -> Result<Bytes> {
    let mut out = Vec::new();
    reader
        .read_to_end(&mut out)
        .map_err(|source| DownloadError::Decode { encoding, source })?;
    Ok(Bytes::from(out))
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::Compression;
    use flate2::write::{DeflateEncoder, GzEncoder, ZlibEncoder};
    use std::io::Write;

    const TEXT: &[u8] = b"<html><h1 title=\"dlx\">dlx</h1></html>";

    #[test]
    fn decodes_gzip() {
        let mut enc = GzEncoder::new(Vec::new(), Compression::default());
        enc.write_all(TEXT).unwrap();
        let body = Bytes::from(enc.finish().unwrap());
        assert_eq!(decode_body(Some("gzip"), body).unwrap(), TEXT);
    }

    #[test]
    fn decodes_zlib_and_raw_deflate() {
        let mut zlib = ZlibEncoder::new(Vec::new(), Compression::default());
        zlib.write_all(TEXT).unwrap();
        let body = Bytes::from(zlib.finish().unwrap());
        assert_eq!(decode_body(Some("deflate"), body).unwrap(), TEXT);

        let mut raw = DeflateEncoder::new(Vec::new(), Compression::default());
        raw.write_all(TEXT).unwrap();
        let body = Bytes::from(raw.finish().unwrap());
        assert_eq!(decode_body(Some("deflate"), body).unwrap(), TEXT);
    }

    #[test]
    fn identity_passes_through() {
        let body = Bytes::from_static(TEXT);
        assert_eq!(decode_body(None, body.clone()).unwrap(), body);
        assert_eq!(decode_body(Some("br"), body.clone()).unwrap(), body);
    }

    #[test]
    fn corrupt_gzip_is_a_decode_error() {
        let err = decode_body(Some("gzip"), Bytes::from_static(b"not gzip")).unwrap_err();
        assert!(matches!(err, DownloadError::Decode { encoding: "gzip", .. }));
    }

    #[test]
    fn media_type_strips_parameters() {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("Video/MP4; charset=binary"));
        assert_eq!(media_type(&headers), "video/mp4");
    }

    #[test]
    fn request_headers_apply_overrides_last() {
        let config = DownloaderConfig::builder()
            .cookie("a=1")
            .user_agent("dlx-test")
            .build();
        let transport = Transport::new(config).unwrap();
        let url = Url::parse("https://example.com/v/1").unwrap();

        let mut per_request = HeaderMap::new();
        per_request.insert(USER_AGENT, HeaderValue::from_static("caller"));
        let headers = transport.request_headers(&url, &per_request);

        assert_eq!(headers.get(REFERER).unwrap(), "https://example.com/v/1");
        assert_eq!(headers.get(COOKIE).unwrap(), "a=1");
        assert_eq!(headers.get(USER_AGENT).unwrap(), "dlx-test");
    }

    #[test]
    fn explicit_referer_is_kept() {
        let transport = Transport::new(DownloaderConfig::default()).unwrap();
        let url = Url::parse("https://cdn.example.com/seg.ts").unwrap();
        let mut per_request = HeaderMap::new();
        per_request.insert(REFERER, HeaderValue::from_static("https://example.com/v/1"));
        let headers = transport.request_headers(&url, &per_request);
        assert_eq!(headers.get(REFERER).unwrap(), "https://example.com/v/1");
    }
}
