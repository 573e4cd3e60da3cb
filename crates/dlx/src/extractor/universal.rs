use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;
use url::Url;

use super::{ExtractOptions, Extractor, ExtractorError};
use crate::media::{Media, MediaItem, MediaType, Part, Stream};
use crate::transport::{Transport, content_length, media_type};

/// Treats the URL itself as the media file.
pub struct UniversalExtractor {
    transport: Arc<Transport>,
}

impl UniversalExtractor {
    pub const NAME: &'static str = "Universal";

    pub fn new(transport: Arc<Transport>) -> Self {
        Self { transport }
    }
}

#[async_trait]
impl Extractor for UniversalExtractor {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn extract(
        &self,
        url: &str,
        _options: &ExtractOptions,
    ) -> Result<Vec<MediaItem>, ExtractorError> {
        let parsed = Url::parse(url).map_err(|e| ExtractorError::InvalidUrl(format!("{url}: {e}")))?;
        let headers = self.transport.headers(url, None).await?;

        let content_type = media_type(&headers);
        // Live and chunked responses announce no length.
        let size = content_length(&headers).unwrap_or(0);
        let (stem, path_ext) = split_last_segment(&parsed);
        let ext = extension_for(&content_type)
            .map(str::to_string)
            .or(path_ext)
            .unwrap_or_default();
        debug!(url, content_type = %content_type, size, ext = %ext, "Probed direct URL");

        let mut media = Media {
            url: url.to_string(),
            site: Self::NAME.to_string(),
            title: stem
                .or_else(|| parsed.host_str().map(str::to_string))
                .unwrap_or_else(|| "download".to_string()),
            media_type: media_kind(&content_type),
            ..Media::default()
        };
        media
            .streams
            .insert("default".to_string(), Stream::new(vec![Part::new(url, size, ext)]));
        Ok(vec![media.into()])
    }
}

/// `(stem, extension)` of the last non-empty path segment.
fn split_last_segment(url: &Url) -> (Option<String>, Option<String>) {
    let Some(segment) = url
        .path_segments()
        .and_then(|mut segments| segments.rfind(|s| !s.is_empty()))
    else {
        return (None, None);
    };
    let segment = percent_decode(segment);
    match segment.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => {
            (Some(stem.to_string()), Some(ext.to_ascii_lowercase()))
        }
        _ => (Some(segment), None),
    }
}

fn percent_decode(segment: &str) -> String {
    match urlencoding::decode(segment) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => {
            String::from_utf8_lossy(&urlencoding::decode_binary(segment.as_bytes())).into_owned()
        }
    }
}

fn extension_for(content_type: &str) -> Option<&'static str> {
    Some(match content_type {
        "video/mp4" => "mp4",
        "video/webm" => "webm",
        "video/x-flv" => "flv",
        "video/mp2t" => "ts",
        "video/quicktime" => "mov",
        "video/x-matroska" => "mkv",
        "audio/mpeg" => "mp3",
        "audio/mp4" | "audio/x-m4a" => "m4a",
        "audio/aac" => "aac",
        "audio/ogg" => "ogg",
        "audio/wav" | "audio/x-wav" => "wav",
        "image/jpeg" => "jpg",
        "image/png" => "png",
        "image/gif" => "gif",
        "image/webp" => "webp",
        _ => return None,
    })
}

fn media_kind(content_type: &str) -> MediaType {
    match content_type.split('/').next() {
        Some("audio") => MediaType::Audio,
        Some("image") => MediaType::Image,
        _ => MediaType::Video,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn split(url: &str) -> (Option<String>, Option<String>) {
        split_last_segment(&Url::parse(url).unwrap())
    }

    #[test]
    fn title_and_extension_from_path() {
        assert_eq!(
            split("https://cdn.example.com/videos/clip.one.MP4?sig=1"),
            (Some("clip.one".to_string()), Some("mp4".to_string()))
        );
        assert_eq!(
            split("https://cdn.example.com/videos/stream/"),
            (Some("stream".to_string()), None)
        );
        assert_eq!(split("https://cdn.example.com/"), (None, None));
    }

    #[test]
    fn percent_encoded_segments_are_decoded() {
        assert_eq!(
            split("https://cdn.example.com/my%20clip.webm").0.as_deref(),
            Some("my clip")
        );
        assert_eq!(
            split("https://cdn.example.com/a+b%26c.mp4").0.as_deref(),
            Some("a+b&c")
        );
        // Invalid UTF-8 is replaced rather than dropped.
        assert_eq!(
            split("https://cdn.example.com/bad%FFname.mp4").0.as_deref(),
            Some("bad\u{FFFD}name")
        );
    }

    #[test]
    fn content_type_decides_kind_and_extension() {
        assert_eq!(media_kind("audio/mpeg"), MediaType::Audio);
        assert_eq!(media_kind("image/png"), MediaType::Image);
        assert_eq!(media_kind("application/octet-stream"), MediaType::Video);
        assert_eq!(extension_for("video/mp2t"), Some("ts"));
        assert_eq!(extension_for("application/octet-stream"), None);
    }
}
