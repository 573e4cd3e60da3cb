//! Media metadata handed over by extractors.
//!
//! A [`Media`] owns one or more [`Stream`]s (quality variants), each made of
//! ordered [`Part`]s. Part order is playback order and is preserved through
//! download and merge.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::DownloadError;

/// Container extension used for merged output when parts arrive as MPEG-TS
/// or FLV.
pub const EXT_MP4: &str = "mp4";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    #[default]
    Video,
    Image,
    Audio,
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Video => "video",
            Self::Image => "image",
            Self::Audio => "audio",
        })
    }
}

/// A single downloadable segment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Part {
    pub url: String,
    /// Declared size in bytes, 0 when unknown (e.g. live sources)
    pub size: u64,
    pub ext: String,
}

impl Part {
    pub fn new(url: impl Into<String>, size: u64, ext: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            size,
            ext: ext.into(),
        }
    }
}

pub type CaptionTransform = Arc<dyn Fn(Bytes) -> Result<Bytes, DownloadError> + Send + Sync>;

/// Subtitle track. Carried through the model; not downloaded yet.
#[derive(Clone, Serialize, Deserialize)]
pub struct CaptionPart {
    #[serde(flatten)]
    pub part: Part,
    #[serde(skip)]
    pub transform: Option<CaptionTransform>,
}

impl fmt::Debug for CaptionPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CaptionPart")
            .field("part", &self.part)
            .field("transform", &self.transform.is_some())
            .finish()
    }
}

/// One quality variant of a media item.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stream {
    pub id: String,
    pub quality: String,
    pub parts: Vec<Part>,
    /// Total size in bytes. Filled from the parts when the extractor left it at 0.
    pub size: u64,
    /// Extension of the merged output
    pub ext: String,
    /// Parts need a full remux rather than a concat-demuxer join
    #[serde(default)]
    pub need_mux: bool,
}

impl Stream {
    pub fn new(parts: Vec<Part>) -> Self {
        Self {
            parts,
            ..Self::default()
        }
    }

    pub fn is_multi_part(&self) -> bool {
        self.parts.len() > 1
    }

    fn fill_up(&mut self, id: &str, media_type: MediaType) {
        self.id = id.to_string();
        if self.quality.is_empty() {
            self.quality = id.to_string();
        }

        if self.ext.is_empty()
            && let Some(first) = self.parts.first()
        {
            self.ext = match media_type {
                MediaType::Video => merged_extension(&first.ext).to_string(),
                _ => first.ext.clone(),
            };
        }

        if self.size == 0 {
            self.size = self.parts.iter().map(|p| p.size).sum();
        }
    }
}

/// Extension of the merged file for parts with extension `part_ext`.
///
/// MPEG-TS and FLV fragments are joined into MP4; everything else keeps its
/// own container.
pub fn merged_extension(part_ext: &str) -> &str {
    match part_ext {
        "ts" | "flv" | "f4v" => EXT_MP4,
        other => other,
    }
}

/// A successfully extracted media item.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Media {
    pub url: String,
    pub site: String,
    pub title: String,
    #[serde(rename = "type")]
    pub media_type: MediaType,
    /// Keyed by stream id
    pub streams: BTreeMap<String, Stream>,
    #[serde(default)]
    pub captions: BTreeMap<String, CaptionPart>,
}

impl Media {
    /// Derive stream ids, qualities, merged extensions and total sizes.
    ///
    /// Runs once, right after extraction. Sizes set by the extractor are kept.
    pub fn fill_up_streams(&mut self) {
        let media_type = self.media_type;
        for (id, stream) in self.streams.iter_mut() {
            stream.fill_up(id, media_type);
        }
    }
}

/// Extraction failure for a single item. The rest of a batch may still be fine.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("extraction failed for {url}: {reason}")]
pub struct ExtractionFailure {
    pub url: String,
    pub reason: String,
}

/// Either a downloadable media item or the reason it could not be extracted.
#[derive(Debug, Clone)]
pub enum MediaItem {
    Ready(Media),
    Failed(ExtractionFailure),
}

impl MediaItem {
    pub fn failed(url: impl Into<String>, reason: impl ToString) -> Self {
        Self::Failed(ExtractionFailure {
            url: url.into(),
            reason: reason.to_string(),
        })
    }

    pub fn as_media(&self) -> Option<&Media> {
        match self {
            Self::Ready(media) => Some(media),
            Self::Failed(_) => None,
        }
    }

    pub fn into_media(self) -> Result<Media, DownloadError> {
        match self {
            Self::Ready(media) => Ok(media),
            Self::Failed(failure) => Err(DownloadError::Extraction {
                url: failure.url,
                reason: failure.reason,
            }),
        }
    }
}

impl From<Media> for MediaItem {
    fn from(media: Media) -> Self {
        Self::Ready(media)
    }
}
