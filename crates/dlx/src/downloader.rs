//! # Download orchestration
//!
//! [`Downloader::download`] turns one [`Media`] into files on disk:
//!
//! 1. select the stream (typed errors, no network traffic on failure)
//! 2. fetch the parts: a single part inline, several parts as one task each
//! 3. merge video parts into `<title>.<ext>`; audio and image parts stay as
//!    separate files
//!
//! Part tasks are never cancelled. Once any task has failed no further
//! tasks are launched, but the ones already running finish before the first
//! recorded error is returned.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::config::DownloadOptions;
use crate::fetcher::PartFetcher;
use crate::filename::{OutputLayout, with_ext};
use crate::media::{Media, MediaItem, MediaType, Stream};
use crate::merger::{MergeStrategy, Merger};
use crate::progress::ProgressSink;
use crate::selector::select_stream;
use crate::transport::Transport;
use crate::{DownloadError, Result};

/// What a successful download left on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadOutcome {
    /// Single-part stream, written straight to `<title>.<ext>`
    Single(PathBuf),
    /// Parts merged into one file
    Merged(PathBuf),
    /// Non-video parts, left unmerged in playback order
    Parts(Vec<PathBuf>),
}

impl DownloadOutcome {
    pub fn paths(&self) -> Vec<&Path> {
        match self {
            Self::Single(path) | Self::Merged(path) => vec![path.as_path()],
            Self::Parts(paths) => paths.iter().map(PathBuf::as_path).collect(),
        }
    }
}

pub struct Downloader {
    transport: Arc<Transport>,
    progress: Arc<dyn ProgressSink>,
    options: DownloadOptions,
    merger: Merger,
}

impl Downloader {
    pub fn new(
        transport: Arc<Transport>,
        progress: Arc<dyn ProgressSink>,
        options: DownloadOptions,
    ) -> Self {
        let merger = Merger::new(options.merge_tool.clone());
        Self {
            transport,
            progress,
            options,
            merger,
        }
    }

    pub fn options(&self) -> &DownloadOptions {
        &self.options
    }

    /// Download an extractor result. Failed items are reported without any
    /// network traffic.
    pub async fn download_item(&self, item: &MediaItem) -> Result<DownloadOutcome> {
        match item {
            MediaItem::Ready(media) => self.download(media).await,
            MediaItem::Failed(failure) => Err(DownloadError::Extraction {
                url: failure.url.clone(),
                reason: failure.reason.clone(),
            }),
        }
    }

    pub async fn download(&self, media: &Media) -> Result<DownloadOutcome> {
        let stream = select_stream(&media.title, &media.streams, self.options.stream.as_deref())?;
        if stream.parts.is_empty() {
            return Err(DownloadError::Extraction {
                url: media.url.clone(),
                reason: format!("stream `{}` has no parts", stream.id),
            });
        }

        if !media.captions.is_empty() {
            debug!(
                count = media.captions.len(),
                "Caption download is not supported, skipping captions"
            );
        }

        let title = self.options.output_name.as_deref().unwrap_or(&media.title);
        let layout = OutputLayout::new(&self.options.output_dir, title);
        tokio::fs::create_dir_all(layout.dir())
            .await
            .map_err(|e| DownloadError::io("creating", layout.dir(), e))?;

        let merged_path = layout.merged(&stream.ext);
        if tokio::fs::try_exists(&merged_path).await.unwrap_or(false) {
            info!(
                path = %merged_path.display(),
                "Output already exists, checking parts again"
            );
        }

        info!(
            title = %media.title,
            stream = %stream.id,
            quality = %stream.quality,
            size = stream.size,
            parts = stream.parts.len(),
            "Starting download"
        );
        self.progress.start(stream.size);

        let fetcher = PartFetcher::new(
            Arc::clone(&self.transport),
            Arc::clone(&self.progress),
            self.options.part_retry,
        );

        if let [part] = stream.parts.as_slice() {
            let path = fetcher
                .fetch(part, &media.url, &layout.base_path())
                .await?;
            self.progress.finish();
            return Ok(DownloadOutcome::Single(path));
        }

        let parts = self.fetch_parts(&fetcher, media, stream, &layout).await?;

        if media.media_type != MediaType::Video {
            debug!(media_type = %media.media_type, "Leaving parts unmerged");
            return Ok(DownloadOutcome::Parts(parts));
        }

        self.merger
            .merge(
                MergeStrategy::for_stream(stream),
                &parts,
                &merged_path,
                &layout.concat_list(),
            )
            .await?;
        info!(path = %merged_path.display(), "Download complete");
        Ok(DownloadOutcome::Merged(merged_path))
    }

    /// Fetch every part of a multi-part stream concurrently and return the
    /// part paths in playback order.
    async fn fetch_parts(
        &self,
        fetcher: &PartFetcher,
        media: &Media,
        stream: &Stream,
        layout: &OutputLayout,
    ) -> Result<Vec<PathBuf>> {
        let errors: Arc<Mutex<Vec<DownloadError>>> = Arc::default();
        let mut tasks = JoinSet::new();
        let mut paths = Vec::with_capacity(stream.parts.len());

        for (index, part) in stream.parts.iter().enumerate() {
            let base = layout.part_base(index);
            paths.push(with_ext(&base, &part.ext));

            if !errors.lock().is_empty() {
                warn!(
                    launched = index,
                    total = stream.parts.len(),
                    "A part failed, not launching the remaining parts"
                );
                break;
            }

            let fetcher = fetcher.clone();
            let part = part.clone();
            let referer = media.url.clone();
            let errors = Arc::clone(&errors);
            tasks.spawn(async move {
                if let Err(e) = fetcher.fetch(&part, &referer, &base).await {
                    warn!(index, error = %e, "Part failed");
                    errors.lock().push(e);
                }
            });
        }

        // Join barrier: in-flight parts always run to completion.
        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                errors
                    .lock()
                    .push(DownloadError::internal(format!("part task failed: {e}")));
            }
        }
        self.progress.finish();

        let errors = std::mem::take(&mut *errors.lock());
        if errors.len() > 1 {
            debug!(count = errors.len(), "Several parts failed, reporting the first");
        }
        match errors.into_iter().next() {
            Some(first) => Err(first),
            None => Ok(paths),
        }
    }
}
