//! # Part fetcher
//!
//! Downloads one [`Part`] to `<dest>.<ext>`, resuming from an earlier
//! `<dest>.<ext>.download` when one is present.
//!
//! - A final file whose size equals the declared part size is taken as done:
//!   progress is advanced by its size and no request is made.
//! - A non-empty temp file is appended to, with `Range: bytes=<len>-`.
//! - Copy failures are retried per [`RetryPolicy`]. Each retry asks for the
//!   range after everything written so far, across all attempts.
//! - The temp file is renamed only after a complete copy; on final failure it
//!   stays behind for the next run to resume.
//! - Progress is credited up to the furthest offset reached, so a restart
//!   from zero after an ignored `Range` does not count bytes twice.

use std::io::SeekFrom;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::StreamExt;
use reqwest::StatusCode;
use reqwest::header::{ACCEPT_ENCODING, HeaderMap, HeaderValue, RANGE};
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncSeekExt, AsyncWriteExt};
use tracing::{debug, instrument, warn};

use crate::filename::{temp_path, with_ext};
use crate::media::Part;
use crate::progress::ProgressSink;
use crate::retry::RetryPolicy;
use crate::transport::Transport;
use crate::{DownloadError, Result};

/// Size of the file at `path`, `None` if it does not exist.
pub(crate) async fn file_size(path: &Path) -> Result<Option<u64>> {
    match tokio::fs::metadata(path).await {
        Ok(meta) => Ok(Some(meta.len())),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(DownloadError::io("reading metadata of", path, e)),
    }
}

fn range_header(offset: u64) -> Result<HeaderValue> {
    // Ranges are inclusive and zero-based: `bytes=1024-` skips the first 1024 bytes.
    HeaderValue::from_str(&format!("bytes={offset}-"))
        .map_err(|e| DownloadError::invalid_header("Range", e))
}

/// Downloads single parts to disk. Cheap to clone; clones share the
/// transport and progress sink.
#[derive(Clone)]
pub struct PartFetcher {
    transport: Arc<Transport>,
    progress: Arc<dyn ProgressSink>,
    policy: RetryPolicy,
}

impl PartFetcher {
    pub fn new(
        transport: Arc<Transport>,
        progress: Arc<dyn ProgressSink>,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            transport,
            progress,
            policy,
        }
    }

    /// Fetch `part` into `<dest_base>.<part.ext>` and return that path.
    ///
    /// `referer` is sent as the `Referer` header (normally the page URL of
    /// the media item).
    #[instrument(skip(self, part), level = "debug", fields(url = %part.url))]
    pub async fn fetch(&self, part: &Part, referer: &str, dest_base: &Path) -> Result<PathBuf> {
        let final_path = with_ext(dest_base, &part.ext);

        // Live sources report no size, so they never match here.
        if let Some(size) = file_size(&final_path).await?
            && size == part.size
        {
            debug!(path = %final_path.display(), size, "Part already downloaded");
            self.progress.add(size);
            return Ok(final_path);
        }

        let temp = temp_path(&final_path);
        let temp_size = file_size(&temp).await?.unwrap_or(0);

        if part.size > 0 && temp_size == part.size {
            debug!(path = %temp.display(), "Temp file already complete");
            self.progress.add(temp_size);
            promote(&temp, &final_path).await?;
            return Ok(final_path);
        }

        let mut file = if temp_size > 0 {
            debug!(path = %temp.display(), offset = temp_size, "Resuming part");
            self.progress.add(temp_size);
            OpenOptions::new()
                .append(true)
                .open(&temp)
                .await
                .map_err(|e| DownloadError::io("opening", &temp, e))?
        } else {
            File::create(&temp)
                .await
                .map_err(|e| DownloadError::io("creating", &temp, e))?
        };

        let mut offset = Offset::new(temp_size);
        let mut attempt = 1;
        loop {
            match self
                .copy_once(part, referer, &mut file, &temp, &mut offset)
                .await
            {
                Ok(()) => break,
                Err(err) if !err.is_structural() && self.policy.allows_retry_after(attempt) => {
                    warn!(
                        attempt,
                        max = self.policy.attempts(),
                        offset = offset.written,
                        error = %err,
                        "Part copy failed, retrying"
                    );
                    tokio::time::sleep(self.policy.delay).await;
                    attempt += 1;
                }
                Err(err) => {
                    // Flush whatever made it to the buffer so the next run resumes from it.
                    if let Err(e) = file.flush().await {
                        warn!(
                            path = %temp.display(),
                            offset = offset.written,
                            error = %e,
                            "Failed to flush temp file"
                        );
                    }
                    return Err(DownloadError::PartDownload {
                        path: final_path,
                        attempts: attempt,
                        source: Box::new(err),
                    });
                }
            }
        }

        // Close before renaming; Windows refuses to rename an open file.
        drop(file);

        if part.size > 0 && offset.written != part.size {
            warn!(
                path = %final_path.display(),
                expected = part.size,
                actual = offset.written,
                "Downloaded size differs from declared size"
            );
        }

        promote(&temp, &final_path).await?;
        Ok(final_path)
    }

    /// One request plus body copy. `offset` tracks the temp file length and
    /// is kept up to date even when the copy fails part-way.
    async fn copy_once(
        &self,
        part: &Part,
        referer: &str,
        file: &mut File,
        temp: &Path,
        offset: &mut Offset,
    ) -> Result<()> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT_ENCODING, HeaderValue::from_static("identity"));
        if offset.written > 0 {
            headers.insert(RANGE, range_header(offset.written)?);
        }

        let response = self
            .transport
            .get(&part.url, Some(referer), &headers)
            .await?;

        if offset.written > 0 && response.status() == StatusCode::OK {
            warn!(
                url = %part.url,
                offset = offset.written,
                "Server ignored Range request, restarting part from the beginning"
            );
            file.flush()
                .await
                .map_err(|e| DownloadError::io("flushing", temp, e))?;
            file.set_len(0)
                .await
                .map_err(|e| DownloadError::io("truncating", temp, e))?;
            file.seek(SeekFrom::Start(0))
                .await
                .map_err(|e| DownloadError::io("seeking", temp, e))?;
            offset.written = 0;
        }

        let mut body = response.bytes_stream();
        while let Some(chunk) = body.next().await {
            let chunk = chunk.map_err(|source| DownloadError::BodyRead {
                url: part.url.clone(),
                source,
            })?;
            file.write_all(&chunk)
                .await
                .map_err(|e| DownloadError::io("writing", temp, e))?;
            offset.written += chunk.len() as u64;
            let fresh = offset.take_uncredited();
            if fresh > 0 {
                self.progress.add(fresh);
            }
        }

        file.flush()
            .await
            .map_err(|e| DownloadError::io("flushing", temp, e))?;
        Ok(())
    }
}

/// Temp file length plus the furthest length already reported as progress.
#[derive(Debug, Clone, Copy)]
struct Offset {
    written: u64,
    credited: u64,
}

impl Offset {
    /// `resumed_from` bytes are on disk and already credited.
    fn new(resumed_from: u64) -> Self {
        Self {
            written: resumed_from,
            credited: resumed_from,
        }
    }

    /// Bytes written beyond the credited high-water mark, marking them credited.
    fn take_uncredited(&mut self) -> u64 {
        let fresh = self.written.saturating_sub(self.credited);
        self.credited = self.credited.max(self.written);
        fresh
    }
}

async fn promote(temp: &Path, final_path: &Path) -> Result<()> {
    tokio::fs::rename(temp, final_path)
        .await
        .map_err(|e| DownloadError::io("renaming", temp, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_header_is_open_ended() {
        assert_eq!(range_header(1024).unwrap(), "bytes=1024-");
    }

    #[test]
    fn restarted_offset_credits_only_past_high_water() {
        let mut offset = Offset::new(5000);
        offset.written = 0;
        offset.written += 3000;
        assert_eq!(offset.take_uncredited(), 0);
        offset.written += 4000;
        assert_eq!(offset.take_uncredited(), 2000);
        offset.written += 10;
        assert_eq!(offset.take_uncredited(), 10);
    }

    #[tokio::test]
    async fn missing_file_has_no_size() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(file_size(&dir.path().join("nope")).await.unwrap(), None);
        let path = dir.path().join("some");
        tokio::fs::write(&path, b"12345").await.unwrap();
        assert_eq!(file_size(&path).await.unwrap(), Some(5));
    }
}
