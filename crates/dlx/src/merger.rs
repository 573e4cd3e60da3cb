//! # Merger
//!
//! Joins downloaded parts into one file by running an external remuxer
//! (ffmpeg-compatible command line). Streams are only ever copied, never
//! re-encoded.
//!
//! Two strategies:
//!
//! - [`MergeStrategy::ConcatDemuxer`] for MP4 output that needs no remux: a
//!   list file enumerates the parts and the tool's concat demuxer reads it.
//!   The `aac_adtstoasc` bitstream filter rewrites ADTS AAC framing (as
//!   found in MPEG-TS) into the form MP4 expects.
//! - [`MergeStrategy::MultiInput`] for everything else: every part is a
//!   separate `-i` input, with video and audio copied.
//!
//! The parts (and list file) are removed only after the tool exits with 0.

use std::ffi::OsString;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::media::{EXT_MP4, Stream};
use crate::{DownloadError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeStrategy {
    ConcatDemuxer,
    MultiInput,
}

impl MergeStrategy {
    pub fn for_stream(stream: &Stream) -> Self {
        if stream.ext == EXT_MP4 && !stream.need_mux {
            Self::ConcatDemuxer
        } else {
            Self::MultiInput
        }
    }
}

/// Quote `path` for a concat demuxer `file` directive.
fn quote_concat_path(path: &Path) -> String {
    format!("'{}'", path.to_string_lossy().replace('\'', r"'\''"))
}

/// Contents of the concat list for `parts`, one `file '...'` line each.
///
/// Paths are written absolute: the demuxer resolves relative entries against
/// the list file's directory, not the working directory.
pub fn concat_list_contents(parts: &[PathBuf]) -> String {
    parts
        .iter()
        .map(|p| {
            let absolute = std::path::absolute(p).unwrap_or_else(|_| p.clone());
            format!("file {}\n", quote_concat_path(&absolute))
        })
        .collect()
}

fn os_args<const N: usize>(args: [&str; N]) -> impl Iterator<Item = OsString> {
    args.into_iter().map(OsString::from)
}

pub fn concat_demuxer_args(list_file: &Path, output: &Path) -> Vec<OsString> {
    let mut args: Vec<OsString> = os_args(["-y", "-f", "concat", "-safe", "0", "-i"]).collect();
    args.push(list_file.as_os_str().to_owned());
    args.extend(os_args(["-c", "copy", "-bsf:a", "aac_adtstoasc"]));
    args.push(output.as_os_str().to_owned());
    args
}

pub fn multi_input_args(parts: &[PathBuf], output: &Path) -> Vec<OsString> {
    let mut args = vec![OsString::from("-y")];
    for part in parts {
        args.push(OsString::from("-i"));
        args.push(part.as_os_str().to_owned());
    }
    args.extend(os_args(["-c:v", "copy", "-c:a", "copy"]));
    args.push(output.as_os_str().to_owned());
    args
}

/// Runs the external remuxer.
#[derive(Debug, Clone)]
pub struct Merger {
    program: PathBuf,
}

impl Merger {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Merge `parts` (in order) into `output`.
    ///
    /// `list_file` is where the concat list is written when the demuxer
    /// strategy is used; it is ignored otherwise.
    pub async fn merge(
        &self,
        strategy: MergeStrategy,
        parts: &[PathBuf],
        output: &Path,
        list_file: &Path,
    ) -> Result<()> {
        info!(output = %output.display(), parts = parts.len(), ?strategy, "Merging parts");

        match strategy {
            MergeStrategy::ConcatDemuxer => {
                tokio::fs::write(list_file, concat_list_contents(parts))
                    .await
                    .map_err(|e| DownloadError::io("writing", list_file, e))?;
                let result = self.run(concat_demuxer_args(list_file, output)).await;
                remove_quietly(list_file).await;
                result?;
            }
            MergeStrategy::MultiInput => {
                self.run(multi_input_args(parts, output)).await?;
            }
        }

        for part in parts {
            remove_quietly(part).await;
        }
        Ok(())
    }

    async fn run(&self, args: Vec<OsString>) -> Result<()> {
        let program = self.program.display().to_string();
        debug!(program = %program, ?args, "Running merge tool");

        let output = process_utils::run_captured(&self.program, &args)
            .await
            .map_err(|e| match e.kind() {
                ErrorKind::NotFound => DownloadError::MergeToolMissing {
                    program: program.clone(),
                },
                _ => DownloadError::io("spawning", &self.program, e),
            })?;

        if !output.success() {
            return Err(DownloadError::MergeTool {
                program,
                status: output.status.to_string(),
                stdout: output.stdout,
                stderr: output.stderr,
            });
        }
        Ok(())
    }
}

async fn remove_quietly(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await
        && e.kind() != ErrorKind::NotFound
    {
        warn!(path = %path.display(), error = %e, "Failed to remove intermediate file");
    }
}
