//! Stream ordering and selection.
//!
//! Streams are ranked by total size, largest first; equal sizes fall back to
//! the stream id in ascending order so the ranking never depends on map
//! iteration order.

use std::collections::BTreeMap;

use tracing::debug;

use crate::media::Stream;
use crate::{DownloadError, Result};

/// Streams ordered best-first.
pub fn sorted_streams(streams: &BTreeMap<String, Stream>) -> Vec<&Stream> {
    let mut sorted: Vec<&Stream> = streams.values().collect();
    sorted.sort_by(|a, b| b.size.cmp(&a.size).then_with(|| a.id.cmp(&b.id)));
    sorted
}

/// Pick the stream to download for the media titled `title`.
///
/// With `requested` set the named stream must exist; otherwise the largest
/// stream wins.
pub fn select_stream<'a>(
    title: &str,
    streams: &'a BTreeMap<String, Stream>,
    requested: Option<&str>,
) -> Result<&'a Stream> {
    if streams.is_empty() {
        return Err(DownloadError::NoStreams {
            title: title.to_string(),
        });
    }

    if let Some(id) = requested {
        return streams.get(id).ok_or_else(|| DownloadError::NoSuchStream {
            id: id.to_string(),
            title: title.to_string(),
        });
    }

    let best = sorted_streams(streams)
        .into_iter()
        .next()
        .ok_or_else(|| DownloadError::NoStreams {
            title: title.to_string(),
        })?;
    debug!(stream = %best.id, size = best.size, "Selected default stream");
    Ok(best)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stream(id: &str, size: u64) -> (String, Stream) {
        (
            id.to_string(),
            Stream {
                id: id.to_string(),
                quality: id.to_string(),
                size,
                ..Stream::default()
            },
        )
    }

    #[test]
    fn orders_by_size_descending() {
        let streams: BTreeMap<_, _> =
            [stream("360p", 10), stream("1080p", 300), stream("720p", 120)].into();
        let ids: Vec<&str> = sorted_streams(&streams)
            .iter()
            .map(|s| s.id.as_str())
            .collect();
        assert_eq!(ids, ["1080p", "720p", "360p"]);
    }

    #[test]
    fn ties_break_by_id() {
        let streams: BTreeMap<_, _> =
            [stream("b", 50), stream("c", 50), stream("a", 50), stream("z", 60)].into();
        let ids: Vec<&str> = sorted_streams(&streams)
            .iter()
            .map(|s| s.id.as_str())
            .collect();
        assert_eq!(ids, ["z", "a", "b", "c"]);
    }

    #[test]
    fn default_is_largest() {
        let streams: BTreeMap<_, _> = [stream("sd", 1), stream("hd", 2)].into();
        assert_eq!(select_stream("t", &streams, None).unwrap().id, "hd");
    }

    #[test]
    fn requested_stream_is_returned() {
        let streams: BTreeMap<_, _> = [stream("sd", 1), stream("hd", 2)].into();
        assert_eq!(select_stream("t", &streams, Some("sd")).unwrap().id, "sd");
    }

    #[test]
    fn empty_map_is_no_streams() {
        let streams = BTreeMap::new();
        assert!(matches!(
            select_stream("t", &streams, None),
            Err(DownloadError::NoStreams { .. })
        ));
    }

    #[test]
    fn missing_request_is_no_such_stream() {
        let streams: BTreeMap<_, _> = [stream("sd", 1)].into();
        let err = select_stream("t", &streams, Some("4k")).unwrap_err();
        assert!(matches!(err, DownloadError::NoSuchStream { ref id, .. } if id == "4k"));
    }
}
