mod common;

use common::{PAYLOAD_LEN, TestServer, transport};
use dlx_engine::{ExtractOptions, ExtractorRegistry, MediaType, UniversalExtractor};

#[tokio::test]
async fn direct_file_becomes_single_stream_item() {
    let server = TestServer::start().await;
    let registry = ExtractorRegistry::with_universal(transport());
    let url = server.url("/files/holiday.mp4");

    let items = registry
        .extract(&url, &ExtractOptions::default())
        .await
        .unwrap();

    assert_eq!(items.len(), 1);
    let media = items[0].as_media().unwrap();
    assert_eq!(media.site, UniversalExtractor::NAME);
    assert_eq!(media.title, "holiday");
    assert_eq!(media.media_type, MediaType::Video);

    let stream = &media.streams["default"];
    assert_eq!(stream.id, "default");
    assert_eq!(stream.size, PAYLOAD_LEN as u64);
    assert_eq!(stream.ext, "mp4");
    assert_eq!(stream.parts.len(), 1);
    assert_eq!(stream.parts[0].url, url);
}

#[tokio::test]
async fn live_source_has_unknown_size() {
    let server = TestServer::start().await;
    let registry = ExtractorRegistry::with_universal(transport());

    let items = registry
        .extract(&server.url("/live/channel"), &ExtractOptions::default())
        .await
        .unwrap();

    let media = items[0].as_media().unwrap();
    let stream = &media.streams["default"];
    assert_eq!(stream.size, 0);
    assert_eq!(stream.parts[0].ext, "flv");
    // Merged container for FLV input.
    assert_eq!(stream.ext, "mp4");
}

#[tokio::test]
async fn request_failure_surfaces_as_error() {
    let server = TestServer::start().await;
    let registry = ExtractorRegistry::with_universal(transport());

    let err = registry
        .extract(&server.url("/fail/x.mp4"), &ExtractOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, dlx_engine::ExtractorError::Request(_)));
}
