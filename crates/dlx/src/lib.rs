// Resumable multi-part media download engine
pub mod builder;
pub mod config;
pub mod cookies;
pub mod downloader;
pub mod error;
pub mod extractor;
pub mod fetcher;
pub mod filename;
pub mod media;
pub mod merger;
pub mod progress;
pub mod proxy;
pub mod retry;
pub mod selector;
pub mod transport;

// Export common types for ease of use
pub use builder::DownloaderConfigBuilder;
pub use config::{DEFAULT_MERGE_TOOL, DEFAULT_USER_AGENT, DownloadOptions, DownloaderConfig};
pub use downloader::{DownloadOutcome, Downloader};
pub use error::{DownloadError, Result};
pub use extractor::{
    ExtractOptions, Extractor, ExtractorError, ExtractorHandle, ExtractorRegistry,
    UniversalExtractor,
};
pub use fetcher::PartFetcher;
pub use filename::{OutputLayout, sanitize_filename};
pub use media::{CaptionPart, ExtractionFailure, Media, MediaItem, MediaType, Part, Stream};
pub use merger::{MergeStrategy, Merger};
pub use progress::{NoProgress, ProgressCounter, ProgressSink};
pub use proxy::{ProxyAuth, ProxyConfig, ProxyType};
pub use retry::RetryPolicy;
pub use selector::{select_stream, sorted_streams};
pub use transport::Transport;
