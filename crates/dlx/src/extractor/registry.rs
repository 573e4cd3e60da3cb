use std::sync::Arc;

use regex::Regex;
use tracing::debug;
use url::Url;

use super::{ExtractOptions, Extractor, ExtractorError, UniversalExtractor};
use crate::media::MediaItem;
use crate::transport::Transport;

/// Returned by [`ExtractorRegistry::register`]; removes the registration again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ExtractorHandle(usize);

struct RegistryEntry {
    handle: ExtractorHandle,
    regex: Regex,
    extractor: Arc<dyn Extractor>,
}

/// URL pattern to extractor table. Patterns are tried in registration order;
/// the fallback handles everything else.
#[derive(Default)]
pub struct ExtractorRegistry {
    entries: Vec<RegistryEntry>,
    fallback: Option<Arc<dyn Extractor>>,
    next_handle: usize,
}

impl ExtractorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry whose fallback downloads URLs directly.
    pub fn with_universal(transport: Arc<Transport>) -> Self {
        let mut registry = Self::new();
        registry.set_fallback(Arc::new(UniversalExtractor::new(transport)));
        registry
    }

    pub fn register(
        &mut self,
        pattern: &str,
        extractor: Arc<dyn Extractor>,
    ) -> Result<ExtractorHandle, ExtractorError> {
        let regex = Regex::new(pattern).map_err(|source| ExtractorError::InvalidPattern {
            pattern: pattern.to_string(),
            source,
        })?;
        let handle = ExtractorHandle(self.next_handle);
        self.next_handle += 1;
        debug!(pattern, extractor = extractor.name(), "Registered extractor");
        self.entries.push(RegistryEntry {
            handle,
            regex,
            extractor,
        });
        Ok(handle)
    }

    /// Returns false if the handle was already unregistered.
    pub fn unregister(&mut self, handle: ExtractorHandle) -> bool {
        let before = self.entries.len();
        self.entries.retain(|entry| entry.handle != handle);
        self.entries.len() != before
    }

    pub fn set_fallback(&mut self, extractor: Arc<dyn Extractor>) {
        self.fallback = Some(extractor);
    }

    pub fn resolve(&self, url: &str) -> Result<Arc<dyn Extractor>, ExtractorError> {
        self.entries
            .iter()
            .find(|entry| entry.regex.is_match(url))
            .map(|entry| Arc::clone(&entry.extractor))
            .or_else(|| self.fallback.clone())
            .ok_or_else(|| ExtractorError::UnsupportedUrl(url.to_string()))
    }

    /// Resolve and run the extractor for `url`, then derive stream data for
    /// every ready item.
    pub async fn extract(
        &self,
        url: &str,
        options: &ExtractOptions,
    ) -> Result<Vec<MediaItem>, ExtractorError> {
        let url = url.trim();
        Url::parse(url).map_err(|e| ExtractorError::InvalidUrl(format!("{url}: {e}")))?;

        let extractor = self.resolve(url)?;
        debug!(url, extractor = extractor.name(), "Extracting");
        let mut items = extractor.extract(url, options).await?;
        for item in items.iter_mut() {
            if let MediaItem::Ready(media) = item {
                media.fill_up_streams();
            }
        }
        Ok(items)
    }
}
