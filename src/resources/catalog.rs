//! Source identifier catalog.
//!
//! Supplies the GIF URLs a user can browse. The built-in list is fixed; a
//! configuration file may replace it. Identifiers are served in pages of
//! `chunk_size` starting at an offset.

use bevy_ecs::prelude::Resource;
use serde::Serialize;

/// Page size used when nothing else is configured.
pub const DEFAULT_CHUNK_SIZE: usize = 5;

pub const BUILTIN_URLS: [&str; 5] = [
    "https://media.giphy.com/media/wn8rVP7qC8TNC/giphy.gif",
    "https://media.giphy.com/media/sg32LhHk9RVLi/giphy.gif",
    "https://media.giphy.com/media/nvKjkfWIl2msw/giphy.gif",
    "https://media.giphy.com/media/OqlDrp2Ie0rWE/giphy.gif",
    "https://media.giphy.com/media/bJnqyzhYlF8LS/giphy.gif",
];

#[derive(Resource, Debug, Clone, Serialize)]
pub struct GifCatalog {
    urls: Vec<String>,
    chunk_size: usize,
}

impl Default for GifCatalog {
    fn default() -> Self {
        Self::new(
            BUILTIN_URLS.iter().map(|url| url.to_string()).collect(),
            DEFAULT_CHUNK_SIZE,
        )
    }
}

impl GifCatalog {
    /// A catalog over `urls`. A `chunk_size` of zero serves everything at once.
    pub fn new(urls: Vec<String>, chunk_size: usize) -> Self {
        Self { urls, chunk_size }
    }

    /// Built-in URLs unless `urls` is non-empty.
    pub fn with_override(urls: &[String], chunk_size: usize) -> Self {
        if urls.is_empty() {
            Self {
                chunk_size,
                ..Self::default()
            }
        } else {
            Self::new(urls.to_vec(), chunk_size)
        }
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }

    /// Up to `chunk_size` identifiers starting at `offset`, in catalog order.
    pub fn source_ids(&self, offset: usize) -> Vec<String> {
        let take = if self.chunk_size == 0 {
            usize::MAX
        } else {
            self.chunk_size
        };
        self.urls.iter().skip(offset).take(take).cloned().collect()
    }
}
