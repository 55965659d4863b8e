//! Retrieval of encoded image bytes.
//!
//! The pipeline only needs "give me the bytes behind this identifier", which is
//! the [`SourceFetcher`] trait. [`HttpFetcher`] is the default implementation:
//! it fetches `http(s)://` URLs with a blocking `reqwest` client (one attempt,
//! no retry) and reads anything else from the local filesystem.
//!
//! Fetchers run on the background fetch thread, see
//! [`crate::resources::fetch::setup_fetch`].

use std::time::Duration;

use log::debug;

use crate::error::FetchError;

/// Something that can produce the encoded bytes of a source.
pub trait SourceFetcher: Send + 'static {
    fn fetch(&self, source_id: &str) -> Result<Vec<u8>, FetchError>;
}

impl<F> SourceFetcher for F
where
    F: Fn(&str) -> Result<Vec<u8>, FetchError> + Send + 'static,
{
    fn fetch(&self, source_id: &str) -> Result<Vec<u8>, FetchError> {
        self(source_id)
    }
}

pub const DEFAULT_USER_AGENT: &str = concat!("gifboard/", env!("CARGO_PKG_VERSION"));
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP(S) and filesystem fetcher.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::blocking::Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration, user_agent: &str) -> Result<Self, FetchError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .map_err(|e| FetchError::Transport {
                source_id: String::new(),
                reason: format!("failed to build HTTP client: {e}"),
            })?;
        Ok(Self { client })
    }

    fn fetch_http(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let transport = |e: reqwest::Error| FetchError::Transport {
            source_id: url.to_string(),
            reason: e.to_string(),
        };

        let response = self.client.get(url).send().map_err(transport)?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                source_id: url.to_string(),
                status: status.as_u16(),
            });
        }
        let bytes = response.bytes().map_err(transport)?;
        debug!("Fetched {} bytes from {}", bytes.len(), url);
        Ok(bytes.to_vec())
    }
}

impl SourceFetcher for HttpFetcher {
    fn fetch(&self, source_id: &str) -> Result<Vec<u8>, FetchError> {
        if is_remote(source_id) {
            self.fetch_http(source_id)
        } else {
            read_local(source_id)
        }
    }
}

fn is_remote(source_id: &str) -> bool {
    source_id.starts_with("http://") || source_id.starts_with("https://")
}

/// Read a plain path or a `file://` URL.
pub fn read_local(source_id: &str) -> Result<Vec<u8>, FetchError> {
    let path = source_id.strip_prefix("file://").unwrap_or(source_id);
    std::fs::read(path).map_err(|error| FetchError::Io {
        source_id: source_id.to_string(),
        error,
    })
}
