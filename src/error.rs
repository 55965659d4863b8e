//! Error types for the GIF pipeline.
//!
//! Each stage has its own error enum so callers can match on the failure that
//! matters to them:
//! - [`FetchError`] – retrieving the encoded bytes (network or disk)
//! - [`DecodeError`] – turning bytes into frames and frames into an atlas
//! - [`RegistryError`] – misuse of the [`GifRegistry`](crate::resources::gifregistry::GifRegistry)
//!
//! [`GifError`] wraps all three for code paths that cross stages.

use thiserror::Error;

/// Failure while retrieving the encoded bytes of a source.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Transport-level failure (DNS, TLS, connection reset, timeout...).
    #[error("transport failure fetching '{source_id}': {reason}")]
    Transport { source_id: String, reason: String },
    /// The server answered with a non-success status.
    #[error("'{source_id}' answered with HTTP status {status}")]
    Status { source_id: String, status: u16 },
    /// Reading a local file failed.
    #[error("failed to read '{source_id}': {error}")]
    Io {
        source_id: String,
        #[source]
        error: std::io::Error,
    },
    /// The request was discarded before it completed.
    #[error("fetch of '{source_id}' was cancelled")]
    Cancelled { source_id: String },
}

/// Failure while decoding frames or compositing the atlas.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("image decoding failed: {0}")]
    Image(#[from] image::ImageError),
    #[error("image contains no frames")]
    NoFrames,
    #[error("frame {index} is {found_width}x{found_height}, expected {width}x{height}")]
    FrameSizeMismatch {
        index: usize,
        width: u32,
        height: u32,
        found_width: u32,
        found_height: u32,
    },
    #[error("atlas of {frame_count} frames x {frame_width}px exceeds the {max_width}px limit")]
    AtlasTooLarge {
        frame_width: u32,
        frame_count: usize,
        max_width: u32,
    },
}

/// Misuse of the instance registry.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    /// A target was attached to a source that has neither a driver nor a
    /// pending fetch.
    #[error("no driver or pending load for source '{0}'")]
    UnknownSource(String),
}

/// Any failure of the load pipeline.
#[derive(Debug, Error)]
pub enum GifError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error(transparent)]
    Registry(#[from] RegistryError),
}
