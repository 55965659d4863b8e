//! Frame decoding and atlas compositing.
//!
//! [`FrameAtlasBuilder`] turns an encoded image into a single RGBA bitmap
//! holding every frame side by side:
//!
//! ```text
//! +---------+---------+---------+---------+
//! | frame 0 | frame 1 | frame 2 | frame 3 |   height = frame_height
//! +---------+---------+---------+---------+
//!  <------ frame_width * frame_count ------>
//! ```
//!
//! Rows are stored bottom-up: atlas row 0 holds the *last* scanline of each
//! decoded frame. Render targets sample the atlas with a horizontal window of
//! `1 / frame_count` starting at the current tile offset.
//!
//! Animated GIF and animated WebP are decoded frame by frame. Anything else the
//! `image` crate understands is decoded as a single frame.

use std::fmt;
use std::io::Cursor;
use std::time::Duration;

use image::codecs::gif::GifDecoder;
use image::codecs::webp::WebPDecoder;
use image::{AnimationDecoder, ImageFormat, Rgba, RgbaImage};
use log::debug;

use crate::error::DecodeError;

/// Widest atlas accepted by default, in pixels. Matches the common GPU texture
/// size limit.
pub const DEFAULT_MAX_ATLAS_WIDTH: u32 = 16384;

const BYTES_PER_PIXEL: usize = 4;

/// A decoded frame, alive only while the atlas is being assembled.
#[derive(Debug, Clone)]
pub struct DecodedFrame {
    pub image: RgbaImage,
    pub delay: Duration,
}

impl DecodedFrame {
    pub fn new(image: RgbaImage, delay: Duration) -> Self {
        Self { image, delay }
    }
}

/// All frames of one source, tiled horizontally in playback order.
///
/// Immutable once built. Drivers and render targets share it through an
/// `Arc<Atlas>`.
#[derive(Clone)]
pub struct Atlas {
    image: RgbaImage,
    frame_width: u32,
    frame_height: u32,
    frame_count: usize,
    frame_delays: Vec<Duration>,
}

impl Atlas {
    /// Atlas width in pixels (`frame_width * frame_count`).
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn frame_width(&self) -> u32 {
        self.frame_width
    }

    pub fn frame_height(&self) -> u32 {
        self.frame_height
    }

    pub fn frame_count(&self) -> usize {
        self.frame_count
    }

    /// Horizontal sampling window of one frame, `1 / frame_count`.
    pub fn tile_scale(&self) -> f32 {
        1.0 / self.frame_count as f32
    }

    /// Delay of each frame as declared by the source container.
    pub fn frame_delays(&self) -> &[Duration] {
        &self.frame_delays
    }

    /// Frame rate implied by the mean source delay, if the source declares any
    /// timing at all.
    pub fn source_fps(&self) -> Option<f32> {
        let total: Duration = self.frame_delays.iter().sum();
        if total.is_zero() {
            return None;
        }
        Some(self.frame_count as f32 / total.as_secs_f32())
    }

    /// The bottom-up RGBA bitmap.
    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    /// Raw RGBA bytes, row-major, bottom row first.
    pub fn as_raw(&self) -> &[u8] {
        self.image.as_raw()
    }

    /// Read a pixel of `frame` in the frame's own top-left based coordinates.
    ///
    /// Returns `None` when the frame or the coordinates are out of range.
    pub fn frame_pixel(&self, frame: usize, x: u32, y: u32) -> Option<Rgba<u8>> {
        if frame >= self.frame_count || x >= self.frame_width || y >= self.frame_height {
            return None;
        }
        let atlas_x = frame as u32 * self.frame_width + x;
        let atlas_y = self.frame_height - 1 - y;
        Some(*self.image.get_pixel(atlas_x, atlas_y))
    }
}

impl fmt::Debug for Atlas {
    // the pixel buffer is far too large to print
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Atlas")
            .field("width", &self.width())
            .field("height", &self.height())
            .field("frame_width", &self.frame_width)
            .field("frame_height", &self.frame_height)
            .field("frame_count", &self.frame_count)
            .finish()
    }
}

/// Decodes encoded images and composites their frames into an [`Atlas`].
#[derive(Debug, Clone, Copy)]
pub struct FrameAtlasBuilder {
    max_width: u32,
}

impl Default for FrameAtlasBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameAtlasBuilder {
    pub fn new() -> Self {
        Self {
            max_width: DEFAULT_MAX_ATLAS_WIDTH,
        }
    }

    /// Limit the atlas width. Sources that would need a wider bitmap fail with
    /// [`DecodeError::AtlasTooLarge`].
    pub fn with_max_width(mut self, max_width: u32) -> Self {
        self.max_width = max_width;
        self
    }

    pub fn max_width(&self) -> u32 {
        self.max_width
    }

    /// Decode `bytes` and tile every frame into a new atlas.
    ///
    /// Either the whole atlas is returned or an error; nothing partial.
    pub fn build(&self, bytes: &[u8]) -> Result<Atlas, DecodeError> {
        let frames = decode_frames(bytes)?;
        self.compose(&frames)
    }

    /// Tile already decoded frames into an atlas.
    pub fn compose(&self, frames: &[DecodedFrame]) -> Result<Atlas, DecodeError> {
        let first = frames.first().ok_or(DecodeError::NoFrames)?;
        let (frame_width, frame_height) = first.image.dimensions();

        for (index, frame) in frames.iter().enumerate() {
            let (found_width, found_height) = frame.image.dimensions();
            if found_width != frame_width || found_height != frame_height {
                return Err(DecodeError::FrameSizeMismatch {
                    index,
                    width: frame_width,
                    height: frame_height,
                    found_width,
                    found_height,
                });
            }
        }

        let frame_count = frames.len();
        let too_large = || DecodeError::AtlasTooLarge {
            frame_width,
            frame_count,
            max_width: self.max_width,
        };
        let atlas_width = u32::try_from(frame_count)
            .ok()
            .and_then(|count| frame_width.checked_mul(count))
            .filter(|width| *width <= self.max_width)
            .ok_or_else(too_large)?;

        let mut image = RgbaImage::new(atlas_width, frame_height);
        let frame_row = frame_width as usize * BYTES_PER_PIXEL;
        let atlas_row = atlas_width as usize * BYTES_PER_PIXEL;
        let rows = frame_height as usize;
        let dst: &mut [u8] = &mut image;

        for (f, frame) in frames.iter().enumerate() {
            let src = frame.image.as_raw();
            for y in 0..rows {
                // flip: atlas row 0 is the bottom scanline of the frame
                let src_start = (rows - 1 - y) * frame_row;
                let dst_start = y * atlas_row + f * frame_row;
                dst[dst_start..dst_start + frame_row]
                    .copy_from_slice(&src[src_start..src_start + frame_row]);
            }
        }

        debug!(
            "Built {}x{} atlas from {} frames of {}x{}",
            atlas_width, frame_height, frame_count, frame_width, frame_height
        );

        Ok(Atlas {
            image,
            frame_width,
            frame_height,
            frame_count,
            frame_delays: frames.iter().map(|f| f.delay).collect(),
        })
    }
}

/// Build an atlas with the default width limit.
pub fn build_atlas(bytes: &[u8]) -> Result<Atlas, DecodeError> {
    FrameAtlasBuilder::new().build(bytes)
}

/// Decode every frame of an encoded image, in playback order.
///
/// Multi-frame containers (GIF, animated WebP) yield one entry per frame,
/// already composited onto the full logical screen. Other formats yield a
/// single frame with zero delay.
pub fn decode_frames(bytes: &[u8]) -> Result<Vec<DecodedFrame>, DecodeError> {
    let frames = match image::guess_format(bytes)? {
        ImageFormat::Gif => collect_animation(GifDecoder::new(Cursor::new(bytes))?)?,
        ImageFormat::WebP => {
            let decoder = WebPDecoder::new(Cursor::new(bytes))?;
            if decoder.has_animation() {
                collect_animation(decoder)?
            } else {
                decode_still(bytes)?
            }
        }
        _ => decode_still(bytes)?,
    };

    if frames.is_empty() {
        return Err(DecodeError::NoFrames);
    }
    Ok(frames)
}

fn collect_animation<'a, D: AnimationDecoder<'a>>(
    decoder: D,
) -> Result<Vec<DecodedFrame>, DecodeError> {
    let frames = decoder.into_frames().collect_frames()?;
    Ok(frames
        .into_iter()
        .map(|frame| {
            let (numer, denom) = frame.delay().numer_denom_ms();
            let delay = if denom == 0 {
                Duration::ZERO
            } else {
                Duration::from_secs_f64(numer as f64 / denom as f64 / 1000.0)
            };
            DecodedFrame::new(frame.into_buffer(), delay)
        })
        .collect())
}

fn decode_still(bytes: &[u8]) -> Result<Vec<DecodedFrame>, DecodeError> {
    let image = image::load_from_memory(bytes)?.to_rgba8();
    Ok(vec![DecodedFrame::new(image, Duration::ZERO)])
}
