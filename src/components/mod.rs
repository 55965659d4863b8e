//! ECS components for board entities.
//!
//! Submodules overview:
//! - [`gifsurface`] – a surface showing one GIF through a shared atlas, and the
//!   adapter that writes driver output into it
//! - [`locator`] – a board slot placed GIFs go to
//! - [`preview`] – marker for the browser's preview surface

pub mod gifsurface;
pub mod locator;
pub mod preview;
