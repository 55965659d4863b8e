//! gifboard library.
//!
//! Decodes animated images into horizontal frame atlases and plays them back
//! by scrolling a sampling window, with one shared driver per source. The
//! board layer (preview, locators, fetch thread) is built on a bevy_ecs world.
//! Everything is exposed for the CLI and the integration tests.

pub mod atlas;
pub mod components;
pub mod error;
pub mod events;
pub mod fetcher;
pub mod resources;
pub mod session;
pub mod systems;
