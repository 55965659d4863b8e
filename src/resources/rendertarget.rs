//! Render target adapter.
//!
//! Drivers never own the surfaces that display their atlas. They address them
//! by [`Entity`] and push state through a [`RenderTargetAdapter`], which is the
//! only thing the GIF pipeline needs from the rendering side:
//!
//! - [`RenderTargetAdapter::set_atlas`] – bind the texture once, when a target
//!   is attached to a loaded driver
//! - [`RenderTargetAdapter::set_offset`] – move the sampling window on every
//!   frame change
//!
//! Inside the ECS world the adapter is
//! [`SurfaceWriter`](crate::components::gifsurface::SurfaceWriter), which writes
//! into [`GifSurface`](crate::components::gifsurface::GifSurface) components.

use std::sync::Arc;

use bevy_ecs::prelude::Entity;

use crate::atlas::Atlas;

/// Receiver of atlas bindings and sampling-window updates.
pub trait RenderTargetAdapter {
    /// Bind `atlas` as the texture sampled by `target`.
    fn set_atlas(&mut self, target: Entity, atlas: &Arc<Atlas>);

    /// Move the horizontal sampling window of `target` to start at `offset_x`
    /// with a width of `tile_scale_x` (both in texture space, `[0, 1]`).
    fn set_offset(&mut self, target: Entity, offset_x: f32, tile_scale_x: f32);
}

/// Adapter that drops every update. Useful when a registry operation needs an
/// adapter but no surface exists yet.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullAdapter;

impl RenderTargetAdapter for NullAdapter {
    fn set_atlas(&mut self, _target: Entity, _atlas: &Arc<Atlas>) {}

    fn set_offset(&mut self, _target: Entity, _offset_x: f32, _tile_scale_x: f32) {}
}
