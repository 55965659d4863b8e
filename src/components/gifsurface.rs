use std::sync::Arc;

use bevy_ecs::prelude::*;
use log::debug;
use serde::Serialize;

use crate::atlas::Atlas;
use crate::resources::rendertarget::RenderTargetAdapter;

/// A surface that displays one GIF by sampling a shared atlas.
///
/// `source` is the identifier the surface was asked to show. `atlas` stays
/// `None` until the load completes. The renderer samples the atlas with the
/// horizontal window `[offset_x, offset_x + tile_scale_x)`.
#[derive(Component, Debug, Clone)]
pub struct GifSurface {
    pub source: Option<String>,
    pub atlas: Option<Arc<Atlas>>,
    pub offset_x: f32,
    pub tile_scale_x: f32,
    /// Offset updates received since the atlas was bound, the bind included.
    pub updates: u64,
}

impl Default for GifSurface {
    fn default() -> Self {
        Self {
            source: None,
            atlas: None,
            offset_x: 0.0,
            tile_scale_x: 1.0,
            updates: 0,
        }
    }
}

impl GifSurface {
    /// Point the surface at a new source and forget the previous texture.
    pub fn show(&mut self, source_id: impl Into<String>) {
        self.source = Some(source_id.into());
        self.atlas = None;
        self.offset_x = 0.0;
        self.tile_scale_x = 1.0;
        self.updates = 0;
    }

    pub fn is_loaded(&self) -> bool {
        self.atlas.is_some()
    }

    /// Index of the frame currently inside the sampling window.
    pub fn current_frame(&self) -> Option<usize> {
        let atlas = self.atlas.as_ref()?;
        let frame = (self.offset_x / self.tile_scale_x).round() as usize;
        Some(frame % atlas.frame_count())
    }

    /// Size of one frame in pixels, the size the surface is laid out at.
    pub fn frame_size(&self) -> Option<(u32, u32)> {
        self.atlas
            .as_ref()
            .map(|atlas| (atlas.frame_width(), atlas.frame_height()))
    }

    pub fn snapshot(&self) -> SurfaceSnapshot {
        SurfaceSnapshot {
            source: self.source.clone(),
            loaded: self.is_loaded(),
            frame_count: self.atlas.as_ref().map_or(0, |a| a.frame_count()),
            current_frame: self.current_frame(),
            offset_x: self.offset_x,
            tile_scale_x: self.tile_scale_x,
        }
    }
}

/// Serializable view of a [`GifSurface`], used for diagnostics dumps.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SurfaceSnapshot {
    pub source: Option<String>,
    pub loaded: bool,
    pub frame_count: usize,
    pub current_frame: Option<usize>,
    pub offset_x: f32,
    pub tile_scale_x: f32,
}

/// [`RenderTargetAdapter`] writing into the [`GifSurface`] of each target.
///
/// Targets whose entity was despawned or has no surface are skipped.
pub struct SurfaceWriter<'q, 'w, 's, 'a> {
    surfaces: &'q mut Query<'w, 's, &'a mut GifSurface>,
}

impl<'q, 'w, 's, 'a> SurfaceWriter<'q, 'w, 's, 'a> {
    pub fn new(surfaces: &'q mut Query<'w, 's, &'a mut GifSurface>) -> Self {
        Self { surfaces }
    }
}

impl RenderTargetAdapter for SurfaceWriter<'_, '_, '_, '_> {
    fn set_atlas(&mut self, target: Entity, atlas: &Arc<Atlas>) {
        match self.surfaces.get_mut(target) {
            Ok(mut surface) => {
                surface.atlas = Some(Arc::clone(atlas));
                surface.updates = 0;
            }
            Err(_) => debug!("Skipping atlas bind for missing surface {:?}", target),
        }
    }

    fn set_offset(&mut self, target: Entity, offset_x: f32, tile_scale_x: f32) {
        if let Ok(mut surface) = self.surfaces.get_mut(target) {
            surface.offset_x = offset_x;
            surface.tile_scale_x = tile_scale_x;
            surface.updates += 1;
        }
    }
}
