use bevy_ecs::prelude::Component;

/// Marker for the surface showing the currently selected GIF while browsing.
#[derive(Component, Debug, Clone, Copy, Default)]
pub struct GifPreview;
