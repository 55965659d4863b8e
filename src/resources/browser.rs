use bevy_ecs::prelude::Resource;

/// Whether the GIF browser (the preview surface) is on screen.
#[derive(Resource, Debug, Clone, Copy, Default)]
pub struct BrowserState {
    pub showing: bool,
}
