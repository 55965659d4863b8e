//! Event and observer to show or hide the GIF browser.
//!
//! Emitting a [`ToggleBrowserEvent`] flips [`BrowserState::showing`]. Showing
//! the browser binds the preview surface to the current selection. While
//! hidden, the preview is unsubscribed from its driver so it stops receiving
//! updates.
use bevy_ecs::observer::On;
use bevy_ecs::prelude::*;
use log::{debug, warn};

use crate::components::gifsurface::GifSurface;
use crate::resources::board::GifBoard;
use crate::resources::browser::BrowserState;
use crate::resources::fetch::FetchBridge;
use crate::resources::gifregistry::GifRegistry;
use crate::systems::placement::{bind_surface, unbind_surface};

#[derive(Event, Debug, Clone, Copy)]
pub struct ToggleBrowserEvent {}

/// Observer that toggles the browser and keeps the preview in step.
pub fn toggle_browser_observer(
    _trigger: On<ToggleBrowserEvent>,
    mut browser: ResMut<BrowserState>,
    board: Res<GifBoard>,
    mut registry: ResMut<GifRegistry>,
    bridge: Option<Res<FetchBridge>>,
    mut surfaces: Query<&mut GifSurface>,
) {
    browser.showing = !browser.showing;
    debug!("Browser showing={}", browser.showing);

    let Some(preview) = board.preview() else {
        return;
    };

    if !browser.showing {
        unbind_surface(preview, &mut registry, &surfaces);
        return;
    }

    let Some(source_id) = board.current_source() else {
        return;
    };
    if let Err(e) = bind_surface(
        preview,
        source_id,
        &mut registry,
        bridge.as_deref(),
        &mut surfaces,
    ) {
        warn!("Preview not shown: {}", e);
    }
}
