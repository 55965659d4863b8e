//! Board events and observers.
//!
//! - [`ScrollGifSelectionEvent`] moves the preview selection and rebinds the
//!   preview surface while the browser is showing.
//! - [`PlaceCurrentGifEvent`] puts the selected GIF on the next locator. A
//!   locator that already shows a GIF is switched to the new one, and every
//!   instance of a source shares the same driver.
use bevy_ecs::observer::On;
use bevy_ecs::prelude::*;
use log::{info, warn};

use crate::components::gifsurface::GifSurface;
use crate::resources::board::GifBoard;
use crate::resources::browser::BrowserState;
use crate::resources::fetch::FetchBridge;
use crate::resources::gifregistry::GifRegistry;
use crate::systems::placement::bind_surface;

/// Move the selection by `step` entries (negative scrolls back, wraps).
#[derive(Event, Debug, Clone, Copy)]
pub struct ScrollGifSelectionEvent {
    pub step: i64,
}

/// Place the selected GIF on the next locator.
#[derive(Event, Debug, Clone, Copy)]
pub struct PlaceCurrentGifEvent {}

/// Observer that applies a [`ScrollGifSelectionEvent`].
pub fn scroll_selection_observer(
    trigger: On<ScrollGifSelectionEvent>,
    mut board: ResMut<GifBoard>,
    browser: Res<BrowserState>,
    mut registry: ResMut<GifRegistry>,
    bridge: Option<Res<FetchBridge>>,
    mut surfaces: Query<&mut GifSurface>,
) {
    let Some(source_id) = board.scroll(trigger.event().step).map(String::from) else {
        warn!("Nothing to scroll through, the catalog is empty");
        return;
    };
    info!("Selected '{}'", source_id);

    let Some(preview) = board.preview() else {
        return;
    };
    if !browser.showing {
        return;
    }
    if let Err(e) = bind_surface(
        preview,
        &source_id,
        &mut registry,
        bridge.as_deref(),
        &mut surfaces,
    ) {
        warn!("Preview not updated: {}", e);
    }
}

/// Observer that applies a [`PlaceCurrentGifEvent`].
pub fn place_current_gif_observer(
    _trigger: On<PlaceCurrentGifEvent>,
    mut board: ResMut<GifBoard>,
    mut registry: ResMut<GifRegistry>,
    bridge: Option<Res<FetchBridge>>,
    mut surfaces: Query<&mut GifSurface>,
) {
    let Some(source_id) = board.current_source().map(String::from) else {
        warn!("Nothing selected to place");
        return;
    };
    let Some(locator) = board.take_next_locator() else {
        warn!("Board has no locators");
        return;
    };
    match bind_surface(
        locator,
        &source_id,
        &mut registry,
        bridge.as_deref(),
        &mut surfaces,
    ) {
        Ok(attachment) => info!("Placed '{}' on {:?} ({:?})", source_id, locator, attachment),
        Err(e) => warn!("Could not place '{}': {}", source_id, e),
    }
}
