//! Binding surfaces to sources.
//!
//! Helpers shared by the board and browser observers. They keep three things
//! in step: the surface's own `source`, its subscription in the
//! [`GifRegistry`], and the fetch request for a source seen for the first
//! time.

use bevy_ecs::prelude::*;
use log::{debug, warn};

use crate::components::gifsurface::{GifSurface, SurfaceWriter};
use crate::error::RegistryError;
use crate::resources::fetch::FetchBridge;
use crate::resources::gifregistry::{Attachment, GifRegistry};

/// Make `target` show `source_id`.
///
/// Detaches the target from whatever it showed before, requests the source if
/// the registry has never seen it, and attaches the target (bound right away
/// when the driver exists, queued otherwise).
pub fn bind_surface(
    target: Entity,
    source_id: &str,
    registry: &mut GifRegistry,
    bridge: Option<&FetchBridge>,
    surfaces: &mut Query<&mut GifSurface>,
) -> Result<Attachment, RegistryError> {
    if let Ok(mut surface) = surfaces.get_mut(target) {
        if let Some(previous) = surface.source.as_deref() {
            if previous != source_id {
                registry.detach_target(previous, target);
            }
        }
        if surface.source.as_deref() != Some(source_id) {
            surface.show(source_id);
        }
    }

    if let Some(ticket) = registry.request(source_id) {
        match bridge {
            Some(bridge) => bridge.request(ticket),
            None => warn!("No fetch bridge, '{}' stays pending", source_id),
        }
    }

    let attachment = registry.attach_target(source_id, target, &mut SurfaceWriter::new(surfaces))?;
    debug!("{:?} -> '{}' ({:?})", target, source_id, attachment);
    Ok(attachment)
}

/// Stop driving `target` without forgetting what it shows.
pub fn unbind_surface(
    target: Entity,
    registry: &mut GifRegistry,
    surfaces: &Query<&mut GifSurface>,
) -> bool {
    let Ok(surface) = surfaces.get(target) else {
        return false;
    };
    match surface.source.as_deref() {
        Some(source_id) => registry.detach_target(source_id, target),
        None => false,
    }
}
