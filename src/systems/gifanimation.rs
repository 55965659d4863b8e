//! GIF animation system.
//!
//! [`animate_gifs`] advances every driver in the
//! [`GifRegistry`](crate::resources::gifregistry::GifRegistry) by the frame
//! delta and pushes the new offsets into the subscribed [`GifSurface`]s.
//! Drivers share their atlas between surfaces, so two surfaces showing the same
//! source always display the same frame.

use bevy_ecs::prelude::*;
use log::trace;

use crate::components::gifsurface::{GifSurface, SurfaceWriter};
use crate::resources::gifregistry::GifRegistry;
use crate::resources::worldtime::WorldTime;

/// Advance all GIF drivers by the current frame delta.
///
/// Contract
/// - Reads [`WorldTime`] for the scaled delta.
/// - Ticks every driver, loaded or not. Drivers without targets keep their
///   clock running so a surface attached later joins in step.
/// - Writes `offset_x`/`tile_scale_x` on the surfaces of drivers that stepped
///   a frame.
pub fn animate_gifs(
    time: Res<WorldTime>,
    mut registry: ResMut<GifRegistry>,
    mut surfaces: Query<&mut GifSurface>,
) {
    let elapsed = time.delta_duration();
    if elapsed.is_zero() {
        return;
    }
    let advanced = registry.tick_all(elapsed, &mut SurfaceWriter::new(&mut surfaces));
    if advanced > 0 {
        trace!("{} GIF driver(s) advanced", advanced);
    }
}
