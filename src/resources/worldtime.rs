use std::time::Duration;

use bevy_ecs::prelude::Resource;

/// Host time as seen by the per-frame systems.
///
/// `delta` is the scaled duration of the current frame in seconds, `elapsed`
/// the scaled total. Updated once per frame by
/// [`update_world_time`](crate::systems::time::update_world_time).
#[derive(Resource, Clone, Copy, Debug)]
pub struct WorldTime {
    pub elapsed: f32,
    pub delta: f32,
    pub time_scale: f32,
    pub frame_count: u64,
}

impl Default for WorldTime {
    fn default() -> Self {
        WorldTime {
            elapsed: 0.0,
            delta: 0.0,
            time_scale: 1.0,
            frame_count: 0,
        }
    }
}

impl WorldTime {
    pub fn with_time_scale(mut self, time_scale: f32) -> Self {
        self.time_scale = time_scale;
        self
    }

    /// The frame delta as a [`Duration`]. Negative or non-finite deltas count
    /// as zero.
    pub fn delta_duration(&self) -> Duration {
        Duration::try_from_secs_f32(self.delta).unwrap_or(Duration::ZERO)
    }
}
