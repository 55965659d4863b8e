//! Atlas playback driver.
//!
//! An [`AnimationDriver`] owns one [`Atlas`] and turns elapsed time into a tile
//! offset. Every surface showing the same source shares a single driver, so
//! they all stay on the same frame.
//!
//! # Timing
//!
//! Elapsed time accumulates until it reaches one frame period (`1 / fps`).
//! Then the accumulator is reset and the driver steps to the next frame. The
//! offset is derived from an integer frame index (`index / frame_count`), so
//! wrapping past the last frame lands exactly on `0.0` and never drifts.
//!
//! # States
//!
//! - [`DriverState::Idle`] – no atlas yet, or a single-frame atlas. Ticks do
//!   nothing.
//! - [`DriverState::Animating`] – a multi-frame atlas is assigned. Never goes
//!   back to idle.

use std::sync::Arc;
use std::time::Duration;

use bevy_ecs::prelude::Entity;
use log::warn;
use smallvec::SmallVec;

use crate::atlas::Atlas;
use crate::resources::rendertarget::RenderTargetAdapter;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverState {
    Idle,
    Animating,
}

/// Shared playback state for one source.
#[derive(Debug, Clone)]
pub struct AnimationDriver {
    atlas: Option<Arc<Atlas>>,
    fps: f32,
    frame_period: Duration,
    accumulated: Duration,
    frame_index: usize,
    targets: SmallVec<[Entity; 4]>,
    state: DriverState,
}

impl AnimationDriver {
    /// Create a driver without an atlas. It stays idle until
    /// [`set_atlas`](Self::set_atlas) is called.
    pub fn new(fps: f32) -> Self {
        Self {
            atlas: None,
            fps,
            frame_period: frame_period(fps),
            accumulated: Duration::ZERO,
            frame_index: 0,
            targets: SmallVec::new(),
            state: DriverState::Idle,
        }
    }

    pub fn with_atlas(atlas: Arc<Atlas>, fps: f32) -> Self {
        let mut driver = Self::new(fps);
        driver.set_atlas(atlas);
        driver
    }

    /// Assign the atlas and restart playback from the first frame.
    pub fn set_atlas(&mut self, atlas: Arc<Atlas>) {
        if atlas.frame_count() > 1 {
            self.state = DriverState::Animating;
        }
        self.atlas = Some(atlas);
        self.frame_index = 0;
        self.accumulated = Duration::ZERO;
    }

    pub fn atlas(&self) -> Option<&Arc<Atlas>> {
        self.atlas.as_ref()
    }

    /// Number of frames in the atlas, `0` before one is assigned.
    pub fn frame_count(&self) -> usize {
        self.atlas.as_ref().map_or(0, |atlas| atlas.frame_count())
    }

    pub fn fps(&self) -> f32 {
        self.fps
    }

    pub fn state(&self) -> DriverState {
        self.state
    }

    pub fn frame_index(&self) -> usize {
        self.frame_index
    }

    /// Start of the sampling window, in `[0, 1)`.
    pub fn current_offset(&self) -> f32 {
        match self.frame_count() {
            0 => 0.0,
            n => self.frame_index as f32 / n as f32,
        }
    }

    /// Width of the sampling window, `1 / frame_count` (`1.0` without atlas).
    pub fn tile_scale(&self) -> f32 {
        match self.frame_count() {
            0 => 1.0,
            n => 1.0 / n as f32,
        }
    }

    /// Add `target` to the notified set. Returns `false` if it was already
    /// registered.
    pub fn register_target(&mut self, target: Entity) -> bool {
        if self.targets.contains(&target) {
            return false;
        }
        self.targets.push(target);
        true
    }

    /// Remove `target` from the notified set. Returns `false` if it was not
    /// registered.
    pub fn unregister_target(&mut self, target: Entity) -> bool {
        match self.targets.iter().position(|t| *t == target) {
            Some(index) => {
                self.targets.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn targets(&self) -> &[Entity] {
        &self.targets
    }

    pub fn has_targets(&self) -> bool {
        !self.targets.is_empty()
    }

    /// Push the atlas and the current window to a single target.
    ///
    /// Does nothing before an atlas is assigned.
    pub fn bind_target(&self, target: Entity, adapter: &mut impl RenderTargetAdapter) {
        if let Some(atlas) = &self.atlas {
            adapter.set_atlas(target, atlas);
            adapter.set_offset(target, self.current_offset(), self.tile_scale());
        }
    }

    /// Advance playback by `elapsed`.
    ///
    /// When a frame period has accumulated, steps to the next frame and sends
    /// the new offset to every registered target exactly once. Returns whether
    /// a frame step happened.
    pub fn tick(&mut self, elapsed: Duration, adapter: &mut impl RenderTargetAdapter) -> bool {
        if self.state != DriverState::Animating {
            return false;
        }

        self.accumulated = self.accumulated.saturating_add(elapsed);
        if self.accumulated < self.frame_period {
            return false;
        }
        self.accumulated = Duration::ZERO;
        self.frame_index = (self.frame_index + 1) % self.frame_count();

        let offset = self.current_offset();
        let scale = self.tile_scale();
        for target in &self.targets {
            adapter.set_offset(*target, offset, scale);
        }
        true
    }
}

fn frame_period(fps: f32) -> Duration {
    if fps.is_finite() && fps > 0.0 {
        Duration::from_secs_f64(1.0 / fps as f64)
    } else {
        warn!("Invalid playback rate {fps}, animation will not advance");
        Duration::MAX
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atlas::{DecodedFrame, FrameAtlasBuilder};
    use bevy_ecs::world::World;
    use image::{Rgba, RgbaImage};

    #[derive(Default)]
    struct Recorder {
        atlases: Vec<Entity>,
        offsets: Vec<(Entity, f32, f32)>,
    }

    impl RenderTargetAdapter for Recorder {
        fn set_atlas(&mut self, target: Entity, _atlas: &Arc<Atlas>) {
            self.atlases.push(target);
        }

        fn set_offset(&mut self, target: Entity, offset_x: f32, tile_scale_x: f32) {
            self.offsets.push((target, offset_x, tile_scale_x));
        }
    }

    fn atlas(frames: usize) -> Arc<Atlas> {
        let frames: Vec<_> = (0..frames)
            .map(|i| {
                DecodedFrame::new(
                    RgbaImage::from_pixel(10, 10, Rgba([i as u8, 0, 0, 255])),
                    Duration::from_millis(100),
                )
            })
            .collect();
        Arc::new(FrameAtlasBuilder::new().compose(&frames).unwrap())
    }

    fn entities(count: usize) -> Vec<Entity> {
        let mut world = World::new();
        (0..count).map(|_| world.spawn_empty().id()).collect()
    }

    const STEP: Duration = Duration::from_millis(100);

    #[test]
    fn test_four_frame_offset_sequence() {
        let mut driver = AnimationDriver::with_atlas(atlas(4), 10.0);
        let mut rec = Recorder::default();
        assert!((driver.tile_scale() - 0.25).abs() < f32::EPSILON);

        let mut seen = Vec::new();
        for _ in 0..4 {
            assert!(driver.tick(STEP, &mut rec));
            seen.push(driver.current_offset());
        }
        assert_eq!(seen, vec![0.25, 0.5, 0.75, 0.0]);
    }

    #[test]
    fn test_offset_after_k_steps_is_exact() {
        for n in 1..=9usize {
            let mut driver = AnimationDriver::with_atlas(atlas(n), 10.0);
            let mut rec = Recorder::default();
            for k in 0..50usize {
                assert_eq!(driver.current_offset(), (k % n) as f32 / n as f32);
                driver.tick(STEP, &mut rec);
            }
        }
    }

    #[test]
    fn test_offset_stays_in_unit_range() {
        let mut driver = AnimationDriver::with_atlas(atlas(3), 10.0);
        let mut rec = Recorder::default();
        for _ in 0..1000 {
            driver.tick(STEP, &mut rec);
            let offset = driver.current_offset();
            assert!((0.0..1.0).contains(&offset));
        }
    }

    #[test]
    fn test_short_ticks_accumulate() {
        let mut driver = AnimationDriver::with_atlas(atlas(4), 10.0);
        let mut rec = Recorder::default();
        assert!(!driver.tick(Duration::from_millis(40), &mut rec));
        assert!(!driver.tick(Duration::from_millis(40), &mut rec));
        assert_eq!(driver.current_offset(), 0.0);
        assert!(driver.tick(Duration::from_millis(40), &mut rec));
        assert_eq!(driver.current_offset(), 0.25);
        // accumulator was reset, the 20ms overshoot is not carried
        assert!(!driver.tick(Duration::from_millis(80), &mut rec));
    }

    #[test]
    fn test_long_tick_advances_one_frame() {
        let mut driver = AnimationDriver::with_atlas(atlas(4), 10.0);
        let mut rec = Recorder::default();
        assert!(driver.tick(Duration::from_secs(5), &mut rec));
        assert_eq!(driver.frame_index(), 1);
    }

    #[test]
    fn test_single_frame_never_moves() {
        let mut driver = AnimationDriver::with_atlas(atlas(1), 10.0);
        let mut rec = Recorder::default();
        let target = entities(1)[0];
        driver.register_target(target);
        assert_eq!(driver.state(), DriverState::Idle);
        for _ in 0..20 {
            assert!(!driver.tick(STEP, &mut rec));
            assert_eq!(driver.current_offset(), 0.0);
        }
        assert!(rec.offsets.is_empty());
    }

    #[test]
    fn test_tick_without_atlas_is_noop() {
        let mut driver = AnimationDriver::new(10.0);
        let mut rec = Recorder::default();
        driver.register_target(entities(1)[0]);
        assert_eq!(driver.state(), DriverState::Idle);
        assert!(!driver.tick(Duration::from_secs(1), &mut rec));
        assert_eq!(driver.frame_count(), 0);
        assert_eq!(driver.current_offset(), 0.0);
        assert!(rec.offsets.is_empty());

        driver.set_atlas(atlas(2));
        assert_eq!(driver.state(), DriverState::Animating);
        assert!(driver.tick(STEP, &mut rec));
        assert_eq!(rec.offsets.len(), 1);
    }

    #[test]
    fn test_duplicate_registration_notifies_once() {
        let mut driver = AnimationDriver::with_atlas(atlas(4), 10.0);
        let mut rec = Recorder::default();
        let target = entities(1)[0];
        assert!(driver.register_target(target));
        assert!(!driver.register_target(target));
        driver.tick(STEP, &mut rec);
        assert_eq!(rec.offsets, vec![(target, 0.25, 0.25)]);
    }

    #[test]
    fn test_every_target_is_notified() {
        let mut driver = AnimationDriver::with_atlas(atlas(2), 10.0);
        let mut rec = Recorder::default();
        let targets = entities(3);
        for t in &targets {
            driver.register_target(*t);
        }
        driver.tick(STEP, &mut rec);
        let notified: Vec<Entity> = rec.offsets.iter().map(|(e, _, _)| *e).collect();
        assert_eq!(notified, targets);
    }

    #[test]
    fn test_unregister_stops_notifications() {
        let mut driver = AnimationDriver::with_atlas(atlas(2), 10.0);
        let mut rec = Recorder::default();
        let target = entities(1)[0];
        driver.register_target(target);
        assert!(driver.unregister_target(target));
        assert!(!driver.unregister_target(target));
        driver.tick(STEP, &mut rec);
        assert!(rec.offsets.is_empty());
        assert!(!driver.has_targets());
    }

    #[test]
    fn test_bind_target_pushes_atlas_and_window() {
        let mut driver = AnimationDriver::with_atlas(atlas(4), 10.0);
        let mut rec = Recorder::default();
        driver.tick(STEP, &mut rec);
        let target = entities(1)[0];
        driver.bind_target(target, &mut rec);
        assert_eq!(rec.atlases, vec![target]);
        assert_eq!(rec.offsets.last(), Some(&(target, 0.25, 0.25)));
    }

    #[test]
    fn test_invalid_fps_never_advances() {
        let mut driver = AnimationDriver::with_atlas(atlas(4), 0.0);
        let mut rec = Recorder::default();
        assert!(!driver.tick(Duration::from_secs(3600), &mut rec));
        assert_eq!(driver.current_offset(), 0.0);
    }
}
