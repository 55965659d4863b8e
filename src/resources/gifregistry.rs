//! Registry of animation drivers keyed by source identifier.
//!
//! The [`GifRegistry`] guarantees that every source (URL) is decoded at most
//! once. All surfaces showing that source subscribe to the same
//! [`AnimationDriver`].
//!
//! # Load lifecycle
//!
//! ```text
//!  request() ──► pending (ticket issued, targets queue up)
//!                   │
//!                   ├─ complete_fetch() ──► driver (queued targets bound)
//!                   ├─ fail_fetch()     ──► removed
//!                   └─ discard()        ──► removed, ticket cancelled
//! ```
//!
//! A source may also get a driver synchronously through
//! [`GifRegistry::get_or_create_driver`]. If a load is in flight at that
//! point, its queued targets move to the new driver and its ticket is
//! cancelled, so the late fetch result is dropped without decoding.
//!
//! Drivers are never evicted implicitly. Removing the last target keeps the
//! driver and its atlas alive. [`GifRegistry::release_idle`] frees them, but
//! only when a caller asks for it.

use std::collections::hash_map::Entry;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use bevy_ecs::prelude::*;
use log::{debug, info};
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::atlas::{Atlas, FrameAtlasBuilder};
use crate::error::{GifError, RegistryError};
use crate::resources::animationdriver::AnimationDriver;
use crate::resources::rendertarget::RenderTargetAdapter;

/// Shared flag telling the fetch thread that nobody waits for a result any more.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Handle of one in-flight load, handed to the fetch thread and back.
#[derive(Debug, Clone)]
pub struct FetchTicket {
    source_id: String,
    generation: u64,
    cancel: CancelToken,
}

impl FetchTicket {
    pub fn source_id(&self) -> &str {
        &self.source_id
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

/// Outcome of [`GifRegistry::attach_target`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attachment {
    /// The driver exists; the target already received the atlas.
    Bound,
    /// The source is still loading; the target is bound once it completes.
    Queued,
}

#[derive(Debug)]
struct PendingLoad {
    generation: u64,
    cancel: CancelToken,
    targets: SmallVec<[Entity; 4]>,
}

/// Source identifier → driver map, plus the loads still in flight.
#[derive(Resource, Debug)]
pub struct GifRegistry {
    drivers: FxHashMap<String, AnimationDriver>,
    pending: FxHashMap<String, PendingLoad>,
    next_generation: u64,
    default_fps: f32,
    source_timing: bool,
    builder: FrameAtlasBuilder,
}

impl Default for GifRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_FPS)
    }
}

/// Playback rate used when nothing else is configured.
pub const DEFAULT_FPS: f32 = 10.0;

impl GifRegistry {
    pub fn new(default_fps: f32) -> Self {
        Self {
            drivers: FxHashMap::default(),
            pending: FxHashMap::default(),
            next_generation: 0,
            default_fps,
            source_timing: false,
            builder: FrameAtlasBuilder::new(),
        }
    }

    /// Play each source at the rate implied by its own frame delays, falling
    /// back to the default rate when the source declares none.
    pub fn with_source_timing(mut self, enabled: bool) -> Self {
        self.source_timing = enabled;
        self
    }

    /// Atlas builder used for fetched sources.
    pub fn with_builder(mut self, builder: FrameAtlasBuilder) -> Self {
        self.builder = builder;
        self
    }

    pub fn builder(&self) -> FrameAtlasBuilder {
        self.builder
    }

    pub fn default_fps(&self) -> f32 {
        self.default_fps
    }

    /// Number of loaded drivers.
    pub fn len(&self) -> usize {
        self.drivers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.drivers.is_empty()
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_pending(&self, source_id: &str) -> bool {
        self.pending.contains_key(source_id)
    }

    pub fn driver(&self, source_id: &str) -> Option<&AnimationDriver> {
        self.drivers.get(source_id)
    }

    pub fn driver_mut(&mut self, source_id: &str) -> Option<&mut AnimationDriver> {
        self.drivers.get_mut(source_id)
    }

    pub fn drivers(&self) -> impl Iterator<Item = (&str, &AnimationDriver)> {
        self.drivers.iter().map(|(id, d)| (id.as_str(), d))
    }

    /// Return the driver for `source_id`, building it with `build` if it does
    /// not exist yet.
    ///
    /// `build` runs at most once per source for the life of the registry. If it
    /// fails nothing is inserted. A load still in flight for the source is
    /// superseded: its ticket is cancelled and its queued targets are bound to
    /// the new driver through `adapter`.
    pub fn get_or_create_driver<F>(
        &mut self,
        source_id: &str,
        build: F,
        adapter: &mut impl RenderTargetAdapter,
    ) -> Result<&mut AnimationDriver, GifError>
    where
        F: FnOnce() -> Result<Atlas, GifError>,
    {
        let default_fps = self.default_fps;
        let source_timing = self.source_timing;
        match self.drivers.entry(source_id.to_string()) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => {
                let atlas = build()?;
                let fps = playback_fps(&atlas, default_fps, source_timing);
                info!(
                    "Loaded '{}': {} frames of {}x{} at {:.1} fps",
                    source_id,
                    atlas.frame_count(),
                    atlas.frame_width(),
                    atlas.frame_height(),
                    fps
                );
                let driver = entry.insert(AnimationDriver::with_atlas(Arc::new(atlas), fps));
                if let Some(pending) = self.pending.remove(source_id) {
                    pending.cancel.cancel();
                    debug!(
                        "'{}' built while its fetch was in flight, binding {} queued target(s)",
                        source_id,
                        pending.targets.len()
                    );
                    bind_queued(driver, pending.targets, adapter);
                }
                Ok(driver)
            }
        }
    }

    /// Open a pending load for `source_id`.
    ///
    /// Returns a ticket for the fetch layer, or `None` when the source already
    /// has a driver or a load in flight.
    pub fn request(&mut self, source_id: &str) -> Option<FetchTicket> {
        if self.drivers.contains_key(source_id) || self.pending.contains_key(source_id) {
            return None;
        }
        self.next_generation += 1;
        let cancel = CancelToken::default();
        self.pending.insert(
            source_id.to_string(),
            PendingLoad {
                generation: self.next_generation,
                cancel: cancel.clone(),
                targets: SmallVec::new(),
            },
        );
        debug!("Requested '{}' (generation {})", source_id, self.next_generation);
        Some(FetchTicket {
            source_id: source_id.to_string(),
            generation: self.next_generation,
            cancel,
        })
    }

    /// Subscribe `target` to the driver of `source_id`.
    ///
    /// While the source is still loading the target is queued and bound when
    /// the load completes. Attaching a target twice is a no-op.
    pub fn attach_target(
        &mut self,
        source_id: &str,
        target: Entity,
        adapter: &mut impl RenderTargetAdapter,
    ) -> Result<Attachment, RegistryError> {
        if let Some(driver) = self.drivers.get_mut(source_id) {
            if driver.register_target(target) {
                driver.bind_target(target, adapter);
            }
            return Ok(Attachment::Bound);
        }
        if let Some(pending) = self.pending.get_mut(source_id) {
            if !pending.targets.contains(&target) {
                pending.targets.push(target);
            }
            return Ok(Attachment::Queued);
        }
        Err(RegistryError::UnknownSource(source_id.to_string()))
    }

    /// Unsubscribe `target` from `source_id`, whether loaded or still queued.
    pub fn detach_target(&mut self, source_id: &str, target: Entity) -> bool {
        if let Some(driver) = self.drivers.get_mut(source_id) {
            return driver.unregister_target(target);
        }
        if let Some(pending) = self.pending.get_mut(source_id) {
            if let Some(index) = pending.targets.iter().position(|t| *t == target) {
                pending.targets.remove(index);
                return true;
            }
        }
        false
    }

    /// Finish the load identified by `ticket`.
    ///
    /// Returns `Ok(false)` for stale tickets (cancelled, discarded or
    /// superseded). Otherwise the driver is created through
    /// [`get_or_create_driver`](Self::get_or_create_driver), every queued
    /// target is bound, and `Ok(true)` is returned. A failing `build` drops the
    /// pending load and its queued targets.
    pub fn complete_fetch<F>(
        &mut self,
        ticket: &FetchTicket,
        build: F,
        adapter: &mut impl RenderTargetAdapter,
    ) -> Result<bool, GifError>
    where
        F: FnOnce() -> Result<Atlas, GifError>,
    {
        if !self.owns_ticket(ticket) {
            debug!(
                "Ignoring stale load of '{}' (generation {})",
                ticket.source_id, ticket.generation
            );
            return Ok(false);
        }
        let Some(pending) = self.pending.remove(&ticket.source_id) else {
            return Ok(false);
        };

        let driver = self.get_or_create_driver(&ticket.source_id, build, adapter)?;
        bind_queued(driver, pending.targets, adapter);
        Ok(true)
    }

    /// Drop the pending load of a failed fetch. Returns `false` for stale
    /// tickets.
    pub fn fail_fetch(&mut self, ticket: &FetchTicket) -> bool {
        if !self.owns_ticket(ticket) {
            return false;
        }
        self.pending.remove(&ticket.source_id).is_some()
    }

    /// Forget everything about `source_id`, pending load and driver alike.
    ///
    /// A pending load is cancelled so the fetch thread skips it and a late
    /// completion is ignored.
    pub fn discard(&mut self, source_id: &str) -> bool {
        let cancelled = match self.pending.remove(source_id) {
            Some(pending) => {
                pending.cancel.cancel();
                debug!("Cancelled pending load of '{}'", source_id);
                true
            }
            None => false,
        };
        let dropped = self.drivers.remove(source_id).is_some();
        cancelled || dropped
    }

    /// Advance every driver. Returns how many stepped a frame.
    pub fn tick_all(&mut self, elapsed: Duration, adapter: &mut impl RenderTargetAdapter) -> usize {
        self.drivers
            .values_mut()
            .map(|driver| driver.tick(elapsed, adapter))
            .filter(|changed| *changed)
            .count()
    }

    /// Free every driver without registered targets, with its atlas.
    ///
    /// Never called implicitly. Returns the number of drivers removed.
    pub fn release_idle(&mut self) -> usize {
        let before = self.drivers.len();
        self.drivers.retain(|source_id, driver| {
            let keep = driver.has_targets();
            if !keep {
                debug!("Releasing idle driver for '{}'", source_id);
            }
            keep
        });
        before - self.drivers.len()
    }

    fn owns_ticket(&self, ticket: &FetchTicket) -> bool {
        !ticket.is_cancelled()
            && self
                .pending
                .get(&ticket.source_id)
                .is_some_and(|p| p.generation == ticket.generation)
    }
}

/// Subscribe targets that queued up while the source was loading.
fn bind_queued(
    driver: &mut AnimationDriver,
    targets: SmallVec<[Entity; 4]>,
    adapter: &mut impl RenderTargetAdapter,
) {
    for target in targets {
        if driver.register_target(target) {
            driver.bind_target(target, adapter);
        }
    }
}

fn playback_fps(atlas: &Atlas, default_fps: f32, source_timing: bool) -> f32 {
    if source_timing {
        atlas.source_fps().unwrap_or(default_fps)
    } else {
        default_fps
    }
}
