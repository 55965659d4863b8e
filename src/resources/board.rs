//! Board state: which GIF is selected for preview and where the next placed
//! instance goes.
//!
//! Selection scrolls through the source list and wraps in both directions.
//! Locators are used round-robin: placing a GIF on a slot that already shows
//! one replaces it.

use bevy_ecs::prelude::*;

#[derive(Resource, Debug, Clone, Default)]
pub struct GifBoard {
    sources: Vec<String>,
    current: usize,
    locators: Vec<Entity>,
    next_locator: usize,
    preview: Option<Entity>,
}

impl GifBoard {
    pub fn new(sources: Vec<String>) -> Self {
        Self {
            sources,
            ..Self::default()
        }
    }

    pub fn sources(&self) -> &[String] {
        &self.sources
    }

    pub fn set_locators(&mut self, locators: Vec<Entity>) {
        self.locators = locators;
        self.next_locator = 0;
    }

    pub fn locators(&self) -> &[Entity] {
        &self.locators
    }

    pub fn set_preview(&mut self, preview: Entity) {
        self.preview = Some(preview);
    }

    pub fn preview(&self) -> Option<Entity> {
        self.preview
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn current_source(&self) -> Option<&str> {
        self.sources.get(self.current).map(String::as_str)
    }

    /// Move the selection by `step` (negative scrolls back) and return the new
    /// selection.
    pub fn scroll(&mut self, step: i64) -> Option<&str> {
        if self.sources.is_empty() {
            return None;
        }
        let len = self.sources.len() as i64;
        self.current = (self.current as i64 + step).rem_euclid(len) as usize;
        self.current_source()
    }

    pub fn next_locator_index(&self) -> usize {
        self.next_locator
    }

    /// The locator the next placement goes to. Advances round-robin.
    pub fn take_next_locator(&mut self) -> Option<Entity> {
        let locator = *self.locators.get(self.next_locator)?;
        self.next_locator = (self.next_locator + 1) % self.locators.len();
        Some(locator)
    }
}
