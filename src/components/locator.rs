use bevy_ecs::prelude::Component;

/// A fixed board slot a GIF can be placed on. `index` is the slot's position
/// in placement order.
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Locator {
    pub index: usize,
}
