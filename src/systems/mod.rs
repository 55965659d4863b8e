//! Board systems.
//!
//! Submodules overview
//! - [`fetch`] – bridge with the fetch thread and turn fetched bytes into drivers
//! - [`gifanimation`] – advance every driver and update surface offsets
//! - [`placement`] – bind and unbind surfaces, shared by the observers
//! - [`time`] – update simulation time and delta

pub mod fetch;
pub mod gifanimation;
pub mod placement;
pub mod time;
