//! ECS resources made available to systems.
//!
//! This module groups the long-lived data injected into the ECS world: the
//! driver registry, board and browser state, configuration, timing, and the
//! fetch thread bridge. Each submodule documents the semantics of its
//! resource(s).
//!
//! Overview
//! - `animationdriver` – playback clock and offset of one atlas (held by the registry)
//! - `board` – preview selection and locator slots
//! - `browser` – whether the preview is on screen
//! - `catalog` – the browsable source identifiers
//! - `fetch` – bridge and channels for the background fetch thread
//! - `gifconfig` – INI backed settings
//! - `gifregistry` – one driver per source, plus loads in flight
//! - `rendertarget` – the seam drivers write offsets through
//! - `worldtime` – host time and delta
pub mod animationdriver;
pub mod board;
pub mod browser;
pub mod catalog;
pub mod fetch;
pub mod gifconfig;
pub mod gifregistry;
pub mod rendertarget;
pub mod worldtime;
