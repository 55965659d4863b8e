//! Event types and observers.
//!
//! Submodules:
//! - [`board`] – scroll the selection and place the selected GIF on a locator
//! - [`browser`] – show or hide the browser preview
//! - [`fetch`] – commands and messages for the background fetch thread
//!
//! See each submodule for concrete event data and semantics.
pub mod board;
pub mod browser;
pub mod fetch;
