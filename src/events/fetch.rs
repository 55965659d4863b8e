//! Messages exchanged with the background fetch thread and load outcomes.

use std::sync::Arc;

use bevy_ecs::message::Message;

use crate::resources::gifregistry::FetchTicket;

/// Commands sent *to* the fetch thread.
#[derive(Debug)]
pub enum FetchCmd {
    Fetch { ticket: FetchTicket },
    Shutdown,
}

/// Results sent *back* from the fetch thread.
#[derive(Message, Debug, Clone)]
pub enum FetchMessage {
    Fetched {
        ticket: FetchTicket,
        bytes: Arc<Vec<u8>>,
    },
    Failed {
        ticket: FetchTicket,
        error: String,
    },
}

/// Outcome of a load once it has been decoded (or failed), for systems that
/// report progress or errors.
#[derive(Message, Debug, Clone, PartialEq)]
pub enum GifLoadMessage {
    Loaded { source_id: String, frame_count: usize },
    Failed { source_id: String, error: String },
}
