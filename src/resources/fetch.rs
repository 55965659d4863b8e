//! ECS resources that bridge the main thread with the background fetch thread.
//!
//! Use [`setup_fetch`] once during initialization to spawn the fetch thread
//! and insert the [`FetchBridge`] and `Messages<FetchMessage>` resources. Call
//! [`shutdown_fetch`] during teardown to stop the thread and join it.
//!
//! Without a bridge the registry still works: loads stay pending until
//! something calls [`GifRegistry::complete_fetch`] directly.
//!
//! [`GifRegistry::complete_fetch`]: crate::resources::gifregistry::GifRegistry::complete_fetch

use bevy_ecs::prelude::*;
use crossbeam_channel::{Receiver, Sender, unbounded};
use log::error;

use crate::events::fetch::{FetchCmd, FetchMessage};
use crate::fetcher::SourceFetcher;
use crate::resources::gifregistry::FetchTicket;
use crate::systems::fetch::fetch_thread;

/// Shared bridge between the ECS world and the fetch thread.
#[derive(Resource)]
pub struct FetchBridge {
    /// Sender for [`FetchCmd`] messages (ECS -> fetch thread).
    pub tx_cmd: Sender<FetchCmd>,
    /// Receiver for [`FetchMessage`] results (fetch thread -> ECS).
    pub rx_msg: Receiver<FetchMessage>,
    /// Join handle for the background fetch thread.
    pub handle: std::thread::JoinHandle<()>,
}

impl FetchBridge {
    /// Hand a ticket to the fetch thread.
    pub fn request(&self, ticket: FetchTicket) {
        let source_id = ticket.source_id().to_string();
        if self.tx_cmd.send(FetchCmd::Fetch { ticket }).is_err() {
            error!("Fetch thread is gone, '{}' will never load", source_id);
        }
    }
}

/// Spawn the fetch thread around `fetcher` and register bridge resources.
pub fn setup_fetch(world: &mut World, fetcher: impl SourceFetcher) {
    let (tx_cmd, rx_cmd) = unbounded::<FetchCmd>();
    let (tx_msg, rx_msg) = unbounded::<FetchMessage>();

    let handle = std::thread::Builder::new()
        .name("gif-fetch".to_string())
        .spawn(move || fetch_thread(fetcher, rx_cmd, tx_msg));

    match handle {
        Ok(handle) => {
            world.insert_resource(FetchBridge {
                tx_cmd,
                rx_msg,
                handle,
            });
        }
        Err(e) => error!("Failed to spawn fetch thread: {}", e),
    }
    world.init_resource::<Messages<FetchMessage>>();
}

/// Request shutdown of the fetch thread and join it.
///
/// A fetch already in progress finishes first; its result is discarded.
pub fn shutdown_fetch(world: &mut World) {
    if let Some(bridge) = world.remove_resource::<FetchBridge>() {
        let _ = bridge.tx_cmd.send(FetchCmd::Shutdown);
        let _ = bridge.handle.join();
    }
}
