//! Fetch pipeline: background thread plus the systems that feed its results
//! into the registry.
//!
//! - [`fetch_thread`] runs on its own OS thread, owns the
//!   [`SourceFetcher`], and answers each [`FetchCmd::Fetch`] with a
//!   [`FetchMessage`].
//! - [`poll_fetch_messages`] non-blockingly drains the thread's results into
//!   the ECS message queue each frame.
//! - [`update_fetch_messages`] advances that queue.
//! - [`apply_fetched_gifs`] decodes fetched bytes on the main thread, creates
//!   the driver and binds the queued surfaces.
//!
//! Cancelled tickets are skipped before the request goes out, and their
//! results are dropped if the cancel arrived mid-flight. The registry rejects
//! anything stale that still gets through.
//!
//! See also: [`crate::events::fetch`] and [`crate::resources::fetch`].

use std::sync::Arc;

use bevy_ecs::prelude::*;
use crossbeam_channel::{Receiver, Sender};
use log::{debug, error, info};

use crate::atlas::{Atlas, FrameAtlasBuilder};
use crate::components::gifsurface::{GifSurface, SurfaceWriter};
use crate::error::GifError;
use crate::events::fetch::{FetchCmd, FetchMessage, GifLoadMessage};
use crate::fetcher::SourceFetcher;
use crate::resources::fetch::FetchBridge;
use crate::resources::gifregistry::GifRegistry;

/// Entry point of the dedicated fetch thread.
///
/// Blocks on the command channel and performs one fetch at a time. Exits on
/// [`FetchCmd::Shutdown`] or when the ECS side drops its sender.
pub fn fetch_thread(
    fetcher: impl SourceFetcher,
    rx_cmd: Receiver<FetchCmd>,
    tx_msg: Sender<FetchMessage>,
) {
    debug!("Fetch thread starting");

    for cmd in rx_cmd.iter() {
        match cmd {
            FetchCmd::Fetch { ticket } => {
                if ticket.is_cancelled() {
                    debug!("Skipping cancelled fetch of '{}'", ticket.source_id());
                    continue;
                }
                let result = fetcher.fetch(ticket.source_id());
                if ticket.is_cancelled() {
                    debug!("Dropping result of cancelled fetch '{}'", ticket.source_id());
                    continue;
                }
                let msg = match result {
                    Ok(bytes) => FetchMessage::Fetched {
                        ticket,
                        bytes: Arc::new(bytes),
                    },
                    Err(e) => FetchMessage::Failed {
                        ticket,
                        error: e.to_string(),
                    },
                };
                if tx_msg.send(msg).is_err() {
                    break;
                }
            }
            FetchCmd::Shutdown => {
                debug!("Fetch thread shutdown requested");
                break;
            }
        }
    }

    debug!("Fetch thread exiting");
}

/// Drain pending results from the fetch thread into `Messages<FetchMessage>`.
pub fn poll_fetch_messages(
    bridge: Option<Res<FetchBridge>>,
    mut writer: MessageWriter<FetchMessage>,
) {
    if let Some(bridge) = bridge {
        writer.write_batch(bridge.rx_msg.try_iter());
    }
}

/// Advance the ECS message queue for [`FetchMessage`].
pub fn update_fetch_messages(mut msgs: ResMut<Messages<FetchMessage>>) {
    msgs.update();
}

/// Advance the ECS message queue for [`GifLoadMessage`].
pub fn update_gif_load_messages(mut msgs: ResMut<Messages<GifLoadMessage>>) {
    msgs.update();
}

/// Turn fetched bytes into drivers.
///
/// Decoding happens here, on the scheduling thread. Failures are logged and
/// reported as [`GifLoadMessage::Failed`]; they never interrupt the frame.
pub fn apply_fetched_gifs(
    mut reader: MessageReader<FetchMessage>,
    mut registry: ResMut<GifRegistry>,
    mut surfaces: Query<&mut GifSurface>,
    mut load_writer: MessageWriter<GifLoadMessage>,
) {
    let builder = registry.builder();
    for msg in reader.read() {
        match msg {
            FetchMessage::Fetched { ticket, bytes } => {
                let mut adapter = SurfaceWriter::new(&mut surfaces);
                let result = registry.complete_fetch(
                    ticket,
                    || builder.build(bytes.as_slice()).map_err(GifError::from),
                    &mut adapter,
                );
                match result {
                    Ok(true) => {
                        let frame_count = registry
                            .driver(ticket.source_id())
                            .map_or(0, |d| d.frame_count());
                        load_writer.write(GifLoadMessage::Loaded {
                            source_id: ticket.source_id().to_string(),
                            frame_count,
                        });
                    }
                    Ok(false) => {}
                    Err(e) => {
                        error!("Failed to decode '{}': {}", ticket.source_id(), e);
                        load_writer.write(GifLoadMessage::Failed {
                            source_id: ticket.source_id().to_string(),
                            error: e.to_string(),
                        });
                    }
                }
            }
            FetchMessage::Failed { ticket, error } => {
                if registry.fail_fetch(ticket) {
                    error!("{}", error);
                    load_writer.write(GifLoadMessage::Failed {
                        source_id: ticket.source_id().to_string(),
                        error: error.clone(),
                    });
                }
            }
        }
    }
}

/// Log load outcomes. Stands in for a user-facing error reporter.
pub fn report_gif_loads(mut reader: MessageReader<GifLoadMessage>) {
    for msg in reader.read() {
        match msg {
            GifLoadMessage::Loaded {
                source_id,
                frame_count,
            } => info!("'{}' ready ({} frames)", source_id, frame_count),
            GifLoadMessage::Failed { source_id, error } => {
                info!("'{}' could not be shown: {}", source_id, error)
            }
        }
    }
}

/// Fetch and decode a source synchronously, for one-shot tools.
pub fn fetch_and_build(
    fetcher: &impl SourceFetcher,
    builder: &FrameAtlasBuilder,
    source_id: &str,
) -> Result<Atlas, GifError> {
    let bytes = fetcher.fetch(source_id)?;
    Ok(builder.build(&bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FetchError;
    use crossbeam_channel::unbounded;
    use std::time::Duration;

    #[test]
    fn test_fetch_thread_answers_and_stops() {
        let (tx_cmd, rx_cmd) = unbounded();
        let (tx_msg, rx_msg) = unbounded();
        let fetcher = |id: &str| -> Result<Vec<u8>, FetchError> {
            if id == "ok" {
                Ok(vec![1, 2, 3])
            } else {
                Err(FetchError::Status {
                    source_id: id.to_string(),
                    status: 404,
                })
            }
        };
        let handle = std::thread::spawn(move || fetch_thread(fetcher, rx_cmd, tx_msg));

        let mut registry = GifRegistry::new(10.0);
        let ok = registry.request("ok").unwrap();
        let missing = registry.request("missing").unwrap();
        let cancelled = registry.request("cancelled").unwrap();
        registry.discard("cancelled");

        tx_cmd.send(FetchCmd::Fetch { ticket: cancelled }).unwrap();
        tx_cmd.send(FetchCmd::Fetch { ticket: ok }).unwrap();
        tx_cmd.send(FetchCmd::Fetch { ticket: missing }).unwrap();
        tx_cmd.send(FetchCmd::Shutdown).unwrap();
        handle.join().unwrap();

        let msgs: Vec<_> = rx_msg.try_iter().collect();
        assert_eq!(msgs.len(), 2);
        match &msgs[0] {
            FetchMessage::Fetched { ticket, bytes } => {
                assert_eq!(ticket.source_id(), "ok");
                assert_eq!(bytes.as_slice(), &[1, 2, 3]);
            }
            other => panic!("unexpected {other:?}"),
        }
        match &msgs[1] {
            FetchMessage::Failed { ticket, error } => {
                assert_eq!(ticket.source_id(), "missing");
                assert!(error.contains("404"));
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(rx_msg.recv_timeout(Duration::from_millis(10)).is_err());
    }
}
