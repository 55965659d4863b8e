//! Board session tests: observers, the fetch thread and the per-frame schedule
//! working together. Sources come from an in-memory fetcher.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use bevy_ecs::prelude::*;
use image::codecs::gif::{GifEncoder, Repeat};
use image::{Delay, Frame, Rgba, RgbaImage};

use gifboard::components::gifsurface::GifSurface;
use gifboard::error::FetchError;
use gifboard::resources::browser::BrowserState;
use gifboard::resources::gifconfig::GifConfig;
use gifboard::session::Session;

const EPSILON: f32 = 1e-6;

fn approx_eq(a: f32, b: f32) -> bool {
    (a - b).abs() < EPSILON
}

fn gif_bytes(frames: usize, size: u32) -> Vec<u8> {
    let mut bytes = Vec::new();
    {
        let mut encoder = GifEncoder::new(&mut bytes);
        encoder.set_repeat(Repeat::Infinite).unwrap();
        let frames = (0..frames).map(|i| {
            Frame::from_parts(
                RgbaImage::from_pixel(size, size, Rgba([(i * 60) as u8, 0, 0, 255])),
                0,
                0,
                Delay::from_numer_denom_ms(100, 1),
            )
        });
        encoder.encode_frames(frames).unwrap();
    }
    bytes
}

fn config(locators: usize) -> GifConfig {
    GifConfig {
        fps: 10.0,
        locators,
        catalog_urls: vec!["a.gif".into(), "b.gif".into(), "bad.gif".into()],
        ..GifConfig::new()
    }
}

/// Serves a 4-frame `a.gif` and a 2-frame `b.gif`. Everything else is a 404.
/// `calls` counts fetches.
fn stub_fetcher(
    calls: Arc<AtomicUsize>,
) -> impl Fn(&str) -> Result<Vec<u8>, FetchError> + Send + 'static {
    let a = gif_bytes(4, 8);
    let b = gif_bytes(2, 6);
    move |id: &str| {
        calls.fetch_add(1, Ordering::SeqCst);
        match id {
            "a.gif" => Ok(a.clone()),
            "b.gif" => Ok(b.clone()),
            _ => Err(FetchError::Status {
                source_id: id.to_string(),
                status: 404,
            }),
        }
    }
}

/// Run zero-length frames until `done` holds or two seconds pass.
fn run_until(session: &mut Session, done: impl Fn(&mut Session) -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(2);
    loop {
        session.run_frame(0.0);
        if done(session) {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        std::thread::sleep(Duration::from_millis(1));
    }
}

fn settled(session: &mut Session) -> bool {
    session.registry().pending_len() == 0
}

fn surface(session: &Session, entity: Entity) -> GifSurface {
    session.world().get::<GifSurface>(entity).unwrap().clone()
}

fn locator(session: &Session, index: usize) -> GifSurface {
    surface(session, session.board().locators()[index])
}

fn preview(session: &Session) -> GifSurface {
    surface(session, session.board().preview().unwrap())
}

#[test]
fn placed_gifs_load_and_animate() {
    let calls = Arc::new(AtomicUsize::new(0));
    let mut session = Session::with_fetcher(config(3), stub_fetcher(calls.clone()));

    assert_eq!(session.place_all(), 3);
    assert!(run_until(&mut session, settled));

    let a = locator(&session, 0);
    let b = locator(&session, 1);
    let bad = locator(&session, 2);
    assert!(a.is_loaded());
    assert!(b.is_loaded());
    assert!(!bad.is_loaded());
    assert_eq!(bad.source.as_deref(), Some("bad.gif"));
    assert_eq!(session.registry().len(), 2);
    assert_eq!(calls.load(Ordering::SeqCst), 3);

    session.run_frame(0.1);
    assert!(approx_eq(locator(&session, 0).offset_x, 0.25));
    assert!(approx_eq(locator(&session, 1).offset_x, 0.5));

    for _ in 0..3 {
        session.run_frame(0.1);
    }
    assert_eq!(locator(&session, 0).offset_x, 0.0);
    assert_eq!(locator(&session, 1).offset_x, 0.0);
    session.shutdown();
}

#[test]
fn same_source_on_two_locators_fetches_once() {
    let calls = Arc::new(AtomicUsize::new(0));
    let mut session = Session::with_fetcher(config(2), stub_fetcher(calls.clone()));

    session.place_current();
    session.place_current();
    assert!(run_until(&mut session, settled));

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    let driver = session.registry().driver("a.gif").unwrap();
    assert_eq!(driver.targets().len(), 2);

    session.run_frame(0.1);
    session.run_frame(0.1);
    assert_eq!(locator(&session, 0).current_frame(), Some(2));
    assert_eq!(locator(&session, 1).current_frame(), Some(2));
}

#[test]
fn placing_on_a_used_locator_replaces_its_gif() {
    let calls = Arc::new(AtomicUsize::new(0));
    let mut session = Session::with_fetcher(config(1), stub_fetcher(calls));

    session.place_current();
    assert!(run_until(&mut session, settled));
    session.scroll(1);
    session.place_current();
    assert!(run_until(&mut session, |s| {
        settled(s) && locator(s, 0).is_loaded()
    }));

    let slot = locator(&session, 0);
    assert_eq!(slot.source.as_deref(), Some("b.gif"));
    assert!(approx_eq(slot.tile_scale_x, 0.5));

    // the first driver stays cached without targets until released
    assert!(!session.registry().driver("a.gif").unwrap().has_targets());
    assert_eq!(session.registry_mut().release_idle(), 1);
    assert!(session.registry().driver("b.gif").is_some());
}

#[test]
fn browser_toggle_binds_and_unbinds_preview() {
    let calls = Arc::new(AtomicUsize::new(0));
    let mut session = Session::with_fetcher(config(1), stub_fetcher(calls));

    session.toggle_browser();
    assert!(session.world().resource::<BrowserState>().showing);
    assert_eq!(preview(&session).source.as_deref(), Some("a.gif"));
    assert!(run_until(&mut session, |s| preview(s).is_loaded()));

    session.run_frame(0.1);
    assert!(approx_eq(preview(&session).offset_x, 0.25));

    session.toggle_browser();
    assert!(!session.world().resource::<BrowserState>().showing);
    assert!(!session.registry().driver("a.gif").unwrap().has_targets());
    let frozen = preview(&session).updates;
    session.run_frame(0.1);
    assert_eq!(preview(&session).updates, frozen);

    // showing again resubscribes at the shared driver's current frame
    session.toggle_browser();
    assert_eq!(preview(&session).current_frame(), Some(2));
    session.run_frame(0.1);
    assert!(approx_eq(preview(&session).offset_x, 0.75));
}

#[test]
fn scrolling_moves_the_preview_and_wraps() {
    let calls = Arc::new(AtomicUsize::new(0));
    let mut session = Session::with_fetcher(config(1), stub_fetcher(calls));

    // hidden browser: only the selection moves
    session.scroll(1);
    assert_eq!(session.board().current_source(), Some("b.gif"));
    assert_eq!(preview(&session).source, None);

    session.toggle_browser();
    assert!(run_until(&mut session, |s| preview(s).is_loaded()));
    assert_eq!(preview(&session).frame_size(), Some((6, 6)));

    session.scroll(-2);
    assert_eq!(session.board().current_source(), Some("bad.gif"));
    assert!(run_until(&mut session, settled));
    assert!(!preview(&session).is_loaded());

    session.scroll(2);
    assert_eq!(session.board().current_source(), Some("b.gif"));
    // b.gif already has a driver, so the preview is bound right away
    assert!(preview(&session).is_loaded());
    assert!(session.registry().driver("b.gif").unwrap().has_targets());
}

#[test]
fn discarded_load_is_never_applied() {
    let (gate_tx, gate_rx) = crossbeam_channel::bounded::<()>(1);
    let a = gif_bytes(4, 8);
    let b = gif_bytes(2, 6);
    let fetcher = move |id: &str| -> Result<Vec<u8>, FetchError> {
        if id == "a.gif" {
            let _ = gate_rx.recv();
            return Ok(a.clone());
        }
        Ok(b.clone())
    };
    let mut session = Session::with_fetcher(config(2), fetcher);

    session.place_current();
    assert!(session.registry().is_pending("a.gif"));
    assert!(session.registry_mut().discard("a.gif"));

    session.scroll(1);
    session.place_current();
    gate_tx.send(()).unwrap();

    // the fetch thread is sequential, so a.gif is resolved before b.gif lands
    assert!(run_until(&mut session, |s| locator(s, 1).is_loaded()));
    session.run_frame(0.0);
    assert!(session.registry().driver("a.gif").is_none());
    assert!(!locator(&session, 0).is_loaded());
    assert_eq!(session.registry().len(), 1);
}

#[test]
fn snapshot_reports_drivers_and_surfaces() {
    let calls = Arc::new(AtomicUsize::new(0));
    let mut session = Session::with_fetcher(config(2), stub_fetcher(calls));
    session.place_all();
    assert!(run_until(&mut session, settled));
    session.run_frame(0.1);

    let snap = session.snapshot();
    assert_eq!(snap.drivers.len(), 2);
    assert_eq!(snap.drivers[0].source, "a.gif");
    assert_eq!(snap.drivers[0].frame_index, 1);
    assert_eq!(snap.drivers[0].targets, 1);
    assert_eq!(snap.locators[1].frame_count, 2);
    assert_eq!(snap.pending, 0);

    let json = serde_json::to_value(&snap).unwrap();
    assert_eq!(json["locators"][0]["source"], "a.gif");
    assert_eq!(json["locators"][0]["current_frame"], 1);
}
