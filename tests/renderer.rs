//! Canvas renderer integration tests.

use std::time::Duration;

use image::{Rgba, RgbaImage};
use scrollframe::{
    CanvasRenderer, DecodedFrame, FrameLedger, FrameStore, RunId, SampleTimestamp, Surface,
    cover_fit,
};

/// A frame whose left half is red and right half blue, under a green band
/// covering the top tenth.
fn marked_frame(width: u32, height: u32, seconds: u64, ledger: &FrameLedger) -> DecodedFrame {
    let image = RgbaImage::from_fn(width, height, |x, y| {
        if y < height / 10 {
            Rgba([0, 255, 0, 255])
        } else if x < width / 2 {
            Rgba([255, 0, 0, 255])
        } else {
            Rgba([0, 0, 255, 255])
        }
    });
    DecodedFrame::new(image, SampleTimestamp::new(Duration::from_secs(seconds)), seconds as usize, ledger)
}

fn store_with(frames: Vec<DecodedFrame>) -> FrameStore {
    let mut store = FrameStore::new(frames.len());
    store.reset(RunId::new(1), frames.len());
    for frame in frames {
        store.commit(RunId::new(1), frame);
    }
    store
}

// ── cover_fit properties ───────────────────────────────────────────

#[test]
fn cover_fit_always_covers_the_surface() {
    let sizes = [(1920, 1080), (1080, 1920), (640, 480), (500, 500), (3000, 200), (7, 13)];
    for &(frame_width, frame_height) in &sizes {
        for &(surface_width, surface_height) in &sizes {
            let fit = cover_fit(frame_width, frame_height, surface_width, surface_height).unwrap();
            assert!(fit.draw_width >= surface_width);
            assert!(fit.draw_height >= surface_height);
            assert_eq!(fit.offset_y, 0, "vertical overflow is anchored to the top");
            assert!(fit.offset_x <= 0);
            // Exactly one axis is fitted to the surface.
            assert!(fit.draw_width == surface_width || fit.draw_height == surface_height);
        }
    }
}

#[test]
fn horizontal_overflow_is_cropped_evenly() {
    let fit = cover_fit(400, 100, 100, 100).unwrap();
    assert_eq!((fit.draw_width, fit.draw_height), (400, 100));
    assert_eq!(fit.offset_x, -150);
    let right_overflow = fit.draw_width as i64 + fit.offset_x - 100;
    assert_eq!(right_overflow, -fit.offset_x);
}

#[test]
fn vertical_overflow_is_cropped_from_the_bottom() {
    let fit = cover_fit(100, 400, 100, 100).unwrap();
    assert_eq!((fit.draw_width, fit.draw_height), (100, 400));
    assert_eq!((fit.offset_x, fit.offset_y), (0, 0));
}

// ── Drawing ────────────────────────────────────────────────────────

#[test]
fn drawing_twice_gives_identical_pixels() {
    let ledger = FrameLedger::new();
    let store = store_with(vec![marked_frame(64, 36, 0, &ledger), marked_frame(64, 36, 1, &ledger)]);
    let mut renderer = CanvasRenderer::mount(Surface::new(50.0, 50.0, 1.5));

    assert!(renderer.draw(&store, 1));
    let first = renderer.canvas().clone();
    assert!(renderer.draw(&store, 1));
    assert_eq!(renderer.canvas(), &first);
}

#[test]
fn drawing_clears_the_previous_frame() {
    let ledger = FrameLedger::new();
    let store = store_with(vec![marked_frame(64, 36, 0, &ledger)]);
    let mut renderer = CanvasRenderer::mount(Surface::new(32.0, 32.0, 1.0))
        .with_background(Rgba([9, 9, 9, 255]));

    renderer.draw(&store, 0);
    let first = renderer.canvas().clone();
    renderer.draw(&store, 0);
    assert_eq!(renderer.canvas(), &first);
    assert!(renderer.canvas().pixels().all(|pixel| *pixel != Rgba([9, 9, 9, 255])));
}

#[test]
fn top_row_stays_visible_on_a_wide_surface() {
    let ledger = FrameLedger::new();
    let store = store_with(vec![marked_frame(40, 80, 0, &ledger)]);
    let mut renderer = CanvasRenderer::mount(Surface::new(80.0, 40.0, 1.0));

    assert!(renderer.draw(&store, 0));
    // Frame is scaled to 80x160; the green band stays, the bottom is cropped.
    assert_eq!(renderer.canvas().get_pixel(40, 0)[1], 255);
    assert_eq!(renderer.canvas().get_pixel(5, 39), &Rgba([255, 0, 0, 255]));
    assert_eq!(renderer.canvas().get_pixel(75, 39), &Rgba([0, 0, 255, 255]));
}

#[test]
fn out_of_range_index_is_clamped() {
    let ledger = FrameLedger::new();
    let store = store_with(vec![marked_frame(16, 9, 0, &ledger), marked_frame(16, 9, 1, &ledger)]);
    let mut renderer = CanvasRenderer::mount(Surface::new(16.0, 9.0, 1.0));

    assert!(renderer.draw(&store, 99));
    assert_eq!(renderer.last_index(), Some(1));
}

#[test]
fn empty_store_keeps_the_last_index() {
    let ledger = FrameLedger::new();
    let store = store_with(vec![marked_frame(16, 9, 0, &ledger)]);
    let mut renderer = CanvasRenderer::mount(Surface::new(16.0, 9.0, 1.0));
    renderer.draw(&store, 0);

    let empty = FrameStore::new(4);
    assert!(!renderer.draw(&empty, 0));
    assert_eq!(renderer.draw_progress(&empty, 0.5), None);
    assert_eq!(renderer.last_index(), Some(0));
}

#[test]
fn zero_sized_surface_draws_nothing() {
    let ledger = FrameLedger::new();
    let store = store_with(vec![marked_frame(16, 9, 0, &ledger)]);
    let mut renderer = CanvasRenderer::mount(Surface::new(0.0, 0.0, 2.0));
    assert!(!renderer.draw(&store, 0));
}

// ── Resizing ───────────────────────────────────────────────────────

#[test]
fn resize_follows_device_pixel_ratio_and_redraws() {
    let ledger = FrameLedger::new();
    let store = store_with(vec![marked_frame(64, 36, 0, &ledger), marked_frame(64, 36, 1, &ledger)]);
    let mut renderer = CanvasRenderer::mount(Surface::new(64.0, 36.0, 1.0));
    assert_eq!(renderer.draw_progress(&store, 1.0), Some(1));

    assert!(renderer.resize(Surface::new(64.0, 36.0, 3.0), &store));
    assert_eq!(renderer.canvas().dimensions(), (192, 108));
    assert_eq!(renderer.last_index(), Some(1));
    assert_eq!(renderer.canvas().get_pixel(10, 50), &Rgba([255, 0, 0, 255]));
    assert_eq!(renderer.canvas().get_pixel(180, 50), &Rgba([0, 0, 255, 255]));
}

#[test]
fn resize_before_any_draw_does_not_redraw() {
    let store = FrameStore::new(0);
    let mut renderer = CanvasRenderer::mount(Surface::new(10.0, 10.0, 1.0));
    assert!(!renderer.resize(Surface::new(20.0, 10.0, 2.0), &store));
    assert_eq!(renderer.canvas().dimensions(), (40, 20));
}
