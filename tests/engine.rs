//! Scroll engine integration tests: loading, superseding runs, scroll
//! mapping and redraws.

mod common;

use std::{
    sync::{Arc, mpsc},
    time::Duration,
};

use common::{
    RecordingProgress, SyntheticDecoder, assert_monotonic_until_terminal, encode_timestamp,
    timestamp_code,
};
use scrollframe::{
    ExtractOptions, RunState, ScrollFrameError, ScrollRegion, ScrollVideo, Surface,
};

async fn wait_until(mut condition: impl FnMut() -> bool) {
    for _ in 0..1_000 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition not met within 5 seconds");
}

fn clip(tag: u8) -> SyntheticDecoder {
    SyntheticDecoder::new(Duration::from_secs(2), 160, 90).tagged(tag)
}

// ── Loading ────────────────────────────────────────────────────────

#[tokio::test(flavor = "multi_thread")]
async fn loaded_frames_are_drawn_from_scroll_progress() {
    let mut video = ScrollVideo::new(Surface::new(160.0, 90.0, 1.0));
    let options = ExtractOptions::new().with_max_frames(10);

    let outcome = video.load(|| Ok(clip(1)), options).await.unwrap();
    assert_eq!(outcome.state, RunState::Complete);
    assert_eq!(video.frame_count(), 10);

    assert_eq!(video.set_scroll_progress(0.55), Some(5));
    let store = video.store();
    let expected = store.read().unwrap().get(5).unwrap().timestamp();
    let pixel = video.canvas().get_pixel(80, 45);
    assert_eq!(timestamp_code(pixel), encode_timestamp(expected));
    assert_eq!(pixel[2], 1);

    assert_eq!(video.set_scroll_progress(7.0), Some(9));
    assert_eq!(video.set_scroll_progress(-1.0), Some(0));
}

#[test]
fn scrolling_an_empty_engine_is_a_no_op() {
    let mut video = ScrollVideo::new(Surface::new(64.0, 64.0, 2.0));
    assert_eq!(video.set_scroll_progress(0.5), None);
    assert_eq!(video.current_index(), None);
    assert!(video.canvas().pixels().all(|pixel| pixel[3] == 255 && pixel[0] == 0));
}

#[test]
fn blocking_load_draws_the_current_progress() {
    let mut video = ScrollVideo::new(Surface::new(32.0, 18.0, 1.0));
    video.set_scroll_progress(1.0);

    let outcome = video
        .load_blocking(clip(3), ExtractOptions::new().with_max_frames(4))
        .unwrap();

    assert_eq!(outcome.frames, 4);
    assert_eq!(video.current_index(), Some(3));
}

#[test]
fn scroll_offsets_are_normalised_by_region() {
    let mut video = ScrollVideo::new(Surface::new(32.0, 18.0, 1.0));
    video
        .load_blocking(clip(0), ExtractOptions::new().with_max_frames(11))
        .unwrap();

    let region = ScrollRegion::new(1_000.0, 3_000.0);
    assert_eq!(video.set_scroll_offset(0.0, region), Some(0));
    assert_eq!(video.set_scroll_offset(2_000.0, region), Some(5));
    assert_eq!(video.set_scroll_offset(9_000.0, region), Some(10));
}

#[test]
fn failed_load_reports_zero_and_returns_the_error() {
    let progress = Arc::new(RecordingProgress::default());
    let options = ExtractOptions::new().with_progress(progress.clone());
    let mut video = ScrollVideo::new(Surface::new(32.0, 18.0, 1.0));

    let result = video.load_blocking(clip(0).unavailable(), options);
    assert!(result.is_err());
    assert_eq!(progress.percents(), vec![0, 0]);
    assert_eq!(video.frame_count(), 0);
}

fn is_blank(video: &ScrollVideo) -> bool {
    video.canvas().pixels().all(|pixel| pixel.0 == [0, 0, 0, 255])
}

#[test]
fn failed_blocking_load_keeps_none_of_its_frames() {
    let progress = Arc::new(RecordingProgress::default());
    let mut video = ScrollVideo::new(Surface::new(32.0, 18.0, 1.0));
    video.set_scroll_progress(1.0);

    let options = ExtractOptions::new()
        .with_max_frames(10)
        .with_progress(progress.clone());
    let result = video.load_blocking(clip(3).fatal_at(3), options);

    assert!(matches!(result, Err(ScrollFrameError::UnsupportedCodec(_))));
    assert_eq!(video.frame_count(), 0);
    assert_eq!(video.current_index(), None);
    assert!(is_blank(&video));
    assert_eq!(progress.percents().last(), Some(&0));
}

#[tokio::test(flavor = "multi_thread")]
async fn failed_run_blanks_the_canvas_it_drew_on() {
    let mut video = ScrollVideo::new(Surface::new(160.0, 90.0, 1.0));
    let (release, gate) = mpsc::channel();
    let run = video.load(
        move || Ok(clip(7).gated(gate).fatal_at(2)),
        ExtractOptions::new().with_max_frames(10),
    );
    let ledger = run.ledger().clone();

    release.send(()).unwrap();
    release.send(()).unwrap();
    wait_until(|| video.frame_count() == 2).await;
    video.set_scroll_progress(1.0);
    assert_eq!(video.canvas().get_pixel(0, 0)[2], 7);

    let _ = release.send(());
    let result = run.await;
    assert!(matches!(result, Err(ScrollFrameError::UnsupportedCodec(_))));

    assert_eq!(video.tick(), None);
    assert_eq!(video.frame_count(), 0);
    assert!(is_blank(&video));
    assert_eq!(ledger.allocated(), 2);
    assert_eq!(ledger.live(), 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn cancelling_a_run_releases_what_it_committed() {
    let progress = Arc::new(RecordingProgress::default());
    let mut video = ScrollVideo::new(Surface::new(160.0, 90.0, 1.0));
    let (release, gate) = mpsc::channel();
    let run = video.load(
        move || Ok(clip(9).gated(gate)),
        ExtractOptions::new()
            .with_max_frames(10)
            .with_progress(progress.clone()),
    );
    let ledger = run.ledger().clone();

    release.send(()).unwrap();
    release.send(()).unwrap();
    wait_until(|| video.frame_count() == 2).await;
    video.set_scroll_progress(1.0);
    assert_eq!(video.canvas().get_pixel(0, 0)[2], 9);

    run.cancel();
    drop(release);
    let outcome = run.await.unwrap();
    assert_eq!(outcome.state, RunState::Cancelled);

    assert_eq!(video.tick(), None);
    assert_eq!(video.frame_count(), 0);
    assert_eq!(video.current_index(), None);
    assert!(is_blank(&video));
    assert_eq!(ledger.live(), 0);
    assert_eq!(progress.percents().last(), Some(&0));
}

#[tokio::test(flavor = "multi_thread")]
async fn decoder_panic_is_not_reported_as_cancellation() {
    let mut video = ScrollVideo::new(Surface::new(16.0, 9.0, 1.0));
    let run = video.load(
        || Ok(clip(8).panicking_at(1)),
        ExtractOptions::new().with_max_frames(4),
    );

    let joined = tokio::spawn(run).await;
    let error = joined.expect_err("the worker panic must reach the awaiting task");
    assert!(error.is_panic());
}

// ── Superseding runs ───────────────────────────────────────────────

#[tokio::test(flavor = "multi_thread")]
async fn new_source_cancels_the_run_in_flight() {
    let progress = Arc::new(RecordingProgress::default());
    let mut video = ScrollVideo::new(Surface::new(160.0, 90.0, 1.0));

    let (release_first, gate) = mpsc::channel();
    let first = video.load(
        move || Ok(clip(1).gated(gate)),
        ExtractOptions::new()
            .with_max_frames(10)
            .with_progress(progress.clone()),
    );
    let first_run = first.run_id();
    let first_ledger = first.ledger().clone();

    release_first.send(()).unwrap();
    release_first.send(()).unwrap();
    wait_until(|| video.frame_count() == 2).await;
    video.set_scroll_progress(1.0);
    assert_eq!(video.canvas().get_pixel(0, 0)[2], 1);

    let second = video.load(
        || Ok(clip(2)),
        ExtractOptions::new()
            .with_max_frames(10)
            .with_progress(progress.clone()),
    );
    let second_run = second.run_id();
    assert!(second_run > first_run);
    assert_eq!(video.active_run(), Some(second_run));

    // Let the first run finish its in-flight decode, if it got that far.
    let _ = release_first.send(());
    drop(release_first);

    let first_outcome = first.await.unwrap();
    assert_eq!(first_outcome.state, RunState::Cancelled);
    let second_outcome = second.await.unwrap();
    assert_eq!(second_outcome.state, RunState::Complete);

    video.tick();
    assert_eq!(video.frame_count(), 10);
    let store = video.store();
    assert!(store.read().unwrap().iter().all(|frame| frame.image().get_pixel(0, 0)[2] == 2));
    assert_eq!(video.canvas().get_pixel(0, 0)[2], 2);
    assert_eq!(video.current_index(), Some(9));

    // Every frame the first run produced has been released.
    assert_eq!(first_ledger.live(), 0);
    assert!(first_ledger.allocated() >= 2);

    // Nothing from the first run was reported once the second one started.
    let runs = progress.runs();
    let second_start = runs.iter().position(|run| *run == second_run).unwrap();
    assert!(runs[second_start..].iter().all(|run| *run == second_run));

    let second_percents = progress.percents_for(second_run);
    assert_eq!(second_percents.first(), Some(&0));
    assert_eq!(second_percents.last(), Some(&100));
    assert_monotonic_until_terminal(&second_percents);
}

#[tokio::test(flavor = "multi_thread")]
async fn unload_cancels_and_clears() {
    let mut video = ScrollVideo::new(Surface::new(16.0, 9.0, 1.0));
    let (release, gate) = mpsc::channel();
    let run = video.load(move || Ok(clip(4).gated(gate)), ExtractOptions::new());
    let ledger = run.ledger().clone();

    release.send(()).unwrap();
    wait_until(|| video.frame_count() == 1).await;

    video.unload();
    drop(release);
    assert_eq!(video.frame_count(), 0);
    assert_eq!(video.active_run(), None);
    assert_eq!(video.set_scroll_progress(0.5), None);

    let outcome = run.await.unwrap();
    assert_eq!(outcome.state, RunState::Cancelled);
    assert_eq!(ledger.live(), 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn cancelled_handle_resolves_as_cancelled() {
    let mut video = ScrollVideo::new(Surface::new(16.0, 9.0, 1.0));
    let (release, gate) = mpsc::channel();
    let run = video.load(move || Ok(clip(5).gated(gate)), ExtractOptions::new());

    run.cancel();
    let _ = release.send(());
    drop(release);

    let outcome = run.await.unwrap();
    assert_eq!(outcome.state, RunState::Cancelled);
    video.tick();
    assert_eq!(video.frame_count(), 0);
}

// ── Resizing ───────────────────────────────────────────────────────

#[test]
fn resize_redraws_the_last_frame_at_the_new_ratio() {
    let mut video = ScrollVideo::new(Surface::new(40.0, 40.0, 1.0));
    video
        .load_blocking(clip(6), ExtractOptions::new().with_max_frames(5))
        .unwrap();
    video.set_scroll_progress(0.5);
    let before = *video.canvas().get_pixel(20, 20);

    assert!(video.resize(Surface::new(40.0, 40.0, 2.0)));
    assert_eq!(video.canvas().dimensions(), (80, 80));
    assert_eq!(video.current_index(), Some(2));
    assert_eq!(*video.canvas().get_pixel(40, 40), before);
}
