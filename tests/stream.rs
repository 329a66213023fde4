//! Async frame stream integration tests.

mod common;

use std::{sync::mpsc, time::Duration};

use common::SyntheticDecoder;
use scrollframe::{ExtractOptions, FrameStream, ScrollFrameError};
use tokio_stream::StreamExt;

fn clip() -> SyntheticDecoder {
    SyntheticDecoder::new(Duration::from_secs(1), 64, 36)
}

#[tokio::test(flavor = "multi_thread")]
async fn stream_delivers_every_frame_in_order() {
    let options = ExtractOptions::new().with_max_frames(8);
    let mut stream = FrameStream::spawn(|| Ok(clip()), options);

    let mut indices = Vec::new();
    while let Some(frame) = stream.next().await {
        indices.push(frame.unwrap().sample_index());
    }
    assert_eq!(indices, (0..8).collect::<Vec<_>>());
}

#[tokio::test(flavor = "multi_thread")]
async fn stream_reports_open_failures() {
    let mut stream = FrameStream::spawn(
        || {
            Err::<SyntheticDecoder, _>(ScrollFrameError::SourceUnavailable {
                locator: "missing.mp4".to_string(),
                reason: "not found".to_string(),
            })
        },
        ExtractOptions::new(),
    );

    match stream.next().await {
        Some(Err(ScrollFrameError::SourceUnavailable { locator, .. })) => {
            assert_eq!(locator, "missing.mp4");
        }
        other => panic!("Expected SourceUnavailable, got: {other:?}"),
    }
    assert!(stream.next().await.is_none());
}

#[tokio::test(flavor = "multi_thread")]
async fn dropping_the_stream_cancels_and_releases() {
    let (release, gate) = mpsc::channel();
    let mut stream = FrameStream::with_capacity(
        move || Ok(clip().gated(gate)),
        ExtractOptions::new().with_max_frames(30),
        1,
    );
    let ledger = stream.ledger().clone();

    release.send(()).unwrap();
    let first = stream.next().await.unwrap().unwrap();
    assert_eq!(first.sample_index(), 0);

    drop(stream);
    drop(release);
    drop(first);

    for _ in 0..1_000 {
        if ledger.live() == 0 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert_eq!(ledger.live(), 0);
    assert_eq!(ledger.allocated(), 1);
}
