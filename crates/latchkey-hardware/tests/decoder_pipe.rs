//! Integration tests for reader managers fed by a decoder process pipe.

use latchkey_hardware::mock::MockReader;
use latchkey_hardware::stream::StreamReader;
use latchkey_hardware::{AnyReaderDevice, ReaderEvent, ReaderManager};
use tokio::io::AsyncWriteExt;

#[tokio::test]
async fn test_pipe_frames_arrive_in_order_then_disconnect() {
    let (mut decoder, pipe) = tokio::io::duplex(256);

    let mut manager = ReaderManager::default();
    manager.register_reader(AnyReaderDevice::Stream(StreamReader::new(pipe, "decoder")));
    let mut handle = manager.start();

    decoder
        .write_all(b"4 1\n4 2\ngarbage\n4 11\n26 4242424\n")
        .await
        .unwrap();
    drop(decoder);

    let mut frames = Vec::new();
    let mut fault = None;
    while let Some(event) = handle.recv().await {
        match event {
            ReaderEvent::Decoded(frame) => frames.push((frame.bits, frame.value)),
            ReaderEvent::DeviceError { device, error } => fault = Some((device, error)),
            _ => {}
        }
    }

    assert_eq!(frames, vec![(4, 1), (4, 2), (4, 11), (26, 4_242_424)]);
    let (device, error) = fault.expect("end of input is reported");
    assert_eq!(device, "decoder");
    assert!(error.contains("end of input"));

    handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_keypad_and_badge_readers_share_one_stream() {
    let (keypad, keypad_tx) = MockReader::with_name("keypad".to_string());
    let (badge, badge_tx) = MockReader::with_name("badge".to_string());

    let mut manager = ReaderManager::default();
    manager.register_reader(AnyReaderDevice::Mock(keypad));
    manager.register_reader(AnyReaderDevice::Mock(badge));
    assert_eq!(manager.reader_count(), 2);
    let mut handle = manager.start();

    keypad_tx.send_pin(&[7]).await.unwrap();
    let mut keys = Vec::new();
    for _ in 0..2 {
        match handle.recv().await {
            Some(ReaderEvent::Decoded(frame)) => keys.push(frame.value),
            other => panic!("unexpected event {other:?}"),
        }
    }
    assert_eq!(keys, vec![7, 11]);

    badge_tx.send_badge(26, 99).await.unwrap();
    match handle.recv().await {
        Some(ReaderEvent::Decoded(frame)) => assert_eq!((frame.bits, frame.value), (26, 99)),
        other => panic!("unexpected event {other:?}"),
    }

    handle.shutdown().await.unwrap();
}

#[test]
fn test_runtime_stops_while_decoder_pipe_stays_open() {
    use std::io::Write;
    use std::time::{Duration, Instant};

    let (pipe, mut decoder) = std::io::pipe().unwrap();
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .unwrap();

    runtime.block_on(async {
        let reader = StreamReader::from_blocking(std::io::BufReader::new(pipe), "decoder").unwrap();
        let mut manager = ReaderManager::default();
        manager.register_reader(AnyReaderDevice::Stream(reader));
        let mut handle = manager.start();

        decoder.write_all(b"4 5\n").unwrap();
        match handle.recv().await {
            Some(ReaderEvent::Decoded(frame)) => assert_eq!((frame.bits, frame.value), (4, 5)),
            other => panic!("unexpected event {other:?}"),
        }

        handle.shutdown().await.unwrap();
    });

    // The reader thread is still parked on the open pipe here.
    let started = Instant::now();
    drop(runtime);
    assert!(started.elapsed() < Duration::from_secs(1));

    drop(decoder);
}
