//! End-to-end access scenarios.
//!
//! Each test runs a controller over mock lines with paused time, so hold and
//! timeout durations are exact and the tests run instantly.

mod common;

use common::{BADGE_BITS, CANCEL, Harness, KEY_BITS, SETTLE, alice};
use latchkey_controller::{AccessController, AccessEvent, AccessOutcome, ControllerConfig, ControllerError};
use latchkey_core::{AuthorizationRecord, DoorState, InputChannel};
use latchkey_hardware::mock::{MockOutput, MockReader};
use latchkey_hardware::{AnyOutputDevice, AnyReaderDevice, Level, LineId, ReaderManager};
use latchkey_storage::MemoryAuthorizationSource;
use std::sync::Arc;
use std::time::Duration;

// ============================================================================
// Keypad
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_correct_pin_unlocks_for_hold() {
    let mut h = Harness::start().await;

    let outcome = h.pin(&[1, 2, 3, 4]).await;
    assert_eq!(outcome, AccessOutcome::Granted(alice()));

    tokio::time::sleep(SETTLE).await;
    assert_eq!(h.lines.level(LineId::Lock), Some(Level::Low));
    assert_eq!(h.lines.level(LineId::LockIndicator), Some(Level::Low));
    assert_eq!(h.controller.door().state(), DoorState::Unlocked);

    tokio::time::sleep(Duration::from_millis(2_900)).await;
    assert_eq!(h.lines.level(LineId::Lock), Some(Level::Low));

    tokio::time::sleep(Duration::from_millis(700)).await;
    assert_eq!(h.lines.level(LineId::Lock), Some(Level::High));
    assert_eq!(h.lines.level(LineId::LockIndicator), Some(Level::High));
    assert_eq!(h.controller.door().state(), DoorState::Locked);

    let lock = h.lines.history_for(LineId::Lock);
    assert_eq!(lock.len(), 2);
    assert!(lock[1].at - lock[0].at >= Duration::from_secs(3));

    let buzzer = h.lines.history_for(LineId::Buzzer);
    assert_eq!(h.buzzes(), 2);
    assert!(buzzer[0].at >= lock[1].at);
    assert_eq!(buzzer[1].at - buzzer[0].at, Duration::from_millis(100));
    assert_eq!(buzzer[2].at - buzzer[1].at, Duration::from_millis(100));

    let events = h.drain_events();
    assert_eq!(
        events[0],
        AccessEvent::Granted {
            record: alice(),
            channel: InputChannel::Keypad
        }
    );
    assert_eq!(events[0].to_string(), "Access granted for Alice (pin-1234)");
    assert!(events.contains(&AccessEvent::DoorLocked));
}

#[tokio::test(start_paused = true)]
async fn test_wrong_pin_stays_locked() {
    let mut h = Harness::start().await;

    assert_eq!(h.pin(&[9, 9, 9, 9]).await, AccessOutcome::Denied);
    tokio::time::sleep(Duration::from_secs(5)).await;

    assert_eq!(h.unlocks(), 0);
    assert_eq!(h.buzzes(), 1);
    assert_eq!(h.controller.door().state(), DoorState::Locked);

    let messages = Harness::messages(&h.drain_events());
    assert_eq!(messages, vec!["Access denied for 9999"]);
}

#[tokio::test(start_paused = true)]
async fn test_submit_without_digits_checks_zero() {
    let mut h = Harness::start().await;

    assert_eq!(h.pin(&[]).await, AccessOutcome::Denied);
    assert_eq!(
        Harness::messages(&h.drain_events()),
        vec!["Access denied for 0"]
    );
}

#[tokio::test(start_paused = true)]
async fn test_leading_zeros_are_dropped() {
    let h = Harness::start().await;

    assert_eq!(h.pin(&[0, 1, 2, 3, 4]).await, AccessOutcome::Granted(alice()));
}

#[tokio::test(start_paused = true)]
async fn test_timeout_resets_then_fresh_entry_grants() {
    let mut h = Harness::start().await;

    h.keys(&[1, 2]).await;
    tokio::time::sleep(Duration::from_millis(5_100)).await;

    assert_eq!(h.controller.input().pending_value(), 0);
    assert_eq!(h.buzzes(), 1);
    assert_eq!(h.drain_events(), vec![AccessEvent::PinTimeout]);

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(h.pin(&[1, 2, 3, 4]).await, AccessOutcome::Granted(alice()));
}

#[tokio::test(start_paused = true)]
async fn test_cancel_discards_entry() {
    let mut h = Harness::start().await;

    h.keys(&[5, 6, CANCEL]).await;
    assert_eq!(h.controller.input().pending_value(), 0);

    assert_eq!(h.pin(&[1, 2, 3, 4]).await, AccessOutcome::Granted(alice()));
    let events = h.drain_events();
    assert_eq!(events[0], AccessEvent::PinCancelled);
    assert!(matches!(events[1], AccessEvent::Granted { .. }));
}

#[tokio::test(start_paused = true)]
async fn test_overflow_discards_entry() {
    let config = ControllerConfig {
        max_pin_digits: 4,
        ..ControllerConfig::default()
    };
    let mut h = Harness::start_with(config).await;

    h.keys(&[1, 2, 3, 4, 5]).await;
    assert_eq!(h.controller.input().pending_digits(), 0);
    assert_eq!(
        h.drain_events(),
        vec![AccessEvent::PinOverflow { max_digits: 4 }]
    );

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(h.buzzes(), 1);
    assert_eq!(h.pin(&[1, 2, 3, 4]).await, AccessOutcome::Granted(alice()));
}

#[tokio::test(start_paused = true)]
async fn test_unknown_keypad_value_is_ignored() {
    let mut h = Harness::start().await;

    h.keys(&[1, 2]).await;
    assert_eq!(h.frame(KEY_BITS, 12).await, None);

    assert_eq!(h.controller.input().pending_value(), 12);
    assert_eq!(
        h.drain_events(),
        vec![AccessEvent::InvalidReaderEvent { bits: 4, value: 12 }]
    );
}

// ============================================================================
// Badge
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_badge_does_not_disturb_keypad_entry() {
    let h = Harness::start().await;

    h.keys(&[1, 2]).await;
    assert_eq!(h.badge(9999).await, AccessOutcome::Denied);
    h.keys(&[3, 4]).await;

    assert_eq!(h.controller.input().pending_value(), 1234);
}

#[tokio::test(start_paused = true)]
async fn test_badge_grant_reports_channel() {
    let mut h = Harness::start().await;
    h.table
        .push(AuthorizationRecord::new("4242424", "Bob", "fob"));

    let outcome = h.badge(4_242_424).await;
    assert!(matches!(outcome, AccessOutcome::Granted(ref r) if r.name == "Bob"));

    let events = h.drain_events();
    assert!(matches!(
        &events[0],
        AccessEvent::Granted { channel: InputChannel::Badge, .. }
    ));
}

// ============================================================================
// Door and source faults
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_second_grant_while_open_is_busy() {
    let mut h = Harness::start().await;

    assert_eq!(h.pin(&[1, 2, 3, 4]).await, AccessOutcome::Granted(alice()));
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(h.badge(1234).await, AccessOutcome::Busy(alice()));

    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(h.unlocks(), 1);
    assert!(
        h.drain_events()
            .contains(&AccessEvent::DoorBusy { record: alice() })
    );

    assert_eq!(h.badge(1234).await, AccessOutcome::Granted(alice()));
}

#[tokio::test(start_paused = true)]
async fn test_unavailable_source_is_not_a_denial() {
    let mut h = Harness::start().await;
    h.table.set_unavailable(true);

    assert_eq!(h.pin(&[1, 2, 3, 4]).await, AccessOutcome::Unavailable);
    tokio::time::sleep(Duration::from_secs(2)).await;

    assert_eq!(h.buzzes(), 3);
    assert_eq!(h.unlocks(), 0);
    let events = h.drain_events();
    assert_eq!(events.len(), 1);
    assert!(matches!(events[0], AccessEvent::SourceUnavailable { .. }));

    h.table.set_unavailable(false);
    assert_eq!(h.pin(&[1, 2, 3, 4]).await, AccessOutcome::Granted(alice()));
}

#[tokio::test(start_paused = true)]
async fn test_table_edits_apply_to_next_check() {
    let h = Harness::start().await;

    assert_eq!(h.pin(&[5, 6, 7, 8]).await, AccessOutcome::Denied);
    h.table
        .push(AuthorizationRecord::new("5678", "Carol", "pin"));
    assert!(matches!(
        h.pin(&[5, 6, 7, 8]).await,
        AccessOutcome::Granted(ref r) if r.name == "Carol"
    ));
}

#[tokio::test(start_paused = true)]
async fn test_lock_write_failure_leaves_door_locked() {
    let mut h = Harness::start().await;
    h.lines.set_failing(LineId::LockIndicator, true);

    assert_eq!(h.pin(&[1, 2, 3, 4]).await, AccessOutcome::Granted(alice()));
    tokio::time::sleep(SETTLE).await;

    assert_eq!(h.controller.door().state(), DoorState::Locked);
    assert_eq!(h.lines.level(LineId::Lock), Some(Level::High));
    assert!(!h.controller.door().is_busy());
    assert!(
        h.drain_events()
            .iter()
            .any(|e| matches!(e, AccessEvent::ActuationFault { .. }))
    );
}

// ============================================================================
// Lifecycle
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_shutdown_during_unlock_relocks() {
    let (output, lines) = MockOutput::new();
    let table = MemoryAuthorizationSource::new(vec![alice()]);
    let controller = Arc::new(
        AccessController::new(
            ControllerConfig::default(),
            AnyOutputDevice::Mock(output),
            table.into(),
        )
        .unwrap(),
    );
    let mut events = controller.subscribe();
    let mut door = controller.door_state();

    let (reader, keypad) = MockReader::new();
    let mut manager = ReaderManager::default();
    manager.register_reader(AnyReaderDevice::Mock(reader));
    let mut readers = manager.start();

    controller.start().await.unwrap();
    let runner = {
        let controller = Arc::clone(&controller);
        tokio::spawn(async move {
            let result = controller.run(&mut readers).await;
            (result, readers)
        })
    };

    keypad.send_pin(&[1, 2, 3, 4]).await.unwrap();
    door.wait_for(|state| *state == DoorState::Unlocked)
        .await
        .unwrap();

    controller.shutdown_token().cancel();
    let (result, readers) = runner.await.unwrap();
    assert!(result.is_ok());

    let controller = Arc::try_unwrap(controller).unwrap();
    let door_handle = controller.door().clone();
    controller.shutdown(readers).await.unwrap();

    assert_eq!(door_handle.state(), DoorState::Locked);
    for line in LineId::ALL {
        assert_eq!(lines.level(line), Some(Level::High));
    }
    assert!(lines.is_released());

    let mut saw_shutdown = false;
    let mut saw_locked = false;
    while let Ok(event) = events.try_recv() {
        saw_shutdown |= event == AccessEvent::Shutdown;
        saw_locked |= event == AccessEvent::DoorLocked;
    }
    assert!(saw_shutdown);
    assert!(saw_locked);
}

#[tokio::test(start_paused = true)]
async fn test_reader_disconnect_stops_run() {
    let (output, _lines) = MockOutput::new();
    let controller = AccessController::new(
        ControllerConfig::default(),
        AnyOutputDevice::Mock(output),
        MemoryAuthorizationSource::new(vec![alice()]).into(),
    )
    .unwrap();
    let mut events = controller.subscribe();

    let (reader, keypad) = MockReader::new();
    let mut manager = ReaderManager::default();
    manager.register_reader(AnyReaderDevice::Mock(reader));
    let mut readers = manager.start();
    drop(keypad);

    let result = controller.run(&mut readers).await;
    assert!(matches!(result, Err(ControllerError::ReaderDisconnected(_))));
    assert!(matches!(
        events.try_recv().unwrap(),
        AccessEvent::ReaderFault { .. }
    ));

    controller.shutdown(readers).await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_badge_frames_flow_through_reader() {
    let (output, lines) = MockOutput::new();
    let controller = Arc::new(
        AccessController::new(
            ControllerConfig::default(),
            AnyOutputDevice::Mock(output),
            MemoryAuthorizationSource::new(vec![AuthorizationRecord::new(
                "4242424", "Bob", "fob",
            )])
            .into(),
        )
        .unwrap(),
    );
    let mut door = controller.door_state();

    let (reader, badge) = MockReader::with_name("badge".to_string());
    let mut manager = ReaderManager::default();
    manager.register_reader(AnyReaderDevice::Mock(reader));
    let mut readers = manager.start();

    controller.start().await.unwrap();
    let runner = {
        let controller = Arc::clone(&controller);
        tokio::spawn(async move {
            let result = controller.run(&mut readers).await;
            (result, readers)
        })
    };

    badge.send_badge(BADGE_BITS, 4_242_424).await.unwrap();
    door.wait_for(|state| *state == DoorState::Unlocked)
        .await
        .unwrap();
    door.wait_for(|state| *state == DoorState::Locked)
        .await
        .unwrap();
    assert_eq!(lines.count_transitions_to(LineId::Lock, Level::Low), 1);

    controller.shutdown_token().cancel();
    let (result, readers) = runner.await.unwrap();
    assert!(result.is_ok());
    Arc::try_unwrap(controller)
        .unwrap()
        .shutdown(readers)
        .await
        .unwrap();
}

// ============================================================================
// Input during the startup flashes
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_badge_during_startup_flash_unlocks_at_once() {
    let h = Harness::launch(ControllerConfig::default()).await;
    let started = tokio::time::Instant::now();

    assert_eq!(h.badge(1234).await, AccessOutcome::Granted(alice()));
    tokio::time::sleep(SETTLE).await;

    assert_eq!(h.lines.level(LineId::Lock), Some(Level::Low));
    assert_eq!(h.lines.level(LineId::LockIndicator), Some(Level::Low));
    assert_eq!(h.controller.door().state(), DoorState::Unlocked);
    let released = h
        .lines
        .history_for(LineId::Lock)
        .into_iter()
        .find(|w| w.level == Level::Low)
        .expect("lock released");
    assert!(released.at - started < Duration::from_millis(5));

    // The indicator flash stays cut; the buzzer flash is left alone.
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(h.lines.level(LineId::LockIndicator), Some(Level::Low));
    assert_eq!(
        h.lines.count_transitions_to(LineId::Buzzer, Level::Low),
        4
    );

    tokio::time::sleep(Duration::from_secs(3)).await;
    assert_eq!(h.lines.level(LineId::Lock), Some(Level::High));
    assert_eq!(h.lines.level(LineId::LockIndicator), Some(Level::High));
    assert_eq!(h.controller.door().state(), DoorState::Locked);
}

#[tokio::test(start_paused = true)]
async fn test_keypad_entry_during_startup_flash_is_granted() {
    let mut h = Harness::launch(ControllerConfig::default()).await;
    assert!(h.drain_events().contains(&AccessEvent::Startup));

    assert!(h.keys(&[1, 2, 3]).await.is_none());
    assert_eq!(h.controller.input().pending_value(), 123);
    assert_eq!(h.pin(&[4]).await, AccessOutcome::Granted(alice()));

    tokio::time::sleep(SETTLE).await;
    assert_eq!(h.lines.level(LineId::Lock), Some(Level::Low));
    assert_eq!(h.lines.level(LineId::LockIndicator), Some(Level::Low));
    assert_eq!(
        h.drain_events()[0],
        AccessEvent::Granted {
            record: alice(),
            channel: InputChannel::Keypad
        }
    );
}
