//! Shared harness for controller integration tests.
//!
//! Wires an [`AccessController`] over a mock output and an in-memory
//! authorization table holding `1234,Alice,pin`. Tests drive it either
//! frame-by-frame through the dispatcher or end-to-end through a mock reader.

#![allow(dead_code)]

use latchkey_controller::{AccessController, AccessEvent, AccessOutcome, ControllerConfig};
use latchkey_core::AuthorizationRecord;
use latchkey_hardware::mock::{MockOutput, MockOutputHandle};
use latchkey_hardware::{AnyOutputDevice, DecodedEvent, Level, LineId};
use latchkey_storage::MemoryAuthorizationSource;
use std::time::Duration;
use tokio::sync::broadcast;

/// Keypad frame width.
pub const KEY_BITS: u8 = 4;

/// Badge frame width used in tests.
pub const BADGE_BITS: u8 = 26;

pub const CANCEL: u64 = 10;
pub const SUBMIT: u64 = 11;

/// How long to let background tasks settle between steps.
pub const SETTLE: Duration = Duration::from_millis(1);

pub fn alice() -> AuthorizationRecord {
    AuthorizationRecord::new("1234", "Alice", "pin")
}

pub struct Harness {
    pub controller: AccessController,
    pub lines: MockOutputHandle,
    pub table: MemoryAuthorizationSource,
    pub events: broadcast::Receiver<AccessEvent>,
}

impl Harness {
    /// Start a controller with the default configuration.
    pub async fn start() -> Self {
        Self::start_with(ControllerConfig::default()).await
    }

    /// Start a controller, wait out the startup flashes and clear the line
    /// history and event backlog.
    pub async fn start_with(config: ControllerConfig) -> Self {
        let mut harness = Self::launch(config).await;
        tokio::time::sleep(Duration::from_secs(1)).await;
        harness.lines.clear_history();
        harness.drain_events();
        harness
    }

    /// Start a controller and return while the startup flashes are still
    /// running. History and events are kept.
    pub async fn launch(config: ControllerConfig) -> Self {
        let (output, lines) = MockOutput::new();
        let table = MemoryAuthorizationSource::new(vec![alice()]);
        let controller =
            AccessController::new(config, AnyOutputDevice::Mock(output), table.clone().into())
                .expect("valid test config");
        let events = controller.subscribe();

        controller.start().await.expect("mock outputs never fail");

        Self {
            controller,
            lines,
            table,
            events,
        }
    }

    /// Feed one frame through the dispatcher.
    pub async fn frame(&self, bits: u8, value: u64) -> Option<AccessOutcome> {
        self.controller
            .dispatcher()
            .on_decoded_event(&DecodedEvent::new(bits, value))
            .await
    }

    /// Press a sequence of keypad keys, returning the last outcome.
    pub async fn keys(&self, keys: &[u64]) -> Option<AccessOutcome> {
        let mut outcome = None;
        for &key in keys {
            outcome = self.frame(KEY_BITS, key).await;
        }
        outcome
    }

    /// Enter digits followed by submit.
    pub async fn pin(&self, digits: &[u64]) -> AccessOutcome {
        self.keys(digits).await;
        self.frame(KEY_BITS, SUBMIT)
            .await
            .expect("submit always yields an outcome")
    }

    pub async fn badge(&self, value: u64) -> AccessOutcome {
        self.frame(BADGE_BITS, value)
            .await
            .expect("badge always yields an outcome")
    }

    /// Every event emitted since the last drain.
    pub fn drain_events(&mut self) -> Vec<AccessEvent> {
        let mut drained = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            drained.push(event);
        }
        drained
    }

    /// Number of buzzer activations since the history was last cleared.
    pub fn buzzes(&self) -> usize {
        self.lines.count_transitions_to(LineId::Buzzer, Level::Low)
    }

    /// Number of times the lock was released since the history was last
    /// cleared.
    pub fn unlocks(&self) -> usize {
        self.lines.count_transitions_to(LineId::Lock, Level::Low)
    }

    pub fn messages(events: &[AccessEvent]) -> Vec<String> {
        events.iter().map(ToString::to_string).collect()
    }
}
