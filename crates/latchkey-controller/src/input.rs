//! Keypad accumulation and credential routing.
//!
//! Keypad digits build up a pending numeric credential. The entry ends with
//! submit (authenticate), cancel (discard) or the inter-digit timeout
//! (discard). Badge credentials skip accumulation entirely and never touch
//! the pending entry.
//!
//! # Timer
//!
//! Every digit re-arms a one-shot timer task tagged with a generation number.
//! Disarming aborts the task and bumps the generation, so a timer that was
//! already firing when it got disarmed sees a stale generation and does
//! nothing.

use crate::auth::Authenticator;
use crate::config::ControllerConfig;
use crate::door::{DoorActuator, UnlockStatus};
use crate::error::ControllerError;
use crate::events::{AccessEvent, EventLog};
use crate::indicator::{IndicatorDriver, PulseSpec};
use latchkey_core::constants::KEYPAD_MAX_DIGIT;
use latchkey_core::{AuthorizationRecord, Credential, InputChannel};
use latchkey_hardware::Level;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Result of one access attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessOutcome {
    /// Authorized; an unlock cycle was started.
    Granted(AuthorizationRecord),

    /// Not in the authorization table.
    Denied,

    /// Authorized, but an unlock cycle was already running.
    Busy(AuthorizationRecord),

    /// The authorization table could not be read.
    Unavailable,
}

/// Tunables of the input path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputSettings {
    pub pin_timeout: Duration,
    pub hold: Duration,
    pub max_pin_digits: u8,
    pub buzzer_idle: Level,
}

impl From<&ControllerConfig> for InputSettings {
    fn from(config: &ControllerConfig) -> Self {
        Self {
            pin_timeout: config.pin_timeout(),
            hold: config.hold(),
            max_pin_digits: config.max_pin_digits,
            buzzer_idle: config.levels.buzzer_idle,
        }
    }
}

#[derive(Debug, Default)]
struct PendingCredential {
    value: u64,
    digits: u8,
    timer: Option<JoinHandle<()>>,
    generation: u64,
}

impl PendingCredential {
    fn disarm(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
        self.generation = self.generation.wrapping_add(1);
    }

    /// Disarm and clear, returning the value that was pending.
    fn reset(&mut self) -> u64 {
        self.disarm();
        self.digits = 0;
        std::mem::take(&mut self.value)
    }
}

struct InputInner {
    pending: Mutex<PendingCredential>,
    authenticator: Authenticator,
    door: DoorActuator,
    indicator: IndicatorDriver,
    events: EventLog,
    settings: InputSettings,
}

/// Keypad and badge input state machine.
///
/// Cheap to clone; clones share the pending entry.
#[derive(Clone)]
pub struct InputStateMachine {
    inner: Arc<InputInner>,
}

impl std::fmt::Debug for InputStateMachine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InputStateMachine")
            .field("settings", &self.inner.settings)
            .finish_non_exhaustive()
    }
}

impl InputStateMachine {
    /// Create a state machine with an empty pending entry.
    pub fn new(
        authenticator: Authenticator,
        door: DoorActuator,
        indicator: IndicatorDriver,
        events: EventLog,
        settings: InputSettings,
    ) -> Self {
        Self {
            inner: Arc::new(InputInner {
                pending: Mutex::new(PendingCredential::default()),
                authenticator,
                door,
                indicator,
                events,
                settings,
            }),
        }
    }

    fn pending(&self) -> MutexGuard<'_, PendingCredential> {
        self.inner
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn deny_feedback(&self) {
        self.inner
            .indicator
            .spawn(PulseSpec::denial(self.inner.settings.buzzer_idle));
    }

    /// Value accumulated so far.
    pub fn pending_value(&self) -> u64 {
        self.pending().value
    }

    /// Number of digits accumulated so far.
    pub fn pending_digits(&self) -> u8 {
        self.pending().digits
    }

    /// Whether an inter-digit timer is armed.
    pub fn is_armed(&self) -> bool {
        self.pending().timer.is_some()
    }

    /// Append a keypad digit and re-arm the inter-digit timeout.
    ///
    /// A digit beyond the configured bound discards the whole entry.
    pub fn on_digit(&self, digit: u8) {
        if u64::from(digit) > KEYPAD_MAX_DIGIT {
            warn!("Ignoring keypad digit {}", digit);
            return;
        }

        let max_digits = self.inner.settings.max_pin_digits;
        let mut pending = self.pending();
        if pending.digits >= max_digits {
            pending.reset();
            drop(pending);
            self.inner
                .events
                .emit(AccessEvent::PinOverflow { max_digits });
            self.deny_feedback();
            return;
        }

        pending.value = pending.value * 10 + u64::from(digit);
        pending.digits += 1;
        pending.disarm();

        let generation = pending.generation;
        let timeout = self.inner.settings.pin_timeout;
        let weak = Arc::downgrade(&self.inner);
        pending.timer = Some(tokio::spawn(Self::timer(weak, generation, timeout)));
    }

    async fn timer(inner: Weak<InputInner>, generation: u64, timeout: Duration) {
        tokio::time::sleep(timeout).await;
        if let Some(inner) = inner.upgrade() {
            InputStateMachine { inner }.on_timeout(generation);
        }
    }

    fn on_timeout(&self, generation: u64) {
        let mut pending = self.pending();
        if pending.generation != generation {
            debug!("Ignoring stale pin timer");
            return;
        }
        // This task is the timer; detach it rather than abort itself.
        pending.timer = None;
        pending.reset();
        drop(pending);

        self.inner.events.emit(AccessEvent::PinTimeout);
        self.deny_feedback();
    }

    /// Discard the pending entry.
    pub fn on_cancel(&self) {
        self.pending().reset();
        self.inner.events.emit(AccessEvent::PinCancelled);
        self.deny_feedback();
    }

    /// Authenticate the pending entry and clear it, whatever the outcome.
    ///
    /// Submitting with no digits authenticates 0.
    pub async fn on_submit(&self) -> AccessOutcome {
        let value = self.pending().reset();
        self.attempt(Credential::new(value), InputChannel::Keypad)
            .await
    }

    /// Authenticate a whole credential from the badge channel.
    pub async fn on_credential(&self, value: u64) -> AccessOutcome {
        self.attempt(Credential::new(value), InputChannel::Badge)
            .await
    }

    /// Clear the pending entry and cancel its timer without feedback.
    pub fn disarm(&self) {
        self.pending().reset();
    }

    async fn attempt(&self, credential: Credential, channel: InputChannel) -> AccessOutcome {
        let inner = &self.inner;
        match inner.authenticator.authorize(credential).await {
            Ok(record) => {
                inner.events.emit(AccessEvent::Granted {
                    record: record.clone(),
                    channel,
                });
                match inner.door.request_unlock(inner.settings.hold) {
                    UnlockStatus::Started => AccessOutcome::Granted(record),
                    UnlockStatus::Busy => {
                        inner.events.emit(AccessEvent::DoorBusy {
                            record: record.clone(),
                        });
                        AccessOutcome::Busy(record)
                    }
                }
            }
            Err(ControllerError::AccessDenied { credential }) => {
                inner.events.emit(AccessEvent::Denied {
                    credential,
                    channel,
                });
                self.deny_feedback();
                AccessOutcome::Denied
            }
            Err(e) => {
                inner.events.emit(AccessEvent::SourceUnavailable {
                    credential,
                    reason: e.to_string(),
                });
                inner
                    .indicator
                    .spawn(PulseSpec::source_fault(inner.settings.buzzer_idle));
                AccessOutcome::Unavailable
            }
        }
    }
}
