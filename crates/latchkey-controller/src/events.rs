//! Operational access events.
//!
//! Every observable decision of the controller is an [`AccessEvent`]. The
//! [`EventLog`] writes each one to `tracing` at the event's fixed severity and
//! broadcasts it to in-process subscribers.

use latchkey_core::{AuthorizationRecord, Credential, InputChannel};
use std::fmt;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

/// Default number of events buffered for slow subscribers.
pub const DEFAULT_EVENT_CAPACITY: usize = 64;

/// Severity an event is logged at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Debug,
    Info,
    Warn,
    Error,
}

/// Something the controller did or observed.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum AccessEvent {
    /// Outputs initialized and ready for input.
    Startup,

    /// Credential found in the authorization table.
    Granted {
        record: AuthorizationRecord,
        channel: InputChannel,
    },

    /// Credential not found.
    Denied {
        credential: Credential,
        channel: InputChannel,
    },

    /// The authorization table could not be read.
    SourceUnavailable {
        credential: Credential,
        reason: String,
    },

    /// Authorized while an unlock cycle was already running.
    DoorBusy { record: AuthorizationRecord },

    /// Lock released.
    DoorOpening { hold: Duration },

    /// Lock re-engaged after the hold.
    DoorLocked,

    /// An output line could not be driven during an unlock cycle.
    ActuationFault { reason: String },

    /// Keypad entry abandoned for longer than the inter-digit timeout.
    PinTimeout,

    /// Keypad entry cleared with the cancel key.
    PinCancelled,

    /// Keypad entry exceeded the digit bound.
    PinOverflow { max_digits: u8 },

    /// Keypad frame that is neither a digit nor a control key.
    InvalidReaderEvent { bits: u8, value: u64 },

    /// A reader stopped with an error.
    ReaderFault { device: String, reason: String },

    /// Teardown started.
    Shutdown,
}

impl AccessEvent {
    /// Fixed severity of this event.
    pub fn severity(&self) -> Severity {
        match self {
            Self::DoorOpening { .. }
            | Self::DoorLocked
            | Self::PinTimeout
            | Self::PinCancelled => Severity::Debug,
            Self::Startup | Self::Granted { .. } | Self::Denied { .. } | Self::Shutdown => {
                Severity::Info
            }
            Self::DoorBusy { .. } | Self::PinOverflow { .. } | Self::InvalidReaderEvent { .. } => {
                Severity::Warn
            }
            Self::SourceUnavailable { .. }
            | Self::ActuationFault { .. }
            | Self::ReaderFault { .. } => Severity::Error,
        }
    }
}

impl fmt::Display for AccessEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Startup => write!(f, "Startup complete"),
            Self::Granted { record, .. } => write!(f, "Access granted for {record}"),
            Self::Denied { credential, .. } => write!(f, "Access denied for {credential}"),
            Self::SourceUnavailable { credential, reason } => {
                write!(f, "Cannot check {credential}: {reason}")
            }
            Self::DoorBusy { record } => {
                write!(f, "Door already open, ignoring unlock for {record}")
            }
            Self::DoorOpening { hold } => write!(f, "Opening door for {hold:?}"),
            Self::DoorLocked => write!(f, "Locking door"),
            Self::ActuationFault { reason } => write!(f, "Door actuation fault: {reason}"),
            Self::PinTimeout => write!(f, "Timeout. Clearing pin"),
            Self::PinCancelled => write!(f, "Esc pressed. Clearing pin"),
            Self::PinOverflow { max_digits } => {
                write!(f, "Pin longer than {max_digits} digits. Clearing pin")
            }
            Self::InvalidReaderEvent { bits, value } => {
                write!(f, "Ignoring {bits}-bit frame with value {value}")
            }
            Self::ReaderFault { device, reason } => write!(f, "Reader {device} failed: {reason}"),
            Self::Shutdown => write!(f, "Shutting down"),
        }
    }
}

/// Sink for access events.
///
/// Clones share one broadcast channel.
#[derive(Debug, Clone)]
pub struct EventLog {
    event_tx: broadcast::Sender<AccessEvent>,
}

impl EventLog {
    /// Create a log buffering up to `capacity` events per subscriber.
    pub fn new(capacity: usize) -> Self {
        let (event_tx, _) = broadcast::channel(capacity.max(1));
        Self { event_tx }
    }

    /// Subscribe to every event emitted from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<AccessEvent> {
        self.event_tx.subscribe()
    }

    /// Log an event and broadcast it.
    pub fn emit(&self, event: AccessEvent) {
        match event.severity() {
            Severity::Debug => debug!("{}", event),
            Severity::Info => info!("{}", event),
            Severity::Warn => warn!("{}", event),
            Severity::Error => error!("{}", event),
        }
        // No subscribers is normal outside tests.
        let _ = self.event_tx.send(event);
    }
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_CAPACITY)
    }
}
