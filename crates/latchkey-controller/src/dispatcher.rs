//! Routes decoded reader frames to the input state machine.
//!
//! A 4-bit frame is one keypad key; a frame of any other width is a whole
//! badge credential. Events are handled one at a time in arrival order, so
//! the pending keypad entry never sees two keys concurrently.

use crate::error::{ControllerError, Result};
use crate::events::{AccessEvent, EventLog};
use crate::input::{AccessOutcome, InputStateMachine};
use latchkey_core::constants::{KEYPAD_CANCEL, KEYPAD_FRAME_BITS, KEYPAD_MAX_DIGIT, KEYPAD_SUBMIT};
use latchkey_hardware::{DecodedEvent, ReaderEvent, ReaderHandle};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Meaning of one decoded frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReaderInput {
    /// Keypad digit 0-9.
    Digit(u8),

    /// Keypad cancel key.
    Cancel,

    /// Keypad submit key.
    Submit,

    /// Whole credential from a badge.
    Credential(u64),
}

impl ReaderInput {
    /// Classify a frame by width and value.
    ///
    /// # Errors
    ///
    /// Returns `ControllerError::InvalidCredentialEvent` for a keypad frame
    /// above the submit key.
    pub fn classify(bits: u8, value: u64) -> Result<Self> {
        if bits != KEYPAD_FRAME_BITS {
            return Ok(Self::Credential(value));
        }
        match value {
            KEYPAD_CANCEL => Ok(Self::Cancel),
            KEYPAD_SUBMIT => Ok(Self::Submit),
            // Bounded by the guard, so the cast is lossless.
            digit if digit <= KEYPAD_MAX_DIGIT => Ok(Self::Digit(digit as u8)),
            _ => Err(ControllerError::InvalidCredentialEvent { bits, value }),
        }
    }
}

/// Feeds reader events into an [`InputStateMachine`].
#[derive(Debug, Clone)]
pub struct EventDispatcher {
    input: InputStateMachine,
    events: EventLog,
}

impl EventDispatcher {
    pub fn new(input: InputStateMachine, events: EventLog) -> Self {
        Self { input, events }
    }

    /// Handle one decoded frame.
    ///
    /// Returns the access outcome when the frame completed an attempt
    /// (submit or badge), `None` otherwise.
    pub async fn on_decoded_event(&self, event: &DecodedEvent) -> Option<AccessOutcome> {
        debug!("Frame: {} bits, value {}", event.bits, event.value);
        match ReaderInput::classify(event.bits, event.value) {
            Ok(ReaderInput::Digit(digit)) => {
                self.input.on_digit(digit);
                None
            }
            Ok(ReaderInput::Cancel) => {
                self.input.on_cancel();
                None
            }
            Ok(ReaderInput::Submit) => Some(self.input.on_submit().await),
            Ok(ReaderInput::Credential(value)) => Some(self.input.on_credential(value).await),
            Err(e) => {
                warn!("{}", e);
                self.events.emit(AccessEvent::InvalidReaderEvent {
                    bits: event.bits,
                    value: event.value,
                });
                None
            }
        }
    }

    /// Dispatch reader events until `shutdown` is cancelled.
    ///
    /// # Errors
    ///
    /// Returns `ControllerError::ReaderDisconnected` if every reader stops
    /// before shutdown is requested.
    pub async fn run(&self, reader: &mut ReaderHandle, shutdown: CancellationToken) -> Result<()> {
        loop {
            let event = tokio::select! {
                biased;
                () = shutdown.cancelled() => return Ok(()),
                event = reader.recv() => event,
            };

            match event {
                Some(ReaderEvent::Decoded(frame)) => {
                    self.on_decoded_event(&frame).await;
                }
                Some(ReaderEvent::DeviceError { device, error }) => {
                    self.events.emit(AccessEvent::ReaderFault {
                        device,
                        reason: error,
                    });
                }
                Some(other) => warn!("Unhandled reader event: {:?}", other),
                None => {
                    return Err(ControllerError::ReaderDisconnected(
                        "all readers stopped".to_string(),
                    ));
                }
            }
        }
    }
}
