//! Mock credential reader for testing and development.
//!
//! This module provides a simulated reader that can be fed decoded frames
//! programmatically, without a physical reader or decoder.

use crate::{
    Result,
    traits::ReaderDevice,
    types::{DecodedEvent, DeviceInfo},
};
use latchkey_core::constants::{KEYPAD_CANCEL, KEYPAD_FRAME_BITS, KEYPAD_SUBMIT};
use tokio::sync::mpsc;

/// Mock reader device for testing and development.
///
/// This device simulates a reader by receiving frames through an internal
/// channel. Tests send frames through a [`MockReaderHandle`].
///
/// # Examples
///
/// ```
/// use latchkey_hardware::mock::MockReader;
/// use latchkey_hardware::traits::ReaderDevice;
///
/// #[tokio::main]
/// async fn main() -> latchkey_hardware::Result<()> {
///     let (mut reader, handle) = MockReader::new();
///
///     tokio::spawn(async move {
///         handle.send_pin(&[1, 2]).await.unwrap();
///     });
///
///     assert_eq!(reader.read_event().await?.value, 1);
///     assert_eq!(reader.read_event().await?.value, 2);
///     assert_eq!(reader.read_event().await?.value, 11);
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct MockReader {
    /// Channel receiver for simulated frames
    event_rx: mpsc::Receiver<DecodedEvent>,

    /// Device name
    name: String,
}

impl MockReader {
    /// Create a new mock reader with the default name.
    ///
    /// Returns a tuple of (MockReader, MockReaderHandle) where the handle
    /// is used to feed frames to the reader.
    pub fn new() -> (Self, MockReaderHandle) {
        Self::with_name("Mock Reader".to_string())
    }

    /// Create a new mock reader with a custom name.
    pub fn with_name(name: String) -> (Self, MockReaderHandle) {
        let (event_tx, event_rx) = mpsc::channel(32);

        let reader = Self {
            event_rx,
            name: name.clone(),
        };

        let handle = MockReaderHandle { event_tx, name };

        (reader, handle)
    }
}

impl Default for MockReader {
    fn default() -> Self {
        Self::new().0
    }
}

impl ReaderDevice for MockReader {
    async fn read_event(&mut self) -> Result<DecodedEvent> {
        self.event_rx
            .recv()
            .await
            .ok_or_else(|| crate::HardwareError::disconnected("Reader event channel closed"))
    }

    async fn get_info(&self) -> Result<DeviceInfo> {
        Ok(DeviceInfo::new(self.name.clone(), "Mock Reader v1.0"))
    }
}

/// Handle for feeding a mock reader.
///
/// Can be cloned and shared across tasks. Dropping every handle disconnects
/// the reader.
#[derive(Debug, Clone)]
pub struct MockReaderHandle {
    /// Channel sender for simulated frames
    event_tx: mpsc::Sender<DecodedEvent>,

    /// Device name
    name: String,
}

impl MockReaderHandle {
    /// Send a raw decoded frame.
    ///
    /// # Errors
    ///
    /// Returns an error if the reader has been dropped and the channel is closed.
    pub async fn send_frame(&self, bits: u8, value: u64) -> Result<()> {
        self.event_tx
            .send(DecodedEvent::new(bits, value))
            .await
            .map_err(|_| crate::HardwareError::disconnected("Reader event channel closed"))
    }

    /// Send one keypad key press (a 4-bit frame).
    pub async fn send_key(&self, value: u64) -> Result<()> {
        self.send_frame(KEYPAD_FRAME_BITS, value).await
    }

    /// Send a sequence of keypad digits.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Any digit is greater than 9
    /// - The reader has been dropped and the channel is closed
    pub async fn send_digits(&self, digits: &[u8]) -> Result<()> {
        for &digit in digits {
            if digit > 9 {
                return Err(crate::HardwareError::invalid_data(format!(
                    "Digit must be 0-9, got {}",
                    digit
                )));
            }
            self.send_key(u64::from(digit)).await?;
        }
        Ok(())
    }

    /// Send a complete PIN followed by the submit key.
    pub async fn send_pin(&self, digits: &[u8]) -> Result<()> {
        self.send_digits(digits).await?;
        self.send_key(KEYPAD_SUBMIT).await
    }

    /// Send the cancel key.
    pub async fn send_cancel(&self) -> Result<()> {
        self.send_key(KEYPAD_CANCEL).await
    }

    /// Send a badge scan as a single frame of the given width.
    pub async fn send_badge(&self, bits: u8, value: u64) -> Result<()> {
        self.send_frame(bits, value).await
    }

    /// Get the device name.
    pub fn name(&self) -> &str {
        &self.name
    }
}
