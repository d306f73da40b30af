//! Hardware device trait definitions.
//!
//! This module defines the two seams between the controller core and the
//! physical world: a reader that yields decoded frames and an output device
//! that sets named lines to a logic level. Mock and real implementations are
//! interchangeable behind these traits.
//!
//! All traits use native `async fn` methods (Rust 1.90 + Edition 2024 RPITIT),
//! eliminating the need for the `async_trait` macro.

#![allow(async_fn_in_trait)]

use crate::error::Result;
use crate::types::{DecodedEvent, DeviceInfo, Level, LineId};

/// Credential reader abstraction.
///
/// Produces already-decoded frames. Bit timing, parity and framing belong to
/// the decoder behind the implementation.
///
/// # Object Safety and Dynamic Dispatch
///
/// **NOTE**: This trait is NOT object-safe because `async fn` methods return
/// `impl Future`. Use generic parameters, or the enum wrapper from the
/// [`devices`](crate::devices) module where a concrete type is required
/// (for example when the reader is moved into a spawned task).
///
/// # Examples
///
/// ```no_run
/// use latchkey_hardware::traits::ReaderDevice;
/// use latchkey_hardware::error::Result;
///
/// async fn next_width<R: ReaderDevice>(reader: &mut R) -> Result<u8> {
///     let event = reader.read_event().await?;
///     Ok(event.bits)
/// }
/// ```
pub trait ReaderDevice: Send + Sync {
    /// Read the next decoded frame.
    ///
    /// Waits asynchronously until a frame is available.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The device is disconnected
    /// - A communication error occurs
    async fn read_event(&mut self) -> Result<DecodedEvent>;

    /// Get device information.
    async fn get_info(&self) -> Result<DeviceInfo>;
}

/// Binary output line capability.
///
/// Writes are idempotent: setting a line to the level it already has must
/// have no observable side effect. Methods take `&self` because the lock
/// actuator and the indicator driver share one device.
///
/// # Examples
///
/// ```no_run
/// use latchkey_hardware::traits::OutputDevice;
/// use latchkey_hardware::types::{Level, LineId};
/// use latchkey_hardware::error::Result;
///
/// async fn silence<O: OutputDevice>(output: &O) -> Result<()> {
///     output.write_line(LineId::Buzzer, Level::High).await
/// }
/// ```
pub trait OutputDevice: Send + Sync {
    /// Drive a line to a level.
    ///
    /// # Errors
    ///
    /// Returns `HardwareError::LineWrite` if the level could not be applied.
    async fn write_line(&self, line: LineId, level: Level) -> Result<()>;

    /// Release the underlying lines (unexport, close handles).
    ///
    /// Called once during shutdown after all lines reached their safe levels.
    async fn release(&self) -> Result<()>;

    /// Get device information.
    async fn get_info(&self) -> Result<DeviceInfo>;
}
