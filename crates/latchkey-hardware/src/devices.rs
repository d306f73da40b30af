//! Enum wrappers for hardware device dispatch.
//!
//! Native `async fn` in traits is not object-safe, so `Box<dyn OutputDevice>`
//! is not available. The wrappers here give the controller one concrete type
//! per capability while keeping every backend interchangeable.
//!
//! # Examples
//!
//! ```
//! use latchkey_hardware::devices::AnyOutputDevice;
//! use latchkey_hardware::mock::MockOutput;
//!
//! let (output, _handle) = MockOutput::new();
//! let output = AnyOutputDevice::Mock(output);
//! ```

use crate::mock::{MockOutput, MockReader};
use crate::stream::StreamReader;
use crate::sysfs::SysfsOutput;
use crate::traits::{OutputDevice, ReaderDevice};
use crate::{DecodedEvent, DeviceInfo, Level, LineId, Result};

/// Enum wrapper for output device dispatch.
///
/// # Examples
///
/// ```
/// use latchkey_hardware::devices::AnyOutputDevice;
/// use latchkey_hardware::traits::OutputDevice;
/// use latchkey_hardware::mock::MockOutput;
/// use latchkey_hardware::types::{Level, LineId};
///
/// #[tokio::main]
/// async fn main() -> latchkey_hardware::Result<()> {
///     let (output, handle) = MockOutput::new();
///     let output = AnyOutputDevice::Mock(output);
///
///     output.write_line(LineId::Buzzer, Level::High).await?;
///     assert_eq!(handle.level(LineId::Buzzer), Some(Level::High));
///     Ok(())
/// }
/// ```
#[derive(Debug)]
#[non_exhaustive]
pub enum AnyOutputDevice {
    /// Mock output for development and testing.
    Mock(MockOutput),

    /// Linux sysfs GPIO lines.
    Sysfs(SysfsOutput),
}

impl OutputDevice for AnyOutputDevice {
    async fn write_line(&self, line: LineId, level: Level) -> Result<()> {
        match self {
            Self::Mock(device) => device.write_line(line, level).await,
            Self::Sysfs(device) => device.write_line(line, level).await,
        }
    }

    async fn release(&self) -> Result<()> {
        match self {
            Self::Mock(device) => device.release().await,
            Self::Sysfs(device) => device.release().await,
        }
    }

    async fn get_info(&self) -> Result<DeviceInfo> {
        match self {
            Self::Mock(device) => device.get_info().await,
            Self::Sysfs(device) => device.get_info().await,
        }
    }
}

/// Enum wrapper for reader device dispatch.
///
/// This is the type the [`ReaderManager`](crate::manager::ReaderManager)
/// moves into its reader task.
#[derive(Debug)]
#[non_exhaustive]
pub enum AnyReaderDevice {
    /// Mock reader for development and testing.
    Mock(MockReader),

    /// Text stream fed by an external decoder.
    Stream(StreamReader),
}

impl ReaderDevice for AnyReaderDevice {
    async fn read_event(&mut self) -> Result<DecodedEvent> {
        match self {
            Self::Mock(device) => device.read_event().await,
            Self::Stream(device) => device.read_event().await,
        }
    }

    async fn get_info(&self) -> Result<DeviceInfo> {
        match self {
            Self::Mock(device) => device.get_info().await,
            Self::Stream(device) => device.get_info().await,
        }
    }
}
