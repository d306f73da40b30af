//! Hardware abstraction layer for the Latchkey door controller.
//!
//! The controller touches the physical world through two capabilities:
//!
//! - a **reader** that yields already-decoded `(bits, value)` frames from a
//!   keypad or badge reader, and
//! - an **output device** that sets named lines (lock, lock indicator,
//!   buzzer) to a logic level.
//!
//! Both are traits with native `async fn` methods (Rust 1.90 + Edition 2024
//! RPITIT). Enum wrappers in [`devices`] provide concrete dispatch where a
//! single type is needed.
//!
//! # Reading frames
//!
//! ```no_run
//! use latchkey_hardware::traits::ReaderDevice;
//! use latchkey_hardware::error::Result;
//!
//! async fn next_key<R: ReaderDevice>(reader: &mut R) -> Result<Option<u64>> {
//!     let event = reader.read_event().await?;
//!     Ok((event.bits == 4).then_some(event.value))
//! }
//! ```
//!
//! # Driving lines
//!
//! ```no_run
//! use latchkey_hardware::traits::OutputDevice;
//! use latchkey_hardware::types::{Level, LineId};
//! use latchkey_hardware::error::Result;
//!
//! async fn beep<O: OutputDevice>(output: &O) -> Result<()> {
//!     output.write_line(LineId::Buzzer, Level::Low).await?;
//!     tokio::time::sleep(std::time::Duration::from_millis(100)).await;
//!     output.write_line(LineId::Buzzer, Level::High).await
//! }
//! ```
//!
//! # Implementations
//!
//! - [`mock`]: channel-fed reader and recording output with control handles
//! - [`sysfs`]: Linux `/sys/class/gpio` output lines
//! - [`stream`]: reader consuming text frames from an external decoder

pub mod devices;
pub mod error;
pub mod manager;
pub mod mock;
pub mod stream;
pub mod sysfs;
pub mod traits;
pub mod types;

// Re-export commonly used types for convenience
pub use devices::{AnyOutputDevice, AnyReaderDevice};
pub use error::{HardwareError, Result};
pub use manager::{ReaderEvent, ReaderHandle, ReaderManager};
pub use traits::{OutputDevice, ReaderDevice};
pub use types::{DecodedEvent, DeviceInfo, Level, LineId, LinePins};
