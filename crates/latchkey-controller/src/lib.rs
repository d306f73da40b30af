//! Access decision and actuation logic for the Latchkey door controller.
//!
//! Decoded reader frames flow through the components in one direction:
//!
//! ```text
//! ReaderHandle -> EventDispatcher -> InputStateMachine -> Authenticator
//!                                           |
//!                                           +-> DoorActuator -> IndicatorDriver
//!                                           +-> IndicatorDriver (denial / fault)
//! ```
//!
//! - [`EventDispatcher`] classifies each frame as a keypad key or a badge
//!   credential.
//! - [`InputStateMachine`] accumulates keypad digits under an inter-digit
//!   timeout and routes complete credentials to the [`Authenticator`].
//! - [`DoorActuator`] runs one unlock cycle at a time and reports the door
//!   state through a `watch` channel.
//! - [`IndicatorDriver`] runs buzzer and indicator pulse patterns, serialized
//!   per line.
//! - [`EventLog`] logs every [`AccessEvent`] through `tracing` and broadcasts
//!   it to subscribers.
//!
//! [`AccessController`] wires these together and owns startup and teardown.
//!
//! # Examples
//!
//! ```no_run
//! use latchkey_controller::{AccessController, ControllerConfig};
//! use latchkey_hardware::mock::{MockOutput, MockReader};
//! use latchkey_hardware::{AnyOutputDevice, AnyReaderDevice, ReaderManager};
//!
//! # async fn example() -> latchkey_controller::Result<()> {
//! let config = ControllerConfig::default();
//! let source = config.authorization.open()?;
//! let (output, _lines) = MockOutput::new();
//! let controller = AccessController::new(config, AnyOutputDevice::Mock(output), source)?;
//!
//! let (reader, keypad) = MockReader::new();
//! let mut manager = ReaderManager::default();
//! manager.register_reader(AnyReaderDevice::Mock(reader));
//! let mut readers = manager.start();
//!
//! controller.start().await?;
//! keypad.send_pin(&[1, 2, 3, 4]).await.ok();
//! controller.shutdown_token().cancel();
//! controller.run(&mut readers).await?;
//! controller.shutdown(readers).await?;
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod config;
pub mod controller;
pub mod dispatcher;
pub mod door;
pub mod error;
pub mod events;
pub mod indicator;
pub mod input;

pub use auth::Authenticator;
pub use config::{AuthorizationConfig, ControllerConfig, LineLevels};
pub use controller::AccessController;
pub use dispatcher::{EventDispatcher, ReaderInput};
pub use door::{DoorActuator, UnlockStatus};
pub use error::{ControllerError, Result};
pub use events::{AccessEvent, EventLog, Severity};
pub use indicator::{IndicatorDriver, PulseSpec};
pub use input::{AccessOutcome, InputSettings, InputStateMachine};
