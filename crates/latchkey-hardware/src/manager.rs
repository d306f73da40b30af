//! Reader task manager.
//!
//! The `ReaderManager` moves each registered reader into its own task and
//! funnels the decoded frames into one channel, so the controller's dispatch
//! loop never blocks on device I/O.
//!
//! ```text
//! ┌──────────┐       ┌─────────────────┐
//! │ Reader   │──────►│                 │
//! │ Task     │       │  Event Channel  │
//! └──────────┘       │  (mpsc)         │──────► EventDispatcher
//!                    │                 │
//! ┌──────────┐       │                 │
//! │ Reader   │──────►│                 │
//! │ Task     │       └─────────────────┘
//! └──────────┘
//! ```
//!
//! # Examples
//!
//! ```no_run
//! use latchkey_hardware::manager::{ReaderEvent, ReaderManager};
//! use latchkey_hardware::devices::AnyReaderDevice;
//! use latchkey_hardware::mock::MockReader;
//!
//! #[tokio::main]
//! async fn main() -> latchkey_hardware::Result<()> {
//!     let mut manager = ReaderManager::default();
//!
//!     let (reader, _handle) = MockReader::new();
//!     manager.register_reader(AnyReaderDevice::Mock(reader));
//!
//!     let mut handle = manager.start();
//!     while let Some(event) = handle.recv().await {
//!         if let ReaderEvent::Decoded(frame) = event {
//!             println!("{} bits: {}", frame.bits, frame.value);
//!         }
//!     }
//!
//!     handle.shutdown().await?;
//!     Ok(())
//! }
//! ```

use crate::devices::AnyReaderDevice;
use crate::traits::ReaderDevice;
use crate::{DecodedEvent, Result};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinSet;
use tracing::{debug, warn};

/// Default capacity of the shared event channel.
pub const DEFAULT_EVENT_CAPACITY: usize = 100;

/// Pause applied when the consumer falls behind, before a blocking send.
const BACKPRESSURE_DELAY: Duration = Duration::from_millis(100);

/// Event delivered by a reader task.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub enum ReaderEvent {
    /// A frame decoded by the reader.
    Decoded(DecodedEvent),

    /// The reader failed. Its task terminates after sending this event.
    DeviceError {
        /// Name of the reader that failed.
        device: String,

        /// Error message.
        error: String,
    },
}

/// Handle for receiving reader events.
///
/// Returned by [`ReaderManager::start`]. It owns the reader tasks; dropping it
/// without calling [`shutdown`](Self::shutdown) detaches them.
pub struct ReaderHandle {
    event_rx: mpsc::Receiver<ReaderEvent>,
    tasks: JoinSet<Result<()>>,
}

impl ReaderHandle {
    /// Receive the next event from any reader.
    ///
    /// Returns `None` once every reader task has terminated.
    pub async fn recv(&mut self) -> Option<ReaderEvent> {
        self.event_rx.recv().await
    }

    /// Stop every reader task and wait for it to terminate.
    ///
    /// Aborting a task drops its device. Task errors and panics are logged
    /// but do not fail the shutdown.
    pub async fn shutdown(mut self) -> Result<()> {
        self.tasks.abort_all();

        let mut error_count = 0;
        let mut panic_count = 0;

        while let Some(result) = self.tasks.join_next().await {
            match Self::classify_task_result(result) {
                TaskTermination::Success | TaskTermination::Cancelled => {}
                TaskTermination::Error => error_count += 1,
                TaskTermination::Panic => panic_count += 1,
            }
        }

        if error_count + panic_count > 0 {
            warn!(
                "Reader tasks stopped with {} errors and {} panics",
                error_count, panic_count
            );
        } else {
            debug!("Reader tasks stopped");
        }

        Ok(())
    }

    fn classify_task_result(
        result: std::result::Result<Result<()>, tokio::task::JoinError>,
    ) -> TaskTermination {
        match result {
            Ok(Ok(())) => TaskTermination::Success,
            Ok(Err(_)) => TaskTermination::Error,
            Err(e) if e.is_cancelled() => TaskTermination::Cancelled,
            Err(_) => TaskTermination::Panic,
        }
    }
}

impl std::fmt::Debug for ReaderHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReaderHandle")
            .field("tasks", &self.tasks.len())
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TaskTermination {
    Success,
    Error,
    /// Expected during shutdown.
    Cancelled,
    Panic,
}

/// Collects reader devices and runs each one in its own task.
///
/// # Lifecycle
///
/// 1. Create the manager
/// 2. Register readers with [`register_reader`](Self::register_reader)
/// 3. Call [`start`](Self::start) to spawn the tasks
/// 4. Receive events through the returned [`ReaderHandle`]
pub struct ReaderManager {
    readers: Vec<AnyReaderDevice>,
    event_tx: mpsc::Sender<ReaderEvent>,
    event_rx: mpsc::Receiver<ReaderEvent>,
}

impl ReaderManager {
    /// Create a manager whose event channel holds `capacity` events.
    pub fn new(capacity: usize) -> Self {
        let (event_tx, event_rx) = mpsc::channel(capacity.max(1));
        Self {
            readers: Vec::new(),
            event_tx,
            event_rx,
        }
    }

    /// Register a reader to be started by [`start`](Self::start).
    pub fn register_reader(&mut self, device: AnyReaderDevice) {
        self.readers.push(device);
    }

    /// Number of registered readers.
    pub fn reader_count(&self) -> usize {
        self.readers.len()
    }

    /// Spawn one task per registered reader and return the event handle.
    ///
    /// The channel closes once every task has terminated, so
    /// [`ReaderHandle::recv`] returning `None` means no reader is left.
    pub fn start(self) -> ReaderHandle {
        let Self {
            readers,
            event_tx,
            event_rx,
        } = self;

        let mut tasks = JoinSet::new();
        for device in readers {
            tasks.spawn(Self::reader_task(device, event_tx.clone()));
        }

        ReaderHandle { event_rx, tasks }
    }

    async fn reader_task(mut device: AnyReaderDevice, tx: mpsc::Sender<ReaderEvent>) -> Result<()> {
        let name = match device.get_info().await {
            Ok(info) => info.name,
            Err(_) => "reader".to_string(),
        };
        debug!("Reader task started for {}", name);

        loop {
            match device.read_event().await {
                Ok(event) => match tx.try_send(ReaderEvent::Decoded(event)) {
                    Ok(()) => {}
                    Err(TrySendError::Full(event)) => {
                        debug!("Reader event channel full, applying backpressure");
                        tokio::time::sleep(BACKPRESSURE_DELAY).await;
                        if tx.send(event).await.is_err() {
                            break;
                        }
                    }
                    Err(TrySendError::Closed(_)) => break,
                },
                Err(e) => {
                    let _ = tx
                        .send(ReaderEvent::DeviceError {
                            device: name,
                            error: e.to_string(),
                        })
                        .await;
                    return Err(e);
                }
            }
        }
        Ok(())
    }
}

impl Default for ReaderManager {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_CAPACITY)
    }
}

impl std::fmt::Debug for ReaderManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReaderManager")
            .field("readers", &self.readers)
            .finish_non_exhaustive()
    }
}
