//! Mock output device for testing and development.
//!
//! Records every level change per line with a timestamp so tests can assert
//! on pulse counts and widths. Writes that do not change a line's level are
//! dropped, which is exactly the idempotency contract of
//! [`OutputDevice`](crate::traits::OutputDevice).

use crate::{
    Result,
    traits::OutputDevice,
    types::{DeviceInfo, Level, LineId},
};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::time::Instant;

/// One recorded level change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineWrite {
    /// Line that changed.
    pub line: LineId,

    /// New level.
    pub level: Level,

    /// When the change happened (tokio clock, so paused-time tests are exact).
    pub at: Instant,
}

#[derive(Debug, Default)]
struct MockOutputState {
    levels: [Option<Level>; 3],
    history: Vec<LineWrite>,
    failing: [bool; 3],
    released: bool,
}

fn lock_state(state: &Mutex<MockOutputState>) -> MutexGuard<'_, MockOutputState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Mock output device.
///
/// # Examples
///
/// ```
/// use latchkey_hardware::mock::MockOutput;
/// use latchkey_hardware::traits::OutputDevice;
/// use latchkey_hardware::types::{Level, LineId};
///
/// #[tokio::main]
/// async fn main() -> latchkey_hardware::Result<()> {
///     let (output, handle) = MockOutput::new();
///
///     output.write_line(LineId::Lock, Level::Low).await?;
///     output.write_line(LineId::Lock, Level::Low).await?;
///
///     assert_eq!(handle.level(LineId::Lock), Some(Level::Low));
///     assert_eq!(handle.history_for(LineId::Lock).len(), 1);
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct MockOutput {
    state: Arc<Mutex<MockOutputState>>,
    name: String,
}

impl MockOutput {
    /// Create a new mock output with the default name.
    pub fn new() -> (Self, MockOutputHandle) {
        Self::with_name("Mock Output".to_string())
    }

    /// Create a new mock output with a custom name.
    pub fn with_name(name: String) -> (Self, MockOutputHandle) {
        let state = Arc::new(Mutex::new(MockOutputState::default()));
        let handle = MockOutputHandle {
            state: Arc::clone(&state),
        };
        (Self { state, name }, handle)
    }
}

impl Default for MockOutput {
    fn default() -> Self {
        Self::new().0
    }
}

impl OutputDevice for MockOutput {
    async fn write_line(&self, line: LineId, level: Level) -> Result<()> {
        let mut state = lock_state(&self.state);
        if state.failing[line.index()] {
            return Err(crate::HardwareError::line_write(line, "injected fault"));
        }
        if state.levels[line.index()] == Some(level) {
            return Ok(());
        }
        state.levels[line.index()] = Some(level);
        state.history.push(LineWrite {
            line,
            level,
            at: Instant::now(),
        });
        Ok(())
    }

    async fn release(&self) -> Result<()> {
        lock_state(&self.state).released = true;
        Ok(())
    }

    async fn get_info(&self) -> Result<DeviceInfo> {
        Ok(DeviceInfo::new(self.name.clone(), "Mock Output v1.0"))
    }
}

/// Handle for inspecting and controlling a mock output.
///
/// Clones share the same recorded state.
#[derive(Debug, Clone)]
pub struct MockOutputHandle {
    state: Arc<Mutex<MockOutputState>>,
}

impl MockOutputHandle {
    /// Current level of a line, `None` if never written.
    pub fn level(&self, line: LineId) -> Option<Level> {
        lock_state(&self.state).levels[line.index()]
    }

    /// Every recorded level change, oldest first.
    pub fn history(&self) -> Vec<LineWrite> {
        lock_state(&self.state).history.clone()
    }

    /// Recorded level changes of one line, oldest first.
    pub fn history_for(&self, line: LineId) -> Vec<LineWrite> {
        lock_state(&self.state)
            .history
            .iter()
            .filter(|w| w.line == line)
            .copied()
            .collect()
    }

    /// Number of times a line was driven to `level`.
    pub fn count_transitions_to(&self, line: LineId, level: Level) -> usize {
        lock_state(&self.state)
            .history
            .iter()
            .filter(|w| w.line == line && w.level == level)
            .count()
    }

    /// Forget recorded history, keeping current levels.
    pub fn clear_history(&self) {
        lock_state(&self.state).history.clear();
    }

    /// Make every write to `line` fail (or succeed again).
    pub fn set_failing(&self, line: LineId, failing: bool) {
        lock_state(&self.state).failing[line.index()] = failing;
    }

    /// Whether [`OutputDevice::release`] was called.
    pub fn is_released(&self) -> bool {
        lock_state(&self.state).released
    }
}
