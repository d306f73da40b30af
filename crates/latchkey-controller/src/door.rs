//! Door lock actuation.
//!
//! An unlock cycle releases the lock and lights the indicator, waits the
//! hold, re-engages the lock and beeps twice. Cycles never overlap: while one
//! is in flight further requests are answered with [`UnlockStatus::Busy`].
//!
//! # Fault handling
//!
//! If a line write fails mid-cycle the door is driven back to its locked
//! levels on a best-effort basis, its state becomes `Locked` and an
//! `ActuationFault` event is emitted.

use crate::config::LineLevels;
use crate::error::{ControllerError, Result};
use crate::events::{AccessEvent, EventLog};
use crate::indicator::{IndicatorDriver, PulseSpec};
use latchkey_core::DoorState;
use latchkey_hardware::{AnyOutputDevice, HardwareError, LineId, OutputDevice};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{debug, warn};

/// Answer to an unlock request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnlockStatus {
    /// A new unlock cycle was started.
    Started,

    /// A cycle was already in flight; the request was dropped.
    Busy,
}

struct DoorInner {
    output: Arc<AnyOutputDevice>,
    indicator: IndicatorDriver,
    levels: LineLevels,
    events: EventLog,
    in_flight: AtomicBool,
    state: watch::Sender<DoorState>,
    cycles: Mutex<JoinSet<()>>,
}

/// Owns the lock and lock-indicator lines.
///
/// Cheap to clone; clones drive the same door.
#[derive(Clone)]
pub struct DoorActuator {
    inner: Arc<DoorInner>,
}

impl std::fmt::Debug for DoorActuator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DoorActuator")
            .field("state", &self.state())
            .field("busy", &self.is_busy())
            .finish_non_exhaustive()
    }
}

/// Releases the in-flight claim when the cycle ends, however it ends.
struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl DoorActuator {
    /// Create an actuator. The door is assumed locked; call
    /// [`secure`](Self::secure) to drive the lines accordingly.
    pub fn new(
        output: Arc<AnyOutputDevice>,
        indicator: IndicatorDriver,
        levels: LineLevels,
        events: EventLog,
    ) -> Self {
        let (state, _) = watch::channel(DoorState::Locked);
        Self {
            inner: Arc::new(DoorInner {
                output,
                indicator,
                levels,
                events,
                in_flight: AtomicBool::new(false),
                state,
                cycles: Mutex::new(JoinSet::new()),
            }),
        }
    }

    /// Current door state.
    pub fn state(&self) -> DoorState {
        *self.inner.state.borrow()
    }

    /// Watch door state changes.
    pub fn subscribe(&self) -> watch::Receiver<DoorState> {
        self.inner.state.subscribe()
    }

    /// Whether an unlock cycle is in flight.
    pub fn is_busy(&self) -> bool {
        self.inner.in_flight.load(Ordering::Acquire)
    }

    fn try_claim(&self) -> bool {
        self.inner
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Run a full unlock cycle and wait for it to finish.
    ///
    /// # Errors
    ///
    /// Returns `ControllerError::ActuationFault` if a line could not be
    /// driven; the door is left locked.
    pub async fn unlock(&self, hold: Duration) -> Result<UnlockStatus> {
        if !self.try_claim() {
            return Ok(UnlockStatus::Busy);
        }
        let _flight = InFlight(&self.inner.in_flight);
        self.run_cycle(hold).await?;
        Ok(UnlockStatus::Started)
    }

    /// Start an unlock cycle on a tracked task and return immediately.
    pub fn request_unlock(&self, hold: Duration) -> UnlockStatus {
        if !self.try_claim() {
            return UnlockStatus::Busy;
        }

        let mut cycles = self
            .inner
            .cycles
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        while cycles.try_join_next().is_some() {}

        let door = self.clone();
        cycles.spawn(async move {
            let _flight = InFlight(&door.inner.in_flight);
            // Faults are reported as events inside the cycle.
            let _ = door.run_cycle(hold).await;
        });
        UnlockStatus::Started
    }

    async fn run_cycle(&self, hold: Duration) -> Result<()> {
        let inner = &self.inner;
        let levels = &inner.levels;

        inner.events.emit(AccessEvent::DoorOpening { hold });
        if let Err(e) = inner.output.write_line(LineId::Lock, levels.lock_unlocked).await {
            return Err(self.fail_safe(e).await);
        }

        // The lock is already released; a startup flash on the indicator is
        // cut short rather than waited for.
        let indicator_line = inner.indicator.preempt_line(LineId::LockIndicator).await;
        if let Err(e) = inner
            .output
            .write_line(LineId::LockIndicator, levels.indicator_open)
            .await
        {
            return Err(self.fail_safe(e).await);
        }
        self.set_state(DoorState::Unlocked);

        tokio::time::sleep(hold).await;

        if let Err(e) = self.drive_locked().await {
            return Err(self.fail_safe(e).await);
        }
        self.set_state(DoorState::Locked);
        inner.events.emit(AccessEvent::DoorLocked);
        drop(indicator_line);

        if let Err(e) = inner
            .indicator
            .pulse(PulseSpec::relock_confirm(levels.buzzer_idle))
            .await
        {
            warn!("Relock confirmation pulse failed: {}", e);
        }
        Ok(())
    }

    async fn drive_locked(&self) -> latchkey_hardware::Result<()> {
        let levels = &self.inner.levels;
        self.inner
            .output
            .write_line(LineId::Lock, levels.lock_locked())
            .await?;
        self.inner
            .output
            .write_line(LineId::LockIndicator, levels.indicator_closed())
            .await
    }

    /// Best-effort return to locked levels after a write failure.
    async fn fail_safe(&self, error: HardwareError) -> ControllerError {
        let levels = &self.inner.levels;
        for (line, level) in [
            (LineId::Lock, levels.lock_locked()),
            (LineId::LockIndicator, levels.indicator_closed()),
        ] {
            if let Err(e) = self.inner.output.write_line(line, level).await {
                warn!("Could not restore {} to {}: {}", line, level, e);
            }
        }
        self.inner.state.send_replace(DoorState::Locked);
        self.inner.events.emit(AccessEvent::ActuationFault {
            reason: error.to_string(),
        });
        ControllerError::from(error)
    }

    fn set_state(&self, target: DoorState) {
        self.inner.state.send_modify(|state| match state.transition_to(target) {
            Ok(next) => *state = next,
            Err(e) => {
                warn!("{}", e);
                *state = target;
            }
        });
    }

    /// Drive the lock and indicator lines to their locked levels.
    ///
    /// # Errors
    ///
    /// Returns `ControllerError::ActuationFault` if a line could not be driven.
    pub async fn secure(&self) -> Result<()> {
        self.drive_locked().await?;
        self.inner.state.send_replace(DoorState::Locked);
        Ok(())
    }

    /// Wait for an in-flight unlock cycle to relock.
    pub async fn shutdown(&self) {
        let mut cycles = std::mem::take(
            &mut *self
                .inner
                .cycles
                .lock()
                .unwrap_or_else(PoisonError::into_inner),
        );
        if !cycles.is_empty() {
            debug!("Waiting for unlock cycle to finish");
        }
        while let Some(result) = cycles.join_next().await {
            if let Err(e) = result {
                warn!("Unlock cycle task failed: {}", e);
            }
        }
    }
}
