//! Timed on/off pulse sequences on binary output lines.
//!
//! Pulses on the same line are serialized by a per-line async mutex; pulses on
//! different lines run concurrently. Fire-and-forget pulses run on tracked
//! tasks that are cancelled together on shutdown, and the pulses of a single
//! line can be cut short with [`IndicatorDriver::preempt_line`]. However a
//! pulse ends, its line is left at the idle level.

use latchkey_core::constants::{
    DENIAL_PULSE_ON_MS, RELOCK_PULSE_COUNT, RELOCK_PULSE_MS, SOURCE_FAULT_PULSE_COUNT,
    SOURCE_FAULT_PULSE_MS, STARTUP_PULSE_COUNT, STARTUP_PULSE_MS,
};
use latchkey_hardware::{AnyOutputDevice, Level, LineId, OutputDevice};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::{Mutex as LineLock, MutexGuard};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// One pulse sequence: `repeat` cycles of the active level for `on`, then the
/// idle level for `off`. The active level is the inverse of `idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PulseSpec {
    pub line: LineId,
    pub on: Duration,
    pub off: Duration,
    pub repeat: u32,
    pub idle: Level,
}

impl PulseSpec {
    /// Level driven during the "on" phase.
    pub fn active(&self) -> Level {
        self.idle.inverted()
    }

    /// One long buzz: wrong credential, cancelled or timed-out entry.
    pub fn denial(buzzer_idle: Level) -> Self {
        Self {
            line: LineId::Buzzer,
            on: Duration::from_millis(DENIAL_PULSE_ON_MS),
            off: Duration::ZERO,
            repeat: 1,
            idle: buzzer_idle,
        }
    }

    /// Two short beeps after the lock re-engages.
    pub fn relock_confirm(buzzer_idle: Level) -> Self {
        Self {
            line: LineId::Buzzer,
            on: Duration::from_millis(RELOCK_PULSE_MS),
            off: Duration::from_millis(RELOCK_PULSE_MS),
            repeat: RELOCK_PULSE_COUNT,
            idle: buzzer_idle,
        }
    }

    /// Four short flashes of `line` at startup.
    pub fn startup(line: LineId, idle: Level) -> Self {
        Self {
            line,
            on: Duration::from_millis(STARTUP_PULSE_MS),
            off: Duration::from_millis(STARTUP_PULSE_MS),
            repeat: STARTUP_PULSE_COUNT,
            idle,
        }
    }

    /// Three medium beeps: the authorization table could not be read.
    pub fn source_fault(buzzer_idle: Level) -> Self {
        Self {
            line: LineId::Buzzer,
            on: Duration::from_millis(SOURCE_FAULT_PULSE_MS),
            off: Duration::from_millis(SOURCE_FAULT_PULSE_MS),
            repeat: SOURCE_FAULT_PULSE_COUNT,
            idle: buzzer_idle,
        }
    }
}

struct IndicatorInner {
    output: Arc<AnyOutputDevice>,
    line_locks: [LineLock<()>; 3],
    // Children of `cancel`, replaced each time their line is preempted.
    line_stops: [Mutex<CancellationToken>; 3],
    cancel: CancellationToken,
    tasks: Mutex<JoinSet<()>>,
}

/// Drives pulse sequences on the output lines.
///
/// Cheap to clone; clones share the line locks, the task set and the
/// cancellation token.
#[derive(Clone)]
pub struct IndicatorDriver {
    inner: Arc<IndicatorInner>,
}

impl std::fmt::Debug for IndicatorDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndicatorDriver")
            .field("cancelled", &self.inner.cancel.is_cancelled())
            .finish_non_exhaustive()
    }
}

impl IndicatorDriver {
    /// Create a driver over a shared output device.
    pub fn new(output: Arc<AnyOutputDevice>) -> Self {
        let cancel = CancellationToken::new();
        Self {
            inner: Arc::new(IndicatorInner {
                output,
                line_locks: [LineLock::new(()), LineLock::new(()), LineLock::new(())],
                line_stops: std::array::from_fn(|_| Mutex::new(cancel.child_token())),
                cancel,
                tasks: Mutex::new(JoinSet::new()),
            }),
        }
    }

    /// Take exclusive use of a line until the guard is dropped.
    ///
    /// Pulses on the line wait for the guard; the door holds it on the lock
    /// indicator for a whole unlock cycle.
    pub async fn claim_line(&self, line: LineId) -> MutexGuard<'_, ()> {
        self.inner.line_locks[line.index()].lock().await
    }

    /// Stop the running and queued pulses on a line, then claim it.
    ///
    /// The stopped pulses leave the line idle. Pulses started after this
    /// call wait for the guard as with [`claim_line`](Self::claim_line).
    pub async fn preempt_line(&self, line: LineId) -> MutexGuard<'_, ()> {
        {
            let mut stop = self.inner.line_stops[line.index()]
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            stop.cancel();
            *stop = self.inner.cancel.child_token();
        }
        self.claim_line(line).await
    }

    fn line_stop(&self, line: LineId) -> CancellationToken {
        self.inner.line_stops[line.index()]
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Run a pulse sequence to completion.
    ///
    /// Waits for any earlier pulse on the same line. Returns early, with the
    /// line at its idle level, once the driver is shut down or the line is
    /// preempted.
    ///
    /// # Errors
    ///
    /// Returns the first line write failure after attempting to restore the
    /// idle level.
    pub async fn pulse(&self, spec: PulseSpec) -> latchkey_hardware::Result<()> {
        self.pulse_until(spec, self.line_stop(spec.line)).await
    }

    async fn pulse_until(
        &self,
        spec: PulseSpec,
        stop: CancellationToken,
    ) -> latchkey_hardware::Result<()> {
        let _line = tokio::select! {
            biased;
            () = stop.cancelled() => return Ok(()),
            guard = self.claim_line(spec.line) => guard,
        };
        if stop.is_cancelled() {
            return Ok(());
        }

        debug!(
            "Pulsing {}: {:?} on / {:?} off x {}",
            spec.line, spec.on, spec.off, spec.repeat
        );

        let result = self.run_cycles(&spec, &stop).await;
        if result.is_err() {
            let _ = self.inner.output.write_line(spec.line, spec.idle).await;
        }
        result
    }

    async fn run_cycles(
        &self,
        spec: &PulseSpec,
        stop: &CancellationToken,
    ) -> latchkey_hardware::Result<()> {
        let output = &self.inner.output;
        for _ in 0..spec.repeat {
            output.write_line(spec.line, spec.active()).await?;
            let completed = wait(spec.on, stop).await;
            output.write_line(spec.line, spec.idle).await?;
            if !completed || !wait(spec.off, stop).await {
                break;
            }
        }
        Ok(())
    }

    /// Start a pulse on a tracked task and return immediately.
    ///
    /// Ignored once the driver is shut down.
    pub fn spawn(&self, spec: PulseSpec) {
        if self.inner.cancel.is_cancelled() {
            return;
        }

        let mut tasks = self
            .inner
            .tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        while let Some(finished) = tasks.try_join_next() {
            if let Err(e) = finished
                && e.is_panic()
            {
                warn!("Pulse task panicked: {}", e);
            }
        }

        // Taken now so a preemption before the task first runs still applies.
        let stop = self.line_stop(spec.line);
        let driver = self.clone();
        tasks.spawn(async move {
            if let Err(e) = driver.pulse_until(spec, stop).await {
                warn!("Pulse on {} failed: {}", spec.line, e);
            }
        });
    }

    /// Number of pulse tasks not yet reaped.
    pub fn pending_tasks(&self) -> usize {
        self.inner
            .tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether [`shutdown`](Self::shutdown) has been called.
    pub fn is_shut_down(&self) -> bool {
        self.inner.cancel.is_cancelled()
    }

    /// Cancel every pulse and wait for the tasks to finish.
    ///
    /// Cancelled pulses restore their line's idle level before exiting.
    pub async fn shutdown(&self) {
        self.inner.cancel.cancel();

        let mut tasks = std::mem::take(
            &mut *self
                .inner
                .tasks
                .lock()
                .unwrap_or_else(PoisonError::into_inner),
        );
        while let Some(result) = tasks.join_next().await {
            if let Err(e) = result
                && e.is_panic()
            {
                warn!("Pulse task panicked: {}", e);
            }
        }
    }
}

/// Sleep unless `stop` fires first; `false` means stopped.
async fn wait(duration: Duration, stop: &CancellationToken) -> bool {
    if duration.is_zero() {
        return !stop.is_cancelled();
    }
    tokio::select! {
        () = tokio::time::sleep(duration) => true,
        () = stop.cancelled() => false,
    }
}
