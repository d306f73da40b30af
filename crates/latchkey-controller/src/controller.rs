//! Controller lifecycle: wiring, startup and teardown.

use crate::auth::Authenticator;
use crate::config::{ControllerConfig, LineLevels};
use crate::dispatcher::EventDispatcher;
use crate::door::DoorActuator;
use crate::error::Result;
use crate::events::{AccessEvent, EventLog};
use crate::indicator::{IndicatorDriver, PulseSpec};
use crate::input::{InputSettings, InputStateMachine};
use latchkey_core::DoorState;
use latchkey_hardware::{AnyOutputDevice, LineId, OutputDevice, ReaderHandle};
use latchkey_storage::AnyAuthorizationSource;
use std::sync::Arc;
use tokio::sync::{broadcast, watch};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// A fully wired single-door controller.
///
/// # Lifecycle
///
/// 1. [`new`](Self::new) wires the components; nothing touches the lines yet
/// 2. [`start`](Self::start) drives every line to idle and flashes the startup
///    pattern
/// 3. [`run`](Self::run) dispatches reader events until
///    [`shutdown_token`](Self::shutdown_token) is cancelled
/// 4. [`shutdown`](Self::shutdown) relocks the door and releases the outputs
#[derive(Debug)]
pub struct AccessController {
    config: ControllerConfig,
    output: Arc<AnyOutputDevice>,
    events: EventLog,
    indicator: IndicatorDriver,
    door: DoorActuator,
    input: InputStateMachine,
    dispatcher: EventDispatcher,
    authenticator: Authenticator,
    shutdown: CancellationToken,
}

impl AccessController {
    /// Wire a controller over an output device and an authorization source.
    ///
    /// # Errors
    ///
    /// Returns `ControllerError::Config` if the configuration is invalid.
    pub fn new(
        config: ControllerConfig,
        output: AnyOutputDevice,
        source: AnyAuthorizationSource,
    ) -> Result<Self> {
        config.validate()?;

        let output = Arc::new(output);
        let events = EventLog::default();
        let indicator = IndicatorDriver::new(Arc::clone(&output));
        let door = DoorActuator::new(
            Arc::clone(&output),
            indicator.clone(),
            config.levels,
            events.clone(),
        );
        let authenticator = Authenticator::new(source);
        let input = InputStateMachine::new(
            authenticator.clone(),
            door.clone(),
            indicator.clone(),
            events.clone(),
            InputSettings::from(&config),
        );
        let dispatcher = EventDispatcher::new(input.clone(), events.clone());

        Ok(Self {
            config,
            output,
            events,
            indicator,
            door,
            input,
            dispatcher,
            authenticator,
            shutdown: CancellationToken::new(),
        })
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    pub fn events(&self) -> &EventLog {
        &self.events
    }

    /// Subscribe to access events.
    pub fn subscribe(&self) -> broadcast::Receiver<AccessEvent> {
        self.events.subscribe()
    }

    pub fn door(&self) -> &DoorActuator {
        &self.door
    }

    /// Watch door state changes.
    pub fn door_state(&self) -> watch::Receiver<DoorState> {
        self.door.subscribe()
    }

    pub fn input(&self) -> &InputStateMachine {
        &self.input
    }

    pub fn dispatcher(&self) -> &EventDispatcher {
        &self.dispatcher
    }

    pub fn authenticator(&self) -> &Authenticator {
        &self.authenticator
    }

    /// Token that stops [`run`](Self::run) when cancelled.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Drive every line to its idle level and flash the startup pattern.
    ///
    /// The flashes run in the background; the controller is ready as soon as
    /// this returns.
    ///
    /// # Errors
    ///
    /// Returns `ControllerError::ActuationFault` if a line cannot be driven.
    pub async fn start(&self) -> Result<()> {
        drive_idle(&self.output, &self.config.levels).await?;
        self.door.secure().await?;

        let levels = &self.config.levels;
        self.indicator
            .spawn(PulseSpec::startup(LineId::Buzzer, levels.buzzer_idle));
        self.indicator.spawn(PulseSpec::startup(
            LineId::LockIndicator,
            levels.indicator_closed(),
        ));

        info!(
            "Authorizing against {}, hold {:?}, pin timeout {:?}",
            self.authenticator.describe(),
            self.config.hold(),
            self.config.pin_timeout()
        );
        self.events.emit(AccessEvent::Startup);
        Ok(())
    }

    /// Dispatch reader events until shutdown is requested.
    ///
    /// # Errors
    ///
    /// Returns `ControllerError::ReaderDisconnected` if every reader stops
    /// first.
    pub async fn run(&self, reader: &mut ReaderHandle) -> Result<()> {
        self.dispatcher.run(reader, self.shutdown.clone()).await
    }

    /// Tear down: stop input, silence the indicators, let an open door relock,
    /// then idle every line and release the output device.
    ///
    /// # Errors
    ///
    /// Returns `ControllerError::ActuationFault` if the final line writes or
    /// the release fail. The door state is `Locked` regardless.
    pub async fn shutdown(self, reader: ReaderHandle) -> Result<()> {
        self.events.emit(AccessEvent::Shutdown);
        self.shutdown.cancel();

        self.input.disarm();
        if let Err(e) = reader.shutdown().await {
            warn!("Reader shutdown failed: {}", e);
        }
        self.indicator.shutdown().await;
        self.door.shutdown().await;

        drive_idle(&self.output, &self.config.levels).await?;
        self.output.release().await?;
        info!("Outputs released");
        Ok(())
    }
}

async fn drive_idle(output: &AnyOutputDevice, levels: &LineLevels) -> Result<()> {
    for line in LineId::ALL {
        output.write_line(line, levels.idle(line)).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ControllerError;
    use latchkey_core::AuthorizationRecord;
    use latchkey_hardware::Level;
    use latchkey_hardware::mock::MockOutput;
    use latchkey_storage::MemoryAuthorizationSource;
    use std::time::Duration;

    fn source() -> AnyAuthorizationSource {
        MemoryAuthorizationSource::new(vec![AuthorizationRecord::new("1234", "Alice", "pin")])
            .into()
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let (output, _) = MockOutput::new();
        let config = ControllerConfig {
            hold_ms: 0,
            ..ControllerConfig::default()
        };
        let result = AccessController::new(config, AnyOutputDevice::Mock(output), source());
        assert!(matches!(result, Err(ControllerError::Config(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_idles_lines_and_flashes() {
        let (output, handle) = MockOutput::new();
        let controller =
            AccessController::new(ControllerConfig::default(), AnyOutputDevice::Mock(output), source())
                .unwrap();
        let mut events = controller.subscribe();

        controller.start().await.unwrap();
        assert_eq!(events.recv().await.unwrap(), AccessEvent::Startup);
        for line in LineId::ALL {
            assert_eq!(handle.level(line), Some(Level::High));
        }

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(handle.count_transitions_to(LineId::Buzzer, Level::Low), 4);
        assert_eq!(
            handle.count_transitions_to(LineId::LockIndicator, Level::Low),
            4
        );
        assert_eq!(controller.door().state(), DoorState::Locked);
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_fails_on_dead_output() {
        let (output, handle) = MockOutput::new();
        handle.set_failing(LineId::Lock, true);
        let controller =
            AccessController::new(ControllerConfig::default(), AnyOutputDevice::Mock(output), source())
                .unwrap();

        assert!(matches!(
            controller.start().await,
            Err(ControllerError::ActuationFault { .. })
        ));
    }
}
