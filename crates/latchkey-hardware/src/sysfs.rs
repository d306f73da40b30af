//! Linux sysfs GPIO output driver.
//!
//! Drives the controller's output lines through the legacy
//! `/sys/class/gpio` interface:
//!
//! ```text
//! <root>/export              <- "<pin>"   (only if <root>/gpio<pin> is absent)
//! <root>/gpio<pin>/direction <- "out"
//! <root>/gpio<pin>/value     <- "0" | "1"
//! <root>/unexport            <- "<pin>"   (on release)
//! ```
//!
//! The root is configurable so the driver can be exercised against a
//! temporary directory.

use crate::{
    HardwareError, Result,
    traits::OutputDevice,
    types::{DeviceInfo, Level, LineId, LinePins},
};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use tracing::{debug, warn};

/// Output device backed by sysfs GPIO files.
#[derive(Debug)]
pub struct SysfsOutput {
    root: PathBuf,
    pins: LinePins,
    /// Last level written per line; repeated writes of the same level are skipped.
    levels: Mutex<[Option<Level>; 3]>,
    /// Pins this driver exported and must unexport on release.
    exported: Vec<u32>,
}

impl SysfsOutput {
    /// Export every line's GPIO and configure it as an output.
    ///
    /// # Errors
    ///
    /// Returns `HardwareError::InitializationFailed` if a pin cannot be
    /// exported or its direction cannot be set. This is a startup fault.
    pub async fn open(root: impl Into<PathBuf>, pins: LinePins) -> Result<Self> {
        let root = root.into();
        if !pins.are_distinct() {
            return Err(HardwareError::initialization_failed(
                "Output lines must use distinct GPIO pins",
            ));
        }

        let mut exported = Vec::new();
        for line in LineId::ALL {
            let pin = pins.pin(line);
            let pin_dir = gpio_dir(&root, pin);

            if !tokio::fs::try_exists(&pin_dir).await.unwrap_or(false) {
                debug!("Exporting gpio{} for {}", pin, line);
                tokio::fs::write(root.join("export"), pin.to_string())
                    .await
                    .map_err(|e| {
                        HardwareError::initialization_failed(format!(
                            "Cannot export gpio{pin} for {line}: {e}"
                        ))
                    })?;
                exported.push(pin);
            }

            tokio::fs::write(pin_dir.join("direction"), "out")
                .await
                .map_err(|e| {
                    HardwareError::initialization_failed(format!(
                        "Cannot set gpio{pin} ({line}) as output: {e}"
                    ))
                })?;
        }

        Ok(Self {
            root,
            pins,
            levels: Mutex::new([None; 3]),
            exported,
        })
    }

    /// GPIO assignment in use.
    pub fn pins(&self) -> LinePins {
        self.pins
    }

    fn cached_level(&self, line: LineId) -> Option<Level> {
        self.levels.lock().unwrap_or_else(PoisonError::into_inner)[line.index()]
    }

    fn remember_level(&self, line: LineId, level: Level) {
        self.levels.lock().unwrap_or_else(PoisonError::into_inner)[line.index()] = Some(level);
    }
}

fn gpio_dir(root: &Path, pin: u32) -> PathBuf {
    root.join(format!("gpio{pin}"))
}

impl OutputDevice for SysfsOutput {
    async fn write_line(&self, line: LineId, level: Level) -> Result<()> {
        if self.cached_level(line) == Some(level) {
            return Ok(());
        }

        let value_path = gpio_dir(&self.root, self.pins.pin(line)).join("value");
        tokio::fs::write(&value_path, level.as_bit().to_string())
            .await
            .map_err(|e| HardwareError::line_write(line, e.to_string()))?;

        self.remember_level(line, level);
        Ok(())
    }

    async fn release(&self) -> Result<()> {
        for pin in &self.exported {
            if let Err(e) = tokio::fs::write(self.root.join("unexport"), pin.to_string()).await {
                warn!("Failed to unexport gpio{}: {}", pin, e);
            }
        }
        Ok(())
    }

    async fn get_info(&self) -> Result<DeviceInfo> {
        Ok(DeviceInfo::new(
            "sysfs-gpio",
            self.root.display().to_string(),
        ))
    }
}
