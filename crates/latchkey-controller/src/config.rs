//! Controller configuration
//!
//! Loaded from a JSON file; every field has a default so a partial file (or
//! `{}`) is valid:
//!
//! ```json
//! {
//!   "pins": { "lock": 27, "lock_indicator": 5, "buzzer": 6 },
//!   "levels": { "lock_unlocked": "low", "indicator_open": "low", "buzzer_idle": "high" },
//!   "gpio_path": "/sys/class/gpio",
//!   "pin_timeout_ms": 5000,
//!   "hold_ms": 3000,
//!   "max_pin_digits": 10,
//!   "authorization": { "backend": "csv", "path": "/opt/door/keys.csv" }
//! }
//! ```

use crate::error::{ControllerError, Result};
use latchkey_core::constants::{
    DEFAULT_BUZZER_PIN, DEFAULT_GPIO_PATH, DEFAULT_HOLD_MS, DEFAULT_KEYS_PATH,
    DEFAULT_LOCK_INDICATOR_PIN, DEFAULT_LOCK_PIN, DEFAULT_MAX_PIN_DIGITS, DEFAULT_PIN_TIMEOUT_MS,
    MAX_PIN_DIGITS_LIMIT,
};
use latchkey_hardware::{Level, LineId, LinePins};
use latchkey_storage::{AnyAuthorizationSource, CsvAuthorizationSource, SqliteAuthorizationSource};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Electrical polarity of the output lines.
///
/// Only the "active" level of each line is configured; the other state is
/// always its inverse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LineLevels {
    /// Lock line level that releases the lock.
    pub lock_unlocked: Level,

    /// Lock indicator level shown while the door is open.
    pub indicator_open: Level,

    /// Buzzer level when silent.
    pub buzzer_idle: Level,
}

impl Default for LineLevels {
    fn default() -> Self {
        Self {
            lock_unlocked: Level::Low,
            indicator_open: Level::Low,
            buzzer_idle: Level::High,
        }
    }
}

impl LineLevels {
    /// Lock line level that engages the lock.
    pub fn lock_locked(&self) -> Level {
        self.lock_unlocked.inverted()
    }

    /// Lock indicator level while the door is locked.
    pub fn indicator_closed(&self) -> Level {
        self.indicator_open.inverted()
    }

    /// Safe resting level of a line: locked, indicator closed, buzzer silent.
    pub fn idle(&self, line: LineId) -> Level {
        match line {
            LineId::Lock => self.lock_locked(),
            LineId::LockIndicator => self.indicator_closed(),
            LineId::Buzzer => self.buzzer_idle,
        }
    }
}

/// Where the authorization table lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "snake_case")]
pub enum AuthorizationConfig {
    /// `key,name,type` CSV file re-read on every check.
    Csv { path: PathBuf },

    /// SQLite database with an `authorizations` table.
    Sqlite { url: String },
}

impl Default for AuthorizationConfig {
    fn default() -> Self {
        Self::Csv {
            path: PathBuf::from(DEFAULT_KEYS_PATH),
        }
    }
}

impl AuthorizationConfig {
    /// Build the configured source. Nothing is read until the first lookup.
    ///
    /// # Errors
    ///
    /// Returns `ControllerError::AuthoritySourceUnavailable` if the SQLite URL
    /// is malformed.
    pub fn open(&self) -> Result<AnyAuthorizationSource> {
        Ok(match self {
            Self::Csv { path } => CsvAuthorizationSource::new(path).into(),
            Self::Sqlite { url } => SqliteAuthorizationSource::connect_lazy(url)?.into(),
        })
    }
}

/// Complete controller configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    /// GPIO number of each output line.
    pub pins: LinePins,

    /// Line polarity.
    pub levels: LineLevels,

    /// Root of the sysfs GPIO tree.
    pub gpio_path: PathBuf,

    /// Inter-digit timeout of keypad entry, in milliseconds.
    pub pin_timeout_ms: u64,

    /// How long the lock stays released, in milliseconds.
    pub hold_ms: u64,

    /// Longest keypad entry accepted.
    pub max_pin_digits: u8,

    /// Authorization table backend.
    pub authorization: AuthorizationConfig,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            pins: LinePins {
                lock: DEFAULT_LOCK_PIN,
                lock_indicator: DEFAULT_LOCK_INDICATOR_PIN,
                buzzer: DEFAULT_BUZZER_PIN,
            },
            levels: LineLevels::default(),
            gpio_path: PathBuf::from(DEFAULT_GPIO_PATH),
            pin_timeout_ms: DEFAULT_PIN_TIMEOUT_MS,
            hold_ms: DEFAULT_HOLD_MS,
            max_pin_digits: DEFAULT_MAX_PIN_DIGITS,
            authorization: AuthorizationConfig::default(),
        }
    }
}

impl ControllerConfig {
    /// Load and validate a JSON configuration file.
    ///
    /// # Errors
    ///
    /// Returns `Io` if the file cannot be read, `Json` if it does not parse
    /// and `Config` if a value is out of range.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges.
    ///
    /// # Errors
    ///
    /// Returns `ControllerError::Config` naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        if self.pin_timeout_ms == 0 {
            return Err(ControllerError::config("pin_timeout_ms must be positive"));
        }
        if self.hold_ms == 0 {
            return Err(ControllerError::config("hold_ms must be positive"));
        }
        if self.max_pin_digits == 0 || self.max_pin_digits > MAX_PIN_DIGITS_LIMIT {
            return Err(ControllerError::config(format!(
                "max_pin_digits must be between 1 and {MAX_PIN_DIGITS_LIMIT}, got {}",
                self.max_pin_digits
            )));
        }
        if !self.pins.are_distinct() {
            return Err(ControllerError::config(
                "lock, lock_indicator and buzzer must use distinct pins",
            ));
        }
        Ok(())
    }

    /// Inter-digit timeout.
    pub fn pin_timeout(&self) -> Duration {
        Duration::from_millis(self.pin_timeout_ms)
    }

    /// Unlock hold duration.
    pub fn hold(&self) -> Duration {
        Duration::from_millis(self.hold_ms)
    }
}
