//! Common types shared across hardware device implementations.
//!
//! This module defines the vocabulary of the line-control capability
//! (logic levels and named output lines), the reader's decoded frame and
//! generic device metadata.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Logic level of a binary output line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Level {
    /// Logic 0.
    Low,

    /// Logic 1.
    High,
}

impl Level {
    /// The opposite level.
    #[must_use]
    pub fn inverted(self) -> Self {
        match self {
            Self::Low => Self::High,
            Self::High => Self::Low,
        }
    }

    /// Numeric form written to GPIO value files.
    #[must_use]
    pub fn as_bit(self) -> u8 {
        match self {
            Self::Low => 0,
            Self::High => 1,
        }
    }
}

impl From<bool> for Level {
    fn from(high: bool) -> Self {
        if high { Self::High } else { Self::Low }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Low => write!(f, "low"),
            Self::High => write!(f, "high"),
        }
    }
}

/// Named output lines of the door controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineId {
    /// Lock relay.
    Lock,

    /// Lock status LED.
    LockIndicator,

    /// Feedback buzzer.
    Buzzer,
}

impl LineId {
    /// Every line, in index order.
    pub const ALL: [LineId; 3] = [LineId::Lock, LineId::LockIndicator, LineId::Buzzer];

    /// Dense index for per-line tables.
    #[must_use]
    pub fn index(self) -> usize {
        match self {
            Self::Lock => 0,
            Self::LockIndicator => 1,
            Self::Buzzer => 2,
        }
    }
}

impl fmt::Display for LineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Lock => write!(f, "lock"),
            Self::LockIndicator => write!(f, "lock_indicator"),
            Self::Buzzer => write!(f, "buzzer"),
        }
    }
}

/// GPIO number assigned to each output line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinePins {
    /// Lock relay GPIO.
    pub lock: u32,

    /// Lock status LED GPIO.
    pub lock_indicator: u32,

    /// Buzzer GPIO.
    pub buzzer: u32,
}

impl LinePins {
    /// GPIO number of a line.
    #[must_use]
    pub fn pin(&self, line: LineId) -> u32 {
        match line {
            LineId::Lock => self.lock,
            LineId::LockIndicator => self.lock_indicator,
            LineId::Buzzer => self.buzzer,
        }
    }

    /// Check that no two lines share a GPIO.
    #[must_use]
    pub fn are_distinct(&self) -> bool {
        self.lock != self.lock_indicator
            && self.lock != self.buzzer
            && self.lock_indicator != self.buzzer
    }
}

/// One frame produced by the reader-protocol decoder.
///
/// `bits` is the frame width; `value` is the frame payload with parity
/// already stripped by the decoder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecodedEvent {
    /// Frame width in bits.
    pub bits: u8,

    /// Decoded payload.
    pub value: u64,

    /// When the frame was decoded.
    pub timestamp: DateTime<Utc>,
}

impl DecodedEvent {
    /// Create a decoded event stamped with the current time.
    pub fn new(bits: u8, value: u64) -> Self {
        Self {
            bits,
            value,
            timestamp: Utc::now(),
        }
    }

    /// Create a decoded event with an explicit timestamp (for replaying logs).
    pub fn at(bits: u8, value: u64, timestamp: DateTime<Utc>) -> Self {
        Self {
            bits,
            value,
            timestamp,
        }
    }
}

/// Generic device information.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    /// Device name (e.g., "sysfs-gpio", "Mock Reader").
    pub name: String,

    /// Device model identifier.
    pub model: String,
}

impl DeviceInfo {
    /// Create a new DeviceInfo.
    pub fn new(name: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            model: model.into(),
        }
    }
}

impl fmt::Display for DeviceInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.model)
    }
}
