//! Core constants for the Latchkey door controller.
//!
//! This module collects every fixed value of the controller in one place:
//! reader frame layout, keypad control codes, timing defaults and the
//! factory pin assignment of the reference board.
//!
//! # Usage
//!
//! ```
//! use latchkey_core::constants::*;
//! use std::time::Duration;
//!
//! assert_eq!(KEYPAD_FRAME_BITS, 4);
//! let timeout = Duration::from_millis(DEFAULT_PIN_TIMEOUT_MS);
//! assert_eq!(timeout.as_secs(), 5);
//! ```

// ============================================================================
// Reader Frames
// ============================================================================

/// Bit count of a keypad frame.
///
/// Readers emit one 4-bit frame per key press. Every other frame width
/// carries a complete badge credential.
pub const KEYPAD_FRAME_BITS: u8 = 4;

/// Highest keypad value that is a decimal digit.
pub const KEYPAD_MAX_DIGIT: u64 = 9;

/// Keypad value of the escape/cancel key.
pub const KEYPAD_CANCEL: u64 = 10;

/// Keypad value of the enter/submit key.
pub const KEYPAD_SUBMIT: u64 = 11;

// ============================================================================
// Keypad Entry
// ============================================================================

/// Default inter-digit timeout in milliseconds.
///
/// A pending PIN is discarded when no key arrives within this window.
pub const DEFAULT_PIN_TIMEOUT_MS: u64 = 5_000;

/// Default maximum number of digits in a keypad entry.
///
/// Ten digits cover the decimal width of a 34-bit card number, the widest
/// credential the reference readers emit.
pub const DEFAULT_MAX_PIN_DIGITS: u8 = 10;

/// Absolute ceiling for the digit bound.
///
/// Nineteen decimal digits always fit in a `u64` accumulator.
pub const MAX_PIN_DIGITS_LIMIT: u8 = 19;

// ============================================================================
// Door Timing
// ============================================================================

/// Default time the door stays unlocked after a grant, in milliseconds.
pub const DEFAULT_HOLD_MS: u64 = 3_000;

// ============================================================================
// Indicator Pulses
// ============================================================================

/// Denial buzz: on time in milliseconds (single pulse, no off time).
pub const DENIAL_PULSE_ON_MS: u64 = 1_000;

/// Relock confirmation: on and off time in milliseconds.
pub const RELOCK_PULSE_MS: u64 = 100;

/// Relock confirmation: number of pulses.
pub const RELOCK_PULSE_COUNT: u32 = 2;

/// Startup flash: on and off time in milliseconds.
pub const STARTUP_PULSE_MS: u64 = 100;

/// Startup flash: number of pulses.
pub const STARTUP_PULSE_COUNT: u32 = 4;

/// Authorization source fault: on and off time in milliseconds.
pub const SOURCE_FAULT_PULSE_MS: u64 = 200;

/// Authorization source fault: number of pulses.
pub const SOURCE_FAULT_PULSE_COUNT: u32 = 3;

// ============================================================================
// Reference Board Wiring
// ============================================================================

/// GPIO driving the lock relay.
pub const DEFAULT_LOCK_PIN: u32 = 27;

/// GPIO driving the lock status LED.
pub const DEFAULT_LOCK_INDICATOR_PIN: u32 = 5;

/// GPIO driving the buzzer.
pub const DEFAULT_BUZZER_PIN: u32 = 6;

/// Default sysfs GPIO root.
pub const DEFAULT_GPIO_PATH: &str = "/sys/class/gpio";

/// Default authorization table.
pub const DEFAULT_KEYS_PATH: &str = "/opt/door/keys.csv";
