use crate::{Result, error::Error};
use serde::{Deserialize, Serialize};
use std::fmt;
use subtle::ConstantTimeEq;

/// Numeric credential presented at the door.
///
/// Both channels produce the same type: a keypad entry is the decimal number
/// formed by its digits, a badge scan is the value decoded from the frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Credential(u64);

impl Credential {
    /// Wrap a raw credential value.
    #[must_use]
    pub fn new(value: u64) -> Self {
        Credential(value)
    }

    /// Get the raw value.
    #[must_use]
    pub fn value(&self) -> u64 {
        self.0
    }

    /// String form used as the lookup key in the authorization table.
    #[must_use]
    pub fn to_key(&self) -> String {
        self.0.to_string()
    }
}

impl From<u64> for Credential {
    fn from(value: u64) -> Self {
        Credential(value)
    }
}

impl fmt::Display for Credential {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for Credential {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        if trimmed.is_empty() || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
            return Err(Error::InvalidCredential(format!(
                "Credential must be decimal digits, got {s:?}"
            )));
        }
        trimmed
            .parse::<u64>()
            .map(Credential)
            .map_err(|_| Error::InvalidCredential(format!("Credential out of range: {s}")))
    }
}

/// One row of the authorization table.
///
/// # Security
/// [`matches`](AuthorizationRecord::matches) compares keys in constant time so
/// lookup latency does not leak how much of a key was correct.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationRecord {
    /// Credential value, string-encoded.
    pub key: String,

    /// Display name of the holder.
    pub name: String,

    /// Credential type label (e.g. `pin`, `fob`).
    #[serde(rename = "type")]
    pub credential_type: String,
}

impl AuthorizationRecord {
    /// Create a record, trimming surrounding whitespace from every field.
    pub fn new(
        key: impl Into<String>,
        name: impl Into<String>,
        credential_type: impl Into<String>,
    ) -> Self {
        Self {
            key: key.into().trim().to_string(),
            name: name.into().trim().to_string(),
            credential_type: credential_type.into().trim().to_string(),
        }
    }

    /// Exact match of this record's key against a lookup key.
    #[must_use]
    pub fn matches(&self, key: &str) -> bool {
        self.key.as_bytes().ct_eq(key.as_bytes()).into()
    }
}

/// Renders as `Alice (pin-1234)`, the identity format of the access log.
impl fmt::Display for AuthorizationRecord {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} ({}-{})", self.name, self.credential_type, self.key)
    }
}

/// Physical state of the door lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DoorState {
    /// Lock engaged.
    #[default]
    Locked,

    /// Lock released for a hold period.
    Unlocked,
}

impl DoorState {
    /// Check if transition to target state is valid from this state.
    ///
    /// The door only ever alternates; re-entering the current state is
    /// rejected so an overlapping unlock cycle is caught.
    ///
    /// # Examples
    ///
    /// ```
    /// use latchkey_core::DoorState;
    ///
    /// assert!(DoorState::Locked.can_transition_to(DoorState::Unlocked));
    /// assert!(!DoorState::Unlocked.can_transition_to(DoorState::Unlocked));
    /// ```
    #[must_use]
    pub fn can_transition_to(&self, target: DoorState) -> bool {
        matches!(
            (self, target),
            (DoorState::Locked, DoorState::Unlocked) | (DoorState::Unlocked, DoorState::Locked)
        )
    }

    /// Validate a transition, returning the target state.
    ///
    /// # Errors
    /// Returns `Error::InvalidStateTransition` for anything but an alternation.
    pub fn transition_to(&self, target: DoorState) -> Result<DoorState> {
        if !self.can_transition_to(target) {
            return Err(Error::InvalidStateTransition {
                from: self.to_string(),
                to: target.to_string(),
            });
        }
        Ok(target)
    }
}

impl fmt::Display for DoorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DoorState::Locked => write!(f, "Locked"),
            DoorState::Unlocked => write!(f, "Unlocked"),
        }
    }
}

/// Channel a credential arrived on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputChannel {
    /// Digit-by-digit keypad entry.
    Keypad,

    /// Whole credential in a single reader frame.
    Badge,
}

impl fmt::Display for InputChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputChannel::Keypad => write!(f, "keypad"),
            InputChannel::Badge => write!(f, "badge"),
        }
    }
}
