//! Credential lookup against the authorization table.

use crate::error::{ControllerError, Result};
use latchkey_core::{AuthorizationRecord, Credential};
use latchkey_storage::{AnyAuthorizationSource, AuthorizationSource};
use std::sync::Arc;
use tracing::debug;

/// Maps a credential to at most one authorization record.
///
/// Stateless apart from the shared source; every check re-reads the table.
#[derive(Debug, Clone)]
pub struct Authenticator {
    source: Arc<AnyAuthorizationSource>,
}

impl Authenticator {
    /// Create an authenticator over a source.
    pub fn new(source: impl Into<Arc<AnyAuthorizationSource>>) -> Self {
        Self {
            source: source.into(),
        }
    }

    /// Look up a credential.
    ///
    /// The key is the credential's decimal form, so keypad entries with
    /// leading zeros match the key without them.
    ///
    /// # Errors
    ///
    /// Returns `ControllerError::AuthoritySourceUnavailable` if the table
    /// could not be read. A credential that is simply absent is `Ok(None)`.
    pub async fn check(&self, credential: Credential) -> Result<Option<AuthorizationRecord>> {
        let key = credential.to_key();
        let record = self.source.find(&key).await?;
        debug!(
            "Checked {} against {}: {}",
            key,
            self.source.describe(),
            if record.is_some() { "found" } else { "not found" }
        );
        Ok(record)
    }

    /// Look up a credential, treating absence as an error.
    ///
    /// # Errors
    ///
    /// Returns `ControllerError::AccessDenied` if no record matches and
    /// `ControllerError::AuthoritySourceUnavailable` if the table could not
    /// be read.
    pub async fn authorize(&self, credential: Credential) -> Result<AuthorizationRecord> {
        self.check(credential)
            .await?
            .ok_or(ControllerError::AccessDenied { credential })
    }

    /// Description of the backing source, for logs.
    pub fn describe(&self) -> String {
        self.source.describe()
    }
}
