//! One-time CSRF state tokens.

use std::fmt;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::{Deserialize, Serialize};

use crate::error::BridgeError;

/// Random value bound to a single OAuth handshake.
///
/// A new value is generated for every attempt and compared exactly when the
/// provider redirects back.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CsrfState(String);

impl CsrfState {
    /// Generates a fresh state from 32 random bytes.
    #[must_use]
    pub fn generate() -> Self {
        let mut bytes = [0u8; 32];
        rand::Rng::fill(&mut rand::thread_rng(), &mut bytes);
        Self(URL_SAFE_NO_PAD.encode(bytes))
    }

    /// Wraps a previously issued value, e.g. one read back from a session.
    #[must_use]
    pub fn from_issued(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Checks the state returned by the provider.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::CsrfMismatch`] when the returned value is
    /// absent, empty, or differs in any byte.
    pub fn verify(&self, returned: Option<&str>) -> Result<(), BridgeError> {
        match returned {
            Some(value) if !value.is_empty() && !self.0.is_empty() && value == self.0 => Ok(()),
            _ => Err(BridgeError::CsrfMismatch),
        }
    }
}

// Keep state values out of logs.
impl fmt::Debug for CsrfState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("CsrfState").field(&"<redacted>").finish()
    }
}
