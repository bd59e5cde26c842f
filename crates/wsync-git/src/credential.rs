//! Opaque bearer credential for remote access.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use crate::{Error, Result};

const REDACTED: &str = "***";

/// An access token supplied by the surrounding application.
///
/// The raw value never appears in `Debug` output, log lines, or error text,
/// and is only handed to git through a transient per-process environment.
/// The backing buffer is zeroed on drop.
#[derive(Clone)]
pub struct Credential {
    token: String,
}

impl Credential {
    /// Wrap a token, rejecting values git could not carry in a header.
    pub fn new(token: impl Into<String>) -> Result<Self> {
        let token = token.into();
        if token.is_empty() {
            return Err(Error::AuthConfiguration {
                message: "credential is empty".into(),
            });
        }
        if token.chars().any(|c| c.is_whitespace() || c.is_control()) {
            return Err(Error::AuthConfiguration {
                message: "credential contains whitespace or control characters".into(),
            });
        }
        Ok(Self { token })
    }

    /// Environment that injects the credential as an HTTP header for one git process.
    ///
    /// Uses `GIT_CONFIG_COUNT`/`GIT_CONFIG_KEY_n`/`GIT_CONFIG_VALUE_n`, so nothing is
    /// written to the repository's config file.
    pub(crate) fn git_env(&self) -> Vec<(String, String)> {
        let basic = STANDARD.encode(format!("x-access-token:{}", self.token));
        vec![
            ("GIT_CONFIG_COUNT".into(), "1".into()),
            ("GIT_CONFIG_KEY_0".into(), "http.extraHeader".into()),
            (
                "GIT_CONFIG_VALUE_0".into(),
                format!("Authorization: Basic {basic}"),
            ),
        ]
    }

    /// Replace every occurrence of the token in `text`.
    pub fn redact(&self, text: &str) -> String {
        text.replace(&self.token, REDACTED)
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Credential").field(&REDACTED).finish()
    }
}

impl Drop for Credential {
    fn drop(&mut self) {
        let mut bytes = std::mem::take(&mut self.token).into_bytes();
        bytes.iter_mut().for_each(|b| *b = 0);
        std::hint::black_box(&bytes);
    }
}
