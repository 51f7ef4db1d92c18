//! Storage credentials with masking
//!
//! The SAS token for the blob service is read from an environment variable
//! and held in a [`SecretString`] so it never ends up in `Debug` output.
//! Anything that may echo a signed URL back (errors, logs) goes through
//! [`mask_sas_in`] first.

use lazy_static::lazy_static;
use regex::Regex;
use secrecy::{ExposeSecret, SecretString};
use std::collections::HashMap;
use std::fmt;

lazy_static! {
    static ref SIG_PARAM_REGEX: Regex = Regex::new(r"(?i)(sig=)[^&\s]+").unwrap();
}

/// Shared access signature for a storage account
pub struct SasCredential {
    token: SecretString,
    /// Environment variable the token came from, if any
    source: Option<String>,
}

impl SasCredential {
    /// Wrap a token given directly; a leading `?` is dropped
    pub fn new(token: impl Into<String>) -> Self {
        let token: String = token.into();
        let token = token.trim().trim_start_matches('?').to_string();
        Self {
            token: SecretString::new(token.into()),
            source: None,
        }
    }

    /// Read the token from `var` in the process environment
    pub fn from_env(var: &str) -> Option<Self> {
        let value = std::env::var(var).ok()?;
        Self::from_value(var, value)
    }

    /// Read the token from `var` in an explicit environment map
    pub fn from_map(var: &str, env: &HashMap<String, String>) -> Option<Self> {
        let value = env.get(var)?.clone();
        Self::from_value(var, value)
    }

    fn from_value(var: &str, value: String) -> Option<Self> {
        if value.trim().is_empty() {
            return None;
        }
        let mut credential = Self::new(value);
        credential.source = Some(var.to_string());
        Some(credential)
    }

    /// Query string to append to request URLs (without the `?`)
    pub fn query(&self) -> &str {
        self.token.expose_secret()
    }

    /// Masked form for display
    pub fn masked(&self) -> String {
        mask_token(self.token.expose_secret())
    }

    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }
}

impl fmt::Debug for SasCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SasCredential")
            .field("token", &self.masked())
            .field("source", &self.source)
            .finish()
    }
}

/// Masks a token for safe logging
///
/// Shows only the first 3 and last 3 characters. Tokens shorter than 10
/// characters are fully masked as "****".
pub fn mask_token(token: &str) -> String {
    let chars: Vec<char> = token.chars().collect();
    if chars.len() < 10 {
        return "****".to_string();
    }

    let prefix: String = chars[..3].iter().collect();
    let suffix: String = chars[chars.len() - 3..].iter().collect();
    format!("{}...{}", prefix, suffix)
}

/// Replace the `sig=` value of every signed URL in `text`
pub fn mask_sas_in(text: &str) -> String {
    SIG_PARAM_REGEX.replace_all(text, "${1}****").into_owned()
}
