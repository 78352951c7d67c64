use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Short exchange code identifying a listed security (e.g. "ADIN", "KMB")
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Instrument(String);

impl Instrument {
    /// Validate a user or remote supplied code
    ///
    /// Codes are trimmed and must be non-empty ASCII alphanumerics so they are
    /// safe to use as file names.
    pub fn parse(code: &str) -> Result<Self> {
        let code = code.trim();
        if code.is_empty() {
            return Err(Error::Planning("instrument code is empty".to_string()));
        }
        if !code.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(Error::Planning(format!(
                "instrument code '{}' must be ASCII letters and digits only",
                code
            )));
        }
        Ok(Self(code.to_uppercase()))
    }

    /// Securities have purely alphabetic codes; anything with a digit is a
    /// bond or other numbered listing and is excluded from discovery.
    pub fn is_security_code(code: &str) -> bool {
        !code.chars().any(|c| c.is_ascii_digit())
    }

    pub fn code(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Instrument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
