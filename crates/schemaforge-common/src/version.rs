//! Version identifiers for migration units.
//!
//! A [`Version`] is an opaque token (in practice a timestamp such as
//! `20190502053908`) that names exactly one migration unit. Versions compare
//! with plain lexicographic string ordering, and that ordering is the order in
//! which units are applied.
//!
//! Lexicographic order only matches numeric order when every identifier has
//! the same width: `"10" < "9"` as strings. Nothing in the type enforces this;
//! unit discovery checks widths when it scans a directory.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Identifier of a single migration unit.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Version(String);

impl Version {
    /// Parse a version identifier.
    ///
    /// Accepts one or more ASCII digits.
    ///
    /// # Examples
    ///
    /// ```
    /// use schemaforge_common::Version;
    ///
    /// assert!(Version::parse("20190502053908").is_ok());
    /// assert!(Version::parse("1").is_ok());
    /// assert!(Version::parse("").is_err());
    /// assert!(Version::parse("v1").is_err());
    /// ```
    pub fn parse<S: Into<String>>(value: S) -> Result<Self> {
        let value = value.into();
        if value.is_empty() {
            return Err(Error::invalid_input("version identifier is empty"));
        }
        if !value.bytes().all(|b| b.is_ascii_digit()) {
            return Err(Error::invalid_input(format!(
                "version identifier must contain only digits: {value:?}"
            )));
        }
        Ok(Self(value))
    }

    /// The identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Number of characters in the identifier.
    pub fn width(&self) -> usize {
        self.0.len()
    }
}

impl FromStr for Version {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Version {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(value)
    }
}

impl From<Version> for String {
    fn from(version: Version) -> Self {
        version.0
    }
}

impl AsRef<str> for Version {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
