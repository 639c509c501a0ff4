//! PDB entry identifier.

use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A PDB entry identifier such as `1cbs` or `125L`.
///
/// Identifiers are case-insensitive. The trimmed input is kept as given; use
/// [`PdbId::lowercase`] where a service expects the canonical lowercase form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PdbId(String);

impl PdbId {
    /// Parse an identifier, rejecting blank input
    pub fn parse(raw: &str) -> Result<Self, Error> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(Error::InvalidIdentifier);
        }
        Ok(Self(trimmed.to_string()))
    }

    /// The identifier as entered (trimmed)
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Lowercased form
    pub fn lowercase(&self) -> String {
        self.0.to_lowercase()
    }
}

impl FromStr for PdbId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for PdbId {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<PdbId> for String {
    fn from(id: PdbId) -> Self {
        id.0
    }
}

impl fmt::Display for PdbId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
