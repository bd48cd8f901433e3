//! Composite key construction for ledger records
//!
//! A composite key is an ordered tuple of identity fields joined with [`DELIMITER`]. Numeric
//! parts are zero padded to a fixed width so that the lexicographic order of the ledger keys
//! matches the numeric order of the identifiers, which is what range scans rely on.
//!
//! Text parts are used verbatim. Keys stay collision free only as long as no text part
//! contains the delimiter, so text taken from callers goes through [`check_text_part`] first.

use super::error::ContractError;
use std::fmt;

pub const DELIMITER: &str = ":";

// u64::MAX has 20 digits
const ID_WIDTH: usize = 20;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyPart {
    Text(String),
    Id(u64),
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CompositeKey(String);

impl KeyPart {
    fn render(&self) -> String {
        match self {
            KeyPart::Text(text) => text.clone(),
            KeyPart::Id(id) => format!("{id:0width$}", width = ID_WIDTH),
        }
    }
}

impl From<&str> for KeyPart {
    fn from(value: &str) -> Self {
        KeyPart::Text(value.to_string())
    }
}

impl From<String> for KeyPart {
    fn from(value: String) -> Self {
        KeyPart::Text(value)
    }
}

impl From<u64> for KeyPart {
    fn from(value: u64) -> Self {
        KeyPart::Id(value)
    }
}

/// Join the parts, in order, into a composite key.
pub fn make_key(parts: &[KeyPart]) -> CompositeKey {
    let rendered: Vec<String> = parts.iter().map(KeyPart::render).collect();
    CompositeKey(rendered.join(DELIMITER))
}

/// Reject caller supplied text that cannot be a key part: empty, or holding the delimiter.
pub fn check_text_part(name: &str, text: &str) -> Result<(), ContractError> {
    if text.is_empty() {
        return Err(ContractError::invalid_argument(name, "must not be empty"));
    }
    if text.contains(DELIMITER) {
        return Err(ContractError::invalid_argument(
            name,
            format!("'{text}' must not contain '{DELIMITER}'"),
        ));
    }
    Ok(())
}

/// Split a composite key back into its rendered parts.
pub fn split_key(key: &CompositeKey) -> Vec<&str> {
    key.0.split(DELIMITER).collect()
}

impl CompositeKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The key as stored in the world state, scoped by the asset namespace.
    pub fn ledger_key(&self, namespace: &str) -> String {
        format!("{namespace}{DELIMITER}{}", self.0)
    }

    /// Inverse of [`CompositeKey::ledger_key`].
    pub fn from_ledger_key(namespace: &str, ledger_key: &str) -> Option<Self> {
        ledger_key
            .strip_prefix(namespace)
            .and_then(|rest| rest.strip_prefix(DELIMITER))
            .map(|rest| CompositeKey(rest.to_string()))
    }
}

impl fmt::Display for CompositeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
