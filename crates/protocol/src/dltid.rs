//! Four-byte DLT identifiers (ECU, application and context ids).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Size of every DLT identifier on the wire.
pub const DLT_ID_SIZE: usize = 4;

/// A DLT identifier: 1 to 4 ASCII characters, NUL padded to 4 bytes.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DltId([u8; DLT_ID_SIZE]);

/// ECU id used when none is configured.
pub const DEFAULT_ECU_ID: DltId = DltId(*b"ECU1");

/// Errors produced when building a [`DltId`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DltIdError {
    #[error("identifier must be 1 to 4 characters, got {0}")]
    Length(usize),

    #[error("identifier is empty")]
    Empty,

    #[error("identifier contains non-ASCII byte 0x{0:02x}")]
    NonAscii(u8),

    #[error("identifier has a character after NUL padding")]
    Nul,
}

impl DltId {
    /// Builds an identifier from a string of 1 to 4 ASCII characters.
    pub fn new(id: &str) -> Result<Self, DltIdError> {
        let bytes = id.as_bytes();
        if bytes.is_empty() || bytes.len() > DLT_ID_SIZE {
            return Err(DltIdError::Length(bytes.len()));
        }
        let mut raw = [0u8; DLT_ID_SIZE];
        raw[..bytes.len()].copy_from_slice(bytes);
        Self::from_bytes(raw)
    }

    /// Validates four raw wire bytes.
    ///
    /// Every byte must be ASCII, the first must not be NUL, and once a NUL
    /// appears only NUL padding may follow.
    pub fn from_bytes(raw: [u8; DLT_ID_SIZE]) -> Result<Self, DltIdError> {
        if let Some(&byte) = raw.iter().find(|b| !b.is_ascii()) {
            return Err(DltIdError::NonAscii(byte));
        }
        if raw[0] == 0 {
            return Err(DltIdError::Empty);
        }
        if let Some(nul) = raw.iter().position(|&b| b == 0) {
            if raw[nul..].iter().any(|&b| b != 0) {
                return Err(DltIdError::Nul);
            }
        }
        Ok(Self(raw))
    }

    /// The padded wire representation.
    pub fn as_bytes(&self) -> &[u8; DLT_ID_SIZE] {
        &self.0
    }

    /// The identifier without NUL padding.
    pub fn as_str(&self) -> &str {
        let end = self.0.iter().position(|&b| b == 0).unwrap_or(DLT_ID_SIZE);
        // Validated as ASCII on construction.
        std::str::from_utf8(&self.0[..end]).unwrap_or_default()
    }
}

impl fmt::Display for DltId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Debug for DltId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DltId({:?})", self.as_str())
    }
}

impl FromStr for DltId {
    type Err = DltIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for DltId {
    type Error = DltIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(&value)
    }
}

impl From<DltId> for String {
    fn from(id: DltId) -> Self {
        id.as_str().to_owned()
    }
}
