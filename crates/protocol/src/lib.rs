//! Wire types shared between the DLT router and its clients.
//!
//! - [`DltId`]: four-byte ECU / application / context identifiers.
//! - [`LogLevel`]: DLT log levels as carried in the extended header.
//! - [`entry`]: the binary file-transfer request record and its codec.
//! - [`timestamp`]: the 0.1 ms DLT timestamp clock.

pub mod dltid;
pub mod entry;
pub mod level;
pub mod timestamp;

pub use dltid::{DEFAULT_ECU_ID, DLT_ID_SIZE, DltId, DltIdError};
pub use entry::{DecodeError, EncodeError, FileTransferEntry, decode_entry, encode_entry};
pub use level::LogLevel;
