//! File transfer request record.
//!
//! # Wire format (version 1)
//!
//! ```text
//! [1 byte:  version = 0x01]
//! [4 bytes: appid, ASCII, NUL padded]
//! [4 bytes: ctxid, ASCII, NUL padded]
//! [1 byte:  delete_file, 0x00 = keep, 0x01 = delete]
//! [2 bytes BE: name_len, 1..=4096]
//! [name_len bytes: file_name, UTF-8 without NUL]
//! ```
//!
//! The record ends exactly after `file_name`; anything else is rejected.
//! Records arrive from an untrusted channel, so decoding validates every
//! field before a path is handed to the filesystem.

use std::path::Path;

use crate::dltid::{DLT_ID_SIZE, DltId, DltIdError};

/// Current record version.
pub const ENTRY_VERSION: u8 = 0x01;

/// Longest accepted file name in bytes.
pub const MAX_FILE_NAME_LEN: usize = 4096;

/// Size of the fixed part preceding the file name.
pub const ENTRY_HEADER_LEN: usize = 1 + DLT_ID_SIZE + DLT_ID_SIZE + 1 + 2;

const APPID_OFFSET: usize = 1;
const CTXID_OFFSET: usize = APPID_OFFSET + DLT_ID_SIZE;
const DELETE_OFFSET: usize = CTXID_OFFSET + DLT_ID_SIZE;
const NAME_LEN_OFFSET: usize = DELETE_OFFSET + 1;

/// A decoded request to stream one file through the log transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileTransferEntry {
    pub appid: DltId,
    pub ctxid: DltId,
    /// Path as sent by the requester; not normalized.
    pub file_name: String,
    /// Remove the source file once it has been fully streamed.
    pub delete_file: bool,
}

impl FileTransferEntry {
    pub fn new(appid: DltId, ctxid: DltId, file_name: impl Into<String>, delete_file: bool) -> Self {
        Self {
            appid,
            ctxid,
            file_name: file_name.into(),
            delete_file,
        }
    }

    pub fn path(&self) -> &Path {
        Path::new(&self.file_name)
    }
}

/// Errors from [`decode_entry`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("record truncated: expected {expected} bytes, got {got}")]
    Truncated { expected: usize, got: usize },

    #[error("unsupported record version 0x{0:02x}")]
    UnsupportedVersion(u8),

    #[error("invalid {field}: {source}")]
    InvalidId {
        field: &'static str,
        #[source]
        source: DltIdError,
    },

    #[error("invalid delete flag 0x{0:02x}")]
    InvalidDeleteFlag(u8),

    #[error("file name length {0} out of range (1..=4096)")]
    FileNameLength(usize),

    #[error("file name is not valid UTF-8")]
    FileNameEncoding,

    #[error("file name contains a NUL byte")]
    FileNameNul,

    #[error("{0} trailing bytes after record")]
    TrailingBytes(usize),
}

/// Errors from [`encode_entry`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EncodeError {
    #[error("file name length {0} out of range (1..=4096)")]
    FileNameLength(usize),

    #[error("file name contains a NUL byte")]
    FileNameNul,
}

/// Encodes an entry into its wire representation.
pub fn encode_entry(entry: &FileTransferEntry) -> Result<Vec<u8>, EncodeError> {
    let name = entry.file_name.as_bytes();
    if name.is_empty() || name.len() > MAX_FILE_NAME_LEN {
        return Err(EncodeError::FileNameLength(name.len()));
    }
    if name.contains(&0) {
        return Err(EncodeError::FileNameNul);
    }

    let mut buf = Vec::with_capacity(ENTRY_HEADER_LEN + name.len());
    buf.push(ENTRY_VERSION);
    buf.extend_from_slice(entry.appid.as_bytes());
    buf.extend_from_slice(entry.ctxid.as_bytes());
    buf.push(u8::from(entry.delete_file));
    buf.extend_from_slice(&(name.len() as u16).to_be_bytes());
    buf.extend_from_slice(name);
    Ok(buf)
}

/// Decodes a wire record. Never panics, whatever the input.
pub fn decode_entry(data: &[u8]) -> Result<FileTransferEntry, DecodeError> {
    if data.len() < ENTRY_HEADER_LEN {
        return Err(DecodeError::Truncated {
            expected: ENTRY_HEADER_LEN,
            got: data.len(),
        });
    }

    if data[0] != ENTRY_VERSION {
        return Err(DecodeError::UnsupportedVersion(data[0]));
    }

    let appid = id_at(data, APPID_OFFSET, "appid")?;
    let ctxid = id_at(data, CTXID_OFFSET, "ctxid")?;

    let delete_file = match data[DELETE_OFFSET] {
        0x00 => false,
        0x01 => true,
        other => return Err(DecodeError::InvalidDeleteFlag(other)),
    };

    let name_len = u16::from_be_bytes([data[NAME_LEN_OFFSET], data[NAME_LEN_OFFSET + 1]]) as usize;
    if name_len == 0 || name_len > MAX_FILE_NAME_LEN {
        return Err(DecodeError::FileNameLength(name_len));
    }

    let end = ENTRY_HEADER_LEN + name_len;
    if data.len() < end {
        return Err(DecodeError::Truncated {
            expected: end,
            got: data.len(),
        });
    }
    if data.len() > end {
        return Err(DecodeError::TrailingBytes(data.len() - end));
    }

    let name = &data[ENTRY_HEADER_LEN..end];
    if name.contains(&0) {
        return Err(DecodeError::FileNameNul);
    }
    let file_name = std::str::from_utf8(name)
        .map_err(|_| DecodeError::FileNameEncoding)?
        .to_owned();

    Ok(FileTransferEntry {
        appid,
        ctxid,
        file_name,
        delete_file,
    })
}

fn id_at(data: &[u8], offset: usize, field: &'static str) -> Result<DltId, DecodeError> {
    let mut raw = [0u8; DLT_ID_SIZE];
    raw.copy_from_slice(&data[offset..offset + DLT_ID_SIZE]);
    DltId::from_bytes(raw).map_err(|source| DecodeError::InvalidId { field, source })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(name: &str, delete_file: bool) -> FileTransferEntry {
        FileTransferEntry::new(
            DltId::new("APPX").unwrap(),
            DltId::new("CTXX").unwrap(),
            name,
            delete_file,
        )
    }

    #[test]
    fn encode_layout() {
        let bytes = encode_entry(&entry("/tmp/a.txt", true)).unwrap();
        assert_eq!(bytes[0], ENTRY_VERSION);
        assert_eq!(&bytes[1..5], b"APPX");
        assert_eq!(&bytes[5..9], b"CTXX");
        assert_eq!(bytes[9], 0x01);
        assert_eq!(&bytes[10..12], &[0x00, 0x0A]);
        assert_eq!(&bytes[12..], b"/tmp/a.txt");
    }

    #[test]
    fn decode_roundtrip() {
        let original = entry("/var/log/context.3155760015.txt", false);
        let bytes = encode_entry(&original).unwrap();
        assert_eq!(decode_entry(&bytes).unwrap(), original);
    }

    #[test]
    fn decode_short_ids() {
        let original = FileTransferEntry::new(
            DltId::new("FT").unwrap(),
            DltId::new("F").unwrap(),
            "x",
            true,
        );
        let bytes = encode_entry(&original).unwrap();
        let decoded = decode_entry(&bytes).unwrap();
        assert_eq!(decoded.appid.as_str(), "FT");
        assert_eq!(decoded.ctxid.as_str(), "F");
    }

    #[test]
    fn garbage_is_rejected() {
        let garbage = [b'Z'; 512];
        assert_eq!(
            decode_entry(&garbage),
            Err(DecodeError::UnsupportedVersion(b'Z'))
        );
    }

    #[test]
    fn empty_input_is_truncated() {
        assert_eq!(
            decode_entry(&[]),
            Err(DecodeError::Truncated {
                expected: ENTRY_HEADER_LEN,
                got: 0
            })
        );
    }

    #[test]
    fn every_prefix_is_rejected() {
        let bytes = encode_entry(&entry("/tmp/file.bin", false)).unwrap();
        for len in 0..bytes.len() {
            assert!(decode_entry(&bytes[..len]).is_err(), "prefix {len} decoded");
        }
    }

    #[test]
    fn name_length_beyond_buffer() {
        let mut bytes = encode_entry(&entry("abc", false)).unwrap();
        bytes[10..12].copy_from_slice(&100u16.to_be_bytes());
        assert_eq!(
            decode_entry(&bytes),
            Err(DecodeError::Truncated {
                expected: ENTRY_HEADER_LEN + 100,
                got: ENTRY_HEADER_LEN + 3
            })
        );
    }

    #[test]
    fn name_length_out_of_range() {
        let mut bytes = encode_entry(&entry("abc", false)).unwrap();
        bytes[10..12].copy_from_slice(&0u16.to_be_bytes());
        assert_eq!(decode_entry(&bytes), Err(DecodeError::FileNameLength(0)));

        bytes[10..12].copy_from_slice(&u16::MAX.to_be_bytes());
        assert_eq!(
            decode_entry(&bytes),
            Err(DecodeError::FileNameLength(u16::MAX as usize))
        );
    }

    #[test]
    fn non_ascii_appid() {
        let mut bytes = encode_entry(&entry("abc", false)).unwrap();
        bytes[2] = 0xFF;
        assert!(matches!(
            decode_entry(&bytes),
            Err(DecodeError::InvalidId { field: "appid", .. })
        ));
    }

    #[test]
    fn empty_ctxid() {
        let mut bytes = encode_entry(&entry("abc", false)).unwrap();
        bytes[5..9].copy_from_slice(&[0; 4]);
        assert!(matches!(
            decode_entry(&bytes),
            Err(DecodeError::InvalidId {
                field: "ctxid",
                source: DltIdError::Empty
            })
        ));
    }

    #[test]
    fn invalid_delete_flag() {
        let mut bytes = encode_entry(&entry("abc", false)).unwrap();
        bytes[9] = 0x02;
        assert_eq!(decode_entry(&bytes), Err(DecodeError::InvalidDeleteFlag(2)));
    }

    #[test]
    fn trailing_bytes() {
        let mut bytes = encode_entry(&entry("abc", false)).unwrap();
        bytes.extend_from_slice(b"xx");
        assert_eq!(decode_entry(&bytes), Err(DecodeError::TrailingBytes(2)));
    }

    #[test]
    fn invalid_utf8_name() {
        let mut bytes = encode_entry(&entry("abc", false)).unwrap();
        bytes[12] = 0xC3;
        bytes[13] = 0x28;
        assert_eq!(decode_entry(&bytes), Err(DecodeError::FileNameEncoding));
    }

    #[test]
    fn nul_in_name() {
        let mut bytes = encode_entry(&entry("abc", false)).unwrap();
        bytes[13] = 0;
        assert_eq!(decode_entry(&bytes), Err(DecodeError::FileNameNul));
        assert_eq!(
            encode_entry(&entry("a\0c", false)),
            Err(EncodeError::FileNameNul)
        );
    }

    #[test]
    fn encode_rejects_bad_names() {
        assert_eq!(encode_entry(&entry("", false)), Err(EncodeError::FileNameLength(0)));
        let long = "a".repeat(MAX_FILE_NAME_LEN + 1);
        assert_eq!(
            encode_entry(&entry(&long, false)),
            Err(EncodeError::FileNameLength(MAX_FILE_NAME_LEN + 1))
        );
    }

    #[test]
    fn single_byte_corruption_never_panics() {
        let bytes = encode_entry(&entry("/tmp/x", true)).unwrap();
        for i in 0..bytes.len() {
            for value in [0x00, 0x01, 0x7F, 0x80, 0xFF] {
                let mut corrupted = bytes.clone();
                corrupted[i] = value;
                let _ = decode_entry(&corrupted);
            }
        }
    }
}
