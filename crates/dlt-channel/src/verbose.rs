//! Verbose-mode argument encoding.
//!
//! Type info words and length prefixes are little-endian since the
//! standard header never sets `MSBF`.

use dltrouter_transfer::{Packet, PacketLevel};

use crate::error::ChannelError;
use crate::header::{MAX_DATAGRAM_LEN, VERBOSE_HEADER_LEN};

pub const TYPE_INFO_UINT: u32 = 0x0000_0040;
pub const TYPE_INFO_STRG: u32 = 0x0000_0200;
pub const TYPE_INFO_RAWD: u32 = 0x0000_0400;
pub const TYLE_32BIT: u32 = 0x0000_0003;
pub const SCOD_UTF8: u32 = 0x0000_8000;

/// Arguments in every file transfer message.
pub const PACKET_ARGUMENT_COUNT: u8 = 2;

/// Bytes the two arguments add around the packet payload (worst case, STRG).
pub const PACKET_OVERHEAD: usize = 8 + 4 + 2 + 1;

/// Largest packet payload whose DLT message still fits in one UDP datagram.
pub const MAX_CHUNK_LEN: usize = MAX_DATAGRAM_LEN - VERBOSE_HEADER_LEN - PACKET_OVERHEAD;

pub fn put_u32(buf: &mut Vec<u8>, value: u32) {
    buf.extend_from_slice(&(TYPE_INFO_UINT | TYLE_32BIT).to_le_bytes());
    buf.extend_from_slice(&value.to_le_bytes());
}

pub fn put_raw(buf: &mut Vec<u8>, data: &[u8]) -> Result<(), ChannelError> {
    let len = u16::try_from(data.len()).map_err(|_| ChannelError::PayloadTooLarge(data.len()))?;
    buf.extend_from_slice(&TYPE_INFO_RAWD.to_le_bytes());
    buf.extend_from_slice(&len.to_le_bytes());
    buf.extend_from_slice(data);
    Ok(())
}

/// Appends a UTF-8 string argument. The length includes the terminating NUL.
pub fn put_string(buf: &mut Vec<u8>, text: &[u8]) -> Result<(), ChannelError> {
    let len = u16::try_from(text.len() + 1).map_err(|_| ChannelError::PayloadTooLarge(text.len()))?;
    buf.extend_from_slice(&(TYPE_INFO_STRG | SCOD_UTF8).to_le_bytes());
    buf.extend_from_slice(&len.to_le_bytes());
    buf.extend_from_slice(text);
    buf.push(0);
    Ok(())
}

/// Replaces `buf` with the argument list for `packet`.
pub fn encode_packet(buf: &mut Vec<u8>, packet: &Packet<'_>) -> Result<(), ChannelError> {
    if packet.payload.len() > MAX_CHUNK_LEN {
        return Err(ChannelError::PayloadTooLarge(packet.payload.len()));
    }
    buf.clear();
    put_u32(buf, packet.sequence_number);
    match packet.level {
        PacketLevel::Info => put_raw(buf, packet.payload),
        PacketLevel::Error => put_string(buf, packet.payload),
    }
}
