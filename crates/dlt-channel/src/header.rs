//! DLT verbose message header.
//!
//! ```text
//! standard header   [1 htyp][1 mcnt][2 BE len]
//! header extra      [4 ecu][4 BE tmsp]
//! extended header   [1 msin][1 noar][4 apid][4 ctid]
//! ```
//!
//! `len` counts everything after the storage header, i.e. these 22 bytes
//! plus the payload.

use dltrouter_protocol::{DltId, LogLevel};

use crate::error::ChannelError;

pub const HTYP_UEH: u8 = 0x01;
pub const HTYP_WEID: u8 = 0x04;
pub const HTYP_WTMS: u8 = 0x10;
pub const HTYP_VERS: u8 = 0x20;

pub const MSIN_VERB: u8 = 0x01;
pub const MSIN_MSTP_SHIFT: u8 = 1;
pub const MSIN_MTIN_SHIFT: u8 = 4;
pub const TYPE_LOG: u8 = 0x00;

/// Size of the standard, extra and extended headers together.
pub const VERBOSE_HEADER_LEN: usize = 22;

/// Largest payload whose message length still fits the 16-bit `len` field.
pub const MAX_PAYLOAD_LEN: usize = u16::MAX as usize - VERBOSE_HEADER_LEN;

/// Largest UDP payload an IPv4 datagram can carry.
pub const MAX_DATAGRAM_LEN: usize = 65_507;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VerboseHeader {
    pub message_counter: u8,
    /// Total message length, header included.
    pub length: u16,
    pub ecu: DltId,
    pub timestamp: u32,
    pub level: LogLevel,
    pub argument_count: u8,
    pub appid: DltId,
    pub ctxid: DltId,
}

impl VerboseHeader {
    /// Header for a log message carrying `payload_len` bytes of arguments.
    #[allow(clippy::too_many_arguments)]
    pub fn log(
        message_counter: u8,
        payload_len: usize,
        ecu: DltId,
        timestamp: u32,
        level: LogLevel,
        argument_count: u8,
        appid: DltId,
        ctxid: DltId,
    ) -> Result<Self, ChannelError> {
        if payload_len > MAX_PAYLOAD_LEN {
            return Err(ChannelError::PayloadTooLarge(payload_len));
        }
        Ok(Self {
            message_counter,
            length: (VERBOSE_HEADER_LEN + payload_len) as u16,
            ecu,
            timestamp,
            level,
            argument_count,
            appid,
            ctxid,
        })
    }

    pub fn htyp() -> u8 {
        HTYP_UEH | HTYP_WEID | HTYP_WTMS | HTYP_VERS
    }

    pub fn msin(&self) -> u8 {
        (TYPE_LOG << MSIN_MSTP_SHIFT) | (self.level.as_u8() << MSIN_MTIN_SHIFT) | MSIN_VERB
    }

    pub fn to_bytes(&self) -> [u8; VERBOSE_HEADER_LEN] {
        let mut out = [0u8; VERBOSE_HEADER_LEN];
        out[0] = Self::htyp();
        out[1] = self.message_counter;
        out[2..4].copy_from_slice(&self.length.to_be_bytes());
        out[4..8].copy_from_slice(self.ecu.as_bytes());
        out[8..12].copy_from_slice(&self.timestamp.to_be_bytes());
        out[12] = self.msin();
        out[13] = self.argument_count;
        out[14..18].copy_from_slice(self.appid.as_bytes());
        out[18..22].copy_from_slice(self.ctxid.as_bytes());
        out
    }
}
