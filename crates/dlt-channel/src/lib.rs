//! DLT output channel for file transfer packets.
//!
//! Each [`Packet`](dltrouter_transfer::Packet) becomes one DLT verbose
//! message and one datagram.
//!
//! # Wire format
//!
//! ```text
//! [22 bytes: verbose header]   see [`header`]
//! [8 bytes:  UINT32 argument]  sequence number
//! [RAWD argument]              chunk bytes (Info packets)
//!   or [STRG argument]         UTF-8 failure text (Error packets)
//! ```

pub mod channel;
pub mod error;
pub mod header;
pub mod udp;
pub mod verbose;

pub use channel::{ChannelConfig, ChannelStats, DltLogChannel};
pub use error::ChannelError;
pub use header::{MAX_DATAGRAM_LEN, MAX_PAYLOAD_LEN, VERBOSE_HEADER_LEN, VerboseHeader};
pub use udp::{DatagramSender, connect_udp};
pub use verbose::MAX_CHUNK_LEN;

use std::time::Duration;

/// Packets sent between two pacing pauses.
pub const DEFAULT_BURST_COUNT: u32 = 5;

/// Minimum gap enforced after every burst.
pub const DEFAULT_BURST_INTERVAL: Duration = Duration::from_millis(5);
