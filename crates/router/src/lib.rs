//! Record routing for the DLT router daemon.
//!
//! Inbound frames carry a one-byte [`RecordKind`] tag followed by the
//! record body. The [`Router`] maps the tag onto the closed kind set and
//! hands the body to the matching [`TypeHandler`](dltrouter_transfer::TypeHandler).
//! [`FileTransfer`] is the application-side trigger that produces
//! file transfer frames.

pub mod error;
pub mod router;
pub mod trigger;

pub use error::RouterError;
pub use router::{RecordKind, Router, RouterStats, TracingLogHandler, encode_frame};
pub use trigger::{FileTransfer, RecordSink, TransferTrigger, UdpRecordSink};

/// Largest frame accepted on the ingress socket.
pub const MAX_FRAME_LEN: usize = dltrouter_dlt_channel::MAX_DATAGRAM_LEN;
