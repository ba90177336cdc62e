//! File transfer over the log transport.
//!
//! A [`StreamHandler`] receives encoded
//! [`FileTransferEntry`](dltrouter_protocol::FileTransferEntry) records,
//! and for each valid one runs a [`TransferWorker`] on the blocking pool.
//! The worker reads the file in [`CHUNK_SIZE`] pieces and hands every piece
//! to a [`PacketEmitter`] as soon as it is read.

mod chunked;
mod emitter;
mod handler;
mod worker;

pub use chunked::ChunkReader;
pub use emitter::{Packet, PacketEmitter, PacketLevel};
pub use handler::{
    DisabledStreamHandler, StreamHandler, SubmitError, TransferHandle, TypeHandler, create_handler,
};
pub use worker::{DeletionOutcome, TransferFailure, TransferReport, TransferState, TransferWorker};

/// Bytes per emitted packet.
pub const CHUNK_SIZE: usize = 1024;

/// Sequence number carried by the first packet of every transfer.
pub const FIRST_SEQUENCE_NUMBER: u32 = 0;

/// Upper bound for the running and the pending transfer limits.
pub const MAX_TRANSFER_SLOTS: usize = 1024;

/// Runtime settings for file transfers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferConfig {
    /// When false, [`create_handler`] returns a handler that ignores entries.
    pub enabled: bool,
    /// Bytes per packet. 0 falls back to [`CHUNK_SIZE`].
    pub chunk_size: usize,
    /// Workers allowed to stream at the same time.
    pub max_concurrent_transfers: usize,
    /// Accepted transfers allowed to wait for a free worker slot.
    pub max_pending_transfers: usize,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            chunk_size: CHUNK_SIZE,
            max_concurrent_transfers: 4,
            max_pending_transfers: 16,
        }
    }
}

/// Errors produced by the transfer crate.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("transfer worker did not finish: {0}")]
    Join(#[from] tokio::task::JoinError),
}
