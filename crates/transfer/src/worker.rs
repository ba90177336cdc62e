//! Streams one file through a [`PacketEmitter`].
//!
//! State machine: `Idle -> Opening -> Streaming -> (Completed | Failed)`.
//!
//! - Open failure: one `Error` packet (sequence 0), nothing else.
//! - Each chunk becomes one `Info` packet as soon as it is read; a file of
//!   `S > 0` bytes yields `ceil(S / chunk_size)` packets, an empty file none.
//! - Read failure mid-stream: packets already sent stand and one trailing
//!   `Error` packet with the next sequence number reports the failure.
//! - `delete_file` removes the source only after a completed read loop;
//!   a failed removal is reported but leaves the transfer `Completed`.

use std::io::Read;
use std::sync::Arc;

use dltrouter_protocol::{DltId, FileTransferEntry, timestamp};
use serde::Serialize;

use crate::chunked::ChunkReader;
use crate::emitter::{Packet, PacketEmitter, PacketLevel};
use crate::{FIRST_SEQUENCE_NUMBER, TransferError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferState {
    Idle,
    Opening,
    Streaming,
    Completed,
    Failed,
}

/// Why a transfer ended in [`TransferState::Failed`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TransferFailure {
    /// The source could not be opened.
    Open { message: String },
    /// Reading failed after `offset` bytes had been emitted.
    Read { offset: u64, message: String },
    /// The file needs more packets than the 32-bit sequence space holds.
    SequenceExhausted { offset: u64 },
}

/// What happened to the source file after the transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DeletionOutcome {
    NotRequested,
    Deleted,
    /// Requested, but the transfer failed so the file was kept.
    Skipped,
    Failed { message: String },
}

/// Final result of one transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransferReport {
    pub appid: DltId,
    pub ctxid: DltId,
    pub file_name: String,
    pub state: TransferState,
    /// Packets handed to the emitter, `Error` packets included.
    pub packets_emitted: u64,
    pub bytes_sent: u64,
    pub failure: Option<TransferFailure>,
    pub deletion: DeletionOutcome,
}

impl TransferReport {
    pub fn is_completed(&self) -> bool {
        self.state == TransferState::Completed
    }
}

/// Worker-local state of one transfer. Never shared.
struct TransferTask {
    entry: FileTransferEntry,
    byte_offset: u64,
    sequence_number: u32,
    packets_emitted: u64,
    state: TransferState,
}

/// Runs a single file transfer to completion.
pub struct TransferWorker {
    task: TransferTask,
    chunk_size: usize,
    emitter: Arc<dyn PacketEmitter>,
}

impl TransferWorker {
    pub fn new(entry: FileTransferEntry, chunk_size: usize, emitter: Arc<dyn PacketEmitter>) -> Self {
        Self {
            task: TransferTask {
                entry,
                byte_offset: 0,
                sequence_number: FIRST_SEQUENCE_NUMBER,
                packets_emitted: 0,
                state: TransferState::Idle,
            },
            chunk_size,
            emitter,
        }
    }

    /// Opens the source and streams it. Blocks on file I/O and on the emitter.
    pub fn run(mut self) -> TransferReport {
        self.task.state = TransferState::Opening;
        match ChunkReader::open(self.task.entry.path(), self.chunk_size) {
            Ok(reader) => self.stream(reader),
            Err(err) => self.fail_open(err),
        }
    }

    fn stream<R: Read>(mut self, mut reader: ChunkReader<R>) -> TransferReport {
        self.task.state = TransferState::Streaming;
        tracing::debug!(
            file = %self.task.entry.file_name,
            chunk_size = reader.chunk_size(),
            "streaming file"
        );

        loop {
            match reader.next_chunk() {
                Ok(Some(chunk)) => {
                    if self.task.sequence_number == u32::MAX {
                        let offset = self.task.byte_offset;
                        return self.fail(TransferFailure::SequenceExhausted { offset });
                    }
                    self.emit(chunk, PacketLevel::Info);
                    self.task.byte_offset += chunk.len() as u64;
                }
                Ok(None) => break,
                Err(err) => {
                    let failure = TransferFailure::Read {
                        offset: self.task.byte_offset,
                        message: err.to_string(),
                    };
                    return self.fail(failure);
                }
            }
        }

        self.task.state = TransferState::Completed;
        let deletion = self.delete_source();
        tracing::info!(
            appid = %self.task.entry.appid,
            ctxid = %self.task.entry.ctxid,
            file = %self.task.entry.file_name,
            packets = self.task.packets_emitted,
            bytes = self.task.byte_offset,
            "file transfer completed"
        );
        self.into_report(None, deletion)
    }

    fn fail_open(self, err: TransferError) -> TransferReport {
        let message = format!("cannot open {}: {err}", self.task.entry.file_name);
        self.fail(TransferFailure::Open { message })
    }

    /// Emits the failure notice and finishes in `Failed`.
    fn fail(mut self, failure: TransferFailure) -> TransferReport {
        let notice = match &failure {
            TransferFailure::Open { message } => format!("file transfer failed: {message}"),
            TransferFailure::Read { offset, message } => format!(
                "file transfer of {} aborted after {offset} bytes: {message}",
                self.task.entry.file_name
            ),
            TransferFailure::SequenceExhausted { offset } => format!(
                "file transfer of {} aborted after {offset} bytes: too many packets",
                self.task.entry.file_name
            ),
        };
        // The last sequence number stays free for this notice.
        self.emit(notice.as_bytes(), PacketLevel::Error);
        self.task.state = TransferState::Failed;

        tracing::error!(
            appid = %self.task.entry.appid,
            ctxid = %self.task.entry.ctxid,
            file = %self.task.entry.file_name,
            packets = self.task.packets_emitted,
            "{notice}"
        );

        let deletion = if self.task.entry.delete_file {
            DeletionOutcome::Skipped
        } else {
            DeletionOutcome::NotRequested
        };
        self.into_report(Some(failure), deletion)
    }

    fn emit(&mut self, payload: &[u8], level: PacketLevel) {
        let packet = Packet {
            payload,
            level,
            appid: self.task.entry.appid,
            ctxid: self.task.entry.ctxid,
            sequence_number: self.task.sequence_number,
            timestamp: timestamp::now(),
        };
        self.emitter.emit(&packet);
        self.task.packets_emitted += 1;
        self.task.sequence_number = self.task.sequence_number.saturating_add(1);
    }

    fn delete_source(&self) -> DeletionOutcome {
        if !self.task.entry.delete_file {
            return DeletionOutcome::NotRequested;
        }
        match std::fs::remove_file(self.task.entry.path()) {
            Ok(()) => {
                tracing::debug!(file = %self.task.entry.file_name, "deleted transferred file");
                DeletionOutcome::Deleted
            }
            Err(err) => {
                tracing::warn!(
                    file = %self.task.entry.file_name,
                    error = %err,
                    "failed to delete transferred file"
                );
                DeletionOutcome::Failed {
                    message: err.to_string(),
                }
            }
        }
    }

    fn into_report(self, failure: Option<TransferFailure>, deletion: DeletionOutcome) -> TransferReport {
        let TransferTask {
            entry,
            byte_offset,
            packets_emitted,
            state,
            ..
        } = self.task;
        TransferReport {
            appid: entry.appid,
            ctxid: entry.ctxid,
            file_name: entry.file_name,
            state,
            packets_emitted,
            bytes_sent: byte_offset,
            failure,
            deletion,
        }
    }
}
