//! Frame format: `[1 byte: kind][rest: record body]`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use dltrouter_transfer::TypeHandler;
use serde::Serialize;

use crate::MAX_FRAME_LEN;
use crate::error::RouterError;

/// Every record kind the router understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum RecordKind {
    /// Plain text log line from an application.
    Log = 0x01,
    /// Encoded file transfer entry.
    FileTransfer = 0x02,
}

impl RecordKind {
    pub fn tag(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for RecordKind {
    type Error = RouterError;

    fn try_from(tag: u8) -> Result<Self, Self::Error> {
        match tag {
            0x01 => Ok(Self::Log),
            0x02 => Ok(Self::FileTransfer),
            other => Err(RouterError::UnknownKind(other)),
        }
    }
}

/// Builds an ingress frame.
pub fn encode_frame(kind: RecordKind, body: &[u8]) -> Result<Vec<u8>, RouterError> {
    let len = body.len() + 1;
    if len > MAX_FRAME_LEN {
        return Err(RouterError::FrameTooLarge(len));
    }
    let mut frame = Vec::with_capacity(len);
    frame.push(kind.tag());
    frame.extend_from_slice(body);
    Ok(frame)
}

/// Snapshot of the router counters.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RouterStats {
    pub log_records: u64,
    pub file_transfer_records: u64,
    /// Frames with a tag outside [`RecordKind`].
    pub unknown_records: u64,
    pub empty_frames: u64,
}

#[derive(Default)]
struct Counters {
    log_records: AtomicU64,
    file_transfer_records: AtomicU64,
    unknown_records: AtomicU64,
    empty_frames: AtomicU64,
}

/// Dispatches records to their handlers.
pub struct Router {
    file_transfer: Box<dyn TypeHandler>,
    log: Option<Box<dyn TypeHandler>>,
    counters: Counters,
}

impl Router {
    pub fn new(file_transfer: Box<dyn TypeHandler>) -> Self {
        Self {
            file_transfer,
            log: None,
            counters: Counters::default(),
        }
    }

    pub fn with_log_handler(mut self, handler: Box<dyn TypeHandler>) -> Self {
        self.log = Some(handler);
        self
    }

    /// Hands `body` to the handler registered for `kind`.
    pub fn dispatch(&self, kind: RecordKind, timestamp: Instant, body: &[u8]) {
        match kind {
            RecordKind::FileTransfer => {
                self.counters
                    .file_transfer_records
                    .fetch_add(1, Ordering::Relaxed);
                self.file_transfer.handle(timestamp, body);
            }
            RecordKind::Log => {
                self.counters.log_records.fetch_add(1, Ordering::Relaxed);
                match &self.log {
                    Some(handler) => handler.handle(timestamp, body),
                    None => tracing::trace!(len = body.len(), "log record without handler"),
                }
            }
        }
    }

    /// Routes a record by its raw tag. Unknown tags are counted and dropped.
    pub fn route(&self, tag: u8, timestamp: Instant, body: &[u8]) -> Result<RecordKind, RouterError> {
        let kind = RecordKind::try_from(tag).inspect_err(|_| {
            self.counters.unknown_records.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(tag, len = body.len(), "dropping record of unknown kind");
        })?;
        self.dispatch(kind, timestamp, body);
        Ok(kind)
    }

    /// Splits a frame into tag and body and routes it.
    pub fn route_frame(&self, timestamp: Instant, frame: &[u8]) -> Result<RecordKind, RouterError> {
        let Some((&tag, body)) = frame.split_first() else {
            self.counters.empty_frames.fetch_add(1, Ordering::Relaxed);
            return Err(RouterError::EmptyFrame);
        };
        self.route(tag, timestamp, body)
    }

    pub fn stats(&self) -> RouterStats {
        RouterStats {
            log_records: self.counters.log_records.load(Ordering::Relaxed),
            file_transfer_records: self.counters.file_transfer_records.load(Ordering::Relaxed),
            unknown_records: self.counters.unknown_records.load(Ordering::Relaxed),
            empty_frames: self.counters.empty_frames.load(Ordering::Relaxed),
        }
    }
}

/// Writes `Log` records to the tracing output.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLogHandler;

impl TypeHandler for TracingLogHandler {
    fn handle(&self, _timestamp: Instant, data: &[u8]) {
        let text = String::from_utf8_lossy(data);
        tracing::info!(target: "dltrouter::record", "{}", text.trim_end());
    }
}
