//! Entry point for inbound file transfer records.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use dltrouter_protocol::{DecodeError, decode_entry};
use tokio::runtime::Handle;
use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinHandle};

use crate::emitter::PacketEmitter;
use crate::worker::{TransferReport, TransferWorker};
use crate::{TransferConfig, TransferError};

/// Consumer of one kind of inbound record.
///
/// `handle` is called on the routing thread and must return in bounded time.
pub trait TypeHandler: Send + Sync {
    fn handle(&self, timestamp: Instant, data: &[u8]);
}

/// Why a record was not turned into a transfer.
#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    #[error("malformed file transfer record: {0}")]
    Decode(#[from] DecodeError),

    #[error("too many file transfers in flight ({in_flight}/{limit})")]
    Saturated { in_flight: usize, limit: usize },
}

/// Awaitable result of a submitted transfer.
///
/// Dropping the handle detaches the transfer; it still runs to the end.
#[derive(Debug)]
pub struct TransferHandle {
    join: JoinHandle<Result<TransferReport, JoinError>>,
}

impl TransferHandle {
    pub async fn join(self) -> Result<TransferReport, TransferError> {
        Ok(self.join.await??)
    }
}

/// Decodes transfer records and runs each valid one on the blocking pool.
pub struct StreamHandler {
    emitter: Arc<dyn PacketEmitter>,
    runtime: Handle,
    permits: Arc<Semaphore>,
    in_flight: Arc<AtomicUsize>,
    admission_limit: usize,
    chunk_size: usize,
}

impl StreamHandler {
    pub fn new(config: &TransferConfig, emitter: Arc<dyn PacketEmitter>, runtime: Handle) -> Self {
        let concurrent = config
            .max_concurrent_transfers
            .clamp(1, Semaphore::MAX_PERMITS);
        Self {
            emitter,
            runtime,
            permits: Arc::new(Semaphore::new(concurrent)),
            in_flight: Arc::new(AtomicUsize::new(0)),
            admission_limit: concurrent.saturating_add(config.max_pending_transfers),
            chunk_size: config.chunk_size,
        }
    }

    /// Decodes `data` and starts a transfer for it.
    ///
    /// Returns without waiting for any file I/O. Transfers beyond the
    /// running and pending limits are rejected instead of queued.
    pub fn submit(&self, timestamp: Instant, data: &[u8]) -> Result<TransferHandle, SubmitError> {
        let entry = decode_entry(data)?;
        let slot = self.admit()?;

        tracing::debug!(
            appid = %entry.appid,
            ctxid = %entry.ctxid,
            file = %entry.file_name,
            delete = entry.delete_file,
            queued_us = u64::try_from(timestamp.elapsed().as_micros()).unwrap_or(u64::MAX),
            "file transfer accepted"
        );

        let worker = TransferWorker::new(entry, self.chunk_size, Arc::clone(&self.emitter));
        let permits = Arc::clone(&self.permits);
        let join = self.runtime.spawn(async move {
            let _slot = slot;
            // The semaphore is never closed.
            let _permit = permits.acquire_owned().await.ok();
            tokio::task::spawn_blocking(move || worker.run()).await
        });

        Ok(TransferHandle { join })
    }

    /// Transfers accepted and not yet finished, waiting ones included.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::Acquire)
    }

    fn admit(&self) -> Result<InFlightSlot, SubmitError> {
        let limit = self.admission_limit;
        self.in_flight
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                (n < limit).then_some(n + 1)
            })
            .map_err(|in_flight| SubmitError::Saturated { in_flight, limit })?;
        Ok(InFlightSlot(Arc::clone(&self.in_flight)))
    }
}

impl TypeHandler for StreamHandler {
    fn handle(&self, timestamp: Instant, data: &[u8]) {
        match self.submit(timestamp, data) {
            Ok(_detached) => {}
            Err(SubmitError::Decode(err)) => {
                tracing::debug!(error = %err, len = data.len(), "dropping file transfer record");
            }
            Err(err @ SubmitError::Saturated { .. }) => {
                tracing::warn!(error = %err, "file transfer rejected");
            }
        }
    }
}

/// Releases one admission slot when dropped.
struct InFlightSlot(Arc<AtomicUsize>);

impl Drop for InFlightSlot {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}

/// Stand-in used when file transfer is switched off.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledStreamHandler;

impl TypeHandler for DisabledStreamHandler {
    fn handle(&self, _timestamp: Instant, data: &[u8]) {
        tracing::warn!(len = data.len(), "file transfer feature is disabled");
    }
}

/// Builds the file transfer handler for `config`.
pub fn create_handler(
    config: &TransferConfig,
    emitter: Arc<dyn PacketEmitter>,
    runtime: Handle,
) -> Box<dyn TypeHandler> {
    if config.enabled {
        Box::new(StreamHandler::new(config, emitter, runtime))
    } else {
        Box::new(DisabledStreamHandler)
    }
}
