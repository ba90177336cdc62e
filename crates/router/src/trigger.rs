//! Application-side file transfer trigger.

use std::net::{SocketAddr, UdpSocket};
use std::time::Instant;

use dltrouter_dlt_channel::connect_udp;
use dltrouter_protocol::{DltId, FileTransferEntry, encode_entry};

use crate::error::RouterError;
use crate::router::{RecordKind, Router, encode_frame};

/// Destination for records produced by an application.
pub trait RecordSink: Send + Sync {
    fn submit(&self, kind: RecordKind, body: &[u8]) -> Result<(), RouterError>;
}

/// In-process delivery straight into the router.
impl RecordSink for Router {
    fn submit(&self, kind: RecordKind, body: &[u8]) -> Result<(), RouterError> {
        self.dispatch(kind, Instant::now(), body);
        Ok(())
    }
}

/// Sends frames to a router's ingress socket.
#[derive(Debug)]
pub struct UdpRecordSink {
    socket: UdpSocket,
}

impl UdpRecordSink {
    pub fn connect(ingress: SocketAddr) -> Result<Self, RouterError> {
        Ok(Self {
            socket: connect_udp(ingress)?,
        })
    }
}

impl RecordSink for UdpRecordSink {
    fn submit(&self, kind: RecordKind, body: &[u8]) -> Result<(), RouterError> {
        let frame = encode_frame(kind, body)?;
        self.socket.send(&frame)?;
        Ok(())
    }
}

/// Something that can ask for a file to be streamed.
pub trait TransferTrigger: Send + Sync {
    /// Requests a transfer of `file_name`, removing it afterwards if
    /// `delete_file` is set. Returns once the request is handed off.
    fn transfer_file(&self, file_name: &str, delete_file: bool) -> Result<(), RouterError>;
}

/// Requests file transfers on behalf of one application context.
pub struct FileTransfer<S> {
    sink: S,
    appid: DltId,
    ctxid: DltId,
}

impl<S: RecordSink> FileTransfer<S> {
    pub fn new(sink: S, appid: DltId, ctxid: DltId) -> Self {
        Self { sink, appid, ctxid }
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }
}

impl<S: RecordSink> TransferTrigger for FileTransfer<S> {
    fn transfer_file(&self, file_name: &str, delete_file: bool) -> Result<(), RouterError> {
        let entry = FileTransferEntry::new(self.appid, self.ctxid, file_name, delete_file);
        let body = encode_entry(&entry)?;
        self.sink.submit(RecordKind::FileTransfer, &body)?;
        tracing::debug!(
            appid = %self.appid,
            ctxid = %self.ctxid,
            file = file_name,
            delete = delete_file,
            "file transfer requested"
        );
        Ok(())
    }
}
