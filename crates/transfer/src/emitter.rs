use dltrouter_protocol::{DltId, LogLevel};
use serde::Serialize;

/// Level of a file transfer packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PacketLevel {
    /// File content.
    Info,
    /// Failure notice; the payload is a UTF-8 message.
    Error,
}

impl From<PacketLevel> for LogLevel {
    fn from(level: PacketLevel) -> Self {
        match level {
            PacketLevel::Info => LogLevel::Info,
            PacketLevel::Error => LogLevel::Error,
        }
    }
}

/// One unit handed to a [`PacketEmitter`].
///
/// The payload borrows the worker's chunk buffer and is only valid for the
/// duration of the `emit` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Packet<'a> {
    pub payload: &'a [u8],
    pub level: PacketLevel,
    pub appid: DltId,
    pub ctxid: DltId,
    /// Per-transfer counter starting at
    /// [`FIRST_SEQUENCE_NUMBER`](crate::FIRST_SEQUENCE_NUMBER).
    pub sequence_number: u32,
    /// DLT timestamp taken when the packet was built.
    pub timestamp: u32,
}

/// Outbound side of a file transfer.
///
/// Workers of concurrent transfers call `emit` from different threads, so
/// implementations serialize access internally. Delivery failures stay
/// inside the emitter.
pub trait PacketEmitter: Send + Sync {
    fn emit(&self, packet: &Packet<'_>);
}

#[cfg(test)]
pub(crate) mod recording {
    use std::sync::Mutex;

    use super::*;

    /// Owned copy of an emitted packet.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub(crate) struct RecordedPacket {
        pub payload: Vec<u8>,
        pub level: PacketLevel,
        pub appid: DltId,
        pub ctxid: DltId,
        pub sequence_number: u32,
    }

    /// Emitter that keeps every packet in memory.
    #[derive(Default)]
    pub(crate) struct RecordingEmitter {
        packets: Mutex<Vec<RecordedPacket>>,
    }

    impl RecordingEmitter {
        pub(crate) fn packets(&self) -> Vec<RecordedPacket> {
            self.packets.lock().unwrap().clone()
        }

        pub(crate) fn count(&self, level: PacketLevel) -> usize {
            self.packets
                .lock()
                .unwrap()
                .iter()
                .filter(|p| p.level == level)
                .count()
        }

        pub(crate) fn is_empty(&self) -> bool {
            self.packets.lock().unwrap().is_empty()
        }
    }

    impl PacketEmitter for RecordingEmitter {
        fn emit(&self, packet: &Packet<'_>) {
            self.packets.lock().unwrap().push(RecordedPacket {
                payload: packet.payload.to_vec(),
                level: packet.level,
                appid: packet.appid,
                ctxid: packet.ctxid,
                sequence_number: packet.sequence_number,
            });
        }
    }
}
