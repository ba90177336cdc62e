//! Thread-safe DLT log channel.

use std::io::IoSlice;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use dltrouter_protocol::{DEFAULT_ECU_ID, DltId, LogLevel};
use dltrouter_transfer::{Packet, PacketEmitter};
use serde::Serialize;

use crate::error::ChannelError;
use crate::header::VerboseHeader;
use crate::udp::DatagramSender;
use crate::verbose::{self, PACKET_ARGUMENT_COUNT};
use crate::{DEFAULT_BURST_COUNT, DEFAULT_BURST_INTERVAL};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelConfig {
    /// ECU id written into every header.
    pub ecu_id: DltId,
    /// Packets per burst; 0 disables pacing.
    pub burst_count: u32,
    /// Minimum time between the previous send and the first packet after
    /// a full burst.
    pub burst_interval: Duration,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            ecu_id: DEFAULT_ECU_ID,
            burst_count: DEFAULT_BURST_COUNT,
            burst_interval: DEFAULT_BURST_INTERVAL,
        }
    }
}

/// Counters since the channel was created.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ChannelStats {
    /// Datagrams handed to the socket successfully.
    pub messages: u64,
    /// Bytes in those datagrams, headers included.
    pub bytes: u64,
    pub send_failures: u64,
    /// Packets that could not be framed.
    pub dropped: u64,
}

struct ChannelState {
    message_counter: u8,
    burst_counter: u32,
    last_send: Option<Instant>,
    scratch: Vec<u8>,
    stats: ChannelStats,
}

/// Frames packets as DLT verbose messages and sends one datagram each.
///
/// Sends are serialized by an internal lock, so one channel can be shared
/// by every transfer worker. Every `burst_count` packets the sending thread
/// sleeps until `burst_interval` has passed since the previous send.
pub struct DltLogChannel<S> {
    sender: S,
    config: ChannelConfig,
    state: Mutex<ChannelState>,
}

impl<S: DatagramSender> DltLogChannel<S> {
    pub fn new(sender: S, config: ChannelConfig) -> Self {
        Self {
            sender,
            config,
            state: Mutex::new(ChannelState {
                message_counter: 0,
                burst_counter: 0,
                last_send: None,
                scratch: Vec::new(),
                stats: ChannelStats::default(),
            }),
        }
    }

    pub fn stats(&self) -> ChannelStats {
        match self.state.lock() {
            Ok(state) => state.stats,
            Err(poisoned) => poisoned.into_inner().stats,
        }
    }

    pub fn config(&self) -> &ChannelConfig {
        &self.config
    }

    /// Frames and sends `packet`, blocking for burst pacing if due.
    ///
    /// Failures are counted in [`stats`](Self::stats) as well as returned.
    pub fn send_packet(&self, packet: &Packet<'_>) -> Result<usize, ChannelError> {
        let mut guard = self
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let state = &mut *guard;

        if let Err(err) = verbose::encode_packet(&mut state.scratch, packet) {
            state.stats.dropped += 1;
            return Err(err);
        }
        let header = match VerboseHeader::log(
            state.message_counter,
            state.scratch.len(),
            self.config.ecu_id,
            packet.timestamp,
            LogLevel::from(packet.level),
            PACKET_ARGUMENT_COUNT,
            packet.appid,
            packet.ctxid,
        ) {
            Ok(header) => header,
            Err(err) => {
                state.stats.dropped += 1;
                return Err(err);
            }
        };

        state.burst_counter = state.burst_counter.wrapping_add(1);
        if let Some(wait) = burst_delay(
            state.burst_counter,
            self.config.burst_count,
            state.last_send,
            self.config.burst_interval,
            Instant::now(),
        ) {
            std::thread::sleep(wait);
        }

        let header_bytes = header.to_bytes();
        let result = self
            .sender
            .send(&[IoSlice::new(&header_bytes), IoSlice::new(&state.scratch)]);
        state.message_counter = state.message_counter.wrapping_add(1);
        state.last_send = Some(Instant::now());

        match result {
            Ok(sent) => {
                state.stats.messages += 1;
                state.stats.bytes += sent as u64;
                Ok(sent)
            }
            Err(err) => {
                state.stats.send_failures += 1;
                Err(err.into())
            }
        }
    }
}

impl<S: DatagramSender> PacketEmitter for DltLogChannel<S> {
    fn emit(&self, packet: &Packet<'_>) {
        if let Err(err) = self.send_packet(packet) {
            tracing::debug!(
                appid = %packet.appid,
                ctxid = %packet.ctxid,
                seq = packet.sequence_number,
                error = %err,
                "DLT send failed"
            );
        }
    }
}

/// Time to wait before sending packet number `counter` (1-based).
fn burst_delay(
    counter: u32,
    burst_count: u32,
    last_send: Option<Instant>,
    interval: Duration,
    now: Instant,
) -> Option<Duration> {
    if burst_count == 0 || counter % burst_count != 0 {
        return None;
    }
    let due = last_send? + interval;
    let wait = due.saturating_duration_since(now);
    (!wait.is_zero()).then_some(wait)
}
