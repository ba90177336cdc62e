//! Datagram output.

use std::io::{self, IoSlice};
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr, UdpSocket};

/// Sends one datagram assembled from `bufs`.
pub trait DatagramSender: Send + Sync {
    fn send(&self, bufs: &[IoSlice<'_>]) -> io::Result<usize>;
}

impl DatagramSender for UdpSocket {
    fn send(&self, bufs: &[IoSlice<'_>]) -> io::Result<usize> {
        let total = bufs.iter().map(|b| b.len()).sum();
        let mut datagram = Vec::with_capacity(total);
        for buf in bufs {
            datagram.extend_from_slice(buf);
        }
        UdpSocket::send(self, &datagram)
    }
}

/// Binds an ephemeral local port and connects it to `target`.
pub fn connect_udp(target: SocketAddr) -> io::Result<UdpSocket> {
    let local: SocketAddr = match target {
        SocketAddr::V4(_) => (Ipv4Addr::UNSPECIFIED, 0).into(),
        SocketAddr::V6(_) => (Ipv6Addr::UNSPECIFIED, 0).into(),
    };
    let socket = UdpSocket::bind(local)?;
    socket.connect(target)?;
    tracing::debug!(local = %socket.local_addr()?, %target, "DLT output socket connected");
    Ok(socket)
}
