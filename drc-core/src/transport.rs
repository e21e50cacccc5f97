//! UDP transport for VSTRM video packets.
//!
//! Each [`VstrmPacket`] travels as exactly one datagram, so payloads are
//! already bounded below the link MTU by the codec. The transport owns
//! the 10-bit sequence counter and stamps every packet at send time;
//! concurrent senders share the counter through an atomic, never a lock.

use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::sync::atomic::{AtomicU16, AtomicU64, Ordering};

use tokio::net::UdpSocket;
use tracing::trace;

use crate::error::DrcError;
use crate::vstrm::{MAX_SEQ_ID, MAX_VSTRM_PACKET_SIZE, VstrmPacket};

// ── VstrmTransport ───────────────────────────────────────────────

/// Outbound VSTRM transport bound to one destination.
pub struct VstrmTransport {
    socket: UdpSocket,
    remote_addr: SocketAddr,
    sequence: AtomicU16,
    /// Total bytes sent since construction.
    bytes_sent: AtomicU64,
}

impl VstrmTransport {
    /// Wrap an already-bound `UdpSocket` targeting `remote_addr`.
    pub fn new(socket: UdpSocket, remote_addr: SocketAddr) -> Self {
        Self {
            socket,
            remote_addr,
            sequence: AtomicU16::new(0),
            bytes_sent: AtomicU64::new(0),
        }
    }

    /// Bind an ephemeral local port of the same address family as `remote_addr`.
    pub async fn bind(remote_addr: SocketAddr) -> Result<Self, DrcError> {
        let local = unspecified_like(remote_addr);
        let socket = UdpSocket::bind(local)
            .await
            .map_err(|source| DrcError::Bind { addr: local, source })?;
        Ok(Self::new(socket, remote_addr))
    }

    /// Start the sequence counter at `seq` (masked to 10 bits).
    pub fn with_initial_sequence(self, seq: u16) -> Self {
        self.sequence.store(seq & MAX_SEQ_ID, Ordering::Relaxed);
        self
    }

    /// Total bytes sent across all packets.
    pub fn bytes_sent(&self) -> u64 {
        self.bytes_sent.load(Ordering::Relaxed)
    }

    /// Reserve `count` consecutive sequence ids, returning the first.
    fn reserve(&self, count: usize) -> u16 {
        self.sequence.fetch_add(count as u16, Ordering::SeqCst) & MAX_SEQ_ID
    }

    /// Stamp sequence ids onto `packets` and send them in order.
    ///
    /// Ids for the whole batch are reserved up front, so packets from
    /// concurrent callers never interleave within one id range.
    pub async fn send_packets(&self, mut packets: Vec<VstrmPacket>) -> Result<(), DrcError> {
        let first = self.reserve(packets.len());

        let mut sent_total = 0usize;
        for (i, pkt) in packets.iter_mut().enumerate() {
            let seq = first.wrapping_add(i as u16) & MAX_SEQ_ID;
            pkt.set_seq_id(seq);

            let bytes = pkt.as_bytes();
            self.socket.send_to(bytes, self.remote_addr).await?;
            sent_total += bytes.len();
        }

        trace!(
            "sent {} packets ({sent_total} bytes) to {}",
            packets.len(),
            self.remote_addr
        );
        self.bytes_sent
            .fetch_add(sent_total as u64, Ordering::Relaxed);
        Ok(())
    }

    /// Receive and parse the next datagram.
    pub async fn recv_packet(&self) -> Result<(VstrmPacket, SocketAddr), DrcError> {
        let mut buf = [0u8; MAX_VSTRM_PACKET_SIZE];
        let (len, peer) = self.socket.recv_from(&mut buf).await?;
        Ok((VstrmPacket::from_bytes(&buf[..len])?, peer))
    }

    /// Returns a reference to the underlying socket.
    pub fn socket(&self) -> &UdpSocket {
        &self.socket
    }

    /// The remote address this transport targets.
    pub fn remote_addr(&self) -> SocketAddr {
        self.remote_addr
    }
}

/// Any local address, ephemeral port, in the family of `addr`.
pub(crate) fn unspecified_like(addr: SocketAddr) -> SocketAddr {
    match addr {
        SocketAddr::V4(_) => (Ipv4Addr::UNSPECIFIED, 0).into(),
        SocketAddr::V6(_) => (Ipv6Addr::UNSPECIFIED, 0).into(),
    }
}

// ── Tests ────────────────────────────────────────────────────────
