//! Real socket adapters wiring the sans-IO [`crate::sender::Sender`] and
//! [`crate::receiver::Receiver`] state machines to actual multicast/unicast
//! UDP sockets.
//!
//! Both sides use a single non-blocking socket registered with an
//! [`mio::Poll`] for readiness, polled with a bounded timeout — the same
//! pattern the sibling example repo `SleepingPills-bushhammer` uses for its
//! non-blocking socket channel. `SO_REUSEADDR` is set via `socket2` before
//! bind, since stable `std::net::UdpSocket` has no setter for it; multicast
//! group membership and TTL use `std`'s own stable APIs directly.

use std::{
    io,
    net::{Ipv4Addr, SocketAddr, SocketAddrV4},
    time::Duration,
};

use mio::{Events, Interest, Poll, Token};
use socket2::{Domain, Protocol, Socket, Type};
use tracing::trace;

const TOKEN: Token = Token(0);
const RECV_BUF_SIZE: usize = 65536;

fn bind_reusable(port: u16) -> io::Result<std::net::UdpSocket> {
    let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))?;
    socket.set_reuse_address(true)?;
    let addr: SocketAddr = SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, port).into();
    socket.bind(&addr.into())?;
    socket.set_nonblocking(true)?;
    Ok(socket.into())
}

/// The sender's socket: sends on the multicast group, receives unicast
/// feedback on the same bound port.
pub struct SenderChannel {
    socket: mio::net::UdpSocket,
    poll: Poll,
    events: Events,
    group: SocketAddr,
}

impl SenderChannel {
    /// Binds to `port` on all interfaces and prepares to send to
    /// `group_ip:port`.
    pub fn new(group_ip: Ipv4Addr, port: u16) -> io::Result<Self> {
        let std_socket = bind_reusable(port)?;
        std_socket.set_multicast_ttl_v4(4)?;
        let mut socket = mio::net::UdpSocket::from_std(std_socket);
        let poll = Poll::new()?;
        poll.registry().register(&mut socket, TOKEN, Interest::READABLE)?;
        Ok(Self {
            socket,
            poll,
            events: Events::with_capacity(128),
            group: SocketAddr::V4(SocketAddrV4::new(group_ip, port)),
        })
    }

    /// Sends one datagram to the multicast group.
    pub fn send(&self, datagram: &[u8]) -> io::Result<()> {
        self.socket.send_to(datagram, self.group)?;
        Ok(())
    }

    /// Polls for up to `timeout` (capped by `SPEC_FULL.md` §4.7 at 1
    /// second) and drains every unicast feedback datagram available,
    /// decoded just far enough to dispatch into
    /// [`crate::sender::ReceiverEvent`]s by the caller (this function
    /// returns raw bytes; decoding the deficit payload needs the
    /// variant, which this socket layer doesn't know).
    pub fn poll_incoming(&mut self, timeout: Duration) -> io::Result<Vec<Vec<u8>>> {
        self.poll.poll(&mut self.events, Some(timeout))?;
        let mut out = Vec::new();
        let mut buf = [0u8; RECV_BUF_SIZE];
        loop {
            match self.socket.recv_from(&mut buf) {
                Ok((n, _src)) => out.push(buf[..n].to_vec()),
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(e) => return Err(e),
            }
        }
        Ok(out)
    }
}

/// The receiver's socket: joins the multicast group to receive data,
/// sends unicast feedback to the sender's address learned from the source
/// address of the first datagram received.
pub struct ReceiverChannel {
    socket: mio::net::UdpSocket,
    poll: Poll,
    events: Events,
    sender_addr: Option<SocketAddr>,
}

impl ReceiverChannel {
    /// Binds to `port` on all interfaces and joins `group_ip`.
    pub fn new(group_ip: Ipv4Addr, port: u16) -> io::Result<Self> {
        let std_socket = bind_reusable(port)?;
        std_socket.join_multicast_v4(&group_ip, &Ipv4Addr::UNSPECIFIED)?;
        let mut socket = mio::net::UdpSocket::from_std(std_socket);
        let poll = Poll::new()?;
        poll.registry().register(&mut socket, TOKEN, Interest::READABLE)?;
        Ok(Self {
            socket,
            poll,
            events: Events::with_capacity(128),
            sender_addr: None,
        })
    }

    /// Sends one unicast feedback datagram to the sender, if its address
    /// has been learned yet. Returns `Ok(false)` (not an error) if no
    /// sender has been observed yet.
    pub fn send_feedback(&self, datagram: &[u8]) -> io::Result<bool> {
        let Some(addr) = self.sender_addr else {
            trace!("dropping feedback, no sender address learned yet");
            return Ok(false);
        };
        self.socket.send_to(datagram, addr)?;
        Ok(true)
    }

    /// Polls for up to `timeout` and drains every multicast datagram
    /// available, learning the sender's address from the first one seen.
    pub fn poll_incoming(&mut self, timeout: Duration) -> io::Result<Vec<Vec<u8>>> {
        self.poll.poll(&mut self.events, Some(timeout))?;
        let mut out = Vec::new();
        let mut buf = [0u8; RECV_BUF_SIZE];
        loop {
            match self.socket.recv_from(&mut buf) {
                Ok((n, src)) => {
                    if self.sender_addr.is_none() {
                        self.sender_addr = Some(src);
                    }
                    out.push(buf[..n].to_vec());
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(e) => return Err(e),
            }
        }
        Ok(out)
    }
}
