//! Per-connection state.
//!
//! A flat bitset of lifecycle flags (accepted, connecting, handshake
//! done, finished-sending, buffer-but-don't-send, close-immediately)
//! is split here into a [`ConnState`] tag for the mutually exclusive
//! lifecycle positions and two orthogonal booleans for the flags that
//! can be true at any point in that lifecycle.

use std::any::Any;
use std::net::SocketAddr;
use std::time::Instant;

use mio::net::TcpStream;
use mio::{Interest, Token};

use crate::iobuf::IoBuf;

#[cfg(feature = "tls")]
use crate::tls::TlsSession;

slotmap::new_key_type! {
    /// Stable identity for a live connection inside a [`crate::server::Server`]'s arena.
    pub struct ConnKey;
}

/// Which side initiated the connection: every connection is one or
/// the other, never neither.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Accepted from a listening socket.
    Inbound,
    /// Opened via [`crate::server::Server::connect`].
    Outbound,
}

/// The connection's position in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnState {
    /// Outbound TCP connect issued, waiting for writability to confirm
    /// completion. Never observed on an inbound connection.
    Connecting,
    /// TLS handshake in progress, for either direction.
    Handshaking,
    /// Ordinary read/write traffic flows.
    Established,
    /// `finish_sending` was called; no more application data will be
    /// queued, and the connection closes once `send_iobuf` drains.
    Draining,
}

/// One live connection: its socket, buffers, lifecycle state, and
/// opaque per-connection user data.
pub struct Connection {
    pub(crate) socket: TcpStream,
    pub(crate) direction: Direction,
    pub(crate) state: ConnState,
    pub(crate) buffer_but_dont_send: bool,
    pub(crate) close_immediately: bool,
    pub(crate) recv_iobuf: IoBuf,
    pub(crate) send_iobuf: IoBuf,
    pub(crate) last_io_time: Instant,
    pub(crate) peer_addr: Option<SocketAddr>,
    pub(crate) user_data: Option<Box<dyn Any + Send>>,
    #[cfg(feature = "tls")]
    pub(crate) tls: Option<TlsSession>,
    /// The mio registry token this connection's socket is currently
    /// registered under. Assigned once, at insertion, by the server.
    pub(crate) token: Token,
    /// Interest set last handed to `Registry::reregister`, so Phase A
    /// of `poll` only reregisters when the desired set actually
    /// changed, rather than every sweep.
    pub(crate) registered_interest: Interest,
    /// True when the in-progress TLS handshake's last step returned
    /// want-write, so Phase A knows to arm write-readiness for a
    /// `Handshaking` connection too.
    pub(crate) handshake_wants_write: bool,
}

impl Connection {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        socket: TcpStream,
        direction: Direction,
        peer_addr: Option<SocketAddr>,
        iobuf_capacity: usize,
        growth_multiplier: f64,
        token: Token,
        #[cfg(feature = "tls")] tls: Option<TlsSession>,
    ) -> Self {
        let state = match direction {
            Direction::Outbound => ConnState::Connecting,
            Direction::Inbound => {
                #[cfg(feature = "tls")]
                {
                    if tls.is_some() {
                        ConnState::Handshaking
                    } else {
                        ConnState::Established
                    }
                }
                #[cfg(not(feature = "tls"))]
                {
                    ConnState::Established
                }
            }
        };

        Self {
            socket,
            direction,
            state,
            buffer_but_dont_send: false,
            close_immediately: false,
            recv_iobuf: IoBuf::with_capacity(iobuf_capacity, growth_multiplier),
            send_iobuf: IoBuf::with_capacity(iobuf_capacity, growth_multiplier),
            last_io_time: Instant::now(),
            peer_addr,
            user_data: None,
            #[cfg(feature = "tls")]
            tls,
            token,
            registered_interest: Interest::READABLE,
            handshake_wants_write: false,
        }
    }

    /// Called once an outbound TCP connect finishes (success or
    /// failure) to move past [`ConnState::Connecting`]. If TLS is
    /// layered on top, the next state is `Handshaking`, driven as the
    /// client; otherwise straight to `Established`.
    pub(crate) fn connect_completed(&mut self) {
        #[cfg(feature = "tls")]
        {
            self.state = if self.tls.is_some() {
                ConnState::Handshaking
            } else {
                ConnState::Established
            };
        }
        #[cfg(not(feature = "tls"))]
        {
            self.state = ConnState::Established;
        }
    }

    pub(crate) fn handshake_completed(&mut self) {
        self.state = ConnState::Established;
    }

    /// True when a layered TLS session is still holding ciphertext it
    /// couldn't push to the socket on a previous sweep. Always `false`
    /// without the `tls` feature, so callers need no `cfg` of their own.
    #[cfg(feature = "tls")]
    pub(crate) fn tls_wants_write(&self) -> bool {
        self.tls.as_ref().map_or(false, |s| s.wants_write())
    }

    #[cfg(not(feature = "tls"))]
    pub(crate) fn tls_wants_write(&self) -> bool {
        false
    }
}

/// A bounded-lifetime handle to a [`Connection`], handed to a
/// [`crate::callback::Handler`] for the duration of one event
/// dispatch. Exposes exactly the surface the callback contract
/// promises: read access to `recv_iobuf`, append access to
/// `send_iobuf`, the lifecycle flags, and opaque user data, never the
/// raw socket.
pub struct ConnectionRef<'a> {
    conn: &'a mut Connection,
}

impl<'a> ConnectionRef<'a> {
    pub(crate) fn new(conn: &'a mut Connection) -> Self {
        Self { conn }
    }

    /// The bytes received so far and not yet [`consume`](Self::consume)d.
    pub fn recv(&self) -> &[u8] {
        self.conn.recv_iobuf.as_slice()
    }

    /// Drop the first `n` bytes of `recv`, e.g. after parsing a
    /// complete message out of the prefix.
    pub fn consume(&mut self, n: usize) {
        self.conn.recv_iobuf.remove(n);
    }

    /// Queue `bytes` to be sent. Always accepted in full; actual
    /// transmission happens on a later sweep if the socket isn't
    /// writable yet, or never if `buffer_but_dont_send` is set.
    pub fn send(&mut self, bytes: &[u8]) -> usize {
        self.conn.send_iobuf.append(bytes)
    }

    /// Bytes still queued to go out.
    pub fn pending_send(&self) -> usize {
        self.conn.send_iobuf.len()
    }

    /// Mark that no more data will be queued. The connection closes
    /// once the send buffer drains.
    pub fn finish_sending(&mut self) {
        if self.conn.state == ConnState::Established {
            self.conn.state = ConnState::Draining;
        }
    }

    /// True once `finish_sending` has taken effect.
    pub fn is_draining(&self) -> bool {
        self.conn.state == ConnState::Draining
    }

    /// Tear the connection down on the next sweep regardless of
    /// buffered data.
    pub fn close_immediately(&mut self) {
        self.conn.close_immediately = true;
    }

    pub fn is_close_immediately(&self) -> bool {
        self.conn.close_immediately
    }

    /// Suppress actually writing `send_iobuf` to the wire while still
    /// accepting appends to it.
    pub fn set_buffer_but_dont_send(&mut self, yes: bool) {
        self.conn.buffer_but_dont_send = yes;
    }

    pub fn buffer_but_dont_send(&self) -> bool {
        self.conn.buffer_but_dont_send
    }

    pub fn direction(&self) -> Direction {
        self.conn.direction
    }

    pub fn state(&self) -> ConnState {
        self.conn.state
    }

    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.conn.peer_addr
    }

    pub fn last_io_time(&self) -> Instant {
        self.conn.last_io_time
    }

    /// Read-only access to this connection's opaque user data, if any
    /// was set and is of type `T`.
    pub fn user_data<T: 'static>(&self) -> Option<&T> {
        self.conn.user_data.as_deref().and_then(|b| b.downcast_ref())
    }

    pub fn user_data_mut<T: 'static>(&mut self) -> Option<&mut T> {
        self.conn
            .user_data
            .as_deref_mut()
            .and_then(|b| b.downcast_mut())
    }

    /// Attach (or replace) this connection's opaque user data. The
    /// analogue of the original's per-connection `void *user_data`.
    pub fn set_user_data<T: Send + 'static>(&mut self, value: T) {
        self.conn.user_data = Some(Box::new(value));
    }

    pub fn clear_user_data(&mut self) {
        self.conn.user_data = None;
    }
}
