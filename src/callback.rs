//! The user-callback dispatch contract.
//!
//! The core is polymorphic over a single capability, "something that
//! can be told about an event", rather than a bare function pointer
//! plus an untyped user-data pointer. A closure implements [`Handler`]
//! via the blanket impl below, so most callers never need to name the
//! trait.

use crate::connection::ConnectionRef;

/// One of the lifecycle events a [`Handler`] can observe for a given
/// connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// A new inbound connection was accepted.
    Accept,
    /// An outbound connection attempt finished (check
    /// [`ConnectEvent::error`] for success/failure).
    Connect(ConnectEvent),
    /// Bytes were appended to `recv_iobuf`.
    Recv,
    /// Bytes were flushed from `send_iobuf`.
    Send,
    /// The periodic per-sweep tick, delivered once per connection per
    /// `poll` call before any I/O for that sweep.
    Poll,
    /// Terminal: delivered exactly once, no further events follow.
    Close,
}

/// Payload for [`Event::Connect`]: 0 means the outbound connection (and
/// any TLS handshake layered on top of it) completed successfully.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectEvent {
    /// 0 on success, non-zero on failure. Kept as a raw OS error code
    /// rather than a richer error type: a non-zero value here always
    /// means the connection is being torn down regardless of what the
    /// number means.
    pub error: i32,
}

impl ConnectEvent {
    /// True iff `error == 0`.
    pub fn is_success(&self) -> bool {
        self.error == 0
    }
}

/// The capability the [`crate::server::Server`] dispatches every event
/// to.
pub trait Handler {
    /// Handle one event for `conn`. `conn` gives access to the
    /// connection's buffers, flags, and user data for the duration of
    /// the call.
    fn on_event(&mut self, conn: ConnectionRef<'_>, event: Event);
}

impl<F> Handler for F
where
    F: FnMut(ConnectionRef<'_>, Event),
{
    fn on_event(&mut self, conn: ConnectionRef<'_>, event: Event) {
        self(conn, event)
    }
}
