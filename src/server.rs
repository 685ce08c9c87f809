//! The event loop and its surrounding facade.
//!
//! [`Server`] owns the listening socket, the live connection set, and
//! the single [`Handler`] every event is dispatched to. [`Server::poll`]
//! is the sole progress point: one call is one sweep, built from three
//! phases (arm readiness, block, dispatch) plus a final reap pass
//! that reclaims anything closed during dispatch.
//!
//! The connection set lives in a [`slotmap::SlotMap`] keyed by
//! [`ConnKey`], with a parallel `order` vector standing in for
//! insertion order. Snapshotting `order` at the top of each phase gives
//! a "safe iteration under removal" guarantee: a connection closed
//! mid-sweep doesn't disturb the others still being walked.

use std::any::Any;
use std::collections::HashMap;
use std::io::{self, Read, Write};
use std::net::{SocketAddr, ToSocketAddrs};
use std::sync::Once;
use std::time::{Duration, Instant};

use mio::net::{TcpListener, TcpStream};
use mio::{Events, Interest, Poll, Token};
use slotmap::SlotMap;
use socket2::{Domain, Protocol, Socket, Type};
use tracing::{debug, info, trace, warn};

use crate::addr::parse_bind_spec;
use crate::callback::{ConnectEvent, Event, Handler};
use crate::config::Config;
use crate::connection::{ConnKey, Connection, ConnState, ConnectionRef, Direction};
use crate::error::Result;

#[cfg(feature = "tls")]
use crate::tls::{self, HandshakeProgress, TlsSession};
#[cfg(feature = "tls")]
use std::sync::Arc;

/// Reserved registry token for the listening socket. Connection tokens
/// start at 1; the listener is always armed alongside, never instead
/// of, the connection set.
const LISTENER_TOKEN: Token = Token(0);

/// The multiplexer: one listening socket (optional), the connection
/// set, and the [`Handler`] every event flows through.
pub struct Server<H: Handler> {
    config: Config,
    poll: Poll,
    events: Events,
    listener: Option<TcpListener>,
    listener_port: u16,
    connections: SlotMap<ConnKey, Connection>,
    /// Insertion order, newest first: a new connection is linked at
    /// the head, matching the order a handler would expect to see them
    /// walked in.
    order: Vec<ConnKey>,
    tokens: HashMap<Token, ConnKey>,
    next_token: usize,
    handler: H,
    scratch: Vec<u8>,
    #[cfg(feature = "tls")]
    server_tls: Option<Arc<rustls::ServerConfig>>,
    #[cfg(feature = "tls")]
    client_tls: Option<Arc<rustls::ClientConfig>>,
}

/// Outcome of one step through the read path, resolved into the event
/// (if any) the caller should dispatch once the connection's own
/// borrow has ended.
enum ReadOutcome {
    Connect(i32),
    Recv,
    None,
}

/// Outcome of one step through the write path.
enum WriteOutcome {
    Sent,
    None,
}

impl<H: Handler> Server<H> {
    /// Build a `Server` with default [`Config`].
    pub fn new(handler: H) -> Result<Self> {
        Self::with_config(Config::default(), handler)
    }

    /// Build a `Server` with an explicit [`Config`]. Per-server state
    /// that would otherwise need an opaque `void *` is, here, whatever
    /// state `handler` itself closes over: a capability, not a
    /// function pointer plus a context blob.
    pub fn with_config(config: Config, handler: H) -> Result<Self> {
        config.validate()?;
        bootstrap_process();

        let poll = Poll::new()?;
        let events = Events::with_capacity(config.max_events_per_poll);
        let scratch = vec![0u8; config.recv_chunk_size];

        #[cfg(feature = "tls")]
        let (server_tls, client_tls) = build_tls_contexts(&config)?;

        Ok(Self {
            config,
            poll,
            events,
            listener: None,
            listener_port: 0,
            connections: SlotMap::with_key(),
            order: Vec::new(),
            tokens: HashMap::new(),
            next_token: 1,
            handler,
            scratch,
            #[cfg(feature = "tls")]
            server_tls,
            #[cfg(feature = "tls")]
            client_tls,
        })
    }

    /// Number of connections currently live.
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// The port the listener is bound to, or 0 if there is none.
    pub fn listener_port(&self) -> u16 {
        self.listener_port
    }

    /// Parse `spec` and bind a listener there, replacing any previous
    /// one. Returns the bound port, or 0 on any failure: malformed
    /// spec, resolution, or OS-level bind/listen error all collapse to
    /// the same "invalid (zero) port" result.
    pub fn bind_to(&mut self, spec: &str) -> u16 {
        let addr = match parse_bind_spec(spec) {
            Some(addr) => addr,
            None => {
                warn!(spec, "bind_to: malformed address spec");
                return 0;
            }
        };

        match self.bind_addr(addr) {
            Ok(port) => port,
            Err(e) => {
                warn!(spec, error = %e, "bind_to failed");
                0
            }
        }
    }

    fn bind_addr(&mut self, addr: SocketAddr) -> io::Result<u16> {
        let socket = Socket::new(Domain::for_address(addr), Type::STREAM, Some(Protocol::TCP))?;
        if self.config.reuse_address {
            socket.set_reuse_address(true)?;
        }
        socket.bind(&addr.into())?;
        socket.listen(self.config.listen_backlog as i32)?;
        socket.set_nonblocking(true)?;

        let std_listener: std::net::TcpListener = socket.into();
        let bound_addr = std_listener.local_addr()?;
        let mut listener = TcpListener::from_std(std_listener);
        self.poll
            .registry()
            .register(&mut listener, LISTENER_TOKEN, Interest::READABLE)?;

        if let Some(mut old) = self.listener.replace(listener) {
            let _ = self.poll.registry().deregister(&mut old);
        }
        self.listener_port = bound_addr.port();
        info!(port = bound_addr.port(), "listener bound");
        Ok(bound_addr.port())
    }

    /// Resolve `host` to an IPv4 address and initiate a non-blocking
    /// outbound connect. Returns `true` once the socket is enqueued;
    /// completion (success or failure) is reported later through
    /// [`Event::Connect`] from a `poll` call.
    pub fn connect<T: Send + 'static>(
        &mut self,
        host: &str,
        port: u16,
        use_tls: bool,
        user_data: Option<T>,
    ) -> bool {
        #[cfg(not(feature = "tls"))]
        if use_tls {
            warn!("connect: use_tls requested but the `tls` feature is not enabled");
            return false;
        }

        let addr = match (host, port).to_socket_addrs() {
            Ok(mut addrs) => addrs.find(SocketAddr::is_ipv4),
            Err(e) => {
                warn!(host, port, error = %e, "connect: DNS resolution failed");
                None
            }
        };
        let addr = match addr {
            Some(addr) => addr,
            None => return false,
        };

        let mut socket = match TcpStream::connect(addr) {
            Ok(s) => s,
            Err(e) => {
                warn!(host, port, error = %e, "connect: socket creation failed");
                return false;
            }
        };

        #[cfg(feature = "tls")]
        let tls_session = if use_tls {
            match &self.client_tls {
                Some(cfg) => match TlsSession::client(cfg.clone(), host) {
                    Ok(session) => Some(session),
                    Err(e) => {
                        warn!(host, error = %e, "connect: TLS session setup failed");
                        return false;
                    }
                },
                None => {
                    warn!("connect: no client TLS context configured");
                    return false;
                }
            }
        } else {
            None
        };

        let token = self.alloc_token();
        if let Err(e) = self.poll.registry().register(
            &mut socket,
            token,
            Interest::READABLE | Interest::WRITABLE,
        ) {
            warn!(error = %e, "connect: registry registration failed");
            return false;
        }

        #[cfg(feature = "tls")]
        let mut conn = Connection::new(
            socket,
            Direction::Outbound,
            Some(addr),
            self.config.iobuf_initial_capacity,
            self.config.iobuf_growth_multiplier,
            token,
            tls_session,
        );
        #[cfg(not(feature = "tls"))]
        let mut conn = Connection::new(
            socket,
            Direction::Outbound,
            Some(addr),
            self.config.iobuf_initial_capacity,
            self.config.iobuf_growth_multiplier,
            token,
        );
        // Stamp `last_io_time` here too, not just on accept, so an
        // idle-timeout policy sees a consistent clock for both
        // directions.
        conn.last_io_time = Instant::now();
        conn.registered_interest = Interest::READABLE | Interest::WRITABLE;
        conn.user_data = user_data.map(|v| Box::new(v) as Box<dyn Any + Send>);

        let key = self.connections.insert(conn);
        self.tokens.insert(token, key);
        self.order.insert(0, key);
        debug!(host, port, use_tls, "connect: socket enqueued");
        true
    }

    /// One sweep: arm readiness (Phase A), block for events (Phase B),
    /// dispatch them (Phase C), then reap anything closed along the
    /// way. Returns the number of connections still live.
    pub fn poll(&mut self, timeout_ms: u64) -> usize {
        self.pre_poll();

        if let Err(e) = self.block(timeout_ms) {
            warn!(error = %e, "poll: readiness wait failed");
        }

        self.dispatch_ready();
        self.reap_closed();
        self.connections.len()
    }

    /// Phase A: deliver `POLL`, arm read/write readiness per
    /// connection, and close anything already marked
    /// `CLOSE_IMMEDIATELY` with nothing left to send.
    fn pre_poll(&mut self) {
        let order = self.order.clone();
        for key in order {
            if !self.connections.contains_key(key) {
                continue;
            }
            self.dispatch(key, Event::Poll);

            let ready_to_close = match self.connections.get(key) {
                Some(conn) => {
                    conn.close_immediately && conn.send_iobuf.is_empty() && !conn.tls_wants_write()
                }
                None => false,
            };
            if ready_to_close {
                self.close_connection(key);
                continue;
            }

            if let Some(conn) = self.connections.get(key) {
                let want_write = conn.state == ConnState::Connecting
                    || (conn.state == ConnState::Handshaking && conn.handshake_wants_write)
                    || (!conn.send_iobuf.is_empty() && !conn.buffer_but_dont_send)
                    || conn.tls_wants_write();
                let interest = if want_write {
                    Interest::READABLE | Interest::WRITABLE
                } else {
                    Interest::READABLE
                };
                self.rearm(key, interest);
            }
        }
    }

    fn rearm(&mut self, key: ConnKey, interest: Interest) {
        if let Some(conn) = self.connections.get_mut(key) {
            if conn.registered_interest != interest {
                match self.poll.registry().reregister(&mut conn.socket, conn.token, interest) {
                    Ok(()) => conn.registered_interest = interest,
                    Err(e) => warn!(error = %e, "rearm: reregister failed"),
                }
            }
        }
    }

    /// Phase B: block for readiness up to `timeout_ms`. A spurious
    /// wake or a signal interruption proceeds with no ready
    /// descriptors, rather than treating it as an error.
    fn block(&mut self, timeout_ms: u64) -> io::Result<()> {
        let timeout = Some(Duration::from_millis(timeout_ms));
        match self.poll.poll(&mut self.events, timeout) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// Phase C: accept at most once, then run the read/write paths
    /// for every connection whose readiness bit fired.
    fn dispatch_ready(&mut self) {
        let mut listener_ready = false;
        let mut ready: Vec<(ConnKey, bool, bool)> = Vec::new();

        for event in self.events.iter() {
            if event.token() == LISTENER_TOKEN {
                listener_ready |= event.is_readable();
                continue;
            }
            if let Some(&key) = self.tokens.get(&event.token()) {
                ready.push((key, event.is_readable(), event.is_writable()));
            }
        }

        if listener_ready {
            self.accept_conn();
        }

        for (key, readable, writable) in ready {
            if !self.connections.contains_key(key) {
                continue;
            }
            if readable {
                self.touch(key);
                self.read_from_socket(key);
            }

            if !self.connections.contains_key(key) {
                continue;
            }
            if writable {
                let drives_connect_or_handshake = matches!(
                    self.connections.get(key),
                    Some(c) if !c.close_immediately
                        && matches!(c.state, ConnState::Connecting | ConnState::Handshaking)
                );
                if drives_connect_or_handshake {
                    self.read_from_socket(key);
                } else {
                    let may_send = matches!(
                        self.connections.get(key),
                        Some(c) if !c.buffer_but_dont_send || c.tls_wants_write()
                    );
                    if may_send {
                        self.touch(key);
                        self.write_to_socket(key);
                    }
                }
            }
        }
    }

    fn touch(&mut self, key: ConnKey) {
        if let Some(conn) = self.connections.get_mut(key) {
            conn.last_io_time = Instant::now();
        }
    }

    /// Final reap pass: anything marked `CLOSE_IMMEDIATELY` during
    /// Phase C, including a `Draining` connection whose send buffer
    /// just emptied, is reclaimed before `poll` returns.
    fn reap_closed(&mut self) {
        let to_close: Vec<ConnKey> = self
            .order
            .iter()
            .copied()
            .filter(|key| matches!(self.connections.get(*key), Some(c) if c.close_immediately))
            .collect();
        for key in to_close {
            self.close_connection(key);
        }
    }

    /// One `accept` per sweep, deliberately, even if more connections
    /// are pending; they'll be picked up next sweep.
    fn accept_conn(&mut self) {
        let listener = match &self.listener {
            Some(listener) => listener,
            None => return,
        };

        match listener.accept() {
            Ok((mut socket, peer_addr)) => {
                if let Err(e) = set_close_on_exec(&socket) {
                    warn!(error = %e, "accept: close-on-exec failed");
                }

                let token = self.alloc_token();
                if let Err(e) = self.poll.registry().register(&mut socket, token, Interest::READABLE) {
                    warn!(error = %e, "accept: registry registration failed, dropping socket");
                    return;
                }

                #[cfg(feature = "tls")]
                let tls_session = match &self.server_tls {
                    Some(cfg) => match TlsSession::server(cfg.clone()) {
                        Ok(session) => Some(session),
                        Err(e) => {
                            warn!(error = %e, "accept: TLS session setup failed, dropping socket");
                            let _ = self.poll.registry().deregister(&mut socket);
                            return;
                        }
                    },
                    None => None,
                };

                #[cfg(feature = "tls")]
                let mut conn = Connection::new(
                    socket,
                    Direction::Inbound,
                    Some(peer_addr),
                    self.config.iobuf_initial_capacity,
                    self.config.iobuf_growth_multiplier,
                    token,
                    tls_session,
                );
                #[cfg(not(feature = "tls"))]
                let mut conn = Connection::new(
                    socket,
                    Direction::Inbound,
                    Some(peer_addr),
                    self.config.iobuf_initial_capacity,
                    self.config.iobuf_growth_multiplier,
                    token,
                );
                conn.last_io_time = Instant::now();
                conn.registered_interest = Interest::READABLE;

                let key = self.connections.insert(conn);
                self.tokens.insert(token, key);
                self.order.insert(0, key);

                debug!(peer = %peer_addr, "accepted connection");
                self.dispatch(key, Event::Accept);
            }
            Err(e) if is_transient(&e) => {}
            Err(e) => warn!(error = %e, "accept failed"),
        }
    }

    fn read_from_socket(&mut self, key: ConnKey) {
        let chunk_size = self.config.recv_chunk_size;
        if self.scratch.len() < chunk_size {
            self.scratch.resize(chunk_size, 0);
        }

        let outcome = match self.connections.get_mut(key) {
            Some(conn) => Self::advance_read(conn, &mut self.scratch[..chunk_size]),
            None => return,
        };

        match outcome {
            ReadOutcome::Connect(error) => self.dispatch(key, Event::Connect(ConnectEvent { error })),
            ReadOutcome::Recv => {
                trace!(?key, "recv");
                self.dispatch(key, Event::Recv);
            }
            ReadOutcome::None => {}
        }
    }

    fn advance_read(conn: &mut Connection, scratch: &mut [u8]) -> ReadOutcome {
        match conn.state {
            ConnState::Connecting => Self::advance_connecting(conn),
            ConnState::Handshaking => Self::advance_handshaking(conn),
            ConnState::Established | ConnState::Draining => Self::advance_data_read(conn, scratch),
        }
    }

    /// An outbound socket becoming writable/readable for the first
    /// time means the TCP-level connect finished. Query the pending
    /// error, then fold a synchronous success straight into the
    /// handshake/established path rather than treating it as an error.
    fn advance_connecting(conn: &mut Connection) -> ReadOutcome {
        match conn.socket.take_error() {
            Ok(None) => {
                conn.last_io_time = Instant::now();
                conn.connect_completed();
                match conn.state {
                    #[cfg(feature = "tls")]
                    ConnState::Handshaking => Self::advance_handshake_step(conn, true),
                    _ => ReadOutcome::Connect(0),
                }
            }
            Ok(Some(e)) => {
                conn.close_immediately = true;
                ReadOutcome::Connect(error_code(&e))
            }
            Err(e) => {
                conn.close_immediately = true;
                ReadOutcome::Connect(error_code(&e))
            }
        }
    }

    #[cfg(feature = "tls")]
    fn advance_handshaking(conn: &mut Connection) -> ReadOutcome {
        Self::advance_handshake_step(conn, false)
    }

    #[cfg(not(feature = "tls"))]
    fn advance_handshaking(_conn: &mut Connection) -> ReadOutcome {
        ReadOutcome::None
    }

    /// Drive one handshake step, re-entering across sweeps as
    /// want-read/want-write demands. `notify_connect` is set only for
    /// the outbound path,
    /// where a terminal result (done or failed) also completes the
    /// `CONNECT` event that's been withheld since `Connecting`.
    #[cfg(feature = "tls")]
    fn advance_handshake_step(conn: &mut Connection, notify_connect: bool) -> ReadOutcome {
        let progress = match conn.tls.as_mut() {
            Some(session) => session.drive_handshake(&mut conn.socket),
            None => return ReadOutcome::None,
        };

        match progress {
            HandshakeProgress::Done => {
                conn.handshake_completed();
                conn.handshake_wants_write = false;
                if notify_connect {
                    ReadOutcome::Connect(0)
                } else {
                    ReadOutcome::None
                }
            }
            HandshakeProgress::WantRead => {
                conn.handshake_wants_write = false;
                ReadOutcome::None
            }
            HandshakeProgress::WantWrite => {
                conn.handshake_wants_write = true;
                ReadOutcome::None
            }
            HandshakeProgress::Failed(e) => {
                conn.close_immediately = true;
                if notify_connect {
                    ReadOutcome::Connect(error_code(&e))
                } else {
                    ReadOutcome::None
                }
            }
        }
    }

    /// The ordinary data path. `RECV` fires at most once per call.
    fn advance_data_read(conn: &mut Connection, scratch: &mut [u8]) -> ReadOutcome {
        let result = {
            #[cfg(feature = "tls")]
            {
                match conn.tls.as_mut() {
                    Some(session) => session.read(&mut conn.socket, scratch),
                    None => conn.socket.read(scratch),
                }
            }
            #[cfg(not(feature = "tls"))]
            {
                conn.socket.read(scratch)
            }
        };

        match result {
            Ok(0) => {
                conn.close_immediately = true;
                ReadOutcome::None
            }
            Ok(n) => {
                conn.recv_iobuf.append(&scratch[..n]);
                ReadOutcome::Recv
            }
            Err(e) if is_transient(&e) => ReadOutcome::None,
            Err(_) => {
                conn.close_immediately = true;
                ReadOutcome::None
            }
        }
    }

    fn write_to_socket(&mut self, key: ConnKey) {
        let outcome = match self.connections.get_mut(key) {
            Some(conn) => Self::advance_write(conn),
            None => return,
        };

        match outcome {
            WriteOutcome::Sent => {
                trace!(?key, "send");
                self.dispatch(key, Event::Send);
            }
            WriteOutcome::None => {}
        }
    }

    /// Attempt to flush `send_iobuf`, then check whether `Draining`
    /// plus an empty buffer means it's time to close. With `tls`, an
    /// empty `send_iobuf` doesn't necessarily mean there's nothing left
    /// to push: rustls may still be holding ciphertext from an earlier
    /// partial flush, so that gets drained first.
    fn advance_write(conn: &mut Connection) -> WriteOutcome {
        if conn.send_iobuf.is_empty() {
            if conn.tls_wants_write() {
                return Self::flush_pending_tls(conn);
            }
            if conn.state == ConnState::Draining {
                conn.close_immediately = true;
            }
            return WriteOutcome::None;
        }

        let result: io::Result<usize> = {
            #[cfg(feature = "tls")]
            {
                match conn.tls.as_mut() {
                    Some(session) => session.write(&mut conn.socket, conn.send_iobuf.as_slice()),
                    None => conn.socket.write(conn.send_iobuf.as_slice()),
                }
            }
            #[cfg(not(feature = "tls"))]
            {
                conn.socket.write(conn.send_iobuf.as_slice())
            }
        };

        match result {
            Ok(0) => {
                conn.close_immediately = true;
                WriteOutcome::None
            }
            Ok(n) => {
                conn.send_iobuf.remove(n);
                if conn.send_iobuf.is_empty()
                    && !conn.tls_wants_write()
                    && conn.state == ConnState::Draining
                {
                    conn.close_immediately = true;
                }
                WriteOutcome::Sent
            }
            Err(e) if is_transient(&e) => WriteOutcome::None,
            Err(_) => {
                conn.close_immediately = true;
                WriteOutcome::None
            }
        }
    }

    /// Push ciphertext buffered by a TLS session from an earlier
    /// partial flush, with no new application bytes involved this
    /// sweep. No `Send` event fires: nothing left `send_iobuf` just now.
    #[cfg(feature = "tls")]
    fn flush_pending_tls(conn: &mut Connection) -> WriteOutcome {
        let session = match conn.tls.as_mut() {
            Some(session) => session,
            None => return WriteOutcome::None,
        };
        match session.flush_tls(&mut conn.socket) {
            Ok(()) => {
                if !session.wants_write() && conn.state == ConnState::Draining {
                    conn.close_immediately = true;
                }
                WriteOutcome::None
            }
            Err(e) if is_transient(&e) => WriteOutcome::None,
            Err(_) => {
                conn.close_immediately = true;
                WriteOutcome::None
            }
        }
    }

    #[cfg(not(feature = "tls"))]
    fn flush_pending_tls(_conn: &mut Connection) -> WriteOutcome {
        WriteOutcome::None
    }

    /// Deliver `CLOSE` exactly once, unlink, deregister, and drop the
    /// connection (which releases both `IoBuf`s and any TLS session
    /// along with it).
    fn close_connection(&mut self, key: ConnKey) {
        self.dispatch(key, Event::Close);
        let mut conn = match self.connections.remove(key) {
            Some(conn) => conn,
            None => return,
        };
        let _ = self.poll.registry().deregister(&mut conn.socket);
        self.tokens.remove(&conn.token);
        self.order.retain(|k| *k != key);
        debug!(?key, "connection closed");
    }

    fn dispatch(&mut self, key: ConnKey, event: Event) {
        if let Some(conn) = self.connections.get_mut(key) {
            self.handler.on_event(ConnectionRef::new(conn), event);
        }
    }

    fn alloc_token(&mut self) -> Token {
        let token = Token(self.next_token);
        self.next_token += 1;
        token
    }

    /// One final zero-timeout `poll`, then close the listener and
    /// every remaining connection. Consumes the `Server` since there's
    /// nothing left to drive afterwards.
    pub fn shutdown(mut self) {
        self.poll(0);

        if let Some(mut listener) = self.listener.take() {
            let _ = self.poll.registry().deregister(&mut listener);
        }

        let remaining: Vec<ConnKey> = self.order.clone();
        for key in remaining {
            self.close_connection(key);
        }
        info!("server shut down");
    }
}

fn is_transient(e: &io::Error) -> bool {
    matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted)
}

fn error_code(e: &io::Error) -> i32 {
    e.raw_os_error().unwrap_or(-1)
}

#[cfg(unix)]
fn set_close_on_exec(stream: &TcpStream) -> io::Result<()> {
    use std::os::unix::io::AsRawFd;
    let fd = stream.as_raw_fd();
    let flags = unsafe { libc::fcntl(fd, libc::F_GETFD) };
    if flags < 0 {
        return Err(io::Error::last_os_error());
    }
    let result = unsafe { libc::fcntl(fd, libc::F_SETFD, flags | libc::FD_CLOEXEC) };
    if result < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

#[cfg(not(unix))]
fn set_close_on_exec(_stream: &TcpStream) -> io::Result<()> {
    Ok(())
}

/// Process-wide bootstrap: `SIGPIPE` suppression on unix, guarded so
/// it runs exactly once regardless of how many `Server`s are built in
/// one process.
fn bootstrap_process() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        #[cfg(unix)]
        unsafe {
            libc::signal(libc::SIGPIPE, libc::SIG_IGN);
        }
        debug!("process-wide networking bootstrap complete");
    });
}

#[cfg(feature = "tls")]
fn build_tls_contexts(
    config: &Config,
) -> Result<(Option<Arc<rustls::ServerConfig>>, Option<Arc<rustls::ClientConfig>>)> {
    use crate::config::TlsConfig;

    let server_tls = match &config.tls {
        Some(tls_cfg) if tls_cfg.cert_file.is_some() && tls_cfg.key_file.is_some() => {
            Some(tls::build_server_config(tls_cfg)?)
        }
        _ => None,
    };

    // A client context is always available so outbound TLS connects
    // work against the public web-PKI even when no `tls` section is
    // configured; a `client_ca_file` overrides the default root store.
    let default_tls_cfg = TlsConfig::default();
    let client_cfg_source = config.tls.as_ref().unwrap_or(&default_tls_cfg);
    let client_tls = Some(tls::build_client_config(client_cfg_source)?);

    Ok((server_tls, client_tls))
}
