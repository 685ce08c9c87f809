//! tcploop: a minimal, embeddable TCP connection multiplexer.
//!
//! A single-threaded, event-driven reactor that multiplexes many
//! non-blocking TCP connections through one readiness-polling loop
//! and dispatches lifecycle events (accept, connect, recv, send, a
//! per-sweep tick, and close) to a single user-supplied [`Handler`].
//! Optional transparent TLS (client and server) is available behind
//! the `tls` feature.
//!
//! The framework owns socket lifecycle, per-connection receive/send
//! buffering, and (with `tls`) handshake progress. Application logic
//! lives entirely in the [`Handler`] passed to [`Server::new`].
//!
//! ```no_run
//! use tcploop::{Event, Server};
//!
//! let mut server = Server::new(|mut conn: tcploop::ConnectionRef<'_>, event| {
//!     if let Event::Recv = event {
//!         let bytes = conn.recv().to_vec();
//!         conn.consume(bytes.len());
//!         conn.send(&bytes);
//!     }
//! })
//! .expect("server init");
//!
//! server.bind_to("127.0.0.1:0");
//! loop {
//!     server.poll(100);
//!     # break;
//! }
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod addr;
pub mod callback;
pub mod config;
pub mod connection;
pub mod error;
pub mod iobuf;
pub mod server;
#[cfg(feature = "tls")]
pub mod tls;

pub use addr::{parse_address_spec, parse_bind_spec};
pub use callback::{ConnectEvent, Event, Handler};
pub use config::Config;
pub use connection::{ConnState, ConnectionRef, Direction};
pub use error::{Error, Result};
pub use iobuf::IoBuf;
pub use server::Server;

/// Install a `tracing-subscriber` `fmt` layer driven by `RUST_LOG`.
/// Only present with the `tracing-init` feature; the crate itself
/// never installs a global subscriber on its own (library code
/// shouldn't assume it owns the process's logging setup).
#[cfg(feature = "tracing-init")]
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();
}
