//! The TLS provider contract and its `rustls`-backed implementation.
//!
//! The core only ever drives a TLS session through this narrow
//! interface: one handshake step per poll sweep, returning
//! want-read/want-write so the reactor can re-arm the right readiness
//! bit and call back in next sweep. Nothing here ever blocks.

use std::io::{self, Read, Write};
use std::sync::Arc;

use rustls::{ClientConfig, ClientConnection, ServerConfig, ServerConnection};

use crate::config::TlsConfig;
use crate::error::{Error, Result};

/// Blanket marker for "something we can read TLS records from and
/// write TLS records to", the underlying plain TCP socket.
pub trait IoStream: Read + Write {}
impl<T: Read + Write> IoStream for T {}

/// Outcome of driving one handshake step.
#[derive(Debug)]
pub enum HandshakeProgress {
    /// The handshake completed successfully.
    Done,
    /// No progress possible until the socket is readable again.
    WantRead,
    /// No progress possible until the socket is writable again.
    WantWrite,
    /// The handshake failed; the connection should close.
    Failed(io::Error),
}

/// The per-connection TLS session. Exists only with the `tls` feature.
#[derive(Debug)]
pub struct TlsSession {
    inner: Inner,
}

#[derive(Debug)]
enum Inner {
    Client(Box<ClientConnection>),
    Server(Box<ServerConnection>),
}

impl TlsSession {
    /// Build a client-side session for an outbound TLS connect to
    /// `server_name`.
    pub fn client(config: Arc<ClientConfig>, server_name: &str) -> Result<Self> {
        let name = rustls::ServerName::try_from(server_name)
            .map_err(|_| Error::config(format!("invalid TLS server name {server_name:?}")))?;
        let conn = ClientConnection::new(config, name)?;
        Ok(Self {
            inner: Inner::Client(Box::new(conn)),
        })
    }

    /// Build a server-side session for an inbound TLS accept.
    pub fn server(config: Arc<ServerConfig>) -> Result<Self> {
        let conn = ServerConnection::new(config)?;
        Ok(Self {
            inner: Inner::Server(Box::new(conn)),
        })
    }

    fn is_handshaking(&self) -> bool {
        match &self.inner {
            Inner::Client(c) => c.is_handshaking(),
            Inner::Server(c) => c.is_handshaking(),
        }
    }

    fn wants_read(&self) -> bool {
        match &self.inner {
            Inner::Client(c) => c.wants_read(),
            Inner::Server(c) => c.wants_read(),
        }
    }

    /// True iff rustls is still holding buffered ciphertext it hasn't
    /// been able to push to the socket yet.
    pub(crate) fn wants_write(&self) -> bool {
        match &self.inner {
            Inner::Client(c) => c.wants_write(),
            Inner::Server(c) => c.wants_write(),
        }
    }

    /// Drive exactly one step of the handshake: write any pending
    /// outgoing TLS records, then read and process any incoming ones.
    /// Never loops: a want-read/want-write result means "call me
    /// again next sweep", re-arming the right readiness bit without
    /// notifying the handler in between.
    pub fn drive_handshake(&mut self, io: &mut dyn IoStream) -> HandshakeProgress {
        if self.wants_write() {
            match self.write_tls(io) {
                Ok(_) => {}
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => return HandshakeProgress::WantWrite,
                Err(e) => return HandshakeProgress::Failed(e),
            }
        }

        if self.wants_read() {
            match self.read_tls(io) {
                Ok(0) => {
                    return HandshakeProgress::Failed(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        "peer closed during TLS handshake",
                    ))
                }
                Ok(_) => {}
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => return HandshakeProgress::WantRead,
                Err(e) => return HandshakeProgress::Failed(e),
            }

            if let Err(e) = self.process_new_packets() {
                return HandshakeProgress::Failed(io::Error::new(io::ErrorKind::InvalidData, e));
            }
        }

        if self.is_handshaking() {
            if self.wants_write() {
                HandshakeProgress::WantWrite
            } else {
                HandshakeProgress::WantRead
            }
        } else {
            HandshakeProgress::Done
        }
    }

    /// Read decrypted application data. Only valid once the handshake
    /// is done.
    pub fn read(&mut self, io: &mut dyn IoStream, buf: &mut [u8]) -> io::Result<usize> {
        // Pull in and process any TLS records already waiting on the
        // wire before handing back to the caller's plaintext buffer.
        match self.read_tls(io) {
            Ok(0) => return Ok(0),
            Ok(_) => {
                self.process_new_packets()
                    .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
            }
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => {}
            Err(e) => return Err(e),
        }

        match &mut self.inner {
            Inner::Client(c) => c.reader().read(buf),
            Inner::Server(c) => c.reader().read(buf),
        }
    }

    /// Encrypt and queue application data, then flush as much
    /// ciphertext as the socket will currently accept.
    pub fn write(&mut self, io: &mut dyn IoStream, buf: &[u8]) -> io::Result<usize> {
        let n = match &mut self.inner {
            Inner::Client(c) => c.writer().write(buf)?,
            Inner::Server(c) => c.writer().write(buf)?,
        };
        self.flush_tls(io)?;
        Ok(n)
    }

    /// Push buffered ciphertext to the socket until rustls has nothing
    /// left to send or the socket stops accepting more. A connection
    /// that can't fully flush here must keep `WRITABLE` armed so this
    /// gets called again on a later sweep, otherwise already-accepted
    /// application bytes stall forever once `send_iobuf` itself empties.
    pub fn flush_tls(&mut self, io: &mut dyn IoStream) -> io::Result<()> {
        while self.wants_write() {
            match self.write_tls(io) {
                Ok(_) => {}
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => return Ok(()),
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    fn read_tls(&mut self, io: &mut dyn IoStream) -> io::Result<usize> {
        match &mut self.inner {
            Inner::Client(c) => c.read_tls(io),
            Inner::Server(c) => c.read_tls(io),
        }
    }

    fn write_tls(&mut self, io: &mut dyn IoStream) -> io::Result<usize> {
        match &mut self.inner {
            Inner::Client(c) => c.write_tls(io),
            Inner::Server(c) => c.write_tls(io),
        }
    }

    fn process_new_packets(&mut self) -> std::result::Result<(), rustls::Error> {
        match &mut self.inner {
            Inner::Client(c) => c.process_new_packets().map(|_| ()),
            Inner::Server(c) => c.process_new_packets().map(|_| ()),
        }
    }
}

/// Build the shared client-side TLS config used for every outbound TLS
/// connect this server makes.
pub fn build_client_config(config: &TlsConfig) -> Result<Arc<ClientConfig>> {
    let mut roots = rustls::RootCertStore::empty();
    if let Some(ca_file) = &config.client_ca_file {
        let file = std::fs::File::open(ca_file)
            .map_err(|e| Error::config(format!("opening CA file {ca_file}: {e}")))?;
        let mut reader = std::io::BufReader::new(file);
        for cert in rustls_pemfile::certs(&mut reader)
            .map_err(|e| Error::config(format!("parsing CA file {ca_file}: {e}")))?
        {
            roots
                .add(&rustls::Certificate(cert))
                .map_err(|e| Error::config(format!("invalid CA certificate: {e}")))?;
        }
    } else {
        roots.add_trust_anchors(webpki_roots::TLS_SERVER_ROOTS.iter().map(|ta| {
            rustls::OwnedTrustAnchor::from_subject_spki_name_constraints(
                ta.subject,
                ta.spki,
                ta.name_constraints,
            )
        }));
    }

    let config = ClientConfig::builder()
        .with_safe_defaults()
        .with_root_certificates(roots)
        .with_no_client_auth();

    Ok(Arc::new(config))
}

/// Build the server-side TLS config from a PEM certificate chain and
/// private key file.
pub fn build_server_config(config: &TlsConfig) -> Result<Arc<ServerConfig>> {
    let cert_file = config
        .cert_file
        .as_ref()
        .ok_or_else(|| Error::config("tls.cert_file is required to accept TLS connections"))?;
    let key_file = config
        .key_file
        .as_ref()
        .ok_or_else(|| Error::config("tls.key_file is required to accept TLS connections"))?;

    let certs = {
        let file = std::fs::File::open(cert_file)
            .map_err(|e| Error::config(format!("opening certificate file {cert_file}: {e}")))?;
        let mut reader = std::io::BufReader::new(file);
        rustls_pemfile::certs(&mut reader)
            .map_err(|e| Error::config(format!("parsing certificate file {cert_file}: {e}")))?
            .into_iter()
            .map(rustls::Certificate)
            .collect::<Vec<_>>()
    };

    let key = {
        let file = std::fs::File::open(key_file)
            .map_err(|e| Error::config(format!("opening key file {key_file}: {e}")))?;
        let mut reader = std::io::BufReader::new(file);
        let mut keys = rustls_pemfile::pkcs8_private_keys(&mut reader)
            .map_err(|e| Error::config(format!("parsing key file {key_file}: {e}")))?;
        let key = keys
            .pop()
            .ok_or_else(|| Error::config(format!("no private key found in {key_file}")))?;
        rustls::PrivateKey(key)
    };

    let config = ServerConfig::builder()
        .with_safe_defaults()
        .with_no_client_auth()
        .with_single_cert(certs, key)?;

    Ok(Arc::new(config))
}
