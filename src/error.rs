//! Error types for tcploop.
//!
//! Per-connection I/O and TLS failures never surface here; those
//! convert into a close-immediately flag and a single `CLOSE` event
//! instead. This type only covers the handful of public
//! operations documented to return a `Result`: constructing a
//! `Server`, loading configuration, and (with the `tls` feature)
//! building TLS contexts.

/// Result type alias for tcploop operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by tcploop's public, fallible operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O failure while setting up the reactor or a listening socket.
    #[error("I/O error: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Malformed or inconsistent configuration.
    #[error("configuration error: {message}")]
    Config {
        /// Descriptive error message.
        message: String,
    },

    /// TLS context construction failed (certificate/key loading, config
    /// builder errors). Per-connection handshake failures are not
    /// reported through this variant.
    #[cfg(feature = "tls")]
    #[error("TLS error: {source}")]
    Tls {
        /// The underlying TLS error.
        #[from]
        source: rustls::Error,
    },

    /// An address spec failed to parse.
    #[error("invalid address spec {spec:?}: {reason}")]
    AddressParse {
        /// The offending input.
        spec: String,
        /// Why it was rejected.
        reason: String,
    },
}

impl Error {
    /// Build a [`Error::Config`] from any displayable message.
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Build a [`Error::AddressParse`].
    pub fn address_parse<S: Into<String>, R: Into<String>>(spec: S, reason: R) -> Self {
        Self::AddressParse {
            spec: spec.into(),
            reason: reason.into(),
        }
    }

    /// A short, stable category tag, useful as a log field.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Io { .. } => "io",
            Self::Config { .. } => "config",
            #[cfg(feature = "tls")]
            Self::Tls { .. } => "tls",
            Self::AddressParse { .. } => "address_parse",
        }
    }
}
