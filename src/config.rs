//! Configuration for the reactor, I/O buffers, and (optionally) TLS.
//!
//! Loadable from TOML (`Config::from_file`/`from_toml_str`) or built in
//! code from `Config::default()`. There is no hot-reload surface here:
//! Non-goals already rule out the dynamic, multi-actor surface that
//! would justify watching a file for changes underneath a running
//! single-threaded reactor.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Top-level configuration for a [`crate::server::Server`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Initial capacity (bytes) for a freshly created connection's
    /// recv/send [`crate::iobuf::IoBuf`]s. Buffers start empty by default.
    pub iobuf_initial_capacity: usize,

    /// Growth multiplier applied when an append would overflow an
    /// `IoBuf`'s capacity.
    pub iobuf_growth_multiplier: f64,

    /// Size of the fixed stack buffer used for one `recv`/`SSL_read`
    /// call per connection per sweep.
    pub recv_chunk_size: usize,

    /// Backlog passed to `listen()`.
    pub listen_backlog: u32,

    /// Whether to set `SO_REUSEADDR` on the listening socket.
    pub reuse_address: bool,

    /// Capacity of the mio `Events` buffer Phase B drains into.
    pub max_events_per_poll: usize,

    /// TLS configuration, required only when a caller actually enables
    /// TLS on a bind or a connect.
    #[cfg(feature = "tls")]
    pub tls: Option<TlsConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            iobuf_initial_capacity: 0,
            iobuf_growth_multiplier: 2.0,
            recv_chunk_size: 2048,
            listen_backlog: 1024,
            reuse_address: true,
            max_events_per_poll: 1024,
            #[cfg(feature = "tls")]
            tls: None,
        }
    }
}

impl Config {
    /// Parse configuration from a TOML document.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(s).map_err(|e| Error::config(format!("invalid TOML: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Load and parse configuration from a TOML file on disk.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .map_err(|e| Error::config(format!("reading {}: {e}", path.display())))?;
        Self::from_toml_str(&contents)
    }

    /// Reject configurations that are internally inconsistent. This is
    /// a configuration-author mistake, not a protocol condition, so it
    /// is checked once at construction time rather than degrading
    /// silently at runtime.
    pub fn validate(&self) -> Result<()> {
        if !(self.iobuf_growth_multiplier > 1.0) {
            return Err(Error::config(format!(
                "iobuf_growth_multiplier must be > 1.0, got {}",
                self.iobuf_growth_multiplier
            )));
        }
        if self.recv_chunk_size == 0 {
            return Err(Error::config("recv_chunk_size must be non-zero"));
        }
        if self.max_events_per_poll == 0 {
            return Err(Error::config("max_events_per_poll must be non-zero"));
        }

        #[cfg(feature = "tls")]
        if let Some(tls) = &self.tls {
            if tls.server_enabled() && (tls.cert_file.is_none() || tls.key_file.is_none()) {
                return Err(Error::config(
                    "tls.cert_file and tls.key_file are both required to accept TLS connections",
                ));
            }
        }

        Ok(())
    }
}

/// TLS-specific configuration. Present only with the `tls` feature.
#[cfg(feature = "tls")]
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TlsConfig {
    /// PEM certificate chain file, required to accept inbound TLS
    /// connections.
    pub cert_file: Option<String>,
    /// PEM private key file, required to accept inbound TLS
    /// connections.
    pub key_file: Option<String>,
    /// Trust a custom CA file for outbound connections instead of the
    /// bundled `webpki-roots` set.
    pub client_ca_file: Option<String>,
}

#[cfg(feature = "tls")]
impl TlsConfig {
    fn server_enabled(&self) -> bool {
        self.cert_file.is_some() || self.key_file.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        Config::default().validate().unwrap();
    }

    #[test]
    fn rejects_non_growing_multiplier() {
        let mut config = Config::default();
        config.iobuf_growth_multiplier = 1.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_zero_recv_chunk() {
        let mut config = Config::default();
        config.recv_chunk_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn parses_toml_overrides() {
        let config = Config::from_toml_str(
            r#"
            recv_chunk_size = 4096
            listen_backlog = 64
            "#,
        )
        .unwrap();
        assert_eq!(config.recv_chunk_size, 4096);
        assert_eq!(config.listen_backlog, 64);
        assert_eq!(config.iobuf_growth_multiplier, 2.0);
    }
}
