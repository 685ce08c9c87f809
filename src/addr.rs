//! Address spec parser.
//!
//! ```text
//! spec   := port | ipv4 ":" port | "[" ipv6 "]" ":" port
//! ipv4   := octet "." octet "." octet "." octet      ; each 0..255
//! port   := decimal, 1..65535
//! ```
//! A bare port binds to all interfaces (`0.0.0.0` for v4). Malformed
//! input yields an invalid (zero) port with no exception, rather than
//! raising. `parse_address_spec` is the typed counterpart for callers
//! who want a `Result` instead of a zero port.

use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr, SocketAddrV4, SocketAddrV6};

/// Parse `spec` against the grammar above into a [`SocketAddr`]. A bare
/// port binds to `0.0.0.0`. Returns `None` on any malformed input,
/// mirroring `bind_to`'s "invalid (zero) port" contract at the type level.
pub fn parse_bind_spec(spec: &str) -> Option<SocketAddr> {
    if let Some(inner) = spec.strip_prefix('[') {
        // "[" ipv6 "]" ":" port
        let (host, rest) = inner.split_once(']')?;
        let port_str = rest.strip_prefix(':')?;
        let ip: Ipv6Addr = host.parse().ok()?;
        let port = parse_port(port_str)?;
        return Some(SocketAddr::V6(SocketAddrV6::new(ip, port, 0, 0)));
    }

    if let Some((host, port_str)) = rsplit_once_colon(spec) {
        let ip: Ipv4Addr = host.parse().ok()?;
        let port = parse_port(port_str)?;
        return Some(SocketAddr::V4(SocketAddrV4::new(ip, port)));
    }

    let port = parse_port(spec)?;
    Some(SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, port)))
}

/// Same grammar as [`parse_bind_spec`], but returns a typed error
/// instead of `None` for callers that want to validate a spec up
/// front. `bind_to` itself never raises, this is purely a convenience
/// for callers who want typed diagnostics before attempting a bind.
pub fn parse_address_spec(spec: &str) -> crate::error::Result<SocketAddr> {
    parse_bind_spec(spec)
        .ok_or_else(|| crate::error::Error::address_parse(spec, "does not match port | ipv4:port | [ipv6]:port"))
}

fn rsplit_once_colon(s: &str) -> Option<(&str, &str)> {
    let idx = s.rfind(':')?;
    Some((&s[..idx], &s[idx + 1..]))
}

fn parse_port(s: &str) -> Option<u16> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let port: u32 = s.parse().ok()?;
    // The grammar above documents ports as 1..65535, but 0 is accepted
    // here too, "let the OS pick an ephemeral port", leaving
    // port-0 handling to `bind_to`.
    if port > 0xffff {
        return None;
    }
    Some(port as u16)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::IpAddr;

    #[test]
    fn bare_port_binds_all_interfaces() {
        let addr = parse_bind_spec("8080").unwrap();
        assert_eq!(addr.ip(), IpAddr::V4(Ipv4Addr::UNSPECIFIED));
        assert_eq!(addr.port(), 8080);
    }

    #[test]
    fn ipv4_with_port() {
        let addr = parse_bind_spec("127.0.0.1:3128").unwrap();
        assert_eq!(addr.ip(), IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)));
        assert_eq!(addr.port(), 3128);
    }

    #[test]
    fn bracketed_ipv6_with_port() {
        let addr = parse_bind_spec("[::1]:9000").unwrap();
        assert_eq!(addr.ip(), IpAddr::V6(Ipv6Addr::LOCALHOST));
        assert_eq!(addr.port(), 9000);
    }

    #[test]
    fn port_zero_requests_ephemeral_port() {
        // Port 0 means "let the OS pick an ephemeral port"; both the
        // bare-port and ipv4:port forms accept it.
        assert_eq!(parse_bind_spec("0").unwrap().port(), 0);
        assert_eq!(parse_bind_spec("127.0.0.1:0").unwrap().port(), 0);
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_bind_spec("not-an-address").is_none());
        assert!(parse_bind_spec("1.2.3.4:not-a-port").is_none());
        assert!(parse_bind_spec("999999").is_none());
        assert!(parse_bind_spec("").is_none());
    }

    #[test]
    fn typed_parse_reports_reason() {
        let err = parse_address_spec("garbage").unwrap_err();
        assert_eq!(err.category(), "address_parse");
    }
}
