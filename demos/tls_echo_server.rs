//! TLS echo server: same behavior as `echo_server`, but the listener
//! terminates TLS using a certificate/key pair supplied via
//! environment variables, proving the TLS provider contract (§6) end
//! to end. Accepts plaintext connections too if no cert/key is given.
//!
//! Run with `TCPLOOP_TLS_CERT=cert.pem TCPLOOP_TLS_KEY=key.pem
//! cargo run --example tls_echo_server --features tls`.

use tcploop::config::TlsConfig;
use tcploop::{Config, Event, Server};

fn main() {
    let mut config = Config::default();
    let cert_file = std::env::var("TCPLOOP_TLS_CERT").ok();
    let key_file = std::env::var("TCPLOOP_TLS_KEY").ok();
    if cert_file.is_some() && key_file.is_some() {
        config.tls = Some(TlsConfig {
            cert_file,
            key_file,
            client_ca_file: None,
        });
    }

    let mut server = Server::with_config(config, |mut conn, event| match event {
        Event::Recv => {
            let bytes = conn.recv().to_vec();
            conn.consume(bytes.len());
            conn.send(&bytes);
        }
        Event::Close => {
            println!("closed {:?}", conn.peer_addr());
        }
        _ => {}
    })
    .expect("failed to initialize server");

    let port = server.bind_to("127.0.0.1:0");
    if port == 0 {
        eprintln!("failed to bind listener");
        return;
    }
    println!("tls echo server listening on 127.0.0.1:{port}");

    loop {
        server.poll(1000);
    }
}
