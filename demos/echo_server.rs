//! Minimal echo server: binds a listener, echoes every `RECV` payload
//! back to its sender, and logs lifecycle events via `tracing`.
//!
//! Run with `RUST_LOG=debug cargo run --example echo_server --features tracing-init`.

use tcploop::{Event, Server};

fn main() {
    #[cfg(feature = "tracing-init")]
    tcploop::init_tracing();

    let mut server = Server::new(|mut conn, event| match event {
        Event::Accept => {
            println!("accepted {:?}", conn.peer_addr());
        }
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
    println!("echo server listening on 127.0.0.1:{port}");

    loop {
        server.poll(1000);
    }
}
