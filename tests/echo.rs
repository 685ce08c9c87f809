//! §8 scenario 1 ("echo accept"): a client connects, sends a short
//! payload, reads back the echo, and closes. Exercises the full
//! ACCEPT → RECV → SEND → CLOSE lifecycle and the per-connection event
//! ordering guarantee from §5.

use std::io::{Read, Write};
use std::net::TcpStream as StdTcpStream;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tcploop::{Event, Server};

fn drive_until<H: tcploop::Handler>(server: &mut Server<H>, mut predicate: impl FnMut() -> bool, timeout: Duration) {
    let deadline = Instant::now() + timeout;
    while !predicate() && Instant::now() < deadline {
        server.poll(10);
    }
}

#[test]
fn echo_accept_round_trip() {
    let trace: Arc<Mutex<Vec<&'static str>>> = Arc::new(Mutex::new(Vec::new()));
    let trace_handler = trace.clone();

    let mut server = Server::new(move |mut conn, event| {
        let tag = match event {
            Event::Accept => "ACCEPT",
            Event::Connect(_) => "CONNECT",
            Event::Recv => {
                let bytes = conn.recv().to_vec();
                conn.consume(bytes.len());
                conn.send(&bytes);
                "RECV"
            }
            Event::Send => "SEND",
            Event::Poll => "POLL",
            Event::Close => "CLOSE",
        };
        if tag != "POLL" {
            trace_handler.lock().unwrap().push(tag);
        }
    })
    .unwrap();

    let port = server.bind_to("127.0.0.1:0");
    assert!(port > 0, "bind_to should return a non-zero ephemeral port");

    let mut client = StdTcpStream::connect(("127.0.0.1", port)).unwrap();
    client.set_nonblocking(true).unwrap();

    drive_until(&mut server, || trace.lock().unwrap().contains(&"ACCEPT"), Duration::from_secs(2));

    client.write_all(b"hello").unwrap();

    let mut buf = [0u8; 5];
    let mut got = 0;
    let deadline = Instant::now() + Duration::from_secs(2);
    while got < 5 && Instant::now() < deadline {
        server.poll(10);
        match client.read(&mut buf[got..]) {
            Ok(0) => break,
            Ok(n) => got += n,
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {}
            Err(e) => panic!("client read failed: {e}"),
        }
    }
    assert_eq!(&buf[..got], b"hello");

    drop(client);
    drive_until(&mut server, || trace.lock().unwrap().last() == Some(&"CLOSE"), Duration::from_secs(2));

    let recorded = trace.lock().unwrap().clone();
    assert_eq!(recorded, vec!["ACCEPT", "RECV", "SEND", "CLOSE"]);
}
