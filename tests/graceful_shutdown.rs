//! §8 scenario 4 ("graceful shutdown"): once `finish_sending` is
//! called, every byte queued at that moment reaches the peer before
//! the connection closes.

use std::io::Read;
use std::net::TcpStream as StdTcpStream;
use std::time::{Duration, Instant};

use tcploop::{Event, Server};

#[test]
fn finish_sending_drains_all_queued_bytes_before_close() {
    let mut server = Server::new(|mut conn, event| {
        if let Event::Accept = event {
            let payload = vec![0x41u8; 42];
            conn.send(&payload);
            conn.finish_sending();
            assert!(conn.is_draining());
        }
    })
    .unwrap();

    let port = server.bind_to("127.0.0.1:0");
    assert!(port > 0);

    let mut client = StdTcpStream::connect(("127.0.0.1", port)).unwrap();
    client.set_nonblocking(true).unwrap();

    let mut received = Vec::new();
    let deadline = Instant::now() + Duration::from_secs(5);
    loop {
        server.poll(10);
        let mut buf = [0u8; 64];
        match client.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => received.extend_from_slice(&buf[..n]),
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {}
            Err(e) => panic!("client read failed: {e}"),
        }
        assert!(Instant::now() < deadline, "timed out waiting for peer close");
    }

    assert_eq!(received.len(), 42);
    assert!(received.iter().all(|&b| b == 0x41));
}
