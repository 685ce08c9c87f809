//! §8 scenario 3 ("partial write backpressure"): queuing more than one
//! socket write can carry drains across several `poll` calls, and the
//! full payload eventually reaches the peer in order.

use std::io::Read;
use std::net::TcpStream as StdTcpStream;
use std::time::{Duration, Instant};

use tcploop::{Event, Server};

const PAYLOAD_LEN: usize = 4 * 1024 * 1024;

#[test]
fn large_queued_payload_drains_across_multiple_polls() {
    let mut server = Server::new(|mut conn, event| {
        if let Event::Accept = event {
            let payload: Vec<u8> = (0..PAYLOAD_LEN).map(|i| (i % 251) as u8).collect();
            let queued = conn.send(&payload);
            assert_eq!(queued, PAYLOAD_LEN, "send must queue the full payload, never partial");
        }
    })
    .unwrap();

    let port = server.bind_to("127.0.0.1:0");
    assert!(port > 0);

    let mut client = StdTcpStream::connect(("127.0.0.1", port)).unwrap();
    client.set_nonblocking(true).unwrap();

    let mut received = Vec::with_capacity(PAYLOAD_LEN);
    let mut buf = [0u8; 64 * 1024];
    let deadline = Instant::now() + Duration::from_secs(10);
    while received.len() < PAYLOAD_LEN {
        server.poll(10);
        match client.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => received.extend_from_slice(&buf[..n]),
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {}
            Err(e) => panic!("client read failed: {e}"),
        }
        assert!(Instant::now() < deadline, "timed out draining backpressured send");
    }

    assert_eq!(received.len(), PAYLOAD_LEN);
    assert!(received.iter().enumerate().all(|(i, &b)| b == (i % 251) as u8));
}
