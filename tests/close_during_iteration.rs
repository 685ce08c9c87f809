//! §8 scenario 6 ("close during iteration"): ten connections; the
//! callback marks one `CLOSE_IMMEDIATELY` from inside its own `POLL`
//! event. The rest of that sweep's connections must still observe
//! their own `POLL` normally, and the marked connection is reclaimed
//! before `poll` returns.

use std::collections::HashMap;
use std::net::TcpStream as StdTcpStream;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tcploop::{Event, Server};

#[test]
fn closing_one_connection_mid_sweep_does_not_disrupt_the_rest() {
    let poll_counts: Arc<Mutex<HashMap<u32, u32>>> = Arc::new(Mutex::new(HashMap::new()));
    let closed: Arc<Mutex<Vec<u32>>> = Arc::new(Mutex::new(Vec::new()));
    let next_index = Arc::new(Mutex::new(0u32));

    let poll_counts_handler = poll_counts.clone();
    let closed_handler = closed.clone();
    let next_index_handler = next_index.clone();

    let mut server = Server::new(move |mut conn, event| match event {
        Event::Accept => {
            let mut guard = next_index_handler.lock().unwrap();
            let index = *guard;
            *guard += 1;
            conn.set_user_data(index);
        }
        Event::Poll => {
            if let Some(&index) = conn.user_data::<u32>() {
                *poll_counts_handler.lock().unwrap().entry(index).or_insert(0) += 1;
                if index == 4 && !conn.is_close_immediately() {
                    conn.close_immediately();
                }
            }
        }
        Event::Close => {
            if let Some(&index) = conn.user_data::<u32>() {
                closed_handler.lock().unwrap().push(index);
            }
        }
        _ => {}
    })
    .unwrap();

    let port = server.bind_to("127.0.0.1:0");
    assert!(port > 0);

    let mut clients = Vec::new();
    for accepted_so_far in 1..=10u32 {
        clients.push(StdTcpStream::connect(("127.0.0.1", port)).unwrap());
        let deadline = Instant::now() + Duration::from_secs(2);
        while *next_index.lock().unwrap() < accepted_so_far && Instant::now() < deadline {
            server.poll(10);
        }
    }

    for _ in 0..5 {
        server.poll(10);
    }

    assert!(closed.lock().unwrap().contains(&4), "connection #5 (index 4) must be closed");
    assert_eq!(server.connection_count(), 9);

    let counts = poll_counts.lock().unwrap();
    for index in 0..10u32 {
        if index != 4 {
            assert!(
                counts.get(&index).copied().unwrap_or(0) > 0,
                "connection {index} should still receive POLL events in the same and later sweeps"
            );
        }
    }
}
