//! §8 scenario 2 ("connect failure"): connecting to a closed port
//! surfaces a non-zero error on `CONNECT`, followed by `CLOSE`, and
//! never any other event for that connection.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tcploop::{Event, Server};

#[test]
fn connect_to_closed_port_reports_failure_then_closes() {
    let trace: Arc<Mutex<Vec<(&'static str, i32)>>> = Arc::new(Mutex::new(Vec::new()));
    let trace_handler = trace.clone();

    let mut server = Server::new(move |_conn, event| {
        let entry = match event {
            Event::Connect(e) => Some(("CONNECT", e.error)),
            Event::Close => Some(("CLOSE", 0)),
            Event::Recv | Event::Send | Event::Accept => Some(("UNEXPECTED", 0)),
            Event::Poll => None,
        };
        if let Some(entry) = entry {
            trace_handler.lock().unwrap().push(entry);
        }
    })
    .unwrap();

    // Port 1 on loopback is reserved and nothing listens there in any
    // CI sandbox; the OS refuses the connection almost immediately.
    let accepted = server.connect("127.0.0.1", 1, false, None::<()>);
    assert!(accepted, "connect should enqueue the socket even though it will fail");

    let deadline = Instant::now() + Duration::from_secs(5);
    while trace.lock().unwrap().last().map(|(tag, _)| *tag) != Some("CLOSE") && Instant::now() < deadline {
        server.poll(20);
    }

    let recorded = trace.lock().unwrap().clone();
    assert!(!recorded.iter().any(|(tag, _)| *tag == "UNEXPECTED"));

    let connect_events: Vec<i32> = recorded
        .iter()
        .filter(|(tag, _)| *tag == "CONNECT")
        .map(|(_, err)| *err)
        .collect();
    assert_eq!(
        connect_events.len(),
        1,
        "CONNECT must fire exactly once for this connection, got {connect_events:?}"
    );
    assert_ne!(connect_events[0], 0, "connecting to a closed port must report a non-zero error");

    assert_eq!(recorded, vec![("CONNECT", connect_events[0]), ("CLOSE", 0)]);
}
