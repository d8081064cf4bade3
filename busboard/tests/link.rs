//! Drives the link thread against an in-memory server.

use busboard::link::backoff::ReconnectPolicy;
use busboard::link::client::{Event, Interface, LinkConfig, Outlet};
use busboard::link::liveness::LivenessPolicy;
use busboard::link::port::{ConnectError, Connector, RawPort, RecvError, SendError};
use busboard::link::proto::{Ident, Outbound, Status};

use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

static WAIT: Duration = Duration::from_secs(5);

struct MockPort {
    inbound: Receiver<String>,
    outbound: Sender<String>,
    poll: Duration,
}

impl RawPort for MockPort {
    fn recv(&mut self) -> Result<String, RecvError> {
        match self.inbound.recv_timeout(self.poll) {
            Ok(text) => Ok(text),
            Err(RecvTimeoutError::Timeout) => Err(RecvError::NotReady),
            Err(RecvTimeoutError::Disconnected) => Err(RecvError::Disconnected),
        }
    }

    fn send(&mut self, text: &str) -> Result<(), SendError> {
        self.outbound
            .send(text.to_string())
            .map_err(|_| SendError::Disconnected)
    }
}

/// Server side of one accepted connection. Dropping it closes the connection.
struct Peer {
    to_client: Sender<String>,
    from_client: Receiver<String>,
}

impl Peer {
    fn push(&self, text: &str) {
        self.to_client.send(text.to_string()).unwrap();
    }

    fn next(&self) -> String {
        self.from_client.recv_timeout(WAIT).expect("nothing sent")
    }
}

struct MockConnector {
    accepted: Sender<Peer>,
    refuse: Arc<AtomicBool>,
    poll: Duration,
}

impl Connector for MockConnector {
    fn connect(&mut self, _url: &str) -> Result<Box<dyn RawPort>, ConnectError> {
        if self.refuse.load(Ordering::SeqCst) {
            return Err(ConnectError::Handshake("refused".to_string()));
        }
        let (to_client, inbound) = channel::unbounded();
        let (outbound, from_client) = channel::unbounded();
        let _ = self.accepted.send(Peer {
            to_client,
            from_client,
        });
        Ok(Box::new(MockPort {
            inbound,
            outbound,
            poll: self.poll,
        }))
    }
}

struct Harness {
    link: Interface,
    peers: Receiver<Peer>,
    refuse: Arc<AtomicBool>,
}

impl Harness {
    fn new(liveness: LivenessPolicy, refuse: bool) -> Harness {
        let poll = Duration::from_millis(5);
        let (accepted, peers) = channel::unbounded();
        let refuse = Arc::new(AtomicBool::new(refuse));
        let config = LinkConfig {
            reconnect: ReconnectPolicy {
                initial: Duration::from_millis(20),
                factor: 1.25,
                max: Duration::from_millis(100),
            },
            liveness,
            poll_interval: poll,
            event_queue: 256,
        };
        let connector = MockConnector {
            accepted,
            refuse: refuse.clone(),
            poll,
        };
        Harness {
            link: Interface::new_link("ws://test/bus/", Box::new(connector), config),
            peers,
            refuse,
        }
    }

    fn quiet() -> Harness {
        Harness::new(
            LivenessPolicy {
                interval: Duration::from_secs(600),
                timeout: Duration::from_secs(60),
            },
            false,
        )
    }

    fn peer(&self) -> Peer {
        self.peers.recv_timeout(WAIT).expect("no connection")
    }

    fn event(&self) -> Event {
        self.link.receiver().recv_timeout(WAIT).expect("no event")
    }

    /// Skips events until `pred` matches one, returning what was skipped too.
    fn until<F: Fn(&Event) -> bool>(&self, pred: F) -> (Vec<Event>, Event) {
        let mut skipped = Vec::new();
        loop {
            let evt = self.event();
            if pred(&evt) {
                return (skipped, evt);
            }
            skipped.push(evt);
        }
    }
}

static SNAPSHOT: &str =
    r#"{"allRoutes": [{"id": 1, "status": "o", "route_name": "Oak"}], "userRouteId": 1}"#;

#[test]
fn snapshots_are_delivered_and_keepalive_responses_consumed() {
    let h = Harness::quiet();
    let peer = h.peer();
    assert!(matches!(h.event(), Event::Connected));

    peer.push(r#"{"type": "keepalive-response"}"#);
    peer.push(SNAPSHOT);
    peer.push("not json");
    peer.push(r#"{"allRoutes": [], "announcement": "second"}"#);

    match h.event() {
        Event::Message(snapshot) => {
            let routes = snapshot.all_routes.unwrap();
            assert_eq!(routes[0].status, Status::OnTime);
            assert_eq!(snapshot.user_route_id, Some(Ident::Num(1)));
        }
        other => panic!("unexpected {:?}", other),
    }
    assert!(matches!(h.event(), Event::ProtocolError(_)));
    match h.event() {
        Event::Message(snapshot) => assert_eq!(snapshot.announcement.as_deref(), Some("second")),
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn outbound_messages_reach_the_server() {
    let h = Harness::quiet();
    let peer = h.peer();
    assert!(matches!(h.event(), Event::Connected));

    h.link
        .send(Outbound::SetStatus {
            id: Ident::Num(4),
            status: Status::Delayed,
        })
        .unwrap();
    let sent: serde_json::Value = serde_json::from_str(&peer.next()).unwrap();
    assert_eq!(sent, serde_json::json!({"id": 4, "status": "d"}));

    let outlet = h.link.outlet();
    std::thread::spawn(move || {
        outlet.send(Outbound::Announce("hi".to_string())).unwrap();
    })
    .join()
    .unwrap();
    let sent: serde_json::Value = serde_json::from_str(&peer.next()).unwrap();
    assert_eq!(sent, serde_json::json!({"announcement": "hi"}));
}

#[test]
fn dropped_connection_reconnects_after_backoff() {
    let h = Harness::quiet();
    let peer = h.peer();
    assert!(matches!(h.event(), Event::Connected));

    let dropped_at = Instant::now();
    drop(peer);
    assert!(matches!(h.event(), Event::Disconnected));
    match h.event() {
        Event::Reconnecting { attempt, delay } => {
            assert_eq!(attempt, 1);
            assert_eq!(delay, Duration::from_millis(20));
        }
        other => panic!("unexpected {:?}", other),
    }
    assert!(matches!(h.event(), Event::Connected));
    assert!(dropped_at.elapsed() >= Duration::from_millis(20));

    // the new connection works
    let peer = h.peer();
    peer.push(SNAPSHOT);
    assert!(matches!(h.event(), Event::Message(_)));
}

#[test]
fn failed_attempts_grow_the_delay_until_success() {
    let h = Harness::new(
        LivenessPolicy {
            interval: Duration::from_secs(600),
            timeout: Duration::from_secs(60),
        },
        true,
    );
    let mut delays = Vec::new();
    while delays.len() < 3 {
        match h.event() {
            Event::ConnectFailed(_) => {}
            Event::Reconnecting { delay, .. } => delays.push(delay),
            other => panic!("unexpected {:?}", other),
        }
    }
    assert_eq!(
        delays,
        vec![
            Duration::from_millis(20),
            Duration::from_millis(25),
            Duration::from_micros(31250),
        ]
    );

    h.refuse.store(false, Ordering::SeqCst);
    h.until(|e| matches!(e, Event::Connected));
    let _peer = h.peer();

    // a successful connection resets the backoff
    drop(_peer);
    let (_, evt) = h.until(|e| matches!(e, Event::Reconnecting { .. }));
    match evt {
        Event::Reconnecting { attempt, delay } => {
            assert_eq!(attempt, 1);
            assert_eq!(delay, Duration::from_millis(20));
        }
        _ => unreachable!(),
    }
}

#[test]
fn refresh_reconnects_immediately() {
    let h = Harness::quiet();
    let _first = h.peer();
    assert!(matches!(h.event(), Event::Connected));

    h.link.refresh().unwrap();
    assert!(matches!(h.event(), Event::Refreshing));
    assert!(matches!(h.event(), Event::Disconnected));
    assert!(matches!(h.event(), Event::Connected));
    let second = h.peer();
    second.push(SNAPSHOT);
    assert!(matches!(h.event(), Event::Message(_)));
}

#[test]
fn unanswered_heartbeat_forces_one_refresh() {
    let h = Harness::new(
        LivenessPolicy {
            interval: Duration::from_millis(50),
            timeout: Duration::from_millis(30),
        },
        false,
    );
    let first = h.peer();
    assert!(matches!(h.event(), Event::Connected));
    assert!(matches!(h.event(), Event::HeartbeatSent));
    let beat: serde_json::Value = serde_json::from_str(&first.next()).unwrap();
    assert_eq!(beat, serde_json::json!({"type": "keepalive"}));

    assert!(matches!(h.event(), Event::HeartbeatTimeout));
    assert!(matches!(h.event(), Event::Disconnected));
    assert!(matches!(h.event(), Event::Connected));
    let _second = h.peer();
}

#[test]
fn answered_heartbeats_keep_the_connection() {
    let h = Harness::new(
        LivenessPolicy {
            interval: Duration::from_millis(40),
            timeout: Duration::from_millis(500),
        },
        false,
    );
    let peer = h.peer();
    assert!(matches!(h.event(), Event::Connected));
    std::thread::spawn(move || {
        while let Ok(_) = peer.from_client.recv() {
            if peer
                .to_client
                .send(r#"{"type": "keepalive-response"}"#.to_string())
                .is_err()
            {
                break;
            }
        }
    });

    let mut beats = 0;
    while beats < 4 {
        match h.event() {
            Event::HeartbeatSent => beats += 1,
            other => panic!("unexpected {:?}", other),
        }
    }
    assert!(h.peers.try_recv().is_err());
}

#[test]
fn sends_while_down_are_dropped() {
    let h = Harness::new(
        LivenessPolicy {
            interval: Duration::from_secs(600),
            timeout: Duration::from_secs(60),
        },
        true,
    );
    h.link
        .send(Outbound::SetStatus {
            id: Ident::Num(1),
            status: Status::Arrived,
        })
        .unwrap();
    let (skipped, evt) = h.until(|e| matches!(e, Event::SendDropped(_)));
    assert!(skipped
        .iter()
        .all(|e| matches!(e, Event::ConnectFailed(_) | Event::Reconnecting { .. })));
    match evt {
        Event::SendDropped(msg) => assert_eq!(
            msg,
            Outbound::SetStatus {
                id: Ident::Num(1),
                status: Status::Arrived
            }
        ),
        _ => unreachable!(),
    }
}

#[test]
fn dropping_the_interface_ends_the_thread() {
    let h = Harness::quiet();
    let peer = h.peer();
    let Harness { link, .. } = h;
    let events = link.receiver().clone();
    drop(link);
    loop {
        match events.recv_timeout(WAIT) {
            Ok(Event::Exiting) => break,
            Ok(_) => continue,
            Err(e) => panic!("link thread did not exit: {:?}", e),
        }
    }
    // the connection was closed
    assert!(peer.from_client.recv_timeout(WAIT).is_err());
}
