//! Link client
//!
//! An `Interface` owns a self-reconnecting connection to one bus status
//! endpoint. The connection, its reconnection backoff and the heartbeat
//! liveness monitor all live in a dedicated thread (`LinkCore`); the
//! application talks to it through `crossbeam::channel`s:
//! - outbound messages and control requests go in via `send`/`refresh`,
//! - everything that happens comes back as `Event`s, in delivery order.
//!
//! Keepalive responses never reach the event queue; the link consumes them.
//!
//! Note: the link runs in a dedicated thread, which exits when the
//! `Interface` (and every `Outlet` cloned from it) is dropped.

use super::backoff::ReconnectPolicy;
use super::client_core::{Control, LinkCore};
use super::liveness::LivenessPolicy;
use super::port::{Connector, SendError, WsConnector};
use super::proto::{self, Outbound, Snapshot};

use std::env;
use std::thread;
use std::time::Duration;

use crossbeam::channel;

/// Status event that `LinkCore` sends back to the application.
#[derive(Debug)]
pub enum Event {
    /// A connection was established (first time or after a drop).
    Connected,
    /// An established connection was lost or torn down.
    Disconnected,
    /// A connection attempt failed.
    ConnectFailed(String),
    /// Next connection attempt is scheduled after `delay`.
    Reconnecting { attempt: u32, delay: Duration },
    HeartbeatSent,
    /// No keepalive response within the timeout; a refresh follows.
    HeartbeatTimeout,
    /// A refresh was requested and the connection is being recreated.
    Refreshing,
    /// A snapshot, in delivery order.
    Message(Snapshot),
    /// An inbound frame that could not be understood, dropped.
    ProtocolError(proto::Error),
    /// An outbound message that could not be delivered, dropped.
    SendDropped(Outbound),
    Exiting,
}

#[derive(Debug, Clone)]
pub struct LinkConfig {
    pub reconnect: ReconnectPolicy,
    pub liveness: LivenessPolicy,
    /// How long the link thread waits on the socket before servicing
    /// timers and outbound requests.
    pub poll_interval: Duration,
    pub event_queue: usize,
}

/// Default size of the event queue.
pub static DEFAULT_EVENT_QUEUE_SIZE: usize = 64;

impl Default for LinkConfig {
    fn default() -> LinkConfig {
        LinkConfig {
            reconnect: ReconnectPolicy::default(),
            liveness: LivenessPolicy::default(),
            poll_interval: Duration::from_millis(100),
            event_queue: DEFAULT_EVENT_QUEUE_SIZE,
        }
    }
}

/// Something that accepts outbound messages. The session only sees this.
pub trait Outlet {
    fn send(&self, msg: Outbound) -> Result<(), SendError>;
}

/// Cloneable handle to push messages into a link.
#[derive(Clone)]
pub struct LinkOutlet {
    control: channel::Sender<Control>,
}

impl Outlet for LinkOutlet {
    fn send(&self, msg: Outbound) -> Result<(), SendError> {
        match self.control.send(Control::Send(msg)) {
            Ok(()) => Ok(()),
            Err(_) => Err(SendError::Disconnected),
        }
    }
}

/// Interface to a link. Spawns and owns the link thread.
pub struct Interface {
    outlet: LinkOutlet,
    events: channel::Receiver<Event>,
}

impl Interface {
    /// Create a new Interface and a new LinkCore running in a separate
    /// thread, using `connector` to create connections to `url`.
    pub fn new_link(url: &str, connector: Box<dyn Connector>, config: LinkConfig) -> Interface {
        let (control_sender, control_receiver) = channel::unbounded::<Control>();
        let (event_sender, event_receiver) =
            channel::bounded::<Event>(Self::get_event_queue_size(config.event_queue));
        let url_string = url.to_string();
        thread::spawn(move || {
            let mut core =
                LinkCore::new(url_string, connector, config, control_receiver, event_sender);
            core.run();
        });
        Interface {
            outlet: LinkOutlet {
                control: control_sender,
            },
            events: event_receiver,
        }
    }

    /// Create a new websocket link to `url` with default parameters.
    pub fn new(url: &str) -> Interface {
        Self::with_config(url, LinkConfig::default())
    }

    /// Create a new websocket link to `url`.
    pub fn with_config(url: &str, config: LinkConfig) -> Interface {
        let connector = WsConnector {
            poll_interval: config.poll_interval,
        };
        Self::new_link(url, Box::new(connector), config)
    }

    /// The environment can only raise the queue size, never lower it.
    pub fn get_event_queue_size(requested: usize) -> usize {
        let min_size = std::cmp::max(requested, 1);
        if let Ok(req) = env::var("BUSBOARD_EVENT_QUEUE") {
            std::cmp::max(req.parse().unwrap_or(0), min_size)
        } else {
            min_size
        }
    }

    /// Queue a message for the server. Delivery is not confirmed: if the
    /// link is down at the time, the message is dropped with a
    /// `SendDropped` event.
    pub fn send(&self, msg: Outbound) -> Result<(), SendError> {
        self.outlet.send(msg)
    }

    /// Tear the current connection down and connect again right away.
    pub fn refresh(&self) -> Result<(), SendError> {
        match self.outlet.control.send(Control::Refresh) {
            Ok(()) => Ok(()),
            Err(_) => Err(SendError::Disconnected),
        }
    }

    pub fn outlet(&self) -> LinkOutlet {
        self.outlet.clone()
    }

    /// To use `crossbeam::channel::select!`.
    pub fn receiver(&self) -> &channel::Receiver<Event> {
        &self.events
    }

    /// Iterate over events (until the link thread exits or break out).
    pub fn iter(&self) -> channel::Iter<'_, Event> {
        self.events.iter()
    }

    /// Iterate over events (until empty channel).
    pub fn try_iter(&self) -> channel::TryIter<'_, Event> {
        self.events.try_iter()
    }
}

impl Outlet for Interface {
    fn send(&self, msg: Outbound) -> Result<(), SendError> {
        self.outlet.send(msg)
    }
}
