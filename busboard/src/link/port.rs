//! Raw duplex port
//!
//! A `RawPort` is one established connection carrying JSON text frames.
//! It never reconnects by itself: on any error other than `NotReady` the
//! owner tears it down and asks its `Connector` for a new one.
//!
//! `recv` is expected to wait a bounded amount of time (the poll interval)
//! before returning `NotReady`, which paces the link thread's loop.

pub mod ws;

use std::io;
use std::time::Duration;

/// Possible errors when receiving from a `RawPort`
#[derive(Debug)]
pub enum RecvError {
    /// No frame arrived within the poll interval.
    NotReady,
    /// The peer closed the connection.
    Disconnected,
    /// Low level IO error.
    IO(io::Error),
    /// Websocket framing or handshake level failure.
    Socket(String),
}

/// Possible errors when sending to a `RawPort` or a link
#[derive(Debug)]
pub enum SendError {
    /// The connection (or the link thread) is gone.
    Disconnected,
    /// Issue with the underlying IO operation.
    IO(io::Error),
    /// Websocket level failure.
    Socket(String),
}

#[derive(Debug, thiserror::Error)]
pub enum ConnectError {
    #[error("invalid url '{0}'")]
    InvalidUrl(String),

    #[error("socket setup failed: {0}")]
    IO(#[from] io::Error),

    #[error("websocket handshake failed: {0}")]
    Handshake(String),
}

/// Generic interface for one live connection.
pub trait RawPort: Send {
    /// Returns the next text frame, waiting at most the poll interval.
    fn recv(&mut self) -> Result<String, RecvError>;

    /// Sends a text frame.
    fn send(&mut self, text: &str) -> Result<(), SendError>;

    /// Best effort close; errors are irrelevant since the port is dropped next.
    fn close(&mut self) {}
}

/// Creates connections for the link thread.
pub trait Connector: Send {
    fn connect(&mut self, url: &str) -> Result<Box<dyn RawPort>, ConnectError>;
}

/// `Connector` producing websocket ports.
pub struct WsConnector {
    pub poll_interval: Duration,
}

impl Default for WsConnector {
    fn default() -> WsConnector {
        WsConnector {
            poll_interval: Duration::from_millis(100),
        }
    }
}

impl Connector for WsConnector {
    fn connect(&mut self, url: &str) -> Result<Box<dyn RawPort>, ConnectError> {
        let split_url: Vec<&str> = url.splitn(2, "://").collect();
        match split_url[..] {
            ["ws", _] | ["wss", _] => Ok(Box::new(ws::Port::new(url, self.poll_interval)?)),
            _ => Err(ConnectError::InvalidUrl(url.to_string())),
        }
    }
}
