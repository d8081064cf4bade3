//! Websocket Port
//!
//! Implements a `RawPort` over a blocking `tungstenite` client socket.
//! The underlying TCP stream gets a read timeout equal to the poll
//! interval, so a read that times out surfaces as `RecvError::NotReady`
//! and tungstenite resumes any partially read frame on the next call.

use super::{ConnectError, RawPort, RecvError, SendError};
use std::io;
use std::net::TcpStream;
use std::time::Duration;
use tungstenite::stream::MaybeTlsStream;
use tungstenite::{Message, WebSocket};

/// RawPort to communicate via a websocket
pub struct Port {
    socket: WebSocket<MaybeTlsStream<TcpStream>>,
}

impl Port {
    /// Performs the handshake with `url` and prepares the socket for polling.
    pub fn new(url: &str, poll_interval: Duration) -> Result<Port, ConnectError> {
        let (socket, _response) =
            tungstenite::connect(url).map_err(|e| ConnectError::Handshake(e.to_string()))?;
        let timeout = Some(std::cmp::max(poll_interval, Duration::from_millis(1)));
        match socket.get_ref() {
            MaybeTlsStream::Plain(stream) => stream.set_read_timeout(timeout)?,
            MaybeTlsStream::Rustls(stream) => stream.get_ref().set_read_timeout(timeout)?,
            _ => {}
        }
        Ok(Port { socket })
    }
}

fn is_timeout(err: &io::Error) -> bool {
    match err.kind() {
        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut => true,
        _ => false,
    }
}

impl RawPort for Port {
    fn recv(&mut self) -> Result<String, RecvError> {
        match self.socket.read() {
            Ok(Message::Text(text)) => Ok(text),
            Ok(Message::Close(_)) => Err(RecvError::Disconnected),
            Ok(Message::Ping(_)) => {
                // The pong is queued by tungstenite, push it out now.
                if let Err(tungstenite::Error::Io(e)) = self.socket.flush() {
                    if !is_timeout(&e) {
                        return Err(RecvError::IO(e));
                    }
                }
                Err(RecvError::NotReady)
            }
            // Binary, pong and raw frames carry nothing for the board.
            Ok(_) => Err(RecvError::NotReady),
            Err(tungstenite::Error::Io(e)) => {
                if is_timeout(&e) {
                    Err(RecvError::NotReady)
                } else {
                    Err(RecvError::IO(e))
                }
            }
            Err(tungstenite::Error::ConnectionClosed) | Err(tungstenite::Error::AlreadyClosed) => {
                Err(RecvError::Disconnected)
            }
            Err(e) => Err(RecvError::Socket(e.to_string())),
        }
    }

    fn send(&mut self, text: &str) -> Result<(), SendError> {
        match self.socket.send(Message::Text(text.to_string())) {
            Ok(()) => Ok(()),
            Err(tungstenite::Error::Io(e)) => Err(SendError::IO(e)),
            Err(tungstenite::Error::ConnectionClosed) | Err(tungstenite::Error::AlreadyClosed) => {
                Err(SendError::Disconnected)
            }
            Err(e) => Err(SendError::Socket(e.to_string())),
        }
    }

    fn close(&mut self) {
        let _ = self.socket.close(None);
        let _ = self.socket.flush();
    }
}
