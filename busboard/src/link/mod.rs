pub mod backoff;
pub mod client;
mod client_core;
pub mod endpoint;
pub mod liveness;
pub mod port;
pub mod proto;

pub use client::{Event, Interface, LinkConfig, LinkOutlet, Outlet};
pub use port::{RecvError, SendError};
pub use proto::{Inbound, Outbound, Snapshot};
