pub mod alert;
pub mod config;
pub mod notice;
pub mod reconcile;
pub mod render;
pub mod seatmap;
pub mod session;
pub mod state;
pub mod status;

pub use config::BoardConfig;
pub use notice::{Notice, Notifier};
pub use reconcile::{Reconciled, Transition};
pub use render::{BoardKind, Frame, Surface};
pub use session::{Session, SessionError};
pub use state::SessionState;
