pub mod board;
pub mod link;

pub use board::Session;
pub use link::Interface as LinkInterface;
