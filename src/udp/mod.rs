//! Hardware-facing UDP: wire grammar, echo broadcasts, and the receive loop

pub mod broadcast;
pub mod listener;
pub mod protocol;

pub use broadcast::{BroadcastDispatcher, BroadcastError};
pub use listener::{DatagramSource, UdpListener};
pub use protocol::{HitMessage, ParseError};
