//! Laser tag live scoring server
//!
//! Receives tagger hit reports over UDP, applies scoring to the in-memory
//! match, echoes acknowledgement codes back to the hardware, and exposes an
//! HTTP control surface for roster entry, match control and the scoreboard.

pub mod app;
pub mod config;
pub mod game;
pub mod http;
pub mod store;
pub mod udp;
