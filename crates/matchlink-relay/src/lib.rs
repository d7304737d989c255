//! matchlink-relay: per-session WebSocket fan-out.
//!
//! Clients connect to `{prefix}/ws/{session}/{participant}`. Every text
//! frame a client sends is broadcast unchanged to every subscriber of the
//! same session, the sender included. Clients drop their own echoes.

pub mod hub;
pub mod server;

pub use hub::SessionHub;
pub use server::{RelayConfig, RelayServer};
