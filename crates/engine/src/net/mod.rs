mod client;
mod protocol;

pub use client::{ConnectionError, LinkEvent, LinkState, NetworkClient, ServerLink};
pub use protocol::{ClientMessage, ProtocolError, ServerMessage};
