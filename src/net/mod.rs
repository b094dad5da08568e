//! Peer-to-peer networking: message codec and the framed TCP stream

pub mod protocol;
pub mod transport;

pub use protocol::{ControlKind, ControlMsg, FrameState, LeaderboardPayload, ProtocolError};
pub use transport::{Connection, ConnectionError};
