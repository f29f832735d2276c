//! Remote-control link for the IRMP rescue platform.
//!
//! Operator controls ([`input`]) produce commands in the text grammar of
//! [`protocol`]; the [`channel`] manager carries them over a WebSocket
//! ([`websocket`]) and resynchronizes slider positions after every
//! reconnect. [`platform`] is the receiving side.

pub mod channel;
pub mod config;
pub mod error;
pub mod input;
pub mod platform;
pub mod protocol;
pub mod session;
pub mod state;
pub mod websocket;

pub use channel::{ChannelManager, LinkId, Transport, TransportEvent};
pub use config::LinkConfig;
pub use error::{CommandError, ConfigError, TransportError};
pub use input::{Button, ControlEvent, InputSurface, Slider, Touch};
pub use protocol::{decode, encode, Channel, Command, MoveCode};
pub use session::{Session, SessionEvent};
pub use state::ConnectionState;
pub use websocket::WsTransport;
