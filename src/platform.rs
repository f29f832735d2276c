//! Receiving side of the link: the platform controller's input contract and
//! a WebSocket server that feeds it.
//!
//! The controller keeps only the most recent command per channel. Unknown
//! channels are a no-op so older platforms keep working with newer remotes.

use std::collections::BTreeMap;
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};
use tungstenite::handshake::HandshakeError;
use tungstenite::{accept, Message};

use crate::error::{CommandError, TransportError};
use crate::protocol::{decode, Channel, Command, MoveCode};

/// Hardware driven by the controller.
pub trait Actuators: Send {
    fn drive(&mut self, code: MoveCode);
    fn position(&mut self, channel: Channel, value: u8);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Reading {
    pub value: u8,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlatformSnapshot {
    pub channels: BTreeMap<Channel, Reading>,
    pub applied: u64,
    pub discarded: u64,
    pub ignored: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Applied(Command),
    /// Malformed grammar or a value outside the channel's domain.
    Discarded,
    /// Unknown channel name.
    Ignored,
}

pub struct PlatformController {
    actuators: Box<dyn Actuators>,
    latest: BTreeMap<Channel, Reading>,
    applied: u64,
    discarded: u64,
    ignored: u64,
}

impl PlatformController {
    pub fn new(actuators: Box<dyn Actuators>) -> Self {
        PlatformController {
            actuators,
            latest: BTreeMap::new(),
            applied: 0,
            discarded: 0,
            ignored: 0,
        }
    }

    pub fn handle_message(&mut self, text: &str) -> Outcome {
        match decode(text) {
            Ok(command) => {
                self.apply(command);
                Outcome::Applied(command)
            }
            Err(CommandError::UnrecognizedChannel(name)) => {
                debug!("ignoring unknown channel {:?}", name);
                self.ignored += 1;
                Outcome::Ignored
            }
            Err(e) => {
                warn!("discarding message: {}", e);
                self.discarded += 1;
                Outcome::Discarded
            }
        }
    }

    pub fn apply(&mut self, command: Command) {
        let channel = command.channel();
        match command.move_code() {
            Some(code) => self.actuators.drive(code),
            None => self.actuators.position(channel, command.value()),
        }
        self.latest.insert(
            channel,
            Reading {
                value: command.value(),
                updated_at: Utc::now(),
            },
        );
        self.applied += 1;
    }

    pub fn latest(&self, channel: Channel) -> Option<u8> {
        self.latest.get(&channel).map(|r| r.value)
    }

    pub fn drive(&self) -> Option<MoveCode> {
        self.latest(Channel::Move).and_then(MoveCode::from_code)
    }

    pub fn snapshot(&self) -> PlatformSnapshot {
        PlatformSnapshot {
            channels: self.latest.clone(),
            applied: self.applied,
            discarded: self.discarded,
            ignored: self.ignored,
        }
    }
}

/// Accepts operator connections forever, one thread per connection.
pub fn serve(listener: TcpListener, controller: Arc<Mutex<PlatformController>>) {
    for stream in listener.incoming() {
        let stream = match stream {
            Ok(s) => s,
            Err(e) => {
                warn!("connection error: {}", e);
                continue;
            }
        };

        let controller = Arc::clone(&controller);
        thread::spawn(move || {
            let peer = stream
                .peer_addr()
                .map(|a| a.to_string())
                .unwrap_or_else(|_| "unknown".to_string());
            match serve_connection(stream, &controller) {
                Ok(()) => info!("operator {} disconnected", peer),
                Err(e) => warn!("operator {} dropped: {}", peer, e),
            }
        });
    }
}

/// Applies every text frame of one operator connection until it closes.
pub fn serve_connection(
    stream: TcpStream,
    controller: &Mutex<PlatformController>,
) -> Result<(), TransportError> {
    let mut websocket = accept(stream).map_err(|e| match e {
        HandshakeError::Failure(e) => TransportError::WebSocket(e),
        HandshakeError::Interrupted(_) => TransportError::Closed,
    })?;
    info!("operator connected");

    loop {
        match websocket.read() {
            Ok(Message::Text(text)) => {
                let mut locked = controller.lock().map_err(|_| TransportError::Closed)?;
                locked.handle_message(&text);
            }
            Ok(Message::Close(_)) => {}
            Ok(_) => {}
            Err(tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed) => {
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        }
    }
}
