use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::channel::{ChannelManager, LinkId, Transport, TransportEvent};
use crate::input::{ControlEvent, InputSurface};
use crate::state::ConnectionState;

/// Everything the session loop reacts to, delivered serially.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    Input(ControlEvent),
    Link { link: LinkId, event: TransportEvent },
    Connect,
    Shutdown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Stop,
}

/// Wait used when no reconnect is pending.
const IDLE_WAIT: Duration = Duration::from_millis(500);

pub struct Session<T: Transport> {
    surface: InputSurface,
    manager: ChannelManager<T>,
}

impl<T: Transport> Session<T> {
    pub fn new(surface: InputSurface, manager: ChannelManager<T>) -> Self {
        Session { surface, manager }
    }

    pub fn surface(&self) -> &InputSurface {
        &self.surface
    }

    pub fn manager(&self) -> &ChannelManager<T> {
        &self.manager
    }

    pub fn manager_mut(&mut self) -> &mut ChannelManager<T> {
        &mut self.manager
    }

    pub fn state(&self) -> ConnectionState {
        self.manager.state()
    }

    pub fn handle(&mut self, event: SessionEvent, now: Instant) -> Flow {
        match event {
            SessionEvent::Input(control) => {
                if let Some(command) = self.surface.handle(control) {
                    debug!("{:?} -> {}", control, command);
                    self.manager.send(&command, now);
                }
            }
            SessionEvent::Link { link, event } => {
                self.manager.on_event(link, event, &self.surface, now);
            }
            SessionEvent::Connect => {
                self.manager.connect(now);
            }
            SessionEvent::Shutdown => {
                for stop in self.surface.release_all() {
                    self.manager.send(&stop, now);
                }
                self.manager.shutdown();
                return Flow::Stop;
            }
        }
        Flow::Continue
    }

    /// Fires the reconnect deadline if due.
    pub fn tick(&mut self, now: Instant) {
        self.manager.poll(now);
    }

    /// Connects, then processes events until a [`SessionEvent::Shutdown`].
    ///
    /// [`WsTransport`](crate::websocket::WsTransport) keeps a sender of its
    /// own, so with it the queue never runs dry: frontends must deliver
    /// `Shutdown` when they stop. Transports without a sender end the
    /// session once every frontend sender is dropped.
    pub fn run(mut self, events: Receiver<SessionEvent>) -> Self {
        self.manager.connect(Instant::now());

        loop {
            let now = Instant::now();
            let wait = self
                .manager
                .reconnect_deadline()
                .map(|deadline| deadline.saturating_duration_since(now))
                .unwrap_or(IDLE_WAIT);

            match events.recv_timeout(wait) {
                Ok(event) => {
                    if self.handle(event, Instant::now()) == Flow::Stop {
                        break;
                    }
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => {
                    self.handle(SessionEvent::Shutdown, Instant::now());
                    break;
                }
            }
            self.tick(Instant::now());
        }

        info!("session finished");
        self
    }
}
