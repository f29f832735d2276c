//! Connection lifecycle of the operator link.
//!
//! The manager never blocks: the transport reports the outcome of every
//! establishment attempt, and every failure, as a [`TransportEvent`] tagged
//! with the [`LinkId`] returned by [`Transport::open`]. Events from a
//! superseded link are ignored.

use std::time::{Duration, Instant};

use tracing::{debug, info, trace, warn};

use crate::error::TransportError;
use crate::input::InputSurface;
use crate::protocol::{encode, Command};
use crate::state::{ConnectionState, ReconnectTimer};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LinkId(pub u64);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    Opened,
    Message(String),
    Error(String),
    Closed,
}

pub trait Transport {
    /// Begins a non-blocking establishment attempt.
    fn open(&mut self) -> Result<LinkId, TransportError>;

    /// Queues one text frame on the current link.
    fn send(&mut self, text: String) -> Result<(), TransportError>;

    /// Tears down the current link, if any. No further events are required
    /// for it.
    fn close(&mut self);
}

pub struct ChannelManager<T: Transport> {
    transport: T,
    state: ConnectionState,
    link: Option<LinkId>,
    timer: ReconnectTimer,
    stopped: bool,
}

impl<T: Transport> ChannelManager<T> {
    pub fn new(transport: T, reconnect_delay: Duration) -> Self {
        ChannelManager {
            transport,
            state: ConnectionState::Disconnected,
            link: None,
            timer: ReconnectTimer::new(reconnect_delay),
            stopped: false,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn reconnect_deadline(&self) -> Option<Instant> {
        self.timer.deadline()
    }

    /// Starts an establishment attempt. Ignored unless disconnected.
    pub fn connect(&mut self, now: Instant) -> bool {
        if self.state != ConnectionState::Disconnected {
            debug!("connect ignored while {}", self.state);
            return false;
        }
        self.stopped = false;
        self.timer.cancel();
        self.state = ConnectionState::Connecting;
        info!("connecting");

        match self.transport.open() {
            Ok(link) => {
                self.link = Some(link);
                true
            }
            Err(e) => {
                self.fail(now, &e.to_string());
                false
            }
        }
    }

    /// Fires the reconnect deadline when it is due.
    pub fn poll(&mut self, now: Instant) {
        if self.timer.fire(now) {
            debug!("reconnect timer fired");
            self.connect(now);
        }
    }

    pub fn on_event(
        &mut self,
        link: LinkId,
        event: TransportEvent,
        surface: &InputSurface,
        now: Instant,
    ) {
        if self.link != Some(link) {
            trace!("ignoring {:?} from stale link {:?}", event, link);
            return;
        }

        match event {
            TransportEvent::Opened => {
                if self.state != ConnectionState::Connecting {
                    debug!("unexpected open while {}", self.state);
                    return;
                }
                self.state = ConnectionState::Open;
                info!("link open");
                self.replay(surface, now);
            }
            TransportEvent::Message(text) => {
                debug!("inbound message ignored: {:?}", text);
            }
            TransportEvent::Error(reason) => self.fail(now, &reason),
            TransportEvent::Closed => self.fail(now, "closed by peer"),
        }
    }

    /// Sends a command if the link is open, otherwise drops it.
    pub fn send(&mut self, command: &Command, now: Instant) {
        if self.state != ConnectionState::Open {
            trace!("dropping {} while {}", command, self.state);
            return;
        }
        if let Err(e) = self.transport.send(encode(command)) {
            self.fail(now, &e.to_string());
        }
    }

    pub fn shutdown(&mut self) {
        self.stopped = true;
        self.timer.cancel();
        if self.link.take().is_some() {
            self.transport.close();
        }
        self.state = ConnectionState::Disconnected;
        info!("link shut down");
    }

    fn replay(&mut self, surface: &InputSurface, now: Instant) {
        for command in surface.replay() {
            self.send(&command, now);
            if self.state != ConnectionState::Open {
                break;
            }
        }
    }

    fn fail(&mut self, now: Instant, reason: &str) {
        warn!("link lost while {}: {}", self.state, reason);
        if self.link.take().is_some() {
            self.transport.close();
        }
        self.state = ConnectionState::Disconnected;

        if self.stopped {
            return;
        }
        if self.timer.schedule(now) {
            info!("reconnecting in {} ms", self.timer.delay().as_millis());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::{ControlEvent, Slider};

    #[derive(Default)]
    struct Recorder {
        opened: u64,
        closed: usize,
        sent: Vec<String>,
        refuse_open: bool,
        refuse_send: bool,
    }

    impl Transport for Recorder {
        fn open(&mut self) -> Result<LinkId, TransportError> {
            if self.refuse_open {
                return Err(TransportError::Closed);
            }
            self.opened += 1;
            Ok(LinkId(self.opened))
        }

        fn send(&mut self, text: String) -> Result<(), TransportError> {
            if self.refuse_send {
                return Err(TransportError::Closed);
            }
            self.sent.push(text);
            Ok(())
        }

        fn close(&mut self) {
            self.closed += 1;
        }
    }

    const DELAY: Duration = Duration::from_millis(2000);

    fn open_manager(surface: &InputSurface, now: Instant) -> ChannelManager<Recorder> {
        let mut manager = ChannelManager::new(Recorder::default(), DELAY);
        assert!(manager.connect(now));
        manager.on_event(LinkId(1), TransportEvent::Opened, surface, now);
        manager
    }

    #[test]
    fn starts_disconnected_and_drops_sends() {
        let mut manager = ChannelManager::new(Recorder::default(), DELAY);
        assert_eq!(manager.state(), ConnectionState::Disconnected);
        manager.send(&Command::drive(crate::protocol::MoveCode::Forward), Instant::now());
        assert!(manager.transport().sent.is_empty());
    }

    #[test]
    fn replays_sliders_on_open() {
        let now = Instant::now();
        let mut surface = InputSurface::default();
        surface.handle(ControlEvent::Slider(Slider::Head, 10));
        let manager = open_manager(&surface, now);
        assert_eq!(manager.state(), ConnectionState::Open);
        assert_eq!(manager.transport().sent.len(), 5);
        assert_eq!(manager.transport().sent[0], "head,10");
    }

    #[test]
    fn connect_only_from_disconnected() {
        let now = Instant::now();
        let surface = InputSurface::default();
        let mut manager = open_manager(&surface, now);
        assert!(!manager.connect(now));
        assert_eq!(manager.transport().opened, 1);
    }

    #[test]
    fn close_schedules_a_single_retry() {
        let now = Instant::now();
        let surface = InputSurface::default();
        let mut manager = open_manager(&surface, now);

        manager.on_event(LinkId(1), TransportEvent::Closed, &surface, now);
        assert_eq!(manager.state(), ConnectionState::Disconnected);
        assert_eq!(manager.reconnect_deadline(), Some(now + DELAY));

        manager.poll(now + Duration::from_millis(1999));
        assert_eq!(manager.transport().opened, 1);
        manager.poll(now + DELAY);
        assert_eq!(manager.state(), ConnectionState::Connecting);
        assert_eq!(manager.transport().opened, 2);
        assert_eq!(manager.reconnect_deadline(), None);
    }

    #[test]
    fn error_then_close_does_not_stack_retries() {
        let now = Instant::now();
        let surface = InputSurface::default();
        let mut manager = open_manager(&surface, now);

        manager.on_event(LinkId(1), TransportEvent::Error("reset".into()), &surface, now);
        // the close for the same link arrives after it was already dropped
        let late = now + Duration::from_millis(300);
        manager.on_event(LinkId(1), TransportEvent::Closed, &surface, late);
        assert_eq!(manager.reconnect_deadline(), Some(now + DELAY));
        assert_eq!(manager.transport().closed, 1);
    }

    #[test]
    fn refused_open_retries_later() {
        let now = Instant::now();
        let mut manager = ChannelManager::new(
            Recorder {
                refuse_open: true,
                ..Recorder::default()
            },
            DELAY,
        );
        assert!(!manager.connect(now));
        assert_eq!(manager.state(), ConnectionState::Disconnected);
        assert!(manager.reconnect_deadline().is_some());
    }

    #[test]
    fn manual_connect_cancels_pending_retry() {
        let now = Instant::now();
        let surface = InputSurface::default();
        let mut manager = open_manager(&surface, now);
        manager.on_event(LinkId(1), TransportEvent::Closed, &surface, now);

        assert!(manager.connect(now + Duration::from_millis(100)));
        assert_eq!(manager.reconnect_deadline(), None);
        manager.poll(now + DELAY);
        assert_eq!(manager.transport().opened, 2);
    }

    #[test]
    fn send_failure_disconnects() {
        let now = Instant::now();
        let surface = InputSurface::default();
        let mut manager = open_manager(&surface, now);
        manager.transport_mut().refuse_send = true;
        manager.send(&Command::drive(crate::protocol::MoveCode::Left), now);
        assert_eq!(manager.state(), ConnectionState::Disconnected);
        assert!(manager.reconnect_deadline().is_some());
    }

    #[test]
    fn inbound_messages_are_ignored() {
        let now = Instant::now();
        let surface = InputSurface::default();
        let mut manager = open_manager(&surface, now);
        manager.on_event(LinkId(1), TransportEvent::Message("telemetry".into()), &surface, now);
        assert_eq!(manager.state(), ConnectionState::Open);
    }

    #[test]
    fn stale_link_events_are_ignored() {
        let now = Instant::now();
        let surface = InputSurface::default();
        let mut manager = open_manager(&surface, now);
        manager.on_event(LinkId(1), TransportEvent::Closed, &surface, now);
        manager.poll(now + DELAY);

        manager.on_event(LinkId(1), TransportEvent::Opened, &surface, now + DELAY);
        assert_eq!(manager.state(), ConnectionState::Connecting);
    }

    #[test]
    fn shutdown_stops_reconnecting() {
        let now = Instant::now();
        let surface = InputSurface::default();
        let mut manager = open_manager(&surface, now);
        manager.shutdown();
        assert_eq!(manager.state(), ConnectionState::Disconnected);
        assert_eq!(manager.reconnect_deadline(), None);
        manager.poll(now + DELAY * 2);
        assert_eq!(manager.transport().opened, 1);
    }
}
