use std::io::ErrorKind;
use std::net::TcpStream;
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::thread;
use std::time::Duration;

use tracing::{debug, info, warn};
use tungstenite::stream::MaybeTlsStream;
use tungstenite::{connect, Message, WebSocket};

use crate::channel::{LinkId, Transport, TransportEvent};
use crate::error::TransportError;
use crate::session::SessionEvent;

/// How long a link thread blocks on a read before flushing queued frames.
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// WebSocket client transport. Each establishment attempt runs on its own
/// thread, which owns the socket and reports back through the session queue.
pub struct WsTransport {
    url: String,
    events: Sender<SessionEvent>,
    last_link: u64,
    outbound: Option<Sender<String>>,
}

impl WsTransport {
    pub fn new(url: impl Into<String>, events: Sender<SessionEvent>) -> Self {
        WsTransport {
            url: url.into(),
            events,
            last_link: 0,
            outbound: None,
        }
    }
}

impl Transport for WsTransport {
    fn open(&mut self) -> Result<LinkId, TransportError> {
        self.close();
        self.last_link += 1;
        let link = LinkId(self.last_link);

        let (tx, rx) = mpsc::channel();
        let reporter = Reporter {
            link,
            events: self.events.clone(),
        };
        let url = self.url.clone();
        thread::Builder::new()
            .name(format!("ws-link-{}", link.0))
            .spawn(move || link_thread(url, rx, reporter))?;

        self.outbound = Some(tx);
        Ok(link)
    }

    fn send(&mut self, text: String) -> Result<(), TransportError> {
        match &self.outbound {
            Some(tx) => tx.send(text).map_err(|_| TransportError::Closed),
            None => Err(TransportError::Closed),
        }
    }

    fn close(&mut self) {
        self.outbound = None;
    }
}

struct Reporter {
    link: LinkId,
    events: Sender<SessionEvent>,
}

impl Reporter {
    fn report(&self, event: TransportEvent) {
        // the session may already be gone during shutdown
        let _ = self.events.send(SessionEvent::Link {
            link: self.link,
            event,
        });
    }
}

enum LinkEnd {
    /// The manager dropped the link.
    Released,
    PeerClosed,
}

fn link_thread(url: String, outbound: Receiver<String>, reporter: Reporter) {
    let mut socket = match connect(url.as_str()) {
        Ok((socket, _response)) => socket,
        Err(e) => {
            reporter.report(TransportEvent::Error(e.to_string()));
            return;
        }
    };

    if let MaybeTlsStream::Plain(stream) = socket.get_mut() {
        if let Err(e) = stream.set_read_timeout(Some(POLL_INTERVAL)) {
            reporter.report(TransportEvent::Error(e.to_string()));
            return;
        }
    }

    info!("WebSocket connected to {}", url);
    reporter.report(TransportEvent::Opened);

    match pump(&mut socket, &outbound, &reporter) {
        Ok(LinkEnd::Released) => {
            debug!("closing released link {:?}", reporter.link);
            let _ = socket.close(None);
            let _ = socket.flush();
        }
        Ok(LinkEnd::PeerClosed) => reporter.report(TransportEvent::Closed),
        Err(e) => {
            warn!("WebSocket error: {}", e);
            reporter.report(TransportEvent::Error(e.to_string()));
        }
    }
}

fn pump(
    socket: &mut WebSocket<MaybeTlsStream<TcpStream>>,
    outbound: &Receiver<String>,
    reporter: &Reporter,
) -> Result<LinkEnd, tungstenite::Error> {
    loop {
        loop {
            match outbound.try_recv() {
                Ok(text) => socket.send(Message::Text(text))?,
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => return Ok(LinkEnd::Released),
            }
        }

        match socket.read() {
            Ok(Message::Text(text)) => reporter.report(TransportEvent::Message(text)),
            Ok(_) => {}
            Err(tungstenite::Error::Io(e))
                if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {}
            Err(tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed) => {
                return Ok(LinkEnd::PeerClosed);
            }
            Err(e) => return Err(e),
        }
    }
}
