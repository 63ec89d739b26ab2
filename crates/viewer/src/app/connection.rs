use std::io;
use std::net::TcpStream;
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::thread;
use std::time::Duration;

use engine::{ConnectionError, LinkEvent, ServerLink};
use tracing::{debug, info, warn};
use tungstenite::stream::MaybeTlsStream;
use tungstenite::{Message, WebSocket};

const READ_POLL_INTERVAL: Duration = Duration::from_millis(25);

type Socket = WebSocket<MaybeTlsStream<TcpStream>>;

/// WebSocket transport running on its own thread. The event loop talks to it
/// only through channels, so a slow handshake or a stalled read never blocks
/// a frame.
pub(crate) struct WebSocketLink {
    outbound: Sender<String>,
    events: Receiver<LinkEvent>,
}

impl WebSocketLink {
    pub(crate) fn connect(url: &str) -> io::Result<Self> {
        let (outbound_tx, outbound_rx) = mpsc::channel();
        let (events_tx, events_rx) = mpsc::channel();
        let url = url.to_string();
        thread::Builder::new()
            .name("ws-link".to_string())
            .spawn(move || run_connection(&url, &outbound_rx, &events_tx))?;
        Ok(Self {
            outbound: outbound_tx,
            events: events_rx,
        })
    }
}

impl ServerLink for WebSocketLink {
    fn send_text(&mut self, text: String) -> Result<(), ConnectionError> {
        self.outbound
            .send(text)
            .map_err(|_| ConnectionError::Disconnected)
    }

    fn drain_events(&mut self, out: &mut Vec<LinkEvent>) {
        out.extend(self.events.try_iter());
    }
}

fn run_connection(url: &str, outbound: &Receiver<String>, events: &Sender<LinkEvent>) {
    info!(url, "connection_starting");
    let mut socket = match tungstenite::connect(url) {
        Ok((socket, response)) => {
            debug!(status = %response.status(), "connection_handshake_complete");
            socket
        }
        Err(error) => {
            let _ = events.send(LinkEvent::Failed(error.to_string()));
            return;
        }
    };
    if let Err(error) = set_read_timeout(&socket, READ_POLL_INTERVAL) {
        let _ = events.send(LinkEvent::Failed(format!("failed to set read timeout: {error}")));
        return;
    }
    if events.send(LinkEvent::Opened).is_err() {
        return;
    }

    let outcome = pump_socket(&mut socket, outbound, events);
    let event = match outcome {
        PumpOutcome::ViewerGone => {
            let _ = socket.close(None);
            let _ = socket.flush();
            debug!("connection_released");
            return;
        }
        PumpOutcome::Closed => LinkEvent::Closed,
        PumpOutcome::Failed(reason) => {
            warn!(reason = %reason, "connection_worker_failed");
            LinkEvent::Failed(reason)
        }
    };
    let _ = events.send(event);
}

enum PumpOutcome {
    ViewerGone,
    Closed,
    Failed(String),
}

fn pump_socket(
    socket: &mut Socket,
    outbound: &Receiver<String>,
    events: &Sender<LinkEvent>,
) -> PumpOutcome {
    loop {
        loop {
            match outbound.try_recv() {
                Ok(text) => {
                    if let Err(error) = socket.send(Message::Text(text)) {
                        return classify(error);
                    }
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => return PumpOutcome::ViewerGone,
            }
        }

        match socket.read() {
            Ok(Message::Text(text)) => {
                if events.send(LinkEvent::Text(text)).is_err() {
                    return PumpOutcome::ViewerGone;
                }
            }
            Ok(Message::Binary(bytes)) => {
                debug!(len = bytes.len(), "binary_frame_ignored");
            }
            Ok(Message::Close(frame)) => {
                debug!(?frame, "close_frame_received");
                return PumpOutcome::Closed;
            }
            Ok(Message::Ping(_) | Message::Pong(_) | Message::Frame(_)) => {}
            Err(tungstenite::Error::Io(error)) if is_timeout(&error) => {
                if let Err(error) = socket.flush() {
                    if !matches!(&error, tungstenite::Error::Io(io_error) if is_timeout(io_error)) {
                        return classify(error);
                    }
                }
            }
            Err(error) => return classify(error),
        }
    }
}

fn classify(error: tungstenite::Error) -> PumpOutcome {
    match error {
        tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed => {
            PumpOutcome::Closed
        }
        other => PumpOutcome::Failed(other.to_string()),
    }
}

fn is_timeout(error: &io::Error) -> bool {
    matches!(
        error.kind(),
        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
    )
}

fn set_read_timeout(socket: &Socket, timeout: Duration) -> io::Result<()> {
    match socket.get_ref() {
        MaybeTlsStream::Plain(stream) => stream.set_read_timeout(Some(timeout)),
        MaybeTlsStream::Rustls(stream) => stream.get_ref().set_read_timeout(Some(timeout)),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeouts_are_recognised() {
        assert!(is_timeout(&io::Error::from(io::ErrorKind::WouldBlock)));
        assert!(is_timeout(&io::Error::from(io::ErrorKind::TimedOut)));
        assert!(!is_timeout(&io::Error::from(io::ErrorKind::ConnectionReset)));
    }

    #[test]
    fn clean_close_errors_are_not_failures() {
        assert!(matches!(
            classify(tungstenite::Error::ConnectionClosed),
            PumpOutcome::Closed
        ));
        assert!(matches!(
            classify(tungstenite::Error::Io(io::Error::from(
                io::ErrorKind::ConnectionReset
            ))),
            PumpOutcome::Failed(_)
        ));
    }

    #[test]
    fn invalid_url_reports_failure_and_closes_outbound() {
        let mut link = WebSocketLink::connect("not a url").expect("spawn worker");
        let mut events = Vec::new();
        for _ in 0..200 {
            link.drain_events(&mut events);
            if !events.is_empty() {
                break;
            }
            thread::sleep(Duration::from_millis(10));
        }
        assert!(matches!(events.as_slice(), [LinkEvent::Failed(_)]));
        thread::sleep(Duration::from_millis(20));
        assert!(matches!(
            link.send_text("{}".to_string()),
            Err(ConnectionError::Disconnected)
        ));
    }
}
