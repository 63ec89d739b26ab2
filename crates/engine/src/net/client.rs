use thiserror::Error;
use tracing::{debug, info, warn};

use crate::app::InputIntent;

use super::protocol::{ClientMessage, ProtocolError, ServerMessage};

/// What the transport reports back to the viewer thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkEvent {
    Opened,
    Text(String),
    Closed,
    Failed(String),
}

#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("connection is not open")]
    NotOpen,
    #[error("connection worker has shut down")]
    Disconnected,
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

/// Transport seam. Implementations own their socket and must never block the caller.
pub trait ServerLink {
    fn send_text(&mut self, text: String) -> Result<(), ConnectionError>;
    fn drain_events(&mut self, out: &mut Vec<LinkEvent>);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    Connecting,
    Open,
    Closed,
}

pub struct NetworkClient {
    link: Box<dyn ServerLink>,
    username: String,
    state: LinkState,
    events: Vec<LinkEvent>,
}

impl NetworkClient {
    pub fn new(link: Box<dyn ServerLink>, username: impl Into<String>) -> Self {
        Self {
            link,
            username: username.into(),
            state: LinkState::Connecting,
            events: Vec::new(),
        }
    }

    pub fn state(&self) -> LinkState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        self.state == LinkState::Open
    }

    /// Pulls every queued link event. Sends `join_game` as soon as the link opens
    /// and pushes decoded server messages into `out`.
    pub fn poll(&mut self, out: &mut Vec<ServerMessage>) {
        let mut events = std::mem::take(&mut self.events);
        self.link.drain_events(&mut events);
        for event in events.drain(..) {
            match event {
                LinkEvent::Opened => {
                    self.state = LinkState::Open;
                    info!(username = %self.username, "connection_opened");
                    let join = ClientMessage::JoinGame {
                        username: self.username.clone(),
                    };
                    if let Err(error) = self.send(&join) {
                        warn!(error = %error, "join_request_failed");
                    }
                }
                LinkEvent::Text(text) => match ServerMessage::parse(&text) {
                    Ok(message) => out.push(message),
                    Err(error) => {
                        warn!(error = %error, frame_len = text.len(), "server_frame_dropped");
                    }
                },
                LinkEvent::Closed => {
                    if self.state != LinkState::Closed {
                        info!("connection_closed");
                    }
                    self.state = LinkState::Closed;
                }
                LinkEvent::Failed(reason) => {
                    warn!(reason = %reason, "connection_failed");
                    self.state = LinkState::Closed;
                }
            }
        }
        self.events = events;
    }

    /// Forwards a movement intent. Jumps stay local. Returns the message that
    /// went out, if any.
    pub fn send_intent(&mut self, intent: InputIntent) -> Option<ClientMessage> {
        let message = match intent {
            InputIntent::Move(direction) => ClientMessage::Move { direction },
            InputIntent::Stop => ClientMessage::Stop,
            InputIntent::Jump => return None,
        };
        if !self.is_open() {
            debug!(?message, "intent_dropped_link_not_open");
            return None;
        }
        match self.send(&message) {
            Ok(()) => Some(message),
            Err(error) => {
                warn!(error = %error, "intent_send_failed");
                None
            }
        }
    }

    fn send(&mut self, message: &ClientMessage) -> Result<(), ConnectionError> {
        if !self.is_open() {
            return Err(ConnectionError::NotOpen);
        }
        let text = message.encode()?;
        self.link.send_text(text)
    }
}
