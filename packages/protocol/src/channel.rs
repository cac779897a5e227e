//! # Sequenced message channel
//!
//! [`Outbox`] stamps outgoing messages with the sender's origin and the
//! next sequence number. [`Inbox`] validates origin, version and sequence
//! before anything reaches the application. [`Endpoint`] pairs the two with
//! a [`Transport`] and a list of receive handlers.

use crate::error::ProtocolError;
use crate::message::Message;
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use tracing::{debug, warn};

pub const PROTOCOL_VERSION: u32 = 1;

/// Message plus transport metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    pub version: u32,
    pub origin: String,
    pub sequence: u64,
    /// Milliseconds since the Unix epoch
    pub sent_at: i64,
    pub message: Message,
}

impl Envelope {
    pub fn to_json(&self) -> Result<String, ProtocolError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(raw: &str) -> Result<Self, ProtocolError> {
        Ok(serde_json::from_str(raw)?)
    }
}

/// Outgoing half: assigns a fresh sequence number per message
#[derive(Debug)]
pub struct Outbox {
    origin: String,
    next_sequence: u64,
}

impl Outbox {
    pub fn new(origin: impl Into<String>) -> Self {
        Self {
            origin: origin.into(),
            next_sequence: 1,
        }
    }

    pub fn seal(&mut self, message: Message) -> Envelope {
        let sequence = self.next_sequence;
        self.next_sequence += 1;

        Envelope {
            version: PROTOCOL_VERSION,
            origin: self.origin.clone(),
            sequence,
            sent_at: chrono::Utc::now().timestamp_millis(),
            message,
        }
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }
}

/// Incoming half: accepts only newer messages from the paired context
#[derive(Debug)]
pub struct Inbox {
    expected_origin: String,
    last_sequence: Option<u64>,
}

impl Inbox {
    pub fn new(expected_origin: impl Into<String>) -> Self {
        Self {
            expected_origin: expected_origin.into(),
            last_sequence: None,
        }
    }

    pub fn accept(&mut self, envelope: Envelope) -> Result<Message, ProtocolError> {
        if envelope.version != PROTOCOL_VERSION {
            return Err(ProtocolError::UnsupportedVersion(envelope.version));
        }

        if envelope.origin != self.expected_origin {
            return Err(ProtocolError::OriginMismatch {
                expected: self.expected_origin.clone(),
                actual: envelope.origin,
            });
        }

        if let Some(last) = self.last_sequence {
            if envelope.sequence <= last {
                return Err(ProtocolError::StaleSequence {
                    sequence: envelope.sequence,
                    last,
                });
            }
        }

        self.last_sequence = Some(envelope.sequence);
        Ok(envelope.message)
    }

    pub fn accept_json(&mut self, raw: &str) -> Result<Message, ProtocolError> {
        let envelope = Envelope::from_json(raw)?;
        self.accept(envelope)
    }

    pub fn last_sequence(&self) -> Option<u64> {
        self.last_sequence
    }
}

/// Delivery mechanism between the two browsing contexts
pub trait Transport {
    fn post(&mut self, envelope: &Envelope);
}

/// In-process transport backed by a shared queue.
///
/// Clones share the queue: one side posts, the other drains.
#[derive(Debug, Clone, Default)]
pub struct MemoryTransport {
    queue: Rc<RefCell<VecDeque<Envelope>>>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn drain(&self) -> Vec<Envelope> {
        self.queue.borrow_mut().drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.queue.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.borrow().is_empty()
    }
}

impl Transport for MemoryTransport {
    fn post(&mut self, envelope: &Envelope) {
        self.queue.borrow_mut().push_back(envelope.clone());
    }
}

type Handler = Box<dyn FnMut(&Message)>;

/// One side of the channel
pub struct Endpoint<T: Transport> {
    outbox: Outbox,
    inbox: Inbox,
    transport: T,
    handlers: Vec<Handler>,
}

impl<T: Transport> Endpoint<T> {
    pub fn new(origin: impl Into<String>, expected_origin: impl Into<String>, transport: T) -> Self {
        Self {
            outbox: Outbox::new(origin),
            inbox: Inbox::new(expected_origin),
            transport,
            handlers: Vec::new(),
        }
    }

    /// Send a message; returns the sequence number it was given
    pub fn send(&mut self, message: Message) -> u64 {
        let envelope = self.outbox.seal(message);
        debug!(
            kind = envelope.message.kind(),
            sequence = envelope.sequence,
            origin = %envelope.origin,
            "Sending message"
        );
        self.transport.post(&envelope);
        envelope.sequence
    }

    /// Register a handler invoked for every accepted message, in receipt order
    pub fn on_receive(&mut self, handler: impl FnMut(&Message) + 'static) {
        self.handlers.push(Box::new(handler));
    }

    /// Validate an incoming envelope and run the handlers.
    ///
    /// Rejected envelopes are logged and dropped; the caller gets `None`.
    pub fn receive(&mut self, envelope: Envelope) -> Option<Message> {
        let sequence = envelope.sequence;
        match self.inbox.accept(envelope) {
            Ok(message) => {
                debug!(kind = message.kind(), sequence, "Accepted message");
                for handler in &mut self.handlers {
                    handler(&message);
                }
                Some(message)
            }
            Err(error) => {
                warn!(%error, sequence, "Dropping message");
                None
            }
        }
    }

    pub fn receive_json(&mut self, raw: &str) -> Option<Message> {
        match Envelope::from_json(raw) {
            Ok(envelope) => self.receive(envelope),
            Err(error) => {
                warn!(%error, "Dropping malformed message");
                None
            }
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn last_received_sequence(&self) -> Option<u64> {
        self.inbox.last_sequence()
    }
}
