//! # Blockframe Protocol
//!
//! Versioned message channel between the control panel and the preview.
//!
//! ```text
//!  control panel                              preview
//!  ┌──────────┐   INITIAL_STATE / FORMAT_RESPONSE  ┌──────────┐
//!  │ Outbox ──┼───────────────────────────────────▶│ Inbox    │
//!  │ Inbox  ◀─┼────────────────────────────────────┼── Outbox │
//!  └──────────┘  FIELD_UPDATE / FORMAT_REQUEST /    └──────────┘
//!                STRUCTURAL_COMMAND / SELECTION_REPORT
//! ```
//!
//! Each direction numbers its messages. A receiver drops anything from an
//! unexpected origin and anything whose sequence is not greater than the
//! last one it accepted. There is no acknowledgement or retry layer.
//!
//! The DOM marker contract in [`markers`] is versioned with the messages.

pub mod channel;
pub mod error;
pub mod markers;
pub mod message;

pub use channel::{Endpoint, Envelope, Inbox, MemoryTransport, Outbox, Transport, PROTOCOL_VERSION};
pub use error::ProtocolError;
pub use message::{
    FieldUpdate, FormatRequest, FormatResponse, Message, SelectionReport, StatePayload, StructuralOp,
};
