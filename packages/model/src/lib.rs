//! # Blockframe Model
//!
//! Shared content model for the control panel and the preview.
//!
//! ```text
//! Page ─┬─ Block { id, type, fields, locked, templateSource, placeholder }
//!       │     └─ FieldValue ── scalar | link | media | RichText
//!       │                                              └─ RichNode (stable node ids)
//!       └─ Selection { blockId, field, path, offset, extentPath, extentOffset }
//! ```
//!
//! Block ids are page-local and never reused. Rich-text node ids are unique
//! within their field and survive re-renders that don't restructure the node.

pub mod block;
pub mod error;
pub mod field;
pub mod ids;
pub mod richtext;
pub mod schema;
pub mod selection;

pub use block::{Block, InsertPosition, PlaceholderRef, TemplateSource};
pub use error::{ModelError, ModelResult};
pub use field::{FieldRole, FieldValue, LinkTarget, MediaRef};
pub use ids::{get_page_seed, BlockId, IdGenerator, NodeId};
pub use richtext::{Mark, RichNode, RichText, ResolvedPoint, TextPoint};
pub use schema::{BlockSchema, BlockType, FieldKind, FieldSchema, SchemaRegistry};
pub use selection::Selection;
