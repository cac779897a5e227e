//! # Blockframe Preview
//!
//! Preview-side half of the editor: runs inside the sandboxed document the
//! foreign front-end renders into.
//!
//! ```text
//! Envelope ──▶ PreviewSession ──▶ PreviewEffect (render, restore caret, warn)
//!                 │   ▲
//!   DomView ◀─────┘   └──── click / type / format / drag gestures
//! ```
//!
//! - [`binding`] maps block / field / node ids to marked-up elements
//! - [`selection`] keeps the caret as node-id paths across re-renders
//! - [`debounce`] coalesces keystrokes into field updates
//! - [`drop_target`] and [`geometry`] handle multi-element blocks

pub mod binding;
pub mod config;
pub mod debounce;
pub mod dom;
pub mod drop_target;
pub mod error;
pub mod geometry;
pub mod selection;
pub mod session;

pub use binding::{Affordances, BindingResolver, FieldBinding, FieldHit};
pub use config::PreviewConfig;
pub use debounce::{decide, ApplyDecision, EditDebouncer};
pub use dom::{DomPoint, DomView, ElementRef, VirtualDom};
pub use drop_target::{compute_drop_target, DropIndicator};
pub use error::{BindingError, PreviewError};
pub use geometry::{combined_rect, Rect, ResizeWatch};
pub use selection::{FieldAddress, Focus, FocusState, SelectionSync};
pub use session::{PreviewEffect, PreviewSession};
