//! # Blockframe Editor
//!
//! Control-panel side of the editor: owns the canonical page.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ preview: FIELD_UPDATE / STRUCTURAL_COMMAND  │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ editor: ControlPanel                        │
//! │  - StructuralEngine: add / remove / move    │
//! │  - Template merge on load and insertion     │
//! │  - Mutations with undo/redo                 │
//! │  - Rich-text formatting round trip          │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ preview: INITIAL_STATE / FORMAT_RESPONSE    │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Core Principles
//!
//! 1. **Page is source of truth**: the preview only renders and asks
//! 2. **Templates own fixed content**: locked blocks follow the template
//! 3. **Constraints up front**: disallowed edits are never offered
//!
//! ## Usage
//!
//! ```rust,ignore
//! use blockframe_editor::{ControlPanel, EditorConfig, Page, TemplateStore};
//!
//! let page = Page::from_json(&raw)?;
//! let templates = TemplateStore::load_dir(Path::new("templates"))?;
//! let (mut panel, reports) = ControlPanel::open(
//!     EditorConfig::default(),
//!     page,
//!     SchemaRegistry::with_builtins(),
//!     templates,
//!     transport,
//! );
//!
//! panel.push_state();
//! panel.handle_json(&incoming)?;
//! ```

mod audit;
mod config;
mod diagnostic;
mod errors;
mod format;
mod instances;
mod mutations;
mod page;
mod session;
mod structural;
mod template;
mod undo_stack;

pub use audit::audit_page;
pub use config::EditorConfig;
pub use diagnostic::{Diagnostic, DiagnosticLevel, Rule};
pub use errors::{EditorError, EditorResult, StructuralViolation};
pub use format::apply_format;
pub use instances::{breadcrumb, go_to_parent, instance_of, template_instances, Crumb, ParentLevel, TemplateInstance};
pub use mutations::{Mutation, MutationError};
pub use page::{Page, PageDocument};
pub use session::ControlPanel;
pub use structural::{InsertionPoint, StructuralEngine};
pub use template::{
    apply_templates, insert_template, instantiate_template, merge_template, MergeConflict, MergeReport, Template,
    TemplateNode, TemplateStore,
};
pub use undo_stack::{MutationBatch, UndoStack};
