pub mod check;
pub mod init;
pub mod instances;
pub mod merge;
pub mod state;

pub use check::{check, CheckArgs};
pub use init::{init, InitArgs};
pub use instances::{instances, InstancesArgs};
pub use merge::{merge, MergeArgs};
pub use state::{state, StateArgs};

use anyhow::{Context, Result};
use blockframe_editor::{Page, TemplateStore};
use std::fs;
use std::path::Path;
use tracing::debug;

/// Read a page document from disk
pub(crate) fn load_page(path: &Path) -> Result<Page> {
    let raw = fs::read_to_string(path).with_context(|| format!("Cannot read page {}", path.display()))?;
    let page = Page::from_json(&raw).with_context(|| format!("Invalid page {}", path.display()))?;
    debug!(path = %path.display(), blocks = page.len(), "Loaded page");
    Ok(page)
}

/// Load templates, treating a missing directory as an empty store
pub(crate) fn load_templates(dir: &Path) -> Result<TemplateStore> {
    if !dir.is_dir() {
        debug!(dir = %dir.display(), "No templates directory");
        return Ok(TemplateStore::new());
    }
    TemplateStore::load_dir(dir).with_context(|| format!("Cannot load templates from {}", dir.display()))
}
