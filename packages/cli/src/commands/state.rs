use super::{load_page, load_templates};
use crate::config::Config;
use anyhow::Result;
use blockframe_editor::ControlPanel;
use blockframe_model::SchemaRegistry;
use blockframe_protocol::MemoryTransport;
use clap::Args;
use colored::Colorize;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct StateArgs {
    /// Page document (JSON)
    pub page: PathBuf,

    /// Templates directory (defaults to templatesDir from config)
    #[arg(long)]
    pub templates_dir: Option<PathBuf>,
}

/// Print the INITIAL_STATE envelope the control panel would push for a page
pub fn state(args: StateArgs, cwd: &str) -> Result<()> {
    let config = Config::load(cwd)?;
    let templates = load_templates(&config.get_templates_dir(cwd, args.templates_dir.as_ref()))?;
    let page = load_page(&args.page)?;

    let transport = MemoryTransport::new();
    let (mut panel, reports) = ControlPanel::open(
        config.editor_config(),
        page,
        SchemaRegistry::with_builtins(),
        templates,
        transport.clone(),
    );
    panel.push_state();

    for report in reports.iter().filter(|r| !r.conflicts.is_empty()) {
        eprintln!(
            "{} {} orphaned block(s) from template {}",
            "warning".yellow().bold(),
            report.conflicts.len(),
            report.template
        );
    }

    for envelope in transport.drain() {
        println!("{}", envelope.to_json()?);
    }

    Ok(())
}
