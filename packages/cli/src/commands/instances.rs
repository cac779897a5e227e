use super::load_page;
use anyhow::Result;
use blockframe_editor::{breadcrumb, template_instances, Crumb};
use blockframe_model::BlockId;
use clap::Args;
use colored::Colorize;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct InstancesArgs {
    /// Page document (JSON)
    pub page: PathBuf,

    /// Print the breadcrumb for this block instead
    #[arg(short, long)]
    pub block: Option<String>,
}

pub fn instances(args: InstancesArgs, _cwd: &str) -> Result<()> {
    let page = load_page(&args.page)?;

    if let Some(block) = &args.block {
        let id = BlockId::from(block.as_str());
        let crumbs = breadcrumb(&page, &id).ok_or_else(|| anyhow::anyhow!("Block {} is not on the page", id))?;
        let labels: Vec<String> = crumbs.iter().map(crumb_label).collect();
        println!("{}", labels.join(" › "));
        return Ok(());
    }

    let found = template_instances(page.blocks());
    println!("📄 {} {}", "Page".bright_blue().bold(), page.path());

    if found.is_empty() {
        println!("   No template instances");
        return Ok(());
    }

    for instance in &found {
        let end = instance.start + instance.len() - 1;
        println!(
            "   {} {} (blocks {}..={})",
            "▸".green(),
            instance.template.bright_white().bold(),
            instance.start,
            end
        );

        for block in &page.blocks()[instance.start..=end] {
            let role = match (&block.template_source, &block.placeholder) {
                (Some(source), _) => format!("fixed {}", source).dimmed(),
                (None, Some(placeholder)) => format!("in {}", placeholder.name).cyan(),
                (None, None) => "unmarked".normal(),
            };
            let lock = if block.locked { "🔒" } else { "  " };
            println!("     {} {} {} {}", lock, block.id, block.block_type, role);
        }
    }

    Ok(())
}

fn crumb_label(crumb: &Crumb) -> String {
    match crumb {
        Crumb::Page { path } => format!("page {}", path),
        Crumb::Instance { template, .. } => format!("template {}", template),
        Crumb::Block { block_id } => format!("block {}", block_id),
    }
}
