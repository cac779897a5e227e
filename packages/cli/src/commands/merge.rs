use super::{load_page, load_templates};
use crate::config::Config;
use anyhow::{anyhow, Result};
use blockframe_editor::{insert_template, MergeConflict, MergeReport};
use clap::Args;
use colored::Colorize;
use std::fs;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct MergeArgs {
    /// Page document (JSON)
    #[arg(short, long)]
    pub page: PathBuf,

    /// Template name to merge or insert
    #[arg(short, long)]
    pub template: String,

    /// Templates directory (defaults to templatesDir from config)
    #[arg(long)]
    pub templates_dir: Option<PathBuf>,

    /// Write the merged page here instead of stdout
    #[arg(short, long)]
    pub out: Option<PathBuf>,
}

pub fn merge(args: MergeArgs, cwd: &str) -> Result<()> {
    let config = Config::load(cwd)?;
    let templates = load_templates(&config.get_templates_dir(cwd, args.templates_dir.as_ref()))?;
    let template = templates.get(&args.template).ok_or_else(|| {
        let known: Vec<&str> = templates.names().collect();
        anyhow!("Unknown template {} (available: {})", args.template, known.join(", "))
    })?;

    let mut page = load_page(&args.page)?;
    let end = page.len();
    let report = insert_template(&mut page, template, end)?;
    let output = page.to_json()?;

    match &args.out {
        Some(out) => {
            fs::write(out, output)?;
            print_report(&report);
            println!("   Output: {}", out.display());
        }
        None => {
            // page on stdout, summary on stderr
            println!("{}", output);
            eprint_report(&report);
        }
    }

    Ok(())
}

fn report_lines(report: &MergeReport) -> Vec<String> {
    let mut lines = vec![format!(
        "🧩 {} template {}",
        "Merged".green().bold(),
        report.template.bright_white()
    )];
    lines.push(format!("   Updated:   {}", report.updated.len()));
    lines.push(format!("   Inserted:  {}", report.inserted.len()));
    lines.push(format!("   Preserved: {}", report.preserved.len()));

    for conflict in &report.conflicts {
        let detail = match conflict {
            MergeConflict::UnknownSource { source, .. } => format!("claims missing {}", source),
            MergeConflict::UnknownPlaceholder { placeholder, .. } => {
                format!("sits in missing placeholder {}", placeholder.name)
            }
            MergeConflict::UnknownTemplate { template, .. } => format!("names unknown template {}", template),
        };
        lines.push(format!(
            "   {} {} {} (now ordinary content)",
            "orphan".yellow().bold(),
            conflict.block_id(),
            detail
        ));
    }
    lines
}

fn print_report(report: &MergeReport) {
    for line in report_lines(report) {
        println!("{}", line);
    }
}

fn eprint_report(report: &MergeReport) {
    for line in report_lines(report) {
        eprintln!("{}", line);
    }
}
