use super::load_templates;
use crate::config::Config;
use anyhow::Result;
use blockframe_editor::{audit_page, Diagnostic, DiagnosticLevel, PageDocument, TemplateStore};
use blockframe_model::SchemaRegistry;
use clap::Args;
use colored::Colorize;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Page document or directory of page documents
    pub input: PathBuf,

    /// Templates directory (defaults to templatesDir from config)
    #[arg(long)]
    pub templates_dir: Option<PathBuf>,

    /// Show all diagnostics including info level
    #[arg(short, long)]
    pub verbose: bool,

    /// Output format (text, json)
    #[arg(short, long, default_value = "text")]
    pub format: String,
}

#[derive(Default)]
struct Totals {
    diagnostics: usize,
    errors: usize,
    warnings: usize,
}

pub fn check(args: CheckArgs, cwd: &str) -> Result<()> {
    let config = Config::load(cwd)?;
    let templates = load_templates(&config.get_templates_dir(cwd, args.templates_dir.as_ref()))?;
    let schema = SchemaRegistry::with_builtins();

    println!("🔍 {} Blockframe page check", "Starting".green().bold());
    println!("   Input: {}", args.input.display());
    println!("   Templates: {}", templates.len());
    println!();

    let files = if args.input.is_file() {
        vec![args.input.clone()]
    } else if args.input.is_dir() {
        let files = find_page_files(&args.input);
        println!("   Found {} page files", files.len());
        println!();
        files
    } else {
        return Err(anyhow::anyhow!("Input path does not exist: {}", args.input.display()));
    };

    let mut totals = Totals::default();
    for file in &files {
        check_file(file, &schema, &templates, &args, &mut totals)?;
    }
    totals.print(files.len());

    if totals.errors > 0 {
        std::process::exit(1);
    }
    Ok(())
}

impl Totals {
    fn record(&mut self, diagnostics: &[Diagnostic]) {
        self.diagnostics += diagnostics.len();
        for diagnostic in diagnostics {
            match diagnostic.level {
                DiagnosticLevel::Error => self.errors += 1,
                DiagnosticLevel::Warning => self.warnings += 1,
                DiagnosticLevel::Info => {}
            }
        }
    }

    fn print(&self, files: usize) {
        let done = if self.errors > 0 {
            "Done".red().bold()
        } else {
            "Done".green().bold()
        };
        println!();
        println!("✨ {} Checked {} page file(s), {} diagnostic(s)", done, files, self.diagnostics);

        match (self.errors, self.warnings) {
            (0, 0) => println!("   {} No issues found!", "✓".green()),
            (errors, warnings) => println!(
                "   {} {}  {} {}",
                "Errors:".red(),
                errors,
                "Warnings:".yellow(),
                warnings
            ),
        }
    }
}

fn check_file(
    file_path: &Path,
    schema: &SchemaRegistry,
    templates: &TemplateStore,
    args: &CheckArgs,
    totals: &mut Totals,
) -> Result<()> {
    let source = fs::read_to_string(file_path)?;

    // raw document: a page with duplicate ids would be refused by Page::new
    let document: PageDocument = match serde_json::from_str(&source) {
        Ok(document) => document,
        Err(err) => {
            eprintln!("{} Failed to parse {}: {}", "✗".red(), file_path.display(), err);
            totals.errors += 1;
            return Ok(());
        }
    };

    let diagnostics = audit_page(&document.blocks, schema, Some(templates));
    if diagnostics.is_empty() {
        if args.verbose {
            println!("{} {}", "✓".green(), file_path.display());
        }
        return Ok(());
    }

    totals.record(&diagnostics);

    if args.format == "json" {
        println!("{}", serde_json::to_string_pretty(&diagnostics)?);
        return Ok(());
    }

    println!("{} ({})", file_path.display(), document.path.dimmed());
    for diagnostic in &diagnostics {
        if !args.verbose && matches!(diagnostic.level, DiagnosticLevel::Info) {
            continue;
        }

        let level = match diagnostic.level {
            DiagnosticLevel::Error => "error".red().bold(),
            DiagnosticLevel::Warning => "warning".yellow().bold(),
            DiagnosticLevel::Info => "info".blue().bold(),
        };
        println!(
            "  {} {} [{}] {}",
            level,
            diagnostic.block_id.to_string().bright_white(),
            diagnostic.rule,
            diagnostic.message
        );

        if let Some(suggestion) = &diagnostic.suggestion {
            println!("    {} {}", "💡".dimmed(), suggestion.dimmed());
        }
    }
    println!();

    Ok(())
}

fn find_page_files(dir: &Path) -> Vec<PathBuf> {
    WalkDir::new(dir)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .map(|entry| entry.into_path())
        .filter(|path| path.is_file() && path.extension().is_some_and(|ext| ext == "json"))
        .collect()
}
