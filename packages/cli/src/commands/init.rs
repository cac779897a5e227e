use crate::config::{Config, DEFAULT_CONFIG_NAME};
use anyhow::Result;
use blockframe_editor::{Template, TemplateNode};
use blockframe_model::{Block, BlockType, FieldValue};
use clap::Args;
use colored::Colorize;
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Args)]
pub struct InitArgs {
    /// Templates directory
    #[arg(short, long, default_value = "templates")]
    pub templates_dir: String,

    /// Force overwrite existing config
    #[arg(short, long)]
    pub force: bool,
}

pub fn init(args: InitArgs, cwd: &str) -> Result<()> {
    let config_path = PathBuf::from(cwd).join(DEFAULT_CONFIG_NAME);

    if config_path.exists() && !args.force {
        println!(
            "{} {} already exists",
            "⚠️".yellow(),
            DEFAULT_CONFIG_NAME.bright_white()
        );
        println!("Use --force to overwrite");
        return Ok(());
    }

    println!("{}", "📝 Initializing Blockframe project...".bright_blue().bold());

    let templates_dir = PathBuf::from(cwd).join(&args.templates_dir);
    if !templates_dir.exists() {
        fs::create_dir_all(&templates_dir)?;
        println!("  {} Created {}/", "✓".green(), args.templates_dir);
    }

    let example_file = templates_dir.join("landing.json");
    if !example_file.exists() {
        fs::write(&example_file, serde_json::to_string_pretty(&example_template())?)?;
        println!("  {} Created landing.json", "✓".green());
    }

    let config = Config {
        templates_dir: args.templates_dir.clone(),
        ..Config::default()
    };
    fs::write(&config_path, serde_json::to_string_pretty(&config)?)?;
    println!("  {} Created {}", "✓".green(), DEFAULT_CONFIG_NAME);

    println!();
    println!("{}", "✨ Project initialized!".green().bold());
    println!();
    println!("Next steps:");
    println!("  1. Describe your templates in {}/", args.templates_dir.bright_white());
    println!("  2. Run {} to apply one to a page", "blockframe merge --page page.json --template Landing".bright_cyan());

    Ok(())
}

/// Header and footer around one placeholder with example content
fn example_template() -> Template {
    Template::new(
        "Landing",
        vec![
            TemplateNode::Block {
                block: Block::new("header", BlockType::Title).with_field("title", FieldValue::text("Site header")),
                children: Vec::new(),
            },
            TemplateNode::Placeholder {
                name: "main".to_string(),
                defaults: vec![Block::new("example", BlockType::Text)
                    .with_field("text", FieldValue::text("Write your content here"))],
            },
            TemplateNode::Block {
                block: Block::new("footer", BlockType::Text).with_field("text", FieldValue::text("Site footer")),
                children: Vec::new(),
            },
        ],
    )
}
