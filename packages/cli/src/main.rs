mod commands;
mod config;

use clap::{Parser, Subcommand};
use colored::Colorize;
use commands::{
    check, init, instances, merge, state, CheckArgs, InitArgs, InstancesArgs, MergeArgs, StateArgs,
};
use tracing_subscriber::EnvFilter;

/// Blockframe CLI - template merge and page checks for block-based pages
#[derive(Parser, Debug)]
#[command(name = "blockframe")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Log debug output (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Initialize a new Blockframe project
    Init(InitArgs),

    /// Merge a template into a page, or insert it if absent
    Merge(MergeArgs),

    /// Audit page documents for integrity problems
    Check(CheckArgs),

    /// List template instances on a page
    Instances(InstancesArgs),

    /// Print the state push a control panel would send for a page
    State(StateArgs),
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let cwd = std::env::current_dir()
        .expect("Cannot get current directory")
        .display()
        .to_string();

    let result = match cli.command {
        Command::Init(args) => init(args, &cwd),
        Command::Merge(args) => merge(args, &cwd),
        Command::Check(args) => check(args, &cwd),
        Command::Instances(args) => instances(args, &cwd),
        Command::State(args) => state(args, &cwd),
    };

    if let Err(err) = result {
        eprintln!();
        eprintln!("{} {:#}", "Error:".red().bold(), err);
        eprintln!();
        std::process::exit(1);
    }
}
