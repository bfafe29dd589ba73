// Entrypoint for the `dbox` binary.
// - Keeps `main` small: parse arguments, set up logging, open a session
//   and hand the command to it.
// - Returns `anyhow::Result` so errors print with their context chain.

use clap::Parser;
use dbox_cli::commands::{Command, Session};
use dbox_cli::config;
use std::path::PathBuf;

/// Command line client for a Dropbox-style cloud file store
#[derive(Parser, Debug)]
#[command(name = "dbox", author, version, about)]
struct Cli {
    /// Configuration file path (defaults to ~/.dbox.conf)
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Log filter, e.g. `debug` or `dbox_cli=trace` (overrides RUST_LOG)
    #[arg(long, value_name = "LEVEL")]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

fn init_logging(level: Option<&str>) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"));
    if let Some(level) = level {
        builder.parse_filters(level);
    }
    builder.format_timestamp(None).init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_level.as_deref());

    let config_path = cli.config.unwrap_or_else(config::default_path);
    let mut session = Session::open(&config_path)?;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    session.run(cli.command, &mut out)
}
