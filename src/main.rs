mod app;
mod settings;

use anyhow::{Context, Result};
use clap::Parser;
use courtside_core::client::HttpTransport;
use std::io::{BufRead, Write};
use std::path::PathBuf;

use crate::app::{App, Command};

/// Mirror volleyball match data onto broadcast graphics inputs.
///
/// Without a command, reads commands from stdin, one per line.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Settings file (defaults to the user config directory)
    #[arg(long, value_name = "FILE")]
    settings: Option<PathBuf>,

    /// Match state file to load at startup
    #[arg(long = "match", value_name = "FILE")]
    match_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

fn main() -> Result<()> {
    env_logger::init();

    let args = Args::parse();
    let settings_path = args.settings.unwrap_or_else(settings::get_settings_path);
    let mut app_settings = settings::load_settings_from(&settings_path);
    if args.match_file.is_some() {
        app_settings.match_file = args.match_file;
    }

    let base_url = courtside_core::migrate::load(&app_settings.mirror).base_url();
    log::info!("Mirroring to {}", base_url);

    let runtime = tokio::runtime::Runtime::new().context("starting async runtime")?;
    let mut app = App::new(app_settings, settings_path, HttpTransport::new(base_url));

    // One-shot mode
    if let Some(command) = args.command {
        let output = runtime.block_on(app.handle(command))?;
        if !output.is_empty() {
            println!("{}", output);
        }
        return Ok(());
    }

    let stdin = std::io::stdin();
    let mut stdout = std::io::stdout();
    loop {
        print!("> ");
        stdout.flush()?;
        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        if line.trim().is_empty() {
            continue;
        }
        let command = match Command::parse(&line) {
            Ok(command) => command,
            Err(e) => {
                eprintln!("{}", e);
                continue;
            }
        };
        if command == Command::Quit {
            break;
        }
        match runtime.block_on(app.handle(command)) {
            Ok(output) => println!("{}", output),
            Err(e) => {
                log::debug!("Command failed: {:?}", e);
                eprintln!("error: {:#}", e);
            }
        }
    }
    Ok(())
}
