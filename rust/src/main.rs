//! Small operator CLI over the same boundary the Android app uses. Useful for
//! inspecting or seeding an encrypted store from a shell.

use std::io::{self, BufRead};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use nativeconfig::{global, load_config, BoundaryResult, StoreConfig, StoreError};
use tracing_subscriber::EnvFilter;
use zeroize::Zeroizing;

#[derive(Debug, Parser)]
#[command(name = "nativeconfig", version, about = "Inspect and update the native config store")]
struct Cli {
    /// JSON config file; defaults are used when omitted.
    #[arg(long, env = "NATIVECONFIG_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    GetBaseUrl,
    ClearBaseUrl,
    GetPreferenceName,
    /// Set the bearer token. Pass `-` to read it from stdin instead of argv.
    SetToken { value: String },
    GetToken,
    ClearToken,
    /// Print all three values the way the app screen shows them.
    Show,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("NATIVECONFIG_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => match load_config(path) {
            Ok(config) => config,
            Err(err) => {
                eprintln!("config load failed: {err}");
                return ExitCode::FAILURE;
            }
        },
        None => StoreConfig::default(),
    };
    if let Err(err) = global::init(&config) {
        eprintln!("store setup failed: {err}");
        return ExitCode::FAILURE;
    }

    match run(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{}: {err}", err.kind());
            // Partial success still exits non-zero so scripts notice.
            ExitCode::from(err.kind().code() as u8)
        }
    }
}

fn run(command: Command) -> BoundaryResult<()> {
    match command {
        Command::GetBaseUrl => println!("{}", global::get_base_url()?),
        Command::ClearBaseUrl => global::clear_base_url()?,
        Command::GetPreferenceName => println!("{}", global::get_preference_name()?),
        Command::SetToken { value } => {
            let value = Zeroizing::new(value);
            if value.as_str() == "-" {
                let token = read_stdin_line()?;
                global::set_token(token.as_bytes())?;
            } else {
                global::set_token(value.as_bytes())?;
            }
        }
        Command::GetToken => println!("{}", Zeroizing::new(global::get_token()?).as_str()),
        Command::ClearToken => global::clear_token()?,
        Command::Show => {
            let base_url = global::get_base_url()?;
            let preference_name = global::get_preference_name()?;
            let token = Zeroizing::new(global::get_token()?);
            println!("Base URL: {base_url}");
            println!("Preference Name: {preference_name}");
            println!("Bearer Token: {}", token.as_str());
        }
    }
    Ok(())
}

fn read_stdin_line() -> BoundaryResult<Zeroizing<String>> {
    let mut line = Zeroizing::new(String::new());
    io::stdin()
        .lock()
        .read_line(&mut line)
        .map_err(|e| StoreError::InvalidInput(format!("stdin unreadable: {e}")))?;
    let trimmed = line.trim_end_matches(&['\r', '\n'][..]).len();
    line.truncate(trimmed);
    Ok(line)
}
