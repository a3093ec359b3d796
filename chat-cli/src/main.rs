//! # pollchat
//!
//! Command-line client for the pollchat messaging service.
//!
//! ## Commands
//!
//! - `register`: Create an account and log in
//! - `login`: Log in to an existing account
//! - `logout`: Forget the stored session
//! - `status`: Show server and session
//! - `send`: Post a message
//! - `history`: Print the conversation once
//! - `watch`: Follow the conversation until Ctrl-C
//!
//! ## Example
//!
//! ```bash
//! # Point at a server (defaults to http://localhost:8080)
//! export POLLCHAT_SERVER_URL=http://chat.local:8080
//!
//! # Create an account (password is prompted)
//! pollchat register alice
//!
//! # Talk
//! pollchat send "Hello, everyone!"
//! pollchat watch
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::debug;
use tracing_subscriber::EnvFilter;

mod commands;
mod config;

use commands::{auth, history, send, status, watch};
use config::AppContext;

/// Command-line client for the pollchat messaging service.
#[derive(Parser, Debug)]
#[command(name = "pollchat")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Data directory for the stored session
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Client configuration file (TOML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log debug output to stderr
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create an account and log in
    Register {
        /// Account name
        username: String,

        /// Password (will prompt if not provided)
        #[arg(long, short)]
        password: Option<String>,

        /// Profile picture URL (server default if omitted)
        #[arg(long, default_value = "")]
        picture: String,
    },

    /// Log in to an existing account
    Login {
        /// Account name
        username: String,

        /// Password (will prompt if not provided)
        #[arg(long, short)]
        password: Option<String>,
    },

    /// Forget the stored session
    Logout,

    /// Show server and session
    Status,

    /// Post a message
    Send {
        /// Message text
        message: String,
    },

    /// Print the conversation once
    History,

    /// Follow the conversation until Ctrl-C
    Watch,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    // Determine data directory
    let data_dir = match cli.data_dir {
        Some(dir) => dir,
        None => default_data_dir()?,
    };

    debug!(data_dir = %data_dir.display(), "Using data directory");
    let ctx = AppContext::load(data_dir, cli.config.as_deref())?;

    match cli.command {
        Commands::Register {
            username,
            password,
            picture,
        } => {
            let password = read_password(password)?;
            auth::register(&ctx, &username, &password, &picture).await?;
        }
        Commands::Login { username, password } => {
            let password = read_password(password)?;
            auth::login(&ctx, &username, &password).await?;
        }
        Commands::Logout => {
            auth::logout(&ctx)?;
        }
        Commands::Status => {
            status::run(&ctx)?;
        }
        Commands::Send { message } => {
            send::run(&ctx, &message).await?;
        }
        Commands::History => {
            history::run(&ctx).await?;
        }
        Commands::Watch => {
            watch::run(&ctx).await?;
        }
    }

    Ok(())
}

/// Log to stderr so command output on stdout stays clean.
fn init_tracing(verbose: bool) {
    let fallback = if verbose { "pollchat=debug" } else { "pollchat=info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Use the given password or prompt for one without echo.
fn read_password(given: Option<String>) -> Result<String> {
    match given {
        Some(p) => Ok(p),
        None => rpassword::prompt_password("Password: ").context("Failed to read password"),
    }
}

/// Get the default data directory for pollchat.
fn default_data_dir() -> Result<PathBuf> {
    let dirs = directories::ProjectDirs::from("io", "pollchat", "pollchat")
        .context("Could not determine home directory")?;
    Ok(dirs.data_dir().to_path_buf())
}
