//! Configuration and session wiring for the pollchat CLI.

use anyhow::{Context, Result};
use pollchat_client::{ChatSession, ClientConfig, FileBackend, HttpGateway, SessionStore};
use std::path::{Path, PathBuf};

/// Name of the optional config file inside the data directory.
const CONFIG_FILE: &str = "config.toml";

/// Everything a command needs: where the session lives and how to reach
/// the server.
#[derive(Debug)]
pub struct AppContext {
    /// Data directory holding `token.json` and `user.json`.
    pub data_dir: PathBuf,
    /// Resolved client configuration.
    pub config: ClientConfig,
    session: SessionStore,
}

impl AppContext {
    /// Resolve configuration and open the stored session.
    ///
    /// Config comes from `--config` if given, else `<data_dir>/config.toml`
    /// if present, else defaults. `POLLCHAT_SERVER_URL` overrides the
    /// server address in every case.
    pub fn load(data_dir: PathBuf, config_path: Option<&Path>) -> Result<Self> {
        let default_path = data_dir.join(CONFIG_FILE);
        let config = match config_path {
            Some(path) => ClientConfig::load(path)
                .with_context(|| format!("Failed to load config {}", path.display()))?,
            None if default_path.exists() => ClientConfig::load(&default_path)
                .with_context(|| format!("Failed to load config {}", default_path.display()))?,
            None => {
                let config = ClientConfig::from_env();
                config.validate().context("Invalid configuration")?;
                config
            }
        };

        let backend = FileBackend::open(&data_dir).context("Failed to open data directory")?;
        let session = SessionStore::open(backend);

        Ok(Self {
            data_dir,
            config,
            session,
        })
    }

    /// The stored session.
    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    /// Controller talking HTTP to the configured server.
    pub fn chat(&self) -> Result<ChatSession<HttpGateway>> {
        ChatSession::connect(&self.config, self.session.clone())
            .context("Failed to create HTTP client")
    }

    /// Controller for commands that need a logged-in user.
    pub fn logged_in_chat(&self) -> Result<ChatSession<HttpGateway>> {
        if !self.session.is_authenticated() {
            anyhow::bail!("Not logged in. Run 'pollchat login <username>' first.");
        }
        self.chat()
    }
}
