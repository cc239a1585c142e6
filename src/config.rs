//! Configuration and session file handling.
//!
//! The configuration file is stored at `$EXPENSES_HOME/config.json` and holds the base URL of
//! the expense API. The session file, `$EXPENSES_HOME/session.json`, holds the user id from the
//! most recent successful signup or login so that later invocations can act as that user.

use crate::{utils, Result};
use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use url::Url;

const APP_NAME: &str = "expenses";
const CONFIG_VERSION: u8 = 1;
const CONFIG_JSON: &str = "config.json";
const SESSION_JSON: &str = "session.json";

/// The `Config` object represents the configuration of the app. You instantiate it by providing
/// the path to `$EXPENSES_HOME` and from there it loads `$EXPENSES_HOME/config.json`.
#[derive(Debug, Clone)]
pub struct Config {
    root: PathBuf,
    config_path: PathBuf,
    session_path: PathBuf,
    config_file: ConfigFile,
    api_url: Url,
}

impl Config {
    /// Creates the data directory and an initial `config.json` pointing at `api_url`.
    pub async fn create(dir: impl Into<PathBuf>, api_url: &str) -> Result<Self> {
        let root = dir.into();
        utils::make_dir(&root)
            .await
            .context("Unable to create the expenses home directory")?;

        let api_url = parse_api_url(api_url)?;
        let config_path = root.join(CONFIG_JSON);
        let config_file = ConfigFile {
            app_name: APP_NAME.to_string(),
            config_version: CONFIG_VERSION,
            api_url: api_url.to_string(),
        };
        config_file.save(&config_path).await?;

        Ok(Self {
            session_path: root.join(SESSION_JSON),
            root,
            config_path,
            config_file,
            api_url,
        })
    }

    /// This will
    /// - validate that the home directory and the config file exist
    /// - load and validate the config file
    /// - return the loaded configuration object
    pub async fn load(home: impl Into<PathBuf>) -> Result<Self> {
        let root = home.into();
        let config_path = root.join(CONFIG_JSON);
        if !config_path.is_file() {
            bail!(
                "The config file is missing '{}', run 'expenses init' first",
                config_path.display()
            );
        }
        let config_file = ConfigFile::load(&config_path).await?;
        let api_url = parse_api_url(&config_file.api_url)?;
        Ok(Self {
            session_path: root.join(SESSION_JSON),
            root,
            config_path,
            config_file,
            api_url,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn session_path(&self) -> &Path {
        &self.session_path
    }

    /// The base URL of the expense API. Always ends with a slash so endpoint paths can be
    /// joined onto it.
    pub fn api_url(&self) -> &Url {
        &self.api_url
    }

    pub fn config_file(&self) -> &ConfigFile {
        &self.config_file
    }

    /// Loads the persisted session, or `None` when nobody has signed in.
    pub async fn load_session(&self) -> Result<Option<Session>> {
        if !self.session_path.is_file() {
            return Ok(None);
        }
        Ok(Some(utils::deserialize(&self.session_path).await?))
    }

    pub async fn save_session(&self, session: &Session) -> Result<()> {
        let data =
            serde_json::to_string_pretty(session).context("Unable to serialize session")?;
        utils::write(&self.session_path, data)
            .await
            .context("Unable to write session file")
    }

    pub async fn clear_session(&self) -> Result<()> {
        utils::remove_if_exists(&self.session_path).await
    }
}

/// The authenticated user persisted between CLI invocations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Session {
    user_id: String,
    #[serde(default)]
    token: Option<String>,
}

impl Session {
    pub fn new(user_id: impl Into<String>, token: Option<String>) -> Self {
        Self {
            user_id: user_id.into(),
            token,
        }
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }
}

/// The serialized form of `config.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ConfigFile {
    app_name: String,
    config_version: u8,
    api_url: String,
}

impl ConfigFile {
    async fn load(path: &Path) -> Result<Self> {
        let config: ConfigFile = utils::deserialize(path).await?;
        anyhow::ensure!(
            config.app_name == APP_NAME,
            "Invalid app_name in config file: expected '{}', got '{}'",
            APP_NAME,
            config.app_name
        );
        Ok(config)
    }

    async fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let data = serde_json::to_string_pretty(self).context("Unable to serialize config")?;
        utils::write(path.as_ref(), data)
            .await
            .context("Unable to write config file")
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }
}

/// Parses and normalizes the API base URL, appending a trailing slash when it is missing so
/// that `Url::join` treats the last path segment as a directory.
fn parse_api_url(url: &str) -> Result<Url> {
    let mut text = url.trim().to_string();
    if !text.ends_with('/') {
        text.push('/');
    }
    Url::parse(&text).with_context(|| format!("Invalid API URL '{url}'"))
}
