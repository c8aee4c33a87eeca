use crate::error::{info_err_res, TuliplayError};
use crate::utils::{default_as_true, DEFAULT_DATA_DIR};
use serde::{Deserialize, Serialize};

pub const DEFAULT_AUTOLOAD_DELAY_MS: u64 = 500;
pub const DEFAULT_STARTUP_CHECK_MS: u64 = 1500;

// placeholders usable in the player argument templates
pub const PLACEHOLDER_URL: &str = "{url}";
pub const PLACEHOLDER_TITLE: &str = "{title}";
pub const PLACEHOLDER_KEY_ID: &str = "{key_id}";
pub const PLACEHOLDER_KEY: &str = "{key}";
pub const PLACEHOLDER_LICENSE_URL: &str = "{license_url}";

const fn default_autoload_delay_ms() -> u64 { DEFAULT_AUTOLOAD_DELAY_MS }
const fn default_startup_check_ms() -> u64 { DEFAULT_STARTUP_CHECK_MS }
fn default_data_dir() -> String { DEFAULT_DATA_DIR.to_string() }
fn default_player_command() -> String { "mpv".to_string() }
fn default_player_args() -> Vec<String> {
    vec![
        "--force-window=immediate".to_string(),
        format!("--title={PLACEHOLDER_TITLE}"),
        PLACEHOLDER_URL.to_string(),
    ]
}
fn default_clearkey_args() -> Vec<String> {
    vec![format!("--demuxer-lavf-o=cenc_decryption_key={PLACEHOLDER_KEY}")]
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct LogConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,
    #[serde(default = "default_as_true")]
    pub sanitize_sensitive_info: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self { log_level: None, sanitize_sensitive_info: true }
    }
}

/// Only the log section, read before the logger exists.
#[derive(Debug, Clone, Deserialize)]
pub struct LogLevelConfig {
    pub log: Option<LogConfig>,
}

/// Describes how the external player program is launched.
///
/// Every argument list is a template, see the `PLACEHOLDER_*` constants.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct PlayerConfig {
    #[serde(default = "default_player_command")]
    pub command: String,
    #[serde(default = "default_player_args")]
    pub args: Vec<String>,
    #[serde(default = "default_clearkey_args")]
    pub clearkey_args: Vec<String>,
    #[serde(default)]
    pub license_server_args: Vec<String>,
    #[serde(default = "default_startup_check_ms")]
    pub startup_check_ms: u64,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            command: default_player_command(),
            args: default_player_args(),
            clearkey_args: default_clearkey_args(),
            license_server_args: Vec::new(),
            startup_check_ms: DEFAULT_STARTUP_CHECK_MS,
        }
    }
}

impl PlayerConfig {
    pub fn prepare(&mut self) -> Result<(), TuliplayError> {
        self.command = self.command.trim().to_string();
        if self.command.is_empty() {
            return info_err_res!("player.command must not be empty");
        }
        if !self.args.iter().any(|arg| arg.contains(PLACEHOLDER_URL)) {
            return info_err_res!("player.args needs the {PLACEHOLDER_URL} placeholder");
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log: Option<LogConfig>,
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    #[serde(default = "default_autoload_delay_ms")]
    pub autoload_delay_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    #[serde(default)]
    pub accept_insecure_ssl_certificates: bool,
    #[serde(default)]
    pub player: PlayerConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log: None,
            data_dir: default_data_dir(),
            autoload_delay_ms: DEFAULT_AUTOLOAD_DELAY_MS,
            user_agent: None,
            accept_insecure_ssl_certificates: false,
            player: PlayerConfig::default(),
        }
    }
}

impl Config {
    pub fn prepare(&mut self) -> Result<(), TuliplayError> {
        self.data_dir = self.data_dir.trim().to_string();
        if self.data_dir.is_empty() {
            self.data_dir = default_data_dir();
        }
        self.user_agent = self.user_agent.take()
            .map(|ua| ua.trim().to_string())
            .filter(|ua| !ua.is_empty());
        self.player.prepare()
    }

    pub fn sanitize_sensitive_info(&self) -> bool {
        self.log.as_ref().is_none_or(|l| l.sanitize_sensitive_info)
    }
}
