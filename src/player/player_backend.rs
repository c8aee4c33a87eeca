use crate::model::DrmConfig;
use async_trait::async_trait;
use indexmap::IndexMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use tokio::sync::mpsc;

pub const CLEARKEY_KEY_SYSTEM: &str = "org.w3.clearkey";

/// Failure reported by a playback engine, either from `load` or as an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerError {
    pub message: Option<String>,
    pub code: Option<i32>,
}

impl PlayerError {
    pub fn new<S: Into<String>>(message: S) -> Self {
        Self { message: Some(message.into()), code: None }
    }

    /// The message if there is one, the code otherwise.
    pub fn describe(&self) -> String {
        match (self.message.as_deref().filter(|m| !m.is_empty()), self.code) {
            (Some(message), _) => message.to_string(),
            (None, Some(code)) => code.to_string(),
            (None, None) => "unknown error".to_string(),
        }
    }
}

impl Display for PlayerError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.describe())
    }
}

impl Error for PlayerError {}

/// Engine side DRM configuration, keyed like the EME key systems.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DrmOptions {
    pub servers: IndexMap<String, String>,
    pub clear_keys: IndexMap<String, String>,
}

impl From<&DrmConfig> for DrmOptions {
    fn from(drm: &DrmConfig) -> Self {
        let mut options = Self::default();
        match drm {
            DrmConfig::ClearkeyLicenseServer { license_key_url } => {
                options.servers.insert(CLEARKEY_KEY_SYSTEM.to_string(), license_key_url.clone());
            }
            DrmConfig::ClearkeyRawKeys { key_id, key } => {
                options.clear_keys.insert(key_id.clone(), key.clone());
            }
        }
        options
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayerEvent {
    Error { session_id: u64, error: PlayerError },
    Ended { session_id: u64 },
}

pub type PlayerEventSender = mpsc::UnboundedSender<PlayerEvent>;

/// What a session needs from its creator.
#[derive(Debug, Clone)]
pub struct SessionContext {
    pub session_id: u64,
    /// Shown by the engine, e.g. as window title.
    pub title: String,
    pub events: PlayerEventSender,
}

#[async_trait]
pub trait PlayerBackend: Send + Sync {
    async fn create(&self, context: SessionContext) -> Result<Box<dyn PlayerSession>, PlayerError>;
}

/// One engine instance bound to a single stream.
#[async_trait]
pub trait PlayerSession: Send {
    fn configure(&mut self, options: &DrmOptions) -> Result<(), PlayerError>;
    async fn load(&mut self, stream_url: &str) -> Result<(), PlayerError>;
    async fn destroy(&mut self) -> Result<(), PlayerError>;
}
