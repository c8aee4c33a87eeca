use crate::model::{PlayerConfig, PLACEHOLDER_KEY, PLACEHOLDER_KEY_ID, PLACEHOLDER_LICENSE_URL, PLACEHOLDER_TITLE, PLACEHOLDER_URL};
use crate::player::{DrmOptions, PlayerBackend, PlayerError, PlayerEvent, PlayerSession, SessionContext};
use crate::utils::{debug_if_enabled, sanitize_sensitive_info, stream_kind};
use async_trait::async_trait;
use log::{info, warn};
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use tokio::process::{Child, Command};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

fn expand_template(template: &str, replacements: &[(&str, &str)]) -> String {
    replacements.iter().fold(template.to_string(), |acc, (placeholder, value)| acc.replace(placeholder, value))
}

fn exit_error(command: &str, status: ExitStatus) -> PlayerError {
    PlayerError {
        message: Some(format!("{command} exited with {status}")),
        code: status.code(),
    }
}

/// Plays streams by launching an external program, one process per session.
pub struct CommandPlayerBackend {
    config: PlayerConfig,
}

impl CommandPlayerBackend {
    pub fn new(config: PlayerConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl PlayerBackend for CommandPlayerBackend {
    async fn create(&self, context: SessionContext) -> Result<Box<dyn PlayerSession>, PlayerError> {
        Ok(Box::new(CommandPlayerSession {
            config: self.config.clone(),
            context,
            drm_args: Vec::new(),
            running: None,
        }))
    }
}

struct RunningPlayer {
    stop: Option<oneshot::Sender<()>>,
    watcher: JoinHandle<()>,
}

pub struct CommandPlayerSession {
    config: PlayerConfig,
    context: SessionContext,
    drm_args: Vec<String>,
    running: Option<RunningPlayer>,
}

impl CommandPlayerSession {
    fn build_args(&self, stream_url: &str) -> Vec<String> {
        let replacements = [(PLACEHOLDER_URL, stream_url), (PLACEHOLDER_TITLE, self.context.title.as_str())];
        self.drm_args.iter().cloned()
            .chain(self.config.args.iter().map(|arg| expand_template(arg, &replacements)))
            .collect()
    }

    // Reports the exit of the process unless the session stops it first.
    fn watch(&self, mut child: Child, stop_rx: oneshot::Receiver<()>) -> JoinHandle<()> {
        let command = self.config.command.clone();
        let session_id = self.context.session_id;
        let events = self.context.events.clone();
        tokio::spawn(async move {
            tokio::select! {
                status = child.wait() => {
                    let event = match status {
                        Ok(status) if status.success() => PlayerEvent::Ended { session_id },
                        Ok(status) => PlayerEvent::Error { session_id, error: exit_error(&command, status) },
                        Err(err) => PlayerEvent::Error { session_id, error: PlayerError::new(format!("Failed to wait for {command}: {err}")) },
                    };
                    let _ = events.send(event);
                }
                _ = stop_rx => {
                    if let Err(err) = child.kill().await {
                        warn!("Failed to stop {command}: {err}");
                    }
                }
            }
        })
    }
}

#[async_trait]
impl PlayerSession for CommandPlayerSession {
    fn configure(&mut self, options: &DrmOptions) -> Result<(), PlayerError> {
        let mut drm_args = vec![];
        for license_url in options.servers.values() {
            if self.config.license_server_args.is_empty() {
                return Err(PlayerError::new(format!("{} is not configured for clearkey license servers", self.config.command)));
            }
            drm_args.extend(self.config.license_server_args.iter()
                .map(|arg| expand_template(arg, &[(PLACEHOLDER_LICENSE_URL, license_url.as_str())])));
        }
        for (key_id, key) in &options.clear_keys {
            if self.config.clearkey_args.is_empty() {
                return Err(PlayerError::new(format!("{} is not configured for clearkey keys", self.config.command)));
            }
            drm_args.extend(self.config.clearkey_args.iter()
                .map(|arg| expand_template(arg, &[(PLACEHOLDER_KEY_ID, key_id.as_str()), (PLACEHOLDER_KEY, key.as_str())])));
        }
        self.drm_args = drm_args;
        Ok(())
    }

    async fn load(&mut self, stream_url: &str) -> Result<(), PlayerError> {
        if self.running.is_some() {
            return Err(PlayerError::new("session already loaded a stream"));
        }
        let command = &self.config.command;
        debug_if_enabled!("Starting {} for {} stream {}", command, stream_kind(stream_url), sanitize_sensitive_info(stream_url));
        let mut child = Command::new(command)
            .args(self.build_args(stream_url))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|err| PlayerError::new(format!("Failed to start {command}: {err}")))?;

        // a player that dies right away did not load the stream
        let startup_check = Duration::from_millis(self.config.startup_check_ms);
        if let Ok(status) = tokio::time::timeout(startup_check, child.wait()).await {
            let status = status.map_err(|err| PlayerError::new(format!("Failed to wait for {command}: {err}")))?;
            if !status.success() {
                return Err(exit_error(command, status));
            }
            info!("{command} finished playback");
            let _ = self.context.events.send(PlayerEvent::Ended { session_id: self.context.session_id });
            return Ok(());
        }

        let (stop_tx, stop_rx) = oneshot::channel();
        let watcher = self.watch(child, stop_rx);
        self.running = Some(RunningPlayer { stop: Some(stop_tx), watcher });
        Ok(())
    }

    async fn destroy(&mut self) -> Result<(), PlayerError> {
        if let Some(mut running) = self.running.take() {
            if let Some(stop) = running.stop.take() {
                let _ = stop.send(());
            }
            running.watcher.await
                .map_err(|err| PlayerError::new(format!("Failed to stop {}: {err}", self.config.command)))?;
        }
        Ok(())
    }
}
