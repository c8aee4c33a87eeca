use crate::model::ChannelRecord;
use crate::player::{DrmOptions, PlayerBackend, PlayerError, PlayerEvent, PlayerEventSender, PlayerSession, SessionContext};
use crate::utils::{debug_if_enabled, sanitize_sensitive_info};
use log::{error, info, warn};
use std::fmt::{Display, Formatter};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackState {
    Idle,
    Loading,
    Playing,
    /// Carries the message of the single error indicator.
    Error(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaybackStatus {
    pub state: PlaybackState,
    pub channel: Option<String>,
}

impl PlaybackStatus {
    const fn idle() -> Self {
        Self { state: PlaybackState::Idle, channel: None }
    }
}

impl Display for PlaybackStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let channel = self.channel.as_deref().unwrap_or("-");
        match &self.state {
            PlaybackState::Idle => write!(f, "idle"),
            PlaybackState::Loading => write!(f, "loading {channel}"),
            PlaybackState::Playing => write!(f, "playing {channel}"),
            PlaybackState::Error(message) => write!(f, "{message}"),
        }
    }
}

pub fn format_playback_error(error: &PlayerError) -> String {
    format!("Error loading video: {}", error.describe())
}

async fn start_session(backend: &dyn PlayerBackend, context: SessionContext, record: &ChannelRecord) -> Result<Box<dyn PlayerSession>, PlayerError> {
    let session_id = context.session_id;
    let mut session = backend.create(context).await?;
    let mut result = Ok(());
    if let Some(drm) = record.drm.as_ref() {
        debug_if_enabled!("Session {} uses {}", session_id, drm);
        result = session.configure(&DrmOptions::from(drm));
    }
    if result.is_ok() {
        result = session.load(&record.url).await;
    }
    match result {
        Ok(()) => Ok(session),
        Err(err) => {
            // never keep a half initialized session
            if let Err(destroy_err) = session.destroy().await {
                warn!("Failed to release session {session_id}: {destroy_err}");
            }
            Err(err)
        }
    }
}

struct ActiveSession {
    id: u64,
    session: Box<dyn PlayerSession>,
}

/// Owns the one live player session.
///
/// A new selection always releases the previous session before the next one
/// is created, so at most one session exists at any time.
pub struct PlaybackController {
    backend: Arc<dyn PlayerBackend>,
    events: PlayerEventSender,
    session: Option<ActiveSession>,
    last_session_id: u64,
    status: watch::Sender<PlaybackStatus>,
}

impl PlaybackController {
    pub fn new(backend: Arc<dyn PlayerBackend>, events: PlayerEventSender) -> (Self, watch::Receiver<PlaybackStatus>) {
        let (status, status_rx) = watch::channel(PlaybackStatus::idle());
        (Self {
            backend,
            events,
            session: None,
            last_session_id: 0,
            status,
        }, status_rx)
    }

    pub fn status(&self) -> PlaybackStatus {
        self.status.borrow().clone()
    }

    pub fn active_session_id(&self) -> Option<u64> {
        self.session.as_ref().map(|s| s.id)
    }

    fn set_status(&self, state: PlaybackState, channel: Option<String>) {
        let status = PlaybackStatus { state, channel };
        debug_if_enabled!("Playback status: {}", status);
        self.status.send_replace(status);
    }

    fn set_error(&self, error: &PlayerError) {
        let channel = self.status.borrow().channel.clone();
        self.set_status(PlaybackState::Error(format_playback_error(error)), channel);
    }

    pub async fn select(&mut self, record: &ChannelRecord) {
        let channel = record.name.clone().unwrap_or_else(|| sanitize_sensitive_info(&record.url).to_string());
        // replaces a previous error indicator
        self.set_status(PlaybackState::Loading, Some(channel.clone()));
        self.release().await;

        self.last_session_id += 1;
        let context = SessionContext {
            session_id: self.last_session_id,
            title: channel.clone(),
            events: self.events.clone(),
        };
        match start_session(self.backend.as_ref(), context, record).await {
            Ok(session) => {
                self.session = Some(ActiveSession { id: self.last_session_id, session });
                info!("Playing {channel}");
                self.set_status(PlaybackState::Playing, Some(channel));
            }
            Err(err) => {
                error!("Failed to play {}: {}", sanitize_sensitive_info(&record.url), sanitize_sensitive_info(&err.describe()));
                self.set_error(&err);
            }
        }
    }

    /// Best effort teardown, failures are only logged.
    async fn release(&mut self) {
        if let Some(mut active) = self.session.take() {
            debug_if_enabled!("Releasing session {}", active.id);
            if let Err(err) = active.session.destroy().await {
                warn!("Failed to release session {}: {err}", active.id);
            }
        }
    }

    pub async fn stop(&mut self) {
        self.release().await;
        self.set_status(PlaybackState::Idle, None);
    }

    pub async fn handle_event(&mut self, event: PlayerEvent) {
        let current = self.active_session_id();
        match event {
            PlayerEvent::Error { session_id, error } if current == Some(session_id) => {
                error!("Playback error in session {session_id}: {}", sanitize_sensitive_info(&error.describe()));
                self.set_error(&error);
            }
            PlayerEvent::Ended { session_id } if current == Some(session_id) => {
                info!("Playback ended");
                self.stop().await;
            }
            PlayerEvent::Error { session_id, .. } | PlayerEvent::Ended { session_id } => {
                debug_if_enabled!("Ignoring event of released session {}", session_id);
            }
        }
    }
}

enum PlaybackCommand {
    Select(Arc<ChannelRecord>),
    Stop,
    Shutdown(oneshot::Sender<()>),
}

async fn run_controller(
    mut controller: PlaybackController,
    mut commands: mpsc::UnboundedReceiver<PlaybackCommand>,
    mut events: mpsc::UnboundedReceiver<PlayerEvent>,
) {
    loop {
        tokio::select! {
            command = commands.recv() => {
                match command {
                    Some(PlaybackCommand::Select(record)) => controller.select(&record).await,
                    Some(PlaybackCommand::Stop) => controller.stop().await,
                    Some(PlaybackCommand::Shutdown(done)) => {
                        controller.stop().await;
                        let _ = done.send(());
                        break;
                    }
                    None => {
                        controller.stop().await;
                        break;
                    }
                }
            }
            Some(event) = events.recv() => controller.handle_event(event).await,
        }
    }
    debug_if_enabled!("Playback controller stopped");
}

/// Entry point for the rest of the application. Commands are queued and
/// handled one after another by the controller task.
pub struct PlaybackHandle {
    commands: mpsc::UnboundedSender<PlaybackCommand>,
    status: watch::Receiver<PlaybackStatus>,
    task: JoinHandle<()>,
}

impl PlaybackHandle {
    pub fn spawn(backend: Arc<dyn PlayerBackend>) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let (controller, status) = PlaybackController::new(backend, events_tx);
        let task = tokio::spawn(run_controller(controller, commands_rx, events_rx));
        Self { commands: commands_tx, status, task }
    }

    fn send(&self, command: PlaybackCommand) {
        if self.commands.send(command).is_err() {
            error!("Playback controller is not running");
        }
    }

    pub fn select(&self, record: Arc<ChannelRecord>) {
        self.send(PlaybackCommand::Select(record));
    }

    pub fn stop(&self) {
        self.send(PlaybackCommand::Stop);
    }

    pub fn status(&self) -> PlaybackStatus {
        self.status.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<PlaybackStatus> {
        self.status.clone()
    }

    /// Releases the active session and waits for the controller task to end.
    pub async fn shutdown(self) {
        let (done_tx, done_rx) = oneshot::channel();
        self.send(PlaybackCommand::Shutdown(done_tx));
        let _ = done_rx.await;
        if let Err(err) = self.task.await {
            error!("Playback controller failed: {err}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::DrmConfig;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::time::Duration;

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Call {
        Create(u64),
        Configure(u64, DrmOptions),
        Load(u64, String),
        Destroy(u64),
    }

    #[derive(Default)]
    struct MockState {
        calls: Vec<Call>,
        live: Vec<(u64, String)>,
        max_live: usize,
    }

    #[derive(Clone, Default)]
    struct MockBackend {
        state: Arc<Mutex<MockState>>,
        load_delay: Duration,
    }

    struct MockSession {
        id: u64,
        state: Arc<Mutex<MockState>>,
        load_delay: Duration,
    }

    impl MockBackend {
        fn calls(&self) -> Vec<Call> {
            self.state.lock().unwrap().calls.clone()
        }

        fn live(&self) -> Vec<(u64, String)> {
            self.state.lock().unwrap().live.clone()
        }

        fn max_live(&self) -> usize {
            self.state.lock().unwrap().max_live
        }
    }

    #[async_trait]
    impl PlayerBackend for MockBackend {
        async fn create(&self, context: SessionContext) -> Result<Box<dyn PlayerSession>, PlayerError> {
            self.state.lock().unwrap().calls.push(Call::Create(context.session_id));
            Ok(Box::new(MockSession { id: context.session_id, state: Arc::clone(&self.state), load_delay: self.load_delay }))
        }
    }

    #[async_trait]
    impl PlayerSession for MockSession {
        fn configure(&mut self, options: &DrmOptions) -> Result<(), PlayerError> {
            self.state.lock().unwrap().calls.push(Call::Configure(self.id, options.clone()));
            Ok(())
        }

        async fn load(&mut self, stream_url: &str) -> Result<(), PlayerError> {
            self.state.lock().unwrap().calls.push(Call::Load(self.id, stream_url.to_string()));
            tokio::time::sleep(self.load_delay).await;
            if stream_url.contains("broken") {
                return Err(PlayerError::new("manifest not found"));
            }
            let mut state = self.state.lock().unwrap();
            state.live.push((self.id, stream_url.to_string()));
            state.max_live = state.max_live.max(state.live.len());
            Ok(())
        }

        async fn destroy(&mut self) -> Result<(), PlayerError> {
            let mut state = self.state.lock().unwrap();
            state.calls.push(Call::Destroy(self.id));
            state.live.retain(|(id, _)| *id != self.id);
            if self.id == 99 {
                return Err(PlayerError { message: None, code: Some(1) });
            }
            Ok(())
        }
    }

    fn record(name: &str, url: &str) -> ChannelRecord {
        ChannelRecord { name: Some(name.to_string()), ..ChannelRecord::new(url) }
    }

    fn controller(backend: &MockBackend) -> (PlaybackController, mpsc::UnboundedReceiver<PlayerEvent>) {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (controller, _) = PlaybackController::new(Arc::new(backend.clone()), events_tx);
        (controller, events_rx)
    }

    #[test]
    fn test_controller_task_is_send() {
        fn assert_send<T: Send>(_: &T) {}
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (_commands_tx, commands_rx) = mpsc::unbounded_channel();
        let (controller, _status) = PlaybackController::new(Arc::new(MockBackend::default()), events_tx);
        assert_send(&run_controller(controller, commands_rx, events_rx));
    }

    #[test]
    fn test_status_display() {
        assert_eq!(PlaybackStatus::idle().to_string(), "idle");
        let status = PlaybackStatus { state: PlaybackState::Playing, channel: Some("Arte".to_string()) };
        assert_eq!(status.to_string(), "playing Arte");
        let status = PlaybackStatus { state: PlaybackState::Error("Error loading video: 404".to_string()), channel: None };
        assert_eq!(status.to_string(), "Error loading video: 404");
    }

    #[tokio::test]
    async fn test_select_releases_previous_session() {
        let backend = MockBackend::default();
        let (mut controller, _events) = controller(&backend);
        controller.select(&record("A", "http://a/1.m3u8")).await;
        controller.select(&record("B", "http://a/2.m3u8")).await;

        assert_eq!(backend.calls(), vec![
            Call::Create(1),
            Call::Load(1, "http://a/1.m3u8".to_string()),
            Call::Destroy(1),
            Call::Create(2),
            Call::Load(2, "http://a/2.m3u8".to_string()),
        ]);
        assert_eq!(backend.live(), vec![(2, "http://a/2.m3u8".to_string())]);
        assert_eq!(backend.max_live(), 1);
        assert_eq!(controller.status(), PlaybackStatus { state: PlaybackState::Playing, channel: Some("B".to_string()) });
    }

    #[tokio::test]
    async fn test_drm_applied_before_load() {
        let backend = MockBackend::default();
        let (mut controller, _events) = controller(&backend);
        let mut channel = record("Protected", "http://a/p.mpd");
        channel.drm = Some(DrmConfig::ClearkeyRawKeys { key_id: "k1".to_string(), key: "v1".to_string() });
        controller.select(&channel).await;

        let calls = backend.calls();
        let expected_options = DrmOptions::from(channel.drm.as_ref().unwrap());
        assert_eq!(calls[1], Call::Configure(1, expected_options));
        assert_eq!(calls[2], Call::Load(1, "http://a/p.mpd".to_string()));
    }

    #[tokio::test]
    async fn test_load_failure_then_success_clears_error() {
        let backend = MockBackend::default();
        let (mut controller, _events) = controller(&backend);
        controller.select(&record("Broken", "http://a/broken.m3u8")).await;
        assert_eq!(controller.status().state, PlaybackState::Error("Error loading video: manifest not found".to_string()));
        // the failed session is not kept
        assert_eq!(controller.active_session_id(), None);
        assert!(backend.calls().contains(&Call::Destroy(1)));

        controller.select(&record("Fine", "http://a/fine.m3u8")).await;
        assert_eq!(controller.status().state, PlaybackState::Playing);
        assert_eq!(controller.active_session_id(), Some(2));
    }

    #[tokio::test]
    async fn test_error_events() {
        let backend = MockBackend::default();
        let (mut controller, _events) = controller(&backend);
        controller.select(&record("A", "http://a/1.m3u8")).await;
        controller.select(&record("B", "http://a/2.m3u8")).await;

        // stale session
        controller.handle_event(PlayerEvent::Error { session_id: 1, error: PlayerError { message: None, code: Some(3016) } }).await;
        assert_eq!(controller.status().state, PlaybackState::Playing);

        controller.handle_event(PlayerEvent::Error { session_id: 2, error: PlayerError { message: None, code: Some(3016) } }).await;
        controller.handle_event(PlayerEvent::Error { session_id: 2, error: PlayerError::new("decode error") }).await;
        assert_eq!(controller.status().state, PlaybackState::Error("Error loading video: decode error".to_string()));

        controller.handle_event(PlayerEvent::Ended { session_id: 2 }).await;
        assert_eq!(controller.status(), PlaybackStatus::idle());
        assert!(backend.live().is_empty());
    }

    #[tokio::test]
    async fn test_teardown_failure_does_not_block() {
        let backend = MockBackend::default();
        let (mut controller, _events) = controller(&backend);
        controller.last_session_id = 98;
        controller.select(&record("A", "http://a/1.m3u8")).await;
        assert_eq!(controller.active_session_id(), Some(99));
        controller.select(&record("B", "http://a/2.m3u8")).await;
        assert_eq!(controller.active_session_id(), Some(100));
        assert_eq!(controller.status().state, PlaybackState::Playing);
    }

    #[tokio::test]
    async fn test_handle_rapid_selection_single_session() {
        let backend = MockBackend { load_delay: Duration::from_millis(20), ..MockBackend::default() };
        let handle = PlaybackHandle::spawn(Arc::new(backend.clone()));
        let mut status = handle.subscribe();
        handle.select(Arc::new(record("A", "http://a/1.m3u8")));
        handle.select(Arc::new(record("B", "http://a/2.m3u8")));

        tokio::time::timeout(Duration::from_secs(5), status.wait_for(|s| {
            s.state == PlaybackState::Playing && s.channel.as_deref() == Some("B")
        })).await.unwrap().unwrap();

        assert_eq!(backend.live(), vec![(2, "http://a/2.m3u8".to_string())]);
        assert_eq!(backend.max_live(), 1);

        handle.shutdown().await;
        assert!(backend.live().is_empty());
    }
}
