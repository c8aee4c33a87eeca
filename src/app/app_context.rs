use crate::error::{notify_err_res, TuliplayError};
use crate::model::{ChannelRecord, Config};
use crate::player::{PlaybackHandle, PlaybackStatus, PlayerBackend};
use crate::processing::list_renderer::ListRenderer;
use crate::processing::parser::m3u::parse_m3u;
use crate::processing::playlist_store::PlaylistStore;
use crate::repository::SessionRepository;
use crate::utils::network::request::get_playlist_content;
use crate::utils::sanitize_sensitive_info;
use log::info;
use std::sync::Arc;
use tokio::sync::watch;

/// Application state: the loaded playlist, the rendered list, the playback
/// controller and the remembered playlist url.
pub struct AppContext {
    config: Arc<Config>,
    client: reqwest::Client,
    store: PlaylistStore,
    renderer: ListRenderer,
    playback: PlaybackHandle,
    sessions: SessionRepository,
    playlist_url: Option<String>,
}

impl AppContext {
    pub fn new(config: Arc<Config>, client: reqwest::Client, backend: Arc<dyn PlayerBackend>, sessions: SessionRepository) -> Self {
        Self {
            config,
            client,
            store: PlaylistStore::new(),
            renderer: ListRenderer::new(),
            playback: PlaybackHandle::spawn(backend),
            sessions,
            playlist_url: None,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn playlist_url(&self) -> Option<&str> {
        self.playlist_url.as_deref()
    }

    pub fn set_playlist_url(&mut self, url: &str) {
        let url = url.trim();
        self.playlist_url = (!url.is_empty()).then(|| url.to_string());
    }

    /// Picks up the remembered playlist url, replaced by `cli_url` when given.
    /// Returns `true` if there is a url to load at startup.
    pub fn restore_playlist_url(&mut self, cli_url: Option<&str>) -> bool {
        match self.sessions.restore(cli_url) {
            Some(url) => {
                info!("Restoring playlist {}", sanitize_sensitive_info(&url));
                self.set_playlist_url(&url);
                true
            }
            None => false,
        }
    }

    pub fn store(&self) -> &PlaylistStore {
        &self.store
    }

    pub fn renderer(&self) -> &ListRenderer {
        &self.renderer
    }

    /// Loads the playlist from `url`, or from the current url if none is given.
    ///
    /// The url is remembered before fetching. On failure the loaded playlist
    /// stays as it is.
    pub async fn load_playlist(&mut self, url: Option<&str>) -> Result<usize, TuliplayError> {
        if let Some(url) = url {
            self.set_playlist_url(url);
        }
        let Some(url) = self.playlist_url.clone() else {
            return notify_err_res!("No playlist url given");
        };
        self.sessions.save(&url);

        let content = get_playlist_content(&self.client, &url).await?;
        let playlist = parse_m3u(&content);
        let count = playlist.len();
        info!("Loaded {count} channels from {}", sanitize_sensitive_info(&url));
        self.store.set_playlist(playlist);
        self.render();
        Ok(count)
    }

    fn render(&mut self) {
        self.renderer.render(self.store.visible_items());
    }

    pub fn search(&mut self, text: &str) {
        self.store.set_filter(text);
        self.render();
    }

    /// Starts playback of list entry `number`.
    pub fn play(&self, number: usize) -> Result<Arc<ChannelRecord>, TuliplayError> {
        match self.renderer.activate(number) {
            Some(record) => {
                self.playback.select(Arc::clone(&record));
                Ok(record)
            }
            None => notify_err_res!("No channel {number}"),
        }
    }

    pub fn stop(&self) {
        self.playback.stop();
    }

    pub fn playback_status(&self) -> PlaybackStatus {
        self.playback.status()
    }

    pub fn subscribe_playback(&self) -> watch::Receiver<PlaybackStatus> {
        self.playback.subscribe()
    }

    pub async fn shutdown(self) {
        self.playback.shutdown().await;
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::player::{DrmOptions, PlaybackState, PlayerError, PlayerSession, SessionContext};
    use async_trait::async_trait;
    use std::io::Write;
    use std::time::Duration;

    pub struct NoopBackend;
    struct NoopSession;

    #[async_trait]
    impl PlayerBackend for NoopBackend {
        async fn create(&self, _context: SessionContext) -> Result<Box<dyn PlayerSession>, PlayerError> {
            Ok(Box::new(NoopSession))
        }
    }

    #[async_trait]
    impl PlayerSession for NoopSession {
        fn configure(&mut self, _options: &DrmOptions) -> Result<(), PlayerError> {
            Ok(())
        }

        async fn load(&mut self, stream_url: &str) -> Result<(), PlayerError> {
            if stream_url.ends_with("/broken.ts") {
                Err(PlayerError { message: None, code: Some(404) })
            } else {
                Ok(())
            }
        }

        async fn destroy(&mut self) -> Result<(), PlayerError> {
            Ok(())
        }
    }

    pub fn context(data_dir: &std::path::Path) -> AppContext {
        AppContext::new(
            Arc::new(Config::default()),
            reqwest::Client::new(),
            Arc::new(NoopBackend),
            SessionRepository::new(data_dir),
        )
    }

    pub fn playlist_file(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[tokio::test]
    async fn test_load_search_play() {
        let dir = tempfile::tempdir().unwrap();
        let file = playlist_file("#EXTINF:-1,Channel One\nhttp://a/1.ts\n#EXTINF:-1,News\nhttp://a/broken.ts\n");
        let path = file.path().to_str().unwrap().to_string();
        let mut ctx = context(dir.path());

        assert_eq!(ctx.load_playlist(Some(&path)).await.unwrap(), 2);
        assert_eq!(ctx.renderer().entries().len(), 2);
        assert_eq!(SessionRepository::new(dir.path()).load(), Some(path));

        ctx.search("news");
        assert_eq!(ctx.renderer().entries().len(), 1);
        assert!(ctx.play(2).is_err());

        let mut status = ctx.subscribe_playback();
        ctx.play(1).unwrap();
        tokio::time::timeout(Duration::from_secs(5), status.wait_for(|s| matches!(s.state, PlaybackState::Error(_))))
            .await.unwrap().unwrap();
        assert_eq!(ctx.playback_status().state, PlaybackState::Error("Error loading video: 404".to_string()));

        ctx.search("");
        ctx.play(1).unwrap();
        tokio::time::timeout(Duration::from_secs(5), status.wait_for(|s| s.state == PlaybackState::Playing))
            .await.unwrap().unwrap();
        ctx.shutdown().await;
    }

    #[tokio::test]
    async fn test_restore_playlist_url() {
        let dir = tempfile::tempdir().unwrap();
        let mut ctx = context(dir.path());
        assert!(!ctx.restore_playlist_url(None));
        assert_eq!(ctx.playlist_url(), None);

        SessionRepository::new(dir.path()).save("http://a/stored.m3u");
        assert!(ctx.restore_playlist_url(None));
        assert_eq!(ctx.playlist_url(), Some("http://a/stored.m3u"));

        assert!(ctx.restore_playlist_url(Some("http://b/cli.m3u")));
        assert_eq!(ctx.playlist_url(), Some("http://b/cli.m3u"));
        assert_eq!(SessionRepository::new(dir.path()).load().as_deref(), Some("http://b/cli.m3u"));
        ctx.shutdown().await;
    }

    #[tokio::test]
    async fn test_failed_load_keeps_playlist() {
        let dir = tempfile::tempdir().unwrap();
        let file = playlist_file("#EXTINF:-1,Channel One\nhttp://a/1.ts\n");
        let mut ctx = context(dir.path());
        assert!(ctx.load_playlist(None).await.is_err());

        ctx.load_playlist(file.path().to_str()).await.unwrap();
        assert!(ctx.load_playlist(Some("/nonexistent/tuliplay/list.m3u")).await.is_err());
        assert_eq!(ctx.store().len(), 1);
        assert_eq!(ctx.renderer().entries().len(), 1);
        assert_eq!(ctx.playlist_url(), Some("/nonexistent/tuliplay/list.m3u"));
        ctx.shutdown().await;
    }
}
