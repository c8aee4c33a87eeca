use crate::error::to_io_error;
use crate::utils::{sanitize_sensitive_info, SESSION_FILE};
use log::{error, info};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

pub const PLAYLIST_URL_KEY: &str = "m3uPlaylistURL";

/// Durable key/value entries, stored as one json object.
pub struct SessionRepository {
    path: PathBuf,
}

impl SessionRepository {
    pub fn new(data_dir: &Path) -> Self {
        Self { path: data_dir.join(SESSION_FILE) }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_entries(&self) -> io::Result<BTreeMap<String, String>> {
        match File::open(&self.path) {
            Ok(file) => serde_json::from_reader(BufReader::new(file)).map_err(to_io_error),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(err) => Err(err),
        }
    }

    // write to a temp file next to the target, then rename
    fn write_entries(&self, entries: &BTreeMap<String, String>) -> io::Result<()> {
        let dir = self.path.parent().unwrap_or_else(|| Path::new("."));
        std::fs::create_dir_all(dir)?;
        let tempfile = NamedTempFile::new_in(dir)?;
        {
            let mut writer = BufWriter::new(tempfile.as_file());
            serde_json::to_writer_pretty(&mut writer, entries).map_err(to_io_error)?;
            writer.flush()?;
        }
        tempfile.persist(&self.path).map_err(|err| err.error)?;
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<String> {
        match self.read_entries() {
            Ok(mut entries) => entries.remove(key),
            Err(err) => {
                error!("Failed to read session file {}: {err}", self.path.display());
                None
            }
        }
    }

    pub fn set(&self, key: &str, value: &str) -> io::Result<()> {
        // an unreadable file is replaced
        let mut entries = self.read_entries().unwrap_or_else(|err| {
            error!("Failed to read session file {}: {err}", self.path.display());
            BTreeMap::new()
        });
        entries.insert(key.to_string(), value.to_string());
        self.write_entries(&entries)
    }

    /// Remembers the last playlist url. Failures are logged only.
    pub fn save(&self, url: &str) {
        match self.set(PLAYLIST_URL_KEY, url) {
            Ok(()) => info!("Saved playlist url {}", sanitize_sensitive_info(url)),
            Err(err) => error!("Failed to save playlist url to {}: {err}", self.path.display()),
        }
    }

    pub fn load(&self) -> Option<String> {
        self.get(PLAYLIST_URL_KEY).filter(|url| !url.trim().is_empty())
    }

    /// Startup lookup: a url given on the command line replaces the stored one.
    pub fn restore(&self, cli_url: Option<&str>) -> Option<String> {
        if let Some(url) = cli_url.map(str::trim).filter(|url| !url.is_empty()) {
            self.save(url);
        }
        self.load()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let repo = SessionRepository::new(&dir.path().join("nested"));
        assert_eq!(repo.load(), None);

        repo.save("http://a/list.m3u");
        assert_eq!(repo.load().as_deref(), Some("http://a/list.m3u"));

        repo.save("http://b/other.m3u");
        let reopened = SessionRepository::new(&dir.path().join("nested"));
        assert_eq!(reopened.load().as_deref(), Some("http://b/other.m3u"));
    }

    #[test]
    fn test_restore() {
        let dir = tempfile::tempdir().unwrap();
        let repo = SessionRepository::new(dir.path());
        assert_eq!(repo.restore(None), None);
        assert_eq!(repo.restore(Some("  ")), None);

        repo.save("http://a/stored.m3u");
        assert_eq!(repo.restore(None).as_deref(), Some("http://a/stored.m3u"));
        assert_eq!(repo.restore(Some(" http://b/cli.m3u ")).as_deref(), Some("http://b/cli.m3u"));
        assert_eq!(SessionRepository::new(dir.path()).load().as_deref(), Some("http://b/cli.m3u"));
    }

    #[test]
    fn test_other_keys_kept() {
        let dir = tempfile::tempdir().unwrap();
        let repo = SessionRepository::new(dir.path());
        repo.set("volume", "80").unwrap();
        repo.save("http://a/list.m3u");
        assert_eq!(repo.get("volume").as_deref(), Some("80"));
    }

    #[test]
    fn test_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let repo = SessionRepository::new(dir.path());
        std::fs::write(repo.path(), "not json").unwrap();
        assert_eq!(repo.load(), None);
        repo.save("http://a/list.m3u");
        assert_eq!(repo.load().as_deref(), Some("http://a/list.m3u"));
    }
}
