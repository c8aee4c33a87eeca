use regex::Regex;
use std::sync::atomic::AtomicBool;
use std::sync::LazyLock;

pub const CONFIG_FILE: &str = "config.yml";
pub const SESSION_FILE: &str = "session.json";
pub const DEFAULT_DATA_DIR: &str = "data";
pub const DEFAULT_USER_AGENT: &str = concat!("tuliplay/", env!("CARGO_PKG_VERSION"));

pub const HLS_EXT: &str = ".m3u8";
pub const DASH_EXT: &str = ".mpd";

pub struct Constants {
    pub re_credentials: Regex,
    pub re_userinfo: Regex,
    pub re_clearkey_pair: Regex,
    pub re_env_var: Regex,
    pub sanitize: AtomicBool,
}

pub static CONSTANTS: LazyLock<Constants> = LazyLock::new(||
    Constants {
        re_credentials: Regex::new(r"(?i)((username|password|token|key|key_id)=)[^&\s]*").unwrap(),
        re_userinfo: Regex::new(r"(?P<scheme>[a-zA-Z][a-zA-Z0-9+.-]*://)[^/@\s]+@").unwrap(),
        re_clearkey_pair: Regex::new(r"^(?P<kid>[0-9a-fA-F]{32}):(?P<key>[0-9a-fA-F]{32})$").unwrap(),
        re_env_var: Regex::new(r"\$\{env:(?P<var>[a-zA-Z_][a-zA-Z0-9_]*)}").unwrap(),
        sanitize: AtomicBool::new(true),
    });
