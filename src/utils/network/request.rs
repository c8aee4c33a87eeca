use crate::error::{notify_err_res, TuliplayError};
use crate::model::Config;
use crate::utils::{debug_if_enabled, is_file_url, is_http_url, sanitize_sensitive_info, DEFAULT_USER_AGENT};
use log::{error, warn};
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use reqwest::StatusCode;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

const CONNECT_TIMEOUT_SECS: u64 = 10;
const REQUEST_TIMEOUT_SECS: u64 = 60;

pub fn format_http_status(status: StatusCode) -> String {
    let code = status.as_u16();
    match status.canonical_reason() {
        Some(reason) => format!("{code} {reason}"),
        None => code.to_string(),
    }
}

pub fn create_client(cfg: &Config) -> reqwest::ClientBuilder {
    let user_agent = cfg.user_agent.as_deref().unwrap_or(DEFAULT_USER_AGENT);
    let mut headers = HeaderMap::new();
    match HeaderValue::from_str(user_agent) {
        Ok(value) => {
            headers.insert(USER_AGENT, value);
        }
        Err(err) => {
            warn!("Invalid user agent '{user_agent}': {err}");
            headers.insert(USER_AGENT, HeaderValue::from_static(DEFAULT_USER_AGENT));
        }
    }

    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::limited(10))
        .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
        .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
        .default_headers(headers)
        .danger_accept_invalid_certs(cfg.accept_insecure_ssl_certificates)
}

// read local file content and return it as a string.
pub async fn get_local_file_content(file_path: &Path) -> Result<String, std::io::Error> {
    let bytes = tokio::fs::read(file_path).await.map_err(|err| {
        std::io::Error::new(
            err.kind(),
            format!("Failed to open file: {}, {err}", file_path.display()),
        )
    })?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

pub async fn download_text_content(client: &reqwest::Client, url: &str) -> Result<String, std::io::Error> {
    let response = client.get(url).send().await.map_err(|err| {
        std::io::Error::other(format!("Request failed: {} {}", sanitize_sensitive_info(url), sanitize_sensitive_info(&err.to_string())))
    })?;
    let status = response.status();
    if !status.is_success() {
        return Err(std::io::Error::other(format!(
            "Request failed with status {} {}",
            format_http_status(status),
            sanitize_sensitive_info(url)
        )));
    }
    response.text().await.map_err(|err| {
        std::io::Error::other(format!("Failed to read response from {}: {err}", sanitize_sensitive_info(url)))
    })
}

fn local_path(url: &str) -> Option<PathBuf> {
    if is_file_url(url) {
        Url::parse(url).ok().and_then(|u| u.to_file_path().ok())
    } else if url.contains("://") {
        None
    } else {
        Some(PathBuf::from(url))
    }
}

/// Fetches the playlist text from an http(s) url, a `file://` url or a local path.
pub async fn get_playlist_content(client: &reqwest::Client, url: &str) -> Result<String, TuliplayError> {
    let url = url.trim();
    if url.is_empty() {
        return notify_err_res!("No playlist url given");
    }
    debug_if_enabled!("getting playlist content from {}", sanitize_sensitive_info(url));

    let result = if is_http_url(url) {
        download_text_content(client, url).await
    } else if let Some(path) = local_path(url) {
        get_local_file_content(&path).await
    } else {
        return notify_err_res!("Unsupported playlist url: {}", sanitize_sensitive_info(url));
    };

    result.or_else(|err| {
        let msg = format!("can't read playlist: {}", sanitize_sensitive_info(&err.to_string()));
        error!("{msg}");
        notify_err_res!("{msg}")
    })
}
