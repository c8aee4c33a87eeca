use crate::utils::{CONSTANTS, DASH_EXT, HLS_EXT};
use std::borrow::Cow;
use std::sync::atomic::Ordering;
use url::Url;

pub fn set_sanitize_sensitive_info(value: bool) {
    CONSTANTS.sanitize.store(value, Ordering::Relaxed);
}

/// Masks credentials and key material before a url or message reaches the log.
pub fn sanitize_sensitive_info(query: &str) -> Cow<'_, str> {
    if !CONSTANTS.sanitize.load(Ordering::Relaxed) {
        return Cow::Borrowed(query);
    }

    let mut result = query.to_owned();

    for (re, replacement) in &[
        (&CONSTANTS.re_credentials, "$1***"),
        (&CONSTANTS.re_userinfo, "$scheme***@"),
    ] {
        result = re.replace_all(&result, *replacement).into_owned();
    }
    Cow::Owned(result)
}

fn url_path(url: &str) -> Cow<'_, str> {
    Url::parse(url).map_or(Cow::Borrowed(url), |u| Cow::Owned(u.path().to_lowercase()))
}

pub fn is_hls_url(url: &str) -> bool {
    url_path(url).ends_with(HLS_EXT)
}

pub fn is_dash_url(url: &str) -> bool {
    url_path(url).ends_with(DASH_EXT)
}

/// Short stream type name used in log output.
pub fn stream_kind(url: &str) -> &'static str {
    if is_hls_url(url) {
        "hls"
    } else if is_dash_url(url) {
        "dash"
    } else {
        "progressive"
    }
}

pub fn is_file_url(url: &str) -> bool {
    Url::parse(url)
        .is_ok_and(|u| u.scheme().eq_ignore_ascii_case("file"))
}

pub fn is_http_url(url: &str) -> bool {
    Url::parse(url)
        .is_ok_and(|u| u.scheme().eq_ignore_ascii_case("http") || u.scheme().eq_ignore_ascii_case("https"))
}
