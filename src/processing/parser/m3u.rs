use crate::model::{ChannelRecord, DrmFields, PlaylistState};
use crate::utils::debug_if_enabled;
use std::iter::Peekable;
use std::str::Chars;
use std::sync::Arc;

const EXTM3U: &str = "#EXTM3U";
const EXTINF: &str = "#EXTINF";
const EXTGRP: &str = "#EXTGRP";
const KODIPROP: &str = "#KODIPROP";

const ATTR_TVG_NAME: &str = "tvg-name";
const ATTR_TVG_LOGO: &str = "tvg-logo";
const ATTR_GROUP_TITLE: &str = "group-title";
const ATTR_BILLED_MSG: &str = "billed-msg";
const ATTR_LICENSE_TYPE: &str = "license_type";
const ATTR_LICENSE_KEY: &str = "license_key";
const ATTR_KEY_ID: &str = "key_id";
const ATTR_KEY: &str = "key";

/// Metadata collected from directive lines until the next stream url.
#[derive(Debug, Default)]
struct PendingChannel {
    name: Option<String>,
    title: Option<String>,
    logo: Option<String>,
    group: Option<String>,
    drm: DrmFields,
}

impl PendingChannel {
    fn set_drm_field(&mut self, field: &str, value: String) {
        let target = match field {
            ATTR_LICENSE_TYPE => &mut self.drm.license_type,
            ATTR_LICENSE_KEY => &mut self.drm.license_key,
            ATTR_KEY_ID => &mut self.drm.key_id,
            ATTR_KEY => &mut self.drm.key,
            _ => return,
        };
        *target = Some(value);
    }

    fn into_record(self, url: &str) -> ChannelRecord {
        let drm = if self.drm.is_empty() {
            None
        } else {
            let drm = self.drm.to_drm_config();
            if drm.is_none() {
                debug_if_enabled!("Ignoring incomplete drm attributes for {}", url);
            }
            drm
        };
        ChannelRecord {
            name: self.name.or(self.title),
            logo: self.logo,
            group: self.group,
            url: url.to_string(),
            drm,
        }
    }
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else if trimmed.len() == value.len() {
        Some(value)
    } else {
        Some(trimmed.to_string())
    }
}

#[inline]
fn skip_duration(it: &mut Peekable<Chars>) {
    while it.next_if(|c| *c == '-' || *c == '+' || *c == '.' || c.is_ascii_digit()).is_some() {}
}

fn token_value(stack: &mut String, it: &mut Peekable<Chars>) -> String {
    stack.clear();
    if it.next_if_eq(&'"').is_some() {
        for c in it.by_ref() {
            if c == '"' {
                break;
            }
            stack.push(c);
        }
    } else {
        while let Some(c) = it.next_if(|c| !c.is_whitespace() && *c != ',') {
            stack.push(c);
        }
    }
    let result = stack.clone();
    stack.clear();
    result
}

/// Reads `key="value"` pairs until the first `,` outside of quotes.
/// Returns the text after that `,`, which is the title on `#EXTINF` lines.
/// Words without `=` are skipped.
fn read_attributes<F>(it: &mut Peekable<Chars>, mut visit: F) -> Option<String>
where
    F: FnMut(&str, String),
{
    let mut stack = String::with_capacity(64);
    loop {
        match it.next() {
            None => return None,
            Some(',') => return Some(it.collect::<String>()),
            Some(chr) if chr.is_whitespace() => {}
            Some(chr) => {
                stack.clear();
                stack.push(chr);
                while let Some(c) = it.next_if(|c| !c.is_whitespace() && *c != '=' && *c != ',') {
                    stack.push(c);
                }
                if it.next_if_eq(&'=').is_some() {
                    let key = stack.to_lowercase();
                    let value = token_value(&mut stack, it);
                    visit(&key, value);
                }
            }
        }
    }
}

fn process_extinf(pending: &mut PendingChannel, content: &str) {
    let mut it = content.chars().peekable();
    let _ = it.next_if_eq(&':');
    skip_duration(&mut it);
    let title = read_attributes(&mut it, |key, value| {
        match key {
            ATTR_TVG_NAME => pending.name = non_empty(value),
            ATTR_TVG_LOGO => pending.logo = non_empty(value),
            ATTR_GROUP_TITLE => pending.group = non_empty(value),
            _ => pending.set_drm_field(key, value),
        }
    });
    if let Some(title) = title.and_then(non_empty) {
        pending.title = Some(title);
    }
}

fn process_extm3u(content: &str) -> Option<String> {
    let mut billed_message = None;
    let mut it = content.chars().peekable();
    read_attributes(&mut it, |key, value| {
        if key == ATTR_BILLED_MSG {
            billed_message = non_empty(value);
        }
    });
    billed_message
}

// #KODIPROP:inputstream.adaptive.license_type=clearkey
fn process_kodiprop(pending: &mut PendingChannel, content: &str) {
    let Some((property, value)) = content.trim_start_matches(':').split_once('=') else {
        return;
    };
    let field = property.rsplit('.').next().unwrap_or(property).trim().to_lowercase();
    if matches!(field.as_str(), ATTR_LICENSE_TYPE | ATTR_LICENSE_KEY) {
        pending.set_drm_field(&field, value.trim().to_string());
    }
}

/// Visits every channel in source order and returns the playlist billed message.
///
/// Every non empty line that is not a directive is a stream url and closes the
/// current channel, whatever metadata was collected before it.
pub fn consume_m3u<F: FnMut(ChannelRecord)>(content: &str, mut visit: F) -> Option<String> {
    let mut billed_message = None;
    let mut pending = PendingChannel::default();

    let content = content.strip_prefix('\u{feff}').unwrap_or(content);
    for line in content.split('\n').map(str::trim) {
        if line.is_empty() {
            continue;
        }
        if let Some(rest) = line.strip_prefix(EXTM3U) {
            if let Some(msg) = process_extm3u(rest) {
                billed_message = Some(msg);
            }
            continue;
        }
        if let Some(rest) = line.strip_prefix(EXTINF) {
            process_extinf(&mut pending, rest);
            continue;
        }
        if let Some(rest) = line.strip_prefix(EXTGRP) {
            if pending.group.is_none() {
                pending.group = non_empty(rest.trim_start_matches(':').to_string());
            }
            continue;
        }
        if let Some(rest) = line.strip_prefix(KODIPROP) {
            process_kodiprop(&mut pending, rest);
            continue;
        }
        if line.starts_with('#') {
            continue;
        }
        visit(std::mem::take(&mut pending).into_record(line));
    }
    billed_message
}

pub fn parse_m3u(content: &str) -> PlaylistState {
    let mut items = vec![];
    let billed_message = consume_m3u(content, |record| items.push(Arc::new(record)));
    debug_if_enabled!("Parsed {} channels", items.len());
    PlaylistState { items, billed_message }
}
