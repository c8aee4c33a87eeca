use crate::utils::CONSTANTS;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

pub const CLEARKEY_LICENSE_TYPE: &str = "clearkey";

/// DRM parameters of a single channel. Only clearkey is supported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DrmConfig {
    ClearkeyLicenseServer { license_key_url: String },
    ClearkeyRawKeys { key_id: String, key: String },
}

impl Display for DrmConfig {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ClearkeyLicenseServer { .. } => write!(f, "clearkey license server"),
            Self::ClearkeyRawKeys { .. } => write!(f, "clearkey keys"),
        }
    }
}

/// DRM related fields as they were found in the playlist, before any validation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DrmFields {
    pub license_type: Option<String>,
    pub license_key: Option<String>,
    pub key_id: Option<String>,
    pub key: Option<String>,
}

fn non_blank(value: Option<&String>) -> Option<&str> {
    value.map(|v| v.trim()).filter(|v| !v.is_empty())
}

impl DrmFields {
    pub fn is_empty(&self) -> bool {
        self.license_type.is_none() && self.license_key.is_none() && self.key_id.is_none() && self.key.is_none()
    }

    /// Picks exactly one variant. Partial or unknown combinations give `None`.
    pub fn to_drm_config(&self) -> Option<DrmConfig> {
        let is_clearkey = non_blank(self.license_type.as_ref())
            .is_some_and(|lt| lt.eq_ignore_ascii_case(CLEARKEY_LICENSE_TYPE));
        let license_key = non_blank(self.license_key.as_ref());

        if is_clearkey {
            if let Some(license_key) = license_key {
                // kodi notation  license_key=<kid>:<key>
                if let Some(caps) = CONSTANTS.re_clearkey_pair.captures(license_key) {
                    return Some(DrmConfig::ClearkeyRawKeys { key_id: caps["kid"].to_string(), key: caps["key"].to_string() });
                }
                return Some(DrmConfig::ClearkeyLicenseServer { license_key_url: license_key.to_string() });
            }
        }
        if let (Some(key_id), Some(key)) = (non_blank(self.key_id.as_ref()), non_blank(self.key.as_ref())) {
            return Some(DrmConfig::ClearkeyRawKeys { key_id: key_id.to_string(), key: key.to_string() });
        }
        None
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelRecord {
    pub name: Option<String>,
    pub logo: Option<String>,
    pub group: Option<String>,
    pub url: String,
    pub drm: Option<DrmConfig>,
}

impl ChannelRecord {
    pub fn new(url: &str) -> Self {
        Self { name: None, logo: None, group: None, url: url.to_string(), drm: None }
    }

    /// The name, or `Stream N` with the 1-based `position` in the loaded playlist.
    pub fn label(&self, position: usize) -> String {
        self.name.clone().unwrap_or_else(|| format!("Stream {position}"))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlaylistState {
    pub items: Vec<Arc<ChannelRecord>>,
    pub billed_message: Option<String>,
}

impl PlaylistState {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(license_type: Option<&str>, license_key: Option<&str>, key_id: Option<&str>, key: Option<&str>) -> DrmFields {
        DrmFields {
            license_type: license_type.map(ToString::to_string),
            license_key: license_key.map(ToString::to_string),
            key_id: key_id.map(ToString::to_string),
            key: key.map(ToString::to_string),
        }
    }

    #[test]
    fn test_raw_keys() {
        assert_eq!(
            fields(None, None, Some("k1"), Some("v1")).to_drm_config(),
            Some(DrmConfig::ClearkeyRawKeys { key_id: "k1".to_string(), key: "v1".to_string() })
        );
    }

    #[test]
    fn test_license_server() {
        assert_eq!(
            fields(Some("clearkey"), Some("https://lic"), None, None).to_drm_config(),
            Some(DrmConfig::ClearkeyLicenseServer { license_key_url: "https://lic".to_string() })
        );
        assert_eq!(
            fields(Some("ClearKey"), Some("https://lic"), Some("k1"), Some("v1")).to_drm_config(),
            Some(DrmConfig::ClearkeyLicenseServer { license_key_url: "https://lic".to_string() })
        );
    }

    #[test]
    fn test_clearkey_license_key_without_url() {
        assert_eq!(
            fields(Some("clearkey"), Some("abc"), None, None).to_drm_config(),
            Some(DrmConfig::ClearkeyLicenseServer { license_key_url: "abc".to_string() })
        );
        assert_eq!(
            fields(Some("clearkey"), Some("lic.example.com/key"), Some("k1"), Some("v1")).to_drm_config(),
            Some(DrmConfig::ClearkeyLicenseServer { license_key_url: "lic.example.com/key".to_string() })
        );
    }

    #[test]
    fn test_kodi_key_pair() {
        let kid = "0123456789abcdef0123456789abcdef";
        let key = "fedcba9876543210fedcba9876543210";
        assert_eq!(
            fields(Some("clearkey"), Some(&format!("{kid}:{key}")), None, None).to_drm_config(),
            Some(DrmConfig::ClearkeyRawKeys { key_id: kid.to_string(), key: key.to_string() })
        );
    }

    #[test]
    fn test_no_drm() {
        assert!(fields(None, None, None, None).to_drm_config().is_none());
        assert!(fields(None, None, Some("k1"), None).to_drm_config().is_none());
        assert!(fields(None, None, Some("k1"), Some("  ")).to_drm_config().is_none());
        assert!(fields(Some("clearkey"), None, None, None).to_drm_config().is_none());
        assert!(fields(Some("widevine"), Some("https://lic"), None, None).to_drm_config().is_none());
        assert!(fields(None, Some("https://lic"), None, None).to_drm_config().is_none());
    }

    #[test]
    fn test_label() {
        let mut record = ChannelRecord::new("http://a/1.m3u8");
        assert_eq!(record.label(3), "Stream 3");
        record.name = Some("Channel One".to_string());
        assert_eq!(record.label(3), "Channel One");
    }
}
