use chrono::{DateTime, FixedOffset};
use serde::Deserialize;

/// Summary of a version folder found under `versions/`.
#[derive(Clone, Debug, PartialEq)]
pub struct InstalledVersion {
    pub id: String,
    pub version_type: String,
    pub release_time: Option<DateTime<FixedOffset>>,
}

/// Fields read from a version JSON when listing installs.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct VersionHeader {
    pub id: String,
    #[serde(rename = "type", default)]
    pub version_type: Option<String>,
    #[serde(default)]
    pub release_time: Option<String>,
}

impl From<VersionHeader> for InstalledVersion {
    fn from(header: VersionHeader) -> Self {
        let release_time = header
            .release_time
            .as_deref()
            .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok());
        Self {
            id: header.id,
            version_type: header.version_type.unwrap_or_else(|| "release".to_owned()),
            release_time,
        }
    }
}

/// Username and memory the player entered in the settings window.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UserConfig {
    pub username: String,
    pub ram_gb: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConfigError {
    MissingFields,
    InvalidRam,
}

/// Validate the settings form.
pub fn parse_user_config(username: &str, ram: &str) -> Result<UserConfig, ConfigError> {
    let username = username.trim();
    let ram = ram.trim();
    if username.is_empty() || ram.is_empty() {
        return Err(ConfigError::MissingFields);
    }
    let ram_gb = ram
        .parse::<u32>()
        .ok()
        .filter(|gb| *gb > 0)
        .ok_or(ConfigError::InvalidRam)?;
    Ok(UserConfig {
        username: username.to_owned(),
        ram_gb,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_requires_both_fields() {
        assert_eq!(parse_user_config("", "4"), Err(ConfigError::MissingFields));
        assert_eq!(parse_user_config("Steve", "  "), Err(ConfigError::MissingFields));
    }

    #[test]
    fn ram_must_be_a_positive_integer() {
        assert_eq!(parse_user_config("Steve", "4.5"), Err(ConfigError::InvalidRam));
        assert_eq!(parse_user_config("Steve", "lots"), Err(ConfigError::InvalidRam));
        assert_eq!(parse_user_config("Steve", "0"), Err(ConfigError::InvalidRam));
        assert_eq!(
            parse_user_config(" Steve ", "6"),
            Ok(UserConfig {
                username: "Steve".to_owned(),
                ram_gb: 6
            })
        );
    }

    #[test]
    fn header_parses_release_time() {
        let header: VersionHeader = serde_json::from_str(
            r#"{"id": "1.21.4", "type": "release", "releaseTime": "2024-12-03T10:12:57+00:00"}"#,
        )
        .unwrap();
        let version = InstalledVersion::from(header);
        assert_eq!(version.id, "1.21.4");
        assert!(version.release_time.is_some());
    }
}
