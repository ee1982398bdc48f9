use log::info;
use serde::Deserialize;

use crate::networking::NetworkClient;

pub const VERSION_MANIFEST_URL: &str =
    "https://piston-meta.mojang.com/mc/game/version_manifest_v2.json";

#[derive(Debug, Deserialize)]
pub struct VersionManifest {
    pub versions: Vec<VersionEntry>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionEntry {
    pub id: String,
    #[serde(rename = "type")]
    pub version_type: String,
    pub url: String,
    #[serde(default)]
    pub sha1: Option<String>,
}

impl VersionManifest {
    pub async fn fetch(network: &NetworkClient) -> Result<Self, String> {
        let manifest: VersionManifest = network.get_json(VERSION_MANIFEST_URL).await?;
        info!("manifest: {} versions available", manifest.versions.len());
        Ok(manifest)
    }

    pub fn find(&self, id: &str) -> Option<&VersionEntry> {
        self.versions.iter().find(|v| v.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_entry_by_id() {
        let manifest: VersionManifest = serde_json::from_str(
            r#"{
                "latest": {"release": "1.21.4", "snapshot": "25w03a"},
                "versions": [
                    {"id": "25w03a", "type": "snapshot", "url": "https://example.com/a.json",
                     "time": "", "releaseTime": "", "sha1": "aa", "complianceLevel": 1},
                    {"id": "1.21.4", "type": "release", "url": "https://example.com/b.json",
                     "time": "", "releaseTime": "", "sha1": "bb", "complianceLevel": 1}
                ]
            }"#,
        )
        .unwrap();

        let entry = manifest.find("1.21.4").unwrap();
        assert_eq!(entry.version_type, "release");
        assert_eq!(entry.sha1.as_deref(), Some("bb"));
        assert!(manifest.find("1.0.0-missing").is_none());
    }
}
