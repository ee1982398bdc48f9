use std::cmp::Reverse;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use log::warn;

use crate::engine::models::{InstalledVersion, VersionHeader};
use crate::env;
use crate::minecraft::{FABRIC_LOADER_VERSION, parse_fabric_id};

const MODS_MARKER_CONTENT: &str = "mods_installed";

/// Read-side view of the install folder plus the few small files the
/// launcher writes itself.
#[derive(Clone)]
pub struct StorageManager {
    root: PathBuf,
}

impl StorageManager {
    pub fn new(root: PathBuf) -> Self {
        // Best-effort directory creation; failures are surfaced on use.
        if let Err(err) = env::ensure_base_dirs(&root) {
            warn!("storage: unable to create {}: {err}", root.display());
        }
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn versions_dir(&self) -> PathBuf {
        env::versions_dir(&self.root)
    }

    pub fn version_dir(&self, id: &str) -> PathBuf {
        env::version_dir(&self.root, id)
    }

    pub fn mods_dir(&self) -> PathBuf {
        env::mods_dir(&self.root)
    }

    pub fn version_jar_exists(&self, id: &str) -> bool {
        env::version_jar_path(&self.root, id).is_file()
    }

    /// Every version folder with a readable JSON, newest release first.
    pub fn installed_versions(&self) -> Vec<InstalledVersion> {
        let Ok(entries) = fs::read_dir(self.versions_dir()) else {
            return Vec::new();
        };
        let mut versions: Vec<InstalledVersion> = entries
            .filter_map(Result::ok)
            .filter(|entry| entry.path().is_dir())
            .filter_map(|entry| {
                let id = entry.file_name().to_string_lossy().into_owned();
                let path = env::version_json_path(&self.root, &id);
                let text = fs::read_to_string(&path).ok()?;
                match serde_json::from_str::<VersionHeader>(&text) {
                    Ok(header) => Some(InstalledVersion::from(header)),
                    Err(err) => {
                        warn!("storage: skipping {}: {err}", path.display());
                        None
                    }
                }
            })
            .collect();
        versions.sort_by(|a, b| {
            Reverse(a.release_time)
                .cmp(&Reverse(b.release_time))
                .then_with(|| a.id.cmp(&b.id))
        });
        versions
    }

    /// Base game version mapped to its installed Fabric loader version id.
    pub fn fabric_versions(&self) -> HashMap<String, String> {
        let mut map: HashMap<String, String> = HashMap::new();
        for version in self.installed_versions() {
            let Some((loader, base)) = parse_fabric_id(&version.id) else {
                continue;
            };
            let preferred = loader == FABRIC_LOADER_VERSION;
            if preferred || !map.contains_key(base) {
                map.insert(base.to_owned(), version.id.clone());
            }
        }
        map
    }

    pub fn mods_marker_path(&self, version: &str) -> PathBuf {
        self.mods_dir().join(format!("mods_installed_{version}.txt"))
    }

    pub fn has_mods_marker(&self, version: &str) -> bool {
        self.mods_marker_path(version).exists()
    }

    pub fn write_mods_marker(&self, version: &str) -> Result<(), String> {
        let path = self.mods_marker_path(version);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| format!("unable to create {}: {e}", parent.display()))?;
        }
        fs::write(&path, MODS_MARKER_CONTENT)
            .map_err(|e| format!("unable to write {}: {e}", path.display()))
    }

    /// Whether any finished file in the mods folder looks like Fabric API.
    pub fn has_fabric_api(&self) -> bool {
        fs::read_dir(self.mods_dir()).is_ok_and(|entries| {
            entries.filter_map(Result::ok).any(|entry| {
                let name = entry.file_name().to_string_lossy().to_lowercase();
                name.contains("fabric-api") && !name.ends_with(".part")
            })
        })
    }

    /// First `.mp3` in the songs folder, by name.
    pub fn first_song(&self) -> Result<Option<PathBuf>, String> {
        let dir = env::songs_dir(&self.root);
        let entries =
            fs::read_dir(&dir).map_err(|e| format!("unable to read {}: {e}", dir.display()))?;
        let mut songs: Vec<PathBuf> = entries
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| {
                path.is_file()
                    && path
                        .extension()
                        .is_some_and(|ext| ext.eq_ignore_ascii_case("mp3"))
            })
            .collect();
        songs.sort();
        Ok(songs.into_iter().next())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_version(root: &Path, id: &str, body: &str) {
        let path = env::version_json_path(root, id);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, body).unwrap();
    }

    fn storage() -> (tempfile::TempDir, StorageManager) {
        let tmp = tempfile::tempdir().unwrap();
        let storage = StorageManager::new(tmp.path().join("MNC_KA Client"));
        (tmp, storage)
    }

    #[test]
    fn lists_versions_newest_first_and_skips_broken() {
        let (_tmp, storage) = storage();
        let root = storage.root().to_path_buf();
        write_version(
            &root,
            "1.20.1",
            r#"{"id": "1.20.1", "type": "release", "releaseTime": "2023-06-12T13:25:51+00:00"}"#,
        );
        write_version(
            &root,
            "1.21.4",
            r#"{"id": "1.21.4", "type": "release", "releaseTime": "2024-12-03T10:12:57+00:00"}"#,
        );
        write_version(&root, "broken", "not json");
        fs::create_dir_all(env::version_dir(&root, "empty")).unwrap();

        let ids: Vec<String> = storage
            .installed_versions()
            .into_iter()
            .map(|v| v.id)
            .collect();
        assert_eq!(ids, ["1.21.4", "1.20.1"]);
    }

    #[test]
    fn fabric_map_prefers_default_loader() {
        let (_tmp, storage) = storage();
        let root = storage.root().to_path_buf();
        for id in [
            "1.21.4",
            "fabric-loader-0.15.0-1.21.4",
            "fabric-loader-0.16.10-1.21.4",
            "fabric-loader-0.15.0-1.20.1",
        ] {
            write_version(&root, id, &format!(r#"{{"id": "{id}"}}"#));
        }

        let map = storage.fabric_versions();
        assert_eq!(map.len(), 2);
        assert_eq!(map["1.21.4"], "fabric-loader-0.16.10-1.21.4");
        assert_eq!(map["1.20.1"], "fabric-loader-0.15.0-1.20.1");
    }

    #[test]
    fn mods_marker_round_trip() {
        let (_tmp, storage) = storage();
        assert!(!storage.has_mods_marker("1.21.4"));
        storage.write_mods_marker("1.21.4").unwrap();
        assert!(storage.has_mods_marker("1.21.4"));
        assert_eq!(
            fs::read_to_string(storage.mods_dir().join("mods_installed_1.21.4.txt")).unwrap(),
            "mods_installed"
        );
    }

    #[test]
    fn detects_fabric_api_case_insensitively() {
        let (_tmp, storage) = storage();
        assert!(!storage.has_fabric_api());
        fs::write(storage.mods_dir().join("fabric-api-0.118.0+1.21.4.jar.part"), b"").unwrap();
        assert!(!storage.has_fabric_api());
        fs::write(storage.mods_dir().join("Fabric-API-0.118.0+1.21.4.jar"), b"").unwrap();
        assert!(storage.has_fabric_api());
    }

    #[test]
    fn first_song_is_sorted_and_mp3_only() {
        let (_tmp, storage) = storage();
        let songs = env::songs_dir(storage.root());
        assert_eq!(storage.first_song().unwrap(), None);

        fs::write(songs.join("notes.txt"), b"").unwrap();
        fs::write(songs.join("b.mp3"), b"").unwrap();
        fs::write(songs.join("a.MP3"), b"").unwrap();
        assert_eq!(storage.first_song().unwrap(), Some(songs.join("a.MP3")));
    }

    #[test]
    fn missing_songs_folder_is_an_error() {
        let (_tmp, storage) = storage();
        fs::remove_dir_all(env::songs_dir(storage.root())).unwrap();
        assert!(storage.first_song().is_err());
    }
}
