use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use futures_util::stream::{self, StreamExt};
use log::{debug, info, warn};
use serde::Deserialize;
use tokio::fs;

use crate::minecraft::{InstallProgress, ProgressFn};
use crate::networking::NetworkClient;

const RUNTIME_INDEX_URL: &str = "https://launchermeta.mojang.com/v1/products/java-runtime/2ec0cc96c44e5a76b9c8b7c39df7210883d12871/all.json";
const PARALLEL_DOWNLOADS: usize = 8;
/// Same file name Mojang's launcher keeps next to each runtime.
const VERSION_MARKER: &str = ".version";

#[derive(Debug, Clone, Deserialize)]
struct RuntimeEntry {
    manifest: RuntimeManifestRef,
    version: RuntimeVersion,
}

#[derive(Debug, Clone, Deserialize)]
struct RuntimeManifestRef {
    url: String,
}

#[derive(Debug, Clone, Deserialize)]
struct RuntimeVersion {
    name: String,
}

/// platform -> component -> entries
type RuntimeIndex = HashMap<String, HashMap<String, Vec<RuntimeEntry>>>;

#[derive(Debug, Deserialize)]
struct RuntimeManifest {
    files: HashMap<String, RuntimeFile>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum RuntimeFile {
    Directory,
    File {
        #[serde(default)]
        executable: bool,
        downloads: RuntimeDownloads,
    },
    Link {
        target: String,
    },
}

#[derive(Debug, Deserialize)]
struct RuntimeDownloads {
    raw: RawDownload,
}

#[derive(Debug, Deserialize)]
struct RawDownload {
    sha1: String,
    url: String,
}

struct RuntimeDownload {
    path: PathBuf,
    url: String,
    sha1: String,
    executable: bool,
}

/// Installs the Java runtimes Mojang publishes per game version under
/// `runtime/<component>/<platform>/<component>`.
#[derive(Clone)]
pub struct JreManager {
    runtime_dir: PathBuf,
    network: NetworkClient,
}

impl JreManager {
    pub fn new(runtime_dir: PathBuf, network: NetworkClient) -> Self {
        Self {
            runtime_dir,
            network,
        }
    }

    fn component_dir(&self, component: &str, platform: &str) -> PathBuf {
        self.runtime_dir
            .join(component)
            .join(platform)
            .join(component)
    }

    /// Written once every file and link of a component is in place.
    fn version_marker(&self, component: &str, platform: &str) -> PathBuf {
        self.runtime_dir
            .join(component)
            .join(platform)
            .join(VERSION_MARKER)
    }

    /// Java executable for `component`, if it has been fully installed.
    pub fn installed_java(&self, component: &str) -> Option<PathBuf> {
        let platform = platform_key()?;
        if !self.version_marker(component, platform).exists() {
            return None;
        }
        let java = java_in(&self.component_dir(component, platform));
        java.exists().then_some(java)
    }

    /// Download the runtime unless it is already present.
    ///
    /// Returns `Ok(None)` when Mojang ships no runtime for this platform; the
    /// caller then falls back to `java` on the `PATH`.
    pub async fn ensure_runtime(
        &self,
        component: &str,
        progress: &ProgressFn,
    ) -> Result<Option<PathBuf>, String> {
        if let Some(java) = self.installed_java(component) {
            debug!("jre: {component} already present at {}", java.display());
            return Ok(Some(java));
        }
        let Some(platform) = platform_key() else {
            warn!("jre: no Mojang runtime for this platform, using system java");
            return Ok(None);
        };

        info!("jre: installing {component} for {platform}");
        progress(InstallProgress::status(format!("Installing Java runtime {component}")));
        let index: RuntimeIndex = self.network.get_json(RUNTIME_INDEX_URL).await?;
        let Some(entry) = index
            .get(platform)
            .and_then(|components| components.get(component))
            .and_then(|entries| entries.first())
        else {
            warn!("jre: runtime {component} not published for {platform}");
            return Ok(None);
        };
        debug!("jre: {component} resolves to {}", entry.version.name);

        let manifest: RuntimeManifest = self.network.get_json(&entry.manifest.url).await?;
        let base = self.component_dir(component, platform);
        self.install_files(manifest, &base, progress).await?;

        let java = java_in(&base);
        if !java.exists() {
            return Err(format!(
                "runtime {component} installed but {} is missing",
                java.display()
            ));
        }
        let marker = self.version_marker(component, platform);
        fs::write(&marker, &entry.version.name)
            .await
            .map_err(|e| format!("failed to write {}: {e}", marker.display()))?;
        info!("jre: ready at {}", java.display());
        Ok(Some(java))
    }

    /// Lay out every manifest entry under `base`. Files already on disk with a
    /// matching SHA-1 are kept.
    async fn install_files(
        &self,
        manifest: RuntimeManifest,
        base: &Path,
        progress: &ProgressFn,
    ) -> Result<(), String> {
        fs::create_dir_all(base)
            .await
            .map_err(|e| format!("unable to create runtime dir: {e}"))?;

        let mut downloads = Vec::new();
        let mut links = Vec::new();
        for (relative, file) in manifest.files {
            let path = base.join(relative);
            match file {
                RuntimeFile::Directory => {
                    fs::create_dir_all(&path)
                        .await
                        .map_err(|e| format!("unable to create {}: {e}", path.display()))?;
                }
                RuntimeFile::File {
                    executable,
                    downloads: RuntimeDownloads { raw },
                } => downloads.push(RuntimeDownload {
                    path,
                    url: raw.url,
                    sha1: raw.sha1,
                    executable,
                }),
                RuntimeFile::Link { target } => links.push((path, target)),
            }
        }

        let total = downloads.len();
        let completed = Arc::new(AtomicUsize::new(0));
        let results: Vec<Result<(), String>> = stream::iter(downloads)
            .map(|job| {
                let network = self.network.clone();
                let progress = progress.clone();
                let completed = completed.clone();
                async move {
                    network
                        .download_verified(&job.url, &job.path, Some(&job.sha1))
                        .await?;
                    if job.executable {
                        mark_executable(&job.path)?;
                    }
                    let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
                    progress(InstallProgress::new("Installing Java runtime", done, total));
                    Ok(())
                }
            })
            .buffer_unordered(PARALLEL_DOWNLOADS)
            .collect()
            .await;
        results.into_iter().collect::<Result<Vec<()>, String>>()?;

        for (path, target) in links {
            create_link(&path, &target)?;
        }
        Ok(())
    }
}

fn java_in(base: &Path) -> PathBuf {
    if cfg!(target_os = "windows") {
        base.join("bin").join("javaw.exe")
    } else if cfg!(target_os = "macos") {
        base.join("jre.bundle")
            .join("Contents")
            .join("Home")
            .join("bin")
            .join("java")
    } else {
        base.join("bin").join("java")
    }
}

/// Mojang's platform key for the runtime index.
pub fn platform_key() -> Option<&'static str> {
    if cfg!(target_os = "windows") {
        if cfg!(target_arch = "x86_64") {
            Some("windows-x64")
        } else if cfg!(target_arch = "x86") {
            Some("windows-x86")
        } else if cfg!(target_arch = "aarch64") {
            Some("windows-arm64")
        } else {
            None
        }
    } else if cfg!(target_os = "macos") {
        if cfg!(target_arch = "aarch64") {
            Some("mac-os-arm64")
        } else {
            Some("mac-os")
        }
    } else if cfg!(target_os = "linux") {
        if cfg!(target_arch = "x86_64") {
            Some("linux")
        } else if cfg!(target_arch = "x86") {
            Some("linux-i386")
        } else {
            None
        }
    } else {
        None
    }
}

#[cfg(unix)]
fn mark_executable(path: &Path) -> Result<(), String> {
    use std::os::unix::fs::PermissionsExt;
    let mut perms = std::fs::metadata(path)
        .map_err(|e| format!("failed to stat {}: {e}", path.display()))?
        .permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(path, perms)
        .map_err(|e| format!("failed to chmod {}: {e}", path.display()))
}

#[cfg(not(unix))]
fn mark_executable(_path: &Path) -> Result<(), String> {
    Ok(())
}

#[cfg(unix)]
fn create_link(path: &Path, target: &str) -> Result<(), String> {
    if path.symlink_metadata().is_ok() {
        return Ok(());
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| format!("unable to create {}: {e}", parent.display()))?;
    }
    std::os::unix::fs::symlink(target, path)
        .map_err(|e| format!("failed to link {}: {e}", path.display()))
}

#[cfg(not(unix))]
fn create_link(path: &Path, _target: &str) -> Result<(), String> {
    debug!("jre: skipping link {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_runtime_manifest_entries() {
        let manifest: RuntimeManifest = serde_json::from_str(
            r#"{"files": {
                "bin": {"type": "directory"},
                "bin/java": {"type": "file", "executable": true, "downloads": {
                    "raw": {"sha1": "abc", "size": 10, "url": "https://example.com/java"},
                    "lzma": {"sha1": "def", "size": 5, "url": "https://example.com/java.lzma"}
                }},
                "lib/libjli.so": {"type": "link", "target": "../jli/libjli.so"}
            }}"#,
        )
        .unwrap();

        assert!(matches!(manifest.files["bin"], RuntimeFile::Directory));
        assert!(matches!(
            manifest.files["bin/java"],
            RuntimeFile::File { executable: true, .. }
        ));
        assert!(matches!(
            &manifest.files["lib/libjli.so"],
            RuntimeFile::Link { target } if target == "../jli/libjli.so"
        ));
    }

    #[test]
    fn installed_java_requires_completed_install() {
        let tmp = tempfile::tempdir().unwrap();
        let manager = JreManager::new(tmp.path().to_path_buf(), NetworkClient::new());
        assert!(manager.installed_java("java-runtime-delta").is_none());

        let Some(platform) = platform_key() else {
            return;
        };
        let java = java_in(&manager.component_dir("java-runtime-delta", platform));
        std::fs::create_dir_all(java.parent().unwrap()).unwrap();
        std::fs::write(&java, b"").unwrap();
        // An interrupted install can leave java behind without the rest.
        assert!(manager.installed_java("java-runtime-delta").is_none());

        std::fs::write(manager.version_marker("java-runtime-delta", platform), "17.0.8").unwrap();
        assert_eq!(manager.installed_java("java-runtime-delta"), Some(java));
    }

    #[tokio::test]
    async fn install_files_replaces_partial_files_and_links() {
        let body: &'static [u8] = b"java-binary";
        let base_url = crate::networking::test_server::serve_once("200 OK", body).await;
        let tmp = tempfile::tempdir().unwrap();
        let manager = JreManager::new(tmp.path().to_path_buf(), NetworkClient::new());
        let base = tmp.path().join("component");
        std::fs::create_dir_all(base.join("bin")).unwrap();
        std::fs::write(base.join("bin/java"), b"trunc").unwrap();

        let manifest: RuntimeManifest = serde_json::from_value(serde_json::json!({"files": {
            "bin": {"type": "directory"},
            "bin/java": {"type": "file", "executable": true, "downloads": {
                "raw": {"sha1": crate::networking::sha1_hex(body), "url": format!("{base_url}/java")}
            }},
            "lib/current": {"type": "link", "target": "../bin"}
        }}))
        .unwrap();
        let progress: ProgressFn = Arc::new(|_| {});

        manager.install_files(manifest, &base, &progress).await.unwrap();

        assert_eq!(std::fs::read(base.join("bin/java")).unwrap(), body);
        if cfg!(unix) {
            assert!(base.join("lib/current").symlink_metadata().is_ok());
        }
    }
}
