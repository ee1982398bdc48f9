use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use futures_util::future::BoxFuture;
use futures_util::stream::{self, StreamExt};
use log::{debug, info};
use serde::Deserialize;
use serde_json::Value;
use zip::ZipArchive;

use super::manifest::VersionManifest;
use super::version::{self, DownloadArtifact, VersionDownloads, VersionJson};
use super::{InstallProgress, ProgressFn};
use crate::env;
use crate::jre::JreManager;
use crate::networking::NetworkClient;

const RESOURCES_URL: &str = "https://resources.download.minecraft.net";
const LIBRARY_DOWNLOADS: usize = 8;
const ASSET_DOWNLOADS: usize = 16;

/// Borrowed state shared by one installation run.
pub struct InstallContext<'a> {
    pub root: &'a Path,
    pub network: &'a NetworkClient,
    pub jre: &'a JreManager,
    pub progress: &'a ProgressFn,
}

impl InstallContext<'_> {
    fn report(&self, progress: InstallProgress) {
        (self.progress)(progress);
    }
}

#[derive(Debug, Deserialize)]
struct AssetIndex {
    objects: HashMap<String, AssetObject>,
}

#[derive(Debug, Deserialize)]
struct AssetObject {
    hash: String,
}

struct DownloadJob {
    url: String,
    dest: PathBuf,
    sha1: Option<String>,
}

/// Install `id` and, first, every version it inherits from.
///
/// A version JSON already on disk is used as-is; otherwise it is fetched from
/// Mojang's manifest.
pub fn install_version<'a>(
    ctx: &'a InstallContext<'a>,
    id: String,
) -> BoxFuture<'a, Result<(), String>> {
    Box::pin(async move {
        info!("install: version {id}");
        ctx.report(InstallProgress::status(format!("Installing {id}")));
        let raw = ensure_version_json(ctx, &id).await?;

        let merged = match raw.get("inheritsFrom").and_then(Value::as_str) {
            Some(parent) if parent != id => {
                let parent = parent.to_owned();
                install_version(ctx, parent.clone()).await?;
                version::inherit(&raw, &version::load_merged(ctx.root, &parent)?)
            }
            _ => raw.clone(),
        };
        let data = version::parse(merged)?;

        install_libraries(ctx, &data).await?;
        install_assets(ctx, &data).await?;
        install_client_jar(ctx, &id, &raw, &data).await?;
        if let Some(java) = &data.java_version {
            ctx.jre.ensure_runtime(&java.component, ctx.progress).await?;
        }

        info!("install: {id} ready");
        ctx.report(InstallProgress::status(format!("Installed {id}")));
        Ok(())
    })
}

async fn ensure_version_json(ctx: &InstallContext<'_>, id: &str) -> Result<Value, String> {
    let path = env::version_json_path(ctx.root, id);
    if path.exists() {
        debug!("install: using local {}", path.display());
        return version::read_raw(ctx.root, id);
    }

    ctx.report(InstallProgress::status("Fetching version list"));
    let manifest = VersionManifest::fetch(ctx.network).await?;
    let entry = manifest
        .find(id)
        .ok_or_else(|| format!("version {id} does not exist"))?;
    ctx.network
        .download_verified(&entry.url, &path, entry.sha1.as_deref())
        .await?;
    version::read_raw(ctx.root, id)
}

async fn install_libraries(ctx: &InstallContext<'_>, data: &VersionJson) -> Result<(), String> {
    let libraries_dir = env::libraries_dir(ctx.root);
    let mut jobs = Vec::new();
    let mut native_jars = Vec::new();

    for lib in data.libraries.iter().filter(|lib| lib.is_allowed()) {
        if let (Some(url), Some(path)) = (lib.artifact_url(), lib.artifact_path())
            && !url.is_empty()
        {
            jobs.push(DownloadJob {
                url,
                dest: libraries_dir.join(path),
                sha1: lib.artifact_sha1().map(str::to_owned),
            });
        }
        if let Some(native) = lib.native_artifact() {
            let Some(dest) = native_path(&libraries_dir, &lib.name, lib.native_classifier(), native)
            else {
                continue;
            };
            jobs.push(DownloadJob {
                url: native.url.clone(),
                dest: dest.clone(),
                sha1: native.sha1.clone(),
            });
            let exclude = lib
                .extract
                .as_ref()
                .map(|rules| rules.exclude.clone())
                .unwrap_or_default();
            native_jars.push((dest, exclude));
        }
    }

    download_all(ctx, "Downloading libraries", jobs, LIBRARY_DOWNLOADS).await?;

    let natives_dir = env::natives_dir(ctx.root, &data.id);
    for (jar, exclude) in native_jars {
        extract_natives(&jar, &natives_dir, &exclude)?;
    }
    Ok(())
}

fn native_path(
    libraries_dir: &Path,
    name: &str,
    classifier: Option<String>,
    native: &DownloadArtifact,
) -> Option<PathBuf> {
    if let Some(path) = &native.path {
        return Some(libraries_dir.join(path));
    }
    let classifier = classifier?;
    version::maven_path(&format!("{name}:{classifier}")).map(|path| libraries_dir.join(path))
}

async fn install_assets(ctx: &InstallContext<'_>, data: &VersionJson) -> Result<(), String> {
    let Some(index) = &data.asset_index else {
        return Ok(());
    };
    let assets_dir = env::assets_dir(ctx.root);
    let index_path = assets_dir.join("indexes").join(format!("{}.json", index.id));
    ctx.report(InstallProgress::status("Downloading asset index"));
    ctx.network
        .download_verified(&index.url, &index_path, index.sha1.as_deref())
        .await?;

    let text = tokio::fs::read_to_string(&index_path)
        .await
        .map_err(|e| format!("failed to read {}: {e}", index_path.display()))?;
    let parsed: AssetIndex = serde_json::from_str(&text)
        .map_err(|e| format!("invalid asset index {}: {e}", index_path.display()))?;

    let objects_dir = assets_dir.join("objects");
    let mut seen = HashSet::new();
    let jobs: Vec<DownloadJob> = parsed
        .objects
        .into_values()
        .filter(|object| seen.insert(object.hash.clone()))
        .filter_map(|object| {
            let prefix = object.hash.get(..2)?.to_owned();
            let dest = objects_dir.join(&prefix).join(&object.hash);
            (!dest.exists()).then(|| DownloadJob {
                url: format!("{RESOURCES_URL}/{prefix}/{}", object.hash),
                dest,
                sha1: Some(object.hash),
            })
        })
        .collect();

    download_all(ctx, "Downloading assets", jobs, ASSET_DOWNLOADS).await
}

async fn install_client_jar(
    ctx: &InstallContext<'_>,
    id: &str,
    raw: &Value,
    data: &VersionJson,
) -> Result<(), String> {
    let jar = env::version_jar_path(ctx.root, id);
    let own_client = raw
        .get("downloads")
        .cloned()
        .and_then(|value| serde_json::from_value::<VersionDownloads>(value).ok())
        .and_then(|downloads| downloads.client);

    if let Some(client) = own_client {
        ctx.report(InstallProgress::status(format!("Downloading {id}.jar")));
        return ctx
            .network
            .download_verified(&client.url, &jar, client.sha1.as_deref())
            .await;
    }

    // Loader profiles ship no jar of their own and run on the parent's.
    if let Some(parent) = &data.inherits_from
        && !jar.exists()
    {
        let parent_jar = env::version_jar_path(ctx.root, parent);
        if !parent_jar.exists() {
            return Err(format!("{} is missing", parent_jar.display()));
        }
        tokio::fs::copy(&parent_jar, &jar)
            .await
            .map_err(|e| format!("failed to copy {}: {e}", parent_jar.display()))?;
        debug!("install: copied {} to {}", parent_jar.display(), jar.display());
    }
    Ok(())
}

async fn download_all(
    ctx: &InstallContext<'_>,
    label: &str,
    jobs: Vec<DownloadJob>,
    parallel: usize,
) -> Result<(), String> {
    let total = jobs.len();
    if total == 0 {
        return Ok(());
    }
    ctx.report(InstallProgress::new(label, 0, total));
    let completed = Arc::new(AtomicUsize::new(0));

    let results: Vec<Result<(), String>> = stream::iter(jobs)
        .map(|job| {
            let completed = completed.clone();
            async move {
                ctx.network
                    .download_verified(&job.url, &job.dest, job.sha1.as_deref())
                    .await?;
                let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
                ctx.report(InstallProgress::new(label, done, total));
                Ok(())
            }
        })
        .buffer_unordered(parallel)
        .collect()
        .await;
    results.into_iter().collect()
}

/// Unpack a natives jar, skipping `META-INF` and the `exclude` prefixes.
fn extract_natives(jar: &Path, dest: &Path, exclude: &[String]) -> Result<(), String> {
    let file = File::open(jar).map_err(|e| format!("failed to open {}: {e}", jar.display()))?;
    let mut archive =
        ZipArchive::new(file).map_err(|e| format!("invalid natives jar {}: {e}", jar.display()))?;
    std::fs::create_dir_all(dest)
        .map_err(|e| format!("unable to create {}: {e}", dest.display()))?;

    for index in 0..archive.len() {
        let mut entry = archive
            .by_index(index)
            .map_err(|e| format!("failed to read {}: {e}", jar.display()))?;
        let name = entry.name().to_owned();
        if name.starts_with("META-INF/") || exclude.iter().any(|prefix| name.starts_with(prefix)) {
            continue;
        }
        let Some(relative) = entry.enclosed_name() else {
            continue;
        };
        let out = dest.join(relative);
        if entry.is_dir() {
            std::fs::create_dir_all(&out)
                .map_err(|e| format!("unable to create {}: {e}", out.display()))?;
            continue;
        }
        if let Some(parent) = out.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| format!("unable to create {}: {e}", parent.display()))?;
        }
        let mut target =
            File::create(&out).map_err(|e| format!("failed to create {}: {e}", out.display()))?;
        io::copy(&mut entry, &mut target)
            .map_err(|e| format!("failed to extract {name}: {e}"))?;
    }
    debug!("install: extracted natives from {}", jar.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use serde_json::json;
    use zip::write::SimpleFileOptions;

    use super::*;

    fn write_jar(path: &Path, entries: &[(&str, &[u8])]) {
        let mut writer = zip::ZipWriter::new(File::create(path).unwrap());
        for (name, data) in entries {
            writer.start_file(*name, SimpleFileOptions::default()).unwrap();
            writer.write_all(data).unwrap();
        }
        writer.finish().unwrap();
    }

    fn write_version(root: &Path, id: &str, value: &Value) {
        let path = env::version_json_path(root, id);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, value.to_string()).unwrap();
    }

    #[test]
    fn extracts_natives_honouring_excludes() {
        let tmp = tempfile::tempdir().unwrap();
        let jar = tmp.path().join("natives.jar");
        write_jar(
            &jar,
            &[
                ("liblwjgl.so", b"native"),
                ("META-INF/MANIFEST.MF", b"manifest"),
                ("skip/me.txt", b"nope"),
            ],
        );
        let dest = tmp.path().join("natives");

        extract_natives(&jar, &dest, &["skip/".to_owned()]).unwrap();

        assert_eq!(std::fs::read(dest.join("liblwjgl.so")).unwrap(), b"native");
        assert!(!dest.join("META-INF").exists());
        assert!(!dest.join("skip").exists());
    }

    #[tokio::test]
    async fn loader_version_installs_on_local_parent() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();
        write_version(root, "1.21.4", &json!({"id": "1.21.4", "type": "release"}));
        std::fs::write(env::version_jar_path(root, "1.21.4"), b"client").unwrap();
        write_version(
            root,
            "fabric-loader-0.16.10-1.21.4",
            &json!({"id": "fabric-loader-0.16.10-1.21.4", "inheritsFrom": "1.21.4"}),
        );

        let network = NetworkClient::new();
        let jre = JreManager::new(env::runtime_dir(root), network.clone());
        let steps = Arc::new(std::sync::Mutex::new(Vec::new()));
        let sink = steps.clone();
        let progress: ProgressFn = Arc::new(move |step| sink.lock().unwrap().push(step));
        let ctx = InstallContext {
            root,
            network: &network,
            jre: &jre,
            progress: &progress,
        };

        install_version(&ctx, "fabric-loader-0.16.10-1.21.4".to_owned())
            .await
            .unwrap();

        assert_eq!(
            std::fs::read(env::version_jar_path(root, "fabric-loader-0.16.10-1.21.4")).unwrap(),
            b"client"
        );
        let steps = steps.lock().unwrap();
        assert!(steps.iter().any(|s| s.status == "Installed fabric-loader-0.16.10-1.21.4"));
    }

    #[tokio::test]
    async fn client_jar_comes_from_the_version_downloads_block() {
        let body: &'static [u8] = b"client-jar";
        let base = crate::networking::test_server::serve_once("200 OK", body).await;
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();
        let raw = json!({
            "id": "1.21.4",
            "downloads": {"client": {
                "url": format!("{base}/client.jar"),
                "sha1": crate::networking::sha1_hex(body),
                "size": body.len()
            }}
        });
        let data: VersionJson = serde_json::from_value(raw.clone()).unwrap();

        let network = NetworkClient::new();
        let jre = JreManager::new(env::runtime_dir(root), network.clone());
        let progress: ProgressFn = Arc::new(|_| {});
        let ctx = InstallContext {
            root,
            network: &network,
            jre: &jre,
            progress: &progress,
        };

        install_client_jar(&ctx, "1.21.4", &raw, &data).await.unwrap();

        assert_eq!(
            std::fs::read(env::version_jar_path(root, "1.21.4")).unwrap(),
            body
        );
    }
}
