use std::fmt;
use std::path::PathBuf;

use log::{info, warn};
use reqwest::Url;
use tokio::fs;

use crate::networking::NetworkClient;
use crate::util::{ProgressCounter, progress_percent};

const FABRIC_API_URL: &str =
    "https://cdn.modrinth.com/data/P7dR8mSH/versions/ZNwYCTsk/fabric-api-0.118.0%2B1.21.4.jar";
const SODIUM_URL: &str =
    "https://cdn.modrinth.com/data/AANobbMI/versions/FRXt5xaI/sodium-fabric-0.6.10%2Bmc1.21.4.jar";
const LITHIUM_URL: &str =
    "https://cdn.modrinth.com/data/gvQqBUqZ/versions/kLc5Oxr4/lithium-fabric-0.14.8%2Bmc1.21.4.jar";
const SKIN_OVERRIDES_URL: &str =
    "https://cdn.modrinth.com/data/GON0Fdk5/versions/MU0u3ea4/skin_overrides-2.2.3%2B1.21.4.jar";

/// Mods the launcher knows how to fetch.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ModPackage {
    FabricApi,
    Sodium,
    Lithium,
    SkinOverrides,
}

impl ModPackage {
    pub fn name(self) -> &'static str {
        match self {
            ModPackage::FabricApi => "FabricAPI",
            ModPackage::Sodium => "Sodium",
            ModPackage::Lithium => "Lithium",
            ModPackage::SkinOverrides => "SkinOverrides",
        }
    }

    pub fn url(self) -> &'static str {
        match self {
            ModPackage::FabricApi => FABRIC_API_URL,
            ModPackage::Sodium => SODIUM_URL,
            ModPackage::Lithium => LITHIUM_URL,
            ModPackage::SkinOverrides => SKIN_OVERRIDES_URL,
        }
    }

    /// Everything except Fabric API itself needs Fabric API to load.
    pub fn requires_fabric_api(self) -> bool {
        self != ModPackage::FabricApi
    }
}

impl fmt::Display for ModPackage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Percent-decoded last path segment of a download URL.
pub fn file_name_for_url(url: &str) -> Result<String, String> {
    let parsed = Url::parse(url).map_err(|e| format!("invalid mod URL {url}: {e}"))?;
    let segment = parsed
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .filter(|segment| !segment.is_empty())
        .ok_or_else(|| format!("mod URL {url} has no file name"))?;
    let name = urlencoding::decode(segment)
        .map_err(|e| format!("mod URL {url} has an invalid file name: {e}"))?
        .into_owned();
    if name.contains(['/', '\\']) || name == ".." {
        return Err(format!("mod URL {url} has an unsafe file name"));
    }
    Ok(name)
}

#[derive(Clone)]
pub struct ModService {
    network: NetworkClient,
    mods_dir: PathBuf,
}

impl ModService {
    pub fn new(mods_dir: PathBuf, network: NetworkClient) -> Self {
        Self { network, mods_dir }
    }

    pub async fn download(
        &self,
        package: ModPackage,
        progress: &ProgressCounter,
    ) -> Result<PathBuf, String> {
        self.download_url(package.url(), progress).await
    }

    /// Download a jar into the mods folder. `progress` reaches 100 whether
    /// the download succeeds or not.
    pub async fn download_url(
        &self,
        url: &str,
        progress: &ProgressCounter,
    ) -> Result<PathBuf, String> {
        let result = self.fetch(url, progress).await;
        progress.finish();
        match &result {
            Ok(path) => info!("mods: saved {}", path.display()),
            Err(err) => warn!("mods: download of {url} failed: {err}"),
        }
        result
    }

    async fn fetch(&self, url: &str, progress: &ProgressCounter) -> Result<PathBuf, String> {
        let name = file_name_for_url(url)?;
        fs::create_dir_all(&self.mods_dir)
            .await
            .map_err(|e| format!("unable to create mods dir: {e}"))?;
        let dest = self.mods_dir.join(name);
        self.network
            .download_to_path(url, &dest, |downloaded, total| {
                progress.set(progress_percent(downloaded, total));
            })
            .await?;
        Ok(dest)
    }
}
