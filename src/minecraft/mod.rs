//! Version installation and command-line assembly for the Java edition client.

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;

use crate::env;
use crate::jre::JreManager;
use crate::networking::NetworkClient;

pub mod command;
pub mod fabric;
pub mod install;
pub mod manifest;
pub mod version;

/// Loader version installed when the user asks for Fabric.
pub const FABRIC_LOADER_VERSION: &str = "0.16.10";
pub const FABRIC_ID_PREFIX: &str = "fabric-loader-";

/// Step reported while a version, loader or runtime is being installed.
#[derive(Clone, Debug, PartialEq)]
pub struct InstallProgress {
    pub status: String,
    pub current: usize,
    pub max: usize,
}

impl InstallProgress {
    pub fn new(status: impl Into<String>, current: usize, max: usize) -> Self {
        Self {
            status: status.into(),
            current,
            max,
        }
    }

    pub fn status(status: impl Into<String>) -> Self {
        Self::new(status, 0, 0)
    }

    #[must_use]
    pub fn fraction(&self) -> Option<f32> {
        (self.max > 0).then(|| (self.current as f32 / self.max as f32).min(1.0))
    }
}

pub type ProgressFn = Arc<dyn Fn(InstallProgress) + Send + Sync>;

pub fn fabric_version_id(loader: &str, base: &str) -> String {
    format!("{FABRIC_ID_PREFIX}{loader}-{base}")
}

pub fn is_fabric_id(id: &str) -> bool {
    id.starts_with(FABRIC_ID_PREFIX)
}

/// Split `fabric-loader-<loader>-<base>` into `(loader, base)`.
pub fn parse_fabric_id(id: &str) -> Option<(&str, &str)> {
    let rest = id.strip_prefix(FABRIC_ID_PREFIX)?;
    let (loader, base) = rest.split_once('-')?;
    (!loader.is_empty() && !base.is_empty()).then_some((loader, base))
}

/// Per-launch settings substituted into the version's argument templates.
#[derive(Clone, Debug, Default)]
pub struct LaunchOptions {
    pub username: String,
    pub uuid: String,
    pub token: String,
    pub jvm_arguments: Vec<String>,
    pub launcher_name: String,
    pub launcher_version: String,
    /// Overrides the Java executable chosen from the version's runtime.
    pub java: Option<PathBuf>,
}

/// Everything the launcher needs from a game installer.
pub trait GameBackend: Send + Sync + 'static {
    fn install_version(
        &self,
        version: &str,
        progress: ProgressFn,
    ) -> impl Future<Output = Result<(), String>> + Send;

    /// Install Fabric `loader` on top of `base` and return the new version id.
    fn install_fabric(
        &self,
        base: &str,
        loader: &str,
        progress: ProgressFn,
    ) -> impl Future<Output = Result<String, String>> + Send;

    fn launch_command(&self, version: &str, options: &LaunchOptions)
    -> Result<Vec<String>, String>;
}

/// Installs into the launcher's folder layout from Mojang and Fabric servers.
#[derive(Clone)]
pub struct MinecraftInstaller {
    root: PathBuf,
    network: NetworkClient,
    jre: JreManager,
}

impl MinecraftInstaller {
    pub fn new(root: PathBuf, network: NetworkClient) -> Self {
        let jre = JreManager::new(env::runtime_dir(&root), network.clone());
        Self { root, network, jre }
    }

    fn context<'a>(&'a self, progress: &'a ProgressFn) -> install::InstallContext<'a> {
        install::InstallContext {
            root: &self.root,
            network: &self.network,
            jre: &self.jre,
            progress,
        }
    }
}

impl GameBackend for MinecraftInstaller {
    async fn install_version(&self, version: &str, progress: ProgressFn) -> Result<(), String> {
        let ctx = self.context(&progress);
        install::install_version(&ctx, version.to_owned()).await
    }

    async fn install_fabric(
        &self,
        base: &str,
        loader: &str,
        progress: ProgressFn,
    ) -> Result<String, String> {
        let ctx = self.context(&progress);
        fabric::install(&ctx, base, loader).await
    }

    fn launch_command(
        &self,
        version: &str,
        options: &LaunchOptions,
    ) -> Result<Vec<String>, String> {
        command::build(&self.root, version, options, &self.jre)
    }
}
