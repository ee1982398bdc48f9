use std::sync::Arc;

use log::{error, info, warn};
use tokio::sync::mpsc;

use crate::engine::state::{AppEvent, LaunchRequest, Notice, Prompt, UserAction};
use crate::minecraft::{
    FABRIC_LOADER_VERSION, GameBackend, LaunchOptions, MinecraftInstaller, ProgressFn,
    is_fabric_id,
};
use crate::mods::{ModPackage, ModService};
use crate::process::{self, ProcessLauncher};
use crate::storage::StorageManager;
use crate::util::ProgressCounter;

pub mod models;
pub mod state;

pub const LAUNCHER_NAME: &str = "MNC_KA Launcher";
pub const LAUNCHER_VERSION: &str = "1.0.0";

pub struct LauncherEngine<B: GameBackend = MinecraftInstaller> {
    backend: B,
    storage: StorageManager,
    mods: ModService,
    process: ProcessLauncher,
}

impl<B: GameBackend> LauncherEngine<B> {
    pub fn new(
        backend: B,
        storage: StorageManager,
        mods: ModService,
        process: ProcessLauncher,
    ) -> Self {
        Self {
            backend,
            storage,
            mods,
            process,
        }
    }

    /// Run one action to completion. Takes `&self` so a long install never
    /// holds up a launch or a prompt answer running beside it.
    pub async fn handle_action(
        &self,
        action: UserAction,
        updates: &mpsc::UnboundedSender<AppEvent>,
    ) {
        match action {
            UserAction::Bootstrap => {
                info!("action: Bootstrap");
                self.publish_fabric_versions(updates);
            }
            UserAction::InstallVersion { version } => {
                info!("action: InstallVersion {version}");
                self.install_version(&version, updates).await;
            }
            UserAction::InstallFabric {
                version,
                offer_mods,
            } => {
                info!("action: InstallFabric {version}");
                self.install_fabric(&version, offer_mods, updates).await;
            }
            UserAction::OfferExtraMods { version } => {
                self.offer_extra_mods(&version, updates);
            }
            UserAction::InstallExtraMods {
                version,
                skin,
                optimization,
            } => {
                info!("action: InstallExtraMods {version} (skin={skin}, optimization={optimization})");
                self.install_extra_mods(&version, skin, optimization, updates)
                    .await;
            }
            UserAction::DownloadPackages {
                packages,
                confirm_api,
            } => {
                self.download_packages(packages, confirm_api, updates).await;
            }
            UserAction::Launch(request) => {
                info!("action: Launch {:?}", request.version);
                if let Err(notice) = self.launch(request) {
                    warn!("launch: refused ({notice:?})");
                    updates.send(AppEvent::Notice(notice)).ok();
                }
            }
        }
    }

    fn progress_sink(updates: &mpsc::UnboundedSender<AppEvent>) -> ProgressFn {
        let tx = updates.clone();
        Arc::new(move |step| {
            tx.send(AppEvent::Progress(step)).ok();
        })
    }

    fn publish_fabric_versions(&self, updates: &mpsc::UnboundedSender<AppEvent>) {
        let map = self.storage.fabric_versions();
        info!("storage: {} Fabric versions installed", map.len());
        updates.send(AppEvent::FabricVersions(map)).ok();
    }

    async fn install_version(&self, version: &str, updates: &mpsc::UnboundedSender<AppEvent>) {
        updates
            .send(AppEvent::Notice(Notice::InstallingVersion {
                version: version.to_owned(),
            }))
            .ok();
        let result = self
            .backend
            .install_version(version, Self::progress_sink(updates))
            .await;
        updates.send(AppEvent::TaskFinished).ok();

        let notice = match result {
            Ok(()) => {
                info!("install: {version} installed");
                Notice::VersionInstalled {
                    version: version.to_owned(),
                }
            }
            Err(err) => {
                error!("install: {version} failed: {err}");
                Notice::VersionInstallFailed {
                    version: version.to_owned(),
                    error: err,
                }
            }
        };
        updates.send(AppEvent::Notice(notice)).ok();
        self.publish_fabric_versions(updates);
    }

    async fn install_fabric(
        &self,
        version: &str,
        offer_mods: bool,
        updates: &mpsc::UnboundedSender<AppEvent>,
    ) {
        updates
            .send(AppEvent::Notice(Notice::InstallingFabric {
                loader: FABRIC_LOADER_VERSION.to_owned(),
                version: version.to_owned(),
            }))
            .ok();
        let result = self
            .backend
            .install_fabric(version, FABRIC_LOADER_VERSION, Self::progress_sink(updates))
            .await;
        updates.send(AppEvent::TaskFinished).ok();

        let fabric_id = match result {
            Ok(id) => id,
            Err(err) => {
                error!("fabric: install for {version} failed: {err}");
                updates
                    .send(AppEvent::Notice(Notice::FabricInstallFailed {
                        version: version.to_owned(),
                        error: err,
                    }))
                    .ok();
                updates
                    .send(AppEvent::FabricFailed {
                        version: version.to_owned(),
                    })
                    .ok();
                return;
            }
        };

        info!("fabric: {fabric_id} ready");
        updates
            .send(AppEvent::FabricReady {
                version: version.to_owned(),
                fabric_id,
            })
            .ok();
        if offer_mods {
            updates
                .send(AppEvent::Notice(Notice::FabricInstalled {
                    loader: FABRIC_LOADER_VERSION.to_owned(),
                    version: version.to_owned(),
                }))
                .ok();
            self.download_packages(vec![ModPackage::FabricApi], false, updates)
                .await;
            self.offer_extra_mods(version, updates);
        }
    }

    /// Ask about optional mods unless the question was already asked for
    /// `version`. Returns whether the offer was sent.
    fn offer_extra_mods(&self, version: &str, updates: &mpsc::UnboundedSender<AppEvent>) -> bool {
        if self.storage.has_mods_marker(version) {
            info!("mods: extras already offered for {version}");
            return false;
        }
        updates
            .send(AppEvent::OfferExtraMods {
                version: version.to_owned(),
            })
            .ok();
        true
    }

    async fn install_extra_mods(
        &self,
        version: &str,
        skin: bool,
        optimization: bool,
        updates: &mpsc::UnboundedSender<AppEvent>,
    ) {
        // The offer is one-time regardless of the answers.
        if let Err(err) = self.storage.write_mods_marker(version) {
            error!("mods: {err}");
            updates
                .send(AppEvent::Notice(Notice::MarkerWriteFailed { error: err }))
                .ok();
        }

        let mut packages = Vec::new();
        if skin {
            packages.push(ModPackage::SkinOverrides);
        }
        if optimization {
            packages.extend([ModPackage::Sodium, ModPackage::Lithium]);
        }
        if !packages.is_empty() {
            self.download_packages(packages, true, updates).await;
        }
    }

    async fn download_packages(
        &self,
        packages: Vec<ModPackage>,
        confirm_api: bool,
        updates: &mpsc::UnboundedSender<AppEvent>,
    ) {
        let needs_api = packages.iter().any(|p| p.requires_fabric_api())
            && !packages.contains(&ModPackage::FabricApi);
        if confirm_api && needs_api && !self.storage.has_fabric_api() {
            info!("mods: Fabric API missing, asking before download");
            updates
                .send(AppEvent::Prompt(Prompt::FabricApiRequired { queued: packages }))
                .ok();
            return;
        }

        for package in packages {
            let progress = ProgressCounter::new();
            updates
                .send(AppEvent::DownloadStarted {
                    name: package.name().to_owned(),
                    progress: progress.clone(),
                })
                .ok();
            let notice = match self.mods.download(package, &progress).await {
                Ok(_) => Notice::ModDownloaded {
                    name: package.name().to_owned(),
                },
                Err(err) => {
                    error!("mods: {package} failed: {err}");
                    Notice::ModDownloadFailed {
                        name: package.name().to_owned(),
                        error: err,
                    }
                }
            };
            updates.send(AppEvent::Notice(notice)).ok();
        }
    }

    fn launch(&self, request: LaunchRequest) -> Result<(), Notice> {
        let username = request.username.trim();
        if username.is_empty() || request.ram_gb == 0 {
            return Err(Notice::MissingUserConfig);
        }
        let Some(version) = request.version.filter(|v| !v.is_empty()) else {
            return Err(Notice::MissingVersion);
        };
        if is_fabric_id(&version) && !self.storage.version_jar_exists(&version) {
            return Err(Notice::MissingFabricJar {
                jar: format!("{version}.jar"),
                folder: self.storage.version_dir(&version).display().to_string(),
            });
        }

        process::warn_if_exceeds_memory(request.ram_gb);
        let options = LaunchOptions {
            username: username.to_owned(),
            jvm_arguments: process::memory_flags(request.ram_gb),
            launcher_name: LAUNCHER_NAME.to_owned(),
            launcher_version: LAUNCHER_VERSION.to_owned(),
            ..LaunchOptions::default()
        };
        let command = self
            .backend
            .launch_command(&version, &options)
            .map_err(|error| Notice::LaunchFailed { error })?;
        self.process
            .run_detached(&command, self.storage.root())
            .map_err(|error| Notice::LaunchFailed { error })?;
        info!("launch: {version} started as {username}");
        Ok(())
    }
}
