use std::collections::HashMap;

use crate::minecraft::InstallProgress;
use crate::mods::ModPackage;
use crate::util::ProgressCounter;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MessageKind {
    Info,
    Error,
}

// Outcomes the UI turns into message boxes; wording lives in the i18n layer.
#[derive(Clone, Debug, PartialEq)]
pub enum Notice {
    InstallingVersion { version: String },
    VersionInstalled { version: String },
    VersionInstallFailed { version: String, error: String },
    InstallingFabric { loader: String, version: String },
    FabricInstalled { loader: String, version: String },
    FabricInstallFailed { version: String, error: String },
    ModDownloaded { name: String },
    ModDownloadFailed { name: String, error: String },
    MarkerWriteFailed { error: String },
    MissingUserConfig,
    MissingVersion,
    MissingFabricJar { jar: String, folder: String },
    LaunchFailed { error: String },
}

impl Notice {
    pub fn kind(&self) -> MessageKind {
        match self {
            Notice::InstallingVersion { .. }
            | Notice::VersionInstalled { .. }
            | Notice::InstallingFabric { .. }
            | Notice::FabricInstalled { .. }
            | Notice::ModDownloaded { .. } => MessageKind::Info,
            _ => MessageKind::Error,
        }
    }
}

/// Yes/no question the engine needs answered before it can continue.
#[derive(Clone, Debug, PartialEq)]
pub enum Prompt {
    /// `queued` needs Fabric API, which is not in the mods folder.
    FabricApiRequired { queued: Vec<ModPackage> },
}

impl Prompt {
    /// Action to run once the user has answered.
    pub fn answer(&self, accepted: bool) -> UserAction {
        match self {
            Prompt::FabricApiRequired { queued } => {
                let mut packages = Vec::with_capacity(queued.len() + 1);
                if accepted {
                    packages.push(ModPackage::FabricApi);
                }
                packages.extend(queued.iter().copied());
                UserAction::DownloadPackages {
                    packages,
                    confirm_api: false,
                }
            }
        }
    }
}

// Everything the engine reports back to the UI thread.
#[derive(Clone, Debug)]
pub enum AppEvent {
    Notice(Notice),
    Prompt(Prompt),
    /// Ask whether to add the optional mods for `version`.
    OfferExtraMods { version: String },
    DownloadStarted { name: String, progress: ProgressCounter },
    Progress(InstallProgress),
    TaskFinished,
    FabricVersions(HashMap<String, String>),
    FabricReady { version: String, fabric_id: String },
    FabricFailed { version: String },
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LaunchRequest {
    pub username: String,
    pub ram_gb: u32,
    pub version: Option<String>,
}

// Actions triggered by the user from the UI layer.
#[derive(Clone, Debug, PartialEq)]
pub enum UserAction {
    /// Rescan installed Fabric versions.
    Bootstrap,
    InstallVersion {
        version: String,
    },
    /// `offer_mods` chains Fabric API and the optional-mods question after
    /// the loader install.
    InstallFabric {
        version: String,
        offer_mods: bool,
    },
    OfferExtraMods {
        version: String,
    },
    InstallExtraMods {
        version: String,
        skin: bool,
        optimization: bool,
    },
    DownloadPackages {
        packages: Vec<ModPackage>,
        confirm_api: bool,
    },
    Launch(LaunchRequest),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepting_api_prompt_prepends_fabric_api() {
        let prompt = Prompt::FabricApiRequired {
            queued: vec![ModPackage::Sodium, ModPackage::Lithium],
        };
        assert_eq!(
            prompt.answer(true),
            UserAction::DownloadPackages {
                packages: vec![ModPackage::FabricApi, ModPackage::Sodium, ModPackage::Lithium],
                confirm_api: false,
            }
        );
        assert_eq!(
            prompt.answer(false),
            UserAction::DownloadPackages {
                packages: vec![ModPackage::Sodium, ModPackage::Lithium],
                confirm_api: false,
            }
        );
    }

    #[test]
    fn failures_are_errors() {
        assert_eq!(Notice::MissingVersion.kind(), MessageKind::Error);
        assert_eq!(
            Notice::ModDownloaded {
                name: "Sodium".into()
            }
            .kind(),
            MessageKind::Info
        );
    }
}
