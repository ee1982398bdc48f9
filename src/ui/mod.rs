use std::collections::{HashMap, VecDeque};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use eframe::egui::{self, Align2, Frame, Vec2};
use log::{error, info, warn};
use tokio::runtime::{Builder, Runtime};
use tokio::sync::mpsc;

use crate::audio::MusicPlayer;
use crate::engine::LauncherEngine;
use crate::engine::models::{UserConfig, parse_user_config};
use crate::engine::state::{AppEvent, LaunchRequest, MessageKind, Notice, UserAction};
use crate::minecraft::{InstallProgress, MinecraftInstaller};
use crate::mods::ModService;
use crate::networking::NetworkClient;
use crate::process::ProcessLauncher;
use crate::storage::StorageManager;
use crate::util::ProgressCounter;

mod buttons;
mod cache;
mod dialogs;
mod i18n;
mod picker;

use self::buttons::{ButtonLayer, MenuAction};
use self::dialogs::{Dialog, DialogOutcome, ExtraModsStep, PromptOutcome, VersionPrompt};
use self::i18n::{I18n, Language};
use self::picker::{PickerCommand, VersionPicker};

const GAME_URL: &str = "https://oscarito1600.github.io/oscarito16003.github.io/Juego.html";
const CHANNEL_URL: &str = "https://www.youtube.com/@MinecraftKA";
/// Download bars are polled on this interval.
const REPAINT_INTERVAL: Duration = Duration::from_millis(100);

/// First song in `songs/`, or the error dialog to show instead.
fn song_to_play(storage: &StorageManager, i18n: I18n) -> Result<PathBuf, Dialog> {
    match storage.first_song() {
        Ok(Some(song)) => Ok(song),
        Ok(None) => Err(Dialog::message(MessageKind::Error, i18n.no_songs())),
        Err(err) => {
            warn!("audio: {err}");
            Err(Dialog::message(MessageKind::Error, i18n.songs_unreadable(&err)))
        }
    }
}

fn build_runtime() -> Arc<Runtime> {
    match Runtime::new() {
        Ok(rt) => Arc::new(rt),
        Err(err) => {
            warn!(
                "ui: failed to create multithreaded runtime ({}); trying single-threaded runtime",
                err
            );
            match Builder::new_current_thread().enable_all().build() {
                Ok(rt) => Arc::new(rt),
                Err(fallback_err) => {
                    error!(
                        "ui: failed to create any Tokio runtime ({}); terminating launcher",
                        fallback_err
                    );
                    std::process::exit(1);
                }
            }
        }
    }
}

#[derive(Default)]
struct ConfigForm {
    username: String,
    ram: String,
}

struct DownloadBar {
    name: String,
    progress: ProgressCounter,
}

pub struct LauncherApp {
    runtime: Arc<Runtime>,
    engine: Arc<LauncherEngine>,
    updates_rx: mpsc::UnboundedReceiver<AppEvent>,
    updates_tx: mpsc::UnboundedSender<AppEvent>,
    storage: StorageManager,
    language: Language,
    buttons: ButtonLayer,
    music: MusicPlayer,
    user: UserConfig,
    selected_version: Option<String>,
    fabric_versions: HashMap<String, String>,
    dialogs: VecDeque<Dialog>,
    install_prompt: Option<VersionPrompt>,
    fabric_prompt: Option<VersionPrompt>,
    config_form: Option<ConfigForm>,
    picker: Option<VersionPicker>,
    downloads: Vec<DownloadBar>,
    install_status: Option<InstallProgress>,
}

impl LauncherApp {
    pub fn new(_cc: &eframe::CreationContext<'_>, root: PathBuf) -> Self {
        let runtime = build_runtime();
        info!("ui: installation folder {}", root.display());

        let network = NetworkClient::new();
        let storage = StorageManager::new(root.clone());
        let engine = LauncherEngine::new(
            MinecraftInstaller::new(root, network.clone()),
            storage.clone(),
            ModService::new(storage.mods_dir(), network),
            ProcessLauncher::new(),
        );
        let (tx, rx) = mpsc::unbounded_channel();

        let app = Self {
            runtime,
            engine: Arc::new(engine),
            updates_rx: rx,
            updates_tx: tx,
            storage,
            language: i18n::detect_system_language(),
            buttons: ButtonLayer::load(),
            music: MusicPlayer::new(),
            user: UserConfig::default(),
            selected_version: None,
            fabric_versions: HashMap::new(),
            dialogs: VecDeque::new(),
            install_prompt: Some(VersionPrompt::default()),
            fabric_prompt: None,
            config_form: None,
            picker: None,
            downloads: Vec::new(),
            install_status: None,
        };
        app.trigger_action(UserAction::Bootstrap);
        app
    }

    fn i18n(&self) -> I18n {
        I18n::new(self.language)
    }

    fn trigger_action(&self, action: UserAction) {
        let engine = self.engine.clone();
        let tx = self.updates_tx.clone();
        let rt = self.runtime.clone();
        rt.spawn(async move {
            engine.handle_action(action, &tx).await;
        });
    }

    fn message(&mut self, kind: MessageKind, text: impl Into<String>) {
        self.dialogs.push_back(Dialog::message(kind, text));
    }

    fn sync_events(&mut self) {
        while let Ok(event) = self.updates_rx.try_recv() {
            match event {
                AppEvent::Notice(notice) => self.show_notice(notice),
                AppEvent::Prompt(prompt) => self.dialogs.push_back(Dialog::Prompt(prompt)),
                AppEvent::OfferExtraMods { version } => {
                    self.dialogs.push_back(Dialog::ExtraMods {
                        version,
                        step: ExtraModsStep::Skin,
                    });
                }
                AppEvent::DownloadStarted { name, progress } => {
                    self.downloads.push(DownloadBar { name, progress });
                }
                AppEvent::Progress(step) => self.install_status = Some(step),
                AppEvent::TaskFinished => self.install_status = None,
                AppEvent::FabricVersions(map) => self.fabric_versions = map,
                AppEvent::FabricReady { version, fabric_id } => {
                    self.close_busy_fabric_prompt();
                    if let Some(picker) = &mut self.picker {
                        picker.finish(&version, true);
                    }
                    self.fabric_versions.insert(version, fabric_id);
                }
                AppEvent::FabricFailed { version } => {
                    self.close_busy_fabric_prompt();
                    if let Some(picker) = &mut self.picker {
                        picker.finish(&version, false);
                    }
                }
            }
        }
    }

    fn show_notice(&mut self, notice: Notice) {
        if matches!(
            notice,
            Notice::VersionInstalled { .. } | Notice::VersionInstallFailed { .. }
        ) {
            if self.install_prompt.as_ref().is_some_and(|prompt| prompt.busy) {
                self.install_prompt = None;
            }
            if matches!(notice, Notice::VersionInstalled { .. }) && self.picker.is_some() {
                self.picker = Some(VersionPicker::new(&self.storage.installed_versions()));
            }
        }
        let text = self.i18n().notice(&notice);
        self.message(notice.kind(), text);
    }

    fn close_busy_fabric_prompt(&mut self) {
        if self.fabric_prompt.as_ref().is_some_and(|prompt| prompt.busy) {
            self.fabric_prompt = None;
        }
    }

    fn handle_menu(&mut self, action: MenuAction) {
        let i18n = self.i18n();
        info!("ui: {action:?} clicked");
        match action {
            MenuAction::Launch => self.trigger_action(UserAction::Launch(LaunchRequest {
                username: self.user.username.clone(),
                ram_gb: self.user.ram_gb,
                version: self.selected_version.clone(),
            })),
            MenuAction::Versions => {
                let picker = VersionPicker::new(&self.storage.installed_versions());
                if picker.is_empty() {
                    self.message(MessageKind::Info, i18n.no_versions());
                } else {
                    self.picker = Some(picker);
                }
            }
            MenuAction::OpenGame => self.open_target(GAME_URL),
            MenuAction::OpenChannel => self.open_target(CHANNEL_URL),
            MenuAction::PlayMusic => self.play_music(),
            MenuAction::Configure => {
                let form = ConfigForm {
                    username: self.user.username.clone(),
                    ram: match self.user.ram_gb {
                        0 => String::new(),
                        gb => gb.to_string(),
                    },
                };
                self.config_form = Some(form);
            }
        }
    }

    fn open_target(&mut self, target: &str) {
        if let Err(err) = open::that(target) {
            warn!("ui: unable to open {target}: {err}");
            let text = self.i18n().open_failed(target, &err.to_string());
            self.message(MessageKind::Error, text);
        }
    }

    fn play_music(&mut self) {
        let i18n = self.i18n();
        let song = match song_to_play(&self.storage, i18n) {
            Ok(song) => song,
            Err(dialog) => {
                self.dialogs.push_back(dialog);
                return;
            }
        };
        if let Err(err) = self.music.play(&song) {
            warn!("audio: {err}");
            self.message(MessageKind::Error, i18n.play_failed(&err));
        }
    }

    fn select_version(&mut self, version: String, fabric: bool) {
        let i18n = self.i18n();
        let fabric_id = self.fabric_versions.get(&version).filter(|_| fabric).cloned();
        let text = match fabric_id {
            Some(id) => {
                self.selected_version = Some(id);
                self.trigger_action(UserAction::OfferExtraMods {
                    version: version.clone(),
                });
                i18n.selected_with_fabric(&version)
            }
            None => {
                self.selected_version = Some(version.clone());
                i18n.selected_plain(&version)
            }
        };
        info!("ui: selected {:?}", self.selected_version);
        self.message(MessageKind::Info, text);
        self.picker = None;
    }

    fn render_install_prompt(&mut self, ctx: &egui::Context, i18n: I18n) {
        let Some(prompt) = &mut self.install_prompt else {
            return;
        };
        let outcome = prompt.show(
            ctx,
            "install_version_prompt",
            i18n.install_version_title(),
            i18n.install_version_prompt(),
            i18n,
        );
        match outcome {
            Some(PromptOutcome::Submit(version)) => {
                prompt.busy = true;
                self.trigger_action(UserAction::InstallVersion { version });
            }
            Some(PromptOutcome::Empty) => self.message(MessageKind::Error, i18n.empty_version()),
            Some(PromptOutcome::Cancel) => self.install_prompt = None,
            None => {}
        }
    }

    fn render_fabric_prompt(&mut self, ctx: &egui::Context, i18n: I18n) {
        let Some(prompt) = &mut self.fabric_prompt else {
            return;
        };
        let outcome = prompt.show(
            ctx,
            "install_fabric_prompt",
            i18n.install_fabric_title(),
            i18n.install_fabric_prompt(),
            i18n,
        );
        match outcome {
            Some(PromptOutcome::Submit(version)) => {
                prompt.busy = true;
                self.trigger_action(UserAction::InstallFabric {
                    version,
                    offer_mods: true,
                });
            }
            Some(PromptOutcome::Empty) => self.message(MessageKind::Error, i18n.empty_version()),
            Some(PromptOutcome::Cancel) => self.fabric_prompt = None,
            None => {}
        }
    }

    fn render_config(&mut self, ctx: &egui::Context, i18n: I18n) {
        let Some(form) = &mut self.config_form else {
            return;
        };
        let mut open = true;
        let mut save = false;
        egui::Window::new(i18n.config_title())
            .id(egui::Id::new("user_config"))
            .open(&mut open)
            .collapsible(false)
            .resizable(false)
            .anchor(Align2::CENTER_CENTER, Vec2::ZERO)
            .show(ctx, |ui| {
                egui::Grid::new("config_fields")
                    .num_columns(2)
                    .spacing([10.0, 8.0])
                    .show(ui, |ui| {
                        ui.label(i18n.username_label());
                        ui.text_edit_singleline(&mut form.username);
                        ui.end_row();
                        ui.label(i18n.ram_label());
                        ui.text_edit_singleline(&mut form.ram);
                        ui.end_row();
                        ui.label("");
                        egui::ComboBox::from_id_salt("language_combo")
                            .selected_text(self.language.display_name())
                            .show_ui(ui, |ui| {
                                for language in [Language::English, Language::Spanish] {
                                    ui.selectable_value(
                                        &mut self.language,
                                        language,
                                        language.display_name(),
                                    );
                                }
                            });
                        ui.end_row();
                    });
                ui.add_space(6.0);
                save = ui.button(i18n.save()).clicked();
            });

        if save {
            match parse_user_config(&form.username, &form.ram) {
                Ok(config) => {
                    info!("ui: configured {} with {} GB", config.username, config.ram_gb);
                    self.user = config;
                    self.config_form = None;
                    self.message(MessageKind::Info, i18n.config_saved());
                }
                Err(err) => self.message(MessageKind::Error, i18n.config_error(err)),
            }
        } else if !open {
            self.config_form = None;
        }
    }

    fn render_picker(&mut self, ctx: &egui::Context, i18n: I18n) {
        let Some(picker) = &mut self.picker else {
            return;
        };
        let Some(command) = picker.show(ctx, &self.fabric_versions, i18n) else {
            return;
        };
        match command {
            PickerCommand::Close => self.picker = None,
            PickerCommand::FabricTicked(version) => {
                self.dialogs.push_back(Dialog::ConfirmFabric { version });
            }
            PickerCommand::Select { version, fabric } => self.select_version(version, fabric),
            PickerCommand::OpenFolder => {
                let folder = self.storage.versions_dir();
                self.open_target(&folder.display().to_string());
            }
            PickerCommand::InstallVersion => {
                self.install_prompt.get_or_insert_with(VersionPrompt::default);
            }
            PickerCommand::InstallFabric => {
                self.fabric_prompt.get_or_insert_with(VersionPrompt::default);
            }
        }
    }

    fn render_progress(&mut self, ctx: &egui::Context, i18n: I18n) {
        self.downloads.retain(|bar| !bar.progress.is_finished());
        for (index, bar) in self.downloads.iter().enumerate() {
            egui::Window::new(i18n.downloading(&bar.name))
                .id(egui::Id::new(("download", index)))
                .collapsible(false)
                .resizable(false)
                .anchor(Align2::CENTER_BOTTOM, egui::vec2(0.0, -12.0 - 64.0 * index as f32))
                .show(ctx, |ui| {
                    ui.add(
                        egui::ProgressBar::new(bar.progress.get() / 100.0)
                            .desired_width(320.0)
                            .show_percentage(),
                    );
                });
        }

        if let Some(status) = &self.install_status {
            egui::Window::new(i18n.installing())
                .id(egui::Id::new("install_status"))
                .title_bar(false)
                .resizable(false)
                .anchor(Align2::LEFT_BOTTOM, egui::vec2(12.0, -12.0))
                .show(ctx, |ui| {
                    ui.label(&status.status);
                    match status.fraction() {
                        Some(fraction) => {
                            ui.add(
                                egui::ProgressBar::new(fraction)
                                    .desired_width(280.0)
                                    .show_percentage(),
                            );
                        }
                        None => {
                            ui.spinner();
                        }
                    }
                });
        }
    }

    fn render_dialog(&mut self, ctx: &egui::Context, i18n: I18n) {
        let Some(dialog) = self.dialogs.front() else {
            return;
        };
        let Some(outcome) = dialog.show(ctx, i18n) else {
            return;
        };
        self.dialogs.pop_front();
        match outcome {
            DialogOutcome::Closed => {}
            DialogOutcome::Run(action) => self.trigger_action(action),
            DialogOutcome::Next(next) => self.dialogs.push_front(next),
            DialogOutcome::FabricAnswer { version, accepted } => {
                let Some(picker) = &mut self.picker else {
                    return;
                };
                if accepted {
                    picker.set_busy(&version);
                    self.trigger_action(UserAction::InstallFabric {
                        version,
                        offer_mods: false,
                    });
                } else {
                    picker.finish(&version, false);
                }
            }
        }
    }
}

impl eframe::App for LauncherApp {
    fn update(&mut self, ctx: &eframe::egui::Context, _frame: &mut eframe::Frame) {
        self.sync_events();
        let i18n = self.i18n();

        let mut clicked = None;
        egui::CentralPanel::default()
            .frame(Frame::NONE)
            .show(ctx, |ui| {
                let idle = self.dialogs.is_empty();
                ui.add_enabled_ui(idle, |ui| {
                    clicked = self.buttons.show(ui, i18n);
                });
            });
        if let Some(action) = clicked {
            self.handle_menu(action);
        }

        self.render_install_prompt(ctx, i18n);
        self.render_fabric_prompt(ctx, i18n);
        self.render_config(ctx, i18n);
        self.render_picker(ctx, i18n);
        self.render_progress(ctx, i18n);
        self.render_dialog(ctx, i18n);

        ctx.request_repaint_after(REPAINT_INTERVAL);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_songs_folder_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(crate::env::songs_dir(tmp.path())).unwrap();
        let storage = StorageManager::new(tmp.path().to_path_buf());
        let i18n = I18n::new(Language::English);

        match song_to_play(&storage, i18n) {
            Err(Dialog::Message { kind, text }) => {
                assert_eq!(kind, MessageKind::Error);
                assert_eq!(text, i18n.no_songs());
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn first_mp3_is_picked() {
        let tmp = tempfile::tempdir().unwrap();
        let songs = crate::env::songs_dir(tmp.path());
        std::fs::create_dir_all(&songs).unwrap();
        std::fs::write(songs.join("theme.mp3"), b"").unwrap();
        let storage = StorageManager::new(tmp.path().to_path_buf());

        let song = song_to_play(&storage, I18n::new(Language::English)).unwrap();
        assert_eq!(song, songs.join("theme.mp3"));
    }
}
