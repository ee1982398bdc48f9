use eframe::egui::{self, Align2, Vec2};

use super::i18n::I18n;
use crate::engine::state::{MessageKind, Prompt, UserAction};

/// Modal shown one at a time, oldest first.
#[derive(Clone, Debug)]
pub enum Dialog {
    Message { kind: MessageKind, text: String },
    Prompt(Prompt),
    /// Picker checkbox ticked for a version without Fabric.
    ConfirmFabric { version: String },
    ExtraMods { version: String, step: ExtraModsStep },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExtraModsStep {
    Skin,
    Optimization { skin: bool },
}

pub enum DialogOutcome {
    Closed,
    Run(UserAction),
    FabricAnswer { version: String, accepted: bool },
    /// Replace the current dialog with a follow-up question.
    Next(Dialog),
}

impl Dialog {
    pub fn message(kind: MessageKind, text: impl Into<String>) -> Self {
        Dialog::Message {
            kind,
            text: text.into(),
        }
    }

    pub fn show(&self, ctx: &egui::Context, i18n: I18n) -> Option<DialogOutcome> {
        let title = match self {
            Dialog::Message { kind, .. } => i18n.message_title(*kind),
            Dialog::Prompt(_) | Dialog::ConfirmFabric { .. } => i18n.confirm_title(),
            Dialog::ExtraMods { .. } => i18n.extra_mods_title(),
        };

        modal_window(title).show(ctx, |ui| match self {
            Dialog::Message { text, .. } => {
                ui.label(text.as_str());
                ui.add_space(6.0);
                ui.button(i18n.ok()).clicked().then_some(DialogOutcome::Closed)
            }
            Dialog::Prompt(prompt) => {
                let Prompt::FabricApiRequired { queued } = prompt;
                ui.label(i18n.fabric_api_required(queued));
                yes_no(ui, i18n).map(|accepted| DialogOutcome::Run(prompt.answer(accepted)))
            }
            Dialog::ConfirmFabric { version } => {
                ui.label(i18n.confirm_fabric_install(version));
                yes_no(ui, i18n).map(|accepted| DialogOutcome::FabricAnswer {
                    version: version.clone(),
                    accepted,
                })
            }
            Dialog::ExtraMods { version, step } => match *step {
                ExtraModsStep::Skin => {
                    ui.label(i18n.skin_mod_question());
                    yes_no(ui, i18n).map(|skin| {
                        DialogOutcome::Next(Dialog::ExtraMods {
                            version: version.clone(),
                            step: ExtraModsStep::Optimization { skin },
                        })
                    })
                }
                ExtraModsStep::Optimization { skin } => {
                    ui.label(i18n.optimization_question());
                    yes_no(ui, i18n).map(|optimization| {
                        DialogOutcome::Run(UserAction::InstallExtraMods {
                            version: version.clone(),
                            skin,
                            optimization,
                        })
                    })
                }
            },
        })?
        .inner
        .flatten()
    }
}

pub fn modal_window(title: &str) -> egui::Window<'static> {
    egui::Window::new(title)
        .id(egui::Id::new("modal_dialog"))
        .collapsible(false)
        .resizable(false)
        .anchor(Align2::CENTER_CENTER, Vec2::ZERO)
        .order(egui::Order::Foreground)
}

fn yes_no(ui: &mut egui::Ui, i18n: I18n) -> Option<bool> {
    ui.add_space(6.0);
    ui.horizontal(|ui| {
        if ui.button(i18n.yes()).clicked() {
            Some(true)
        } else if ui.button(i18n.no()).clicked() {
            Some(false)
        } else {
            None
        }
    })
    .inner
}

/// Text entry for a version id with an install button.
#[derive(Default)]
pub struct VersionPrompt {
    pub input: String,
    /// Install running; the window stays open until it reports back.
    pub busy: bool,
}

pub enum PromptOutcome {
    Submit(String),
    Cancel,
    Empty,
}

impl VersionPrompt {
    pub fn show(
        &mut self,
        ctx: &egui::Context,
        id: &str,
        title: &str,
        message: &str,
        i18n: I18n,
    ) -> Option<PromptOutcome> {
        egui::Window::new(title)
            .id(egui::Id::new(id))
            .collapsible(false)
            .resizable(false)
            .anchor(Align2::CENTER_CENTER, Vec2::ZERO)
            .show(ctx, |ui| {
                ui.label(message);
                let edit = ui.add_enabled(
                    !self.busy,
                    egui::TextEdit::singleline(&mut self.input).hint_text("1.21.4"),
                );
                if self.busy {
                    ui.horizontal(|ui| {
                        ui.spinner();
                        ui.label(i18n.installing());
                    });
                    return None;
                }
                let submitted = edit.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter));
                ui.horizontal(|ui| {
                    if ui.button(i18n.install_button()).clicked() || submitted {
                        let version = self.input.trim();
                        Some(if version.is_empty() {
                            PromptOutcome::Empty
                        } else {
                            PromptOutcome::Submit(version.to_owned())
                        })
                    } else if ui.button(i18n.cancel()).clicked() {
                        Some(PromptOutcome::Cancel)
                    } else {
                        None
                    }
                })
                .inner
            })?
            .inner
            .flatten()
    }
}
