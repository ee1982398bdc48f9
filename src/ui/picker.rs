use std::collections::HashMap;

use eframe::egui::{self, Align2, Vec2};

use super::i18n::I18n;
use crate::engine::models::InstalledVersion;
use crate::minecraft::is_fabric_id;

struct PickerRow {
    id: String,
    fabric: bool,
    /// Fabric install for this row is in flight.
    busy: bool,
}

pub enum PickerCommand {
    Close,
    /// Checkbox ticked for a version that has no Fabric yet.
    FabricTicked(String),
    Select { version: String, fabric: bool },
    OpenFolder,
    InstallVersion,
    InstallFabric,
}

/// Window listing installed base versions.
pub struct VersionPicker {
    rows: Vec<PickerRow>,
}

impl VersionPicker {
    pub fn new(installed: &[InstalledVersion]) -> Self {
        let rows = installed
            .iter()
            .filter(|version| !is_fabric_id(&version.id))
            .map(|version| PickerRow {
                id: version.id.clone(),
                fabric: false,
                busy: false,
            })
            .collect();
        Self { rows }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn set_busy(&mut self, version: &str) {
        if let Some(row) = self.row_mut(version) {
            row.busy = true;
        }
    }

    /// Settle a row after a Fabric install attempt or a declined prompt.
    pub fn finish(&mut self, version: &str, ticked: bool) {
        if let Some(row) = self.row_mut(version) {
            row.busy = false;
            row.fabric = ticked;
        }
    }

    fn row_mut(&mut self, version: &str) -> Option<&mut PickerRow> {
        self.rows.iter_mut().find(|row| row.id == version)
    }

    pub fn show(
        &mut self,
        ctx: &egui::Context,
        fabric_versions: &HashMap<String, String>,
        i18n: I18n,
    ) -> Option<PickerCommand> {
        let mut open = true;
        let mut command = None;
        egui::Window::new(i18n.picker_title())
            .id(egui::Id::new("version_picker"))
            .open(&mut open)
            .collapsible(false)
            .resizable(false)
            .anchor(Align2::CENTER_CENTER, Vec2::ZERO)
            .show(ctx, |ui| {
                egui::ScrollArea::vertical()
                    .max_height(280.0)
                    .show(ui, |ui| {
                        egui::Grid::new("version_rows")
                            .num_columns(3)
                            .spacing([12.0, 6.0])
                            .show(ui, |ui| {
                                for row in &mut self.rows {
                                    ui.label(&row.id);
                                    let installed = fabric_versions.contains_key(&row.id);
                                    let checkbox = ui.add_enabled(
                                        !row.busy,
                                        egui::Checkbox::new(
                                            &mut row.fabric,
                                            i18n.fabric_checkbox(installed),
                                        ),
                                    );
                                    if checkbox.changed() && row.fabric && !installed {
                                        command = Some(PickerCommand::FabricTicked(row.id.clone()));
                                    }
                                    if row.busy {
                                        ui.spinner();
                                    } else if ui.button(i18n.select()).clicked() {
                                        command = Some(PickerCommand::Select {
                                            version: row.id.clone(),
                                            fabric: row.fabric && installed,
                                        });
                                    }
                                    ui.end_row();
                                }
                            });
                    });
                ui.separator();
                ui.horizontal(|ui| {
                    if ui.button(i18n.open_versions_folder()).clicked() {
                        command = Some(PickerCommand::OpenFolder);
                    }
                    if ui.button(i18n.install_version_button()).clicked() {
                        command = Some(PickerCommand::InstallVersion);
                    }
                    if ui.button(i18n.install_fabric_button()).clicked() {
                        command = Some(PickerCommand::InstallFabric);
                    }
                });
            });
        if !open {
            return Some(PickerCommand::Close);
        }
        command
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn installed(id: &str) -> InstalledVersion {
        InstalledVersion {
            id: id.to_owned(),
            version_type: "release".to_owned(),
            release_time: None,
        }
    }

    #[test]
    fn hides_fabric_loader_ids() {
        let picker = VersionPicker::new(&[
            installed("fabric-loader-0.16.10-1.21.4"),
            installed("1.21.4"),
            installed("1.20.1"),
        ]);
        let ids: Vec<_> = picker.rows.iter().map(|row| row.id.as_str()).collect();
        assert_eq!(ids, ["1.21.4", "1.20.1"]);
    }

    #[test]
    fn failed_install_unticks_row() {
        let mut picker = VersionPicker::new(&[installed("1.21.4")]);
        picker.rows[0].fabric = true;
        picker.set_busy("1.21.4");
        assert!(picker.rows[0].busy);

        picker.finish("1.21.4", false);
        assert!(!picker.rows[0].busy);
        assert!(!picker.rows[0].fabric);
    }
}
