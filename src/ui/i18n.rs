use crate::engine::models::ConfigError;
use crate::engine::state::{MessageKind, Notice};
use crate::mods::ModPackage;

use super::buttons::MenuAction;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Language {
    English,
    Spanish,
}

impl Language {
    pub const fn display_name(self) -> &'static str {
        match self {
            Language::English => "English",
            Language::Spanish => "Español",
        }
    }
}

const LOCALE_LANGUAGE_CODES: [(&[&str], Language); 2] = [
    (&["es", "spa"], Language::Spanish),
    (&["en", "eng"], Language::English),
];

pub fn parse_locale_token(token: &str) -> Option<Language> {
    let normalized = token
        .split(['.', '@'])
        .next()
        .unwrap_or(token)
        .replace('-', "_")
        .to_ascii_lowercase();
    let language_code = normalized.split('_').next().unwrap_or(&normalized);

    LOCALE_LANGUAGE_CODES.iter().find_map(|(codes, language)| {
        codes
            .iter()
            .any(|code| *code == language_code)
            .then_some(*language)
    })
}

pub fn detect_system_language() -> Language {
    for var in ["LC_ALL", "LANGUAGE", "LANG"] {
        if let Ok(value) = std::env::var(var) {
            for token in value.split(':') {
                if let Some(language) = parse_locale_token(token) {
                    return language;
                }
            }
        }
    }

    Language::English
}

#[derive(Debug, Clone, Copy)]
pub struct I18n {
    language: Language,
}

impl I18n {
    #[must_use]
    pub const fn new(language: Language) -> Self {
        Self { language }
    }

    fn pick<'a>(self, english: &'a str, spanish: &'a str) -> &'a str {
        match self.language {
            Language::English => english,
            Language::Spanish => spanish,
        }
    }

    fn spanish(self) -> bool {
        self.language == Language::Spanish
    }

    pub fn menu_label(self, action: MenuAction) -> &'static str {
        match action {
            MenuAction::Launch => self.pick("Play", "Jugar"),
            MenuAction::Versions => self.pick("Versions", "Versiones"),
            MenuAction::OpenGame => self.pick("Web game", "Juego web"),
            MenuAction::OpenChannel => self.pick("Channel", "Canal"),
            MenuAction::PlayMusic => self.pick("Music", "Música"),
            MenuAction::Configure => self.pick("Settings", "Configurar"),
        }
    }

    pub fn message_title(self, kind: MessageKind) -> &'static str {
        match kind {
            MessageKind::Info => self.pick("Information", "Información"),
            MessageKind::Error => "Error",
        }
    }

    pub fn confirm_title(self) -> &'static str {
        self.pick("Confirm", "Confirmar")
    }

    pub fn ok(self) -> &'static str {
        self.pick("OK", "Aceptar")
    }

    pub fn yes(self) -> &'static str {
        self.pick("Yes", "Sí")
    }

    pub fn no(self) -> &'static str {
        "No"
    }

    pub fn cancel(self) -> &'static str {
        self.pick("Cancel", "Cancelar")
    }

    pub fn install_version_title(self) -> &'static str {
        self.pick("Install version", "Instalar versión")
    }

    pub fn install_version_prompt(self) -> &'static str {
        self.pick(
            "Enter the Minecraft version to install (e.g. 1.21.4):",
            "Introduce la versión de Minecraft que quieres instalar (ej. 1.21.4):",
        )
    }

    pub fn install_fabric_title(self) -> &'static str {
        self.pick("Install Fabric", "Instalar Fabric")
    }

    pub fn install_fabric_prompt(self) -> &'static str {
        self.pick(
            "Enter the Minecraft version to install Fabric for:",
            "Introduce la versión de Minecraft para instalar Fabric:",
        )
    }

    pub fn install_button(self) -> &'static str {
        self.pick("Install", "Instalar")
    }

    pub fn empty_version(self) -> &'static str {
        self.pick("Please enter a version.", "Debes introducir una versión.")
    }

    pub fn installing(self) -> &'static str {
        self.pick("Installing...", "Instalando...")
    }

    pub fn picker_title(self) -> &'static str {
        self.pick("Installed versions", "Versiones instaladas")
    }

    pub fn no_versions(self) -> &'static str {
        self.pick("No versions are installed.", "No hay versiones instaladas.")
    }

    pub fn fabric_checkbox(self, installed: bool) -> &'static str {
        if installed {
            self.pick("Enable Fabric", "Activar Fabric")
        } else {
            self.pick("Install Fabric", "Instalar Fabric")
        }
    }

    pub fn select(self) -> &'static str {
        self.pick("Select", "Seleccionar")
    }

    pub fn open_versions_folder(self) -> &'static str {
        self.pick("Open versions folder", "Abrir carpeta de versiones")
    }

    pub fn install_version_button(self) -> &'static str {
        self.pick("Install a version...", "Instalar una versión...")
    }

    pub fn install_fabric_button(self) -> &'static str {
        self.pick("Install Fabric...", "Instalar Fabric...")
    }

    pub fn confirm_fabric_install(self, version: &str) -> String {
        if self.spanish() {
            format!("Fabric no está instalado para la versión {version}. ¿Quieres instalarlo?")
        } else {
            format!("Fabric is not installed for {version}. Install it now?")
        }
    }

    pub fn selected_with_fabric(self, version: &str) -> String {
        if self.spanish() {
            format!("Fabric activado para la versión {version}.")
        } else {
            format!("Fabric enabled for {version}.")
        }
    }

    pub fn selected_plain(self, version: &str) -> String {
        if self.spanish() {
            format!("Versión {version} seleccionada sin Fabric.")
        } else {
            format!("Version {version} selected without Fabric.")
        }
    }

    pub fn config_title(self) -> &'static str {
        self.pick("Settings", "Configuración")
    }

    pub fn username_label(self) -> &'static str {
        self.pick("Username", "Nombre de usuario")
    }

    pub fn ram_label(self) -> &'static str {
        "RAM (GB)"
    }

    pub fn save(self) -> &'static str {
        self.pick("Save", "Guardar")
    }

    pub fn config_saved(self) -> &'static str {
        self.pick("Settings saved.", "Configuración guardada.")
    }

    pub fn config_error(self, error: ConfigError) -> &'static str {
        match error {
            ConfigError::MissingFields => {
                self.pick("Please fill in all fields.", "Por favor, rellena todos los campos.")
            }
            ConfigError::InvalidRam => self.pick(
                "RAM must be a whole number of GB.",
                "La RAM debe ser un número entero de GB.",
            ),
        }
    }

    pub fn extra_mods_title(self) -> &'static str {
        self.pick("Additional mods", "Mods adicionales")
    }

    pub fn skin_mod_question(self) -> &'static str {
        self.pick(
            "Do you want to install the skin mod (SkinOverrides)?",
            "¿Quieres instalar el mod de skins (SkinOverrides)?",
        )
    }

    pub fn optimization_question(self) -> &'static str {
        self.pick(
            "Do you want to install the optimization mods (Sodium and Lithium)?",
            "¿Quieres instalar los mods de optimización (Sodium y Lithium)?",
        )
    }

    pub fn fabric_api_required(self, queued: &[ModPackage]) -> String {
        let names = queued
            .iter()
            .map(|package| package.name())
            .collect::<Vec<_>>()
            .join(", ");
        if self.spanish() {
            format!("{names} necesita Fabric API, que no está instalado. ¿Descargarlo primero?")
        } else {
            format!("{names} needs Fabric API, which is not installed. Download it first?")
        }
    }

    pub fn downloading(self, name: &str) -> String {
        if self.spanish() {
            format!("Descargando {name}...")
        } else {
            format!("Downloading {name}...")
        }
    }

    pub fn no_songs(self) -> &'static str {
        self.pick(
            "No songs found in the songs folder.",
            "No se encontraron canciones en la carpeta songs.",
        )
    }

    pub fn songs_unreadable(self, error: &str) -> String {
        if self.spanish() {
            format!("No se pudo acceder a la carpeta songs: {error}")
        } else {
            format!("Unable to access the songs folder: {error}")
        }
    }

    pub fn play_failed(self, error: &str) -> String {
        if self.spanish() {
            format!("Error al reproducir la canción: {error}")
        } else {
            format!("Unable to play the song: {error}")
        }
    }

    pub fn open_failed(self, target: &str, error: &str) -> String {
        if self.spanish() {
            format!("No se pudo abrir {target}: {error}")
        } else {
            format!("Unable to open {target}: {error}")
        }
    }

    pub fn notice(self, notice: &Notice) -> String {
        let es = self.spanish();
        match notice {
            Notice::InstallingVersion { version } if es => {
                format!("Instalando la versión {version}. Esto puede tardar unos minutos.")
            }
            Notice::InstallingVersion { version } => {
                format!("Installing version {version}. This may take a few minutes.")
            }
            Notice::VersionInstalled { version } if es => {
                format!("Versión {version} instalada correctamente.")
            }
            Notice::VersionInstalled { version } => format!("Version {version} installed."),
            Notice::VersionInstallFailed { version, error } if es => {
                format!("Error al instalar la versión {version}: {error}")
            }
            Notice::VersionInstallFailed { version, error } => {
                format!("Installing version {version} failed: {error}")
            }
            Notice::InstallingFabric { loader, version } if es => {
                format!("Instalando Fabric {loader} para la versión {version}...")
            }
            Notice::InstallingFabric { loader, version } => {
                format!("Installing Fabric {loader} for {version}...")
            }
            Notice::FabricInstalled { loader, version } if es => {
                format!("Fabric {loader} instalado para la versión {version}.")
            }
            Notice::FabricInstalled { loader, version } => {
                format!("Fabric {loader} installed for {version}.")
            }
            Notice::FabricInstallFailed { version, error } if es => {
                format!("Error al instalar Fabric para {version}: {error}")
            }
            Notice::FabricInstallFailed { version, error } => {
                format!("Installing Fabric for {version} failed: {error}")
            }
            Notice::ModDownloaded { name } if es => format!("{name} descargado correctamente."),
            Notice::ModDownloaded { name } => format!("{name} downloaded."),
            Notice::ModDownloadFailed { name, error } if es => {
                format!("Error al descargar {name}: {error}")
            }
            Notice::ModDownloadFailed { name, error } => {
                format!("Downloading {name} failed: {error}")
            }
            Notice::MarkerWriteFailed { error } if es => {
                format!("No se pudo guardar el registro de mods: {error}")
            }
            Notice::MarkerWriteFailed { error } => format!("Unable to record the mods offer: {error}"),
            Notice::MissingUserConfig => self
                .pick(
                    "Set your username and RAM in Settings first.",
                    "Configura primero tu nombre de usuario y la RAM.",
                )
                .to_owned(),
            Notice::MissingVersion => self
                .pick(
                    "Select a version in Versions first.",
                    "Selecciona primero una versión en Versiones.",
                )
                .to_owned(),
            Notice::MissingFabricJar { jar, folder } if es => {
                format!("No se encontró {jar} en {folder}.")
            }
            Notice::MissingFabricJar { jar, folder } => format!("{jar} was not found in {folder}."),
            Notice::LaunchFailed { error } if es => format!("No se pudo iniciar el juego: {error}"),
            Notice::LaunchFailed { error } => format!("Unable to start the game: {error}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_supported_languages_from_locale_tokens() {
        let samples = [
            ("en_US.UTF-8", Language::English),
            ("es_ES.UTF-8", Language::Spanish),
            ("es-MX", Language::Spanish),
            ("spa", Language::Spanish),
            ("eng_GB@euro", Language::English),
        ];

        for (token, expected) in samples {
            assert_eq!(parse_locale_token(token), Some(expected));
        }
    }

    #[test]
    fn ignores_unknown_language_tokens() {
        assert_eq!(parse_locale_token("pl_PL"), None);
        assert_eq!(parse_locale_token("C"), None);
    }

    #[test]
    fn renders_notices_per_language() {
        let notice = Notice::VersionInstalled {
            version: "1.21.4".to_owned(),
        };
        assert_eq!(
            I18n::new(Language::English).notice(&notice),
            "Version 1.21.4 installed."
        );
        assert_eq!(
            I18n::new(Language::Spanish).notice(&notice),
            "Versión 1.21.4 instalada correctamente."
        );
    }
}
