use std::path::PathBuf;

use clap::Parser;
use env_logger::Env;
use log::warn;

mod audio;
mod engine;
mod env;
mod jre;
mod minecraft;
mod mods;
mod networking;
mod process;
mod storage;
mod ui;
mod util;

#[derive(Parser, Debug)]
#[command(
    name = "MNC_KA Launcher",
    author,
    version,
    about = "Desktop launcher that installs and starts Minecraft with optional Fabric mods"
)]
struct Cli {
    /// Print launcher version and exit without starting the UI.
    #[arg(long)]
    version_only: bool,
    /// Installation folder; defaults to "MNC_KA Client" next to the executable.
    #[arg(long, value_name = "DIR")]
    root: Option<PathBuf>,
}

fn main() -> eframe::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    if cli.version_only {
        println!("{} {}", engine::LAUNCHER_NAME, engine::LAUNCHER_VERSION);
        return Ok(());
    }

    let root = cli.root.unwrap_or_else(env::default_install_root);
    let options = eframe::NativeOptions {
        viewport: eframe::egui::ViewportBuilder::default()
            .with_icon(app_icon())
            .with_inner_size(eframe::egui::vec2(800.0, 600.0)),
        ..Default::default()
    };
    eframe::run_native(
        engine::LAUNCHER_NAME,
        options,
        Box::new(|cc| Ok(Box::new(ui::LauncherApp::new(cc, root)))),
    )
}

fn app_icon() -> eframe::egui::IconData {
    load_app_icon().unwrap_or_else(default_icon)
}

fn load_app_icon() -> Option<eframe::egui::IconData> {
    let path = env::resource_path("assets/1.png");
    let image = match image::open(&path) {
        Ok(image) => image.to_rgba8(),
        Err(err) => {
            warn!("ui: no window icon at {}: {err}", path.display());
            return None;
        }
    };
    let (width, height) = image.dimensions();
    Some(eframe::egui::IconData {
        rgba: image.into_raw(),
        width,
        height,
    })
}

fn default_icon() -> eframe::egui::IconData {
    // Simple 2x2 icon: dark background with a green accent.
    let rgba: Vec<u8> = vec![
        24, 28, 24, 255, 92, 168, 64, 255, //
        24, 28, 24, 255, 64, 128, 48, 255,
    ];
    eframe::egui::IconData {
        rgba,
        width: 2,
        height: 2,
    }
}
