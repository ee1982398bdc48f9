use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use log::info;

/// Folder created next to the launcher executable.
pub const INSTALL_DIR_NAME: &str = "MNC_KA Client";

const SUBFOLDERS: [&str; 5] = ["assets", "songs", "libraries", "runtime", "mods"];

/// Directory holding the launcher executable, or the working directory when it
/// cannot be determined.
pub fn executable_dir() -> PathBuf {
    env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."))
}

pub fn install_root(base: &Path) -> PathBuf {
    base.join(INSTALL_DIR_NAME)
}

pub fn default_install_root() -> PathBuf {
    install_root(&executable_dir())
}

pub fn assets_dir(root: &Path) -> PathBuf {
    root.join("assets")
}

pub fn songs_dir(root: &Path) -> PathBuf {
    root.join("songs")
}

pub fn libraries_dir(root: &Path) -> PathBuf {
    root.join("libraries")
}

pub fn runtime_dir(root: &Path) -> PathBuf {
    root.join("runtime")
}

pub fn mods_dir(root: &Path) -> PathBuf {
    root.join("mods")
}

pub fn versions_dir(root: &Path) -> PathBuf {
    root.join("versions")
}

pub fn version_dir(root: &Path, id: &str) -> PathBuf {
    versions_dir(root).join(id)
}

pub fn version_json_path(root: &Path, id: &str) -> PathBuf {
    version_dir(root, id).join(format!("{id}.json"))
}

pub fn version_jar_path(root: &Path, id: &str) -> PathBuf {
    version_dir(root, id).join(format!("{id}.jar"))
}

pub fn natives_dir(root: &Path, id: &str) -> PathBuf {
    version_dir(root, id).join("natives")
}

/// Create the on-disk folder layout expected by the launcher.
///
/// Safe to call repeatedly: existing folders are left untouched.
pub fn ensure_base_dirs(root: &Path) -> std::io::Result<()> {
    let folders = std::iter::once(root.to_path_buf())
        .chain(SUBFOLDERS.iter().map(|name| root.join(name)));

    for dir in folders {
        if !dir.exists() {
            fs::create_dir_all(&dir)?;
            info!("env: created folder {}", dir.display());
        }
    }
    Ok(())
}

/// Locate a bundled UI resource such as `assets/1.png`.
pub fn resource_path(relative: &str) -> PathBuf {
    let beside_exe = executable_dir().join(relative);
    if beside_exe.exists() {
        return beside_exe;
    }
    PathBuf::from(relative)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn creating_layout_twice_is_idempotent() {
        let tmp = tempfile::tempdir().unwrap();
        let root = install_root(tmp.path());

        ensure_base_dirs(&root).unwrap();
        ensure_base_dirs(&root).unwrap();

        let mut entries: Vec<String> = fs::read_dir(&root)
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        entries.sort();
        assert_eq!(entries, ["assets", "libraries", "mods", "runtime", "songs"]);
    }

    #[test]
    fn version_paths_follow_id() {
        let root = Path::new("/games/root");
        assert_eq!(
            version_jar_path(root, "1.21.4"),
            Path::new("/games/root/versions/1.21.4/1.21.4.jar")
        );
        assert_eq!(
            version_json_path(root, "fabric-loader-0.16.10-1.21.4"),
            Path::new(
                "/games/root/versions/fabric-loader-0.16.10-1.21.4/fabric-loader-0.16.10-1.21.4.json"
            )
        );
    }
}
