use std::path::{Path, PathBuf};

use log::debug;

use super::LaunchOptions;
use super::version::{self, VersionJson};
use crate::env;
use crate::jre::JreManager;

const CLASSPATH_SEPARATOR: &str = if cfg!(target_os = "windows") { ";" } else { ":" };

/// Assemble the full command line for an installed version.
///
/// Order: java, custom JVM flags, version JVM flags, main class, game
/// arguments.
pub fn build(
    root: &Path,
    id: &str,
    options: &LaunchOptions,
    jre: &JreManager,
) -> Result<Vec<String>, String> {
    let data = version::parse(version::load_merged(root, id)?)?;
    let main_class = data
        .main_class
        .clone()
        .ok_or_else(|| format!("version {id} has no main class"))?;

    let natives = env::natives_dir(root, &data.id);
    let classpath = classpath(root, &data);
    let values = placeholders(root, &data, options, &natives, &classpath);
    let fill = |arg: &str| substitute(arg, &values);

    let mut command = vec![java_executable(&data, options, jre)];
    command.extend(options.jvm_arguments.iter().cloned());
    match data.arguments.as_ref().and_then(|args| args.jvm.as_ref()) {
        Some(jvm) => command.extend(version::flatten_arguments(jvm).iter().map(|a| fill(a))),
        None => {
            command.push(format!("-Djava.library.path={}", natives.display()));
            command.push("-cp".to_owned());
            command.push(classpath.clone());
        }
    }
    command.push(main_class);

    if let Some(legacy) = &data.minecraft_arguments {
        command.extend(legacy.split_whitespace().map(fill));
    } else if let Some(arguments) = &data.arguments {
        command.extend(version::flatten_arguments(&arguments.game).iter().map(|a| fill(a)));
    }

    debug!("command: {} arguments for {id}", command.len());
    Ok(command)
}

fn java_executable(data: &VersionJson, options: &LaunchOptions, jre: &JreManager) -> String {
    if let Some(java) = &options.java {
        return java.display().to_string();
    }
    data.java_version
        .as_ref()
        .and_then(|java| jre.installed_java(&java.component))
        .map(|java| java.display().to_string())
        .unwrap_or_else(|| "java".to_owned())
}

/// Allowed libraries (deduplicated, child first) followed by the game jar.
fn classpath(root: &Path, data: &VersionJson) -> String {
    let libraries_dir = env::libraries_dir(root);
    let mut entries: Vec<PathBuf> = Vec::new();
    for lib in data.libraries.iter().filter(|lib| lib.is_allowed()) {
        if lib.artifact_url().is_some()
            && let Some(path) = lib.artifact_path()
        {
            entries.push(libraries_dir.join(path));
        }
        if let Some(native) = lib.native_artifact()
            && let Some(path) = &native.path
        {
            entries.push(libraries_dir.join(path));
        }
    }
    let jar = data.jar.as_deref().unwrap_or(&data.id);
    entries.push(env::version_jar_path(root, jar));

    let mut seen = std::collections::HashSet::new();
    entries
        .into_iter()
        .filter(|entry| seen.insert(entry.clone()))
        .map(|entry| entry.display().to_string())
        .collect::<Vec<_>>()
        .join(CLASSPATH_SEPARATOR)
}

fn placeholders(
    root: &Path,
    data: &VersionJson,
    options: &LaunchOptions,
    natives: &Path,
    classpath: &str,
) -> Vec<(&'static str, String)> {
    let assets = env::assets_dir(root);
    vec![
        ("${natives_directory}", natives.display().to_string()),
        ("${launcher_name}", options.launcher_name.clone()),
        ("${launcher_version}", options.launcher_version.clone()),
        ("${classpath_separator}", CLASSPATH_SEPARATOR.to_owned()),
        ("${classpath}", classpath.to_owned()),
        ("${library_directory}", env::libraries_dir(root).display().to_string()),
        ("${auth_player_name}", options.username.clone()),
        ("${version_name}", data.id.clone()),
        ("${game_directory}", root.display().to_string()),
        ("${assets_root}", assets.display().to_string()),
        (
            "${game_assets}",
            assets.join("virtual").join("legacy").display().to_string(),
        ),
        (
            "${assets_index_name}",
            data.assets.clone().unwrap_or_else(|| data.id.clone()),
        ),
        ("${auth_uuid}", options.uuid.clone()),
        ("${auth_access_token}", options.token.clone()),
        ("${auth_session}", options.token.clone()),
        ("${user_type}", "msa".to_owned()),
        (
            "${version_type}",
            data.version_type.clone().unwrap_or_else(|| "release".to_owned()),
        ),
        ("${user_properties}", "{}".to_owned()),
        ("${clientid}", String::new()),
        ("${auth_xuid}", String::new()),
    ]
}

fn substitute(arg: &str, values: &[(&'static str, String)]) -> String {
    if !arg.contains("${") {
        return arg.to_owned();
    }
    values
        .iter()
        .fold(arg.to_owned(), |out, (key, value)| out.replace(key, value))
}
