// Version JSON model, OS rules and `inheritsFrom` merging.

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::OnceLock;

use log::warn;
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;

use crate::env;

pub const MOJANG_LIBRARIES: &str = "https://libraries.minecraft.net/";

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionJson {
    pub id: String,
    #[serde(rename = "type", default)]
    pub version_type: Option<String>,
    #[serde(default)]
    pub inherits_from: Option<String>,
    #[serde(default)]
    pub main_class: Option<String>,
    #[serde(default)]
    pub jar: Option<String>,
    #[serde(default)]
    pub libraries: Vec<Library>,
    #[serde(default)]
    pub asset_index: Option<AssetIndexInfo>,
    #[serde(default)]
    pub assets: Option<String>,
    #[serde(default)]
    pub arguments: Option<Arguments>,
    /// Pre-1.13 space separated game arguments.
    #[serde(default)]
    pub minecraft_arguments: Option<String>,
    #[serde(default)]
    pub java_version: Option<JavaVersionInfo>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JavaVersionInfo {
    pub component: String,
}

/// Top-level `downloads` of a single version file, read before merging so a
/// loader profile never picks up its parent's client jar.
#[derive(Debug, Clone, Deserialize)]
pub struct VersionDownloads {
    #[serde(default)]
    pub client: Option<DownloadArtifact>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DownloadArtifact {
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub sha1: Option<String>,
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AssetIndexInfo {
    pub id: String,
    pub url: String,
    #[serde(default)]
    pub sha1: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Arguments {
    #[serde(default)]
    pub game: Vec<Value>,
    #[serde(default)]
    pub jvm: Option<Vec<Value>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Library {
    pub name: String,
    /// Maven repository for libraries without a `downloads` block (Fabric).
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub downloads: Option<LibraryDownloads>,
    #[serde(default)]
    pub rules: Option<Vec<Rule>>,
    #[serde(default)]
    pub natives: Option<HashMap<String, String>>,
    #[serde(default)]
    pub extract: Option<ExtractRules>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LibraryDownloads {
    #[serde(default)]
    pub artifact: Option<DownloadArtifact>,
    #[serde(default)]
    pub classifiers: Option<HashMap<String, DownloadArtifact>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExtractRules {
    #[serde(default)]
    pub exclude: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Rule {
    pub action: RuleAction,
    #[serde(default)]
    pub os: Option<OsRule>,
    #[serde(default)]
    pub features: Option<HashMap<String, bool>>,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RuleAction {
    Allow,
    Disallow,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OsRule {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub arch: Option<String>,
    /// Regex over the OS release, e.g. `^10\.` for Windows 10.
    #[serde(default)]
    pub version: Option<String>,
}

/// Mojang name for the running platform.
pub fn current_os_name() -> &'static str {
    if cfg!(target_os = "windows") {
        "windows"
    } else if cfg!(target_os = "macos") {
        "osx"
    } else {
        "linux"
    }
}

fn current_os_version() -> Option<&'static str> {
    static VERSION: OnceLock<Option<String>> = OnceLock::new();
    VERSION.get_or_init(sysinfo::System::os_version).as_deref()
}

/// Whether `version` matches a rule's `os.version` pattern. An unknown
/// release or a malformed pattern never matches.
fn os_version_matches(pattern: &str, version: Option<&str>) -> bool {
    let Some(version) = version else {
        return false;
    };
    match Regex::new(pattern) {
        Ok(regex) => regex.is_match(version),
        Err(err) => {
            warn!("rules: ignoring os.version pattern {pattern:?}: {err}");
            false
        }
    }
}

fn current_arch_bits() -> &'static str {
    if cfg!(target_pointer_width = "64") {
        "64"
    } else {
        "32"
    }
}

impl Rule {
    /// A rule passes when its conditions match and it allows, or when its
    /// conditions fail and it disallows.
    fn passes(&self) -> bool {
        let allow = self.action == RuleAction::Allow;
        if !self.conditions_match() {
            return !allow;
        }
        allow
    }

    fn conditions_match(&self) -> bool {
        if let Some(os) = &self.os {
            if let Some(name) = &os.name
                && name != current_os_name()
            {
                return false;
            }
            if os.arch.as_deref() == Some("x86") && current_arch_bits() != "32" {
                return false;
            }
            if let Some(pattern) = &os.version
                && !os_version_matches(pattern, current_os_version())
            {
                return false;
            }
        }
        // The launcher enables no optional features (demo, custom resolution,
        // quick play), so any feature requirement set to true is unmet.
        if let Some(features) = &self.features
            && features.values().any(|required| *required)
        {
            return false;
        }
        true
    }
}

pub fn rules_allow(rules: Option<&[Rule]>) -> bool {
    rules.is_none_or(|rules| rules.iter().all(Rule::passes))
}

impl Library {
    pub fn is_allowed(&self) -> bool {
        rules_allow(self.rules.as_deref())
    }

    /// Path of the main artifact relative to the libraries folder.
    pub fn artifact_path(&self) -> Option<String> {
        if let Some(path) = self
            .downloads
            .as_ref()
            .and_then(|d| d.artifact.as_ref())
            .and_then(|a| a.path.clone())
        {
            return Some(path);
        }
        maven_path(&self.name)
    }

    /// Download URL for the main artifact.
    pub fn artifact_url(&self) -> Option<String> {
        if let Some(artifact) = self.downloads.as_ref().and_then(|d| d.artifact.as_ref()) {
            return Some(artifact.url.clone());
        }
        if self.downloads.is_some() {
            // Native-only entries carry classifiers but no main artifact.
            return None;
        }
        let repo = self.url.as_deref().unwrap_or(MOJANG_LIBRARIES);
        let path = maven_path(&self.name)?;
        if repo.ends_with('/') {
            Some(format!("{repo}{path}"))
        } else {
            Some(format!("{repo}/{path}"))
        }
    }

    pub fn artifact_sha1(&self) -> Option<&str> {
        self.downloads
            .as_ref()
            .and_then(|d| d.artifact.as_ref())
            .and_then(|a| a.sha1.as_deref())
    }

    /// Legacy native classifier (e.g. `natives-windows-64`) for this platform.
    pub fn native_classifier(&self) -> Option<String> {
        let natives = self.natives.as_ref()?;
        natives
            .get(current_os_name())
            .map(|classifier| classifier.replace("${arch}", current_arch_bits()))
    }

    pub fn native_artifact(&self) -> Option<&DownloadArtifact> {
        let classifier = self.native_classifier()?;
        self.downloads
            .as_ref()?
            .classifiers
            .as_ref()?
            .get(&classifier)
    }
}

/// Convert `group:artifact:version[:classifier][@ext]` to a repository path.
pub fn maven_path(coordinate: &str) -> Option<String> {
    let (coordinate, extension) = match coordinate.split_once('@') {
        Some((coords, ext)) => (coords, ext),
        None => (coordinate, "jar"),
    };
    let mut parts = coordinate.split(':');
    let group = parts.next().filter(|s| !s.is_empty())?;
    let artifact = parts.next().filter(|s| !s.is_empty())?;
    let version = parts.next().filter(|s| !s.is_empty())?;
    let classifier = parts.next();

    let file = match classifier {
        Some(classifier) => format!("{artifact}-{version}-{classifier}.{extension}"),
        None => format!("{artifact}-{version}.{extension}"),
    };
    Some(format!(
        "{}/{artifact}/{version}/{file}",
        group.replace('.', "/")
    ))
}

/// Overlay a child version JSON on its parent.
///
/// Lists are concatenated child first, nested lists (such as `arguments.game`)
/// parent first, everything else is replaced by the child.
pub fn inherit(child: &Value, parent: &Value) -> Value {
    let mut merged = parent.clone();
    let (Some(child_obj), Some(merged_obj)) = (child.as_object(), merged.as_object_mut()) else {
        return child.clone();
    };

    for (key, value) in child_obj {
        match (value, merged_obj.get_mut(key)) {
            (Value::Array(child_items), Some(Value::Array(parent_items))) => {
                let mut combined = child_items.clone();
                combined.append(parent_items);
                *parent_items = combined;
            }
            (Value::Object(child_map), Some(Value::Object(parent_map))) => {
                for (sub_key, sub_value) in child_map {
                    match (sub_value, parent_map.get_mut(sub_key)) {
                        (Value::Array(extra), Some(Value::Array(existing))) => {
                            existing.extend(extra.iter().cloned());
                        }
                        _ => {
                            parent_map.insert(sub_key.clone(), sub_value.clone());
                        }
                    }
                }
            }
            _ => {
                merged_obj.insert(key.clone(), value.clone());
            }
        }
    }
    merged
}

pub fn read_raw(root: &Path, id: &str) -> Result<Value, String> {
    let path = env::version_json_path(root, id);
    let text = fs::read_to_string(&path)
        .map_err(|e| format!("version {id} is not installed ({}): {e}", path.display()))?;
    serde_json::from_str(&text).map_err(|e| format!("invalid version file {}: {e}", path.display()))
}

/// Read an installed version and resolve its `inheritsFrom` chain from disk.
pub fn load_merged(root: &Path, id: &str) -> Result<Value, String> {
    let raw = read_raw(root, id)?;
    match raw.get("inheritsFrom").and_then(Value::as_str) {
        Some(parent) if parent != id => {
            let parent = load_merged(root, parent)?;
            Ok(inherit(&raw, &parent))
        }
        _ => Ok(raw),
    }
}

pub fn parse(value: Value) -> Result<VersionJson, String> {
    serde_json::from_value(value).map_err(|e| format!("unsupported version file: {e}"))
}

/// Evaluate a modern argument list, dropping entries whose rules fail.
pub fn flatten_arguments(values: &[Value]) -> Vec<String> {
    let mut out = Vec::new();
    for value in values {
        match value {
            Value::String(arg) => out.push(arg.clone()),
            Value::Object(obj) => {
                if let Some(rules) = obj.get("rules") {
                    let rules: Vec<Rule> = serde_json::from_value(rules.clone()).unwrap_or_default();
                    if !rules_allow(Some(rules.as_slice())) {
                        continue;
                    }
                }
                match obj.get("value") {
                    Some(Value::String(arg)) => out.push(arg.clone()),
                    Some(Value::Array(items)) => out.extend(
                        items
                            .iter()
                            .filter_map(Value::as_str)
                            .map(str::to_owned),
                    ),
                    _ => {}
                }
            }
            _ => {}
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rule(value: Value) -> Rule {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn no_rules_means_allowed() {
        assert!(rules_allow(None));
    }

    #[test]
    fn allow_only_current_os() {
        let rules = vec![rule(json!({"action": "allow", "os": {"name": current_os_name()}}))];
        assert!(rules_allow(Some(rules.as_slice())));

        let rules = vec![rule(json!({"action": "allow", "os": {"name": "plan9"}}))];
        assert!(!rules_allow(Some(rules.as_slice())));
    }

    #[test]
    fn os_version_pattern_must_match_release() {
        assert!(!os_version_matches(r"^10\.5\.\d$", Some("14.2")));
        assert!(os_version_matches(r"^10\.5\.\d$", Some("10.5.8")));
        assert!(!os_version_matches(r"^10\.5\.\d$", None));
        assert!(!os_version_matches(r"^10\.(", Some("10.5.8")));
    }

    #[test]
    fn rule_with_foreign_os_version_is_skipped() {
        let rules = vec![rule(json!({
            "action": "allow",
            "os": {"name": current_os_name(), "version": "^no-such-release$"}
        }))];
        assert!(!rules_allow(Some(rules.as_slice())));

        let rules = vec![
            rule(json!({"action": "allow"})),
            rule(json!({
                "action": "disallow",
                "os": {"name": current_os_name(), "version": "^no-such-release$"}
            })),
        ];
        assert!(rules_allow(Some(rules.as_slice())));
    }

    #[test]
    fn disallow_current_os() {
        let rules = vec![
            rule(json!({"action": "allow"})),
            rule(json!({"action": "disallow", "os": {"name": current_os_name()}})),
        ];
        assert!(!rules_allow(Some(rules.as_slice())));
    }

    #[test]
    fn feature_gated_rules_are_skipped() {
        let rules = vec![rule(
            json!({"action": "allow", "features": {"is_demo_user": true}}),
        )];
        assert!(!rules_allow(Some(rules.as_slice())));
    }

    #[test]
    fn maven_coordinates_map_to_paths() {
        assert_eq!(
            maven_path("net.fabricmc:fabric-loader:0.16.10").as_deref(),
            Some("net/fabricmc/fabric-loader/0.16.10/fabric-loader-0.16.10.jar")
        );
        assert_eq!(
            maven_path("org.lwjgl:lwjgl:3.3.3:natives-linux").as_deref(),
            Some("org/lwjgl/lwjgl/3.3.3/lwjgl-3.3.3-natives-linux.jar")
        );
        assert_eq!(
            maven_path("com.example:thing:1.0@zip").as_deref(),
            Some("com/example/thing/1.0/thing-1.0.zip")
        );
        assert_eq!(maven_path("broken"), None);
    }

    #[test]
    fn fabric_library_url_uses_its_repository() {
        let lib: Library = serde_json::from_value(json!({
            "name": "net.fabricmc:intermediary:1.21.4",
            "url": "https://maven.fabricmc.net/"
        }))
        .unwrap();
        assert_eq!(
            lib.artifact_url().as_deref(),
            Some("https://maven.fabricmc.net/net/fabricmc/intermediary/1.21.4/intermediary-1.21.4.jar")
        );
    }

    #[test]
    fn inherit_prepends_child_libraries_and_appends_arguments() {
        let parent = json!({
            "id": "1.21.4",
            "mainClass": "net.minecraft.client.main.Main",
            "libraries": [{"name": "a:parent:1"}],
            "arguments": {"game": ["--parent"], "jvm": ["-Dparent"]},
            "type": "release"
        });
        let child = json!({
            "id": "fabric-loader-0.16.10-1.21.4",
            "inheritsFrom": "1.21.4",
            "mainClass": "net.fabricmc.loader.impl.launch.knot.KnotClient",
            "libraries": [{"name": "b:child:1"}],
            "arguments": {"game": [], "jvm": ["-Dchild"]}
        });

        let merged = inherit(&child, &parent);

        assert_eq!(merged["id"], "fabric-loader-0.16.10-1.21.4");
        assert_eq!(merged["mainClass"], "net.fabricmc.loader.impl.launch.knot.KnotClient");
        assert_eq!(merged["libraries"][0]["name"], "b:child:1");
        assert_eq!(merged["libraries"][1]["name"], "a:parent:1");
        assert_eq!(merged["arguments"]["game"], json!(["--parent"]));
        assert_eq!(merged["arguments"]["jvm"], json!(["-Dparent", "-Dchild"]));
        assert_eq!(merged["type"], "release");
    }

    #[test]
    fn flattens_conditional_arguments() {
        let args = flatten_arguments(&[
            json!("--username"),
            json!("${auth_player_name}"),
            json!({
                "rules": [{"action": "allow", "features": {"has_custom_resolution": true}}],
                "value": ["--width", "${resolution_width}"]
            }),
            json!({
                "rules": [{"action": "allow", "os": {"name": current_os_name()}}],
                "value": "-Dos.specific"
            }),
        ]);
        assert_eq!(args, ["--username", "${auth_player_name}", "-Dos.specific"]);
    }

    #[test]
    fn native_classifier_substitutes_arch() {
        let lib: Library = serde_json::from_value(json!({
            "name": "org.lwjgl.lwjgl:lwjgl-platform:2.9.4",
            "natives": {
                "linux": "natives-linux",
                "osx": "natives-osx",
                "windows": "natives-windows-${arch}"
            }
        }))
        .unwrap();
        let classifier = lib.native_classifier().unwrap();
        assert!(classifier.starts_with("natives-"));
        assert!(!classifier.contains("${arch}"));
    }
}
