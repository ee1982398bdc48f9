use log::info;
use serde_json::Value;

use super::install::{self, InstallContext};
use super::{InstallProgress, fabric_version_id};
use crate::env;

const FABRIC_META: &str = "https://meta.fabricmc.net/v2";

pub fn profile_url(base: &str, loader: &str) -> String {
    format!("{FABRIC_META}/versions/loader/{base}/{loader}/profile/json")
}

/// Install Fabric `loader` for Minecraft `base` and return the loader's
/// version id.
///
/// The loader profile from Fabric Meta is stored as a regular version that
/// inherits from `base`, so installing it also installs the base game.
pub async fn install(ctx: &InstallContext<'_>, base: &str, loader: &str) -> Result<String, String> {
    let id = fabric_version_id(loader, base);
    info!("fabric: installing loader {loader} for {base}");
    (ctx.progress)(InstallProgress::status(format!("Fetching Fabric {loader}")));

    let url = profile_url(base, loader);
    let text = ctx
        .network
        .get_text(&url)
        .await
        .map_err(|e| format!("Fabric {loader} is not available for Minecraft {base}: {e}"))?;
    let profile = normalize_profile(&text, &id)?;

    let path = env::version_json_path(ctx.root, &id);
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| format!("unable to create {}: {e}", parent.display()))?;
    }
    tokio::fs::write(&path, profile.to_string())
        .await
        .map_err(|e| format!("failed to write {}: {e}", path.display()))?;

    install::install_version(ctx, id.clone()).await?;
    info!("fabric: {id} installed");
    Ok(id)
}

/// Parse a Fabric Meta profile and pin its id to the one the launcher expects.
fn normalize_profile(text: &str, id: &str) -> Result<Value, String> {
    let mut profile: Value =
        serde_json::from_str(text).map_err(|e| format!("invalid Fabric profile: {e}"))?;
    let object = profile
        .as_object_mut()
        .ok_or_else(|| "invalid Fabric profile: not an object".to_owned())?;
    if !object.contains_key("inheritsFrom") {
        return Err("invalid Fabric profile: missing inheritsFrom".to_owned());
    }
    object.insert("id".to_owned(), Value::String(id.to_owned()));
    Ok(profile)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_meta_profile_url() {
        assert_eq!(
            profile_url("1.21.4", "0.16.10"),
            "https://meta.fabricmc.net/v2/versions/loader/1.21.4/0.16.10/profile/json"
        );
    }

    #[test]
    fn profile_id_is_pinned() {
        let profile = normalize_profile(
            r#"{"id": "something-else", "inheritsFrom": "1.21.4", "libraries": []}"#,
            "fabric-loader-0.16.10-1.21.4",
        )
        .unwrap();
        assert_eq!(profile["id"], "fabric-loader-0.16.10-1.21.4");
        assert_eq!(profile["inheritsFrom"], "1.21.4");
    }

    #[test]
    fn profile_without_parent_is_rejected() {
        assert!(normalize_profile(r#"{"id": "x"}"#, "x").is_err());
        assert!(normalize_profile("[]", "x").is_err());
    }
}
