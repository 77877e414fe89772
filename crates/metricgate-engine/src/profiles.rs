//! `profiles.yml` loader.
//!
//! Layout follows dbt:
//! ```yaml
//! my_profile:
//!   target: dev
//!   outputs:
//!     dev:
//!       type: sqlite
//!       threads: 1
//!       path: /data/warehouse.db
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use metricgate_core::engine::ProfileLocation;
use metricgate_core::error::AdapterError;

pub const PROFILES_FILE: &str = "profiles.yml";

const KNOWN_OUTPUT_KEYS: [&str; 6] = ["database", "schema", "schemas_and_paths", "schema_directory", "user", "host"];

#[derive(Debug, Deserialize)]
pub struct Profile {
    pub target: String,
    pub outputs: BTreeMap<String, TargetOutput>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TargetOutput {
    #[serde(rename = "type")]
    pub adapter_type: String,
    #[serde(default)]
    pub threads: Option<u32>,
    #[serde(default)]
    pub path: Option<PathBuf>,
    #[serde(default)]
    pub schemas_and_paths: BTreeMap<String, PathBuf>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_yaml::Value>,
}

impl TargetOutput {
    /// Database file for file-backed adapters: `path`, else the `main` schema path.
    pub fn database_path(&self) -> Option<&Path> {
        self.path
            .as_deref()
            .or_else(|| self.schemas_and_paths.get("main").map(PathBuf::as_path))
    }
}

/// The selected output plus anything worth telling the operator about.
#[derive(Debug)]
pub struct ResolvedTarget {
    pub target_name: String,
    pub output: TargetOutput,
    pub warnings: Vec<String>,
}

pub fn load_target(location: &ProfileLocation) -> Result<ResolvedTarget, AdapterError> {
    let file = location.profiles_dir.join(PROFILES_FILE);
    let text = fs::read_to_string(&file)
        .map_err(|e| AdapterError::Profile(format!("read {} failed: {e}", file.display())))?;
    resolve_target(&text, &location.profile_name)
}

pub fn resolve_target(text: &str, profile_name: &str) -> Result<ResolvedTarget, AdapterError> {
    let mut profiles: BTreeMap<String, serde_yaml::Value> =
        serde_yaml::from_str(text).map_err(|e| AdapterError::Profile(format!("invalid yaml: {e}")))?;

    let raw = profiles
        .remove(profile_name)
        .ok_or_else(|| AdapterError::Profile(format!("profile `{profile_name}` not found")))?;
    let mut profile: Profile = serde_yaml::from_value(raw)
        .map_err(|e| AdapterError::Profile(format!("profile `{profile_name}`: {e}")))?;

    let target_name = profile.target.clone();
    let output = profile.outputs.remove(&target_name).ok_or_else(|| {
        AdapterError::Profile(format!("profile `{profile_name}` has no output named `{target_name}`"))
    })?;

    let mut warnings = Vec::new();
    if output.threads.is_none() {
        warnings.push(format!("target `{target_name}` does not set `threads`"));
    }
    for key in output.extra.keys() {
        if !KNOWN_OUTPUT_KEYS.contains(&key.as_str()) {
            warnings.push(format!("target `{target_name}`: unrecognised key `{key}`"));
        }
    }
    // `config:` and other top-level blocks are not profiles
    for other in profiles.keys().filter(|k| k.as_str() != "config") {
        tracing::debug!(profile = %other, "ignoring unused profile");
    }

    Ok(ResolvedTarget { target_name, output, warnings })
}
