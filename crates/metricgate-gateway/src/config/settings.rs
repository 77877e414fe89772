//! Environment-driven settings.
//!
//! Every variable carries the `MF_` prefix. A `.env` file in the working
//! directory is honoured when present; real environment variables win.

use std::fmt;
use std::path::{Path, PathBuf};

use metricgate_core::engine::ProfileLocation;
use metricgate_core::error::{GateError, Result};

pub const DEFAULT_PROFILES_DIR: &str = "/app/.dbt";
pub const DEFAULT_PROFILE_NAME: &str = "metricflow_server";
pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_LOG_LEVEL: &str = "info";
/// 64 MiB; compiled manifests of large projects run into the tens of megabytes.
pub const DEFAULT_MAX_MANIFEST_BYTES: usize = 64 * 1024 * 1024;

#[derive(Clone)]
pub struct Settings {
    /// Read-tier bearer token.
    pub api_key: String,
    /// Admin-tier bearer token.
    pub admin_key: String,
    pub dbt_profiles_dir: PathBuf,
    /// Base64 `profiles.yml`; takes precedence over `dbt_profiles_dir`.
    pub profiles_b64: Option<String>,
    pub dbt_profile_name: String,
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub max_manifest_bytes: usize,
}

// Keys never reach logs.
impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("api_key", &"<redacted>")
            .field("admin_key", &"<redacted>")
            .field("dbt_profiles_dir", &self.dbt_profiles_dir)
            .field("profiles_b64", &self.profiles_b64.as_ref().map(|_| "<set>"))
            .field("dbt_profile_name", &self.dbt_profile_name)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("log_level", &self.log_level)
            .field("max_manifest_bytes", &self.max_manifest_bytes)
            .finish()
    }
}

impl Settings {
    /// Load `.env` (if any) and read the process environment.
    pub fn from_env() -> Result<Self> {
        env_file_outcome(dotenvy::dotenv())?;
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load variables from a specific env file. A missing file is fine; an
    /// unreadable or malformed one is a configuration error.
    pub fn load_env_file(path: &Path) -> Result<()> {
        env_file_outcome(dotenvy::from_path(path).map(|()| path.to_path_buf()))
    }

    /// Build settings from an arbitrary key lookup and validate them.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let var_or = |key: &str, default: &str| var(key).unwrap_or_else(|| default.to_string());

        let api_key = var("MF_API_KEY").ok_or_else(|| missing("MF_API_KEY"))?;
        let admin_key = var("MF_ADMIN_KEY").ok_or_else(|| missing("MF_ADMIN_KEY"))?;

        let port = match var("MF_PORT") {
            Some(raw) => raw
                .trim()
                .parse::<u16>()
                .map_err(|e| GateError::BadRequest(format!("MF_PORT must be a TCP port: {e}")))?,
            None => DEFAULT_PORT,
        };
        let max_manifest_bytes = match var("MF_MAX_MANIFEST_BYTES") {
            Some(raw) => raw.trim().parse::<usize>().map_err(|e| {
                GateError::BadRequest(format!("MF_MAX_MANIFEST_BYTES must be a byte count: {e}"))
            })?,
            None => DEFAULT_MAX_MANIFEST_BYTES,
        };

        let settings = Self {
            api_key,
            admin_key,
            dbt_profiles_dir: PathBuf::from(var_or("MF_DBT_PROFILES_DIR", DEFAULT_PROFILES_DIR)),
            profiles_b64: var("MF_PROFILES_B64"),
            dbt_profile_name: var_or("MF_DBT_PROFILE_NAME", DEFAULT_PROFILE_NAME),
            host: var_or("MF_HOST", DEFAULT_HOST),
            port,
            log_level: var_or("MF_LOG_LEVEL", DEFAULT_LOG_LEVEL),
            max_manifest_bytes,
        };
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        if self.api_key.trim().is_empty() {
            return Err(missing("MF_API_KEY"));
        }
        if self.admin_key.trim().is_empty() {
            return Err(missing("MF_ADMIN_KEY"));
        }
        if self.port == 0 {
            return Err(GateError::BadRequest("MF_PORT must be between 1 and 65535".into()));
        }
        if self.max_manifest_bytes == 0 {
            return Err(GateError::BadRequest("MF_MAX_MANIFEST_BYTES must be greater than 0".into()));
        }
        if self.dbt_profile_name.trim().is_empty() {
            return Err(GateError::BadRequest("MF_DBT_PROFILE_NAME must not be empty".into()));
        }
        Ok(())
    }

    /// Where the adapter factory should look, once the directory is known.
    pub fn profile_location(&self, profiles_dir: PathBuf) -> ProfileLocation {
        ProfileLocation {
            profiles_dir,
            profile_name: self.dbt_profile_name.clone(),
        }
    }
}

fn env_file_outcome(loaded: std::result::Result<PathBuf, dotenvy::Error>) -> Result<()> {
    match loaded {
        Ok(_) => Ok(()),
        // no .env is the normal container case
        Err(e) if e.not_found() => Ok(()),
        Err(e) => Err(GateError::BadRequest(format!(".env could not be loaded: {e}"))),
    }
}

fn missing(key: &str) -> GateError {
    GateError::BadRequest(format!("{key} is required and must not be empty"))
}
