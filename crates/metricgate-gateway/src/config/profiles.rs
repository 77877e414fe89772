//! Resolve the directory that holds `profiles.yml`.
//!
//! With `MF_PROFILES_B64` set, the blob is decoded into a fresh private
//! temporary directory that lives until [`ProfilesDir::cleanup`] (or drop).
//! Otherwise `MF_DBT_PROFILES_DIR` is used as-is.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use tempfile::TempDir;

use metricgate_core::error::{GateError, Result};

use super::Settings;

pub const PROFILES_FILE: &str = "profiles.yml";
const TEMP_PREFIX: &str = "mfserver_profiles_";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileSource {
    /// `MF_DBT_PROFILES_DIR`
    Directory,
    /// `MF_PROFILES_B64`
    Embedded,
}

impl fmt::Display for ProfileSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ProfileSource::Directory => "MF_DBT_PROFILES_DIR",
            ProfileSource::Embedded => "MF_PROFILES_B64",
        })
    }
}

#[derive(Debug)]
pub struct ProfilesDir {
    path: PathBuf,
    source: ProfileSource,
    temp: Option<TempDir>,
}

impl ProfilesDir {
    pub fn resolve(settings: &Settings) -> Result<Self> {
        match settings.profiles_b64.as_deref() {
            Some(blob) => Self::from_base64(blob),
            None => Ok(Self {
                path: settings.dbt_profiles_dir.clone(),
                source: ProfileSource::Directory,
                temp: None,
            }),
        }
    }

    /// Decode `blob` and materialise it as `profiles.yml` in a new temp dir.
    pub fn from_base64(blob: &str) -> Result<Self> {
        let bytes = STANDARD
            .decode(blob.trim())
            .map_err(|e| GateError::BadRequest(format!("MF_PROFILES_B64 is not valid base64: {e}")))?;
        let text = String::from_utf8(bytes)
            .map_err(|e| GateError::BadRequest(format!("MF_PROFILES_B64 is not valid UTF-8: {e}")))?;

        let temp = tempfile::Builder::new()
            .prefix(TEMP_PREFIX)
            .tempdir()
            .map_err(|e| GateError::Internal(format!("create profiles temp dir failed: {e}")))?;
        fs::write(temp.path().join(PROFILES_FILE), text)
            .map_err(|e| GateError::Internal(format!("write {PROFILES_FILE} failed: {e}")))?;

        tracing::info!(dir = %temp.path().display(), "profiles.yml decoded from MF_PROFILES_B64");
        Ok(Self {
            path: temp.path().to_path_buf(),
            source: ProfileSource::Embedded,
            temp: Some(temp),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn source(&self) -> ProfileSource {
        self.source
    }

    /// Remove the temporary directory, if one was created. Safe to call twice.
    pub fn cleanup(&mut self) -> Result<()> {
        match self.temp.take() {
            Some(temp) => {
                let dir = temp.path().to_path_buf();
                temp.close()
                    .map_err(|e| GateError::Internal(format!("remove {} failed: {e}", dir.display())))?;
                tracing::debug!(dir = %dir.display(), "profiles temp dir removed");
                Ok(())
            }
            None => Ok(()),
        }
    }
}
