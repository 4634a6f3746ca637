//! On-disk cache of the token exchange response.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use serde_json::{Serializer, Value};

use crate::Result;

/// Token storage for persisting the raw token-endpoint response.
///
/// The file holds the JSON exactly as the token endpoint returned it,
/// pretty-printed. Only `access_token` is read back.
#[derive(Debug, Clone)]
pub struct TokenCache {
    path: PathBuf,
}

impl TokenCache {
    /// Create a cache backed by `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Platform config directory location, e.g.
    /// `~/.config/monzo-expenses/monzo.json` on Linux.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("monzo-expenses").join("monzo.json"))
    }

    /// Get the storage path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the cached response, `None` if nothing has been stored.
    pub fn load(&self) -> Result<Option<Value>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(&self.path)?;
        Ok(Some(serde_json::from_str(&content)?))
    }

    /// The cached access token, if one is stored.
    pub fn access_token(&self) -> Result<Option<String>> {
        Ok(self.load()?.and_then(|response| {
            response
                .get("access_token")
                .and_then(Value::as_str)
                .filter(|token| !token.is_empty())
                .map(str::to_string)
        }))
    }

    /// Persist a token response, replacing any previous one.
    ///
    /// The file is indented with four spaces and, on Unix, is created with
    /// mode `0600` so the token is never readable by other users.
    pub fn store(&self, response: &Value) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut content = Vec::new();
        let formatter = PrettyFormatter::with_indent(b"    ");
        let mut serializer = Serializer::with_formatter(&mut content, formatter);
        response.serialize(&mut serializer)?;

        let mut options = OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }
        let mut file = options.open(&self.path)?;
        file.write_all(&content)?;

        // A file left by an earlier run keeps its old mode on open.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            file.set_permissions(std::fs::Permissions::from_mode(0o600))?;
        }

        tracing::debug!(path = %self.path.display(), "Stored token response");
        Ok(())
    }

    /// Drop a token the API has rejected so the next run signs in again.
    pub(crate) fn clear_access_token(&self) -> Result<()> {
        if self.path.exists() {
            std::fs::remove_file(&self.path)?;
            tracing::debug!(path = %self.path.display(), "Removed rejected token response");
        }
        Ok(())
    }
}
