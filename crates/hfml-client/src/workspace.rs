//! Workspace `config.json` discovery and synthesis.
//!
//! Discovery starts in a directory and walks toward the filesystem root,
//! checking `config.json` and then `.azureml/config.json` at each level.
//! When nothing is found the session synthesizes a config from its own
//! settings and writes it to the fallback path.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::errors::{ClientError, Result};

const CONFIG_FILE_NAME: &str = "config.json";
const CONFIG_DIR_NAME: &str = ".azureml";

/// Identifiers of the target workspace.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspaceConfig {
    /// Azure subscription.
    pub subscription_id: String,
    /// Resource group holding the workspace.
    pub resource_group: String,
    /// Workspace name.
    pub workspace_name: String,
}

impl WorkspaceConfig {
    /// Config built from explicit identifiers.
    pub fn new(
        subscription_id: impl Into<String>,
        resource_group: impl Into<String>,
        workspace_name: impl Into<String>,
    ) -> Self {
        Self {
            subscription_id: subscription_id.into(),
            resource_group: resource_group.into(),
            workspace_name: workspace_name.into(),
        }
    }

    /// Search `start` and its ancestors for a workspace config.
    pub fn discover(start: &Path) -> Result<(Self, PathBuf)> {
        let start = std::path::absolute(start)?;
        for dir in start.ancestors() {
            for candidate in [
                dir.join(CONFIG_FILE_NAME),
                dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME),
            ] {
                if candidate.is_file() {
                    debug!(path = %candidate.display(), "found workspace config");
                    let config = Self::from_path(&candidate)?;
                    return Ok((config, candidate));
                }
            }
        }
        Err(ClientError::WorkspaceConfigNotFound(start))
    }

    /// Load a config file.
    pub fn from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self =
            serde_json::from_str(&content).map_err(|e| ClientError::InvalidWorkspaceConfig {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;
        if config.subscription_id.is_empty()
            || config.resource_group.is_empty()
            || config.workspace_name.is_empty()
        {
            return Err(ClientError::InvalidWorkspaceConfig {
                path: path.to_path_buf(),
                message: "empty identifier".to_string(),
            });
        }
        Ok(config)
    }

    /// Write the config as JSON, creating parent directories.
    pub fn write_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string(self)?)?;
        info!(path = %path.display(), "wrote workspace config");
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    fn sample() -> WorkspaceConfig {
        WorkspaceConfig::new("sub", "rg", "ws")
    }

    #[test]
    fn write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join(".azureml").join("config.json");
        sample().write_to(&path).unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        let keys: Vec<&str> = raw.as_object().unwrap().keys().map(String::as_str).collect();
        assert_eq!(keys, ["subscription_id", "resource_group", "workspace_name"]);
        assert_eq!(WorkspaceConfig::from_path(&path).unwrap(), sample());
    }

    #[test]
    fn discover_in_azureml_dir_of_ancestor() {
        let dir = tempfile::tempdir().unwrap();
        sample()
            .write_to(&dir.path().join(".azureml").join("config.json"))
            .unwrap();
        let deep = dir.path().join("a").join("b");
        std::fs::create_dir_all(&deep).unwrap();

        let (config, found) = WorkspaceConfig::discover(&deep).unwrap();
        assert_eq!(config, sample());
        assert!(found.ends_with(".azureml/config.json"));
    }

    #[test]
    fn discover_prefers_plain_config_json() {
        let dir = tempfile::tempdir().unwrap();
        WorkspaceConfig::new("sub", "rg", "plain")
            .write_to(&dir.path().join("config.json"))
            .unwrap();
        sample()
            .write_to(&dir.path().join(".azureml").join("config.json"))
            .unwrap();

        let (config, _) = WorkspaceConfig::discover(dir.path()).unwrap();
        assert_eq!(config.workspace_name, "plain");
    }

    #[test]
    fn invalid_json_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"subscription_id": "sub"}"#).unwrap();
        assert_matches!(
            WorkspaceConfig::from_path(&path),
            Err(ClientError::InvalidWorkspaceConfig { .. })
        );
    }

    #[test]
    fn empty_identifier_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        WorkspaceConfig::new("sub", "", "ws").write_to(&path).unwrap();
        assert_matches!(
            WorkspaceConfig::from_path(&path),
            Err(ClientError::InvalidWorkspaceConfig { .. })
        );
    }
}
