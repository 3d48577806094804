//! CLI configuration
//!
//! A small TOML config file merged with command-line overrides. Vault
//! discovery walks a fixed candidate order and accepts the first directory
//! carrying the `_meta/conventions.md` marker.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;
use vellum_graph::index::{MARKER_FILE, META_DIR};

/// On-disk config file shape. All fields optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FileConfig {
    pub vault: Option<PathBuf>,
    pub migration_dir: Option<PathBuf>,
}

/// Effective configuration after merging file values and CLI overrides.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    /// Explicit vault path from flag or config, if any.
    pub vault: Option<PathBuf>,
    /// Migration working directory override, if any.
    pub migration_dir: Option<PathBuf>,
}

impl CliConfig {
    /// Default config file location: `~/.config/vellum/config.toml`.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("vellum").join("config.toml"))
    }

    /// Load configuration, merging the config file (explicit path or the
    /// default location) with CLI overrides. A missing file is fine; a
    /// malformed one is an error worth surfacing.
    pub fn load(config_path: Option<PathBuf>, vault_override: Option<PathBuf>) -> Result<Self> {
        let path = config_path.or_else(Self::default_path);

        let file_config = match path {
            Some(ref path) if path.exists() => {
                let text = fs::read_to_string(path)
                    .with_context(|| format!("reading config file {}", path.display()))?;
                toml::from_str::<FileConfig>(&text)
                    .with_context(|| format!("parsing config file {}", path.display()))?
            }
            _ => FileConfig::default(),
        };

        Ok(Self {
            vault: vault_override.or(file_config.vault),
            migration_dir: file_config.migration_dir,
        })
    }

    /// Find the vault root: the explicit path if given, else `./vault`.
    /// Every candidate must carry the marker file.
    pub fn resolve_vault(&self) -> Option<PathBuf> {
        let mut candidates: Vec<PathBuf> = Vec::new();
        if let Some(vault) = &self.vault {
            candidates.push(vault.clone());
        }
        if let Ok(cwd) = std::env::current_dir() {
            candidates.push(cwd.join("vault"));
        }

        for candidate in candidates {
            if has_marker(&candidate) {
                debug!(vault = %candidate.display(), "resolved vault root");
                return Some(candidate);
            }
        }
        None
    }

    /// Migration working directory: the configured override, or a
    /// `migration/` directory next to the vault.
    pub fn resolve_migration_dir(&self, vault_root: &Path) -> PathBuf {
        if let Some(dir) = &self.migration_dir {
            return dir.clone();
        }
        vault_root
            .parent()
            .map(|parent| parent.join("migration"))
            .unwrap_or_else(|| PathBuf::from("migration"))
    }
}

fn has_marker(path: &Path) -> bool {
    path.join(META_DIR).join(MARKER_FILE).is_file()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_vault(root: &Path) {
        fs::create_dir_all(root.join(META_DIR)).unwrap();
        fs::write(root.join(META_DIR).join(MARKER_FILE), "# Conventions\n").unwrap();
    }

    #[test]
    fn test_explicit_vault_requires_marker() {
        let dir = tempfile::tempdir().unwrap();
        let config = CliConfig {
            vault: Some(dir.path().to_path_buf()),
            migration_dir: None,
        };
        assert!(config.resolve_vault().is_none());

        make_vault(dir.path());
        assert_eq!(config.resolve_vault(), Some(dir.path().to_path_buf()));
    }

    #[test]
    fn test_config_file_merge_and_override() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("config.toml");
        fs::write(&config_path, "vault = \"/from/file\"\n").unwrap();

        let from_file = CliConfig::load(Some(config_path.clone()), None).unwrap();
        assert_eq!(from_file.vault, Some(PathBuf::from("/from/file")));

        let overridden =
            CliConfig::load(Some(config_path), Some(PathBuf::from("/from/flag"))).unwrap();
        assert_eq!(overridden.vault, Some(PathBuf::from("/from/flag")));
    }

    #[test]
    fn test_malformed_config_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("config.toml");
        fs::write(&config_path, "vault = [broken\n").unwrap();
        assert!(CliConfig::load(Some(config_path), None).is_err());
    }

    #[test]
    fn test_migration_dir_beside_vault() {
        let config = CliConfig::default();
        assert_eq!(
            config.resolve_migration_dir(Path::new("/repo/vault")),
            PathBuf::from("/repo/migration")
        );

        let with_override = CliConfig {
            vault: None,
            migration_dir: Some(PathBuf::from("/custom/migration")),
        };
        assert_eq!(
            with_override.resolve_migration_dir(Path::new("/repo/vault")),
            PathBuf::from("/custom/migration")
        );
    }
}
