//! Configuration for the `same` vault engine.
//!
//! Mirrors the shape of `crucible-config`/`crucible-cli::config`: a single
//! top-level struct with `Default`, an optional TOML file, and environment
//! variable overrides. Precedence, highest to lowest: CLI flag > env var >
//! TOML file > built-in default — the same order `crucible-cli/src/config.rs`
//! asserts in its override tests.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("vault root {0} must be an absolute path")]
    VaultRootNotAbsolute(PathBuf),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProviderType {
    Local,
    OpenAi,
}

impl Default for EmbeddingProviderType {
    fn default() -> Self {
        EmbeddingProviderType::Local
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    #[serde(default)]
    pub provider: EmbeddingProviderType,
    #[serde(default = "default_ollama_url")]
    pub api_url: String,
    pub model: Option<String>,
    pub api_key: Option<String>,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

fn default_ollama_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_batch_size() -> usize {
    16
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: EmbeddingProviderType::default(),
            api_url: default_ollama_url(),
            model: None,
            api_key: None,
            batch_size: default_batch_size(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexConfig {
    #[serde(default = "default_worker_count")]
    pub worker_count: usize,
    #[serde(default = "default_chunk_threshold")]
    pub chunk_single_threshold_chars: usize,
    #[serde(default = "default_embed_cap")]
    pub embed_size_cap_chars: usize,
    #[serde(default = "default_skip_dirs")]
    pub skip_dirs: Vec<String>,
}

fn default_worker_count() -> usize {
    4
}

fn default_chunk_threshold() -> usize {
    6_000
}

fn default_embed_cap() -> usize {
    8_000
}

fn default_skip_dirs() -> Vec<String> {
    vec![
        ".git".to_string(),
        ".same".to_string(),
        ".obsidian".to_string(),
    ]
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            worker_count: default_worker_count(),
            chunk_single_threshold_chars: default_chunk_threshold(),
            embed_size_cap_chars: default_embed_cap(),
            skip_dirs: default_skip_dirs(),
        }
    }
}

/// Top-level configuration. `vault_path` defaults to the current directory,
/// the way `CliConfig::default()` defaults `kiln_path` to the cwd.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VaultConfig {
    #[serde(default = "default_vault_path")]
    pub vault_path: PathBuf,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub index: IndexConfig,
}

fn default_vault_path() -> PathBuf {
    std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            vault_path: default_vault_path(),
            embedding: EmbeddingConfig::default(),
            index: IndexConfig::default(),
        }
    }
}

impl VaultConfig {
    /// The on-disk SQLite database path, `<vault>/.same/data/vault.db`.
    pub fn database_path(&self) -> PathBuf {
        self.vault_path.join(".same").join("data").join("vault.db")
    }

    /// Where reindex statistics are written, `<vault>/.same/data/index_stats.json`.
    pub fn index_stats_path(&self) -> PathBuf {
        self.vault_path
            .join(".same")
            .join("data")
            .join("index_stats.json")
    }

    /// Where publish-time audit entries are appended, `<vault>/.same/publish-audit.log`.
    pub fn audit_log_path(&self) -> PathBuf {
        self.vault_path.join(".same").join("publish-audit.log")
    }

    /// Load with explicit CLI-flag overrides for the embedding URL/model,
    /// applying the precedence: CLI flag > env var > file > default.
    pub fn load(
        file_path: Option<PathBuf>,
        cli_embed_url: Option<String>,
        cli_embed_model: Option<String>,
    ) -> Result<Self, ConfigError> {
        let mut config = match file_path {
            Some(path) if path.exists() => Self::load_from_file(&path)?,
            _ => Self::default(),
        };

        if let Ok(vault) = std::env::var("SAME_VAULT") {
            config.vault_path = PathBuf::from(vault);
        }
        if let Ok(url) = std::env::var("OLLAMA_URL") {
            config.embedding.api_url = url;
        }
        if let Ok(model) = std::env::var("SAME_EMBED_MODEL") {
            config.embedding.model = Some(model);
        }
        if let Ok(key) = std::env::var("SAME_EMBED_API_KEY") {
            config.embedding.api_key = Some(key);
        }

        if let Some(url) = cli_embed_url {
            config.embedding.api_url = url;
        }
        if let Some(model) = cli_embed_model {
            config.embedding.model = Some(model);
        }

        Ok(config)
    }

    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn display_as_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// Validate that the configured vault root is usable by `same_core::PathGuard`,
    /// which requires an absolute, canonicalized root.
    pub fn canonical_vault_root(&self) -> Result<PathBuf, ConfigError> {
        if !self.vault_path.is_absolute() {
            return Err(ConfigError::VaultRootNotAbsolute(self.vault_path.clone()));
        }
        Ok(self
            .vault_path
            .canonicalize()
            .unwrap_or_else(|_| self.vault_path.clone()))
    }

    /// Build a [`same_core::PathGuard`] rooted at this config's canonicalized
    /// vault path, ready to validate any externally-supplied path.
    pub fn path_guard(&self) -> Result<same_core::PathGuard, ConfigError> {
        Ok(same_core::PathGuard::new(self.canonical_vault_root()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn default_has_sane_values() {
        let config = VaultConfig::default();
        assert_eq!(config.embedding.batch_size, 16);
        assert_eq!(config.index.worker_count, 4);
        assert_eq!(config.index.chunk_single_threshold_chars, 6_000);
        assert_eq!(config.index.embed_size_cap_chars, 8_000);
    }

    #[test]
    fn load_from_nonexistent_file_falls_back_to_defaults() {
        let temp = TempDir::new().unwrap();
        let nonexistent = temp.path().join("nonexistent.toml");
        let config = VaultConfig::load(Some(nonexistent), None, None).unwrap();
        assert_eq!(config.embedding.batch_size, 16);
    }

    #[test]
    fn load_with_invalid_toml_errors() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("bad.toml");
        fs::write(&path, "not [valid").unwrap();
        let result = VaultConfig::load(Some(path), None, None);
        assert!(result.is_err());
    }

    #[test]
    #[serial]
    fn precedence_is_cli_then_env_then_file_then_default() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        fs::write(
            &path,
            r#"
vault_path = "/file/vault"
[embedding]
api_url = "http://file-embed"
model = "file-model"
"#,
        )
        .unwrap();

        // File alone.
        let file_only = VaultConfig::load(Some(path.clone()), None, None).unwrap();
        assert_eq!(file_only.embedding.api_url, "http://file-embed");
        assert_eq!(file_only.embedding.model, Some("file-model".to_string()));

        // Env overrides file.
        std::env::set_var("OLLAMA_URL", "http://env-embed");
        std::env::set_var("SAME_EMBED_MODEL", "env-model");
        let env_over_file = VaultConfig::load(Some(path.clone()), None, None).unwrap();
        assert_eq!(env_over_file.embedding.api_url, "http://env-embed");
        assert_eq!(env_over_file.embedding.model, Some("env-model".to_string()));

        // CLI overrides env and file.
        let cli_over_env = VaultConfig::load(
            Some(path),
            Some("http://cli-embed".to_string()),
            Some("cli-model".to_string()),
        )
        .unwrap();
        assert_eq!(cli_over_env.embedding.api_url, "http://cli-embed");
        assert_eq!(cli_over_env.embedding.model, Some("cli-model".to_string()));

        std::env::remove_var("OLLAMA_URL");
        std::env::remove_var("SAME_EMBED_MODEL");
    }

    #[test]
    fn database_and_stats_paths_are_derived() {
        let mut config = VaultConfig::default();
        config.vault_path = PathBuf::from("/vault");
        assert_eq!(
            config.database_path(),
            PathBuf::from("/vault/.same/data/vault.db")
        );
        assert_eq!(
            config.index_stats_path(),
            PathBuf::from("/vault/.same/data/index_stats.json")
        );
        assert_eq!(
            config.audit_log_path(),
            PathBuf::from("/vault/.same/publish-audit.log")
        );
    }

    #[test]
    fn canonical_vault_root_rejects_relative_path() {
        let mut config = VaultConfig::default();
        config.vault_path = PathBuf::from("relative/vault");
        assert!(config.canonical_vault_root().is_err());
    }
}
