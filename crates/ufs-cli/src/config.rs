use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};
use ufs_codec::BuilderConfig;
use ufs_fetch::FetchConfig;

/// File looked up in the working directory when `--config` is absent.
pub const DEFAULT_CONFIG_FILE: &str = "ufs.toml";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Root of the loose block store.
    pub store: PathBuf,
    pub builder: BuilderConfig,
    pub fetch: FetchConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store: PathBuf::from(".ufs/blocks"),
            builder: BuilderConfig::default(),
            fetch: FetchConfig::default(),
        }
    }
}

impl Config {
    /// Load `path`, or `ufs.toml` when it exists, or the defaults.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None if Path::new(DEFAULT_CONFIG_FILE).is_file() => {
                Self::from_file(Path::new(DEFAULT_CONFIG_FILE))
            }
            None => Ok(Self::default()),
        }
    }

    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("invalid config {}", path.display()))
    }

    pub fn parse(text: &str) -> anyhow::Result<Self> {
        let config: Self = toml::from_str(text)?;
        config.builder.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let c = Config::default();
        assert_eq!(c.store, PathBuf::from(".ufs/blocks"));
        assert_eq!(c.builder, BuilderConfig::default());
        assert_eq!(c.fetch.max_prefetch, 16);
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let c = Config::parse(
            r#"
            store = "/var/lib/ufs"

            [builder]
            chunk_size = 65536

            [fetch]
            max_prefetch = 0
            "#,
        )
        .unwrap();
        assert_eq!(c.store, PathBuf::from("/var/lib/ufs"));
        assert_eq!(c.builder.chunk_size, 65536);
        assert_eq!(c.builder.max_links, BuilderConfig::default().max_links);
        assert_eq!(c.fetch.max_prefetch, 0);
    }

    #[test]
    fn invalid_builder_rejected() {
        assert!(Config::parse("[builder]\nchunk_size = 0").is_err());
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        fs::write(&path, "store = \"blocks\"").unwrap();
        let c = Config::load(Some(&path)).unwrap();
        assert_eq!(c.store, PathBuf::from("blocks"));
        assert!(Config::load(Some(&dir.path().join("absent.toml"))).is_err());
    }
}
