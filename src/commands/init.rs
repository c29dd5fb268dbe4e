//! Init command implementation

use crate::config::Config;
use crate::error::{Error, Result};
use std::path::{Path, PathBuf};
use tracing::info;

/// Resolve `--config` into (base dir, config file)
///
/// A `.toml` path is the config file itself; anything else is a directory.
pub fn resolve_init_paths(config: Option<&Path>) -> (PathBuf, PathBuf) {
    match config {
        Some(path) if path.extension().is_some_and(|e| e == "toml") => {
            let base = path
                .parent()
                .map(PathBuf::from)
                .unwrap_or_else(Config::default_base_dir);
            (base, path.to_path_buf())
        }
        Some(dir) => (dir.to_path_buf(), dir.join("config.toml")),
        None => {
            let base = Config::default_base_dir();
            let file = base.join("config.toml");
            (base, file)
        }
    }
}

/// Write a default configuration file
pub async fn cmd_init(base_dir: PathBuf, config_path: PathBuf, force: bool) -> Result<Config> {
    if config_path.exists() && !force {
        return Err(Error::AlreadyInitialized(config_path.display().to_string()));
    }

    let mut config = Config::default();
    config.init_paths(Some(base_dir));
    config.paths.config_file = config_path;
    config.save()?;

    info!("Initialized sqlrag in {}", config.paths.base_dir.display());
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_init_writes_loadable_config() {
        let dir = TempDir::new().unwrap();
        let (base, file) = resolve_init_paths(Some(dir.path()));

        cmd_init(base, file.clone(), false).await.unwrap();
        let loaded = Config::load(&file).unwrap();
        assert_eq!(loaded.query.row_limit, 1000);
        assert_eq!(loaded.paths.base_dir, dir.path());
    }

    #[tokio::test]
    async fn test_init_refuses_to_overwrite_without_force() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("custom.toml");
        let (base, file) = resolve_init_paths(Some(&file));
        assert_eq!(base, dir.path());

        cmd_init(base.clone(), file.clone(), false).await.unwrap();
        let err = cmd_init(base.clone(), file.clone(), false).await.unwrap_err();
        assert!(matches!(err, Error::AlreadyInitialized(_)));

        assert!(cmd_init(base, file, true).await.is_ok());
    }
}
