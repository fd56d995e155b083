//! Configuration loading and data folder resolution

use crate::{Error, Result};
use serde::Deserialize;
use std::path::PathBuf;

/// Default port for the kiosk service
pub const DEFAULT_PORT: u16 = 5810;

/// Default base endpoint for the remote member registry
pub const DEFAULT_REGISTRY_URL: &str = "http://localhost:5800/api/members";

/// Resolved kiosk configuration
#[derive(Debug, Clone)]
pub struct KioskConfig {
    /// Port the kiosk HTTP API listens on
    pub port: u16,
    /// Base endpoint of the remote member registry
    pub registry_url: String,
    /// Folder holding the kiosk database
    pub data_folder: PathBuf,
}

/// Optional TOML config file contents
#[derive(Debug, Clone, Default, Deserialize)]
struct ConfigFile {
    port: Option<u16>,
    registry_url: Option<String>,
    data_folder: Option<String>,
}

impl KioskConfig {
    /// Resolve configuration following the priority order:
    /// 1. Command-line argument (highest priority)
    /// 2. Environment variable (handled by clap `env` attributes upstream)
    /// 3. TOML config file
    /// 4. Compiled default (fallback)
    pub fn resolve(
        cli_port: Option<u16>,
        cli_registry_url: Option<&str>,
        cli_data_folder: Option<&str>,
    ) -> Result<Self> {
        let file = load_config_file().unwrap_or_default();

        let port = cli_port.or(file.port).unwrap_or(DEFAULT_PORT);

        let registry_url = cli_registry_url
            .map(str::to_string)
            .or(file.registry_url)
            .unwrap_or_else(|| DEFAULT_REGISTRY_URL.to_string());

        let data_folder = cli_data_folder
            .map(PathBuf::from)
            .or(file.data_folder.map(PathBuf::from))
            .unwrap_or_else(default_data_folder);

        Ok(Self {
            port,
            registry_url,
            data_folder,
        })
    }

    /// Path of the kiosk SQLite database inside the data folder
    pub fn database_path(&self) -> PathBuf {
        self.data_folder.join("acmp-kiosk.db")
    }
}

/// Load the optional TOML config file for the platform
fn load_config_file() -> Result<ConfigFile> {
    let path = config_file_path()?;
    let contents = std::fs::read_to_string(&path)?;
    toml::from_str(&contents).map_err(|e| Error::Config(format!("{}: {e}", path.display())))
}

/// Default configuration file path for the platform
fn config_file_path() -> Result<PathBuf> {
    if cfg!(target_os = "linux") {
        // Try ~/.config/acmp/config.toml first, then /etc/acmp/config.toml
        if let Some(path) = dirs::config_dir().map(|d| d.join("acmp").join("config.toml")) {
            if path.exists() {
                return Ok(path);
            }
        }
        let system_config = PathBuf::from("/etc/acmp/config.toml");
        if system_config.exists() {
            return Ok(system_config);
        }
        Err(Error::Config("No config file found".to_string()))
    } else {
        let path = dirs::config_dir()
            .map(|d| d.join("acmp").join("config.toml"))
            .ok_or_else(|| Error::Config("Could not determine config directory".to_string()))?;
        if path.exists() {
            Ok(path)
        } else {
            Err(Error::Config(format!("Config file not found: {path:?}")))
        }
    }
}

/// OS-dependent default data folder
fn default_data_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("acmp"))
        .unwrap_or_else(|| PathBuf::from("./acmp_data"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_arguments_win() {
        let config = KioskConfig::resolve(Some(6000), Some("http://registry.test/api"), Some("/tmp/acmp")).unwrap();
        assert_eq!(config.port, 6000);
        assert_eq!(config.registry_url, "http://registry.test/api");
        assert_eq!(config.data_folder, PathBuf::from("/tmp/acmp"));
        assert_eq!(config.database_path(), PathBuf::from("/tmp/acmp/acmp-kiosk.db"));
    }

    #[test]
    fn test_defaults_apply() {
        let config = KioskConfig::resolve(None, None, Some("/tmp/acmp")).unwrap();
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.registry_url, DEFAULT_REGISTRY_URL);
    }
}
