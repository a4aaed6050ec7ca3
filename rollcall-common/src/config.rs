//! Configuration loading and root folder resolution

use crate::{Error, Result};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Database file name inside the root folder
pub const DATABASE_FILE: &str = "rollcall.db";

/// Root folder resolution priority order:
/// 1. Command-line argument (highest priority)
/// 2. Environment variable
/// 3. TOML config file (value under `config_file_key`)
/// 4. OS-dependent compiled default (fallback)
pub fn resolve_root_folder(
    cli_arg: Option<&str>,
    env_var_name: &str,
    config_file_key: Option<&str>,
) -> Result<PathBuf> {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return Ok(PathBuf::from(path));
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(env_var_name) {
        return Ok(PathBuf::from(path));
    }

    // Priority 3: TOML config file
    if let Some(key) = config_file_key {
        if let Some(config) = load_toml_config() {
            if let Some(root_folder) = config.get(key).and_then(|v| v.as_str()) {
                return Ok(PathBuf::from(root_folder));
            }
        }
    }

    // Priority 4: OS-dependent compiled default
    Ok(get_default_root_folder())
}

/// Path of the SQLite database inside a root folder
pub fn database_path(root_folder: &Path) -> PathBuf {
    root_folder.join(DATABASE_FILE)
}

/// Load and parse the platform config file, if one exists
///
/// A missing or malformed file is not an error: callers fall back to
/// defaults, so this only logs at debug level.
pub fn load_toml_config() -> Option<toml::Value> {
    let path = match locate_config_file() {
        Ok(path) => path,
        Err(e) => {
            debug!("No config file: {}", e);
            return None;
        }
    };
    load_toml_file(&path).map_err(|e| debug!("{}", e)).ok()
}

/// Parse a TOML file into a generic value
pub fn load_toml_file(path: &Path) -> Result<toml::Value> {
    let content = std::fs::read_to_string(path)?;
    toml::from_str::<toml::Value>(&content)
        .map_err(|e| Error::Config(format!("Invalid TOML in {}: {}", path.display(), e)))
}

/// Get configuration file path for the platform
fn locate_config_file() -> Result<PathBuf> {
    let config_path = if cfg!(target_os = "linux") {
        // Try ~/.config/rollcall/config.toml first, then /etc/rollcall/config.toml
        let user_config = dirs::config_dir().map(|d| d.join("rollcall").join("config.toml"));
        let system_config = PathBuf::from("/etc/rollcall/config.toml");

        if let Some(path) = user_config {
            if path.exists() {
                return Ok(path);
            }
        }
        if system_config.exists() {
            return Ok(system_config);
        }
        return Err(Error::Config("No config file found".to_string()));
    } else if cfg!(any(target_os = "macos", target_os = "windows")) {
        dirs::config_dir()
            .map(|d| d.join("rollcall").join("config.toml"))
            .ok_or_else(|| Error::Config("Could not determine config directory".to_string()))?
    } else {
        return Err(Error::Config("Unsupported platform".to_string()));
    };

    if config_path.exists() {
        Ok(config_path)
    } else {
        Err(Error::Config(format!("Config file not found: {:?}", config_path)))
    }
}

/// Get OS-dependent default root folder path
fn get_default_root_folder() -> PathBuf {
    if cfg!(target_os = "linux") {
        // ~/.local/share/rollcall (or /var/lib/rollcall for system-wide)
        dirs::data_local_dir()
            .map(|d| d.join("rollcall"))
            .unwrap_or_else(|| PathBuf::from("/var/lib/rollcall"))
    } else if cfg!(target_os = "macos") {
        dirs::data_dir()
            .map(|d| d.join("rollcall"))
            .unwrap_or_else(|| PathBuf::from("/Library/Application Support/rollcall"))
    } else if cfg!(target_os = "windows") {
        dirs::data_local_dir()
            .map(|d| d.join("rollcall"))
            .unwrap_or_else(|| PathBuf::from("C:\\ProgramData\\rollcall"))
    } else {
        PathBuf::from("./rollcall_data")
    }
}
