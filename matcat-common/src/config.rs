//! Configuration loading and root folder resolution

use crate::{Error, Result};
use std::path::PathBuf;

/// Root folder resolution priority order:
/// 1. Command-line argument (highest priority)
/// 2. Environment variable
/// 3. TOML config file
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
    if config_file_key.is_some() {
        if let Ok(config_path) = load_config_file() {
            if let Ok(toml_content) = std::fs::read_to_string(&config_path) {
                if let Ok(config) = toml::from_str::<toml::Value>(&toml_content) {
                    if let Some(root_folder) = config.get("root_folder").and_then(|v| v.as_str()) {
                        return Ok(PathBuf::from(root_folder));
                    }
                }
            }
        }
    }

    // Priority 4: OS-dependent compiled default
    Ok(get_default_root_folder())
}

/// Get default configuration file path for the platform
fn load_config_file() -> Result<PathBuf> {
    let config_dir = if cfg!(target_os = "linux") {
        // Try ~/.config/matcat/config.toml first, then /etc/matcat/config.toml
        let user_config = dirs::config_dir().map(|d| d.join("matcat").join("config.toml"));
        let system_config = PathBuf::from("/etc/matcat/config.toml");

        if let Some(path) = user_config {
            if path.exists() {
                return Ok(path);
            }
        }
        if system_config.exists() {
            return Ok(system_config);
        }
        return Err(Error::Config("No config file found".to_string()));
    } else if cfg!(target_os = "macos") || cfg!(target_os = "windows") {
        dirs::config_dir()
            .map(|d| d.join("matcat").join("config.toml"))
            .ok_or_else(|| Error::Config("Could not determine config directory".to_string()))?
    } else {
        return Err(Error::Config("Unsupported platform".to_string()));
    };

    if config_dir.exists() {
        Ok(config_dir)
    } else {
        Err(Error::Config(format!("Config file not found: {:?}", config_dir)))
    }
}

/// Get OS-dependent default root folder path
fn get_default_root_folder() -> PathBuf {
    if cfg!(target_os = "linux") {
        // ~/.local/share/matcat (or /var/lib/matcat for system-wide)
        dirs::data_local_dir()
            .map(|d| d.join("matcat"))
            .unwrap_or_else(|| PathBuf::from("/var/lib/matcat"))
    } else if cfg!(target_os = "macos") {
        // ~/Library/Application Support/matcat
        dirs::data_dir()
            .map(|d| d.join("matcat"))
            .unwrap_or_else(|| PathBuf::from("/Library/Application Support/matcat"))
    } else if cfg!(target_os = "windows") {
        // %LOCALAPPDATA%\matcat
        dirs::data_local_dir()
            .map(|d| d.join("matcat"))
            .unwrap_or_else(|| PathBuf::from("C:\\ProgramData\\matcat"))
    } else {
        PathBuf::from("./matcat_data")
    }
}

/// Resolves the root folder for a named service and can create it on demand.
pub struct RootFolderResolver {
    service_name: String,
}

impl RootFolderResolver {
    pub fn new(service_name: &str) -> Self {
        Self {
            service_name: service_name.to_string(),
        }
    }

    /// Resolve the root folder using the standard priority order.
    ///
    /// The environment variable is derived from the service name:
    /// `catalog-ingest` → `MATCAT_CATALOG_INGEST_ROOT`.
    pub fn resolve(&self) -> PathBuf {
        let env_var = format!(
            "MATCAT_{}_ROOT",
            self.service_name.to_uppercase().replace('-', "_")
        );
        resolve_root_folder(None, &env_var, Some("root_folder"))
            .unwrap_or_else(|_| get_default_root_folder())
    }
}

/// Ensures the resolved root folder exists and locates the database file.
pub struct RootFolderInitializer {
    root_folder: PathBuf,
}

impl RootFolderInitializer {
    pub fn new(root_folder: PathBuf) -> Self {
        Self { root_folder }
    }

    /// Create the root folder directory if missing
    pub fn ensure_directory_exists(&self) -> Result<()> {
        std::fs::create_dir_all(&self.root_folder)?;
        Ok(())
    }

    /// Path to the shared database file inside the root folder
    pub fn database_path(&self) -> PathBuf {
        self.root_folder.join("matcat.db")
    }
}
