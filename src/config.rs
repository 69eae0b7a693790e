//! Locations of the persistent files used between CLI invocations.
//!
//! Two files live under one home directory: the YAML device-info document that
//! backs the [`DeviceRegistry`](crate::device::DeviceRegistry) and the JSON
//! snapshot store holding serialized sessions.

use std::path::{Path, PathBuf};

/// Environment variable overriding the home directory.
pub const HOME_ENV: &str = "UNREAL_DEVICE_HOME";

/// Default home directory, relative to the user's home.
pub const DEFAULT_HOME: &[&str] = &[".geekstrident", "unreal-device"];

/// File name of the device-info document.
pub const DEVICES_INFO_FILE: &str = "devices_info.yaml";

/// File name of the session snapshot store.
pub const SNAPSHOT_FILE: &str = "serialized_sessions.json";

/// Resolved paths of the persistent files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppPaths {
    pub home: PathBuf,
    pub devices_info: PathBuf,
    pub snapshot: PathBuf,
}

impl AppPaths {
    /// Paths rooted at an explicit directory.
    pub fn in_dir(home: impl Into<PathBuf>) -> Self {
        let home = home.into();
        Self {
            devices_info: home.join(DEVICES_INFO_FILE),
            snapshot: home.join(SNAPSHOT_FILE),
            home,
        }
    }

    /// Resolves the home directory: explicit override, then `UNREAL_DEVICE_HOME`,
    /// then `~/.geekstrident/unreal-device`.
    pub fn resolve(override_home: Option<&Path>) -> Self {
        if let Some(home) = override_home {
            return Self::in_dir(expand_user(home));
        }
        if let Some(home) = std::env::var_os(HOME_ENV).filter(|v| !v.is_empty()) {
            return Self::in_dir(expand_user(Path::new(&home)));
        }
        let mut home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        for part in DEFAULT_HOME {
            home.push(part);
        }
        Self::in_dir(home)
    }
}

/// Expands a leading `~` to the user's home directory.
pub fn expand_user(path: &Path) -> PathBuf {
    let Ok(rest) = path.strip_prefix("~") else {
        return path.to_path_buf();
    };
    match dirs::home_dir() {
        Some(home) => home.join(rest),
        None => path.to_path_buf(),
    }
}
