use super::*;
use crate::device::write_replacing;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Summary of the snapshot file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SnapshotInfo {
    pub filename: PathBuf,
    pub existed: bool,
    pub total: usize,
}

impl SnapshotInfo {
    /// Human readable summary.
    pub fn text(&self) -> String {
        [
            "Serialized Device(s) Info:".to_string(),
            format!("  - Location: {}", self.filename.display()),
            format!("  - Existed: {}", if self.existed { "Yes" } else { "No" }),
            format!("  - Total serialized instances: {}", self.total),
        ]
        .join("\n")
    }
}

/// File-backed store of serialized sessions keyed by address.
///
/// Every operation reads the whole file, and writes replace it as a whole.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotStore {
    path: PathBuf,
}

impl SnapshotStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    pub fn info(&self) -> Result<SnapshotInfo, DeviceError> {
        let existed = self.exists();
        let total = if existed { self.read_all()?.len() } else { 0 };
        Ok(SnapshotInfo {
            filename: self.path.clone(),
            existed,
            total,
        })
    }

    pub fn info_text(&self) -> Result<String, DeviceError> {
        Ok(self.info()?.text())
    }

    /// True when a session is stored for `address` and, if a test case is
    /// given, that session runs the same test case.
    pub fn check_instance(
        &self,
        address: &str,
        testcase: Option<&str>,
    ) -> Result<bool, DeviceError> {
        let Some(session) = self.get(address)? else {
            return Ok(false);
        };
        Ok(match testcase.map(str::trim).filter(|t| !t.is_empty()) {
            Some(testcase) => session.testcase() == Some(testcase),
            None => true,
        })
    }

    pub fn get(&self, address: &str) -> Result<Option<DeviceSession>, DeviceError> {
        Ok(self.read_all()?.remove(address))
    }

    pub fn put(&self, address: &str, session: &DeviceSession) -> Result<(), DeviceError> {
        let mut sessions = self.read_all()?;
        sessions.insert(address.to_string(), session.clone());
        self.write_all(&sessions)?;
        debug!("stored session of {address} in {}", self.path.display());
        Ok(())
    }

    /// Removes the session of `address`; returns whether one was stored.
    pub fn remove(&self, address: &str) -> Result<bool, DeviceError> {
        let mut sessions = self.read_all()?;
        if sessions.remove(address).is_none() {
            return Ok(false);
        }
        self.write_all(&sessions)?;
        debug!("removed session of {address} from {}", self.path.display());
        Ok(true)
    }

    fn read_all(&self) -> Result<BTreeMap<String, DeviceSession>, DeviceError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(err) => return Err(err.into()),
        };
        if content.trim().is_empty() {
            return Ok(BTreeMap::new());
        }

        let serde_json::Value::Object(entries) = serde_json::from_str::<serde_json::Value>(&content)? else {
            return Err(DeviceError::Format(self.path.display().to_string()));
        };
        let mut sessions = BTreeMap::new();
        for (address, value) in entries {
            let session: DeviceSession = serde_json::from_value(value)?;
            sessions.insert(address, session);
        }
        trace!("read {} session(s) from {}", sessions.len(), self.path.display());
        Ok(sessions)
    }

    fn write_all(&self, sessions: &BTreeMap<String, DeviceSession>) -> Result<(), DeviceError> {
        let content = serde_json::to_string_pretty(sessions)?;
        write_replacing(&self.path, &content)
    }
}
