//! Simulated device sessions and their persistence between CLI invocations.
//!
//! # Main Components
//!
//! - [`DeviceSession`] - One simulated connection with a per-command round-robin cursor
//! - [`SnapshotStore`] - JSON file of serialized sessions keyed by address
//! - [`SessionManager`] - Explicit context object tying the registry and the store together

use std::collections::HashMap;

use log::{debug, trace};
use serde::{Deserialize, Serialize};

use crate::device::{DeviceRecord, DeviceRegistry, OutputValue};
use crate::error::DeviceError;

pub use manager::{ConnectOutcome, Executed, SessionManager, parse_operand};
pub use snapshot::{SnapshotInfo, SnapshotStore};

/// A simulated connection to one registered device.
///
/// The session keeps its own copy of the record it was bound to on connect, so
/// a persisted session keeps serving the data it connected with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceSession {
    address: String,
    name: String,
    #[serde(default)]
    connected: bool,
    #[serde(default)]
    record: Option<DeviceRecord>,
    #[serde(default)]
    testcase: Option<String>,

    /// Last index served per command line, for sequence-valued outputs.
    #[serde(default)]
    cursor: HashMap<String, usize>,
}

impl DeviceSession {
    /// Creates a disconnected session; the display name defaults to the address.
    pub fn new(address: &str) -> Self {
        let address = address.trim().to_string();
        Self {
            name: address.clone(),
            address,
            connected: false,
            record: None,
            testcase: None,
            cursor: HashMap::new(),
        }
    }

    /// Sets the display name. Blank names keep the address.
    pub fn with_name(mut self, name: &str) -> Self {
        let name = name.trim();
        if !name.is_empty() {
            self.name = name.to_string();
        }
        self
    }

    /// Sets the active test case. Blank names clear it.
    pub fn with_testcase(mut self, testcase: Option<&str>) -> Self {
        self.testcase = testcase
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string);
        self
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn testcase(&self) -> Option<&str> {
        self.testcase.as_deref()
    }

    /// The record bound on the last successful connect.
    pub fn record(&self) -> Option<&DeviceRecord> {
        self.record.as_ref()
    }

    /// Login text of the bound record.
    pub fn login(&self) -> Option<&str> {
        self.record.as_ref().map(|record| record.login.as_str())
    }

    /// Last index served for a sequence-valued command line.
    pub fn cursor(&self, cmdline: &str) -> Option<usize> {
        self.cursor.get(cmdline).copied()
    }
}

mod client;
mod manager;
mod snapshot;
