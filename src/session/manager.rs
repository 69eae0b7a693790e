use super::*;
use crate::config::{AppPaths, expand_user};
use crate::usage;
use log::info;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Matches `[<address-or-name>::]<body>` operands.
static TARGETED_OPERAND: Lazy<Regex> = Lazy::new(|| {
    match Regex::new(r"^(?P<target>\S+::)? *(?P<body>.+)$") {
        Ok(re) => re,
        Err(err) => panic!("invalid TARGETED_OPERAND regex: {err}"),
    }
});

/// Splits an `execute`/`configure` operand into its optional target and body.
///
/// Returns `None` when there is no body.
pub fn parse_operand(operand: &str) -> Option<(Option<String>, String)> {
    let caps = TARGETED_OPERAND.captures(operand.trim())?;
    let target = caps
        .name("target")
        .map(|m| m.as_str().trim_matches(':').to_string());
    let body = caps["body"].trim().to_string();
    if body.is_empty() {
        return None;
    }
    Some((target, body))
}

/// Result of [`SessionManager::connect`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectOutcome {
    /// The session was (re)connected; carries the login text.
    Connected { address: String, login: String },
    /// A persisted session for the address is already connected.
    AlreadyConnected { address: String },
}

/// Output of a command line executed through the manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Executed {
    pub address: String,
    pub output: String,
}

/// Process-wide context: the device registry, the session snapshot store and
/// the paths they were loaded from.
///
/// Built once at startup; every operation persists the sessions it touches.
#[derive(Debug, Clone)]
pub struct SessionManager {
    paths: AppPaths,
    registry: DeviceRegistry,
    store: SnapshotStore,
}

impl SessionManager {
    /// Loads the default device-info file (seeding it when missing) and opens
    /// the snapshot store.
    pub fn open(paths: AppPaths) -> Result<Self, DeviceError> {
        let mut registry = DeviceRegistry::new();
        registry.load_default(&paths)?;
        Ok(Self::with_registry(paths, registry))
    }

    /// Uses an already loaded registry.
    pub fn with_registry(paths: AppPaths, registry: DeviceRegistry) -> Self {
        let store = SnapshotStore::new(paths.snapshot.clone());
        Self {
            paths,
            registry,
            store,
        }
    }

    pub fn paths(&self) -> &AppPaths {
        &self.paths
    }

    pub fn registry(&self) -> &DeviceRegistry {
        &self.registry
    }

    pub fn store(&self) -> &SnapshotStore {
        &self.store
    }

    /// Resolves an address or device name; unknown targets are kept as given.
    pub fn resolve_target(&self, target: &str) -> String {
        self.registry
            .resolve(target)
            .unwrap_or_else(|| target.trim())
            .to_string()
    }

    /// Connects to a device, reusing its persisted session when it runs the
    /// requested test case.
    pub fn connect(
        &self,
        target: &str,
        testcase: Option<&str>,
    ) -> Result<ConnectOutcome, DeviceError> {
        let address = self.resolve_target(target);

        let reusable = if self.store.check_instance(&address, testcase)? {
            self.store.get(&address)?
        } else {
            None
        };

        let mut session = match reusable {
            Some(session) if session.is_connected() => {
                return Ok(ConnectOutcome::AlreadyConnected { address });
            }
            Some(session) => session,
            None => {
                let name = self
                    .registry
                    .get(&address)
                    .and_then(|record| record.name.as_deref())
                    .unwrap_or_default();
                DeviceSession::new(&address)
                    .with_name(name)
                    .with_testcase(testcase)
            }
        };

        session.connect(&self.registry, testcase)?;
        self.store.put(&address, &session)?;
        info!("{address} connected");
        Ok(ConnectOutcome::Connected {
            login: session.login().unwrap_or_default().to_string(),
            address,
        })
    }

    /// Disconnects the persisted session of a device.
    pub fn disconnect(&self, target: &str) -> Result<String, DeviceError> {
        let address = self.resolve_target(target);
        match self.store.get(&address)? {
            Some(mut session) => {
                session.disconnect();
                self.store.put(&address, &session)?;
                info!("{address} disconnected");
                Ok(address)
            }
            None => Err(self.missing_session(target, &address)),
        }
    }

    /// Executes `[<address-or-name>::]<cmdline>` on a persisted session and
    /// stores the advanced cursor.
    pub fn execute(&self, operand: &str) -> Result<Executed, DeviceError> {
        let (address, cmdline) = self.split_operand(operand, usage::EXECUTE, usage::EXECUTE_OTHER)?;
        let Some(mut session) = self.store.get(&address)? else {
            return Err(self.missing_session(&address, &address));
        };
        let output = session.execute(&cmdline)?;
        self.store.put(&address, &session)?;
        Ok(Executed { address, output })
    }

    /// Looks up `[<address-or-name>::]<cfg_reference>` on a persisted session.
    pub fn configure(&self, operand: &str) -> Result<Executed, DeviceError> {
        let (address, config) =
            self.split_operand(operand, usage::CONFIGURE, usage::CONFIGURE_OTHER)?;
        let Some(session) = self.store.get(&address)? else {
            return Err(self.missing_session(&address, &address));
        };
        let output = session.configure(&config)?;
        Ok(Executed { address, output })
    }

    /// Merges (or with `replace`, substitutes) the records of a device-info
    /// file and saves the registry. Returns the addresses written.
    pub fn load(&mut self, file: &Path, replace: bool) -> Result<Vec<String>, DeviceError> {
        let path = expand_user(file);
        let source = fs::read_to_string(&path)?;
        let written = self
            .registry
            .update(&source, &path.display().to_string(), replace)?;
        self.registry.save_file(&self.paths.devices_info)?;
        info!(
            "loaded {} record(s) from {} into {}",
            written.len(),
            path.display(),
            self.paths.devices_info.display()
        );
        Ok(written)
    }

    /// YAML rendering of a device record, or of one of its test cases.
    pub fn view(&self, target: &str, testcase: Option<&str>) -> Result<String, DeviceError> {
        let address = self.resolve_target(target);
        let record = self
            .registry
            .get(&address)
            .ok_or_else(|| DeviceError::Unavailable(target.trim().to_string()))?;

        let text = match testcase {
            Some(name) => {
                let table = record
                    .testcase(name)
                    .ok_or_else(|| DeviceError::Unavailable(format!("{address}::{name}")))?;
                serde_yaml::to_string(table)?
            }
            None => serde_yaml::to_string(&BTreeMap::from([(address.as_str(), record)]))?,
        };
        Ok(text.trim_end().to_string())
    }

    /// Removes the persisted session of a device.
    pub fn reset(&self, target: &str) -> Result<bool, DeviceError> {
        let address = self.resolve_target(target);
        self.store.remove(&address)
    }

    /// Summary of the device-info file and the snapshot store.
    pub fn info(&self) -> Result<String, DeviceError> {
        let devices = [
            "Device Info:".to_string(),
            format!("  - Location: {}", self.paths.devices_info.display()),
            format!("  - Total devices: {}", self.registry.len()),
        ]
        .join("\n");
        Ok(format!("{devices}\n{}", self.store.info_text()?))
    }

    fn split_operand(
        &self,
        operand: &str,
        usage_text: &str,
        other_usage: &str,
    ) -> Result<(String, String), DeviceError> {
        let Some((target, body)) = parse_operand(operand) else {
            return Err(DeviceError::Usage(usage_text.to_string()));
        };
        let address = match target {
            Some(target) => self.resolve_target(&target),
            None => self
                .registry
                .sole_address()
                .map(str::to_string)
                .ok_or_else(|| DeviceError::Usage(other_usage.to_string()))?,
        };
        trace!("operand '{operand}' targets {address}");
        Ok((address, body))
    }

    fn missing_session(&self, target: &str, address: &str) -> DeviceError {
        if self.registry.contains(address) {
            DeviceError::NotConnected(target.trim().to_string())
        } else {
            DeviceError::Unavailable(target.trim().to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEVICES: &str = r#"
1.1.1.1:
  name: device1
  login: device1 login
  cmdlines:
    show version: [v1, v2]
2.2.2.2:
  name: device2
  login: device2 login
  cmdlines:
    show version: only
  testcases:
    t1:
      show version: from t1
"#;

    fn manager(dir: &Path) -> SessionManager {
        let mut registry = DeviceRegistry::new();
        registry.load(DEVICES).expect("load registry");
        SessionManager::with_registry(AppPaths::in_dir(dir), registry)
    }

    #[test]
    fn parse_operand_splits_target_prefix() {
        assert_eq!(
            parse_operand("device1::show version"),
            Some((Some("device1".to_string()), "show version".to_string()))
        );
        assert_eq!(
            parse_operand("1.1.1.1::  show ip route"),
            Some((Some("1.1.1.1".to_string()), "show ip route".to_string()))
        );
        assert_eq!(
            parse_operand("show version"),
            Some((None, "show version".to_string()))
        );
        assert_eq!(parse_operand("   "), None);
    }

    #[test]
    fn cursor_survives_between_manager_calls() {
        let dir = tempfile::tempdir().expect("tempdir");
        let manager = manager(dir.path());
        let outcome = manager.connect("device1", None).expect("connect");
        assert_eq!(
            outcome,
            ConnectOutcome::Connected {
                address: "1.1.1.1".to_string(),
                login: "device1 login".to_string()
            }
        );

        let outputs: Vec<String> = (0..3)
            .map(|_| {
                manager
                    .execute("device1::show version")
                    .expect("execute")
                    .output
            })
            .collect();
        assert_eq!(outputs, vec!["v1", "v2", "v1"]);
    }

    #[test]
    fn connect_twice_reports_already_connected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let manager = manager(dir.path());
        manager.connect("1.1.1.1", None).expect("connect");
        assert_eq!(
            manager.connect("device1", None).expect("connect again"),
            ConnectOutcome::AlreadyConnected {
                address: "1.1.1.1".to_string()
            }
        );
    }

    #[test]
    fn connect_with_other_testcase_starts_fresh_session() {
        let dir = tempfile::tempdir().expect("tempdir");
        let manager = manager(dir.path());
        manager.connect("device2", None).expect("connect");
        let outcome = manager.connect("device2", Some("t1")).expect("connect t1");
        assert!(matches!(outcome, ConnectOutcome::Connected { .. }));
        assert_eq!(
            manager.execute("device2::show version").expect("execute").output,
            "from t1"
        );
    }

    #[test]
    fn connect_unknown_device_is_a_connection_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let manager = manager(dir.path());
        let err = match manager.connect("9.9.9.9", None) {
            Ok(_) => panic!("unknown device should fail"),
            Err(err) => err,
        };
        assert!(matches!(err, DeviceError::Connection(_)));
        assert!(manager.store().get("9.9.9.9").expect("get").is_none());
    }

    #[test]
    fn execute_after_disconnect_is_offline() {
        let dir = tempfile::tempdir().expect("tempdir");
        let manager = manager(dir.path());
        manager.connect("device1", None).expect("connect");
        assert_eq!(manager.disconnect("device1").expect("disconnect"), "1.1.1.1");
        assert!(matches!(
            manager.execute("device1::show version"),
            Err(DeviceError::Offline(_))
        ));
    }

    #[test]
    fn disconnect_without_session_distinguishes_unknown_devices() {
        let dir = tempfile::tempdir().expect("tempdir");
        let manager = manager(dir.path());
        assert!(matches!(
            manager.disconnect("device1"),
            Err(DeviceError::NotConnected(_))
        ));
        assert!(matches!(
            manager.disconnect("nowhere"),
            Err(DeviceError::Unavailable(_))
        ));
    }

    #[test]
    fn execute_without_target_needs_a_sole_device() {
        let dir = tempfile::tempdir().expect("tempdir");
        let manager = manager(dir.path());
        assert!(matches!(
            manager.execute("show version"),
            Err(DeviceError::Usage(ref text)) if text == usage::EXECUTE_OTHER
        ));

        let mut registry = DeviceRegistry::new();
        registry
            .load("3.3.3.3:\n  cmdlines:\n    show clock: noon\n")
            .expect("load");
        let single = SessionManager::with_registry(AppPaths::in_dir(dir.path()), registry);
        single.connect("3.3.3.3", None).expect("connect");
        assert_eq!(single.execute("show clock").expect("execute").output, "noon");
    }

    #[test]
    fn configure_reads_record_keys() {
        let dir = tempfile::tempdir().expect("tempdir");
        let manager = manager(dir.path());
        manager.connect("device2", None).expect("connect");
        assert_eq!(
            manager.configure("device2::login").expect("configure").output,
            "device2 login"
        );
        assert!(matches!(
            manager.configure("device1::login"),
            Err(DeviceError::NotConnected(_))
        ));
    }

    #[test]
    fn load_merges_and_saves_registry() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut manager = manager(dir.path());
        let extra = dir.path().join("extra.yaml");
        fs::write(&extra, "4.4.4.4:\n  name: device4\n  login: four\n").expect("write");

        let written = manager.load(&extra, false).expect("load");
        assert_eq!(written, vec!["4.4.4.4".to_string()]);
        assert_eq!(manager.registry().len(), 3);

        let mut saved = DeviceRegistry::new();
        saved
            .load_file(&manager.paths().devices_info)
            .expect("saved registry");
        assert_eq!(saved.resolve("device4"), Some("4.4.4.4"));
    }

    #[test]
    fn view_and_reset() {
        let dir = tempfile::tempdir().expect("tempdir");
        let manager = manager(dir.path());
        let text = manager.view("device2", None).expect("view");
        assert!(text.contains("2.2.2.2"));
        assert!(text.contains("device2 login"));
        assert_eq!(
            manager.view("device2", Some("t1")).expect("view t1"),
            "show version: from t1"
        );
        assert!(matches!(
            manager.view("device2", Some("t9")),
            Err(DeviceError::Unavailable(_))
        ));

        manager.connect("device2", None).expect("connect");
        assert!(manager.reset("device2").expect("reset"));
        assert!(!manager.reset("device2").expect("reset again"));
    }

    #[test]
    fn info_reports_device_and_snapshot_totals() {
        let dir = tempfile::tempdir().expect("tempdir");
        let manager = manager(dir.path());
        manager.connect("device1", None).expect("connect");
        let text = manager.info().expect("info");
        assert!(text.contains("Total devices: 2"));
        assert!(text.contains("Total serialized instances: 1"));
    }
}
