//! Recorded device data and the in-memory device registry.
//!
//! A [`DeviceRegistry`] maps a device address to a [`DeviceRecord`] holding the
//! login banner, the default command-line outputs and named test-case overrides.
//! The registry is loaded from a YAML device-info document:
//!
//! ```yaml
//! 1.1.1.1:
//!   name: device1
//!   login: "device1 login: admin"
//!   cmdlines:
//!     show version:
//!       - version is 2.0.1
//!       - version is 2.0.2
//!     show ver: version is 2.0.1 other output of show version
//!   testcases:
//!     test1:
//!       show version: "filename:: ~/outputs/show_version_test1.txt"
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use log::{debug, info, trace, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use schemars::JsonSchema;
use serde::de;
use serde::{Deserialize, Deserializer, Serialize};
use serde_yaml::Value;

use crate::config::{AppPaths, expand_user};
use crate::error::DeviceError;
use crate::templates::SAMPLE_DEVICES_INFO;

/// Command-line to output table, shared by the default table and test cases.
pub type CommandTable = BTreeMap<String, OutputValue>;

/// A recorded output: either a fixed text or a sequence served round-robin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, JsonSchema)]
#[serde(untagged)]
pub enum OutputValue {
    Single(String),
    Sequence(Vec<String>),
}

impl OutputValue {
    /// The value as one text block; sequence items are joined with newlines.
    pub fn as_text(&self) -> String {
        match self {
            OutputValue::Single(text) => text.clone(),
            OutputValue::Sequence(items) => items.join("\n"),
        }
    }

    fn dereferenced(self) -> Self {
        match self {
            OutputValue::Single(text) => {
                OutputValue::Single(DeviceRegistry::record_dereference(&text))
            }
            OutputValue::Sequence(items) => OutputValue::Sequence(
                items
                    .iter()
                    .map(|item| DeviceRegistry::record_dereference(item))
                    .collect(),
            ),
        }
    }
}

impl From<Value> for OutputValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Sequence(items) => {
                OutputValue::Sequence(items.into_iter().map(scalar_text).collect())
            }
            other => OutputValue::Single(scalar_text(other)),
        }
    }
}

impl<'de> Deserialize<'de> for OutputValue {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Value::deserialize(deserializer).map(OutputValue::from)
    }
}

/// Renders a YAML node as output text. Scalars keep their literal form,
/// anything nested is rendered back to YAML.
fn scalar_text(value: Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s,
        Value::Tagged(tagged) => scalar_text(tagged.value),
        nested => serde_yaml::to_string(&nested)
            .map(|text| text.trim_end().to_string())
            .unwrap_or_default(),
    }
}

/// Deserializes any scalar as text; null becomes empty.
fn text_field<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(scalar_text)
}

fn optional_text_field<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => None,
        value => Some(scalar_text(value)),
    })
}

fn command_table_field<'de, D>(deserializer: D) -> Result<CommandTable, D::Error>
where
    D: Deserializer<'de>,
{
    command_table(Value::deserialize(deserializer)?).map_err(de::Error::custom)
}

fn testcases_field<'de, D>(deserializer: D) -> Result<BTreeMap<String, CommandTable>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(BTreeMap::new()),
        Value::Mapping(mapping) => mapping
            .into_iter()
            .map(|(name, table)| -> Result<(String, CommandTable), String> {
                Ok((scalar_text(name), command_table(table)?))
            })
            .collect::<Result<_, _>>()
            .map_err(de::Error::custom),
        _ => Err(de::Error::custom("testcases must be a mapping of test case names")),
    }
}

/// Builds a command table from a YAML mapping; keys of any scalar type
/// become command lines.
fn command_table(value: Value) -> Result<CommandTable, String> {
    match value {
        Value::Null => Ok(CommandTable::new()),
        Value::Mapping(mapping) => Ok(mapping
            .into_iter()
            .map(|(cmdline, output)| (scalar_text(cmdline), OutputValue::from(output)))
            .collect()),
        _ => Err("a command table must be a mapping of command lines".to_string()),
    }
}

/// Recorded login/command data of one simulated device.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct DeviceRecord {
    /// Human-friendly alias for the address.
    #[serde(
        default,
        deserialize_with = "optional_text_field",
        skip_serializing_if = "Option::is_none"
    )]
    pub name: Option<String>,

    /// Text shown on connect.
    #[serde(default, deserialize_with = "text_field")]
    pub login: String,

    /// Default command-line outputs.
    #[serde(default, alias = "commands", deserialize_with = "command_table_field")]
    pub cmdlines: CommandTable,

    /// Per test case override tables.
    #[serde(
        default,
        alias = "test_cases",
        alias = "testCases",
        deserialize_with = "testcases_field",
        skip_serializing_if = "BTreeMap::is_empty"
    )]
    pub testcases: BTreeMap<String, CommandTable>,

    /// Any other top-level key, served by `configure`.
    #[serde(flatten)]
    pub extra: BTreeMap<String, OutputValue>,
}

impl DeviceRecord {
    /// Looks up a key in the record's top-level data.
    pub fn top_level(&self, key: &str) -> Option<String> {
        match key {
            "name" => self.name.clone(),
            "login" => Some(self.login.clone()),
            "cmdlines" => render_yaml(&self.cmdlines),
            "testcases" => render_yaml(&self.testcases),
            _ => self.extra.get(key).map(OutputValue::as_text),
        }
    }

    /// The override table of a test case, if the record defines it.
    pub fn testcase(&self, name: &str) -> Option<&CommandTable> {
        self.testcases.get(name)
    }

    fn dereferenced(self) -> Self {
        let deref_table = |table: CommandTable| -> CommandTable {
            table
                .into_iter()
                .map(|(cmdline, output)| (cmdline, output.dereferenced()))
                .collect()
        };
        Self {
            name: self.name,
            login: DeviceRegistry::record_dereference(&self.login),
            cmdlines: deref_table(self.cmdlines),
            testcases: self
                .testcases
                .into_iter()
                .map(|(name, table)| (name, deref_table(table)))
                .collect(),
            extra: deref_table(self.extra),
        }
    }
}

fn render_yaml<T: Serialize>(value: &T) -> Option<String> {
    serde_yaml::to_string(value)
        .ok()
        .map(|text| text.trim_end().to_string())
}

/// Matches `file:: <path>` / `filename:: <path>` pointers to external content.
static FILE_POINTER: Lazy<Regex> = Lazy::new(|| {
    match Regex::new(r"(?i)^\s*file(?:name)?\s*::\s*(?P<path>\S.*?)\s*$") {
        Ok(re) => re,
        Err(err) => panic!("invalid FILE_POINTER regex: {err}"),
    }
});

/// In-memory mapping from device address to its recorded data.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceRegistry {
    devices: BTreeMap<String, DeviceRecord>,
}

impl DeviceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the whole registry with the records of a YAML document.
    ///
    /// Fails with [`DeviceError::Format`] when the document is not a mapping.
    pub fn load(&mut self, source: &str) -> Result<(), DeviceError> {
        self.devices = parse_document(source, "device-info document")?;
        debug!("loaded {} device record(s)", self.devices.len());
        Ok(())
    }

    /// Replaces the registry with the content of a device-info file.
    pub fn load_file(&mut self, path: &Path) -> Result<(), DeviceError> {
        let source = fs::read_to_string(expand_user(path))?;
        self.devices = parse_document(&source, &path.display().to_string())?;
        debug!(
            "loaded {} device record(s) from {}",
            self.devices.len(),
            path.display()
        );
        Ok(())
    }

    /// Loads the default device-info file, seeding it with the built-in sample
    /// document when it does not exist yet.
    pub fn load_default(&mut self, paths: &AppPaths) -> Result<(), DeviceError> {
        if !paths.devices_info.exists() {
            write_replacing(&paths.devices_info, SAMPLE_DEVICES_INFO)?;
            info!("created {}", paths.devices_info.display());
        }
        self.load_file(&paths.devices_info)
    }

    /// Writes the registry to a device-info file, replacing it atomically.
    pub fn save_file(&self, path: &Path) -> Result<(), DeviceError> {
        let content = self.to_yaml()?;
        write_replacing(path, &content)?;
        debug!(
            "saved {} device record(s) to {}",
            self.devices.len(),
            path.display()
        );
        Ok(())
    }

    /// The registry as a YAML device-info document.
    pub fn to_yaml(&self) -> Result<String, DeviceError> {
        Ok(serde_yaml::to_string(&self.devices)?)
    }

    pub fn contains(&self, address: &str) -> bool {
        self.devices.contains_key(address)
    }

    pub fn get(&self, address: &str) -> Option<&DeviceRecord> {
        self.devices.get(address)
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    /// Registered addresses in sorted order.
    pub fn addresses(&self) -> impl Iterator<Item = &str> {
        self.devices.keys().map(String::as_str)
    }

    /// The only registered address, when exactly one device is registered.
    pub fn sole_address(&self) -> Option<&str> {
        if self.devices.len() == 1 {
            self.addresses().next()
        } else {
            None
        }
    }

    /// Finds the address of the first record whose `name` equals `name`.
    pub fn resolve_address_by_name(&self, name: &str) -> Option<&str> {
        self.devices
            .iter()
            .find(|(_, record)| record.name.as_deref() == Some(name))
            .map(|(address, _)| address.as_str())
    }

    /// Resolves an address or a device name to a registered address.
    pub fn resolve(&self, address_or_name: &str) -> Option<&str> {
        let target = address_or_name.trim();
        match self.devices.get_key_value(target) {
            Some((address, _)) => Some(address.as_str()),
            None => self.resolve_address_by_name(target),
        }
    }

    /// Inserts or replaces one record.
    pub fn upsert(&mut self, address: &str, record: DeviceRecord) {
        self.devices.insert(address.trim().to_string(), record);
    }

    /// Merges the records of another document into the registry.
    ///
    /// A record may be given as a `filename:: <path>` pointer to a YAML file
    /// holding the record, and every text value goes through
    /// [`record_dereference`](Self::record_dereference). With `replace` set the
    /// existing records are dropped first. Returns the addresses written.
    pub fn update(
        &mut self,
        source: &str,
        origin: &str,
        replace: bool,
    ) -> Result<Vec<String>, DeviceError> {
        let mapping = parse_mapping(source, origin)?;

        let mut incoming = BTreeMap::new();
        for (key, value) in mapping {
            let address = key_text(key).ok_or_else(|| DeviceError::Format(origin.to_string()))?;
            let value = match value {
                Value::String(text) if FILE_POINTER.is_match(&text) => {
                    let content = Self::record_dereference(&text);
                    if content == text {
                        return Err(DeviceError::Format(text));
                    }
                    serde_yaml::from_str::<Value>(&content)?
                }
                other => other,
            };
            let record = record_from_value(value)?.dereferenced();
            incoming.insert(address, record);
        }

        if replace {
            self.devices.clear();
        }
        let written: Vec<String> = incoming.keys().cloned().collect();
        self.devices.extend(incoming);
        debug!("updated {} device record(s) from {origin}", written.len());
        Ok(written)
    }

    /// Substitutes the content of the file named by a `filename:: <path>` pointer.
    ///
    /// Text that is not a pointer, or whose file cannot be read, is returned
    /// unchanged.
    pub fn record_dereference(text: &str) -> String {
        let Some(caps) = FILE_POINTER.captures(text) else {
            return text.to_string();
        };
        let path = expand_user(Path::new(&caps["path"]));
        match fs::read_to_string(&path) {
            Ok(content) => {
                trace!("dereferenced {}", path.display());
                content
            }
            Err(err) => {
                warn!("cannot dereference {}: {err}", path.display());
                text.to_string()
            }
        }
    }
}

/// JSON Schema of the device-info document, for editor validation.
pub fn document_schema() -> Result<String, DeviceError> {
    let schema = schemars::schema_for!(BTreeMap<String, DeviceRecord>);
    Ok(serde_json::to_string_pretty(&schema)?)
}

fn parse_document(
    source: &str,
    origin: &str,
) -> Result<BTreeMap<String, DeviceRecord>, DeviceError> {
    let mapping = parse_mapping(source, origin)?;
    let mut devices = BTreeMap::new();
    for (key, value) in mapping {
        let address = key_text(key).ok_or_else(|| DeviceError::Format(origin.to_string()))?;
        devices.insert(address, record_from_value(value)?);
    }
    Ok(devices)
}

fn parse_mapping(source: &str, origin: &str) -> Result<serde_yaml::Mapping, DeviceError> {
    if source.trim().is_empty() {
        return Err(DeviceError::Format(origin.to_string()));
    }
    match serde_yaml::from_str::<Value>(source)? {
        Value::Mapping(mapping) => Ok(mapping),
        _ => Err(DeviceError::Format(origin.to_string())),
    }
}

fn record_from_value(value: Value) -> Result<DeviceRecord, DeviceError> {
    let value = match value {
        Value::Null => return Ok(DeviceRecord::default()),
        Value::Mapping(mapping) => Value::Mapping(
            mapping
                .into_iter()
                .map(|(key, value)| (Value::String(scalar_text(key)), value))
                .collect(),
        ),
        other => other,
    };
    Ok(serde_yaml::from_value(value)?)
}

fn key_text(key: Value) -> Option<String> {
    match key {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Writes `content` next to `path` and renames it over the original.
pub(crate) fn write_replacing(path: &Path, content: &str) -> Result<(), DeviceError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    fs::write(&tmp, content)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = r#"
1.1.1.1:
  name: device1
  login: "device1 login"
  cmdlines:
    show version:
      - version is 2.0.1
      - version is 2.0.2
    show ver: version is 2.0.1 other output of show version
    show uptime: 42
  testcases:
    test1:
      show version: version from test1
  hostname config: hostname device1
2.2.2.2:
  name: device2
"#;

    fn registry() -> DeviceRegistry {
        let mut registry = DeviceRegistry::new();
        registry.load(DOC).expect("load registry");
        registry
    }

    #[test]
    fn load_parses_records() {
        let registry = registry();
        assert_eq!(registry.len(), 2);
        let record = registry.get("1.1.1.1").expect("record");
        assert_eq!(record.login, "device1 login");
        assert_eq!(
            record.cmdlines.get("show version"),
            Some(&OutputValue::Sequence(vec![
                "version is 2.0.1".to_string(),
                "version is 2.0.2".to_string()
            ]))
        );
        assert_eq!(
            record.cmdlines.get("show uptime"),
            Some(&OutputValue::Single("42".to_string()))
        );
        assert!(record.testcase("test1").is_some());
    }

    #[test]
    fn load_rejects_non_mapping_document() {
        let mut registry = registry();
        let err = match registry.load("- a\n- b\n") {
            Ok(_) => panic!("sequence document should fail"),
            Err(err) => err,
        };
        assert!(matches!(err, DeviceError::Format(_)));
        assert_eq!(registry.len(), 2, "failed load keeps previous records");
    }

    #[test]
    fn load_rejects_empty_document() {
        let mut registry = DeviceRegistry::new();
        assert!(matches!(registry.load(""), Err(DeviceError::Format(_))));
    }

    #[test]
    fn load_replaces_previous_records() {
        let mut registry = registry();
        registry
            .load("3.3.3.3:\n  login: hi\n")
            .expect("load replacement");
        assert!(!registry.contains("1.1.1.1"));
        assert!(registry.contains("3.3.3.3"));
    }

    #[test]
    fn resolve_address_by_name_scans_records() {
        let registry = registry();
        assert_eq!(registry.resolve_address_by_name("device2"), Some("2.2.2.2"));
        assert_eq!(registry.resolve_address_by_name("device9"), None);
        assert_eq!(registry.resolve("device1"), Some("1.1.1.1"));
        assert_eq!(registry.resolve(" 2.2.2.2 "), Some("2.2.2.2"));
    }

    #[test]
    fn sole_address_requires_exactly_one_device() {
        let registry = registry();
        assert_eq!(registry.sole_address(), None);

        let mut single = DeviceRegistry::new();
        single.load("9.9.9.9: {}\n").expect("load");
        assert_eq!(single.sole_address(), Some("9.9.9.9"));
    }

    #[test]
    fn load_accepts_non_string_scalars() {
        let mut registry = DeviceRegistry::new();
        registry
            .load(
                r#"
1.1.1.1:
  name: 100
  login: 12345
  cmdlines:
    1: one
    true: [2, yes]
  testcases:
    7:
      2: two
  42: answer
2.2.2.2:
  login:
  cmdlines:
  testcases:
"#,
            )
            .expect("load scalars");

        let record = registry.get("1.1.1.1").expect("record");
        assert_eq!(record.name.as_deref(), Some("100"));
        assert_eq!(record.login, "12345");
        assert_eq!(
            record.cmdlines.get("1"),
            Some(&OutputValue::Single("one".to_string()))
        );
        assert_eq!(
            record.cmdlines.get("true"),
            Some(&OutputValue::Sequence(vec!["2".to_string(), "yes".to_string()]))
        );
        assert_eq!(
            record.testcase("7").and_then(|table| table.get("2")),
            Some(&OutputValue::Single("two".to_string()))
        );
        assert_eq!(record.top_level("42").as_deref(), Some("answer"));
        assert_eq!(registry.resolve("100"), Some("1.1.1.1"));

        let empty = registry.get("2.2.2.2").expect("record");
        assert_eq!(empty.login, "");
        assert!(empty.cmdlines.is_empty());
        assert!(empty.testcases.is_empty());
    }

    #[test]
    fn scalar_records_survive_save_and_load() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("devices_info.yaml");
        let mut original = DeviceRegistry::new();
        original
            .load("1.1.1.1:\n  login: 12345\n  cmdlines:\n    1: one\n")
            .expect("load");
        original.save_file(&path).expect("save");

        let mut restored = DeviceRegistry::new();
        restored.load_file(&path).expect("load saved file");
        assert_eq!(restored, original);
    }

    #[test]
    fn top_level_serves_extra_keys_and_login() {
        let registry = registry();
        let record = registry.get("1.1.1.1").expect("record");
        assert_eq!(
            record.top_level("hostname config").as_deref(),
            Some("hostname device1")
        );
        assert_eq!(record.top_level("login").as_deref(), Some("device1 login"));
        assert_eq!(record.top_level("missing"), None);
    }

    #[test]
    fn record_dereference_leaves_plain_text() {
        assert_eq!(
            DeviceRegistry::record_dereference("show version output"),
            "show version output"
        );
        assert_eq!(
            DeviceRegistry::record_dereference("file:: /no/such/file.txt"),
            "file:: /no/such/file.txt"
        );
    }

    #[test]
    fn record_dereference_reads_pointed_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("out.txt");
        fs::write(&path, "Cisco IOS 15.2").expect("write");

        let pointer = format!("  FileName ::   {}  ", path.display());
        assert_eq!(DeviceRegistry::record_dereference(&pointer), "Cisco IOS 15.2");

        let short = format!("file::{}", path.display());
        assert_eq!(DeviceRegistry::record_dereference(&short), "Cisco IOS 15.2");

        let not_strict = format!("see filename:: {}", path.display());
        assert_eq!(DeviceRegistry::record_dereference(&not_strict), not_strict);
    }

    #[test]
    fn update_merges_and_dereferences() {
        let dir = tempfile::tempdir().expect("tempdir");
        let out = dir.path().join("version.txt");
        fs::write(&out, "version from file").expect("write output");
        let record_file = dir.path().join("record.yaml");
        fs::write(&record_file, "login: pointed login\n").expect("write record");

        let doc = format!(
            "1.1.1.1:\n  cmdlines:\n    show version: \"filename:: {}\"\n4.4.4.4: \"file:: {}\"\n",
            out.display(),
            record_file.display()
        );

        let mut registry = registry();
        let written = registry
            .update(&doc, "update.yaml", false)
            .expect("update");
        assert_eq!(written, vec!["1.1.1.1".to_string(), "4.4.4.4".to_string()]);
        assert!(registry.contains("2.2.2.2"));
        assert_eq!(
            registry.get("1.1.1.1").expect("record").cmdlines.get("show version"),
            Some(&OutputValue::Single("version from file".to_string()))
        );
        assert_eq!(registry.get("4.4.4.4").expect("record").login, "pointed login");
    }

    #[test]
    fn update_with_replace_drops_existing_records() {
        let mut registry = registry();
        registry
            .update("5.5.5.5:\n  login: five\n", "replace.yaml", true)
            .expect("update");
        assert_eq!(registry.addresses().collect::<Vec<_>>(), vec!["5.5.5.5"]);
    }

    #[test]
    fn update_reports_unreadable_record_pointer() {
        let mut registry = registry();
        let err = match registry.update("6.6.6.6: \"file:: /no/such.yaml\"\n", "u.yaml", false) {
            Ok(_) => panic!("unreadable pointer should fail"),
            Err(err) => err,
        };
        assert!(matches!(err, DeviceError::Format(_)));
        assert!(!registry.contains("6.6.6.6"));
    }

    #[test]
    fn document_schema_describes_records() {
        let json = document_schema().expect("schema json");
        let value: serde_json::Value = serde_json::from_str(&json).expect("parse schema");
        assert!(value.is_object());
        assert!(json.contains("cmdlines"));
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("devices_info.yaml");
        let original = registry();
        original.save_file(&path).expect("save");

        let mut restored = DeviceRegistry::new();
        restored.load_file(&path).expect("load saved file");
        assert_eq!(restored, original);
    }
}
