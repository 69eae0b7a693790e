use super::*;

impl DeviceSession {
    /// Connects the session to its device in the registry.
    ///
    /// Connecting an already connected session is a no-op. A non-blank
    /// `testcase` replaces the active test case before binding.
    pub fn connect(
        &mut self,
        registry: &DeviceRegistry,
        testcase: Option<&str>,
    ) -> Result<bool, DeviceError> {
        if self.connected {
            return Ok(self.connected);
        }

        let Some(record) = registry.get(&self.address) else {
            return Err(DeviceError::Connection(self.name.clone()));
        };

        if let Some(testcase) = testcase.map(str::trim).filter(|t| !t.is_empty()) {
            self.testcase = Some(testcase.to_string());
        }
        self.record = Some(record.clone());
        self.connected = true;
        debug!(
            "{} connected (testcase: {})",
            self.name,
            self.testcase.as_deref().unwrap_or("-")
        );
        Ok(self.connected)
    }

    /// Disconnects the session. Always succeeds.
    pub fn disconnect(&mut self) -> bool {
        self.connected = false;
        debug!("{} disconnected", self.name);
        self.connected
    }

    /// Returns the recorded output of a command line.
    ///
    /// The active test case table is consulted first, then the default table.
    /// Sequence outputs are served round-robin through the session cursor,
    /// which is keyed by the command line alone and therefore shared between
    /// the test case and default tables. Unknown command lines produce a
    /// placeholder naming the command.
    pub fn execute(&mut self, cmdline: &str) -> Result<String, DeviceError> {
        self.ensure_online()?;
        let record = self
            .record
            .as_ref()
            .ok_or_else(|| DeviceError::Offline(self.name.clone()))?;

        let output = match resolve_output(record, self.testcase.as_deref(), cmdline) {
            None => return Ok(no_output(cmdline)),
            Some(OutputValue::Single(text)) => text.clone(),
            Some(OutputValue::Sequence(items)) if items.is_empty() => String::new(),
            Some(OutputValue::Sequence(items)) => {
                let index = match self.cursor.get(cmdline) {
                    Some(last) => (last + 1) % items.len(),
                    None => 0,
                };
                self.cursor.insert(cmdline.to_string(), index);
                trace!(
                    "{}: '{cmdline}' served output {}/{}",
                    self.name,
                    index + 1,
                    items.len()
                );
                items[index].clone()
            }
        };
        Ok(output)
    }

    /// Returns the record's top-level value for `config`, or an empty string.
    pub fn configure(&self, config: &str) -> Result<String, DeviceError> {
        self.ensure_online()?;
        Ok(self
            .record
            .as_ref()
            .and_then(|record| record.top_level(config))
            .unwrap_or_default())
    }

    fn ensure_online(&self) -> Result<(), DeviceError> {
        if self.connected {
            Ok(())
        } else {
            Err(DeviceError::Offline(self.name.clone()))
        }
    }
}

/// Picks the output table entry for a command line.
fn resolve_output<'a>(
    record: &'a DeviceRecord,
    testcase: Option<&str>,
    cmdline: &str,
) -> Option<&'a OutputValue> {
    let primary = testcase
        .and_then(|name| record.testcase(name))
        .unwrap_or(&record.cmdlines);
    primary
        .get(cmdline)
        .or_else(|| record.cmdlines.get(cmdline))
}

fn no_output(cmdline: &str) -> String {
    format!("*** \"{cmdline}\" does not have output ***")
}
