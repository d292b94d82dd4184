use botscope_system_diagnostics::{KeyValueStore, StoreError};

/// Key-value store backed by the `[store]` table of the configuration file.
///
/// Store keys such as `/robot_id` are looked up without their leading slash.
#[derive(Clone, Debug, Default)]
pub(crate) struct FileStore {
    values: toml::Table,
}

impl FileStore {
    pub(crate) fn new(values: toml::Table) -> Self {
        Self { values }
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let name = key.trim_start_matches('/');
        let value = match self.values.get(name) {
            None => return Ok(None),
            Some(toml::Value::String(text)) => text.clone(),
            Some(nested @ (toml::Value::Table(_) | toml::Value::Array(_))) => {
                return Err(StoreError::InvalidValue {
                    key: key.to_owned(),
                    value: nested.to_string(),
                })
            }
            Some(other) => other.to_string(),
        };
        Ok(Some(value))
    }
}
