use anyhow::{anyhow, Context, Result};
use serde_yaml::Value;
use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};

/// Durable key-value storage backing the team id cache.
pub trait KeyValueStore: Send + Sync {
    /// Every string entry in the store. An absent store has no entries.
    fn read_all(&self) -> Result<BTreeMap<String, String>>;

    fn write(&self, key: &str, value: &str) -> Result<()>;
}

/// A single YAML mapping file, e.g.
///
/// ```yaml
/// teamId_acme: T0123ABCD
/// ```
#[derive(Debug)]
pub struct YamlFileStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl YamlFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    fn read_raw(&self) -> Result<BTreeMap<String, Value>> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(err) => {
                return Err(err).with_context(|| format!("read store: {}", self.path.display()))
            }
        };

        if content.trim().is_empty() {
            return Ok(BTreeMap::new());
        }

        match serde_yaml::from_str::<Value>(&content)
            .with_context(|| format!("parse store: {}", self.path.display()))?
        {
            Value::Null => Ok(BTreeMap::new()),
            Value::Mapping(mapping) => Ok(mapping
                .into_iter()
                .filter_map(|(key, value)| match key {
                    Value::String(key) => Some((key, value)),
                    _ => None,
                })
                .collect()),
            _ => Err(anyhow!(
                "store {} is not a YAML mapping",
                self.path.display()
            )),
        }
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|name| name.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl KeyValueStore for YamlFileStore {
    fn read_all(&self) -> Result<BTreeMap<String, String>> {
        Ok(self
            .read_raw()?
            .into_iter()
            .filter_map(|(key, value)| match value {
                Value::String(value) => Some((key, value)),
                _ => None,
            })
            .collect())
    }

    fn write(&self, key: &str, value: &str) -> Result<()> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);

        // Entries that are not ours survive the rewrite.
        let mut entries = self.read_raw()?;
        entries.insert(key.to_string(), Value::String(value.to_string()));

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("create dir: {}", parent.display()))?;
        }

        let yaml = serde_yaml::to_string(&entries).context("serialize store")?;
        let temp_path = self.temp_path();
        fs::write(&temp_path, yaml)
            .with_context(|| format!("write store: {}", temp_path.display()))?;
        fs::rename(&temp_path, &self.path)
            .with_context(|| format!("replace store: {}", self.path.display()))?;

        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entries<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            entries: Mutex::new(
                entries
                    .into_iter()
                    .map(|(key, value)| (key.into(), value.into()))
                    .collect(),
            ),
        }
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }
}

impl KeyValueStore for MemoryStore {
    fn read_all(&self) -> Result<BTreeMap<String, String>> {
        Ok(self
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }

    fn write(&self, key: &str, value: &str) -> Result<()> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}
