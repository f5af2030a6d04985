//! Key-value preference storage.
//!
//! Lifecycle state has to survive restarts of the host. The store is a seam:
//! [`MemoryPreferences`] for tests and embedding, [`JsonFilePreferences`] for
//! a plain JSON file on disk.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use serde_json::{Map, Value};
use tracing::warn;

use crate::error::{UpdateError, UpdateResult};

/// Persistent key-value store for lifecycle state.
pub trait PreferenceStore: Send + Sync {
    /// Read a value.
    fn get(&self, key: &str) -> Option<Value>;

    /// Write a value.
    fn set(&self, key: &str, value: Value) -> UpdateResult<()>;

    /// Delete a value. Deleting an absent key is not an error.
    fn remove(&self, key: &str) -> UpdateResult<()>;

    /// Read a string value.
    fn get_string(&self, key: &str) -> Option<String> {
        match self.get(key) {
            Some(Value::String(s)) => Some(s),
            _ => None,
        }
    }

    /// Write a string value, or delete the key for `None`.
    fn set_string(&self, key: &str, value: Option<&str>) -> UpdateResult<()> {
        match value {
            Some(v) => self.set(key, Value::String(v.to_string())),
            None => self.remove(key),
        }
    }

    /// Read a set of strings. Absent or malformed values read as empty.
    fn get_string_set(&self, key: &str) -> BTreeSet<String> {
        match self.get(key) {
            Some(Value::Array(items)) => items
                .into_iter()
                .filter_map(|v| match v {
                    Value::String(s) => Some(s),
                    _ => None,
                })
                .collect(),
            _ => BTreeSet::new(),
        }
    }

    /// Write a set of strings.
    fn set_string_set(&self, key: &str, values: &BTreeSet<String>) -> UpdateResult<()> {
        let items = values.iter().cloned().map(Value::String).collect();
        self.set(key, Value::Array(items))
    }
}

/// In-memory preference store.
#[derive(Debug, Default)]
pub struct MemoryPreferences {
    values: Mutex<Map<String, Value>>,
}

impl MemoryPreferences {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PreferenceStore for MemoryPreferences {
    fn get(&self, key: &str) -> Option<Value> {
        self.values.lock().get(key).cloned()
    }

    fn set(&self, key: &str, value: Value) -> UpdateResult<()> {
        self.values.lock().insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&self, key: &str) -> UpdateResult<()> {
        self.values.lock().remove(key);
        Ok(())
    }
}

/// Preference store backed by a JSON object in a file.
///
/// The whole file is rewritten on every change.
#[derive(Debug)]
pub struct JsonFilePreferences {
    path: PathBuf,
    values: Mutex<Map<String, Value>>,
}

impl JsonFilePreferences {
    /// Open the store at `path`.
    ///
    /// A missing file starts out empty. A file that is not a JSON object is
    /// logged and replaced on the next write.
    pub fn open(path: impl Into<PathBuf>) -> UpdateResult<Self> {
        let path = path.into();
        let values = match fs::read(&path) {
            Ok(bytes) => match serde_json::from_slice::<Value>(&bytes) {
                Ok(Value::Object(map)) => map,
                Ok(_) | Err(_) => {
                    warn!(path = %path.display(), "Preferences file is not a JSON object, starting empty");
                    Map::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Map::new(),
            Err(e) => return Err(UpdateError::directory_io("read preferences", &path, e)),
        };

        Ok(Self {
            path,
            values: Mutex::new(values),
        })
    }

    /// Location of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, values: &Map<String, Value>) -> UpdateResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| UpdateError::directory_io("create directory", parent, e))?;
        }
        let json = serde_json::to_vec_pretty(values)
            .map_err(|e| UpdateError::Config(format!("could not encode preferences: {}", e)))?;
        fs::write(&self.path, json)
            .map_err(|e| UpdateError::directory_io("write preferences", &self.path, e))
    }
}

impl PreferenceStore for JsonFilePreferences {
    fn get(&self, key: &str) -> Option<Value> {
        self.values.lock().get(key).cloned()
    }

    fn set(&self, key: &str, value: Value) -> UpdateResult<()> {
        let mut values = self.values.lock();
        values.insert(key.to_string(), value);
        self.persist(&values)
    }

    fn remove(&self, key: &str) -> UpdateResult<()> {
        let mut values = self.values.lock();
        if values.remove(key).is_some() {
            self.persist(&values)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_string_helpers() {
        let prefs = MemoryPreferences::new();
        assert_eq!(prefs.get_string("appId"), None);

        prefs.set_string("appId", Some("abc")).unwrap();
        assert_eq!(prefs.get_string("appId").as_deref(), Some("abc"));

        prefs.set_string("appId", None).unwrap();
        assert_eq!(prefs.get_string("appId"), None);
    }

    #[test]
    fn test_string_set_helpers() {
        let prefs = MemoryPreferences::new();
        assert!(prefs.get_string_set("blacklistedVersions").is_empty());

        let set: BTreeSet<String> = ["v2", "v3"].iter().map(|s| s.to_string()).collect();
        prefs.set_string_set("blacklistedVersions", &set).unwrap();
        assert_eq!(prefs.get_string_set("blacklistedVersions"), set);
    }

    #[test]
    fn test_json_file_survives_reopen() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("state").join("preferences.json");

        let prefs = JsonFilePreferences::open(&path).unwrap();
        prefs.set_string("lastKnownGoodVersion", Some("v2")).unwrap();
        drop(prefs);

        let reopened = JsonFilePreferences::open(&path).unwrap();
        assert_eq!(
            reopened.get_string("lastKnownGoodVersion").as_deref(),
            Some("v2")
        );
    }

    #[test]
    fn test_corrupt_file_starts_empty() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("preferences.json");
        fs::write(&path, "not json").unwrap();

        let prefs = JsonFilePreferences::open(&path).unwrap();
        assert_eq!(prefs.get("anything"), None);
    }
}
