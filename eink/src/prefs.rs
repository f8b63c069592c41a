//! Key/value preference storage backing the per-app mode memory.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum PreferenceError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Typed preference store.
///
/// Reading a key stored with a different type yields `None`.
pub trait Preferences {
    fn get_int(&self, key: &str) -> Option<i32>;
    fn get_string(&self, key: &str) -> Option<String>;
    fn get_bool(&self, key: &str) -> Option<bool>;
    fn put_int(&mut self, key: &str, value: i32) -> Result<(), PreferenceError>;
    fn put_string(&mut self, key: &str, value: &str) -> Result<(), PreferenceError>;
    fn put_bool(&mut self, key: &str, value: bool) -> Result<(), PreferenceError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PrefValue {
    Bool(bool),
    Int(i64),
    String(String),
}

/// Preferences held in memory only.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MemoryPreferences {
    values: BTreeMap<String, PrefValue>,
}

impl MemoryPreferences {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_int(mut self, key: &str, value: i32) -> Self {
        self.insert(key, PrefValue::Int(value.into()));
        self
    }

    pub fn with_string(mut self, key: &str, value: &str) -> Self {
        self.insert(key, PrefValue::String(value.to_string()));
        self
    }

    pub fn with_bool(mut self, key: &str, value: bool) -> Self {
        self.insert(key, PrefValue::Bool(value));
        self
    }

    pub fn get(&self, key: &str) -> Option<&PrefValue> {
        self.values.get(key)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    fn insert(&mut self, key: &str, value: PrefValue) {
        self.values.insert(key.to_string(), value);
    }
}

impl Preferences for MemoryPreferences {
    fn get_int(&self, key: &str) -> Option<i32> {
        match self.values.get(key)? {
            PrefValue::Int(v) => i32::try_from(*v).ok(),
            _ => None,
        }
    }

    fn get_string(&self, key: &str) -> Option<String> {
        match self.values.get(key)? {
            PrefValue::String(v) => Some(v.clone()),
            _ => None,
        }
    }

    fn get_bool(&self, key: &str) -> Option<bool> {
        match self.values.get(key)? {
            PrefValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    fn put_int(&mut self, key: &str, value: i32) -> Result<(), PreferenceError> {
        self.insert(key, PrefValue::Int(value.into()));
        Ok(())
    }

    fn put_string(&mut self, key: &str, value: &str) -> Result<(), PreferenceError> {
        self.insert(key, PrefValue::String(value.to_string()));
        Ok(())
    }

    fn put_bool(&mut self, key: &str, value: bool) -> Result<(), PreferenceError> {
        self.insert(key, PrefValue::Bool(value));
        Ok(())
    }
}

/// Preferences persisted to a JSON file, rewritten on every change.
pub struct JsonPreferences {
    path: PathBuf,
    values: MemoryPreferences,
}

impl JsonPreferences {
    /// Load preferences from `path`. A missing file starts empty.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, PreferenceError> {
        let path = path.into();
        let values = if path.exists() {
            let contents = std::fs::read_to_string(&path)?;
            serde_json::from_str(&contents)?
        } else {
            MemoryPreferences::default()
        };
        tracing::debug!("Loaded {} preferences from {:?}", values.len(), path);
        Ok(Self { path, values })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn save(&self) -> Result<(), PreferenceError> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)?;
        }
        let json = serde_json::to_string_pretty(&self.values)?;
        std::fs::write(&self.path, json)?;
        Ok(())
    }
}

impl Preferences for JsonPreferences {
    fn get_int(&self, key: &str) -> Option<i32> {
        self.values.get_int(key)
    }

    fn get_string(&self, key: &str) -> Option<String> {
        self.values.get_string(key)
    }

    fn get_bool(&self, key: &str) -> Option<bool> {
        self.values.get_bool(key)
    }

    fn put_int(&mut self, key: &str, value: i32) -> Result<(), PreferenceError> {
        self.values.put_int(key, value)?;
        self.save()
    }

    fn put_string(&mut self, key: &str, value: &str) -> Result<(), PreferenceError> {
        self.values.put_string(key, value)?;
        self.save()
    }

    fn put_bool(&mut self, key: &str, value: bool) -> Result<(), PreferenceError> {
        self.values.put_bool(key, value)?;
        self.save()
    }
}
