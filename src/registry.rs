//! Registry query providers used for DCC discovery.
//!
//! The resolver only needs two questions answered by the host's key/value store:
//! "what is the n-th subkey under this key" and "what does this named value hold".
//! [`QueryProvider`] captures exactly that, so discovery can run against:
//!
//! - [`WindowsRegistry`]: the live `HKEY_LOCAL_MACHINE` hive (Windows only)
//! - [`SnapshotRegistry`]: a JSON snapshot of registry keys, usable on any platform
//!   and in tests
//!
//! Key paths use backslash separators (`SOFTWARE\Autodesk\Maya`) and are matched
//! case-insensitively, like the Windows registry.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::error::{DccError, Result};

#[cfg(windows)]
pub use self::windows::WindowsRegistry;

/// Read access to a hierarchical key/value store.
///
/// Both methods report a missing key or value as [`DccError::NotFound`], which callers
/// treat differently from a value that exists but is empty.
pub trait QueryProvider {
    /// Returns the name of the subkey at `index` (0-based) under `root`, or `None` once
    /// `index` is past the last subkey.
    fn enumerate_subkey(&self, root: &str, index: usize) -> Result<Option<String>>;

    /// Returns the string stored under `value_name` in the key at `key_path`.
    fn read_value(&self, key_path: &str, value_name: &str) -> Result<String>;
}

impl<P: QueryProvider + ?Sized> QueryProvider for &P {
    fn enumerate_subkey(&self, root: &str, index: usize) -> Result<Option<String>> {
        (**self).enumerate_subkey(root, index)
    }

    fn read_value(&self, key_path: &str, value_name: &str) -> Result<String> {
        (**self).read_value(key_path, value_name)
    }
}

impl<P: QueryProvider + ?Sized> QueryProvider for Box<P> {
    fn enumerate_subkey(&self, root: &str, index: usize) -> Result<Option<String>> {
        (**self).enumerate_subkey(root, index)
    }

    fn read_value(&self, key_path: &str, value_name: &str) -> Result<String> {
        (**self).read_value(key_path, value_name)
    }
}

impl<P: QueryProvider + ?Sized> QueryProvider for Arc<P> {
    fn enumerate_subkey(&self, root: &str, index: usize) -> Result<Option<String>> {
        (**self).enumerate_subkey(root, index)
    }

    fn read_value(&self, key_path: &str, value_name: &str) -> Result<String> {
        (**self).read_value(key_path, value_name)
    }
}

#[derive(Debug, Clone, Default)]
struct SnapshotKey {
    /// Path as it was first written, used when reporting subkey names.
    path: String,
    values: BTreeMap<String, String>,
}

/// On-disk form of a registry snapshot: key path to its named values.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SnapshotFile {
    #[serde(default)]
    pub keys: BTreeMap<String, BTreeMap<String, String>>,
}

/// In-memory registry tree with query counters.
///
/// Every ancestor of an inserted key exists implicitly. Subkeys enumerate in
/// case-insensitive alphabetical order, as the Windows registry returns them.
#[derive(Debug, Default)]
pub struct SnapshotRegistry {
    keys: BTreeMap<String, SnapshotKey>,
    enumerate_calls: AtomicUsize,
    read_calls: AtomicUsize,
    highest_index: AtomicUsize,
    last_read: Mutex<Option<(String, String)>>,
}

impl SnapshotRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads a snapshot written as `{"keys": {"PATH": {"VALUE": "DATA"}}}`.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read registry snapshot: {:?}", path))?;
        let file: SnapshotFile = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse registry snapshot: {:?}", path))?;
        Ok(Self::from_file(file))
    }

    pub fn from_file(file: SnapshotFile) -> Self {
        let mut registry = Self::new();
        for (key_path, values) in file.keys {
            registry.insert_key(&key_path);
            for (name, data) in values {
                registry.set_value(&key_path, &name, &data);
            }
        }
        registry
    }

    pub fn to_file(&self) -> SnapshotFile {
        SnapshotFile {
            keys: self
                .keys
                .values()
                .map(|key| (key.path.clone(), key.values.clone()))
                .collect(),
        }
    }

    pub fn with_key(mut self, key_path: &str) -> Self {
        self.insert_key(key_path);
        self
    }

    pub fn with_value(mut self, key_path: &str, value_name: &str, data: &str) -> Self {
        self.set_value(key_path, value_name, data);
        self
    }

    pub fn insert_key(&mut self, key_path: &str) {
        let trimmed = trim_separators(key_path);
        if trimmed.is_empty() {
            return;
        }
        self.keys
            .entry(normalize(trimmed))
            .or_insert_with(|| SnapshotKey {
                path: trimmed.to_string(),
                values: BTreeMap::new(),
            });
    }

    pub fn set_value(&mut self, key_path: &str, value_name: &str, data: &str) {
        self.insert_key(key_path);
        if let Some(key) = self.keys.get_mut(&normalize(key_path)) {
            key.values.insert(value_name.to_string(), data.to_string());
        }
    }

    pub fn remove_key(&mut self, key_path: &str) {
        let target = normalize(key_path);
        let prefix = format!("{target}\\");
        self.keys
            .retain(|path, _| path != &target && !path.starts_with(&prefix));
    }

    pub fn enumerate_calls(&self) -> usize {
        self.enumerate_calls.load(Ordering::SeqCst)
    }

    pub fn read_calls(&self) -> usize {
        self.read_calls.load(Ordering::SeqCst)
    }

    /// Total number of queries answered, of either kind.
    pub fn query_count(&self) -> usize {
        self.enumerate_calls() + self.read_calls()
    }

    /// Largest subkey index ever requested, or `None` before any enumeration.
    pub fn highest_index(&self) -> Option<usize> {
        match self.enumerate_calls() {
            0 => None,
            _ => Some(self.highest_index.load(Ordering::SeqCst)),
        }
    }

    /// Key path and value name of the most recent read, exactly as requested.
    pub fn last_read(&self) -> Option<(String, String)> {
        self.last_read
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn key_exists(&self, normalized: &str) -> bool {
        if self.keys.contains_key(normalized) {
            return true;
        }
        let prefix = format!("{normalized}\\");
        self.keys
            .range(prefix.clone()..)
            .next()
            .is_some_and(|(path, _)| path.starts_with(&prefix))
    }

    /// Immediate children of `normalized`, deduplicated, in case-insensitive order.
    fn children(&self, normalized: &str) -> Vec<String> {
        let prefix = format!("{normalized}\\");
        let mut children: BTreeMap<String, String> = BTreeMap::new();
        for (path, key) in self.keys.range(prefix.clone()..) {
            if !path.starts_with(&prefix) {
                break;
            }
            let depth = normalized.matches('\\').count() + 1;
            if let Some(child) = key.path.split('\\').nth(depth) {
                children
                    .entry(child.to_ascii_lowercase())
                    .or_insert_with(|| child.to_string());
            }
        }
        children.into_values().collect()
    }
}

impl QueryProvider for SnapshotRegistry {
    fn enumerate_subkey(&self, root: &str, index: usize) -> Result<Option<String>> {
        self.enumerate_calls.fetch_add(1, Ordering::SeqCst);
        self.highest_index.fetch_max(index, Ordering::SeqCst);

        let normalized = normalize(root);
        if !self.key_exists(&normalized) {
            return Err(DccError::not_found_key(root));
        }
        Ok(self.children(&normalized).into_iter().nth(index))
    }

    fn read_value(&self, key_path: &str, value_name: &str) -> Result<String> {
        self.read_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_read.lock().unwrap_or_else(PoisonError::into_inner) =
            Some((key_path.to_string(), value_name.to_string()));

        let normalized = normalize(key_path);
        match self.keys.get(&normalized) {
            Some(key) => key
                .values
                .iter()
                .find(|(name, _)| name.eq_ignore_ascii_case(value_name))
                .map(|(_, data)| data.clone())
                .ok_or_else(|| DccError::not_found_value(key_path, value_name)),
            None if self.key_exists(&normalized) => {
                Err(DccError::not_found_value(key_path, value_name))
            }
            None => Err(DccError::not_found_key(key_path)),
        }
    }
}

fn trim_separators(path: &str) -> &str {
    path.trim_matches('\\')
}

fn normalize(path: &str) -> String {
    trim_separators(path).to_ascii_lowercase()
}

#[cfg(windows)]
mod windows {
    use std::io;

    use winreg::enums::{HKEY_LOCAL_MACHINE, KEY_READ};
    use winreg::RegKey;

    use super::QueryProvider;
    use crate::error::{DccError, Result};

    /// Live registry provider rooted at `HKEY_LOCAL_MACHINE`.
    pub struct WindowsRegistry {
        hive: RegKey,
    }

    impl WindowsRegistry {
        pub fn local_machine() -> Self {
            Self {
                hive: RegKey::predef(HKEY_LOCAL_MACHINE),
            }
        }

        fn open(&self, key_path: &str) -> Result<RegKey> {
            self.hive
                .open_subkey_with_flags(key_path, KEY_READ)
                .map_err(|e| map_error(key_path, None, e))
        }
    }

    impl QueryProvider for WindowsRegistry {
        fn enumerate_subkey(&self, root: &str, index: usize) -> Result<Option<String>> {
            let key = self.open(root)?;
            match key.enum_keys().nth(index) {
                None => Ok(None),
                Some(Ok(name)) => Ok(Some(name)),
                Some(Err(e)) => Err(map_error(root, None, e)),
            }
        }

        fn read_value(&self, key_path: &str, value_name: &str) -> Result<String> {
            let key = self.open(key_path)?;
            key.get_value::<String, _>(value_name)
                .map_err(|e| map_error(key_path, Some(value_name), e))
        }
    }

    fn map_error(path: &str, value: Option<&str>, error: io::Error) -> DccError {
        if error.kind() == io::ErrorKind::NotFound {
            DccError::NotFound {
                path: path.to_string(),
                value: value.map(str::to_string),
            }
        } else {
            DccError::Provider {
                path: path.to_string(),
                message: error.to_string(),
            }
        }
    }
}
