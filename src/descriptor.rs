//! Application family descriptors and the field validation each operation requires.
//!
//! A [`Descriptor`] is plain configuration data: where a DCC registers its versions,
//! which registry value holds the install directory, and which path segments lead from
//! that directory to the interpreter, the batch executable and the main process.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{DccError, Result};

pub const DEFAULT_VERSION_PLACEHOLDER: &str = "VERSION_NAME";

/// Registry layout and relative executable paths for one application family.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Descriptor {
    pub name: String,
    /// Token replaced by a version label in `registry_install_path_template`.
    pub version_placeholder: String,
    /// Key whose subkeys are the installed versions.
    pub registry_path: String,
    /// Subkeys of `registry_path` that are not versions.
    pub registry_exclude: Vec<String>,
    /// Value name holding the install directory.
    pub registry_install_key_name: String,
    pub registry_install_path_template: String,
    pub relative_python_path: Vec<String>,
    pub relative_batch_path: Vec<String>,
    pub relative_process_path: Vec<String>,
    /// Variables injected into every install script child process.
    pub install_environment: BTreeMap<String, String>,
}

impl Default for Descriptor {
    fn default() -> Self {
        Self {
            name: String::new(),
            version_placeholder: DEFAULT_VERSION_PLACEHOLDER.to_string(),
            registry_path: String::new(),
            registry_exclude: Vec::new(),
            registry_install_key_name: String::new(),
            registry_install_path_template: String::new(),
            relative_python_path: Vec::new(),
            relative_batch_path: Vec::new(),
            relative_process_path: Vec::new(),
            install_environment: BTreeMap::new(),
        }
    }
}

impl Descriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_registry_path(mut self, path: impl Into<String>) -> Self {
        self.registry_path = path.into();
        self
    }

    pub fn with_exclude(mut self, subkey: impl Into<String>) -> Self {
        self.registry_exclude.push(subkey.into());
        self
    }

    pub fn with_install_key(
        mut self,
        path_template: impl Into<String>,
        value_name: impl Into<String>,
    ) -> Self {
        self.registry_install_path_template = path_template.into();
        self.registry_install_key_name = value_name.into();
        self
    }

    pub fn with_version_placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.version_placeholder = placeholder.into();
        self
    }

    pub fn with_python_path<I, S>(mut self, segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.relative_python_path = segments.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_batch_path<I, S>(mut self, segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.relative_batch_path = segments.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_process_path<I, S>(mut self, segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.relative_process_path = segments.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_install_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.install_environment.insert(key.into(), value.into());
        self
    }

    /// True if `subkey` is listed in `registry_exclude`.
    pub fn is_excluded(&self, subkey: &str) -> bool {
        self.registry_exclude.iter().any(|excluded| excluded == subkey)
    }

    /// Concrete registry key holding the install directory of `version`.
    pub fn install_key_path(&self, version: &str) -> String {
        self.registry_install_path_template
            .replace(&self.version_placeholder, version)
    }

    /// Checks the fields `operation` needs, failing on the first one left empty.
    pub fn validate(&self, operation: Operation) -> Result<()> {
        for (field, is_set) in self.required_fields(operation) {
            if !is_set {
                return Err(DccError::Configuration {
                    dcc: self.display_name().to_string(),
                    field,
                });
            }
        }
        Ok(())
    }

    fn required_fields(&self, operation: Operation) -> Vec<(&'static str, bool)> {
        match operation {
            Operation::Versions => vec![
                ("registry_path", !self.registry_path.is_empty()),
                ("name", !self.name.is_empty()),
            ],
            Operation::Install => vec![
                (
                    "registry_install_path_template",
                    !self.registry_install_path_template.is_empty(),
                ),
                (
                    "registry_install_key_name",
                    !self.registry_install_key_name.is_empty(),
                ),
                // an empty placeholder would splice the version between every character
                ("version_placeholder", !self.version_placeholder.is_empty()),
            ],
            Operation::Python => vec![("relative_python_path", !self.relative_python_path.is_empty())],
            Operation::Batch => vec![("relative_batch_path", !self.relative_batch_path.is_empty())],
            Operation::Process => vec![(
                "relative_process_path",
                !self.relative_process_path.is_empty(),
            )],
        }
    }

    fn display_name(&self) -> &str {
        if self.name.is_empty() {
            "<unnamed dcc>"
        } else {
            &self.name
        }
    }
}

/// Operation classes with distinct descriptor requirements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Versions,
    Install,
    Python,
    Batch,
    Process,
}

/// Which derived executable path a lookup targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PathKind {
    Python,
    Batch,
    Process,
}

impl PathKind {
    pub fn operation(self) -> Operation {
        match self {
            PathKind::Python => Operation::Python,
            PathKind::Batch => Operation::Batch,
            PathKind::Process => Operation::Process,
        }
    }

    pub fn segments(self, descriptor: &Descriptor) -> &[String] {
        match self {
            PathKind::Python => &descriptor.relative_python_path,
            PathKind::Batch => &descriptor.relative_batch_path,
            PathKind::Process => &descriptor.relative_process_path,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            PathKind::Python => "python",
            PathKind::Batch => "batch",
            PathKind::Process => "process",
        }
    }
}
