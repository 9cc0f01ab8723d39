//! Descriptor configuration files.
//!
//! Descriptors are data, not code. An installer ships them as JSON:
//!
//! ```json
//! {
//!   "dccs": [
//!     {
//!       "name": "Houdini",
//!       "registry_path": "SOFTWARE\\Side Effects Software",
//!       "registry_exclude": ["Houdini"],
//!       "registry_install_key_name": "InstallPath",
//!       "registry_install_path_template": "SOFTWARE\\Side Effects Software\\VERSION_NAME",
//!       "relative_python_path": ["bin", "hython.exe"],
//!       "relative_batch_path": ["bin", "houdini.exe"]
//!     }
//!   ]
//! }
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::descriptor::Descriptor;
use crate::registry::QueryProvider;
use crate::resolver::{Resolver, Strictness};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DccConfig {
    #[serde(default)]
    pub dccs: Vec<Descriptor>,
}

impl DccConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read DCC config: {:?}", path))?;
        Self::from_json(&content).with_context(|| format!("Invalid DCC config: {:?}", path))
    }

    pub fn from_json(content: &str) -> Result<Self> {
        let config: DccConfig = serde_json::from_str(content)?;
        config.check_names()?;
        Ok(config)
    }

    fn check_names(&self) -> Result<()> {
        let mut seen = BTreeMap::new();
        for (index, descriptor) in self.dccs.iter().enumerate() {
            if descriptor.name.is_empty() {
                bail!("DCC entry #{index} has no name");
            }
            if let Some(previous) = seen.insert(descriptor.name.to_lowercase(), index) {
                bail!(
                    "DCC name {:?} is used by entries #{previous} and #{index}",
                    descriptor.name
                );
            }
        }
        Ok(())
    }

    /// Looks up a descriptor by name, ignoring case.
    pub fn find(&self, name: &str) -> Option<&Descriptor> {
        self.dccs
            .iter()
            .find(|descriptor| descriptor.name.eq_ignore_ascii_case(name))
    }

    /// Descriptors matching `names`, or all of them when `names` is empty.
    pub fn select(&self, names: &[String]) -> Result<Vec<&Descriptor>> {
        if names.is_empty() {
            return Ok(self.dccs.iter().collect());
        }
        names
            .iter()
            .map(|name| {
                self.find(name)
                    .with_context(|| format!("No DCC named {name:?} in config"))
            })
            .collect()
    }

    /// Install directories of every configured DCC, keyed by DCC name.
    ///
    /// Versions without an install directory are left out with a diagnostic.
    pub fn installed<P: QueryProvider>(
        &self,
        provider: &P,
    ) -> Result<BTreeMap<String, BTreeMap<PathBuf, String>>> {
        let mut installed = BTreeMap::new();
        for descriptor in &self.dccs {
            let mut resolver = Resolver::new(descriptor.clone(), provider);
            let directories = resolver
                .get_install_directories(Strictness::Lenient)
                .with_context(|| format!("Failed to resolve {}", descriptor.name))?;
            installed.insert(descriptor.name.clone(), directories);
        }
        Ok(installed)
    }
}
