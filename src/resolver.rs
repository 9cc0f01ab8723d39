//! Version discovery and per-version path resolution with memoization.
//!
//! A [`Resolver`] owns one [`Descriptor`] and every value derived from it:
//!
//! - the installed version set, discovered once from the registry
//! - install directories, read per version from the registry
//! - interpreter, batch and process paths, joined from the install directory
//!
//! Every cache starts empty, fills lazily one version at a time and only ever grows
//! until [`Resolver::invalidate`] clears all of them at once. Versions whose install
//! directory is missing are remembered too, so a broken entry costs one registry read
//! and one diagnostic no matter how many bulk operations walk over it. A cache hit returns before
//! any validation, so a value resolved once stays available for the resolver's lifetime.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, trace};

use crate::descriptor::{Descriptor, Operation, PathKind};
use crate::error::{DccError, Result};
use crate::registry::QueryProvider;
use crate::report::{Diagnostics, TracingDiagnostics};

/// Subkeys inspected per discovery. More than this means a broken registry, not a
/// real set of installed versions.
pub const MAX_ENUMERATED_SUBKEYS: usize = 20;

static NO_VERSIONS: BTreeSet<String> = BTreeSet::new();

/// Whether missing registry data is an error or a skipped entry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Strictness {
    /// Missing data is reported as a diagnostic and left out of the result.
    #[default]
    Lenient,
    /// Missing data propagates as [`DccError::NotFound`].
    Strict,
}

/// Memoized result of version discovery.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum VersionCache {
    /// Discovery has not run yet.
    #[default]
    Unset,
    /// Discovery ran and found nothing installed.
    Empty,
    Populated(BTreeSet<String>),
}

impl VersionCache {
    fn from_set(versions: BTreeSet<String>) -> Self {
        if versions.is_empty() {
            VersionCache::Empty
        } else {
            VersionCache::Populated(versions)
        }
    }

    /// The cached set, or `None` while discovery has not run.
    pub fn get(&self) -> Option<&BTreeSet<String>> {
        match self {
            VersionCache::Unset => None,
            VersionCache::Empty => Some(&NO_VERSIONS),
            VersionCache::Populated(versions) => Some(versions),
        }
    }
}

/// Discovers installed versions of one DCC and resolves their paths.
pub struct Resolver<P> {
    descriptor: Descriptor,
    provider: P,
    diagnostics: Arc<dyn Diagnostics>,
    versions: VersionCache,
    install_directories: BTreeMap<String, PathBuf>,
    /// Versions whose install directory lookup came back not found.
    missing_install_directories: BTreeSet<String>,
    python_paths: BTreeMap<String, PathBuf>,
    batch_paths: BTreeMap<String, PathBuf>,
    process_paths: BTreeMap<String, PathBuf>,
    /// Versions already reported as a lenient diagnostic.
    reported: BTreeSet<String>,
}

impl<P: QueryProvider> Resolver<P> {
    pub fn new(descriptor: Descriptor, provider: P) -> Self {
        Self {
            descriptor,
            provider,
            diagnostics: Arc::new(TracingDiagnostics),
            versions: VersionCache::Unset,
            install_directories: BTreeMap::new(),
            missing_install_directories: BTreeSet::new(),
            python_paths: BTreeMap::new(),
            batch_paths: BTreeMap::new(),
            process_paths: BTreeMap::new(),
            reported: BTreeSet::new(),
        }
    }

    /// Routes bulk-operation diagnostics to `diagnostics` instead of the log.
    pub fn with_diagnostics(mut self, diagnostics: Arc<dyn Diagnostics>) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    pub fn descriptor(&self) -> &Descriptor {
        &self.descriptor
    }

    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn version_cache(&self) -> &VersionCache {
        &self.versions
    }

    /// Clears every cache; the next query goes back to the registry.
    pub fn invalidate(&mut self) {
        debug!(dcc = %self.descriptor.name, "invalidating resolver caches");
        self.versions = VersionCache::Unset;
        self.install_directories.clear();
        self.missing_install_directories.clear();
        self.python_paths.clear();
        self.batch_paths.clear();
        self.process_paths.clear();
        self.reported.clear();
    }

    /// Returns the installed versions, discovering them on first use.
    ///
    /// When `registry_path` itself is missing, lenient mode memoizes an empty set while
    /// strict mode returns [`DccError::NotFound`] and leaves the cache unset.
    pub fn get_versions(&mut self, strictness: Strictness) -> Result<&BTreeSet<String>> {
        if self.versions.get().is_none() {
            self.descriptor.validate(Operation::Versions)?;
            let discovered = match self.discover_versions() {
                Ok(found) => found,
                Err(e) if e.is_not_found() && strictness == Strictness::Lenient => {
                    debug!(
                        dcc = %self.descriptor.name,
                        root = %self.descriptor.registry_path,
                        "registry root not found, treating as not installed"
                    );
                    BTreeSet::new()
                }
                Err(e) => return Err(e),
            };
            debug!(dcc = %self.descriptor.name, count = discovered.len(), "discovered versions");
            self.versions = VersionCache::from_set(discovered);
        }

        Ok(self.versions.get().unwrap_or(&NO_VERSIONS))
    }

    fn discover_versions(&self) -> Result<BTreeSet<String>> {
        let root = &self.descriptor.registry_path;
        let mut versions = BTreeSet::new();

        for index in 0..MAX_ENUMERATED_SUBKEYS {
            let Some(subkey) = self.provider.enumerate_subkey(root, index)? else {
                break;
            };
            if self.descriptor.is_excluded(&subkey) {
                trace!(dcc = %self.descriptor.name, %subkey, "skipping excluded subkey");
                continue;
            }
            versions.insert(subkey);
        }

        Ok(versions)
    }

    /// Versions as an owned list so callers can keep resolving while iterating.
    fn version_list(&mut self) -> Result<Vec<String>> {
        Ok(self
            .get_versions(Strictness::Lenient)?
            .iter()
            .cloned()
            .collect())
    }

    pub fn is_installed(&mut self) -> Result<bool> {
        Ok(!self.get_versions(Strictness::Lenient)?.is_empty())
    }

    /// Greatest installed version, comparing digit runs numerically.
    pub fn latest_version(&mut self) -> Result<String> {
        let root = self.descriptor.registry_path.clone();
        self.get_versions(Strictness::Strict)?
            .iter()
            .max_by(|a, b| compare_versions(a, b))
            .cloned()
            .ok_or_else(|| DccError::not_found_key(root))
    }

    /// Install directory of `version`, read from the registry on first use.
    ///
    /// A missing key or value is always an error here: the caller asked about one
    /// specific version. The miss is remembered until [`Resolver::invalidate`].
    pub fn get_install_directory(&mut self, version: &str) -> Result<PathBuf> {
        if let Some(directory) = self.install_directories.get(version) {
            return Ok(directory.clone());
        }
        if self.missing_install_directories.contains(version) {
            return Err(DccError::not_found_value(
                self.descriptor.install_key_path(version),
                &self.descriptor.registry_install_key_name,
            ));
        }

        self.descriptor.validate(Operation::Install)?;
        let key_path = self.descriptor.install_key_path(version);
        let value = match self
            .provider
            .read_value(&key_path, &self.descriptor.registry_install_key_name)
        {
            Ok(value) => value,
            Err(e) if e.is_not_found() => {
                self.missing_install_directories.insert(version.to_string());
                return Err(e);
            }
            Err(e) => return Err(e),
        };
        let directory = PathBuf::from(value);

        debug!(
            dcc = %self.descriptor.name,
            %version,
            directory = %directory.display(),
            "resolved install directory"
        );
        self.install_directories
            .insert(version.to_string(), directory.clone());
        Ok(directory)
    }

    pub fn get_python_path(&mut self, version: &str) -> Result<PathBuf> {
        self.get_path(PathKind::Python, version)
    }

    pub fn get_batch_path(&mut self, version: &str) -> Result<PathBuf> {
        self.get_path(PathKind::Batch, version)
    }

    pub fn get_process_path(&mut self, version: &str) -> Result<PathBuf> {
        self.get_path(PathKind::Process, version)
    }

    /// Joins the relative segments for `kind` onto the install directory of `version`.
    pub fn get_path(&mut self, kind: PathKind, version: &str) -> Result<PathBuf> {
        if let Some(path) = self.path_cache(kind).get(version) {
            return Ok(path.clone());
        }

        self.descriptor.validate(kind.operation())?;
        let install_directory = self.get_install_directory(version)?;
        let path = join_segments(&install_directory, kind.segments(&self.descriptor));

        trace!(dcc = %self.descriptor.name, %version, kind = kind.label(), path = %path.display());
        self.path_cache_mut(kind)
            .insert(version.to_string(), path.clone());
        Ok(path)
    }

    /// Install directory to version for every discovered version.
    pub fn get_install_directories(
        &mut self,
        strictness: Strictness,
    ) -> Result<BTreeMap<PathBuf, String>> {
        let mut directories = BTreeMap::new();

        for version in self.version_list()? {
            match self.get_install_directory(&version) {
                Ok(directory) => {
                    directories.insert(directory, version);
                }
                Err(e) if e.is_not_found() => {
                    let message = format!(
                        "{} {} does not have an install path. Check the registry and/or re-install.",
                        self.descriptor.name, version
                    );
                    self.tolerate(strictness, &version, &message, e)?;
                }
                Err(e) => return Err(e),
            }
        }

        Ok(directories)
    }

    pub fn get_python_paths(&mut self, strictness: Strictness) -> Result<BTreeMap<PathBuf, String>> {
        self.get_paths(PathKind::Python, strictness)
    }

    pub fn get_batch_paths(&mut self, strictness: Strictness) -> Result<BTreeMap<PathBuf, String>> {
        self.get_paths(PathKind::Batch, strictness)
    }

    pub fn get_process_paths(&mut self, strictness: Strictness) -> Result<BTreeMap<PathBuf, String>> {
        self.get_paths(PathKind::Process, strictness)
    }

    /// Path to version for every discovered version, one entry each.
    pub fn get_paths(
        &mut self,
        kind: PathKind,
        strictness: Strictness,
    ) -> Result<BTreeMap<PathBuf, String>> {
        let mut paths = BTreeMap::new();

        for version in self.version_list()? {
            match self.get_path(kind, &version) {
                Ok(path) => {
                    paths.insert(path, version);
                }
                Err(e) if e.is_not_found() => {
                    let message = format!(
                        "{} {} has no {} path: {}",
                        self.descriptor.name,
                        version,
                        kind.label(),
                        e
                    );
                    self.tolerate(strictness, &version, &message, e)?;
                }
                Err(e) => return Err(e),
            }
        }

        Ok(paths)
    }

    /// Lenient mode warns once per version; strict mode fails every time.
    fn tolerate(
        &mut self,
        strictness: Strictness,
        version: &str,
        message: &str,
        error: DccError,
    ) -> Result<()> {
        match strictness {
            Strictness::Lenient => {
                if self.reported.insert(version.to_string()) {
                    self.diagnostics.warn(message);
                }
                Ok(())
            }
            Strictness::Strict => Err(self.diagnostics.fail(message, error)),
        }
    }

    fn path_cache(&self, kind: PathKind) -> &BTreeMap<String, PathBuf> {
        match kind {
            PathKind::Python => &self.python_paths,
            PathKind::Batch => &self.batch_paths,
            PathKind::Process => &self.process_paths,
        }
    }

    fn path_cache_mut(&mut self, kind: PathKind) -> &mut BTreeMap<String, PathBuf> {
        match kind {
            PathKind::Python => &mut self.python_paths,
            PathKind::Batch => &mut self.batch_paths,
            PathKind::Process => &mut self.process_paths,
        }
    }
}

fn join_segments(base: &Path, segments: &[String]) -> PathBuf {
    segments
        .iter()
        .fold(base.to_path_buf(), |path, segment| path.join(segment))
}

/// Orders version labels by comparing runs of digits as numbers and everything else
/// as text, so `"9.5" < "10.0"` and `"Houdini 19.5" < "Houdini 20.0"`.
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    let mut left = chunks(a);
    let mut right = chunks(b);

    loop {
        match (left.next(), right.next()) {
            (None, None) => return a.cmp(b),
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) => {
                let numeric = |c: &str| c.starts_with(|c: char| c.is_ascii_digit());
                let ordering = if numeric(x) && numeric(y) {
                    compare_digits(x, y)
                } else {
                    x.cmp(y)
                };
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
        }
    }
}

/// Compares two digit runs by value, whatever their length.
fn compare_digits(a: &str, b: &str) -> Ordering {
    let a = a.trim_start_matches('0');
    let b = b.trim_start_matches('0');
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

/// Splits a label into alternating digit and non-digit runs.
fn chunks(label: &str) -> impl Iterator<Item = &str> {
    let mut rest = label;
    std::iter::from_fn(move || {
        let first = rest.chars().next()?;
        let numeric = first.is_ascii_digit();
        let end = rest
            .char_indices()
            .find(|(_, c)| c.is_ascii_digit() != numeric)
            .map(|(i, _)| i)
            .unwrap_or(rest.len());
        let (chunk, tail) = rest.split_at(end);
        rest = tail;
        Some(chunk)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::SnapshotRegistry;
    use crate::report::CollectingDiagnostics;
    use pretty_assertions::assert_eq;

    const ROOT: &str = r"SOFTWARE\Sim";

    fn descriptor() -> Descriptor {
        Descriptor::new("Sim")
            .with_registry_path(ROOT)
            .with_exclude("default")
            .with_install_key(r"SOFTWARE\Sim\VERSION_NAME", "InstallPath")
            .with_python_path(["bin", "python.exe"])
            .with_batch_path(["bin", "simbatch.exe"])
            .with_process_path(["bin", "sim.exe"])
    }

    fn registry() -> SnapshotRegistry {
        SnapshotRegistry::new()
            .with_value(r"SOFTWARE\Sim\2023", "InstallPath", "C:/Sim2023")
            .with_value(r"SOFTWARE\Sim\2024", "InstallPath", "C:/Sim2024")
            .with_value(r"SOFTWARE\Sim\default", "Flavor", "none")
    }

    fn set(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn missing_registry_path_fails_before_any_query() {
        let registry = registry();
        let mut resolver = Resolver::new(Descriptor::new("Sim"), &registry);

        match resolver.get_versions(Strictness::Lenient) {
            Err(DccError::Configuration { field, .. }) => assert_eq!(field, "registry_path"),
            other => panic!("expected configuration error, got {other:?}"),
        }
        assert_eq!(registry.query_count(), 0);
    }

    #[test]
    fn excluded_subkey_is_dropped() {
        let registry = registry();
        let mut resolver = Resolver::new(descriptor(), &registry);
        assert_eq!(
            resolver.get_versions(Strictness::Lenient).unwrap(),
            &set(&["2023", "2024"])
        );
    }

    #[test]
    fn versions_are_memoized() {
        let registry = registry();
        let mut resolver = Resolver::new(descriptor(), &registry);
        let first = resolver.get_versions(Strictness::Lenient).unwrap().clone();
        let calls = registry.enumerate_calls();

        let second = resolver.get_versions(Strictness::Strict).unwrap().clone();
        assert_eq!(first, second);
        assert_eq!(registry.enumerate_calls(), calls);
    }

    #[test]
    fn invalidate_forces_rediscovery() {
        let registry = registry();
        let mut resolver = Resolver::new(descriptor(), &registry);
        resolver.get_versions(Strictness::Lenient).unwrap();
        resolver.get_install_directory("2023").unwrap();
        let calls = registry.query_count();

        resolver.invalidate();
        assert_eq!(resolver.version_cache(), &VersionCache::Unset);
        resolver.get_install_directory("2023").unwrap();
        resolver.get_versions(Strictness::Lenient).unwrap();
        assert!(registry.query_count() > calls);
    }

    #[test]
    fn enumeration_stops_at_end_signal() {
        let registry = registry();
        let mut resolver = Resolver::new(descriptor(), &registry);
        resolver.get_versions(Strictness::Lenient).unwrap();
        // three subkeys, then one end-of-enumeration probe
        assert_eq!(registry.enumerate_calls(), 4);
        assert_eq!(registry.highest_index(), Some(3));
    }

    #[test]
    fn enumeration_is_capped() {
        let mut registry = SnapshotRegistry::new();
        for n in 0..30 {
            registry.insert_key(&format!(r"{ROOT}\v{n:02}"));
        }
        let mut resolver = Resolver::new(descriptor(), &registry);
        let versions = resolver.get_versions(Strictness::Lenient).unwrap();
        assert_eq!(versions.len(), MAX_ENUMERATED_SUBKEYS);
        assert_eq!(registry.enumerate_calls(), MAX_ENUMERATED_SUBKEYS);
        assert_eq!(registry.highest_index(), Some(MAX_ENUMERATED_SUBKEYS - 1));
    }

    #[test]
    fn missing_root_is_empty_and_memoized_when_lenient() {
        let registry = SnapshotRegistry::new();
        let mut resolver = Resolver::new(descriptor(), &registry);
        assert!(resolver.get_versions(Strictness::Lenient).unwrap().is_empty());
        assert_eq!(resolver.version_cache(), &VersionCache::Empty);
        assert!(!resolver.is_installed().unwrap());
        assert_eq!(registry.enumerate_calls(), 1);
    }

    #[test]
    fn missing_root_propagates_when_strict() {
        let registry = SnapshotRegistry::new();
        let mut resolver = Resolver::new(descriptor(), &registry);
        assert!(resolver
            .get_versions(Strictness::Strict)
            .unwrap_err()
            .is_not_found());
        assert_eq!(resolver.version_cache(), &VersionCache::Unset);
    }

    #[test]
    fn install_directory_substitutes_version() {
        let registry = SnapshotRegistry::new().with_value(r"SOFTWARE\App\9.0", "Path", "D:/App9");
        let descriptor = Descriptor::new("App").with_install_key(r"SOFTWARE\App\VERSION_NAME", "Path");
        let mut resolver = Resolver::new(descriptor, &registry);
        assert_eq!(resolver.get_install_directory("9.0").unwrap(), PathBuf::from("D:/App9"));
        assert_eq!(
            registry.last_read(),
            Some((r"SOFTWARE\App\9.0".to_string(), "Path".to_string()))
        );

        let registry = SnapshotRegistry::new().with_value(r"SOFTWARE\App\9.0", "Path", "D:/App9");
        let descriptor = Descriptor::new("App")
            .with_install_key(r"SOFTWARE\App\<ver>", "Path")
            .with_version_placeholder("<ver>");
        let mut resolver = Resolver::new(descriptor, &registry);
        assert_eq!(resolver.get_install_directory("9.0").unwrap(), PathBuf::from("D:/App9"));
        assert_eq!(
            registry.last_read(),
            Some((r"SOFTWARE\App\9.0".to_string(), "Path".to_string()))
        );
    }

    #[test]
    fn explicit_install_directory_lookup_never_suppresses_not_found() {
        let registry = registry();
        let mut resolver = Resolver::new(descriptor(), &registry);
        assert!(resolver.get_install_directory("1999").unwrap_err().is_not_found());
        assert!(resolver.get_python_path("1999").unwrap_err().is_not_found());
    }

    #[test]
    fn cache_hit_skips_validation() {
        let registry = registry();
        let mut resolver = Resolver::new(descriptor(), &registry);
        resolver.get_install_directory("2023").unwrap();
        resolver.get_versions(Strictness::Lenient).unwrap();
        let calls = registry.query_count();

        resolver.descriptor.registry_install_key_name.clear();
        resolver.descriptor.registry_path.clear();
        assert_eq!(
            resolver.get_install_directory("2023").unwrap(),
            PathBuf::from("C:/Sim2023")
        );
        assert!(resolver.is_installed().unwrap());
        assert_eq!(registry.query_count(), calls);
    }

    #[test]
    fn python_path_joins_segments_onto_install_directory() {
        let registry = SnapshotRegistry::new().with_value(r"R\1.0", "InstallPath", "C:/Sim1");
        let descriptor = Descriptor::new("Sim")
            .with_registry_path("R")
            .with_install_key(r"R\VERSION_NAME", "InstallPath")
            .with_python_path(["bin", "python.exe"]);
        let mut resolver = Resolver::new(descriptor, &registry);

        assert_eq!(resolver.get_versions(Strictness::Lenient).unwrap(), &set(&["1.0"]));
        let expected = Path::new("C:/Sim1").join("bin").join("python.exe");
        assert_eq!(resolver.get_python_path("1.0").unwrap(), expected);
        #[cfg(unix)]
        assert_eq!(resolver.get_python_path("1.0").unwrap(), PathBuf::from("C:/Sim1/bin/python.exe"));
    }

    #[test]
    fn path_derivations_leave_templates_untouched() {
        let registry = registry();
        let original = descriptor();
        let mut resolver = Resolver::new(original.clone(), &registry);

        let python = resolver.get_python_path("2024").unwrap();
        let batch = resolver.get_batch_path("2024").unwrap();
        let process = resolver.get_process_path("2024").unwrap();

        assert_eq!(python, Path::new("C:/Sim2024").join("bin").join("python.exe"));
        assert_eq!(batch, Path::new("C:/Sim2024").join("bin").join("simbatch.exe"));
        assert_eq!(process, Path::new("C:/Sim2024").join("bin").join("sim.exe"));
        assert_eq!(resolver.descriptor(), &original);
        assert_eq!(resolver.descriptor().relative_python_path, vec!["bin", "python.exe"]);
    }

    #[test]
    fn paths_resolve_install_directory_once() {
        let registry = registry();
        let mut resolver = Resolver::new(descriptor(), &registry);
        resolver.get_python_path("2023").unwrap();
        resolver.get_batch_path("2023").unwrap();
        resolver.get_python_path("2023").unwrap();
        assert_eq!(registry.read_calls(), 1);
    }

    #[test]
    fn missing_segments_fail_as_configuration() {
        let registry = registry();
        let mut resolver = Resolver::new(descriptor().with_batch_path(Vec::<String>::new()), &registry);
        match resolver.get_batch_path("2023") {
            Err(DccError::Configuration { field, .. }) => assert_eq!(field, "relative_batch_path"),
            other => panic!("expected configuration error, got {other:?}"),
        }
        assert_eq!(registry.read_calls(), 0);
    }

    fn partially_broken() -> SnapshotRegistry {
        registry().with_key(r"SOFTWARE\Sim\2025")
    }

    #[test]
    fn lenient_install_directories_skip_broken_versions() {
        let registry = partially_broken();
        let diagnostics = Arc::new(CollectingDiagnostics::default());
        let mut resolver = Resolver::new(descriptor(), &registry).with_diagnostics(diagnostics.clone());

        let directories = resolver.get_install_directories(Strictness::Lenient).unwrap();
        assert_eq!(directories.len(), 2);
        assert_eq!(directories.get(Path::new("C:/Sim2024")).map(String::as_str), Some("2024"));

        let messages = diagnostics.messages();
        assert_eq!(messages.len(), 1);
        assert!(messages[0].contains("Sim 2025"));
    }

    #[test]
    fn strict_install_directories_propagate() {
        let registry = partially_broken();
        let diagnostics = Arc::new(CollectingDiagnostics::default());
        let mut resolver = Resolver::new(descriptor(), &registry).with_diagnostics(diagnostics.clone());

        let err = resolver.get_install_directories(Strictness::Strict).unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(diagnostics.messages().len(), 1);
    }

    #[test]
    fn bulk_paths_follow_the_same_policy() {
        let registry = partially_broken();
        let diagnostics = Arc::new(CollectingDiagnostics::default());
        let mut resolver = Resolver::new(descriptor(), &registry).with_diagnostics(diagnostics.clone());

        let pythons = resolver.get_python_paths(Strictness::Lenient).unwrap();
        assert_eq!(pythons.values().cloned().collect::<Vec<_>>(), vec!["2023", "2024"]);
        assert!(resolver.get_batch_paths(Strictness::Strict).unwrap_err().is_not_found());
        assert_eq!(diagnostics.messages().len(), 2);
    }

    #[test]
    fn broken_version_is_read_and_reported_once() {
        let registry = partially_broken();
        let diagnostics = Arc::new(CollectingDiagnostics::default());
        let mut resolver = Resolver::new(descriptor(), &registry).with_diagnostics(diagnostics.clone());

        resolver.get_install_directories(Strictness::Lenient).unwrap();
        resolver.get_python_paths(Strictness::Lenient).unwrap();
        resolver.get_batch_paths(Strictness::Lenient).unwrap();
        resolver.get_process_paths(Strictness::Lenient).unwrap();
        resolver.get_python_paths(Strictness::Lenient).unwrap();

        // 2023 and 2024 once each, 2025 once
        assert_eq!(registry.read_calls(), 3);
        let messages = diagnostics.messages();
        assert_eq!(messages.len(), 1);
        assert!(messages[0].contains("Sim 2025"));
        assert!(resolver.get_install_directory("2025").unwrap_err().is_not_found());
        assert_eq!(registry.read_calls(), 3);

        resolver.invalidate();
        resolver.get_install_directories(Strictness::Lenient).unwrap();
        assert_eq!(registry.read_calls(), 6);
        assert_eq!(diagnostics.messages().len(), 2);
    }

    #[test]
    fn latest_version_orders_numerically() {
        let registry = SnapshotRegistry::new()
            .with_key(r"SOFTWARE\Sim\9.5")
            .with_key(r"SOFTWARE\Sim\10.0")
            .with_key(r"SOFTWARE\Sim\default");
        let mut resolver = Resolver::new(descriptor(), &registry);
        assert_eq!(resolver.latest_version().unwrap(), "10.0");
    }

    #[test]
    fn latest_version_requires_an_installation() {
        let registry = SnapshotRegistry::new().with_key(r"SOFTWARE\Sim\default");
        let mut resolver = Resolver::new(descriptor(), &registry);
        assert!(resolver.latest_version().unwrap_err().is_not_found());
    }

    #[test]
    fn compare_versions_handles_mixed_labels() {
        assert_eq!(compare_versions("2023", "2024"), Ordering::Less);
        assert_eq!(compare_versions("Houdini 20.0.547", "Houdini 19.5.605"), Ordering::Greater);
        assert_eq!(compare_versions("5.3", "5.3.1"), Ordering::Less);
        assert_eq!(compare_versions("1.0", "1.0"), Ordering::Equal);
        assert_eq!(compare_versions("1.0-beta", "1.0-alpha"), Ordering::Greater);
    }

    #[test]
    fn compare_versions_handles_long_digit_runs() {
        assert_eq!(
            compare_versions("100000000000000000000", "99999999999999999999"),
            Ordering::Greater
        );
        assert_eq!(compare_versions("2024.018446744073709551616", "2024.9"), Ordering::Greater);
        assert_eq!(compare_versions("0010", "9"), Ordering::Greater);
    }
}
