//! DCC Locator Core Library
//!
//! Finds installed versions of digital-content-creation applications (Maya, Houdini, ...)
//! from the registry, resolves their per-version paths, and runs an installer script
//! with every discovered Python interpreter.
//!
//! # Architecture
//!
//! This library is consumed by an installer tool and by the `dcc-locator` CLI:
//! - **Descriptors** are configuration data describing one application family
//! - **Query providers** answer registry questions (live Windows registry or a JSON snapshot)
//! - **Resolvers** own one descriptor plus every value derived from it
//!
//! # Core Features Implemented
//!
//! ## Discovery (`resolver` module)
//! - `get_versions()` - Enumerate installed versions, memoized per resolver
//! - `get_install_directory()` - Read one version's install directory
//! - `get_python_path()` / `get_batch_path()` / `get_process_path()` - Derived executables
//! - `invalidate()` - Drop every cached value
//!
//! ## Installer Orchestration (`operations` module)
//! - `run_installer()` - Run a setup script once per interpreter, failures isolated
//! - `delete_compiled_artifacts()` - Remove stale `.pyc` files before installing
//! - `launch()` - Start a DCC version's main executable
//!
//! ## Diagnostics (`report` module)
//! - `Reporter::print_info()` - Human-readable dump of versions and paths
//! - `Diagnostics` - Policy for entries bulk operations could not resolve

pub mod config;
pub mod descriptor;
pub mod error;
pub mod operations;
pub mod registry;
pub mod report;
pub mod resolver;

pub use config::DccConfig;
pub use descriptor::{Descriptor, Operation, PathKind, DEFAULT_VERSION_PLACEHOLDER};
pub use error::{DccError, Result};
pub use operations::{
    delete_compiled_artifacts, InstallHook, InstallOptions, InstallOutcome, InstallSummary,
    Invocation, NoopHook, Orchestrator,
};
pub use registry::{QueryProvider, SnapshotFile, SnapshotRegistry};
#[cfg(windows)]
pub use registry::WindowsRegistry;
pub use report::{CollectingDiagnostics, Diagnostics, Reporter, TracingDiagnostics};
pub use resolver::{compare_versions, Resolver, Strictness, VersionCache, MAX_ENUMERATED_SUBKEYS};
