//! Installer orchestration across every discovered DCC interpreter.
//!
//! This module provides the operations an installer tool runs per DCC:
//! - Install: run a setup script once with each version's Python interpreter
//! - Clean: delete stale compiled scripts (`.pyc`) before the script runs
//! - Launch: start a DCC version's main executable

use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Local};
use serde::Serialize;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::descriptor::Descriptor;
use crate::error::{DccError, Result};
use crate::registry::QueryProvider;
use crate::report::Reporter;
use crate::resolver::{Resolver, Strictness};

/// Suffix of the compiled artifacts removed before installing.
pub const COMPILED_SUFFIX: &str = ".pyc";

/// Extension point run before any install script is spawned.
pub trait InstallHook {
    /// Adjusts the variables passed to every install script child process.
    ///
    /// `environment` already holds the descriptor's `install_environment`.
    fn before_installing(&self, descriptor: &Descriptor, environment: &mut BTreeMap<String, String>) {
        let _ = (descriptor, environment);
    }
}

/// Leaves the environment as the descriptor configured it.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopHook;

impl InstallHook for NoopHook {}

#[derive(Debug, Clone)]
pub struct InstallOptions {
    /// Versions to install; `None` installs every discovered version.
    pub versions: Option<Vec<String>>,
    /// Delete compiled artifacts under the target directory first.
    pub clean: bool,
}

impl Default for InstallOptions {
    fn default() -> Self {
        Self {
            versions: None,
            clean: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum InstallOutcome {
    Succeeded,
    /// The script ran and exited unsuccessfully; `code` is `None` when killed by a signal.
    Failed { code: Option<i32> },
    /// The interpreter could not be started or waited on.
    SpawnFailed { message: String },
    /// Skipped because the run was cancelled first.
    NotAttempted,
}

impl InstallOutcome {
    fn from_status(status: ExitStatus) -> Self {
        if status.success() {
            InstallOutcome::Succeeded
        } else {
            InstallOutcome::Failed {
                code: status.code(),
            }
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Invocation {
    pub version: String,
    pub interpreter: PathBuf,
    pub outcome: InstallOutcome,
}

/// What one `run_installer` call did for a DCC.
#[derive(Debug, Clone, Serialize)]
pub struct InstallSummary {
    pub dcc: String,
    pub started_at: DateTime<Local>,
    pub finished_at: DateTime<Local>,
    /// True when the DCC is not installed and nothing was run.
    pub skipped: bool,
    pub cancelled: bool,
    pub deleted_artifacts: usize,
    pub invocations: Vec<Invocation>,
}

impl InstallSummary {
    fn new(dcc: &str) -> Self {
        let now = Local::now();
        Self {
            dcc: dcc.to_string(),
            started_at: now,
            finished_at: now,
            skipped: false,
            cancelled: false,
            deleted_artifacts: 0,
            invocations: Vec::new(),
        }
    }

    /// True when every attempted invocation exited successfully.
    pub fn is_success(&self) -> bool {
        !self.cancelled
            && self
                .invocations
                .iter()
                .all(|invocation| invocation.outcome == InstallOutcome::Succeeded)
    }

    pub fn failures(&self) -> impl Iterator<Item = &Invocation> {
        self.invocations
            .iter()
            .filter(|invocation| invocation.outcome != InstallOutcome::Succeeded)
    }
}

/// Runs install scripts and launches executables for one DCC.
pub struct Orchestrator<P, W = io::Stdout> {
    resolver: Resolver<P>,
    reporter: Reporter<W>,
    hook: Box<dyn InstallHook>,
    cancel: Option<Arc<AtomicBool>>,
}

impl<P: QueryProvider> Orchestrator<P, io::Stdout> {
    pub fn new(resolver: Resolver<P>) -> Self {
        Self::with_reporter(resolver, Reporter::stdout())
    }
}

impl<P: QueryProvider, W: Write> Orchestrator<P, W> {
    pub fn with_reporter(resolver: Resolver<P>, reporter: Reporter<W>) -> Self {
        Self {
            resolver,
            reporter,
            hook: Box::new(NoopHook),
            cancel: None,
        }
    }

    pub fn with_hook(mut self, hook: impl InstallHook + 'static) -> Self {
        self.hook = Box::new(hook);
        self
    }

    /// Stops spawning further install scripts once `flag` is set.
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    pub fn resolver(&mut self) -> &mut Resolver<P> {
        &mut self.resolver
    }

    pub fn reporter(&mut self) -> &mut Reporter<W> {
        &mut self.reporter
    }

    pub fn into_parts(self) -> (Resolver<P>, Reporter<W>) {
        (self.resolver, self.reporter)
    }

    /// Runs `script` with each selected interpreter as `<python> <script> <target>`.
    ///
    /// Skips everything when the DCC is not installed. One failing interpreter never
    /// stops the others; each outcome is recorded in the returned summary.
    pub fn run_installer(
        &mut self,
        script: &Path,
        target: &Path,
        options: &InstallOptions,
    ) -> Result<InstallSummary> {
        let name = self.resolver.name().to_string();
        let mut summary = InstallSummary::new(&name);

        if !self.resolver.is_installed()? {
            info!(dcc = %name, "not installed, skipping");
            self.reporter.note(format!("{name} is not installed, skipping."))?;
            summary.skipped = true;
            summary.finished_at = Local::now();
            return Ok(summary);
        }

        let mut environment = self.resolver.descriptor().install_environment.clone();
        self.hook
            .before_installing(self.resolver.descriptor(), &mut environment);

        let interpreters = self.select_interpreters(options)?;

        if options.clean {
            summary.deleted_artifacts = delete_compiled_artifacts(target);
        }

        for (version, interpreter) in interpreters {
            if self.is_cancelled() {
                summary.cancelled = true;
                summary.invocations.push(Invocation {
                    version,
                    interpreter,
                    outcome: InstallOutcome::NotAttempted,
                });
                continue;
            }

            self.reporter.note("-".repeat(50))?;
            self.reporter
                .note(format!("Starting {name}'s {}", interpreter.display()))?;

            let outcome = run_script(&interpreter, script, target, &environment);
            match &outcome {
                InstallOutcome::Succeeded => {
                    info!(dcc = %name, %version, "install script finished")
                }
                InstallOutcome::Failed { code } => {
                    warn!(dcc = %name, %version, ?code, "install script exited unsuccessfully")
                }
                InstallOutcome::SpawnFailed { message } => {
                    warn!(dcc = %name, %version, "{message}")
                }
                InstallOutcome::NotAttempted => {}
            }
            summary.invocations.push(Invocation {
                version,
                interpreter,
                outcome,
            });
        }

        summary.finished_at = Local::now();
        Ok(summary)
    }

    /// Version and interpreter pairs to run, in version order.
    fn select_interpreters(&mut self, options: &InstallOptions) -> Result<Vec<(String, PathBuf)>> {
        match &options.versions {
            None => {
                self.reporter.print_info(&mut self.resolver)?;
                let mut interpreters: Vec<(String, PathBuf)> = self
                    .resolver
                    .get_python_paths(Strictness::Lenient)?
                    .into_iter()
                    .map(|(path, version)| (version, path))
                    .collect();
                interpreters.sort();
                Ok(interpreters)
            }
            Some(versions) => versions
                .iter()
                .map(|version| -> Result<(String, PathBuf)> {
                    Ok((version.clone(), self.resolver.get_python_path(version)?))
                })
                .collect(),
        }
    }

    fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::SeqCst))
    }

    /// Starts the main executable of `version` with `args` without waiting on it.
    pub fn launch(&mut self, version: &str, args: &[String]) -> Result<Child> {
        let path = self.resolver.get_process_path(version)?;
        info!(dcc = %self.resolver.name(), %version, path = %path.display(), "launching");
        Command::new(&path)
            .args(args)
            .spawn()
            .map_err(|source| DccError::ProcessInvocation {
                program: path,
                source,
            })
    }

    pub fn launch_latest(&mut self, args: &[String]) -> Result<Child> {
        let version = self.resolver.latest_version()?;
        self.launch(&version, args)
    }
}

fn run_script(
    interpreter: &Path,
    script: &Path,
    target: &Path,
    environment: &BTreeMap<String, String>,
) -> InstallOutcome {
    let status = Command::new(interpreter)
        .arg(script)
        .arg(target)
        .envs(environment)
        .status()
        .map_err(|source| DccError::ProcessInvocation {
            program: interpreter.to_path_buf(),
            source,
        });

    match status {
        Ok(status) => InstallOutcome::from_status(status),
        Err(e) => InstallOutcome::SpawnFailed {
            message: e.to_string(),
        },
    }
}

/// Deletes every file under `directory` whose name ends in `.pyc`, ignoring case.
/// Returns how many files were removed. A missing directory removes nothing, and a
/// file that cannot be removed is logged and left in place.
pub fn delete_compiled_artifacts(directory: &Path) -> usize {
    let compiled: Vec<PathBuf> = WalkDir::new(directory)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                debug!(directory = %directory.display(), "skipping unreadable entry: {e}");
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| {
            entry
                .file_name()
                .to_string_lossy()
                .to_lowercase()
                .ends_with(COMPILED_SUFFIX)
        })
        .map(|entry| entry.into_path())
        .collect();

    if !compiled.is_empty() {
        info!(
            directory = %directory.display(),
            count = compiled.len(),
            "deleting compiled python scripts (.pyc)"
        );
    }

    remove_files(&compiled)
}

/// Removes each file, warning about the ones that fail. Returns how many were removed.
fn remove_files(paths: &[PathBuf]) -> usize {
    let mut removed = 0;
    for path in paths {
        match fs::remove_file(path) {
            Ok(()) => removed += 1,
            Err(source) => {
                let err = DccError::Io {
                    path: path.clone(),
                    source,
                };
                warn!("Failed to delete compiled script, leaving it in place: {err}");
            }
        }
    }
    removed
}
