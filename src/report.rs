//! Diagnostics policy and the human-readable discovery report.

use std::fmt::Display;
use std::io::{self, Write};
use std::sync::{Mutex, PoisonError};

use tracing::{error, warn};

use crate::error::{DccError, Result};
use crate::registry::QueryProvider;
use crate::resolver::{Resolver, Strictness};

const BANNER_WIDTH: usize = 50;

/// Where bulk operations report entries they could not resolve.
pub trait Diagnostics {
    /// Reports a tolerated problem; the operation continues.
    fn warn(&self, message: &str);

    /// Reports a problem that ends the operation, returning the error to propagate.
    fn fail(&self, message: &str, error: DccError) -> DccError {
        self.warn(message);
        error
    }
}

/// Emits diagnostics as `tracing` events.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingDiagnostics;

impl Diagnostics for TracingDiagnostics {
    fn warn(&self, message: &str) {
        warn!("{message}");
    }

    fn fail(&self, message: &str, err: DccError) -> DccError {
        error!(error = %err, "{message}");
        err
    }
}

/// Keeps every diagnostic line in memory, for embedding tools and tests.
#[derive(Debug, Default)]
pub struct CollectingDiagnostics {
    messages: Mutex<Vec<String>>,
}

impl CollectingDiagnostics {
    pub fn messages(&self) -> Vec<String> {
        self.messages
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Diagnostics for CollectingDiagnostics {
    fn warn(&self, message: &str) {
        self.messages
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(message.to_string());
    }
}

/// Writes the line-oriented discovery report.
///
/// The layout is stable for log scraping: a blank line, a banner of `=`, `DCC: <name>`,
/// then one blank-line-separated labeled block per collection.
pub struct Reporter<W> {
    out: W,
}

impl Reporter<io::Stdout> {
    pub fn stdout() -> Self {
        Self { out: io::stdout() }
    }
}

impl<W: Write> Reporter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    /// Prints every version and path `resolver` can find.
    ///
    /// Unresolvable versions are skipped with a diagnostic rather than aborting the report.
    pub fn print_info<P: QueryProvider>(&mut self, resolver: &mut Resolver<P>) -> Result<()> {
        let name = resolver.name().to_string();
        let installed = resolver.is_installed()?;

        self.line("")?;
        self.line("=".repeat(BANNER_WIDTH))?;
        self.line(format!("DCC: {name}"))?;

        if !installed {
            self.line(format!("No versions found in registry. Is {name} installed?"))?;
            return self.line("");
        }

        let versions: Vec<String> = resolver
            .get_versions(Strictness::Lenient)?
            .iter()
            .cloned()
            .collect();
        let install_directories = resolver.get_install_directories(Strictness::Lenient)?;
        let python_paths = resolver.get_python_paths(Strictness::Lenient)?;
        let batch_paths = resolver.get_batch_paths(Strictness::Lenient)?;

        self.section("VERSION(S): ", versions.iter())?;
        self.section(
            "INSTALL DIRECTORY(S): ",
            install_directories.keys().map(|path| path.display()),
        )?;
        self.section("PYTHON PATH(S): ", python_paths.keys().map(|path| path.display()))?;
        self.section("BATCH PATH(S): ", batch_paths.keys().map(|path| path.display()))?;

        if !resolver.descriptor().relative_process_path.is_empty() {
            let process_paths = resolver.get_process_paths(Strictness::Lenient)?;
            self.section(
                "PROCESS PATH(S): ",
                process_paths.keys().map(|path| path.display()),
            )?;
        }

        self.line("")
    }

    /// Writes a free-standing notice line, such as a skip message.
    pub fn note(&mut self, message: impl Display) -> Result<()> {
        self.line(message)
    }

    fn section<I, T>(&mut self, label: &str, items: I) -> Result<()>
    where
        I: IntoIterator<Item = T>,
        T: Display,
    {
        self.line("")?;
        self.line(label)?;
        for item in items {
            self.line(item)?;
        }
        Ok(())
    }

    fn line(&mut self, text: impl Display) -> Result<()> {
        writeln!(self.out, "{text}").map_err(DccError::Report)
    }
}
