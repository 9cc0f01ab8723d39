use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use dcc_locator::{
    DccConfig, InstallOptions, Orchestrator, QueryProvider, Reporter, Resolver,
    SnapshotRegistry, Strictness,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "dcc-locator", about = "Find installed DCCs and run installer scripts against them")]
struct Cli {
    /// JSON file describing the DCC families to look for
    #[arg(long, value_name = "FILE", default_value = "config/dccs.json")]
    config: PathBuf,

    /// Read the registry from a JSON snapshot instead of the live Windows registry
    #[arg(long, value_name = "SNAPSHOT")]
    registry: Option<PathBuf>,

    /// Log level used when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print versions and paths for each DCC
    Info {
        #[arg(long = "dcc", value_name = "NAME")]
        dccs: Vec<String>,
    },
    /// Print install directories of every configured DCC as JSON
    Installed,
    /// List installed versions of a DCC
    Versions {
        #[arg(long = "dcc", value_name = "NAME")]
        dcc: String,
        /// Fail if the DCC's registry root is missing
        #[arg(long)]
        strict: bool,
    },
    /// Print the latest installed version of a DCC
    Latest {
        #[arg(long = "dcc", value_name = "NAME")]
        dcc: String,
    },
    /// Run an install script with every interpreter of the selected DCCs
    Install {
        #[arg(long, value_name = "FILE")]
        script: PathBuf,
        /// Directory passed to the script and cleaned of compiled files
        #[arg(long, value_name = "DIR")]
        target: PathBuf,
        #[arg(long = "dcc", value_name = "NAME")]
        dccs: Vec<String>,
        /// Only install these versions (requires a single --dcc)
        #[arg(long = "version", value_name = "VERSION")]
        versions: Vec<String>,
        /// Keep compiled .pyc files in the target directory
        #[arg(long)]
        no_clean: bool,
        /// Print a JSON summary of every invocation
        #[arg(long)]
        json: bool,
    },
    /// Launch a DCC, the latest version unless one is given
    Launch {
        #[arg(long = "dcc", value_name = "NAME")]
        dcc: String,
        #[arg(long, value_name = "VERSION")]
        version: Option<String>,
        #[arg(last = true)]
        args: Vec<String>,
    },
}

fn initialize_tracing(log_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn open_registry(snapshot: Option<&PathBuf>) -> Result<Box<dyn QueryProvider>> {
    if let Some(path) = snapshot {
        return Ok(Box::new(SnapshotRegistry::load(path)?));
    }

    #[cfg(windows)]
    {
        Ok(Box::new(dcc_locator::WindowsRegistry::local_machine()))
    }

    #[cfg(not(windows))]
    {
        bail!("No live registry on this platform; pass --registry <SNAPSHOT>")
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    initialize_tracing(&cli.log_level);

    let config = DccConfig::load(&cli.config)?;
    let registry = open_registry(cli.registry.as_ref())?;
    let provider: &dyn QueryProvider = registry.as_ref();

    match cli.command {
        Command::Info { dccs } => {
            let mut reporter = Reporter::stdout();
            for descriptor in config.select(&dccs)? {
                let mut resolver = Resolver::new(descriptor.clone(), provider);
                reporter.print_info(&mut resolver)?;
            }
        }
        Command::Installed => {
            let installed = config.installed(&provider)?;
            println!("{}", serde_json::to_string_pretty(&installed)?);
        }
        Command::Versions { dcc, strict } => {
            let descriptor = config.select(&[dcc])?[0].clone();
            let strictness = if strict {
                Strictness::Strict
            } else {
                Strictness::Lenient
            };
            let mut resolver = Resolver::new(descriptor, provider);
            for version in resolver.get_versions(strictness)? {
                println!("{version}");
            }
        }
        Command::Latest { dcc } => {
            let descriptor = config.select(&[dcc])?[0].clone();
            let mut resolver = Resolver::new(descriptor, provider);
            println!("{}", resolver.latest_version()?);
        }
        Command::Install {
            script,
            target,
            dccs,
            versions,
            no_clean,
            json,
        } => {
            let descriptors = config.select(&dccs)?;
            if !versions.is_empty() && descriptors.len() != 1 {
                bail!("--version requires exactly one --dcc");
            }
            let options = InstallOptions {
                versions: (!versions.is_empty()).then_some(versions),
                clean: !no_clean,
            };

            let mut summaries = Vec::new();
            for descriptor in descriptors {
                let resolver = Resolver::new(descriptor.clone(), provider);
                let mut orchestrator = Orchestrator::new(resolver);
                let summary = orchestrator
                    .run_installer(&script, &target, &options)
                    .with_context(|| format!("Install failed for {}", descriptor.name))?;
                summaries.push(summary);
            }

            if json {
                println!("{}", serde_json::to_string_pretty(&summaries)?);
            }

            let failed: usize = summaries.iter().map(|summary| summary.failures().count()).sum();
            if failed > 0 {
                bail!("{failed} install script invocation(s) did not succeed");
            }
        }
        Command::Launch { dcc, version, args } => {
            let descriptor = config.select(&[dcc])?[0].clone();
            let mut orchestrator = Orchestrator::new(Resolver::new(descriptor, provider));
            let child = match version {
                Some(version) => orchestrator.launch(&version, &args)?,
                None => orchestrator.launch_latest(&args)?,
            };
            println!("Launched process {}", child.id());
        }
    }

    Ok(())
}
