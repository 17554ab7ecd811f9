//! Interface tester CLI - run relation interface contract tests
//!
//! This CLI lets implementers:
//! - Validate a run configuration without touching the network
//! - Inspect the scenarios synthesized from a contract
//! - Run the contract against an external scenario executor

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use interface_tester::{
    DirectorySpecSource, ImplementationDescriptor, InterfaceTester, ScenarioExecutor,
    SimulatedExecutor, TesterOptions,
};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod command_executor;

use command_executor::CommandExecutor;

/// Interface tester CLI
#[derive(Parser)]
#[command(name = "interface-tester")]
#[command(about = "Relation interface conformance tester", long_about = None)]
#[command(version)]
struct Cli {
    /// Log level
    #[arg(long, env = "INTERFACE_TESTER_LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Enable JSON logging
    #[arg(long, env = "INTERFACE_TESTER_LOG_JSON")]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands
#[derive(Subcommand)]
enum Commands {
    /// Validate the configuration and print it
    Validate {
        #[command(flatten)]
        target: Target,
    },

    /// Print the synthesized scenarios as JSON without running them
    Scenarios {
        #[command(flatten)]
        target: Target,
    },

    /// Run every scenario through an external executor
    Run {
        #[command(flatten)]
        target: Target,

        /// Program that executes one scenario per invocation
        #[arg(long, env = "INTERFACE_TESTER_EXECUTOR")]
        executor: PathBuf,

        /// Arguments passed to the executor
        #[arg(last = true)]
        executor_args: Vec<String>,
    },
}

/// What to test and where the contract lives.
#[derive(Args, Debug, Default)]
struct Target {
    /// Run configuration file (YAML)
    #[arg(short, long, env = "INTERFACE_TESTER_CONFIG")]
    config: Option<PathBuf>,

    /// Read contracts from a local checkout instead of cloning
    #[arg(long)]
    contracts_dir: Option<PathBuf>,

    /// Interface under test
    #[arg(long)]
    interface: Option<String>,

    /// Interface version
    #[arg(long)]
    interface_version: Option<u32>,

    /// Source root of the implementation under test
    #[arg(long)]
    charm_root: Option<PathBuf>,
}

impl Target {
    /// Options from the config file with command-line overrides on top.
    fn options(&self) -> anyhow::Result<TesterOptions> {
        let from_file = match &self.config {
            Some(path) => load_options(path)?,
            None => TesterOptions::default(),
        };

        let mut overrides = TesterOptions {
            interface_name: self.interface.clone(),
            ..TesterOptions::default()
        };
        if let Some(version) = self.interface_version {
            overrides = overrides.interface_version(version);
        }
        if let Some(root) = &self.charm_root {
            let descriptor = match &from_file.implementation {
                Some(existing) => existing.clone().with_root(root),
                None => ImplementationDescriptor::new(dir_name(root)).with_root(root),
            };
            overrides = overrides.implementation(descriptor);
        }

        Ok(from_file.overlay(overrides))
    }

    fn tester(&self, executor: Box<dyn ScenarioExecutor>) -> anyhow::Result<InterfaceTester> {
        let mut tester = InterfaceTester::new(executor);
        if let Some(dir) = &self.contracts_dir {
            tester = tester.with_spec_source(Box::new(DirectorySpecSource::new(dir)));
        }
        tester.configure(self.options()?);
        Ok(tester)
    }
}

/// Parse a run configuration file.
///
/// A relative implementation root is taken relative to the file itself.
fn load_options(path: &Path) -> anyhow::Result<TesterOptions> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read {}", path.display()))?;
    let mut options: TesterOptions = serde_yaml::from_str(&text)
        .with_context(|| format!("invalid run configuration in {}", path.display()))?;

    if let Some(implementation) = options.implementation.as_mut() {
        if let (Some(root), Some(base)) = (implementation.root.as_ref(), path.parent()) {
            if root.is_relative() {
                implementation.root = Some(base.join(root));
            }
        }
    }
    Ok(options)
}

fn dir_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| cli.log_level.clone().into());

    if cli.json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }

    match cli.command {
        Commands::Validate { target } => {
            // Validation never executes scenarios.
            let tester = target.tester(Box::new(SimulatedExecutor::passing()))?;
            let config = tester.validate()?;
            println!("{}", tester);
            println!("valid: {}", config);
        }
        Commands::Scenarios { target } => {
            let tester = target.tester(Box::new(SimulatedExecutor::passing()))?;
            let scenarios = tester.collect_scenarios()?;
            info!(count = scenarios.len(), "Scenarios synthesized");
            println!("{}", serde_json::to_string_pretty(&scenarios)?);
        }
        Commands::Run {
            target,
            executor,
            executor_args,
        } => {
            let tester = target.tester(Box::new(CommandExecutor::new(executor, executor_args)))?;
            let report = tester.execute()?;
            print!("{}", report);
            report.verdict()?;
        }
    }

    Ok(())
}
