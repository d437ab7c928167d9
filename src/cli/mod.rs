//! Command-line interface for ddlogs
//!
//! This module handles:
//! - Command-line argument parsing using clap
//! - Configuration loading (file, then environment, then flags)
//! - Dispatch of the `search`, `completion` and `config` subcommands

use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::config::{Config, LogLevel, OutputFormat};
use crate::error::{DdlogsError, Result};
use crate::export::{ExportCoordinator, OutputWriter, ProgressReporter, open_sink};
use crate::query::Query;
use crate::source::DatadogSource;

pub mod completion;

/// Datadog logs exporter
#[derive(Parser, Debug)]
#[command(
    name = "ddlogs",
    version,
    about = "Export Datadog logs to CSV or JSON",
    long_about = "Runs a Datadog log search and streams every matching event to a CSV or JSON
file (or stdout), following pagination cursors until the result set is exhausted.

Credentials are read from DD_API_KEY and DD_APP_KEY."
)]
pub struct CliArgs {
    /// Configuration file path
    #[arg(short = 'c', long = "config", value_name = "FILE", global = true)]
    pub config_file: Option<PathBuf>,

    /// Quiet mode (errors only)
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Verbose mode (detailed logging)
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,

    /// Very verbose mode (trace logging)
    #[arg(long = "vv", global = true)]
    pub very_verbose: bool,

    /// Subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Subcommands for ddlogs
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Search logs and write every result
    Search(SearchArgs),

    /// Generate shell completion script
    Completion {
        /// Shell type (bash, zsh, fish, powershell, elvish)
        #[arg(value_name = "SHELL")]
        shell: String,
    },

    /// Show configuration
    Config {
        /// Show effective configuration
        #[arg(long)]
        show: bool,

        /// Validate configuration file
        #[arg(long)]
        validate: bool,
    },
}

/// Arguments of the `search` subcommand
#[derive(Args, Debug)]
pub struct SearchArgs {
    /// Log search query, e.g. "service:api status:error"
    #[arg(short = 'q', long, value_name = "QUERY")]
    pub query: String,

    /// Start of the time window: a duration ago (15m, 2h, 1d), "now" or RFC 3339
    #[arg(long, value_name = "TIME", default_value = "15m")]
    pub from: String,

    /// End of the time window
    #[arg(long, value_name = "TIME", default_value = "now")]
    pub to: String,

    /// Output file (stdout when omitted)
    #[arg(short = 'o', long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Output format
    #[arg(short = 'f', long, value_enum, value_name = "FORMAT")]
    pub format: Option<OutputFormat>,

    /// Records requested per page
    #[arg(long, value_name = "N")]
    pub page_size: Option<u32>,

    /// Disable the progress line
    #[arg(long)]
    pub no_progress: bool,
}

/// CLI interface handler
pub struct CliInterface {
    /// Parsed command-line arguments
    args: CliArgs,

    /// Effective configuration
    config: Config,
}

impl CliInterface {
    /// Create a new CLI interface from the process arguments
    ///
    /// # Returns
    /// * `Result<Self>` - New CLI interface or error
    pub fn new() -> Result<Self> {
        Self::from_args(CliArgs::parse())
    }

    /// Create a CLI interface from already parsed arguments
    pub fn from_args(args: CliArgs) -> Result<Self> {
        let config = Self::load_config(&args)?;
        Ok(Self { args, config })
    }

    /// Load configuration from file, environment and arguments
    ///
    /// # Arguments
    /// * `args` - Command-line arguments
    ///
    /// # Returns
    /// * `Result<Config>` - Effective configuration or error
    fn load_config(args: &CliArgs) -> Result<Config> {
        let mut config = Config::load_from_file(args.config_file.as_deref())?;
        config.apply_env();
        Self::apply_args_to_config(&mut config, args);
        Ok(config)
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Get the CLI arguments
    pub fn args(&self) -> &CliArgs {
        &self.args
    }

    /// Apply CLI arguments to configuration
    ///
    /// # Arguments
    /// * `config` - Configuration to modify
    fn apply_args_to_config(config: &mut Config, args: &CliArgs) {
        Self::apply_logging_args(config, args);
        if let Commands::Search(search) = &args.command {
            Self::apply_search_args(config, search);
        }
    }

    /// Apply logging-related CLI arguments to configuration
    fn apply_logging_args(config: &mut Config, args: &CliArgs) {
        config.logging.level = if args.very_verbose {
            LogLevel::Trace
        } else if args.verbose {
            LogLevel::Debug
        } else if args.quiet {
            LogLevel::Error
        } else {
            config.logging.level
        };
    }

    /// Apply search-related CLI arguments to configuration
    fn apply_search_args(config: &mut Config, args: &SearchArgs) {
        if let Some(format) = args.format {
            config.output.format = format;
        }
        if let Some(page_size) = args.page_size {
            config.fetch.page_size = page_size;
        }
        if args.no_progress {
            config.output.progress = false;
        }
    }

    /// Run the selected subcommand
    ///
    /// # Returns
    /// * `Result<()>` - Success or error
    pub async fn run(&self) -> Result<()> {
        match &self.args.command {
            Commands::Search(search) => self.run_search(search).await,
            Commands::Completion { shell } => {
                completion::generate_completion(shell, &mut std::io::stdout())
            }
            Commands::Config { show, validate } => self.handle_config_command(*show, *validate),
        }
    }

    /// Run the export pipeline for one search
    async fn run_search(&self, args: &SearchArgs) -> Result<()> {
        self.config.validate()?;
        let query = Query::new(
            &args.query,
            &args.from,
            &args.to,
            self.config.fetch.page_size,
        )?;

        // Credentials are checked here, before the output file is created
        let source = Arc::new(DatadogSource::from_config(&self.config)?);

        let output_path = args.output.as_deref();
        let sink = open_sink(output_path).await?;
        let writer = OutputWriter::new(
            self.config.output.format,
            sink,
            self.config.output.buffer_size,
        );
        let reporter =
            ProgressReporter::new(self.config.output.progress).with_output_path(output_path);

        // Setup Ctrl+C handler for this export
        let cancel_token = CancellationToken::new();
        let cancel_token_clone = cancel_token.clone();
        let ctrl_c_handle = tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => cancel_token_clone.cancel(),
                Err(err) => eprintln!("Failed to listen for Ctrl+C: {}", err),
            }
        });

        debug!(
            "Search format={:?} destination={}",
            self.config.output.format,
            describe_destination(output_path)
        );

        let mut coordinator = ExportCoordinator::new(source, query, writer)
            .with_reporter(reporter)
            .with_channel_capacity(self.config.fetch.channel_capacity)
            .with_cancellation(cancel_token);
        let result = coordinator.execute().await;

        ctrl_c_handle.abort();

        match result {
            Ok(_) => Ok(()),
            Err(e) if e.is_cancelled() => {
                info!("Search interrupted; output finalized up to the last written record");
                Err(e)
            }
            Err(e) => Err(e),
        }
    }

    /// Handle config subcommand
    ///
    /// # Arguments
    /// * `show` - Whether to show configuration
    /// * `validate` - Whether to validate configuration
    ///
    /// # Returns
    /// * `Result<()>` - Success or error
    fn handle_config_command(&self, show: bool, validate: bool) -> Result<()> {
        if validate {
            self.validate_config()?;
        }

        if show || !validate {
            self.show_config()?;
        }

        Ok(())
    }

    /// Validate the effective configuration
    fn validate_config(&self) -> Result<()> {
        println!("Validating configuration: {}", self.get_config_path().display());
        self.config.validate()?;
        println!("Configuration is valid");
        Ok(())
    }

    /// Show effective configuration with credentials redacted
    fn show_config(&self) -> Result<()> {
        let path = self.get_config_path();
        println!("Configuration file: {}", path.display());
        if !path.exists() {
            println!("(file not found, using defaults)");
        }
        println!();

        let rendered = toml::to_string_pretty(&self.config.redacted())
            .map_err(|e| DdlogsError::Generic(format!("Failed to render configuration: {}", e)))?;
        println!("{}", rendered);
        Ok(())
    }

    /// Get configuration file path (from args or default)
    fn get_config_path(&self) -> PathBuf {
        self.args
            .config_file
            .clone()
            .unwrap_or_else(Config::default_path)
    }
}

/// Human-readable name of the output destination
fn describe_destination(path: Option<&Path>) -> String {
    match path {
        Some(path) => path.display().to_string(),
        None => "stdout".to_string(),
    }
}
