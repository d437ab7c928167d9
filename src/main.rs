//! ddlogs - Datadog logs exporter
//!
//! Searches Datadog logs and writes every matching event to CSV or JSON.
//!
//! # Usage
//!
//! ```bash
//! export DD_API_KEY=... DD_APP_KEY=...
//! ddlogs search -q "service:api status:error" --from 1h -o errors.csv
//! ```

use ddlogs::cli::CliInterface;
use ddlogs::error::Result;

/// Application entry point
#[tokio::main]
async fn main() {
    // Initialize the application and handle any errors
    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Main application logic
///
/// 1. Parse command-line arguments
/// 2. Load configuration
/// 3. Initialize logging
/// 4. Run the selected subcommand
///
/// # Returns
/// * `Result<()>` - Success or error
async fn run() -> Result<()> {
    let cli = CliInterface::new()?;
    initialize_logging(&cli);
    cli.run().await
}

/// Initialize logging system based on the effective log level
///
/// Logs go to stderr so they never mix with data written to stdout.
///
/// # Arguments
/// * `cli` - CLI interface with the merged configuration
fn initialize_logging(cli: &CliInterface) {
    let level = cli.config().logging.level.to_tracing_level();

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr);

    // Configure timestamps
    if cli.config().logging.timestamps {
        subscriber.init();
    } else {
        subscriber.without_time().init();
    }
}
