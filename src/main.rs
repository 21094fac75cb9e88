//! mongolink command-line host
//!
//! Runs the startup protocol against the configured deployment and then one
//! data command. Exits with status 1 when startup or the command fails.
//!
//! # Usage
//!
//! ```bash
//! MONGO_HOST=localhost:27017 MONGO_TYPE=standalone mongolink ping
//! mongolink -c ./config.toml find users '{"active": true}' --sort '{"name": 1}'
//! ```

use mongolink::cli::CliInterface;
use mongolink::error::Result;

/// Application entry point
#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = CliInterface::new()?;

    initialize_logging(&cli);

    cli.run().await
}

/// Initialize logging from the effective log level
///
/// Verbosity flags were already folded into the configuration.
fn initialize_logging(cli: &CliInterface) {
    let logging = &cli.config().logging;

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(logging.level.to_tracing_level())
        .with_target(false)
        .with_writer(std::io::stderr);

    if logging.timestamps {
        subscriber.init();
    } else {
        subscriber.without_time().init();
    }
}
