//! tracing-subscriber setup

use clap::ValueEnum;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum LogFormat {
    #[default]
    Compact,
    Json,
}

/// Install the global subscriber
///
/// `RUST_LOG` wins over the default level; an invalid directive falls back
/// to the default. Events go to stderr so stdout stays for diagnostics.
pub fn setup_logging(format: LogFormat, debug: bool) {
    let default_level = if debug { "debug" } else { "info" };
    let filter = match std::env::var("RUST_LOG") {
        Ok(directive) => EnvFilter::try_new(&directive).unwrap_or_else(|err| {
            eprintln!("invalid log filter: {err}");
            eprintln!("falling back to default logging");
            EnvFilter::new(default_level)
        }),
        Err(_) => EnvFilter::new(default_level),
    };

    let registry = tracing_subscriber::registry().with(filter);
    let result = match format {
        LogFormat::Compact => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .compact()
                    .without_time()
                    .with_writer(std::io::stderr),
            )
            .try_init(),
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .try_init(),
    };

    if let Err(err) = result {
        eprintln!("failed to install logger: {err}");
    }
}
