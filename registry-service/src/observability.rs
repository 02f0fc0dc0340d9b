use tracing_subscriber::EnvFilter;

const DEFAULT_DIRECTIVE: &str = "registry_service=info";

/// Installs the global fmt subscriber. `RUST_LOG` replaces the default
/// `registry_service=info` filter. Output goes to stderr so the CSV tools can
/// write data to stdout.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE));

    // A second call (tests, tools embedding the library) keeps the first subscriber.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
