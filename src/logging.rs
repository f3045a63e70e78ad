use tracing_subscriber::{prelude::*, EnvFilter};

/// Initializes global tracing for the CLI.
///
/// Respects `RUST_LOG` when set; otherwise only warnings and errors are shown
/// so diagnostics do not interleave with the report. Diagnostics go to stderr,
/// the report itself to stdout.
pub fn init_tracing() {
    // Example: RUST_LOG=loginfo=debug
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_level(true)
                .compact(),
        )
        .init();
}
