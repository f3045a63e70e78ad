use clap::Parser;
use loginfo::cli::{run_init, Cli, Command};
use loginfo::config::{config_root, default_config_root, ConfigSource};
use loginfo::logging::init_tracing;
use loginfo::report::{show_logging_setup_with, ShowOptions};
use loginfo::Result;
use tracing::{debug, info, warn};

/// Entry point for the loginfo CLI.
///
/// `show` applies the selected configuration and prints the hierarchy report
/// (plus the configuration document with `--json`); `init` writes the
/// built-in configurations into the config directory.
///
/// # Errors
/// - `Error::ConfigDirUnavailable` for `init` when there is no config directory.
/// - Loader errors (`Error::Io`, `Error::Json`, `Error::Config`) for `show`.
/// - `Error::UnknownLogger` when `--logger` names a logger that does not exist.
fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    debug!(?cli, "parsed CLI");

    match cli.cmd {
        Command::Init { force, dry_run } => {
            info!(force, dry_run, "running init");
            if dry_run {
                warn!("init in dry-run mode: printing planned paths only");
            }
            let root = config_root()?;
            run_init(&root, force, dry_run)?;
            info!("init completed");
            Ok(())
        }
        Command::Show(args) => {
            let source = ConfigSource::from_arg(&args.config);
            info!(source=?source, "show: starting");
            let opts = ShowOptions {
                show_all: !args.summary,
                emit_json: args.json,
                format: args.format,
                start_at: args.logger,
                config_root: default_config_root(),
            };
            show_logging_setup_with(&source, &opts)?;
            info!("show: completed");
            Ok(())
        }
    }
}
