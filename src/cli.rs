use crate::config::named_config_path;
use crate::defaults::{BUILTIN_CONFIGS, DEFAULT_CONFIG_NAME};
use crate::error::{Error, Result};
use crate::report::OutputFormat;
use clap::{ArgAction, Parser, Subcommand};
use std::{fs, path::Path};

#[derive(Parser, Debug)]
#[command(
    name = "loginfo",
    about = "Apply a logging configuration and report the resulting logger hierarchy"
)]

/// The CLI entry point, containing a subcommand to execute.
pub struct Cli {
    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Write the built-in configurations into the config directory.
    Init {
        /// Overwrite configurations that already exist.
        #[arg(long, action=ArgAction::SetTrue)]
        force: bool,
        /// Print the files that would be written and exit.
        #[arg(long, action=ArgAction::SetTrue)]
        dry_run: bool,
    },
    /// Apply a configuration and print the hierarchy report.
    Show(ShowArgs),
}

#[derive(Debug, clap::Args, Clone)]
pub struct ShowArgs {
    /// Configuration file path, or the name of a configuration (stdout, file, queue).
    #[arg(long, default_value = DEFAULT_CONFIG_NAME)]
    pub config: String,
    /// Print one summary line instead of the full hierarchy.
    #[arg(long, action=ArgAction::SetTrue)]
    pub summary: bool,
    /// Also print the loaded configuration document.
    #[arg(long, action=ArgAction::SetTrue)]
    pub json: bool,
    /// Report format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
    /// Start the report at this logger instead of the root.
    #[arg(long)]
    pub logger: Option<String>,
}

/// Writes `contents` to `path` unless it exists and `force` is false.
/// Returns whether the file was written.
fn write_if_needed(path: &Path, contents: &str, force: bool) -> Result<bool> {
    if path.exists() && !force {
        return Ok(false);
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| Error::Io {
            path: Some(parent.to_path_buf()),
            source: e,
        })?;
    }
    fs::write(path, contents).map_err(|e| Error::Io {
        path: Some(path.to_path_buf()),
        source: e,
    })?;
    Ok(true)
}

/// Writes every built-in configuration to `<root>/configs/<name>.json`.
///
/// With `dry_run`, only lists the target paths. Existing files are kept
/// unless `force` is set, so local edits survive a second `init`.
pub fn run_init(root: &Path, force: bool, dry_run: bool) -> Result<()> {
    if dry_run {
        eprintln!("Would create:");
        for (name, _) in BUILTIN_CONFIGS {
            eprintln!("  {}", named_config_path(root, name).display());
        }
        return Ok(());
    }

    eprintln!("Config directory: {}", root.display());
    for (name, json) in BUILTIN_CONFIGS {
        let path = named_config_path(root, name);
        let wrote = write_if_needed(&path, json, force)?;
        eprintln!("{} {}", if wrote { "Wrote" } else { "Kept" }, path.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_show_defaults() {
        let cli = Cli::try_parse_from(["loginfo", "show"]).unwrap();
        let Command::Show(args) = cli.cmd else {
            panic!("expected show");
        };
        assert_eq!(args.config, "stdout");
        assert!(!args.summary && !args.json);
        assert_eq!(args.format, OutputFormat::Text);
        assert_eq!(args.logger, None);
    }

    #[test]
    fn test_show_flags() {
        let cli = Cli::try_parse_from([
            "loginfo", "show", "--config", "queue", "--summary", "--json", "--format", "json",
            "--logger", "app",
        ])
        .unwrap();
        let Command::Show(args) = cli.cmd else {
            panic!("expected show");
        };
        assert_eq!(args.config, "queue");
        assert!(args.summary && args.json);
        assert_eq!(args.format, OutputFormat::Json);
        assert_eq!(args.logger.as_deref(), Some("app"));
    }

    #[test]
    fn test_init_writes_then_keeps_then_forces() {
        let dir = tempfile::tempdir().unwrap();
        run_init(dir.path(), false, false).unwrap();

        let stdout = named_config_path(dir.path(), "stdout");
        assert!(stdout.is_file());
        for (name, _) in BUILTIN_CONFIGS {
            assert!(named_config_path(dir.path(), name).is_file(), "{} missing", name);
        }

        fs::write(&stdout, "{\"version\": 1}").unwrap();
        run_init(dir.path(), false, false).unwrap();
        assert_eq!(fs::read_to_string(&stdout).unwrap(), "{\"version\": 1}");

        run_init(dir.path(), true, false).unwrap();
        assert!(fs::read_to_string(&stdout).unwrap().contains("ext://sys.stdout"));
    }

    #[test]
    fn test_init_dry_run_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        run_init(dir.path(), false, true).unwrap();
        assert!(!dir.path().join("configs").exists());
    }
}
