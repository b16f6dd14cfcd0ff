//! CLI argument definitions for catsweep-daemon.
//!
//! Uses `clap` v4 derive macros to parse command-line arguments.

use std::path::PathBuf;

use clap::Parser;

use catsweep_core::config::CatSweepConfig;

/// catsweep directory sweeper daemon.
///
/// Periodically consumes settled files matching a glob, emits their
/// contents as JSON-lines records on stdout, then moves or deletes them.
#[derive(Parser, Debug)]
#[command(name = "catsweep-daemon")]
#[command(version, about, long_about = None)]
pub struct DaemonCli {
    /// Path to catsweep.toml configuration file.
    #[arg(short, long, default_value = "/etc/catsweep/catsweep.toml")]
    pub config: PathBuf,

    /// Override log level (trace, debug, info, warn, error).
    ///
    /// Takes precedence over the config file and environment variables.
    #[arg(long)]
    pub log_level: Option<String>,

    /// Override log format (json, pretty).
    ///
    /// Takes precedence over the config file and environment variables.
    #[arg(long)]
    pub log_format: Option<String>,

    /// Validate configuration file and exit without starting the daemon.
    #[arg(long)]
    pub validate: bool,

    /// Run a single sweep cycle and exit.
    #[arg(long)]
    pub once: bool,

    /// Override PID file path (takes precedence over config file).
    #[arg(long)]
    pub pid_file: Option<String>,
}

impl DaemonCli {
    /// Apply CLI overrides on top of a loaded configuration.
    pub fn apply_overrides(&self, config: &mut CatSweepConfig) {
        if let Some(level) = &self.log_level {
            config.general.log_level = level.clone();
        }
        if let Some(format) = &self.log_format {
            config.general.log_format = format.clone();
        }
        if let Some(pid_file) = &self.pid_file {
            config.general.pid_file = pid_file.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cli = DaemonCli::parse_from(["catsweep-daemon"]);
        assert_eq!(cli.config, PathBuf::from("/etc/catsweep/catsweep.toml"));
        assert!(!cli.validate);
        assert!(!cli.once);
        assert!(cli.log_level.is_none());
    }

    #[test]
    fn overrides_take_precedence() {
        let cli = DaemonCli::parse_from([
            "catsweep-daemon",
            "--config",
            "/tmp/c.toml",
            "--log-level",
            "debug",
            "--log-format",
            "pretty",
            "--pid-file",
            "/tmp/c.pid",
            "--once",
        ]);
        let mut config = CatSweepConfig::default();
        cli.apply_overrides(&mut config);

        assert!(cli.once);
        assert_eq!(config.general.log_level, "debug");
        assert_eq!(config.general.log_format, "pretty");
        assert_eq!(config.general.pid_file, "/tmp/c.pid");
    }

    #[test]
    fn no_overrides_keep_config() {
        let cli = DaemonCli::parse_from(["catsweep-daemon", "--validate"]);
        let mut config = CatSweepConfig::default();
        cli.apply_overrides(&mut config);
        assert!(cli.validate);
        assert_eq!(config.general.log_level, "info");
    }
}
