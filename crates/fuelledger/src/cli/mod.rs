//! Command-line interface for fuelledger.
//!
//! This module provides the CLI structure for the `fuelctl` binary.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use commands::{
    parse_time, AccountAddArgs, AccountCommand, CategoryArg, ConfigCommand, DriverAddArgs,
    DriverCommand, HistoryCommand, LoginCommand, OutputFormat, RecordCommand, RoleArg,
    StatusCommand, VehicleAddArgs, VehicleCommand, PASSWORD_ENV,
};

use crate::logging::Verbosity;

/// fuelctl - Fleet fuel-load ledger
///
/// Records fuel loads for a vehicle fleet and reports consumption, spend
/// and history, scoped to what the logged-in user may see.
#[derive(Debug, Parser)]
#[command(name = "fuelctl")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to custom configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Log in and store a session
    Login(LoginCommand),

    /// Remove the stored session
    Logout,

    /// Show the logged-in account
    Whoami {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show fleet totals and recent activity
    Dashboard {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// List and search fuel loads
    History(HistoryCommand),

    /// Record a fuel load
    Record(RecordCommand),

    /// Manage vehicles
    #[command(subcommand)]
    Vehicle(VehicleCommand),

    /// Manage drivers
    #[command(subcommand)]
    Driver(DriverCommand),

    /// Manage accounts
    #[command(subcommand)]
    Account(AccountCommand),

    /// Load the demo fleet into an empty database
    Seed,

    /// Show database and session status
    Status(StatusCommand),

    /// View or validate configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Cli {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub fn verbosity(&self) -> Verbosity {
        Verbosity::from_flags(self.verbose, self.quiet)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).unwrap()
    }

    #[test]
    fn test_cli_name() {
        assert_eq!(Cli::command().get_name(), "fuelctl");
    }

    #[test]
    fn test_cli_verify() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_verbosity_flags() {
        assert_eq!(parse(&["fuelctl", "-q", "seed"]).verbosity(), Verbosity::Quiet);
        assert_eq!(parse(&["fuelctl", "seed"]).verbosity(), Verbosity::Normal);
        assert_eq!(parse(&["fuelctl", "-vv", "seed"]).verbosity(), Verbosity::Debug);
    }

    #[test]
    fn test_parse_with_config() {
        let cli = parse(&["fuelctl", "-c", "/custom/config.toml", "status"]);
        assert_eq!(cli.config, Some(PathBuf::from("/custom/config.toml")));
    }

    #[test]
    fn test_parse_login() {
        let cli = parse(&["fuelctl", "login", "admin", "--password", "admin123"]);
        let Command::Login(login) = cli.command else {
            panic!("expected login");
        };
        assert_eq!(login.username, "admin");
        assert_eq!(login.password.as_deref(), Some("admin123"));
    }

    #[test]
    fn test_parse_history() {
        let cli = parse(&["fuelctl", "history", "shell", "--limit", "5", "-f", "json"]);
        let Command::History(history) = cli.command else {
            panic!("expected history");
        };
        assert_eq!(history.query.as_deref(), Some("shell"));
        assert_eq!(history.limit, Some(5));
        assert_eq!(history.format, OutputFormat::Json);
    }

    #[test]
    fn test_parse_history_defaults() {
        let Command::History(history) = parse(&["fuelctl", "history"]).command else {
            panic!("expected history");
        };
        assert!(history.query.is_none());
        assert!(history.limit.is_none());
        assert_eq!(history.format, OutputFormat::Table);
    }

    #[test]
    fn test_parse_record() {
        let cli = parse(&[
            "fuelctl",
            "record",
            "--vehicle",
            "1",
            "--liters",
            "200",
            "--odometer-start",
            "45500",
            "--odometer-end",
            "46000",
            "--station",
            "Shell Ruta 2",
            "--price",
            "8200",
            "--date",
            "2024-02-01",
            "--time",
            "07:45",
            "--dry-run",
        ]);
        let Command::Record(record) = cli.command else {
            panic!("expected record");
        };
        assert_eq!(record.vehicle, 1);
        assert!(record.driver.is_none());
        assert!(record.dry_run);
        assert_eq!(record.date, chrono::NaiveDate::from_ymd_opt(2024, 2, 1));
        assert_eq!(record.time, chrono::NaiveTime::from_hms_opt(7, 45, 0));
    }

    #[test]
    fn test_parse_record_rejects_bad_time() {
        let result = Cli::try_parse_from([
            "fuelctl",
            "record",
            "--vehicle",
            "1",
            "--liters",
            "1",
            "--odometer-start",
            "0",
            "--odometer-end",
            "1",
            "--station",
            "x",
            "--price",
            "1",
            "--time",
            "late",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_vehicle_add() {
        let cli = parse(&[
            "fuelctl",
            "vehicle",
            "add",
            "--plate",
            "MOV-004",
            "--make",
            "Ford",
            "--model",
            "Ranger",
            "--category",
            "heavy-equipment",
            "--tank-capacity",
            "80",
        ]);
        let Command::Vehicle(VehicleCommand::Add(args)) = cli.command else {
            panic!("expected vehicle add");
        };
        assert_eq!(args.category, CategoryArg::HeavyEquipment);
        assert!(!args.inactive);
    }

    #[test]
    fn test_parse_account_add() {
        let cli = parse(&[
            "fuelctl",
            "account",
            "add",
            "chofer2",
            "--display-name",
            "María González",
            "--driver",
            "2",
        ]);
        let Command::Account(AccountCommand::Add(args)) = cli.command else {
            panic!("expected account add");
        };
        assert_eq!(args.role, RoleArg::Driver);
        assert_eq!(args.driver, Some(2));
        assert!(args.password.is_none());
    }

    #[test]
    fn test_parse_config_validate() {
        let cli = parse(&["fuelctl", "config", "validate", "--file", "/tmp/x.toml"]);
        assert!(matches!(
            cli.command,
            Command::Config(ConfigCommand::Validate { file: Some(_) })
        ));
    }
}
