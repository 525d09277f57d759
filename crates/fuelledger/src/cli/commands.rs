//! CLI command definitions.
//!
//! This module defines the structure of all CLI subcommands.

use std::path::PathBuf;

use chrono::{NaiveDate, NaiveTime};
use clap::{Args, Subcommand, ValueEnum};

use crate::model::{NewDriver, NewVehicle, Role, VehicleCategory};
use crate::submission::FuelLoadRequest;

/// Environment variable read by `login` when `--password` is absent.
pub const PASSWORD_ENV: &str = "FUELLEDGER_PASSWORD";

/// Login command arguments.
#[derive(Debug, Args)]
pub struct LoginCommand {
    /// Account name
    pub username: String,

    /// Password (prompted on stdin when omitted)
    #[arg(short, long, env = PASSWORD_ENV, hide_env_values = true)]
    pub password: Option<String>,
}

/// History command arguments.
#[derive(Debug, Args)]
pub struct HistoryCommand {
    /// Search plate, make, driver name or station
    pub query: Option<String>,

    /// Maximum number of rows (defaults to display.history_limit)
    #[arg(short, long)]
    pub limit: Option<usize>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,
}

/// Record command arguments.
#[derive(Debug, Args)]
pub struct RecordCommand {
    /// Vehicle id
    #[arg(long)]
    pub vehicle: i64,

    /// Driver id (drivers default to themselves)
    #[arg(long)]
    pub driver: Option<i64>,

    /// Liters loaded
    #[arg(long)]
    pub liters: f64,

    /// Starting odometer reading
    #[arg(long)]
    pub odometer_start: f64,

    /// Ending odometer reading
    #[arg(long)]
    pub odometer_end: f64,

    /// Service station
    #[arg(long)]
    pub station: String,

    /// Total price paid
    #[arg(long)]
    pub price: f64,

    /// Date of the load, YYYY-MM-DD (defaults to today)
    #[arg(long)]
    pub date: Option<NaiveDate>,

    /// Time of the load, HH:MM (defaults to now)
    #[arg(long, value_parser = parse_time)]
    pub time: Option<NaiveTime>,

    /// Free-text notes
    #[arg(long)]
    pub notes: Option<String>,

    /// Validate and preview without recording
    #[arg(long)]
    pub dry_run: bool,

    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

impl RecordCommand {
    /// Build the submission request for the given driver.
    #[must_use]
    pub fn to_request(&self, driver_id: i64) -> FuelLoadRequest {
        FuelLoadRequest {
            vehicle_id: self.vehicle,
            driver_id,
            liters: self.liters,
            odometer_start: self.odometer_start,
            odometer_end: self.odometer_end,
            station: self.station.clone(),
            price: self.price,
            date: self.date,
            time: self.time,
            notes: self.notes.clone(),
        }
    }
}

/// Parse `HH:MM` or `HH:MM:SS`.
///
/// # Errors
///
/// Returns a message when neither form matches.
pub fn parse_time(value: &str) -> Result<NaiveTime, String> {
    NaiveTime::parse_from_str(value, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M:%S"))
        .map_err(|_| format!("expected HH:MM, got '{value}'"))
}

/// Vehicle directory commands.
#[derive(Debug, Subcommand)]
pub enum VehicleCommand {
    /// Register a vehicle (administrators only)
    Add(VehicleAddArgs),

    /// List vehicles
    List {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },
}

/// Arguments for `vehicle add`.
#[derive(Debug, Args)]
pub struct VehicleAddArgs {
    /// License plate, e.g. MOV-004
    #[arg(long)]
    pub plate: String,

    /// Manufacturer
    #[arg(long)]
    pub make: String,

    /// Model
    #[arg(long)]
    pub model: String,

    /// Vehicle category
    #[arg(long, value_enum)]
    pub category: CategoryArg,

    /// Tank capacity in liters
    #[arg(long)]
    pub tank_capacity: f64,

    /// Register the vehicle as out of service
    #[arg(long)]
    pub inactive: bool,
}

impl From<VehicleAddArgs> for NewVehicle {
    fn from(args: VehicleAddArgs) -> Self {
        Self {
            plate: args.plate,
            make: args.make,
            model: args.model,
            category: args.category.into(),
            tank_capacity: args.tank_capacity,
            active: !args.inactive,
        }
    }
}

/// Driver directory commands.
#[derive(Debug, Subcommand)]
pub enum DriverCommand {
    /// Register a driver (administrators only)
    Add(DriverAddArgs),

    /// List drivers
    List {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },
}

/// Arguments for `driver add`.
#[derive(Debug, Args)]
pub struct DriverAddArgs {
    /// Given name
    #[arg(long)]
    pub first_name: String,

    /// Family name
    #[arg(long)]
    pub last_name: String,

    /// National identity document number
    #[arg(long)]
    pub national_id: String,

    /// License class
    #[arg(long)]
    pub license_class: String,

    /// Register the driver as inactive
    #[arg(long)]
    pub inactive: bool,
}

impl From<DriverAddArgs> for NewDriver {
    fn from(args: DriverAddArgs) -> Self {
        Self {
            first_name: args.first_name,
            last_name: args.last_name,
            national_id: args.national_id,
            license_class: args.license_class,
            active: !args.inactive,
        }
    }
}

/// Account commands.
#[derive(Debug, Subcommand)]
pub enum AccountCommand {
    /// Create an account (administrators only)
    Add(AccountAddArgs),

    /// List accounts (administrators only)
    List {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },
}

/// Arguments for `account add`.
#[derive(Debug, Args)]
pub struct AccountAddArgs {
    /// Login name
    pub username: String,

    /// Human-readable name
    #[arg(long)]
    pub display_name: String,

    /// Account role
    #[arg(long, value_enum, default_value = "driver")]
    pub role: RoleArg,

    /// Driver this account belongs to (required for drivers)
    #[arg(long)]
    pub driver: Option<i64>,

    /// Password (prompted on stdin when omitted)
    #[arg(short, long)]
    pub password: Option<String>,
}

/// Status command arguments.
#[derive(Debug, Args)]
pub struct StatusCommand {
    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Configuration commands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show the configuration file path
    Path,

    /// Validate configuration
    Validate {
        /// Path to configuration file to validate
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}

/// Vehicle category argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CategoryArg {
    /// Trucks and pickups
    Truck,
    /// Heavy machinery
    HeavyEquipment,
    /// Passenger cars
    Car,
    /// Motorcycles
    Motorcycle,
}

impl From<CategoryArg> for VehicleCategory {
    fn from(arg: CategoryArg) -> Self {
        match arg {
            CategoryArg::Truck => Self::Truck,
            CategoryArg::HeavyEquipment => Self::HeavyEquipment,
            CategoryArg::Car => Self::Car,
            CategoryArg::Motorcycle => Self::Motorcycle,
        }
    }
}

/// Account role argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RoleArg {
    /// Full access
    Admin,
    /// Own fuel loads only
    Driver,
}

impl From<RoleArg> for Role {
    fn from(arg: RoleArg) -> Self {
        match arg {
            RoleArg::Admin => Self::Administrator,
            RoleArg::Driver => Self::Driver,
        }
    }
}

/// Output format for commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Plain text output
    #[default]
    Plain,
    /// Formatted table
    Table,
    /// JSON output
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_time() {
        assert_eq!(
            parse_time("08:30").unwrap(),
            NaiveTime::from_hms_opt(8, 30, 0).unwrap()
        );
        assert_eq!(
            parse_time("14:15:30").unwrap(),
            NaiveTime::from_hms_opt(14, 15, 30).unwrap()
        );
        assert!(parse_time("25:00").is_err());
        assert!(parse_time("noon").unwrap_err().contains("HH:MM"));
    }

    #[test]
    fn test_category_arg_conversion() {
        assert_eq!(VehicleCategory::from(CategoryArg::Truck), VehicleCategory::Truck);
        assert_eq!(
            VehicleCategory::from(CategoryArg::HeavyEquipment),
            VehicleCategory::HeavyEquipment
        );
        assert_eq!(VehicleCategory::from(CategoryArg::Car), VehicleCategory::Car);
        assert_eq!(
            VehicleCategory::from(CategoryArg::Motorcycle),
            VehicleCategory::Motorcycle
        );
    }

    #[test]
    fn test_role_arg_conversion() {
        assert_eq!(Role::from(RoleArg::Admin), Role::Administrator);
        assert_eq!(Role::from(RoleArg::Driver), Role::Driver);
    }

    #[test]
    fn test_output_format_default() {
        assert_eq!(OutputFormat::default(), OutputFormat::Plain);
    }

    #[test]
    fn test_record_command_to_request() {
        let cmd = RecordCommand {
            vehicle: 1,
            driver: None,
            liters: 200.0,
            odometer_start: 45_000.0,
            odometer_end: 45_500.0,
            station: "Shell Ruta 2".to_string(),
            price: 8_200.0,
            date: None,
            time: parse_time("08:30").ok(),
            notes: None,
            dry_run: true,
            json: false,
        };
        let request = cmd.to_request(4);
        assert_eq!(request.driver_id, 4);
        assert_eq!(request.vehicle_id, 1);
        assert_eq!(request.time, NaiveTime::from_hms_opt(8, 30, 0));
    }

    #[test]
    fn test_vehicle_args_into_new_vehicle() {
        let args = VehicleAddArgs {
            plate: "MOV-004".to_string(),
            make: "Ford".to_string(),
            model: "Ranger".to_string(),
            category: CategoryArg::Car,
            tank_capacity: 80.0,
            inactive: true,
        };
        let vehicle = NewVehicle::from(args);
        assert!(!vehicle.active);
        assert_eq!(vehicle.category, VehicleCategory::Car);
    }

    #[test]
    fn test_driver_args_into_new_driver() {
        let args = DriverAddArgs {
            first_name: "Ana".to_string(),
            last_name: "Vera".to_string(),
            national_id: "4567890-1".to_string(),
            license_class: "B".to_string(),
            inactive: false,
        };
        let driver = NewDriver::from(args);
        assert!(driver.active);
        assert_eq!(driver.national_id, "4567890-1");
    }
}
