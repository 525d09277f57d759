//! Core domain types for fuelledger.
//!
//! Vehicles and drivers are reference collections; fuel-load records point at
//! them by identifier and are joined at read time. Actors are the
//! authenticated users the ledger is shown to.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Category of a fleet vehicle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VehicleCategory {
    /// Cargo trucks and pickups.
    Truck,
    /// Excavators, graders and other machinery.
    HeavyEquipment,
    /// Passenger cars.
    Car,
    /// Motorcycles.
    Motorcycle,
}

impl VehicleCategory {
    /// All categories in display order.
    pub const ALL: [Self; 4] = [
        Self::Truck,
        Self::HeavyEquipment,
        Self::Car,
        Self::Motorcycle,
    ];

    /// Stable string form used in storage and output.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Truck => "truck",
            Self::HeavyEquipment => "heavy_equipment",
            Self::Car => "car",
            Self::Motorcycle => "motorcycle",
        }
    }
}

impl fmt::Display for VehicleCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VehicleCategory {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "truck" | "camion" => Ok(Self::Truck),
            "heavy_equipment" | "heavy-equipment" | "maquinaria" => Ok(Self::HeavyEquipment),
            "car" | "auto" => Ok(Self::Car),
            "motorcycle" | "moto" => Ok(Self::Motorcycle),
            other => Err(Error::invalid_input(
                "category",
                format!("unknown vehicle category '{other}'"),
            )),
        }
    }
}

/// A fleet vehicle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vehicle {
    /// Identifier assigned by storage.
    pub id: i64,
    /// License plate, e.g. `MOV-001`.
    pub plate: String,
    /// Manufacturer.
    pub make: String,
    /// Model name.
    pub model: String,
    /// Vehicle category.
    pub category: VehicleCategory,
    /// Fuel tank capacity in liters.
    pub tank_capacity: f64,
    /// Whether the vehicle is in service.
    pub active: bool,
}

/// A vehicle that has not been stored yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewVehicle {
    /// License plate.
    pub plate: String,
    /// Manufacturer.
    pub make: String,
    /// Model name.
    pub model: String,
    /// Vehicle category.
    pub category: VehicleCategory,
    /// Fuel tank capacity in liters.
    pub tank_capacity: f64,
    /// Whether the vehicle is in service.
    pub active: bool,
}

/// A driver who can be assigned to fuel loads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Driver {
    /// Identifier assigned by storage.
    pub id: i64,
    /// Given name.
    pub first_name: String,
    /// Family name.
    pub last_name: String,
    /// National identity document number.
    pub national_id: String,
    /// Driving license class.
    pub license_class: String,
    /// Whether the driver is currently employed.
    pub active: bool,
}

impl Driver {
    /// First and last name joined by a space.
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// A driver that has not been stored yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewDriver {
    /// Given name.
    pub first_name: String,
    /// Family name.
    pub last_name: String,
    /// National identity document number.
    pub national_id: String,
    /// Driving license class.
    pub license_class: String,
    /// Whether the driver is currently employed.
    pub active: bool,
}

/// A single fuel-load event in the ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FuelLoadRecord {
    /// Identifier assigned by storage.
    pub id: i64,
    /// Vehicle that was fueled.
    pub vehicle_id: i64,
    /// Driver responsible for the load.
    pub driver_id: i64,
    /// Liters loaded.
    pub liters: f64,
    /// Odometer reading at the start of the period.
    pub odometer_start: f64,
    /// Odometer reading at the end of the period.
    pub odometer_end: f64,
    /// Calendar date of the load.
    pub date: NaiveDate,
    /// Local time of the load.
    pub time: NaiveTime,
    /// Service station name.
    pub station: String,
    /// Total price paid.
    pub price: f64,
    /// Free-text notes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// Username of whoever recorded the load.
    pub recorded_by: String,
    /// When the record entered the ledger.
    pub created_at: DateTime<Utc>,
}

impl FuelLoadRecord {
    /// Distance covered: ending minus starting odometer.
    ///
    /// Not clamped; a reversed odometer pair yields a negative distance.
    #[must_use]
    pub fn distance(&self) -> f64 {
        self.odometer_end - self.odometer_start
    }
}

/// A fuel load that passed validation and is ready to be appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewFuelLoad {
    /// Vehicle that was fueled.
    pub vehicle_id: i64,
    /// Driver responsible for the load.
    pub driver_id: i64,
    /// Liters loaded.
    pub liters: f64,
    /// Starting odometer reading.
    pub odometer_start: f64,
    /// Ending odometer reading.
    pub odometer_end: f64,
    /// Calendar date of the load.
    pub date: NaiveDate,
    /// Local time of the load.
    pub time: NaiveTime,
    /// Service station name.
    pub station: String,
    /// Total price paid.
    pub price: f64,
    /// Free-text notes.
    pub notes: Option<String>,
    /// Username of whoever recorded the load.
    pub recorded_by: String,
    /// When the record entered the ledger.
    pub created_at: DateTime<Utc>,
    /// BLAKE3 fingerprint used to reject double submissions.
    pub fingerprint: String,
}

/// Role of an authenticated user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Sees and manages everything.
    Administrator,
    /// Sees only their own fuel loads.
    Driver,
}

impl Role {
    /// Stable string form used in storage and output.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Administrator => "admin",
            Self::Driver => "driver",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" | "administrator" => Ok(Self::Administrator),
            "driver" | "chofer" => Ok(Self::Driver),
            other => Err(Error::invalid_input("role", format!("unknown role '{other}'"))),
        }
    }
}

/// An authenticated user of the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    /// Account identifier.
    pub id: i64,
    /// Login name.
    pub username: String,
    /// Role that decides ledger visibility.
    pub role: Role,
    /// Human-readable name, e.g. `Juan Pérez`.
    pub display_name: String,
    /// Direct link to the driver this account belongs to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub driver_id: Option<i64>,
}

impl Actor {
    /// Whether this actor has the administrator role.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == Role::Administrator
    }
}
