//! Submission of new ledger entries.
//!
//! Candidate fuel loads arrive as a typed [`FuelLoadRequest`]. Validation is a
//! pure function returning every failing field at once; only a request with
//! no field errors is turned into a [`NewFuelLoad`] and appended to storage.
//! The same module validates new vehicles and drivers for the reference
//! directories.

use std::fmt;

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, NaiveTime, Timelike, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::auth::require_admin;
use crate::config::SubmissionConfig;
use crate::error::{Error, Result};
use crate::filter::resolve_driver_id;
use crate::ledger::Ledger;
use crate::metrics::ConsumptionRate;
use crate::model::{Actor, FuelLoadRecord, NewDriver, NewFuelLoad, NewVehicle};
use crate::storage::Storage;

/// Plate format accepted when no pattern is configured, e.g. `MOV-001`.
pub const DEFAULT_PLATE_PATTERN: &str = r"^[A-Z]{3}-?[0-9]{3,4}$";

/// A single rejected input field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    /// Name of the field.
    pub field: &'static str,
    /// What is wrong with it.
    pub message: String,
}

impl FieldError {
    /// Create a field error.
    #[must_use]
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.field, self.message)
    }
}

/// A candidate fuel load as entered by a user.
///
/// Everything except date, time and notes is required. Date and time default
/// to the moment of submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FuelLoadRequest {
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
    /// Service station name.
    pub station: String,
    /// Total price paid.
    pub price: f64,
    /// Date of the load.
    #[serde(default)]
    pub date: Option<NaiveDate>,
    /// Time of the load.
    #[serde(default)]
    pub time: Option<NaiveTime>,
    /// Free-text notes.
    #[serde(default)]
    pub notes: Option<String>,
}

impl FuelLoadRequest {
    /// Turn a validated request into a record ready for storage.
    ///
    /// Missing date and time are taken from `local_now`, truncated to the
    /// minute. Station and notes are trimmed; blank notes become `None`.
    #[must_use]
    pub fn into_new_fuel_load(
        self,
        recorded_by: &str,
        local_now: NaiveDateTime,
        created_at: DateTime<Utc>,
    ) -> NewFuelLoad {
        let date = self.date.unwrap_or_else(|| local_now.date());
        let time = self.time.unwrap_or_else(|| truncate_to_minute(local_now.time()));
        let station = self.station.trim().to_string();
        let fingerprint = fingerprint(&self, date, time, &station);

        NewFuelLoad {
            vehicle_id: self.vehicle_id,
            driver_id: self.driver_id,
            liters: self.liters,
            odometer_start: self.odometer_start,
            odometer_end: self.odometer_end,
            date,
            time,
            station,
            price: self.price,
            notes: self
                .notes
                .map(|n| n.trim().to_string())
                .filter(|n| !n.is_empty()),
            recorded_by: recorded_by.to_string(),
            created_at,
            fingerprint,
        }
    }
}

fn truncate_to_minute(time: NaiveTime) -> NaiveTime {
    time.with_second(0)
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(time)
}

/// BLAKE3 fingerprint of the fields that identify a physical fuel load.
///
/// Who recorded it and when are excluded, so submitting the same load twice
/// produces the same fingerprint.
fn fingerprint(request: &FuelLoadRequest, date: NaiveDate, time: NaiveTime, station: &str) -> String {
    let canonical = format!(
        "{}|{}|{}|{}|{}|{}|{}|{}|{}",
        request.vehicle_id,
        request.driver_id,
        date.format("%Y-%m-%d"),
        time.format("%H:%M"),
        request.liters,
        request.odometer_start,
        request.odometer_end,
        station.to_lowercase(),
        request.price,
    );
    blake3::hash(canonical.as_bytes()).to_hex().to_string()
}

/// Rules applied on top of the structural checks.
#[derive(Debug, Clone)]
pub struct SubmissionRules {
    plate_pattern: Regex,
    max_liters_over_capacity: f64,
}

impl SubmissionRules {
    /// Build rules from a plate regex and a tank-capacity tolerance.
    ///
    /// A negative tolerance disables the capacity check.
    ///
    /// # Errors
    ///
    /// Returns an error if the plate pattern is not a valid regex.
    pub fn new(plate_pattern: &str, max_liters_over_capacity: f64) -> Result<Self> {
        let plate_pattern = Regex::new(plate_pattern).map_err(|e| Error::ConfigValidation {
            message: format!("invalid plate pattern {plate_pattern}: {e}"),
        })?;
        Ok(Self {
            plate_pattern,
            max_liters_over_capacity,
        })
    }

    /// Build rules from the `[submission]` configuration section.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured plate pattern is invalid.
    pub fn from_config(config: &SubmissionConfig) -> Result<Self> {
        Self::new(&config.plate_pattern, config.max_liters_over_capacity)
    }

    /// Whether `plate`, after normalization, matches the plate pattern.
    #[must_use]
    pub fn plate_is_valid(&self, plate: &str) -> bool {
        self.plate_pattern.is_match(&normalize_plate(plate))
    }
}

/// Trim and uppercase a plate.
#[must_use]
pub fn normalize_plate(plate: &str) -> String {
    plate.trim().to_uppercase()
}

fn is_positive(value: f64) -> bool {
    value.is_finite() && value > 0.0
}

/// Validate a fuel-load request against the current ledger.
///
/// Returns an empty list when the request is acceptable.
#[must_use]
pub fn validate_fuel_load(
    request: &FuelLoadRequest,
    ledger: &Ledger,
    rules: &SubmissionRules,
) -> Vec<FieldError> {
    let mut errors = Vec::new();

    let vehicle = ledger.vehicle(request.vehicle_id);
    match vehicle {
        None => errors.push(FieldError::new("vehicle", "does not exist")),
        Some(v) if !v.active => errors.push(FieldError::new("vehicle", "is not active")),
        Some(_) => {}
    }

    match ledger.driver(request.driver_id) {
        None => errors.push(FieldError::new("driver", "does not exist")),
        Some(d) if !d.active => errors.push(FieldError::new("driver", "is not active")),
        Some(_) => {}
    }

    if !is_positive(request.liters) {
        errors.push(FieldError::new("liters", "must be greater than 0"));
    } else if let Some(v) = vehicle {
        let tolerance = rules.max_liters_over_capacity;
        if tolerance >= 0.0 && request.liters > v.tank_capacity + tolerance {
            errors.push(FieldError::new(
                "liters",
                format!("exceed the tank capacity of {} L", v.tank_capacity),
            ));
        }
    }

    if !request.odometer_start.is_finite() || request.odometer_start < 0.0 {
        errors.push(FieldError::new("odometer_start", "must not be negative"));
    }

    if !request.odometer_end.is_finite() {
        errors.push(FieldError::new("odometer_end", "must be a number"));
    } else if request.odometer_end <= request.odometer_start {
        errors.push(FieldError::new(
            "odometer_end",
            "must be greater than the starting odometer",
        ));
    }

    if request.station.trim().is_empty() {
        errors.push(FieldError::new("station", "is required"));
    }

    if !is_positive(request.price) {
        errors.push(FieldError::new("price", "must be greater than 0"));
    }

    errors
}

/// Distance and consumption shown while a load is being entered.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Preview {
    /// Odometer delta, clamped at zero.
    pub distance: f64,
    /// Liters per 100 distance units.
    pub consumption_rate: ConsumptionRate,
}

/// Compute the preview for a request that may still be incomplete.
#[must_use]
pub fn preview(request: &FuelLoadRequest) -> Preview {
    let distance = (request.odometer_end - request.odometer_start).max(0.0);
    let consumption_rate = if distance > 0.0 && request.liters > 0.0 {
        ConsumptionRate::from_liters_and_distance(request.liters, distance)
    } else {
        ConsumptionRate::ZERO
    };
    Preview {
        distance,
        consumption_rate,
    }
}

/// Outcome of appending a fuel load.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    /// The load was appended to the ledger.
    Recorded(FuelLoadRecord),
    /// An identical load was already in the ledger; nothing was written.
    Duplicate,
}

/// Validate and append a fuel load on behalf of `actor`.
///
/// Drivers may only record loads assigned to themselves.
///
/// # Errors
///
/// Returns [`Error::PermissionDenied`] for a driver recording someone else's
/// load, [`Error::InvalidSubmission`] with every failing field, or a storage
/// error.
pub fn submit_fuel_load(
    storage: &Storage,
    actor: &Actor,
    request: FuelLoadRequest,
    rules: &SubmissionRules,
) -> Result<SubmitOutcome> {
    let ledger = storage.snapshot()?;

    if !actor.is_admin() && resolve_driver_id(actor, ledger.drivers()) != Some(request.driver_id) {
        return Err(Error::permission_denied(
            "recording a load for another driver",
            "the administrator role",
        ));
    }

    let errors = validate_fuel_load(&request, &ledger, rules);
    if !errors.is_empty() {
        debug!(count = errors.len(), "Fuel load rejected by validation");
        return Err(Error::InvalidSubmission {
            subject: "fuel load",
            errors,
        });
    }

    let new = request.into_new_fuel_load(&actor.username, Local::now().naive_local(), Utc::now());
    append(storage, &new)
}

/// Append an already built fuel load, reporting duplicates.
///
/// # Errors
///
/// Returns an error if the database operation fails.
pub(crate) fn append(storage: &Storage, new: &NewFuelLoad) -> Result<SubmitOutcome> {
    let Some(id) = storage.append_fuel_load(new)? else {
        return Ok(SubmitOutcome::Duplicate);
    };
    let record = storage
        .fuel_load(id)?
        .ok_or_else(|| Error::internal(format!("fuel load {id} vanished after insert")))?;
    info!(
        id,
        vehicle_id = record.vehicle_id,
        liters = record.liters,
        "Fuel load recorded"
    );
    Ok(SubmitOutcome::Recorded(record))
}

/// Validate a new vehicle.
#[must_use]
pub fn validate_vehicle(vehicle: &NewVehicle, rules: &SubmissionRules) -> Vec<FieldError> {
    let mut errors = Vec::new();
    if !rules.plate_is_valid(&vehicle.plate) {
        errors.push(FieldError::new(
            "plate",
            format!("'{}' does not match {}", vehicle.plate, rules.plate_pattern.as_str()),
        ));
    }
    if vehicle.make.trim().is_empty() {
        errors.push(FieldError::new("make", "is required"));
    }
    if vehicle.model.trim().is_empty() {
        errors.push(FieldError::new("model", "is required"));
    }
    if !is_positive(vehicle.tank_capacity) {
        errors.push(FieldError::new("tank_capacity", "must be greater than 0"));
    }
    errors
}

/// Validate a new driver.
#[must_use]
pub fn validate_driver(driver: &NewDriver) -> Vec<FieldError> {
    [
        ("first_name", &driver.first_name),
        ("last_name", &driver.last_name),
        ("national_id", &driver.national_id),
        ("license_class", &driver.license_class),
    ]
    .into_iter()
    .filter(|(_, value)| value.trim().is_empty())
    .map(|(field, _)| FieldError::new(field, "is required"))
    .collect()
}

/// Validate and store a new vehicle. Administrators only.
///
/// # Errors
///
/// Returns a permission, validation, conflict or storage error.
pub fn register_vehicle(
    storage: &Storage,
    actor: &Actor,
    mut vehicle: NewVehicle,
    rules: &SubmissionRules,
) -> Result<i64> {
    require_admin(actor, "adding vehicles")?;
    vehicle.plate = normalize_plate(&vehicle.plate);
    let errors = validate_vehicle(&vehicle, rules);
    if !errors.is_empty() {
        return Err(Error::InvalidSubmission {
            subject: "vehicle",
            errors,
        });
    }
    let id = storage.insert_vehicle(&vehicle)?;
    info!(id, plate = %vehicle.plate, "Vehicle registered");
    Ok(id)
}

/// Validate and store a new driver. Administrators only.
///
/// # Errors
///
/// Returns a permission, validation, conflict or storage error.
pub fn register_driver(storage: &Storage, actor: &Actor, driver: NewDriver) -> Result<i64> {
    require_admin(actor, "adding drivers")?;
    let errors = validate_driver(&driver);
    if !errors.is_empty() {
        return Err(Error::InvalidSubmission {
            subject: "driver",
            errors,
        });
    }
    let id = storage.insert_driver(&driver)?;
    info!(id, name = %format!("{} {}", driver.first_name, driver.last_name), "Driver registered");
    Ok(id)
}
