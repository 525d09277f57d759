//! Demo fleet for first runs.
//!
//! Seeding only runs against a database without vehicles. It creates three
//! vehicles, three drivers, three fuel loads and two accounts:
//! `admin` / `admin123` and `chofer1` / `chofer123` (linked to Juan Pérez).

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::Serialize;
use tracing::info;

use crate::auth::{Authenticator, NewAccount};
use crate::error::{Error, Result};
use crate::model::{NewDriver, NewVehicle, Role, VehicleCategory};
use crate::storage::Storage;
use crate::submission::{self, FuelLoadRequest, SubmitOutcome};

/// What a seed run created.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SeedSummary {
    /// Vehicles created.
    pub vehicles: usize,
    /// Drivers created.
    pub drivers: usize,
    /// Fuel loads appended.
    pub fuel_loads: usize,
    /// Accounts created.
    pub accounts: usize,
}

fn demo_vehicles() -> Vec<NewVehicle> {
    [
        ("MOV-001", "Mercedes-Benz", "Actros 2644", VehicleCategory::Truck, 400.0),
        ("MOV-002", "Caterpillar", "320D", VehicleCategory::HeavyEquipment, 250.0),
        ("MOV-003", "Toyota", "Hilux", VehicleCategory::Truck, 80.0),
    ]
    .into_iter()
    .map(|(plate, make, model, category, tank_capacity)| NewVehicle {
        plate: plate.to_string(),
        make: make.to_string(),
        model: model.to_string(),
        category,
        tank_capacity,
        active: true,
    })
    .collect()
}

fn demo_drivers() -> Vec<NewDriver> {
    [
        ("Juan", "Pérez", "1234567-8", "C"),
        ("María", "González", "2345678-9", "B"),
        ("Carlos", "López", "3456789-0", "C"),
    ]
    .into_iter()
    .map(|(first_name, last_name, national_id, license_class)| NewDriver {
        first_name: first_name.to_string(),
        last_name: last_name.to_string(),
        national_id: national_id.to_string(),
        license_class: license_class.to_string(),
        active: true,
    })
    .collect()
}

struct DemoLoad {
    vehicle: usize,
    driver: usize,
    liters: f64,
    odometer: (f64, f64),
    at: (i32, u32, u32, u32, u32),
    station: &'static str,
    price: f64,
    notes: Option<&'static str>,
    recorded_by: &'static str,
}

const DEMO_LOADS: [DemoLoad; 3] = [
    DemoLoad {
        vehicle: 0,
        driver: 0,
        liters: 200.0,
        odometer: (45_000.0, 45_500.0),
        at: (2024, 1, 15, 8, 30),
        station: "Shell Ruta 2",
        price: 8_200.0,
        notes: Some("Carga completa"),
        recorded_by: "admin",
    },
    DemoLoad {
        vehicle: 1,
        driver: 1,
        liters: 150.0,
        odometer: (12_000.0, 12_300.0),
        at: (2024, 1, 15, 14, 15),
        station: "Petrobras Centro",
        price: 7_500.0,
        notes: None,
        recorded_by: "chofer1",
    },
    DemoLoad {
        vehicle: 2,
        driver: 2,
        liters: 60.0,
        odometer: (78_000.0, 78_350.0),
        at: (2024, 1, 16, 9, 45),
        station: "COPETROL Norte",
        price: 8_800.0,
        notes: None,
        recorded_by: "admin",
    },
];

/// Load the demo fleet into an empty database.
///
/// The whole seed runs in one transaction: if any step fails, nothing is
/// left behind. `auth` must write through the same `storage`.
///
/// # Errors
///
/// Returns [`Error::Conflict`] if the database already holds vehicles, or
/// any storage or hashing error.
pub fn seed_demo(storage: &Storage, auth: &Authenticator<'_>) -> Result<SeedSummary> {
    let summary = storage.transaction(|storage| seed_fleet(storage, auth))?;
    info!(
        vehicles = summary.vehicles,
        drivers = summary.drivers,
        fuel_loads = summary.fuel_loads,
        "Seeded demo fleet"
    );
    Ok(summary)
}

fn seed_fleet(storage: &Storage, auth: &Authenticator<'_>) -> Result<SeedSummary> {
    if !storage.vehicles()?.is_empty() {
        return Err(Error::conflict(
            "database already contains vehicles; seeding needs an empty database",
        ));
    }

    let mut summary = SeedSummary::default();

    let vehicle_ids = demo_vehicles()
        .iter()
        .map(|v| storage.insert_vehicle(v))
        .collect::<Result<Vec<_>>>()?;
    summary.vehicles = vehicle_ids.len();

    let driver_ids = demo_drivers()
        .iter()
        .map(|d| storage.insert_driver(d))
        .collect::<Result<Vec<_>>>()?;
    summary.drivers = driver_ids.len();

    for load in &DEMO_LOADS {
        let (year, month, day, hour, minute) = load.at;
        let date = NaiveDate::from_ymd_opt(year, month, day)
            .ok_or_else(|| Error::internal("invalid demo load date"))?;
        let time = NaiveTime::from_hms_opt(hour, minute, 0)
            .ok_or_else(|| Error::internal("invalid demo load time"))?;
        let created_at: DateTime<Utc> = date.and_time(time).and_utc();

        let request = FuelLoadRequest {
            vehicle_id: vehicle_ids[load.vehicle],
            driver_id: driver_ids[load.driver],
            liters: load.liters,
            odometer_start: load.odometer.0,
            odometer_end: load.odometer.1,
            station: load.station.to_string(),
            price: load.price,
            date: Some(date),
            time: Some(time),
            notes: load.notes.map(str::to_string),
        };
        let new = request.into_new_fuel_load(load.recorded_by, date.and_time(time), created_at);
        if let SubmitOutcome::Recorded(_) = submission::append(storage, &new)? {
            summary.fuel_loads += 1;
        }
    }

    let accounts = [
        NewAccount {
            username: "admin".to_string(),
            password: "admin123".to_string(),
            role: Role::Administrator,
            display_name: "Administrador MOPC".to_string(),
            driver_id: None,
        },
        NewAccount {
            username: "chofer1".to_string(),
            password: "chofer123".to_string(),
            role: Role::Driver,
            display_name: "Juan Pérez".to_string(),
            driver_id: Some(driver_ids[0]),
        },
    ];
    for account in &accounts {
        auth.create_account(account)?;
        summary.accounts += 1;
    }
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn seeded() -> Storage {
        let storage = Storage::open_in_memory().unwrap();
        let auth = Authenticator::new(&storage, 4, Duration::minutes(30));
        let summary = seed_demo(&storage, &auth).unwrap();
        assert_eq!(
            summary,
            SeedSummary {
                vehicles: 3,
                drivers: 3,
                fuel_loads: 3,
                accounts: 2
            }
        );
        storage
    }

    #[test]
    fn test_seed_creates_demo_fleet() {
        let storage = seeded();
        let ledger = storage.snapshot().unwrap();

        let plates: Vec<&str> = ledger.vehicles().iter().map(|v| v.plate.as_str()).collect();
        assert_eq!(plates, vec!["MOV-001", "MOV-002", "MOV-003"]);
        assert_eq!(ledger.records()[0].notes.as_deref(), Some("Carga completa"));
        assert_eq!(ledger.records()[1].recorded_by, "chofer1");
    }

    #[test]
    fn test_seed_dashboard_totals() {
        let storage = seeded();
        let ledger = storage.snapshot().unwrap();
        let admin = storage.account_by_username("admin").unwrap().unwrap().actor();

        let metrics = ledger.dashboard(&admin);
        assert_eq!(metrics.total_liters, 410.0);
        assert_eq!(metrics.total_loads, 3);
        assert_eq!(metrics.active_vehicle_count, 3);
        assert_eq!(metrics.total_spend, 24_500.0);
    }

    #[test]
    fn test_seed_links_driver_account() {
        let storage = seeded();
        let ledger = storage.snapshot().unwrap();
        let chofer = storage.account_by_username("chofer1").unwrap().unwrap().actor();

        let history = ledger.history(&chofer, "");
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].station, "Shell Ruta 2");
    }

    #[test]
    fn test_seed_demo_credentials_work() {
        let storage = seeded();
        let auth = Authenticator::new(&storage, 4, Duration::minutes(30));
        assert!(auth.login("admin", "admin123", Utc::now()).is_ok());
        assert!(auth.login("chofer1", "chofer123", Utc::now()).is_ok());
    }

    #[test]
    fn test_seed_refuses_non_empty_database() {
        let storage = seeded();
        let auth = Authenticator::new(&storage, 4, Duration::minutes(30));
        let err = seed_demo(&storage, &auth).unwrap_err();
        assert!(matches!(err, Error::Conflict { .. }));
    }

    #[test]
    fn test_failed_seed_leaves_nothing_behind() {
        let storage = Storage::open_in_memory().unwrap();
        storage
            .insert_driver(&NewDriver {
                first_name: "Otro".to_string(),
                last_name: "Chofer".to_string(),
                national_id: "1234567-8".to_string(),
                license_class: "B".to_string(),
                active: true,
            })
            .unwrap();
        let auth = Authenticator::new(&storage, 4, Duration::minutes(30));

        assert!(seed_demo(&storage, &auth).is_err());
        let stats = storage.stats().unwrap();
        assert_eq!(stats.vehicles, 0);
        assert_eq!(stats.drivers, 1);
        assert_eq!(stats.fuel_loads, 0);
        assert_eq!(stats.accounts, 0);
    }

    #[test]
    fn test_account_conflict_rolls_back_fleet() {
        let storage = Storage::open_in_memory().unwrap();
        let auth = Authenticator::new(&storage, 4, Duration::minutes(30));
        auth.create_account(&NewAccount {
            username: "admin".to_string(),
            password: "other".to_string(),
            role: Role::Administrator,
            display_name: "Existing".to_string(),
            driver_id: None,
        })
        .unwrap();

        let err = seed_demo(&storage, &auth).unwrap_err();
        assert!(matches!(err, Error::Conflict { .. }));
        assert!(storage.vehicles().unwrap().is_empty());
        assert!(storage.drivers().unwrap().is_empty());
        assert_eq!(storage.stats().unwrap().fuel_loads, 0);
        assert_eq!(storage.accounts().unwrap().len(), 1);
    }
}
