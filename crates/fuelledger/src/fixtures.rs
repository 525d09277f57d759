//! Shared test fixtures: the demo fleet as plain in-memory values.

use chrono::{NaiveDate, NaiveTime, TimeZone, Utc};

use crate::model::{
    Actor, Driver, FuelLoadRecord, NewDriver, NewFuelLoad, NewVehicle, Role, Vehicle,
    VehicleCategory,
};
use crate::storage::Storage;

pub fn vehicle(id: i64, plate: &str, make: &str, category: VehicleCategory) -> Vehicle {
    Vehicle {
        id,
        plate: plate.to_string(),
        make: make.to_string(),
        model: "Test".to_string(),
        category,
        tank_capacity: 400.0,
        active: true,
    }
}

pub fn driver(id: i64, first_name: &str, last_name: &str) -> Driver {
    Driver {
        id,
        first_name: first_name.to_string(),
        last_name: last_name.to_string(),
        national_id: format!("{id}000000-0"),
        license_class: "C".to_string(),
        active: true,
    }
}

pub fn record(
    id: i64,
    vehicle_id: i64,
    driver_id: i64,
    liters: f64,
    odometer_start: f64,
    odometer_end: f64,
    price: f64,
) -> FuelLoadRecord {
    FuelLoadRecord {
        id,
        vehicle_id,
        driver_id,
        liters,
        odometer_start,
        odometer_end,
        date: NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
        time: NaiveTime::from_hms_opt(8, 30, 0).unwrap(),
        station: "Shell Ruta 2".to_string(),
        price,
        notes: None,
        recorded_by: "admin".to_string(),
        created_at: Utc.with_ymd_and_hms(2024, 1, 15, 8, 30, 0).unwrap(),
    }
}

pub fn demo_vehicles() -> Vec<Vehicle> {
    vec![
        Vehicle {
            model: "Actros 2644".to_string(),
            ..vehicle(1, "MOV-001", "Mercedes-Benz", VehicleCategory::Truck)
        },
        Vehicle {
            model: "320D".to_string(),
            tank_capacity: 250.0,
            ..vehicle(2, "MOV-002", "Caterpillar", VehicleCategory::HeavyEquipment)
        },
        Vehicle {
            model: "Hilux".to_string(),
            tank_capacity: 80.0,
            ..vehicle(3, "MOV-003", "Toyota", VehicleCategory::Truck)
        },
    ]
}

pub fn demo_drivers() -> Vec<Driver> {
    vec![
        driver(1, "Juan", "Pérez"),
        driver(2, "María", "González"),
        driver(3, "Carlos", "López"),
    ]
}

pub fn demo_records() -> Vec<FuelLoadRecord> {
    let mut second = record(2, 2, 2, 150.0, 12_000.0, 12_300.0, 7_500.0);
    second.station = "Petrobras Centro".to_string();
    second.time = NaiveTime::from_hms_opt(14, 15, 0).unwrap();
    second.recorded_by = "chofer1".to_string();

    let mut third = record(3, 3, 3, 60.0, 78_000.0, 78_350.0, 8_800.0);
    third.station = "COPETROL Norte".to_string();
    third.date = NaiveDate::from_ymd_opt(2024, 1, 16).unwrap();
    third.time = NaiveTime::from_hms_opt(9, 45, 0).unwrap();

    vec![
        record(1, 1, 1, 200.0, 45_000.0, 45_500.0, 8_200.0),
        second,
        third,
    ]
}

pub fn admin() -> Actor {
    Actor {
        id: 1,
        username: "admin".to_string(),
        role: Role::Administrator,
        display_name: "Administrador MOPC".to_string(),
        driver_id: None,
    }
}

pub fn driver_actor(display_name: &str, driver_id: Option<i64>) -> Actor {
    Actor {
        id: 2,
        username: "chofer1".to_string(),
        role: Role::Driver,
        display_name: display_name.to_string(),
        driver_id,
    }
}

/// Unvalidated insert form of a fixture record; fingerprint derived from its id.
pub fn new_fuel_load(record: &FuelLoadRecord) -> NewFuelLoad {
    NewFuelLoad {
        vehicle_id: record.vehicle_id,
        driver_id: record.driver_id,
        liters: record.liters,
        odometer_start: record.odometer_start,
        odometer_end: record.odometer_end,
        date: record.date,
        time: record.time,
        station: record.station.clone(),
        price: record.price,
        notes: record.notes.clone(),
        recorded_by: record.recorded_by.clone(),
        created_at: record.created_at,
        fingerprint: format!("demo-{}", record.id),
    }
}

/// In-memory storage holding the demo fleet, with ids 1..=3 everywhere.
pub fn demo_storage() -> Storage {
    let storage = Storage::open_in_memory().unwrap();
    for v in demo_vehicles() {
        storage
            .insert_vehicle(&NewVehicle {
                plate: v.plate,
                make: v.make,
                model: v.model,
                category: v.category,
                tank_capacity: v.tank_capacity,
                active: v.active,
            })
            .unwrap();
    }
    for d in demo_drivers() {
        storage
            .insert_driver(&NewDriver {
                first_name: d.first_name,
                last_name: d.last_name,
                national_id: d.national_id,
                license_class: d.license_class,
                active: d.active,
            })
            .unwrap();
    }
    for r in demo_records() {
        storage.append_fuel_load(&new_fuel_load(&r)).unwrap();
    }
    storage
}
