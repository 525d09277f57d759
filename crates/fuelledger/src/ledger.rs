//! In-memory ledger snapshot.
//!
//! A [`Ledger`] holds the fuel-load records together with the vehicle and
//! driver directories they reference, so that filters and metrics can run
//! against one consistent view.

use serde::Serialize;

use crate::filter::{search_records, visible_records};
use crate::metrics::{
    aggregate_metrics, price_per_liter, record_consumption_rate, ConsumptionRate,
    DashboardMetrics,
};
use crate::model::{Actor, Driver, FuelLoadRecord, Vehicle};

/// A snapshot of the ledger and its reference collections.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Ledger {
    records: Vec<FuelLoadRecord>,
    vehicles: Vec<Vehicle>,
    drivers: Vec<Driver>,
}

impl Ledger {
    /// Build a snapshot from already loaded collections.
    ///
    /// Records are kept in the order given.
    #[must_use]
    pub fn new(records: Vec<FuelLoadRecord>, vehicles: Vec<Vehicle>, drivers: Vec<Driver>) -> Self {
        Self {
            records,
            vehicles,
            drivers,
        }
    }

    /// All records in ledger order.
    #[must_use]
    pub fn records(&self) -> &[FuelLoadRecord] {
        &self.records
    }

    /// The vehicle directory.
    #[must_use]
    pub fn vehicles(&self) -> &[Vehicle] {
        &self.vehicles
    }

    /// The driver directory.
    #[must_use]
    pub fn drivers(&self) -> &[Driver] {
        &self.drivers
    }

    /// Look up a vehicle by id.
    #[must_use]
    pub fn vehicle(&self, id: i64) -> Option<&Vehicle> {
        self.vehicles.iter().find(|v| v.id == id)
    }

    /// Look up a driver by id.
    #[must_use]
    pub fn driver(&self, id: i64) -> Option<&Driver> {
        self.drivers.iter().find(|d| d.id == id)
    }

    /// Join a record with its vehicle and driver.
    #[must_use]
    pub fn entry<'a>(&'a self, record: &'a FuelLoadRecord) -> LedgerEntry<'a> {
        LedgerEntry {
            record,
            vehicle: self.vehicle(record.vehicle_id),
            driver: self.driver(record.driver_id),
        }
    }

    /// Records visible to `actor`, narrowed by `query`.
    #[must_use]
    pub fn history(&self, actor: &Actor, query: &str) -> Vec<&FuelLoadRecord> {
        let visible = visible_records(&self.records, actor, &self.drivers);
        search_records(visible, query, &self.vehicles, &self.drivers)
    }

    /// Dashboard aggregates over the records visible to `actor`.
    #[must_use]
    pub fn dashboard(&self, actor: &Actor) -> DashboardMetrics {
        let visible = visible_records(&self.records, actor, &self.drivers);
        aggregate_metrics(visible, &self.vehicles)
    }
}

/// A record joined with the entities it references.
///
/// Unresolvable references are `None`; nothing here panics on dangling ids.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LedgerEntry<'a> {
    /// The record itself.
    pub record: &'a FuelLoadRecord,
    /// Referenced vehicle, if it exists.
    pub vehicle: Option<&'a Vehicle>,
    /// Referenced driver, if it exists.
    pub driver: Option<&'a Driver>,
}

impl LedgerEntry<'_> {
    /// Plate of the vehicle, or an empty string.
    #[must_use]
    pub fn plate(&self) -> &str {
        self.vehicle.map_or("", |v| v.plate.as_str())
    }

    /// Full name of the driver, or an empty string.
    #[must_use]
    pub fn driver_name(&self) -> String {
        self.driver.map(Driver::full_name).unwrap_or_default()
    }

    /// Consumption rate of the record.
    #[must_use]
    pub fn consumption_rate(&self) -> ConsumptionRate {
        record_consumption_rate(self.record)
    }

    /// Price per liter of the record.
    #[must_use]
    pub fn price_per_liter(&self) -> f64 {
        price_per_liter(self.record)
    }

    /// Flattened, serializable view of the entry.
    #[must_use]
    pub fn to_row(&self) -> HistoryRow {
        HistoryRow {
            id: self.record.id,
            date: self.record.date.format("%Y-%m-%d").to_string(),
            time: self.record.time.format("%H:%M").to_string(),
            plate: self.vehicle.map(|v| v.plate.clone()),
            vehicle: self.vehicle.map(|v| format!("{} {}", v.make, v.model)),
            category: self.vehicle.map(|v| v.category.to_string()),
            driver: self.driver.map(Driver::full_name),
            national_id: self.driver.map(|d| d.national_id.clone()),
            liters: self.record.liters,
            odometer_start: self.record.odometer_start,
            odometer_end: self.record.odometer_end,
            distance: self.record.distance(),
            consumption_rate: self.consumption_rate(),
            price: self.record.price,
            price_per_liter: self.price_per_liter(),
            station: self.record.station.clone(),
            notes: self.record.notes.clone(),
        }
    }
}

/// One history line as shown to users.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryRow {
    /// Record id.
    pub id: i64,
    /// `YYYY-MM-DD`.
    pub date: String,
    /// `HH:MM`.
    pub time: String,
    /// Vehicle plate, absent when the vehicle is unknown.
    pub plate: Option<String>,
    /// Make and model.
    pub vehicle: Option<String>,
    /// Vehicle category.
    pub category: Option<String>,
    /// Driver full name.
    pub driver: Option<String>,
    /// Driver national id.
    pub national_id: Option<String>,
    /// Liters loaded.
    pub liters: f64,
    /// Starting odometer.
    pub odometer_start: f64,
    /// Ending odometer.
    pub odometer_end: f64,
    /// Odometer delta.
    pub distance: f64,
    /// Liters per 100 distance units.
    pub consumption_rate: ConsumptionRate,
    /// Total price.
    pub price: f64,
    /// Price per liter.
    pub price_per_liter: f64,
    /// Station name.
    pub station: String,
    /// Free-text notes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{admin, demo_drivers, demo_records, demo_vehicles, driver_actor, record};

    fn demo_ledger() -> Ledger {
        Ledger::new(demo_records(), demo_vehicles(), demo_drivers())
    }

    #[test]
    fn test_lookups() {
        let ledger = demo_ledger();
        assert_eq!(ledger.vehicle(2).map(|v| v.plate.as_str()), Some("MOV-002"));
        assert_eq!(ledger.driver(3).map(|d| d.first_name.as_str()), Some("Carlos"));
        assert!(ledger.vehicle(99).is_none());
    }

    #[test]
    fn test_entry_resolves_references() {
        let ledger = demo_ledger();
        let entry = ledger.entry(&ledger.records()[0]);
        assert_eq!(entry.plate(), "MOV-001");
        assert_eq!(entry.driver_name(), "Juan Pérez");
        assert_eq!(entry.consumption_rate().to_string(), "40.00");
        assert_eq!(entry.price_per_liter(), 41.0);
    }

    #[test]
    fn test_entry_with_dangling_references() {
        let ledger = Ledger::new(
            vec![record(9, 42, 43, 10.0, 0.0, 100.0, 100.0)],
            demo_vehicles(),
            demo_drivers(),
        );
        let entry = ledger.entry(&ledger.records()[0]);
        assert!(entry.vehicle.is_none());
        assert!(entry.driver.is_none());
        assert_eq!(entry.plate(), "");
        assert_eq!(entry.driver_name(), "");

        let row = entry.to_row();
        assert!(row.plate.is_none());
        assert!(row.driver.is_none());
    }

    #[test]
    fn test_history_combines_visibility_and_search() {
        let ledger = demo_ledger();
        assert_eq!(ledger.history(&admin(), "").len(), 3);
        assert_eq!(ledger.history(&admin(), "centro").len(), 1);

        let juan = driver_actor("Juan Pérez", None);
        assert_eq!(ledger.history(&juan, "").len(), 1);
        assert!(ledger.history(&juan, "centro").is_empty());
    }

    #[test]
    fn test_dashboard_respects_visibility() {
        let ledger = demo_ledger();
        let all = ledger.dashboard(&admin());
        assert_eq!(all.total_loads, 3);

        let maria = driver_actor("María González", Some(2));
        let own = ledger.dashboard(&maria);
        assert_eq!(own.total_loads, 1);
        assert_eq!(own.total_liters, 150.0);
        assert_eq!(own.active_vehicle_count, 3);
    }

    #[test]
    fn test_row_formatting() {
        let ledger = demo_ledger();
        let row = ledger.entry(&ledger.records()[1]).to_row();
        assert_eq!(row.date, "2024-01-15");
        assert_eq!(row.time, "14:15");
        assert_eq!(row.vehicle.as_deref(), Some("Caterpillar 320D"));
        assert_eq!(row.category.as_deref(), Some("heavy_equipment"));
        assert_eq!(row.distance, 300.0);
        assert_eq!(row.price_per_liter, 50.0);
    }
}
