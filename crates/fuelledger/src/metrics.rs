//! Derived fuel statistics.
//!
//! Every function here is pure and total: division guards resolve to zero
//! instead of failing, so a dashboard can always be rendered no matter what
//! the ledger contains.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::model::{FuelLoadRecord, Vehicle, VehicleCategory};

/// Fleet-wide aggregate statistics.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct DashboardMetrics {
    /// Sum of liters over all records.
    pub total_liters: f64,
    /// Number of records.
    pub total_loads: usize,
    /// Number of vehicles flagged active.
    pub active_vehicle_count: usize,
    /// Sum of prices over all records.
    pub total_spend: f64,
    /// Sum of per-record distances, not clamped.
    pub total_distance: f64,
    /// Liters per 100 distance units, or 0 when there is no positive distance.
    pub average_consumption_rate: f64,
    /// Distance units per liter, or 0 when no liters were loaded.
    pub average_efficiency: f64,
}

/// Compute the dashboard aggregates.
///
/// A record whose ending odometer is below its starting one subtracts from
/// `total_distance`; it is counted as-is rather than clamped.
#[must_use]
pub fn aggregate_metrics<'a, I>(records: I, vehicles: &[Vehicle]) -> DashboardMetrics
where
    I: IntoIterator<Item = &'a FuelLoadRecord>,
{
    let mut metrics = DashboardMetrics {
        active_vehicle_count: vehicles.iter().filter(|v| v.active).count(),
        ..DashboardMetrics::default()
    };

    for record in records {
        metrics.total_liters += record.liters;
        metrics.total_loads += 1;
        metrics.total_spend += record.price;
        metrics.total_distance += record.distance();
    }

    metrics.average_consumption_rate = if metrics.total_distance > 0.0 {
        metrics.total_liters / metrics.total_distance * 100.0
    } else {
        0.0
    };
    metrics.average_efficiency = if metrics.total_liters > 0.0 {
        metrics.total_distance / metrics.total_liters
    } else {
        0.0
    };

    metrics
}

/// Liters per 100 distance units, rounded to two decimals.
///
/// Displays with exactly two decimals, so a zero rate prints as `0.00`.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize)]
#[serde(transparent)]
pub struct ConsumptionRate(f64);

impl ConsumptionRate {
    /// The zero rate used whenever the distance is not positive.
    pub const ZERO: Self = Self(0.0);

    /// Build a rate from liters and distance, guarding non-positive distance.
    #[must_use]
    pub fn from_liters_and_distance(liters: f64, distance: f64) -> Self {
        if distance > 0.0 {
            Self(round2(liters / distance * 100.0))
        } else {
            Self::ZERO
        }
    }

    /// The rounded numeric value.
    #[must_use]
    pub fn value(self) -> f64 {
        self.0
    }
}

impl fmt::Display for ConsumptionRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

/// Consumption rate of a single record.
#[must_use]
pub fn record_consumption_rate(record: &FuelLoadRecord) -> ConsumptionRate {
    ConsumptionRate::from_liters_and_distance(record.liters, record.distance())
}

/// Price paid per liter.
///
/// Returns 0 when the record has no positive liters, matching the other
/// division guards.
#[must_use]
pub fn price_per_liter(record: &FuelLoadRecord) -> f64 {
    if record.liters > 0.0 {
        record.price / record.liters
    } else {
        0.0
    }
}

/// Totals shown under the history listing.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct LedgerSummary {
    /// Number of records.
    pub records: usize,
    /// Sum of liters.
    pub total_liters: f64,
    /// Sum of prices.
    pub total_spend: f64,
}

/// Summarize an already filtered record set.
#[must_use]
pub fn summarize<'a, I>(records: I) -> LedgerSummary
where
    I: IntoIterator<Item = &'a FuelLoadRecord>,
{
    records
        .into_iter()
        .fold(LedgerSummary::default(), |mut acc, record| {
            acc.records += 1;
            acc.total_liters += record.liters;
            acc.total_spend += record.price;
            acc
        })
}

/// Liters and spend for one calendar month.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyTotals {
    /// Month key, `YYYY-MM`.
    pub month: String,
    /// Number of loads in the month.
    pub loads: usize,
    /// Liters loaded in the month.
    pub liters: f64,
    /// Spend in the month.
    pub spend: f64,
}

/// Group records by calendar month, oldest month first.
#[must_use]
pub fn monthly_series<'a, I>(records: I) -> Vec<MonthlyTotals>
where
    I: IntoIterator<Item = &'a FuelLoadRecord>,
{
    let mut months: BTreeMap<String, MonthlyTotals> = BTreeMap::new();
    for record in records {
        let key = record.date.format("%Y-%m").to_string();
        let entry = months.entry(key.clone()).or_insert_with(|| MonthlyTotals {
            month: key,
            loads: 0,
            liters: 0.0,
            spend: 0.0,
        });
        entry.loads += 1;
        entry.liters += record.liters;
        entry.spend += record.price;
    }
    months.into_values().collect()
}

/// Count vehicles per category, skipping empty categories.
#[must_use]
pub fn category_distribution(vehicles: &[Vehicle]) -> Vec<(VehicleCategory, usize)> {
    VehicleCategory::ALL
        .iter()
        .map(|&category| {
            let count = vehicles.iter().filter(|v| v.category == category).count();
            (category, count)
        })
        .filter(|&(_, count)| count > 0)
        .collect()
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
