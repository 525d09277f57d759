//! `fuelledger` - A fuel-load ledger for a vehicle fleet
//!
//! This library records fuel loads against vehicles and drivers, computes
//! consumption and spend metrics, and scopes every view to what the
//! logged-in account may see: administrators see the whole fleet, drivers
//! see their own loads.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod auth;
pub mod cli;
pub mod config;
pub mod error;
pub mod filter;
pub mod ledger;
pub mod logging;
pub mod metrics;
pub mod model;
pub mod report;
pub mod seed;
pub mod session;
pub mod storage;
pub mod submission;

#[cfg(test)]
pub(crate) mod fixtures;

pub use config::Config;
pub use error::{Error, Result};
pub use ledger::{HistoryRow, Ledger, LedgerEntry};
pub use logging::init_logging;
pub use metrics::{ConsumptionRate, DashboardMetrics, LedgerSummary};
pub use model::{Actor, Driver, FuelLoadRecord, Role, Vehicle, VehicleCategory};
pub use storage::{Storage, StorageStats};
