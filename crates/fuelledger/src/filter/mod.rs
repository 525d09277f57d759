//! Record filters applied before metrics and listings.
//!
//! - **Visibility**: administrators see the whole ledger, drivers only see
//!   loads assigned to them.
//!
//! - **Search**: case-insensitive substring match over the denormalized
//!   fields a user actually reads (plate, make, driver name, station).
//!
//! Both filters are stable: they only drop records, never reorder them, so
//! they can be chained in either order.
//!
//! # Example
//!
//! ```
//! use fuelledger::filter::{search_records, visible_records};
//! use fuelledger::model::{Actor, FuelLoadRecord, Role};
//!
//! let admin = Actor {
//!     id: 1,
//!     username: "admin".to_string(),
//!     role: Role::Administrator,
//!     display_name: "Administrador".to_string(),
//!     driver_id: None,
//! };
//!
//! let records: Vec<FuelLoadRecord> = Vec::new();
//! let visible = visible_records(&records, &admin, &[]);
//! let found = search_records(visible, "shell", &[], &[]);
//! assert!(found.is_empty());
//! ```

mod search;
mod visibility;

pub use search::{record_matches, search_records};
pub use visibility::{legacy_driver_match, resolve_driver_id, visible_records};
