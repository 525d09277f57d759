//! Role-based ledger visibility.
//!
//! A driver actor is tied to a driver through `Actor::driver_id`. Accounts
//! created before that link existed carry no driver id; for those the driver
//! is matched by the first token of the display name against driver first
//! names, which is ambiguous when two drivers share a first name.

use tracing::{debug, warn};

use crate::model::{Actor, Driver, FuelLoadRecord, Role};

/// Find the driver whose first name equals the first token of `display_name`.
///
/// The comparison is exact. When several drivers share the first name the
/// first one in directory order wins and a warning is logged.
#[must_use]
pub fn legacy_driver_match<'d>(display_name: &str, drivers: &'d [Driver]) -> Option<&'d Driver> {
    let first_token = display_name.split_whitespace().next()?;
    let mut matches = drivers.iter().filter(|d| d.first_name == first_token);
    let found = matches.next()?;
    if matches.next().is_some() {
        warn!(
            name = first_token,
            driver_id = found.id,
            "Ambiguous driver name match, using first driver in directory"
        );
    }
    Some(found)
}

/// Resolve which driver's records an actor may see.
///
/// Returns `None` for administrators and for drivers that cannot be
/// resolved.
#[must_use]
pub fn resolve_driver_id(actor: &Actor, drivers: &[Driver]) -> Option<i64> {
    match actor.role {
        Role::Administrator => None,
        Role::Driver => actor.driver_id.or_else(|| {
            let found = legacy_driver_match(&actor.display_name, drivers).map(|d| d.id);
            debug!(
                username = %actor.username,
                driver_id = ?found,
                "Resolved driver by display name"
            );
            found
        }),
    }
}

/// Restrict records to those the actor may see, preserving order.
///
/// Administrators get every record. A driver whose driver cannot be resolved
/// gets an empty list.
#[must_use]
pub fn visible_records<'a, I>(records: I, actor: &Actor, drivers: &[Driver]) -> Vec<&'a FuelLoadRecord>
where
    I: IntoIterator<Item = &'a FuelLoadRecord>,
{
    if actor.is_admin() {
        return records.into_iter().collect();
    }

    let Some(driver_id) = resolve_driver_id(actor, drivers) else {
        debug!(username = %actor.username, "No driver resolved for actor, nothing visible");
        return Vec::new();
    };

    records
        .into_iter()
        .filter(|record| record.driver_id == driver_id)
        .collect()
}
