//! Free-text search over joined record fields.

use std::collections::HashMap;

use crate::model::{Driver, FuelLoadRecord, Vehicle};

/// Whether a record matches an already lowercased needle.
///
/// Checked fields: vehicle plate, vehicle make, driver first name, driver
/// last name and station. An unresolved vehicle or driver simply contributes
/// no fields.
#[must_use]
pub fn record_matches(
    record: &FuelLoadRecord,
    needle: &str,
    vehicle: Option<&Vehicle>,
    driver: Option<&Driver>,
) -> bool {
    let contains = |field: &str| field.to_lowercase().contains(needle);

    vehicle.is_some_and(|v| contains(&v.plate) || contains(&v.make))
        || driver.is_some_and(|d| contains(&d.first_name) || contains(&d.last_name))
        || contains(&record.station)
}

/// Keep the records matching `query`, preserving order.
///
/// Matching is a lowercase substring test; an empty query keeps everything.
#[must_use]
pub fn search_records<'a, I>(
    records: I,
    query: &str,
    vehicles: &[Vehicle],
    drivers: &[Driver],
) -> Vec<&'a FuelLoadRecord>
where
    I: IntoIterator<Item = &'a FuelLoadRecord>,
{
    if query.is_empty() {
        return records.into_iter().collect();
    }

    let needle = query.to_lowercase();
    let vehicles: HashMap<i64, &Vehicle> = vehicles.iter().map(|v| (v.id, v)).collect();
    let drivers: HashMap<i64, &Driver> = drivers.iter().map(|d| (d.id, d)).collect();

    records
        .into_iter()
        .filter(|record| {
            record_matches(
                record,
                &needle,
                vehicles.get(&record.vehicle_id).copied(),
                drivers.get(&record.driver_id).copied(),
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{demo_drivers, demo_records, demo_vehicles};

    fn search(query: &str) -> Vec<i64> {
        let records = demo_records();
        search_records(&records, query, &demo_vehicles(), &demo_drivers())
            .iter()
            .map(|r| r.id)
            .collect()
    }

    #[test]
    fn test_empty_query_matches_all() {
        assert_eq!(search(""), vec![1, 2, 3]);
    }

    #[test]
    fn test_search_by_plate() {
        assert_eq!(search("mov-002"), vec![2]);
        assert_eq!(search("MOV"), vec![1, 2, 3]);
    }

    #[test]
    fn test_search_by_make() {
        assert_eq!(search("toyota"), vec![3]);
    }

    #[test]
    fn test_search_by_driver_names() {
        assert_eq!(search("maría"), vec![2]);
        assert_eq!(search("LÓPEZ"), vec![3]);
    }

    #[test]
    fn test_search_by_station() {
        assert_eq!(search("shell"), vec![1]);
        assert_eq!(search("copetrol"), vec![3]);
    }

    #[test]
    fn test_search_without_match() {
        assert!(search("nonexistent").is_empty());
    }

    #[test]
    fn test_search_result_is_subsequence() {
        let records = demo_records();
        for query in ["", "o", "r", "mov", "centro", "zzz"] {
            let found = search_records(&records, query, &demo_vehicles(), &demo_drivers());
            let mut cursor = records.iter();
            for hit in found {
                assert!(
                    cursor.any(|r| std::ptr::eq(r, hit)),
                    "result for {query:?} is not a subsequence"
                );
            }
        }
    }

    #[test]
    fn test_unresolved_references_only_match_station() {
        let records = demo_records();
        let found = search_records(&records, "juan", &[], &[]);
        assert!(found.is_empty());
        let found = search_records(&records, "petrobras", &[], &[]);
        assert_eq!(found.len(), 1);
    }

    #[test]
    fn test_record_matches_expects_lowercase_needle() {
        let records = demo_records();
        let vehicles = demo_vehicles();
        assert!(record_matches(&records[0], "mercedes", Some(&vehicles[0]), None));
        assert!(!record_matches(&records[0], "MERCEDES", Some(&vehicles[0]), None));
    }
}
