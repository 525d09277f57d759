//! Dashboard and history reports.
//!
//! Reports are built from a [`Ledger`] snapshot for one actor, so every
//! figure in them respects visibility. Building and rendering are separate:
//! the built reports serialize to JSON as-is, and the `render_*` functions
//! produce the plain-text forms.

use std::fmt::Write as _;

use serde::Serialize;

use crate::filter::visible_records;
use crate::ledger::{HistoryRow, Ledger};
use crate::metrics::{
    aggregate_metrics, category_distribution, monthly_series, summarize, DashboardMetrics,
    LedgerSummary, MonthlyTotals,
};
use crate::model::{Actor, VehicleCategory};

/// Group the integer part with `.` and use `,` as the decimal separator.
///
/// ```
/// use fuelledger::report::group_thousands;
///
/// assert_eq!(group_thousands(24_500.0, 0), "24.500");
/// assert_eq!(group_thousands(1_234.5, 2), "1.234,50");
/// ```
#[must_use]
pub fn group_thousands(value: f64, decimals: usize) -> String {
    let formatted = format!("{:.*}", decimals, value.abs());
    let (int_part, frac_part) = match formatted.split_once('.') {
        Some((int_part, frac_part)) => (int_part, Some(frac_part)),
        None => (formatted.as_str(), None),
    };

    let mut out = String::with_capacity(formatted.len() + int_part.len() / 3 + 1);
    let is_zero = formatted.chars().all(|c| c == '0' || c == '.');
    if value.is_sign_negative() && !is_zero {
        out.push('-');
    }
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            out.push('.');
        }
        out.push(ch);
    }
    if let Some(frac_part) = frac_part {
        out.push(',');
        out.push_str(frac_part);
    }
    out
}

/// Money rounded to whole units, e.g. `₲ 8.200`.
#[must_use]
pub fn format_money(amount: f64, currency_symbol: &str) -> String {
    format!("{currency_symbol} {}", group_thousands(amount.round(), 0))
}

/// Liters with decimals only when needed, e.g. `410 L` or `120,50 L`.
#[must_use]
pub fn format_liters(liters: f64) -> String {
    let decimals = if liters.fract() == 0.0 { 0 } else { 2 };
    format!("{} L", group_thousands(liters, decimals))
}

/// Vehicles in one category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CategoryCount {
    /// The category.
    pub category: VehicleCategory,
    /// Number of vehicles.
    pub vehicles: usize,
}

/// Everything the dashboard shows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardReport {
    /// Aggregates over the visible records.
    pub metrics: DashboardMetrics,
    /// Most recent visible loads, newest first.
    pub recent: Vec<HistoryRow>,
    /// Visible loads per month, oldest first.
    pub monthly: Vec<MonthlyTotals>,
    /// Fleet composition.
    pub categories: Vec<CategoryCount>,
}

/// Build the dashboard for `actor`.
#[must_use]
pub fn build_dashboard(ledger: &Ledger, actor: &Actor, recent_limit: usize) -> DashboardReport {
    let visible = visible_records(ledger.records(), actor, ledger.drivers());

    DashboardReport {
        metrics: aggregate_metrics(visible.iter().copied(), ledger.vehicles()),
        recent: visible
            .iter()
            .rev()
            .take(recent_limit)
            .map(|record| ledger.entry(record).to_row())
            .collect(),
        monthly: monthly_series(visible.iter().copied()),
        categories: category_distribution(ledger.vehicles())
            .into_iter()
            .map(|(category, vehicles)| CategoryCount { category, vehicles })
            .collect(),
    }
}

/// A searched history listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryReport {
    /// The search query; empty for none.
    pub query: String,
    /// Totals over every matching record, not only the rows shown.
    pub summary: LedgerSummary,
    /// Matching rows, newest first, truncated to the limit.
    pub rows: Vec<HistoryRow>,
}

/// Build the history listing for `actor`.
#[must_use]
pub fn build_history(ledger: &Ledger, actor: &Actor, query: &str, limit: usize) -> HistoryReport {
    let found = ledger.history(actor, query);

    HistoryReport {
        query: query.to_string(),
        summary: summarize(found.iter().copied()),
        rows: found
            .iter()
            .rev()
            .take(limit)
            .map(|record| ledger.entry(record).to_row())
            .collect(),
    }
}

fn or_dash(value: Option<&str>) -> &str {
    value.filter(|v| !v.is_empty()).unwrap_or("-")
}

fn summary_line(summary: &LedgerSummary, currency_symbol: &str) -> String {
    format!(
        "{} loads, {}, {}",
        summary.records,
        format_liters(summary.total_liters),
        format_money(summary.total_spend, currency_symbol)
    )
}

/// Render the dashboard as plain text.
#[must_use]
pub fn render_dashboard(report: &DashboardReport, actor: &Actor, currency_symbol: &str) -> String {
    let m = &report.metrics;
    let mut out = String::new();

    let _ = writeln!(out, "Dashboard for {} ({})", actor.display_name, actor.role);
    let _ = writeln!(out, "  Total liters:      {}", format_liters(m.total_liters));
    let _ = writeln!(out, "  Fuel loads:        {}", m.total_loads);
    let _ = writeln!(out, "  Active vehicles:   {}", m.active_vehicle_count);
    let _ = writeln!(
        out,
        "  Total spend:       {}",
        format_money(m.total_spend, currency_symbol)
    );
    let _ = writeln!(
        out,
        "  Total distance:    {} km",
        group_thousands(m.total_distance, 0)
    );
    let _ = writeln!(
        out,
        "  Avg consumption:   {:.2} L/100km",
        m.average_consumption_rate
    );
    let _ = writeln!(out, "  Avg efficiency:    {:.2} km/L", m.average_efficiency);

    out.push_str("\nRecent activity\n");
    if report.recent.is_empty() {
        out.push_str("  (no fuel loads)\n");
    }
    for row in &report.recent {
        let _ = writeln!(
            out,
            "  {} {}  {}  {}  {}  {}  {}",
            row.date,
            row.time,
            or_dash(row.plate.as_deref()),
            or_dash(row.driver.as_deref()),
            row.station,
            format_liters(row.liters),
            format_money(row.price, currency_symbol)
        );
    }

    if !report.monthly.is_empty() {
        out.push_str("\nMonthly consumption\n");
        for month in &report.monthly {
            let _ = writeln!(
                out,
                "  {}  {} loads  {}  {}",
                month.month,
                month.loads,
                format_liters(month.liters),
                format_money(month.spend, currency_symbol)
            );
        }
    }

    if !report.categories.is_empty() {
        out.push_str("\nFleet by category\n");
        for entry in &report.categories {
            let _ = writeln!(out, "  {:<16} {}", entry.category.as_str(), entry.vehicles);
        }
    }

    out
}

/// Render history rows one per line.
#[must_use]
pub fn render_history_plain(report: &HistoryReport, currency_symbol: &str) -> String {
    let mut out = String::new();
    for row in &report.rows {
        let _ = writeln!(
            out,
            "#{} {} {} {} {} | {} | {} -> {} ({} km, {} L/100km) | {} ({}/L) | {}",
            row.id,
            row.date,
            row.time,
            or_dash(row.plate.as_deref()),
            or_dash(row.driver.as_deref()),
            format_liters(row.liters),
            group_thousands(row.odometer_start, 0),
            group_thousands(row.odometer_end, 0),
            group_thousands(row.distance, 0),
            row.consumption_rate,
            format_money(row.price, currency_symbol),
            format_money(row.price_per_liter, currency_symbol),
            row.station
        );
        if let Some(notes) = &row.notes {
            let _ = writeln!(out, "    {notes}");
        }
    }
    let _ = writeln!(out, "{}", summary_line(&report.summary, currency_symbol));
    out
}

/// Render history rows as an aligned table.
#[must_use]
pub fn render_history_table(report: &HistoryReport, currency_symbol: &str) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:>4}  {:<10}  {:<5}  {:<8}  {:<18}  {:>9}  {:>7}  {:>7}  {:>12}  {}",
        "ID", "DATE", "TIME", "PLATE", "DRIVER", "LITERS", "KM", "L/100", "PRICE", "STATION"
    );
    for row in &report.rows {
        let _ = writeln!(
            out,
            "{:>4}  {:<10}  {:<5}  {:<8}  {:<18}  {:>9}  {:>7}  {:>7}  {:>12}  {}",
            row.id,
            row.date,
            row.time,
            or_dash(row.plate.as_deref()),
            or_dash(row.driver.as_deref()),
            format_liters(row.liters),
            group_thousands(row.distance, 0),
            row.consumption_rate.to_string(),
            format_money(row.price, currency_symbol),
            row.station
        );
    }
    let _ = writeln!(out, "\n{}", summary_line(&report.summary, currency_symbol));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{admin, demo_drivers, demo_records, demo_vehicles, driver_actor};

    fn demo_ledger() -> Ledger {
        Ledger::new(demo_records(), demo_vehicles(), demo_drivers())
    }

    #[test]
    fn test_group_thousands() {
        assert_eq!(group_thousands(0.0, 0), "0");
        assert_eq!(group_thousands(999.0, 0), "999");
        assert_eq!(group_thousands(1_000.0, 0), "1.000");
        assert_eq!(group_thousands(24_500.0, 0), "24.500");
        assert_eq!(group_thousands(1_234_567.0, 0), "1.234.567");
        assert_eq!(group_thousands(1_234.5, 2), "1.234,50");
        assert_eq!(group_thousands(-45_000.0, 0), "-45.000");
        assert_eq!(group_thousands(-0.001, 0), "0");
    }

    #[test]
    fn test_format_money_rounds_to_whole_units() {
        assert_eq!(format_money(8_200.0, "₲"), "₲ 8.200");
        assert_eq!(format_money(41.6, "₲"), "₲ 42");
        assert_eq!(format_money(3_500_000.0, "Gs."), "Gs. 3.500.000");
    }

    #[test]
    fn test_format_liters() {
        assert_eq!(format_liters(410.0), "410 L");
        assert_eq!(format_liters(120.5), "120,50 L");
    }

    #[test]
    fn test_build_dashboard_for_admin() {
        let report = build_dashboard(&demo_ledger(), &admin(), 2);

        assert_eq!(report.metrics.total_loads, 3);
        let recent: Vec<i64> = report.recent.iter().map(|r| r.id).collect();
        assert_eq!(recent, vec![3, 2]);
        assert_eq!(report.monthly.len(), 1);
        assert_eq!(report.monthly[0].month, "2024-01");
        assert_eq!(
            report.categories,
            vec![
                CategoryCount {
                    category: VehicleCategory::Truck,
                    vehicles: 2
                },
                CategoryCount {
                    category: VehicleCategory::HeavyEquipment,
                    vehicles: 1
                },
            ]
        );
    }

    #[test]
    fn test_build_dashboard_for_driver() {
        let carlos = driver_actor("Carlos López", Some(3));
        let report = build_dashboard(&demo_ledger(), &carlos, 3);
        assert_eq!(report.metrics.total_loads, 1);
        assert_eq!(report.metrics.total_liters, 60.0);
        assert_eq!(report.recent.len(), 1);
        assert_eq!(report.recent[0].plate.as_deref(), Some("MOV-003"));

        // Fleet composition is not scoped to the driver.
        assert_eq!(report.metrics.active_vehicle_count, 3);
        let fleet: usize = report.categories.iter().map(|c| c.vehicles).sum();
        assert_eq!(fleet, 3);
    }

    #[test]
    fn test_build_dashboard_unresolved_driver() {
        let ghost = driver_actor("Nadie", None);
        let report = build_dashboard(&demo_ledger(), &ghost, 3);
        assert_eq!(report.metrics.total_loads, 0);
        assert_eq!(report.metrics.average_consumption_rate, 0.0);
        assert!(report.recent.is_empty());
        assert!(report.monthly.is_empty());
    }

    #[test]
    fn test_build_history_limit_keeps_full_summary() {
        let report = build_history(&demo_ledger(), &admin(), "mov", 1);
        assert_eq!(report.rows.len(), 1);
        assert_eq!(report.rows[0].id, 3);
        assert_eq!(report.summary.records, 3);
        assert_eq!(report.summary.total_liters, 410.0);
    }

    #[test]
    fn test_render_dashboard() {
        let ledger = demo_ledger();
        let report = build_dashboard(&ledger, &admin(), 3);
        let text = render_dashboard(&report, &admin(), "₲");

        assert!(text.contains("Total liters:      410 L"));
        assert!(text.contains("Total spend:       ₲ 24.500"));
        assert!(text.contains("Total distance:    1.150 km"));
        assert!(text.contains("COPETROL Norte"));
        assert!(text.contains("heavy_equipment"));
    }

    #[test]
    fn test_render_empty_dashboard() {
        let ledger = Ledger::default();
        let report = build_dashboard(&ledger, &admin(), 3);
        let text = render_dashboard(&report, &admin(), "₲");
        assert!(text.contains("(no fuel loads)"));
        assert!(text.contains("Avg consumption:   0.00 L/100km"));
    }

    #[test]
    fn test_render_history_plain() {
        let report = build_history(&demo_ledger(), &admin(), "shell", 10);
        let text = render_history_plain(&report, "₲");
        assert!(text.contains("#1 2024-01-15 08:30 MOV-001 Juan Pérez"));
        assert!(text.contains("45.000 -> 45.500 (500 km, 40.00 L/100km)"));
        assert!(text.contains("₲ 8.200 (₲ 41/L)"));
        assert!(text.ends_with("1 loads, 200 L, ₲ 8.200\n"));
    }

    #[test]
    fn test_render_history_table() {
        let report = build_history(&demo_ledger(), &admin(), "", 10);
        let text = render_history_table(&report, "₲");
        let lines: Vec<&str> = text.lines().collect();
        assert!(lines[0].starts_with("  ID  DATE"));
        assert!(lines[1].contains("COPETROL Norte"));
        assert!(text.contains("3 loads, 410 L, ₲ 24.500"));
    }

    #[test]
    fn test_history_report_serializes() {
        let report = build_history(&demo_ledger(), &admin(), "", 10);
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["summary"]["records"], 3);
        assert_eq!(json["rows"][0]["plate"], "MOV-003");
        assert_eq!(json["rows"][2]["consumption_rate"], 40.0);
    }
}
