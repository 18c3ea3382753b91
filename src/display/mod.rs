//! Terminal formatting for plates, groups and sync state.

use std::collections::BTreeSet;

use jiff::Timestamp;
use owo_colors::OwoColorize;
use tabled::settings::Style;
use tabled::{Table, Tabled};

use crate::filter::PlateGroup;
use crate::geocache::GeocodedCity;
use crate::sync::SyncStatus;
use crate::types::{FederalState, PlateRecord};

const SEEN_MARK: &str = "✓";

#[derive(Tabled)]
struct PlateRow {
    #[tabled(rename = "Code")]
    code: String,
    #[tabled(rename = "District")]
    city_district: String,
    #[tabled(rename = "Derived from")]
    derived_from: String,
    #[tabled(rename = "State")]
    federal_state: String,
    #[tabled(rename = "Seen")]
    seen: String,
}

pub fn format_code(code: &str) -> String {
    format!("{code:<4}").cyan().bold().to_string()
}

pub fn format_timestamp(ts: Timestamp) -> String {
    ts.strftime("%Y-%m-%d %H:%M").to_string()
}

pub fn format_status_colored(status: SyncStatus) -> String {
    let badge = format!("[{status}]");
    match status {
        SyncStatus::Offline => badge.dimmed().to_string(),
        SyncStatus::Syncing => badge.yellow().to_string(),
        SyncStatus::Synced => badge.green().to_string(),
        SyncStatus::Error => badge.red().to_string(),
    }
}

/// `BN   Bonn (Nordrhein-Westfalen) ✓`
pub fn format_plate_line(record: &PlateRecord, seen: bool) -> String {
    let mark = if seen {
        format!(" {}", SEEN_MARK.green())
    } else {
        String::new()
    };
    format!(
        "{} {} {}{}",
        format_code(&record.code),
        record.city_district,
        format!("({})", record.federal_state).dimmed(),
        mark
    )
}

pub fn format_group_heading(group: &PlateGroup<'_>) -> String {
    format!("## {} ({})", group.key, group.plates.len())
        .bold()
        .to_string()
}

/// Bordered table, used when the list is not grouped.
pub fn plate_table(records: &[&PlateRecord], seen: &BTreeSet<String>) -> String {
    let rows: Vec<PlateRow> = records
        .iter()
        .map(|r| PlateRow {
            code: r.code.clone(),
            city_district: r.city_district.clone(),
            derived_from: r.derived_from.clone(),
            federal_state: r.federal_state.clone(),
            seen: if seen.contains(&r.code) {
                SEEN_MARK.to_string()
            } else {
                String::new()
            },
        })
        .collect();
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    table.to_string()
}

/// Multi-line detail view for `show`.
pub fn format_plate_detail(
    record: &PlateRecord,
    seen_at: Option<Timestamp>,
    location: Option<&GeocodedCity>,
) -> String {
    let state = match FederalState::from_name(&record.federal_state) {
        Some(state) => format!("{} ({})", state.name(), state.abbreviation()),
        None => record.federal_state.clone(),
    };
    let seen = match seen_at {
        Some(ts) => format_timestamp(ts).green().to_string(),
        None => "no".dimmed().to_string(),
    };

    let mut out = format!("{}  {}\n", record.code.cyan().bold(), record.city_district);
    out.push_str(&format!("  {}  {}\n", "derived from:".dimmed(), record.derived_from));
    out.push_str(&format!("  {}         {}\n", "state:".dimmed(), state));
    out.push_str(&format!("  {}          {}", "seen:".dimmed(), seen));
    if let Some(city) = location {
        out.push_str(&format!(
            "\n  {}      {:.4}, {:.4}",
            "location:".dimmed(),
            city.lat,
            city.lng
        ));
    }
    out
}
