//! Read-only dataset commands: `search`, `show`, `suggest`, `states`.

use owo_colors::OwoColorize;
use serde_json::json;
use tabled::settings::Style;
use tabled::{Table, Tabled};

use super::{AppContext, CommandOutput, OutputOptions};
use crate::display::{
    format_group_heading, format_plate_detail, format_plate_line, plate_table,
};
use crate::error::{KennzeichenError, Result};
use crate::filter::{self, FilterState, SearchQuery};
use crate::geocache::GeoCache;
use crate::types::{FederalState, ViewMode};

pub struct SearchOptions<'a> {
    pub query: Option<&'a str>,
    pub state: Option<&'a str>,
    pub seen_only: bool,
    pub exact: bool,
    pub view: Option<ViewMode>,
}

/// Filter, sort and group the dataset.
pub fn cmd_search(options: SearchOptions<'_>, output: OutputOptions) -> Result<()> {
    let ctx = AppContext::load()?;
    let dataset = ctx.dataset();
    let seen = ctx.seen();
    let prefs = ctx.preferences();

    let view_mode = match options.view {
        Some(view) => {
            prefs.set_view_mode(view)?;
            view
        }
        None => prefs.view_mode(),
    };

    let query = options.query.unwrap_or("");
    let search = if options.exact {
        SearchQuery::exact(query)
    } else {
        SearchQuery::parse_marked(query)
    };

    // Abbreviations resolve to the full name; anything else is matched as typed
    let state_filter = options
        .state
        .map(|s| match FederalState::resolve(s) {
            Some(state) => state.name().to_string(),
            None => s.trim().to_string(),
        })
        .unwrap_or_default();

    let filter = FilterState {
        search,
        state_filter,
        seen_filter: options.seen_only,
        view_mode,
    };
    let seen_codes = seen.list_seen_codes();
    let result = filter::apply(&dataset, &filter, &seen_codes);

    let json_output = json!({
        "query": filter.search.to_string(),
        "state": filter.state_filter,
        "seen_only": filter.seen_filter,
        "view_mode": view_mode.as_str(),
        "count": result.plates.len(),
        "groups": result.groups,
    });

    let mut text = String::new();
    if result.plates.is_empty() {
        text.push_str(&"No matching license plates.".dimmed().to_string());
    } else {
        match view_mode {
            ViewMode::Grouped => {
                for group in &result.groups {
                    text.push_str(&format_group_heading(group));
                    text.push('\n');
                    for plate in &group.plates {
                        text.push_str(&format_plate_line(plate, seen_codes.contains(&plate.code)));
                        text.push('\n');
                    }
                    text.push('\n');
                }
            }
            ViewMode::Alphabetical => {
                text.push_str(&plate_table(&result.plates, &seen_codes));
                text.push_str("\n\n");
            }
        }
        text.push_str(&format!("{} result(s)", result.plates.len()));
    }

    CommandOutput::new(json_output).with_text(text).print(output)
}

/// Details for one code, including when it was seen and where it is.
pub fn cmd_show(code: &str, output: OutputOptions) -> Result<()> {
    let ctx = AppContext::load()?;
    let dataset = ctx.dataset();
    let record = dataset
        .find(code.trim())
        .ok_or_else(|| KennzeichenError::CodeNotFound(code.trim().to_string()))?;
    let seen_at = ctx.seen().seen_at(&record.code);

    let geocache = match GeoCache::load(&ctx.config.geocache_path()) {
        Ok(cache) => cache,
        Err(e) => {
            eprintln!("Warning: {e}");
            GeoCache::default()
        }
    };
    let location = geocache.locate(record);

    let json_output = json!({
        "plate": record,
        "seen": seen_at.is_some(),
        "seen_at": seen_at.map(|ts| ts.to_string()),
        "location": location,
    });

    CommandOutput::new(json_output)
        .with_text(format_plate_detail(record, seen_at, location))
        .print(output)
}

/// Code-prefix completions for partial input.
pub fn cmd_suggest(input: &str, limit: usize, output: OutputOptions) -> Result<()> {
    let ctx = AppContext::load()?;
    let dataset = ctx.dataset();
    let suggestions = dataset.suggestions(input, limit);

    let json_output = json!({
        "input": input,
        "suggestions": suggestions,
    });
    let text = suggestions
        .iter()
        .map(|r| format_plate_line(r, false))
        .collect::<Vec<_>>()
        .join("\n");

    CommandOutput::new(json_output).with_text(text).print(output)
}

#[derive(Tabled)]
struct StateRow {
    #[tabled(rename = "State")]
    name: String,
    #[tabled(rename = "Abbr")]
    abbreviation: String,
    #[tabled(rename = "Codes")]
    codes: usize,
    #[tabled(rename = "Seen")]
    seen: usize,
}

/// The sixteen federal states with code and seen counts.
pub fn cmd_states(output: OutputOptions) -> Result<()> {
    let ctx = AppContext::load()?;
    let dataset = ctx.dataset();
    let seen_codes = ctx.seen().list_seen_codes();

    let rows: Vec<StateRow> = dataset
        .state_counts()
        .into_iter()
        .map(|(state, codes)| {
            let seen = dataset
                .records()
                .iter()
                .filter(|r| r.federal_state == state.name() && seen_codes.contains(&r.code))
                .count();
            StateRow {
                name: state.name().to_string(),
                abbreviation: state.abbreviation().to_string(),
                codes,
                seen,
            }
        })
        .collect();

    let json_output = json!(
        rows.iter()
            .map(|r| json!({
                "name": r.name,
                "abbreviation": r.abbreviation,
                "codes": r.codes,
                "seen": r.seen,
            }))
            .collect::<Vec<_>>()
    );

    let mut table = Table::new(rows);
    table.with(Style::rounded());
    CommandOutput::new(json_output)
        .with_text(table.to_string())
        .print(output)
}
