//! Filter pipeline: search text, state filter and seen filter over the dataset.
//!
//! Everything here is pure. Callers own a [`FilterState`] and recompute the
//! result whenever any input changes; no stage suspends or touches storage.

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;

use crate::collate;
use crate::dataset::Dataset;
use crate::types::{PlateRecord, ViewMode};

pub mod group;

pub use group::{PlateGroup, group_plates};

/// Marker used by the string form of an exact-match query.
pub const EXACT_MATCH_MARKER: &str = "==";

/// What the user is searching for.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SearchQuery {
    /// No search; every record passes.
    #[default]
    All,
    /// Free text: code prefix first, falling back to a content substring match.
    Term(String),
    /// A single code, matched case-insensitively in full.
    Exact(String),
}

impl SearchQuery {
    /// Build a query from typed input. Input is never interpreted as exact-match.
    pub fn term(input: &str) -> Self {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            SearchQuery::All
        } else {
            SearchQuery::Term(trimmed.to_string())
        }
    }

    pub fn exact(code: &str) -> Self {
        let trimmed = code.trim();
        if trimmed.is_empty() {
            SearchQuery::All
        } else {
            SearchQuery::Exact(trimmed.to_string())
        }
    }

    /// Parse the string form, honouring the `==` exact-match marker.
    pub fn parse_marked(input: &str) -> Self {
        match input.trim().strip_prefix(EXACT_MATCH_MARKER) {
            Some(code) => Self::exact(code),
            None => Self::term(input),
        }
    }

    pub fn is_active(&self) -> bool {
        !matches!(self, SearchQuery::All)
    }

    /// The searched text without any marker.
    pub fn text(&self) -> &str {
        match self {
            SearchQuery::All => "",
            SearchQuery::Term(text) | SearchQuery::Exact(text) => text,
        }
    }

    /// Whether `code` counts as a code match for ordering purposes.
    pub fn is_code_match(&self, code: &str) -> bool {
        match self {
            SearchQuery::All => false,
            SearchQuery::Term(term) => code.to_lowercase().starts_with(&term.to_lowercase()),
            SearchQuery::Exact(exact) => unicase::eq(code, exact.as_str()),
        }
    }
}

impl fmt::Display for SearchQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SearchQuery::All => Ok(()),
            SearchQuery::Term(term) => f.write_str(term),
            SearchQuery::Exact(code) => write!(f, "{EXACT_MATCH_MARKER}{code}"),
        }
    }
}

/// Session-scoped pipeline inputs.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FilterState {
    pub search: SearchQuery,
    /// Empty means no state filter.
    pub state_filter: String,
    pub seen_filter: bool,
    pub view_mode: ViewMode,
}

impl FilterState {
    pub fn new(view_mode: ViewMode) -> Self {
        Self {
            view_mode,
            ..Default::default()
        }
    }
}

/// Ordered, filtered records plus their grouping.
#[derive(Debug, Clone)]
pub struct FilterResult<'a> {
    pub plates: Vec<&'a PlateRecord>,
    pub groups: Vec<PlateGroup<'a>>,
}

/// Run the whole pipeline: filter, sort, group.
pub fn apply<'a>(
    dataset: &'a Dataset,
    filter: &FilterState,
    seen: &BTreeSet<String>,
) -> FilterResult<'a> {
    let plates = filter_plates(dataset.records(), filter, seen);
    let groups = group_plates(&plates, filter.view_mode, &filter.search);
    FilterResult { plates, groups }
}

/// Filter and sort records. Stages run in order: state, seen, search.
pub fn filter_plates<'a>(
    records: &'a [PlateRecord],
    filter: &FilterState,
    seen: &BTreeSet<String>,
) -> Vec<&'a PlateRecord> {
    let state_filter = filter.state_filter.trim();
    let mut filtered: Vec<&PlateRecord> = records
        .iter()
        .filter(|r| state_filter.is_empty() || r.federal_state == state_filter)
        .filter(|r| !filter.seen_filter || seen.contains(&r.code))
        .collect();

    match &filter.search {
        SearchQuery::All => {}
        SearchQuery::Exact(code) => {
            filtered.retain(|r| unicase::eq(r.code.as_str(), code.as_str()));
        }
        SearchQuery::Term(term) => {
            let term = term.to_lowercase();
            let code_matches: Vec<&PlateRecord> = filtered
                .iter()
                .copied()
                .filter(|r| r.code.to_lowercase().starts_with(&term))
                .collect();

            // A code prefix hit always wins over content matches
            if !code_matches.is_empty() {
                filtered = code_matches;
            } else {
                filtered.retain(|r| content_matches(r, &term));
            }
        }
    }

    filtered.sort_by(|a, b| compare_plates(a, b, &filter.search));
    filtered
}

fn content_matches(record: &PlateRecord, term_lower: &str) -> bool {
    record.city_district.to_lowercase().contains(term_lower)
        || record.derived_from.to_lowercase().contains(term_lower)
        || record.federal_state.to_lowercase().contains(term_lower)
}

/// Code matches first (shorter codes, then alphabetical), everything else alphabetical.
fn compare_plates(a: &PlateRecord, b: &PlateRecord, search: &SearchQuery) -> Ordering {
    if search.is_active() {
        match (search.is_code_match(&a.code), search.is_code_match(&b.code)) {
            (true, false) => return Ordering::Less,
            (false, true) => return Ordering::Greater,
            (true, true) => {
                return code_len(&a.code)
                    .cmp(&code_len(&b.code))
                    .then_with(|| collate::compare(&a.code, &b.code));
            }
            (false, false) => {}
        }
    }
    collate::compare(&a.code, &b.code)
}

pub(crate) fn code_len(code: &str) -> usize {
    code.chars().count()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn records() -> Vec<PlateRecord> {
        vec![
            PlateRecord::new("BO", "Bochum", "Bochum", "Nordrhein-Westfalen"),
            PlateRecord::new("BN", "Bonn", "Bonn", "Nordrhein-Westfalen"),
            PlateRecord::new("B", "Berlin", "Berlin", "Berlin"),
            PlateRecord::new("SU", "Rhein-Sieg-Kreis", "Siegburg", "Nordrhein-Westfalen"),
            PlateRecord::new("HH", "Hamburg", "Hansestadt Hamburg", "Hamburg"),
            PlateRecord::new("M", "München", "München", "Bayern"),
        ]
    }

    fn codes(plates: &[&PlateRecord]) -> Vec<String> {
        plates.iter().map(|p| p.code.clone()).collect()
    }

    fn search(term: &str) -> FilterState {
        FilterState {
            search: SearchQuery::term(term),
            ..Default::default()
        }
    }

    #[test]
    fn test_no_filters_sorts_alphabetically() {
        let records = records();
        let result = filter_plates(&records, &FilterState::default(), &BTreeSet::new());
        assert_eq!(codes(&result), vec!["B", "BN", "BO", "HH", "M", "SU"]);
    }

    #[test]
    fn test_code_prefix_orders_by_length_then_code() {
        let records = records();
        let result = filter_plates(&records, &search("B"), &BTreeSet::new());
        assert_eq!(codes(&result), vec!["B", "BN", "BO"]);
    }

    #[test]
    fn test_code_prefix_suppresses_content_matches() {
        let records = records();
        // "h" is a prefix of HH and appears in several city names
        let result = filter_plates(&records, &search("h"), &BTreeSet::new());
        assert_eq!(codes(&result), vec!["HH"]);
    }

    #[test]
    fn test_content_fallback_when_no_code_prefix() {
        let records = records();
        let result = filter_plates(&records, &search("bonn"), &BTreeSet::new());
        assert_eq!(codes(&result), vec!["BN"]);

        let result = filter_plates(&records, &search("siegburg"), &BTreeSet::new());
        assert_eq!(codes(&result), vec!["SU"]);

        let result = filter_plates(&records, &search("westfalen"), &BTreeSet::new());
        assert_eq!(codes(&result), vec!["BN", "BO", "SU"]);
    }

    #[test]
    fn test_no_match_is_empty() {
        let records = records();
        let result = filter_plates(&records, &search("xyz"), &BTreeSet::new());
        assert!(result.is_empty());
    }

    #[test]
    fn test_exact_match() {
        let records = records();
        let filter = FilterState {
            search: SearchQuery::exact("b"),
            ..Default::default()
        };
        assert_eq!(codes(&filter_plates(&records, &filter, &BTreeSet::new())), vec!["B"]);

        let filter = FilterState {
            search: SearchQuery::exact("ZZZ"),
            ..Default::default()
        };
        assert!(filter_plates(&records, &filter, &BTreeSet::new()).is_empty());
    }

    #[test]
    fn test_state_then_search() {
        let records = records();
        let filter = FilterState {
            search: SearchQuery::term("b"),
            state_filter: "Berlin".to_string(),
            ..Default::default()
        };
        assert_eq!(codes(&filter_plates(&records, &filter, &BTreeSet::new())), vec!["B"]);
    }

    #[test]
    fn test_seen_filter() {
        let records = records();
        let seen: BTreeSet<String> = ["M".to_string(), "BO".to_string()].into();
        let filter = FilterState {
            seen_filter: true,
            ..Default::default()
        };
        assert_eq!(codes(&filter_plates(&records, &filter, &seen)), vec!["BO", "M"]);

        // Search runs on the seen subset only
        let filter = FilterState {
            seen_filter: true,
            search: SearchQuery::term("b"),
            ..Default::default()
        };
        assert_eq!(codes(&filter_plates(&records, &filter, &seen)), vec!["BO"]);
    }

    #[test]
    fn test_empty_dataset() {
        let result = filter_plates(&[], &search("b"), &BTreeSet::new());
        assert!(result.is_empty());
    }

    #[test]
    fn test_search_query_string_forms() {
        assert_eq!(SearchQuery::parse_marked("==HH"), SearchQuery::Exact("HH".into()));
        assert_eq!(SearchQuery::parse_marked("hh"), SearchQuery::Term("hh".into()));
        assert_eq!(SearchQuery::parse_marked("   "), SearchQuery::All);
        assert_eq!(SearchQuery::Exact("HH".into()).to_string(), "==HH");
        // Typed input is never promoted to an exact match
        assert_eq!(SearchQuery::term("==HH"), SearchQuery::Term("==HH".into()));
    }
}
