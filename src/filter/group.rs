//! Bucketing of the filtered list for display.

use std::cmp::Ordering;
use std::collections::HashMap;

use serde::Serialize;

use super::{SearchQuery, code_len};
use crate::collate;
use crate::types::{PlateRecord, ViewMode};

/// A named bucket of plates: a first letter or a federal state name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlateGroup<'a> {
    pub key: String,
    pub plates: Vec<&'a PlateRecord>,
}

impl PlateGroup<'_> {
    /// Shortest code in this group that matches the search as a code match.
    fn shortest_code_match(&self, search: &SearchQuery) -> Option<usize> {
        self.plates
            .iter()
            .filter(|p| search.is_code_match(&p.code))
            .map(|p| code_len(&p.code))
            .min()
    }
}

/// Group an already sorted list. Record order inside each group is preserved.
pub fn group_plates<'a>(
    plates: &[&'a PlateRecord],
    view_mode: ViewMode,
    search: &SearchQuery,
) -> Vec<PlateGroup<'a>> {
    let mut groups: Vec<PlateGroup<'a>> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for plate in plates {
        let key = match view_mode {
            ViewMode::Alphabetical => first_letter(&plate.code),
            ViewMode::Grouped => plate.federal_state.clone(),
        };
        match index.get(&key) {
            Some(&i) => groups[i].plates.push(plate),
            None => {
                index.insert(key.clone(), groups.len());
                groups.push(PlateGroup {
                    key,
                    plates: vec![plate],
                });
            }
        }
    }

    match view_mode {
        ViewMode::Grouped if search.is_active() => {
            groups.sort_by(|a, b| compare_by_relevance(a, b, search));
        }
        _ => groups.sort_by(|a, b| collate::compare(&a.key, &b.key)),
    }
    groups
}

fn first_letter(code: &str) -> String {
    code.chars()
        .next()
        .map(|c| c.to_uppercase().collect())
        .unwrap_or_default()
}

/// Groups holding a code match come first, ordered by their shortest match.
fn compare_by_relevance(a: &PlateGroup<'_>, b: &PlateGroup<'_>, search: &SearchQuery) -> Ordering {
    match (a.shortest_code_match(search), b.shortest_code_match(search)) {
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (Some(len_a), Some(len_b)) => len_a
            .cmp(&len_b)
            .then_with(|| collate::compare(&a.key, &b.key)),
        (None, None) => collate::compare(&a.key, &b.key),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;
    use crate::filter::{FilterState, filter_plates};

    fn records() -> Vec<PlateRecord> {
        vec![
            PlateRecord::new("B", "Berlin", "Berlin", "Berlin"),
            PlateRecord::new("BN", "Bonn", "Bonn", "Nordrhein-Westfalen"),
            PlateRecord::new("BO", "Bochum", "Bochum", "Nordrhein-Westfalen"),
            PlateRecord::new("BA", "Bamberg", "Bamberg", "Bayern"),
            PlateRecord::new("M", "München", "München", "Bayern"),
            PlateRecord::new("ÖHR", "Hohenlohekreis", "Öhringen", "Baden-Württemberg"),
            PlateRecord::new("OA", "Oberallgäu", "Oberallgäu", "Bayern"),
        ]
    }

    fn keys(groups: &[PlateGroup<'_>]) -> Vec<String> {
        groups.iter().map(|g| g.key.clone()).collect()
    }

    fn run(search: SearchQuery, view_mode: ViewMode) -> Vec<(String, Vec<String>)> {
        let records = records();
        let filter = FilterState {
            search,
            view_mode,
            ..Default::default()
        };
        let plates = filter_plates(&records, &filter, &BTreeSet::new());
        group_plates(&plates, view_mode, &filter.search)
            .into_iter()
            .map(|g| (g.key, g.plates.iter().map(|p| p.code.clone()).collect()))
            .collect()
    }

    #[test]
    fn test_alphabetical_buckets() {
        let groups = run(SearchQuery::All, ViewMode::Alphabetical);
        let keys: Vec<&str> = groups.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["B", "M", "O", "Ö"]);
        assert_eq!(groups[0].1, vec!["B", "BA", "BN", "BO"]);
    }

    #[test]
    fn test_grouped_without_search_is_alphabetical_by_state() {
        let groups = run(SearchQuery::All, ViewMode::Grouped);
        let keys: Vec<&str> = groups.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(
            keys,
            vec!["Baden-Württemberg", "Bayern", "Berlin", "Nordrhein-Westfalen"]
        );
    }

    #[test]
    fn test_grouped_with_search_ranks_by_shortest_code_match() {
        let groups = run(SearchQuery::term("b"), ViewMode::Grouped);
        let keys: Vec<&str> = groups.iter().map(|(k, _)| k.as_str()).collect();
        // Berlin holds "B" (length 1); Bayern and NRW tie at length 2
        assert_eq!(keys, vec!["Berlin", "Bayern", "Nordrhein-Westfalen"]);
    }

    #[test]
    fn test_grouped_content_matches_fall_back_to_alphabetical() {
        let groups = run(SearchQuery::term("hohenlohe"), ViewMode::Grouped);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].0, "Baden-Württemberg");
    }

    #[test]
    fn test_regrouping_preserves_every_record() {
        let records = records();
        for search in [SearchQuery::All, SearchQuery::term("b"), SearchQuery::term("bayern")] {
            let filter = FilterState {
                search: search.clone(),
                ..Default::default()
            };
            let plates = filter_plates(&records, &filter, &BTreeSet::new());
            let by_state = group_plates(&plates, ViewMode::Grouped, &search);
            let by_letter = group_plates(&plates, ViewMode::Alphabetical, &search);

            let total = |groups: &[PlateGroup<'_>]| -> usize {
                groups.iter().map(|g| g.plates.len()).sum()
            };
            assert_eq!(total(&by_state), plates.len());
            assert_eq!(total(&by_letter), plates.len());

            let mut from_state: Vec<&str> = by_state
                .iter()
                .flat_map(|g| g.plates.iter().map(|p| p.code.as_str()))
                .collect();
            let mut from_letter: Vec<&str> = by_letter
                .iter()
                .flat_map(|g| g.plates.iter().map(|p| p.code.as_str()))
                .collect();
            from_state.sort();
            from_letter.sort();
            assert_eq!(from_state, from_letter);
        }
    }

    #[test]
    fn test_unknown_state_is_its_own_bucket() {
        let records = vec![
            PlateRecord::new("X", "Nowhere", "Nowhere", "Atlantis"),
            PlateRecord::new("B", "Berlin", "Berlin", "Berlin"),
        ];
        let plates: Vec<&PlateRecord> = records.iter().collect();
        let groups = group_plates(&plates, ViewMode::Grouped, &SearchQuery::All);
        assert_eq!(keys(&groups), vec!["Atlantis", "Berlin"]);
    }
}
