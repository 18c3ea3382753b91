//! Locale-style string ordering for German names and codes.
//!
//! Plain byte ordering sorts `Ö` after `Z` and `a` after `Z`. Every list the
//! pipeline produces is instead ordered on a folded key (lowercase, umlauts
//! reduced to their base letter, `ß` to `ss`), with the raw string as the
//! tie-breaker so the order stays total.

use std::cmp::Ordering;

/// Compare two strings the way a German-locale collator would at primary strength.
pub fn compare(a: &str, b: &str) -> Ordering {
    fold(a).cmp(&fold(b)).then_with(|| a.cmp(b))
}

fn fold(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars().flat_map(char::to_lowercase) {
        match c {
            'ä' | 'à' | 'á' | 'â' => out.push('a'),
            'ö' | 'ò' | 'ó' | 'ô' => out.push('o'),
            'ü' | 'ù' | 'ú' | 'û' => out.push('u'),
            'é' | 'è' | 'ê' => out.push('e'),
            'ß' => out.push_str("ss"),
            other => out.push(other),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_umlaut_sorts_next_to_base_letter() {
        let mut codes = vec!["Z", "ÖHR", "OA", "P"];
        codes.sort_by(|a, b| compare(a, b));
        assert_eq!(codes, vec!["OA", "ÖHR", "P", "Z"]);
    }

    #[test]
    fn test_case_is_secondary() {
        assert_eq!(compare("a", "B"), Ordering::Less);
        assert_ne!(compare("a", "A"), Ordering::Equal);
    }

    #[test]
    fn test_state_names() {
        let mut states = vec!["Thüringen", "Sachsen-Anhalt", "Baden-Württemberg", "Sachsen"];
        states.sort_by(|a, b| compare(a, b));
        assert_eq!(
            states,
            vec!["Baden-Württemberg", "Sachsen", "Sachsen-Anhalt", "Thüringen"]
        );
    }
}
