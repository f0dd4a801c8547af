//! Fuzzy column-name matching for "did you mean" hints

/// Lowercase and drop spaces, underscores and dashes
fn normalize(name: &str) -> String {
    name.trim()
        .chars()
        .filter(|c| !matches!(c, ' ' | '_' | '-') && !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Find the existing column closest to `search`.
///
/// Tries, in order: normalized equality, normalized prefix, normalized
/// substring, and the reverse substring (column contained in the search).
/// Partial matches need at least three normalized characters.
pub fn find_matching_column<'a>(search: &str, available: &'a [String]) -> Option<&'a str> {
    let needle = normalize(search);
    if needle.is_empty() {
        return None;
    }

    let candidates: Vec<(&'a str, String)> = available
        .iter()
        .map(|c| (c.as_str(), normalize(c)))
        .collect();

    if let Some((name, _)) = candidates.iter().find(|(_, n)| *n == needle) {
        return Some(*name);
    }

    if needle.chars().count() >= 3 {
        if let Some((name, _)) = candidates.iter().find(|(_, n)| n.starts_with(&needle)) {
            return Some(*name);
        }
        if let Some((name, _)) = candidates.iter().find(|(_, n)| n.contains(&needle)) {
            return Some(*name);
        }
    }

    candidates
        .iter()
        .find(|(_, n)| n.chars().count() >= 3 && needle.contains(n.as_str()))
        .map(|(name, _)| *name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cols(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_normalized_equality() {
        let available = cols(&["Unit Price", "Quantity"]);
        assert_eq!(find_matching_column("unit_price", &available), Some("Unit Price"));
    }

    #[test]
    fn test_prefix_and_substring() {
        let available = cols(&["Revenue Total", "Region"]);
        assert_eq!(find_matching_column("reven", &available), Some("Revenue Total"));
        assert_eq!(find_matching_column("total", &available), Some("Revenue Total"));
    }

    #[test]
    fn test_short_search_needs_exact_match() {
        let available = cols(&["Revenue"]);
        assert_eq!(find_matching_column("re", &available), None);
    }

    #[test]
    fn test_reverse_containment() {
        let available = cols(&["age"]);
        assert_eq!(find_matching_column("customer age", &available), Some("age"));
    }
}
