//! Substring search over transfer-certificate records.
//!
//! The public search box matches a free-text query against four display
//! fields. Matching is a case-insensitive substring test; a record matches
//! when ANY of its fields contains the query. Results keep the caller's
//! ordering, there is no relevance ranking.

use crate::error::CoreError;

/// Longest query accepted from the public search box, in characters.
pub const MAX_QUERY_CHARS: usize = 100;

/// A record that exposes the fields the search box matches against.
pub trait Searchable {
    /// Student name, father's name, class, and certificate number.
    fn search_fields(&self) -> [&str; 4];
}

/// Normalize raw user input into a lowercase needle.
///
/// Surrounding whitespace is trimmed. Returns `None` when nothing is left,
/// meaning "no filter".
pub fn normalize_query(query: &str) -> Option<String> {
    let trimmed = query.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_lowercase())
    }
}

/// Reject queries longer than [`MAX_QUERY_CHARS`].
pub fn validate_query(query: &str) -> Result<(), CoreError> {
    if query.chars().count() > MAX_QUERY_CHARS {
        return Err(CoreError::Validation(format!(
            "Search query must be at most {MAX_QUERY_CHARS} characters"
        )));
    }
    Ok(())
}

/// Whether `record` contains the already-normalized `needle` in any field.
pub fn matches<T: Searchable + ?Sized>(record: &T, needle: &str) -> bool {
    record
        .search_fields()
        .iter()
        .any(|field| field.to_lowercase().contains(needle))
}

/// Filter `records` down to those matching `query`, preserving order.
///
/// An empty (or whitespace-only) query returns every record unfiltered.
pub fn search<T: Searchable>(query: &str, records: Vec<T>) -> Vec<T> {
    match normalize_query(query) {
        None => records,
        Some(needle) => records
            .into_iter()
            .filter(|record| matches(record, &needle))
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Row {
        id: i64,
        name: &'static str,
        father: &'static str,
        class: &'static str,
        tc: &'static str,
    }

    impl Searchable for Row {
        fn search_fields(&self) -> [&str; 4] {
            [self.name, self.father, self.class, self.tc]
        }
    }

    fn rows() -> Vec<Row> {
        vec![
            Row { id: 42, name: "Aarav Singh", father: "Rohit Singh", class: "10", tc: "TC-2024-001" },
            Row { id: 7, name: "Meera Iyer", father: "Suresh Iyer", class: "12", tc: "TC-2024-002" },
            Row { id: 9, name: "Kabir Das", father: "Anil Das", class: "9", tc: "TC-2023-117" },
        ]
    }

    fn ids(rows: &[Row]) -> Vec<i64> {
        rows.iter().map(|r| r.id).collect()
    }

    #[test]
    fn empty_query_returns_everything_in_order() {
        assert_eq!(search("", rows()), rows());
        assert_eq!(search("   ", rows()), rows());
    }

    #[test]
    fn match_is_case_insensitive() {
        assert_eq!(ids(&search("aarav", rows())), vec![42]);
        assert_eq!(ids(&search("AARAV", rows())), vec![42]);
    }

    #[test]
    fn any_field_can_match() {
        // father's name
        assert_eq!(ids(&search("suresh", rows())), vec![7]);
        // class
        assert_eq!(ids(&search("12", rows())), vec![7]);
        // certificate number
        assert_eq!(ids(&search("tc-2023", rows())), vec![9]);
    }

    #[test]
    fn shared_substring_keeps_input_order() {
        assert_eq!(ids(&search("tc-2024", rows())), vec![42, 7]);
        assert_eq!(ids(&search("singh", rows())), vec![42]);
    }

    #[test]
    fn no_match_returns_empty() {
        assert!(search("zzz", rows()).is_empty());
    }

    #[test]
    fn result_is_exactly_the_matching_subset() {
        for q in ["a", "i", "1", "das", "-", "ro"] {
            let expected: Vec<i64> = rows()
                .iter()
                .filter(|r| {
                    r.search_fields()
                        .iter()
                        .any(|f| f.to_lowercase().contains(&q.to_lowercase()))
                })
                .map(|r| r.id)
                .collect();
            assert_eq!(ids(&search(q, rows())), expected, "query {q:?}");
        }
    }

    #[test]
    fn overlong_query_is_rejected() {
        let long = "x".repeat(MAX_QUERY_CHARS + 1);
        assert!(validate_query(&long).is_err());
        assert!(validate_query(&"x".repeat(MAX_QUERY_CHARS)).is_ok());
    }
}
