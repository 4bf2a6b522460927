//! Admission-number comparison.
//!
//! Both sides are trimmed of surrounding whitespace and then compared
//! exactly, case-sensitively: admission numbers are issued verbatim. The
//! comparison runs over SHA-256 digests so its timing does not depend on
//! how long a common prefix the guess shares with the stored value.

use sha2::{Digest, Sha256};

/// Longest admission number accepted from a client, in characters.
pub const MAX_ADMISSION_NUMBER_CHARS: usize = 64;

/// Canonical form used for storage and comparison.
pub fn normalize(admission_number: &str) -> &str {
    admission_number.trim()
}

/// Whether `supplied` matches the `stored` admission number.
///
/// An empty (after trimming) input never matches.
pub fn admission_matches(stored: &str, supplied: &str) -> bool {
    let supplied = normalize(supplied);
    if supplied.is_empty() || supplied.chars().count() > MAX_ADMISSION_NUMBER_CHARS {
        return false;
    }

    let a = Sha256::digest(normalize(stored).as_bytes());
    let b = Sha256::digest(supplied.as_bytes());
    a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_match_passes() {
        assert!(admission_matches("ADM1234", "ADM1234"));
    }

    #[test]
    fn surrounding_whitespace_is_ignored() {
        assert!(admission_matches("ADM1234", "  ADM1234\n"));
        assert!(admission_matches(" ADM1234 ", "ADM1234"));
    }

    #[test]
    fn comparison_is_case_sensitive() {
        assert!(!admission_matches("ADM1234", "adm1234"));
    }

    #[test]
    fn wrong_value_fails() {
        assert!(!admission_matches("ADM1234", "WRONG"));
        assert!(!admission_matches("ADM1234", "ADM123"));
        assert!(!admission_matches("ADM1234", "ADM12345"));
    }

    #[test]
    fn empty_input_never_matches() {
        assert!(!admission_matches("", ""));
        assert!(!admission_matches("ADM1234", "   "));
    }

    #[test]
    fn overlong_input_is_rejected_before_hashing() {
        let long = "A".repeat(MAX_ADMISSION_NUMBER_CHARS + 1);
        assert!(!admission_matches(&long, &long));
    }
}
