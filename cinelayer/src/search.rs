//! Prefix and word-start search patterns.
//!
//! A term matches when it starts the value or follows a whitespace character,
//! ignoring case: `"bat"` finds "Batman" and "Com bat Zone" but not "Combat Zone".

use cinelayer_core::query::{Expr, Filter};

/// Builds `^<term>|\s<term>` with the term escaped, so it is always matched literally.
pub fn search_pattern(term: &str) -> String {
    let escaped = regex::escape(term);

    format!("^{escaped}|\\s{escaped}")
}

/// Case-insensitive search filter on one field.
pub fn search_filter(field: &str, term: &str) -> Expr {
    Filter::regex(field, search_pattern(term), true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use regex::RegexBuilder;

    fn matches(term: &str, title: &str) -> bool {
        RegexBuilder::new(&search_pattern(term))
            .case_insensitive(true)
            .build()
            .unwrap()
            .is_match(title)
    }

    #[test]
    fn matches_prefixes_and_word_starts() {
        assert!(matches("bat", "Batman Begins"));
        assert!(matches("bat", "Com bat Zone"));
        assert!(!matches("bat", "Combat Zone"));
    }

    #[test]
    fn metacharacters_are_literal() {
        assert_eq!(search_pattern("a.b"), "^a\\.b|\\sa\\.b");
        assert!(matches("(500)", "(500) Days of Summer"));
        assert!(!matches("e.t", "Eat Drink Man Woman"));
    }
}
