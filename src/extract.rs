//! Issue identifier extraction from free-form change-log text.
//!
//! An [`IssuePattern`] wraps the configured regular expression. Its first
//! capture group is the identifier; anything after it (the default pattern
//! uses a trailing group to reject version-like suffixes) is ignored.

use std::collections::BTreeSet;

use regex::Regex;

use crate::changelog::ChangeEntry;
use crate::error::AppError;

/// Default identifier pattern: a project key of at least two characters
/// (letters, digits, underscores; starting with a letter), a dash and a
/// number without leading zero. The second group keeps `ABC-1.5` from
/// matching while still accepting a sentence-ending `ABC-1.`.
pub const DEFAULT_ISSUE_PATTERN: &str = r"([a-zA-Z][a-zA-Z0-9_]+-[1-9][0-9]*)([^.]|\.[^0-9]|\.$|$)";

/// A compiled identifier pattern.
#[derive(Debug, Clone)]
pub struct IssuePattern {
    regex: Regex,
}

impl IssuePattern {
    /// Compiles `pattern`. It must contain at least one capture group.
    pub fn new(pattern: &str) -> Result<Self, AppError> {
        let regex = Regex::new(pattern)?;
        if regex.captures_len() < 2 {
            return Err(AppError::Config(format!(
                "issue pattern {pattern:?} must capture the identifier in a group"
            )));
        }
        Ok(Self { regex })
    }

    pub fn as_str(&self) -> &str {
        self.regex.as_str()
    }

    /// Distinct identifiers found anywhere in `text`, line breaks included.
    ///
    /// Deduplication is exact: `TR-1` and `tr-1` are two identifiers. The
    /// scan resumes right after each identifier, so text matched only by the
    /// trailing group can still start the next one (`ABC-1.DEF-2`).
    pub fn extract(&self, text: &str) -> BTreeSet<String> {
        let mut found = BTreeSet::new();
        let mut at = 0;
        while at <= text.len() {
            let Some(caps) = self.regex.captures_at(text, at) else {
                break;
            };
            let end = match caps.get(1) {
                Some(key) => {
                    found.insert(key.as_str().to_string());
                    key.end()
                }
                None => caps.get(0).map_or(text.len(), |m| m.end()),
            };
            at = if end > at {
                end
            } else {
                // empty match: step over one character
                at + text[at..].chars().next().map_or(1, char::len_utf8)
            };
        }
        found
    }
}

impl Default for IssuePattern {
    fn default() -> Self {
        Self {
            regex: Regex::new(DEFAULT_ISSUE_PATTERN).expect("default issue pattern is valid"),
        }
    }
}

/// Free-function form of [`IssuePattern::extract`].
pub fn extract(text: &str, pattern: &IssuePattern) -> BTreeSet<String> {
    pattern.extract(text)
}

/// Union of the identifiers referenced by every change entry.
pub fn extract_from_change_log(entries: &[ChangeEntry], pattern: &IssuePattern) -> BTreeSet<String> {
    entries
        .iter()
        .flat_map(|entry| extract(&entry.message, pattern))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn default_pattern_over_a_realistic_change_log() {
        let messages = [
            "Fixed JI123-4711",
            "Fixed foo_bar-4710",
            "Fixed FoO_bAr-4711",
            "Fixed something.\nJFoO_bAr_MULTI-4718",
            "TR-123: foo",
            "[ABC-42] hallo",
            "#123: this one must not match",
            "ABC-: this one must also not match",
            "ABC-: \n\nABC-127:\nthis one should match",
            "ABC-: \n\nABC-128:\nthis one should match",
            "ABC-: \n\nXYZ-10:\nXYZ-20 this one too",
            "Fixed DOT-4.",
            "Fixed DOT-5. Did it right this time",
        ];
        let entries: Vec<ChangeEntry> = messages.iter().map(|m| ChangeEntry::from_message(*m)).collect();

        let found = extract_from_change_log(&entries, &IssuePattern::default());
        assert_eq!(
            found,
            keys(&[
                "JI123-4711",
                "foo_bar-4710",
                "FoO_bAr-4711",
                "JFoO_bAr_MULTI-4718",
                "TR-123",
                "ABC-42",
                "ABC-127",
                "ABC-128",
                "XYZ-10",
                "XYZ-20",
                "DOT-4",
                "DOT-5",
            ])
        );
    }

    #[test]
    fn bare_prefix_never_matches() {
        let pattern = IssuePattern::default();
        assert!(pattern.extract("ABC-").is_empty());
        assert!(pattern.extract("ABC- 12").is_empty());
        assert!(pattern.extract("ABC-0").is_empty());
        assert_eq!(pattern.extract("ABC-127"), keys(&["ABC-127"]));
    }

    #[test]
    fn version_numbers_are_not_identifiers() {
        let pattern = IssuePattern::default();
        assert!(pattern.extract("bump release-1.5 to release-1.6").is_empty());
    }

    #[test]
    fn dedup_is_case_sensitive() {
        let found = extract("TR-123 and tr-123\nand TR-123 again", &IssuePattern::default());
        assert_eq!(found, keys(&["TR-123", "tr-123"]));
    }

    #[test]
    fn identifiers_joined_by_a_dot_are_both_found() {
        let pattern = IssuePattern::default();
        assert_eq!(
            pattern.extract("Fixed ABC-1.DEF-2"),
            keys(&["ABC-1", "DEF-2"])
        );
        assert_eq!(
            pattern.extract("ABC-1,XYZ-20 and FOO-3.\nBAR-4"),
            keys(&["ABC-1", "XYZ-20", "FOO-3", "BAR-4"])
        );
    }

    #[test]
    fn pattern_matching_empty_text_terminates() {
        let pattern = IssuePattern::new("([A-Z]*)").unwrap();
        assert_eq!(pattern.extract("ab CD é"), keys(&["", "CD"]));
    }

    #[test]
    fn text_without_identifiers_yields_nothing() {
        assert!(IssuePattern::default().extract("refactor build scripts").is_empty());
        assert!(IssuePattern::default().extract("").is_empty());
    }

    #[test]
    fn custom_pattern_uses_first_group() {
        let pattern = IssuePattern::new("(TR-[0-9]*)").unwrap();
        assert_eq!(
            pattern.extract("TR-123: foo\n[ABC-42] hallo\nTR-7"),
            keys(&["TR-123", "TR-7"])
        );
    }

    #[test]
    fn pattern_without_group_is_rejected() {
        assert!(matches!(
            IssuePattern::new("[A-Z]+-[0-9]+"),
            Err(AppError::Config(_))
        ));
    }

    #[test]
    fn invalid_regex_is_rejected() {
        assert!(matches!(
            IssuePattern::new("([A-Z]+-"),
            Err(AppError::InvalidPattern(_))
        ));
    }
}
