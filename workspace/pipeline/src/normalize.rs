//! Value normalizers and format predicates.
//!
//! These are the single source of truth for what "clean" means: the cleaning
//! steps rewrite values with them, and the analysis and validation stages
//! count violations with the very same functions.

use chrono::{Datelike, NaiveDate};
use regex::Regex;
use std::sync::LazyLock;

/// `local@domain.tld`: no `@` or whitespace in the parts, a dotted domain and
/// a TLD of two or more letters.
static EMAIL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[A-Za-z]{2,}$").expect("compile email regex")
});

/// Fewest digits a stored phone number may keep.
pub const MIN_PHONE_DIGITS: usize = 10;

/// Earliest accepted birth year; anything before 1900-01-01 is discarded.
pub const EARLIEST_BIRTH_YEAR: i32 = 1900;

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_REGEX.is_match(email)
}

/// Keeps only ASCII digits and `+`.
pub fn strip_phone(phone: &str) -> String {
    phone
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '+')
        .collect()
}

pub fn digit_count(value: &str) -> usize {
    value.chars().filter(|c| c.is_ascii_digit()).count()
}

/// Canonical form of a phone number, or `None` when too few digits remain.
pub fn normalize_phone(phone: &str) -> Option<String> {
    let stripped = strip_phone(phone);
    (digit_count(&stripped) >= MIN_PHONE_DIGITS).then_some(stripped)
}

pub fn normalize_username(username: &str) -> String {
    username.trim().to_lowercase()
}

/// Trims and collapses every internal whitespace run to a single space.
pub fn collapse_whitespace(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Trimmed value, with empty-after-trim mapped to `None`.
pub fn trim_to_option(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

pub fn is_blank(value: Option<&str>) -> bool {
    value.is_none_or(|v| v.trim().is_empty())
}

pub fn birth_date_in_range(birth_date: NaiveDate, today: NaiveDate) -> bool {
    birth_date.year() >= EARLIEST_BIRTH_YEAR && birth_date <= today
}

pub fn normalize_role(role: &str) -> String {
    role.trim().to_lowercase()
}

pub fn normalize_division(division: &str) -> String {
    collapse_whitespace(division)
}

pub fn normalize_action(action: &str) -> String {
    action.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email("A@Test.com "), "a@test.com");
        assert_eq!(normalize_email("\tJohn.Doe@Example.ORG\n"), "john.doe@example.org");
    }

    #[test]
    fn test_is_valid_email() {
        assert!(is_valid_email("a@test.com"));
        assert!(is_valid_email("first.last+tag@mail.example.co"));
        assert!(!is_valid_email(""));
        assert!(!is_valid_email("no-at-sign.com"));
        assert!(!is_valid_email("two@@test.com"));
        assert!(!is_valid_email("user@localhost"));
        assert!(!is_valid_email("user@test.c"));
        assert!(!is_valid_email("user@test.c0m"));
        assert!(!is_valid_email("us er@test.com"));
        assert!(!is_valid_email("a@test.com "));
    }

    #[test]
    fn test_normalize_phone() {
        assert_eq!(
            normalize_phone("+1 (234) 567-8900"),
            Some("+12345678900".to_string())
        );
        assert_eq!(normalize_phone("234.567.8900"), Some("2345678900".to_string()));
        assert_eq!(normalize_phone("555-1234"), None);
        assert_eq!(normalize_phone("call me"), None);
        assert_eq!(normalize_phone(""), None);
    }

    #[test]
    fn test_plus_signs_do_not_count_as_digits() {
        assert_eq!(digit_count("+++123456789"), 9);
        assert_eq!(normalize_phone("+++123456789"), None);
    }

    #[test]
    fn test_collapse_whitespace() {
        assert_eq!(collapse_whitespace("  Jane \t  Q.\n Public "), "Jane Q. Public");
        assert_eq!(collapse_whitespace("   "), "");
        assert_eq!(normalize_division(" Research   and  Development "), "Research and Development");
    }

    #[test]
    fn test_trim_to_option() {
        assert_eq!(trim_to_option("  hello "), Some("hello".to_string()));
        assert_eq!(trim_to_option(" \n\t "), None);
        assert!(is_blank(None));
        assert!(is_blank(Some("  ")));
        assert!(!is_blank(Some(" x ")));
    }

    #[test]
    fn test_birth_date_in_range() {
        let today = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        assert!(birth_date_in_range(NaiveDate::from_ymd_opt(1900, 1, 1).unwrap(), today));
        assert!(birth_date_in_range(today, today));
        assert!(!birth_date_in_range(NaiveDate::from_ymd_opt(1899, 12, 31).unwrap(), today));
        assert!(!birth_date_in_range(NaiveDate::from_ymd_opt(2999, 1, 1).unwrap(), today));
        assert!(!birth_date_in_range(today.succ_opt().unwrap(), today));
    }

    #[test]
    fn test_label_normalizers() {
        assert_eq!(normalize_username("  JaneDoe "), "janedoe");
        assert_eq!(normalize_role(" Admin "), "admin");
        assert_eq!(normalize_action(" LOGIN\n"), "login");
    }
}
