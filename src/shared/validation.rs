use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// Regex for validating a person's full name
    /// Letters (any script), spaces, apostrophes, dots and hyphens; must start with a letter
    /// - Valid: "Jane Doe", "O'Neil", "J. R. Smith", "Anne-Marie"
    /// - Invalid: "", " Jane", "J4ne", "<script>"
    pub static ref FULL_NAME_REGEX: Regex = Regex::new(r"^\p{L}[\p{L} .'\-]*$").unwrap();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_name_regex_valid() {
        assert!(FULL_NAME_REGEX.is_match("Jane Doe"));
        assert!(FULL_NAME_REGEX.is_match("O'Neil"));
        assert!(FULL_NAME_REGEX.is_match("J. R. Smith"));
        assert!(FULL_NAME_REGEX.is_match("Anne-Marie"));
        assert!(FULL_NAME_REGEX.is_match("Jürgen"));
    }

    #[test]
    fn test_full_name_regex_invalid() {
        assert!(!FULL_NAME_REGEX.is_match("")); // empty
        assert!(!FULL_NAME_REGEX.is_match(" Jane")); // leading space
        assert!(!FULL_NAME_REGEX.is_match("J4ne")); // digit
        assert!(!FULL_NAME_REGEX.is_match("<script>")); // markup
        assert!(!FULL_NAME_REGEX.is_match("-Jane")); // starts with hyphen
    }
}
