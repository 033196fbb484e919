//! Primitive identifier types

/// Item identifier, assigned by the registry starting at 1
pub type Id = i64;

/// Parse an identifier taken from a URL path segment.
///
/// Anything that is not a positive integer yields `None`; callers treat that
/// the same as an unknown id.
pub fn parse_id(raw: &str) -> Option<Id> {
    raw.trim().parse::<Id>().ok().filter(|id| *id > 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_id() {
        assert_eq!(parse_id("42"), Some(42));
        assert_eq!(parse_id(" 7 "), Some(7));
        assert_eq!(parse_id("0"), None);
        assert_eq!(parse_id("-3"), None);
        assert_eq!(parse_id("abc"), None);
        assert_eq!(parse_id(""), None);
    }
}
