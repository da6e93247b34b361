use regex::Regex;

#[inline]
pub fn capture_named<'a>(re: &Regex, input: &'a str, name: &str) -> Option<&'a str> {
    re.captures(input)
        .and_then(|caps| caps.name(name))
        .map(|m| m.as_str())
}

#[inline]
pub fn capture_named_owned(re: &Regex, input: &str, name: &str) -> Option<String> {
    capture_named(re, input, name).map(ToOwned::to_owned)
}

/// Collects the named group of every match, in document order.
pub fn capture_named_all(re: &Regex, input: &str, name: &str) -> Vec<String> {
    re.captures_iter(input)
        .filter_map(|caps| caps.name(name).map(|m| m.as_str().to_owned()))
        .collect()
}

/// Whether `value` ends with any of the given suffixes.
#[inline]
pub fn ends_with_any<S: AsRef<str>>(value: &str, suffixes: &[S]) -> bool {
    suffixes.iter().any(|s| value.ends_with(s.as_ref()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capture_helpers() {
        let re = Regex::new(r"id=(?P<id>\d+)").unwrap();
        assert_eq!(capture_named(&re, "x?id=42", "id"), Some("42"));
        assert_eq!(capture_named_owned(&re, "nothing", "id"), None);
        assert_eq!(capture_named_all(&re, "id=1 id=2", "id"), vec!["1", "2"]);
    }

    #[test]
    fn test_ends_with_any() {
        assert!(ends_with_any("www.adfox.ru", &["adfox.ru", "abv.bg"]));
        assert!(!ends_with_any("example.com", &["adfox.ru"]));
        assert!(!ends_with_any::<&str>("example.com", &[]));
    }
}
