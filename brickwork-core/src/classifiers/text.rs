use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref NUMBER_RE: Regex = Regex::new(r"^\s*(\d{1,4})\s*$").unwrap();
    static ref COUNT_RE: Regex =
        Regex::new(r"^\s*(?:(\d{1,3})\s*[xX×]|[xX×]\s*(\d{1,3}))\s*$").unwrap();
}

/// Positive integer printed on its own, e.g. `"12"`.
pub fn parse_number(text: &str) -> Option<u32> {
    let caps = NUMBER_RE.captures(text)?;
    caps.get(1)?
        .as_str()
        .parse::<u32>()
        .ok()
        .filter(|v| *v > 0)
}

/// Quantity marker, `"2x"`, `"2 ×"` or `"x2"`.
pub fn parse_count(text: &str) -> Option<u32> {
    let caps = COUNT_RE.captures(text)?;
    caps.get(1)
        .or_else(|| caps.get(2))?
        .as_str()
        .parse::<u32>()
        .ok()
        .filter(|v| *v > 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_number() {
        assert_eq!(parse_number("7"), Some(7));
        assert_eq!(parse_number(" 124 "), Some(124));
        assert_eq!(parse_number("0"), None);
        assert_eq!(parse_number("12345"), None);
        assert_eq!(parse_number("2x"), None);
        assert_eq!(parse_number("step 3"), None);
    }

    #[test]
    fn test_parse_count() {
        assert_eq!(parse_count("2x"), Some(2));
        assert_eq!(parse_count("10 X"), Some(10));
        assert_eq!(parse_count("3×"), Some(3));
        assert_eq!(parse_count("x4"), Some(4));
        assert_eq!(parse_count("4"), None);
        assert_eq!(parse_count("0x"), None);
        assert_eq!(parse_count("2x2"), None);
    }
}
