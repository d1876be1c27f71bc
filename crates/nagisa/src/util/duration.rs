use std::sync::LazyLock;

use regex::Regex;

// Example duration: "PT1H3M43.2S". Years and months are approximated with
// 365-day years and 30-day months, as the xsd:duration type leaves them
// calendar-dependent.
static DURATION_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^P(?:(\d+)Y)?(?:(\d+)M)?(?:(\d+)D)?(?:T(?:(\d+)H)?(?:(\d+)M)?(?:([\d.]+)S)?)?$",
    )
    .unwrap()
});

/// Parses an ISO-8601 / xsd:duration string into seconds.
pub fn parse_duration(value: &str) -> Option<f64> {
    let captures = DURATION_REGEX.captures(value.trim())?;
    let component = |index: usize| {
        captures
            .get(index)
            .and_then(|m| m.as_str().parse::<f64>().ok())
            .unwrap_or(0.0)
    };
    let seconds = component(1) * 365.0 * 86_400.0
        + component(2) * 30.0 * 86_400.0
        + component(3) * 86_400.0
        + component(4) * 3_600.0
        + component(5) * 60.0
        + component(6);
    seconds.is_finite().then_some(seconds)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("PT30S"), Some(30.0));
        assert_eq!(parse_duration("PT1H3M43.2S"), Some(3823.2));
        assert_eq!(parse_duration("PT634.566S"), Some(634.566));
        assert_eq!(parse_duration("P1DT1M"), Some(86_460.0));
        assert_eq!(parse_duration("P1Y1M"), Some((365.0 + 30.0) * 86_400.0));
        assert_eq!(parse_duration("PT"), Some(0.0));
    }

    #[test]
    fn test_parse_duration_invalid() {
        assert_eq!(parse_duration(""), None);
        assert_eq!(parse_duration("1234"), None);
        assert_eq!(parse_duration("one hour"), None);
    }
}
