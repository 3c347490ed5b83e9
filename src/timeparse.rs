//! Time expression normalization
//!
//! Turns the time expressions people type into seconds:
//! `18s`, `18:40`, `1:02:03`, `18 minutes`, `18 minutes 32 seconds`,
//! `1h 5m`, `1h30m`, or a bare `18`.

use regex::Regex;
use std::sync::LazyLock;

use crate::error::{KiruError, Result};

// The unit is the whole letter run after the number: "18m30s" is two parts.
static WORDED_PART: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d+(?:\.\d+)?)\s*([a-z]+)").expect("worded time pattern is valid")
});

static WORDED_FILLER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:[\s,]|and)*$").expect("filler pattern is valid"));

/// Normalize a time expression to a non-negative number of seconds.
pub fn normalize(expression: &str) -> Result<f64> {
    let text = expression.trim().to_lowercase();
    if text.is_empty() {
        return Err(KiruError::Validation("empty time expression".to_string()));
    }

    if let Ok(seconds) = text.parse::<f64>() {
        return check_seconds(expression, seconds);
    }

    if text.contains(':') {
        return parse_colon(expression, &text);
    }

    parse_worded(expression, &text)
}

fn check_seconds(expression: &str, seconds: f64) -> Result<f64> {
    if !seconds.is_finite() || seconds < 0.0 {
        return Err(KiruError::Validation(format!(
            "time must be a non-negative number of seconds, got '{}'",
            expression
        )));
    }
    Ok(seconds)
}

/// `mm:ss` or `h:mm:ss`
fn parse_colon(expression: &str, text: &str) -> Result<f64> {
    let parts = text
        .split(':')
        .map(|part| part.trim().parse::<f64>())
        .collect::<std::result::Result<Vec<f64>, _>>()
        .map_err(|_| unrecognized(expression))?;

    if parts.iter().any(|value| !value.is_finite() || *value < 0.0) {
        return Err(unrecognized(expression));
    }

    match parts.as_slice() {
        [minutes, seconds] if *seconds < 60.0 => Ok(minutes * 60.0 + seconds),
        [hours, minutes, seconds] if *minutes < 60.0 && *seconds < 60.0 => {
            Ok(hours * 3600.0 + minutes * 60.0 + seconds)
        }
        _ => Err(unrecognized(expression)),
    }
}

fn parse_worded(expression: &str, text: &str) -> Result<f64> {
    let mut total = 0.0;
    let mut matched = false;

    for caps in WORDED_PART.captures_iter(text) {
        let value: f64 = caps[1].parse().map_err(|_| unrecognized(expression))?;
        let scale = unit_scale(&caps[2]).ok_or_else(|| unrecognized(expression))?;
        total += value * scale;
        matched = true;
    }

    // Anything left over besides separators means we only understood part of it.
    let rest = WORDED_PART.replace_all(text, "");
    if !matched || !WORDED_FILLER.is_match(&rest) {
        return Err(unrecognized(expression));
    }

    check_seconds(expression, total)
}

/// Seconds per unit word
fn unit_scale(unit: &str) -> Option<f64> {
    match unit {
        "h" | "hr" | "hrs" | "hour" | "hours" => Some(3600.0),
        "m" | "min" | "mins" | "minute" | "minutes" => Some(60.0),
        "s" | "sec" | "secs" | "second" | "seconds" => Some(1.0),
        _ => None,
    }
}

fn unrecognized(expression: &str) -> KiruError {
    KiruError::Validation(format!("unrecognized time expression '{}'", expression))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_documented_forms() {
        assert_eq!(normalize("18s").unwrap(), 18.0);
        assert_eq!(normalize("18:40").unwrap(), 1120.0);
        assert_eq!(normalize("18 minutes").unwrap(), 1080.0);
        assert_eq!(normalize("18 minutes 32 seconds").unwrap(), 1112.0);
    }

    #[test]
    fn test_bare_and_abbreviated() {
        assert_eq!(normalize("18").unwrap(), 18.0);
        assert_eq!(normalize(" 12.5 ").unwrap(), 12.5);
        assert_eq!(normalize("2 min").unwrap(), 120.0);
        assert_eq!(normalize("1h 5m").unwrap(), 3900.0);
        assert_eq!(normalize("1 hour, 2 minutes and 3 seconds").unwrap(), 3723.0);
        assert_eq!(normalize("90 Secs").unwrap(), 90.0);
    }

    #[test]
    fn test_compact_forms() {
        assert_eq!(normalize("18m30s").unwrap(), 1110.0);
        assert_eq!(normalize("1h30m").unwrap(), 5400.0);
        assert_eq!(normalize("1h2m3s").unwrap(), 3723.0);
        assert_eq!(normalize("2min5sec").unwrap(), 125.0);
    }

    #[test]
    fn test_hours_colon_form() {
        assert_eq!(normalize("1:02:03").unwrap(), 3723.0);
        assert_eq!(normalize("0:05").unwrap(), 5.0);
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(normalize("").is_err());
        assert!(normalize("soon").is_err());
        assert!(normalize("-5").is_err());
        assert!(normalize("18:75").is_err());
        assert!(normalize("1:2:3:4").is_err());
        assert!(normalize("18 minutes later").is_err());
        assert!(normalize("NaN").is_err());
        assert!(normalize("5 sand").is_err());
        assert!(normalize("10 days").is_err());
    }
}
