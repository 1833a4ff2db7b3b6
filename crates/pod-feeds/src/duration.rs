//! Duration normalization: feeds encode episode length as a bare integer
//! number of seconds, `MM:SS`, or `HH:MM:SS` (§4.B).

/// Parses `"3600"`, `"60:00"`, or `"1:00:00"` into a whole number of
/// seconds. Returns `None` for anything malformed or empty.
#[must_use]
pub fn normalize_duration(raw: &str) -> Option<i32> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(seconds) = trimmed.parse::<i32>() {
        return (seconds >= 0).then_some(seconds);
    }

    let parts: Vec<&str> = trimmed.split(':').collect();
    if parts.is_empty() || parts.len() > 3 || parts.iter().any(|p| p.is_empty()) {
        return None;
    }

    let mut total: i64 = 0;
    for part in &parts {
        let n: i64 = part.parse().ok()?;
        if n < 0 {
            return None;
        }
        total = total.checked_mul(60)?.checked_add(n)?;
    }

    i32::try_from(total).ok()
}

/// Parses an ISO-8601 duration (`PT#H#M#S`) as used by the YouTube Data
/// API's `contentDetails.duration` field (§4.B).
#[must_use]
pub fn parse_iso8601_duration(raw: &str) -> Option<i32> {
    let s = raw.strip_prefix("PT")?;
    if s.is_empty() {
        return None;
    }

    let mut total: i64 = 0;
    let mut number = String::new();
    let mut saw_any = false;

    for c in s.chars() {
        match c {
            '0'..='9' => number.push(c),
            'H' | 'M' | 'S' => {
                let n: i64 = number.parse().ok()?;
                number.clear();
                let multiplier = match c {
                    'H' => 3600,
                    'M' => 60,
                    _ => 1,
                };
                total = total.checked_add(n.checked_mul(multiplier)?)?;
                saw_any = true;
            }
            _ => return None,
        }
    }

    if !saw_any || !number.is_empty() {
        return None;
    }

    i32::try_from(total).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("3600", Some(3600))]
    #[test_case("60:00", Some(3600))]
    #[test_case("1:00:00", Some(3600))]
    #[test_case("invalid", None)]
    #[test_case("", None)]
    fn s2_duration_parsing(input: &str, expected: Option<i32>) {
        assert_eq!(normalize_duration(input), expected);
    }

    #[test]
    fn rejects_malformed_colon_forms() {
        assert_eq!(normalize_duration("1::30"), None);
        assert_eq!(normalize_duration(":30"), None);
        assert_eq!(normalize_duration("-5"), None);
    }

    #[test_case("PT1H2M3S", Some(3723))]
    #[test_case("PT90S", Some(90))]
    #[test_case("PT5M", Some(300))]
    #[test_case("P1D", None)]
    #[test_case("PT", None)]
    fn iso8601_duration(input: &str, expected: Option<i32>) {
        assert_eq!(parse_iso8601_duration(input), expected);
    }
}
