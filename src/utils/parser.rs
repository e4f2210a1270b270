//! Small parsers shared by config loading and query-string handling.

use std::time::Duration;

use mongodb::bson::oid::ObjectId;
use mongodb::bson::Bson;

/// Parse a duration like `30m`, `12h`, `90d`, `1w`, `45s` or a bare number of seconds.
pub fn parse_duration(input: &str) -> Option<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }

    if let Ok(seconds) = input.parse::<u64>() {
        return Some(Duration::from_secs(seconds));
    }

    let unit_start = input.len() - input.chars().last()?.len_utf8();
    let (digits, unit) = input.split_at(unit_start);
    let amount: u64 = digits.parse().ok()?;

    let multiplier: u64 = match unit {
        "s" => 1,
        "m" => 60,
        "h" => 3600,
        "d" => 86400,
        "w" => 604800,
        _ => return None,
    };
    let seconds = amount.checked_mul(multiplier)?;

    Some(Duration::from_secs(seconds))
}

/// Coerce a raw query-string value into the closest BSON scalar.
///
/// 24-char hex strings become ObjectIds so that reference fields
/// (`category=<id>`) match what is stored.
pub fn coerce_scalar(raw: &str) -> Bson {
    let raw = raw.trim();

    if raw.len() == 24
        && let Ok(oid) = ObjectId::parse_str(raw)
    {
        return Bson::ObjectId(oid);
    }
    if let Ok(n) = raw.parse::<i64>() {
        return Bson::Int64(n);
    }
    if let Ok(f) = raw.parse::<f64>()
        && f.is_finite()
    {
        return Bson::Double(f);
    }
    match raw {
        "true" => Bson::Boolean(true),
        "false" => Bson::Boolean(false),
        _ => Bson::String(raw.to_string()),
    }
}

/// Lowercase URL slug for a display name.
pub fn slugify(name: &str) -> String {
    slug::slugify(name)
}
