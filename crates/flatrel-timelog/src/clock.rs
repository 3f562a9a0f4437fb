//! Command-line timestamps.

use anyhow::{anyhow, Result};
use chrono::{DateTime, NaiveDateTime, NaiveTime, TimeZone};

/// Parses a timestamp given on the command line into Unix seconds.
///
/// Accepted forms, interpreted in the time zone of `now`:
/// - `now`
/// - Unix seconds, e.g. `1792054800` or `1792054800.5`
/// - RFC 3339, e.g. `2026-10-15T09:00:00+02:00`
/// - `YYYY-MM-DD HH:MM[:SS]`
/// - `HH:MM[:SS]`, meaning today
pub fn parse_timestamp<Tz: TimeZone>(input: &str, now: &DateTime<Tz>) -> Result<f64> {
    let input = input.trim();
    if input.eq_ignore_ascii_case("now") {
        return Ok(unix_seconds(now));
    }
    if let Ok(seconds) = input.parse::<f64>() {
        if seconds.is_finite() {
            return Ok(seconds);
        }
    }
    if let Ok(t) = DateTime::parse_from_rfc3339(input) {
        return Ok(unix_seconds(&t));
    }

    let tz = now.timezone();
    let naive = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(input, fmt).ok())
        .or_else(|| {
            ["%H:%M:%S", "%H:%M"]
                .iter()
                .find_map(|fmt| NaiveTime::parse_from_str(input, fmt).ok())
                .map(|time| now.date_naive().and_time(time))
        })
        .ok_or_else(|| anyhow!("unrecognized timestamp: {:?}", input))?;

    let local = tz
        .from_local_datetime(&naive)
        .earliest()
        .ok_or_else(|| anyhow!("{} does not exist in the local time zone", naive))?;
    Ok(unix_seconds(&local))
}

fn unix_seconds<Tz: TimeZone>(t: &DateTime<Tz>) -> f64 {
    t.timestamp() as f64 + f64::from(t.timestamp_subsec_millis()) / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, Utc};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 15, 12, 30, 0).unwrap()
    }

    #[test]
    fn test_parse_forms() {
        let now = now();
        assert_eq!(parse_timestamp("now", &now).unwrap(), 1_792_067_400.0);
        assert_eq!(parse_timestamp("1792054800.5", &now).unwrap(), 1_792_054_800.5);
        assert_eq!(
            parse_timestamp("2026-10-15 09:00", &now).unwrap(),
            1_792_054_800.0
        );
        assert_eq!(
            parse_timestamp("2026-10-15 09:00:30", &now).unwrap(),
            1_792_054_830.0
        );
        assert_eq!(parse_timestamp("09:00", &now).unwrap(), 1_792_054_800.0);
        assert_eq!(
            parse_timestamp("2026-10-15T11:00:00+02:00", &now).unwrap(),
            1_792_054_800.0
        );
    }

    #[test]
    fn test_local_offset_applies() {
        let tz = FixedOffset::east_opt(2 * 3600).unwrap();
        let now = now().with_timezone(&tz);
        assert_eq!(parse_timestamp("11:00", &now).unwrap(), 1_792_054_800.0);
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(parse_timestamp("yesterday-ish", &now()).is_err());
        assert!(parse_timestamp("25:00", &now()).is_err());
    }
}
