//! UTC offset of a named timezone at a given instant.

use chrono::{DateTime, Offset, TimeZone};
use chrono_tz::Tz;

/// Seconds east of UTC for the IANA zone `tz_name` at unix time `start`.
///
/// Returns 0 when either input is missing, the zone name is unknown, or the
/// timestamp cannot be represented. A `start` of 0 counts as missing.
pub fn offset_seconds(tz_name: Option<&str>, start: Option<i64>) -> i32 {
    let Some(name) = tz_name.map(str::trim).filter(|n| !n.is_empty()) else {
        return 0;
    };
    let Some(start) = start.filter(|s| *s != 0) else {
        return 0;
    };
    let Ok(zone) = name.parse::<Tz>() else {
        return 0;
    };
    let Some(instant) = DateTime::from_timestamp(start, 0) else {
        return 0;
    };
    zone.offset_from_utc_datetime(&instant.naive_utc())
        .fix()
        .local_minus_utc()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn unix(y: i32, m: u32, d: u32) -> i64 {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
            .and_utc()
            .timestamp()
    }

    #[test]
    fn missing_inputs_fall_back_to_zero() {
        assert_eq!(offset_seconds(None, Some(unix(2024, 1, 15))), 0);
        assert_eq!(offset_seconds(Some("America/New_York"), None), 0);
        assert_eq!(offset_seconds(Some(""), Some(unix(2024, 1, 15))), 0);
        assert_eq!(offset_seconds(Some("America/New_York"), Some(0)), 0);
    }

    #[test]
    fn unknown_zone_falls_back_to_zero() {
        assert_eq!(offset_seconds(Some("Mars/Olympus"), Some(unix(2024, 1, 15))), 0);
    }

    #[test]
    fn us_zone_observes_dst() {
        let winter = offset_seconds(Some("America/New_York"), Some(unix(2024, 1, 15)));
        let summer = offset_seconds(Some("America/New_York"), Some(unix(2024, 7, 15)));
        assert_eq!(winter, -5 * 3600);
        assert_eq!(summer, -4 * 3600);
    }

    #[test]
    fn european_zone() {
        assert_eq!(offset_seconds(Some("Europe/Rome"), Some(unix(2023, 6, 1))), 7200);
        assert_eq!(offset_seconds(Some("Europe/Rome"), Some(unix(2023, 12, 1))), 3600);
    }

    #[test]
    fn fractional_hour_zone() {
        assert_eq!(
            offset_seconds(Some("Asia/Kolkata"), Some(unix(2024, 3, 1))),
            5 * 3600 + 1800
        );
    }

    #[test]
    fn name_is_trimmed() {
        assert_eq!(offset_seconds(Some(" UTC "), Some(unix(2024, 3, 1))), 0);
        assert_eq!(
            offset_seconds(Some(" Asia/Tokyo "), Some(unix(2024, 3, 1))),
            9 * 3600
        );
    }
}
