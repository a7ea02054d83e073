//! Session-time encodings used by LMS runtimes.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum TimeFormatError {
    #[error("time value is empty")]
    Empty,

    #[error("expected HHHH:MM:SS, got {0:?}")]
    Clock(String),

    #[error("expected an ISO 8601 duration such as PT1H2M3S, got {0:?}")]
    Duration(String),
}

/// Wire format of a duration in the session store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeFormat {
    /// `HHHH:MM:SS`, hours at least four digits wide.
    Clock,
    /// `PTnHnMnS`.
    Iso8601,
}

impl TimeFormat {
    #[must_use]
    pub fn encode(self, seconds: u64) -> String {
        let hours = seconds / 3600;
        let minutes = (seconds % 3600) / 60;
        let rest = seconds % 60;
        match self {
            TimeFormat::Clock => format!("{hours:04}:{minutes:02}:{rest:02}"),
            TimeFormat::Iso8601 => format!("PT{hours:04}H{minutes:02}M{rest:02}S"),
        }
    }

    /// Decode to whole seconds; fractional seconds are truncated.
    ///
    /// # Errors
    ///
    /// Returns `TimeFormatError` if the value does not follow this format.
    pub fn decode(self, raw: &str) -> Result<u64, TimeFormatError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(TimeFormatError::Empty);
        }
        match self {
            TimeFormat::Clock => decode_clock(raw),
            TimeFormat::Iso8601 => decode_iso(raw),
        }
    }
}

fn whole_seconds(raw: &str) -> Option<u64> {
    let whole = raw.split_once('.').map_or(raw, |(whole, _)| whole);
    if whole.is_empty() {
        return Some(0);
    }
    whole.parse().ok()
}

fn decode_clock(raw: &str) -> Result<u64, TimeFormatError> {
    let invalid = || TimeFormatError::Clock(raw.to_owned());
    let mut parts = raw.split(':');
    let (Some(hours), Some(minutes), Some(seconds), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(invalid());
    };
    let hours: u64 = hours.parse().map_err(|_| invalid())?;
    let minutes: u64 = minutes.parse().map_err(|_| invalid())?;
    let seconds = whole_seconds(seconds).ok_or_else(invalid)?;
    hours
        .checked_mul(3600)
        .and_then(|total| total.checked_add(minutes.checked_mul(60)?))
        .and_then(|total| total.checked_add(seconds))
        .ok_or_else(invalid)
}

fn decode_iso(raw: &str) -> Result<u64, TimeFormatError> {
    let invalid = || TimeFormatError::Duration(raw.to_owned());
    let body = raw.strip_prefix('P').ok_or_else(invalid)?;
    let (date_part, time_part) = body.split_once('T').unwrap_or((body, ""));

    let scaled = |value: &str, unit: u64| {
        value
            .parse::<u64>()
            .ok()
            .and_then(|value| value.checked_mul(unit))
    };

    let mut total = 0_u64;
    for (value, designator) in components(date_part).ok_or_else(invalid)? {
        let seconds = match designator {
            'D' => scaled(value, 86_400),
            'W' => scaled(value, 604_800),
            _ => None,
        };
        total = seconds.and_then(|s| total.checked_add(s)).ok_or_else(invalid)?;
    }
    for (value, designator) in components(time_part).ok_or_else(invalid)? {
        let seconds = match designator {
            'H' => scaled(value, 3600),
            'M' => scaled(value, 60),
            'S' => whole_seconds(value),
            _ => None,
        };
        total = seconds.and_then(|s| total.checked_add(s)).ok_or_else(invalid)?;
    }
    Ok(total)
}

/// Split `"12H3M4.5S"` into `[("12", 'H'), ("3", 'M'), ("4.5", 'S')]`.
fn components(raw: &str) -> Option<Vec<(&str, char)>> {
    let mut out = Vec::new();
    let mut start = 0;
    for (index, ch) in raw.char_indices() {
        if ch.is_ascii_digit() || ch == '.' {
            continue;
        }
        let value = &raw[start..index];
        if value.is_empty() {
            return None;
        }
        out.push((value, ch));
        start = index + ch.len_utf8();
    }
    if start != raw.len() {
        return None;
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_fixed_width_fields() {
        assert_eq!(TimeFormat::Clock.encode(0), "0000:00:00");
        assert_eq!(TimeFormat::Clock.encode(3723), "0001:02:03");
        assert_eq!(TimeFormat::Iso8601.encode(3723), "PT0001H02M03S");
        assert_eq!(TimeFormat::Iso8601.encode(59), "PT0000H00M59S");
    }

    #[test]
    fn hours_grow_past_four_digits() {
        let seconds = 10_000 * 3600 + 1;
        assert_eq!(TimeFormat::Clock.encode(seconds), "10000:00:01");
        assert_eq!(TimeFormat::Clock.decode("10000:00:01"), Ok(seconds));
    }

    #[test]
    fn round_trips_under_both_formats() {
        let samples = [0, 1, 59, 60, 61, 3599, 3600, 3661, 86_399, 86_400, 1_234_567];
        for format in [TimeFormat::Clock, TimeFormat::Iso8601] {
            for seconds in samples.into_iter().chain(0..200) {
                assert_eq!(format.decode(&format.encode(seconds)), Ok(seconds));
            }
        }
    }

    #[test]
    fn decodes_values_written_by_other_runtimes() {
        assert_eq!(TimeFormat::Clock.decode("0000:01:05.75"), Ok(65));
        assert_eq!(TimeFormat::Iso8601.decode("PT1H30M"), Ok(5400));
        assert_eq!(TimeFormat::Iso8601.decode("PT45.2S"), Ok(45));
        assert_eq!(TimeFormat::Iso8601.decode("P1DT1S"), Ok(86_401));
        assert_eq!(TimeFormat::Iso8601.decode("PT0S"), Ok(0));
    }

    #[test]
    fn rejects_malformed_values() {
        assert_eq!(TimeFormat::Clock.decode(""), Err(TimeFormatError::Empty));
        assert!(TimeFormat::Clock.decode("01:02").is_err());
        assert!(TimeFormat::Clock.decode("a:b:c").is_err());
        assert!(TimeFormat::Iso8601.decode("1H").is_err());
        assert!(TimeFormat::Iso8601.decode("PTH").is_err());
        assert!(TimeFormat::Iso8601.decode("PT5X").is_err());
        assert!(TimeFormat::Iso8601.decode("PT12").is_err());
    }

    #[test]
    fn out_of_range_values_are_errors() {
        assert_eq!(
            TimeFormat::Clock.decode("18446744073709551615:00:00"),
            Err(TimeFormatError::Clock("18446744073709551615:00:00".into()))
        );
        assert!(TimeFormat::Clock.decode("0:18446744073709551615:00").is_err());
        assert_eq!(
            TimeFormat::Iso8601.decode("PT18446744073709551615H"),
            Err(TimeFormatError::Duration("PT18446744073709551615H".into()))
        );
        assert!(TimeFormat::Iso8601.decode("P18446744073709551615W").is_err());
        assert!(TimeFormat::Iso8601.decode("PT18446744073709551615S1S").is_err());

        // The largest encodable total still decodes.
        let max = TimeFormat::Clock.encode(u64::MAX);
        assert_eq!(TimeFormat::Clock.decode(&max), Ok(u64::MAX));
    }
}
