use crate::utils::error::{PvError, Result};
use chrono::{DateTime, FixedOffset, NaiveDateTime, Offset, TimeZone, Utc};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Location {
    pub name: String,
    /// Degrees, north positive.
    pub latitude: f64,
    /// Degrees, east positive.
    pub longitude: f64,
    /// Metres above sea level.
    pub altitude: f64,
    #[serde(serialize_with = "serialize_offset")]
    pub utc_offset: FixedOffset,
}

fn serialize_offset<S: serde::Serializer>(offset: &FixedOffset, s: S) -> std::result::Result<S::Ok, S::Error> {
    s.serialize_str(&offset.to_string())
}

impl Location {
    pub fn new(name: impl Into<String>, latitude: f64, longitude: f64) -> Self {
        Self {
            name: name.into(),
            latitude,
            longitude,
            altitude: 0.0,
            utc_offset: Utc.fix(),
        }
    }

    pub fn with_altitude(mut self, altitude: f64) -> Self {
        self.altitude = altitude;
        self
    }

    pub fn with_utc_offset(mut self, offset: FixedOffset) -> Self {
        self.utc_offset = offset;
        self
    }

    /// Interpret a wall-clock time at this location.
    pub fn localize(&self, naive: NaiveDateTime) -> Result<DateTime<Utc>> {
        self.utc_offset
            .from_local_datetime(&naive)
            .single()
            .map(|t| t.with_timezone(&Utc))
            .ok_or_else(|| PvError::InvalidTimestamp {
                value: naive.to_string(),
                reason: format!("not representable at offset {}", self.utc_offset),
            })
    }
}

/// `UTC`, `Z`, `+01:00`, `-0330` or a bare hour count such as `+10`.
pub fn parse_utc_offset(value: &str) -> Result<FixedOffset> {
    let invalid = || PvError::InvalidConfigValueError {
        field: "utc_offset".to_string(),
        value: value.to_string(),
        reason: "Expected UTC or a fixed offset like +01:00".to_string(),
    };
    let v = value.trim();
    if v.eq_ignore_ascii_case("utc") || v == "Z" {
        return FixedOffset::east_opt(0).ok_or_else(invalid);
    }

    let (sign, rest) = match v.as_bytes().first() {
        Some(b'+') => (1, &v[1..]),
        Some(b'-') => (-1, &v[1..]),
        _ => return Err(invalid()),
    };
    let digits: String = rest.chars().filter(|c| *c != ':').collect();
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(invalid());
    }
    let (hours, minutes) = match digits.len() {
        1 | 2 => (digits.parse::<i32>().map_err(|_| invalid())?, 0),
        4 => (
            digits[..2].parse::<i32>().map_err(|_| invalid())?,
            digits[2..].parse::<i32>().map_err(|_| invalid())?,
        ),
        _ => return Err(invalid()),
    };
    if minutes >= 60 {
        return Err(invalid());
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60)).ok_or_else(invalid)
}
