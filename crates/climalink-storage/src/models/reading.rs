use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One persisted sensor sample.
///
/// Readings are append-only. They are written by the persistence loop and
/// read back newest first for charts.
///
/// # Fields
///
/// * `id` - Auto-increment primary key
/// * `temperature` - Degrees Celsius as reported by the board
/// * `humidity` - Relative humidity in percent
/// * `recorded_at` - When the sample was taken
///
/// # Examples
///
/// ```
/// use climalink_storage::models::Reading;
/// use chrono::Utc;
///
/// let reading = Reading::new(22.5, 48.0, Utc::now());
/// assert_eq!(reading.id, 0);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Reading {
    /// Auto-increment primary key (0 until inserted)
    pub id: i64,

    #[serde(rename = "temp")]
    pub temperature: f64,

    #[serde(rename = "hum")]
    pub humidity: f64,

    #[serde(rename = "time")]
    pub recorded_at: DateTime<Utc>,
}

impl Reading {
    /// Create a reading that has not been stored yet.
    pub fn new(temperature: f64, humidity: f64, recorded_at: DateTime<Utc>) -> Self {
        Self {
            id: 0,
            temperature,
            humidity,
            recorded_at,
        }
    }
}

/// Average of the readings that fall into one fixed time window.
///
/// Windows are aligned to the Unix epoch: a reading taken at `t` seconds
/// belongs to the window starting at `floor(t / interval) * interval`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadingBucket {
    /// Start of the window
    #[serde(rename = "time")]
    pub bucket_start: DateTime<Utc>,

    /// Mean temperature over the window
    #[serde(rename = "temp")]
    pub temperature: f64,

    /// Mean humidity over the window
    #[serde(rename = "hum")]
    pub humidity: f64,

    /// Number of readings averaged
    pub samples: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_new_reading_is_unsaved() {
        let at = Utc.with_ymd_and_hms(2025, 10, 18, 12, 0, 0).unwrap();
        let reading = Reading::new(21.0, 40.0, at);

        assert_eq!(reading.id, 0);
        assert_eq!(reading.recorded_at, at);
    }

    #[test]
    fn test_reading_serializes_for_charts() {
        let at = Utc.with_ymd_and_hms(2025, 10, 18, 12, 0, 0).unwrap();
        let json = serde_json::to_value(Reading::new(21.5, 40.0, at)).unwrap();

        assert_eq!(json["temp"], 21.5);
        assert_eq!(json["hum"], 40.0);
        assert_eq!(json["time"], "2025-10-18T12:00:00Z");
    }
}
