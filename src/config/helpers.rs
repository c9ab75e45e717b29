use serde::{Deserialize, Deserializer, Serializer};
use std::time::Duration;

/// Custom deserializer for Duration from milliseconds
pub fn deserialize_duration_from_ms<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let ms = u64::deserialize(deserializer)?;
    Ok(Duration::from_millis(ms))
}

/// Custom serializer for Duration to milliseconds
pub fn serialize_duration_to_ms<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_u64(duration.as_millis() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Serialize;

    #[derive(Debug, Deserialize, Serialize, PartialEq)]
    struct TestDurationMs {
        #[serde(
            deserialize_with = "deserialize_duration_from_ms",
            serialize_with = "serialize_duration_to_ms"
        )]
        duration: Duration,
    }

    #[test]
    fn test_duration_from_ms_round_trip() {
        let parsed: TestDurationMs = serde_json::from_str(r#"{"duration": 1500}"#).unwrap();
        assert_eq!(parsed.duration, Duration::from_millis(1500));

        let json = serde_json::to_string(&parsed).unwrap();
        assert_eq!(json, r#"{"duration":1500}"#);
    }

    #[test]
    fn test_duration_from_ms_rejects_negative() {
        let parsed: Result<TestDurationMs, _> = serde_json::from_str(r#"{"duration": -1}"#);
        assert!(parsed.is_err());
    }
}
