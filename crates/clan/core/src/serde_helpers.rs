use serde::{Deserialize, Deserializer, Serializer};

/// Durations as whole seconds, the unit games configure cooldowns in.
pub mod duration_secs {
    use super::*;
    use std::time::Duration;

    pub fn serialize<S>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde::{Deserialize, Serialize};

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Cooldown {
        #[serde(with = "super::duration_secs")]
        after: Duration,
    }

    #[test]
    fn durations_are_whole_seconds() {
        let json = serde_json::to_string(&Cooldown {
            after: Duration::from_secs(86_400),
        })
        .unwrap();
        assert_eq!(json, r#"{"after":86400}"#);

        let parsed: Cooldown = serde_json::from_str(r#"{"after":30}"#).unwrap();
        assert_eq!(parsed.after, Duration::from_secs(30));
        assert!(serde_json::from_str::<Cooldown>(r#"{"after":-1}"#).is_err());
    }
}
