//! Hub runtime configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{feed::DEFAULT_HISTORY, settings::DEFAULT_PORT};

/// Runtime knobs of a hub instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HubConfig {
    /// Port the hub is listening on, reported back to the console.
    pub listen_port: u16,

    /// How long shutdown waits for close handlers before exiting.
    #[serde(with = "millis")]
    pub shutdown_grace: Duration,

    /// Upper bound on a single outbound dial.
    #[serde(with = "millis")]
    pub dial_timeout: Duration,

    /// Notifications kept for console replay.
    pub feed_history: usize,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            listen_port: DEFAULT_PORT,
            shutdown_grace: Duration::from_millis(100),
            dial_timeout: Duration::from_secs(5),
            feed_history: DEFAULT_HISTORY,
        }
    }
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(u64::try_from(value.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
