//! Strongly-typed identifiers for chime

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for a timer instance
///
/// Carried in log fields so concurrent timers can be told apart; never
/// interpreted by the scheduler itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimerId(Uuid);

impl TimerId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for TimerId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TimerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timer_id_uniqueness() {
        let a = TimerId::new();
        let b = TimerId::new();
        assert_ne!(a, b);
    }

    #[test]
    fn timer_id_serialize_deserialize() {
        let id = TimerId::new();
        let json = serde_json::to_string(&id).unwrap();
        let parsed: TimerId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, parsed);
    }
}
