//! Cross-device sync messages and their payload codec
//!
//! A payload is a JSON object whose keys name the message kind. Payloads
//! may carry several messages at once; unknown keys are ignored and a known
//! key with an ill-typed value is skipped, never fatal.
//!
//! | Key                    | Value                                              |
//! |------------------------|----------------------------------------------------|
//! | `stepsGoal`            | non-negative integer                               |
//! | `goalNotificationSent` | `YYYY-MM-DD`                                       |
//! | `stepsdataresponse`    | `{ "stepsCacheDay": "YYYY-MM-DD", "stepsCacheValue": n }` |

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use super::errors::DomainError;
use super::newtypes::{steps_from_i64, DayKey, GoalValue};
use super::steps::StepsRecord;

pub const KEY_STEPS_GOAL: &str = "stepsGoal";
pub const KEY_GOAL_NOTIFICATION_SENT: &str = "goalNotificationSent";
pub const KEY_STEPS_DATA: &str = "stepsdataresponse";
pub const KEY_CACHE_DAY: &str = "stepsCacheDay";
pub const KEY_CACHE_VALUE: &str = "stepsCacheValue";

/// How a message travels over the paired-device link
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Delivery {
    /// Immediate, best-effort; dropped when the counterpart is unreachable
    Interactive,
    /// Queued until the counterpart can be reached
    Background,
}

impl std::fmt::Display for Delivery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Delivery::Interactive => write!(f, "interactive"),
            Delivery::Background => write!(f, "background"),
        }
    }
}

/// A message exchanged between paired devices
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncMessage {
    /// The shared daily goal changed
    StepsGoalUpdate { goal: GoalValue },
    /// The counterpart already fired the goal notification for `day`
    GoalNotificationSent { day: DayKey },
    /// The counterpart's freshest step count for `day`
    StepsDataSnapshot { day: DayKey, steps: u32 },
}

impl SyncMessage {
    /// Snapshot message for a cached record
    pub fn snapshot(record: &StepsRecord) -> Self {
        SyncMessage::StepsDataSnapshot {
            day: record.day,
            steps: record.steps,
        }
    }

    /// Short name used in logs
    pub fn kind(&self) -> &'static str {
        match self {
            SyncMessage::StepsGoalUpdate { .. } => "steps_goal_update",
            SyncMessage::GoalNotificationSent { .. } => "goal_notification_sent",
            SyncMessage::StepsDataSnapshot { .. } => "steps_data_snapshot",
        }
    }

    /// Wire key and value for this message
    fn to_entry(self) -> (&'static str, Value) {
        match self {
            SyncMessage::StepsGoalUpdate { goal } => (KEY_STEPS_GOAL, json!(goal.steps())),
            SyncMessage::GoalNotificationSent { day } => {
                (KEY_GOAL_NOTIFICATION_SENT, json!(day.to_string()))
            }
            SyncMessage::StepsDataSnapshot { day, steps } => (
                KEY_STEPS_DATA,
                json!({
                    KEY_CACHE_DAY: day.to_string(),
                    KEY_CACHE_VALUE: steps,
                }),
            ),
        }
    }

    /// Encodes this message as a single-entry payload object
    pub fn to_payload(&self) -> Value {
        encode_payload(std::slice::from_ref(self))
    }
}

/// Encodes messages into one payload object
///
/// Messages of the same kind overwrite each other; the last one wins.
pub fn encode_payload(messages: &[SyncMessage]) -> Value {
    let mut map = Map::new();
    for message in messages {
        let (key, value) = message.to_entry();
        map.insert(key.to_string(), value);
    }
    Value::Object(map)
}

/// Result of decoding a payload object
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecodedPayload {
    /// Messages recognised in the payload
    pub messages: Vec<SyncMessage>,
    /// Known keys whose values could not be decoded, with the reason
    pub skipped: Vec<String>,
}

/// Decodes a payload object into typed messages
///
/// # Errors
///
/// Returns `DomainError::InvalidPayload` only when `payload` is not a JSON
/// object. Problems with individual entries are reported in
/// [`DecodedPayload::skipped`].
pub fn decode_payload(payload: &Value) -> Result<DecodedPayload, DomainError> {
    let map = payload
        .as_object()
        .ok_or_else(|| DomainError::InvalidPayload(format!("expected object, got {payload}")))?;

    let mut decoded = DecodedPayload::default();
    for (key, value) in map {
        let result = match key.as_str() {
            KEY_STEPS_GOAL => decode_goal(value),
            KEY_GOAL_NOTIFICATION_SENT => decode_notification_sent(value),
            KEY_STEPS_DATA => decode_snapshot(value),
            _ => continue,
        };
        match result {
            Ok(message) => decoded.messages.push(message),
            Err(e) => decoded.skipped.push(format!("{key}: {e}")),
        }
    }
    Ok(decoded)
}

fn decode_goal(value: &Value) -> Result<SyncMessage, DomainError> {
    let raw = value
        .as_i64()
        .ok_or_else(|| DomainError::InvalidGoal(value.to_string()))?;
    Ok(SyncMessage::StepsGoalUpdate {
        goal: GoalValue::try_from(raw)?,
    })
}

fn decode_notification_sent(value: &Value) -> Result<SyncMessage, DomainError> {
    let raw = value
        .as_str()
        .ok_or_else(|| DomainError::InvalidDayKey(value.to_string()))?;
    Ok(SyncMessage::GoalNotificationSent { day: raw.parse()? })
}

fn decode_snapshot(value: &Value) -> Result<SyncMessage, DomainError> {
    let day = value
        .get(KEY_CACHE_DAY)
        .and_then(Value::as_str)
        .ok_or_else(|| DomainError::InvalidPayload(format!("missing {KEY_CACHE_DAY}")))?
        .parse()?;
    let raw_steps = value
        .get(KEY_CACHE_VALUE)
        .and_then(Value::as_i64)
        .ok_or_else(|| DomainError::InvalidPayload(format!("missing {KEY_CACHE_VALUE}")))?;
    Ok(SyncMessage::StepsDataSnapshot {
        day,
        steps: steps_from_i64(raw_steps)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day() -> DayKey {
        DayKey::from_ymd(2024, 6, 1).unwrap()
    }

    #[test]
    fn test_snapshot_payload_shape() {
        let payload = SyncMessage::StepsDataSnapshot {
            day: day(),
            steps: 4200,
        }
        .to_payload();
        assert_eq!(
            payload,
            json!({"stepsdataresponse": {"stepsCacheDay": "2024-06-01", "stepsCacheValue": 4200}})
        );
    }

    #[test]
    fn test_goal_and_flag_payload_shape() {
        let payload = encode_payload(&[
            SyncMessage::StepsGoalUpdate {
                goal: GoalValue::new(8000),
            },
            SyncMessage::GoalNotificationSent { day: day() },
        ]);
        assert_eq!(
            payload,
            json!({"stepsGoal": 8000, "goalNotificationSent": "2024-06-01"})
        );
    }

    #[test]
    fn test_decode_ignores_unknown_keys() {
        let decoded = decode_payload(&json!({
            "stepsGoal": 12000,
            "complicationTint": "blue",
        }))
        .unwrap();
        assert_eq!(
            decoded.messages,
            vec![SyncMessage::StepsGoalUpdate {
                goal: GoalValue::new(12000)
            }]
        );
        assert!(decoded.skipped.is_empty());
    }

    #[test]
    fn test_decode_skips_ill_typed_values() {
        let decoded = decode_payload(&json!({
            "stepsGoal": "lots",
            "goalNotificationSent": 20240601,
            "stepsdataresponse": {"stepsCacheDay": "2024-06-01", "stepsCacheValue": -4},
        }))
        .unwrap();
        assert!(decoded.messages.is_empty());
        assert_eq!(decoded.skipped.len(), 3);
    }

    #[test]
    fn test_decode_snapshot_requires_both_fields() {
        let decoded = decode_payload(&json!({
            "stepsdataresponse": {"stepsCacheValue": 10}
        }))
        .unwrap();
        assert!(decoded.messages.is_empty());
        assert!(decoded.skipped[0].contains("stepsCacheDay"));
    }

    #[test]
    fn test_decode_rejects_non_object() {
        assert!(matches!(
            decode_payload(&json!([1, 2, 3])),
            Err(DomainError::InvalidPayload(_))
        ));
    }

    #[test]
    fn test_decode_multiple_messages() {
        let decoded = decode_payload(&json!({
            "goalNotificationSent": "2024-06-01",
            "stepsdataresponse": {"stepsCacheDay": "2024-06-01", "stepsCacheValue": 10500},
        }))
        .unwrap();
        assert_eq!(decoded.messages.len(), 2);
        assert!(decoded
            .messages
            .contains(&SyncMessage::GoalNotificationSent { day: day() }));
        assert!(decoded.messages.contains(&SyncMessage::StepsDataSnapshot {
            day: day(),
            steps: 10500
        }));
    }

    #[test]
    fn test_delivery_serde() {
        assert_eq!(
            serde_json::to_string(&Delivery::Background).unwrap(),
            "\"background\""
        );
        assert_eq!(Delivery::Interactive.to_string(), "interactive");
    }
}
