use std::collections::HashMap;

use chrono::{DateTime, NaiveDateTime, TimeZone};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::errors::ProcessError;
use crate::mparticle::batch::{
    Batch, BatchEnvironment, CustomEvent, CustomEventData, CustomEventType, UserIdentities,
};

/// Body of a record on the outgoing queue. Unknown fields are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutgoingMessage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authentication_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authentication_secret: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_email: Option<String>,
    /// Hexadecimal mParticle id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_mp_id: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub events: Vec<Event>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(rename = "apiURL", default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub event_name: EventName,
    pub event_type: EventType,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub additional_data: HashMap<String, String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventName {
    EmailSubscribe,
    EmailUnsubscribe,
}

impl EventName {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::EmailSubscribe => "EMAIL_SUBSCRIBE",
            Self::EmailUnsubscribe => "EMAIL_UNSUBSCRIBE",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventType {
    Navigation,
    Location,
    Search,
    Transaction,
    UserContent,
    UserPreference,
    Social,
    Other,
    Media,
}

impl From<EventType> for CustomEventType {
    fn from(value: EventType) -> Self {
        match value {
            EventType::Navigation => Self::Navigation,
            EventType::Location => Self::Location,
            EventType::Search => Self::Search,
            EventType::Transaction => Self::Transaction,
            EventType::UserContent => Self::UserContent,
            EventType::UserPreference => Self::UserPreference,
            EventType::Social => Self::Social,
            EventType::Other => Self::Other,
            EventType::Media => Self::Media,
        }
    }
}

impl OutgoingMessage {
    /// Best identifier of the profile for log lines: the mpid, else the email.
    #[must_use]
    pub fn profile_label(&self) -> &str {
        self.profile_mp_id
            .as_deref()
            .or(self.profile_email.as_deref())
            .unwrap_or("")
    }

    /// Translate into the mParticle upload body.
    ///
    /// # Errors
    ///
    /// Returns `UnparseablePayload` when `profileMpId` is not a hexadecimal u64.
    pub fn to_batch(&self, environment: BatchEnvironment) -> Result<Batch, ProcessError> {
        let mut batch = Batch::new(environment);

        if let Some(email) = self.profile_email.as_ref().filter(|e| !e.is_empty()) {
            batch.user_identities = Some(UserIdentities {
                email: Some(email.clone()),
            });
        }

        if let Some(mp_id) = self.profile_mp_id.as_deref().filter(|id| !id.is_empty()) {
            let unsigned = u64::from_str_radix(mp_id, 16).map_err(|e| {
                ProcessError::UnparseablePayload(format!("Invalid profileMpId {mp_id}: {e}"))
            })?;
            // mParticle ids are signed 64-bit; keep the bit pattern
            #[allow(clippy::cast_possible_wrap)]
            let signed = unsigned as i64;
            batch.mpid = Some(signed);
        }

        batch.timestamp_unixtime_ms = self.timestamp.as_deref().and_then(parse_timestamp);

        batch.events = self
            .events
            .iter()
            .map(|event| {
                CustomEvent::new(CustomEventData {
                    event_name: event.event_name.as_str().to_string(),
                    custom_event_type: event.event_type.into(),
                    custom_attributes: event.additional_data.clone(),
                })
            })
            .collect();

        Ok(batch)
    }
}

/// Milliseconds since the epoch for an ISO-8601 date-time.
///
/// Accepts an offset, a bracketed region id, or both (`2024-05-03T14:00+02:00[Europe/Paris]`).
/// Seconds and fractions are optional. The offset wins when both are present.
fn parse_timestamp(timestamp: &str) -> Option<i64> {
    if timestamp.is_empty() {
        return None;
    }

    let (date_time, zone) = match timestamp.find('[') {
        Some(idx) if timestamp.ends_with(']') => (
            &timestamp[..idx],
            Some(&timestamp[idx + 1..timestamp.len() - 1]),
        ),
        _ => (timestamp, None),
    };

    let millis = parse_with_offset(date_time)
        .or_else(|| zone.and_then(|zone| parse_in_region(date_time, zone)));
    if millis.is_none() {
        warn!("Failed to parse timestamp: {}", timestamp);
    }
    millis
}

fn parse_with_offset(date_time: &str) -> Option<i64> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(date_time) {
        return Some(dt.timestamp_millis());
    }

    let with_numeric_offset = match date_time.strip_suffix(['Z', 'z']) {
        Some(local) => format!("{local}+00:00"),
        None => date_time.to_string(),
    };
    DateTime::parse_from_str(&with_numeric_offset, "%Y-%m-%dT%H:%M%:z")
        .ok()
        .map(|dt| dt.timestamp_millis())
}

fn parse_in_region(date_time: &str, zone: &str) -> Option<i64> {
    let tz: Tz = zone.parse().ok()?;
    let local = NaiveDateTime::parse_from_str(date_time, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(date_time, "%Y-%m-%dT%H:%M"))
        .ok()?;
    // in a DST overlap take the earlier instant
    tz.from_local_datetime(&local)
        .earliest()
        .map(|dt| dt.timestamp_millis())
}
