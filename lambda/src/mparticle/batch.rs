//! mParticle server-to-server v2 upload body.
//!
//! Only the subset of the `Batch` schema this function produces is modelled.
//! Empty fields are left out of the JSON entirely.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchEnvironment {
    #[default]
    Development,
    Production,
}

impl FromStr for BatchEnvironment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" => Ok(Self::Development),
            "production" => Ok(Self::Production),
            _ => Err(s.to_string()),
        }
    }
}

impl fmt::Display for BatchEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Development => write!(f, "development"),
            Self::Production => write!(f, "production"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Batch {
    pub environment: BatchEnvironment,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_identities: Option<UserIdentities>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mpid: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp_unixtime_ms: Option<i64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub events: Vec<CustomEvent>,
}

impl Batch {
    #[must_use]
    pub fn new(environment: BatchEnvironment) -> Self {
        Self {
            environment,
            user_identities: None,
            mpid: None,
            timestamp_unixtime_ms: None,
            events: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentities {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// A `custom_event` entry of the batch's `events` array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomEvent {
    pub event_type: EventKind,
    pub data: CustomEventData,
}

impl CustomEvent {
    #[must_use]
    pub fn new(data: CustomEventData) -> Self {
        Self {
            event_type: EventKind::CustomEvent,
            data,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    CustomEvent,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomEventData {
    pub event_name: String,
    pub custom_event_type: CustomEventType,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub custom_attributes: HashMap<String, String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CustomEventType {
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
