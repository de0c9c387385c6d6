use serde::{Deserialize, Serialize};
use serde_json::Value;

// Body for POST / in the usage variant. Only the key is typed; the rest is
// stored as sent, with missing or null fields defaulted.
#[derive(Debug, Deserialize)]
pub struct UsageReport {
    pub battery_uuid: String,
    pub battery_usage: Option<Value>,
    pub battery_usage_count: Option<Value>,
    pub total_time_used: Option<Value>,
    pub total_percentage_used: Option<Value>,
}

// Body for POST / in the tag variant
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TagReport {
    pub name: String,
    pub uid: Option<Value>,
    pub usage_count: Option<Value>,
    pub total_time: Option<Value>,
    pub total_time_formatted: Option<Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Created,
    Updated,
}

// Envelope returned by POST / for both outcomes
#[derive(Debug, Serialize)]
pub struct SubmitResp {
    pub status: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<Action>,
}

impl SubmitResp {
    pub fn logged(action: Action) -> Self {
        Self {
            status: "success",
            message: "Data logged successfully".into(),
            action: Some(action),
        }
    }

    pub fn failed(message: String) -> Self {
        Self {
            status: "error",
            message,
            action: None,
        }
    }
}

/// Query of GET /. Built from raw pairs so a malformed or repeated query
/// never turns into a rejection.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct StatusQuery {
    pub action: Option<String>,
}

impl StatusQuery {
    /// Repeated `action` values only count when they all agree.
    pub fn from_pairs(pairs: &[(String, String)]) -> Self {
        let mut actions = pairs.iter().filter(|(k, _)| k == "action").map(|(_, v)| v);
        let action = actions
            .next()
            .filter(|first| actions.all(|v| v == *first))
            .cloned();
        Self { action }
    }
}

#[derive(Debug, Serialize)]
pub struct OnlineResp {
    pub status: &'static str,
    pub message: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Health {
    Good,
    Warning,
    Critical,
}

impl Health {
    pub const WARNING_AT: i64 = 20;
    pub const CRITICAL_AT: i64 = 40;

    pub fn from_usage(count: i64) -> Self {
        if count < Self::WARNING_AT {
            Health::Good
        } else if count < Self::CRITICAL_AT {
            Health::Warning
        } else {
            Health::Critical
        }
    }
}

// One entry of GET /?action=list
#[derive(Debug, Serialize)]
pub struct BatterySummary {
    pub id: String,
    pub usage_count: i64,
    pub health: Health,
    pub last_updated: String,
}
