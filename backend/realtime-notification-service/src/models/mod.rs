use crate::error::{AppError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Notification type enumeration
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
    /// Order status changed
    OrderUpdate,
    /// Marketing or promotional message
    Promotion,
    /// System notification
    System,
    /// Review created or answered
    ReviewEvent,
}

impl NotificationType {
    pub const ALL: [NotificationType; 4] = [
        NotificationType::OrderUpdate,
        NotificationType::Promotion,
        NotificationType::System,
        NotificationType::ReviewEvent,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationType::OrderUpdate => "order_update",
            NotificationType::Promotion => "promotion",
            NotificationType::System => "system",
            NotificationType::ReviewEvent => "review_event",
        }
    }
}

impl fmt::Display for NotificationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NotificationType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| {
                AppError::Validation(format!(
                    "type must be one of {}, got {:?}",
                    allowed_list(Self::ALL.iter().map(|t| t.as_str())),
                    s
                ))
            })
    }
}

/// Delivery channel requested by the publisher
///
/// Only `InApp` is executed (as a WebSocket broadcast); the others are recorded.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryChannel {
    InApp,
    Email,
    Sms,
    Push,
}

impl DeliveryChannel {
    pub const ALL: [DeliveryChannel; 4] = [
        DeliveryChannel::InApp,
        DeliveryChannel::Email,
        DeliveryChannel::Sms,
        DeliveryChannel::Push,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryChannel::InApp => "in_app",
            DeliveryChannel::Email => "email",
            DeliveryChannel::Sms => "sms",
            DeliveryChannel::Push => "push",
        }
    }
}

impl fmt::Display for DeliveryChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeliveryChannel {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| {
                AppError::Validation(format!(
                    "channels items must be one of {}, got {:?}",
                    allowed_list(Self::ALL.iter().map(|c| c.as_str())),
                    s
                ))
            })
    }
}

fn allowed_list<'a>(values: impl Iterator<Item = &'a str>) -> String {
    let mut values: Vec<&str> = values.collect();
    values.sort_unstable();
    format!("[{}]", values.join(", "))
}

/// A notification event delivered to stream clients
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Option<String>,
    pub order_id: Option<String>,
    #[serde(rename = "type")]
    pub notification_type: NotificationType,
    pub title: String,
    pub body: Option<String>,
    pub data: Option<Map<String, Value>>,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

/// Publish request payload
///
/// `type` and `channels` stay as raw strings here; the builder owns their
/// validation so the rejection message names the allowed values.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateNotificationRequest {
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub topic: Option<String>,
    #[serde(default)]
    pub order_id: Option<String>,
    #[serde(rename = "type")]
    pub notification_type: String,
    pub title: String,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub data: Option<Map<String, Value>>,
    #[serde(default)]
    pub channels: Option<Vec<String>>,
}

/// Wire form of a notification: its fields plus the optional routing topic
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BroadcastEnvelope {
    #[serde(flatten)]
    pub notification: Notification,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
}

impl BroadcastEnvelope {
    pub fn new(notification: Notification, topic: Option<String>) -> Self {
        Self {
            notification,
            topic: topic.filter(|t| !t.is_empty()),
        }
    }

    pub fn user_id(&self) -> Option<&str> {
        self.notification.user_id.as_deref()
    }

    /// Top-level `topic` wins; otherwise a string `data.topic` is used
    pub fn resolved_topic(&self) -> Option<&str> {
        self.topic
            .as_deref()
            .filter(|t| !t.is_empty())
            .or_else(|| {
                self.notification
                    .data
                    .as_ref()
                    .and_then(|data| data.get("topic"))
                    .and_then(Value::as_str)
            })
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Body of a `202 Accepted` publish response
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PublishAccepted {
    pub status: String,
    pub id: Uuid,
}

impl PublishAccepted {
    pub fn new(id: Uuid) -> Self {
        Self {
            status: "accepted".to_string(),
            id,
        }
    }
}
