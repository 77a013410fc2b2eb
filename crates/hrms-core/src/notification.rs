//! In-session notification events
//!
//! Notifications are best-effort signals for the UI layer. They are never
//! persisted and carry no delivery guarantee.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::workflow::Role;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum NotificationType {
    Assignment,
    Approval,
    Rejection,
    Completion,
}

impl NotificationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Assignment => "assignment",
            Self::Approval => "approval",
            Self::Rejection => "rejection",
            Self::Completion => "completion",
        }
    }
}

impl fmt::Display for NotificationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NotificationEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub notification_type: NotificationType,
    pub workflow_id: String,
    pub recipient_role: Role,
    pub title: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
    pub read: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub read_at: Option<DateTime<Utc>>,
}

impl NotificationEvent {
    pub fn new(
        notification_type: NotificationType,
        workflow_id: impl Into<String>,
        recipient_role: Role,
        title: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            notification_type,
            workflow_id: workflow_id.into(),
            recipient_role,
            title: title.into(),
            message: message.into(),
            created_at: Utc::now(),
            read: false,
            read_at: None,
        }
    }

    pub fn mark_read(&mut self) {
        if !self.read {
            self.read = true;
            self.read_at = Some(Utc::now());
        }
    }
}
