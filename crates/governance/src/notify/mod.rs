mod broker;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

pub use broker::{NotificationBroker, NotificationStream};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewNotification {
    pub recipient_id: Uuid,
    pub message: String,
    pub acting_user_id: Uuid,
    pub deadline: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    pub recipient_id: Uuid,
    pub message: String,
    pub acting_user_id: Uuid,
    pub deadline: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("no subscriber is listening for user {0}")]
    NoSubscribers(Uuid),
    #[error("notification delivery failed: {0}")]
    Delivery(String),
}

/// Fire-and-forget delivery. Callers log failures and carry on.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn create(&self, notification: NewNotification) -> Result<Notification, NotificationError>;
}
