use std::{
    hash::{Hash, Hasher},
    pin::Pin,
    sync::Arc,
};

use async_trait::async_trait;
use chrono::Utc;
use futures::{Stream, StreamExt, future};
use tokio::sync::broadcast;
use tokio_stream::wrappers::{BroadcastStream, errors::BroadcastStreamRecvError};
use uuid::Uuid;

use super::{NewNotification, Notification, NotificationError, NotificationSink};

pub type NotificationStream =
    Pin<Box<dyn Stream<Item = Result<Notification, BroadcastStreamRecvError>> + Send + 'static>>;

#[derive(Clone)]
pub struct NotificationBroker {
    shards: Arc<Vec<broadcast::Sender<Notification>>>,
}

impl NotificationBroker {
    /// Shard broadcast senders to keep busy recipients from evicting everyone else's notifications.
    pub fn new(shard_count: usize, shard_capacity: usize) -> Self {
        let shard_count = shard_count.max(1);
        let shard_capacity = shard_capacity.max(1);
        let shards = (0..shard_count)
            .map(|_| {
                let (sender, _receiver) = broadcast::channel(shard_capacity);
                sender
            })
            .collect();

        Self {
            shards: Arc::new(shards),
        }
    }

    pub fn subscribe(&self, recipient_id: Uuid) -> NotificationStream {
        let index = self.shard_index(recipient_id);
        let receiver = self.shards[index].subscribe();

        let stream = BroadcastStream::new(receiver).filter_map(move |item| {
            future::ready(match item {
                Ok(notification) if notification.recipient_id == recipient_id => {
                    Some(Ok(notification))
                }
                Ok(_) => None,
                Err(err) => Some(Err(err)),
            })
        });

        Box::pin(stream)
    }

    pub fn publish(&self, notification: Notification) -> Result<(), NotificationError> {
        let recipient_id = notification.recipient_id;
        let index = self.shard_index(recipient_id);
        self.shards[index]
            .send(notification)
            .map(|_| ())
            .map_err(|_| NotificationError::NoSubscribers(recipient_id))
    }

    fn shard_index(&self, recipient_id: Uuid) -> usize {
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        recipient_id.hash(&mut hasher);
        (hasher.finish() as usize) % self.shards.len()
    }
}

impl Default for NotificationBroker {
    fn default() -> Self {
        Self::new(16, 512)
    }
}

#[async_trait]
impl NotificationSink for NotificationBroker {
    async fn create(&self, notification: NewNotification) -> Result<Notification, NotificationError> {
        let notification = Notification {
            id: Uuid::new_v4(),
            recipient_id: notification.recipient_id,
            message: notification.message,
            acting_user_id: notification.acting_user_id,
            deadline: notification.deadline,
            created_at: Utc::now(),
        };
        self.publish(notification.clone())?;
        Ok(notification)
    }
}
