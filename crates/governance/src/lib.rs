pub mod api;
pub mod authz;
pub mod clock;
pub mod config;
pub mod db;
pub mod error;
pub mod lifecycle;
pub mod notify;
pub mod recurrence;
pub mod time;

use std::sync::Arc;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::GovernanceConfig;
pub use db::{EntityStore, memory::MemoryStore};
pub use error::{ErrorKind, GovernanceError, GovernanceResult};
pub use lifecycle::{ProjectManager, SubtaskManager, TaskManager};
pub use notify::{NotificationBroker, NotificationSink};

/// Shared handles every manager borrows from.
#[derive(Clone)]
pub struct GovernanceState {
    store: Arc<dyn EntityStore>,
    clock: Arc<dyn Clock>,
    notifications: Arc<dyn NotificationSink>,
}

impl GovernanceState {
    pub fn new(
        store: Arc<dyn EntityStore>,
        clock: Arc<dyn Clock>,
        notifications: Arc<dyn NotificationSink>,
    ) -> Self {
        Self {
            store,
            clock,
            notifications,
        }
    }

    /// A state backed by the wall clock and a broker sized from `config`.
    pub fn from_config(store: Arc<dyn EntityStore>, config: &GovernanceConfig) -> Self {
        let broker = NotificationBroker::new(
            config.notification_shards,
            config.notification_capacity,
        );
        Self::new(store, Arc::new(SystemClock), Arc::new(broker))
    }

    pub fn store(&self) -> &dyn EntityStore {
        self.store.as_ref()
    }

    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    pub fn notifications(&self) -> &dyn NotificationSink {
        self.notifications.as_ref()
    }

    pub fn projects(&self) -> ProjectManager<'_> {
        ProjectManager::new(self)
    }

    pub fn tasks(&self) -> TaskManager<'_> {
        TaskManager::new(self)
    }

    pub fn subtasks(&self) -> SubtaskManager<'_> {
        SubtaskManager::new(self)
    }
}
