//! Recording notifier for asserting on emitted conversation events.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::traits::{ChangeNotifier, ConversationEvent};

/// Mock notifier that records every event it receives.
#[derive(Debug, Clone, Default)]
pub struct MockNotifier {
    events: Arc<Mutex<Vec<ConversationEvent>>>,
}

impl MockNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// All events recorded so far, in emission order.
    pub async fn events(&self) -> Vec<ConversationEvent> {
        self.events.lock().await.clone()
    }

    /// Number of events recorded so far.
    pub async fn event_count(&self) -> usize {
        self.events.lock().await.len()
    }

    /// Clear all recorded events.
    pub async fn clear(&self) {
        self.events.lock().await.clear();
    }
}

#[async_trait]
impl ChangeNotifier for MockNotifier {
    async fn notify(&self, event: ConversationEvent) {
        self.events.lock().await.push(event);
    }
}
