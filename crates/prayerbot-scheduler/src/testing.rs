//! Recording gateway used by the scheduler tests.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use prayerbot_core::error::{PrayerError, Result};
use prayerbot_core::traits::MessagingGateway;
use tokio::sync::Notify;

/// Holds `create_private_conversation` until released.
#[derive(Default)]
pub struct Gate {
    pub entered: Notify,
    pub release: Notify,
}

#[derive(Default)]
pub struct RecordingGateway {
    /// Conversations including any of these users fail to open.
    pub failing_users: HashSet<String>,
    pub fail_leave: bool,
    pub conversations: Mutex<Vec<Vec<String>>>,
    pub messages: Mutex<Vec<(String, String)>>,
    pub left: Mutex<Vec<String>>,
    pub gate: Option<Arc<Gate>>,
}

impl RecordingGateway {
    pub fn failing_for(users: &[&str]) -> Self {
        Self {
            failing_users: users.iter().map(|u| u.to_string()).collect(),
            ..Self::default()
        }
    }

    pub fn gated() -> (Self, Arc<Gate>) {
        let gate = Arc::new(Gate::default());
        let gateway = Self {
            gate: Some(gate.clone()),
            ..Self::default()
        };
        (gateway, gate)
    }

    pub fn conversations(&self) -> Vec<Vec<String>> {
        self.conversations.lock().unwrap().clone()
    }

    pub fn messages(&self) -> Vec<(String, String)> {
        self.messages.lock().unwrap().clone()
    }
}

#[async_trait]
impl MessagingGateway for RecordingGateway {
    async fn resolve_display_name(&self, user_id: &str) -> String {
        format!("Name{user_id}")
    }

    async fn is_direct_message_channel(&self, channel_id: &str) -> Result<bool> {
        Ok(channel_id.starts_with('D'))
    }

    async fn create_private_conversation(&self, user_ids: &[String]) -> Result<String> {
        if let Some(gate) = &self.gate {
            gate.entered.notify_one();
            gate.release.notified().await;
        }
        if user_ids.iter().any(|u| self.failing_users.contains(u)) {
            return Err(PrayerError::Gateway("user_not_found".into()));
        }
        let mut conversations = self.conversations.lock().unwrap();
        conversations.push(user_ids.to_vec());
        Ok(format!("G{}", conversations.len()))
    }

    async fn post_message(&self, conversation_id: &str, text: &str) -> Result<()> {
        self.messages
            .lock()
            .unwrap()
            .push((conversation_id.to_string(), text.to_string()));
        Ok(())
    }

    async fn post_ephemeral(&self, channel_id: &str, _user_id: &str, text: &str) -> Result<()> {
        self.post_message(channel_id, text).await
    }

    async fn leave_conversation(&self, conversation_id: &str) -> Result<()> {
        if self.fail_leave {
            return Err(PrayerError::Gateway("cant_leave".into()));
        }
        self.left.lock().unwrap().push(conversation_id.to_string());
        Ok(())
    }
}
