//! Append-only ordered message log per conversation.

use serde_json::json;
use tracing::debug;

use crate::config::{collections, MAX_MESSAGE_LEN};
use crate::error::{BazaarError, BazaarResult};
use crate::marketplace::{Conversation, ConversationId, Message, MessageId, MessageKind, Sender};
use crate::negotiation::conversations::ConversationStore;
use crate::traits::{from_doc, to_doc, Datastore, TimeProvider};

/// Message log with server-assigned timestamps and read/unread upkeep.
pub struct MessagingChannel<D, T> {
    datastore: D,
    time: T,
    conversations: ConversationStore<D, T>,
}

impl<D: Datastore, T: TimeProvider + Clone> MessagingChannel<D, T> {
    pub fn new(datastore: D, time: T) -> Self {
        let conversations = ConversationStore::new(datastore.clone(), time.clone());
        Self {
            datastore,
            time,
            conversations,
        }
    }

    /// Append a message to a conversation's log.
    ///
    /// The timestamp is server-assigned and strictly increasing within the
    /// conversation even when the clock stands still, so ordering never
    /// depends on client clocks. Participant appends refresh the
    /// conversation's last-message snapshot and flip the read flags;
    /// system messages only advance the message clock.
    pub async fn append(
        &self,
        conversation: &Conversation,
        sender: Sender,
        body: &str,
        kind: MessageKind,
    ) -> BazaarResult<Message> {
        let body = body.trim();
        if body.is_empty() {
            return Err(BazaarError::InvalidOperation(
                "message body cannot be empty".to_string(),
            ));
        }
        if body.chars().count() > MAX_MESSAGE_LEN {
            return Err(BazaarError::InvalidOperation(format!(
                "message body exceeds {MAX_MESSAGE_LEN} characters"
            )));
        }

        let created_at = self.time.now_unix().max(conversation.message_seq + 1);
        let message = Message {
            id: MessageId::new(),
            conversation_id: conversation.id,
            sender: sender.clone(),
            body: body.to_string(),
            created_at,
            kind,
        };

        self.datastore
            .put(
                collections::MESSAGES,
                &message.id.to_string(),
                to_doc(&message)?,
            )
            .await?;

        match &sender {
            Sender::Participant(user) => {
                self.conversations
                    .mark_last_message(conversation, user, body, created_at)
                    .await?;
            }
            Sender::System => {
                self.conversations
                    .bump_message_seq(conversation.id, created_at)
                    .await?;
            }
        }

        debug!(conversation = %conversation.id, sender = %sender, "message appended");
        Ok(message)
    }

    /// All messages of a conversation, oldest first.
    pub async fn list(&self, conversation_id: ConversationId) -> BazaarResult<Vec<Message>> {
        let docs = self
            .datastore
            .query_eq(
                collections::MESSAGES,
                "conversation_id",
                &json!(conversation_id),
            )
            .await?;

        let mut messages = docs
            .into_iter()
            .map(from_doc::<Message>)
            .collect::<anyhow::Result<Vec<_>>>()?;
        messages.sort_by_key(|m| m.created_at);
        Ok(messages)
    }
}
