//! Change-notification hook for conversation updates.
//!
//! External transport layers (polling, push, streaming) implement
//! [`ChangeNotifier`] to relay conversation changes to connected clients;
//! the core itself stays transport-agnostic.

use async_trait::async_trait;

use crate::marketplace::{ConversationId, Sender, UserId};

/// A state change on one conversation, emitted after the write has landed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversationEvent {
    /// A first contact created the conversation.
    Created { conversation: ConversationId },
    MessageAppended {
        conversation: ConversationId,
        sender: Sender,
    },
    FinalizeChanged {
        conversation: ConversationId,
        participant: UserId,
        finalized: bool,
    },
    DealCompleted { conversation: ConversationId },
    TradeOfferSet {
        conversation: ConversationId,
        participant: UserId,
    },
    ClaimSubmitted {
        conversation: ConversationId,
        claimant: UserId,
    },
    ClaimDecided {
        conversation: ConversationId,
        claimant: UserId,
        approved: bool,
    },
}

impl ConversationEvent {
    /// The conversation this event belongs to.
    pub const fn conversation(&self) -> ConversationId {
        match self {
            Self::Created { conversation }
            | Self::MessageAppended { conversation, .. }
            | Self::FinalizeChanged { conversation, .. }
            | Self::DealCompleted { conversation }
            | Self::TradeOfferSet { conversation, .. }
            | Self::ClaimSubmitted { conversation, .. }
            | Self::ClaimDecided { conversation, .. } => *conversation,
        }
    }
}

/// Hook invoked by the engine after every conversation mutation.
#[async_trait]
pub trait ChangeNotifier: Send + Sync {
    async fn notify(&self, event: ConversationEvent);
}

/// Notifier for callers without a transport; drops every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNotifier;

#[async_trait]
impl ChangeNotifier for NoopNotifier {
    async fn notify(&self, _event: ConversationEvent) {}
}
