//! The conversation document: one negotiation between a listing owner and
//! one counterparty.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::marketplace::ids::{ConversationId, ListingId, UserId};
use crate::marketplace::listing::Listing;
use crate::marketplace::status::ListingKind;

/// Lifecycle of a negotiation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConversationStatus {
    /// Negotiation in progress; chat and finalization are open.
    Active,
    /// Both parties finalized. Chat stays usable, finalization is frozen.
    Completed,
}

/// Preview of the newest participant message, kept on the conversation
/// document for inbox display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LastMessage {
    pub text: String,
    pub sender: UserId,
    pub sent_at: u64,
}

/// An item offered in a trade negotiation, snapshotted from a listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeItem {
    pub title: String,
    pub image: Option<String>,
    pub condition: Option<String>,
}

impl TradeItem {
    /// Snapshot the listed item at conversation-creation time.
    pub fn from_listing(listing: &Listing) -> Self {
        Self {
            title: listing.title.clone(),
            image: listing.image.clone(),
            condition: listing.condition.clone(),
        }
    }
}

/// Lost-and-found sub-state carried by conversations over lost listings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClaimState {
    /// Whether the counterparty has submitted a claim.
    pub submitted: bool,
    /// Chat unlocks once the owner approves the claim.
    pub can_chat: bool,
    pub approved_claimant: Option<UserId>,
}

/// A negotiation between exactly two participants over one listing.
///
/// Never hard-deleted; history is retained after completion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: ConversationId,

    pub listing_id: ListingId,

    pub kind: ListingKind,

    /// The listing owner's side of the negotiation.
    pub owner: UserId,

    /// The interested party who made first contact.
    pub counterparty: UserId,

    pub status: ConversationStatus,

    /// Per-participant commitment flags; a missing key means not finalized.
    pub finalized: HashMap<UserId, bool>,

    /// Per-participant read flags for unread-badge derivation.
    pub read: HashMap<UserId, bool>,

    pub last_message: Option<LastMessage>,

    /// Highest message timestamp handed out in this conversation.
    pub message_seq: u64,

    /// Offered items per participant; trade conversations only.
    pub trade_items: Option<HashMap<UserId, TradeItem>>,

    /// Claim sub-state; lost conversations only.
    pub claim: Option<ClaimState>,

    pub created_at: u64,

    pub updated_at: u64,
}

impl Conversation {
    pub fn has_participant(&self, user: &UserId) -> bool {
        &self.owner == user || &self.counterparty == user
    }

    /// The participant opposite `user`.
    pub fn other_participant(&self, user: &UserId) -> &UserId {
        if user == &self.owner {
            &self.counterparty
        } else {
            &self.owner
        }
    }

    /// Whether `user` has set their finalized flag. Absence means false.
    pub fn is_finalized(&self, user: &UserId) -> bool {
        self.finalized.get(user).copied().unwrap_or(false)
    }

    pub fn finalized_count(&self) -> usize {
        self.finalized.values().filter(|set| **set).count()
    }

    pub const fn is_completed(&self) -> bool {
        matches!(self.status, ConversationStatus::Completed)
    }

    /// Whether participants may exchange chat messages.
    ///
    /// Lost conversations are gated until the owner approves a claim;
    /// every other kind chats freely.
    pub fn chat_open(&self) -> bool {
        match self.kind {
            ListingKind::Lost => self.claim.as_ref().is_some_and(|c| c.can_chat),
            _ => true,
        }
    }
}
