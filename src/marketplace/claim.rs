use serde::{Deserialize, Serialize};

use crate::marketplace::ids::{ClaimId, ConversationId, ListingId, UserId};

/// Free-form answers a claimant gives about the item they lost.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClaimAnswers {
    pub when_lost: String,
    pub where_lost: String,
    pub details: String,
}

impl ClaimAnswers {
    pub fn new(
        when_lost: impl Into<String>,
        where_lost: impl Into<String>,
        details: impl Into<String>,
    ) -> Self {
        Self {
            when_lost: when_lost.into(),
            where_lost: where_lost.into(),
            details: details.into(),
        }
    }

    /// True when every answer is blank.
    pub fn is_empty(&self) -> bool {
        self.when_lost.trim().is_empty()
            && self.where_lost.trim().is_empty()
            && self.details.trim().is_empty()
    }
}

/// Owner's verdict on a claim. Decided at most once; never re-opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClaimApproval {
    Pending,
    Approved,
    Rejected,
}

/// A lost-and-found ownership assertion, owned by one conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claim {
    pub id: ClaimId,

    pub conversation_id: ConversationId,

    /// Denormalized so sibling claims on the same listing are queryable.
    pub listing_id: ListingId,

    pub claimant: UserId,

    pub answers: ClaimAnswers,

    pub approval: ClaimApproval,

    pub submitted_at: u64,
}

impl Claim {
    pub const fn is_pending(&self) -> bool {
        matches!(self.approval, ClaimApproval::Pending)
    }
}
