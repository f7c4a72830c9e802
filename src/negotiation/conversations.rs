//! Validated persistence for conversations and their claim sub-records.

use std::collections::HashMap;

use serde_json::json;
use tracing::debug;

use crate::config::collections;
use crate::error::{BazaarError, BazaarResult};
use crate::marketplace::{
    Claim, ClaimApproval, ClaimId, ClaimState, Conversation, ConversationId, ConversationStatus,
    LastMessage, Listing, ListingId, ListingKind, TradeItem, UserId,
};
use crate::traits::{from_doc, to_doc, BatchWrite, Datastore, FieldWrite, TimeProvider};

/// Persistent record of negotiations between two parties over one listing.
///
/// All writes are single-document updates; the uniqueness invariant
/// (one conversation per (listing, participant pair)) is enforced by the
/// deterministic conversation id, so creation is naturally idempotent.
pub struct ConversationStore<D, T> {
    datastore: D,
    time: T,
}

impl<D: Datastore, T: TimeProvider + Clone> ConversationStore<D, T> {
    pub const fn new(datastore: D, time: T) -> Self {
        Self { datastore, time }
    }

    /// Find or create the conversation between the listing owner and
    /// `counterparty`. Returns the conversation and whether it was created
    /// by this call.
    pub async fn get_or_create(
        &self,
        listing: &Listing,
        counterparty: &UserId,
    ) -> BazaarResult<(Conversation, bool)> {
        if &listing.owner == counterparty {
            return Err(BazaarError::InvalidOperation(
                "cannot open a conversation with yourself".to_string(),
            ));
        }

        let id = ConversationId::for_pair(listing.id, &listing.owner, counterparty);
        if let Some(existing) = self.find(id).await? {
            return Ok((existing, false));
        }

        let now = self.time.now_unix();
        // The creator has obviously seen the (empty) thread; the owner has not.
        let read = HashMap::from([
            (counterparty.clone(), true),
            (listing.owner.clone(), false),
        ]);

        let mut conversation = Conversation {
            id,
            listing_id: listing.id,
            kind: listing.kind(),
            owner: listing.owner.clone(),
            counterparty: counterparty.clone(),
            status: ConversationStatus::Active,
            finalized: HashMap::new(),
            read,
            last_message: None,
            message_seq: 0,
            trade_items: None,
            claim: None,
            created_at: now,
            updated_at: now,
        };

        match listing.kind() {
            ListingKind::Trade => {
                conversation.trade_items = Some(HashMap::from([(
                    listing.owner.clone(),
                    TradeItem::from_listing(listing),
                )]));
            }
            ListingKind::Lost => {
                conversation.claim = Some(ClaimState::default());
            }
            _ => {}
        }

        self.datastore
            .put(
                collections::CONVERSATIONS,
                &id.to_string(),
                to_doc(&conversation)?,
            )
            .await?;
        debug!(conversation = %id, listing = %listing.id, "conversation created");

        Ok((conversation, true))
    }

    /// Fetch a conversation, failing with `NotFound` if absent.
    pub async fn get(&self, id: ConversationId) -> BazaarResult<Conversation> {
        self.find(id)
            .await?
            .ok_or_else(|| BazaarError::NotFound(format!("conversation {id}")))
    }

    async fn find(&self, id: ConversationId) -> BazaarResult<Option<Conversation>> {
        let doc = self
            .datastore
            .get(collections::CONVERSATIONS, &id.to_string())
            .await?;
        doc.map(from_doc).transpose().map_err(Into::into)
    }

    /// Every conversation `user` participates in, most recently active first.
    pub async fn conversations_for(&self, user: &UserId) -> BazaarResult<Vec<Conversation>> {
        let mut results = Vec::new();
        for field in ["owner", "counterparty"] {
            let docs = self
                .datastore
                .query_eq(collections::CONVERSATIONS, field, &json!(user))
                .await?;
            for doc in docs {
                results.push(from_doc::<Conversation>(doc)?);
            }
        }
        results.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(results)
    }

    /// Set or clear one participant's finalized flag.
    ///
    /// Per-key update: a concurrent write to the other participant's flag
    /// is never clobbered. Listing status is orchestrated by the engine,
    /// not here.
    pub async fn set_finalized(
        &self,
        id: ConversationId,
        participant: &UserId,
        value: bool,
    ) -> BazaarResult<()> {
        self.datastore
            .update(
                collections::CONVERSATIONS,
                &id.to_string(),
                vec![
                    FieldWrite::new(format!("finalized.{participant}"), json!(value)),
                    FieldWrite::new("updated_at", json!(self.time.now_unix())),
                ],
            )
            .await?;
        Ok(())
    }

    /// Record the item a participant offers in a trade negotiation.
    pub async fn set_trade_offer(
        &self,
        id: ConversationId,
        participant: &UserId,
        offer: TradeItem,
    ) -> BazaarResult<()> {
        let conversation = self.get(id).await?;
        if conversation.kind != ListingKind::Trade {
            return Err(BazaarError::InvalidOperation(format!(
                "trade offers do not apply to {} listings",
                conversation.kind
            )));
        }

        self.datastore
            .update(
                collections::CONVERSATIONS,
                &id.to_string(),
                vec![
                    FieldWrite::new(format!("trade_items.{participant}"), json!(offer)),
                    FieldWrite::new("updated_at", json!(self.time.now_unix())),
                ],
            )
            .await?;
        Ok(())
    }

    /// Mark the thread as read for one participant.
    pub async fn mark_read(&self, id: ConversationId, participant: &UserId) -> BazaarResult<()> {
        self.datastore
            .update(
                collections::CONVERSATIONS,
                &id.to_string(),
                vec![FieldWrite::new(format!("read.{participant}"), json!(true))],
            )
            .await?;
        Ok(())
    }

    /// Refresh the last-message snapshot after a participant append: the
    /// sender has read the thread, the other participant has not.
    pub async fn mark_last_message(
        &self,
        conversation: &Conversation,
        sender: &UserId,
        text: &str,
        timestamp: u64,
    ) -> BazaarResult<()> {
        let other = conversation.other_participant(sender);
        let snapshot = LastMessage {
            text: text.to_string(),
            sender: sender.clone(),
            sent_at: timestamp,
        };

        self.datastore
            .update(
                collections::CONVERSATIONS,
                &conversation.id.to_string(),
                vec![
                    FieldWrite::new("last_message", json!(snapshot)),
                    FieldWrite::new("message_seq", json!(timestamp)),
                    FieldWrite::new(format!("read.{sender}"), json!(true)),
                    FieldWrite::new(format!("read.{other}"), json!(false)),
                    FieldWrite::new("updated_at", json!(timestamp)),
                ],
            )
            .await?;
        Ok(())
    }

    /// Advance the message clock without touching the last-message snapshot
    /// or read flags. Used for system messages.
    pub async fn bump_message_seq(&self, id: ConversationId, timestamp: u64) -> BazaarResult<()> {
        self.datastore
            .update(
                collections::CONVERSATIONS,
                &id.to_string(),
                vec![
                    FieldWrite::new("message_seq", json!(timestamp)),
                    FieldWrite::new("updated_at", json!(timestamp)),
                ],
            )
            .await?;
        Ok(())
    }

    /// Move the conversation to its terminal state.
    pub async fn set_completed(&self, id: ConversationId) -> BazaarResult<()> {
        self.datastore
            .update(
                collections::CONVERSATIONS,
                &id.to_string(),
                vec![
                    FieldWrite::new("status", json!(ConversationStatus::Completed)),
                    FieldWrite::new("updated_at", json!(self.time.now_unix())),
                ],
            )
            .await?;
        Ok(())
    }

    /// Persist a freshly submitted claim and flag the conversation.
    pub async fn create_claim(&self, claim: &Claim) -> BazaarResult<()> {
        self.datastore
            .put(collections::CLAIMS, &claim.id.to_string(), to_doc(claim)?)
            .await?;
        self.datastore
            .update(
                collections::CONVERSATIONS,
                &claim.conversation_id.to_string(),
                vec![
                    FieldWrite::new("claim.submitted", json!(true)),
                    FieldWrite::new("updated_at", json!(self.time.now_unix())),
                ],
            )
            .await?;
        Ok(())
    }

    /// Fetch a claim, failing with `NotFound` if absent.
    pub async fn get_claim(&self, id: ClaimId) -> BazaarResult<Claim> {
        let doc = self
            .datastore
            .get(collections::CLAIMS, &id.to_string())
            .await?;
        doc.map(from_doc)
            .transpose()?
            .ok_or_else(|| BazaarError::NotFound(format!("claim {id}")))
    }

    pub async fn claim_exists(&self, id: ClaimId) -> BazaarResult<bool> {
        Ok(self
            .datastore
            .get(collections::CLAIMS, &id.to_string())
            .await?
            .is_some())
    }

    /// All still-pending claims against one listing, across conversations.
    pub async fn pending_claims_for_listing(
        &self,
        listing_id: ListingId,
    ) -> BazaarResult<Vec<Claim>> {
        let docs = self
            .datastore
            .query_eq(collections::CLAIMS, "listing_id", &json!(listing_id))
            .await?;
        let mut claims = Vec::new();
        for doc in docs {
            let claim: Claim = from_doc(doc)?;
            if claim.is_pending() {
                claims.push(claim);
            }
        }
        Ok(claims)
    }

    /// Approve one claim and reject every sibling pending claim on the same
    /// listing in a single atomic batch, so a concurrent second approval can
    /// never produce two approved claimants. Returns the sibling count.
    pub async fn approve_claim(
        &self,
        conversation: &Conversation,
        claim: &Claim,
    ) -> BazaarResult<usize> {
        let now = self.time.now_unix();
        let mut writes = vec![
            BatchWrite {
                collection: collections::CLAIMS,
                id: claim.id.to_string(),
                fields: vec![FieldWrite::new("approval", json!(ClaimApproval::Approved))],
            },
            BatchWrite {
                collection: collections::CONVERSATIONS,
                id: conversation.id.to_string(),
                fields: vec![
                    FieldWrite::new("claim.can_chat", json!(true)),
                    FieldWrite::new("claim.approved_claimant", json!(claim.claimant)),
                    FieldWrite::new("updated_at", json!(now)),
                ],
            },
        ];

        let mut rejected = 0;
        for sibling in self.pending_claims_for_listing(conversation.listing_id).await? {
            if sibling.id == claim.id {
                continue;
            }
            rejected += 1;
            writes.push(BatchWrite {
                collection: collections::CLAIMS,
                id: sibling.id.to_string(),
                fields: vec![FieldWrite::new("approval", json!(ClaimApproval::Rejected))],
            });
        }

        self.datastore.batch(writes).await?;
        debug!(claim = %claim.id, rejected, "claim approved");
        Ok(rejected)
    }

    /// Reject a single claim. The conversation's chat stays closed.
    pub async fn reject_claim(&self, claim: &Claim) -> BazaarResult<()> {
        self.datastore
            .update(
                collections::CLAIMS,
                &claim.id.to_string(),
                vec![FieldWrite::new("approval", json!(ClaimApproval::Rejected))],
            )
            .await?;
        Ok(())
    }
}
