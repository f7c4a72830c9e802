//! The negotiation state machine.
//!
//! Drives finalize/retract, dual-confirmation completion, listing-status
//! propagation, and lost-and-found claim decisions. This is also the facade
//! the API layer calls: every operation takes the verified caller identity
//! and returns a typed result.

use tracing::{debug, error, info};

use crate::error::{BazaarError, BazaarResult};
use crate::marketplace::{
    Claim, ClaimAnswers, ClaimApproval, ClaimId, Conversation, ConversationId, ListingId,
    ListingKind, ListingStatusRegistry, Message, MessageKind, Sender, TradeItem, UserId,
};
use crate::negotiation::channel::MessagingChannel;
use crate::negotiation::conversations::ConversationStore;
use crate::negotiation::listings::ListingOperations;
use crate::traits::{ChangeNotifier, ConversationEvent, Datastore, TimeProvider};

/// System-message bodies announcing a completed deal, per listing kind.
const fn completion_message(kind: ListingKind) -> &'static str {
    match kind {
        ListingKind::Sell | ListingKind::Trade => "Deal marked as complete",
        ListingKind::Lend => "Lending marked as complete",
        ListingKind::Lost => "Item has been returned to its owner",
    }
}

/// The state machine driving a conversation from `Active` to `Completed`.
///
/// Abstracted over the datastore, clock, and change-notification hook.
pub struct NegotiationEngine<D, T, N>
where
    D: Datastore,
    T: TimeProvider + Clone,
    N: ChangeNotifier,
{
    conversations: ConversationStore<D, T>,
    channel: MessagingChannel<D, T>,
    listings: ListingOperations<D, T>,
    time: T,
    notifier: N,
}

impl<D, T, N> NegotiationEngine<D, T, N>
where
    D: Datastore,
    T: TimeProvider + Clone,
    N: ChangeNotifier,
{
    /// Create a new engine instance.
    pub fn new(datastore: D, time: T, notifier: N) -> Self {
        Self {
            conversations: ConversationStore::new(datastore.clone(), time.clone()),
            channel: MessagingChannel::new(datastore.clone(), time.clone()),
            listings: ListingOperations::new(datastore, time.clone()),
            time,
            notifier,
        }
    }

    fn ensure_participant(conversation: &Conversation, caller: &UserId) -> BazaarResult<()> {
        if conversation.has_participant(caller) {
            Ok(())
        } else {
            Err(BazaarError::Forbidden(
                "caller is not a participant in this conversation".to_string(),
            ))
        }
    }

    /// First contact: find or create the conversation between the caller
    /// and the listing's owner. Idempotent. The caller must not own the
    /// listing.
    pub async fn create_or_get_conversation(
        &self,
        caller: &UserId,
        listing_id: ListingId,
    ) -> BazaarResult<Conversation> {
        let listing = self.listings.get_listing(listing_id).await?;
        let (conversation, created) = self.conversations.get_or_create(&listing, caller).await?;

        if created {
            info!(
                conversation = %conversation.id,
                listing = %listing_id,
                counterparty = %caller,
                "conversation opened"
            );
            self.notifier
                .notify(ConversationEvent::Created {
                    conversation: conversation.id,
                })
                .await;
        }
        Ok(conversation)
    }

    /// Append a chat message from a participant.
    ///
    /// Lost-and-found chat stays closed until the owner approves a claim;
    /// the claim answers are the pre-approval channel.
    pub async fn send_message(
        &self,
        caller: &UserId,
        conversation_id: ConversationId,
        body: &str,
    ) -> BazaarResult<Message> {
        let conversation = self.conversations.get(conversation_id).await?;
        Self::ensure_participant(&conversation, caller)?;

        if !conversation.chat_open() {
            return Err(BazaarError::InvalidOperation(
                "chat opens once a claim has been approved".to_string(),
            ));
        }

        let message = self
            .channel
            .append(
                &conversation,
                Sender::Participant(caller.clone()),
                body,
                MessageKind::Text,
            )
            .await?;

        self.notifier
            .notify(ConversationEvent::MessageAppended {
                conversation: conversation_id,
                sender: message.sender.clone(),
            })
            .await;
        Ok(message)
    }

    /// All messages of a conversation, oldest first. Participant-only.
    pub async fn list_messages(
        &self,
        caller: &UserId,
        conversation_id: ConversationId,
    ) -> BazaarResult<Vec<Message>> {
        let conversation = self.conversations.get(conversation_id).await?;
        Self::ensure_participant(&conversation, caller)?;
        self.channel.list(conversation_id).await
    }

    /// The caller's conversations, most recently active first.
    pub async fn conversations_for(&self, caller: &UserId) -> BazaarResult<Vec<Conversation>> {
        self.conversations.conversations_for(caller).await
    }

    /// Mark the thread read for the caller.
    pub async fn mark_read(
        &self,
        caller: &UserId,
        conversation_id: ConversationId,
    ) -> BazaarResult<()> {
        let conversation = self.conversations.get(conversation_id).await?;
        Self::ensure_participant(&conversation, caller)?;
        self.conversations.mark_read(conversation_id, caller).await
    }

    /// Record the item the caller offers in a trade negotiation.
    pub async fn offer_trade_item(
        &self,
        caller: &UserId,
        conversation_id: ConversationId,
        offer: TradeItem,
    ) -> BazaarResult<Conversation> {
        let conversation = self.conversations.get(conversation_id).await?;
        Self::ensure_participant(&conversation, caller)?;
        if conversation.is_completed() {
            return Err(BazaarError::InvalidOperation(
                "conversation is completed".to_string(),
            ));
        }

        self.conversations
            .set_trade_offer(conversation_id, caller, offer)
            .await?;

        self.notifier
            .notify(ConversationEvent::TradeOfferSet {
                conversation: conversation_id,
                participant: caller.clone(),
            })
            .await;
        self.conversations.get(conversation_id).await
    }

    /// Declare the caller's commitment to close the deal.
    ///
    /// The owner may only counter-finalize: their flag is accepted once the
    /// counterparty has already finalized, which keeps the deal's final say
    /// with the owner. A sole counterparty finalize moves the listing to
    /// "Pending". Once both flags are set the deal completes. Calling this
    /// on a completed conversation is a no-op returning success, because
    /// unsynchronized client retries are expected.
    pub async fn request_finalize(
        &self,
        caller: &UserId,
        conversation_id: ConversationId,
    ) -> BazaarResult<Conversation> {
        let conversation = self.conversations.get(conversation_id).await?;
        Self::ensure_participant(&conversation, caller)?;

        if conversation.is_completed() {
            debug!(conversation = %conversation_id, "finalize on completed conversation, no-op");
            return Ok(conversation);
        }

        let other = conversation.other_participant(caller).clone();
        if caller == &conversation.owner && !conversation.is_finalized(&other) {
            return Err(BazaarError::InvalidOperation(
                "the owner can only finalize after the other party has".to_string(),
            ));
        }

        if conversation.kind == ListingKind::Lost && caller != &conversation.owner {
            let approved = conversation
                .claim
                .as_ref()
                .and_then(|c| c.approved_claimant.as_ref())
                == Some(caller);
            if !approved {
                return Err(BazaarError::InvalidOperation(
                    "claim must be approved before finalizing a lost-item return".to_string(),
                ));
            }
        }

        if conversation.is_finalized(caller) {
            debug!(conversation = %conversation_id, participant = %caller, "already finalized");
            return Ok(conversation);
        }

        self.conversations
            .set_finalized(conversation_id, caller, true)
            .await?;
        info!(conversation = %conversation_id, participant = %caller, "participant finalized");
        self.notifier
            .notify(ConversationEvent::FinalizeChanged {
                conversation: conversation_id,
                participant: caller.clone(),
                finalized: true,
            })
            .await;

        if conversation.is_finalized(&other) {
            let current = self.conversations.get(conversation_id).await?;
            self.complete_deal(&current).await?;
        } else if caller != &conversation.owner && conversation.kind != ListingKind::Lost {
            // Sole counterparty finalize: nudge the owner via the listing,
            // but never overwrite a status another deal already advanced.
            let listing = self.listings.get_listing(conversation.listing_id).await?;
            if listing.status == ListingStatusRegistry::initial(conversation.kind) {
                self.listings
                    .set_status(conversation.listing_id, ListingStatusRegistry::pending())
                    .await?;
            }
        }

        self.conversations.get(conversation_id).await
    }

    /// Withdraw the caller's finalized flag.
    ///
    /// Allowed for every listing kind at any point before both parties have
    /// finalized; frozen after completion. Retracting a flag that was never
    /// set is a no-op. If the listing was "Pending" solely because of this
    /// participant, it reverts to its initial status.
    pub async fn retract_finalize(
        &self,
        caller: &UserId,
        conversation_id: ConversationId,
    ) -> BazaarResult<Conversation> {
        let conversation = self.conversations.get(conversation_id).await?;
        Self::ensure_participant(&conversation, caller)?;

        if conversation.is_completed() {
            return Err(BazaarError::InvalidOperation(
                "a completed deal can no longer be retracted".to_string(),
            ));
        }

        if !conversation.is_finalized(caller) {
            return Ok(conversation);
        }

        self.conversations
            .set_finalized(conversation_id, caller, false)
            .await?;
        info!(conversation = %conversation_id, participant = %caller, "finalize retracted");
        self.notifier
            .notify(ConversationEvent::FinalizeChanged {
                conversation: conversation_id,
                participant: caller.clone(),
                finalized: false,
            })
            .await;

        if caller != &conversation.owner && conversation.kind != ListingKind::Lost {
            let listing = self.listings.get_listing(conversation.listing_id).await?;
            if listing.status == ListingStatusRegistry::pending() {
                self.listings
                    .set_status(
                        conversation.listing_id,
                        ListingStatusRegistry::initial(conversation.kind),
                    )
                    .await?;
            }
        }

        self.conversations.get(conversation_id).await
    }

    /// Close the deal once both finalized flags are set.
    ///
    /// Idempotent: re-invoking on a completed conversation is a no-op. The
    /// conversation, listing, and message log are three separate writes;
    /// a failure after the first one is reported as `PartialWrite` so the
    /// caller can distinguish it from total failure.
    async fn complete_deal(&self, conversation: &Conversation) -> BazaarResult<()> {
        if conversation.is_completed() {
            debug!(conversation = %conversation.id, "deal already completed");
            return Ok(());
        }

        self.conversations.set_completed(conversation.id).await?;
        info!(conversation = %conversation.id, kind = %conversation.kind, "deal completed");

        let terminal = ListingStatusRegistry::terminal(conversation.kind);
        if let Err(e) = self
            .listings
            .set_status(conversation.listing_id, terminal)
            .await
        {
            error!(
                conversation = %conversation.id,
                listing = %conversation.listing_id,
                error = %e,
                "deal completed but listing status write failed"
            );
            return Err(BazaarError::PartialWrite(format!(
                "listing status write failed after completion: {e}"
            )));
        }

        let current = self.conversations.get(conversation.id).await?;
        if let Err(e) = self
            .channel
            .append(
                &current,
                Sender::System,
                completion_message(conversation.kind),
                MessageKind::System,
            )
            .await
        {
            error!(
                conversation = %conversation.id,
                error = %e,
                "deal completed but completion message append failed"
            );
            return Err(BazaarError::PartialWrite(format!(
                "completion message append failed: {e}"
            )));
        }

        self.notifier
            .notify(ConversationEvent::DealCompleted {
                conversation: conversation.id,
            })
            .await;
        Ok(())
    }

    /// Submit a lost-and-found claim. Counterparty-only, once per claimant.
    pub async fn submit_claim(
        &self,
        caller: &UserId,
        conversation_id: ConversationId,
        answers: ClaimAnswers,
    ) -> BazaarResult<Claim> {
        let conversation = self.conversations.get(conversation_id).await?;
        Self::ensure_participant(&conversation, caller)?;

        if conversation.kind != ListingKind::Lost {
            return Err(BazaarError::InvalidOperation(format!(
                "claims do not apply to {} listings",
                conversation.kind
            )));
        }
        if caller == &conversation.owner {
            return Err(BazaarError::Forbidden(
                "the finder cannot claim their own find".to_string(),
            ));
        }
        if conversation.is_completed() {
            return Err(BazaarError::InvalidOperation(
                "conversation is completed".to_string(),
            ));
        }
        if answers.is_empty() {
            return Err(BazaarError::InvalidOperation(
                "claim answers cannot be empty".to_string(),
            ));
        }

        let claim_id = ClaimId::for_claimant(conversation_id, caller);
        if self.conversations.claim_exists(claim_id).await? {
            return Err(BazaarError::InvalidOperation(
                "a claim has already been submitted for this conversation".to_string(),
            ));
        }

        let claim = Claim {
            id: claim_id,
            conversation_id,
            listing_id: conversation.listing_id,
            claimant: caller.clone(),
            answers,
            approval: ClaimApproval::Pending,
            submitted_at: self.time.now_unix(),
        };
        self.conversations.create_claim(&claim).await?;

        info!(conversation = %conversation_id, claimant = %caller, "claim submitted");
        self.notifier
            .notify(ConversationEvent::ClaimSubmitted {
                conversation: conversation_id,
                claimant: caller.clone(),
            })
            .await;
        Ok(claim)
    }

    /// Decide a claim. Owner-only; a claim is decided at most once.
    ///
    /// Approval atomically rejects every sibling pending claim on the same
    /// listing and opens this conversation's chat. Rejection touches only
    /// the one claim.
    pub async fn decide_claim(
        &self,
        caller: &UserId,
        conversation_id: ConversationId,
        claim_id: ClaimId,
        approve: bool,
    ) -> BazaarResult<Claim> {
        let conversation = self.conversations.get(conversation_id).await?;
        if caller != &conversation.owner {
            return Err(BazaarError::Forbidden(
                "only the listing owner can decide a claim".to_string(),
            ));
        }

        let claim = self.conversations.get_claim(claim_id).await?;
        if claim.conversation_id != conversation_id {
            return Err(BazaarError::InvalidOperation(
                "claim does not belong to this conversation".to_string(),
            ));
        }
        if !claim.is_pending() {
            return Err(BazaarError::InvalidOperation(
                "claim has already been decided".to_string(),
            ));
        }

        if approve {
            let rejected_siblings = self
                .conversations
                .approve_claim(&conversation, &claim)
                .await?;
            info!(
                conversation = %conversation_id,
                claimant = %claim.claimant,
                rejected_siblings,
                "claim approved"
            );
        } else {
            self.conversations.reject_claim(&claim).await?;
            info!(conversation = %conversation_id, claimant = %claim.claimant, "claim rejected");
        }

        let current = self.conversations.get(conversation_id).await?;
        let body = if approve {
            "Claim has been approved"
        } else {
            "Claim has been rejected"
        };
        self.channel
            .append(&current, Sender::System, body, MessageKind::System)
            .await?;

        self.notifier
            .notify(ConversationEvent::ClaimDecided {
                conversation: conversation_id,
                claimant: claim.claimant.clone(),
                approved: approve,
            })
            .await;

        self.conversations.get_claim(claim_id).await
    }
}
