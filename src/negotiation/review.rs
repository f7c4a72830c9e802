//! Review eligibility and trust-score aggregation after terminal completion.

use serde_json::json;
use tracing::{debug, info};

use crate::config::collections;
use crate::error::{BazaarError, BazaarResult};
use crate::marketplace::{
    Conversation, ConversationId, Rating, Review, ReviewId, TrustScore, UserId,
};
use crate::negotiation::conversations::ConversationStore;
use crate::traits::{from_doc, to_doc, Datastore, FieldWrite, TimeProvider};

/// Gate and recorder for post-completion reviews.
///
/// Eligibility is server-authoritative: clients may cache the answer as an
/// optimization but never as a source of truth.
pub struct ReviewTrigger<D, T> {
    datastore: D,
    time: T,
    conversations: ConversationStore<D, T>,
}

impl<D: Datastore, T: TimeProvider + Clone> ReviewTrigger<D, T> {
    pub fn new(datastore: D, time: T) -> Self {
        let conversations = ConversationStore::new(datastore.clone(), time.clone());
        Self {
            datastore,
            time,
            conversations,
        }
    }

    /// Whether `reviewer` may leave a review on this conversation.
    ///
    /// True iff the conversation is completed, the reviewer participated,
    /// the reviewer is not the listing owner, and no prior review exists.
    pub async fn is_eligible(
        &self,
        conversation_id: ConversationId,
        reviewer: &UserId,
    ) -> BazaarResult<bool> {
        let conversation = self.conversations.get(conversation_id).await?;
        match self.eligibility(&conversation, reviewer).await {
            Ok(()) => Ok(true),
            Err(BazaarError::Forbidden(_) | BazaarError::InvalidOperation(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn eligibility(
        &self,
        conversation: &Conversation,
        reviewer: &UserId,
    ) -> BazaarResult<()> {
        if !conversation.has_participant(reviewer) {
            return Err(BazaarError::Forbidden(
                "reviewer is not a participant in this conversation".to_string(),
            ));
        }
        if !conversation.is_completed() {
            return Err(BazaarError::InvalidOperation(
                "reviews open once the deal is completed".to_string(),
            ));
        }
        if reviewer == &conversation.owner {
            return Err(BazaarError::Forbidden(
                "the listing owner cannot leave a review".to_string(),
            ));
        }

        let review_id = ReviewId::for_reviewer(conversation.id, reviewer);
        let existing = self
            .datastore
            .get(collections::REVIEWS, &review_id.to_string())
            .await?;
        if existing.is_some() {
            return Err(BazaarError::InvalidOperation(
                "this conversation has already been reviewed".to_string(),
            ));
        }
        Ok(())
    }

    /// Record a review and recompute the reviewee's trust score.
    ///
    /// The recomputation reads every review for the reviewee and rewrites
    /// the aggregate under the datastore's single-writer-per-document
    /// update, which keeps concurrent submissions for the same reviewee
    /// from interleaving partial sums.
    pub async fn record_review(
        &self,
        reviewer: &UserId,
        conversation_id: ConversationId,
        rating: u8,
        text: &str,
    ) -> BazaarResult<Review> {
        let conversation = self.conversations.get(conversation_id).await?;
        self.eligibility(&conversation, reviewer).await?;
        let rating = Rating::new(rating).map_err(BazaarError::InvalidOperation)?;

        let review = Review {
            id: ReviewId::for_reviewer(conversation_id, reviewer),
            conversation_id,
            reviewer: reviewer.clone(),
            reviewee: conversation.owner.clone(),
            rating,
            text: text.to_string(),
            created_at: self.time.now_unix(),
        };
        self.datastore
            .put(
                collections::REVIEWS,
                &review.id.to_string(),
                to_doc(&review)?,
            )
            .await?;

        let trust = self.recompute_trust(&review.reviewee).await?;
        info!(
            conversation = %conversation_id,
            reviewer = %reviewer,
            reviewee = %review.reviewee,
            rating = rating.value(),
            score = trust.score,
            "review recorded"
        );
        Ok(review)
    }

    /// The current aggregate for a user, if they have ever been reviewed.
    pub async fn trust_score(&self, user: &UserId) -> BazaarResult<Option<TrustScore>> {
        let doc = self
            .datastore
            .get(collections::PROFILES, user.as_str())
            .await?;
        match doc.and_then(|d| d.get("trust").cloned()) {
            Some(value) if !value.is_null() => Ok(Some(from_doc(value)?)),
            _ => Ok(None),
        }
    }

    async fn recompute_trust(&self, reviewee: &UserId) -> BazaarResult<TrustScore> {
        let docs = self
            .datastore
            .query_eq(collections::REVIEWS, "reviewee", &json!(reviewee))
            .await?;
        let ratings = docs
            .into_iter()
            .map(|doc| from_doc::<Review>(doc).map(|r| r.rating))
            .collect::<anyhow::Result<Vec<_>>>()?;

        let trust = TrustScore::from_ratings(&ratings);
        self.datastore
            .update(
                collections::PROFILES,
                reviewee.as_str(),
                vec![FieldWrite::new("trust", json!(trust))],
            )
            .await?;
        debug!(reviewee = %reviewee, score = trust.score, count = trust.count, "trust recomputed");
        Ok(trust)
    }
}
