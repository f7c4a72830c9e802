use serde::{Deserialize, Serialize};

use crate::config::{MAX_RATING, MIN_RATING};
use crate::marketplace::ids::{ConversationId, ReviewId, UserId};

/// A validated star rating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Rating(u8);

impl Rating {
    pub fn new(value: u8) -> Result<Self, String> {
        if (MIN_RATING..=MAX_RATING).contains(&value) {
            Ok(Self(value))
        } else {
            Err(format!(
                "rating must be between {MIN_RATING} and {MAX_RATING}, got {value}"
            ))
        }
    }

    pub const fn value(self) -> u8 {
        self.0
    }
}

/// A post-completion review left by the counterparty for the listing owner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
    pub id: ReviewId,

    pub conversation_id: ConversationId,

    pub reviewer: UserId,

    pub reviewee: UserId,

    pub rating: Rating,

    pub text: String,

    pub created_at: u64,
}

/// Aggregate trust derived from every review a user has received.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrustScore {
    /// Mean rating, rounded to two decimals.
    pub score: f64,
    pub count: u32,
}

impl TrustScore {
    /// Recompute the aggregate from the full set of received ratings.
    pub fn from_ratings(ratings: &[Rating]) -> Self {
        if ratings.is_empty() {
            return Self {
                score: 0.0,
                count: 0,
            };
        }

        let sum: u32 = ratings.iter().map(|r| u32::from(r.value())).sum();
        let mean = f64::from(sum) / ratings.len() as f64;

        Self {
            score: (mean * 100.0).round() / 100.0,
            count: ratings.len() as u32,
        }
    }
}
