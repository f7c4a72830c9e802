//! Configuration constants for the negotiation core.
//!
//! This module centralizes magic numbers and collection names
//! to improve maintainability and enable easier tuning.

use uuid::Uuid;

/// Maximum length in characters of a single chat message body.
pub const MAX_MESSAGE_LEN: usize = 2000;

/// Lowest rating a reviewer can leave.
pub const MIN_RATING: u8 = 1;

/// Highest rating a reviewer can leave.
pub const MAX_RATING: u8 = 5;

/// Namespace for deriving deterministic v5 identifiers.
///
/// Conversation, claim, and review ids are derived from their natural keys
/// under this namespace, so repeated creation attempts resolve to the same
/// document instead of racing a lookup-then-create.
pub const ID_NAMESPACE: Uuid = Uuid::from_u128(0x7b1d_c4e2_9a6f_4d83_b5a0_3f1e_8c27_d94a);

/// Document collection names.
pub mod collections {
    /// Item listings.
    pub const LISTINGS: &str = "listings";
    /// Negotiation conversations.
    pub const CONVERSATIONS: &str = "conversations";
    /// Chat messages, ordered per conversation.
    pub const MESSAGES: &str = "messages";
    /// Lost-and-found claims.
    pub const CLAIMS: &str = "claims";
    /// Post-completion reviews.
    pub const REVIEWS: &str = "reviews";
    /// Per-user bookkeeping (post count, trust score).
    pub const PROFILES: &str = "profiles";
}

/// Return the current Unix timestamp in seconds.
///
/// This is a convenience wrapper that avoids the boilerplate of
/// `SystemTimeProvider::new().now_unix()` in production code paths.
/// For testable code, prefer accepting a `TimeProvider` parameter instead.
pub fn now_unix() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
