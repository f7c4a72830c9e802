pub mod claim;
pub mod conversation;
pub mod ids;
pub mod listing;
pub mod message;
pub mod review;
pub mod status;

pub use claim::{Claim, ClaimAnswers, ClaimApproval};
pub use conversation::{ClaimState, Conversation, ConversationStatus, LastMessage, TradeItem};
pub use ids::{ClaimId, ConversationId, ListingId, MessageId, ReviewId, UserId};
pub use listing::{Listing, ListingBuilder, ListingDetails};
pub use message::{Message, MessageKind, Sender, SYSTEM_SENDER};
pub use review::{Rating, Review, TrustScore};
pub use status::{ListingKind, ListingStatus, ListingStatusRegistry};
