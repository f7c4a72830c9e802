pub mod config;
pub mod error;
pub mod marketplace;
pub mod negotiation;
pub mod traits;

#[cfg(any(test, feature = "test-support"))]
pub mod mocks;

pub use config::*;
pub use error::{BazaarError, BazaarResult};
pub use marketplace::{
    Claim, ClaimAnswers, ClaimApproval, ClaimId, ClaimState, Conversation, ConversationId,
    ConversationStatus, LastMessage, Listing, ListingBuilder, ListingDetails, ListingId,
    ListingKind, ListingStatus, ListingStatusRegistry, Message, MessageId, MessageKind, Rating,
    Review, ReviewId, Sender, TradeItem, TrustScore, UserId,
};
pub use negotiation::{
    ConversationStore, ListingOperations, MessagingChannel, NegotiationEngine, ReviewTrigger,
};
pub use traits::{
    BatchWrite, ChangeNotifier, ConversationEvent, Datastore, FieldWrite, NoopNotifier,
    SystemTimeProvider, TimeProvider,
};
