use serde::{Deserialize, Serialize};

use crate::marketplace::ids::{ListingId, UserId};
use crate::marketplace::status::{ListingKind, ListingStatus, ListingStatusRegistry};
use crate::traits::{SystemTimeProvider, TimeProvider};

/// Kind-specific payload of a listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ListingDetails {
    /// Asking price in the marketplace's atomic currency unit.
    Sell { price: u64 },
    /// What the owner would like in exchange.
    Trade { interest: String },
    /// How many days the item can be borrowed for.
    Lend { lend_days: u32 },
    /// Where the item was found.
    Lost { location: String },
}

impl ListingDetails {
    pub const fn kind(&self) -> ListingKind {
        match self {
            Self::Sell { .. } => ListingKind::Sell,
            Self::Trade { .. } => ListingKind::Trade,
            Self::Lend { .. } => ListingKind::Lend,
            Self::Lost { .. } => ListingKind::Lost,
        }
    }
}

/// An item post in the marketplace.
///
/// Status transitions after creation are driven exclusively by the
/// negotiation engine once a conversation exists for the listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Listing {
    pub id: ListingId,

    /// The user who posted the item.
    pub owner: UserId,

    pub title: String,

    /// Optional image reference; media storage is an external collaborator.
    pub image: Option<String>,

    /// Free-form condition note ("like new", "well used", ...).
    pub condition: Option<String>,

    pub details: ListingDetails,

    pub status: ListingStatus,

    pub created_at: u64,

    pub updated_at: u64,
}

impl Listing {
    /// Create a new listing builder.
    pub const fn builder() -> ListingBuilder<SystemTimeProvider> {
        ListingBuilder::new(SystemTimeProvider::new())
    }

    /// Create a new listing builder with a custom time provider.
    pub const fn builder_with_time<T: TimeProvider>(time: T) -> ListingBuilder<T> {
        ListingBuilder::new(time)
    }

    /// The kind discriminant used by the status registry.
    pub const fn kind(&self) -> ListingKind {
        self.details.kind()
    }
}

/// Builder for creating new listings.
pub struct ListingBuilder<T: TimeProvider> {
    time: T,
    owner: Option<UserId>,
    title: Option<String>,
    image: Option<String>,
    condition: Option<String>,
    details: Option<ListingDetails>,
}

impl<T: TimeProvider> ListingBuilder<T> {
    /// Create a new builder with a time provider.
    pub const fn new(time: T) -> Self {
        Self {
            time,
            owner: None,
            title: None,
            image: None,
            condition: None,
            details: None,
        }
    }

    #[must_use]
    pub fn owner(mut self, owner: UserId) -> Self {
        self.owner = Some(owner);
        self
    }

    #[must_use]
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    #[must_use]
    pub fn image(mut self, image: impl Into<String>) -> Self {
        self.image = Some(image.into());
        self
    }

    #[must_use]
    pub fn condition(mut self, condition: impl Into<String>) -> Self {
        self.condition = Some(condition.into());
        self
    }

    #[must_use]
    pub fn details(mut self, details: ListingDetails) -> Self {
        self.details = Some(details);
        self
    }

    /// Build the listing (returns error if required fields are missing).
    ///
    /// The initial status comes from the registry for the details' kind.
    pub fn build(self) -> Result<Listing, String> {
        let created_at = self.time.now_unix();
        let details = self.details.ok_or("details are required")?;
        let status = ListingStatusRegistry::initial(details.kind());

        Ok(Listing {
            id: ListingId::new(),
            owner: self.owner.ok_or("owner is required")?,
            title: self.title.ok_or("title is required")?,
            image: self.image,
            condition: self.condition,
            details,
            status,
            created_at,
            updated_at: created_at,
        })
    }
}
