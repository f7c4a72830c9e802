//! Listing kinds, the status vocabulary, and the per-kind status registry.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::BazaarError;

/// The four kinds of listing the marketplace supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListingKind {
    /// Fixed-price sale.
    Sell,
    /// Swap for another item.
    Trade,
    /// Time-boxed lending.
    Lend,
    /// Found item waiting to be claimed by its owner.
    Lost,
}

impl ListingKind {
    /// Every kind, for exhaustive table-driven tests.
    pub const ALL: [ListingKind; 4] = [Self::Sell, Self::Trade, Self::Lend, Self::Lost];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sell => "sell",
            Self::Trade => "trade",
            Self::Lend => "lend",
            Self::Lost => "lost",
        }
    }
}

impl fmt::Display for ListingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ListingKind {
    type Err = BazaarError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sell" => Ok(Self::Sell),
            "trade" => Ok(Self::Trade),
            "lend" => Ok(Self::Lend),
            "lost" => Ok(Self::Lost),
            other => Err(BazaarError::Config(format!("unknown listing type: {other}"))),
        }
    }
}

/// Status of a listing. The vocabulary is scoped per kind; `Pending` is
/// shared by the kinds whose deal flow signals one-sided finalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ListingStatus {
    #[serde(rename = "For Sale")]
    ForSale,
    #[serde(rename = "Available")]
    Available,
    #[serde(rename = "Waiting To Be Claimed")]
    WaitingToBeClaimed,
    #[serde(rename = "Pending")]
    Pending,
    #[serde(rename = "Sold")]
    Sold,
    #[serde(rename = "Borrowed")]
    Borrowed,
    #[serde(rename = "Traded")]
    Traded,
    #[serde(rename = "Claimed")]
    Claimed,
}

impl ListingStatus {
    /// The human-facing label, identical to the serialized form.
    pub const fn label(self) -> &'static str {
        match self {
            Self::ForSale => "For Sale",
            Self::Available => "Available",
            Self::WaitingToBeClaimed => "Waiting To Be Claimed",
            Self::Pending => "Pending",
            Self::Sold => "Sold",
            Self::Borrowed => "Borrowed",
            Self::Traded => "Traded",
            Self::Claimed => "Claimed",
        }
    }
}

impl fmt::Display for ListingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Maps each listing kind to its finite status vocabulary.
///
/// Pure lookup; no side effects.
pub struct ListingStatusRegistry;

impl ListingStatusRegistry {
    /// Status a listing of this kind carries on creation.
    pub const fn initial(kind: ListingKind) -> ListingStatus {
        match kind {
            ListingKind::Sell => ListingStatus::ForSale,
            ListingKind::Trade | ListingKind::Lend => ListingStatus::Available,
            ListingKind::Lost => ListingStatus::WaitingToBeClaimed,
        }
    }

    /// Status once a deal is closed.
    pub const fn terminal(kind: ListingKind) -> ListingStatus {
        match kind {
            ListingKind::Sell => ListingStatus::Sold,
            ListingKind::Trade => ListingStatus::Traded,
            ListingKind::Lend => ListingStatus::Borrowed,
            ListingKind::Lost => ListingStatus::Claimed,
        }
    }

    /// Intermediate status while one party has finalized but not both.
    pub const fn pending() -> ListingStatus {
        ListingStatus::Pending
    }
}
