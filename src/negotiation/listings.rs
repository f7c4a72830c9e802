//! Owner-side listing operations and status writes.

use serde_json::json;
use tracing::{debug, info};

use crate::config::collections;
use crate::error::{BazaarError, BazaarResult};
use crate::marketplace::{Listing, ListingId, ListingStatus, UserId};
use crate::traits::{from_doc, to_doc, Datastore, FieldWrite, TimeProvider};

/// Datastore operations specialized for marketplace listings.
///
/// Creation and deletion are owner actions; status writes after creation
/// belong to the negotiation engine.
pub struct ListingOperations<D, T> {
    datastore: D,
    time: T,
}

impl<D: Datastore, T: TimeProvider + Clone> ListingOperations<D, T> {
    pub const fn new(datastore: D, time: T) -> Self {
        Self { datastore, time }
    }

    /// Publish a new listing and bump the owner's post count.
    pub async fn create_listing(&self, listing: &Listing) -> BazaarResult<()> {
        self.datastore
            .put(
                collections::LISTINGS,
                &listing.id.to_string(),
                to_doc(listing)?,
            )
            .await?;

        let count = self.post_count(&listing.owner).await?;
        self.datastore
            .update(
                collections::PROFILES,
                listing.owner.as_str(),
                vec![FieldWrite::new("post_count", json!(count + 1))],
            )
            .await?;

        info!(
            listing = %listing.id,
            owner = %listing.owner,
            kind = %listing.kind(),
            "listing created"
        );
        Ok(())
    }

    /// Retrieve a listing, failing with `NotFound` if absent.
    pub async fn get_listing(&self, id: ListingId) -> BazaarResult<Listing> {
        let doc = self
            .datastore
            .get(collections::LISTINGS, &id.to_string())
            .await?;
        doc.map(from_doc)
            .transpose()?
            .ok_or_else(|| BazaarError::NotFound(format!("listing {id}")))
    }

    /// Delete a listing. Owner-only; decrements the owner's post count.
    pub async fn delete_listing(&self, caller: &UserId, id: ListingId) -> BazaarResult<()> {
        let listing = self.get_listing(id).await?;
        if &listing.owner != caller {
            return Err(BazaarError::Forbidden(
                "only the owner can delete a listing".to_string(),
            ));
        }

        self.datastore
            .delete(collections::LISTINGS, &id.to_string())
            .await?;

        let count = self.post_count(caller).await?;
        self.datastore
            .update(
                collections::PROFILES,
                caller.as_str(),
                vec![FieldWrite::new("post_count", json!(count.saturating_sub(1)))],
            )
            .await?;

        info!(listing = %id, owner = %caller, "listing deleted");
        Ok(())
    }

    /// Write a new status onto an existing listing.
    pub async fn set_status(&self, id: ListingId, status: ListingStatus) -> BazaarResult<()> {
        // Existence check first so a vanished listing surfaces as NotFound
        // rather than an upsert of a partial document.
        self.get_listing(id).await?;

        self.datastore
            .update(
                collections::LISTINGS,
                &id.to_string(),
                vec![
                    FieldWrite::new("status", json!(status)),
                    FieldWrite::new("updated_at", json!(self.time.now_unix())),
                ],
            )
            .await?;
        debug!(listing = %id, status = %status, "listing status updated");
        Ok(())
    }

    /// How many posts a user currently has.
    pub async fn post_count(&self, user: &UserId) -> BazaarResult<u32> {
        let doc = self
            .datastore
            .get(collections::PROFILES, user.as_str())
            .await?;
        Ok(doc
            .and_then(|d| d.get("post_count").and_then(serde_json::Value::as_u64))
            .unwrap_or(0) as u32)
    }
}
