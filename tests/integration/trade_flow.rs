//! Trade-flow integration tests.

use crate::common::MarketHarness;
use bazaar::{ConversationStatus, ListingStatus, TradeItem};

#[tokio::test]
async fn test_trade_conversation_seeds_owner_item() {
    let harness = MarketHarness::new();
    let owner = harness.user(1);
    let trader = harness.user(2);
    let listing = harness.trade_listing(&owner).await;

    let conversation = harness.connect(&trader, &listing).await;

    let items = conversation.trade_items.as_ref().unwrap();
    let seeded = items.get(&owner).unwrap();
    assert_eq!(seeded.title, "Record Player");
    assert_eq!(seeded.condition.as_deref(), Some("like new"));
    assert!(items.get(&trader).is_none());
}

#[tokio::test]
async fn test_counterparty_offer_recorded() {
    let harness = MarketHarness::new();
    let owner = harness.user(1);
    let trader = harness.user(2);
    let listing = harness.trade_listing(&owner).await;
    let conversation = harness.connect(&trader, &listing).await;

    let updated = harness
        .engine
        .offer_trade_item(
            &trader,
            conversation.id,
            TradeItem {
                title: "Film Camera".to_string(),
                image: None,
                condition: Some("scuffed".to_string()),
            },
        )
        .await
        .unwrap();

    let items = updated.trade_items.unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items.get(&trader).unwrap().title, "Film Camera");
    // The owner's seeded item is untouched.
    assert_eq!(items.get(&owner).unwrap().title, "Record Player");
}

#[tokio::test]
async fn test_trade_offer_rejected_for_sell_listing() {
    let harness = MarketHarness::new();
    let owner = harness.user(1);
    let buyer = harness.user(2);
    let listing = harness.sell_listing(&owner).await;
    let conversation = harness.connect(&buyer, &listing).await;

    let result = harness
        .engine
        .offer_trade_item(
            &buyer,
            conversation.id,
            TradeItem {
                title: "Film Camera".to_string(),
                image: None,
                condition: None,
            },
        )
        .await;

    assert!(matches!(result, Err(bazaar::BazaarError::InvalidOperation(_))));
}

#[tokio::test]
async fn test_trade_completion_sets_traded() {
    let harness = MarketHarness::new();
    let owner = harness.user(1);
    let trader = harness.user(2);
    let listing = harness.trade_listing(&owner).await;

    let conversation = harness.complete_deal(&listing, &trader).await;

    assert_eq!(conversation.status, ConversationStatus::Completed);
    assert_eq!(harness.listing_status(&listing).await, ListingStatus::Traded);

    let messages = harness
        .engine
        .list_messages(&owner, conversation.id)
        .await
        .unwrap();
    assert_eq!(messages.last().unwrap().body, "Deal marked as complete");
}

#[tokio::test]
async fn test_finalize_toggles_before_completion() {
    let harness = MarketHarness::new();
    let owner = harness.user(1);
    let trader = harness.user(2);
    let listing = harness.trade_listing(&owner).await;
    let conversation = harness.connect(&trader, &listing).await;

    // The trader can change their mind any number of times before the
    // owner commits.
    for _ in 0..2 {
        harness
            .engine
            .request_finalize(&trader, conversation.id)
            .await
            .unwrap();
        assert_eq!(harness.listing_status(&listing).await, ListingStatus::Pending);

        harness
            .engine
            .retract_finalize(&trader, conversation.id)
            .await
            .unwrap();
        assert_eq!(
            harness.listing_status(&listing).await,
            ListingStatus::Available
        );
    }

    let current = harness.connect(&trader, &listing).await;
    assert_eq!(current.finalized_count(), 0);
    assert_eq!(current.status, ConversationStatus::Active);
}
