//! Idempotency, ordering, and notification edge cases.

use crate::common::MarketHarness;
use bazaar::{BazaarError, ConversationEvent, ConversationStatus, ListingStatus, Sender};

#[tokio::test]
async fn test_get_or_create_returns_same_conversation() {
    let harness = MarketHarness::new();
    let owner = harness.user(1);
    let buyer = harness.user(2);
    let listing = harness.sell_listing(&owner).await;

    let first = harness.connect(&buyer, &listing).await;
    let second = harness.connect(&buyer, &listing).await;

    assert_eq!(first.id, second.id);
    assert_eq!(harness.datastore.document_count("conversations").await, 1);

    // Only the first call emits a Created event.
    let created: Vec<_> = harness
        .notifier
        .events()
        .await
        .into_iter()
        .filter(|e| matches!(e, ConversationEvent::Created { .. }))
        .collect();
    assert_eq!(created.len(), 1);
}

#[tokio::test]
async fn test_get_or_create_idempotent_across_engine_instances() {
    let harness = MarketHarness::new();
    let owner = harness.user(1);
    let buyer = harness.user(2);
    let listing = harness.sell_listing(&owner).await;

    // A second engine over the same storage, as two backend replicas would be.
    let second_engine = bazaar::NegotiationEngine::new(
        harness.datastore.clone(),
        harness.time.clone(),
        bazaar::NoopNotifier,
    );

    let first = harness.connect(&buyer, &listing).await;
    let second = second_engine
        .create_or_get_conversation(&buyer, listing.id)
        .await
        .unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(harness.datastore.document_count("conversations").await, 1);
}

#[tokio::test]
async fn test_finalize_three_times_completes_once() {
    let harness = MarketHarness::new();
    let owner = harness.user(1);
    let buyer = harness.user(2);
    let listing = harness.sell_listing(&owner).await;
    let conversation = harness.connect(&buyer, &listing).await;

    harness
        .engine
        .request_finalize(&buyer, conversation.id)
        .await
        .unwrap();
    harness
        .engine
        .request_finalize(&owner, conversation.id)
        .await
        .unwrap();
    let third = harness
        .engine
        .request_finalize(&buyer, conversation.id)
        .await
        .unwrap();

    assert_eq!(third.status, ConversationStatus::Completed);
    assert_eq!(harness.listing_status(&listing).await, ListingStatus::Sold);

    let completions: Vec<_> = harness
        .notifier
        .events()
        .await
        .into_iter()
        .filter(|e| matches!(e, ConversationEvent::DealCompleted { .. }))
        .collect();
    assert_eq!(completions.len(), 1);
}

#[tokio::test]
async fn test_double_finalize_by_same_participant_sets_one_flag() {
    let harness = MarketHarness::new();
    let owner = harness.user(1);
    let buyer = harness.user(2);
    let listing = harness.sell_listing(&owner).await;
    let conversation = harness.connect(&buyer, &listing).await;

    harness
        .engine
        .request_finalize(&buyer, conversation.id)
        .await
        .unwrap();
    let repeat = harness
        .engine
        .request_finalize(&buyer, conversation.id)
        .await
        .unwrap();

    assert_eq!(repeat.finalized_count(), 1);
    assert_eq!(repeat.status, ConversationStatus::Active);
}

#[tokio::test]
async fn test_message_order_survives_frozen_clock() {
    let harness = MarketHarness::new();
    let owner = harness.user(1);
    let buyer = harness.user(2);
    let listing = harness.sell_listing(&owner).await;
    let conversation = harness.connect(&buyer, &listing).await;

    // The mock clock never advances; ordering must still hold.
    for body in ["one", "two", "three", "four"] {
        harness
            .engine
            .send_message(&buyer, conversation.id, body)
            .await
            .unwrap();
    }

    let messages = harness
        .engine
        .list_messages(&owner, conversation.id)
        .await
        .unwrap();
    let bodies: Vec<_> = messages.iter().map(|m| m.body.as_str()).collect();
    assert_eq!(bodies, vec!["one", "two", "three", "four"]);

    for pair in messages.windows(2) {
        assert!(pair[0].created_at < pair[1].created_at);
    }
}

#[tokio::test]
async fn test_system_messages_only_from_transitions() {
    let harness = MarketHarness::new();
    let owner = harness.user(1);
    let buyer = harness.user(2);
    let listing = harness.sell_listing(&owner).await;

    let conversation = harness.complete_deal(&listing, &buyer).await;
    harness
        .engine
        .send_message(&buyer, conversation.id, "thanks!")
        .await
        .unwrap();

    let messages = harness
        .engine
        .list_messages(&owner, conversation.id)
        .await
        .unwrap();
    for message in &messages {
        if message.is_system() {
            assert_eq!(message.sender, Sender::System);
        } else {
            assert!(message.sender.as_participant().is_some());
        }
    }
    assert_eq!(messages.iter().filter(|m| m.is_system()).count(), 1);
}

#[tokio::test]
async fn test_pending_not_set_after_another_deal_closed() {
    let harness = MarketHarness::new();
    let owner = harness.user(1);
    let first_buyer = harness.user(2);
    let second_buyer = harness.user(3);
    let listing = harness.sell_listing(&owner).await;

    let second_conversation = harness.connect(&second_buyer, &listing).await;
    harness.complete_deal(&listing, &first_buyer).await;
    assert_eq!(harness.listing_status(&listing).await, ListingStatus::Sold);

    // A late finalize on a parallel conversation must not drag the sold
    // listing back to Pending.
    harness
        .engine
        .request_finalize(&second_buyer, second_conversation.id)
        .await
        .unwrap();
    assert_eq!(harness.listing_status(&listing).await, ListingStatus::Sold);
}

#[tokio::test]
async fn test_inbox_sorted_by_latest_activity() {
    let harness = MarketHarness::new();
    let owner = harness.user(1);
    let first_buyer = harness.user(2);
    let second_buyer = harness.user(3);
    let listing = harness.sell_listing(&owner).await;

    let first = harness.connect(&first_buyer, &listing).await;
    harness.advance_time(10);
    let second = harness.connect(&second_buyer, &listing).await;

    let inbox = harness.engine.conversations_for(&owner).await.unwrap();
    assert_eq!(inbox[0].id, second.id);

    harness.advance_time(10);
    harness
        .engine
        .send_message(&first_buyer, first.id, "bumping this")
        .await
        .unwrap();

    let inbox = harness.engine.conversations_for(&owner).await.unwrap();
    assert_eq!(inbox[0].id, first.id);
    assert_eq!(inbox[1].id, second.id);
}

#[tokio::test]
async fn test_retract_is_rejected_after_completion_but_finalize_is_not() {
    let harness = MarketHarness::new();
    let owner = harness.user(1);
    let buyer = harness.user(2);
    let listing = harness.sell_listing(&owner).await;
    let conversation = harness.complete_deal(&listing, &buyer).await;

    assert!(harness
        .engine
        .request_finalize(&buyer, conversation.id)
        .await
        .is_ok());
    assert!(matches!(
        harness
            .engine
            .retract_finalize(&buyer, conversation.id)
            .await,
        Err(BazaarError::InvalidOperation(_))
    ));
}
