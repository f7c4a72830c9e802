//! Lost-and-found flow integration tests: claims, approval, chat gating.

use crate::common::MarketHarness;
use bazaar::{
    BazaarError, ClaimAnswers, ClaimApproval, ConversationStatus, ListingStatus,
};

fn answers() -> ClaimAnswers {
    ClaimAnswers::new("last Tuesday evening", "platform 2", "black leather wallet")
}

#[tokio::test]
async fn test_chat_gated_until_claim_approved() {
    let harness = MarketHarness::new();
    let finder = harness.user(1);
    let claimant = harness.user(2);
    let listing = harness.lost_listing(&finder).await;
    let conversation = harness.connect(&claimant, &listing).await;

    // No chat before approval, for either side.
    assert!(matches!(
        harness
            .engine
            .send_message(&claimant, conversation.id, "that's mine!")
            .await,
        Err(BazaarError::InvalidOperation(_))
    ));
    assert!(matches!(
        harness
            .engine
            .send_message(&finder, conversation.id, "describe it")
            .await,
        Err(BazaarError::InvalidOperation(_))
    ));

    let claim = harness
        .engine
        .submit_claim(&claimant, conversation.id, answers())
        .await
        .unwrap();
    harness
        .engine
        .decide_claim(&finder, conversation.id, claim.id, true)
        .await
        .unwrap();

    // Chat opens after approval.
    harness
        .engine
        .send_message(&claimant, conversation.id, "thank you so much")
        .await
        .unwrap();
    let messages = harness
        .engine
        .list_messages(&finder, conversation.id)
        .await
        .unwrap();
    assert_eq!(messages.last().unwrap().body, "thank you so much");
}

#[tokio::test]
async fn test_approval_rejects_sibling_claims() {
    let harness = MarketHarness::new();
    let finder = harness.user(1);
    let claimant_a = harness.user(2);
    let claimant_b = harness.user(3);
    let listing = harness.lost_listing(&finder).await;

    // Two claimants, two separate conversations on the same listing.
    let conversation_a = harness.connect(&claimant_a, &listing).await;
    let conversation_b = harness.connect(&claimant_b, &listing).await;
    assert_ne!(conversation_a.id, conversation_b.id);

    let claim_a = harness
        .engine
        .submit_claim(&claimant_a, conversation_a.id, answers())
        .await
        .unwrap();
    let claim_b = harness
        .engine
        .submit_claim(
            &claimant_b,
            conversation_b.id,
            ClaimAnswers::new("Monday", "ticket hall", "brown wallet"),
        )
        .await
        .unwrap();

    let decided = harness
        .engine
        .decide_claim(&finder, conversation_a.id, claim_a.id, true)
        .await
        .unwrap();
    assert_eq!(decided.approval, ClaimApproval::Approved);

    // Exactly one approved claimant per listing: B was batch-rejected.
    let sibling = harness
        .engine
        .decide_claim(&finder, conversation_b.id, claim_b.id, true)
        .await;
    assert!(matches!(sibling, Err(BazaarError::InvalidOperation(_))));

    // A's conversation opened chat; B's did not.
    let current_a = harness.connect(&claimant_a, &listing).await;
    let current_b = harness.connect(&claimant_b, &listing).await;
    assert!(current_a.chat_open());
    assert_eq!(
        current_a.claim.unwrap().approved_claimant,
        Some(claimant_a.clone())
    );
    assert!(!current_b.chat_open());
    assert!(current_b.claim.unwrap().approved_claimant.is_none());
}

#[tokio::test]
async fn test_duplicate_claim_rejected() {
    let harness = MarketHarness::new();
    let finder = harness.user(1);
    let claimant = harness.user(2);
    let listing = harness.lost_listing(&finder).await;
    let conversation = harness.connect(&claimant, &listing).await;

    harness
        .engine
        .submit_claim(&claimant, conversation.id, answers())
        .await
        .unwrap();

    let second = harness
        .engine
        .submit_claim(&claimant, conversation.id, answers())
        .await;
    assert!(matches!(second, Err(BazaarError::InvalidOperation(_))));
}

#[tokio::test]
async fn test_only_owner_decides_claims() {
    let harness = MarketHarness::new();
    let finder = harness.user(1);
    let claimant = harness.user(2);
    let listing = harness.lost_listing(&finder).await;
    let conversation = harness.connect(&claimant, &listing).await;

    let claim = harness
        .engine
        .submit_claim(&claimant, conversation.id, answers())
        .await
        .unwrap();

    let result = harness
        .engine
        .decide_claim(&claimant, conversation.id, claim.id, true)
        .await;
    assert!(matches!(result, Err(BazaarError::Forbidden(_))));
}

#[tokio::test]
async fn test_claim_decided_only_once() {
    let harness = MarketHarness::new();
    let finder = harness.user(1);
    let claimant = harness.user(2);
    let listing = harness.lost_listing(&finder).await;
    let conversation = harness.connect(&claimant, &listing).await;

    let claim = harness
        .engine
        .submit_claim(&claimant, conversation.id, answers())
        .await
        .unwrap();
    harness
        .engine
        .decide_claim(&finder, conversation.id, claim.id, false)
        .await
        .unwrap();

    // A rejected claim is never re-opened.
    let again = harness
        .engine
        .decide_claim(&finder, conversation.id, claim.id, true)
        .await;
    assert!(matches!(again, Err(BazaarError::InvalidOperation(_))));
}

#[tokio::test]
async fn test_rejection_keeps_chat_closed() {
    let harness = MarketHarness::new();
    let finder = harness.user(1);
    let claimant = harness.user(2);
    let listing = harness.lost_listing(&finder).await;
    let conversation = harness.connect(&claimant, &listing).await;

    let claim = harness
        .engine
        .submit_claim(&claimant, conversation.id, answers())
        .await
        .unwrap();
    let decided = harness
        .engine
        .decide_claim(&finder, conversation.id, claim.id, false)
        .await
        .unwrap();
    assert_eq!(decided.approval, ClaimApproval::Rejected);

    assert!(matches!(
        harness
            .engine
            .send_message(&claimant, conversation.id, "please?")
            .await,
        Err(BazaarError::InvalidOperation(_))
    ));

    // The decision still leaves an audit trail in the thread.
    let messages = harness
        .engine
        .list_messages(&finder, conversation.id)
        .await
        .unwrap();
    assert_eq!(messages.last().unwrap().body, "Claim has been rejected");
}

#[tokio::test]
async fn test_claimant_cannot_finalize_without_approval() {
    let harness = MarketHarness::new();
    let finder = harness.user(1);
    let claimant = harness.user(2);
    let listing = harness.lost_listing(&finder).await;
    let conversation = harness.connect(&claimant, &listing).await;

    // Before any claim.
    assert!(matches!(
        harness
            .engine
            .request_finalize(&claimant, conversation.id)
            .await,
        Err(BazaarError::InvalidOperation(_))
    ));

    // Pending claim is not enough.
    harness
        .engine
        .submit_claim(&claimant, conversation.id, answers())
        .await
        .unwrap();
    assert!(matches!(
        harness
            .engine
            .request_finalize(&claimant, conversation.id)
            .await,
        Err(BazaarError::InvalidOperation(_))
    ));
}

#[tokio::test]
async fn test_lost_return_flow_completes() {
    let harness = MarketHarness::new();
    let finder = harness.user(1);
    let claimant = harness.user(2);
    let listing = harness.lost_listing(&finder).await;
    let conversation = harness.connect(&claimant, &listing).await;

    let claim = harness
        .engine
        .submit_claim(&claimant, conversation.id, answers())
        .await
        .unwrap();
    harness
        .engine
        .decide_claim(&finder, conversation.id, claim.id, true)
        .await
        .unwrap();

    // The listing stays "Waiting To Be Claimed" until both sides confirm
    // the hand-over; the claimant's sole finalize does not mark it Pending.
    harness
        .engine
        .request_finalize(&claimant, conversation.id)
        .await
        .unwrap();
    assert_eq!(
        harness.listing_status(&listing).await,
        ListingStatus::WaitingToBeClaimed
    );

    let completed = harness
        .engine
        .request_finalize(&finder, conversation.id)
        .await
        .unwrap();
    assert_eq!(completed.status, ConversationStatus::Completed);
    assert_eq!(harness.listing_status(&listing).await, ListingStatus::Claimed);

    let messages = harness
        .engine
        .list_messages(&claimant, conversation.id)
        .await
        .unwrap();
    assert_eq!(
        messages.last().unwrap().body,
        "Item has been returned to its owner"
    );
}
