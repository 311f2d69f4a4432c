//! Property-based tests for the vote state machine
//!
//! Tests invariants:
//! - At most one vote per (user, comment) and counters match the vote rows
//! - Casting the same vote twice from no vote (or that vote) is an identity
//! - `score == upvotes - downvotes` after every cast

use proptest::prelude::*;

use crate::core::voting::{VoteRowAction, VoteState, VoteType};
use crate::database::CommentOps;
use crate::tests::common::{create_test_comment, create_test_db, seed_catalog};

// ============================================================================
// Strategies
// ============================================================================

fn arb_vote() -> impl Strategy<Value = VoteType> {
    prop_oneof![Just(VoteType::Up), Just(VoteType::Down)]
}

fn arb_state() -> impl Strategy<Value = VoteState> {
    prop_oneof![
        Just(VoteState::NoVote),
        Just(VoteState::Upvoted),
        Just(VoteState::Downvoted),
    ]
}

/// Sequence of (voter index, vote) casts against one comment
fn arb_casts() -> impl Strategy<Value = Vec<(usize, VoteType)>> {
    prop::collection::vec((0usize..4, arb_vote()), 0..24)
}

// ============================================================================
// Pure state machine
// ============================================================================

proptest! {
    #[test]
    fn prop_same_vote_twice_is_identity(state in arb_state(), vote in arb_vote()) {
        // From an opposite vote the first cast flips, so the pair is not an identity
        prop_assume!(state.vote().map_or(true, |v| v == vote));

        let first = state.transition(vote);
        let second = first.next.transition(vote);

        prop_assert_eq!(second.next, state);
        prop_assert_eq!(first.upvote_delta + second.upvote_delta, 0);
        prop_assert_eq!(first.downvote_delta + second.downvote_delta, 0);
    }

    #[test]
    fn prop_pure_counters_track_rows(casts in arb_casts()) {
        let mut states = [VoteState::NoVote; 4];
        let (mut up, mut down) = (0i64, 0i64);

        for (voter, vote) in casts {
            let t = states[voter].transition(vote);
            match (states[voter], t.action) {
                (VoteState::NoVote, VoteRowAction::Insert(v)) => prop_assert_eq!(v, vote),
                (VoteState::NoVote, _) => prop_assert!(false, "no-vote must insert"),
                (_, VoteRowAction::Insert(_)) => prop_assert!(false, "existing vote must not insert"),
                _ => {}
            }
            up += t.upvote_delta;
            down += t.downvote_delta;
            states[voter] = t.next;
        }

        let rows_up = states.iter().filter(|s| **s == VoteState::Upvoted).count() as i64;
        let rows_down = states.iter().filter(|s| **s == VoteState::Downvoted).count() as i64;
        prop_assert_eq!(up, rows_up);
        prop_assert_eq!(down, rows_down);
    }
}

// ============================================================================
// Stored counters
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn prop_stored_counters_match_vote_rows(casts in arb_casts()) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let (db, _temp) = create_test_db().await;
            let catalog = seed_catalog(&db, "film-p").await;
            let comment = create_test_comment(&db, &catalog.episode.id, "author", "prop").await;

            for (voter, vote) in &casts {
                let outcome = db
                    .cast_vote(&format!("voter-{voter}"), &comment.id, *vote)
                    .await
                    .unwrap()
                    .unwrap();
                assert_eq!(outcome.score, outcome.upvotes - outcome.downvotes);
                assert!(outcome.upvotes >= 0 && outcome.downvotes >= 0);
            }

            let stored = db.get_comment(&comment.id).await.unwrap().unwrap();
            let (rows_up, rows_down) = db.count_vote_rows(&comment.id).await.unwrap();
            assert_eq!((stored.upvotes, stored.downvotes), (rows_up, rows_down));
            assert_eq!(stored.score, stored.upvotes - stored.downvotes);
        });
    }
}
