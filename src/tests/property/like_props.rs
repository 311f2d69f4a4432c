//! Property-based tests for the like toggle
//!
//! Tests invariants:
//! - `like_count` equals the number of like rows under sequential use
//! - `like_count` is never negative
//! - Toggling twice leaves the state unchanged

use proptest::prelude::*;

use crate::database::LikeOps;
use crate::tests::common::{create_test_db, seed_catalog};

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn prop_like_count_matches_rows(toggles in prop::collection::vec(0usize..5, 0..30)) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let (db, _temp) = create_test_db().await;
            let catalog = seed_catalog(&db, "film-p").await;
            let mut liked = [false; 5];

            for user in &toggles {
                let result = db.toggle_like(&format!("user-{user}"), &catalog.film.id).await.unwrap();
                liked[*user] = !liked[*user];
                assert_eq!(result.liked, liked[*user]);
                assert!(result.like_count >= 0);
                assert_eq!(result.like_count, liked.iter().filter(|l| **l).count() as i64);
            }

            assert_eq!(
                db.get_like_count(&catalog.film.id).await.unwrap(),
                db.count_like_rows(&catalog.film.id).await.unwrap()
            );
        });
    }

    #[test]
    fn prop_double_toggle_is_noop(user in "[a-z]{1,8}") {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let (db, _temp) = create_test_db().await;
            let catalog = seed_catalog(&db, "film-p").await;
            db.toggle_like("someone", &catalog.film.id).await.unwrap();

            let before = db.get_like_count(&catalog.film.id).await.unwrap();
            db.toggle_like(&user, &catalog.film.id).await.unwrap();
            let after = db.toggle_like(&user, &catalog.film.id).await.unwrap();

            assert_eq!(after.like_count, before);
            assert_eq!(db.has_liked(&user, &catalog.film.id).await.unwrap(), user == "someone");
        });
    }
}
