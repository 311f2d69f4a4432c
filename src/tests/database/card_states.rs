//! Card State Database Tests
//!
//! Tests for SRS state upserts and the saved-card counter.

use crate::database::{CardStateOps, ContentOps, SrsState};
use crate::tests::common::{create_test_db, seed_catalog};

#[tokio::test]
async fn test_set_card_state_upserts() {
    let (db, _temp) = create_test_db().await;
    let catalog = seed_catalog(&db, "film-a").await;
    let card = &catalog.cards[0].id;

    let first = db.set_card_state("user-1", card, "film-a", SrsState::New).await.unwrap();
    assert_eq!(first.srs_state, SrsState::New);

    let second = db.set_card_state("user-1", card, "film-a", SrsState::Review).await.unwrap();
    assert_eq!(second.srs_state, SrsState::Review);

    let stored = db.get_card_state("user-1", card).await.unwrap().expect("State not found");
    assert_eq!(stored.srs_state, SrsState::Review);
    assert_eq!(stored.film_id, "film-a");
}

#[tokio::test]
async fn test_count_saved_cards_excludes_none() {
    let (db, _temp) = create_test_db().await;
    let catalog = seed_catalog(&db, "film-a").await;

    db.set_card_state("user-1", &catalog.cards[0].id, "film-a", SrsState::Learning).await.unwrap();
    db.set_card_state("user-1", &catalog.cards[1].id, "film-a", SrsState::Mastered).await.unwrap();
    db.set_card_state("user-1", &catalog.cards[2].id, "film-a", SrsState::None).await.unwrap();
    db.set_card_state("user-2", &catalog.cards[0].id, "film-a", SrsState::New).await.unwrap();

    assert_eq!(db.count_saved_cards("user-1", "film-a").await.unwrap(), 2);
    assert_eq!(db.count_saved_cards("user-2", "film-a").await.unwrap(), 1);
    assert_eq!(db.count_saved_cards("user-3", "film-a").await.unwrap(), 0);
    assert_eq!(db.count_saved_cards("user-1", "film-b").await.unwrap(), 0);

    let saved = db.list_saved_cards("user-1", "film-a").await.unwrap();
    assert_eq!(saved.len(), 2);
    assert!(saved.iter().all(|s| s.srs_state.is_saved()));
}

#[tokio::test]
async fn test_unsaving_card_lowers_count() {
    let (db, _temp) = create_test_db().await;
    let catalog = seed_catalog(&db, "film-a").await;
    let card = &catalog.cards[0].id;

    db.set_card_state("user-1", card, "film-a", SrsState::New).await.unwrap();
    assert_eq!(db.count_saved_cards("user-1", "film-a").await.unwrap(), 1);

    db.set_card_state("user-1", card, "film-a", SrsState::None).await.unwrap();
    assert_eq!(db.count_saved_cards("user-1", "film-a").await.unwrap(), 0);
}

#[tokio::test]
async fn test_card_content_slug_resolution() {
    let (db, _temp) = create_test_db().await;
    let catalog = seed_catalog(&db, "film-a").await;

    assert_eq!(
        db.get_card_content_slug(&catalog.cards[1].id).await.unwrap().as_deref(),
        Some("film-a")
    );
    assert!(db.get_card_content_slug("missing").await.unwrap().is_none());
}
