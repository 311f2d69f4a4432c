//! Media Reference Database Tests

use crate::database::{ContentOps, MediaRefOps};
use crate::tests::common::{create_test_db, seed_catalog};

#[tokio::test]
async fn test_rewrite_media_key_updates_all_columns() {
    let (db, _temp) = create_test_db().await;
    let catalog = seed_catalog(&db, "film-a").await;
    let old_key = "audio/film-a/ep-1/0000.mp3";

    sqlx::query("UPDATE content_items SET cover_key = ? WHERE id = ?")
        .bind(old_key)
        .bind(&catalog.film.id)
        .execute(db.pool())
        .await
        .unwrap();

    assert_eq!(db.count_media_references(old_key).await.unwrap(), 2);

    let changed = db.rewrite_media_key(old_key, "audio/film-a/ep-1/0000.opus").await.unwrap();
    assert_eq!(changed, 2);

    assert_eq!(db.count_media_references(old_key).await.unwrap(), 0);
    assert_eq!(db.count_media_references("audio/film-a/ep-1/0000.opus").await.unwrap(), 2);

    let card = db.get_card(&catalog.cards[0].id).await.unwrap().unwrap();
    assert_eq!(card.audio_key.as_deref(), Some("audio/film-a/ep-1/0000.opus"));
    let untouched = db.get_card(&catalog.cards[1].id).await.unwrap().unwrap();
    assert_eq!(untouched.audio_key.as_deref(), Some("audio/film-a/ep-1/0001.mp3"));
}

#[tokio::test]
async fn test_rewrite_unreferenced_key_is_noop() {
    let (db, _temp) = create_test_db().await;
    seed_catalog(&db, "film-a").await;
    assert_eq!(db.rewrite_media_key("audio/none.mp3", "audio/none.opus").await.unwrap(), 0);
}
