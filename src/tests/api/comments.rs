//! Comment and vote endpoint tests

use axum::http::StatusCode;
use serde_json::json;

use super::{get, post_json};
use crate::database::CommentOps;
use crate::tests::common::{create_test_app, create_test_user, seed_catalog};

#[tokio::test]
async fn test_create_comment_trims_text_and_joins_author() {
    let app = create_test_app().await;
    seed_catalog(&app.state.db, "film-a").await;
    create_test_user(&app.state.db, "user-1", "Aiko").await;

    let (status, body) = post_json(
        &app.state,
        "/api/episodes/comments",
        json!({"user_id": "user-1", "film_slug": "film-a", "episode_slug": "ep-1", "text": " hello "}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["text"], "hello");
    assert_eq!(body["display_name"], "Aiko");
    assert_eq!(body["upvotes"], 0);
    assert_eq!(body["score"], 0);
}

#[tokio::test]
async fn test_create_comment_validation() {
    let app = create_test_app().await;
    let catalog = seed_catalog(&app.state.db, "film-a").await;

    let too_long = "あ".repeat(5001);
    let cases = [
        json!({"film_slug": "film-a", "episode_slug": "ep-1", "text": "hi"}),
        json!({"user_id": "u", "film_slug": "film-a", "episode_slug": "ep-1"}),
        json!({"user_id": "u", "film_slug": "film-a", "episode_slug": "ep-1", "text": "   "}),
        json!({"user_id": "u", "film_slug": "film-a", "episode_slug": "ep-1", "text": too_long}),
        json!({"user_id": "", "film_slug": "film-a", "episode_slug": "ep-1", "text": "hi"}),
    ];
    for case in cases {
        let (status, body) = post_json(&app.state, "/api/episodes/comments", case.clone()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "case {case}");
        assert!(body["error"].is_string());
    }

    assert!(app.state.db.list_episode_comments(&catalog.episode.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_comment_of_exactly_max_length_accepted() {
    let app = create_test_app().await;
    seed_catalog(&app.state.db, "film-a").await;

    let (status, body) = post_json(
        &app.state,
        "/api/episodes/comments",
        json!({"user_id": "u", "film_slug": "film-a", "episode_slug": "ep-1", "text": "é".repeat(5000)}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["text"].as_str().unwrap().chars().count(), 5000);
}

#[tokio::test]
async fn test_comment_on_unknown_episode_is_not_found() {
    let app = create_test_app().await;
    seed_catalog(&app.state.db, "film-a").await;

    let (status, _) = post_json(
        &app.state,
        "/api/episodes/comments",
        json!({"user_id": "u", "film_slug": "film-a", "episode_slug": "ep-9", "text": "hi"}),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = get(&app.state, "/api/episodes/comments?film_slug=nope&episode_slug=ep-1").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_list_comments_requires_params() {
    let app = create_test_app().await;
    let (status, _) = get(&app.state, "/api/episodes/comments?film_slug=film-a").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_vote_flow() {
    let app = create_test_app().await;
    seed_catalog(&app.state.db, "film-a").await;

    let (_, comment) = post_json(
        &app.state,
        "/api/episodes/comments",
        json!({"user_id": "author", "film_slug": "film-a", "episode_slug": "ep-1", "text": "nice"}),
    )
    .await;
    let comment_id = comment["id"].as_str().unwrap().to_string();
    let vote = |vote_type: i64| json!({"user_id": "voter", "comment_id": comment_id, "vote_type": vote_type});

    let (status, body) = post_json(&app.state, "/api/episodes/comments/vote", vote(1)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"success": true, "upvotes": 1, "downvotes": 0, "score": 1, "user_vote": 1}));

    let (_, body) = post_json(&app.state, "/api/episodes/comments/vote", vote(1)).await;
    assert_eq!(body, json!({"success": true, "upvotes": 0, "downvotes": 0, "score": 0, "user_vote": null}));

    post_json(&app.state, "/api/episodes/comments/vote", vote(1)).await;
    let (_, body) = post_json(&app.state, "/api/episodes/comments/vote", vote(-1)).await;
    assert_eq!(body, json!({"success": true, "upvotes": 0, "downvotes": 1, "score": -1, "user_vote": -1}));

    let uri = format!("/api/episodes/comments/votes?user_id=voter&comment_ids={comment_id},%20,other");
    let (status, body) = get(&app.state, &uri).await;
    assert_eq!(status, StatusCode::OK);
    let mut expected = serde_json::Map::new();
    expected.insert(comment_id.clone(), json!(-1));
    assert_eq!(body, serde_json::Value::Object(expected));
}

#[tokio::test]
async fn test_invalid_vote_type_mutates_nothing() {
    let app = create_test_app().await;
    let catalog = seed_catalog(&app.state.db, "film-a").await;
    let comment = crate::tests::common::create_test_comment(&app.state.db, &catalog.episode.id, "a", "x").await;

    for vote_type in [0, 2, -2] {
        let (status, _) = post_json(
            &app.state,
            "/api/episodes/comments/vote",
            json!({"user_id": "voter", "comment_id": comment.id, "vote_type": vote_type}),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    let (status, _) = post_json(
        &app.state,
        "/api/episodes/comments/vote",
        json!({"user_id": "voter", "comment_id": comment.id}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    assert_eq!(app.state.db.count_vote_rows(&comment.id).await.unwrap(), (0, 0));
}

#[tokio::test]
async fn test_vote_on_unknown_comment_is_not_found() {
    let app = create_test_app().await;
    let (status, body) = post_json(
        &app.state,
        "/api/episodes/comments/vote",
        json!({"user_id": "voter", "comment_id": "missing", "vote_type": 1}),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().contains("not found"));
}

#[tokio::test]
async fn test_vote_status_with_empty_ids() {
    let app = create_test_app().await;

    let (status, body) = get(&app.state, "/api/episodes/comments/votes?user_id=voter&comment_ids=").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({}));

    let (status, body) = get(&app.state, "/api/episodes/comments/votes?user_id=voter&comment_ids=,,").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({}));

    let (status, _) = get(&app.state, "/api/episodes/comments/votes?comment_ids=a,b").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_vote_status_requires_comment_ids() {
    let app = create_test_app().await;

    let (status, body) = get(&app.state, "/api/episodes/comments/votes?user_id=voter").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Missing required parameter: comment_ids");
}

#[tokio::test]
async fn test_list_comments_sorted() {
    let app = create_test_app().await;
    let catalog = seed_catalog(&app.state.db, "film-a").await;
    let low = crate::tests::common::create_test_comment(&app.state.db, &catalog.episode.id, "a", "low").await;
    let high = crate::tests::common::create_test_comment(&app.state.db, &catalog.episode.id, "a", "high").await;
    app.state
        .db
        .cast_vote("v", &high.id, crate::core::voting::VoteType::Up)
        .await
        .unwrap();

    let (status, body) = get(&app.state, "/api/episodes/comments?film_slug=film-a&episode_slug=ep-1").await;
    assert_eq!(status, StatusCode::OK);
    let ids: Vec<&str> = body.as_array().unwrap().iter().map(|c| c["id"].as_str().unwrap()).collect();
    assert_eq!(ids, vec![high.id.as_str(), low.id.as_str()]);
}
