use actix_web::http::{Method, StatusCode};
use serde_json::{json, Value};

mod common;
use common::*;

fn titles(body: &Value) -> Vec<String> {
    body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v["title"].as_str().unwrap().to_string())
        .collect()
}

fn asset(url: &str) -> &str {
    url.trim_start_matches(MEDIA_URL).trim_start_matches('/')
}

#[actix_web::test]
async fn test_publish_requires_every_field() {
    let (app, media) = setup_test_app().await;
    let session = signup(&app).await;

    let req = MultipartBody::new()
        .text("description", "   ")
        .apply(authed(Method::POST, "/api/v1/videos", &session.access_token));
    let (status, body) = call(&app, req).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "All fields are required");
    let fields: Vec<&str> = body["errors"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["field"].as_str().unwrap())
        .collect();
    assert_eq!(fields, vec!["title", "description", "video", "thumbnail"]);
    // Only the avatar from registration.
    assert_eq!(media.len().await, 1);
}

#[actix_web::test]
async fn test_publish_stores_media_and_duration() {
    let (app, media) = setup_test_app().await;
    let session = signup(&app).await;

    let video = publish(&app, &session, "Rust in production").await;

    assert_eq!(video["title"], "Rust in production");
    assert_eq!(video["description"], "All about Rust in production");
    assert_eq!(video["duration"], VIDEO_DURATION);
    assert_eq!(video["views"], 0);
    assert_eq!(video["isPublished"], true);
    assert_eq!(video["owner"], session.id.as_str());

    let video_file = video["videoFile"].as_str().unwrap();
    let thumbnail = video["thumbnail"].as_str().unwrap();
    assert!(asset(video_file).starts_with("videos/"));
    assert!(asset(thumbnail).starts_with("images/"));
    assert!(media.contains(asset(video_file)).await);
    assert!(media.contains(asset(thumbnail)).await);

    let req = video_form("alias route").apply(authed(
        Method::POST,
        "/api/v1/videos/upload",
        &session.access_token,
    ));
    let (status, body) = call(&app, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["title"], "alias route");
}

#[actix_web::test]
async fn test_publish_removes_video_when_thumbnail_upload_fails() {
    let (app, media) = setup_test_app_with_media(test_media().with_capacity(2)).await;
    let session = signup(&app).await;

    let req = video_form("half done").apply(authed(Method::POST, "/api/v1/videos", &session.access_token));
    let (status, _) = call(&app, req).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(media.len().await, 1);

    let (_, body) = send(&app, Method::GET, "/api/v1/videos", &session.access_token).await;
    assert!(titles(&body).is_empty());
}

#[actix_web::test]
async fn test_get_video_counts_views() {
    let (app, _media) = setup_test_app().await;
    let creator = signup(&app).await;
    let viewer = signup(&app).await;
    let video = publish(&app, &creator, "counted").await;
    let uri = format!("/api/v1/videos/{}", id_of(&video));

    let (status, body) = send(&app, Method::GET, &uri, &viewer.access_token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["views"], 1);
    assert_eq!(body["data"]["owner"]["_id"], creator.id.as_str());
    assert_eq!(body["data"]["owner"]["username"], creator.username.as_str());

    let (_, body) = send(&app, Method::GET, &uri, &viewer.access_token).await;
    assert_eq!(body["data"]["views"], 2);

    let (_, history) = send(&app, Method::GET, "/api/v1/users/watch-history", &viewer.access_token).await;
    assert_eq!(history["data"].as_array().unwrap().len(), 1);
}

#[actix_web::test]
async fn test_drafts_are_hidden_from_other_users() {
    let (app, _media) = setup_test_app().await;
    let creator = signup(&app).await;
    let stranger = signup(&app).await;
    let video = publish(&app, &creator, "secret draft").await;
    let id = id_of(&video);

    let (status, body) = send(
        &app,
        Method::PATCH,
        &format!("/api/v1/videos/toggle/publish/{}", id),
        &creator.access_token,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["isPublished"], false);
    assert_eq!(body["message"], "Video unpublished");

    let uri = format!("/api/v1/videos/{}", id);
    let (status, _) = send(&app, Method::GET, &uri, &stranger.access_token).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = send(&app, Method::GET, &uri, &creator.access_token).await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = send(&app, Method::GET, "/api/v1/videos", &stranger.access_token).await;
    assert!(titles(&body).is_empty());
    let (_, body) = send(&app, Method::GET, "/api/v1/videos", &creator.access_token).await;
    assert_eq!(titles(&body), vec!["secret draft"]);

    let (status, _) = send(
        &app,
        Method::PATCH,
        &format!("/api/v1/videos/toggle/publish/{}", id),
        &stranger.access_token,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn test_watch_history_hides_unpublished_videos() {
    let (app, _media) = setup_test_app().await;
    let creator = signup(&app).await;
    let viewer = signup(&app).await;
    let id = id_of(&publish(&app, &creator, "pulled").await);
    send(&app, Method::GET, &format!("/api/v1/videos/{}", id), &viewer.access_token).await;
    send(&app, Method::GET, &format!("/api/v1/videos/{}", id), &creator.access_token).await;

    send(
        &app,
        Method::PATCH,
        &format!("/api/v1/videos/toggle/publish/{}", id),
        &creator.access_token,
    )
    .await;

    let (_, history) = send(&app, Method::GET, "/api/v1/users/watch-history", &viewer.access_token).await;
    assert_eq!(history["data"], json!([]));
    let (_, history) = send(&app, Method::GET, "/api/v1/users/watch-history", &creator.access_token).await;
    assert_eq!(history["data"][0]["title"], "pulled");
}

#[actix_web::test]
async fn test_list_sorts_searches_and_pages() {
    let (app, _media) = setup_test_app().await;
    let alice = signup(&app).await;
    let bob = signup(&app).await;

    for title in ["banana bread", "apple pie", "cherry tart"] {
        publish(&app, &alice, title).await;
    }
    publish(&app, &bob, "apple crumble").await;

    let (status, body) = send(&app, Method::GET, "/api/v1/videos", &alice.access_token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        titles(&body),
        vec!["apple crumble", "cherry tart", "apple pie", "banana bread"]
    );

    let (_, body) = send(
        &app,
        Method::GET,
        "/api/v1/videos?sortBy=title&sortType=asc&page=2&limit=2",
        &alice.access_token,
    )
    .await;
    assert_eq!(titles(&body), vec!["banana bread", "cherry tart"]);

    let (_, body) = send(&app, Method::GET, "/api/v1/videos?query=APPLE", &alice.access_token).await;
    assert_eq!(titles(&body), vec!["apple crumble", "apple pie"]);

    let uri = format!("/api/v1/videos?query=apple&userId={}", bob.id);
    let (_, body) = send(&app, Method::GET, &uri, &alice.access_token).await;
    assert_eq!(titles(&body), vec!["apple crumble"]);

    let (status, _) = send(&app, Method::GET, "/api/v1/videos?sortBy=password", &alice.access_token).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = send(&app, Method::GET, "/api/v1/videos?userId=nope", &alice.access_token).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn test_list_past_last_page_is_empty() {
    let (app, _media) = setup_test_app().await;
    let session = signup(&app).await;
    publish(&app, &session, "only one").await;

    let (status, body) = send(
        &app,
        Method::GET,
        "/api/v1/videos?page=4294967295&limit=100",
        &session.access_token,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(titles(&body).is_empty());
}

#[actix_web::test]
async fn test_malformed_and_missing_ids() {
    let (app, _media) = setup_test_app().await;
    let session = signup(&app).await;

    let (status, body) = send(&app, Method::GET, "/api/v1/videos/not-an-id", &session.access_token).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);

    let uri = format!("/api/v1/videos/{}", MISSING_ID);
    let (status, body) = send(&app, Method::GET, &uri, &session.access_token).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Video not found");
}

#[actix_web::test]
async fn test_update_is_owner_only() {
    let (app, media) = setup_test_app().await;
    let creator = signup(&app).await;
    let stranger = signup(&app).await;
    let video = publish(&app, &creator, "before").await;
    let uri = format!("/api/v1/videos/{}", id_of(&video));
    let old_thumbnail = video["thumbnail"].as_str().unwrap().to_string();

    let form = || {
        MultipartBody::new()
            .text("title", "after")
            .text("description", "new words")
    };

    let (status, foreign) = call(&app, form().apply(authed(Method::PATCH, &uri, &stranger.access_token))).await;
    let missing_uri = format!("/api/v1/videos/{}", MISSING_ID);
    let (missing_status, missing) =
        call(&app, form().apply(authed(Method::PATCH, &missing_uri, &creator.access_token))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(missing_status, StatusCode::NOT_FOUND);
    assert_eq!(foreign["message"], missing["message"]);

    let (status, body) = call(&app, form().apply(authed(Method::PATCH, &uri, &creator.access_token))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["title"], "after");
    assert_eq!(body["data"]["thumbnail"], old_thumbnail.as_str());
    assert!(media.contains(asset(&old_thumbnail)).await);

    let req = form()
        .image("thumbnail")
        .apply(authed(Method::PATCH, &uri, &creator.access_token));
    let (status, body) = call(&app, req).await;
    assert_eq!(status, StatusCode::OK);
    let new_thumbnail = body["data"]["thumbnail"].as_str().unwrap();
    assert_ne!(new_thumbnail, old_thumbnail);
    assert!(media.contains(asset(new_thumbnail)).await);
    assert!(!media.contains(asset(&old_thumbnail)).await);

    let req = MultipartBody::new()
        .text("title", "only a title")
        .apply(authed(Method::PATCH, &uri, &creator.access_token));
    let (status, body) = call(&app, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errors"][0]["field"], "description");
}

#[actix_web::test]
async fn test_delete_cascades() {
    let (app, media) = setup_test_app().await;
    let creator = signup(&app).await;
    let fan = signup(&app).await;
    let video = publish(&app, &creator, "doomed").await;
    let id = id_of(&video);
    let uri = format!("/api/v1/videos/{}", id);

    send(&app, Method::GET, &uri, &fan.access_token).await;
    send_json(
        &app,
        Method::POST,
        &format!("/api/v1/comments/video/{}", id),
        &fan.access_token,
        json!({ "content": "first!" }),
    )
    .await;
    send(&app, Method::POST, &format!("/api/v1/likes/video/{}", id), &fan.access_token).await;
    let (_, playlist) = send_json(
        &app,
        Method::POST,
        "/api/v1/playlists",
        &fan.access_token,
        json!({ "name": "faves", "description": "good stuff" }),
    )
    .await;
    let playlist_id = id_of(&playlist["data"]);
    send(
        &app,
        Method::PATCH,
        &format!("/api/v1/playlists/{}/{}", playlist_id, id),
        &fan.access_token,
    )
    .await;

    let (status, _) = send(&app, Method::DELETE, &uri, &fan.access_token).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = send(&app, Method::DELETE, &uri, &creator.access_token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Video deleted successfully");
    assert!(!media.contains(asset(video["videoFile"].as_str().unwrap())).await);
    assert!(!media.contains(asset(video["thumbnail"].as_str().unwrap())).await);

    let (status, _) = send(&app, Method::GET, &uri, &creator.access_token).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, liked) = send(&app, Method::GET, "/api/v1/likes", &fan.access_token).await;
    assert_eq!(liked["data"], json!([]));
    let (_, history) = send(&app, Method::GET, "/api/v1/users/watch-history", &fan.access_token).await;
    assert_eq!(history["data"], json!([]));
    let (_, playlist) = send(
        &app,
        Method::GET,
        &format!("/api/v1/playlists/{}", playlist_id),
        &fan.access_token,
    )
    .await;
    assert_eq!(playlist["data"]["videos"], json!([]));
}
