use actix_web::http::{Method, StatusCode};
use serde_json::json;

mod common;
use common::*;

#[actix_web::test]
async fn test_toggle_subscription_twice() {
    let (app, _media) = setup_test_app().await;
    let channel = signup(&app).await;
    let fan = signup(&app).await;
    let uri = format!("/api/v1/subscriptions/toggle-subscription/{}", channel.id);
    let subscribers_uri = format!("/api/v1/subscriptions/{}", channel.id);

    let (status, body) = send(&app, Method::POST, &uri, &fan.access_token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["subscribed"], true);
    assert_eq!(body["message"], "Subscribed successfully");

    let (_, body) = send(&app, Method::GET, &subscribers_uri, &fan.access_token).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
    assert_eq!(body["data"][0]["_id"], fan.id.as_str());

    let (status, body) = send(&app, Method::POST, &uri, &fan.access_token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["subscribed"], false);
    assert_eq!(body["message"], "Unsubscribed successfully");

    let (_, body) = send(&app, Method::GET, &subscribers_uri, &fan.access_token).await;
    assert_eq!(body["data"], json!([]));
}

#[actix_web::test]
async fn test_cannot_subscribe_to_self_or_missing_channel() {
    let (app, _media) = setup_test_app().await;
    let session = signup(&app).await;

    let (status, body) = send(
        &app,
        Method::POST,
        &format!("/api/v1/subscriptions/toggle-subscription/{}", session.id),
        &session.access_token,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "You cannot subscribe to your own channel");

    let (status, body) = send(
        &app,
        Method::POST,
        &format!("/api/v1/subscriptions/toggle-subscription/{}", MISSING_ID),
        &session.access_token,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Channel not found");

    let (status, _) = send(
        &app,
        Method::GET,
        &format!("/api/v1/subscriptions/{}", MISSING_ID),
        &session.access_token,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn test_subscribed_channels_newest_first() {
    let (app, _media) = setup_test_app().await;
    let fan = signup(&app).await;
    let first = signup(&app).await;
    let second = signup(&app).await;

    for channel in [&first, &second] {
        send(
            &app,
            Method::POST,
            &format!("/api/v1/subscriptions/toggle-subscription/{}", channel.id),
            &fan.access_token,
        )
        .await;
    }

    let (status, body) = send(&app, Method::GET, "/api/v1/subscriptions", &fan.access_token).await;
    assert_eq!(status, StatusCode::OK);
    let names: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["username"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec![second.username.as_str(), first.username.as_str()]);
    assert!(body["data"][0].get("email").is_none());

    let (_, body) = send(&app, Method::GET, "/api/v1/subscriptions", &first.access_token).await;
    assert_eq!(body["data"], json!([]));
}
