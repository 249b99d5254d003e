#![allow(dead_code)]

use std::sync::Arc;

use actix_http::Request;
use actix_web::dev::{Service, ServiceResponse};
use actix_web::http::header::{AUTHORIZATION, CONTENT_TYPE};
use actix_web::http::{Method, StatusCode};
use actix_web::test::{self, TestRequest};
use actix_web::{web, App};
use chrono::Duration;
use serde_json::{json, Value};
use uuid::Uuid;

use vidtube_backend::config::AuthConfig;
use vidtube_backend::media::MemoryMediaStore;
use vidtube_backend::repositories::MemoryStore;
use vidtube_backend::{configure_extractors, errors, handlers, AppState};

pub const MEDIA_URL: &str = "http://media.test/media";
pub const VIDEO_DURATION: f64 = 42.5;
pub const PASSWORD: &str = "password123";

pub fn test_auth() -> AuthConfig {
    AuthConfig {
        access_secret: "test-access-secret".into(),
        access_ttl: Duration::minutes(15),
        refresh_secret: "test-refresh-secret".into(),
        refresh_ttl: Duration::days(10),
        bcrypt_cost: 4,
        cookie_secure: false,
    }
}

pub fn test_media() -> MemoryMediaStore {
    MemoryMediaStore::new(MEDIA_URL).with_video_duration(VIDEO_DURATION)
}

pub async fn setup_test_app() -> (
    impl Service<Request, Response = ServiceResponse, Error = actix_web::Error>,
    Arc<MemoryMediaStore>,
) {
    setup_test_app_with_media(test_media()).await
}

pub async fn setup_test_app_with_media(
    media: MemoryMediaStore,
) -> (
    impl Service<Request, Response = ServiceResponse, Error = actix_web::Error>,
    Arc<MemoryMediaStore>,
) {
    let media = Arc::new(media);
    let state = web::Data::new(AppState::new(
        Arc::new(MemoryStore::new()),
        media.clone(),
        test_auth(),
    ));

    let app = test::init_service(
        App::new()
            .app_data(state)
            .configure(configure_extractors(std::env::temp_dir(), 10 * 1024 * 1024))
            .configure(handlers::configure_routes)
            .default_service(web::to(errors::not_found)),
    )
    .await;
    (app, media)
}

/// Hand-built `multipart/form-data` body.
pub struct MultipartBody {
    boundary: String,
    body: Vec<u8>,
}

impl MultipartBody {
    pub fn new() -> Self {
        Self {
            boundary: format!("vidtube-{}", Uuid::new_v4().simple()),
            body: Vec::new(),
        }
    }

    pub fn text(mut self, name: &str, value: &str) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\nContent-Type: text/plain\r\n\r\n{}\r\n",
                self.boundary, name, value
            )
            .as_bytes(),
        );
        self
    }

    pub fn file(mut self, name: &str, file_name: &str, content_type: &str, bytes: &[u8]) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
                self.boundary, name, file_name, content_type
            )
            .as_bytes(),
        );
        self.body.extend_from_slice(bytes);
        self.body.extend_from_slice(b"\r\n");
        self
    }

    pub fn image(self, name: &str) -> Self {
        self.file(name, &format!("{}.png", name), "image/png", b"\x89PNG fake image")
    }

    pub fn apply(mut self, req: TestRequest) -> Request {
        self.body
            .extend_from_slice(format!("--{}--\r\n", self.boundary).as_bytes());
        req.insert_header((
            CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", self.boundary),
        ))
        .set_payload(self.body)
        .to_request()
    }
}

pub fn authed(method: Method, uri: &str, token: &str) -> TestRequest {
    TestRequest::default()
        .method(method)
        .uri(uri)
        .insert_header((AUTHORIZATION, format!("Bearer {}", token)))
}

pub async fn call<S>(app: &S, req: Request) -> (StatusCode, Value)
where
    S: Service<Request, Response = ServiceResponse, Error = actix_web::Error>,
{
    let resp = test::call_service(app, req).await;
    let status = resp.status();
    let body = test::read_body(resp).await;
    let json = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).unwrap()
    };
    (status, json)
}

pub async fn send<S>(app: &S, method: Method, uri: &str, token: &str) -> (StatusCode, Value)
where
    S: Service<Request, Response = ServiceResponse, Error = actix_web::Error>,
{
    call(app, authed(method, uri, token).to_request()).await
}

pub async fn send_json<S>(
    app: &S,
    method: Method,
    uri: &str,
    token: &str,
    body: Value,
) -> (StatusCode, Value)
where
    S: Service<Request, Response = ServiceResponse, Error = actix_web::Error>,
{
    call(app, authed(method, uri, token).set_json(body).to_request()).await
}

#[derive(Debug, Clone)]
pub struct Session {
    pub id: String,
    pub username: String,
    pub access_token: String,
    pub refresh_token: String,
}

pub fn unique_username() -> String {
    format!("user_{}", &Uuid::new_v4().simple().to_string()[..10])
}

pub fn registration(username: &str) -> MultipartBody {
    MultipartBody::new()
        .text("username", username)
        .text("email", &format!("{}@example.com", username))
        .text("password", PASSWORD)
        .text("fullName", "Test User")
        .image("avatar")
}

pub async fn register<S>(app: &S, username: &str) -> Value
where
    S: Service<Request, Response = ServiceResponse, Error = actix_web::Error>,
{
    let req = registration(username).apply(TestRequest::post().uri("/api/v1/users/register"));
    let (status, body) = call(app, req).await;
    assert_eq!(status, StatusCode::OK, "register failed: {}", body);
    body["data"].clone()
}

pub async fn login<S>(app: &S, username: &str, password: &str) -> (StatusCode, Value)
where
    S: Service<Request, Response = ServiceResponse, Error = actix_web::Error>,
{
    let req = TestRequest::post()
        .uri("/api/v1/users/login")
        .set_json(json!({ "username": username, "password": password }))
        .to_request();
    call(app, req).await
}

/// Registers a fresh user and logs them in.
pub async fn signup<S>(app: &S) -> Session
where
    S: Service<Request, Response = ServiceResponse, Error = actix_web::Error>,
{
    let username = unique_username();
    let user = register(app, &username).await;
    let (status, body) = login(app, &username, PASSWORD).await;
    assert_eq!(status, StatusCode::OK, "login failed: {}", body);

    Session {
        id: user["_id"].as_str().unwrap().to_string(),
        username,
        access_token: body["data"]["accessToken"].as_str().unwrap().to_string(),
        refresh_token: body["data"]["refreshToken"].as_str().unwrap().to_string(),
    }
}

pub fn video_form(title: &str) -> MultipartBody {
    MultipartBody::new()
        .text("title", title)
        .text("description", &format!("All about {}", title))
        .file("video", "clip.mp4", "video/mp4", b"fake mp4 bytes")
        .image("thumbnail")
}

pub async fn publish<S>(app: &S, session: &Session, title: &str) -> Value
where
    S: Service<Request, Response = ServiceResponse, Error = actix_web::Error>,
{
    let req = video_form(title).apply(authed(Method::POST, "/api/v1/videos", &session.access_token));
    let (status, body) = call(app, req).await;
    assert_eq!(status, StatusCode::OK, "publish failed: {}", body);
    body["data"].clone()
}

pub fn id_of(value: &Value) -> String {
    value["_id"].as_str().unwrap().to_string()
}

pub const MISSING_ID: &str = "65a1b2c3d4e5f6a7b8c9d0e1";
