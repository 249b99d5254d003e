use actix_web::cookie::{time, Cookie, SameSite};
use actix_web::dev::Payload;
use actix_web::http::header;
use actix_web::{web, FromRequest, HttpRequest};
use chrono::Utc;
use futures::future::LocalBoxFuture;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use log::debug;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::AuthConfig;
use crate::errors::ApiError;
use crate::models::User;
use crate::AppState;

pub const ACCESS_COOKIE: &str = "accessToken";
pub const REFRESH_COOKIE: &str = "refreshToken";

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessClaims {
    pub sub: String,
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub iat: usize,
    pub exp: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RefreshClaims {
    pub sub: String,
    /// Makes every issued refresh token distinct, even within the same second.
    pub jti: String,
    pub iat: usize,
    pub exp: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

pub fn issue_tokens(auth: &AuthConfig, user: &User) -> Result<TokenPair, ApiError> {
    let now = Utc::now();

    let access = AccessClaims {
        sub: user.id.clone(),
        username: user.username.clone(),
        email: user.email.clone(),
        full_name: user.full_name.clone(),
        iat: now.timestamp() as usize,
        exp: (now + auth.access_ttl).timestamp() as usize,
    };
    let refresh = RefreshClaims {
        sub: user.id.clone(),
        jti: Uuid::new_v4().to_string(),
        iat: now.timestamp() as usize,
        exp: (now + auth.refresh_ttl).timestamp() as usize,
    };

    let access_token = encode(
        &Header::default(),
        &access,
        &EncodingKey::from_secret(auth.access_secret.as_bytes()),
    )
    .map_err(|e| ApiError::internal("Something went wrong while generating tokens", e))?;
    let refresh_token = encode(
        &Header::default(),
        &refresh,
        &EncodingKey::from_secret(auth.refresh_secret.as_bytes()),
    )
    .map_err(|e| ApiError::internal("Something went wrong while generating tokens", e))?;

    Ok(TokenPair {
        access_token,
        refresh_token,
    })
}

pub fn verify_access(auth: &AuthConfig, token: &str) -> Result<AccessClaims, jsonwebtoken::errors::Error> {
    decode::<AccessClaims>(
        token,
        &DecodingKey::from_secret(auth.access_secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
}

pub fn verify_refresh(auth: &AuthConfig, token: &str) -> Result<RefreshClaims, jsonwebtoken::errors::Error> {
    decode::<RefreshClaims>(
        token,
        &DecodingKey::from_secret(auth.refresh_secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
}

fn build_cookie(auth: &AuthConfig, name: &'static str, value: String, ttl: chrono::Duration) -> Cookie<'static> {
    Cookie::build(name, value)
        .http_only(true)
        .same_site(SameSite::None)
        .secure(auth.cookie_secure)
        .max_age(time::Duration::seconds(ttl.num_seconds()))
        .path("/")
        .finish()
}

pub fn session_cookies(auth: &AuthConfig, tokens: &TokenPair) -> [Cookie<'static>; 2] {
    [
        build_cookie(auth, ACCESS_COOKIE, tokens.access_token.clone(), auth.access_ttl),
        build_cookie(auth, REFRESH_COOKIE, tokens.refresh_token.clone(), auth.refresh_ttl),
    ]
}

pub fn cleared_cookies(auth: &AuthConfig) -> [Cookie<'static>; 2] {
    let mut access = build_cookie(auth, ACCESS_COOKIE, String::new(), auth.access_ttl);
    access.make_removal();
    let mut refresh = build_cookie(auth, REFRESH_COOKIE, String::new(), auth.refresh_ttl);
    refresh.make_removal();
    [access, refresh]
}

/// Access token from the cookie, else from `Authorization: Bearer`.
pub fn access_token_from(req: &HttpRequest) -> Option<String> {
    if let Some(cookie) = req.cookie(ACCESS_COOKIE) {
        if !cookie.value().is_empty() {
            return Some(cookie.value().to_string());
        }
    }

    req.headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

pub async fn hash_password(password: String, cost: u32) -> Result<String, ApiError> {
    Ok(web::block(move || bcrypt::hash(password, cost)).await??)
}

pub async fn verify_password(password: String, hash: String) -> Result<bool, ApiError> {
    Ok(web::block(move || bcrypt::verify(password, &hash)).await??)
}

/// The authenticated caller. Taking it as a handler argument makes the route
/// reject requests without a valid access token.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

impl CurrentUser {
    pub fn id(&self) -> &str {
        &self.0.id
    }
}

impl FromRequest for CurrentUser {
    type Error = ApiError;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let state = req.app_data::<web::Data<AppState>>().cloned();
        let token = access_token_from(req);

        Box::pin(async move {
            let state = state.ok_or_else(|| ApiError::Internal("Application state is missing".into()))?;
            let token = token.ok_or_else(|| ApiError::Unauthorized("Unauthorized request".into()))?;

            let claims = verify_access(&state.auth, &token).map_err(|e| {
                debug!("Rejected access token: {}", e);
                ApiError::Unauthorized("Invalid access token".into())
            })?;

            match state.users.find(&claims.sub).await? {
                Some(user) => Ok(CurrentUser(user)),
                None => Err(ApiError::Unauthorized("Invalid access token".into())),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn auth() -> AuthConfig {
        AuthConfig {
            access_secret: "access-secret".into(),
            access_ttl: Duration::minutes(15),
            refresh_secret: "refresh-secret".into(),
            refresh_ttl: Duration::days(10),
            bcrypt_cost: 4,
            cookie_secure: true,
        }
    }

    fn user() -> User {
        let now = Utc::now();
        User {
            id: "65a1b2c3d4e5f6a7b8c9d0e1".into(),
            username: "alice".into(),
            email: "alice@example.com".into(),
            full_name: "Alice".into(),
            avatar: String::new(),
            cover_image: String::new(),
            watch_history: vec![],
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn tokens_are_signed_with_separate_secrets() {
        let auth = auth();
        let pair = issue_tokens(&auth, &user()).unwrap();

        let access = verify_access(&auth, &pair.access_token).unwrap();
        assert_eq!(access.sub, "65a1b2c3d4e5f6a7b8c9d0e1");
        assert_eq!(access.username, "alice");
        assert_eq!(verify_refresh(&auth, &pair.refresh_token).unwrap().sub, access.sub);

        assert!(verify_access(&auth, &pair.refresh_token).is_err());
        assert!(verify_refresh(&auth, &pair.access_token).is_err());
    }

    #[test]
    fn refresh_tokens_differ_between_issues() {
        let auth = auth();
        let first = issue_tokens(&auth, &user()).unwrap();
        let second = issue_tokens(&auth, &user()).unwrap();
        assert_ne!(first.refresh_token, second.refresh_token);
    }

    #[test]
    fn expired_access_token_is_rejected() {
        let mut auth = auth();
        auth.access_ttl = Duration::minutes(-5);
        let pair = issue_tokens(&auth, &user()).unwrap();
        assert!(verify_access(&auth, &pair.access_token).is_err());
    }

    #[test]
    fn session_cookies_are_http_only() {
        let auth = auth();
        let pair = issue_tokens(&auth, &user()).unwrap();
        let [access, refresh] = session_cookies(&auth, &pair);
        assert_eq!(access.name(), ACCESS_COOKIE);
        assert_eq!(refresh.value(), pair.refresh_token);
        assert_eq!(access.http_only(), Some(true));
        assert_eq!(refresh.secure(), Some(true));
        assert_eq!(access.same_site(), Some(SameSite::None));

        let [cleared, _] = cleared_cookies(&auth);
        assert_eq!(cleared.value(), "");
        assert_eq!(cleared.max_age(), Some(time::Duration::ZERO));
    }

    #[actix_web::test]
    async fn password_hash_round_trip() {
        let hash = hash_password("s3cret".into(), 4).await.unwrap();
        assert!(verify_password("s3cret".into(), hash.clone()).await.unwrap());
        assert!(!verify_password("wrong".into(), hash).await.unwrap());
    }

    #[test]
    fn bearer_header_is_accepted() {
        let req = actix_web::test::TestRequest::default()
            .insert_header((header::AUTHORIZATION, "Bearer abc.def"))
            .to_http_request();
        assert_eq!(access_token_from(&req), Some("abc.def".to_string()));

        let req = actix_web::test::TestRequest::default()
            .insert_header((header::AUTHORIZATION, "Basic abc"))
            .to_http_request();
        assert_eq!(access_token_from(&req), None);
    }
}
