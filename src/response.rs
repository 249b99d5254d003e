use actix_web::http::StatusCode;
use actix_web::{HttpResponse, HttpResponseBuilder};
use serde::Serialize;

/// Success envelope shared by every endpoint.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T: Serialize> {
    pub status_code: u16,
    pub data: T,
    pub message: String,
    pub success: bool,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn new(status: StatusCode, data: T, message: impl Into<String>) -> Self {
        Self {
            status_code: status.as_u16(),
            data,
            message: message.into(),
            success: true,
        }
    }

    pub fn ok(data: T, message: impl Into<String>) -> HttpResponse {
        Self::new(StatusCode::OK, data, message).into_response(HttpResponse::Ok())
    }

    /// Finishes a builder that already carries cookies or headers.
    pub fn into_response(self, mut builder: HttpResponseBuilder) -> HttpResponse {
        builder.json(self)
    }
}

/// `data` for endpoints that only confirm an action.
pub fn empty() -> serde_json::Value {
    serde_json::json!({})
}
