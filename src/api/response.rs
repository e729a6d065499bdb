//! JSON envelope every page and error is rendered into.

use axum::Json;
use axum::http::StatusCode;
use chrono::Utc;
use serde::Serialize;

#[derive(Serialize)]
pub struct ApiResponse<T> {
    pub data: Option<T>,
    pub meta: ResponseMeta,
}

#[derive(Serialize)]
pub struct ResponseMeta {
    pub status: &'static str,
    pub status_code: u16,
    pub timestamp: String,
    pub message: Option<String>,
}

impl ResponseMeta {
    fn new(status: &'static str, code: StatusCode, message: Option<String>) -> Self {
        Self {
            status,
            status_code: code.as_u16(),
            timestamp: Utc::now().to_rfc3339(),
            message,
        }
    }
}

/// A named template together with the context it is rendered with.
#[derive(Serialize)]
pub struct Rendered<C> {
    pub template: &'static str,
    pub context: C,
}

pub type JsonResponse<T> = (StatusCode, Json<ApiResponse<T>>);

pub fn render<C: Serialize>(template: &'static str, context: C) -> JsonResponse<Rendered<C>> {
    let rendered = Rendered { template, context };
    (
        StatusCode::OK,
        Json(ApiResponse {
            data: Some(rendered),
            meta: ResponseMeta::new("success", StatusCode::OK, None),
        }),
    )
}

pub fn error<T>(status: StatusCode, message: String) -> JsonResponse<T> {
    (
        status,
        Json(ApiResponse {
            data: None,
            meta: ResponseMeta::new("error", status, Some(message)),
        }),
    )
}
