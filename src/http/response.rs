//! Uniform `{status, message, data}` response envelope.

use axum::{http::StatusCode, response::{IntoResponse, Response}, Json};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub status: String,
    pub message: String,
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(message: impl Into<String>, data: T) -> Self {
        Self { status: "success".to_string(), message: message.into(), data }
    }
}

impl ApiResponse<serde_json::Value> {
    pub fn error(message: impl Into<String>, data: serde_json::Value) -> Self {
        Self { status: "error".to_string(), message: message.into(), data }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response { Json(self).into_response() }
}

/// `200 OK` with the success envelope.
pub fn ok<T: Serialize>(message: impl Into<String>, data: T) -> ApiResponse<T> { ApiResponse::success(message, data) }

/// `201 Created` with the success envelope.
pub fn created<T: Serialize>(message: impl Into<String>, data: T) -> (StatusCode, ApiResponse<T>) {
    (StatusCode::CREATED, ApiResponse::success(message, data))
}

#[derive(Debug, Serialize)]
pub struct Page<T> { pub items: Vec<T>, pub total: i64, pub page: u32, pub per_page: u32 }

#[derive(Debug, Deserialize)]
pub struct PageParams { pub page: Option<u32>, pub per_page: Option<u32> }

impl PageParams {
    pub fn page(&self) -> u32 { self.page.unwrap_or(1).max(1) }
    pub fn per_page(&self) -> u32 { self.per_page.unwrap_or(15).clamp(1, 100) }
    pub fn limit(&self) -> i64 { i64::from(self.per_page()) }
    pub fn offset(&self) -> i64 { i64::from((self.page() - 1) * self.per_page()) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_shape() {
        let body = serde_json::to_value(ok("Done", serde_json::json!({"unread_count": 3}))).unwrap();
        assert_eq!(body, serde_json::json!({"status": "success", "message": "Done", "data": {"unread_count": 3}}));
    }

    #[test]
    fn test_page_params_clamp() {
        let p = PageParams { page: Some(0), per_page: Some(500) };
        assert_eq!((p.page(), p.per_page(), p.offset()), (1, 100, 0));
        let p = PageParams { page: Some(3), per_page: None };
        assert_eq!((p.limit(), p.offset()), (15, 30));
    }
}
