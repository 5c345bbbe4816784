use axum::{
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

#[derive(Serialize)]
pub struct ApiResponse<T> {
    pub data: T,
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}

pub fn with_total_count<T: Serialize>(data: T, count: usize) -> Response {
    let mut response = ApiResponse { data }.into_response();
    response
        .headers_mut()
        .insert("X-Total-Count", HeaderValue::from(count));
    response
}
