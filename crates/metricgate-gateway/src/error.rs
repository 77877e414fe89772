//! HTTP mapping for [`GateError`].
//!
//! Every error response has the same JSON body:
//! `{"error": "<CLIENT_CODE>", "detail": "<message>"}`.

use axum::extract::rejection::JsonRejection;
use axum::http::header::WWW_AUTHENTICATE;
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use metricgate_core::error::{ClientCode, GateError};

#[derive(Debug)]
pub struct ApiError(pub GateError);

impl From<GateError> for ApiError {
    fn from(err: GateError) -> Self {
        Self(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        let detail = rejection.body_text();
        Self(match rejection {
            JsonRejection::JsonDataError(_) => GateError::Unprocessable(detail),
            _ => GateError::BadRequest(detail),
        })
    }
}

pub fn status_for(code: ClientCode) -> StatusCode {
    match code {
        ClientCode::BadRequest => StatusCode::BAD_REQUEST,
        ClientCode::Unprocessable => StatusCode::UNPROCESSABLE_ENTITY,
        ClientCode::Unauthorized => StatusCode::UNAUTHORIZED,
        ClientCode::NotReady => StatusCode::SERVICE_UNAVAILABLE,
        ClientCode::Upstream => StatusCode::BAD_GATEWAY,
        ClientCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let code = self.0.client_code();
        let body = Json(json!({
            "error": code.as_str(),
            "detail": self.0.to_string(),
        }));
        let mut response = (status_for(code), body).into_response();
        if code == ClientCode::Unauthorized {
            response
                .headers_mut()
                .insert(WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }
        response
    }
}
