use bytes::Bytes;
use http::{HeaderValue, Method, StatusCode, header};
use http_body_util::combinators::UnsyncBoxBody;
use http_body_util::{BodyExt, Empty, Full};
use serde::Serialize;

use crate::services::registry::RegistryError;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;
pub type ResponseBody = UnsyncBoxBody<Bytes, BoxError>;
pub type HttpResponse = http::Response<ResponseBody>;

fn full_body(bytes: impl Into<Bytes>) -> ResponseBody {
    UnsyncBoxBody::new(Full::new(bytes.into()).map_err(|never| match never {}))
}

fn empty_body() -> ResponseBody {
    UnsyncBoxBody::new(Empty::new().map_err(|never| match never {}))
}

// 构建失败时退化为空的 500 响应
fn build(builder: http::response::Builder, body: ResponseBody) -> HttpResponse {
    match builder.body(body) {
        Ok(response) => response,
        Err(e) => {
            tracing::error!("Failed to create response: {}", e);
            http::Response::builder()
                .status(StatusCode::INTERNAL_SERVER_ERROR)
                .body(empty_body())
                .unwrap_or_default()
        }
    }
}

// JSON 响应
pub fn json_response<T: Serialize>(status: StatusCode, value: &T) -> HttpResponse {
    match serde_json::to_vec(value) {
        Ok(payload) => build(
            http::Response::builder()
                .status(status)
                .header(header::CONTENT_TYPE, "application/json"),
            full_body(payload),
        ),
        Err(e) => {
            tracing::error!(error = %e, "Failed to serialize response body");
            text_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to serialize response")
        }
    }
}

// 纯文本错误响应
pub fn text_response(status: StatusCode, message: impl Into<String>) -> HttpResponse {
    let mut message = message.into();
    message.push('\n');
    build(
        http::Response::builder()
            .status(status)
            .header(header::CONTENT_TYPE, "text/plain; charset=utf-8")
            .header(header::X_CONTENT_TYPE_OPTIONS, "nosniff"),
        full_body(message),
    )
}

pub fn not_found() -> HttpResponse {
    build(http::Response::builder().status(StatusCode::NOT_FOUND), empty_body())
}

pub fn method_not_allowed(allowed: &[Method]) -> HttpResponse {
    let allow = allowed
        .iter()
        .map(Method::as_str)
        .collect::<Vec<_>>()
        .join(", ");
    let mut builder = http::Response::builder().status(StatusCode::METHOD_NOT_ALLOWED);
    if let Ok(value) = HeaderValue::from_str(&allow) {
        builder = builder.header(header::ALLOW, value);
    }
    build(builder, full_body("405 Method Not Allowed\n"))
}

// 注册表错误到 HTTP 状态码的映射
pub fn error_status(error: &RegistryError) -> StatusCode {
    match error {
        RegistryError::Validation(_) => StatusCode::BAD_REQUEST,
        RegistryError::ServiceNotFound(_) | RegistryError::InstanceNotFound { .. } => {
            StatusCode::NOT_FOUND
        }
        RegistryError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}
