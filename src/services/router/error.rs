// 定义路由错误类型
#[derive(Debug, thiserror::Error)]
pub enum RouterError {
    #[error("Invalid route: {0}")]
    InvalidRoute(String),

    #[error("Duplicate route: {method} {path}")]
    DuplicateRoute { method: http::Method, path: String },

    #[error("Invalid request body: {0}")]
    InvalidBody(String),
}
