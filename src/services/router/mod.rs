pub mod error;
pub mod handlers;
pub mod matcher;
pub mod response;

pub use error::RouterError;
pub use matcher::{PathMatcher, PathParams, RouteMatch};
pub use response::{HttpResponse, ResponseBody};

use futures::future::BoxFuture;
use http::{Method, StatusCode};
use http_body::Body;
use http_body_util::BodyExt;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::time::Instant;
use tower::Service;

use super::registry::Discovery;
use response::BoxError;

// 路由目标
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Register,
    FetchAll,
    Fetch,
    Unregister,
    Renew,
}

// 服务发现 HTTP 路由
#[derive(Debug, Clone)]
pub struct DiscoveryRouter {
    discovery: Arc<dyn Discovery>,
    routes: Arc<PathMatcher<Endpoint>>,
}

impl DiscoveryRouter {
    pub fn new(discovery: Arc<dyn Discovery>) -> Result<Self, RouterError> {
        let mut routes = PathMatcher::new();
        routes.add(Method::PUT, "/services", Endpoint::Register)?;
        routes.add(Method::POST, "/services", Endpoint::Register)?;
        routes.add(Method::GET, "/services", Endpoint::FetchAll)?;
        routes.add(Method::GET, "/services/{id}", Endpoint::Fetch)?;
        routes.add(Method::DELETE, "/services/{id}/hosts/{url}", Endpoint::Unregister)?;
        routes.add(Method::PUT, "/renew/{name}/{address}", Endpoint::Renew)?;

        Ok(Self {
            discovery,
            routes: Arc::new(routes),
        })
    }

    async fn dispatch<B>(
        discovery: &dyn Discovery,
        routes: &PathMatcher<Endpoint>,
        req: http::Request<B>,
    ) -> HttpResponse
    where
        B: Body<Data = bytes::Bytes> + Send + 'static,
        B::Error: Into<BoxError>,
    {
        let (endpoint, params) = match routes.find(req.method(), req.uri().path()) {
            RouteMatch::Found { target, params } => (*target, params),
            RouteMatch::MethodNotAllowed { allowed } => {
                return response::method_not_allowed(&allowed);
            }
            RouteMatch::NotFound => return response::not_found(),
        };

        match endpoint {
            Endpoint::Register => {
                let body = match req.into_body().collect().await {
                    Ok(collected) => collected.to_bytes(),
                    Err(e) => {
                        let e: BoxError = e.into();
                        let error = RouterError::InvalidBody(e.to_string());
                        tracing::warn!(error = %error, "Failed to collect request body");
                        return response::text_response(StatusCode::BAD_REQUEST, error.to_string());
                    }
                };
                handlers::register(discovery, &body)
            }
            Endpoint::FetchAll => handlers::fetch_all(discovery),
            Endpoint::Fetch => handlers::fetch(discovery, param(&params, "id")),
            Endpoint::Unregister => {
                handlers::unregister(discovery, param(&params, "id"), param(&params, "url"))
            }
            Endpoint::Renew => {
                handlers::renew(discovery, param(&params, "name"), param(&params, "address"))
            }
        }
    }
}

fn param<'a>(params: &'a PathParams, key: &str) -> &'a str {
    params.get(key).map(String::as_str).unwrap_or_default()
}

impl<B> Service<http::Request<B>> for DiscoveryRouter
where
    B: Body<Data = bytes::Bytes> + Send + 'static,
    B::Error: Into<BoxError>,
{
    type Response = HttpResponse;
    type Error = std::convert::Infallible;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: http::Request<B>) -> Self::Future {
        let discovery = self.discovery.clone();
        let routes = self.routes.clone();

        Box::pin(async move {
            let started = Instant::now();
            let method = req.method().clone();
            let path = req.uri().path().to_string();

            let response = Self::dispatch(discovery.as_ref(), &routes, req).await;

            tracing::info!(
                method = %method,
                path = %path,
                status = response.status().as_u16(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Handled request"
            );

            Ok(response)
        })
    }
}
