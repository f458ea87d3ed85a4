use std::collections::HashMap;

use http::Method;

use super::error::RouterError;

pub type PathParams = HashMap<String, String>;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Param(String),
}

#[derive(Debug, Clone)]
struct Route<T> {
    path: String,
    segments: Vec<Segment>,
    handlers: Vec<(Method, T)>,
}

impl<T> Route<T> {
    // 段数一致且所有字面段相等时返回绑定的参数
    fn bind(&self, parts: &[&str]) -> Option<PathParams> {
        if parts.len() != self.segments.len() {
            return None;
        }

        let mut params = PathParams::new();
        for (segment, part) in self.segments.iter().zip(parts) {
            match segment {
                Segment::Literal(literal) if literal != part => return None,
                Segment::Literal(_) => {}
                Segment::Param(name) => {
                    params.insert(name.clone(), (*part).to_string());
                }
            }
        }
        Some(params)
    }
}

/// 路由匹配结果
#[derive(Debug)]
pub enum RouteMatch<'a, T> {
    Found { target: &'a T, params: PathParams },
    /// 路径形状匹配但方法不匹配
    MethodNotAllowed { allowed: Vec<Method> },
    NotFound,
}

/// 按 `/` 分段的最小路径匹配器，`{name}` 段绑定对应位置的值
///
/// 不支持通配符和前缀匹配，也不做结尾斜杠归一化。
#[derive(Debug, Clone)]
pub struct PathMatcher<T> {
    routes: Vec<Route<T>>,
}

impl<T> Default for PathMatcher<T> {
    fn default() -> Self {
        Self { routes: Vec::new() }
    }
}

impl<T> PathMatcher<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, method: Method, path: &str, target: T) -> Result<(), RouterError> {
        let segments = parse_pattern(path)?;

        if let Some(route) = self.routes.iter_mut().find(|route| route.path == path) {
            if route.handlers.iter().any(|(m, _)| *m == method) {
                return Err(RouterError::DuplicateRoute {
                    method,
                    path: path.to_string(),
                });
            }
            route.handlers.push((method, target));
            return Ok(());
        }

        self.routes.push(Route {
            path: path.to_string(),
            segments,
            handlers: vec![(method, target)],
        });
        Ok(())
    }

    pub fn find(&self, method: &Method, path: &str) -> RouteMatch<'_, T> {
        let Some(parts) = split_path(path) else {
            return RouteMatch::NotFound;
        };

        let mut allowed = Vec::new();
        for route in &self.routes {
            let Some(params) = route.bind(&parts) else {
                continue;
            };

            match route.handlers.iter().find(|(m, _)| m == method) {
                Some((_, target)) => return RouteMatch::Found { target, params },
                None => allowed.extend(route.handlers.iter().map(|(m, _)| m.clone())),
            }
        }

        if allowed.is_empty() {
            RouteMatch::NotFound
        } else {
            allowed.dedup();
            RouteMatch::MethodNotAllowed { allowed }
        }
    }
}

fn split_path(path: &str) -> Option<Vec<&str>> {
    path.strip_prefix('/').map(|rest| rest.split('/').collect())
}

fn parse_pattern(path: &str) -> Result<Vec<Segment>, RouterError> {
    let parts = split_path(path)
        .ok_or_else(|| RouterError::InvalidRoute(format!("path must start with '/': {path:?}")))?;

    let segments = parts
        .into_iter()
        .map(|part| match part.strip_prefix('{').and_then(|p| p.strip_suffix('}')) {
            Some("") => Err(RouterError::InvalidRoute(format!(
                "empty parameter name in {path}"
            ))),
            Some(name) => Ok(Segment::Param(name.to_string())),
            None => Ok(Segment::Literal(part.to_string())),
        })
        .collect::<Result<Vec<_>, _>>()?;

    if matches!(segments.first(), Some(Segment::Param(_))) {
        return Err(RouterError::InvalidRoute(format!(
            "path starts with a parameter: {path}"
        )));
    }

    Ok(segments)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matcher() -> PathMatcher<&'static str> {
        let mut matcher = PathMatcher::new();
        matcher.add(Method::GET, "/services", "fetch_all").unwrap();
        matcher.add(Method::PUT, "/services", "register").unwrap();
        matcher.add(Method::GET, "/services/{id}", "fetch").unwrap();
        matcher
            .add(Method::DELETE, "/services/{id}/hosts/{url}", "unregister")
            .unwrap();
        matcher
    }

    #[test]
    fn test_binds_positional_params() {
        let matcher = matcher();
        match matcher.find(&Method::DELETE, "/services/billing/hosts/10.0.0.1:8080") {
            RouteMatch::Found { target, params } => {
                assert_eq!(*target, "unregister");
                assert_eq!(params["id"], "billing");
                assert_eq!(params["url"], "10.0.0.1:8080");
            }
            other => panic!("unexpected match: {other:?}"),
        }
    }

    #[test]
    fn test_method_selects_handler_on_same_path() {
        let matcher = matcher();
        assert!(matches!(
            matcher.find(&Method::PUT, "/services"),
            RouteMatch::Found { target: &"register", .. }
        ));
        assert!(matches!(
            matcher.find(&Method::GET, "/services"),
            RouteMatch::Found { target: &"fetch_all", .. }
        ));
    }

    #[test]
    fn test_shape_match_with_wrong_method() {
        let matcher = matcher();
        match matcher.find(&Method::POST, "/services/billing") {
            RouteMatch::MethodNotAllowed { allowed } => assert_eq!(allowed, vec![Method::GET]),
            other => panic!("unexpected match: {other:?}"),
        }
    }

    #[test]
    fn test_literal_mismatch_and_segment_count() {
        let matcher = matcher();
        assert!(matches!(
            matcher.find(&Method::DELETE, "/services/billing/nodes/x"),
            RouteMatch::NotFound
        ));
        assert!(matches!(
            matcher.find(&Method::GET, "/services/billing/extra"),
            RouteMatch::NotFound
        ));
        assert!(matches!(matcher.find(&Method::GET, "/other"), RouteMatch::NotFound));
    }

    #[test]
    fn test_no_trailing_slash_normalization() {
        let matcher = matcher();
        // "/services/" 按形状匹配 "/services/{id}"，参数为空串
        match matcher.find(&Method::GET, "/services/") {
            RouteMatch::Found { target, params } => {
                assert_eq!(*target, "fetch");
                assert_eq!(params["id"], "");
            }
            other => panic!("unexpected match: {other:?}"),
        }
        assert!(matches!(matcher.find(&Method::GET, "services"), RouteMatch::NotFound));
    }

    #[test]
    fn test_rejects_invalid_patterns() {
        let mut matcher = PathMatcher::new();
        assert!(matches!(
            matcher.add(Method::GET, "", ()),
            Err(RouterError::InvalidRoute(_))
        ));
        assert!(matches!(
            matcher.add(Method::GET, "services", ()),
            Err(RouterError::InvalidRoute(_))
        ));
        assert!(matches!(
            matcher.add(Method::GET, "/{id}", ()),
            Err(RouterError::InvalidRoute(_))
        ));
        assert!(matches!(
            matcher.add(Method::GET, "/services/{}", ()),
            Err(RouterError::InvalidRoute(_))
        ));

        matcher.add(Method::GET, "/services", ()).unwrap();
        assert!(matches!(
            matcher.add(Method::GET, "/services", ()),
            Err(RouterError::DuplicateRoute { .. })
        ));
    }
}
