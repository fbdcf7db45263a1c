//! Method + path dispatch.
//!
//! Each HTTP method gets its own `matchit` radix tree, so a lookup costs one
//! map probe plus a walk proportional to the path. Anything that should apply
//! to every request (access logging, say) wraps the handler via
//! [`middleware`](crate::middleware) instead of living here.

use std::collections::HashMap;
use std::sync::Arc;

use http::Method;
use matchit::Router as MatchitRouter;

use crate::handler::{BoxedHandler, Handler};

/// Routes requests to handlers.
///
/// Assembled once before [`Server::serve`](crate::Server::serve) and never
/// mutated afterwards; [`Router::on`] consumes and returns the router.
pub struct Router {
    routes: HashMap<Method, MatchitRouter<BoxedHandler>>,
}

impl Router {
    pub fn new() -> Self {
        Self { routes: HashMap::new() }
    }

    /// Adds `handler` under `method` and `path`.
    ///
    /// Path parameters use `{name}` syntax, `req.param("name")` retrieves them.
    ///
    /// # Panics
    ///
    /// Panics if `path` is not a valid route or conflicts with one already
    /// registered for `method`. Routes are fixed at startup, so this is a
    /// programming error.
    pub fn on(mut self, method: Method, path: &str, handler: impl Handler) -> Self {
        self.routes
            .entry(method)
            .or_default()
            .insert(path, Arc::new(handler))
            .unwrap_or_else(|e| panic!("invalid route `{path}`: {e}"));
        self
    }

    pub(crate) fn lookup(
        &self,
        method: &Method,
        path: &str,
    ) -> Option<(BoxedHandler, HashMap<String, String>)> {
        let tree = self.routes.get(method)?;
        let matched = tree.at(path).ok()?;
        let handler = Arc::clone(matched.value);
        let params = matched.params.iter()
            .map(|(k, v)| (k.to_owned(), v.to_owned()))
            .collect();
        Some((handler, params))
    }
}

impl Default for Router {
    fn default() -> Self { Self::new() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::Request;
    use crate::sink::{BoxFuture, ResponseSink};

    fn noop<'a>(_req: Request, _res: &'a mut dyn ResponseSink) -> BoxFuture<'a, ()> {
        Box::pin(async {})
    }

    #[test]
    fn lookup_extracts_params() {
        let router = Router::new().on(Method::GET, "/targets/{service}", noop);

        let (_, params) = router.lookup(&Method::GET, "/targets/checkout").unwrap();
        assert_eq!(params.get("service").map(String::as_str), Some("checkout"));
    }

    #[test]
    fn lookup_is_per_method() {
        let router = Router::new().on(Method::POST, "/events", noop);

        assert!(router.lookup(&Method::POST, "/events").is_some());
        assert!(router.lookup(&Method::GET, "/events").is_none());
        assert!(router.lookup(&Method::POST, "/other").is_none());
    }

    #[test]
    #[should_panic(expected = "invalid route")]
    fn conflicting_routes_panic() {
        let _ = Router::new()
            .on(Method::GET, "/a/{x}", noop)
            .on(Method::GET, "/a/{y}", noop);
    }
}
