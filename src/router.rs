//! Radix-tree request router with a middleware chain.
//!
//! One tree per HTTP method. O(path-length) lookup. Middleware is applied
//! once, at registration time, so a lookup hands back the fully wrapped
//! handler and nothing is composed on the hot path.

use std::collections::HashMap;
use std::sync::Arc;

use http::Method;
use matchit::Router as MatchitRouter;

use crate::handler::{self, BoxedHandler, Handler};
use crate::middleware::Middleware;

/// The application router.
///
/// Build it once at startup; pass it to [`Server::serve`](crate::Server::serve).
/// Every builder method returns `self` so registrations chain naturally.
pub struct Router {
    routes: HashMap<Method, MatchitRouter<BoxedHandler>>,
    layers: Vec<Arc<dyn Middleware>>,
    fallback: BoxedHandler,
    rejected: BoxedHandler,
}

impl Router {
    pub fn new() -> Self {
        Self {
            routes: HashMap::new(),
            layers: Vec::new(),
            fallback: handler::not_found(),
            rejected: handler::bad_request(),
        }
    }

    /// Append a middleware to the chain. The first layer registered is the
    /// outermost one and sees every request first.
    ///
    /// Unmatched requests (`404`) and requests whose body could not be read
    /// (`400`) run through the chain as well.
    ///
    /// # Panics
    ///
    /// Panics if any route has already been registered: routes capture the
    /// chain as it stands when they are added.
    ///
    /// ```rust,no_run
    /// # use http::Method;
    /// # use reqlog::{Request, Response, Router};
    /// # use reqlog::middleware::{Logger, RequestId};
    /// # async fn index(_: Request) -> Response { Response::text("") }
    /// Router::new()
    ///     .layer(RequestId::new())
    ///     .layer(Logger::structured().named("http"))
    ///     .on(Method::GET, "/", index);
    /// ```
    pub fn layer(mut self, middleware: impl Middleware) -> Self {
        assert!(
            self.routes.is_empty(),
            "all middleware must be layered before routes are registered"
        );
        self.layers.push(Arc::new(middleware));
        self.fallback = self.wrap(handler::not_found());
        self.rejected = self.wrap(handler::bad_request());
        self
    }

    /// Register a handler for a method + path pair. Returns `self` for chaining.
    ///
    /// Path parameters use `{name}` syntax; `req.param("name")` retrieves them:
    ///
    /// ```rust,no_run
    /// # use http::Method;
    /// # use reqlog::{Request, Response, Router};
    /// # async fn get_user(_: Request) -> Response { Response::text("") }
    /// # async fn create_user(_: Request) -> Response { Response::text("") }
    /// Router::new()
    ///     .on(Method::GET,  "/users/{id}", get_user)
    ///     .on(Method::POST, "/users",      create_user);
    /// ```
    pub fn on(mut self, method: Method, path: &str, handler: impl Handler) -> Self {
        let wrapped = self.wrap(handler.into_boxed_handler());
        self.routes
            .entry(method)
            .or_default()
            .insert(path, wrapped)
            .unwrap_or_else(|e| panic!("invalid route `{path}`: {e}"));
        self
    }

    fn wrap(&self, handler: BoxedHandler) -> BoxedHandler {
        self.layers.iter().rev().fold(handler, |next, mw| mw.wrap(next))
    }

    /// Resolves a request to its wrapped handler, falling back to the wrapped
    /// `404` handler when nothing matches.
    pub(crate) fn lookup(
        &self,
        method: &Method,
        path: &str,
    ) -> (BoxedHandler, HashMap<String, String>) {
        let matched = self.routes.get(method).and_then(|tree| tree.at(path).ok());
        match matched {
            Some(matched) => {
                let params = matched.params.iter()
                    .map(|(k, v)| (k.to_owned(), v.to_owned()))
                    .collect();
                (Arc::clone(matched.value), params)
            }
            None => (Arc::clone(&self.fallback), HashMap::new()),
        }
    }

    /// The wrapped `400` handler for requests that never reach routing.
    pub(crate) fn rejected(&self) -> BoxedHandler {
        Arc::clone(&self.rejected)
    }
}

impl Default for Router {
    fn default() -> Self { Self::new() }
}
