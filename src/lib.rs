//! # reqlog
//!
//! Access logging for a minimal hyper-based HTTP framework: one `tracing`
//! event per request with method, path, status, latency, size, request ID,
//! remote address and protocol.
//!
//! The framework around it stays small on purpose. Routes go into a radix
//! tree per method, middleware wraps handlers once at startup, and the server
//! drains in-flight connections on SIGTERM. TLS, rate limiting and body-size
//! limits belong to the reverse proxy in front.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use http::Method;
//! use reqlog::middleware::{Logger, RequestId};
//! use reqlog::{Request, Response, Router, Server};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), reqlog::Error> {
//!     let app = Router::new()
//!         .layer(RequestId::new())
//!         .layer(Logger::structured().named("http"))
//!         .on(Method::GET, "/users/{id}", get_user);
//!
//!     Server::bind("0.0.0.0:3000").serve(app).await
//! }
//!
//! async fn get_user(req: Request) -> Response {
//!     let id = req.param("id").unwrap_or("unknown");
//!     Response::json(format!(r#"{{"id":"{id}"}}"#))
//! }
//! ```
//!
//! Install a subscriber (for example `tracing_subscriber::fmt::init()`) to
//! see the events; reqlog never installs one itself.

mod error;
mod handler;
mod request;
mod response;
mod router;
mod server;

#[cfg(test)]
mod test_support;

pub mod middleware;

pub use error::Error;
pub use handler::{BoxFuture, BoxedHandler, ErasedHandler, Handler};
pub use request::Request;
pub use response::{IntoResponse, Response, ResponseBuilder};
pub use router::Router;
pub use server::Server;
