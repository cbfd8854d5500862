//! Middleware layer.
//!
//! Middleware intercepts requests and responses and is the right place for
//! cross-cutting concerns. A middleware takes the next handler in the chain
//! and returns a handler with the same shape; [`Router::layer`] composes them.
//!
//! Built-in middleware:
//! - [`RequestId`]: assigns every request an ID, readable via [`request_id`]
//! - [`Logger`]: one access-log event per request through `tracing`
//!
//! [`Router::layer`]: crate::Router::layer

mod logger;
mod request_id;

pub use logger::{Flavor, Logger, status_label};
pub use request_id::{RequestId, request_id};

use crate::handler::BoxedHandler;

/// Wraps a handler, returning a handler.
pub trait Middleware: Send + Sync + 'static {
    fn wrap(&self, next: BoxedHandler) -> BoxedHandler;
}
