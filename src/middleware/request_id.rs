//! Request ID assignment.
//!
//! Reuses the ID a proxy already put on the request (`x-request-id` by
//! default) so log lines correlate across hops. Otherwise the ID is
//! `<host>/<prefix>-<seq>`, where the prefix is random per middleware instance
//! and `seq` counts up from `000001`.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::handler::{BoxFuture, BoxedHandler, ErasedHandler};
use crate::middleware::Middleware;
use crate::request::Request;

/// Extension value holding the ID of the current request.
#[derive(Clone, Debug)]
struct ReqId(String);

/// Returns the ID assigned by [`RequestId`], if that middleware ran upstream.
pub fn request_id(req: &Request) -> Option<&str> {
    req.extensions().get::<ReqId>().map(|id| id.0.as_str())
}

/// Middleware that tags every request with an ID.
pub struct RequestId {
    header: String,
    prefix: Arc<str>,
    seq: Arc<AtomicU64>,
}

impl RequestId {
    pub fn new() -> Self {
        let host = std::env::var("HOSTNAME")
            .ok()
            .filter(|h| !h.is_empty())
            .unwrap_or_else(|| "localhost".to_owned());
        let random = uuid::Uuid::new_v4().simple().to_string();
        Self {
            header: "x-request-id".to_owned(),
            prefix: format!("{host}/{}", &random[..10]).into(),
            seq: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Read inbound IDs from `name` instead of `x-request-id`.
    pub fn header(mut self, name: &str) -> Self {
        self.header = name.to_owned();
        self
    }
}

impl Default for RequestId {
    fn default() -> Self { Self::new() }
}

impl Middleware for RequestId {
    fn wrap(&self, next: BoxedHandler) -> BoxedHandler {
        Arc::new(Assign {
            header: self.header.clone(),
            prefix: Arc::clone(&self.prefix),
            seq: Arc::clone(&self.seq),
            next,
        })
    }
}

struct Assign {
    header: String,
    prefix: Arc<str>,
    seq: Arc<AtomicU64>,
    next: BoxedHandler,
}

impl Assign {
    fn next_id(&self) -> String {
        let n = self.seq.fetch_add(1, Ordering::Relaxed) + 1;
        format!("{}-{n:06}", self.prefix)
    }
}

impl ErasedHandler for Assign {
    fn call(&self, mut req: Request) -> BoxFuture {
        let id = match req.header(&self.header) {
            Some(inbound) if !inbound.is_empty() => inbound.to_owned(),
            _ => self.next_id(),
        };
        req.extensions_mut().insert(ReqId(id));
        self.next.call(req)
    }
}
