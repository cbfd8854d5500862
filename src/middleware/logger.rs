//! Per-request access logging.
//!
//! [`Logger`] emits exactly one `tracing` event at `INFO` for every request
//! that passes through it, after the downstream handler has produced its
//! response. Two output flavors are available, fixed when the middleware is
//! built:
//!
//! | Flavor | Event |
//! |---|---|
//! | [`Flavor::Structured`] | message `served`, fields `method path status reqId remoteAddr proto latency size` |
//! | [`Flavor::Sugared`] | a single formatted line, see below |
//!
//! The sugared line looks like:
//!
//! ```text
//! 200 OK Request: {Method: GET, Path: /foo, ReqID: web-1/3f9c2a7b1d-000001, RemoteIP: 10.0.0.7:51234, Protocol: HTTP/1.1} Response: {Status: 200, Elapsed: 182.4µs, Size: 12 bytes}
//! ```
//!
//! A named logger adds a `logger` field to every event so lines can be
//! attributed to one middleware instance.
//!
//! # Panicking handlers
//!
//! The event is emitted from a drop guard. If the downstream handler panics,
//! the guard fires while the request future is torn down and reports status
//! `0` and size `0` (no response was produced). The panic is not caught.

use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::{Arc, Once};
use std::time::{Duration, Instant};

use http::Method;
use tracing::{debug, info};

use crate::error::Error;
use crate::handler::{BoxFuture, BoxedHandler, ErasedHandler};
use crate::middleware::Middleware;
use crate::middleware::request_id::request_id;
use crate::request::Request;
use crate::response::Response;

// ── Status labels ─────────────────────────────────────────────────────────────

/// Pairs a status code with its class: `"200 OK"`, `"302 Redirect"`,
/// `"404 Client Error"`, `"503 Server Error"`.
///
/// Anything below 100, including the `0` reported when no response was
/// produced, is `"<code> Unknown"`.
///
/// ```rust
/// use reqlog::middleware::status_label;
///
/// assert_eq!(status_label(204), "204 OK");
/// assert_eq!(status_label(0), "0 Unknown");
/// ```
pub fn status_label(code: i32) -> String {
    let class = match code {
        100..=299 => "OK",
        300..=399 => "Redirect",
        400..=499 => "Client Error",
        500..     => "Server Error",
        _         => "Unknown",
    };
    format!("{code} {class}")
}

// ── Flavor ────────────────────────────────────────────────────────────────────

/// Output format of a [`Logger`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Flavor {
    /// Typed key-value fields.
    Structured,
    /// One preformatted line.
    Sugared,
}

/// Parses `structured` or `sugared`, ignoring ASCII case.
impl FromStr for Flavor {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("structured") {
            Ok(Self::Structured)
        } else if s.eq_ignore_ascii_case("sugared") {
            Ok(Self::Sugared)
        } else {
            Err(Error::UnsupportedLogger(s.to_owned()))
        }
    }
}

impl fmt::Display for Flavor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Structured => "structured",
            Self::Sugared    => "sugared",
        })
    }
}

impl Flavor {
    fn emit(self, name: Option<&str>, req: &RequestRecord, res: &ResponseOutcome) {
        match self {
            Self::Structured => info!(
                logger = name,
                method = %req.method,
                path = %req.path,
                status = res.status,
                reqId = %req.req_id,
                remoteAddr = %req.remote_addr,
                proto = req.proto,
                latency = ?res.elapsed,
                size = res.size,
                "served"
            ),
            Self::Sugared => info!(logger = name, "{}", sugared_line(req, res)),
        }
    }
}

fn sugared_line(req: &RequestRecord, res: &ResponseOutcome) -> String {
    format!(
        "{} Request: {{Method: {}, Path: {}, ReqID: {}, RemoteIP: {}, Protocol: {}}} \
         Response: {{Status: {}, Elapsed: {:?}, Size: {} bytes}}",
        status_label(i32::from(res.status)),
        req.method,
        req.path,
        req.req_id,
        req.remote_addr,
        req.proto,
        res.status,
        res.elapsed,
        res.size,
    )
}

// ── Logger ────────────────────────────────────────────────────────────────────

/// Access-log middleware.
///
/// ```rust,no_run
/// # use http::Method;
/// # use reqlog::{Request, Response, Router};
/// use reqlog::middleware::{Logger, RequestId};
/// # async fn index(_: Request) -> Response { Response::text("") }
///
/// # fn main() -> Result<(), reqlog::Error> {
/// let app = Router::new()
///     .layer(RequestId::new())
///     .layer(Logger::new("sugared", "http")?)
///     .on(Method::GET, "/", index);
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct Logger {
    flavor: Flavor,
    name: Option<Arc<str>>,
    announced: Arc<Once>,
}

impl Logger {
    /// Builds a logger from a flavor name (`structured` or `sugared`).
    ///
    /// An unknown flavor is a startup misconfiguration and returns
    /// [`Error::UnsupportedLogger`]. An empty `name` leaves the logger unnamed.
    pub fn new(flavor: &str, name: &str) -> Result<Self, Error> {
        Ok(Self::with_flavor(flavor.parse()?).named(name))
    }

    pub fn structured() -> Self {
        Self::with_flavor(Flavor::Structured)
    }

    pub fn sugared() -> Self {
        Self::with_flavor(Flavor::Sugared)
    }

    pub fn with_flavor(flavor: Flavor) -> Self {
        Self { flavor, name: None, announced: Arc::new(Once::new()) }
    }

    /// Tags every event from this logger with `logger = name`.
    pub fn named(mut self, name: &str) -> Self {
        self.name = (!name.is_empty()).then(|| Arc::from(name));
        self
    }

    pub fn flavor(&self) -> Flavor { self.flavor }

    pub fn name(&self) -> Option<&str> { self.name.as_deref() }
}

impl Middleware for Logger {
    fn wrap(&self, next: BoxedHandler) -> BoxedHandler {
        // Layering happens once at startup, after naming; the router wraps
        // every route, so announce only the first time.
        self.announced.call_once(|| {
            debug!(logger = self.name(), flavor = %self.flavor, "request logger configured");
        });
        Arc::new(Logged { flavor: self.flavor, name: self.name.clone(), next })
    }
}

struct Logged {
    flavor: Flavor,
    name: Option<Arc<str>>,
    next: BoxedHandler,
}

impl ErasedHandler for Logged {
    fn call(&self, req: Request) -> BoxFuture {
        let emission = Emission {
            flavor: self.flavor,
            name: self.name.clone(),
            record: RequestRecord::capture(&req),
            start: Instant::now(),
            status: 0,
            size: 0,
        };
        let fut = self.next.call(req);

        Box::pin(async move {
            let mut emission = emission;
            let res = fut.await;
            emission.observe(&res);
            drop(emission);
            res
        })
    }
}

// ── Per-request state ─────────────────────────────────────────────────────────

struct RequestRecord {
    method: Method,
    path: String,
    req_id: String,
    remote_addr: SocketAddr,
    proto: &'static str,
}

impl RequestRecord {
    fn capture(req: &Request) -> Self {
        Self {
            method: req.method().clone(),
            path: req.path().to_owned(),
            req_id: request_id(req).unwrap_or_default().to_owned(),
            remote_addr: req.remote_addr(),
            proto: req.proto(),
        }
    }
}

struct ResponseOutcome {
    status: u16,
    elapsed: Duration,
    size: usize,
}

/// Emits the access-log event when dropped, on every exit path.
struct Emission {
    flavor: Flavor,
    name: Option<Arc<str>>,
    record: RequestRecord,
    start: Instant,
    status: u16,
    size: usize,
}

impl Emission {
    fn observe(&mut self, res: &Response) {
        self.status = res.status_code().as_u16();
        self.size = res.len();
    }
}

impl Drop for Emission {
    fn drop(&mut self) {
        let outcome = ResponseOutcome {
            status: self.status,
            elapsed: self.start.elapsed(),
            size: self.size,
        };
        self.flavor.emit(self.name.as_deref(), &self.record, &outcome);
    }
}

#[cfg(test)]
mod tests {
    use std::fmt::Write as _;

    use http::StatusCode;
    use tracing::Level;

    use super::*;
    use crate::Handler;
    use crate::middleware::RequestId;
    use crate::test_support::capture;

    // ── Handlers ──────────────────────────────────────────────────────────────

    async fn ok(_req: Request) -> Response {
        Response::text("hello")
    }

    async fn no_content(_req: Request) -> StatusCode {
        StatusCode::NO_CONTENT
    }

    async fn pieces(_req: Request) -> Response {
        let mut body = String::new();
        for i in 0..3 {
            write!(body, "chunk{i};").unwrap();
        }
        Response::text(body)
    }

    async fn bad_header(_req: Request) -> Response {
        Response::builder().header("bad name", "x").text("hello")
    }

    async fn boom(_req: Request) -> Response {
        panic!("handler failed");
    }

    async fn run(logger: Logger, handler: impl Handler, req: Request) -> Response {
        logger.wrap(handler.into_boxed_handler()).call(req).await
    }

    // ── Status labels ─────────────────────────────────────────────────────────

    #[test]
    fn status_label_classes() {
        assert_eq!(status_label(200), "200 OK");
        assert_eq!(status_label(404), "404 Client Error");
        assert_eq!(status_label(500), "500 Server Error");
        assert_eq!(status_label(0), "0 Unknown");
        assert_eq!(status_label(-1), "-1 Unknown");
    }

    #[test]
    fn status_label_boundaries() {
        assert_eq!(status_label(99), "99 Unknown");
        assert_eq!(status_label(100), "100 OK");
        assert_eq!(status_label(299), "299 OK");
        assert_eq!(status_label(300), "300 Redirect");
        assert_eq!(status_label(399), "399 Redirect");
        assert_eq!(status_label(400), "400 Client Error");
        assert_eq!(status_label(499), "499 Client Error");
        assert_eq!(status_label(999), "999 Server Error");
    }

    // ── Construction ──────────────────────────────────────────────────────────

    #[test]
    fn flavor_from_name() {
        assert_eq!(Logger::new("structured", "").unwrap().flavor(), Flavor::Structured);
        assert_eq!(Logger::new("Sugared", "").unwrap().flavor(), Flavor::Sugared);
    }

    #[test]
    fn unknown_flavor_is_a_config_error() {
        let err = Logger::new("printf", "http").unwrap_err();
        assert!(matches!(err, Error::UnsupportedLogger(ref kind) if kind == "printf"));
        assert!(err.to_string().contains("printf"));
    }

    #[test]
    fn empty_name_means_unnamed() {
        assert_eq!(Logger::structured().named("").name(), None);
        assert_eq!(Logger::structured().named("api").name(), Some("api"));
    }

    // ── Emission ──────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn structured_event_fields() {
        let (captured, _guard) = capture();

        let res = run(Logger::structured(), ok, Request::for_test(Method::GET, "/foo")).await;
        assert_eq!(res.body(), b"hello");

        let events = captured.at(Level::INFO);
        assert_eq!(events.len(), 1);
        let event = &events[0];
        assert_eq!(event["message"], "served");
        assert_eq!(event["method"], "GET");
        assert_eq!(event["path"], "/foo");
        assert_eq!(event["status"], "200");
        assert_eq!(event["reqId"], "");
        assert_eq!(event["remoteAddr"], "127.0.0.1:40000");
        assert_eq!(event["proto"], "HTTP/1.1");
        assert_eq!(event["size"], "5");
        assert!(!event["latency"].is_empty());
        assert!(!event.contains_key("logger"));
    }

    #[tokio::test]
    async fn sugared_line_contents() {
        let (captured, _guard) = capture();

        run(Logger::sugared(), ok, Request::for_test(Method::GET, "/foo")).await;

        let events = captured.at(Level::INFO);
        assert_eq!(events.len(), 1);
        let line = &events[0]["message"];
        assert!(line.starts_with("200 OK Request: {Method: GET, Path: /foo, ReqID: , "), "{line}");
        assert!(line.contains("RemoteIP: 127.0.0.1:40000, Protocol: HTTP/1.1}"), "{line}");
        assert!(line.contains("Response: {Status: 200, Elapsed: "), "{line}");
        assert!(line.ends_with("Size: 5 bytes}"), "{line}");
    }

    #[tokio::test]
    async fn named_logger_tags_events() {
        let (captured, _guard) = capture();

        run(Logger::sugared().named("api"), ok, Request::for_test(Method::GET, "/")).await;
        run(Logger::structured().named("api"), ok, Request::for_test(Method::GET, "/")).await;

        let events = captured.at(Level::INFO);
        assert_eq!(events.len(), 2);
        assert!(events.iter().all(|e| e["logger"] == "api"));
    }

    #[tokio::test]
    async fn one_event_per_request_for_any_body() {
        let (captured, _guard) = capture();

        let res = run(Logger::structured(), no_content, Request::for_test(Method::DELETE, "/a")).await;
        assert_eq!(res.status_code(), StatusCode::NO_CONTENT);
        run(Logger::structured(), ok, Request::for_test(Method::GET, "/b")).await;
        run(Logger::structured(), pieces, Request::for_test(Method::GET, "/c")).await;

        let events = captured.at(Level::INFO);
        assert_eq!(events.len(), 3);
        assert_eq!((events[0]["status"].as_str(), events[0]["size"].as_str()), ("204", "0"));
        assert_eq!((events[1]["status"].as_str(), events[1]["size"].as_str()), ("200", "5"));
        assert_eq!((events[2]["status"].as_str(), events[2]["size"].as_str()), ("200", "21"));
    }

    #[tokio::test]
    async fn request_id_from_upstream() {
        let (captured, _guard) = capture();

        let handler = RequestId::new().wrap(Logger::structured().wrap(ok.into_boxed_handler()));
        let req = Request::for_test(Method::GET, "/").with_header("x-request-id", "req-7");
        handler.call(req).await;

        let events = captured.at(Level::INFO);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0]["reqId"], "req-7");
    }

    #[tokio::test]
    async fn panicking_handler_is_logged_and_panic_propagates() {
        let (captured, _guard) = capture();

        let handler = Logger::sugared().wrap(boom.into_boxed_handler());
        let joined = tokio::spawn(handler.call(Request::for_test(Method::POST, "/boom"))).await;

        assert!(joined.err().expect("panic surfaces as a JoinError").is_panic());
        let events = captured.at(Level::INFO);
        assert_eq!(events.len(), 1);
        let line = &events[0]["message"];
        assert!(line.starts_with("0 Unknown Request: {Method: POST, Path: /boom"), "{line}");
        assert!(line.ends_with("Size: 0 bytes}"), "{line}");
    }

    #[tokio::test]
    async fn sugared_line_carries_request_id() {
        let (captured, _guard) = capture();

        let handler = RequestId::new().wrap(Logger::sugared().wrap(ok.into_boxed_handler()));
        let req = Request::for_test(Method::GET, "/foo").with_header("x-request-id", "req-9");
        handler.call(req).await;

        let events = captured.at(Level::INFO);
        assert_eq!(events.len(), 1);
        let line = &events[0]["message"];
        assert!(line.contains("Path: /foo, ReqID: req-9, RemoteIP: "), "{line}");
    }

    #[tokio::test]
    async fn invalid_header_is_logged_as_served() {
        let (captured, _guard) = capture();

        let res = run(Logger::sugared(), bad_header, Request::for_test(Method::GET, "/h")).await;
        assert_eq!(res.status_code(), StatusCode::INTERNAL_SERVER_ERROR);

        let events = captured.at(Level::INFO);
        assert_eq!(events.len(), 1);
        let line = &events[0]["message"];
        assert!(line.starts_with("500 Server Error Request: {Method: GET, Path: /h"), "{line}");
        assert!(line.ends_with("Size: 0 bytes}"), "{line}");
    }

    #[test]
    fn configuration_is_announced_once_with_name() {
        let (captured, _guard) = capture();

        let logger = Logger::sugared().named("api");
        assert!(captured.at(Level::DEBUG).is_empty());

        let _ = crate::Router::new()
            .layer(logger)
            .on(Method::GET, "/a", ok)
            .on(Method::GET, "/b", ok);

        let events = captured.at(Level::DEBUG);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0]["message"], "request logger configured");
        assert_eq!(events[0]["logger"], "api");
        assert_eq!(events[0]["flavor"], "sugared");
    }
}
