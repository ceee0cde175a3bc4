use super::{Middleware, Output};
use crate::{Request, Response};
use http::header::{self, HeaderValue};
use std::pin::Pin;

#[derive(Debug, Clone)]
/// Adds cross-origin resource sharing headers to every response.
///
/// Preflight (`OPTIONS`) requests are answered directly with an empty body;
/// every other request is handed on.
///
/// # Examples
/// ```rust
/// # use waypoint::*;
/// # #[tokio::main] async fn main() -> Result<(), anyhow::Error> {
/// let mut router = waypoint::router();
/// router.with(middleware::Cors::new("https://example.com")?);
/// let response = router.handle(Request::options("/anything")?).await;
/// assert_eq!(response.status(), http::StatusCode::OK);
/// assert_eq!(
///     response.header("access-control-allow-origin").unwrap(),
///     "https://example.com"
/// );
/// assert_eq!(response.header("allow").unwrap(), "POST, GET, OPTIONS");
/// # Ok(())
/// # }
/// ```
pub struct Cors {
    origin: HeaderValue,
    headers: HeaderValue,
    methods: HeaderValue,
    max_age: HeaderValue,
}

impl Cors {
    /// Allows requests from the given origin.
    ///
    /// # Errors
    /// Fails if the origin is not a valid header value.
    pub fn new(origin: &str) -> Result<Self, header::InvalidHeaderValue> {
        Ok(Cors {
            origin: HeaderValue::from_str(origin)?,
            headers: HeaderValue::from_static("Accept, Content-Type"),
            methods: HeaderValue::from_static("POST, GET, OPTIONS"),
            max_age: HeaderValue::from_static("86400"),
        })
    }

    /// Allows requests from any origin.
    pub fn any() -> Self {
        Cors {
            origin: HeaderValue::from_static("*"),
            headers: HeaderValue::from_static("Accept, Content-Type"),
            methods: HeaderValue::from_static("POST, GET, OPTIONS"),
            max_age: HeaderValue::from_static("86400"),
        }
    }

    #[must_use]
    /// Replaces the allowed methods (`POST, GET, OPTIONS` by default).
    pub fn with_methods(mut self, methods: HeaderValue) -> Self {
        self.methods = methods;
        self
    }

    #[must_use]
    /// Replaces the allowed request headers (`Accept, Content-Type` by
    /// default).
    pub fn with_headers(mut self, headers: HeaderValue) -> Self {
        self.headers = headers;
        self
    }
}

#[async_trait]
impl Middleware for Cors {
    async fn apply(
        self: Pin<&Self>,
        request: &mut Request,
        response: &mut Response,
    ) -> Result<Output, anyhow::Error> {
        let headers = response.headers_mut();
        headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, self.origin.clone());
        headers.insert(header::ACCESS_CONTROL_ALLOW_HEADERS, self.headers.clone());
        headers.insert(header::ACCESS_CONTROL_ALLOW_METHODS, self.methods.clone());
        headers.insert(header::ACCESS_CONTROL_MAX_AGE, self.max_age.clone());

        if request.method() == http::Method::OPTIONS {
            response
                .headers_mut()
                .insert(header::ALLOW, self.methods.clone());
            Ok(Output::text(""))
        } else {
            Ok(Output::Next)
        }
    }
}
