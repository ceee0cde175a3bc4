//! Waypoint is an embeddable async HTTP routing and middleware engine.
//! Requests run through an ordered chain of middleware; routes are just
//! middleware that only apply to some methods and URIs, and capture typed
//! parameters from the path and query along the way.  When something goes
//! wrong, the error handlers get to see what happened, and the failure is
//! written out as a JSON error response.
//!
//! Waypoint is based on Tokio and hyper.
//!
//! # Getting Started
//! To get started, just add waypoint and tokio to your `Cargo.toml`:
//!
//! ```toml
//! waypoint = "0.1.0"
//! tokio = { version = "1.26.0", features = ["full"] }
//! ```
//!
//! # Examples
//! ```rust,no_run
//! use waypoint::{middleware, Abort, Output};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), anyhow::Error> {
//!     let mut app = waypoint::Application::new();
//!     app.with(middleware::TraceMiddleware::new())
//!         .get("/", middleware::sync(|_, _| Output::text("hello, world!")))
//!         .get(
//!             "/users/:id:int",
//!             middleware::sync(|request, _| match request.param::<i64>("id") {
//!                 Some(0) => Err(Abort::new(http::StatusCode::FORBIDDEN, "root is hidden")),
//!                 Some(id) => Ok(Output::text(format!("user {}", id))),
//!                 None => Ok(Output::Next),
//!             }),
//!         )
//!         .catch(middleware::ErrorLogger::new());
//!     app.listen("0.0.0.0:8080").await?;
//!     Ok(())
//! }
//! ```
//!
//! The router can also be driven without a network at all:
//!
//! ```rust
//! # use waypoint::*;
//! # #[tokio::main] async fn main() -> Result<(), anyhow::Error> {
//! let mut router = waypoint::router();
//! router.get("/hello/:name", middleware::sync(|request, _| {
//!     Output::text(format!("hello, {}!", request.parameters().string("name").unwrap_or_default()))
//! }));
//! let response = router.handle(Request::get("/hello/ferris")?).await;
//! assert_eq!(response.into_text().await?, "hello, ferris!");
//! # Ok(())
//! # }
//! ```
#![deny(clippy::correctness)]
#![warn(missing_docs)]
#![warn(missing_debug_implementations)]

#[macro_use]
extern crate async_trait;

mod app;
mod error;
mod files;
pub mod middleware;
mod parameters;
pub mod parser;
mod pipeline;
mod request;
mod response;
mod router;

pub use self::app::Application;
pub use self::error::{Abort, AbortError, ErrorResponse, TemplateError, WaypointError};
pub use self::files::{FileReader, TokioFileReader};
pub use self::middleware::{ErrorHandler, IntoOutput, Middleware, Output};
pub use self::parameters::{ParameterValue, Parameters, Value};
pub use self::request::Request;
pub use self::response::Response;
pub use self::router::matcher;
pub use self::router::{
    IntoMatcher, ParameterType, PathExpression, PathExpressionBuilder, Route, Router, Segment,
    UriMatch, UriMatcher, WildcardScope,
};

#[must_use]
#[inline]
/// This creates a new router.  This is a shortcut for [`Router::default`].
pub fn router() -> Router {
    Router::default()
}
