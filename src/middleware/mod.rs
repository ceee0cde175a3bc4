//! Middleware, error handlers, and the built-in ones.
//!
//! Every request runs through the router's middleware in the order they were
//! registered.  Each one may inspect or change the request and response, and
//! then either hand off to the next ([`Output::Next`]) or produce the content
//! of the response (any other [`Output`]), which ends the chain.
//!
//! ```rust
//! # use waypoint::*;
//! # #[tokio::main] async fn main() -> Result<(), anyhow::Error> {
//! let mut router = waypoint::router();
//! router
//!     .with(middleware::TraceMiddleware::new())
//!     .with(middleware::passthrough(|_, response| {
//!         response.headers_mut().insert("x-powered-by", http::HeaderValue::from_static("waypoint"));
//!     }))
//!     .get("/home", middleware::sync(|_, _| Output::text("hello, there!")))
//!     .catch(middleware::ErrorLogger::new());
//!
//! let response = router.handle(Request::get("/home")?).await;
//! assert_eq!(response.header("x-powered-by").unwrap(), "waypoint");
//! assert_eq!(response.into_text().await?, "hello, there!");
//! # Ok(())
//! # }
//! ```

mod cors;
mod deadline;
mod dir;
mod state;
mod trace;

pub use self::cors::Cors;
pub use self::deadline::{deadline, Deadline};
pub use self::dir::dir;
pub use self::state::{State, StateMiddleware};
pub use self::trace::{ErrorLogger, TraceMiddleware};
use crate::{Request, Response};
use futures::future::BoxFuture;
use std::fmt::{self, Debug};
use std::marker::PhantomData;
use std::path::PathBuf;
use std::pin::Pin;

#[derive(Debug, Clone, PartialEq)]
/// What a middleware produced.
pub enum Output {
    /// Nothing; the next middleware runs.
    Next,
    /// A text body, sent with the given content type.
    Text {
        /// The body.
        body: String,
        /// The content type.
        mime: mime::Mime,
    },
    /// A binary body, sent with the given content type.
    Data {
        /// The body.
        body: bytes::Bytes,
        /// The content type.
        mime: mime::Mime,
    },
    /// The contents of a file, sent with a content type guessed from its
    /// extension.  A missing file is answered with a `404`.
    File(PathBuf),
}

impl Output {
    /// A `text/plain` body.
    pub fn text<V: Into<String>>(body: V) -> Self {
        Output::Text {
            body: body.into(),
            mime: mime::TEXT_PLAIN_UTF_8,
        }
    }

    /// A `text/html` body.
    pub fn html<V: Into<String>>(body: V) -> Self {
        Output::Text {
            body: body.into(),
            mime: mime::TEXT_HTML_UTF_8,
        }
    }

    /// A binary body, sent as `application/json`.  Use [`Output::Data`]
    /// directly for any other content type.
    pub fn data<V: Into<bytes::Bytes>>(body: V) -> Self {
        Output::Data {
            body: body.into(),
            mime: mime::APPLICATION_JSON,
        }
    }

    /// Serializes the value as the JSON body.
    ///
    /// # Errors
    /// This errors if the underlying JSON serialization fails; and it will
    /// return that exact error.
    ///
    /// # Examples
    /// ```rust
    /// # use waypoint::*;
    /// let output = Output::json(&serde_json::json!({ "id": 42 })).unwrap();
    /// assert_eq!(output, Output::data(r#"{"id":42}"#));
    /// ```
    pub fn json<V: serde::Serialize>(body: &V) -> Result<Self, serde_json::Error> {
        serde_json::to_vec(body).map(Output::data)
    }

    /// The contents of the file at the given path.
    pub fn file<P: Into<PathBuf>>(path: P) -> Self {
        Output::File(path.into())
    }
}

/// Converts the return value of a closure into a middleware result.
pub trait IntoOutput {
    /// Performs the conversion.
    ///
    /// # Errors
    /// Passes on the error of a `Result`.
    fn into_output(self) -> Result<Output, anyhow::Error>;
}

impl IntoOutput for Output {
    fn into_output(self) -> Result<Output, anyhow::Error> {
        Ok(self)
    }
}

impl<E> IntoOutput for Result<Output, E>
where
    E: Into<anyhow::Error>,
{
    fn into_output(self) -> Result<Output, anyhow::Error> {
        self.map_err(Into::into)
    }
}

#[async_trait]
/// A unit of per-request work.
///
/// A middleware may change the request or response, then returns either
/// [`Output::Next`] to hand off to the next middleware, or some content,
/// which is sent and ends the chain.  A middleware that sends the response
/// itself (with [`Response::send`]) ends the chain too.
///
/// Errors are handled by the pipeline: an error carrying an
/// [`crate::Abort`] skips every remaining middleware and becomes the
/// response; any other error is recorded, and the chain continues.
pub trait Middleware: Debug + Send + Sync + 'static {
    #[must_use]
    /// Handles the request.
    async fn apply(
        self: Pin<&Self>,
        request: &mut Request,
        response: &mut Response,
    ) -> Result<Output, anyhow::Error>;
}

#[async_trait]
/// Observes the errors of a request that failed.
///
/// Every registered handler runs once for a failed request, before the error
/// response is written.  Handlers can't change that response.
pub trait ErrorHandler: Debug + Send + Sync + 'static {
    /// Handles the errors.  The last error is the one that ended the chain;
    /// the ones before it were recorded along the way.
    async fn handle(self: Pin<&Self>, errors: &[anyhow::Error], request: &Request, response: &Response);
}

/// A middleware from a synchronous closure.  See [`sync`].
pub struct SyncMiddleware<F, R> {
    f: F,
    _r: PhantomData<fn() -> R>,
}

/// Creates a middleware from a synchronous closure returning an [`Output`],
/// or a `Result` of one.
///
/// # Examples
/// ```rust
/// # use waypoint::*;
/// let hello = middleware::sync(|request, _| {
///     let name = request.parameters().string("name").unwrap_or_default();
///     Output::text(format!("hello, {}", name))
/// });
/// let fails = middleware::sync(|_, _| -> Result<Output, anyhow::Error> {
///     Err(anyhow::anyhow!("nope"))
/// });
/// ```
pub fn sync<F, R>(f: F) -> SyncMiddleware<F, R>
where
    F: Fn(&mut Request, &mut Response) -> R + Send + Sync + 'static,
    R: IntoOutput + 'static,
{
    SyncMiddleware { f, _r: PhantomData }
}

#[async_trait]
impl<F, R> Middleware for SyncMiddleware<F, R>
where
    F: Fn(&mut Request, &mut Response) -> R + Send + Sync + 'static,
    R: IntoOutput + 'static,
{
    async fn apply(
        self: Pin<&Self>,
        request: &mut Request,
        response: &mut Response,
    ) -> Result<Output, anyhow::Error> {
        (self.f)(request, response).into_output()
    }
}

impl<F, R> Debug for SyncMiddleware<F, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncMiddleware")
            .field("f", &std::any::type_name::<F>())
            .finish()
    }
}

/// A middleware from an asynchronous closure.  See [`handler`].
pub struct HandlerMiddleware<F>(F);

/// Creates a middleware from a closure returning a boxed future.
///
/// # Examples
/// ```rust
/// # use waypoint::*;
/// use futures::FutureExt;
///
/// let echo = middleware::handler(|request, _| {
///     async move {
///         let body = request.text().await?;
///         Ok::<_, anyhow::Error>(Output::text(body))
///     }
///     .boxed()
/// });
/// ```
pub fn handler<F>(f: F) -> HandlerMiddleware<F>
where
    F: for<'a> Fn(&'a mut Request, &'a mut Response) -> BoxFuture<'a, Result<Output, anyhow::Error>>
        + Send
        + Sync
        + 'static,
{
    HandlerMiddleware(f)
}

#[async_trait]
impl<F> Middleware for HandlerMiddleware<F>
where
    F: for<'a> Fn(&'a mut Request, &'a mut Response) -> BoxFuture<'a, Result<Output, anyhow::Error>>
        + Send
        + Sync
        + 'static,
{
    async fn apply(
        self: Pin<&Self>,
        request: &mut Request,
        response: &mut Response,
    ) -> Result<Output, anyhow::Error> {
        (self.0)(request, response).await
    }
}

impl<F> Debug for HandlerMiddleware<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("HandlerMiddleware")
            .field(&std::any::type_name::<F>())
            .finish()
    }
}

/// A middleware that runs a closure for its side effects.  See
/// [`passthrough`].
pub struct Passthrough<F>(F);

/// Creates a middleware that runs the closure, then always hands off to the
/// next middleware.
pub fn passthrough<F>(f: F) -> Passthrough<F>
where
    F: Fn(&mut Request, &mut Response) + Send + Sync + 'static,
{
    Passthrough(f)
}

#[async_trait]
impl<F> Middleware for Passthrough<F>
where
    F: Fn(&mut Request, &mut Response) + Send + Sync + 'static,
{
    async fn apply(
        self: Pin<&Self>,
        request: &mut Request,
        response: &mut Response,
    ) -> Result<Output, anyhow::Error> {
        (self.0)(request, response);
        Ok(Output::Next)
    }
}

impl<F> Debug for Passthrough<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Passthrough")
            .field(&std::any::type_name::<F>())
            .finish()
    }
}

/// An error handler from a closure.  See [`on_error`].
pub struct OnError<F>(F);

/// Creates an error handler from a closure.
///
/// # Examples
/// ```rust
/// # use waypoint::*;
/// let mut router = waypoint::router();
/// router.catch(middleware::on_error(|errors, request, _| {
///     eprintln!("{} {} failed: {:?}", request.method(), request.uri(), errors.last());
/// }));
/// ```
pub fn on_error<F>(f: F) -> OnError<F>
where
    F: Fn(&[anyhow::Error], &Request, &Response) + Send + Sync + 'static,
{
    OnError(f)
}

#[async_trait]
impl<F> ErrorHandler for OnError<F>
where
    F: Fn(&[anyhow::Error], &Request, &Response) + Send + Sync + 'static,
{
    async fn handle(self: Pin<&Self>, errors: &[anyhow::Error], request: &Request, response: &Response) {
        (self.0)(errors, request, response);
    }
}

impl<F> Debug for OnError<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("OnError")
            .field(&std::any::type_name::<F>())
            .finish()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use futures::FutureExt;

    async fn run<M: Middleware>(middleware: M, mut request: Request) -> (Output, Response) {
        let mut response = Response::default();
        let middleware = Box::pin(middleware);
        let output = middleware
            .as_ref()
            .apply(&mut request, &mut response)
            .await
            .unwrap();
        (output, response)
    }

    #[tokio::test]
    async fn test_sync() {
        let (output, _) = run(
            sync(|request, _| Output::text(request.method().as_str())),
            Request::put("/").unwrap(),
        )
        .await;
        assert_eq!(output, Output::text("PUT"));
    }

    #[tokio::test]
    async fn test_handler() {
        let echo = handler(|request, _| {
            async move { Ok::<_, anyhow::Error>(Output::text(request.text().await?)) }.boxed()
        });
        let (output, _) = run(echo, Request::post("/").unwrap().with_body("ping")).await;
        assert_eq!(output, Output::text("ping"));
    }

    #[tokio::test]
    async fn test_passthrough() {
        let (output, response) = run(
            passthrough(|_, response| {
                response.set_status(http::StatusCode::ACCEPTED);
            }),
            Request::get("/").unwrap(),
        )
        .await;
        assert_eq!(output, Output::Next);
        assert_eq!(response.status(), http::StatusCode::ACCEPTED);
    }

    #[test]
    fn test_output_constructors() {
        assert_eq!(
            Output::html("<p>"),
            Output::Text {
                body: "<p>".into(),
                mime: mime::TEXT_HTML_UTF_8
            }
        );
        assert_eq!(
            Output::file("a/b.txt"),
            Output::File(PathBuf::from("a/b.txt"))
        );
        let output = Output::json(&vec![1, 2]).unwrap();
        assert_eq!(output, Output::data("[1,2]"));
        match output {
            Output::Data { mime, .. } => assert_eq!(mime, mime::APPLICATION_JSON),
            _ => unreachable!(),
        }
    }
}
