mod expression;
pub mod matcher;
mod route;
mod segment;

pub use self::expression::{PathExpression, PathExpressionBuilder};
pub use self::matcher::{IntoMatcher, UriMatch, UriMatcher};
pub use self::route::Route;
pub use self::segment::{ParameterType, Segment, WildcardScope};
use crate::files::{FileReader, TokioFileReader};
use crate::middleware::{ErrorHandler, Middleware};
use crate::pipeline::Pipeline;
use crate::{Request, Response};
use std::pin::Pin;
use std::sync::Arc;

/// A router.  This contains the ordered list of middleware every request
/// runs through, and the error handlers that observe failed requests.
///
/// Routes are middleware too: [`Router::get`] and friends register a
/// [`Route`], which only runs its handler if the method and URI match, and
/// otherwise hands on to the next middleware.  Since everything runs in
/// registration order, overlapping routes resolve by declaration order, not
/// by specificity.  So, assuming that you have the following routes defined:
///
/// ```text
/// GET /user/:id -> user_by_id
/// GET /user/me -> current_user
/// ```
///
/// `current_user` is never reached, as `/user/:id` also matches `/user/me`
/// and is declared first.  A parameter with a type only matches if the
/// segment decodes as that type, which is how two routes can differ only in
/// the types of their parameters:
///
/// ```rust
/// # use waypoint::*;
/// # #[tokio::main] async fn main() -> Result<(), anyhow::Error> {
/// let mut router = waypoint::router();
/// router
///     .get("/user/:id:int", middleware::sync(|_, _| Output::text("by id")))
///     .get("/user/:name", middleware::sync(|_, _| Output::text("by name")));
///
/// let response = router.handle(Request::get("/user/12")?).await;
/// assert_eq!(response.into_text().await?, "by id");
/// let response = router.handle(Request::get("/user/ferris")?).await;
/// assert_eq!(response.into_text().await?, "by name");
/// # Ok(())
/// # }
/// ```
///
/// If no middleware produces a response, the request fails with a `404`.
pub struct Router {
    middleware: Vec<Pin<Box<dyn Middleware>>>,
    handlers: Vec<Pin<Box<dyn ErrorHandler>>>,
    files: Arc<dyn FileReader>,
}

macro_rules! method {
    ($($(#[$m:meta])* $v:vis fn $n:ident = $meth:expr;)+) => {
        $(
            $(#[$m])* $v fn $n<P: IntoMatcher, M: Middleware>(&mut self, matcher: P, handler: M) -> &mut Self {
                self.route($meth, matcher, handler)
            }
        )+
    };
}

impl Router {
    #[must_use]
    /// Creates an empty router.
    pub fn new() -> Self {
        Router {
            middleware: vec![],
            handlers: vec![],
            files: Arc::new(TokioFileReader),
        }
    }

    /// Appends a middleware.  Every request runs through the middleware in
    /// the order they were added.
    pub fn with<M: Middleware>(&mut self, middleware: M) -> &mut Self {
        self.middleware.push(Box::pin(middleware));
        self
    }

    /// Appends an error handler.  Every error handler is run, once, for each
    /// request that fails, before the error response is written.
    pub fn catch<H: ErrorHandler>(&mut self, handler: H) -> &mut Self {
        self.handlers.push(Box::pin(handler));
        self
    }

    /// Appends a route for the given method.
    ///
    /// # Panics
    /// Panics if `matcher` is a string that is not a valid template; see
    /// [`PathExpression::parse`] for the checks.
    pub fn route<P: IntoMatcher, M: Middleware>(
        &mut self,
        method: http::Method,
        matcher: P,
        handler: M,
    ) -> &mut Self {
        self.with(Route::new(Some(method), matcher, handler))
    }

    /// Appends a route for any method.
    ///
    /// # Panics
    /// Panics if `matcher` is a string that is not a valid template.
    pub fn all<P: IntoMatcher, M: Middleware>(&mut self, matcher: P, handler: M) -> &mut Self {
        self.with(Route::new(None, matcher, handler))
    }

    method![
        /// Appends a route for GET requests.
        ///
        /// # Panics
        /// Panics if `matcher` is a string that is not a valid template.
        pub fn get = http::Method::GET;
        /// Appends a route for POST requests.
        pub fn post = http::Method::POST;
        /// Appends a route for PUT requests.
        pub fn put = http::Method::PUT;
        /// Appends a route for PATCH requests.
        pub fn patch = http::Method::PATCH;
        /// Appends a route for DELETE requests.
        pub fn delete = http::Method::DELETE;
        /// Appends a route for HEAD requests.
        pub fn head = http::Method::HEAD;
        /// Appends a route for OPTIONS requests.
        pub fn options = http::Method::OPTIONS;
    ];

    /// Replaces how files are read for [`crate::Output::File`].
    pub fn file_reader<F: FileReader>(&mut self, reader: F) -> &mut Self {
        self.files = Arc::new(reader);
        self
    }

    /// The number of middleware, routes included.
    pub fn len(&self) -> usize {
        self.middleware.len()
    }

    /// Whether there is no middleware at all.
    pub fn is_empty(&self) -> bool {
        self.middleware.is_empty()
    }

    /// Runs the request through the middleware, returning the response.
    /// This never fails; failures are written into the response.
    ///
    /// # Examples
    /// ```rust
    /// # use waypoint::*;
    /// # #[tokio::main] async fn main() -> Result<(), anyhow::Error> {
    /// let router = waypoint::router();
    /// let response = router.handle(Request::get("/anything")?).await;
    /// assert_eq!(response.status(), http::StatusCode::NOT_FOUND);
    /// # Ok(())
    /// # }
    /// ```
    pub async fn handle(&self, mut request: Request) -> Response {
        let start = std::time::Instant::now();
        let method = request.method().clone();
        let path = request.uri().path().to_owned();
        log::trace!("--> {} {}", method, path);

        let query = request
            .uri()
            .query()
            .map(matcher::query_items)
            .unwrap_or_default();
        request.set_query_parameters(query.into_iter().collect());

        let mut response = Response::default();
        Pipeline::new(&self.middleware, &self.handlers, &*self.files)
            .run(&mut request, &mut response)
            .await;

        log::trace!(
            "<-- {} {}: {} (in {}ms)",
            method,
            path,
            response.status(),
            start.elapsed().as_millis()
        );
        response
    }
}

impl Default for Router {
    fn default() -> Self {
        Router::new()
    }
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router")
            .field("middleware", &self.middleware)
            .field("handlers", &self.handlers)
            .field("files", &self.files)
            .finish()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::middleware::{on_error, passthrough, sync, Output};
    use crate::Abort;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[derive(Debug)]
    struct Memory;

    #[async_trait]
    impl FileReader for Memory {
        async fn read_entire_file(&self, path: &std::path::Path) -> std::io::Result<bytes::Bytes> {
            match path.to_str() {
                Some("assets/site.css") => Ok(bytes::Bytes::from_static(b"body {}")),
                _ => Err(std::io::ErrorKind::NotFound.into()),
            }
        }
    }

    fn simple_router() -> Router {
        let mut router = Router::new();
        router
            .get("/", sync(|_, _| Output::text("root")))
            .get(
                "/users/:id:int",
                sync(|request, _| Output::json(&serde_json::json!({ "id": request.param::<i64>("id") }))),
            )
            .post("/users", sync(|_, _| Output::text("created")))
            .get("/hello/*/**", sync(|request, _| Output::text(request.parameters().wildcards().join(","))))
            .get("/x/:id", sync(|request, _| Output::text(request.parameters().string("id").unwrap_or_default())));
        router
    }

    async fn text(router: &Router, request: Request) -> (http::StatusCode, String) {
        let response = router.handle(request).await;
        let status = response.status();
        (status, response.into_text().await.unwrap())
    }

    #[tokio::test]
    async fn test_end_to_end() {
        let router = simple_router();
        assert_eq!(
            text(&router, Request::get("/users/42").unwrap()).await,
            (http::StatusCode::OK, r#"{"id":42}"#.to_owned())
        );
        assert_eq!(
            text(&router, Request::get("/users/abc").unwrap()).await,
            (
                http::StatusCode::NOT_FOUND,
                r#"{"error":"No middleware found to handle this route."}"#.to_owned()
            )
        );
    }

    #[tokio::test]
    async fn test_method_selects_route() {
        let router = simple_router();
        assert_eq!(
            text(&router, Request::post("/users").unwrap()).await,
            (http::StatusCode::OK, "created".to_owned())
        );
        let (status, _) = text(&router, Request::delete("/users").unwrap()).await;
        assert_eq!(status, http::StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_greedy_wildcard() {
        let router = simple_router();
        assert_eq!(
            text(&router, Request::get("/hello/a/b/c/d").unwrap()).await,
            (http::StatusCode::OK, "a,b,c,d".to_owned())
        );
    }

    #[tokio::test]
    async fn test_path_capture_wins() {
        let router = simple_router();
        assert_eq!(
            text(&router, Request::get("/x/path?id=5").unwrap()).await,
            (http::StatusCode::OK, "path".to_owned())
        );
    }

    #[tokio::test]
    async fn test_query_parameters_without_route() {
        let mut router = Router::new();
        router.with(sync(|request, _| {
            Output::text(request.query_parameters().string("tag").unwrap_or_default())
        }));
        assert_eq!(
            text(&router, Request::get("/?tag=a&tag=b").unwrap()).await,
            (http::StatusCode::OK, "a,b".to_owned())
        );
    }

    #[tokio::test]
    async fn test_abort_skips_routes() {
        let reached = std::sync::Arc::new(AtomicBool::new(false));
        let caught = std::sync::Arc::new(AtomicBool::new(false));
        let (reached2, caught2) = (reached.clone(), caught.clone());
        let mut router = Router::new();
        router
            .with(sync(|_, _| -> Result<Output, anyhow::Error> {
                Err(Abort::new(http::StatusCode::UNAUTHORIZED, "who are you?").into())
            }))
            .with(passthrough(move |_, _| reached2.store(true, Ordering::SeqCst)))
            .catch(on_error(move |_, _, _| caught2.store(true, Ordering::SeqCst)));

        let (status, body) = text(&router, Request::get("/").unwrap()).await;
        assert_eq!(status, http::StatusCode::UNAUTHORIZED);
        assert_eq!(body, r#"{"error":"who are you?"}"#);
        assert!(!reached.load(Ordering::SeqCst));
        assert!(caught.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_failed_route_then_abort() {
        let count = std::sync::Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let count2 = count.clone();
        let mut router = Router::new();
        router
            .get("/users/:id", sync(|_, _| -> Result<Output, anyhow::Error> {
                Err(anyhow::anyhow!("database unavailable"))
            }))
            .get("/users/:id", sync(|_, _| -> Result<Output, anyhow::Error> {
                Err(Abort::new(http::StatusCode::FORBIDDEN, "not yours").with_code(12).into())
            }))
            .catch(on_error(move |errors, _, _| {
                count2.store(errors.len(), Ordering::SeqCst);
            }));

        let (status, body) = text(&router, Request::get("/users/7").unwrap()).await;
        assert_eq!(status, http::StatusCode::FORBIDDEN);
        assert_eq!(body, r#"{"error":"not yours","code":12}"#);
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_failed_route_then_unhandled() {
        let mut router = Router::new();
        router.get("/users/:id", sync(|_, _| -> Result<Output, anyhow::Error> {
            Err(anyhow::anyhow!("database unavailable"))
        }));

        let (status, body) = text(&router, Request::get("/users/7").unwrap()).await;
        assert_eq!(status, http::StatusCode::NOT_FOUND);
        assert_eq!(body, r#"{"error":"No middleware found to handle this route."}"#);
    }

    #[tokio::test]
    async fn test_file_output() {
        let mut router = Router::new();
        router
            .file_reader(Memory)
            .with(crate::middleware::dir("/static", "assets"));
        let response = router.handle(Request::get("/static/site.css").unwrap()).await;
        assert_eq!(response.status(), http::StatusCode::OK);
        assert_eq!(response.header("content-type").unwrap(), "text/css");
        assert_eq!(response.into_text().await.unwrap(), "body {}");

        let (status, body) = text(&router, Request::get("/static/other.css").unwrap()).await;
        assert_eq!(status, http::StatusCode::NOT_FOUND);
        assert_eq!(body, r#"{"error":"Static asset not found."}"#);

        let (status, _) = text(&router, Request::get("/static/../Cargo.toml").unwrap()).await;
        assert_eq!(status, http::StatusCode::NOT_FOUND);
    }

    #[test]
    #[should_panic(expected = "invalid route template")]
    fn test_invalid_template_panics() {
        Router::new().get("/a/**/b", sync(|_, _| Output::Next));
    }
}
