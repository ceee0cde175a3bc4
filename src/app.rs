use crate::error::WaypointError;
use crate::files::FileReader;
use crate::middleware::{ErrorHandler, Middleware};
use crate::router::{IntoMatcher, Router};
use std::future::Future;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::watch;

/// A router bound to the network.
///
/// The application owns a [`Router`], and hands every registration through
/// to it; on top of that, it knows how to [`listen`](Application::listen)
/// for connections and how to stop doing so.
///
/// # Examples
/// ```rust,no_run
/// # use waypoint::*;
/// #[tokio::main]
/// async fn main() -> Result<(), anyhow::Error> {
///     let mut app = Application::new();
///     app.with(middleware::TraceMiddleware::new())
///         .get("/", middleware::sync(|_, _| Output::text("hello, world!")))
///         .catch(middleware::ErrorLogger::new());
///     app.listen("0.0.0.0:8080").await?;
///     Ok(())
/// }
/// ```
#[derive(Debug, Default)]
pub struct Application {
    router: Router,
    termination: Option<watch::Receiver<bool>>,
}

macro_rules! delegate {
    ($($(#[$m:meta])* $v:vis fn $n:ident;)+) => {
        $(
            $(#[$m])* $v fn $n<P: IntoMatcher, M: Middleware>(&mut self, matcher: P, handler: M) -> &mut Self {
                self.router.$n(matcher, handler);
                self
            }
        )+
    };
}

impl Application {
    #[must_use]
    /// Creates an application with an empty router.
    pub fn new() -> Self {
        Application::default()
    }

    /// Wraps an existing router.
    pub fn from_router(router: Router) -> Self {
        Application {
            router,
            termination: None,
        }
    }

    /// The router requests are dispatched through.
    pub fn router(&self) -> &Router {
        &self.router
    }

    /// The router requests are dispatched through.
    pub fn router_mut(&mut self) -> &mut Router {
        &mut self.router
    }

    /// See [`Router::with`].
    pub fn with<M: Middleware>(&mut self, middleware: M) -> &mut Self {
        self.router.with(middleware);
        self
    }

    /// See [`Router::catch`].
    pub fn catch<H: ErrorHandler>(&mut self, handler: H) -> &mut Self {
        self.router.catch(handler);
        self
    }

    /// See [`Router::route`].
    pub fn route<P: IntoMatcher, M: Middleware>(
        &mut self,
        method: http::Method,
        matcher: P,
        handler: M,
    ) -> &mut Self {
        self.router.route(method, matcher, handler);
        self
    }

    delegate![
        /// See [`Router::get`].
        pub fn get;
        /// See [`Router::post`].
        pub fn post;
        /// See [`Router::put`].
        pub fn put;
        /// See [`Router::patch`].
        pub fn patch;
        /// See [`Router::delete`].
        pub fn delete;
        /// See [`Router::all`].
        pub fn all;
    ];

    /// See [`Router::file_reader`].
    pub fn file_reader<F: FileReader>(&mut self, reader: F) -> &mut Self {
        self.router.file_reader(reader);
        self
    }

    /// Creates a sender that stops [`Application::listen`].  Sending `true`
    /// stops accepting connections, and lets the open ones finish before
    /// `listen` returns.  Dropping the sender does not stop anything.
    ///
    /// Calling this again replaces the previous channel.
    ///
    /// # Examples
    /// ```rust
    /// # use waypoint::*;
    /// # #[tokio::main] async fn main() -> Result<(), anyhow::Error> {
    /// let mut app = Application::new();
    /// let stop = app.termination_signal();
    /// let server = tokio::spawn(app.listen("127.0.0.1:0"));
    /// stop.send(true)?;
    /// server.await??;
    /// # Ok(())
    /// # }
    /// ```
    pub fn termination_signal(&mut self) -> watch::Sender<bool> {
        let (sender, receiver) = watch::channel(false);
        self.termination = Some(receiver);
        sender
    }

    /// Binds to the given address, and serves the router until the
    /// termination signal fires (or forever, without one).
    ///
    /// # Errors
    /// Fails if the address cannot be parsed, or if the server fails to bind
    /// or to run.
    pub async fn listen(self, address: &str) -> Result<(), WaypointError> {
        let address: SocketAddr = address
            .parse()
            .map_err(|_| WaypointError::InvalidAddress(address.to_owned()))?;

        log::info!("listen({})", address);
        log::trace!("serving {} middleware", self.router.len());

        let termination = terminated(self.termination);
        let service = RouterService(Arc::new(self.router));

        hyper::server::Server::try_bind(&address)
            .map_err(WaypointError::HyperServer)?
            .serve(hyper::service::make_service_fn(move |_| {
                let service = service.clone();
                async move { Ok::<_, std::convert::Infallible>(service) }
            }))
            .with_graceful_shutdown(termination)
            .await
            .map_err(WaypointError::HyperServer)?;

        log::info!("stopped listening on {}", address);
        Ok(())
    }
}

async fn terminated(receiver: Option<watch::Receiver<bool>>) {
    match receiver {
        Some(mut receiver) => loop {
            let stopped = *receiver.borrow();
            if stopped {
                break;
            }
            if receiver.changed().await.is_err() {
                futures::future::pending::<()>().await;
            }
        },
        None => futures::future::pending().await,
    }
}

#[derive(Debug, Clone)]
struct RouterService(Arc<Router>);

type RouterFuture<R, E> = Pin<Box<dyn Future<Output = Result<R, E>> + Send + 'static>>;

impl tower::Service<hyper::Request<hyper::Body>> for RouterService {
    type Response = hyper::Response<hyper::Body>;
    type Error = std::convert::Infallible;
    type Future = RouterFuture<Self::Response, Self::Error>;

    fn poll_ready(
        &mut self,
        _cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        std::task::Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: hyper::Request<hyper::Body>) -> Self::Future {
        let router = self.0.clone();
        Box::pin(async move { Ok(router.handle(request.into()).await.into()) })
    }
}
