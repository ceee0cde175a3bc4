use super::{Middleware, Output};
use crate::error::Abort;
use crate::{Request, Response};
use std::pin::Pin;
use std::time::Duration;

/// A middleware with a time limit.  See [`deadline`].
pub struct Deadline {
    duration: Duration,
    inner: Pin<Box<dyn Middleware>>,
}

/// Limits how long the given middleware may run.
///
/// If it runs for longer than `duration`, it is dropped where it stands, and
/// the request fails with a `503 Service Unavailable`.
///
/// # Examples
/// ```rust
/// # use waypoint::*;
/// # use std::time::Duration;
/// use futures::FutureExt;
///
/// # #[tokio::main] async fn main() -> Result<(), anyhow::Error> {
/// let slow = middleware::handler(|_, _| {
///     async move {
///         tokio::time::sleep(Duration::from_secs(10)).await;
///         Ok::<_, anyhow::Error>(Output::text("finally"))
///     }
///     .boxed()
/// });
/// let mut router = waypoint::router();
/// router.get("/", middleware::deadline(Duration::from_millis(10), slow));
/// let response = router.handle(Request::get("/")?).await;
/// assert_eq!(response.status(), http::StatusCode::SERVICE_UNAVAILABLE);
/// # Ok(())
/// # }
/// ```
pub fn deadline<M: Middleware>(duration: Duration, middleware: M) -> Deadline {
    Deadline {
        duration,
        inner: Box::pin(middleware),
    }
}

#[async_trait]
impl Middleware for Deadline {
    async fn apply(
        self: Pin<&Self>,
        request: &mut Request,
        response: &mut Response,
    ) -> Result<Output, anyhow::Error> {
        let work = self.inner.as_ref().apply(request, response);
        match tokio::time::timeout(self.duration, work).await {
            Ok(result) => result,
            Err(_) => {
                log::debug!("middleware timed out after {:?}", self.duration);
                Err(Abort::new(http::StatusCode::SERVICE_UNAVAILABLE, "Request timed out.").into())
            }
        }
    }
}

impl std::fmt::Debug for Deadline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Deadline")
            .field("duration", &self.duration)
            .field("inner", &self.inner)
            .finish()
    }
}
