use std::pin::Pin;

use super::{ErrorHandler, Middleware, Output};
use crate::{Request, Response};

#[derive(Default, Debug, Clone)]
/// A middleware for tracing HTTP requests.
///
/// This logs (using `log`) each request as it reaches this middleware, at the
/// `info` level.  Place it first to see every request; the router itself logs
/// how long each request took at the `trace` level.
pub struct TraceMiddleware {
    _v: (),
}

impl TraceMiddleware {
    #[must_use]
    /// Creates a new trace middleware.  This is provided as an alternative
    /// to `Default`.
    pub fn new() -> Self {
        TraceMiddleware::default()
    }
}

#[async_trait]
impl Middleware for TraceMiddleware {
    async fn apply(
        self: Pin<&Self>,
        request: &mut Request,
        _response: &mut Response,
    ) -> Result<Output, anyhow::Error> {
        log::info!("--> {} {}", request.method(), request.uri().path());
        Ok(Output::Next)
    }
}

#[derive(Default, Debug, Clone)]
/// An error handler that logs (using `log`) every error of a failed request
/// at the `error` level.
pub struct ErrorLogger {
    _v: (),
}

impl ErrorLogger {
    #[must_use]
    /// Creates a new error logger.  This is provided as an alternative to
    /// `Default`.
    pub fn new() -> Self {
        ErrorLogger::default()
    }
}

#[async_trait]
impl ErrorHandler for ErrorLogger {
    async fn handle(self: Pin<&Self>, errors: &[anyhow::Error], request: &Request, response: &Response) {
        for error in errors {
            log::error!(
                "{} {} ({}): {:#}",
                request.method(),
                request.uri().path(),
                response.status(),
                error
            );
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[tokio::test]
    async fn test_trace_is_transparent() {
        let trace = Box::pin(TraceMiddleware::new());
        let mut request = Request::get("/a").unwrap();
        let mut response = Response::default();
        let output = trace
            .as_ref()
            .apply(&mut request, &mut response)
            .await
            .unwrap();
        assert_eq!(output, Output::Next);
        assert!(!response.is_sent());
    }

    #[tokio::test]
    async fn test_error_logger_accepts_errors() {
        let logger = Box::pin(ErrorLogger::new());
        let request = Request::get("/a").unwrap();
        let response = Response::default();
        let errors = vec![anyhow::anyhow!("one"), anyhow::anyhow!("two")];
        logger.as_ref().handle(&errors, &request, &response).await;
    }
}
