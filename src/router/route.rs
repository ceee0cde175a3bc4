use super::matcher::{IntoMatcher, UriMatch, UriMatcher};
use crate::middleware::{Middleware, Output};
use crate::{Request, Response};
use std::pin::Pin;

/// A middleware that only runs its handler for requests with a given method
/// and a matching URI.
///
/// This is what [`crate::Router::get`] and friends register.  A request that
/// does not match is handed on to the next middleware untouched.  A request
/// that matches gets the captured parameters attached (see
/// [`Request::parameters`]) before the handler runs.
pub struct Route {
    method: Option<http::Method>,
    matcher: Box<dyn UriMatcher>,
    handler: Pin<Box<dyn Middleware>>,
}

impl Route {
    /// Creates a route.  With no method, every method matches.
    ///
    /// # Panics
    /// Panics if `matcher` is a string that is not a valid template.
    pub fn new<P, M>(method: Option<http::Method>, matcher: P, handler: M) -> Self
    where
        P: IntoMatcher,
        M: Middleware,
    {
        Route {
            method,
            matcher: Box::new(matcher.into_matcher()),
            handler: Box::pin(handler),
        }
    }

    /// The method this route is limited to, if any.
    pub fn method(&self) -> Option<&http::Method> {
        self.method.as_ref()
    }

    fn accepts(&self, method: &http::Method) -> bool {
        self.method.as_ref().map_or(true, |m| m == method)
    }
}

#[async_trait]
impl Middleware for Route {
    async fn apply(
        self: Pin<&Self>,
        request: &mut Request,
        response: &mut Response,
    ) -> Result<Output, anyhow::Error> {
        if !self.accepts(request.method()) {
            return Ok(Output::Next);
        }

        let (path, query) = match self.matcher.match_uri(request.target()) {
            UriMatch::NotMatching => return Ok(Output::Next),
            UriMatch::Matching { path, query } => (path, query.unwrap_or_default()),
        };

        let raw = request.query_parameters().clone();
        request.set_parameters(path.merge(query.clone()).merge(raw.clone()));
        request.set_query_parameters(query.merge(raw));

        self.handler.as_ref().apply(request, response).await
    }
}

impl std::fmt::Debug for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Route")
            .field("method", &self.method)
            .field("handler", &self.handler)
            .finish_non_exhaustive()
    }
}
