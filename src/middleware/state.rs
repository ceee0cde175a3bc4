use super::{Middleware, Output};
use crate::{Request, Response};
use std::pin::Pin;

/// Shared state, as stored in a request's extensions by [`StateMiddleware`].
///
/// The wrapper keeps state values apart from anything else a middleware may
/// have put in the extensions under the same type.  Read it back with
/// [`Request::state`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct State<T>(pub T);

impl<T> State<T> {
    /// Unwraps the value.
    ///
    /// # Examples
    /// ```rust
    /// # use waypoint::middleware::State;
    /// assert_eq!(State("config").into_inner(), "config");
    /// ```
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> std::ops::Deref for State<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.0
    }
}

/// Hands a clone of a value to every request that passes through, and then
/// moves on to the next middleware.  Share expensive values through an
/// [`std::sync::Arc`].
///
/// # Examples
/// ```rust
/// # use waypoint::*;
/// # #[tokio::main] async fn main() -> Result<(), anyhow::Error> {
/// let mut router = waypoint::router();
/// router
///     .with(middleware::StateMiddleware::new(7u32))
///     .get("/", middleware::sync(|request, _| {
///         Output::text(request.state::<u32>().map(u32::to_string).unwrap_or_default())
///     }));
/// let response = router.handle(Request::get("/")?).await;
/// assert_eq!(response.into_text().await?, "7");
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct StateMiddleware<T> {
    value: T,
}

impl<T> StateMiddleware<T> {
    /// Shares `value` with every request.
    pub fn new(value: T) -> Self {
        StateMiddleware { value }
    }
}

#[async_trait]
impl<T: Clone + Send + Sync + 'static> Middleware for StateMiddleware<T> {
    async fn apply(
        self: Pin<&Self>,
        request: &mut Request,
        _response: &mut Response,
    ) -> Result<Output, anyhow::Error> {
        request.extensions_mut().insert(State(self.value.clone()));
        Ok(Output::Next)
    }
}

impl<T> std::fmt::Debug for StateMiddleware<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateMiddleware")
            .field("type", &std::any::type_name::<T>())
            .finish()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_state_is_shared() {
        let shared = Arc::new(String::from("shared"));
        let middleware = Box::pin(StateMiddleware::new(shared.clone()));
        let mut request = Request::get("/").unwrap();
        let mut response = Response::default();
        let output = middleware
            .as_ref()
            .apply(&mut request, &mut response)
            .await
            .unwrap();
        assert_eq!(output, Output::Next);
        let state = request.state::<Arc<String>>().unwrap();
        assert!(Arc::ptr_eq(state, &shared));
    }
}
