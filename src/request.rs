use crate::error::{Abort, WaypointError};
use crate::parameters::{ParameterValue, Parameters};
use std::convert::TryFrom;

macro_rules! forward {
    () => {};
    (
        $(#[$m:meta])* $v:vis fn $name:ident(&self $(, $pn:ident: $pt:ty)*) -> $ret:ty;
        $($tail:tt)*
    ) => {
        $(#[$m])* $v fn $name(&self $(, $pn: $pt)*) -> $ret {
            self.inner.$name($($pn),*)
        }

        forward! { $($tail)* }
    };

    (
        $(#[$m:meta])* $v:vis fn $name:ident(&mut self $(, $pn:ident: $pt:ty)*) -> $ret:ty;
        $($tail:tt)*
    ) => {
        $(#[$m])* $v fn $name(&mut self $(, $pn: $pt)*) -> $ret {
            self.inner.$name($($pn),*)
        }

        forward! { $($tail)* }
    }
}

macro_rules! construct {
    () => {};
    ($($(#[$m:meta])* $v:vis fn $method:ident = $action:expr;)+) => {
        $($(#[$m])* $v fn $method<U>(uri: U) -> Result<Self, http::Error>
        where
            http::Uri: TryFrom<U>,
            <http::Uri as TryFrom<U>>::Error: Into<http::Error>
        {
            Request::from_method(uri, $action)
        })+
    };
}

#[derive(Debug)]
/// Represents an HTTP request, as it moves through the middleware.
///
/// Besides the head and the body, this carries the parameters captured by
/// the route that matched (see [`Request::parameters`]), and the items of the
/// query string (see [`Request::query_parameters`]).
///
/// # Examples
/// ```rust
/// # use waypoint::*;
/// # #[tokio::main] async fn main() -> Result<(), anyhow::Error> {
/// let mut router = waypoint::router();
/// router.get("/users/:id:int", middleware::sync(|request, _| {
///     let id: i64 = request.param("id").unwrap_or_default();
///     Output::text(format!("user {}", id))
/// }));
/// let response = router.handle(Request::get("/users/42?verbose")?).await;
/// assert_eq!(response.into_text().await?, "user 42");
/// # Ok(())
/// # }
/// ```
pub struct Request {
    inner: http::Request<hyper::Body>,
    parameters: Parameters,
    query: Parameters,
}

impl Request {
    construct! {
        /// Creates a new request initialized with the GET method and the given
        /// URI.
        ///
        /// # Examples
        /// ```rust
        /// # use waypoint::*;
        /// let request = Request::get("https://example.com/a").unwrap();
        /// assert_eq!(request.method(), http::Method::GET);
        /// ```
        pub fn get = http::Method::GET;
        /// Creates a new request initialized with the POST method and the given
        /// URI.
        pub fn post = http::Method::POST;
        /// Creates a new request initialized with the PUT method and the given
        /// URI.
        pub fn put = http::Method::PUT;
        /// Creates a new request initialized with the PATCH method and the
        /// given URI.
        pub fn patch = http::Method::PATCH;
        /// Creates a new request initialized with the DELETE method and the
        /// given URI.
        pub fn delete = http::Method::DELETE;
        /// Creates a new request initialized with the HEAD method and the given
        /// URI.
        pub fn head = http::Method::HEAD;
        /// Creates a new request initialized with the OPTIONS method and the
        /// given URI.
        ///
        /// # Examples
        /// ```rust
        /// # use waypoint::*;
        /// let request = Request::options("/").unwrap();
        /// assert_eq!(request.method(), http::Method::OPTIONS);
        /// ```
        pub fn options = http::Method::OPTIONS;
    }

    /// Creates a new request initialized with the provided method and the
    /// given URI.
    ///
    /// # Examples
    /// ```rust
    /// # use waypoint::*;
    /// let method = http::Method::from_bytes(b"TEST").unwrap();
    /// let request = Request::from_method("https://example.com/a", method.clone()).unwrap();
    /// assert_eq!(request.method(), method);
    /// ```
    pub fn from_method<U>(uri: U, method: http::Method) -> Result<Self, http::Error>
    where
        http::Uri: TryFrom<U>,
        <http::Uri as TryFrom<U>>::Error: Into<http::Error>,
    {
        http::request::Builder::new()
            .method(method)
            .uri(uri)
            .body(hyper::Body::empty())
            .map(Request::from)
    }

    #[must_use]
    /// Replaces the body of the request.
    pub fn with_body<B: Into<hyper::Body>>(mut self, body: B) -> Self {
        *self.inner.body_mut() = body.into();
        self
    }

    /// The parameters of the route that matched: the path captures, then the
    /// query captures the route declared, then every other query item.  A
    /// name is only ever bound to its first value in that order.
    ///
    /// This is empty until a route matches.
    pub fn parameters(&self) -> &Parameters {
        &self.parameters
    }

    /// The query items of the request, grouped by key (repeated keys have
    /// their values joined by commas).
    pub fn query_parameters(&self) -> &Parameters {
        &self.query
    }

    /// Reads a parameter of the route that matched as the given type.
    pub fn param<T: ParameterValue + Clone>(&self, name: &str) -> Option<T> {
        self.parameters.get_as(name)
    }

    pub(crate) fn set_parameters(&mut self, parameters: Parameters) {
        self.parameters = parameters;
    }

    pub(crate) fn set_query_parameters(&mut self, query: Parameters) {
        self.query = query;
    }

    /// The path and query of the request, which is what routes are matched
    /// against.
    ///
    /// # Examples
    /// ```rust
    /// # use waypoint::*;
    /// let request = Request::get("https://example.com/a/b?c=d").unwrap();
    /// assert_eq!(request.target(), "/a/b?c=d");
    /// ```
    pub fn target(&self) -> &str {
        self.inner
            .uri()
            .path_and_query()
            .map_or("/", |p| p.as_str())
    }

    /// Deserializes the query string.
    ///
    /// # Errors
    /// Fails if the query string cannot be deserialized into `T`.
    ///
    /// # Examples
    /// ```rust
    /// # use waypoint::*;
    /// #[derive(serde::Deserialize)]
    /// struct Page { page: u32, sort: String }
    ///
    /// let request = Request::get("/?page=2&sort=name").unwrap();
    /// let page: Page = request.query().unwrap();
    /// assert_eq!(page.page, 2);
    /// assert_eq!(page.sort, "name");
    /// ```
    pub fn query<T: serde::de::DeserializeOwned>(&self) -> Result<T, serde_qs::Error> {
        serde_qs::from_str(self.inner.uri().query().unwrap_or_default())
    }

    /// Takes the body of the request, collecting it into a byte buffer.  The
    /// body is replaced with an empty one, so reading it twice yields nothing
    /// the second time.
    ///
    /// # Errors
    /// Fails if the transport fails while the body is read.
    pub async fn body_bytes(&mut self) -> Result<bytes::Bytes, WaypointError> {
        let body = std::mem::replace(self.inner.body_mut(), hyper::Body::empty());
        hyper::body::to_bytes(body)
            .await
            .map_err(WaypointError::ReadBody)
    }

    /// Takes the body of the request as UTF-8 text.
    ///
    /// # Errors
    /// Fails if the body could not be read or is not UTF-8.
    pub async fn text(&mut self) -> Result<String, anyhow::Error> {
        let bytes = self.body_bytes().await?;
        Ok(String::from_utf8(bytes.to_vec())?)
    }

    /// Takes the body of the request and decodes it as JSON.
    ///
    /// # Errors
    /// Fails if the body could not be read.  If the body is not valid JSON
    /// for `T`, the error is an [`Abort`] with a `400 Bad Request` status.
    ///
    /// # Examples
    /// ```rust
    /// # use waypoint::*;
    /// # #[tokio::main] async fn main() -> Result<(), anyhow::Error> {
    /// let mut request = Request::post("/")?.with_body(r#"{"name":"ferris"}"#);
    /// let body: serde_json::Value = request.json().await?;
    /// assert_eq!(body["name"], "ferris");
    ///
    /// let mut request = Request::post("/")?.with_body("{");
    /// let error = request.json::<serde_json::Value>().await.unwrap_err();
    /// let abort = error.downcast_ref::<Abort>().unwrap();
    /// assert_eq!(abort.status(), http::StatusCode::BAD_REQUEST);
    /// # Ok(())
    /// # }
    /// ```
    pub async fn json<T: serde::de::DeserializeOwned>(&mut self) -> Result<T, anyhow::Error> {
        let bytes = self.body_bytes().await?;
        serde_json::from_slice(&bytes[..])
            .map_err(|e| Abort::from(WaypointError::JsonDeserialization(e)).into())
    }

    /// Returns state information provided by the
    /// [`crate::middleware::StateMiddleware`] middleware.  This is a shortcut
    /// to retrieving the [`crate::middleware::State`] extension from the
    /// request.
    ///
    /// # Examples
    /// ```rust
    /// # use waypoint::*;
    /// use waypoint::middleware::State;
    /// let mut request = Request::get("/").unwrap();
    /// request.extensions_mut().insert(State(123u32));
    /// assert_eq!(request.state::<u32>(), Some(&123u32));
    /// ```
    pub fn state<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.extensions()
            .get::<crate::middleware::State<T>>()
            .map(|v| &v.0)
    }

    forward! {
        /// Returns a reference to the associated URI.
        #[inline]
        pub fn uri(&self) -> &http::Uri;
        /// Returns a reference to the associated HTTP method.
        #[inline]
        pub fn method(&self) -> &http::Method;
        /// Returns a reference to the associated header field map.
        #[inline]
        pub fn headers(&self) -> &http::HeaderMap<http::HeaderValue>;
        /// Returns a mutable reference to the associated header field map.
        #[inline]
        pub fn headers_mut(&mut self) -> &mut http::HeaderMap<http::HeaderValue>;
        /// Returns a reference to the associated extensions.
        #[inline]
        pub fn extensions(&self) -> &http::Extensions;
        /// Returns a mutable reference to the associated extensions.
        #[inline]
        pub fn extensions_mut(&mut self) -> &mut http::Extensions;
    }
}

impl From<http::Request<hyper::Body>> for Request {
    fn from(inner: http::Request<hyper::Body>) -> Self {
        Request {
            inner,
            parameters: Parameters::new(),
            query: Parameters::new(),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[tokio::test]
    async fn test_body_read_once() {
        let mut request = Request::post("/").unwrap().with_body("hello");
        assert_eq!(request.text().await.unwrap(), "hello");
        assert_eq!(request.text().await.unwrap(), "");
    }

    #[tokio::test]
    async fn test_json_error_is_abort() {
        let mut request = Request::post("/").unwrap().with_body("[1, 2");
        let error = request.json::<Vec<u32>>().await.unwrap_err();
        let abort = crate::error::find_abort(&error).unwrap();
        assert_eq!(abort.status(), http::StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_target() {
        assert_eq!(Request::get("/").unwrap().target(), "/");
        assert_eq!(Request::get("/a?b").unwrap().target(), "/a?b");
        assert_eq!(
            Request::get("https://example.com").unwrap().target(),
            "/"
        );
    }
}
