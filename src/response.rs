use crate::error::WaypointError;
use std::convert::TryInto;

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

#[derive(Debug)]
/// The response being built for a request.
///
/// Middleware can freely set the status and headers; the body is written
/// exactly once, with [`Response::send`].  The pipeline sends the response
/// for you when a middleware returns a terminal [`crate::Output`].
///
/// # Examples
/// ```rust
/// # use waypoint::*;
/// # #[tokio::main] async fn main() -> Result<(), anyhow::Error> {
/// let mut response = Response::default();
/// response.set_status(http::StatusCode::CREATED);
/// response.send("done", &mime::TEXT_PLAIN_UTF_8)?;
/// assert!(response.is_sent());
/// assert!(response.send("again", &mime::TEXT_PLAIN_UTF_8).is_err());
/// assert_eq!(response.status(), http::StatusCode::CREATED);
/// assert_eq!(response.into_text().await?, "done");
/// # Ok(())
/// # }
/// ```
pub struct Response {
    inner: http::Response<hyper::Body>,
    sent: bool,
}

impl Response {
    /// Sets the status code.
    pub fn set_status(&mut self, status: http::StatusCode) -> &mut Self {
        *self.inner.status_mut() = status;
        self
    }

    /// Retrieves the given header specified here.
    ///
    /// # Examples
    /// ```rust
    /// # use waypoint::*;
    /// let mut response = Response::default();
    /// response.send("hello, world", &mime::TEXT_PLAIN_UTF_8).unwrap();
    /// let content_type = response.header("Content-Type").unwrap();
    /// assert_eq!(content_type.as_bytes(), b"text/plain; charset=utf-8");
    /// ```
    pub fn header<H: http::header::AsHeaderName>(&self, key: H) -> Option<&http::HeaderValue> {
        self.inner.headers().get(key)
    }

    /// Sets the given header to the given value.  If there already was a
    /// header, it is replaced with the given value.
    ///
    /// # Errors
    /// If the given value cannot be converted into a header value, this will
    /// return an error.
    pub fn set_header<H, V>(&mut self, key: H, value: V) -> Result<&mut Self, http::Error>
    where
        H: http::header::IntoHeaderName,
        V: TryInto<http::HeaderValue>,
        http::Error: From<<V as TryInto<http::HeaderValue>>::Error>,
    {
        self.inner.headers_mut().insert(key, value.try_into()?);
        Ok(self)
    }

    /// Writes the body and its content type, completing the response.
    ///
    /// # Errors
    /// Fails with [`WaypointError::AlreadySent`] if the response was already
    /// sent; the first body is kept.
    pub fn send<B: Into<bytes::Bytes>>(
        &mut self,
        body: B,
        mime: &mime::Mime,
    ) -> Result<(), WaypointError> {
        if self.sent {
            return Err(WaypointError::AlreadySent);
        }

        let content_type = http::HeaderValue::from_str(mime.as_ref())
            .unwrap_or_else(|_| http::HeaderValue::from_static("application/octet-stream"));
        self.inner
            .headers_mut()
            .insert(http::header::CONTENT_TYPE, content_type);
        *self.inner.body_mut() = hyper::Body::from(body.into());
        self.sent = true;
        Ok(())
    }

    /// Whether the body has been written.
    pub fn is_sent(&self) -> bool {
        self.sent
    }

    /// Converts the contents of this response into a byte buffer.
    ///
    /// # Errors
    /// Fails if the body stream fails.
    pub async fn to_bytes(self) -> Result<bytes::Bytes, WaypointError> {
        hyper::body::to_bytes(self.inner.into_body())
            .await
            .map_err(WaypointError::ReadBody)
    }

    /// Converts the contents of this response into a UTF-8 string.
    ///
    /// # Errors
    /// Fails if the body stream fails, or is not UTF-8.
    pub async fn into_text(self) -> Result<String, anyhow::Error> {
        let bytes = self.to_bytes().await?;
        Ok(String::from_utf8(bytes.to_vec())?)
    }

    forward! {
        /// Returns the [`http::StatusCode`].
        ///
        /// # Examples
        ///
        /// ```rust
        /// # use waypoint::*;
        /// let response = Response::default();
        /// assert_eq!(response.status(), http::StatusCode::OK);
        /// ```
        pub fn status(&self) -> http::StatusCode;
        /// Returns a reference to the associated extensions.
        pub fn extensions(&self) -> &http::Extensions;
        /// Returns a mutable reference to the associated extensions.
        pub fn extensions_mut(&mut self) -> &mut http::Extensions;
        /// Returns a reference to the associated header field map.
        pub fn headers(&self) -> &http::HeaderMap<http::HeaderValue>;
        /// Returns a mutable reference to the associated header field map.
        pub fn headers_mut(&mut self) -> &mut http::HeaderMap<http::HeaderValue>;
    }
}

impl Default for Response {
    fn default() -> Self {
        Response {
            inner: http::Response::new(hyper::Body::empty()),
            sent: false,
        }
    }
}

impl From<Response> for http::Response<hyper::Body> {
    fn from(this: Response) -> Self {
        this.inner
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[tokio::test]
    async fn test_second_send_keeps_first_body() {
        let mut response = Response::default();
        response.send("first", &mime::TEXT_PLAIN_UTF_8).unwrap();
        let error = response.send("second", &mime::APPLICATION_JSON).unwrap_err();
        assert!(matches!(error, WaypointError::AlreadySent));
        assert_eq!(
            response.header(http::header::CONTENT_TYPE).unwrap(),
            "text/plain; charset=utf-8"
        );
        assert_eq!(response.into_text().await.unwrap(), "first");
    }

    #[test]
    fn test_headers_before_send() {
        let mut response = Response::default();
        response
            .set_header("X-Thing", "1")
            .unwrap()
            .set_status(http::StatusCode::ACCEPTED);
        assert!(!response.is_sent());
        assert_eq!(response.header("x-thing").unwrap(), "1");
        assert_eq!(response.status(), http::StatusCode::ACCEPTED);
    }
}
