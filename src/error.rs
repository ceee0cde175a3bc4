use http::StatusCode;
use std::fmt;

#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
/// Errors generated specifically from this library, and not its interactions
/// user code.
pub enum WaypointError {
    #[error("could not parse the given string ({:?}) as an address", .0)]
    /// Generated when attempting to parse an address (during
    /// [`crate::Application::listen`]), but the address was invalid.
    InvalidAddress(String),
    #[error("could not serve server")]
    /// Generated when attempting to bind and listen using hyper, but it failed
    /// for some underlying reason.
    HyperServer(#[source] hyper::Error),
    #[error("could not read the body of the request")]
    /// Generated when the transport failed while the request body was being
    /// collected.
    ReadBody(#[source] hyper::Error),
    #[error("could not decode the request body as json")]
    /// Generated when the request body is not valid JSON for the requested
    /// type.  This is answered with a `400 Bad Request`.
    JsonDeserialization(#[source] serde_json::Error),
    #[error("the response has already been sent")]
    /// Generated when a response is written to a second time.
    AlreadySent,
    #[error("No middleware found to handle this route.")]
    /// Synthesized when every middleware yielded without sending anything.
    UnhandledRoute,
    #[error("Static asset not found.")]
    /// Generated when a file output points at a file that does not exist.
    AssetNotFound,
}

impl AbortError for WaypointError {
    fn status(&self) -> StatusCode {
        match self {
            WaypointError::UnhandledRoute | WaypointError::AssetNotFound => StatusCode::NOT_FOUND,
            WaypointError::JsonDeserialization(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
/// Errors found while compiling a route template.  These are raised when the
/// route is registered, never while a request is being served.
pub enum TemplateError {
    #[error("route {:?} has more than one query separator", .0)]
    /// The template contains more than one `?`.
    MultipleQuerySeparators(String),
    #[error("segment {:?} follows a `**` wildcard and can never be matched", .0)]
    /// A segment was declared after a catch-all wildcard.
    UnreachableSegment(String),
    #[error("wildcards are not allowed in the query part ({:?})", .0)]
    /// A `*` or `**` was declared after the query separator.
    WildcardInQuery(String),
    #[error("could not parse {:?} as a parameter", .0)]
    /// A `:name` or `{name}` token was malformed.
    InvalidParameter(String),
    #[error("unknown parameter type {:?}", .0)]
    /// A parameter was declared with a type name that is not recognized.
    UnknownType(String),
    #[error("parameter names may not be empty")]
    /// A parameter was declared without a name.
    EmptyName,
}

/// An error that carries its own HTTP response.
///
/// Returning one of these from a middleware (wrapped in an [`Abort`]) skips
/// every remaining middleware; the error handlers see
/// it, and then the response is built from [`AbortError::status`],
/// [`AbortError::reason`], and [`AbortError::code`].
pub trait AbortError: std::error::Error + Send + Sync + 'static {
    /// The status code of the response.
    fn status(&self) -> StatusCode;

    /// The human-readable message placed in the response.
    fn reason(&self) -> String {
        self.to_string()
    }

    /// An application-specific code placed in the response, if any.
    fn code(&self) -> Option<i64> {
        None
    }
}

/// The carrier for an [`AbortError`].
///
/// Since middleware return [`anyhow::Error`], the pipeline needs a concrete
/// type to look for; any error that implements [`AbortError`] converts into
/// this.
///
/// # Examples
/// ```rust
/// # use waypoint::Abort;
/// let abort = Abort::new(http::StatusCode::FORBIDDEN, "nope").with_code(12);
/// assert_eq!(abort.status(), http::StatusCode::FORBIDDEN);
/// assert_eq!(abort.reason(), "nope");
/// assert_eq!(abort.code(), Some(12));
/// ```
pub struct Abort {
    inner: Box<dyn AbortError>,
    code: Option<i64>,
}

#[derive(Debug)]
struct Simple {
    status: StatusCode,
    reason: String,
}

impl fmt::Display for Simple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.reason)
    }
}

impl std::error::Error for Simple {}

impl AbortError for Simple {
    fn status(&self) -> StatusCode {
        self.status
    }
}

impl Abort {
    /// Creates an abort with the given status and reason.
    pub fn new(status: StatusCode, reason: impl Into<String>) -> Self {
        Abort::from(Simple {
            status,
            reason: reason.into(),
        })
    }

    #[must_use]
    /// Overrides the code of the response.
    pub fn with_code(mut self, code: i64) -> Self {
        self.code = Some(code);
        self
    }

    /// The status code of the response.
    pub fn status(&self) -> StatusCode {
        self.inner.status()
    }

    /// The message placed in the response.
    pub fn reason(&self) -> String {
        self.inner.reason()
    }

    /// The code placed in the response, if any.
    pub fn code(&self) -> Option<i64> {
        self.code.or_else(|| self.inner.code())
    }

    /// The underlying error.
    pub fn get_ref(&self) -> &(dyn AbortError + 'static) {
        &*self.inner
    }

    pub(crate) fn to_response(&self) -> ErrorResponse {
        ErrorResponse {
            error: self.reason(),
            code: self.code(),
        }
    }
}

impl<E: AbortError> From<E> for Abort {
    fn from(error: E) -> Self {
        Abort {
            inner: Box::new(error),
            code: None,
        }
    }
}

impl fmt::Debug for Abort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Abort")
            .field("status", &self.status())
            .field("inner", &self.inner)
            .field("code", &self.code)
            .finish()
    }
}

impl fmt::Display for Abort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.reason())
    }
}

impl std::error::Error for Abort {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.inner.source()
    }
}

/// Finds the abort carried somewhere in the error chain, if any.
pub(crate) fn find_abort(error: &anyhow::Error) -> Option<&Abort> {
    error.chain().find_map(|e| e.downcast_ref::<Abort>())
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
/// The JSON body written for an error response.
pub struct ErrorResponse {
    /// The reason for the error.
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// The application-specific code, if any.
    pub code: Option<i64>,
}

impl ErrorResponse {
    pub(crate) const UNKNOWN: &'static str = "Unknown internal error.";
}

#[cfg(test)]
mod test {
    use super::*;

    #[derive(thiserror::Error, Debug)]
    #[error("teapot")]
    struct Teapot;

    impl AbortError for Teapot {
        fn status(&self) -> StatusCode {
            StatusCode::IM_A_TEAPOT
        }

        fn code(&self) -> Option<i64> {
            Some(418)
        }
    }

    #[test]
    fn test_find_through_context() {
        let error = anyhow::Error::new(Abort::from(Teapot)).context("while brewing");
        let abort = find_abort(&error).unwrap();
        assert_eq!(abort.status(), StatusCode::IM_A_TEAPOT);
        assert_eq!(abort.code(), Some(418));
        assert_eq!(abort.reason(), "teapot");
    }

    #[test]
    fn test_plain_errors_are_not_aborts() {
        let error = anyhow::anyhow!("plain");
        assert!(find_abort(&error).is_none());
    }

    #[test]
    fn test_library_statuses() {
        assert_eq!(
            Abort::from(WaypointError::UnhandledRoute).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            Abort::from(WaypointError::AlreadySent).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            Abort::from(WaypointError::AssetNotFound).reason(),
            "Static asset not found."
        );
    }

    #[test]
    fn test_response_shape() {
        let body = serde_json::to_string(&Abort::new(StatusCode::NOT_FOUND, "gone").to_response())
            .unwrap();
        assert_eq!(body, r#"{"error":"gone"}"#);
        let body = serde_json::to_string(&Abort::from(Teapot).to_response()).unwrap();
        assert_eq!(body, r#"{"error":"teapot","code":418}"#);
    }
}
