//! Matching request URIs against route templates, and custom matchers.

use super::expression::PathExpression;
use super::segment::{Segment, WildcardScope};
use crate::parameters::Parameters;
use std::borrow::Cow;
use std::fmt;

#[derive(Debug, Clone)]
/// The verdict of a [`UriMatcher`].
pub enum UriMatch {
    /// The URI does not belong to the route.
    NotMatching,
    /// The URI belongs to the route.
    Matching {
        /// The values captured from the path.
        path: Parameters,
        /// The values captured from the query, if the route declared a query
        /// part.
        query: Option<Parameters>,
    },
}

impl UriMatch {
    /// Whether the URI matched.
    pub fn is_matching(&self) -> bool {
        matches!(self, UriMatch::Matching { .. })
    }

    /// The values captured from the path, if the URI matched.
    pub fn path_parameters(&self) -> Option<&Parameters> {
        match self {
            UriMatch::Matching { path, .. } => Some(path),
            UriMatch::NotMatching => None,
        }
    }

    /// The values captured from the query, if the URI matched and the route
    /// declared a query part.
    pub fn query_parameters(&self) -> Option<&Parameters> {
        match self {
            UriMatch::Matching { query, .. } => query.as_ref(),
            UriMatch::NotMatching => None,
        }
    }

    /// Merges the path and query captures.  Path values win over query
    /// values with the same name.
    pub fn into_parameters(self) -> Option<Parameters> {
        match self {
            UriMatch::Matching { path, query } => Some(path.merge(query.unwrap_or_default())),
            UriMatch::NotMatching => None,
        }
    }
}

/// Decides whether a request URI belongs to a route, capturing parameters
/// if it does.
///
/// This is implemented by [`PathExpression`]; custom matchers can be written
/// by implementing this trait, or with [`from_fn`].
pub trait UriMatcher: Send + Sync + 'static {
    /// Matches the URI (the path, and optionally a `?` and the query).
    fn match_uri(&self, uri: &str) -> UriMatch;
}

/// Converts into a [`UriMatcher`].  This is what the routing methods of
/// [`crate::Router`] accept.
///
/// Strings are compiled as templates (see [`PathExpression`]).
///
/// # Panics
/// Converting a string that is not a valid template panics; routes are
/// registered before serving, so this is a configuration bug.
pub trait IntoMatcher {
    /// The resulting matcher.
    type Matcher: UriMatcher;

    /// Performs the conversion.
    fn into_matcher(self) -> Self::Matcher;
}

impl<M: UriMatcher> IntoMatcher for M {
    type Matcher = M;

    fn into_matcher(self) -> M {
        self
    }
}

impl IntoMatcher for &str {
    type Matcher = PathExpression;

    fn into_matcher(self) -> PathExpression {
        match PathExpression::parse(self) {
            Ok(expression) => expression,
            Err(e) => panic!("invalid route template {:?}: {}", self, e),
        }
    }
}

impl IntoMatcher for String {
    type Matcher = PathExpression;

    fn into_matcher(self) -> PathExpression {
        self.as_str().into_matcher()
    }
}

/// A matcher built from a closure.  See [`from_fn`].
pub struct FnMatcher<F>(F);

impl<F> fmt::Debug for FnMatcher<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("FnMatcher")
            .field(&std::any::type_name::<F>())
            .finish()
    }
}

impl<F> UriMatcher for FnMatcher<F>
where
    F: Fn(&str) -> UriMatch + Send + Sync + 'static,
{
    fn match_uri(&self, uri: &str) -> UriMatch {
        (self.0)(uri)
    }
}

/// Creates a matcher from a closure.
///
/// # Examples
/// ```rust
/// # use waypoint::{matcher, Parameters, UriMatch, UriMatcher};
/// let health = matcher::from_fn(|uri| {
///     if uri.starts_with("/health") {
///         UriMatch::Matching { path: Parameters::new(), query: None }
///     } else {
///         UriMatch::NotMatching
///     }
/// });
/// assert!(health.match_uri("/healthz").is_matching());
/// assert!(!health.match_uri("/").is_matching());
/// ```
pub fn from_fn<F>(f: F) -> FnMatcher<F>
where
    F: Fn(&str) -> UriMatch + Send + Sync + 'static,
{
    FnMatcher(f)
}

/// Splits a URI into its path and query string.  The fragment, if any, is
/// dropped.
pub(crate) fn split_uri(uri: &str) -> (&str, Option<&str>) {
    let uri = uri.split('#').next().unwrap_or_default();
    match uri.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (uri, None),
    }
}

/// The non-empty segments of a path, percent-decoded.
pub(crate) fn path_segments(path: &str) -> Vec<Cow<'_, str>> {
    path.split('/')
        .filter(|s| !s.is_empty())
        .map(|s| urlencoding::decode(s).unwrap_or(Cow::Borrowed(s)))
        .collect()
}

/// Parses a query string.  Items are grouped by key, in the order each key
/// first appears; repeated keys have their values joined with commas.
pub(crate) fn query_items(query: &str) -> Vec<(String, String)> {
    let pairs = match serde_urlencoded::from_str::<Vec<(String, String)>>(query) {
        Ok(pairs) => pairs,
        Err(e) => {
            log::debug!("could not decode query string {:?}: {}", query, e);
            return vec![];
        }
    };

    let mut grouped: Vec<(String, String)> = Vec::with_capacity(pairs.len());
    for (key, value) in pairs {
        match grouped.iter_mut().find(|(k, _)| *k == key) {
            Some((_, existing)) => {
                existing.push(',');
                existing.push_str(&value);
            }
            None => grouped.push((key, value)),
        }
    }
    grouped
}

impl PathExpression {
    fn match_path(&self, actual: &[Cow<'_, str>]) -> Option<Parameters> {
        let mut parameters = Parameters::new();

        for (index, (declared, actual_segment)) in
            self.path_segments().iter().zip(actual).enumerate()
        {
            match declared {
                Segment::Literal(value) => {
                    if value != actual_segment {
                        return None;
                    }
                }
                Segment::Parameter(name, ty) if ty.is_string() => {
                    parameters.insert(name.clone(), actual_segment.to_string());
                }
                Segment::Parameter(name, ty) => {
                    let value = ty.decode(actual_segment)?;
                    parameters.insert_value(name.clone(), value);
                }
                Segment::Wildcard(WildcardScope::One) => {
                    parameters.push_wildcard(actual_segment.to_string());
                }
                Segment::Wildcard(WildcardScope::All) => {
                    for rest in &actual[index..] {
                        parameters.push_wildcard(rest.to_string());
                    }
                    return Some(parameters);
                }
                Segment::QuerySeparator => return None,
            }
        }

        if self.path_segments().len() == actual.len() {
            Some(parameters)
        } else {
            None
        }
    }

    fn match_query(&self, query: Option<&str>) -> Option<Parameters> {
        let items = query.map(query_items).unwrap_or_default();
        let lookup = |key: &str| {
            items
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.as_str())
        };
        let mut parameters = Parameters::new();

        for declared in self.query_segments() {
            match declared {
                Segment::Literal(key) => {
                    lookup(key)?;
                    parameters.push_wildcard(key.clone());
                }
                Segment::Parameter(name, ty) if ty.is_string() => {
                    parameters.insert(name.clone(), lookup(name)?.to_owned());
                }
                Segment::Parameter(name, ty) => {
                    let value = ty.decode(lookup(name)?)?;
                    parameters.insert_value(name.clone(), value);
                }
                Segment::Wildcard(_) | Segment::QuerySeparator => return None,
            }
        }

        Some(parameters)
    }
}

impl UriMatcher for PathExpression {
    fn match_uri(&self, uri: &str) -> UriMatch {
        let (path, query) = split_uri(uri);
        let actual = path_segments(path);

        let path = match self.match_path(&actual) {
            Some(path) => path,
            None => return UriMatch::NotMatching,
        };

        if self.query_segments().is_empty() {
            return UriMatch::Matching { path, query: None };
        }

        match self.match_query(query) {
            Some(query) => UriMatch::Matching {
                path,
                query: Some(query),
            },
            None => UriMatch::NotMatching,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn matching(template: &str, uri: &str) -> Option<Parameters> {
        template.into_matcher().match_uri(uri).into_parameters()
    }

    #[test]
    fn test_literal() {
        assert!(matching("/hello/world", "/hello/world").is_some());
        assert!(matching("/hello/world", "hello/world/").is_some());
        assert!(matching("/hello/world", "/hello/there").is_none());
        assert!(matching("/hello/world", "/hello").is_none());
        assert!(matching("/hello/world", "/hello/world/again").is_none());
        assert!(matching("/", "/").is_some());
        assert!(matching("/", "/a").is_none());
    }

    #[test]
    fn test_type_mismatch_rejects() {
        assert!(matching("/foo/:x:int", "/foo/bar").is_none());
        let parameters = matching("/foo/:x:int", "/foo/-12").unwrap();
        assert_eq!(parameters.get_as::<i64>("x"), Some(-12));
        assert!(matching("/flag/:on:bool", "/flag/yes").is_none());
    }

    #[test]
    fn test_string_parameter_is_decoded() {
        let parameters = matching("/greet/:name", "/greet/hello%20there").unwrap();
        assert_eq!(parameters.string("name").as_deref(), Some("hello there"));
    }

    #[test]
    fn test_one_wildcards() {
        let parameters = matching("/hello/*/bar/*/baz", "/hello/foo/bar/qux/baz").unwrap();
        assert_eq!(parameters.wildcards(), &["foo", "qux"]);
        assert!(matching("/hello/*/bar/*/baz", "/hello/foo/bar/qux").is_none());
    }

    #[test]
    fn test_catch_all() {
        let parameters = matching("hello/*/**", "/hello/a/b/c/d").unwrap();
        assert_eq!(parameters.wildcards(), &["a", "b", "c", "d"]);

        let parameters = matching("hello/:param/**", "/hello/foo/bar/baz/qux").unwrap();
        assert_eq!(parameters.string("param").as_deref(), Some("foo"));
        assert_eq!(parameters.wildcards(), &["bar", "baz", "qux"]);

        // `**` needs at least one segment to capture.
        assert!(matching("hello/**", "/hello").is_none());
        assert!(matching("**", "/anything/at/all").is_some());
    }

    #[test]
    fn test_query() {
        let expression = "/search?q&:page:int".into_matcher();
        assert!(!expression.match_uri("/search").is_matching());
        assert!(!expression.match_uri("/search?q=a").is_matching());
        assert!(!expression.match_uri("/search?q=a&page=x").is_matching());

        let result = expression.match_uri("/search?q=a&page=2&q=b");
        let query = result.query_parameters().unwrap();
        assert_eq!(query.int("page"), Some(2));
        assert_eq!(query.wildcards(), &["q"]);
        assert!(result.path_parameters().unwrap().is_empty());
    }

    #[test]
    fn test_path_wins_over_query() {
        let parameters = matching("/x/:id?:id", "/x/path?id=query").unwrap();
        assert_eq!(parameters.string("id").as_deref(), Some("path"));
    }

    #[test]
    fn test_query_items() {
        assert_eq!(
            query_items("a=1&b=2&a=3&c=%20x+y"),
            vec![
                ("a".to_owned(), "1,3".to_owned()),
                ("b".to_owned(), "2".to_owned()),
                ("c".to_owned(), " x y".to_owned()),
            ]
        );
        assert!(query_items("").is_empty());
    }

    #[test]
    fn test_deterministic() {
        let first = PathExpression::parse("/users/:id:int").unwrap();
        let second = PathExpression::parse("/users/:id:int").unwrap();
        for uri in ["/users/1", "/users/x", "/users", "/users/1/2"] {
            assert_eq!(
                first.match_uri(uri).is_matching(),
                second.match_uri(uri).is_matching()
            );
        }
    }
}
