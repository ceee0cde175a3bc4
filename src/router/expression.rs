use super::segment::{ParameterType, Segment, WildcardScope};
use crate::error::TemplateError;
use crate::parameters::ParameterValue;
use crate::parser::{self, Parser};
use std::fmt;

lazy_static::lazy_static! {
    static ref PARAMETER: regex::Regex =
        regex::Regex::new("^:(?P<name>[A-Za-z_][A-Za-z0-9_]*)(?::(?P<type>[A-Za-z0-9]+))?$").unwrap();
    static ref IDENTIFIER: regex::Regex = regex::Regex::new("^[A-Za-z_][A-Za-z0-9_]*$").unwrap();
    static ref BRACE_TOKEN: Parser<(String, Option<String>)> = brace_token();
}

// `{name}` or `{name:type}`, from the older route syntax.
fn brace_token() -> Parser<(String, Option<String>)> {
    let name = parser::prefix_while(|c| c != ':' && c != '}');
    let ty = parser::zip(parser::literal(":"), parser::prefix_while(|c| c != '}'))
        .map(|(_, ty)| ty);
    let body = parser::zip(name, parser::optional(ty));
    parser::zip(
        parser::zip(parser::literal("{"), body),
        parser::literal("}"),
    )
    .map(|((_, token), _)| token)
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// A compiled route template.
///
/// Templates are made of `/`-separated path chunks, optionally followed by a
/// `?` and `&`-separated query chunks.  Each chunk is one of:
///
/// - `:name`, a parameter captured as a string;
/// - `:name:type`, a parameter that must decode as `type` (`int`, `uint`,
///   `float`, `double`, `bool`, `str`, ...) for the route to match;
/// - `{name}` or `{name:type}`, the same, in the older brace syntax;
/// - `*`, which captures exactly one segment into the wildcards;
/// - `**`, which captures every remaining segment into the wildcards;
/// - anything else, which must match exactly.
///
/// In the query part, a literal chunk requires the key to be present, and
/// a parameter chunk requires the key to be present and to decode.
///
/// # Examples
/// ```rust
/// # use waypoint::{PathExpression, Segment, WildcardScope};
/// let expression = PathExpression::parse("/users/:id:int/*?page").unwrap();
/// assert_eq!(
///     expression.path_segments(),
///     &[
///         Segment::literal("users"),
///         Segment::typed::<i64>("id"),
///         Segment::Wildcard(WildcardScope::One),
///     ]
/// );
/// assert_eq!(expression.query_segments(), &[Segment::literal("page")]);
/// assert_eq!(PathExpression::parse("/users/{id:int}/*?page").unwrap(), expression);
/// ```
pub struct PathExpression {
    path: Vec<Segment>,
    query: Vec<Segment>,
}

impl PathExpression {
    /// Compiles the given route template.
    ///
    /// # Errors
    /// Returns an error if the template has more than one `?`, has a malformed
    /// or unknown parameter, puts anything after a `**`, or puts a wildcard
    /// in the query part.
    pub fn parse(template: &str) -> Result<Self, TemplateError> {
        let mut parts = template.split('?');
        let path = parts.next().unwrap_or_default();
        let query = parts.next();
        if parts.next().is_some() {
            return Err(TemplateError::MultipleQuerySeparators(template.to_owned()));
        }

        let mut segments = path
            .split('/')
            .filter(|chunk| !chunk.is_empty())
            .map(compile_chunk)
            .collect::<Result<Vec<_>, _>>()?;

        if let Some(query) = query {
            segments.push(Segment::QuerySeparator);
            for chunk in query.split('&').filter(|chunk| !chunk.is_empty()) {
                segments.push(compile_chunk(chunk)?);
            }
        }

        PathExpression::from_segments(segments)
    }

    /// Builds an expression from an ordered list of segments.  Everything
    /// after a [`Segment::QuerySeparator`] belongs to the query part.
    ///
    /// # Errors
    /// The same validation as [`PathExpression::parse`] applies.
    pub fn from_segments<I>(segments: I) -> Result<Self, TemplateError>
    where
        I: IntoIterator<Item = Segment>,
    {
        let mut path = vec![];
        let mut query: Option<Vec<Segment>> = None;
        let mut catch_all = false;

        for segment in segments {
            match segment {
                Segment::Literal(ref value) if value.is_empty() => continue,
                Segment::Parameter(ref name, _) if name.is_empty() => {
                    return Err(TemplateError::EmptyName)
                }
                Segment::QuerySeparator => {
                    if query.is_some() {
                        return Err(TemplateError::MultipleQuerySeparators(render(
                            &path,
                            query.as_deref(),
                        )));
                    }
                    query = Some(vec![]);
                }
                Segment::Wildcard(_) if query.is_some() => {
                    return Err(TemplateError::WildcardInQuery(segment.to_string()))
                }
                _ => {
                    if let Some(query) = query.as_mut() {
                        query.push(segment);
                    } else if catch_all {
                        return Err(TemplateError::UnreachableSegment(segment.to_string()));
                    } else {
                        catch_all = segment == Segment::Wildcard(WildcardScope::All);
                        path.push(segment);
                    }
                }
            }
        }

        Ok(PathExpression {
            path,
            query: query.unwrap_or_default(),
        })
    }

    /// Starts building an expression segment by segment.
    pub fn builder() -> PathExpressionBuilder {
        PathExpressionBuilder::default()
    }

    /// The segments of the path part, in order.
    pub fn path_segments(&self) -> &[Segment] {
        &self.path
    }

    /// The segments of the query part, in order.  This is empty if the
    /// template had no query part.
    pub fn query_segments(&self) -> &[Segment] {
        &self.query
    }
}

fn compile_chunk(chunk: &str) -> Result<Segment, TemplateError> {
    match chunk {
        "*" => Ok(Segment::Wildcard(WildcardScope::One)),
        "**" => Ok(Segment::Wildcard(WildcardScope::All)),
        c if c.starts_with(':') => {
            let captures = PARAMETER
                .captures(c)
                .ok_or_else(|| TemplateError::InvalidParameter(c.to_owned()))?;
            let name = &captures["name"];
            let ty = captures.name("type").map(|m| m.as_str());
            parameter(name, ty)
        }
        c if c.starts_with('{') => match BRACE_TOKEN.parse(c) {
            (Some((name, ty)), "") if name.is_empty() || IDENTIFIER.is_match(&name) => {
                parameter(&name, ty.as_deref())
            }
            _ => Err(TemplateError::InvalidParameter(c.to_owned())),
        },
        c => Ok(Segment::literal(c)),
    }
}

fn parameter(name: &str, ty: Option<&str>) -> Result<Segment, TemplateError> {
    if name.is_empty() {
        return Err(TemplateError::EmptyName);
    }
    let ty = match ty {
        Some(ty) => ParameterType::named(ty).ok_or_else(|| TemplateError::UnknownType(ty.to_owned()))?,
        None => ParameterType::string(),
    };
    Ok(Segment::Parameter(name.to_owned(), ty))
}

fn render(path: &[Segment], query: Option<&[Segment]>) -> String {
    let mut buffer = String::new();
    for segment in path {
        buffer.push('/');
        buffer.push_str(&segment.to_string());
    }
    if path.is_empty() {
        buffer.push('/');
    }
    if let Some(query) = query.filter(|q| !q.is_empty()) {
        buffer.push('?');
        let query = query.iter().map(ToString::to_string).collect::<Vec<_>>();
        buffer.push_str(&query.join("&"));
    }
    buffer
}

impl fmt::Display for PathExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&render(&self.path, Some(&self.query)))
    }
}

impl std::str::FromStr for PathExpression {
    type Err = TemplateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PathExpression::parse(s)
    }
}

#[derive(Debug, Clone, Default)]
/// Builds a [`PathExpression`] from explicit segment tokens, rather than
/// from a template string.
///
/// # Examples
/// ```rust
/// # use waypoint::PathExpression;
/// let built = PathExpression::builder()
///     .literal("/users/")
///     .typed::<i64>("id")
///     .catch_all()
///     .query()
///     .literal("page")
///     .build()
///     .unwrap();
/// assert_eq!(built, PathExpression::parse("/users/:id:int/**?page").unwrap());
/// assert_eq!(built.to_string(), "/users/:id:int/**?page");
/// ```
pub struct PathExpressionBuilder {
    segments: Vec<Segment>,
}

impl PathExpressionBuilder {
    #[must_use]
    /// Appends literal text.  Slashes (or ampersands, after [`Self::query`])
    /// split the text into several literal segments.
    pub fn literal(mut self, text: &str) -> Self {
        let separator = if self.in_query() { '&' } else { '/' };
        self.segments.extend(
            text.split(separator)
                .filter(|chunk| !chunk.is_empty())
                .map(Segment::literal),
        );
        self
    }

    #[must_use]
    /// Appends a string parameter.
    pub fn parameter(self, name: &str) -> Self {
        self.segment(Segment::parameter(name))
    }

    #[must_use]
    /// Appends a parameter that must decode as `T`.
    pub fn typed<T: ParameterValue>(self, name: &str) -> Self {
        self.segment(Segment::typed::<T>(name))
    }

    #[must_use]
    /// Appends a `*` wildcard.
    pub fn wildcard(self) -> Self {
        self.segment(Segment::Wildcard(WildcardScope::One))
    }

    #[must_use]
    /// Appends a `**` wildcard.
    pub fn catch_all(self) -> Self {
        self.segment(Segment::Wildcard(WildcardScope::All))
    }

    #[must_use]
    /// Starts the query part.
    pub fn query(self) -> Self {
        self.segment(Segment::QuerySeparator)
    }

    #[must_use]
    /// Appends an arbitrary segment.
    pub fn segment(mut self, segment: Segment) -> Self {
        self.segments.push(segment);
        self
    }

    /// Validates and compiles the segments.
    ///
    /// # Errors
    /// See [`PathExpression::from_segments`].
    pub fn build(self) -> Result<PathExpression, TemplateError> {
        PathExpression::from_segments(self.segments)
    }

    fn in_query(&self) -> bool {
        self.segments.contains(&Segment::QuerySeparator)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_empty_chunks_dropped() {
        let expression = PathExpression::parse("//hello///world/").unwrap();
        assert_eq!(
            expression.path_segments(),
            &[Segment::literal("hello"), Segment::literal("world")]
        );
        assert!(expression.query_segments().is_empty());
        assert!(PathExpression::parse("/").unwrap().path_segments().is_empty());
    }

    #[test]
    fn test_wildcards() {
        let expression = PathExpression::parse("/hello/*/bar/*/baz").unwrap();
        let segments = expression.path_segments();
        assert_eq!(segments.len(), 5);
        assert_eq!(segments[1], Segment::Wildcard(WildcardScope::One));
        assert_eq!(segments[3], Segment::Wildcard(WildcardScope::One));
    }

    #[test]
    fn test_query_segments() {
        let expression = PathExpression::parse("/search?q&:page:int&&").unwrap();
        assert_eq!(expression.path_segments(), &[Segment::literal("search")]);
        assert_eq!(
            expression.query_segments(),
            &[Segment::literal("q"), Segment::typed::<i64>("page")]
        );
    }

    #[test]
    fn test_brace_syntax() {
        assert_eq!(
            PathExpression::parse("/a/{id}/{n:uint}").unwrap().path_segments(),
            &[
                Segment::literal("a"),
                Segment::parameter("id"),
                Segment::typed::<u64>("n")
            ]
        );
        assert_eq!(
            PathExpression::parse("/{}"),
            Err(TemplateError::EmptyName)
        );
        assert_eq!(
            PathExpression::parse("/{id"),
            Err(TemplateError::InvalidParameter("{id".into()))
        );
        assert_eq!(
            PathExpression::parse("/{id}x"),
            Err(TemplateError::InvalidParameter("{id}x".into()))
        );
        assert_eq!(
            PathExpression::parse("/{a b}"),
            Err(TemplateError::InvalidParameter("{a b}".into()))
        );
        assert_eq!(
            PathExpression::parse("/{a{b}"),
            Err(TemplateError::InvalidParameter("{a{b}".into()))
        );
        assert_eq!(
            PathExpression::parse("/{1st}"),
            Err(TemplateError::InvalidParameter("{1st}".into()))
        );
    }

    #[test]
    fn test_built_expression_reparses() {
        let built = PathExpression::builder()
            .literal("/files/")
            .typed::<u32>("version")
            .typed::<bool>("draft")
            .wildcard()
            .query()
            .typed::<f64>("scale")
            .build()
            .unwrap();
        let template = built.to_string();
        assert_eq!(template, "/files/:version:u32/:draft:bool/*?:scale:double");
        assert_eq!(PathExpression::parse(&template).unwrap(), built);
    }

    #[test]
    fn test_validation() {
        assert_eq!(
            PathExpression::parse("/a?b?c"),
            Err(TemplateError::MultipleQuerySeparators("/a?b?c".into()))
        );
        assert_eq!(
            PathExpression::parse("/a/**/b"),
            Err(TemplateError::UnreachableSegment("b".into()))
        );
        assert_eq!(
            PathExpression::parse("/a?*"),
            Err(TemplateError::WildcardInQuery("*".into()))
        );
        assert_eq!(
            PathExpression::parse("/a/:id:uuid"),
            Err(TemplateError::UnknownType("uuid".into()))
        );
        assert_eq!(
            PathExpression::parse("/a/:9"),
            Err(TemplateError::InvalidParameter(":9".into()))
        );
        assert!(PathExpression::parse("/a/**?b").is_ok());
    }

    #[test]
    fn test_builder_matches_template() {
        let built = PathExpression::builder()
            .literal("hello")
            .parameter("param")
            .wildcard()
            .build()
            .unwrap();
        assert_eq!(built, PathExpression::parse("hello/:param/*").unwrap());

        let doubled = PathExpression::builder().query().query().build();
        assert!(matches!(
            doubled,
            Err(TemplateError::MultipleQuerySeparators(_))
        ));
    }

    #[test]
    fn test_display_round_trip() {
        let template = "/users/:id:int/*/**?sort&:page:int";
        let expression = PathExpression::parse(template).unwrap();
        assert_eq!(expression.to_string(), template);
        assert_eq!(PathExpression::parse("/a?").unwrap().to_string(), "/a");
    }
}
