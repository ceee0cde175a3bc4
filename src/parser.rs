//! Backtracking string parser combinators.
//!
//! A [`Parser`] consumes input from a cursor (a `&mut &str` that is advanced
//! past whatever it matched).  Every parser is atomic: if it fails, the cursor
//! is left exactly where it was before the attempt, which is what makes
//! [`one_of`] and [`zero_or_more`] safe to compose.
//!
//! These are only used to tokenize the brace-style `{name:type}` route syntax;
//! see [`crate::PathExpression::parse`].
//!
//! # Examples
//! ```rust
//! use waypoint::parser::{literal, prefix_while, zip};
//!
//! let key = zip(prefix_while(|c| c != '='), literal("="))
//!     .map(|(key, _)| key);
//! let (key, rest) = key.parse("name=value");
//! assert_eq!(key.as_deref(), Some("name"));
//! assert_eq!(rest, "value");
//! ```

use std::fmt;
use std::sync::Arc;

type RunFn<A> = dyn Fn(&mut &str) -> Option<A> + Send + Sync;

/// A parser producing values of type `A`.
pub struct Parser<A> {
    run: Arc<RunFn<A>>,
}

impl<A> Clone for Parser<A> {
    fn clone(&self) -> Self {
        Parser {
            run: self.run.clone(),
        }
    }
}

impl<A> fmt::Debug for Parser<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Parser")
            .field("output", &std::any::type_name::<A>())
            .finish_non_exhaustive()
    }
}

impl<A: 'static> Parser<A> {
    /// Creates a parser from the given function.  The function does not need
    /// to restore the cursor when it fails; [`Parser::run`] does that.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&mut &str) -> Option<A> + Send + Sync + 'static,
    {
        Parser { run: Arc::new(f) }
    }

    /// Runs the parser against the cursor, advancing it on success.  On
    /// failure, the cursor is untouched.
    pub fn run(&self, input: &mut &str) -> Option<A> {
        let original = *input;
        let result = (self.run)(input);
        if result.is_none() {
            *input = original;
        }
        result
    }

    /// Runs the parser against the whole string, returning the match (if
    /// any) and whatever input remains.
    pub fn parse<'s>(&self, input: &'s str) -> (Option<A>, &'s str) {
        let mut cursor = input;
        let result = self.run(&mut cursor);
        (result, cursor)
    }

    /// Transforms the output of this parser.
    pub fn map<B, F>(self, f: F) -> Parser<B>
    where
        B: 'static,
        F: Fn(A) -> B + Send + Sync + 'static,
    {
        Parser::new(move |input| self.run(input).map(&f))
    }

    /// Sequences a parser that depends on the output of this one.  If the
    /// second parser fails, the input consumed by the first is given back.
    pub fn flat_map<B, F>(self, f: F) -> Parser<B>
    where
        B: 'static,
        F: Fn(A) -> Parser<B> + Send + Sync + 'static,
    {
        Parser::new(move |input| {
            let first = self.run(input)?;
            f(first).run(input)
        })
    }
}

/// A parser that always succeeds with a clone of the value, consuming nothing.
pub fn always<A>(value: A) -> Parser<A>
where
    A: Clone + Send + Sync + 'static,
{
    Parser::new(move |_| Some(value.clone()))
}

/// A parser that never succeeds.
pub fn never<A: 'static>() -> Parser<A> {
    Parser::new(|_| None)
}

/// Matches both parsers in order, or neither.
pub fn zip<A: 'static, B: 'static>(a: Parser<A>, b: Parser<B>) -> Parser<(A, B)> {
    Parser::new(move |input| {
        let first = a.run(input)?;
        let second = b.run(input)?;
        Some((first, second))
    })
}

/// Tries each parser in the declared order, yielding the first success.
pub fn one_of<A: 'static>(parsers: Vec<Parser<A>>) -> Parser<A> {
    Parser::new(move |input| parsers.iter().find_map(|p| p.run(input)))
}

/// Matches the parser, or succeeds with `None` without consuming anything.
pub fn optional<A: 'static>(parser: Parser<A>) -> Parser<Option<A>> {
    Parser::new(move |input| Some(parser.run(input)))
}

/// Collects matches of `parser` separated by `separator`.  This never fails;
/// it stops at the first failure and leaves the cursor just after the last
/// complete match (a trailing separator is not consumed).
pub fn zero_or_more<A: 'static>(parser: Parser<A>, separator: Parser<()>) -> Parser<Vec<A>> {
    Parser::new(move |input| {
        let mut matches = vec![];
        let mut rest = *input;
        while let Some(found) = parser.run(input) {
            rest = *input;
            matches.push(found);
            if separator.run(input).is_none() {
                return Some(matches);
            }
        }
        *input = rest;
        Some(matches)
    })
}

/// Consumes the longest prefix whose characters satisfy the predicate.  This
/// always succeeds, possibly with an empty string.
pub fn prefix_while<P>(predicate: P) -> Parser<String>
where
    P: Fn(char) -> bool + Send + Sync + 'static,
{
    Parser::new(move |input| {
        let source: &str = *input;
        let end = source
            .char_indices()
            .find(|(_, c)| !predicate(*c))
            .map_or(source.len(), |(i, _)| i);
        let (matched, rest) = source.split_at(end);
        *input = rest;
        Some(matched.to_owned())
    })
}

/// Matches the exact text.
pub fn literal(text: impl Into<String>) -> Parser<()> {
    let text = text.into();
    Parser::new(move |input| {
        let source: &str = *input;
        let rest = source.strip_prefix(text.as_str())?;
        *input = rest;
        Some(())
    })
}

#[cfg(test)]
mod test {
    use super::*;

    fn digits() -> Parser<u32> {
        Parser::new(|input| {
            let (found, rest) = prefix_while(|c| c.is_ascii_digit()).parse(*input);
            let value = found?.parse().ok()?;
            *input = rest;
            Some(value)
        })
    }

    #[test]
    fn test_failure_leaves_cursor() {
        let parser = zip(literal("ab"), literal("cd"));
        let (result, rest) = parser.parse("abce");
        assert!(result.is_none());
        assert_eq!(rest, "abce");
    }

    #[test]
    fn test_flat_map_rollback() {
        let parser = digits().flat_map(|n| if n > 5 { literal("!") } else { never() });
        assert_eq!(parser.parse("9!").0, Some(()));
        let (result, rest) = parser.parse("3!");
        assert!(result.is_none());
        assert_eq!(rest, "3!");
        let (result, rest) = parser.parse("9?");
        assert!(result.is_none());
        assert_eq!(rest, "9?");
    }

    #[test]
    fn test_one_of_order() {
        let parser = one_of(vec![
            literal("a").map(|_| 1),
            literal("ab").map(|_| 2),
        ]);
        let (result, rest) = parser.parse("abc");
        assert_eq!(result, Some(1));
        assert_eq!(rest, "bc");
    }

    #[test]
    fn test_zero_or_more() {
        let parser = zero_or_more(digits(), literal(","));
        let (result, rest) = parser.parse("1,22,333,x");
        assert_eq!(result, Some(vec![1, 22, 333]));
        assert_eq!(rest, ",x");

        let (result, rest) = parser.parse("x");
        assert_eq!(result, Some(vec![]));
        assert_eq!(rest, "x");
    }

    #[test]
    fn test_prefix_while() {
        let (result, rest) = prefix_while(|c| c != '}').parse("name}tail");
        assert_eq!(result.as_deref(), Some("name"));
        assert_eq!(rest, "}tail");
        let (result, rest) = prefix_while(|c| c.is_alphabetic()).parse("héllo1");
        assert_eq!(result.as_deref(), Some("héllo"));
        assert_eq!(rest, "1");
    }

    #[test]
    fn test_optional() {
        let parser = zip(optional(literal("-")), digits());
        assert_eq!(parser.parse("-4").0, Some((Some(()), 4)));
        assert_eq!(parser.parse("4").0, Some((None, 4)));
    }
}
