//! Composition grammars: sequence, ordered choice, option, repetition,
//! value conversion, lazy recursion and depth accounting.

use crate::error::{Error, InvariantViolation, Pos, Result, UnexpectedInput};
use crate::grammar::Grammar;
use crate::input::{Cursor, Output};

/// A boxed grammar; the recursion point of a self-referential grammar.
pub type BoxedGrammar<T> = Box<dyn Grammar<Value = T>>;

/// Sequence of two grammars, pairing their values.
pub struct Then<A, B> {
    pub(crate) first: A,
    pub(crate) second: B,
}

impl<A: Grammar, B: Grammar> Grammar for Then<A, B> {
    type Value = (A::Value, B::Value);

    fn parse(&self, cursor: &mut Cursor<'_>) -> Result<Self::Value> {
        let a = self.first.parse(cursor)?;
        let b = self.second.parse(cursor)?;
        Ok((a, b))
    }

    fn print(&self, value: &Self::Value, out: &mut Output) -> Result<()> {
        self.first.print(&value.0, out)?;
        self.second.print(&value.1, out)
    }
}

/// Sequence that drops the unit value of its left grammar.
pub struct IgnoreThen<A, B> {
    pub(crate) first: A,
    pub(crate) second: B,
}

impl<A: Grammar<Value = ()>, B: Grammar> Grammar for IgnoreThen<A, B> {
    type Value = B::Value;

    fn parse(&self, cursor: &mut Cursor<'_>) -> Result<Self::Value> {
        self.first.parse(cursor)?;
        self.second.parse(cursor)
    }

    fn print(&self, value: &Self::Value, out: &mut Output) -> Result<()> {
        self.first.print(&(), out)?;
        self.second.print(value, out)
    }
}

/// Sequence that drops the unit value of its right grammar.
pub struct ThenIgnore<A, B> {
    pub(crate) first: A,
    pub(crate) second: B,
}

impl<A: Grammar, B: Grammar<Value = ()>> Grammar for ThenIgnore<A, B> {
    type Value = A::Value;

    fn parse(&self, cursor: &mut Cursor<'_>) -> Result<Self::Value> {
        let a = self.first.parse(cursor)?;
        self.second.parse(cursor)?;
        Ok(a)
    }

    fn print(&self, value: &Self::Value, out: &mut Output) -> Result<()> {
        self.first.print(value, out)?;
        self.second.print(&(), out)
    }
}

/// Ordered choice over two grammars with the same value type.
///
/// Parsing tries the first alternative on a cloned cursor and commits it on
/// success; otherwise the second runs against the caller's cursor, so a
/// failed choice surfaces the *last* alternative's error. Printing tries
/// alternatives in the same order, truncating the output back to a
/// checkpoint when an alternative rejects the value's shape.
pub struct OrElse<A, B> {
    pub(crate) first: A,
    pub(crate) second: B,
}

impl<A: Grammar, B: Grammar<Value = A::Value>> Grammar for OrElse<A, B> {
    type Value = A::Value;

    fn parse(&self, cursor: &mut Cursor<'_>) -> Result<Self::Value> {
        let mut attempt = cursor.clone();
        match self.first.parse(&mut attempt) {
            Ok(value) => {
                *cursor = attempt;
                Ok(value)
            }
            Err(_) => self.second.parse(cursor),
        }
    }

    fn print(&self, value: &Self::Value, out: &mut Output) -> Result<()> {
        let mark = out.checkpoint();
        match self.first.print(value, out) {
            Ok(()) => Ok(()),
            Err(_) => {
                out.truncate(mark);
                self.second.print(value, out)
            }
        }
    }
}

/// Zero-or-one occurrence.
pub struct Opt<P> {
    pub(crate) inner: P,
}

pub fn opt<P: Grammar>(inner: P) -> Opt<P> {
    Opt { inner }
}

impl<P: Grammar> Grammar for Opt<P> {
    type Value = Option<P::Value>;

    fn parse(&self, cursor: &mut Cursor<'_>) -> Result<Self::Value> {
        let mut attempt = cursor.clone();
        match self.inner.parse(&mut attempt) {
            Ok(value) => {
                *cursor = attempt;
                Ok(Some(value))
            }
            Err(_) => Ok(None),
        }
    }

    fn print(&self, value: &Self::Value, out: &mut Output) -> Result<()> {
        match value {
            Some(inner) => self.inner.print(inner, out),
            None => Ok(()),
        }
    }
}

/// Repetition without a separator.
///
/// Parsing repeats the item until an attempt fails, with a no-progress
/// guard against items that can succeed on empty input. Printing rejects
/// values with fewer than `min` items.
pub struct Repeat<P> {
    pub(crate) item: P,
    pub(crate) min: usize,
}

pub fn repeat<P: Grammar>(item: P, min: usize) -> Repeat<P> {
    Repeat { item, min }
}

impl<P: Grammar> Grammar for Repeat<P> {
    type Value = Vec<P::Value>;

    fn parse(&self, cursor: &mut Cursor<'_>) -> Result<Self::Value> {
        let mut items = Vec::new();
        let mut last_error = None;
        loop {
            let mut attempt = cursor.clone();
            match self.item.parse(&mut attempt) {
                Ok(value) => {
                    if attempt.pos() == cursor.pos() {
                        break;
                    }
                    *cursor = attempt;
                    items.push(value);
                }
                Err(err) => {
                    last_error = Some(err);
                    break;
                }
            }
        }
        if items.len() < self.min {
            return Err(last_error.unwrap_or_else(|| {
                Error::unexpected(
                    UnexpectedInput::ExpectedRun { expected: "items" },
                    cursor.position(),
                )
            }));
        }
        Ok(items)
    }

    fn print(&self, value: &Self::Value, out: &mut Output) -> Result<()> {
        if value.len() < self.min {
            return Err(Error::invariant(InvariantViolation::TooFewItems {
                min: self.min,
            }));
        }
        for item in value {
            self.item.print(item, out)?;
        }
        Ok(())
    }
}

/// Repetition with a unit-valued separator between items.
pub struct SepBy<P, S> {
    pub(crate) item: P,
    pub(crate) separator: S,
    pub(crate) min: usize,
}

pub fn sep_by<P: Grammar, S: Grammar<Value = ()>>(item: P, separator: S, min: usize) -> SepBy<P, S> {
    SepBy { item, separator, min }
}

impl<P: Grammar, S: Grammar<Value = ()>> Grammar for SepBy<P, S> {
    type Value = Vec<P::Value>;

    fn parse(&self, cursor: &mut Cursor<'_>) -> Result<Self::Value> {
        let mut items = Vec::new();
        let mut last_error = None;
        loop {
            let mut attempt = cursor.clone();
            let parsed = if items.is_empty() {
                self.item.parse(&mut attempt)
            } else {
                self.separator
                    .parse(&mut attempt)
                    .and_then(|()| self.item.parse(&mut attempt))
            };
            match parsed {
                Ok(value) => {
                    if attempt.pos() == cursor.pos() {
                        break;
                    }
                    *cursor = attempt;
                    items.push(value);
                }
                Err(err) => {
                    last_error = Some(err);
                    break;
                }
            }
        }
        if items.len() < self.min {
            return Err(last_error.unwrap_or_else(|| {
                Error::unexpected(
                    UnexpectedInput::ExpectedRun { expected: "items" },
                    cursor.position(),
                )
            }));
        }
        Ok(items)
    }

    fn print(&self, value: &Self::Value, out: &mut Output) -> Result<()> {
        if value.len() < self.min {
            return Err(Error::invariant(InvariantViolation::TooFewItems {
                min: self.min,
            }));
        }
        for (index, item) in value.iter().enumerate() {
            if index > 0 {
                self.separator.print(&(), out)?;
            }
            self.item.print(item, out)?;
        }
        Ok(())
    }
}

/// Bidirectional value conversion around a grammar.
///
/// Conversions are plain function pointers; every conversion in the markup
/// grammar is capture-free. An `apply` failure is a parse rejection and
/// gets stamped with the cursor position; an `unapply` failure is a
/// print-side invariant violation.
pub struct Map<P: Grammar, T> {
    pub(crate) inner: P,
    pub(crate) apply: fn(P::Value) -> Result<T>,
    pub(crate) unapply: fn(&T) -> Result<P::Value>,
}

impl<P: Grammar, T> Grammar for Map<P, T> {
    type Value = T;

    fn parse(&self, cursor: &mut Cursor<'_>) -> Result<T> {
        let inner = self.inner.parse(cursor)?;
        (self.apply)(inner).map_err(|err| err.or_at(cursor.position()))
    }

    fn print(&self, value: &T, out: &mut Output) -> Result<()> {
        let inner = (self.unapply)(value)?;
        self.inner.print(&inner, out)
    }
}

/// Lazily built grammar; the recursion point.
///
/// The builder runs on every call rather than memoizing a single grammar:
/// element content contains elements, so each recursion level must be able
/// to construct the next one.
pub struct Lazy<T> {
    build: Box<dyn Fn() -> BoxedGrammar<T>>,
}

pub fn lazy<T>(build: impl Fn() -> BoxedGrammar<T> + 'static) -> Lazy<T> {
    Lazy {
        build: Box::new(build),
    }
}

impl<T> Grammar for Lazy<T> {
    type Value = T;

    fn parse(&self, cursor: &mut Cursor<'_>) -> Result<T> {
        (self.build)().parse(cursor)
    }

    fn print(&self, value: &T, out: &mut Output) -> Result<()> {
        (self.build)().print(value, out)
    }
}

/// Depth accounting around a recursive production. Parse-only: printing an
/// already-built tree is not depth-limited.
pub struct Depth<P> {
    pub(crate) inner: P,
    pub(crate) max: u16,
}

pub fn depth<P: Grammar>(inner: P, max: u16) -> Depth<P> {
    Depth { inner, max }
}

impl<P: Grammar> Grammar for Depth<P> {
    type Value = P::Value;

    fn parse(&self, cursor: &mut Cursor<'_>) -> Result<Self::Value> {
        cursor.enter_depth(self.max)?;
        let result = self.inner.parse(cursor);
        cursor.exit_depth();
        result
    }

    fn print(&self, value: &Self::Value, out: &mut Output) -> Result<()> {
        self.inner.print(value, out)
    }
}

/// Helper used by conversions that reject a parsed shape: the position is
/// unknown inside a conversion, [`Map`] stamps it afterwards.
pub fn reject(kind: UnexpectedInput) -> Error {
    Error::unexpected(kind, Pos::default())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::grammar::primitive::{Literal, PrefixWhile, Whitespace};
    use crate::grammar::GrammarExt;

    fn letters() -> PrefixWhile {
        PrefixWhile {
            pred: |b| b.is_ascii_alphabetic(),
            min: 1,
            expected: "letters",
        }
    }

    fn digits() -> PrefixWhile {
        PrefixWhile {
            pred: |b| b.is_ascii_digit(),
            min: 1,
            expected: "digits",
        }
    }

    #[test]
    fn test_then_pairs_values() {
        let grammar = letters().then_ignore(Literal("=")).then(digits());
        let mut cursor = Cursor::new(b"abc=42");
        let (name, value) = grammar.parse(&mut cursor).unwrap();
        assert_eq!(name, "abc");
        assert_eq!(value, "42");

        let mut out = Output::new();
        grammar
            .print(&("abc".to_string(), "42".to_string()), &mut out)
            .unwrap();
        assert_eq!(out.as_str(), "abc=42");
    }

    #[test]
    fn test_or_rolls_back_failed_alternative() {
        let grammar = Literal("<!--")
            .ignore_then(letters())
            .or(Literal("<").ignore_then(letters()));
        let mut cursor = Cursor::new(b"<tag");
        assert_eq!(grammar.parse(&mut cursor).unwrap(), "tag");
        assert!(cursor.is_eof());
    }

    #[test]
    fn test_or_surfaces_last_error() {
        let grammar = Literal("a").or(Literal("b"));
        let mut cursor = Cursor::new(b"c");
        let err = grammar.parse(&mut cursor).unwrap_err();
        match err.kind() {
            ErrorKind::UnexpectedInput(UnexpectedInput::ExpectedLiteral { literal }) => {
                assert_eq!(literal, "b");
            }
            other => panic!("unexpected kind: {other:?}"),
        }
    }

    #[test]
    fn test_opt_leaves_cursor_on_failure() {
        let grammar = opt(digits());
        let mut cursor = Cursor::new(b"abc");
        assert_eq!(grammar.parse(&mut cursor).unwrap(), None);
        assert_eq!(cursor.pos(), 0);
    }

    #[test]
    fn test_sep_by_min_one() {
        let grammar = sep_by(letters(), Whitespace::horizontal(1, " "), 1);
        let mut cursor = Cursor::new(b"one two  three");
        let items = grammar.parse(&mut cursor).unwrap();
        assert_eq!(items, vec!["one", "two", "three"]);

        let mut empty = Cursor::new(b"123");
        assert!(grammar.parse(&mut empty).is_err());

        let mut out = Output::new();
        grammar
            .print(&vec!["a".to_string(), "b".to_string()], &mut out)
            .unwrap();
        assert_eq!(out.as_str(), "a b");
    }

    #[test]
    fn test_sep_by_print_below_min_is_invariant_violation() {
        let grammar = sep_by(letters(), Whitespace::horizontal(1, " "), 1);
        let mut out = Output::new();
        let err = grammar.print(&Vec::new(), &mut out).unwrap_err();
        assert!(err.is_invariant_violation());
    }

    #[test]
    fn test_repeat_stops_without_consuming_failure() {
        let grammar = repeat(letters().then_ignore(Literal(";")), 0);
        let mut cursor = Cursor::new(b"a;b;rest");
        let items = grammar.parse(&mut cursor).unwrap();
        assert_eq!(items, vec!["a", "b"]);
        assert!(cursor.starts_with(b"rest"));
    }

    #[test]
    fn test_map_rejection_carries_position() {
        fn only_ab(s: String) -> Result<String> {
            if s == "ab" {
                Ok(s)
            } else {
                Err(reject(UnexpectedInput::ExpectedRun { expected: "ab" }))
            }
        }
        fn identity(s: &String) -> Result<String> {
            Ok(s.clone())
        }
        let grammar = letters().map(only_ab, identity);
        let mut cursor = Cursor::new(b"xyz");
        let err = grammar.parse(&mut cursor).unwrap_err();
        assert!(err.is_unexpected_input());
        assert_eq!(err.span().start.offset, 3);
    }

    #[test]
    fn test_lazy_builds_per_call() {
        // Balanced parens depth: the classic self-referential grammar.
        fn parens() -> BoxedGrammar<usize> {
            fn wrap(n: usize) -> Result<usize> {
                Ok(n + 1)
            }
            fn unwrap_depth(n: &usize) -> Result<usize> {
                n.checked_sub(1).ok_or_else(|| {
                    Error::invariant(InvariantViolation::ShapeMismatch { expected: "nested" })
                })
            }
            fn zero(_: ()) -> Result<usize> {
                Ok(0)
            }
            fn to_unit(n: &usize) -> Result<()> {
                if *n == 0 {
                    Ok(())
                } else {
                    Err(Error::invariant(InvariantViolation::ShapeMismatch {
                        expected: "flat",
                    }))
                }
            }
            Box::new(
                Literal("(")
                    .ignore_then(lazy(parens))
                    .then_ignore(Literal(")"))
                    .map(wrap, unwrap_depth)
                    .or(Literal("").map(zero, to_unit)),
            )
        }

        let grammar = lazy(parens);
        let mut cursor = Cursor::new(b"((()))");
        assert_eq!(grammar.parse(&mut cursor).unwrap(), 3);

        let mut out = Output::new();
        grammar.print(&2, &mut out).unwrap();
        assert_eq!(out.as_str(), "(())");
    }

    #[test]
    fn test_depth_limit() {
        let grammar = depth(letters(), 1);
        let mut cursor = Cursor::new(b"ok");
        assert!(grammar.parse(&mut cursor).is_ok());

        let nested = depth(depth(letters(), 1), 1);
        let mut cursor = Cursor::new(b"deep");
        let err = nested.parse(&mut cursor).unwrap_err();
        match err.kind() {
            ErrorKind::UnexpectedInput(UnexpectedInput::MaxDepthExceeded { max }) => {
                assert_eq!(*max, 1);
            }
            other => panic!("unexpected kind: {other:?}"),
        }
    }
}
