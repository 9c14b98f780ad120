//! Primitive grammars: the leaves every production is assembled from.

use crate::error::{Error, Result, UnexpectedInput};
use crate::grammar::Grammar;
use crate::input::{Cursor, Output};

fn run_to_string(run: &[u8], cursor: &Cursor<'_>) -> Result<String> {
    std::str::from_utf8(run)
        .map(str::to_string)
        .map_err(|_| Error::unexpected(UnexpectedInput::InvalidUtf8, cursor.position()))
}

/// Exact byte literal. Parsing consumes it, printing emits it; no value.
#[derive(Clone, Copy, Debug)]
pub struct Literal(pub &'static str);

impl Grammar for Literal {
    type Value = ();

    fn parse(&self, cursor: &mut Cursor<'_>) -> Result<()> {
        if cursor.starts_with(self.0.as_bytes()) {
            cursor.advance_by(self.0.len());
            Ok(())
        } else {
            Err(Error::unexpected(
                UnexpectedInput::ExpectedLiteral {
                    literal: self.0.to_string(),
                },
                cursor.position(),
            ))
        }
    }

    fn print(&self, _value: &(), out: &mut Output) -> Result<()> {
        out.push_str(self.0);
        Ok(())
    }
}

/// Maximal run of bytes satisfying a predicate, at least `min` long.
///
/// Printing appends the value verbatim; the predicate is not re-checked.
/// Callers own the obligation that printed strings satisfy the production
/// they came from.
#[derive(Clone, Copy)]
pub struct PrefixWhile {
    pub pred: fn(u8) -> bool,
    pub min: usize,
    /// Short noun for error messages, e.g. `"tag name"`
    pub expected: &'static str,
}

impl Grammar for PrefixWhile {
    type Value = String;

    fn parse(&self, cursor: &mut Cursor<'_>) -> Result<String> {
        let start = cursor.position();
        let run = cursor.take_while(self.pred);
        if run.len() < self.min {
            return Err(Error::unexpected(
                UnexpectedInput::ExpectedRun {
                    expected: self.expected,
                },
                start,
            ));
        }
        run_to_string(run, cursor)
    }

    fn print(&self, value: &String, out: &mut Output) -> Result<()> {
        out.push_str(value);
        Ok(())
    }
}

/// Everything before the first occurrence of a terminator sequence.
///
/// The terminator itself is left for the surrounding composition to consume
/// (and to emit when printing).
#[derive(Clone, Copy, Debug)]
pub struct PrefixUpTo {
    pub terminator: &'static str,
}

impl Grammar for PrefixUpTo {
    type Value = String;

    fn parse(&self, cursor: &mut Cursor<'_>) -> Result<String> {
        match cursor.find(self.terminator.as_bytes()) {
            Some(len) => {
                let run = cursor.remaining().get(..len).unwrap_or_default();
                let text = run_to_string(run, cursor)?;
                cursor.advance_by(len);
                Ok(text)
            }
            None => Err(Error::unexpected(
                UnexpectedInput::MissingTerminator {
                    terminator: self.terminator.to_string(),
                },
                cursor.position(),
            )),
        }
    }

    fn print(&self, value: &String, out: &mut Output) -> Result<()> {
        out.push_str(value);
        Ok(())
    }
}

/// Which whitespace bytes a [`Whitespace`] grammar consumes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SpaceClass {
    /// Space, tab, carriage return
    Horizontal,
    /// Newline only
    Vertical,
    /// Any of the above
    Any,
}

impl SpaceClass {
    pub fn contains(self, b: u8) -> bool {
        match self {
            Self::Horizontal => matches!(b, b' ' | b'\t' | b'\r'),
            Self::Vertical => b == b'\n',
            Self::Any => matches!(b, b' ' | b'\t' | b'\r' | b'\n'),
        }
    }
}

/// Whitespace with asymmetric directions: parsing consumes and discards any
/// run of the class (at least `min` bytes); printing emits the fixed
/// `canonical` string regardless of what parsing saw.
///
/// This asymmetry is what lets one grammar accept loosely formatted input
/// while printing canonically formatted output — the flat and indented
/// modes differ only in the canonical strings they install here.
#[derive(Clone, Debug)]
pub struct Whitespace {
    pub class: SpaceClass,
    pub min: usize,
    pub canonical: String,
}

impl Whitespace {
    pub fn horizontal(min: usize, canonical: impl Into<String>) -> Self {
        Self {
            class: SpaceClass::Horizontal,
            min,
            canonical: canonical.into(),
        }
    }

    pub fn any(min: usize, canonical: impl Into<String>) -> Self {
        Self {
            class: SpaceClass::Any,
            min,
            canonical: canonical.into(),
        }
    }
}

impl Grammar for Whitespace {
    type Value = ();

    fn parse(&self, cursor: &mut Cursor<'_>) -> Result<()> {
        let start = cursor.position();
        let class = self.class;
        let run = cursor.take_while(|b| class.contains(b));
        if run.len() < self.min {
            return Err(Error::unexpected(
                UnexpectedInput::ExpectedRun {
                    expected: "whitespace",
                },
                start,
            ));
        }
        Ok(())
    }

    fn print(&self, _value: &(), out: &mut Output) -> Result<()> {
        out.push_str(&self.canonical);
        Ok(())
    }
}

/// End of a source line: at most one `\n` followed by horizontal
/// whitespace. Parsing never fails; printing emits the fixed canonical
/// string (`"\n"` when indenting, empty when flat).
#[derive(Clone, Copy, Debug)]
pub struct LineEnd {
    pub canonical: &'static str,
}

impl Grammar for LineEnd {
    type Value = ();

    fn parse(&self, cursor: &mut Cursor<'_>) -> Result<()> {
        if cursor.current() == Some(b'\n') {
            cursor.advance();
            let _ = cursor.take_while(|b| SpaceClass::Horizontal.contains(b));
        }
        Ok(())
    }

    fn print(&self, _value: &(), out: &mut Output) -> Result<()> {
        out.push_str(self.canonical);
        Ok(())
    }
}

/// Succeeds only at the end of input; rejects trailing bytes.
#[derive(Clone, Copy, Debug)]
pub struct EndOfInput;

impl Grammar for EndOfInput {
    type Value = ();

    fn parse(&self, cursor: &mut Cursor<'_>) -> Result<()> {
        if cursor.is_eof() {
            Ok(())
        } else {
            Err(Error::unexpected(
                UnexpectedInput::TrailingInput,
                cursor.position(),
            ))
        }
    }

    fn print(&self, _value: &(), _out: &mut Output) -> Result<()> {
        Ok(())
    }
}

/// Negative lookahead: succeeds, consuming nothing, iff the literal does
/// not match at the current position. Prints nothing.
#[derive(Clone, Copy, Debug)]
pub struct NotFollowedBy(pub &'static str);

impl Grammar for NotFollowedBy {
    type Value = ();

    fn parse(&self, cursor: &mut Cursor<'_>) -> Result<()> {
        if cursor.starts_with(self.0.as_bytes()) {
            Err(Error::unexpected(
                UnexpectedInput::ForbiddenPrefix {
                    literal: self.0.to_string(),
                },
                cursor.position(),
            ))
        } else {
            Ok(())
        }
    }

    fn print(&self, _value: &(), _out: &mut Output) -> Result<()> {
        Ok(())
    }
}
