//! Error types for bixml

use std::fmt;
use thiserror::Error;

/// Position in source text
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Pos {
    pub offset: usize,
    pub line: u32,
    pub col: u32,
}

impl fmt::Display for Pos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.offset, self.line, self.col)
    }
}

impl Pos {
    pub const fn new(offset: usize, line: u32, col: u32) -> Self {
        Self { offset, line, col }
    }
}

/// Span representing a range in source text
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Span {
    pub start: Pos,
    pub end: Pos,
}

impl Span {
    pub const fn new(start: Pos, end: Pos) -> Self {
        Self { start, end }
    }

    pub const fn at(pos: Pos) -> Self {
        Self {
            start: pos,
            end: pos,
        }
    }

    pub const fn empty() -> Self {
        Self {
            start: Pos::new(0, 0, 0),
            end: Pos::new(0, 0, 0),
        }
    }
}

/// Top-level error categorization: the engine fails in exactly two ways.
///
/// Parsing fails when the input bytes do not match the grammar
/// ([`UnexpectedInput`]); printing fails when a value cannot be represented
/// by the production it was handed to ([`InvariantViolation`]). There are no
/// partial results in either direction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    UnexpectedInput(UnexpectedInput),
    InvariantViolation(InvariantViolation),
}

/// Parse-time failures: the byte stream diverged from the grammar.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UnexpectedInput {
    /// A required literal was not found at the current position
    ExpectedLiteral { literal: String },
    /// A byte run did not reach its required minimum length
    ExpectedRun { expected: &'static str },
    /// A terminator sequence never occurred in the remaining input
    MissingTerminator { terminator: String },
    /// A negative lookahead matched a forbidden prefix
    ForbiddenPrefix { literal: String },
    /// Closing tag name differs from the opening tag name
    MismatchedClosingTag { expected: String, found: String },
    /// Attribute key repeated within one attribute list
    DuplicateAttribute { name: String },
    /// Bytes remain after the document grammar finished
    TrailingInput,
    /// A consumed run was not valid UTF-8
    InvalidUtf8,
    /// Element nesting exceeded the configured depth limit
    MaxDepthExceeded { max: u16 },
    /// Input exceeded the configured size limit
    MaxSizeExceeded { max: usize },
}

impl fmt::Display for UnexpectedInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ExpectedLiteral { literal } => write!(f, "expected {literal:?}"),
            Self::ExpectedRun { expected } => write!(f, "expected {expected}"),
            Self::MissingTerminator { terminator } => {
                write!(f, "missing terminator {terminator:?}")
            }
            Self::ForbiddenPrefix { literal } => write!(f, "forbidden prefix {literal:?}"),
            Self::MismatchedClosingTag { expected, found } => {
                write!(f, "mismatched closing tag: expected </{expected}>, found </{found}>")
            }
            Self::DuplicateAttribute { name } => write!(f, "duplicate attribute: {name}"),
            Self::TrailingInput => write!(f, "trailing input after document"),
            Self::InvalidUtf8 => write!(f, "invalid utf-8"),
            Self::MaxDepthExceeded { max } => write!(f, "max depth exceeded: {max}"),
            Self::MaxSizeExceeded { max } => write!(f, "max size exceeded: {max}"),
        }
    }
}

/// Print-time failures: the value does not fit the production's shape.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InvariantViolation {
    /// A self-closing production was handed an element with content
    NonEmptyContent { name: String },
    /// No alternative of an ordered choice accepts the value
    ShapeMismatch { expected: &'static str },
    /// A repetition was handed fewer items than its minimum
    TooFewItems { min: usize },
}

impl fmt::Display for InvariantViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NonEmptyContent { name } => {
                write!(f, "element <{name}> has content and cannot print as self-closing")
            }
            Self::ShapeMismatch { expected } => write!(f, "value is not {expected}"),
            Self::TooFewItems { min } => write!(f, "fewer than {min} items"),
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnexpectedInput(inner) => write!(f, "unexpected input: {inner}"),
            Self::InvariantViolation(inner) => write!(f, "invariant violation: {inner}"),
        }
    }
}

/// Main error type for bixml
#[derive(Error, Clone, Debug, PartialEq, Eq)]
pub struct Error {
    kind: ErrorKind,
    span: Span,
}

impl Error {
    pub const fn new(kind: ErrorKind, span: Span) -> Self {
        Self { kind, span }
    }

    /// Parse-side error at a cursor position
    pub const fn unexpected(kind: UnexpectedInput, pos: Pos) -> Self {
        Self::new(ErrorKind::UnexpectedInput(kind), Span::at(pos))
    }

    /// Print-side error; printing has no meaningful source position
    pub const fn invariant(kind: InvariantViolation) -> Self {
        Self::new(ErrorKind::InvariantViolation(kind), Span::empty())
    }

    pub const fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    pub const fn span(&self) -> Span {
        self.span
    }

    pub const fn is_unexpected_input(&self) -> bool {
        matches!(self.kind, ErrorKind::UnexpectedInput(_))
    }

    pub const fn is_invariant_violation(&self) -> bool {
        matches!(self.kind, ErrorKind::InvariantViolation(_))
    }

    /// Stamp a position onto an error that was raised without one.
    ///
    /// Value conversions run outside the cursor and cannot know where the
    /// offending bytes were; the combinator that invoked them fills it in.
    pub fn or_at(mut self, pos: Pos) -> Self {
        if self.span == Span::empty() && self.is_unexpected_input() {
            self.span = Span::at(pos);
        }
        self
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            ErrorKind::UnexpectedInput(_) => {
                write!(f, "error at {}: {}", self.span.start, self.kind)
            }
            ErrorKind::InvariantViolation(_) => write!(f, "{}", self.kind),
        }
    }
}

/// Result type alias for bixml
pub type Result<T> = std::result::Result<T, Error>;
