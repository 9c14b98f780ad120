//! Invertible grammar engine
//!
//! A [`Grammar`] describes a production in both directions at once: `parse`
//! consumes bytes from a [`Cursor`] and produces a value, `print` consumes a
//! value and appends bytes to an [`Output`]. The two directions are written
//! as one object so they cannot drift apart: composing grammars composes
//! both directions, and a value printed by a grammar parses back to itself
//! as long as the value satisfies the production's shape.
//!
//! The engine is generic; the markup grammar in [`crate::xml`] is its only
//! in-crate consumer.

pub mod combine;
pub mod primitive;

use crate::error::Result;
use crate::input::{Cursor, Output};

use combine::{IgnoreThen, Map, OrElse, Then, ThenIgnore};

/// A bidirectional production: parse and print are mutual inverses over
/// well-formed values.
pub trait Grammar {
    type Value;

    /// Consume bytes from the cursor, producing a value.
    ///
    /// On failure the cursor may be left mid-consumption; rollback is the
    /// caller's concern (ordered choice, option and repetition try
    /// sub-grammars on a cloned cursor and commit only on success).
    fn parse(&self, cursor: &mut Cursor<'_>) -> Result<Self::Value>;

    /// Append the canonical text for `value` to the output buffer.
    fn print(&self, value: &Self::Value, out: &mut Output) -> Result<()>;
}

impl<G: Grammar + ?Sized> Grammar for Box<G> {
    type Value = G::Value;

    fn parse(&self, cursor: &mut Cursor<'_>) -> Result<Self::Value> {
        (**self).parse(cursor)
    }

    fn print(&self, value: &Self::Value, out: &mut Output) -> Result<()> {
        (**self).print(value, out)
    }
}

/// Builder methods for composing grammars.
pub trait GrammarExt: Grammar + Sized {
    /// Sequence: run `self` then `next`, pairing the values.
    fn then<B: Grammar>(self, next: B) -> Then<Self, B> {
        Then { first: self, second: next }
    }

    /// Sequence keeping only the right value; `self` must be unit-valued.
    fn ignore_then<B: Grammar>(self, next: B) -> IgnoreThen<Self, B>
    where
        Self: Grammar<Value = ()>,
    {
        IgnoreThen { first: self, second: next }
    }

    /// Sequence keeping only the left value; `next` must be unit-valued.
    fn then_ignore<B: Grammar<Value = ()>>(self, next: B) -> ThenIgnore<Self, B> {
        ThenIgnore { first: self, second: next }
    }

    /// Ordered choice: first alternative to succeed wins, in both
    /// directions.
    fn or<B: Grammar<Value = Self::Value>>(self, other: B) -> OrElse<Self, B> {
        OrElse { first: self, second: other }
    }

    /// Value-level conversion around this grammar. `apply` runs after
    /// parsing and may reject the parsed shape; `unapply` runs before
    /// printing and may reject the value's shape.
    fn map<T>(
        self,
        apply: fn(Self::Value) -> Result<T>,
        unapply: fn(&T) -> Result<Self::Value>,
    ) -> Map<Self, T> {
        Map { inner: self, apply, unapply }
    }
}

impl<G: Grammar + Sized> GrammarExt for G {}
