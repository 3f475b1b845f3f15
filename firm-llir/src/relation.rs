//! Comparison relations used by `Cmp` nodes and carried through to `Branch` terminators.

use std::fmt;

/// The five relations a `Cmp`/`Cond` selector chain is allowed to use.
///
/// This is deliberately not a general relational-operator enum (no `NotEqual`,
/// `UnorderedOrLess`, etc.) because the source language only ever produces these five; anything
/// else reaching a `Cond` is an `UnsupportedBranchPredicate`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Relation {
    /// `==`
    Equal,
    /// `<`
    Less,
    /// `<=`
    LessEqual,
    /// `>`
    Greater,
    /// `>=`
    GreaterEqual,
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            Relation::Equal => "==",
            Relation::Less => "<",
            Relation::LessEqual => "<=",
            Relation::Greater => ">",
            Relation::GreaterEqual => ">=",
        };
        write!(f, "{}", s)
    }
}
