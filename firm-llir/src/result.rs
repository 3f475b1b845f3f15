//! The lowering core's error type and result alias.
//!
//! All failures here are compiler-internal: a source graph that doesn't honor the input
//! contract, not a user-facing diagnostic. Modeled with `failure_derive`, the same way the
//! teacher models `CodegenError`, rather than hand-writing `std::error::Error` boilerplate.

use crate::source::{BlockId, NodeId};
use failure_derive::Fail;

/// Why lowering of a method failed.
#[derive(Fail, Debug, Clone)]
pub enum LoweringError {
    /// A source node of a kind outside the supported set was encountered.
    #[fail(
        display = "unsupported node kind `{}` in block {} (node {})",
        kind, block, node
    )]
    UnsupportedNodeKind {
        /// The offending node's kind, formatted for diagnostics.
        kind: String,
        /// The block containing the offending node.
        block: BlockId,
        /// The offending node.
        node: NodeId,
    },

    /// A `Conv` node's operand/result modes were not the single supported `(Is -> Ls)` widening.
    #[fail(display = "unsupported conversion at node {} in block {}", node, block)]
    UnsupportedConversion {
        /// The offending node.
        node: NodeId,
        /// The block containing the offending node.
        block: BlockId,
    },

    /// A `Cond`'s selector chain bottomed out at a `Cmp` whose relation is not one of the five
    /// supported relations.
    #[fail(
        display = "unsupported branch predicate at node {} in block {}",
        node, block
    )]
    UnsupportedBranchPredicate {
        /// The offending node.
        node: NodeId,
        /// The block containing the offending node.
        block: BlockId,
    },

    /// A `Proj` off a `Cond` carried a projection number outside `{0, 1}`.
    #[fail(
        display = "malformed control projection {} at node {} in block {}",
        number, node, block
    )]
    MalformedControlProjection {
        /// The offending projection number.
        number: u32,
        /// The offending node.
        node: NodeId,
        /// The block containing the offending node.
        block: BlockId,
    },

    /// A cross-block operand resolved to something other than a register-producing node where an
    /// `InputNode` was expected.
    #[fail(
        display = "invariant violation: expected a register-producing predecessor for node {} in block {}",
        node, block
    )]
    InvariantViolation {
        /// The node whose predecessor failed to resolve.
        node: NodeId,
        /// The block containing the offending node.
        block: BlockId,
    },

    /// The verifier rejected the lowered graph.
    #[fail(display = "{}", 0)]
    Verifier(#[cause] crate::verifier::VerifierErrors),
}

impl From<crate::verifier::VerifierErrors> for LoweringError {
    fn from(errors: crate::verifier::VerifierErrors) -> Self {
        LoweringError::Verifier(errors)
    }
}

/// The result of lowering a single method.
pub type LoweringResult<T> = Result<T, LoweringError>;
