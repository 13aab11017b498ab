//! Affinity and constraint expressions.
//!
//! Expressions are plain strings of the form `key==value` (hard: the host
//! must match) or `key==~value` (soft: best effort). Deciding whether a
//! host actually matches is left to a [`ConstraintMatcher`].

use std::fmt;

use crate::error::{PlacementError, PlacementResult};
use crate::node::Node;

const OPERATOR: &str = "==";
const SOFT_MARKER: char = '~';

/// A parsed `key==value` / `key==~value` expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HintExpr {
    pub key: String,
    pub value: String,
    /// Soft expressions never disqualify a host.
    pub soft: bool,
}

impl HintExpr {
    pub fn parse(expr: &str) -> PlacementResult<Self> {
        let Some((key, value)) = expr.split_once(OPERATOR) else {
            return Err(PlacementError::InvalidExpression(expr.to_string()));
        };
        let key = key.trim();
        if key.is_empty() {
            return Err(PlacementError::InvalidExpression(expr.to_string()));
        }
        let (value, soft) = match value.strip_prefix(SOFT_MARKER) {
            Some(rest) => (rest, true),
            None => (value, false),
        };
        Ok(Self {
            key: key.to_string(),
            value: value.trim().to_string(),
            soft,
        })
    }
}

impl fmt::Display for HintExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let marker = if self.soft { "~" } else { "" };
        write!(f, "{}{}{}{}", self.key, OPERATOR, marker, self.value)
    }
}

/// Decides whether a host satisfies an expression.
///
/// Implementations own the matching semantics (label lookup, globbing,
/// container or image affinity). The placer drops a host only when a hard
/// expression does not match; soft mismatches leave it in the candidate set.
pub trait ConstraintMatcher: Send + Sync {
    fn matches(&self, node: &Node, expr: &HintExpr) -> bool;
}
