//! Candidate scanning - the cheap syntactic pre-filter
//!
//! [`is_candidate`] looks at node shape only and never consults the semantic
//! model. Everything it rejects is skipped by the classifiers.

pub mod csharp;

pub use csharp::scan_csharp;

use crate::host::{Callee, CancellationToken, SyntaxKind, SyntaxNode};

/// Whether `node` is worth semantic classification
///
/// Invocations through a plain or member-access name qualify; delegate
/// calls and everything that is not an invocation do not.
pub fn is_candidate(node: &SyntaxNode, cancel: &CancellationToken) -> bool {
    if cancel.is_cancelled() || node.kind != SyntaxKind::Invocation {
        return false;
    }
    match &node.callee {
        Callee::Identifier(name) | Callee::MemberAccess(name) => !name.is_empty(),
        Callee::Other => false,
    }
}
