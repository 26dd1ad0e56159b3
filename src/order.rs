//! Ordering and deduplication - the collect-all barrier
//!
//! [`order_facts`] takes every fact of a pass at once. It cannot stream:
//! global order and the positional indices that name generated wrappers
//! depend on seeing the full set.

use crate::model::{AnchorHandle, Domain, Invocation, InvocationFact, OrderKey};

/// A fact after the barrier: anchored, deduplicated, positioned
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderedFact {
    /// Zero-based position in the pass
    pub index: usize,
    pub order_key: OrderKey,
    pub anchor: AnchorHandle,
    pub invocation: Invocation,
}

impl OrderedFact {
    pub fn domain(&self) -> Domain {
        self.invocation.domain()
    }

    /// `Intercept_<Domain>_<index>`
    pub fn wrapper_name(&self) -> String {
        format!("Intercept_{}_{}", self.domain(), self.index)
    }
}

/// Drop unanchored facts, sort ordinally by order key, keep one fact per key
/// and number the survivors
///
/// When two classifiers claim the same call site the fact of the domain
/// declared first in [`Domain`] is kept.
pub fn order_facts(facts: Vec<InvocationFact>) -> Vec<OrderedFact> {
    let mut anchored: Vec<(OrderKey, AnchorHandle, Invocation)> = facts
        .into_iter()
        .filter_map(|fact| match fact.anchor {
            Some(anchor) => Some((fact.order_key, anchor, fact.invocation)),
            None => {
                tracing::debug!(key = %fact.order_key, "dropping fact without anchor");
                None
            }
        })
        .collect();

    anchored.sort_by(|a, b| {
        a.0.as_str()
            .cmp(b.0.as_str())
            .then_with(|| a.2.domain().cmp(&b.2.domain()))
    });

    let before = anchored.len();
    anchored.dedup_by(|later, earlier| later.0 == earlier.0);
    if anchored.len() != before {
        tracing::debug!(merged = before - anchored.len(), "merged facts with duplicate keys");
    }

    anchored
        .into_iter()
        .enumerate()
        .map(|(index, (order_key, anchor, invocation))| OrderedFact {
            index,
            order_key,
            anchor,
            invocation,
        })
        .collect()
}
