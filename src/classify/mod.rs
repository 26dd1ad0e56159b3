//! Domain classifiers - confirm a candidate and extract an invocation fact
//!
//! Each classifier sees a call the host has already resolved and answers
//! with `Ok(Some(..))` on a match or `Ok(None)` otherwise. Non-matches are
//! the normal case and are never errors. Classifiers hold no state; the
//! pipeline runs them concurrently across nodes.

pub mod database;
pub mod genai;
pub mod meter;
pub mod traced;

pub use database::{DatabaseClassifier, DB_COMMAND_BASE};
pub use genai::GenAiClassifier;
pub use meter::classify_meter;
pub use traced::{is_async_return_type, TracedClassifier};

use crate::config::MarkerConfig;
use crate::error::Result;
use crate::host::{CancellationToken, MethodSymbol, ResolvedCall, SemanticModel, SyntaxNode};
use crate::model::{CallShape, Domain, Invocation, InvocationFact, ParameterInfo};
use crate::providers::ProviderRegistry;

/// Read-only inputs shared by every classifier in a pass
#[derive(Clone, Copy)]
pub struct ClassifyContext<'a> {
    pub model: &'a dyn SemanticModel,
    pub registry: &'a ProviderRegistry,
    pub markers: &'a MarkerConfig,
    pub inherit_traced: bool,
}

pub trait Classifier: Send + Sync {
    fn domain(&self) -> Domain;

    fn classify(
        &self,
        call: &ResolvedCall,
        ctx: &ClassifyContext<'_>,
        cancel: &CancellationToken,
    ) -> Result<Option<Invocation>>;
}

/// Resolve `node` once and run every classifier over it
///
/// Each match becomes a fact keyed by the node's location and carrying the
/// host's anchor (or `None` when the host cannot anchor the call).
pub fn classify_node(
    node: &SyntaxNode,
    classifiers: &[Box<dyn Classifier>],
    ctx: &ClassifyContext<'_>,
    cancel: &CancellationToken,
) -> Result<Vec<InvocationFact>> {
    cancel.check()?;

    let call = match ctx.model.resolve_call(node) {
        Some(call) => call,
        None => return Ok(Vec::new()),
    };

    let mut facts = Vec::new();
    for classifier in classifiers {
        if let Some(invocation) = classifier.classify(&call, ctx, cancel)? {
            facts.push(InvocationFact {
                order_key: node.location.order_key(),
                anchor: ctx.model.resolve_anchor(node),
                invocation,
            });
        }
    }
    Ok(facts)
}

/// Signature of `method` as a wrapper needs to reproduce it
pub(crate) fn call_shape(method: &MethodSymbol, is_async: bool) -> CallShape {
    CallShape {
        declaring_type: method.containing_type.clone(),
        method_name: method.name.clone(),
        is_static: method.is_static,
        is_async,
        return_type: method.return_type.clone(),
        parameters: method
            .parameters
            .iter()
            .map(|p| ParameterInfo {
                name: p.name.clone(),
                type_name: p.type_name.clone(),
            })
            .collect(),
        type_parameters: method.type_parameters.clone(),
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! In-memory semantic model for classifier tests

    use crate::host::*;
    use crate::model::AnchorHandle;
    use std::collections::HashMap;

    #[derive(Default)]
    pub struct FakeModel {
        pub types: HashMap<String, TypeSymbol>,
        pub calls: HashMap<String, ResolvedCall>,
        pub references: Vec<String>,
        pub visible: Vec<String>,
    }

    impl FakeModel {
        pub fn with_type(mut self, ty: TypeSymbol) -> Self {
            self.types.insert(ty.full_name.clone(), ty);
            self
        }

        pub fn with_call(mut self, location: &SourceLocation, call: ResolvedCall) -> Self {
            self.calls.insert(location.to_string(), call);
            self
        }
    }

    impl SemanticModel for FakeModel {
        fn resolve_call(&self, node: &SyntaxNode) -> Option<ResolvedCall> {
            self.calls.get(&node.location.to_string()).cloned()
        }

        fn type_symbol(&self, full_name: &str) -> Option<TypeSymbol> {
            self.types.get(full_name).cloned()
        }

        fn overridden_method(&self, method: &MethodSymbol) -> Option<MethodSymbol> {
            let base = self.types.get(method.overrides.as_deref()?)?;
            base.methods.iter().find(|m| m.name == method.name).cloned()
        }

        fn resolve_anchor(&self, node: &SyntaxNode) -> Option<AnchorHandle> {
            if node.location.unit.ends_with(".g.cs") {
                return None;
            }
            Some(AnchorHandle::new(format!("[Anchor(\"{}\")]", node.location)))
        }

        fn is_type_visible(&self, metadata_name: &str) -> bool {
            self.visible.iter().any(|v| v == metadata_name)
        }

        fn referenced_libraries(&self) -> Vec<String> {
            self.references.clone()
        }

        fn declared_types(&self) -> Vec<TypeSymbol> {
            let mut types: Vec<_> = self.types.values().cloned().collect();
            types.sort_by(|a, b| a.full_name.cmp(&b.full_name));
            types
        }
    }

    pub fn call(method: MethodSymbol) -> ResolvedCall {
        ResolvedCall {
            method,
            arguments: Vec::new(),
        }
    }
}
