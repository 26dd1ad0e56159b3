//! Database classifier - ADO.NET command executions
//!
//! A call matches when its method name is one of the `Execute*` operations
//! and its declaring type is, or derives at any depth from,
//! `System.Data.Common.DbCommand`.

use super::{call_shape, ClassifyContext, Classifier};
use crate::error::Result;
use crate::host::{CancellationToken, ResolvedCall, SemanticModel};
use crate::model::{DbInvocation, Domain, Invocation};
use std::collections::HashSet;

/// Base type every recognized driver command derives from
pub const DB_COMMAND_BASE: &str = "System.Data.Common.DbCommand";

/// Method name → (operation, is_async)
const OPERATIONS: &[(&str, &str, bool)] = &[
    ("ExecuteReader", "read", false),
    ("ExecuteReaderAsync", "read", true),
    ("ExecuteNonQuery", "non_query", false),
    ("ExecuteNonQueryAsync", "non_query", true),
    ("ExecuteScalar", "scalar", false),
    ("ExecuteScalarAsync", "scalar", true),
];

pub struct DatabaseClassifier;

impl Classifier for DatabaseClassifier {
    fn domain(&self) -> Domain {
        Domain::Db
    }

    fn classify(
        &self,
        call: &ResolvedCall,
        ctx: &ClassifyContext<'_>,
        cancel: &CancellationToken,
    ) -> Result<Option<Invocation>> {
        let method = &call.method;
        if method.is_static {
            return Ok(None);
        }

        let Some(&(_, operation, is_async)) =
            OPERATIONS.iter().find(|(name, _, _)| *name == method.name)
        else {
            return Ok(None);
        };

        let declaring = method.containing_type.as_str();
        if !derives_from(ctx.model, declaring, DB_COMMAND_BASE, cancel)? {
            return Ok(None);
        }

        let concrete_type = (declaring != DB_COMMAND_BASE).then(|| declaring.to_string());
        let provider_id = concrete_type
            .as_deref()
            .and_then(|t| ctx.registry.provider_id(t))
            .map(str::to_string);

        Ok(Some(Invocation::Db(DbInvocation {
            operation: operation.to_string(),
            provider_id,
            concrete_type,
            shape: call_shape(method, is_async),
        })))
    }
}

/// Whether `type_name` is `base` or has it somewhere up its base-type chain
///
/// The chain has no depth limit. Cancellation is checked at every step and a
/// type seen twice (a malformed, cyclic hierarchy) ends the walk.
pub fn derives_from(
    model: &dyn SemanticModel,
    type_name: &str,
    base: &str,
    cancel: &CancellationToken,
) -> Result<bool> {
    let mut seen = HashSet::new();
    let mut current = Some(type_name.to_string());

    while let Some(name) = current {
        cancel.check()?;
        if name == base {
            return Ok(true);
        }
        if !seen.insert(name.clone()) {
            return Ok(false);
        }
        current = model.type_symbol(&name).and_then(|t| t.base_type);
    }

    Ok(false)
}
