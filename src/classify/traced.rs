//! Traced classifier - calls to methods carrying the traced marker
//!
//! ## Marker lookup: nearest declaration wins
//!
//! 1. Start at the statically resolved method.
//! 2. An opt-out marker stops the walk: no match.
//! 3. A traced marker is used as found.
//! 4. Otherwise move to the base method this one overrides and repeat.
//! 5. When the chain ends without a marker, a traced marker on the resolved
//!    method's containing type applies to its public methods.
//!
//! With `inherit_traced` off, step 4 is skipped and only the exact invoked
//! symbol (plus its class) is consulted.

use super::{call_shape, ClassifyContext, Classifier};
use crate::error::Result;
use crate::host::{find_attribute, AttributeData, CancellationToken, MethodSymbol, ResolvedCall};
use crate::model::{Domain, Invocation, SpanKind, TracedInvocation, TracedTagInfo};
use std::collections::HashSet;

/// Return types that make a call awaitable
const ASYNC_WRAPPERS: &[&str] = &[
    "System.Threading.Tasks.Task",
    "System.Threading.Tasks.ValueTask",
    "Task",
    "ValueTask",
];

/// Whether a return type names one of the awaitable wrappers
///
/// The wrapper must be the whole type or be followed by its generic
/// argument list; `TaskCompletionSource` does not count.
pub fn is_async_return_type(return_type: &str) -> bool {
    let trimmed = return_type.trim().trim_start_matches("global::");
    ASYNC_WRAPPERS.iter().any(|prefix| {
        trimmed
            .strip_prefix(prefix)
            .is_some_and(|rest| rest.is_empty() || rest.starts_with('<'))
    })
}

pub struct TracedClassifier;

impl Classifier for TracedClassifier {
    fn domain(&self) -> Domain {
        Domain::Traced
    }

    fn classify(
        &self,
        call: &ResolvedCall,
        ctx: &ClassifyContext<'_>,
        cancel: &CancellationToken,
    ) -> Result<Option<Invocation>> {
        let method = &call.method;
        let Some((marker, declaring)) = find_marker(method, ctx, cancel)? else {
            return Ok(None);
        };

        let source_name = match marker.args.first().and_then(|a| a.as_str()) {
            Some(name) if !name.trim().is_empty() => name.to_string(),
            _ => {
                tracing::debug!(method = %method.name, "traced marker without source name");
                return Ok(None);
            }
        };

        let span_name = marker
            .named
            .get("SpanName")
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty())
            .unwrap_or(&method.name)
            .to_string();

        let kind = marker
            .named
            .get("Kind")
            .and_then(|v| v.as_int())
            .map(SpanKind::from_code)
            .unwrap_or_default();

        Ok(Some(Invocation::Traced(TracedInvocation {
            source_name,
            span_name,
            kind,
            tags: tags(method, &declaring, &ctx.markers.traced_tag),
            shape: call_shape(method, is_async_return_type(&method.return_type)),
        })))
    }
}

/// The traced marker that applies to `method`, with the method declaring it
fn find_marker(
    method: &MethodSymbol,
    ctx: &ClassifyContext<'_>,
    cancel: &CancellationToken,
) -> Result<Option<(AttributeData, MethodSymbol)>> {
    let markers = ctx.markers;
    let mut seen = HashSet::new();
    let mut current = method.clone();

    loop {
        cancel.check()?;
        if find_attribute(&current.attributes, &markers.no_trace).is_some() {
            return Ok(None);
        }
        if let Some(marker) = find_attribute(&current.attributes, &markers.traced) {
            let marker = marker.clone();
            return Ok(Some((marker, current)));
        }
        if !ctx.inherit_traced
            || !seen.insert((current.containing_type.clone(), current.name.clone()))
        {
            break;
        }
        match ctx.model.overridden_method(&current) {
            Some(base) => current = base,
            None => break,
        }
    }

    if method.accessibility != "public" {
        return Ok(None);
    }
    let class_marker = ctx
        .model
        .type_symbol(&method.containing_type)
        .and_then(|ty| find_attribute(&ty.attributes, &markers.traced).cloned());
    Ok(class_marker.map(|marker| (marker, method.clone())))
}

/// Tag markers on the invoked method's parameters, falling back to the
/// same-position parameter of the method that declared the traced marker
fn tags(method: &MethodSymbol, declaring: &MethodSymbol, tag_marker: &str) -> Vec<TracedTagInfo> {
    method
        .parameters
        .iter()
        .enumerate()
        .filter_map(|(i, param)| {
            let attr = find_attribute(&param.attributes, tag_marker).or_else(|| {
                declaring
                    .parameters
                    .get(i)
                    .and_then(|p| find_attribute(&p.attributes, tag_marker))
            })?;

            let tag_name = attr
                .args
                .first()
                .and_then(|a| a.as_str())
                .filter(|s| !s.is_empty())
                .unwrap_or(&param.name)
                .to_string();
            let skip_if_null = attr
                .named
                .get("SkipIfNull")
                .and_then(|v| v.as_bool())
                .unwrap_or(true);

            Some(TracedTagInfo {
                parameter_name: param.name.clone(),
                tag_name,
                skip_if_null,
                nullable: param.nullable,
            })
        })
        .collect()
}
