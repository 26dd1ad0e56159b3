//! Interceptor emission - one wrapper method per ordered fact
//!
//! Each domain gets its own unit holding a `file static class` of wrappers.
//! A wrapper carries the host's anchor attribute, repeats the intercepted
//! signature with every type `global::`-qualified, starts an activity, and
//! forwards to the original call.

use super::{
    escape_identifier, fingerprint, header_lines, tag_arguments, GeneratedUnit,
    IdentifierAllocator, TagArgs, TypeQualifier,
};
use crate::error::Result;
use crate::model::{CallShape, DbInvocation, Domain, GenAiInvocation, Invocation, TracedInvocation};
use crate::order::OrderedFact;
use crate::util::csharp_string;
use genco::prelude::*;
use std::collections::HashSet;

const ACTIVITY_SOURCE: &str = "global::System.Diagnostics.ActivitySource";
const ACTIVITY_KIND: &str = "global::System.Diagnostics.ActivityKind";
const DB_SOURCE_FIELD: &str = "DbActivitySource";
const GENAI_SOURCE_FIELD: &str = "GenAiActivitySource";

// Locals used inside wrappers; the leading underscores keep them clear of
// forwarded parameter names
const ACTIVITY: &str = "__activity";
const RESULT: &str = "__result";
const TAGS: &str = "__tags";

pub struct InterceptorConfig<'a> {
    /// Namespace of the generated classes
    pub namespace: &'a str,
    pub qualifier: &'a TypeQualifier,
}

/// Render one unit per domain present in `facts`, in domain order
pub fn render_interceptors(
    facts: &[OrderedFact],
    config: &InterceptorConfig<'_>,
) -> Result<Vec<GeneratedUnit>> {
    let mut units = Vec::new();
    for domain in [Domain::Traced, Domain::Db, Domain::GenAi] {
        let domain_facts: Vec<&OrderedFact> =
            facts.iter().filter(|f| f.domain() == domain).collect();
        if domain_facts.is_empty() {
            continue;
        }
        units.push(render_unit(domain, &domain_facts, config)?);
    }
    Ok(units)
}

fn render_unit(
    domain: Domain,
    facts: &[&OrderedFact],
    config: &InterceptorConfig<'_>,
) -> Result<GeneratedUnit> {
    let class_name = format!("{}Interceptors", domain);
    let mut ids = IdentifierAllocator::new();
    ids.reserve(&class_name);
    for fact in facts {
        ids.reserve(&fact.wrapper_name());
    }
    let mut declared = HashSet::new();
    let mut fields: Vec<String> = Vec::new();

    match domain {
        Domain::Db => {
            ids.reserve(DB_SOURCE_FIELD);
            fields.push(source_field(
                DB_SOURCE_FIELD,
                &format!("{}.Database", config.namespace),
            ));
        }
        Domain::GenAi => {
            ids.reserve(GENAI_SOURCE_FIELD);
            fields.push(source_field(
                GENAI_SOURCE_FIELD,
                &format!("{}.GenAi", config.namespace),
            ));
        }
        Domain::Traced => {}
    }

    let mut wrappers: Vec<csharp::Tokens> = Vec::new();
    for fact in facts {
        let plan = match &fact.invocation {
            Invocation::Traced(traced) => {
                let field = ids.allocate(&traced.source_name);
                if declared.insert(field.clone()) {
                    fields.push(source_field(&field, &traced.source_name));
                }
                traced_plan(traced, &field)
            }
            Invocation::Db(db) => db_plan(db),
            Invocation::GenAi(genai) => genai_plan(genai),
        };
        wrappers.push(render_wrapper(fact, &plan, config.qualifier));
    }

    let header = header_lines(&fingerprint(
        facts
            .iter()
            .map(|f| format!("{} {}", f.order_key, f.wrapper_name())),
    ));

    let tokens: csharp::Tokens = quote! {
        $(for line in &header join ($['\r']) => $line)
        $("#nullable enable")
        $['\n']
        namespace $(config.namespace)
        {
            file static class $class_name
            {
                $(for field in &fields join ($['\r']) => $field)
                $['\n']
                $(for wrapper in wrappers join ($['\n']) => $wrapper)
            }
        }
    };

    Ok(GeneratedUnit {
        hint_name: format!("Obsweave.Interceptors.{}.g.cs", domain),
        source: tokens.to_file_string()?,
    })
}

fn source_field(field: &str, source_name: &str) -> String {
    format!(
        "private static readonly {} {} = new({});",
        ACTIVITY_SOURCE,
        field,
        csharp_string(source_name)
    )
}

// ============================================================================
// Per-domain plans
// ============================================================================

/// Domain-specific statements around the forwarded call
struct Plan<'a> {
    shape: &'a CallShape,
    /// Statements before the call: activity start and tags
    before: Vec<String>,
    /// Statements that read the call's result before it is returned
    after: Vec<String>,
}

fn traced_plan<'a>(traced: &'a TracedInvocation, field: &str) -> Plan<'a> {
    let (conditional, unconditional): (Vec<_>, Vec<_>) = traced
        .tags
        .iter()
        .partition(|t| t.skip_if_null && t.nullable);

    let start_tags: Vec<(String, String)> = unconditional
        .iter()
        .map(|t| (t.tag_name.clone(), escape_identifier(&t.parameter_name)))
        .collect();

    let mut before = start_activity(
        field,
        &csharp_string(&traced.span_name),
        traced.kind.activity_kind(),
        &start_tags,
    );
    for tag in conditional {
        let param = escape_identifier(&tag.parameter_name);
        before.push(format!(
            "if ({} is not null) {}?.SetTag({}, {});",
            param,
            ACTIVITY,
            csharp_string(&tag.tag_name),
            param
        ));
    }

    Plan {
        shape: &traced.shape,
        before,
        after: Vec::new(),
    }
}

fn db_plan(db: &DbInvocation) -> Plan<'_> {
    let provider = db.provider_id.as_deref().unwrap_or("unknown");
    let mut tags = vec![
        ("db.system.name".to_string(), csharp_string(provider)),
        ("db.operation.name".to_string(), csharp_string(&db.operation)),
    ];
    if let Some(concrete) = &db.concrete_type {
        tags.push(("db.command.type".to_string(), csharp_string(concrete)));
    }
    if !db.shape.is_static {
        tags.push(("db.query.text".to_string(), "@this.CommandText".to_string()));
    }

    Plan {
        shape: &db.shape,
        before: start_activity(
            DB_SOURCE_FIELD,
            &csharp_string(&format!("{} {}", db.operation, provider)),
            "Client",
            &tags,
        ),
        after: Vec::new(),
    }
}

fn genai_plan(genai: &GenAiInvocation) -> Plan<'_> {
    let mut tags = vec![
        ("gen_ai.provider.name".to_string(), csharp_string(&genai.provider_id)),
        ("gen_ai.operation.name".to_string(), csharp_string(&genai.operation)),
    ];
    let span_name = match &genai.model {
        Some(model) => {
            tags.push(("gen_ai.request.model".to_string(), csharp_string(model)));
            format!("{} {}", genai.operation, model)
        }
        None => genai.operation.clone(),
    };

    let mut after = Vec::new();
    let usage = [
        ("gen_ai.usage.input_tokens", &genai.token_usage.input),
        ("gen_ai.usage.output_tokens", &genai.token_usage.output),
    ];
    for (tag, path) in usage {
        if let Some(path) = path {
            after.push(format!(
                "{}?.SetTag({}, {});",
                ACTIVITY,
                csharp_string(tag),
                null_conditional(RESULT, path)
            ));
        }
    }

    Plan {
        shape: &genai.shape,
        before: start_activity(
            GENAI_SOURCE_FIELD,
            &csharp_string(&span_name),
            "Client",
            &tags,
        ),
        after,
    }
}

/// `using var __activity = Source.StartActivity(...)` with tags per count rule
fn start_activity(
    field: &str,
    span_name: &str,
    kind: &str,
    tags: &[(String, String)],
) -> Vec<String> {
    let start = |extra: &str| {
        format!(
            "using var {} = {}.StartActivity({}, {}.{}{});",
            ACTIVITY, field, span_name, ACTIVITY_KIND, kind, extra
        )
    };
    match tag_arguments(tags, TAGS) {
        TagArgs::None => vec![start("")],
        TagArgs::Single(pair) => vec![start(&format!(", tags: new[] {{ {} }}", pair))],
        TagArgs::Array { declaration, name } => {
            vec![declaration, start(&format!(", tags: {}", name))]
        }
    }
}

/// `Value.Usage.InputTokenCount` on `r` → `r?.Value?.Usage?.InputTokenCount`
fn null_conditional(root: &str, path: &str) -> String {
    std::iter::once(root)
        .chain(path.split('.').filter(|s| !s.is_empty()))
        .collect::<Vec<_>>()
        .join("?.")
}

// ============================================================================
// Wrapper rendering
// ============================================================================

fn render_wrapper(fact: &OrderedFact, plan: &Plan<'_>, qualifier: &TypeQualifier) -> csharp::Tokens {
    let shape = plan.shape;
    let type_params: Vec<String> = shape.type_parameters.iter().map(|t| t.name.clone()).collect();
    let type_args = if type_params.is_empty() {
        String::new()
    } else {
        format!("<{}>", type_params.join(", "))
    };

    let return_type = qualifier.qualify(&shape.return_type, &type_params);
    let declaring = qualifier.qualify(&shape.declaring_type, &type_params);

    let mut params = Vec::new();
    if !shape.is_static {
        params.push(format!("this {} @this", declaring));
    }
    for p in &shape.parameters {
        params.push(format!(
            "{} {}",
            qualifier.qualify(&p.type_name, &type_params),
            escape_identifier(&p.name)
        ));
    }

    let constraints: String = shape
        .type_parameters
        .iter()
        .filter_map(|t| {
            t.constraint
                .as_ref()
                .map(|c| {
                    format!(
                        " where {} : {}",
                        t.name,
                        qualifier.qualify_constraint(c, &type_params)
                    )
                })
        })
        .collect();

    let signature = format!(
        "public static {}{} {}{}({}){}",
        if shape.is_async { "async " } else { "" },
        return_type,
        fact.wrapper_name(),
        type_args,
        params.join(", "),
        constraints
    );

    let receiver = if shape.is_static {
        declaring.clone()
    } else {
        "@this".to_string()
    };
    let args: Vec<String> = shape
        .parameters
        .iter()
        .map(|p| escape_identifier(&p.name))
        .collect();
    let call = format!(
        "{}{}.{}{}({})",
        if shape.is_async { "await " } else { "" },
        receiver,
        shape.method_name,
        type_args,
        args.join(", ")
    );

    let mut invoke = Vec::new();
    if !returns_value(shape) {
        invoke.push(format!("{};", call));
    } else if plan.after.is_empty() {
        invoke.push(format!("return {};", call));
    } else {
        invoke.push(format!("var {} = {};", RESULT, call));
        invoke.extend(plan.after.iter().cloned());
        invoke.push(format!("return {};", RESULT));
    }

    let mut body = csharp::Tokens::new();
    for line in &plan.before {
        body.push();
        body.append(line.clone());
    }
    block(&mut body, "try", &invoke);
    block(
        &mut body,
        "catch (global::System.Exception __ex)",
        &[
            format!(
                "{}?.SetStatus(global::System.Diagnostics.ActivityStatusCode.Error, __ex.Message);",
                ACTIVITY
            ),
            "throw;".to_string(),
        ],
    );

    let mut tokens = csharp::Tokens::new();
    tokens.append(fact.anchor.attribute_syntax().to_string());
    tokens.push();
    tokens.append(signature);
    tokens.push();
    tokens.append("{");
    tokens.indent();
    tokens.append(body);
    tokens.unindent();
    tokens.append("}");
    tokens
}

/// Append `header { lines }` on fresh lines
fn block(tokens: &mut csharp::Tokens, header: &str, lines: &[String]) {
    tokens.push();
    tokens.append(header.to_string());
    tokens.push();
    tokens.append("{");
    tokens.indent();
    for (i, line) in lines.iter().enumerate() {
        if i > 0 {
            tokens.push();
        }
        tokens.append(line.clone());
    }
    tokens.unindent();
    tokens.append("}");
}

/// Whether the wrapper returns the forwarded call's value
fn returns_value(shape: &CallShape) -> bool {
    let ret = shape.return_type.trim();
    if shape.is_async {
        ret.contains('<')
    } else {
        ret != "void"
    }
}
