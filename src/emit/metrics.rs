//! Metric method emission
//!
//! Completes a meter class's partial declaration: one `Meter`, one
//! instrument field per metric method, and the implementing declaration of
//! each partial method.

use super::{
    escape_identifier, fingerprint, header_lines, tag_arguments, trim_trailing_nulls,
    GeneratedUnit, IdentifierAllocator, TagArgs, TypeQualifier,
};
use crate::error::Result;
use crate::model::{MeterClassInfo, MetricKind, MetricMethodInfo};
use crate::util::{csharp_string, to_camel_case};
use genco::prelude::*;

const METRICS: &str = "global::System.Diagnostics.Metrics";
const METER_FIELD: &str = "s_meter";
const TAGS: &str = "__tags";

/// Render the generated half of a meter class
pub fn render_meter_class(info: &MeterClassInfo, qualifier: &TypeQualifier) -> Result<GeneratedUnit> {
    let mut ids = IdentifierAllocator::new();
    ids.reserve(METER_FIELD);

    let meter_args = trim_trailing_nulls(vec![
        csharp_string(&info.meter_name),
        optional_literal(info.meter_version.as_deref()),
    ]);
    let mut fields = vec![format!(
        "private static readonly {}.Meter {} = new({});",
        METRICS,
        METER_FIELD,
        meter_args.join(", ")
    )];

    let mut methods: Vec<csharp::Tokens> = Vec::new();
    for method in &info.methods {
        let field = ids.fresh(&format!("s_{}", to_camel_case(&method.method_name)));
        fields.push(instrument_field(method, &field, qualifier));
        methods.push(forwarding_method(method, &field, qualifier));
    }

    let full_name = match &info.namespace {
        Some(ns) => format!("{}.{}", ns, info.class_name),
        None => info.class_name.clone(),
    };
    let header = header_lines(&fingerprint(
        std::iter::once(format!("{} {}", full_name, info.meter_name)).chain(
            info.methods
                .iter()
                .map(|m| format!("{} {}", m.method_name, m.metric_name)),
        ),
    ));
    let modifiers = if info.is_static {
        "static partial class"
    } else {
        "partial class"
    };
    let has_methods = !methods.is_empty();

    let class: csharp::Tokens = quote! {
        $modifiers $(&info.class_name)
        {
            $(for field in &fields join ($['\r']) => $field)
            $(if has_methods => $['\n'])
            $(for method in methods join ($['\n']) => $method)
        }
    };

    let tokens: csharp::Tokens = match &info.namespace {
        Some(ns) => quote! {
            $(for line in &header join ($['\r']) => $line)
            $("#nullable enable")
            $['\n']
            namespace $ns
            {
                $class
            }
        },
        None => quote! {
            $(for line in &header join ($['\r']) => $line)
            $("#nullable enable")
            $['\n']
            $class
        },
    };

    Ok(GeneratedUnit {
        hint_name: format!("Obsweave.Meter.{}.g.cs", full_name),
        source: tokens.to_file_string()?,
    })
}

fn optional_literal(value: Option<&str>) -> String {
    value.map(csharp_string).unwrap_or_else(|| "null".to_string())
}

fn instrument_field(method: &MetricMethodInfo, field: &str, qualifier: &TypeQualifier) -> String {
    let (instrument, factory) = match method.kind {
        MetricKind::Counter => ("Counter", "CreateCounter"),
        MetricKind::Histogram => ("Histogram", "CreateHistogram"),
    };
    let value_type = qualifier.qualify(&method.value_type, &[]);
    let args = trim_trailing_nulls(vec![
        csharp_string(&method.metric_name),
        optional_literal(method.unit.as_deref()),
        optional_literal(method.description.as_deref()),
    ]);
    format!(
        "private static readonly {}.{}<{}> {} = {}.{}<{}>({});",
        METRICS,
        instrument,
        value_type,
        field,
        METER_FIELD,
        factory,
        value_type,
        args.join(", ")
    )
}

fn forwarding_method(method: &MetricMethodInfo, field: &str, qualifier: &TypeQualifier) -> csharp::Tokens {
    let params: Vec<String> = method
        .parameters
        .iter()
        .map(|p| format!("{} {}", qualifier.qualify(&p.type_name, &[]), escape_identifier(&p.name)))
        .collect();
    let modifiers = if method.is_static {
        "static partial"
    } else {
        "partial"
    };
    let signature = format!(
        "{} {} void {}({})",
        method.accessibility,
        modifiers,
        method.method_name,
        params.join(", ")
    );

    let (record, value) = match (&method.kind, &method.value_parameter) {
        (MetricKind::Histogram, Some(value)) => ("Record", escape_identifier(value)),
        _ => ("Add", "1".to_string()),
    };
    let tags: Vec<(String, String)> = method
        .tags
        .iter()
        .map(|t| (t.tag_name.clone(), escape_identifier(&t.parameter_name)))
        .collect();

    let mut body = Vec::new();
    match tag_arguments(&tags, TAGS) {
        TagArgs::None => body.push(format!("{}.{}({});", field, record, value)),
        TagArgs::Single(pair) => body.push(format!("{}.{}({}, {});", field, record, value, pair)),
        TagArgs::Array { declaration, name } => {
            body.push(declaration);
            body.push(format!("{}.{}({}, {});", field, record, value, name));
        }
    }

    quote! {
        $signature
        {
            $(for line in body join ($['\r']) => $line)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{MetricTagInfo, ParameterInfo};
    use pretty_assertions::assert_eq;

    fn param(name: &str, ty: &str) -> ParameterInfo {
        ParameterInfo {
            name: name.into(),
            type_name: ty.into(),
        }
    }

    fn tag(name: &str, tag: &str) -> MetricTagInfo {
        MetricTagInfo {
            parameter_name: name.into(),
            tag_name: tag.into(),
        }
    }

    fn counter(name: &str, metric: &str) -> MetricMethodInfo {
        MetricMethodInfo {
            method_name: name.into(),
            accessibility: "public".into(),
            is_static: true,
            kind: MetricKind::Counter,
            metric_name: metric.into(),
            unit: None,
            description: None,
            value_type: "long".into(),
            value_parameter: None,
            tags: vec![],
            parameters: vec![],
        }
    }

    fn class(methods: Vec<MetricMethodInfo>) -> MeterClassInfo {
        MeterClassInfo {
            namespace: Some("Shop.Telemetry".into()),
            class_name: "OrderMetrics".into(),
            is_static: true,
            meter_name: "Shop.Orders".into(),
            meter_version: None,
            methods,
        }
    }

    fn render(info: &MeterClassInfo) -> GeneratedUnit {
        render_meter_class(info, &TypeQualifier::new()).unwrap()
    }

    #[test]
    fn test_name_only_counter() {
        let unit = render(&class(vec![counter("OrderPlaced", "orders.placed")]));
        assert_eq!(unit.hint_name, "Obsweave.Meter.Shop.Telemetry.OrderMetrics.g.cs");
        let src = &unit.source;
        assert!(src.contains("namespace Shop.Telemetry"));
        assert!(src.contains("static partial class OrderMetrics"));
        assert!(src.contains(
            "private static readonly global::System.Diagnostics.Metrics.Meter s_meter = new(\"Shop.Orders\");"
        ));
        assert!(src.contains(
            "private static readonly global::System.Diagnostics.Metrics.Counter<long> s_orderPlaced = s_meter.CreateCounter<long>(\"orders.placed\");"
        ));
        assert!(src.contains("public static partial void OrderPlaced()"));
        assert!(src.contains("s_orderPlaced.Add(1);"));
    }

    #[test]
    fn test_interior_null_is_kept() {
        let histogram = MetricMethodInfo {
            kind: MetricKind::Histogram,
            description: Some("text".into()),
            value_type: "double".into(),
            value_parameter: Some("value".into()),
            parameters: vec![param("value", "double")],
            ..counter("Record", "m")
        };
        let src = render(&class(vec![histogram])).source;
        assert!(src.contains("s_meter.CreateHistogram<double>(\"m\", null, \"text\");"));
        assert!(src.contains("public static partial void Record(double value)"));
        assert!(src.contains("s_record.Record(value);"));
    }

    #[test]
    fn test_versioned_meter_and_tags() {
        let mut info = class(vec![
            MetricMethodInfo {
                tags: vec![tag("region", "shop.region")],
                parameters: vec![param("region", "string")],
                unit: Some("{order}".into()),
                ..counter("OrderPlaced", "orders.placed")
            },
            MetricMethodInfo {
                kind: MetricKind::Histogram,
                value_type: "double".into(),
                value_parameter: Some("value".into()),
                tags: vec![tag("currency", "currency"), tag("event", "kind")],
                parameters: vec![
                    param("currency", "string"),
                    param("value", "double"),
                    param("event", "string"),
                ],
                ..counter("RecordAmount", "orders.amount")
            },
        ]);
        info.meter_version = Some("1.0.0".into());

        let src = render(&info).source;
        assert!(src.contains("Meter s_meter = new(\"Shop.Orders\", \"1.0.0\");"));
        assert!(src.contains("s_meter.CreateCounter<long>(\"orders.placed\", \"{order}\");"));
        assert!(src.contains(
            "s_orderPlaced.Add(1, new global::System.Collections.Generic.KeyValuePair<string, object?>(\"shop.region\", region));"
        ));
        assert!(src.contains(
            "public static partial void RecordAmount(string currency, double value, string @event)"
        ));
        assert!(src.contains(
            "var __tags = new global::System.Collections.Generic.KeyValuePair<string, object?>[] { new(\"currency\", currency), new(\"kind\", @event) };"
        ));
        assert!(src.contains("s_recordAmount.Record(value, __tags);"));
    }

    #[test]
    fn test_instrument_fields_do_not_collide() {
        // `Meter` would camel-case onto the meter field itself
        let info = class(vec![counter("Meter", "a"), counter("meter", "b")]);
        let src = render(&info).source;
        assert!(src.contains("Counter<long> s_meter_1 = s_meter.CreateCounter<long>(\"a\");"));
        assert!(src.contains("Counter<long> s_meter_2 = s_meter.CreateCounter<long>(\"b\");"));
    }

    #[test]
    fn test_global_namespace_class() {
        let mut info = class(vec![]);
        info.namespace = None;
        info.is_static = false;
        let unit = render(&info);
        assert_eq!(unit.hint_name, "Obsweave.Meter.OrderMetrics.g.cs");
        assert!(!unit.source.contains("namespace"));
        assert!(unit.source.contains("partial class OrderMetrics"));
        assert!(!unit.source.contains("static partial class"));
    }

    #[test]
    fn test_instance_method_in_instance_class() {
        let mut info = class(vec![MetricMethodInfo {
            is_static: false,
            ..counter("Placed", "orders.placed")
        }]);
        info.is_static = false;
        let src = render(&info).source;
        assert!(src.contains("public partial void Placed()"));
        assert!(!src.contains("static partial void"));
        // Instrument fields stay static
        assert!(src.contains("private static readonly global::System.Diagnostics.Metrics.Counter<long> s_placed"));
        assert!(src.contains("s_placed.Add(1);"));
    }
}
