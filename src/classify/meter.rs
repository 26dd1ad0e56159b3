//! Meter classifier - declarative metric classes
//!
//! A type carrying the meter marker becomes a [`MeterClassInfo`]. Its
//! partial methods marked as counters or histograms become metric methods;
//! everything else on the type is ignored.

use crate::config::MarkerConfig;
use crate::host::{find_attribute, AttributeData, MethodSymbol, TypeSymbol};
use crate::model::{MeterClassInfo, MetricKind, MetricMethodInfo, MetricTagInfo, ParameterInfo};

const COUNTER_VALUE_TYPE: &str = "long";

/// Describe `ty` as a meter class, or `None` if it is not one
pub fn classify_meter(ty: &TypeSymbol, markers: &MarkerConfig) -> Option<MeterClassInfo> {
    let meter = find_attribute(&ty.attributes, &markers.meter)?;
    let meter_name = non_empty(meter.args.first().and_then(|a| a.as_str()))?;

    let methods: Vec<_> = ty
        .methods
        .iter()
        .filter(|m| m.is_partial)
        .filter_map(|m| metric_method(m, markers))
        .collect();

    Some(MeterClassInfo {
        namespace: ty.namespace().map(str::to_string),
        class_name: ty.name().to_string(),
        is_static: ty.is_static,
        meter_name,
        meter_version: non_empty(meter.named.get("Version").and_then(|v| v.as_str())),
        methods,
    })
}

fn metric_method(method: &MethodSymbol, markers: &MarkerConfig) -> Option<MetricMethodInfo> {
    let (kind, attr) = match find_attribute(&method.attributes, &markers.counter) {
        Some(a) => (MetricKind::Counter, a),
        None => (
            MetricKind::Histogram,
            find_attribute(&method.attributes, &markers.histogram)?,
        ),
    };
    let metric_name = non_empty(attr.args.first().and_then(|a| a.as_str()))?;

    let value_index = match kind {
        MetricKind::Counter => None,
        MetricKind::Histogram => {
            if method.parameters.is_empty() {
                tracing::debug!(method = %method.name, "histogram without a value parameter");
                return None;
            }
            Some(
                method
                    .parameters
                    .iter()
                    .position(|p| p.name == "value")
                    .unwrap_or(0),
            )
        }
    };

    let value_type = match value_index {
        Some(i) => method.parameters[i].type_name.clone(),
        None => COUNTER_VALUE_TYPE.to_string(),
    };

    let tags = method
        .parameters
        .iter()
        .enumerate()
        .filter(|(i, _)| Some(*i) != value_index)
        .map(|(_, p)| MetricTagInfo {
            parameter_name: p.name.clone(),
            tag_name: tag_name(find_attribute(&p.attributes, &markers.tag)).unwrap_or_else(|| p.name.clone()),
        })
        .collect();

    Some(MetricMethodInfo {
        method_name: method.name.clone(),
        accessibility: method.accessibility.clone(),
        is_static: method.is_static,
        kind,
        metric_name,
        unit: non_empty(attr.named.get("Unit").and_then(|v| v.as_str())),
        description: non_empty(attr.named.get("Description").and_then(|v| v.as_str())),
        value_type,
        value_parameter: value_index.map(|i| method.parameters[i].name.clone()),
        tags,
        parameters: method
            .parameters
            .iter()
            .map(|p| ParameterInfo {
                name: p.name.clone(),
                type_name: p.type_name.clone(),
            })
            .collect(),
    })
}

fn tag_name(attr: Option<&AttributeData>) -> Option<String> {
    non_empty(attr?.args.first().and_then(|a| a.as_str()))
}

fn non_empty(s: Option<&str>) -> Option<String> {
    s.filter(|s| !s.is_empty()).map(str::to_string)
}
