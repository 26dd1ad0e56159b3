//! Invocation facts - the core data model
//!
//! A classifier turns one call site into an [`InvocationFact`]. Facts are
//! created fresh on every pass, ordered by [`OrderKey`], rendered, and
//! dropped; nothing here is cached between passes.
//!
//! ```text
//! SyntaxNode ──classify──► InvocationFact { order_key, anchor, invocation }
//!                                               │
//!                          ┌────────────────────┼───────────────────┐
//!                          ▼                    ▼                   ▼
//!                  TracedInvocation       DbInvocation       GenAiInvocation
//! ```

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Order key and anchor
// ============================================================================

/// Deterministic sort key: `"{source-unit}:{line}:{column}"`
///
/// Compared ordinally as a string. Line and column are not zero-padded,
/// so `a.cs:10:1` sorts before `a.cs:9:1`; what matters is that the
/// order is total and independent of discovery order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct OrderKey(String);

impl OrderKey {
    pub fn new(unit: &str, line: u32, column: u32) -> Self {
        Self(format!("{}:{}:{}", unit, line, column))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OrderKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque host capability binding generated code to one call site
///
/// The core never builds these; it receives them from
/// [`SemanticModel::resolve_anchor`](crate::host::SemanticModel::resolve_anchor)
/// and copies the attribute text verbatim onto the generated wrapper.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AnchorHandle {
    attribute: String,
}

impl AnchorHandle {
    /// Host-side constructor: `attribute` is the complete C# attribute
    /// (including brackets) that binds a method to the call site
    pub fn new(attribute: impl Into<String>) -> Self {
        Self {
            attribute: attribute.into(),
        }
    }

    pub fn attribute_syntax(&self) -> &str {
        &self.attribute
    }
}

// ============================================================================
// Shared pieces
// ============================================================================

/// Generic parameter of an intercepted method
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct TypeParameterInfo {
    pub name: String,
    /// Constraint clause body, e.g. `new()` or `class, IDisposable`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constraint: Option<String>,
}

impl TypeParameterInfo {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            constraint: None,
        }
    }

    pub fn with_constraint(mut self, constraint: impl Into<String>) -> Self {
        self.constraint = Some(constraint.into());
        self
    }
}

/// Parameter forwarded by a generated wrapper
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterInfo {
    pub name: String,
    pub type_name: String,
}

/// Everything an emitter needs to reproduce the intercepted call's signature
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallShape {
    /// Full name of the declaring (receiver) type
    pub declaring_type: String,
    pub method_name: String,
    pub is_static: bool,
    pub is_async: bool,
    pub return_type: String,
    pub parameters: Vec<ParameterInfo>,
    pub type_parameters: Vec<TypeParameterInfo>,
}

// ============================================================================
// Traced
// ============================================================================

/// Span kind decoded from the marker's `Kind` integer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
pub enum SpanKind {
    #[default]
    Internal,
    Server,
    Client,
    Producer,
    Consumer,
}

impl SpanKind {
    /// Decode the marker's integer; unknown values fall back to `Internal`
    pub fn from_code(code: i64) -> Self {
        match code {
            1 => SpanKind::Server,
            2 => SpanKind::Client,
            3 => SpanKind::Producer,
            4 => SpanKind::Consumer,
            _ => SpanKind::Internal,
        }
    }

    /// Member name on `System.Diagnostics.ActivityKind`
    pub fn activity_kind(self) -> &'static str {
        match self {
            SpanKind::Internal => "Internal",
            SpanKind::Server => "Server",
            SpanKind::Client => "Client",
            SpanKind::Producer => "Producer",
            SpanKind::Consumer => "Consumer",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TracedTagInfo {
    pub parameter_name: String,
    pub tag_name: String,
    pub skip_if_null: bool,
    pub nullable: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TracedInvocation {
    /// Activity source name from the marker's constructor argument
    pub source_name: String,
    pub span_name: String,
    pub kind: SpanKind,
    pub tags: Vec<TracedTagInfo>,
    pub shape: CallShape,
}

// ============================================================================
// Database
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbInvocation {
    /// `read`, `non_query` or `scalar`
    pub operation: String,
    pub provider_id: Option<String>,
    /// Driver type, recorded only when it differs from the base command type
    pub concrete_type: Option<String>,
    pub shape: CallShape,
}

// ============================================================================
// Generative AI
// ============================================================================

/// Token-usage member paths read off the call's result
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
pub struct TokenUsagePaths {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
}

impl TokenUsagePaths {
    pub fn is_empty(&self) -> bool {
        self.input.is_none() && self.output.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenAiInvocation {
    /// `chat`, `embeddings`, `text_completion`, ...
    pub operation: String,
    pub provider_id: String,
    /// Statically known model argument
    pub model: Option<String>,
    pub token_usage: TokenUsagePaths,
    pub shape: CallShape,
}

// ============================================================================
// Facts
// ============================================================================

/// Domain-specific part of a fact
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Invocation {
    Traced(TracedInvocation),
    Db(DbInvocation),
    GenAi(GenAiInvocation),
}

impl Invocation {
    pub fn domain(&self) -> Domain {
        match self {
            Invocation::Traced(_) => Domain::Traced,
            Invocation::Db(_) => Domain::Db,
            Invocation::GenAi(_) => Domain::GenAi,
        }
    }

    pub fn shape(&self) -> &CallShape {
        match self {
            Invocation::Traced(t) => &t.shape,
            Invocation::Db(d) => &d.shape,
            Invocation::GenAi(g) => &g.shape,
        }
    }
}

/// Interception domain; declaration order is the precedence used when two
/// classifiers claim the same call site
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Domain {
    Traced,
    Db,
    GenAi,
}

impl Domain {
    /// Name segment used in `Intercept_<Domain>_<index>`
    pub fn as_str(self) -> &'static str {
        match self {
            Domain::Traced => "Traced",
            Domain::Db => "Db",
            Domain::GenAi => "GenAi",
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One classified call site
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvocationFact {
    pub order_key: OrderKey,
    /// `None` when the host could not anchor the call; dropped before ordering
    pub anchor: Option<AnchorHandle>,
    pub invocation: Invocation,
}

// ============================================================================
// Metrics
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum MetricKind {
    Counter,
    Histogram,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricTagInfo {
    pub parameter_name: String,
    pub tag_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricMethodInfo {
    pub method_name: String,
    pub accessibility: String,
    /// Mirrors the partial declaration; both halves must agree
    pub is_static: bool,
    pub kind: MetricKind,
    pub metric_name: String,
    pub unit: Option<String>,
    pub description: Option<String>,
    /// Instrument value type, e.g. `long` or `double`
    pub value_type: String,
    /// Histogram value parameter; counters have none
    pub value_parameter: Option<String>,
    pub tags: Vec<MetricTagInfo>,
    /// Declared parameters in order, for the implementing declaration
    pub parameters: Vec<ParameterInfo>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeterClassInfo {
    pub namespace: Option<String>,
    pub class_name: String,
    pub is_static: bool,
    pub meter_name: String,
    pub meter_version: Option<String>,
    pub methods: Vec<MetricMethodInfo>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_key_format() {
        let key = OrderKey::new("src/Orders.cs", 12, 9);
        assert_eq!(key.as_str(), "src/Orders.cs:12:9");
    }

    #[test]
    fn test_order_key_is_ordinal() {
        let a = OrderKey::new("a.cs", 10, 1);
        let b = OrderKey::new("a.cs", 9, 1);
        // Ordinal, not numeric
        assert!(a < b);
        assert!(OrderKey::new("A.cs", 1, 1) < OrderKey::new("a.cs", 1, 1));
    }

    #[test]
    fn test_span_kind_codes() {
        assert_eq!(SpanKind::from_code(0), SpanKind::Internal);
        assert_eq!(SpanKind::from_code(2), SpanKind::Client);
        assert_eq!(SpanKind::from_code(4), SpanKind::Consumer);
        assert_eq!(SpanKind::from_code(42), SpanKind::Internal);
        assert_eq!(SpanKind::from_code(-1), SpanKind::Internal);
    }

    #[test]
    fn test_domain_precedence() {
        assert!(Domain::Traced < Domain::Db);
        assert!(Domain::Db < Domain::GenAi);
    }
}
