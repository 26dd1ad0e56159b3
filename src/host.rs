//! Host contracts - what the surrounding compiler supplies
//!
//! obsweave does not parse or type-check the program itself. A host hands
//! it a stream of [`SyntaxNode`]s and answers semantic questions through
//! [`SemanticModel`]: what method does this call resolve to, what is the base
//! type of this type, where can generated code anchor to this call site.
//!
//! The symbol records here are plain data so that a host can build them from
//! any front end; the in-process [`crate::manifest`] host deserializes them
//! straight from YAML.

use crate::model::{AnchorHandle, OrderKey, TypeParameterInfo};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

// ============================================================================
// Syntax
// ============================================================================

/// Position of a call site: source unit plus 1-based line and column
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub struct SourceLocation {
    pub unit: String,
    pub line: u32,
    pub column: u32,
}

impl SourceLocation {
    pub fn new(unit: impl Into<String>, line: u32, column: u32) -> Self {
        Self {
            unit: unit.into(),
            line,
            column,
        }
    }

    /// Order key for a fact discovered at this location
    pub fn order_key(&self) -> OrderKey {
        OrderKey::new(&self.unit, self.line, self.column)
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.unit, self.line, self.column)
    }
}

/// Coarse syntactic kind of a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum SyntaxKind {
    Invocation,
    ObjectCreation,
    MemberAccess,
    Other,
}

/// Shape of the expression being invoked
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case", tag = "shape", content = "name")]
pub enum Callee {
    /// `Foo(...)` or `Foo<T>(...)`
    Identifier(String),
    /// `x.Foo(...)`, `Type.Foo(...)`, `x?.Foo(...)`
    MemberAccess(String),
    /// Delegate calls, parenthesized expressions, anything else
    Other,
}

impl Callee {
    pub fn name(&self) -> Option<&str> {
        match self {
            Callee::Identifier(n) | Callee::MemberAccess(n) => Some(n),
            Callee::Other => None,
        }
    }
}

/// One node of the host program as seen by the candidate scanner
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct SyntaxNode {
    pub kind: SyntaxKind,
    pub callee: Callee,
    pub location: SourceLocation,
}

impl SyntaxNode {
    pub fn invocation(callee: Callee, location: SourceLocation) -> Self {
        Self {
            kind: SyntaxKind::Invocation,
            callee,
            location,
        }
    }
}

// ============================================================================
// Symbols
// ============================================================================

/// A compile-time constant as it appears in attribute and call arguments
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum ConstantValue {
    Bool(bool),
    Int(i64),
    Str(String),
    Null,
}

impl ConstantValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ConstantValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ConstantValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            ConstantValue::Int(i) => Some(*i),
            _ => None,
        }
    }
}

/// An attribute application on a type, method or parameter
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
pub struct AttributeData {
    /// Full metadata name of the attribute class
    pub class: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<ConstantValue>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub named: BTreeMap<String, ConstantValue>,
}

impl AttributeData {
    pub fn new(class: impl Into<String>) -> Self {
        Self {
            class: class.into(),
            ..Default::default()
        }
    }

    pub fn with_arg(mut self, value: ConstantValue) -> Self {
        self.args.push(value);
        self
    }

    pub fn with_named(mut self, name: impl Into<String>, value: ConstantValue) -> Self {
        self.named.insert(name.into(), value);
        self
    }
}

/// Find the first attribute of the given class
pub fn find_attribute<'a>(attributes: &'a [AttributeData], class: &str) -> Option<&'a AttributeData> {
    attributes.iter().find(|a| a.class == class)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ParameterSymbol {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default)]
    pub nullable: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attributes: Vec<AttributeData>,
}

impl ParameterSymbol {
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
            nullable: false,
            attributes: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct MethodSymbol {
    pub name: String,
    /// Full name of the declaring type, filled in by the host
    #[serde(default)]
    pub containing_type: String,
    #[serde(default)]
    pub is_static: bool,
    #[serde(default)]
    pub is_partial: bool,
    #[serde(default = "default_accessibility")]
    pub accessibility: String,
    #[serde(default = "default_return_type")]
    pub return_type: String,
    #[serde(default)]
    pub parameters: Vec<ParameterSymbol>,
    #[serde(default)]
    pub type_parameters: Vec<TypeParameterInfo>,
    #[serde(default)]
    pub attributes: Vec<AttributeData>,
    /// Full name of the type declaring the method this one overrides
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overrides: Option<String>,
}

fn default_accessibility() -> String {
    "public".into()
}

fn default_return_type() -> String {
    "void".into()
}

impl MethodSymbol {
    pub fn new(name: impl Into<String>, containing_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            containing_type: containing_type.into(),
            is_static: false,
            is_partial: false,
            accessibility: default_accessibility(),
            return_type: default_return_type(),
            parameters: Vec::new(),
            type_parameters: Vec::new(),
            attributes: Vec::new(),
            overrides: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
pub struct TypeSymbol {
    /// Namespace-qualified name, e.g. `MyApp.Data.OrderService`
    pub full_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_type: Option<String>,
    #[serde(default)]
    pub is_static: bool,
    #[serde(default)]
    pub is_partial: bool,
    #[serde(default)]
    pub attributes: Vec<AttributeData>,
    #[serde(default)]
    pub methods: Vec<MethodSymbol>,
}

impl TypeSymbol {
    pub fn new(full_name: impl Into<String>) -> Self {
        Self {
            full_name: full_name.into(),
            ..Default::default()
        }
    }

    /// Simple name without namespace
    pub fn name(&self) -> &str {
        self.full_name.rsplit('.').next().unwrap_or(&self.full_name)
    }

    /// Namespace, or `None` for types in the global namespace
    pub fn namespace(&self) -> Option<&str> {
        self.full_name.rsplit_once('.').map(|(ns, _)| ns)
    }
}

/// An argument at a call site, bound to the parameter it fills
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Argument {
    pub parameter: String,
    /// Present when the argument is a compile-time constant
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constant: Option<ConstantValue>,
}

/// The host's answer to "what does this call invoke"
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedCall {
    pub method: MethodSymbol,
    pub arguments: Vec<Argument>,
}

// ============================================================================
// Semantic model
// ============================================================================

/// Semantic queries answered by the host
///
/// Implementations must be side-effect free: classifiers call them from
/// several threads at once and may call them again on re-evaluation.
pub trait SemanticModel: Sync {
    /// Resolve the method invoked at `node`
    fn resolve_call(&self, node: &SyntaxNode) -> Option<ResolvedCall>;

    /// Look up a type by full name (used to walk base-type chains)
    fn type_symbol(&self, full_name: &str) -> Option<TypeSymbol>;

    /// The base-class method that `method` overrides, if any
    fn overridden_method(&self, method: &MethodSymbol) -> Option<MethodSymbol>;

    /// Anchor generated code to the call at `node`; `None` when the site
    /// cannot be uniquely anchored (generated or excluded source)
    fn resolve_anchor(&self, node: &SyntaxNode) -> Option<AnchorHandle>;

    /// Whether the type with this metadata name is visible to the build
    fn is_type_visible(&self, metadata_name: &str) -> bool;

    /// Identities of the libraries the build references
    fn referenced_libraries(&self) -> Vec<String>;

    /// Types declared in the program being built
    fn declared_types(&self) -> Vec<TypeSymbol>;
}

// ============================================================================
// Cancellation
// ============================================================================

/// Cooperative cancellation flag shared between the caller and the pipeline
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    /// `Err(Error::Cancelled)` once [`cancel`](Self::cancel) has been called
    pub fn check(&self) -> crate::Result<()> {
        if self.is_cancelled() {
            Err(crate::Error::Cancelled)
        } else {
            Ok(())
        }
    }
}
