//! Code emission - C# source for interceptors and metric classes
//!
//! Emitters run after the ordering barrier. They are single-pass and keep
//! no state between invocations; everything that must be unique (field
//! names, wrapper names) is derived from the ordered input.
//!
//! Shared pieces live here:
//! - [`IdentifierAllocator`] turns free-form names into unique identifiers
//! - [`TypeQualifier`] rewrites (nested, generic) type names to `global::` form
//! - [`tag_arguments`] applies the 0 / 1 / many tag rendering rule
//! - [`trim_trailing_nulls`] shortens generated constructor calls

mod interceptors;
mod metrics;

pub use interceptors::{render_interceptors, InterceptorConfig};
pub use metrics::render_meter_class;

use crate::util::sanitize_identifier;
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashMap, HashSet};

/// One generated source unit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedUnit {
    /// File name hint, e.g. `Obsweave.Interceptors.Traced.g.cs`
    pub hint_name: String,
    pub source: String,
}

/// Key/value pair type used for every emitted tag
pub(crate) const TAG_PAIR: &str = "global::System.Collections.Generic.KeyValuePair<string, object?>";

/// Short content hash of the lines a unit was generated from
///
/// First 8 bytes of the SHA-256, hex encoded. Only the inputs are hashed,
/// so the value is stable across runs.
pub fn fingerprint(lines: impl IntoIterator<Item = String>) -> String {
    let mut hasher = Sha256::new();
    for line in lines {
        hasher.update(line.as_bytes());
        hasher.update(b"\n");
    }
    hex::encode(&hasher.finalize()[..8])
}

/// Provenance comment lines opening every generated unit
pub(crate) fn header_lines(fingerprint: &str) -> Vec<String> {
    vec![
        "// <auto-generated/>".to_string(),
        format!("// obsweave {}", crate::VERSION),
        format!("// Input: sha256:{}", fingerprint),
    ]
}

// ============================================================================
// Identifiers
// ============================================================================

/// Allocates unique identifiers within one generated unit
///
/// The same raw name always maps to the same identifier. Distinct raw names
/// that sanitize identically get `_1`, `_2`, ... in the order they are first
/// allocated, which is the global fact order.
#[derive(Debug, Default)]
pub struct IdentifierAllocator {
    by_raw: HashMap<String, String>,
    used: HashSet<String>,
}

impl IdentifierAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim a fixed identifier so later allocations steer around it
    pub fn reserve(&mut self, identifier: &str) {
        self.used.insert(identifier.to_string());
    }

    pub fn allocate(&mut self, raw: &str) -> String {
        if let Some(existing) = self.by_raw.get(raw) {
            return existing.clone();
        }
        let candidate = self.fresh(raw);
        self.by_raw.insert(raw.to_string(), candidate.clone());
        candidate
    }

    /// A new identifier for `raw`, even if `raw` was allocated before
    ///
    /// Keywords come back verbatim-escaped (`@event`); suffixed forms never
    /// need escaping.
    pub fn fresh(&mut self, raw: &str) -> String {
        let base = sanitize_identifier(raw);
        let mut candidate = base.clone();
        let mut suffix = 1;
        while self.used.contains(&candidate) {
            candidate = format!("{}_{}", base, suffix);
            suffix += 1;
        }
        self.used.insert(candidate.clone());
        escape_identifier(&candidate)
    }
}

const CSHARP_KEYWORDS: &[&str] = &[
    "abstract", "as", "base", "bool", "break", "byte", "case", "catch", "char", "checked",
    "class", "const", "continue", "decimal", "default", "delegate", "do", "double", "else",
    "enum", "event", "explicit", "extern", "false", "finally", "fixed", "float", "for",
    "foreach", "goto", "if", "implicit", "in", "int", "interface", "internal", "is", "lock",
    "long", "namespace", "new", "null", "object", "operator", "out", "override", "params",
    "private", "protected", "public", "readonly", "ref", "return", "sbyte", "sealed", "short",
    "sizeof", "stackalloc", "static", "string", "struct", "switch", "this", "throw", "true",
    "try", "typeof", "uint", "ulong", "unchecked", "unsafe", "ushort", "using", "virtual",
    "void", "volatile", "while",
];

/// Parameter name safe to use as a C# identifier (`@` prefix for keywords)
pub(crate) fn escape_identifier(name: &str) -> String {
    if CSHARP_KEYWORDS.contains(&name) {
        format!("@{}", name)
    } else {
        name.to_string()
    }
}

// ============================================================================
// Type qualification
// ============================================================================

/// Built-in type keywords, never qualified
const TYPE_KEYWORDS: &[&str] = &[
    "bool", "byte", "sbyte", "char", "decimal", "double", "float", "int", "uint", "nint",
    "nuint", "long", "ulong", "short", "ushort", "object", "string", "void", "dynamic",
];

/// Constraint clause items that are not type names
const CONSTRAINT_KEYWORDS: &[&str] = &[
    "new()", "class", "class?", "struct", "notnull", "unmanaged", "default",
];

/// Simple names of common framework types
const WELL_KNOWN_TYPES: &[&str] = &[
    "System.Threading.Tasks.Task",
    "System.Threading.Tasks.ValueTask",
    "System.Threading.CancellationToken",
    "System.Collections.Generic.Dictionary",
    "System.Collections.Generic.IDictionary",
    "System.Collections.Generic.IReadOnlyDictionary",
    "System.Collections.Generic.List",
    "System.Collections.Generic.IList",
    "System.Collections.Generic.IReadOnlyList",
    "System.Collections.Generic.ICollection",
    "System.Collections.Generic.IReadOnlyCollection",
    "System.Collections.Generic.IEnumerable",
    "System.Collections.Generic.IAsyncEnumerable",
    "System.Collections.Generic.HashSet",
    "System.Collections.Generic.KeyValuePair",
    "System.Data.CommandBehavior",
    "System.Data.Common.DbDataReader",
    "System.Guid",
    "System.DateTime",
    "System.DateTimeOffset",
    "System.TimeSpan",
    "System.Uri",
    "System.Exception",
    "System.IComparable",
    "System.IEquatable",
    "System.Action",
    "System.Func",
    "System.Nullable",
];

/// Rewrites type names so every named type is `global::`-qualified
///
/// Type names are parsed recursively: `Outer<A, B<C>>` splits into the
/// outer name and its top-level arguments, each argument is qualified the
/// same way, and the result is reassembled. Keywords and the wrapper's own
/// type parameters are left alone. Simple names resolve through the
/// framework table and the program's declared types; an unresolved simple
/// name is taken to live in the global namespace.
#[derive(Debug, Clone)]
pub struct TypeQualifier {
    known: BTreeMap<String, String>,
}

impl Default for TypeQualifier {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeQualifier {
    /// Qualifier knowing only the framework types
    pub fn new() -> Self {
        let mut qualifier = Self {
            known: BTreeMap::new(),
        };
        qualifier.extend(WELL_KNOWN_TYPES.iter().copied());
        qualifier
    }

    /// Add full type names; the first full name seen for a simple name wins
    pub fn extend<'a>(&mut self, full_names: impl IntoIterator<Item = &'a str>) {
        for full in full_names {
            let full = full.trim_start_matches("global::");
            let simple = full.rsplit('.').next().unwrap_or(full);
            self.known
                .entry(simple.to_string())
                .or_insert_with(|| full.to_string());
        }
    }

    pub fn qualify(&self, type_name: &str, type_parameters: &[String]) -> String {
        let type_name = type_name.trim();

        if let Some(inner) = type_name
            .strip_prefix('(')
            .and_then(|rest| rest.rfind(')').map(|end| (&rest[..end], &rest[end + 1..])))
        {
            let (elements, suffix) = inner;
            let qualified: Vec<String> = split_top_level(elements)
                .into_iter()
                .map(|element| self.qualify_tuple_element(element, type_parameters))
                .collect();
            return format!("({}){}", qualified.join(", "), suffix);
        }

        match split_generic(type_name) {
            Some((outer, args, suffix)) => {
                let args: Vec<String> = args
                    .into_iter()
                    .map(|a| self.qualify(a, type_parameters))
                    .collect();
                format!(
                    "{}<{}>{}",
                    self.qualify_leaf(outer, type_parameters),
                    args.join(", "),
                    suffix
                )
            }
            None => {
                let (leaf, suffix) = split_suffix(type_name);
                format!("{}{}", self.qualify_leaf(leaf, type_parameters), suffix)
            }
        }
    }

    /// Qualify each type in a `where` clause body, e.g. `IOrder, new()`
    ///
    /// Constraint keywords pass through unchanged.
    pub fn qualify_constraint(&self, constraint: &str, type_parameters: &[String]) -> String {
        split_top_level(constraint)
            .into_iter()
            .filter(|item| !item.is_empty())
            .map(|item| {
                if CONSTRAINT_KEYWORDS.contains(&item) {
                    item.to_string()
                } else {
                    self.qualify(item, type_parameters)
                }
            })
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn qualify_tuple_element(&self, element: &str, type_parameters: &[String]) -> String {
        // `int Id` / `Order order` - type followed by an optional element name
        let element = element.trim();
        match element.rfind(' ') {
            Some(i) if depth_at(element, i) == 0 => format!(
                "{} {}",
                self.qualify(&element[..i], type_parameters),
                &element[i + 1..]
            ),
            _ => self.qualify(element, type_parameters),
        }
    }

    fn qualify_leaf(&self, leaf: &str, type_parameters: &[String]) -> String {
        let leaf = leaf.trim();
        if leaf.is_empty()
            || leaf.starts_with("global::")
            || TYPE_KEYWORDS.contains(&leaf)
            || type_parameters.iter().any(|p| p == leaf)
        {
            return leaf.to_string();
        }
        if leaf.contains('.') {
            return format!("global::{}", leaf);
        }
        match self.known.get(leaf) {
            Some(full) => format!("global::{}", full),
            None => format!("global::{}", leaf),
        }
    }
}

/// Split `Outer<A, B<C>>?` into `("Outer", ["A", "B<C>"], "?")`
///
/// Returns `None` for names without a generic argument list.
pub fn split_generic(type_name: &str) -> Option<(&str, Vec<&str>, &str)> {
    let open = type_name.find('<')?;
    let mut depth = 0usize;
    let mut args = Vec::new();
    let mut start = open + 1;

    for (i, c) in type_name.char_indices().skip_while(|(i, _)| *i < open) {
        match c {
            '<' | '(' | '[' => depth += 1,
            '>' | ')' | ']' => {
                depth = depth.saturating_sub(1);
                if depth == 0 && c == '>' {
                    args.push(type_name[start..i].trim());
                    return Some((&type_name[..open], args, &type_name[i + 1..]));
                }
            }
            ',' if depth == 1 => {
                args.push(type_name[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }

    // Unbalanced; treat as a plain name
    None
}

/// Split comma-separated items at nesting depth zero
fn split_top_level(s: &str) -> Vec<&str> {
    let mut items = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, c) in s.char_indices() {
        match c {
            '<' | '(' | '[' => depth += 1,
            '>' | ')' | ']' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                items.push(s[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    items.push(s[start..].trim());
    items
}

fn depth_at(s: &str, index: usize) -> usize {
    s[..index].chars().fold(0usize, |depth, c| match c {
        '<' | '(' | '[' => depth + 1,
        '>' | ')' | ']' => depth.saturating_sub(1),
        _ => depth,
    })
}

/// Split a trailing nullable / array suffix off a simple name
fn split_suffix(name: &str) -> (&str, &str) {
    let end = name
        .find(|c: char| c == '?' || c == '[')
        .unwrap_or(name.len());
    (&name[..end], &name[end..])
}

// ============================================================================
// Tags and arguments
// ============================================================================

/// How a list of tags is passed to an instrument or activity
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagArgs {
    /// No tags: the bare call
    None,
    /// One tag: a single inline key/value pair expression
    Single(String),
    /// Several tags: a named array declared before the call
    Array { declaration: String, name: String },
}

/// Apply the tag rendering rule to `(tag name, value expression)` pairs
pub fn tag_arguments(tags: &[(String, String)], array_name: &str) -> TagArgs {
    let pair = |(key, value): &(String, String)| {
        format!("new {}({}, {})", TAG_PAIR, crate::util::csharp_string(key), value)
    };
    match tags {
        [] => TagArgs::None,
        [single] => TagArgs::Single(pair(single)),
        many => {
            let items: Vec<String> = many
                .iter()
                .map(|(key, value)| format!("new({}, {})", crate::util::csharp_string(key), value))
                .collect();
            TagArgs::Array {
                declaration: format!(
                    "var {} = new {}[] {{ {} }};",
                    array_name,
                    TAG_PAIR,
                    items.join(", ")
                ),
                name: array_name.to_string(),
            }
        }
    }
}

/// Drop the maximal run of trailing `null` / `default` arguments
///
/// Interior nulls stay: `["\"m\"", "null", "\"text\""]` is unchanged.
pub fn trim_trailing_nulls(mut args: Vec<String>) -> Vec<String> {
    while args
        .last()
        .is_some_and(|a| a == "null" || a == "default")
    {
        args.pop();
    }
    args
}
