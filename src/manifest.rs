//! Manifest host - an in-process [`SemanticModel`] backed by YAML
//!
//! A manifest describes what a compiler host would otherwise answer: the
//! libraries the build references, which marker types are visible, the
//! declared types with their methods and attributes, and the resolved call
//! sites. Call sites can be listed directly or discovered by scanning C#
//! sources with the tree-sitter front end; either way a site only resolves
//! when a `calls` entry exists for its location.
//!
//! ```yaml
//! references: [Npgsql]
//! visible: [Obsweave.TracedAttribute]
//! sources: [src/Orders.cs]
//! types:
//!   - full_name: MyApp.OrderService
//!     methods:
//!       - name: PlaceOrder
//!         return_type: System.Threading.Tasks.Task
//!         attributes:
//!           - class: Obsweave.TracedAttribute
//!             args: [MyApp.Orders]
//! calls:
//!   - unit: src/Orders.cs
//!     line: 12
//!     column: 17
//!     type: MyApp.OrderService
//!     method: PlaceOrder
//! ```

use crate::error::{Error, Result};
use crate::host::{
    Argument, Callee, MethodSymbol, ResolvedCall, SemanticModel, SourceLocation, SyntaxNode,
    TypeSymbol,
};
use crate::model::AnchorHandle;
use crate::scan::scan_csharp;
use crate::util::csharp_verbatim_string;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

/// Attribute the host uses to bind a wrapper to its call site
const INTERCEPTS_LOCATION: &str = "global::System.Runtime.CompilerServices.InterceptsLocation";

/// Manifest file format
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct Manifest {
    /// Identities of referenced libraries
    #[serde(default)]
    pub references: Vec<String>,

    /// Metadata names of visible marker types; omitted means all visible
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visible: Option<Vec<String>>,

    /// C# sources to scan for call sites, relative to the manifest
    #[serde(default)]
    pub sources: Vec<PathBuf>,

    #[serde(default)]
    pub types: Vec<TypeSymbol>,

    #[serde(default)]
    pub calls: Vec<CallSite>,
}

/// A resolved call site
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CallSite {
    pub unit: String,
    pub line: u32,
    pub column: u32,
    /// Full name of the type declaring the invoked method
    #[serde(rename = "type")]
    pub type_name: String,
    pub method: String,
    /// Index among same-named methods of the type
    #[serde(default)]
    pub overload: usize,
    #[serde(default)]
    pub arguments: Vec<Argument>,
    /// Whether the site can be anchored (default true)
    #[serde(default = "default_true")]
    pub anchor: bool,
}

fn default_true() -> bool {
    true
}

impl CallSite {
    pub fn location(&self) -> SourceLocation {
        SourceLocation::new(self.unit.clone(), self.line, self.column)
    }
}

/// [`SemanticModel`] over a loaded [`Manifest`]
#[derive(Debug, Clone)]
pub struct ManifestHost {
    manifest: Manifest,
    base_dir: PathBuf,
    types: HashMap<String, TypeSymbol>,
    calls: HashMap<String, CallSite>,
}

impl ManifestHost {
    /// Load a manifest file; sources resolve relative to its directory
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(Error::Io)?;
        let base_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        Self::from_yaml(&content, base_dir)
    }

    pub fn from_yaml(yaml: &str, base_dir: impl Into<PathBuf>) -> Result<Self> {
        let manifest: Manifest = serde_norway::from_str(yaml)
            .map_err(|e| Error::Manifest(format!("Failed to parse manifest: {}", e)))?;
        Self::new(manifest, base_dir)
    }

    pub fn new(mut manifest: Manifest, base_dir: impl Into<PathBuf>) -> Result<Self> {
        for ty in &mut manifest.types {
            for method in &mut ty.methods {
                if method.containing_type.is_empty() {
                    method.containing_type = ty.full_name.clone();
                }
            }
        }

        let mut types = HashMap::new();
        for ty in &manifest.types {
            if types.insert(ty.full_name.clone(), ty.clone()).is_some() {
                return Err(Error::Manifest(format!("Duplicate type: {}", ty.full_name)));
            }
        }

        let mut calls = HashMap::new();
        for call in &manifest.calls {
            let key = call.location().to_string();
            if calls.insert(key.clone(), call.clone()).is_some() {
                return Err(Error::Manifest(format!("Duplicate call site: {}", key)));
            }
        }

        Ok(Self {
            manifest,
            base_dir: base_dir.into(),
            types,
            calls,
        })
    }

    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    /// Nodes of the program: scanned from `sources`, plus listed call sites
    /// that no scanned node covers
    pub fn nodes(&self) -> Result<Vec<SyntaxNode>> {
        let mut nodes = Vec::new();
        let mut seen = HashSet::new();

        for source in &self.manifest.sources {
            let path = self.base_dir.join(source);
            let text = std::fs::read_to_string(&path).map_err(|e| {
                Error::Manifest(format!("Failed to read source {}: {}", path.display(), e))
            })?;
            let unit = source.to_string_lossy().replace('\\', "/");
            for node in scan_csharp(&unit, &text)? {
                if seen.insert(node.location.to_string()) {
                    nodes.push(node);
                }
            }
        }

        for call in &self.manifest.calls {
            let location = call.location();
            if seen.insert(location.to_string()) {
                nodes.push(SyntaxNode::invocation(
                    Callee::MemberAccess(call.method.clone()),
                    location,
                ));
            }
        }

        tracing::debug!(nodes = nodes.len(), "manifest nodes");
        Ok(nodes)
    }

    fn method(&self, type_name: &str, name: &str, overload: usize) -> Option<&MethodSymbol> {
        self.types
            .get(type_name)?
            .methods
            .iter()
            .filter(|m| m.name == name)
            .nth(overload)
    }
}

impl SemanticModel for ManifestHost {
    fn resolve_call(&self, node: &SyntaxNode) -> Option<ResolvedCall> {
        let call = self.calls.get(&node.location.to_string())?;
        let method = self.method(&call.type_name, &call.method, call.overload);
        if method.is_none() {
            tracing::debug!(
                location = %node.location,
                method = %call.method,
                "call site names an unknown method"
            );
        }
        Some(ResolvedCall {
            method: method?.clone(),
            arguments: call.arguments.clone(),
        })
    }

    fn type_symbol(&self, full_name: &str) -> Option<TypeSymbol> {
        self.types.get(full_name).cloned()
    }

    fn overridden_method(&self, method: &MethodSymbol) -> Option<MethodSymbol> {
        let base = method.overrides.as_deref()?;
        self.method(base, &method.name, 0).cloned()
    }

    fn resolve_anchor(&self, node: &SyntaxNode) -> Option<AnchorHandle> {
        let location = &node.location;
        if location.unit.ends_with(".g.cs") {
            return None;
        }
        if let Some(call) = self.calls.get(&location.to_string()) {
            if !call.anchor {
                return None;
            }
        }
        Some(AnchorHandle::new(format!(
            "[{}({}, {}, {})]",
            INTERCEPTS_LOCATION,
            csharp_verbatim_string(&location.unit),
            location.line,
            location.column
        )))
    }

    fn is_type_visible(&self, metadata_name: &str) -> bool {
        match &self.manifest.visible {
            Some(visible) => visible.iter().any(|v| v == metadata_name),
            None => true,
        }
    }

    fn referenced_libraries(&self) -> Vec<String> {
        self.manifest.references.clone()
    }

    fn declared_types(&self) -> Vec<TypeSymbol> {
        self.manifest.types.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const MANIFEST: &str = r#"
references: [Npgsql]
visible: [Obsweave.TracedAttribute]
types:
  - full_name: MyApp.HandlerBase
    methods:
      - name: Handle
        attributes:
          - class: Obsweave.TracedAttribute
            args: [MyApp.Handlers]
  - full_name: MyApp.OrderHandler
    base_type: MyApp.HandlerBase
    methods:
      - name: Handle
        overrides: MyApp.HandlerBase
      - name: Handle
        parameters:
          - name: id
            type: int
calls:
  - unit: src/Handler.cs
    line: 4
    column: 13
    type: MyApp.OrderHandler
    method: Handle
    overload: 1
    arguments:
      - parameter: id
        constant: 7
  - unit: src/Other.cs
    line: 1
    column: 1
    type: MyApp.OrderHandler
    method: Handle
    anchor: false
"#;

    fn host() -> ManifestHost {
        ManifestHost::from_yaml(MANIFEST, ".").unwrap()
    }

    fn node_at(unit: &str, line: u32, column: u32) -> SyntaxNode {
        SyntaxNode::invocation(
            Callee::MemberAccess("Handle".into()),
            SourceLocation::new(unit, line, column),
        )
    }

    #[test]
    fn test_resolves_overload_and_fills_containing_type() {
        let call = host().resolve_call(&node_at("src/Handler.cs", 4, 13)).unwrap();
        assert_eq!(call.method.containing_type, "MyApp.OrderHandler");
        assert_eq!(call.method.parameters[0].name, "id");
        assert_eq!(call.arguments[0].parameter, "id");
        assert!(host().resolve_call(&node_at("src/Handler.cs", 5, 13)).is_none());
    }

    #[test]
    fn test_overridden_method() {
        let host = host();
        let derived = host.method("MyApp.OrderHandler", "Handle", 0).unwrap();
        let base = host.overridden_method(derived).unwrap();
        assert_eq!(base.containing_type, "MyApp.HandlerBase");
        assert_eq!(base.attributes.len(), 1);
    }

    #[test]
    fn test_anchor_rendering() {
        let host = host();
        let anchor = host.resolve_anchor(&node_at("src/Handler.cs", 4, 13)).unwrap();
        assert_eq!(
            anchor.attribute_syntax(),
            "[global::System.Runtime.CompilerServices.InterceptsLocation(@\"src/Handler.cs\", 4, 13)]"
        );
        assert!(host.resolve_anchor(&node_at("src/Other.cs", 1, 1)).is_none());
        assert!(host.resolve_anchor(&node_at("obj/X.g.cs", 1, 1)).is_none());
    }

    #[test]
    fn test_visibility_and_references() {
        let host = host();
        assert!(host.is_type_visible("Obsweave.TracedAttribute"));
        assert!(!host.is_type_visible("Obsweave.MeterAttribute"));
        assert_eq!(host.referenced_libraries(), vec!["Npgsql".to_string()]);

        let open = ManifestHost::from_yaml("{}", ".").unwrap();
        assert!(open.is_type_visible("Anything"));
    }

    #[test]
    fn test_duplicate_call_sites_are_rejected() {
        let yaml = r#"
calls:
  - {unit: a.cs, line: 1, column: 1, type: A, method: M}
  - {unit: a.cs, line: 1, column: 1, type: A, method: N}
"#;
        let err = ManifestHost::from_yaml(yaml, ".").unwrap_err();
        assert!(err.to_string().contains("Duplicate call site: a.cs:1:1"));
    }

    #[test]
    fn test_nodes_merge_scanned_sources_and_listed_calls() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("src")).unwrap();
        fs::write(
            dir.path().join("src/Handler.cs"),
            "class C\n{\n    void M(H h)\n    {\n        h.Handle(7);\n    }\n}\n",
        )
        .unwrap();
        let yaml = r#"
sources: [src/Handler.cs]
calls:
  - {unit: src/Handler.cs, line: 5, column: 11, type: A, method: Handle}
  - {unit: src/Listed.cs, line: 2, column: 3, type: A, method: Handle}
"#;
        let host = ManifestHost::from_yaml(yaml, dir.path()).unwrap();
        let nodes = host.nodes().unwrap();
        let locations: Vec<String> = nodes.iter().map(|n| n.location.to_string()).collect();
        assert_eq!(locations, vec!["src/Handler.cs:5:11", "src/Listed.cs:2:3"]);
    }
}
