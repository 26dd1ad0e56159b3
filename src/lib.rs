// Production-quality lints
#![warn(
    clippy::todo,
    clippy::unimplemented,
    clippy::dbg_macro,
    clippy::print_stdout,
    clippy::print_stderr
)]
// Deny truly dangerous patterns
#![deny(clippy::mem_forget)]
// Allow common patterns in library code
#![allow(clippy::missing_errors_doc, clippy::missing_panics_doc)]

//! # obsweave - call-site interceptor synthesis
//!
//! obsweave finds call sites worth observing in a C# program and generates
//! wrapper methods that add spans, tags and metrics around them, without
//! touching the original call text.
//!
//! Three kinds of call are recognized:
//!
//! - **Database**: `Execute*` calls on a type deriving from `DbCommand`
//! - **GenAI**: completion and embedding calls on known client libraries
//! - **Traced**: calls to methods carrying the traced marker attribute
//!
//! Declaratively attributed meter classes additionally get their partial
//! metric methods implemented.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use obsweave::{CancellationToken, GeneratorConfig, ManifestHost, Pipeline};
//!
//! let host = ManifestHost::load("obsweave.manifest.yaml".as_ref())?;
//! let pipeline = Pipeline::new(GeneratorConfig::default());
//! let output = pipeline.run(&host, &host.nodes()?, &CancellationToken::new())?;
//!
//! for unit in &output.units {
//!     println!("// {}\n{}", unit.hint_name, unit.source);
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                                                              │
//! │  HOST (SemanticModel + SyntaxNodes)                          │
//! │       │                                                      │
//! │       ├──► gate: is the marker type visible?                 │
//! │       │                                                      │
//! │       ├──► scan::is_candidate ──► cheap syntactic filter     │
//! │       │                                                      │
//! │       ├──► classify (parallel) ──► InvocationFact            │
//! │       │         │                                            │
//! │       │         └── ProviderRegistry                         │
//! │       │                                                      │
//! │       ├──► order_facts (barrier) ──► OrderedFact             │
//! │       │                                                      │
//! │       └──► emit ──► GeneratedUnit ──► guard::write_file      │
//! │                                                              │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Output order is a pure function of each fact's order key
//! (`unit:line:column`, compared ordinally), so two runs over the same
//! input produce byte-identical units regardless of discovery order.

pub mod classify;
pub mod config;
pub mod emit;
pub mod error;
pub mod guard;
pub mod host;
pub mod manifest;
pub mod model;
pub mod order;
pub mod pipeline;
pub mod providers;
pub mod scan;
pub mod telemetry;
pub mod util;

// Re-exports
pub use classify::{classify_meter, classify_node, ClassifyContext, Classifier};
pub use config::{GeneratorConfig, MarkerConfig, CONFIG_FILE};
pub use emit::{render_interceptors, render_meter_class, GeneratedUnit, TypeQualifier};
pub use error::{Error, Result};
pub use guard::{normalize, write_file, WriteMode, WriteOutcome, WriteReport};
pub use host::{CancellationToken, SemanticModel, SourceLocation, SyntaxNode};
pub use manifest::{Manifest, ManifestHost};
pub use model::{Domain, Invocation, InvocationFact, OrderKey};
pub use order::{order_facts, OrderedFact};
pub use pipeline::{write_units, GenerationOutput, Pipeline};
pub use providers::{ProviderCategory, ProviderDefinition, ProviderRegistry};
pub use scan::{is_candidate, scan_csharp};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
