//! Generation pipeline - explicit stage composition
//!
//! ```text
//! gate ─► scan ─► classify (parallel, per node) ─► barrier ─► order ─► emit
//! ```
//!
//! The gate asks the host whether the gating marker type is visible; if not,
//! the pass produces nothing. Scanning and classification run on the rayon
//! pool and touch no shared mutable state. The barrier is the `collect` that
//! waits for every node before [`order_facts`] sees the full set. Emission
//! runs single-threaded over the ordered facts.
//!
//! Writing to disk is a separate, sequential step ([`write_units`]).

use crate::classify::{
    classify_meter, classify_node, ClassifyContext, Classifier, DatabaseClassifier,
    GenAiClassifier, TracedClassifier,
};
use crate::config::GeneratorConfig;
use crate::emit::{render_interceptors, render_meter_class, GeneratedUnit, InterceptorConfig, TypeQualifier};
use crate::error::{Error, Result};
use crate::guard::{write_file, WriteMode, WriteReport};
use crate::host::{CancellationToken, SemanticModel, SyntaxNode};
use crate::model::InvocationFact;
use crate::order::order_facts;
use crate::providers::ProviderRegistry;
use crate::scan::is_candidate;
use chrono::{DateTime, SecondsFormat, Utc};
use rayon::prelude::*;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::Path;

/// Result of one pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerationOutput {
    pub units: Vec<GeneratedUnit>,
    /// Nodes that passed the candidate scanner
    pub candidates: usize,
    /// Facts that survived ordering and were emitted
    pub facts: usize,
    /// Nodes whose classification failed and were skipped
    pub faulted: usize,
    /// Meter classes emitted
    pub meter_classes: usize,
}

/// A configured pipeline; cheap to reuse across passes
pub struct Pipeline {
    config: GeneratorConfig,
    registry: ProviderRegistry,
}

impl Pipeline {
    pub fn new(config: GeneratorConfig) -> Self {
        let registry = config.registry();
        Self { config, registry }
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    /// Run one pass over `nodes`
    pub fn run(
        &self,
        model: &dyn SemanticModel,
        nodes: &[SyntaxNode],
        cancel: &CancellationToken,
    ) -> Result<GenerationOutput> {
        let _span = tracing::info_span!("pipeline", nodes = nodes.len()).entered();

        let gate = self.config.markers.gate();
        if !model.is_type_visible(gate) {
            tracing::info!(gate, "marker type not visible; nothing to generate");
            return Ok(GenerationOutput::default());
        }

        let classifiers = self.classifiers(&model.referenced_libraries());
        let ctx = ClassifyContext {
            model,
            registry: &self.registry,
            markers: &self.config.markers,
            inherit_traced: self.config.inherit_traced,
        };

        let classified: Vec<Option<Vec<InvocationFact>>> = {
            let _stage = tracing::debug_span!("classify").entered();
            nodes
                .par_iter()
                .filter(|node| is_candidate(node, cancel))
                .map(|node| classify_isolated(node, &classifiers, &ctx, cancel))
                .collect::<Result<_>>()?
        };
        cancel.check()?;

        let candidates = classified.len();
        let faulted = classified.iter().filter(|c| c.is_none()).count();
        let facts: Vec<InvocationFact> = classified.into_iter().flatten().flatten().collect();

        let ordered = {
            let _stage = tracing::debug_span!("order", facts = facts.len()).entered();
            order_facts(facts)
        };

        let _stage = tracing::debug_span!("emit").entered();
        let declared = model.declared_types();
        let mut qualifier = TypeQualifier::new();
        qualifier.extend(declared.iter().map(|t| t.full_name.as_str()));

        let mut units = render_interceptors(
            &ordered,
            &InterceptorConfig {
                namespace: &self.config.namespace,
                qualifier: &qualifier,
            },
        )?;

        let mut meter_classes = 0;
        if self.config.domains.metrics {
            let mut meters: Vec<_> = declared
                .iter()
                .filter_map(|ty| classify_meter(ty, &self.config.markers))
                .collect();
            meters.sort_by(|a, b| {
                (&a.namespace, &a.class_name).cmp(&(&b.namespace, &b.class_name))
            });
            for info in &meters {
                units.push(render_meter_class(info, &qualifier)?);
            }
            meter_classes = meters.len();
        }

        tracing::info!(
            candidates,
            facts = ordered.len(),
            faulted,
            units = units.len(),
            "generation pass complete"
        );

        Ok(GenerationOutput {
            units,
            candidates,
            facts: ordered.len(),
            faulted,
            meter_classes,
        })
    }

    /// Classifiers enabled by config and by the libraries the build references
    fn classifiers(&self, references: &[String]) -> Vec<Box<dyn Classifier>> {
        let domains = &self.config.domains;
        let mut classifiers: Vec<Box<dyn Classifier>> = Vec::new();
        if domains.traced {
            classifiers.push(Box::new(TracedClassifier));
        }
        if domains.database && self.registry.has_database_providers(references) {
            classifiers.push(Box::new(DatabaseClassifier));
        }
        if domains.genai && self.registry.has_genai_providers(references) {
            classifiers.push(Box::new(GenAiClassifier));
        }
        tracing::debug!(
            domains = ?classifiers.iter().map(|c| c.domain()).collect::<Vec<_>>(),
            "classifiers enabled"
        );
        classifiers
    }
}

/// Classify one node, isolating failures to it
///
/// `Ok(None)` means the node faulted and was skipped. Only cancellation
/// escapes as an error.
fn classify_isolated(
    node: &SyntaxNode,
    classifiers: &[Box<dyn Classifier>],
    ctx: &ClassifyContext<'_>,
    cancel: &CancellationToken,
) -> Result<Option<Vec<InvocationFact>>> {
    match catch_unwind(AssertUnwindSafe(|| classify_node(node, classifiers, ctx, cancel))) {
        Ok(Ok(facts)) => Ok(Some(facts)),
        Ok(Err(Error::Cancelled)) => Err(Error::Cancelled),
        Ok(Err(e)) => {
            tracing::warn!(location = %node.location, error = %e, "classification failed; node skipped");
            Ok(None)
        }
        Err(_) => {
            tracing::warn!(location = %node.location, "classifier panicked; node skipped");
            Ok(None)
        }
    }
}

/// Insert a `// Generated:` line after the first line of `source`
pub fn stamp(source: &str, at: DateTime<Utc>) -> String {
    let line = format!("// Generated: {}", at.to_rfc3339_opts(SecondsFormat::Secs, true));
    match source.split_once('\n') {
        Some((first, rest)) => format!("{}\n{}\n{}", first, line, rest),
        None => format!("{}\n{}\n", source, line),
    }
}

/// Write units into `dir` through the generation guard, one after another
///
/// The first I/O failure aborts the run.
pub fn write_units(
    units: &[GeneratedUnit],
    dir: &Path,
    mode: WriteMode,
    timestamp: Option<DateTime<Utc>>,
) -> Result<Vec<WriteReport>> {
    let _span = tracing::debug_span!("write", dir = %dir.display()).entered();
    units
        .iter()
        .map(|unit| {
            let content = match timestamp {
                Some(at) => stamp(&unit.source, at),
                None => unit.source.clone(),
            };
            write_file(&dir.join(&unit.hint_name), &content, mode)
        })
        .collect()
}
