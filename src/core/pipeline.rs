/// The story pipeline: source text → parse → evaluate → render.
///
/// Exposes the free [`generate`] entry point and the configurable
/// [`StoryEngine`], which owns a registry and template table and can be
/// reused for many sources and seeds.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::context::{Effect, ExecutionContext};
use crate::core::eval::{EvalError, Evaluator, Limits, DEFAULT_MAX_CALLS, DEFAULT_MAX_DEPTH};
use crate::core::parser::{self, SyntaxError};
use crate::core::registry::KernelRegistry;
use crate::core::render::{render, DEFAULT_RENDER_THRESHOLD};
use crate::core::template::TemplateTable;
use crate::schema::character::{Character, ClampPolicy};
use crate::schema::diagnostic::{Diagnostic, DiagnosticKind};
use crate::schema::expr::Program;
use crate::schema::fragment::Fragment;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum StoryError {
    #[error("syntax error: {0}")]
    Syntax(#[from] SyntaxError),
    /// Evaluation went past `max_depth` or `max_calls`. `partial` holds the
    /// fragments logged before the bound was hit.
    #[error("recursion limit of {limit} exceeded")]
    RecursionLimitExceeded {
        limit: usize,
        partial: Vec<Fragment>,
        diagnostics: Vec<Diagnostic>,
    },
}

impl StoryError {
    /// Diagnostics describing the failure, in the same form a successful
    /// story reports them.
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        match self {
            Self::Syntax(err) => vec![Diagnostic::new(
                DiagnosticKind::Syntax,
                None,
                err.to_string(),
            )],
            Self::RecursionLimitExceeded { diagnostics, .. } => diagnostics.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum BuildError {
    #[error("max_depth must be at least 1")]
    ZeroDepth,
    #[error("max_calls must be at least 1")]
    ZeroCalls,
    #[error("render threshold must be a finite, non-negative number, got {0}")]
    InvalidThreshold(f64),
    #[error("emotion clamp range is empty: min {min} > max {max}")]
    InvalidClamp { min: f64, max: f64 },
}

/// Tunables of one engine. Every field has a default, so a RON file only
/// needs the fields it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub max_depth: usize,
    pub max_calls: usize,
    pub render_threshold: f64,
    pub clamp: ClampPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            max_calls: DEFAULT_MAX_CALLS,
            render_threshold: DEFAULT_RENDER_THRESHOLD,
            clamp: ClampPolicy::Unbounded,
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<(), BuildError> {
        if self.max_depth == 0 {
            return Err(BuildError::ZeroDepth);
        }
        if self.max_calls == 0 {
            return Err(BuildError::ZeroCalls);
        }
        if !self.render_threshold.is_finite() || self.render_threshold < 0.0 {
            return Err(BuildError::InvalidThreshold(self.render_threshold));
        }
        if let ClampPolicy::Range { min, max } = self.clamp {
            if min.is_nan() || max.is_nan() || min > max {
                return Err(BuildError::InvalidClamp { min, max });
            }
        }
        Ok(())
    }

    fn limits(&self) -> Limits {
        Limits {
            max_depth: self.max_depth,
            max_calls: self.max_calls,
        }
    }
}

/// A rendered story together with everything recorded while producing it.
#[derive(Debug, Clone, PartialEq)]
pub struct Story {
    pub text: String,
    /// The full fragment log, including fragments below the threshold.
    pub fragments: Vec<Fragment>,
    pub diagnostics: Vec<Diagnostic>,
    pub effects: Vec<Effect>,
    pub characters: Vec<Character>,
}

impl Story {
    pub fn diagnostics_of(&self, kind: DiagnosticKind) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(move |d| d.kind == kind)
    }

    pub fn character(&self, name: &str) -> Option<&Character> {
        self.characters.iter().find(|c| c.name == name)
    }
}

/// Render `source` with the default configuration.
///
/// Returns `Ok` for every source that parses and stays within the default
/// evaluation bounds; unknown kernels and bad arguments only add
/// diagnostics.
pub fn generate(
    source: &str,
    registry: &KernelRegistry,
    templates: &TemplateTable,
    seed: u64,
) -> Result<Story, StoryError> {
    let program = parser::parse(source)?;
    run_program(&program, registry, templates, seed, &EngineConfig::default())
}

#[tracing::instrument(level = "debug", skip_all, fields(statements = program.statements.len(), seed = seed))]
fn run_program(
    program: &Program,
    registry: &KernelRegistry,
    templates: &TemplateTable,
    seed: u64,
    config: &EngineConfig,
) -> Result<Story, StoryError> {
    let ctx = ExecutionContext::new(seed, config.clamp);
    let mut evaluator = Evaluator::new(registry, templates, ctx, config.limits());
    let outcome = evaluator.run(program);
    let parts = evaluator.into_context().into_parts();

    if let Err(err) = outcome {
        tracing::warn!(%err, fragments = parts.fragments.len(), "evaluation aborted");
        return Err(recursion_error(err, parts.fragments, parts.diagnostics));
    }

    let text = render(&parts.fragments, config.render_threshold);
    tracing::debug!(
        fragments = parts.fragments.len(),
        diagnostics = parts.diagnostics.len(),
        "story rendered"
    );
    Ok(Story {
        text,
        fragments: parts.fragments,
        diagnostics: parts.diagnostics,
        effects: parts.effects,
        characters: parts.characters,
    })
}

fn recursion_error(err: EvalError, partial: Vec<Fragment>, diagnostics: Vec<Diagnostic>) -> StoryError {
    StoryError::RecursionLimitExceeded {
        limit: err.limit(),
        partial,
        diagnostics,
    }
}

/// A reusable story generator. Built via `StoryEngine::builder()`.
#[derive(Debug, Clone)]
pub struct StoryEngine {
    registry: KernelRegistry,
    templates: TemplateTable,
    config: EngineConfig,
    seed: u64,
}

/// Builder for constructing a `StoryEngine`.
#[derive(Debug, Default)]
pub struct StoryEngineBuilder {
    registries: Vec<KernelRegistry>,
    templates: Vec<TemplateTable>,
    config: Option<EngineConfig>,
    seed: u64,
}

impl StoryEngine {
    pub fn builder() -> StoryEngineBuilder {
        StoryEngineBuilder::default()
    }

    /// Generate a story with the engine's seed.
    pub fn generate(&self, source: &str) -> Result<Story, StoryError> {
        self.generate_with_seed(source, self.seed)
    }

    pub fn generate_with_seed(&self, source: &str, seed: u64) -> Result<Story, StoryError> {
        let program = parser::parse(source)?;
        run_program(&program, &self.registry, &self.templates, seed, &self.config)
    }

    /// Generate `count` variants of one source, each from its own seed
    /// offset. The source is parsed once.
    pub fn generate_variants(&self, source: &str, count: usize) -> Result<Vec<Story>, StoryError> {
        let program = parser::parse(source)?;
        let mut stories = Vec::with_capacity(count);
        for i in 0..count {
            let seed = self.seed.wrapping_add(i as u64 * 1000);
            stories.push(run_program(
                &program,
                &self.registry,
                &self.templates,
                seed,
                &self.config,
            )?);
        }
        Ok(stories)
    }

    pub fn registry(&self) -> &KernelRegistry {
        &self.registry
    }

    pub fn templates(&self) -> &TemplateTable {
        &self.templates
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }
}

impl StoryEngineBuilder {
    /// Add a kernel pack. Later packs override handlers of earlier ones.
    pub fn registry(mut self, registry: KernelRegistry) -> Self {
        self.registries.push(registry);
        self
    }

    /// Add a template table. Later tables override categories of earlier ones.
    pub fn templates(mut self, templates: TemplateTable) -> Self {
        self.templates.push(templates);
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn build(self) -> Result<StoryEngine, BuildError> {
        let config = self.config.unwrap_or_default();
        config.validate()?;

        let mut registry = KernelRegistry::new();
        for pack in self.registries {
            registry.merge(pack);
        }
        let mut templates = TemplateTable::new();
        for table in self.templates {
            templates.merge(table);
        }

        tracing::debug!(
            kernels = registry.len(),
            categories = templates.categories().len(),
            seed = self.seed,
            "story engine built"
        );
        Ok(StoryEngine {
            registry,
            templates,
            config,
            seed: self.seed,
        })
    }
}
