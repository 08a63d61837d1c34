/// Kernel registry: named handlers, the arguments they receive, and the
/// `Invocation` window through which they read and change the story state.

use rand::rngs::StdRng;
use rustc_hash::FxHashMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

use crate::core::context::Effect;
use crate::core::eval::{EvalError, Evaluator};
use crate::core::template::{Slots, TemplateError};
use crate::schema::character::{Character, CharacterId, Emotion};
use crate::schema::diagnostic::DiagnosticKind;
use crate::schema::fragment::Fragment;
use crate::schema::value::Value;

/// Errors a kernel handler may return.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum KernelError {
    /// The arguments do not have the shape the handler needs. Recovered:
    /// the call is replaced by a fallback fragment.
    #[error("invalid argument shape: {0}")]
    InvalidArgumentShape(String),
    /// A nested dispatch went past the evaluation bounds. Fatal.
    #[error(transparent)]
    RecursionLimitExceeded(#[from] EvalError),
}

impl From<TemplateError> for KernelError {
    fn from(err: TemplateError) -> Self {
        KernelError::InvalidArgumentShape(err.to_string())
    }
}

/// A story kernel: turns evaluated arguments into one fragment of text.
pub trait Kernel: Send + Sync {
    fn run(&self, inv: &mut Invocation<'_, '_>, args: &KernelArgs) -> Result<Fragment, KernelError>;
}

impl<F> Kernel for F
where
    F: Fn(&mut Invocation<'_, '_>, &KernelArgs) -> Result<Fragment, KernelError> + Send + Sync,
{
    fn run(&self, inv: &mut Invocation<'_, '_>, args: &KernelArgs) -> Result<Fragment, KernelError> {
        self(inv, args)
    }
}

/// Named kernel handlers. Built once, then shared read-only by every
/// evaluation.
#[derive(Clone, Default)]
pub struct KernelRegistry {
    kernels: FxHashMap<String, Arc<dyn Kernel>>,
}

impl fmt::Debug for KernelRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KernelRegistry")
            .field("kernels", &self.names())
            .finish()
    }
}

impl KernelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler function under `name`, replacing any previous one.
    pub fn register<F>(&mut self, name: &str, handler: F) -> &mut Self
    where
        F: Fn(&mut Invocation<'_, '_>, &KernelArgs) -> Result<Fragment, KernelError>
            + Send
            + Sync
            + 'static,
    {
        self.register_kernel(name, handler)
    }

    /// Register any [`Kernel`] implementation under `name`.
    pub fn register_kernel<K: Kernel + 'static>(&mut self, name: &str, kernel: K) -> &mut Self {
        if self.kernels.insert(name.to_string(), Arc::new(kernel)).is_some() {
            tracing::debug!(kernel = name, "kernel handler replaced");
        }
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.kernels.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&dyn Kernel> {
        self.kernels.get(name).map(|k| k.as_ref())
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.kernels.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.kernels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kernels.is_empty()
    }

    /// Merge another registry into this one. Handlers in `other` win.
    pub fn merge(&mut self, other: KernelRegistry) {
        self.kernels.extend(other.kernels);
    }
}

/// Evaluated arguments of one call: positional first, then keywords, each
/// in source order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KernelArgs {
    pub positional: Vec<Value>,
    pub keywords: Vec<(String, Value)>,
}

impl KernelArgs {
    pub fn new(positional: Vec<Value>) -> Self {
        Self {
            positional,
            keywords: Vec::new(),
        }
    }

    pub fn with_keyword(mut self, name: &str, value: Value) -> Self {
        self.keywords.push((name.to_string(), value));
        self
    }

    pub fn len(&self) -> usize {
        self.positional.len() + self.keywords.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every positional argument that is a character, in order.
    pub fn characters(&self) -> Vec<CharacterId> {
        self.positional.iter().filter_map(Value::as_character).collect()
    }

    pub fn first_character(&self) -> Option<CharacterId> {
        self.positional.iter().find_map(Value::as_character)
    }

    /// Bare concept words among the positional arguments.
    pub fn concepts(&self) -> Vec<&str> {
        self.positional.iter().filter_map(Value::as_concept).collect()
    }

    /// Generated text among the positional arguments; compositions are
    /// collapsed into one fragment each.
    pub fn fragments(&self) -> Vec<Fragment> {
        self.positional.iter().filter_map(Value::as_fragment).collect()
    }

    pub fn numbers(&self) -> Vec<f64> {
        self.positional.iter().filter_map(Value::as_number).collect()
    }

    pub fn keyword(&self, name: &str) -> Option<&Value> {
        self.keywords
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value)
    }

    /// A printable phrase for every positional argument, skipping those
    /// that print as nothing.
    pub fn phrases(&self, inv: &Invocation<'_, '_>) -> Vec<String> {
        self.positional
            .iter()
            .map(|v| inv.phrase(v))
            .filter(|p| !p.is_empty())
            .collect()
    }
}

/// A handler's view of the running evaluation.
///
/// Reads see the state as it was when the handler started. Effects
/// requested through `adjust`, `set_focus` and `set_object` are applied in
/// order once the handler returns `Ok`, and discarded if it fails.
pub struct Invocation<'a, 'r> {
    eval: &'a mut Evaluator<'r>,
    kernel: String,
    effects: Vec<Effect>,
}

impl<'a, 'r> Invocation<'a, 'r> {
    pub(crate) fn new(eval: &'a mut Evaluator<'r>, kernel: &str) -> Self {
        Self {
            eval,
            kernel: kernel.to_string(),
            effects: Vec::new(),
        }
    }

    pub(crate) fn into_effects(self) -> Vec<Effect> {
        self.effects
    }

    pub fn kernel_name(&self) -> &str {
        &self.kernel
    }

    pub fn character(&self, id: CharacterId) -> Option<&Character> {
        self.eval.context().character(id)
    }

    /// The character the story is currently about.
    pub fn focus(&self) -> Option<CharacterId> {
        self.eval.context().current_focus()
    }

    pub fn object(&self) -> Option<&str> {
        self.eval.context().current_object()
    }

    /// True when this call's result feeds another call instead of being a
    /// statement of its own.
    pub fn is_nested(&self) -> bool {
        self.eval.depth() > 1
    }

    /// The first character argument, or the current focus.
    pub fn subject(&self, args: &KernelArgs) -> Option<CharacterId> {
        args.first_character().or_else(|| self.focus())
    }

    /// A fragment attributed to this kernel.
    pub fn fragment(&self, text: impl Into<String>) -> Fragment {
        Fragment::new(text, self.kernel.as_str())
    }

    /// How `value` reads inside a sentence.
    pub fn phrase(&self, value: &Value) -> String {
        self.eval.phrase_of(value)
    }

    /// Pick and fill a template from `category`. An unregistered category
    /// yields its default phrase and records a diagnostic.
    pub fn template(&mut self, category: &str, slots: &Slots) -> Result<String, KernelError> {
        let templates = self.eval.templates();
        if !templates.contains(category) {
            let message = format!("no templates registered for '{}'", category);
            self.eval
                .context_mut()
                .diagnose(DiagnosticKind::MissingTemplateCategory, Some(category), message);
        }
        Ok(templates.generate(category, slots, self.eval.context_mut().rng())?)
    }

    /// The evaluation's seeded random source.
    pub fn rng(&mut self) -> &mut StdRng {
        self.eval.context_mut().rng()
    }

    pub fn adjust(&mut self, character: CharacterId, emotion: Emotion, delta: f64) {
        self.effects.push(Effect::Emotion {
            character,
            emotion,
            delta,
        });
    }

    pub fn set_focus(&mut self, character: Option<CharacterId>) {
        self.effects.push(Effect::Focus(character));
    }

    pub fn set_object(&mut self, object: Option<String>) {
        self.effects.push(Effect::Object(object));
    }

    /// Dispatch another kernel by name. Counts against the depth and call
    /// bounds of the evaluation; an unknown name yields its fallback text.
    pub fn call(&mut self, name: &str, args: KernelArgs) -> Result<Fragment, KernelError> {
        self.eval.enter()?;
        let result = self.eval.dispatch(name, &args);
        self.eval.leave();
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop(inv: &mut Invocation<'_, '_>, _args: &KernelArgs) -> Result<Fragment, KernelError> {
        Ok(inv.fragment("nothing happened."))
    }

    #[test]
    fn register_and_lookup() {
        let mut registry = KernelRegistry::new();
        registry
            .register("Wait", noop)
            .register("Sleep", |inv, _args| Ok(inv.fragment("zzz.")));
        assert!(registry.contains("Wait"));
        assert!(registry.get("Sleep").is_some());
        assert!(registry.get("Jump").is_none());
        assert_eq!(registry.names(), vec!["Sleep", "Wait"]);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn merge_overrides() {
        let mut base = KernelRegistry::new();
        base.register("Wait", noop);
        let mut pack = KernelRegistry::new();
        pack.register("Wait", noop).register("Rest", noop);
        base.merge(pack);
        assert_eq!(base.names(), vec!["Rest", "Wait"]);
    }

    #[test]
    fn args_helpers() {
        let args = KernelArgs::new(vec![
            Value::Character(CharacterId(0)),
            Value::Concept("ball".into()),
            Value::Number(2.0),
            Value::Fragment(Fragment::plain("It rained.")),
            Value::Character(CharacterId(1)),
        ])
        .with_keyword("place", Value::Concept("park".into()));

        assert_eq!(args.first_character(), Some(CharacterId(0)));
        assert_eq!(args.characters(), vec![CharacterId(0), CharacterId(1)]);
        assert_eq!(args.concepts(), vec!["ball"]);
        assert_eq!(args.numbers(), vec![2.0]);
        assert_eq!(args.fragments().len(), 1);
        assert_eq!(args.keyword("place"), Some(&Value::Concept("park".into())));
        assert_eq!(args.keyword("time"), None);
        assert_eq!(args.len(), 6);
    }

    #[test]
    fn template_errors_become_shape_errors() {
        let err: KernelError = TemplateError::MissingSlot {
            category: "intro".into(),
            slot: "name".into(),
        }
        .into();
        assert!(matches!(err, KernelError::InvalidArgumentShape(_)));
    }
}
