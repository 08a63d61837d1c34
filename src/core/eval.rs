/// Evaluator: walks a parsed program, dispatches calls to the registry and
/// threads the execution context through every step.
///
/// Recoverable failures (unknown kernels, bad argument shapes) are turned
/// into fallback text plus a diagnostic. Only the evaluation bounds are
/// fatal.

use thiserror::Error;

use crate::core::context::ExecutionContext;
use crate::core::phrase;
use crate::core::registry::{Invocation, KernelArgs, KernelError, KernelRegistry};
use crate::core::template::TemplateTable;
use crate::schema::diagnostic::DiagnosticKind;
use crate::schema::expr::{BinOpKind, Expr, Literal, Program};
use crate::schema::fragment::{Composition, Fragment, DEFAULT_WEIGHT};
use crate::schema::value::Value;

/// First positional argument that marks a call as a character declaration.
pub const CHARACTER_MARKER: &str = "Character";

pub const DEFAULT_MAX_DEPTH: usize = 64;
pub const DEFAULT_MAX_CALLS: usize = 10_000;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    #[error("call nesting exceeded the depth limit of {limit}")]
    DepthExceeded { limit: usize },
    #[error("kernel dispatch exceeded the call limit of {limit}")]
    CallsExceeded { limit: usize },
}

impl EvalError {
    /// The bound that was crossed.
    pub fn limit(&self) -> usize {
        match self {
            Self::DepthExceeded { limit } | Self::CallsExceeded { limit } => *limit,
        }
    }
}

/// Bounds on one evaluation. Depth counts nested calls (operators do not
/// add depth); calls counts every kernel dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    pub max_depth: usize,
    pub max_calls: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            max_calls: DEFAULT_MAX_CALLS,
        }
    }
}

pub struct Evaluator<'r> {
    registry: &'r KernelRegistry,
    templates: &'r TemplateTable,
    ctx: ExecutionContext,
    limits: Limits,
    depth: usize,
    calls: usize,
    exceeded: Option<EvalError>,
}

impl<'r> Evaluator<'r> {
    pub fn new(
        registry: &'r KernelRegistry,
        templates: &'r TemplateTable,
        ctx: ExecutionContext,
        limits: Limits,
    ) -> Self {
        Self {
            registry,
            templates,
            ctx,
            limits,
            depth: 0,
            calls: 0,
            exceeded: None,
        }
    }

    pub fn context(&self) -> &ExecutionContext {
        &self.ctx
    }

    pub fn context_mut(&mut self) -> &mut ExecutionContext {
        &mut self.ctx
    }

    pub fn into_context(self) -> ExecutionContext {
        self.ctx
    }

    pub(crate) fn depth(&self) -> usize {
        self.depth
    }

    pub(crate) fn templates(&self) -> &'r TemplateTable {
        self.templates
    }

    /// Evaluate every statement in order, emitting each result to the log.
    /// On error the log keeps everything emitted so far.
    pub fn run(&mut self, program: &Program) -> Result<(), EvalError> {
        for statement in &program.statements {
            let value = self.eval_expr(statement)?;
            self.emit_value(value);
        }
        Ok(())
    }

    pub fn eval_expr(&mut self, expr: &Expr) -> Result<Value, EvalError> {
        match expr {
            Expr::Name(name) => Ok(self.ctx.resolve_name(name)),
            Expr::Literal(Literal::Str(s)) => Ok(Value::Text(s.clone())),
            Expr::Literal(Literal::Number(n)) => Ok(Value::Number(*n)),
            Expr::List(items) => {
                let values = items
                    .iter()
                    .map(|item| self.eval_expr(item))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Value::List(values))
            }
            Expr::BinOp {
                op: BinOpKind::Compose,
                left,
                right,
            } => {
                let left = self.eval_expr(left)?;
                let right = self.eval_expr(right)?;
                let composition = Composition::join(self.to_parts(left), self.to_parts(right));
                Ok(Value::Composition(composition))
            }
            Expr::BinOp {
                op: BinOpKind::Dilute,
                left,
                right,
            } => self.eval_dilute(left, right),
            Expr::Call { name, args, kwargs } => {
                self.enter()?;
                let value = self.eval_call(name, args, kwargs);
                self.leave();
                value
            }
        }
    }

    fn eval_call(
        &mut self,
        name: &str,
        args: &[Expr],
        kwargs: &[(String, Expr)],
    ) -> Result<Value, EvalError> {
        if matches!(args.first(), Some(Expr::Name(marker)) if marker == CHARACTER_MARKER) {
            return self.declare(name, &args[1..]);
        }

        let mut evaluated = KernelArgs::default();
        for arg in args {
            let value = self.eval_expr(arg)?;
            evaluated.positional.push(value);
        }
        for (key, arg) in kwargs {
            let value = self.eval_expr(arg)?;
            evaluated.keywords.push((key.clone(), value));
        }

        let fragment = self.dispatch_recovering(name, &evaluated)?;
        Ok(Value::Fragment(fragment))
    }

    fn declare(&mut self, name: &str, trait_args: &[Expr]) -> Result<Value, EvalError> {
        let mut traits = Vec::new();
        for arg in trait_args {
            collect_traits(arg, &mut traits);
        }

        let Some(id) = self.ctx.declare(name, traits) else {
            tracing::warn!(character = name, "character declared twice, keeping the first");
            self.ctx.diagnose(
                DiagnosticKind::InvalidArgumentShape,
                Some(name),
                format!("character '{}' is already declared", name),
            );
            return Ok(self.ctx.resolve_name(name));
        };
        tracing::debug!(character = name, "character declared");
        self.ctx.set_focus(Some(id));

        if self.registry.contains(CHARACTER_MARKER) {
            let args = KernelArgs::new(vec![Value::Character(id)]);
            let intro = self.dispatch_recovering(CHARACTER_MARKER, &args)?;
            self.ctx.emit(intro);
        }
        Ok(Value::Character(id))
    }

    /// Dispatch and turn a shape error into fallback text.
    fn dispatch_recovering(&mut self, name: &str, args: &KernelArgs) -> Result<Fragment, EvalError> {
        match self.dispatch(name, args) {
            Ok(fragment) => Ok(fragment),
            Err(KernelError::InvalidArgumentShape(message)) => {
                tracing::warn!(kernel = name, %message, "kernel rejected its arguments, using fallback text");
                self.ctx
                    .diagnose(DiagnosticKind::InvalidArgumentShape, Some(name), message);
                Ok(self.fallback_fragment(name, args))
            }
            Err(KernelError::RecursionLimitExceeded(err)) => Err(err),
        }
    }

    /// Run the handler registered as `name`, or synthesize fallback text if
    /// there is none. Effects are applied only when the handler succeeds.
    pub(crate) fn dispatch(&mut self, name: &str, args: &KernelArgs) -> Result<Fragment, KernelError> {
        self.count_call()?;
        let registry = self.registry;
        let Some(kernel) = registry.get(name) else {
            tracing::warn!(kernel = name, "unknown kernel, using fallback text");
            self.ctx.diagnose(
                DiagnosticKind::UnknownKernel,
                Some(name),
                format!("no kernel registered as '{}'", name),
            );
            return Ok(self.fallback_fragment(name, args));
        };

        tracing::debug!(kernel = name, args = args.len(), depth = self.depth, "dispatching kernel");
        let mut inv = Invocation::new(self, name);
        let result = kernel.run(&mut inv, args);
        let effects = inv.into_effects();

        // a handler may swallow a nested limit error; the bound still holds
        if let Some(err) = &self.exceeded {
            return Err(err.clone().into());
        }
        let mut fragment = result?;
        for effect in effects {
            self.ctx.apply(effect);
        }
        if fragment.kernel.is_empty() {
            fragment.kernel = name.to_string();
        }
        Ok(fragment)
    }

    fn eval_dilute(&mut self, left: &Expr, right: &Expr) -> Result<Value, EvalError> {
        let value = self.eval_expr(left)?;
        let divisor = self.eval_expr(right)?;

        let d = match divisor.as_number() {
            Some(d) if d > 0.0 => d,
            other => {
                let head = left.head_name().unwrap_or("something");
                let message = match other {
                    Some(d) => format!("cannot dilute by {}", phrase::number(d)),
                    None => format!("dilution needs a number, got {}", divisor.kind()),
                };
                tracing::warn!(head, %message, "invalid dilution, using fallback text");
                self.ctx
                    .diagnose(DiagnosticKind::InvalidArgumentShape, Some(head), message);
                return Ok(Value::Fragment(
                    self.fallback_fragment(head, &KernelArgs::default()),
                ));
            }
        };

        let mut parts: Vec<Fragment> = self
            .to_parts(value)
            .iter()
            .map(|f| f.diluted(d))
            .collect();
        if parts.len() == 1 {
            if let Some(only) = parts.pop() {
                return Ok(Value::Fragment(only));
            }
        }
        Ok(Value::Composition(Composition::join(parts, Vec::new())))
    }

    /// Append a statement result to the log. Only generated text is
    /// emitted; bare characters, concepts and literals are not.
    fn emit_value(&mut self, value: Value) {
        match value {
            Value::Fragment(fragment) => self.ctx.emit(fragment),
            Value::Composition(composition) => {
                for part in composition.into_parts() {
                    self.ctx.emit(part);
                }
            }
            Value::List(items) => {
                for item in items {
                    self.emit_value(item);
                }
            }
            Value::Character(_) | Value::Concept(_) | Value::Text(_) | Value::Number(_) => {}
        }
    }

    /// Coerce an operand of `+` or `/` into fragments.
    fn to_parts(&self, value: Value) -> Vec<Fragment> {
        match value {
            Value::Fragment(fragment) => vec![fragment],
            Value::Composition(composition) => composition.into_parts(),
            Value::List(items) if items.is_empty() => Vec::new(),
            Value::List(items) => {
                let weight = items
                    .iter()
                    .filter_map(Value::as_fragment)
                    .map(|f| f.weight)
                    .fold(None, |max: Option<f64>, w| Some(max.map_or(w, |m| m.max(w))))
                    .unwrap_or(DEFAULT_WEIGHT);
                let text = self.phrase_of(&Value::List(items));
                vec![Fragment::new(text, "list").with_weight(weight)]
            }
            other => vec![Fragment::plain(self.phrase_of(&other))],
        }
    }

    /// How a value reads inside a sentence.
    pub fn phrase_of(&self, value: &Value) -> String {
        match value {
            Value::Character(id) => self
                .ctx
                .character(*id)
                .map(|c| c.name.clone())
                .unwrap_or_else(|| "someone".to_string()),
            Value::Concept(word) => word.clone(),
            Value::Text(text) => text.trim().to_string(),
            Value::Number(n) => phrase::number(*n),
            Value::Fragment(fragment) => fragment.phrase().to_string(),
            Value::Composition(composition) => composition.to_fragment().phrase().to_string(),
            Value::List(items) => {
                let phrases: Vec<String> = items
                    .iter()
                    .map(|item| self.phrase_of(item))
                    .filter(|p| !p.is_empty())
                    .collect();
                phrase::join_list(&phrases, "and")
            }
        }
    }

    /// Text for a call nobody handles, built from its name and arguments.
    ///
    /// With a character argument the name reads as a verb: `Kick(Tim, ball)`
    /// gives "Tim kicked ball." Otherwise it reads as a noun: "There was a
    /// storm with Tim." Names without lowercase letters are never inflected.
    pub fn fallback_fragment(&self, name: &str, args: &KernelArgs) -> Fragment {
        let words = phrase::humanize(name);
        let inflectable = name.chars().any(char::is_lowercase);
        let subject = args
            .positional
            .iter()
            .position(|v| v.as_character().is_some());

        let text = match subject {
            Some(index) if inflectable => {
                let subject_name = self.phrase_of(&args.positional[index]);
                let mut words = words.split_whitespace();
                let verb = words.next().map(phrase::past_tense).unwrap_or_default();
                let mut sentence = format!("{} {}", subject_name, verb);
                for word in words {
                    sentence.push(' ');
                    sentence.push_str(word);
                }
                let objects: Vec<String> = args
                    .positional
                    .iter()
                    .enumerate()
                    .filter(|(i, _)| *i != index)
                    .map(|(_, v)| self.phrase_of(v))
                    .filter(|p| !p.is_empty())
                    .collect();
                if !objects.is_empty() {
                    sentence.push(' ');
                    sentence.push_str(&phrase::join_list(&objects, "and"));
                }
                sentence.push('.');
                sentence
            }
            _ => {
                let (generated, plain): (Vec<&Value>, Vec<&Value>) = args
                    .positional
                    .iter()
                    .partition(|v| matches!(v, Value::Fragment(_) | Value::Composition(_)));
                let phrases = |values: Vec<&Value>| -> Vec<String> {
                    values
                        .into_iter()
                        .map(|v| self.phrase_of(v))
                        .filter(|p| !p.is_empty())
                        .collect()
                };
                let plain = phrases(plain);
                let generated = phrases(generated);
                if !plain.is_empty() {
                    format!("There was {} with {}.", words, phrase::join_list(&plain, "and"))
                } else if !generated.is_empty() {
                    format!("There was {}: {}.", words, phrase::join_list(&generated, "and"))
                } else {
                    format!("There was {}.", words)
                }
            }
        };
        Fragment::new(text, name)
    }

    pub(crate) fn enter(&mut self) -> Result<(), EvalError> {
        self.depth += 1;
        if self.depth > self.limits.max_depth {
            return Err(self.exceed(EvalError::DepthExceeded {
                limit: self.limits.max_depth,
            }));
        }
        Ok(())
    }

    pub(crate) fn leave(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    fn count_call(&mut self) -> Result<(), EvalError> {
        self.calls += 1;
        if self.calls > self.limits.max_calls {
            return Err(self.exceed(EvalError::CallsExceeded {
                limit: self.limits.max_calls,
            }));
        }
        Ok(())
    }

    fn exceed(&mut self, err: EvalError) -> EvalError {
        tracing::warn!(%err, "evaluation bound exceeded");
        self.ctx.diagnose(
            DiagnosticKind::RecursionLimitExceeded,
            None,
            err.to_string(),
        );
        self.exceeded.get_or_insert(err).clone()
    }
}

/// Trait words of a declaration, read from the syntax without evaluating it.
fn collect_traits(expr: &Expr, out: &mut Vec<String>) {
    match expr {
        Expr::Name(name) | Expr::Call { name, .. } => out.push(name.to_lowercase()),
        Expr::Literal(Literal::Str(s)) => out.push(s.trim().to_lowercase()),
        Expr::Literal(Literal::Number(_)) => {}
        Expr::BinOp {
            op: BinOpKind::Compose,
            left,
            right,
        } => {
            collect_traits(left, out);
            collect_traits(right, out);
        }
        Expr::BinOp {
            op: BinOpKind::Dilute,
            left,
            ..
        } => collect_traits(left, out),
        Expr::List(items) => {
            for item in items {
                collect_traits(item, out);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::parser::parse;
    use crate::schema::character::{ClampPolicy, Emotion};

    fn registry() -> KernelRegistry {
        let mut registry = KernelRegistry::new();
        registry
            .register("Fear", |inv, args| {
                let id = inv
                    .subject(args)
                    .ok_or_else(|| KernelError::InvalidArgumentShape("Fear needs a character".into()))?;
                let name = inv.phrase(&Value::Character(id));
                inv.adjust(id, Emotion::Fear, 20.0);
                Ok(inv.fragment(format!("{} was scared.", name)))
            })
            .register("Twice", |inv, args| {
                let first = inv.call("Fear", args.clone())?;
                let second = inv.call("Fear", args.clone())?;
                Ok(inv.fragment(format!("{} {}", first.text, second.text)))
            })
            .register("Forever", |inv, args| inv.call("Forever", args.clone()));
        registry
    }

    fn run(source: &str, limits: Limits) -> (Result<(), EvalError>, ExecutionContext) {
        let registry = registry();
        let templates = TemplateTable::new();
        let program = parse(source).unwrap();
        let mut eval = Evaluator::new(
            &registry,
            &templates,
            ExecutionContext::new(7, ClampPolicy::Unbounded),
            limits,
        );
        let result = eval.run(&program);
        (result, eval.into_context())
    }

    fn texts(ctx: &ExecutionContext) -> Vec<&str> {
        ctx.fragments().iter().map(|f| f.text.as_str()).collect()
    }

    #[test]
    fn declaration_sets_focus_and_emits_nothing() {
        let (result, ctx) = run("Tim(Character, boy, Brave)\nFear()", Limits::default());
        assert!(result.is_ok());
        assert_eq!(texts(&ctx), vec!["Tim was scared."]);
        let tim = &ctx.characters()[0];
        assert_eq!(tim.kind.as_deref(), Some("boy"));
        assert_eq!(tim.traits, vec!["brave".to_string()]);
        assert_eq!(tim.emotions.fear, 20.0);
    }

    #[test]
    fn traits_are_read_from_syntax() {
        let (_, ctx) = run(
            "Lily(Character, girl, Kind + \"Curious\", [shy, Quiet], Happy(x) / 2)",
            Limits::default(),
        );
        assert_eq!(
            ctx.characters()[0].traits,
            vec!["kind", "curious", "shy", "quiet", "happy"]
        );
        assert!(ctx.diagnostics().is_empty());
    }

    #[test]
    fn redeclaration_keeps_first() {
        let (_, ctx) = run("Tim(Character, boy)\nTim(Character, dog)", Limits::default());
        assert_eq!(ctx.characters().len(), 1);
        assert_eq!(ctx.characters()[0].kind.as_deref(), Some("boy"));
        assert_eq!(
            ctx.diagnostics()[0].kind,
            DiagnosticKind::InvalidArgumentShape
        );
    }

    #[test]
    fn unknown_kernel_with_character_is_inflected() {
        let (_, ctx) = run("Tim(Character)\nKickBall(Tim, hard)", Limits::default());
        assert_eq!(texts(&ctx), vec!["Tim kicked ball hard."]);
        assert_eq!(ctx.diagnostics()[0].kind, DiagnosticKind::UnknownKernel);
    }

    #[test]
    fn unknown_kernel_without_character() {
        let (_, ctx) = run(
            "Tim(Character)\nStorm(sea)\nNight()\nEnd(Fear(Tim))",
            Limits::default(),
        );
        assert_eq!(
            texts(&ctx),
            vec![
                "There was storm with sea.",
                "There was night.",
                "There was end: Tim was scared."
            ]
        );
    }

    #[test]
    fn handler_shape_error_is_recovered() {
        let (result, ctx) = run("Fear(ball)", Limits::default());
        assert!(result.is_ok());
        assert_eq!(texts(&ctx), vec!["There was fear with ball."]);
        assert_eq!(ctx.diagnostics()[0].kind, DiagnosticKind::InvalidArgumentShape);
        assert_eq!(ctx.diagnostics()[0].subject.as_deref(), Some("Fear"));
    }

    #[test]
    fn compose_emits_each_part_in_order() {
        let (_, ctx) = run("Tim(Character)\nFear(Tim) + Storm()", Limits::default());
        assert_eq!(texts(&ctx), vec!["Tim was scared.", "There was storm."]);
    }

    #[test]
    fn dilution_divides_weight() {
        let (_, ctx) = run("Tim(Character)\nFear(Tim) / 4", Limits::default());
        assert_eq!(ctx.fragments()[0].weight, 0.25);
    }

    #[test]
    fn dilution_by_zero_or_text_is_recovered() {
        let (result, ctx) = run("Tim(Character)\nFear(Tim) / 0\nFear(Tim) / \"two\"", Limits::default());
        assert!(result.is_ok());
        assert_eq!(texts(&ctx), vec!["There was fear.", "There was fear."]);
        assert_eq!(
            ctx.diagnostics()
                .iter()
                .filter(|d| d.kind == DiagnosticKind::InvalidArgumentShape)
                .count(),
            2
        );
    }

    #[test]
    fn nested_calls_apply_effects() {
        let (_, ctx) = run("Tim(Character)\nTwice(Tim)", Limits::default());
        assert_eq!(texts(&ctx), vec!["Tim was scared. Tim was scared."]);
        assert_eq!(ctx.characters()[0].emotions.fear, 40.0);
    }

    #[test]
    fn runaway_recursion_is_fatal() {
        let (result, ctx) = run("Tim(Character)\nFear(Tim)\nForever()", Limits::default());
        assert_eq!(result, Err(EvalError::DepthExceeded { limit: DEFAULT_MAX_DEPTH }));
        assert_eq!(texts(&ctx), vec!["Tim was scared."]);
    }

    #[test]
    fn call_budget_is_fatal() {
        let limits = Limits {
            max_depth: 64,
            max_calls: 3,
        };
        let (result, _) = run("Storm()\nStorm()\nStorm()\nStorm()", limits);
        assert_eq!(result, Err(EvalError::CallsExceeded { limit: 3 }));
    }

    #[test]
    fn operators_do_not_add_depth() {
        let limits = Limits {
            max_depth: 2,
            max_calls: 100,
        };
        let source = "A() + B() + C() + D() / 2 + E(F())";
        let (result, ctx) = run(source, limits);
        assert!(result.is_ok());
        assert_eq!(ctx.fragments().len(), 5);
    }
}
