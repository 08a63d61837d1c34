/// Execution context: the mutable narrative state of one evaluation.

use rand::rngs::StdRng;
use rand::SeedableRng;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::schema::character::{Character, CharacterId, ClampPolicy, Emotion};
use crate::schema::diagnostic::{Diagnostic, DiagnosticKind};
use crate::schema::fragment::Fragment;
use crate::schema::value::Value;

/// A state change requested by a kernel. Kernels never write to the
/// context directly; their effects are applied once they return.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Effect {
    Emotion {
        character: CharacterId,
        emotion: Emotion,
        delta: f64,
    },
    Focus(Option<CharacterId>),
    Object(Option<String>),
}

/// Per-evaluation state: declared characters, the fragment log, focus,
/// the seeded random source, and everything recorded for diagnostics.
///
/// A context is owned by exactly one evaluation and never shared.
#[derive(Debug)]
pub struct ExecutionContext {
    characters: Vec<Character>,
    by_name: FxHashMap<String, CharacterId>,
    fragments: Vec<Fragment>,
    current_focus: Option<CharacterId>,
    current_object: Option<String>,
    rng: StdRng,
    diagnostics: Vec<Diagnostic>,
    effects: Vec<Effect>,
    clamp: ClampPolicy,
}

impl ExecutionContext {
    pub fn new(seed: u64, clamp: ClampPolicy) -> Self {
        Self {
            characters: Vec::new(),
            by_name: FxHashMap::default(),
            fragments: Vec::new(),
            current_focus: None,
            current_object: None,
            rng: StdRng::seed_from_u64(seed),
            diagnostics: Vec::new(),
            effects: Vec::new(),
            clamp,
        }
    }

    /// Declare a new character. Returns `None` if the name is taken.
    pub fn declare(&mut self, name: &str, traits: Vec<String>) -> Option<CharacterId> {
        if self.by_name.contains_key(name) {
            return None;
        }
        let id = CharacterId(self.characters.len());
        self.characters.push(Character::declare(id, name, traits));
        self.by_name.insert(name.to_string(), id);
        Some(id)
    }

    pub fn character(&self, id: CharacterId) -> Option<&Character> {
        self.characters.get(id.0)
    }

    pub fn lookup(&self, name: &str) -> Option<CharacterId> {
        self.by_name.get(name).copied()
    }

    /// Resolve a bare name: a declared character, or a lowercase concept.
    pub fn resolve_name(&self, name: &str) -> Value {
        match self.lookup(name) {
            Some(id) => Value::Character(id),
            None => Value::Concept(name.to_lowercase()),
        }
    }

    pub fn characters(&self) -> &[Character] {
        &self.characters
    }

    pub fn current_focus(&self) -> Option<CharacterId> {
        self.current_focus
    }

    pub fn current_object(&self) -> Option<&str> {
        self.current_object.as_deref()
    }

    pub fn set_focus(&mut self, focus: Option<CharacterId>) {
        self.current_focus = focus;
    }

    pub fn rng(&mut self) -> &mut StdRng {
        &mut self.rng
    }

    /// Append a fragment to the log. Empty text is not recorded.
    pub fn emit(&mut self, fragment: Fragment) {
        if !fragment.is_empty() {
            self.fragments.push(fragment);
        }
    }

    pub fn fragments(&self) -> &[Fragment] {
        &self.fragments
    }

    pub fn diagnose(&mut self, kind: DiagnosticKind, subject: Option<&str>, message: impl Into<String>) {
        let diagnostic = Diagnostic::new(kind, subject, message);
        tracing::debug!(%diagnostic, "diagnostic recorded");
        self.diagnostics.push(diagnostic);
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Apply a kernel effect and keep it in the effect log. Effects naming
    /// an unknown character are ignored.
    pub fn apply(&mut self, effect: Effect) {
        match &effect {
            Effect::Emotion {
                character,
                emotion,
                delta,
            } => match self.characters.get_mut(character.0) {
                Some(c) => c.emotions.adjust(*emotion, *delta, self.clamp),
                None => return,
            },
            Effect::Focus(focus) => self.current_focus = *focus,
            Effect::Object(object) => self.current_object = object.clone(),
        }
        self.effects.push(effect);
    }

    pub fn effects(&self) -> &[Effect] {
        &self.effects
    }

    /// Consume the context, keeping what callers may inspect afterwards.
    pub fn into_parts(self) -> ContextParts {
        ContextParts {
            fragments: self.fragments,
            diagnostics: self.diagnostics,
            effects: self.effects,
            characters: self.characters,
        }
    }
}

/// What survives an evaluation once the context is dropped.
#[derive(Debug, Clone, Default)]
pub struct ContextParts {
    pub fragments: Vec<Fragment>,
    pub diagnostics: Vec<Diagnostic>,
    pub effects: Vec<Effect>,
    pub characters: Vec<Character>,
}
