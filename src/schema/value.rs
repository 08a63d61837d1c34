use serde::{Deserialize, Serialize};

use super::character::CharacterId;
use super::fragment::{Composition, Fragment};

/// A fully evaluated argument, as seen by a kernel.
///
/// Every argument is resolved to exactly one of these tags before a kernel
/// runs, so kernels match on the tag instead of inspecting shapes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// A character declared earlier in the same evaluation.
    Character(CharacterId),
    /// A bare word that is not a declared character, lowercased.
    Concept(String),
    /// A quoted string literal, verbatim.
    Text(String),
    Number(f64),
    Fragment(Fragment),
    /// The ordered result of `+`.
    Composition(Composition),
    List(Vec<Value>),
}

impl Value {
    pub fn as_character(&self) -> Option<CharacterId> {
        match self {
            Self::Character(id) => Some(*id),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_concept(&self) -> Option<&str> {
        match self {
            Self::Concept(word) => Some(word),
            _ => None,
        }
    }

    /// The generated fragment behind this value, collapsing compositions.
    pub fn as_fragment(&self) -> Option<Fragment> {
        match self {
            Self::Fragment(f) => Some(f.clone()),
            Self::Composition(c) => Some(c.to_fragment()),
            _ => None,
        }
    }

    /// Short tag name used in diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Character(_) => "character",
            Self::Concept(_) => "concept",
            Self::Text(_) => "text",
            Self::Number(_) => "number",
            Self::Fragment(_) => "fragment",
            Self::Composition(_) => "composition",
            Self::List(_) => "list",
        }
    }
}
