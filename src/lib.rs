//! Story Kernel: short stories rendered from algebraic kernel expressions.
//!
//! A story is written as a small program of named calls such as
//! `Lily(Character, girl, curious)` and `Joy(Lily) + Find(Lily, owl)`.
//! Each call is dispatched to a handler in a pluggable registry, handlers
//! emit weighted fragments of text, and the fragments are rendered into
//! prose. Unknown names and malformed arguments degrade to fallback text
//! with a diagnostic instead of failing the story.

pub mod core;
pub mod kernels;
pub mod schema;

pub use crate::core::parser::{parse, SyntaxError};
pub use crate::core::pipeline::{
    generate, BuildError, EngineConfig, Story, StoryEngine, StoryError,
};
pub use crate::core::registry::{Invocation, Kernel, KernelArgs, KernelError, KernelRegistry};
pub use crate::core::template::{Slots, TemplateError, TemplateTable};
