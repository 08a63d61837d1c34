pub mod context;
pub mod eval;
pub mod lexer;
pub mod parser;
pub mod phrase;
pub mod pipeline;
pub mod registry;
pub mod render;
pub mod template;
