pub mod character;
pub mod diagnostic;
pub mod expr;
pub mod fragment;
pub mod value;
