//! The front-end of the compiler.
//!
//! Only the AST is part of this core: the lexer and parser that would
//! produce it from MiniC source text are an external collaborator and are
//! not implemented here. [`lower`] is the AST→IR translator.

pub mod ast;
pub mod lower;

pub use ast::*;
pub use lower::lower;
