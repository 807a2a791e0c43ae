//! The MiniC translation core as a library: AST→IR translation and IR→ARM32
//! instruction selection. See `src/bin` for the CLI driver.

pub mod back;
pub mod common;
pub mod front;
pub mod middle;
