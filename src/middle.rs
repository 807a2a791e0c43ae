//! The middle-end: the IR data model (components C1 and C2) plus its
//! textual rendering.

pub mod inst;
pub mod module;
pub mod render;
pub mod types;
pub mod value;

pub use inst::{ArithOp, CmpOp, Instruction, Op};
pub use module::{Function, Global, LocalKind, LocalSlot, Module};
pub use types::Type;
pub use value::{GlobalId, InstId, LabelId, LocalId, Value};
