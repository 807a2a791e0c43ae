//! Component C1: the Value universe.
//!
//! Values don't hold raw pointers to each other; instructions and locals
//! live in per-[`crate::middle::Function`] arenas and are referenced by a
//! small integer handle. `Value` is the tagged union of everything that can
//! be an instruction operand.

/// Index into a [`crate::middle::Module`]'s global arena.
pub type GlobalId = u32;

/// Index into a [`crate::middle::Function`]'s local arena (covers
/// `LocalVariable`, `FormalParam`, and `MemVariable` — see
/// [`crate::middle::LocalKind`]).
pub type LocalId = u32;

/// Index into a [`crate::middle::Function`]'s instruction arena.
pub type InstId = u32;

/// Opaque label identity, allocated independently of instruction-arena
/// position so a `goto`/`Branch` can reference a label before it has been
/// placed in the instruction stream — avoids the forward-reference problem
/// a plain arena index would otherwise create.
pub type LabelId = u32;

/// An operand to an instruction, or the left-hand side of a `Move`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Value {
    /// `ConstInt`. Values are plain data, so two `ConstInt`s with the same
    /// payload already compare equal and interchangeably stand in for a
    /// single canonical value; there is no separate intern table to
    /// maintain.
    ConstInt(i32),
    /// `GlobalVariable`.
    Global(GlobalId),
    /// `LocalVariable`, `FormalParam`, or `MemVariable` — see
    /// [`crate::middle::LocalSlot::kind`] to distinguish them.
    Local(LocalId),
    /// The result of an `Instruction`, or a `LabelInstruction` used as a
    /// jump target.
    Inst(InstId),
}

impl Value {
    pub fn as_const(&self) -> Option<i32> {
        match self {
            Value::ConstInt(v) => Some(*v),
            _ => None,
        }
    }
}
