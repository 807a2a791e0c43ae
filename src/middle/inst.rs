//! The IR instruction set.
//!
//! Every instruction is a tagged variant with a common header (opcode,
//! result type) plus per-opcode operands: a flat enum instead of an open
//! inheritance hierarchy.

use derive_more::Display;

use crate::common::Id;
use crate::middle::value::{LabelId, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum ArithOp {
    #[display("add")]
    Add,
    #[display("sub")]
    Sub,
    #[display("mul")]
    Mul,
    #[display("div")]
    Div,
    #[display("mod")]
    Mod,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum CmpOp {
    #[display("eq")]
    Eq,
    #[display("ne")]
    Ne,
    #[display("lt")]
    Lt,
    #[display("le")]
    Le,
    #[display("gt")]
    Gt,
    #[display("ge")]
    Ge,
}

impl CmpOp {
    /// The comparison whose truth value is the logical negation of this
    /// one, used when lowering `!(a < b)`-shaped conditions.
    pub fn negate(self) -> CmpOp {
        match self {
            CmpOp::Eq => CmpOp::Ne,
            CmpOp::Ne => CmpOp::Eq,
            CmpOp::Lt => CmpOp::Ge,
            CmpOp::Le => CmpOp::Gt,
            CmpOp::Gt => CmpOp::Le,
            CmpOp::Ge => CmpOp::Lt,
        }
    }
}

#[derive(Debug, Clone)]
pub enum Op {
    /// The fixed first instruction of every function. Renders as `entry:`.
    Entry,
    /// The fixed last instruction. Carries no operands of its own (the
    /// return value, if any, lives in the function's return slot); renders
    /// no text of its own; it immediately follows the `Label` placing the
    /// function's exit label.
    Exit,
    /// A `LabelInstruction`: a named position, valid as a jump target. The
    /// function's designated exit label renders as `exit:` instead of the
    /// generic `.LN:` form.
    Label(LabelId),
    /// Unconditional jump.
    Goto(LabelId),
    /// `bc cond, label then, label else`. `cond` is expected to be an
    /// `Int1`-typed Value, normally the result of a `Cmp`.
    Branch {
        cond: Value,
        then_label: LabelId,
        else_label: LabelId,
    },
    /// Scalar copy, pointer copy, store-through-pointer, or
    /// load-through-pointer, disambiguated by `dst`/`src`'s types at
    /// selection time.
    Move { dst: Value, src: Value },
    /// `dst = op lhs, rhs`, result type `Int32`.
    Binary { op: ArithOp, lhs: Value, rhs: Value },
    /// `dst = cmp op lhs, rhs`, result type `Int1`.
    Cmp { op: CmpOp, lhs: Value, rhs: Value },
    /// `dst = -src`.
    Neg(Value),
    /// `[dst =] call callee(args...)`. `dst` exists iff the callee's return
    /// type is non-`Void` (tracked via the enclosing `Instruction`'s
    /// `result_type`).
    Call { callee: Id, args: Vec<Value> },
}

impl Op {
    /// Whether this opcode, as the instruction at `self_id`, produces a
    /// usable `Value::Inst(self_id)` — i.e. whether it gets a `%t` name
    /// during renaming. `Call` additionally depends on its declared return
    /// type, so it isn't covered here; see
    /// [`crate::middle::module::Function::produces_value`].
    pub fn always_produces_value(&self) -> bool {
        matches!(self, Op::Binary { .. } | Op::Cmp { .. } | Op::Neg(_))
    }

    pub fn is_label(&self) -> bool {
        matches!(self, Op::Label(_))
    }

    pub fn is_terminator(&self) -> bool {
        matches!(self, Op::Goto(_) | Op::Branch { .. } | Op::Exit)
    }
}

/// An instruction in a function's linear instruction stream.
#[derive(Debug, Clone)]
pub struct Instruction {
    pub op: Op,
    pub result_type: crate::middle::Type,
}
