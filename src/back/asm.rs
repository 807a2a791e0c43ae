//! The ARM32 backend: register file, instruction set, and program structure
//! the instruction selector (component C4) emits into.
//!
//! Unlike a full backend targeting a real calling-convention superset, this
//! one only needs to support the subset the translator ever emits: scalar and
//! pointer values, a handful of arithmetic/comparison opcodes, and calls with
//! up to a few dozen arguments. There's no separate register-allocation pass;
//! [`crate::back::codegen`] assigns a scratch register per instruction result
//! out of a small round-robin pool, and this module only knows how to print
//! whatever it's handed.
//!
//! # Registers
//!
//! AAPCS (the ARM32 EABI calling convention): `r0`-`r3` are argument/result
//! and caller-saved, `r4`-`r11` are callee-saved, `r12` (`ip`) is a scratch
//! register with no cross-call guarantees, `sp`/`lr`/`pc` are `r13`-`r15`.
//!
//! # Call stack frame
//!
//! ```txt
//!   High memory addresses
//!   +-------------------------+
//!   | Caller's frame           |
//!   +-------------------------+
//!   | Stacked arguments (5th+) |
//!   +-------------------------+
//!   | Saved lr, fp             | <- fp
//!   +-------------------------+
//!   | Locals / spills / calls  |
//!   +-------------------------+ <- sp
//!   Low memory addresses
//! ```
//!
//! `fp` is `r11`, chosen like any other callee-saved register — this backend
//! doesn't rely on frame-pointer chasing, only on the selector's own static
//! frame-offset bookkeeping.

use derive_more::Display;

use crate::common::Id;

/// The general-purpose and special-purpose ARM32 registers this backend can
/// name. `Ip` (`r12`) is reserved as the selector's address-arithmetic
/// scratch register and is never assigned to hold a live value across
/// instructions.
#[derive(Clone, Copy, Debug, Display, Eq, Hash, PartialEq, PartialOrd, Ord)]
#[allow(missing_docs)]
pub enum Register {
    #[display("r0")]
    R0,
    #[display("r1")]
    R1,
    #[display("r2")]
    R2,
    #[display("r3")]
    R3,
    #[display("r4")]
    R4,
    #[display("r5")]
    R5,
    #[display("r6")]
    R6,
    #[display("r7")]
    R7,
    #[display("r8")]
    R8,
    #[display("r9")]
    R9,
    #[display("r10")]
    R10,
    #[display("fp")]
    Fp,
    #[display("ip")]
    Ip,
    #[display("sp")]
    Sp,
    #[display("lr")]
    Lr,
    #[display("pc")]
    Pc,
}

/// The first four integer arguments go in registers, per AAPCS.
pub static ARG_REGISTERS: [Register; 4] = [Register::R0, Register::R1, Register::R2, Register::R3];

/// The registers the selector may hand out as scratch space for instruction
/// results, in allocation order. `r0`-`r3` are excluded because they carry
/// live argument/result values across a `Call`'s boundary; `Ip` is excluded
/// because it's the dedicated address-arithmetic scratch register.
pub static SCRATCH_POOL: [Register; 7] =
    [Register::R4, Register::R5, Register::R6, Register::R7, Register::R8, Register::R9, Register::R10];

/// A branch condition, carried on `b`, derived from the `CmpOp` of the `Cmp`
/// instruction a `Branch`/materialized-boolean immediately follows.
#[derive(Clone, Copy, Debug, Display, Eq, PartialEq)]
#[allow(missing_docs)]
pub enum Cond {
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

impl From<crate::middle::CmpOp> for Cond {
    fn from(op: crate::middle::CmpOp) -> Cond {
        use crate::middle::CmpOp::*;
        match op {
            Eq => Cond::Eq,
            Ne => Cond::Ne,
            Lt => Cond::Lt,
            Le => Cond::Le,
            Gt => Cond::Gt,
            Ge => Cond::Ge,
        }
    }
}

/// A single ARM32 assembly line. Operand order in every variant matches
/// AT&T/ARM UAL convention: destination first.
#[derive(Clone, Debug)]
pub enum Instruction {
    /// `mov dst, src`.
    Mov { dst: Register, src: Register },
    /// `mov dst, #imm`. The selector is responsible for splitting immediates
    /// that don't fit ARM32's 8-bit-rotated encoding into `movw`/`movt` pairs
    /// or a `ldr =imm` literal-pool load; this port always uses `movw`/`movt`
    /// for any immediate so it never needs to reason about encodability.
    MovImm { dst: Register, imm: i32 },
    /// `addCOND dst, lhs, rhs` / `subCOND` / etc., selected with a plain
    /// (unconditional) `Cond::Eq`-less mnemonic by always passing `None`.
    Add { dst: Register, lhs: Register, rhs: Register },
    AddImm { dst: Register, lhs: Register, imm: i32 },
    Sub { dst: Register, lhs: Register, rhs: Register },
    Mul { dst: Register, lhs: Register, rhs: Register },
    /// `sdiv dst, lhs, rhs` (signed integer divide, ARMv7-A with the integer
    /// divide extension).
    Sdiv { dst: Register, lhs: Register, rhs: Register },
    /// `rsb dst, src, #0` — ARM32 has no dedicated `neg`; a reverse-subtract
    /// from zero is the idiomatic substitute.
    Rsb { dst: Register, src: Register },
    /// `cmp lhs, rhs`, setting condition flags for the following `b<cond>`
    /// or `mov<cond>`.
    Cmp { lhs: Register, rhs: Register },
    /// `mov<cond> dst, #imm`, used to materialize a 0/1 boolean without a
    /// branch — `Int1` values are rendered this way rather than with a
    /// conditional jump.
    MovCond { cond: Cond, dst: Register, imm: i32 },
    /// `ldr dst, [base, #offset]`.
    Ldr { dst: Register, base: Register, offset: i32 },
    /// `str src, [base, #offset]`.
    Str { src: Register, base: Register, offset: i32 },
    /// `ldr dst, =name` — PC-relative load of a global's address via the
    /// literal pool.
    LdrGlobalAddr { dst: Register, name: Id },
    /// `push {r1, r2, ...}`.
    Push { registers: Vec<Register> },
    /// `pop {r1, r2, ...}`.
    Pop { registers: Vec<Register> },
    /// `b target`.
    B { target: Id },
    /// `b<cond> target`.
    Bcond { cond: Cond, target: Id },
    /// `bl target` — call, linking `lr` to the return address.
    Bl { target: Id },
    /// `bx lr` — return.
    BxLr,
    /// A bare label definition, `name:`.
    Label(Id),
}

impl std::fmt::Display for Instruction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Instruction::Mov { dst, src } => write!(f, "  mov {dst}, {src}"),
            Instruction::MovImm { dst, imm } => {
                write!(f, "  movw {dst}, #{}\n  movt {dst}, #{}", *imm as u32 & 0xFFFF, (*imm as u32) >> 16)
            }
            Instruction::Add { dst, lhs, rhs } => write!(f, "  add {dst}, {lhs}, {rhs}"),
            Instruction::AddImm { dst, lhs, imm } => write!(f, "  add {dst}, {lhs}, #{imm}"),
            Instruction::Sub { dst, lhs, rhs } => write!(f, "  sub {dst}, {lhs}, {rhs}"),
            Instruction::Mul { dst, lhs, rhs } => write!(f, "  mul {dst}, {lhs}, {rhs}"),
            Instruction::Sdiv { dst, lhs, rhs } => write!(f, "  sdiv {dst}, {lhs}, {rhs}"),
            Instruction::Rsb { dst, src } => write!(f, "  rsb {dst}, {src}, #0"),
            Instruction::Cmp { lhs, rhs } => write!(f, "  cmp {lhs}, {rhs}"),
            Instruction::MovCond { cond, dst, imm } => write!(f, "  mov{cond} {dst}, #{imm}"),
            Instruction::Ldr { dst, base, offset } => write!(f, "  ldr {dst}, [{base}, #{offset}]"),
            Instruction::Str { src, base, offset } => write!(f, "  str {src}, [{base}, #{offset}]"),
            Instruction::LdrGlobalAddr { dst, name } => write!(f, "  ldr {dst}, ={name}"),
            Instruction::Push { registers } => write!(f, "  push {{{}}}", join(registers)),
            Instruction::Pop { registers } => write!(f, "  pop {{{}}}", join(registers)),
            Instruction::B { target } => write!(f, "  b {target}"),
            Instruction::Bcond { cond, target } => write!(f, "  b{cond} {target}"),
            Instruction::Bl { target } => write!(f, "  bl {target}"),
            Instruction::BxLr => write!(f, "  bx lr"),
            Instruction::Label(name) => write!(f, "{name}:"),
        }
    }
}

fn join(registers: &[Register]) -> String {
    registers.iter().map(Register::to_string).collect::<Vec<_>>().join(", ")
}

/// One function's emitted instruction stream.
#[derive(Debug)]
pub struct AsmFunction {
    pub name: Id,
    pub instructions: Vec<Instruction>,
}

/// A global variable's data-section entry.
#[derive(Debug)]
pub struct GlobalAsm {
    pub name: Id,
    pub size: u32,
    pub init: Option<i32>,
}

/// The whole output program: a `.data`/`.bss` section of globals followed by
/// a `.text` section of functions, rendered as a stream of ARM32 mnemonic
/// lines.
#[derive(Debug, Default)]
pub struct Program {
    pub globals: Vec<GlobalAsm>,
    pub functions: Vec<AsmFunction>,
}

impl Program {
    pub fn asm_code(&self) -> String {
        let mut out = String::new();
        if !self.globals.is_empty() {
            out.push_str(".data\n");
            for g in &self.globals {
                match g.init {
                    Some(v) if v != 0 => {
                        out.push_str(&format!("{}:\n  .word {v}\n", g.name));
                    }
                    _ => {
                        out.push_str(&format!("{}:\n  .space {}\n", g.name, g.size));
                    }
                }
            }
        }
        out.push_str(".text\n");
        for func in &self.functions {
            out.push_str(&format!(".global {}\n{}:\n", func.name, func.name));
            for inst in &func.instructions {
                out.push_str(&inst.to_string());
                out.push('\n');
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mov_imm_splits_into_movw_movt() {
        let inst = Instruction::MovImm { dst: Register::R0, imm: 0x1234_5678 };
        let text = inst.to_string();
        assert!(text.contains("movw r0, #22136"));
        assert!(text.contains("movt r0, #4660"));
    }

    #[test]
    fn program_renders_data_then_text() {
        let name: Id = internment::Intern::new("f".to_string());
        let prog = Program {
            globals: vec![GlobalAsm { name: internment::Intern::new("g".to_string()), size: 4, init: None }],
            functions: vec![AsmFunction { name, instructions: vec![Instruction::BxLr] }],
        };
        let code = prog.asm_code();
        let data_pos = code.find(".data").unwrap();
        let text_pos = code.find(".text").unwrap();
        assert!(data_pos < text_pos);
        assert!(code.contains("bx lr"));
    }
}
