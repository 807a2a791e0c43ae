//! Component C4: the IR→ARM32 instruction selector.
//!
//! There is no register-allocation pass, intentionally: every value — local,
//! formal, mem, or instruction result — lives in its own stack slot, and
//! every operand is reloaded from its slot into a scratch register
//! immediately before use. No register allocator; every variable is saved on
//! the stack, and a per-opcode dispatch table picks the instruction forms.

use std::collections::BTreeMap as Map;

use crate::back::asm::{
    AsmFunction, Cond, GlobalAsm, Instruction, Program, Register, ARG_REGISTERS, SCRATCH_POOL,
};
use crate::common::Id;
use crate::middle::module::Function;
use crate::middle::render::value_type;
use crate::middle::value::{InstId, LabelId, LocalId};
use crate::middle::{Module, Op, Type, Value};

/// Per-function stack-frame layout: every local/formal/mem slot and every
/// value-producing instruction gets a fixed word offset from `sp`, assigned
/// once up front and then used as ground truth by every opcode handler.
struct Layout {
    local_offset: Map<LocalId, i32>,
    inst_offset: Map<InstId, i32>,
    /// Offset of the first word reserved for a callee's 5th-and-later
    /// stacked arguments.
    call_arg_base: i32,
    /// Total frame size, 8-byte aligned per AAPCS.
    frame_size: i32,
}

fn build_layout(func: &Function) -> Layout {
    let mut offset = 0i32;
    let mut local_offset = Map::new();
    for (i, slot) in func.locals.iter().enumerate() {
        local_offset.insert(i as LocalId, offset);
        offset += slot.ty.byte_size().max(4) as i32;
    }

    let mut inst_offset = Map::new();
    for (i, _inst) in func.insts.iter().enumerate() {
        if func.produces_value(i as u32) {
            inst_offset.insert(i as u32, offset);
            offset += 4;
        }
    }

    let call_arg_base = offset;
    if func.max_call_arg_count() > 4 {
        offset += (func.max_call_arg_count() - 4) as i32 * 4;
    }

    let frame_size = (offset + 7) & !7;
    Layout { local_offset, inst_offset, call_arg_base, frame_size }
}

/// The registers this backend always saves, regardless of whether a
/// function happens to use all of them — simpler and safer than tracking
/// per-function clobber sets, at the cost of a handful of unneeded
/// push/pop slots in small leaf functions.
fn saved_registers() -> Vec<Register> {
    let mut regs: Vec<Register> = SCRATCH_POOL.to_vec();
    regs.push(Register::Lr);
    regs
}

fn label_name(func: &Function, label: LabelId) -> Id {
    let text = if label == func.exit_label {
        format!("{}_exit", func.name)
    } else {
        format!("{}_L{label}", func.name)
    };
    internment::Intern::new(text)
}

/// Loads `v`'s value into `reg`. For an `Array`-typed `Value` this loads its
/// *address* instead (arrays aren't register-sized, so "the value of an
/// array" is only ever meaningful as a base for address arithmetic, the
/// `Add(base, byteOffset)` an index computation ends with).
fn load_value(out: &mut Vec<Instruction>, layout: &Layout, module: &Module, func: &Function, v: Value, reg: Register) {
    match v {
        Value::ConstInt(n) => out.push(Instruction::MovImm { dst: reg, imm: n }),
        Value::Global(id) => {
            let g = &module.globals[id as usize];
            out.push(Instruction::LdrGlobalAddr { dst: reg, name: g.name });
            if !matches!(g.ty, Type::Array(..)) {
                out.push(Instruction::Ldr { dst: reg, base: reg, offset: 0 });
            }
        }
        Value::Local(id) => {
            let offset = layout.local_offset[&id];
            if matches!(value_type(module, func, v), Type::Array(..)) {
                out.push(Instruction::AddImm { dst: reg, lhs: Register::Sp, imm: offset });
            } else {
                out.push(Instruction::Ldr { dst: reg, base: Register::Sp, offset });
            }
        }
        Value::Inst(id) => {
            out.push(Instruction::Ldr { dst: reg, base: Register::Sp, offset: layout.inst_offset[&id] });
        }
    }
}

/// Stores `reg` into `dst`'s slot. `dst` is always a simple scalar/pointer
/// destination here (a `Local`, `Inst`, or `Global`); storing through a
/// computed address is handled separately in `gen_move`.
fn store_to(out: &mut Vec<Instruction>, layout: &Layout, module: &Module, dst: Value, reg: Register, scratch: Register) {
    match dst {
        Value::Local(id) => out.push(Instruction::Str { src: reg, base: Register::Sp, offset: layout.local_offset[&id] }),
        Value::Inst(id) => out.push(Instruction::Str { src: reg, base: Register::Sp, offset: layout.inst_offset[&id] }),
        Value::Global(id) => {
            let name = module.globals[id as usize].name;
            out.push(Instruction::LdrGlobalAddr { dst: scratch, name });
            out.push(Instruction::Str { src: reg, base: scratch, offset: 0 });
        }
        Value::ConstInt(_) => unreachable!("Move destination cannot be a constant"),
    }
}

/// A per-instruction round-robin pair of scratch registers — a "simple
/// register allocator" in the most literal sense: no live range ever
/// survives more than one instruction, so there's nothing to color.
struct Scratch {
    cursor: usize,
}

impl Scratch {
    fn new() -> Self {
        Scratch { cursor: 0 }
    }

    fn next2(&mut self) -> (Register, Register) {
        let a = SCRATCH_POOL[self.cursor % SCRATCH_POOL.len()];
        let b = SCRATCH_POOL[(self.cursor + 1) % SCRATCH_POOL.len()];
        self.cursor = (self.cursor + 2) % SCRATCH_POOL.len();
        (a, b)
    }

    fn next3(&mut self) -> (Register, Register, Register) {
        let a = SCRATCH_POOL[self.cursor % SCRATCH_POOL.len()];
        let b = SCRATCH_POOL[(self.cursor + 1) % SCRATCH_POOL.len()];
        let c = SCRATCH_POOL[(self.cursor + 2) % SCRATCH_POOL.len()];
        self.cursor = (self.cursor + 3) % SCRATCH_POOL.len();
        (a, b, c)
    }
}

fn gen_move(out: &mut Vec<Instruction>, layout: &Layout, module: &Module, func: &Function, scratch: &mut Scratch, dst: Value, src: Value) {
    let dst_ty = value_type(module, func, dst);
    let src_ty = value_type(module, func, src);
    let (ra, rb) = scratch.next2();

    if dst_ty.is_pointer() && !src_ty.is_pointer() {
        // Store-through-pointer: dst is itself a Value carrying an address.
        load_value(out, layout, module, func, dst, ra);
        load_value(out, layout, module, func, src, rb);
        out.push(Instruction::Str { src: rb, base: ra, offset: 0 });
    } else if src_ty.is_pointer() && !dst_ty.is_pointer() {
        // Load-through-pointer.
        load_value(out, layout, module, func, src, ra);
        out.push(Instruction::Ldr { dst: rb, base: ra, offset: 0 });
        store_to(out, layout, module, dst, rb, ra);
    } else {
        load_value(out, layout, module, func, src, ra);
        store_to(out, layout, module, dst, ra, rb);
    }
}

fn gen_binary(
    out: &mut Vec<Instruction>,
    layout: &Layout,
    module: &Module,
    func: &Function,
    scratch: &mut Scratch,
    op: crate::middle::ArithOp,
    lhs: Value,
    rhs: Value,
    result: InstId,
) {
    use crate::middle::ArithOp::*;
    if op == Mod {
        let (ra, rb, rc) = scratch.next3();
        load_value(out, layout, module, func, lhs, ra);
        load_value(out, layout, module, func, rhs, rb);
        out.push(Instruction::Sdiv { dst: rc, lhs: ra, rhs: rb });
        out.push(Instruction::Mul { dst: rc, lhs: rc, rhs: rb });
        out.push(Instruction::Sub { dst: ra, lhs: ra, rhs: rc });
        out.push(Instruction::Str { src: ra, base: Register::Sp, offset: layout.inst_offset[&result] });
        return;
    }

    let (ra, rb) = scratch.next2();
    load_value(out, layout, module, func, lhs, ra);
    load_value(out, layout, module, func, rhs, rb);
    let inst = match op {
        Add => Instruction::Add { dst: ra, lhs: ra, rhs: rb },
        Sub => Instruction::Sub { dst: ra, lhs: ra, rhs: rb },
        Mul => Instruction::Mul { dst: ra, lhs: ra, rhs: rb },
        Div => Instruction::Sdiv { dst: ra, lhs: ra, rhs: rb },
        Mod => unreachable!("handled above"),
    };
    out.push(inst);
    out.push(Instruction::Str { src: ra, base: Register::Sp, offset: layout.inst_offset[&result] });
}

fn gen_cmp(
    out: &mut Vec<Instruction>,
    layout: &Layout,
    module: &Module,
    func: &Function,
    scratch: &mut Scratch,
    op: crate::middle::CmpOp,
    lhs: Value,
    rhs: Value,
    result: InstId,
) {
    let (ra, rb) = scratch.next2();
    load_value(out, layout, module, func, lhs, ra);
    load_value(out, layout, module, func, rhs, rb);
    out.push(Instruction::Cmp { lhs: ra, rhs: rb });
    out.push(Instruction::MovImm { dst: ra, imm: 0 });
    out.push(Instruction::MovCond { cond: Cond::from(op), dst: ra, imm: 1 });
    out.push(Instruction::Str { src: ra, base: Register::Sp, offset: layout.inst_offset[&result] });
}

/// `cond` is always an already-materialized 0/1 `Int1` Value (the `Cmp`/
/// `MovCond` pair a comparison or the "any other expression" fallback both
/// produce). Branching is therefore just a zero test, regardless of which
/// comparison originally produced the flag.
fn gen_branch(
    out: &mut Vec<Instruction>,
    layout: &Layout,
    module: &Module,
    func: &Function,
    scratch: &mut Scratch,
    cond: Value,
    then_label: LabelId,
    else_label: LabelId,
) {
    let (ra, rb) = scratch.next2();
    load_value(out, layout, module, func, cond, ra);
    load_value(out, layout, module, func, Value::ConstInt(0), rb);
    out.push(Instruction::Cmp { lhs: ra, rhs: rb });
    out.push(Instruction::Bcond { cond: Cond::Ne, target: label_name(func, then_label) });
    out.push(Instruction::B { target: label_name(func, else_label) });
}

fn gen_call(
    out: &mut Vec<Instruction>,
    layout: &Layout,
    module: &Module,
    func: &Function,
    scratch: &mut Scratch,
    callee: Id,
    args: &[Value],
    result: Option<InstId>,
) {
    for (i, &arg) in args.iter().enumerate() {
        if i < ARG_REGISTERS.len() {
            load_value(out, layout, module, func, arg, ARG_REGISTERS[i]);
        } else {
            let (ra, _) = scratch.next2();
            load_value(out, layout, module, func, arg, ra);
            let offset = layout.call_arg_base + (i as i32 - ARG_REGISTERS.len() as i32) * 4;
            out.push(Instruction::Str { src: ra, base: Register::Sp, offset });
        }
    }
    out.push(Instruction::Bl { target: callee });
    if let Some(id) = result {
        out.push(Instruction::Str { src: Register::R0, base: Register::Sp, offset: layout.inst_offset[&id] });
    }
}

fn gen_function(module: &Module, func: &Function) -> AsmFunction {
    let layout = build_layout(func);
    log::debug!(target: "minic::codegen", "{}: selecting, frame_size={}", func.name, layout.frame_size);
    let mut out = Vec::new();
    let mut scratch = Scratch::new();

    for (i, inst) in func.insts.iter().enumerate() {
        let id = i as InstId;
        log::trace!(target: "minic::codegen", "{}: dispatch #{id} {:?}", func.name, inst.op);
        match &inst.op {
            Op::Entry => {
                let regs = saved_registers();
                let saved_bytes = regs.len() as i32 * 4;
                out.push(Instruction::Push { registers: regs });
                if layout.frame_size > 0 {
                    out.push(Instruction::AddImm { dst: Register::Sp, lhs: Register::Sp, imm: -layout.frame_size });
                }
                // Shadow-copy the incoming arguments into their formal
                // parameters' stack slots: the first four live in
                // ARG_REGISTERS, the rest sit on the caller's stack at the
                // point of the `bl`, which — since `bl` doesn't move `sp` —
                // is `frame_size + saved_bytes` above this function's own
                // post-prologue `sp`.
                for (i, &param) in func.params.iter().enumerate() {
                    let dst_offset = layout.local_offset[&param];
                    if i < ARG_REGISTERS.len() {
                        out.push(Instruction::Str { src: ARG_REGISTERS[i], base: Register::Sp, offset: dst_offset });
                    } else {
                        let (tmp, _) = scratch.next2();
                        let src_offset = layout.frame_size + saved_bytes + (i as i32 - ARG_REGISTERS.len() as i32) * 4;
                        out.push(Instruction::Ldr { dst: tmp, base: Register::Sp, offset: src_offset });
                        out.push(Instruction::Str { src: tmp, base: Register::Sp, offset: dst_offset });
                    }
                }
            }
            Op::Exit => {
                if let Some(slot) = func.return_slot {
                    out.push(Instruction::Ldr {
                        dst: Register::R0,
                        base: Register::Sp,
                        offset: layout.local_offset[&slot],
                    });
                }
                if layout.frame_size > 0 {
                    out.push(Instruction::AddImm { dst: Register::Sp, lhs: Register::Sp, imm: layout.frame_size });
                }
                let mut regs = saved_registers();
                // Popping directly into `pc` is the idiomatic ARM32 return;
                // swap the saved `lr` slot for `pc`.
                if let Some(last) = regs.last_mut() {
                    *last = Register::Pc;
                }
                out.push(Instruction::Pop { registers: regs });
            }
            Op::Label(label) => out.push(Instruction::Label(label_name(func, *label))),
            Op::Goto(label) => out.push(Instruction::B { target: label_name(func, *label) }),
            Op::Branch { cond, then_label, else_label } => {
                gen_branch(&mut out, &layout, module, func, &mut scratch, *cond, *then_label, *else_label)
            }
            Op::Move { dst, src } => gen_move(&mut out, &layout, module, func, &mut scratch, *dst, *src),
            Op::Binary { op, lhs, rhs } => gen_binary(&mut out, &layout, module, func, &mut scratch, *op, *lhs, *rhs, id),
            Op::Cmp { op, lhs, rhs } => gen_cmp(&mut out, &layout, module, func, &mut scratch, *op, *lhs, *rhs, id),
            Op::Neg(src) => {
                let (ra, _) = scratch.next2();
                load_value(&mut out, &layout, module, func, *src, ra);
                out.push(Instruction::Rsb { dst: ra, src: ra });
                out.push(Instruction::Str { src: ra, base: Register::Sp, offset: layout.inst_offset[&id] });
            }
            Op::Call { callee, args } => {
                let result = if func.produces_value(id) { Some(id) } else { None };
                gen_call(&mut out, &layout, module, func, &mut scratch, *callee, args, result)
            }
        }
    }

    AsmFunction { name: func.name, instructions: out }
}

/// `codeGen`: lowers every user-defined (non-external) function in `module`
/// into an ARM32 [`Program`].
pub fn code_gen(module: &Module) -> Program {
    let globals = module
        .globals
        .iter()
        .map(|g| GlobalAsm { name: g.name, size: g.ty.byte_size().max(4), init: g.init })
        .collect();

    let functions = module
        .functions
        .values()
        .filter(|f| !f.is_external)
        .map(|f| gen_function(module, f))
        .collect();

    Program { globals, functions }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middle::module::Module as Mod;

    fn id(s: &str) -> Id {
        internment::Intern::new(s.to_string())
    }

    #[test]
    fn entry_and_exit_bracket_the_function_with_push_and_pop() {
        let mut module = Mod::new();
        module.define_function(id("f"), Type::Void, vec![], 1).unwrap();
        module.enter_function(id("f"));
        module.current_mut().append(Op::Entry, Type::Void);
        let exit = module.current_mut().exit_label;
        module.current_mut().place_label(exit);
        module.current_mut().append(Op::Exit, Type::Void);
        module.leave_function();

        let func = module.find_function(id("f")).unwrap();
        let asm = gen_function(&module, func);
        assert!(matches!(asm.instructions.first(), Some(Instruction::Push { .. })));
        assert!(matches!(asm.instructions.last(), Some(Instruction::Pop { .. })));
    }

    #[test]
    fn entry_stores_incoming_argument_registers_into_formal_slots() {
        let mut module = Mod::new();
        module.define_function(id("f"), Type::Int32, vec![Type::Int32], 1).unwrap();
        module.enter_function(id("f"));
        module.current_mut().append(Op::Entry, Type::Void);
        module.current_mut().new_formal(Type::Int32, None);
        let exit = module.current_mut().exit_label;
        module.current_mut().place_label(exit);
        module.current_mut().append(Op::Exit, Type::Void);
        module.leave_function();

        let func = module.find_function(id("f")).unwrap();
        let asm = gen_function(&module, func);
        assert!(asm.instructions.iter().any(|i| matches!(
            i,
            Instruction::Str { src: Register::R0, .. }
        )));
    }

    #[test]
    fn mod_lowers_to_sdiv_mul_sub_sequence() {
        let mut module = Mod::new();
        module.define_function(id("f"), Type::Int32, vec![], 1).unwrap();
        module.enter_function(id("f"));
        module.current_mut().append(Op::Entry, Type::Void);
        let a = module.current_mut().new_local(Type::Int32, id("a"));
        let b = module.current_mut().new_local(Type::Int32, id("b"));
        module.current_mut().append(
            Op::Binary { op: crate::middle::ArithOp::Mod, lhs: Value::Local(a), rhs: Value::Local(b) },
            Type::Int32,
        );
        let exit = module.current_mut().exit_label;
        module.current_mut().place_label(exit);
        module.current_mut().append(Op::Exit, Type::Void);
        module.leave_function();

        let func = module.find_function(id("f")).unwrap();
        let asm = gen_function(&module, func);
        assert!(asm.instructions.iter().any(|i| matches!(i, Instruction::Sdiv { .. })));
        assert!(asm.instructions.iter().any(|i| matches!(i, Instruction::Mul { .. })));
        assert!(asm.instructions.iter().any(|i| matches!(i, Instruction::Sub { .. })));
    }
}
