//! `renameAll` and the textual IR printer.
//!
//! Renaming assigns contiguous `%tN` (temps/formals/mem), `%lN` (locals),
//! and `.LN` (labels) names. It's a pure function of a [`Function`]'s arena
//! contents, so running it twice on the same `Function` always produces the
//! same names — there's nothing here that isn't a deterministic fold over
//! `locals`/`insts`.

use std::fmt::Write as _;

use crate::common::Map;
use crate::middle::inst::Op;
use crate::middle::module::{Function, LocalKind, Module};
use crate::middle::value::{LabelId, Value};

pub struct Names {
    /// Indexed by `LocalId`.
    locals: Vec<String>,
    /// Indexed by instruction-arena position; empty string for
    /// non-value-producing instructions.
    insts: Vec<String>,
    labels: Map<LabelId, String>,
}

pub fn rename(func: &Function) -> Names {
    let mut t = 0u32;
    let mut l = 0u32;
    let mut lbl = 0u32;

    let mut locals = Vec::with_capacity(func.locals.len());
    for slot in &func.locals {
        let name = match slot.kind {
            LocalKind::Local { .. } => {
                let n = format!("%l{l}");
                l += 1;
                n
            }
            LocalKind::Formal { .. } | LocalKind::Mem => {
                let n = format!("%t{t}");
                t += 1;
                n
            }
        };
        locals.push(name);
    }

    let mut insts = Vec::with_capacity(func.insts.len());
    let mut labels = Map::new();
    for (i, inst) in func.insts.iter().enumerate() {
        let name = match &inst.op {
            Op::Label(id) => {
                let text = if *id == func.exit_label {
                    "exit".to_string()
                } else {
                    let n = format!(".L{lbl}");
                    lbl += 1;
                    n
                };
                labels.insert(*id, text);
                String::new()
            }
            _ if func.produces_value(i as u32) => {
                let n = format!("%t{t}");
                t += 1;
                n
            }
            _ => String::new(),
        };
        insts.push(name);
    }

    Names { locals, insts, labels }
}

impl Names {
    fn local(&self, id: u32) -> &str {
        &self.locals[id as usize]
    }

    fn inst(&self, id: u32) -> &str {
        &self.insts[id as usize]
    }

    fn label(&self, id: LabelId) -> &str {
        &self.labels[&id]
    }
}

fn format_value(v: Value, module: &Module, names: &Names) -> String {
    match v {
        Value::ConstInt(n) => n.to_string(),
        Value::Global(id) => format!("@{}", module.globals[id as usize].name),
        Value::Local(id) => names.local(id).to_string(),
        Value::Inst(id) => names.inst(id).to_string(),
    }
}

/// Renders a `{type} {name}` header, with array dimensions (if any) placed
/// after the name rather than the element type — `i32 arr[10][2]`, not
/// `i32[10][2] arr`.
fn render_typed_name(ty: &crate::middle::Type, name: &str) -> String {
    match ty {
        crate::middle::Type::Array(elem, dims) => {
            let mut s = format!("{elem} {name}");
            for d in dims {
                let _ = write!(s, "[{d}]");
            }
            s
        }
        _ => format!("{ty} {name}"),
    }
}

/// Renders `global` array dimensions, if any, as `[d1][d2]...` after the
/// element type, matching the array-parameter decay display form.
fn render_formal_header(func: &Function, local: u32, name: &str) -> String {
    let slot = &func.locals[local as usize];
    match &slot.kind {
        LocalKind::Formal {
            original_array_type: Some(ty @ crate::middle::Type::Array(..)),
        } => render_typed_name(ty, name),
        _ => format!("{} {name}", slot.ty),
    }
}

pub fn render_function(module: &Module, func: &Function) -> String {
    let names = rename(func);
    let mut out = String::new();

    let params = func
        .params
        .iter()
        .map(|&id| render_formal_header(func, id, names.local(id)))
        .collect::<Vec<_>>()
        .join(", ");
    let _ = writeln!(out, "define {} @{}({params}) {{", func.ret_type, func.name);

    for (i, slot) in func.locals.iter().enumerate() {
        if let (LocalKind::Local { .. }, Some(src)) = (&slot.kind, slot.src_name) {
            let header = render_typed_name(&slot.ty, names.local(i as u32));
            let _ = writeln!(out, "  declare {header} ; variable: {src}");
        }
    }

    for (i, inst) in func.insts.iter().enumerate() {
        let id = i as u32;
        let line = match &inst.op {
            Op::Entry => "entry:".to_string(),
            Op::Exit => continue,
            Op::Label(lid) => format!("{}:", names.label(*lid)),
            Op::Goto(lid) => format!("br label {}", names.label(*lid)),
            Op::Branch {
                cond,
                then_label,
                else_label,
            } => format!(
                "bc {}, label {}, label {}",
                format_value(*cond, module, &names),
                names.label(*then_label),
                names.label(*else_label)
            ),
            Op::Move { dst, src } => {
                let dst_ty = value_type(module, func, *dst);
                let src_ty = value_type(module, func, *src);
                let dst_s = format_value(*dst, module, &names);
                let src_s = format_value(*src, module, &names);
                if dst_ty.is_pointer() && !src_ty.is_pointer() {
                    format!("*{dst_s} = {src_s}")
                } else if src_ty.is_pointer() && !dst_ty.is_pointer() {
                    format!("{dst_s} = *{src_s}")
                } else {
                    format!("{dst_s} = {src_s}")
                }
            }
            Op::Binary { op, lhs, rhs } => format!(
                "{} = {op} {},{}",
                names.inst(id),
                format_value(*lhs, module, &names),
                format_value(*rhs, module, &names)
            ),
            Op::Cmp { op, lhs, rhs } => format!(
                "{} = cmp {op} {}, {}",
                names.inst(id),
                format_value(*lhs, module, &names),
                format_value(*rhs, module, &names)
            ),
            Op::Neg(src) => format!("{} = neg {}", names.inst(id), format_value(*src, module, &names)),
            Op::Call { callee, args } => {
                let args_s = args
                    .iter()
                    .map(|a| {
                        format!(
                            "{} {}",
                            value_type(module, func, *a),
                            format_value(*a, module, &names)
                        )
                    })
                    .collect::<Vec<_>>()
                    .join(", ");
                if inst.result_type.is_void() {
                    format!("call void @{callee}({args_s})")
                } else {
                    format!(
                        "{} = call {} @{callee}({args_s})",
                        names.inst(id),
                        inst.result_type
                    )
                }
            }
        };
        let _ = writeln!(out, "  {line}");
    }

    out.push_str("}\n");
    out
}

pub fn render_module(module: &Module) -> String {
    let mut out = String::new();
    for g in &module.globals {
        match (&g.ty, &g.init) {
            (crate::middle::Type::Array(elem, dims), _) => {
                let mut line = format!("declare {elem} @{}", g.name);
                for d in dims {
                    let _ = write!(line, "[{d}]");
                }
                let _ = writeln!(out, "{line}");
            }
            (ty, Some(init)) => {
                let _ = writeln!(out, "declare {ty} @{} = {init}", g.name);
            }
            (ty, None) => {
                let _ = writeln!(out, "declare {ty} @{}", g.name);
            }
        }
    }
    for func in module.functions.values() {
        if func.is_external {
            continue;
        }
        out.push_str(&render_function(module, func));
    }
    out
}

/// Resolves a `Value`'s type by consulting whichever arena owns it. Needed
/// because `Move`'s selector-facing semantics (scalar vs. pointer store/load)
/// depend on both operands' types, which aren't stored on the `Move` itself.
pub(crate) fn value_type(module: &Module, func: &Function, v: Value) -> crate::middle::Type {
    match v {
        Value::ConstInt(_) => crate::middle::Type::Int32,
        Value::Global(id) => module.globals[id as usize].ty.clone(),
        Value::Local(id) => func.locals[id as usize].ty.clone(),
        Value::Inst(id) => func.insts[id as usize].result_type.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middle::ArithOp;
    use crate::middle::Type;
    use pretty_assertions::assert_eq;

    fn id(s: &str) -> crate::common::Id {
        internment::Intern::new(s.to_string())
    }

    #[test]
    fn rename_is_deterministic_across_runs() {
        let mut module = Module::new();
        module
            .define_function(id("f"), Type::Int32, vec![Type::Int32], 1)
            .unwrap();
        module.enter_function(id("f"));
        module.current_mut().append(crate::middle::Op::Entry, Type::Void);
        let formal = module.current_mut().new_formal(Type::Int32, None);
        let local = module.current_mut().new_local(Type::Int32, id("x"));
        module.current_mut().append(
            crate::middle::Op::Move {
                dst: Value::Local(local),
                src: Value::Local(formal),
            },
            Type::Void,
        );
        module.leave_function();

        let func = module.find_function(id("f")).unwrap();
        let n1 = rename(func);
        let n2 = rename(func);
        assert_eq!(n1.locals, n2.locals);
        assert_eq!(n1.insts, n2.insts);
    }

    #[test]
    fn formal_and_local_get_distinct_prefixes() {
        let mut module = Module::new();
        module
            .define_function(id("f"), Type::Int32, vec![Type::Int32], 1)
            .unwrap();
        module.enter_function(id("f"));
        let formal = module.current_mut().new_formal(Type::Int32, None);
        let local = module.current_mut().new_local(Type::Int32, id("x"));
        module.leave_function();

        let func = module.find_function(id("f")).unwrap();
        let names = rename(func);
        assert_eq!(names.local(formal), "%t0");
        assert_eq!(names.local(local), "%l0");
    }

    #[test]
    fn binary_instruction_renders_without_space_after_comma() {
        let mut module = Module::new();
        module.define_function(id("f"), Type::Int32, vec![], 1).unwrap();
        module.enter_function(id("f"));
        module.current_mut().append(crate::middle::Op::Entry, Type::Void);
        let a = module.current_mut().new_local(Type::Int32, id("a"));
        let b = module.current_mut().new_local(Type::Int32, id("b"));
        module.current_mut().append(
            crate::middle::Op::Binary {
                op: ArithOp::Add,
                lhs: Value::Local(a),
                rhs: Value::Local(b),
            },
            Type::Int32,
        );
        let exit = module.current_mut().exit_label;
        module.current_mut().place_label(exit);
        module.current_mut().append(crate::middle::Op::Exit, Type::Void);
        module.leave_function();

        let func = module.find_function(id("f")).unwrap();
        let text = render_function(&module, func);
        assert!(text.contains("= add %l0,%l1"), "{text}");
        assert!(text.contains("exit:"), "{text}");
    }

    #[test]
    fn local_array_declares_dims_after_the_name_not_the_type() {
        let mut module = Module::new();
        module.define_function(id("f"), Type::Void, vec![], 1).unwrap();
        module.enter_function(id("f"));
        module.current_mut().append(crate::middle::Op::Entry, Type::Void);
        module.current_mut().new_local(Type::array(Type::Int32, vec![3, 4]), id("arr"));
        let exit = module.current_mut().exit_label;
        module.current_mut().place_label(exit);
        module.current_mut().append(crate::middle::Op::Exit, Type::Void);
        module.leave_function();

        let func = module.find_function(id("f")).unwrap();
        let text = render_function(&module, func);
        assert_eq!(
            text.lines().find(|l| l.contains("variable: arr")).unwrap().trim(),
            "declare i32 %l0[3][4] ; variable: arr"
        );
    }
}
