//! Component C3: the AST→IR translator.
//!
//! There is no parent-pointer introspection here: an `ArrayRef`/`VarId` is
//! translated by one of two independent functions depending on whether the
//! caller wants an address (`translate_lvalue`) or a loaded value
//! (`translate_rvalue`), chosen by the caller's own context (`Assign`'s
//! target vs. everywhere else).

use crate::common::error::CompileError;
use crate::common::Line;
use crate::front::ast::{
    ArrayDecl, BinOp, Block, CompileUnit, Expr, FuncCall, FuncDef, Item, LValue, LeafType, Stmt,
    VarDecl,
};
use crate::middle::{ArithOp, CmpOp, LabelId, Module, Op, Type, Value};

/// `translate`: lowers a whole compilation unit. Keeps going past a failing
/// top-level item so one broken function doesn't hide errors in the rest of
/// the unit; returns every error collected this way.
pub fn lower(unit: &CompileUnit) -> Result<Module, Vec<CompileError>> {
    let mut module = Module::new();
    let mut errors = Vec::new();

    for item in &unit.items {
        let result = match item {
            Item::Var(decl) => translate_global_var(&mut module, decl),
            Item::Array(decl) => translate_global_array(&mut module, decl),
            Item::Func(def) => translate_func(&mut module, def),
        };
        if let Err(e) = result {
            errors.push(e);
        }
    }

    if errors.is_empty() {
        Ok(module)
    } else {
        Err(errors)
    }
}

fn leaf_to_type(t: LeafType) -> Type {
    match t {
        LeafType::Int => Type::Int32,
        LeafType::Void => Type::Void,
    }
}

/// Folds an `ArrayDim`/`VarInit` expression to a host `i32` at translation
/// time. MiniC has no notion of a runtime global initializer or a
/// variable-length array, so this is the full extent of constant evaluation
/// this core needs.
fn eval_const(expr: &Expr) -> Result<i32, CompileError> {
    match expr {
        Expr::LiteralUInt(_, v) => Ok(*v as i32),
        Expr::Neg(_, inner) => Ok(eval_const(inner)?.wrapping_neg()),
        Expr::Binary { line, op, lhs, rhs } if !op.is_comparison() => {
            let l = eval_const(lhs)?;
            let r = eval_const(rhs)?;
            match op {
                BinOp::Add => Ok(l.wrapping_add(r)),
                BinOp::Sub => Ok(l.wrapping_sub(r)),
                BinOp::Mul => Ok(l.wrapping_mul(r)),
                BinOp::Div => {
                    if r == 0 {
                        Err(CompileError::semantic(*line, "division by zero in constant expression"))
                    } else {
                        Ok(l / r)
                    }
                }
                BinOp::Mod => {
                    if r == 0 {
                        Err(CompileError::semantic(*line, "modulo by zero in constant expression"))
                    } else {
                        Ok(l % r)
                    }
                }
                _ => unreachable!("comparisons filtered out above"),
            }
        }
        other => Err(CompileError::semantic(
            other.line(),
            "expected a compile-time integer constant",
        )),
    }
}

fn eval_const_dim(expr: &Expr) -> Result<u32, CompileError> {
    let v = eval_const(expr)?;
    if v <= 0 {
        return Err(CompileError::semantic(
            expr.line(),
            "array dimension must be a positive constant",
        ));
    }
    Ok(v as u32)
}

fn translate_global_var(module: &mut Module, decl: &VarDecl) -> Result<(), CompileError> {
    let init = decl.init.as_ref().map(eval_const).transpose()?;
    module.new_global(Type::Int32, decl.name, init);
    Ok(())
}

fn translate_global_array(module: &mut Module, decl: &ArrayDecl) -> Result<(), CompileError> {
    let mut dims = Vec::with_capacity(decl.dims.len());
    for d in &decl.dims {
        dims.push(eval_const_dim(d)?);
    }
    module.new_global(Type::array(Type::Int32, dims), decl.name, None);
    Ok(())
}

fn translate_func(module: &mut Module, def: &FuncDef) -> Result<(), CompileError> {
    let ret_type = leaf_to_type(def.ret_type);
    let param_types: Vec<Type> = def
        .params
        .iter()
        .map(|p| {
            if p.array_dims.is_some() {
                Type::pointer(Type::Int32)
            } else {
                Type::Int32
            }
        })
        .collect();

    module.define_function(def.name, ret_type.clone(), param_types, def.line)?;
    module.enter_function(def.name);
    log::debug!(target: "minic::lower", "{}: entering translation", def.name);

    let body_result = translate_func_body(module, def, &ret_type);

    // The exit label and Exit are placed unconditionally, even if `body_result`
    // is an error, so the function's arena invariants (every LabelId placed
    // exactly once) hold regardless — the module as a whole is rejected on
    // any error anyway.
    let exit = module.current().exit_label;
    module.current_mut().place_label(exit);
    module.current_mut().append(Op::Exit, Type::Void);
    module.leave_function();
    log::debug!(target: "minic::lower", "{}: left translation, ok={}", def.name, body_result.is_ok());

    body_result
}

fn translate_func_body(module: &mut Module, def: &FuncDef, ret_type: &Type) -> Result<(), CompileError> {
    module.current_mut().append(Op::Entry, Type::Void);

    let return_slot = if !ret_type.is_void() {
        Some(module.current_mut().new_mem(ret_type.clone()))
    } else {
        None
    };
    module.current_mut().return_slot = return_slot;

    // `main`'s return slot defaults to 0 so a `main` with no explicit
    // `return` still yields a defined process exit status.
    if def.name.as_str() == "main" {
        if let Some(slot) = return_slot {
            module
                .current_mut()
                .append(Op::Move { dst: Value::Local(slot), src: Value::ConstInt(0) }, Type::Void);
        }
    }

    for p in &def.params {
        let original_array_type = p.array_dims.as_ref().map(|dims| {
            let mut full = Vec::with_capacity(dims.len());
            full.extend(dims.iter().copied());
            Type::array(Type::Int32, full)
        });
        let storage_ty = if p.array_dims.is_some() {
            Type::pointer(Type::Int32)
        } else {
            Type::Int32
        };

        let formal = module.current_mut().new_formal(storage_ty.clone(), original_array_type.clone());
        let local = module.current_mut().new_local(storage_ty, p.name);
        if let Some(Type::Array(_, dims)) = &original_array_type {
            module.current_mut().record_array_param(local, dims.clone());
        }
        module
            .current_mut()
            .append(Op::Move { dst: Value::Local(local), src: Value::Local(formal) }, Type::Void);
        module.current_mut().bind_var(p.name, Value::Local(local), p.line)?;
    }

    translate_block(module, &def.body)
}

fn translate_block(module: &mut Module, block: &Block) -> Result<(), CompileError> {
    for stmt in &block.stmts {
        translate_stmt(module, stmt)?;
    }
    Ok(())
}

fn translate_stmt(module: &mut Module, stmt: &Stmt) -> Result<(), CompileError> {
    match stmt {
        Stmt::VarDecl(decl) => translate_var_decl(module, decl),
        Stmt::ArrayDecl(decl) => translate_array_decl(module, decl),
        Stmt::Assign { target, value, .. } => translate_assign(module, target, value),
        Stmt::Return { line, value } => translate_return(module, *line, value.as_ref()),
        Stmt::If { line, cond, then_block, else_block } => {
            translate_if(module, *line, cond, then_block, else_block.as_ref())
        }
        Stmt::While { line, cond, body } => translate_while(module, *line, cond, body),
        Stmt::Break(line) => translate_break(module, *line),
        Stmt::Continue(line) => translate_continue(module, *line),
        Stmt::Call(line, call) => translate_call(module, *line, call).map(|_| ()),
        Stmt::Block(block) => {
            module.enter_scope();
            let result = translate_block(module, block);
            module.leave_scope();
            result
        }
    }
}

fn translate_var_decl(module: &mut Module, decl: &VarDecl) -> Result<(), CompileError> {
    let value = module.define_var(Type::Int32, decl.name, decl.line)?;
    if let Some(init) = &decl.init {
        let v = translate_rvalue(module, init)?;
        module.current_mut().append(Op::Move { dst: value, src: v }, Type::Void);
    }
    Ok(())
}

fn translate_array_decl(module: &mut Module, decl: &ArrayDecl) -> Result<(), CompileError> {
    let mut dims = Vec::with_capacity(decl.dims.len());
    for d in &decl.dims {
        dims.push(eval_const_dim(d)?);
    }
    module.define_var(Type::array(Type::Int32, dims), decl.name, decl.line)?;
    Ok(())
}

fn translate_assign(module: &mut Module, target: &LValue, value: &Expr) -> Result<(), CompileError> {
    match target {
        LValue::Var(line, name) => {
            let dst = module
                .find_var(*name)
                .ok_or_else(|| CompileError::semantic(*line, format!("undefined variable '{name}'")))?;
            let v = translate_rvalue(module, value)?;
            module.current_mut().append(Op::Move { dst, src: v }, Type::Void);
        }
        LValue::ArrayRef { line, name, indices } => {
            let ptr = translate_array_address(module, *line, *name, indices)?;
            let v = translate_rvalue(module, value)?;
            module.current_mut().append(Op::Move { dst: ptr, src: v }, Type::Void);
        }
    }
    Ok(())
}

fn translate_return(module: &mut Module, line: Line, value: Option<&Expr>) -> Result<(), CompileError> {
    let is_void = module.current().ret_type.is_void();
    match (value, is_void) {
        (Some(_), true) => {
            return Err(CompileError::semantic(line, "return with a value in a void function"))
        }
        (None, false) => {
            return Err(CompileError::semantic(line, "missing return value"))
        }
        (Some(expr), false) => {
            let v = translate_rvalue(module, expr)?;
            let slot = module
                .current()
                .return_slot
                .expect("non-void function missing its return slot");
            module
                .current_mut()
                .append(Op::Move { dst: Value::Local(slot), src: v }, Type::Void);
        }
        (None, true) => {}
    }
    let exit = module.current().exit_label;
    module.current_mut().append(Op::Goto(exit), Type::Void);
    Ok(())
}

fn translate_if(
    module: &mut Module,
    _line: Line,
    cond: &Expr,
    then_block: &Block,
    else_block: Option<&Block>,
) -> Result<(), CompileError> {
    let then_label = module.current_mut().new_label();
    let end_label = module.current_mut().new_label();
    let else_label = if else_block.is_some() {
        module.current_mut().new_label()
    } else {
        end_label
    };

    emit_branch_for_condition(module, cond, then_label, else_label)?;

    module.current_mut().place_label(then_label);
    module.enter_scope();
    let then_result = translate_block(module, then_block);
    module.leave_scope();
    then_result?;
    module.current_mut().append(Op::Goto(end_label), Type::Void);

    if let Some(eb) = else_block {
        module.current_mut().place_label(else_label);
        module.enter_scope();
        let else_result = translate_block(module, eb);
        module.leave_scope();
        else_result?;
    }

    module.current_mut().place_label(end_label);
    Ok(())
}

fn translate_while(module: &mut Module, _line: Line, cond: &Expr, body: &Block) -> Result<(), CompileError> {
    let cond_label = module.current_mut().new_label();
    let body_label = module.current_mut().new_label();
    let exit_label = module.current_mut().new_label();

    module.current_mut().place_label(cond_label);
    emit_branch_for_condition(module, cond, body_label, exit_label)?;

    module.current_mut().place_label(body_label);
    module.current_mut().push_loop_targets(cond_label, exit_label);
    module.enter_scope();
    let body_result = translate_block(module, body);
    module.leave_scope();
    module.current_mut().pop_loop_targets();
    body_result?;

    module.current_mut().append(Op::Goto(cond_label), Type::Void);
    module.current_mut().place_label(exit_label);
    Ok(())
}

fn translate_break(module: &mut Module, line: Line) -> Result<(), CompileError> {
    let (_, break_target) = module
        .current()
        .loop_targets()
        .ok_or_else(|| CompileError::semantic(line, "break outside a loop"))?;
    module.current_mut().append(Op::Goto(break_target), Type::Void);
    Ok(())
}

fn translate_continue(module: &mut Module, line: Line) -> Result<(), CompileError> {
    let (continue_target, _) = module
        .current()
        .loop_targets()
        .ok_or_else(|| CompileError::semantic(line, "continue outside a loop"))?;
    module.current_mut().append(Op::Goto(continue_target), Type::Void);
    Ok(())
}

/// Lowers `cond` directly into a two-way branch, without first materializing
/// it as a boolean Value, so `&&`/`||` short-circuit via an inherited
/// true/false-label scheme.
fn emit_branch_for_condition(
    module: &mut Module,
    cond: &Expr,
    then_label: LabelId,
    else_label: LabelId,
) -> Result<(), CompileError> {
    match cond {
        Expr::Binary { line, op, lhs, rhs } if op.is_comparison() => {
            let l = translate_rvalue(module, lhs)?;
            let r = translate_rvalue(module, rhs)?;
            check_int32(module, *line, l)?;
            check_int32(module, *line, r)?;
            let cmp_op = to_cmp_op(*op);
            let cmp = module
                .current_mut()
                .append(Op::Cmp { op: cmp_op, lhs: l, rhs: r }, Type::Int1);
            module
                .current_mut()
                .append(Op::Branch { cond: cmp, then_label, else_label }, Type::Void);
        }
        Expr::LogicalNot(_, inner) => {
            // Negating a condition is just swapping which label means "true".
            emit_branch_for_condition(module, inner, else_label, then_label)?;
        }
        Expr::LogicalAnd(_, lhs, rhs) => {
            let mid = module.current_mut().new_label();
            emit_branch_for_condition(module, lhs, mid, else_label)?;
            module.current_mut().place_label(mid);
            emit_branch_for_condition(module, rhs, then_label, else_label)?;
        }
        Expr::LogicalOr(_, lhs, rhs) => {
            let mid = module.current_mut().new_label();
            emit_branch_for_condition(module, lhs, then_label, mid)?;
            module.current_mut().place_label(mid);
            emit_branch_for_condition(module, rhs, then_label, else_label)?;
        }
        other => {
            let v = translate_rvalue(module, other)?;
            let ty = module.value_type(v);
            let cond_value = if ty.is_int1() {
                v
            } else if ty.is_int32() {
                module
                    .current_mut()
                    .append(Op::Cmp { op: CmpOp::Ne, lhs: v, rhs: Value::ConstInt(0) }, Type::Int1)
            } else {
                return Err(CompileError::ty(other.line(), "condition must be an int or a comparison"));
            };
            module
                .current_mut()
                .append(Op::Branch { cond: cond_value, then_label, else_label }, Type::Void);
        }
    }
    Ok(())
}

fn to_cmp_op(op: BinOp) -> CmpOp {
    match op {
        BinOp::Eq => CmpOp::Eq,
        BinOp::Ne => CmpOp::Ne,
        BinOp::Lt => CmpOp::Lt,
        BinOp::Le => CmpOp::Le,
        BinOp::Gt => CmpOp::Gt,
        BinOp::Ge => CmpOp::Ge,
        _ => unreachable!("only called on comparison BinOps"),
    }
}

fn to_arith_op(op: BinOp) -> ArithOp {
    match op {
        BinOp::Add => ArithOp::Add,
        BinOp::Sub => ArithOp::Sub,
        BinOp::Mul => ArithOp::Mul,
        BinOp::Div => ArithOp::Div,
        BinOp::Mod => ArithOp::Mod,
        _ => unreachable!("only called on arithmetic BinOps"),
    }
}

fn check_int32(module: &Module, line: Line, v: Value) -> Result<(), CompileError> {
    if module.value_type(v).is_int32() {
        Ok(())
    } else {
        Err(CompileError::ty(line, "operand must be an int"))
    }
}

/// Evaluates `expr` to a loaded scalar `Value`.
fn translate_rvalue(module: &mut Module, expr: &Expr) -> Result<Value, CompileError> {
    match expr {
        Expr::LiteralUInt(_, v) => Ok(Value::ConstInt(*v as i32)),
        Expr::VarId(line, name) => module
            .find_var(*name)
            .ok_or_else(|| CompileError::semantic(*line, format!("undefined variable '{name}'"))),
        Expr::ArrayRef { line, name, indices } => {
            let ptr = translate_array_address(module, *line, *name, indices)?;
            let tmp = module.current_mut().new_mem(Type::Int32);
            module
                .current_mut()
                .append(Op::Move { dst: Value::Local(tmp), src: ptr }, Type::Void);
            Ok(Value::Local(tmp))
        }
        Expr::Binary { line, op, lhs, rhs } if op.is_comparison() => {
            let l = translate_rvalue(module, lhs)?;
            let r = translate_rvalue(module, rhs)?;
            check_int32(module, *line, l)?;
            check_int32(module, *line, r)?;
            Ok(module
                .current_mut()
                .append(Op::Cmp { op: to_cmp_op(*op), lhs: l, rhs: r }, Type::Int1))
        }
        Expr::Binary { line, op, lhs, rhs } => {
            let l = translate_rvalue(module, lhs)?;
            let r = translate_rvalue(module, rhs)?;
            check_int32(module, *line, l)?;
            check_int32(module, *line, r)?;
            Ok(module
                .current_mut()
                .append(Op::Binary { op: to_arith_op(*op), lhs: l, rhs: r }, Type::Int32))
        }
        Expr::Neg(line, inner) => {
            let v = translate_rvalue(module, inner)?;
            check_int32(module, *line, v)?;
            Ok(module.current_mut().append(Op::Neg(v), Type::Int32))
        }
        Expr::LogicalNot(_, _) | Expr::LogicalAnd(_, _, _) | Expr::LogicalOr(_, _, _) => {
            materialize_boolean(module, expr)
        }
        Expr::Call(line, call) => {
            let (result, _ret_type) = translate_call(module, *line, call)?;
            result.ok_or_else(|| {
                CompileError::ty(*line, format!("'{}' returns void and cannot be used as a value", call.callee))
            })
        }
    }
}

/// Evaluates a short-circuit expression to a 0/1 scalar, for contexts other
/// than a direct branch condition (e.g. `int x = a && b;`).
fn materialize_boolean(module: &mut Module, expr: &Expr) -> Result<Value, CompileError> {
    let then_label = module.current_mut().new_label();
    let else_label = module.current_mut().new_label();
    let end_label = module.current_mut().new_label();
    let result = module.current_mut().new_mem(Type::Int1);

    emit_branch_for_condition(module, expr, then_label, else_label)?;

    module.current_mut().place_label(then_label);
    module
        .current_mut()
        .append(Op::Move { dst: Value::Local(result), src: Value::ConstInt(1) }, Type::Void);
    module.current_mut().append(Op::Goto(end_label), Type::Void);

    module.current_mut().place_label(else_label);
    module
        .current_mut()
        .append(Op::Move { dst: Value::Local(result), src: Value::ConstInt(0) }, Type::Void);

    module.current_mut().place_label(end_label);
    Ok(Value::Local(result))
}

/// Lowers a call, usable both as a statement (result discarded) and as an
/// expression. Returns `None` for the value iff the callee is `void`.
fn translate_call(module: &mut Module, line: Line, call: &FuncCall) -> Result<(Option<Value>, Type), CompileError> {
    let func = module
        .find_function(call.callee)
        .ok_or_else(|| CompileError::semantic(line, format!("call to undefined function '{}'", call.callee)))?;
    let ret_type = func.ret_type.clone();
    let arity = func.param_types.len();
    if arity != call.args.len() {
        return Err(CompileError::semantic(
            line,
            format!(
                "'{}' expects {arity} argument(s), got {}",
                call.callee,
                call.args.len()
            ),
        ));
    }

    let mut args = Vec::with_capacity(call.args.len());
    for a in &call.args {
        args.push(translate_rvalue(module, a)?);
    }

    module.current_mut().note_call(args.len() as u32);
    let inst = module
        .current_mut()
        .append(Op::Call { callee: call.callee, args }, ret_type.clone());

    if ret_type.is_void() {
        Ok((None, ret_type))
    } else {
        Ok((Some(inst), ret_type))
    }
}

/// `ArrayRef` address arithmetic: `offset = (...((i1·dims[1])+i2)·dims[2]+...)+ik`,
/// then `address = base + offset·elementSize`. Used for both lvalue and
/// rvalue array access — the difference is only whether the caller loads
/// through the returned pointer.
fn translate_array_address(
    module: &mut Module,
    line: Line,
    name: crate::common::Id,
    indices: &[Expr],
) -> Result<Value, CompileError> {
    let base = module
        .find_var(name)
        .ok_or_else(|| CompileError::semantic(line, format!("undefined variable '{name}'")))?;
    let (elem_ty, dims) = base_array_dims(module, line, base, name)?;
    if indices.len() > dims.len() {
        return Err(CompileError::ty(
            line,
            format!("too many indices for array '{name}'"),
        ));
    }

    let mut index_values = Vec::with_capacity(indices.len());
    for idx in indices {
        let v = translate_rvalue(module, idx)?;
        check_int32(module, idx.line(), v)?;
        index_values.push(v);
    }

    let mut acc = index_values[0];
    for k in 1..index_values.len() {
        let scaled = module.current_mut().append(
            Op::Binary { op: ArithOp::Mul, lhs: acc, rhs: Value::ConstInt(dims[k] as i32) },
            Type::Int32,
        );
        acc = module
            .current_mut()
            .append(Op::Binary { op: ArithOp::Add, lhs: scaled, rhs: index_values[k] }, Type::Int32);
    }

    let elem_size = elem_ty.byte_size() as i32;
    let byte_offset = module
        .current_mut()
        .append(Op::Binary { op: ArithOp::Mul, lhs: acc, rhs: Value::ConstInt(elem_size) }, Type::Int32);
    let ptr_ty = Type::pointer(elem_ty);
    Ok(module
        .current_mut()
        .append(Op::Binary { op: ArithOp::Add, lhs: base, rhs: byte_offset }, ptr_ty))
}

/// Resolves the element type and full dimension vector behind an
/// already-resolved array-valued `Value`, whether it's a global array, a
/// local array, or a decayed array-parameter local.
fn base_array_dims(
    module: &Module,
    line: Line,
    base: Value,
    name: crate::common::Id,
) -> Result<(Type, Vec<u32>), CompileError> {
    match base {
        Value::Global(id) => match &module.globals[id as usize].ty {
            Type::Array(elem, dims) => Ok(((**elem).clone(), dims.clone())),
            _ => Err(CompileError::ty(line, format!("'{name}' is not an array"))),
        },
        Value::Local(id) => {
            let func = module.current();
            match &func.locals[id as usize].ty {
                Type::Array(elem, dims) => Ok(((**elem).clone(), dims.clone())),
                Type::Pointer(elem) => {
                    let dims = func
                        .array_param_dims(id)
                        .cloned()
                        .ok_or_else(|| CompileError::internal("pointer value missing recorded array dimensions"))?;
                    Ok(((**elem).clone(), dims))
                }
                _ => Err(CompileError::ty(line, format!("'{name}' is not an array"))),
            }
        }
        _ => Err(CompileError::ty(line, format!("'{name}' is not an array"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::front::ast::*;
    use crate::middle::render::render_function;

    fn id(s: &str) -> crate::common::Id {
        internment::Intern::new(s.to_string())
    }

    fn func(name: &str, ret_type: LeafType, params: Vec<FuncFormalParam>, body: Block) -> FuncDef {
        FuncDef { line: 1, ret_type, name: id(name), params, body }
    }

    #[test]
    fn simple_function_lowers_and_renders() {
        let cu = CompileUnit {
            items: vec![Item::Func(func(
                "main",
                LeafType::Int,
                vec![],
                Block {
                    stmts: vec![Stmt::Return {
                        line: 1,
                        value: Some(Expr::LiteralUInt(1, 0)),
                    }],
                },
            ))],
        };
        let module = lower(&cu).unwrap();
        let f = module.find_function(id("main")).unwrap();
        let text = render_function(&module, f);
        assert!(text.contains("entry:"));
        assert!(text.contains("exit:"));
    }

    #[test]
    fn undefined_variable_is_rejected() {
        let cu = CompileUnit {
            items: vec![Item::Func(func(
                "main",
                LeafType::Int,
                vec![],
                Block {
                    stmts: vec![Stmt::Return {
                        line: 2,
                        value: Some(Expr::VarId(2, id("missing"))),
                    }],
                },
            ))],
        };
        let errors = lower(&cu).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(matches!(errors[0], CompileError::Semantic { line: 2, .. }));
    }

    #[test]
    fn break_outside_loop_is_rejected() {
        let cu = CompileUnit {
            items: vec![Item::Func(func(
                "f",
                LeafType::Void,
                vec![],
                Block { stmts: vec![Stmt::Break(3)] },
            ))],
        };
        let errors = lower(&cu).unwrap_err();
        assert!(matches!(errors[0], CompileError::Semantic { line: 3, .. }));
    }

    #[test]
    fn short_circuit_and_emits_mid_label_between_operands() {
        // `if (a < 1 && b < 2) return 1;` — the right operand must be guarded
        // by a label reached only when the left operand is true.
        let cond = Expr::LogicalAnd(
            1,
            Box::new(Expr::Binary {
                line: 1,
                op: BinOp::Lt,
                lhs: Box::new(Expr::VarId(1, id("a"))),
                rhs: Box::new(Expr::LiteralUInt(1, 1)),
            }),
            Box::new(Expr::Binary {
                line: 1,
                op: BinOp::Lt,
                lhs: Box::new(Expr::VarId(1, id("b"))),
                rhs: Box::new(Expr::LiteralUInt(1, 2)),
            }),
        );
        let cu = CompileUnit {
            items: vec![Item::Func(func(
                "f",
                LeafType::Void,
                vec![
                    FuncFormalParam { line: 1, elem_type: LeafType::Int, name: id("a"), array_dims: None },
                    FuncFormalParam { line: 1, elem_type: LeafType::Int, name: id("b"), array_dims: None },
                ],
                Block {
                    stmts: vec![Stmt::If {
                        line: 1,
                        cond,
                        then_block: Block { stmts: vec![Stmt::Return { line: 1, value: None }] },
                        else_block: None,
                    }],
                },
            ))],
        };
        let module = lower(&cu).unwrap();
        let f = module.find_function(id("f")).unwrap();
        // Two Cmp instructions (one per operand), and strictly more than one
        // Branch (one per operand plus the if's own then/else split), is
        // enough to show the right operand wasn't folded into a single
        // eagerly-evaluated comparison.
        let cmp_count = f.insts.iter().filter(|i| matches!(i.op, Op::Cmp { .. })).count();
        let branch_count = f.insts.iter().filter(|i| matches!(i.op, Op::Branch { .. })).count();
        assert_eq!(cmp_count, 2);
        assert_eq!(branch_count, 2);
    }

    #[test]
    fn array_index_linearizes_multi_dimensional_offset() {
        let cu = CompileUnit {
            items: vec![
                Item::Array(ArrayDecl {
                    line: 1,
                    elem_type: LeafType::Int,
                    name: id("g"),
                    dims: vec![Expr::LiteralUInt(1, 3), Expr::LiteralUInt(1, 4)],
                }),
                Item::Func(func(
                    "f",
                    LeafType::Void,
                    vec![],
                    Block {
                        stmts: vec![Stmt::Assign {
                            line: 2,
                            target: LValue::ArrayRef {
                                line: 2,
                                name: id("g"),
                                indices: vec![Expr::LiteralUInt(2, 1), Expr::LiteralUInt(2, 2)],
                            },
                            value: Expr::LiteralUInt(2, 9),
                        }],
                    },
                )),
            ],
        };
        let module = lower(&cu).unwrap();
        let f = module.find_function(id("f")).unwrap();
        // mul(i1,4) -> add(_,i2) -> mul(_,4 bytes) -> add(base,_): four Binary
        // instructions computing the address before the store Move.
        let binary_count = f.insts.iter().filter(|i| matches!(i.op, Op::Binary { .. })).count();
        assert_eq!(binary_count, 4);
    }

    #[test]
    fn duplicate_function_is_one_of_possibly_several_collected_errors() {
        let cu = CompileUnit {
            items: vec![
                Item::Func(func("f", LeafType::Void, vec![], Block::default())),
                Item::Func(func("f", LeafType::Void, vec![], Block::default())),
            ],
        };
        let errors = lower(&cu).unwrap_err();
        assert_eq!(errors.len(), 1);
    }
}
