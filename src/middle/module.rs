//! Component C2: the Module and Function containers, and the scope stack
//! that sits between the translator and the Value arenas.

use log::trace;

use crate::common::error::CompileError;
use crate::common::{Id, Line, Map};
use crate::middle::inst::{Instruction, Op};
use crate::middle::types::Type;
use crate::middle::value::{GlobalId, LabelId, LocalId, Value};

/// A global variable, with Module lifetime.
#[derive(Debug, Clone)]
pub struct Global {
    pub ty: Type,
    pub name: Id,
    /// `None` marks the variable as BSS (uninitialized); `Some` marks it
    /// initialized, even when the value is zero.
    pub init: Option<i32>,
}

/// What kind of Function-owned Value a [`LocalSlot`] represents.
#[derive(Debug, Clone)]
pub enum LocalKind {
    /// `LocalVariable`: a user declaration at the given scope level
    /// (function scope is level 1).
    Local { scope_level: u32 },
    /// `FormalParam`: the incoming-argument Value, distinct from the
    /// user-visible local copy the translator materializes for it. Carries
    /// the original, undecayed array type when this parameter decayed from
    /// `T[][d2]...` to `Pointer(T)`.
    Formal {
        original_array_type: Option<Type>,
    },
    /// `MemVariable`: an anonymous stack slot with no source name.
    Mem,
}

#[derive(Debug, Clone)]
pub struct LocalSlot {
    pub ty: Type,
    pub src_name: Option<Id>,
    pub kind: LocalKind,
}

/// A function, owning its instruction stream, its locals, and (while it is
/// being translated) its scope stack and loop-target stack.
#[derive(Debug)]
pub struct Function {
    pub name: Id,
    pub ret_type: Type,
    pub param_types: Vec<Type>,
    /// `FormalParam` handles, in source declaration order — kept separate
    /// from `locals`'s arena order so the function header can be rendered
    /// in signature order regardless of allocation order.
    pub params: Vec<LocalId>,
    pub locals: Vec<LocalSlot>,
    pub insts: Vec<Instruction>,
    /// Present iff `ret_type` is not `Void`.
    pub return_slot: Option<LocalId>,
    pub exit_label: LabelId,
    /// A function with no body: one of the builtins `declareBuiltin`
    /// pre-populates the Module with, or a forward declaration.
    pub is_external: bool,

    next_label: LabelId,
    /// Stack of `(continue_target, break_target)` pairs, pushed on `while`
    /// entry and popped on exit.
    loop_stack: Vec<(LabelId, LabelId)>,
    scope_stack: Vec<Map<Id, Value>>,
    max_call_arg_count: u32,
    has_call: bool,
    /// For a local that shadows a decayed array parameter, the full
    /// dimension vector (`dims[0]` is the unknown leading dimension,
    /// encoded as `0`) — needed because the local's static type is just
    /// `Pointer(Int32)` once decayed, which has lost the dimensions that
    /// `ArrayRef` address arithmetic still needs.
    array_param_dims: Map<LocalId, Vec<u32>>,
}

impl Function {
    fn new(name: Id, ret_type: Type, param_types: Vec<Type>) -> Self {
        let mut f = Function {
            name,
            ret_type,
            param_types,
            params: Vec::new(),
            locals: Vec::new(),
            insts: Vec::new(),
            return_slot: None,
            exit_label: 0,
            is_external: false,
            next_label: 0,
            loop_stack: Vec::new(),
            scope_stack: Vec::new(),
            max_call_arg_count: 0,
            has_call: false,
            array_param_dims: Map::new(),
        };
        // Reserve the exit label's identity up front (not yet appended) so
        // `return` statements translated before the function body ends can
        // already emit `goto exitLabel`.
        f.exit_label = f.new_label();
        f
    }

    fn external(name: Id, ret_type: Type, param_types: Vec<Type>) -> Self {
        let mut f = Function::new(name, ret_type, param_types.clone());
        f.is_external = true;
        for ty in &param_types {
            f.params.push(f.locals.len() as LocalId);
            f.locals.push(LocalSlot {
                ty: ty.clone(),
                src_name: None,
                kind: LocalKind::Formal {
                    original_array_type: None,
                },
            });
        }
        f
    }

    pub fn new_local(&mut self, ty: Type, name: Id) -> LocalId {
        let scope_level = self.scope_stack.len() as u32;
        let id = self.locals.len() as LocalId;
        self.locals.push(LocalSlot {
            ty,
            src_name: Some(name),
            kind: LocalKind::Local { scope_level },
        });
        id
    }

    pub fn new_mem(&mut self, ty: Type) -> LocalId {
        let id = self.locals.len() as LocalId;
        self.locals.push(LocalSlot {
            ty,
            src_name: None,
            kind: LocalKind::Mem,
        });
        id
    }

    pub fn new_formal(&mut self, ty: Type, original_array_type: Option<Type>) -> LocalId {
        let id = self.locals.len() as LocalId;
        self.locals.push(LocalSlot {
            ty,
            src_name: None,
            kind: LocalKind::Formal {
                original_array_type,
            },
        });
        self.params.push(id);
        id
    }

    /// `appendInstruction`: pushes `op` with the given result type and
    /// returns the `Value` a later instruction can use to reference its
    /// result (meaningless for opcodes that don't produce one, but cheap to
    /// hand back uniformly).
    pub fn append(&mut self, op: Op, result_type: Type) -> Value {
        let id = self.insts.len() as u32;
        trace!(target: "minic::ir", "{}: append #{id} {op:?}", self.name);
        self.insts.push(Instruction { op, result_type });
        Value::Inst(id)
    }

    pub fn new_label(&mut self) -> LabelId {
        let id = self.next_label;
        self.next_label += 1;
        id
    }

    pub fn place_label(&mut self, label: LabelId) {
        self.append(Op::Label(label), Type::Void);
    }

    pub fn push_loop_targets(&mut self, continue_target: LabelId, break_target: LabelId) {
        self.loop_stack.push((continue_target, break_target));
    }

    pub fn pop_loop_targets(&mut self) {
        self.loop_stack.pop();
    }

    pub fn loop_targets(&self) -> Option<(LabelId, LabelId)> {
        self.loop_stack.last().copied()
    }

    pub fn enter_scope(&mut self) {
        self.scope_stack.push(Map::new());
    }

    pub fn leave_scope(&mut self) {
        self.scope_stack.pop();
    }

    /// Declares `name` in the innermost scope. Fails if `name` is already
    /// declared in that same scope (shadowing an outer scope is fine).
    pub fn define_var(&mut self, ty: Type, name: Id, line: Line) -> Result<Value, CompileError> {
        let local = self.new_local(ty, name);
        let value = Value::Local(local);
        let scope = self
            .scope_stack
            .last_mut()
            .expect("define_var called outside any scope");
        if scope.insert(name, value).is_some() {
            return Err(CompileError::semantic(
                line,
                format!("redefinition of '{name}'"),
            ));
        }
        Ok(value)
    }

    /// Declares `name` in the innermost scope bound directly to `value`
    /// (used when materializing a formal parameter's local shadow copy).
    pub fn bind_var(&mut self, name: Id, value: Value, line: Line) -> Result<(), CompileError> {
        let scope = self
            .scope_stack
            .last_mut()
            .expect("bind_var called outside any scope");
        if scope.insert(name, value).is_some() {
            return Err(CompileError::semantic(
                line,
                format!("redefinition of '{name}'"),
            ));
        }
        Ok(())
    }

    /// Walks the scope stack inside-out. Does not consult globals — callers
    /// fall back to [`Module::find_var`] for that.
    pub fn find_local_var(&self, name: Id) -> Option<Value> {
        self.scope_stack
            .iter()
            .rev()
            .find_map(|scope| scope.get(&name).copied())
    }

    pub fn max_call_arg_count(&self) -> u32 {
        self.max_call_arg_count
    }

    pub fn has_call(&self) -> bool {
        self.has_call
    }

    pub fn note_call(&mut self, arg_count: u32) {
        self.has_call = true;
        self.max_call_arg_count = self.max_call_arg_count.max(arg_count);
    }

    /// Records that `local` (a shadow copy of a decayed array parameter)
    /// needs `dims` for `ArrayRef` address arithmetic, since its static type
    /// is just `Pointer(Int32)`.
    pub fn record_array_param(&mut self, local: LocalId, dims: Vec<u32>) {
        self.array_param_dims.insert(local, dims);
    }

    pub fn array_param_dims(&self, local: LocalId) -> Option<&Vec<u32>> {
        self.array_param_dims.get(&local)
    }

    /// Whether the instruction at `id`, given its opcode and declared
    /// result type, produces a usable `Value::Inst(id)`.
    pub fn produces_value(&self, id: u32) -> bool {
        let inst = &self.insts[id as usize];
        inst.op.always_produces_value()
            || matches!(&inst.op, Op::Call { .. } if !inst.result_type.is_void())
    }
}

/// The compilation unit: every function and global variable, plus the
/// translator's process-wide "current function" pointer.
#[derive(Debug)]
pub struct Module {
    pub functions: Map<Id, Function>,
    pub globals: Vec<Global>,
    global_names: Map<Id, GlobalId>,
    current: Option<Id>,
}

impl Module {
    pub fn new() -> Self {
        let mut m = Module {
            functions: Map::new(),
            globals: Vec::new(),
            global_names: Map::new(),
            current: None,
        };
        m.declare_builtins();
        m
    }

    fn declare_builtins(&mut self) {
        let i32_ty = Type::Int32;
        let void = Type::Void;
        let arr_ptr = Type::pointer(Type::Int32);
        let builtins: [(&str, Type, Vec<Type>); 6] = [
            ("getint", i32_ty.clone(), vec![]),
            ("putint", void.clone(), vec![i32_ty.clone()]),
            ("getch", i32_ty.clone(), vec![]),
            ("putch", void.clone(), vec![i32_ty.clone()]),
            ("getarray", i32_ty.clone(), vec![arr_ptr.clone()]),
            ("putarray", void, vec![i32_ty, arr_ptr]),
        ];
        for (name, ret, params) in builtins {
            let id: Id = internment::Intern::new(name.to_string());
            self.functions
                .insert(id, Function::external(id, ret, params));
        }
    }

    /// `defineFunction`.
    pub fn define_function(
        &mut self,
        name: Id,
        ret_type: Type,
        param_types: Vec<Type>,
        line: Line,
    ) -> Result<(), CompileError> {
        if self.functions.contains_key(&name) {
            return Err(CompileError::semantic(
                line,
                format!("redefinition of function '{name}'"),
            ));
        }
        self.functions
            .insert(name, Function::new(name, ret_type, param_types));
        Ok(())
    }

    pub fn find_function(&self, name: Id) -> Option<&Function> {
        self.functions.get(&name)
    }

    pub fn new_global(&mut self, ty: Type, name: Id, init: Option<i32>) -> GlobalId {
        let id = self.globals.len() as GlobalId;
        self.globals.push(Global { ty, name, init });
        self.global_names.insert(name, id);
        id
    }

    pub fn find_global(&self, name: Id) -> Option<GlobalId> {
        self.global_names.get(&name).copied()
    }

    pub fn enter_function(&mut self, name: Id) {
        self.current = Some(name);
        self.current_mut().enter_scope();
    }

    pub fn leave_function(&mut self) {
        self.current_mut().leave_scope();
        self.current = None;
    }

    pub fn current_name(&self) -> Id {
        self.current.expect("no function currently being translated")
    }

    pub fn current_mut(&mut self) -> &mut Function {
        let name = self.current_name();
        self.functions.get_mut(&name).expect("current function vanished")
    }

    pub fn current(&self) -> &Function {
        let name = self.current_name();
        &self.functions[&name]
    }

    /// Resolves a `Value`'s static type by consulting whichever arena owns
    /// it, in the context of the function currently being translated.
    pub fn value_type(&self, v: Value) -> Type {
        match v {
            Value::ConstInt(_) => Type::Int32,
            Value::Global(id) => self.globals[id as usize].ty.clone(),
            Value::Local(id) => self.current().locals[id as usize].ty.clone(),
            Value::Inst(id) => self.current().insts[id as usize].result_type.clone(),
        }
    }

    pub fn enter_scope(&mut self) {
        self.current_mut().enter_scope();
    }

    pub fn leave_scope(&mut self) {
        self.current_mut().leave_scope();
    }

    pub fn define_var(&mut self, ty: Type, name: Id, line: Line) -> Result<Value, CompileError> {
        self.current_mut().define_var(ty, name, line)
    }

    /// Walks the current function's scope stack inside-out, then falls back
    /// to global scope (level 0).
    pub fn find_var(&self, name: Id) -> Option<Value> {
        if let Some(cur) = self.current {
            if let Some(v) = self.functions[&cur].find_local_var(name) {
                return Some(v);
            }
        }
        self.find_global(name).map(Value::Global)
    }
}

impl Default for Module {
    fn default() -> Self {
        Module::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> Id {
        internment::Intern::new(s.to_string())
    }

    #[test]
    fn builtins_are_predeclared() {
        let m = Module::new();
        for name in ["getint", "putint", "getch", "putch", "getarray", "putarray"] {
            assert!(m.find_function(id(name)).is_some(), "missing builtin {name}");
        }
    }

    #[test]
    fn duplicate_function_definition_is_rejected() {
        let mut m = Module::new();
        m.define_function(id("f"), Type::Void, vec![], 1).unwrap();
        let err = m.define_function(id("f"), Type::Void, vec![], 2).unwrap_err();
        assert!(matches!(err, CompileError::Semantic { line: 2, .. }));
    }

    #[test]
    fn redefinition_in_same_scope_is_rejected_but_shadowing_is_allowed() {
        let mut m = Module::new();
        m.define_function(id("f"), Type::Void, vec![], 1).unwrap();
        m.enter_function(id("f"));
        m.define_var(Type::Int32, id("x"), 1).unwrap();
        assert!(m.define_var(Type::Int32, id("x"), 2).is_err());
        m.enter_scope();
        // shadowing in an inner scope is fine
        assert!(m.define_var(Type::Int32, id("x"), 3).is_ok());
        m.leave_scope();
        m.leave_function();
    }

    #[test]
    fn scope_lookup_walks_inside_out_then_globals() {
        let mut m = Module::new();
        m.new_global(Type::Int32, id("g"), None);
        m.define_function(id("f"), Type::Void, vec![], 1).unwrap();
        m.enter_function(id("f"));
        assert!(matches!(m.find_var(id("g")), Some(Value::Global(_))));
        let v = m.define_var(Type::Int32, id("g"), 1).unwrap();
        assert_eq!(m.find_var(id("g")), Some(v));
        m.leave_function();
    }
}
