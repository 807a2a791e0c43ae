//! End-to-end selector tests: AST → IR → ARM32, checked at the level of
//! "does the emitted assembly look like it does the right thing" rather
//! than by actually executing it (no ARM32 target is available here).

use crate::back::code_gen;
use crate::front::ast::*;
use crate::front::lower;

fn id(s: &str) -> crate::common::Id {
    internment::Intern::new(s.to_string())
}

fn main_fn(body: Block) -> CompileUnit {
    CompileUnit {
        items: vec![Item::Func(FuncDef {
            line: 1,
            ret_type: LeafType::Int,
            name: id("main"),
            params: vec![],
            body,
        })],
    }
}

/// `int main(){int a=3,b=4;return a*b-2;}` — straight-line arithmetic,
/// no branches.
#[test]
fn straight_line_arithmetic_emits_no_branches() {
    let cu = main_fn(Block {
        stmts: vec![
            Stmt::VarDecl(VarDecl { line: 1, elem_type: LeafType::Int, name: id("a"), init: Some(Expr::LiteralUInt(1, 3)) }),
            Stmt::VarDecl(VarDecl { line: 1, elem_type: LeafType::Int, name: id("b"), init: Some(Expr::LiteralUInt(1, 4)) }),
            Stmt::Return {
                line: 1,
                value: Some(Expr::Binary {
                    line: 1,
                    op: BinOp::Sub,
                    lhs: Box::new(Expr::Binary {
                        line: 1,
                        op: BinOp::Mul,
                        lhs: Box::new(Expr::VarId(1, id("a"))),
                        rhs: Box::new(Expr::VarId(1, id("b"))),
                    }),
                    rhs: Box::new(Expr::LiteralUInt(1, 2)),
                }),
            },
        ],
    });
    let module = lower(&cu).unwrap();
    let program = code_gen(&module);
    let code = program.asm_code();
    assert!(code.contains("mul"));
    assert!(code.contains("sub"));
    assert!(!code.contains(" b "), "no unconditional branch expected in straight-line code");
    assert!(code.contains("push"));
    assert!(code.contains("pop"));
}

/// `if (a && (1/b)) ...` — the division must not be reachable when the
/// left operand of `&&` is false, i.e. it must sit behind its own branch
/// target rather than before the `Cmp`/`Branch` pair for `a`.
#[test]
fn short_circuit_and_places_division_after_a_branch() {
    let cond = Expr::LogicalAnd(
        1,
        Box::new(Expr::VarId(1, id("a"))),
        Box::new(Expr::Binary {
            line: 1,
            op: BinOp::Div,
            lhs: Box::new(Expr::LiteralUInt(1, 1)),
            rhs: Box::new(Expr::VarId(1, id("b"))),
        }),
    );
    let cu = main_fn(Block {
        stmts: vec![
            Stmt::VarDecl(VarDecl { line: 1, elem_type: LeafType::Int, name: id("a"), init: Some(Expr::LiteralUInt(1, 1)) }),
            Stmt::VarDecl(VarDecl { line: 1, elem_type: LeafType::Int, name: id("b"), init: Some(Expr::LiteralUInt(1, 0)) }),
            Stmt::If {
                line: 1,
                cond,
                then_block: Block { stmts: vec![Stmt::Return { line: 1, value: Some(Expr::LiteralUInt(1, 1)) }] },
                else_block: None,
            },
            Stmt::Return { line: 1, value: Some(Expr::LiteralUInt(1, 0)) },
        ],
    });
    let module = lower(&cu).unwrap();
    let func = module.find_function(id("main")).unwrap();
    // The division (a Binary with ArithOp::Div) must occur in the
    // instruction stream strictly after at least one Label placement (the
    // `&&`'s mid-label), confirming it's gated behind a branch rather than
    // evaluated unconditionally up front.
    let div_pos = func
        .insts
        .iter()
        .position(|i| matches!(&i.op, crate::middle::Op::Binary { op: crate::middle::ArithOp::Div, .. }))
        .expect("division instruction present");
    let first_label_pos = func
        .insts
        .iter()
        .position(|i| matches!(&i.op, crate::middle::Op::Label(_)))
        .expect("at least one label present");
    assert!(div_pos > first_label_pos);

    let program = code_gen(&module);
    let code = program.asm_code();
    assert!(code.contains("sdiv"));
}

/// Assigning into a 2D array element — exercises multi-dimension address
/// arithmetic and store-through-pointer.
#[test]
fn array_store_emits_address_arithmetic_and_a_plain_store() {
    let cu = CompileUnit {
        items: vec![
            Item::Array(ArrayDecl {
                line: 1,
                elem_type: LeafType::Int,
                name: id("a"),
                dims: vec![Expr::LiteralUInt(1, 3), Expr::LiteralUInt(1, 4)],
            }),
            Item::Func(FuncDef {
                line: 1,
                ret_type: LeafType::Void,
                name: id("fill"),
                params: vec![],
                body: Block {
                    stmts: vec![Stmt::Assign {
                        line: 2,
                        target: LValue::ArrayRef {
                            line: 2,
                            name: id("a"),
                            indices: vec![Expr::LiteralUInt(2, 1), Expr::LiteralUInt(2, 2)],
                        },
                        value: Expr::LiteralUInt(2, 7),
                    }],
                },
            }),
        ],
    };
    let module = lower(&cu).unwrap();
    let program = code_gen(&module);
    let code = program.asm_code();
    assert!(code.contains("mul"));
    assert!(code.contains("add"));
    assert!(code.contains("str"));
}

/// Builtins are callable without a user definition, and external (builtin)
/// functions never get a body emitted.
#[test]
fn builtins_are_callable_but_never_emitted_as_functions() {
    let cu = main_fn(Block {
        stmts: vec![
            Stmt::Call(1, FuncCall { callee: id("putint"), args: vec![Expr::LiteralUInt(1, 42)] }),
            Stmt::Return { line: 1, value: Some(Expr::LiteralUInt(1, 0)) },
        ],
    });
    let module = lower(&cu).unwrap();
    let program = code_gen(&module);
    let code = program.asm_code();
    assert!(code.contains("bl putint"));
    assert!(!code.contains(".global putint\nputint:"));
}
