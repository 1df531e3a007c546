use super::scope::{Binding, ScopeStack};
use super::*;
use crate::ast::{BinOp, Block, Expr, Stmt, UnaryOp};
use crate::diagnostic::Severity;
use crate::ir::{BlockId, Inst, SlotId};
use crate::span::Spanned;

fn lower(stmts: Vec<Spanned<Stmt>>) -> Result<Compiled, Vec<Diagnostic>> {
    compile(&Block::new(stmts), &CompileOptions::default())
}

fn ir(stmts: Vec<Spanned<Stmt>>) -> String {
    match lower(stmts) {
        Ok(compiled) => compiled.module.to_string(),
        Err(diags) => panic!("lowering failed: {:?}", diags),
    }
}

fn errors(stmts: Vec<Spanned<Stmt>>) -> Vec<String> {
    match lower(stmts) {
        Ok(_) => panic!("expected lowering to fail"),
        Err(diags) => diags
            .into_iter()
            .filter(|d| d.severity == Severity::Error)
            .map(|d| d.message)
            .collect(),
    }
}

/// A context with `main` open, for inspecting IR after a failed statement.
fn open_main() -> Lowering {
    let mut module = Module::new("test");
    let id = module.declare_function("main", Vec::new(), Type::Void);
    let mut lw = Lowering {
        module,
        builder: FunctionBuilder::new(id, "main", Vec::new(), Type::Void),
        scopes: ScopeStack::new(),
        diagnostics: Vec::new(),
        trace: Trace::new(false),
    };
    let entry = lw.builder.create_block("entry");
    lw.scopes.enter(entry, "entry", None);
    lw
}

fn sign_fn() -> Spanned<Stmt> {
    Stmt::func(
        "sign",
        &[("Int", "x")],
        "Int",
        vec![Stmt::if_else(
            Expr::binary(BinOp::Gt, Expr::ident("x"), Expr::int(0)),
            vec![Stmt::ret(Expr::int(1))],
            Some(vec![Stmt::ret(Expr::int(-1))]),
        )],
    )
}

// ─── Scope stack ──────────────────────────────────────────────────

fn int_binding(slot: u32) -> Binding {
    Binding {
        slot: SlotId(slot),
        ty: Type::Int64,
        mutable: true,
    }
}

#[test]
fn test_scope_branch_frame_copies_bindings() {
    let mut scopes = ScopeStack::new();
    scopes.enter(BlockId(0), "entry", None);
    scopes.bind("x", int_binding(0));

    scopes.enter(BlockId(1), "then.0", Some(scopes.locals()));
    assert_eq!(scopes.lookup("x"), Some(int_binding(0)));
    scopes.bind("y", int_binding(1));
    assert_eq!(scopes.depth(), 2);
    let branch = scopes.leave();

    assert!(branch.locals.contains_key("y"));
    assert_eq!(scopes.lookup("y"), None);
    assert_eq!(scopes.lookup("x"), Some(int_binding(0)));
}

#[test]
fn test_scope_fresh_frame_hides_outer_names() {
    let mut scopes = ScopeStack::new();
    scopes.enter(BlockId(0), "entry", None);
    scopes.bind("x", int_binding(0));
    scopes.enter(BlockId(0), "entry", None);
    assert_eq!(scopes.lookup("x"), None);
}

#[test]
fn test_scope_set_current_block_resets_path_state() {
    let mut scopes = ScopeStack::new();
    scopes.enter(BlockId(0), "entry", None);
    scopes.set_return_value(crate::ir::Reg(3));
    scopes.mark_diverged();
    assert!(scopes.has_returned());

    scopes.set_current_block(BlockId(2), "merge.0", Locals::new());
    assert_eq!(scopes.current_block(), BlockId(2));
    assert_eq!(scopes.label(), "merge.0");
    assert_eq!(scopes.pending_return_value(), None);
    assert!(!scopes.has_returned());
    assert!(scopes.is_open());
}

#[test]
fn test_scope_rebinding_replaces() {
    let mut scopes = ScopeStack::new();
    scopes.enter(BlockId(0), "entry", None);
    scopes.bind("x", int_binding(0));
    scopes.bind("x", int_binding(4));
    assert_eq!(scopes.lookup("x").map(|b| b.slot), Some(SlotId(4)));
    scopes.leave();
    assert!(!scopes.is_open());
}

// ─── Whole programs ───────────────────────────────────────────────

#[test]
fn test_int_declaration_and_print() {
    let text = ir(vec![
        Stmt::var("Int", "x", Some(Expr::int(5))),
        Stmt::expr(Expr::call(
            "print",
            vec![Expr::string("%d\n"), Expr::ident("x")],
        )),
    ]);
    insta::assert_snapshot!(text, @r#"
    module main
    global .str.0 = "%d\n"

    fn main() -> void {
    entry:
      $0 = alloca i64 x
      %0 = const i64 5
      store $0, %0
      %1 = straddr .str.0
      %2 = load i64 $0
      call print(%1, %2)
      ret
    }
    "#);
}

#[test]
fn test_conditional_with_returns_in_both_arms() {
    let text = ir(vec![sign_fn()]);
    insta::assert_snapshot!(text, @r"
    module main

    fn main() -> void {
    entry:
      ret
    }

    fn sign(x: i64) -> i64 {
    entry:
      %0 = param 0
      $0 = alloca i64 x
      store $0, %0
      %1 = load i64 $0
      %2 = const i64 0
      %3 = icmp sgt %1, %2
      br %3, then.0, else.0
    then.0:
      %4 = const i64 1
      ret %4
    else.0:
      %5 = const i64 -1
      ret %5
    merge.0:
      unreachable
    }
    ");
}

#[test]
fn test_main_is_first_and_functions_follow_in_order() {
    let compiled = lower(vec![
        Stmt::func("a", &[], "Void", vec![]),
        Stmt::func("b", &[], "Int", vec![Stmt::ret(Expr::int(1))]),
    ])
    .unwrap();
    let names: Vec<&str> = compiled
        .module
        .functions
        .iter()
        .map(|f| f.name.as_str())
        .collect();
    assert_eq!(names, ["main", "a", "b"]);
    assert_eq!(compiled.module.functions[0].ret, Type::Void);
    assert!(compiled.module.functions[0].params.is_empty());
}

#[test]
fn test_int_condition_compares_against_zero() {
    let text = ir(vec![
        Stmt::var("Int", "x", Some(Expr::int(1))),
        Stmt::if_else(Expr::ident("x"), vec![], None),
    ]);
    assert!(text.contains("icmp ne %1, %2"));
    assert!(text.contains("br %3, then.0, merge.0"));
    assert!(text.contains("then.0:\n  jump merge.0\n"));
    assert!(text.contains("merge.0:\n  ret\n"));
}

#[test]
fn test_invert_folds_literals() {
    let text = ir(vec![
        Stmt::var("Int", "n", Some(Expr::invert(Expr::int(123)))),
        Stmt::var("String", "s", Some(Expr::invert(Expr::string("abc")))),
    ]);
    assert!(text.contains("const i64 321"));
    assert!(text.contains("global .str.0 = \"cba\""));
}

#[test]
fn test_invert_of_variable_is_rejected() {
    let errs = errors(vec![
        Stmt::var("Int", "n", Some(Expr::int(1))),
        Stmt::expr(Expr::invert(Expr::ident("n"))),
    ]);
    assert_eq!(errs.len(), 1);
    assert!(errs[0].starts_with("invalid operand: invert expects"));
}

#[test]
fn test_each_string_literal_gets_its_own_global() {
    let compiled = lower(vec![
        Stmt::expr(Expr::call("print", vec![Expr::string("hi")])),
        Stmt::expr(Expr::call("print", vec![Expr::string("hi")])),
    ])
    .unwrap();
    assert_eq!(compiled.module.globals.len(), 2);
}

#[test]
fn test_unary_does_not_store() {
    let compiled = lower(vec![
        Stmt::var("Int", "x", Some(Expr::int(1))),
        Stmt::expr(Expr::unary(UnaryOp::Increment, Expr::ident("x"))),
        Stmt::expr(Expr::unary(UnaryOp::Decrement, Expr::ident("x"))),
    ])
    .unwrap();
    let main = &compiled.module.functions[0];
    let stores = main
        .insts()
        .filter(|i| matches!(i, Inst::Store { .. }))
        .count();
    assert_eq!(stores, 1);
    let text = main.to_string();
    assert!(text.contains("%3 = add %1, %2"));
    assert!(text.contains("%6 = sub %4, %5"));
}

#[test]
fn test_call_arguments_in_order() {
    let text = ir(vec![
        Stmt::func(
            "add",
            &[("Int", "a"), ("Int", "b")],
            "Int",
            vec![Stmt::ret(Expr::binary(
                BinOp::Add,
                Expr::ident("a"),
                Expr::ident("b"),
            ))],
        ),
        Stmt::var(
            "Int",
            "r",
            Some(Expr::call("add", vec![Expr::int(2), Expr::int(3)])),
        ),
    ]);
    assert!(text.contains("%0 = const i64 2\n  %1 = const i64 3\n  %2 = call add(%0, %1)"));
}

#[test]
fn test_recursive_call_resolves() {
    let fact = Stmt::func(
        "fact",
        &[("Int", "n")],
        "Int",
        vec![
            Stmt::if_else(
                Expr::binary(BinOp::Le, Expr::ident("n"), Expr::int(1)),
                vec![Stmt::ret(Expr::int(1))],
                None,
            ),
            Stmt::ret(Expr::binary(
                BinOp::Mul,
                Expr::ident("n"),
                Expr::call(
                    "fact",
                    vec![Expr::binary(BinOp::Sub, Expr::ident("n"), Expr::int(1))],
                ),
            )),
        ],
    );
    let text = ir(vec![fact]);
    assert!(text.contains("call fact("));
}

#[test]
fn test_nested_return_in_branch_continues_after_merge() {
    let f = Stmt::func(
        "pick",
        &[("Int", "a"), ("Int", "b")],
        "Int",
        vec![
            Stmt::if_else(
                Expr::ident("a"),
                vec![Stmt::if_else(
                    Expr::ident("b"),
                    vec![Stmt::ret(Expr::int(1))],
                    Some(vec![Stmt::ret(Expr::int(2))]),
                )],
                None,
            ),
            Stmt::ret(Expr::int(3)),
        ],
    );
    let compiled = lower(vec![f]).unwrap();
    let (_, pick) = compiled.module.find_function("pick").unwrap();
    let inner_merge = pick.block_by_label("merge.1").unwrap();
    assert_eq!(inner_merge.terminator, Some(Terminator::Unreachable));
    let outer_merge = pick.block_by_label("merge.0").unwrap();
    assert!(matches!(
        outer_merge.terminator,
        Some(Terminator::Return(Some(_)))
    ));
}

// ─── Scoping across branches ──────────────────────────────────────

#[test]
fn test_branch_declaration_not_visible_after_merge() {
    let errs = errors(vec![
        Stmt::var("Int", "x", Some(Expr::int(1))),
        Stmt::if_else(
            Expr::ident("x"),
            vec![Stmt::var("Int", "y", Some(Expr::int(2)))],
            None,
        ),
        Stmt::expr(Expr::assign("y", Expr::int(3))),
    ]);
    assert_eq!(errs, ["undeclared variable `y`"]);
}

#[test]
fn test_branch_assignment_writes_outer_slot() {
    let compiled = lower(vec![
        Stmt::var("Int", "x", Some(Expr::int(1))),
        Stmt::if_else(
            Expr::ident("x"),
            vec![Stmt::expr(Expr::assign("x", Expr::int(2)))],
            None,
        ),
    ])
    .unwrap();
    let main = &compiled.module.functions[0];
    let then_block = main.block_by_label("then.0").unwrap();
    assert!(then_block
        .insts
        .iter()
        .any(|i| matches!(i, Inst::Store { slot: SlotId(0), .. })));
    assert_eq!(main.slots.len(), 1);
}

#[test]
fn test_function_body_does_not_see_callers_locals() {
    let errs = errors(vec![
        Stmt::var("Int", "x", Some(Expr::int(1))),
        Stmt::func("f", &[], "Int", vec![Stmt::ret(Expr::ident("x"))]),
    ]);
    assert!(errs.contains(&"undeclared variable `x`".to_string()));
}

// ─── Errors ───────────────────────────────────────────────────────

#[test]
fn test_assignment_to_undeclared_emits_no_store() {
    let mut lw = open_main();
    lw.lower_block(&Block::new(vec![Stmt::expr(Expr::assign(
        "y",
        Expr::int(7),
    ))]));
    assert_eq!(lw.diagnostics.len(), 1);
    assert_eq!(lw.diagnostics[0].message, "undeclared variable `y`");
    assert!(!lw
        .builder
        .function()
        .insts()
        .any(|i| matches!(i, Inst::Store { .. })));
}

#[test]
fn test_errors_are_collected_across_statements() {
    let errs = errors(vec![
        Stmt::expr(Expr::ident("a")),
        Stmt::var("Bool", "b", Some(Expr::int(1))),
        Stmt::expr(Expr::call("missing", vec![])),
        Stmt::expr(Expr::binary(BinOp::Pow, Expr::int(2), Expr::int(3))),
    ]);
    assert_eq!(
        errs,
        [
            "undeclared variable `a`",
            "unknown type `Bool`",
            "undefined function `missing`",
            "operator `**` is not supported",
        ]
    );
}

#[test]
fn test_logical_operators_unsupported() {
    for op in [BinOp::And, BinOp::Or] {
        let errs = errors(vec![Stmt::expr(Expr::binary(op, Expr::int(1), Expr::int(0)))]);
        assert_eq!(errs, [format!("operator `{}` is not supported", op)]);
    }
}

#[test]
fn test_double_operands_rejected() {
    let errs = errors(vec![Stmt::expr(Expr::binary(
        BinOp::Add,
        Expr::double(1.0),
        Expr::int(2),
    ))]);
    assert_eq!(
        errs,
        ["invalid operand: `+` expects Int operands, found Double and Int"]
    );
}

#[test]
fn test_constant_zero_divisor_rejected() {
    for op in [BinOp::Div, BinOp::Mod] {
        let errs = errors(vec![
            Stmt::var("Int", "x", Some(Expr::int(7))),
            Stmt::expr(Expr::binary(op, Expr::ident("x"), Expr::int(0))),
        ]);
        assert_eq!(errs, [format!("invalid operand: `{}` by a constant zero", op)]);
    }
    // Only a literal zero is caught; other divisors are left to run time.
    let text = ir(vec![
        Stmt::var("Int", "z", Some(Expr::int(0))),
        Stmt::expr(Expr::binary(BinOp::Div, Expr::int(1), Expr::ident("z"))),
    ]);
    assert!(text.contains("sdiv"));
}

#[test]
fn test_double_condition_rejected() {
    let errs = errors(vec![Stmt::if_else(Expr::double(0.5), vec![], None)]);
    assert_eq!(errs, ["invalid operand: condition must be Int, found Double"]);
}

#[test]
fn test_string_variables_are_read_only() {
    let errs = errors(vec![
        Stmt::var("String", "s", Some(Expr::string("a"))),
        Stmt::expr(Expr::assign("s", Expr::string("b"))),
    ]);
    assert_eq!(errs, ["cannot assign to read-only variable `s`"]);
}

#[test]
fn test_string_declaration_needs_literal() {
    let errs = errors(vec![Stmt::var("String", "s", Some(Expr::int(3)))]);
    assert_eq!(errs.len(), 1);
    assert!(errs[0].contains("must be initialized with a string literal"));
}

#[test]
fn test_assignment_type_mismatch() {
    let errs = errors(vec![Stmt::var("Int", "x", Some(Expr::double(2.5)))]);
    assert_eq!(
        errs,
        ["type mismatch in assignment to `x`: expected Int, found Double"]
    );
}

#[test]
fn test_comparison_cannot_be_stored() {
    let errs = errors(vec![Stmt::var(
        "Int",
        "b",
        Some(Expr::binary(BinOp::Lt, Expr::int(1), Expr::int(2))),
    )]);
    assert_eq!(
        errs,
        ["type mismatch in assignment to `b`: expected Int, found Bool"]
    );
}

#[test]
fn test_call_checks_arity_and_types() {
    let f = Stmt::func("f", &[("Int", "a")], "Int", vec![Stmt::ret(Expr::ident("a"))]);
    let errs = errors(vec![
        f,
        Stmt::expr(Expr::call("f", vec![])),
        Stmt::expr(Expr::call("f", vec![Expr::double(1.0)])),
    ]);
    assert_eq!(
        errs,
        [
            "`f` takes 1 argument(s) but 0 were given",
            "type mismatch in argument 1 of `f`: expected Int, found Double",
        ]
    );
}

#[test]
fn test_void_call_is_not_a_value() {
    let errs = errors(vec![
        Stmt::func("noop", &[], "Void", vec![]),
        Stmt::var("Int", "x", Some(Expr::call("noop", vec![]))),
    ]);
    assert_eq!(errs, ["invalid operand: call produces no value"]);
}

#[test]
fn test_print_needs_format_string() {
    let errs = errors(vec![
        Stmt::expr(Expr::call("print", vec![])),
        Stmt::expr(Expr::call("print", vec![Expr::int(1)])),
    ]);
    assert_eq!(
        errs,
        [
            "`print` takes 1 argument(s) but 0 were given",
            "type mismatch in format argument of `print`: expected String, found Int",
        ]
    );
}

#[test]
fn test_duplicate_and_reserved_function_names() {
    let errs = errors(vec![
        Stmt::func("f", &[], "Void", vec![]),
        Stmt::func("f", &[], "Void", vec![]),
        Stmt::func("print", &[], "Void", vec![]),
        Stmt::func("main", &[], "Void", vec![]),
    ]);
    assert_eq!(
        errs,
        [
            "function `f` is already defined",
            "function `print` is already defined",
            "function `main` is already defined",
        ]
    );
}

#[test]
fn test_unknown_parameter_and_return_types() {
    let errs = errors(vec![
        Stmt::func("f", &[("Float", "a")], "Void", vec![]),
        Stmt::func("g", &[], "Bool", vec![]),
    ]);
    assert_eq!(errs, ["unknown type `Float`", "unknown type `Bool`"]);
}

#[test]
fn test_missing_return_on_some_path() {
    let f = Stmt::func(
        "f",
        &[("Int", "a")],
        "Int",
        vec![Stmt::if_else(
            Expr::ident("a"),
            vec![Stmt::ret(Expr::int(1))],
            None,
        )],
    );
    let errs = errors(vec![f]);
    assert_eq!(errs, ["function `f` does not return a value on every path"]);
}

#[test]
fn test_return_type_checked() {
    let f = Stmt::func("f", &[], "Int", vec![Stmt::ret(Expr::string("no"))]);
    let errs = errors(vec![f]);
    assert_eq!(
        errs,
        ["type mismatch in return from `f`: expected Int, found String"]
    );
}

#[test]
fn test_diagnostics_carry_help() {
    let diags = lower(vec![Stmt::expr(Expr::ident("ghost"))]).unwrap_err();
    assert_eq!(
        diags[0].help.as_deref(),
        Some("declare it first, e.g. `Int ghost = 0;`")
    );
}

// ─── Warnings and trace ───────────────────────────────────────────

#[test]
fn test_statements_after_return_are_skipped() {
    let f = Stmt::func(
        "f",
        &[],
        "Int",
        vec![
            Stmt::ret(Expr::int(1)),
            Stmt::var("Int", "dead", Some(Expr::int(2))),
            Stmt::ret(Expr::int(3)),
        ],
    );
    let compiled = lower(vec![f]).unwrap();
    assert_eq!(compiled.warnings.len(), 1);
    assert_eq!(compiled.warnings[0].message, "unreachable statement");
    let (_, func) = compiled.module.find_function("f").unwrap();
    assert!(func.slots.is_empty());
}

#[test]
fn test_return_in_main_ends_main() {
    let text = ir(vec![Stmt::ret(Expr::int(0))]);
    assert!(text.contains("%0 = const i64 0\n  ret\n"));
}

#[test]
fn test_verbose_trace_is_numbered() {
    let options = CompileOptions::default().with_verbose(true);
    let compiled = compile(
        &Block::new(vec![Stmt::var("Int", "x", Some(Expr::int(5)))]),
        &options,
    )
    .unwrap();
    assert_eq!(compiled.trace[0], "1.   generating code");
    for (i, line) in compiled.trace.iter().enumerate() {
        assert!(line.starts_with(&format!("{}.", i + 1)));
    }
    assert!(compiled
        .trace
        .iter()
        .any(|l| l.ends_with("creating integer: 5")));
    assert!(compiled
        .trace
        .last()
        .unwrap()
        .ends_with("code generation complete"));
}

#[test]
fn test_quiet_compile_has_no_trace() {
    let compiled = lower(vec![Stmt::var("Int", "x", Some(Expr::int(5)))]).unwrap();
    assert!(compiled.trace.is_empty());
}

#[test]
fn test_lowering_is_deterministic() {
    let program = || vec![sign_fn(), Stmt::var("Int", "x", Some(Expr::int(5)))];
    let a = lower(program()).unwrap();
    let b = lower(program()).unwrap();
    assert_eq!(a.module.to_string(), b.module.to_string());
    assert_eq!(a.module.fingerprint(), b.module.fingerprint());
}
