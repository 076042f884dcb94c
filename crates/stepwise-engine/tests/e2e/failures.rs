//! Failure propagation and rejected computations

use super::harness::*;
use stepwise_engine::ast::{AwaitId, Block, LogicalOp};
use stepwise_engine::{
    AwaitContext, Failure, LowerError, LowerOptions, Lowering, TreeBuilder, Type, Value,
};

fn fetch_ty() -> Type {
    Type::function(vec![Type::Int], Type::future(Type::Int))
}

// ============================================================================
// Runtime Failures
// ============================================================================

#[test]
fn test_failed_await_skips_later_states() {
    let mut fixture = Fixture::new();
    let boom = Failure::native("f1", "boom");
    let f1 = fixture.settled("f1", Err(boom.clone()));
    let f2 = fixture.settled("f2", Ok(Value::Int(2)));

    let mut b = TreeBuilder::new();
    let x = b.binding("x", Type::Int);
    let y = b.binding("y", Type::Int);
    let first = b.await_(b.global("f1", Type::future(Type::Int)));
    let second = b.await_(b.global("f2", Type::future(Type::Int)));
    let body = b.block(
        vec![b.let_(&x, first), b.let_(&y, b.add(b.var(&x), second))],
        b.var(&y),
    );
    let computation = b.computation("stops_early", vec![], body);

    assert_eq!(fixture.expect_same(&computation, vec![]), Err(boom));
    // only the lowered run registers callbacks
    assert_eq!(fixture.runtime.awaited_count(f1), 1);
    assert_eq!(fixture.runtime.awaited_count(f2), 0);
}

#[test]
fn test_failure_after_resume_completes_promise() {
    let fixture = Fixture::new();
    let mut b = TreeBuilder::new();
    let d = b.binding("d", Type::Int);
    let fetch = b.global("fetch", fetch_ty());
    let awaited = b.await_(b.call(fetch, vec![b.int(0)]));
    let body = b.block(vec![b.let_(&d, awaited)], b.div(b.int(10), b.var(&d)));
    let computation = b.computation("divide", vec![], body);

    assert_eq!(
        fixture.expect_same(&computation, vec![]),
        Err(Failure::DivisionByZero)
    );
}

#[test]
fn test_failing_native_future() {
    let fixture = Fixture::new();
    let mut b = TreeBuilder::new();
    let reject = b.global("reject", Type::function(vec![Type::Str], Type::future(Type::Int)));
    let awaited = b.await_(b.call(reject, vec![b.str("nope")]));
    let computation = b.computation("rejected", vec![], Block::of(b.add(awaited, b.int(1))));

    assert_eq!(
        fixture.expect_same(&computation, vec![]),
        Err(Failure::native("reject", "nope"))
    );
}

/// `missing; await fetch(1)` fails on the lookup before suspending
#[test]
fn test_undefined_global_statement_fails() {
    let fixture = Fixture::new();
    let mut b = TreeBuilder::new();
    let missing = b.global("missing", Type::Int);
    let fetch = b.global("fetch", fetch_ty());
    let awaited = b.await_(b.call(fetch, vec![b.int(1)]));
    let computation = b.computation(
        "undefined_global",
        vec![],
        b.block(vec![b.expr_stmt(missing)], awaited),
    );

    assert_eq!(
        fixture.expect_same(&computation, vec![]),
        Err(Failure::Type("undefined global missing".into()))
    );
}

#[test]
fn test_try_without_await_catches_after_resume() {
    let fixture = Fixture::new();
    let mut b = TreeBuilder::new();
    let v = b.binding("v", Type::Int);
    let e = b.binding("e", Type::Any);
    let fetch = b.global("fetch", fetch_ty());
    let awaited = b.await_(b.call(fetch, vec![b.int(1)]));
    let guarded = b.try_(
        Block::of(b.throw(b.var(&v))),
        e.clone(),
        Block::of(b.add(b.var(&e), b.int(1))),
    );
    let computation = b.computation(
        "caught",
        vec![],
        b.block(vec![b.let_(&v, awaited)], guarded),
    );

    expect_value(&fixture, &computation, vec![], Value::Int(11));
}

#[test]
fn test_uncaught_throw_fails_result() {
    let fixture = Fixture::new();
    let mut b = TreeBuilder::new();
    let fetch = b.global("fetch", fetch_ty());
    let awaited = b.await_(b.call(fetch, vec![b.int(7)]));
    let computation = b.computation("thrown", vec![], Block::of(b.throw(awaited)));

    assert_eq!(
        fixture.expect_same(&computation, vec![]),
        Err(Failure::Thrown(Value::Int(70)))
    );
}

#[test]
fn test_invoke_checks_arity() {
    let fixture = Fixture::new();
    let mut b = TreeBuilder::new();
    let n = b.binding("n", Type::Int);
    let computation = b.computation("unary", vec![n.clone()], Block::of(b.var(&n)));
    let automaton = fixture.lower(&computation);

    let err = automaton.invoke(vec![]).unwrap_err();
    assert!(matches!(err, Failure::Type(_)));
    assert_eq!(fixture.runtime.promise_count(), 0);
}

// ============================================================================
// Rejected Computations
// ============================================================================

fn lower_err(fixture: &Fixture, computation: &stepwise_engine::Computation) -> LowerError {
    Lowering::with_options(
        fixture.runtime.clone(),
        std::sync::Arc::new(fixture.globals.clone()),
        LowerOptions::default(),
    )
    .lower(computation)
    .unwrap_err()
}

#[test]
fn test_await_in_short_circuit_operand_is_rejected() {
    let fixture = Fixture::new();
    let mut b = TreeBuilder::new();
    let flag = b.global("flag", Type::future(Type::Bool));
    let awaited = b.await_(flag);
    let computation = b.computation("lazy", vec![], Block::of(b.and(b.bool(true), awaited)));

    let err = lower_err(&fixture, &computation);
    let diagnostics = err.diagnostics();
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].await_id, AwaitId::new(0));
    assert_eq!(diagnostics[0].context, AwaitContext::ShortCircuit(LogicalOp::And));
    assert!(!err.is_internal());
    // nothing was scheduled
    assert_eq!(fixture.runtime.run_until_idle(), 0);
}

#[test]
fn test_every_rejected_await_is_reported() {
    let fixture = Fixture::new();
    let mut b = TreeBuilder::new();
    let e = b.binding("e", Type::Any);
    let flag = b.global("flag", Type::future(Type::Bool));
    let in_loop = b.await_(flag.clone());
    let in_try = b.await_(flag);
    let body = b.block(
        vec![b.expr_stmt(b.while_(in_loop, Block::of(b.unit())))],
        b.try_(Block::of(in_try), e, Block::of(b.bool(false))),
    );
    let computation = b.computation("mixed", vec![], body);

    let err = lower_err(&fixture, &computation);
    let contexts: Vec<AwaitContext> = err.diagnostics().iter().map(|d| d.context).collect();
    assert_eq!(contexts, vec![AwaitContext::Loop, AwaitContext::Try]);
}

#[test]
fn test_diagnostics_serialize_for_tooling() {
    let fixture = Fixture::new();
    let mut b = TreeBuilder::new();
    let flag = b.global("flag", Type::future(Type::Bool));
    let awaited = b.await_(flag);
    let computation = b.computation("lazy", vec![], Block::of(b.or(awaited, b.bool(false))));

    let err = lower_err(&fixture, &computation);
    let json = serde_json::to_value(err.diagnostics()).unwrap();
    assert_eq!(json[0]["await_id"], 0);
    assert!(json[0]["context"].get("short_circuit").is_some());
}
