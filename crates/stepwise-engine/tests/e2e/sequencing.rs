//! Straight-line computations: state counts and results

use super::harness::*;
use stepwise_engine::ast::{AwaitId, Block};
use stepwise_engine::{TreeBuilder, Type, Value};

fn fetch_ty() -> Type {
    Type::function(vec![Type::Int], Type::future(Type::Int))
}

// ============================================================================
// State Counts
// ============================================================================

#[test]
fn test_no_awaits_is_a_single_state() {
    let fixture = Fixture::new();
    let mut b = TreeBuilder::new();
    let x = b.binding("x", Type::Int);
    let body = b.block(vec![b.let_(&x, b.int(2))], b.mul(b.var(&x), b.int(21)));
    let computation = b.computation("answer", vec![], body);

    let automaton = fixture.lower(&computation);
    assert_eq!(automaton.state_count(), 1);
    expect_value(&fixture, &computation, vec![], Value::Int(42));
}

#[test]
fn test_one_state_per_await_plus_entry() {
    let fixture = Fixture::new();
    let mut b = TreeBuilder::new();
    let a = b.binding("a", Type::Int);
    let c = b.binding("c", Type::Int);
    let fetch = b.global("fetch", fetch_ty());

    let first = b.await_(b.call(fetch.clone(), vec![b.int(1)]));
    let second = b.await_(b.call(fetch.clone(), vec![b.var(&a)]));
    let third = b.await_(b.call(fetch, vec![b.int(3)]));
    let body = b.block(
        vec![b.let_(&a, first), b.let_(&c, second)],
        b.add(b.add(b.var(&a), b.var(&c)), third),
    );
    let computation = b.computation("chain", vec![], body);

    let automaton = fixture.lower(&computation);
    assert_eq!(automaton.state_count(), 4);
    // a = 10, c = 100, third = 30
    expect_value(&fixture, &computation, vec![], Value::Int(140));
}

#[test]
fn test_resume_states_follow_await_order() {
    let fixture = Fixture::new();
    let mut b = TreeBuilder::new();
    let fetch = b.global("fetch", fetch_ty());
    let first = b.await_(b.call(fetch.clone(), vec![b.int(1)]));
    let second = b.await_(b.call(fetch, vec![b.int(2)]));
    let computation = b.computation("pair", vec![], Block::of(b.sub(first, second)));

    let automaton = fixture.lower(&computation);
    let resumes: Vec<u32> = (0..2)
        .map(|n| {
            automaton
                .resume_state_of(AwaitId::new(n))
                .map(|s| s.as_u32())
                .unwrap()
        })
        .collect();
    assert_eq!(resumes, vec![1, 2]);
    expect_value(&fixture, &computation, vec![], Value::Int(-10));
}

// ============================================================================
// Bindings Across States
// ============================================================================

#[test]
fn test_parameters_survive_suspension() {
    let fixture = Fixture::new();
    let mut b = TreeBuilder::new();
    let n = b.binding("n", Type::Int);
    let fetch = b.global("fetch", fetch_ty());
    let awaited = b.await_(b.call(fetch, vec![b.var(&n)]));
    let body = Block::of(b.add(awaited, b.var(&n)));
    let computation = b.computation("plus_self", vec![n], body);

    expect_value(&fixture, &computation, vec![Value::Int(4)], Value::Int(44));
}

#[test]
fn test_mutable_binding_updated_across_awaits() {
    let fixture = Fixture::new();
    let mut b = TreeBuilder::new();
    let total = b.mutable("total", Type::Int);
    let fetch = b.global("fetch", fetch_ty());
    let plus = b.await_(b.call(fetch.clone(), vec![b.int(2)]));
    let times = b.await_(b.call(fetch, vec![b.int(1)]));
    let body = b.block(
        vec![
            b.let_(&total, b.int(1)),
            b.assign(&total, b.add(b.var(&total), plus)),
            b.assign(&total, b.mul(b.var(&total), times)),
        ],
        b.var(&total),
    );
    let computation = b.computation("accumulate", vec![], body);

    expect_value(&fixture, &computation, vec![], Value::Int(210));
}

#[test]
fn test_left_operand_evaluated_before_await() {
    let fixture = Fixture::new();
    let mut b = TreeBuilder::new();
    let x = b.mutable("x", Type::Int);
    let bump = b.binding("bump", Type::function(vec![], Type::Int));
    let fetch = b.global("fetch", fetch_ty());
    let awaited = b.await_(b.call(fetch, vec![b.var(&x)]));
    // bump() sets x to 5 and returns it; the await must see the new x
    let bump_body = b.block(vec![b.assign(&x, b.int(5))], b.var(&x));
    let body = b.block(
        vec![
            b.let_(&x, b.int(1)),
            b.let_(&bump, b.lambda(vec![], bump_body)),
        ],
        b.add(b.call(b.var(&bump), vec![]), awaited),
    );
    let computation = b.computation("order", vec![], body);

    // closures capture by value, so x stays 1 outside the closure
    expect_value(&fixture, &computation, vec![], Value::Int(15));
}

#[test]
fn test_immediately_invoked_lambda_is_inlined() {
    let fixture = Fixture::new();
    let mut b = TreeBuilder::new();
    let n = b.binding("n", Type::Int);
    let fetch = b.global("fetch", fetch_ty());
    let awaited = b.await_(b.call(fetch, vec![b.var(&n)]));
    let lambda = b.lambda(vec![n.clone()], Block::of(b.add(b.var(&n), awaited)));
    let computation = b.computation("inline", vec![], Block::of(b.call(lambda, vec![b.int(4)])));

    let automaton = fixture.lower(&computation);
    assert_eq!(automaton.state_count(), 2);
    expect_value(&fixture, &computation, vec![], Value::Int(44));
}

/// `let mut x = 1; let r = (() => { x = 2; await fetch(1) })(); x + r`
#[test]
fn test_inlined_lambda_assigns_its_own_copy() {
    let fixture = Fixture::new();
    let mut b = TreeBuilder::new();
    let x = b.mutable("x", Type::Int);
    let r = b.binding("r", Type::Int);
    let fetch = b.global("fetch", fetch_ty());
    let awaited = b.await_(b.call(fetch, vec![b.int(1)]));
    let lambda = b.lambda(vec![], b.block(vec![b.assign(&x, b.int(2))], awaited));
    let body = b.block(
        vec![b.let_(&x, b.int(1)), b.let_(&r, b.call(lambda, vec![]))],
        b.add(b.var(&x), b.var(&r)),
    );
    let computation = b.computation("captured_write", vec![], body);

    expect_value(&fixture, &computation, vec![], Value::Int(11));
}

/// `let mut x = 1; let r = ((n) => x + await fetch(n))({ x = 5; 2 }); x + r`
#[test]
fn test_inlined_lambda_reads_capture_before_arguments() {
    let fixture = Fixture::new();
    let mut b = TreeBuilder::new();
    let x = b.mutable("x", Type::Int);
    let r = b.binding("r", Type::Int);
    let n = b.binding("n", Type::Int);
    let fetch = b.global("fetch", fetch_ty());
    let awaited = b.await_(b.call(fetch, vec![b.var(&n)]));
    let lambda = b.lambda(vec![n.clone()], Block::of(b.add(b.var(&x), awaited)));
    let arg = b.block_expr(b.block(vec![b.assign(&x, b.int(5))], b.int(2)));
    let body = b.block(
        vec![b.let_(&x, b.int(1)), b.let_(&r, b.call(lambda, vec![arg]))],
        b.add(b.var(&x), b.var(&r)),
    );
    let computation = b.computation("captured_read", vec![], body);

    // the closure sees x = 1, the caller sees x = 5
    expect_value(&fixture, &computation, vec![], Value::Int(26));
}

// ============================================================================
// Scheduling
// ============================================================================

#[test]
fn test_suspends_until_future_settles() {
    let mut fixture = Fixture::new();
    let (promise, _) = fixture.pending("later");
    let mut b = TreeBuilder::new();
    let later = b.global("later", Type::future(Type::Str));
    let awaited = b.await_(later);
    let body = Block::of(b.concat(b.str("got "), awaited));
    let computation = b.computation("waits", vec![], body);

    let automaton = fixture.lower(&computation);
    let future = automaton.invoke(vec![]).unwrap();
    fixture.runtime.run_until_idle();
    assert_eq!(fixture.runtime.outcome(future), None);

    fixture.runtime.settle(promise, Ok(Value::str("it"))).unwrap();
    fixture.runtime.run_until_idle();
    assert_eq!(fixture.runtime.outcome(future), Some(Ok(Value::str("got it"))));
}

#[test]
fn test_instances_do_not_share_storage() {
    let fixture = Fixture::new();
    let mut b = TreeBuilder::new();
    let n = b.binding("n", Type::Int);
    let fetch = b.global("fetch", fetch_ty());
    let awaited = b.await_(b.call(fetch, vec![b.var(&n)]));
    let computation = b.computation("scaled", vec![n.clone()], Block::of(b.add(b.var(&n), awaited)));
    let automaton = fixture.lower(&computation);

    let first = automaton.invoke(vec![Value::Int(1)]).unwrap();
    let second = automaton.invoke(vec![Value::Int(2)]).unwrap();
    fixture.runtime.run_until_idle();
    assert_eq!(fixture.runtime.outcome(first), Some(Ok(Value::Int(11))));
    assert_eq!(fixture.runtime.outcome(second), Some(Ok(Value::Int(22))));
}
