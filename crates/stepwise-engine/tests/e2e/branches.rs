//! Conditionals and matches that suspend

use super::harness::*;
use stepwise_engine::ast::{Block, Computation, Literal, Pattern};
use stepwise_engine::{Failure, StateId, Transition, TreeBuilder, Type, Value};

fn fetch_ty() -> Type {
    Type::function(vec![Type::Int], Type::future(Type::Int))
}

/// `let r = if (await flag) { await fetch(1) } else { 2 }; r + await fetch(3)`
fn choose() -> Computation {
    let mut b = TreeBuilder::new();
    let r = b.binding("r", Type::Int);
    let flag = b.global("flag", Type::future(Type::Bool));
    let fetch = b.global("fetch", fetch_ty());

    let cond = b.await_(flag);
    let then_value = b.await_(b.call(fetch.clone(), vec![b.int(1)]));
    let tail = b.await_(b.call(fetch, vec![b.int(3)]));
    let choice = b.if_(cond, Block::of(then_value), Block::of(b.int(2)));
    let body = b.block(vec![b.let_(&r, choice)], b.add(b.var(&r), tail));
    b.computation("choose", vec![], body)
}

#[test]
fn test_if_arms_reconverge_on_one_join_state() {
    let mut fixture = Fixture::new();
    fixture.settled("flag", Ok(Value::Bool(true)));
    let automaton = fixture.lower(&choose());
    let machine = automaton.machine();

    let branches: Vec<&Vec<StateId>> = machine
        .states
        .iter()
        .filter_map(|s| match &s.exit {
            Transition::Branch { targets, .. } => Some(targets),
            _ => None,
        })
        .collect();
    assert_eq!(branches.len(), 1);
    assert_eq!(branches[0].len(), 2);

    let gotos: Vec<StateId> = machine
        .states
        .iter()
        .filter_map(|s| match s.exit {
            Transition::Goto(next) => Some(next),
            _ => None,
        })
        .collect();
    assert_eq!(gotos.len(), 2);
    assert_eq!(gotos[0], gotos[1]);

    // the tail after the join is emitted once
    let completes = machine
        .states
        .iter()
        .filter(|s| matches!(s.exit, Transition::Complete(_)))
        .count();
    assert_eq!(completes, 1);
}

#[test]
fn test_if_takes_suspending_arm() {
    let mut fixture = Fixture::new();
    fixture.settled("flag", Ok(Value::Bool(true)));
    expect_value(&fixture, &choose(), vec![], Value::Int(40));
}

#[test]
fn test_if_takes_plain_arm() {
    let mut fixture = Fixture::new();
    fixture.settled("flag", Ok(Value::Bool(false)));
    expect_value(&fixture, &choose(), vec![], Value::Int(32));
}

/// `if (await flag) { "a" } else { "b" }; await fetch(1)`
fn awaited_condition() -> Computation {
    let mut b = TreeBuilder::new();
    let flag = b.global("flag", Type::future(Type::Bool));
    let fetch = b.global("fetch", fetch_ty());

    let cond = b.await_(flag);
    let choice = b.if_(cond, Block::of(b.str("a")), Block::of(b.str("b")));
    let tail = b.await_(b.call(fetch, vec![b.int(1)]));
    let body = b.block(vec![b.expr_stmt(choice)], tail);
    b.computation("awaited_condition", vec![], body)
}

#[test]
fn test_await_only_in_condition_still_branches() {
    let mut fixture = Fixture::new();
    fixture.settled("flag", Ok(Value::Bool(true)));
    let automaton = fixture.lower(&awaited_condition());
    let machine = automaton.machine();

    let targets: Vec<&Vec<StateId>> = machine
        .states
        .iter()
        .filter_map(|s| match &s.exit {
            Transition::Branch { targets, .. } => Some(targets),
            _ => None,
        })
        .collect();
    assert_eq!(targets.len(), 1);
    assert_eq!(targets[0].len(), 2);

    let gotos: Vec<StateId> = machine
        .states
        .iter()
        .filter_map(|s| match s.exit {
            Transition::Goto(next) => Some(next),
            _ => None,
        })
        .collect();
    assert_eq!(gotos.len(), 2);
    assert_eq!(gotos[0], gotos[1]);

    let tails = machine
        .states
        .iter()
        .filter(|s| matches!(s.exit, Transition::Complete(_)))
        .count();
    assert_eq!(tails, 1);
}

#[test]
fn test_await_only_in_condition_runs_either_arm() {
    for flag in [true, false] {
        let mut fixture = Fixture::new();
        fixture.settled("flag", Ok(Value::Bool(flag)));
        expect_value(&fixture, &awaited_condition(), vec![], Value::Int(10));
    }
}

/// `match await fetch(n) { 10 => await fetch(5), x if 20 < x => x, _ => 0 }`
fn classify() -> Computation {
    let mut b = TreeBuilder::new();
    let n = b.binding("n", Type::Int);
    let x = b.binding("x", Type::Int);
    let fetch = b.global("fetch", fetch_ty());

    let scrutinee = b.await_(b.call(fetch.clone(), vec![b.var(&n)]));
    let first = b.await_(b.call(fetch, vec![b.int(5)]));
    let arms = vec![
        b.arm(Pattern::Literal(Literal::Int(10)), None, Block::of(first)),
        b.arm(
            Pattern::Bind(x.clone()),
            Some(b.lt(b.int(20), b.var(&x))),
            Block::of(b.var(&x)),
        ),
        b.arm(Pattern::Wildcard, None, Block::of(b.int(0))),
    ];
    let body = Block::of(b.match_(scrutinee, arms));
    b.computation("classify", vec![n], body)
}

#[test]
fn test_match_arms() {
    let fixture = Fixture::new();
    let computation = classify();
    expect_value(&fixture, &computation, vec![Value::Int(1)], Value::Int(50));
    expect_value(&fixture, &computation, vec![Value::Int(3)], Value::Int(30));
    expect_value(&fixture, &computation, vec![Value::Int(2)], Value::Int(0));
}

#[test]
fn test_match_without_accepting_arm_fails() {
    let fixture = Fixture::new();
    let mut b = TreeBuilder::new();
    let n = b.binding("n", Type::Int);
    let fetch = b.global("fetch", fetch_ty());
    let scrutinee = b.await_(b.call(fetch.clone(), vec![b.var(&n)]));
    let body_value = b.await_(b.call(fetch, vec![b.int(1)]));
    let arms = vec![b.arm(Pattern::Literal(Literal::Int(10)), None, Block::of(body_value))];
    let computation = b.computation("partial", vec![n], Block::of(b.match_(scrutinee, arms)));

    assert_eq!(
        fixture.expect_same(&computation, vec![Value::Int(2)]),
        Err(Failure::MatchError(Value::Int(20)))
    );
}
