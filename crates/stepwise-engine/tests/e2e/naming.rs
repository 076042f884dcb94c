//! Storage classification and promoted names

use super::harness::*;
use rustc_hash::FxHashSet;
use stepwise_engine::ast::Block;
use stepwise_engine::fresh::RESERVED_NAMES;
use stepwise_engine::{LowerOptions, PrettyPrint, Storage, TreeBuilder, Type, Value};

fn fetch_ty() -> Type {
    Type::function(vec![Type::Int], Type::future(Type::Int))
}

#[test]
fn test_storage_classification() {
    let fixture = Fixture::new();
    let mut b = TreeBuilder::new();
    let a = b.binding("a", Type::Int);
    let c = b.binding("c", Type::Int);
    let r = b.binding("r", Type::Int);
    let fetch = b.global("fetch", fetch_ty());
    let awaited = b.await_(b.call(fetch, vec![b.var(&c)]));
    let body = b.block(
        vec![
            b.let_(&a, b.int(1)),
            b.let_(&c, b.add(b.var(&a), b.int(1))),
            b.let_(&r, awaited),
        ],
        b.add(b.var(&a), b.var(&r)),
    );
    let computation = b.computation("classified", vec![], body);
    let automaton = fixture.lower(&computation);
    let machine = automaton.machine();

    assert!(matches!(machine.storage_of(a.id()), Storage::Promoted(_)));
    assert_eq!(machine.storage_of(c.id()), Storage::Local);
    assert!(matches!(machine.storage_of(r.id()), Storage::Promoted(_)));
    expect_value(&fixture, &computation, vec![], Value::Int(21));
}

/// Bindings whose source names clash with each other and with automaton fields
fn clashing() -> stepwise_engine::Computation {
    let mut b = TreeBuilder::new();
    let names = ["state", "state", "slots", "await$state$1", "result"];
    let bindings: Vec<_> = names.iter().map(|n| b.binding(n, Type::Int)).collect();
    let fetch = b.global("fetch", fetch_ty());
    let awaited = b.await_(b.call(fetch, vec![b.int(1)]));

    let mut stmts: Vec<_> = bindings
        .iter()
        .zip(1..)
        .map(|(binding, n)| b.let_(binding, b.int(n)))
        .collect();
    stmts.push(b.expr_stmt(awaited));
    let sum = bindings
        .iter()
        .fold(b.int(0), |acc, binding| b.add(acc, b.var(binding)));
    b.computation("clashing", vec![], b.block(stmts, sum))
}

#[test]
fn test_promoted_names_never_collide() {
    let fixture = Fixture::new();
    let computation = clashing();
    for options in [
        LowerOptions::default(),
        LowerOptions {
            promoted_prefix: "slot$".to_string(),
            ..LowerOptions::default()
        },
    ] {
        let automaton = fixture.lower_with(&computation, options.clone());
        let slots = automaton.machine().slots();
        assert_eq!(slots.len(), 6);

        let mut seen = FxHashSet::default();
        for binding in slots {
            assert!(binding.name().starts_with(&options.promoted_prefix));
            assert!(!RESERVED_NAMES.contains(&binding.name()));
            assert!(seen.insert(binding.name().to_string()), "{} reused", binding.name());
        }
    }
    expect_value(&fixture, &computation, vec![], Value::Int(15));
}

#[test]
fn test_pretty_printed_automaton() {
    let fixture = Fixture::new();
    let mut b = TreeBuilder::new();
    let n = b.binding("n", Type::Int);
    let fetch = b.global("fetch", fetch_ty());
    let awaited = b.await_(b.call(fetch, vec![b.var(&n)]));
    let computation = b.computation("twice", vec![n.clone()], Block::of(b.mul(awaited, b.int(2))));

    let automaton = fixture.lower(&computation);
    let expected = "\
automaton twice(n: Int) -> Int {
  ; slots: await$tmp$await$0$1: Int
  state 0:
    suspend await#0 fetch(n) -> await$tmp$await$0$1, resume 1
  state 1:
    complete await$tmp$await$0$1 * 2
}
";
    assert_eq!(automaton.machine().pretty_print(), expected);
}
