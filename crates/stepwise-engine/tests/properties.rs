//! Property tests: lowered automata agree with direct evaluation, and
//! storage classification depends only on where bindings are used.

#[path = "e2e/harness.rs"]
#[allow(dead_code)]
mod harness;

use harness::Fixture;
use proptest::prelude::*;
use stepwise_engine::ast::{Binding, Block, Computation, Expr};
use stepwise_engine::{compile, LowerOptions, Storage, Transition, TreeBuilder, Type, Value};

// ============================================================================
// Arbitrary Programs
// ============================================================================

/// One `let` of a straight-line program; operands index earlier bindings
#[derive(Debug, Clone)]
enum Step {
    Const(i64),
    Add(usize, usize),
    Await(usize),
    AddAwait(usize, usize),
    Choose { lhs: usize, rhs: usize, offset: i64 },
}

fn arb_step(branches: bool) -> BoxedStrategy<Step> {
    let plain = prop_oneof![
        (-100i64..100).prop_map(Step::Const),
        (any::<usize>(), any::<usize>()).prop_map(|(a, b)| Step::Add(a, b)),
        any::<usize>().prop_map(Step::Await),
        (any::<usize>(), any::<usize>()).prop_map(|(a, b)| Step::AddAwait(a, b)),
    ];
    if branches {
        prop_oneof![
            3 => plain,
            1 => (any::<usize>(), any::<usize>(), -5i64..5)
                .prop_map(|(lhs, rhs, offset)| Step::Choose { lhs, rhs, offset }),
        ]
        .boxed()
    } else {
        plain.boxed()
    }
}

fn arb_program(branches: bool) -> impl Strategy<Value = (i64, Vec<Step>)> {
    (-20i64..20, prop::collection::vec(arb_step(branches), 0..8))
}

/// Build a computation of parameter `p` plus the steps, returning the sum of
/// every binding, along with the number of awaits outside branches
fn build(steps: &[Step]) -> (Computation, usize) {
    let mut b = TreeBuilder::new();
    let fetch = b.global(
        "fetch",
        Type::function(vec![Type::Int], Type::future(Type::Int)),
    );
    let p = b.binding("p", Type::Int);
    let mut bound: Vec<Binding> = vec![p.clone()];
    let mut stmts = Vec::new();
    let mut awaits = 0;

    for step in steps {
        let pick = |i: &usize| bound[i % bound.len()].clone();
        let init: Expr = match step {
            Step::Const(c) => b.int(*c),
            Step::Add(x, y) => b.add(b.var(&pick(x)), b.var(&pick(y))),
            Step::Await(x) => {
                awaits += 1;
                let call = b.call(fetch.clone(), vec![b.var(&pick(x))]);
                b.await_(call)
            }
            Step::AddAwait(x, y) => {
                awaits += 1;
                let lhs = b.var(&pick(x));
                let call = b.call(fetch.clone(), vec![b.var(&pick(y))]);
                let awaited = b.await_(call);
                b.add(lhs, awaited)
            }
            Step::Choose { lhs, rhs, offset } => {
                let (lhs, rhs) = (pick(lhs), pick(rhs));
                let call = b.call(fetch.clone(), vec![b.var(&lhs)]);
                let awaited = b.await_(call);
                b.if_(
                    b.lt(b.var(&lhs), b.var(&rhs)),
                    Block::of(awaited),
                    Block::of(b.add(b.var(&rhs), b.int(*offset))),
                )
            }
        };
        let binding = b.binding(&format!("v{}", bound.len()), Type::Int);
        stmts.push(b.let_(&binding, init));
        bound.push(binding);
    }

    let sum = bound
        .iter()
        .fold(b.int(0), |acc, binding| b.add(acc, b.var(binding)));
    let computation = b.computation("generated", vec![p], b.block(stmts, sum));
    (computation, awaits)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn lowered_run_matches_direct_evaluation((seed, steps) in arb_program(true)) {
        let fixture = Fixture::new();
        let (computation, _) = build(&steps);
        let automaton = fixture.lower(&computation);
        let lowered = fixture.run(&automaton, vec![Value::Int(seed)]);
        let direct = fixture.direct(&computation, vec![Value::Int(seed)]);
        prop_assert_eq!(lowered, direct);
    }

    #[test]
    fn straight_line_has_one_state_per_await((_seed, steps) in arb_program(false)) {
        let (computation, awaits) = build(&steps);
        let machine = compile(&computation, &LowerOptions::default()).unwrap();
        prop_assert_eq!(machine.state_count(), awaits + 1);
        let completes = machine
            .states
            .iter()
            .filter(|s| matches!(s.exit, Transition::Complete(_)))
            .count();
        prop_assert_eq!(completes, 1);
    }

    #[test]
    fn classification_ignores_sibling_order(
        first in -50i64..50,
        second in -50i64..50,
        first_used_later in any::<bool>(),
        second_used_later in any::<bool>(),
    ) {
        let classify = |swap: bool| {
            let mut b = TreeBuilder::new();
            let a = b.binding("a", Type::Int);
            let c = b.binding("c", Type::Int);
            let flag = b.global("flag", Type::future(Type::Int));
            let awaited = b.await_(flag);
            let mut lets = vec![b.let_(&a, b.int(first)), b.let_(&c, b.int(second))];
            if swap {
                lets.reverse();
            }
            // each binding is read either before or after the await
            let mut before = b.int(0);
            let mut after = awaited;
            for (binding, later) in [(&a, first_used_later), (&c, second_used_later)] {
                if later {
                    after = b.add(after, b.var(binding));
                } else {
                    before = b.add(before, b.var(binding));
                }
            }
            let t = b.binding("t", Type::Int);
            lets.push(b.let_(&t, before));
            let body = b.block(lets, b.add(after, b.var(&t)));
            let machine = compile(&b.computation("siblings", vec![], body), &LowerOptions::default())
                .unwrap();
            let promoted = |s: Storage| matches!(s, Storage::Promoted(_));
            (
                promoted(machine.storage_of(a.id())),
                promoted(machine.storage_of(c.id())),
            )
        };

        let (a, c) = classify(false);
        prop_assert_eq!((a, c), classify(true));
        prop_assert_eq!(a, first_used_later);
        prop_assert_eq!(c, second_used_later);
    }
}
