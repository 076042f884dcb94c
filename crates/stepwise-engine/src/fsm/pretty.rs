//! Pretty-printing for state machines
//!
//! Provides human-readable output for debugging the lowering.

use super::{State, StateMachine, Transition};
use std::fmt::Write;

/// Trait for pretty-printing lowered constructs
pub trait PrettyPrint {
    fn pretty_print(&self) -> String;
}

impl PrettyPrint for StateMachine {
    fn pretty_print(&self) -> String {
        let mut output = String::new();

        let params: Vec<String> = self.params.iter().map(|p| format!("{}", p)).collect();
        writeln!(
            output,
            "automaton {}({}) -> {} {{",
            self.name,
            params.join(", "),
            self.result_ty
        )
        .unwrap();

        if !self.slots().is_empty() {
            let slots: Vec<String> = self.slots().iter().map(|s| format!("{}", s)).collect();
            writeln!(output, "  ; slots: {}", slots.join(", ")).unwrap();
        }

        for state in &self.states {
            output.push_str(&state.pretty_print());
        }

        writeln!(output, "}}").unwrap();
        output
    }
}

impl PrettyPrint for State {
    fn pretty_print(&self) -> String {
        let mut output = String::new();
        writeln!(output, "  state {}:", self.id).unwrap();
        for op in &self.ops {
            writeln!(output, "    {}", op).unwrap();
        }
        writeln!(output, "    {}", self.exit).unwrap();
        output
    }
}

impl std::fmt::Display for Transition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Transition::Goto(next) => write!(f, "goto {}", next),
            Transition::Suspend { point, resume } => write!(
                f,
                "suspend {} {} -> {}, resume {}",
                point.id, point.future, point.binding.symbol, resume
            ),
            Transition::Branch { selector, targets } => {
                let targets: Vec<String> = targets.iter().map(|t| t.to_string()).collect();
                write!(f, "branch {} -> [{}]", selector, targets.join(", "))
            }
            Transition::Complete(result) => write!(f, "complete {}", result),
        }
    }
}
