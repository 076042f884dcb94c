//! Structural checks on a built state machine

use super::{StateId, StateMachine, Transition};
use crate::anf::{Op, Selector};
use crate::ast::{Binding, Expr, Pattern, Symbol, SymbolId, Visitor};
use crate::fresh::is_reserved;
use rustc_hash::FxHashSet;

impl StateMachine {
    /// Validate the state machine structure
    pub fn validate(&self) -> Result<(), String> {
        if self.states.is_empty() {
            return Err(format!("Automaton {} has no states", self.name));
        }

        for (index, state) in self.states.iter().enumerate() {
            if state.id.index() != index {
                return Err(format!("State {} is stored at position {}", state.id, index));
            }
            if let Transition::Branch { targets, .. } = &state.exit {
                if targets.is_empty() {
                    return Err(format!("State {} branches to no arm", state.id));
                }
            }
            for succ in state.exit.successors() {
                if self.state(succ).is_none() {
                    return Err(format!(
                        "State {} references non-existent state {}",
                        state.id, succ
                    ));
                }
            }
            if let Transition::Suspend { point, .. } = &state.exit {
                if !self.liveness.is_promoted(point.binding.id()) {
                    return Err(format!(
                        "Result of {} in state {} is not stored in a slot",
                        point.id, state.id
                    ));
                }
            }
        }

        let mut names = FxHashSet::default();
        for slot in self.slots() {
            if is_reserved(slot.name()) || !names.insert(slot.name()) {
                return Err(format!("Slot name {} is reserved or duplicated", slot.name()));
            }
        }

        for state in &self.states {
            self.check_locals(state.id)?;
        }
        Ok(())
    }

    /// Every local read in a state must follow its definition in that state
    fn check_locals(&self, id: StateId) -> Result<(), String> {
        let Some(state) = self.state(id) else {
            return Ok(());
        };
        let mut defined: FxHashSet<SymbolId> = FxHashSet::default();
        if id == StateId::ENTRY {
            defined.extend(self.params.iter().map(Binding::id));
        }

        for op in &state.ops {
            match op {
                Op::Let { binding, init } => {
                    if let Some(init) = init {
                        self.check_reads(id, init, &defined)?;
                    }
                    defined.insert(binding.id());
                }
                Op::Assign { target, value } => {
                    self.check_reads(id, value, &defined)?;
                    self.check_local(id, target, &defined)?;
                }
                Op::Eval(expr) => self.check_reads(id, expr, &defined)?,
            }
        }

        match &state.exit {
            Transition::Goto(_) => Ok(()),
            Transition::Suspend { point, .. } => self.check_reads(id, &point.future, &defined),
            Transition::Complete(result) => self.check_reads(id, result, &defined),
            Transition::Branch { selector, .. } => match selector {
                Selector::If { cond } => self.check_reads(id, cond, &defined),
                Selector::Match { scrutinee, cases } => {
                    self.check_reads(id, scrutinee, &defined)?;
                    for case in cases {
                        let mut scope = defined.clone();
                        if let Pattern::Bind(binding) = &case.pattern {
                            scope.insert(binding.id());
                        }
                        if let Some(guard) = &case.guard {
                            self.check_reads(id, guard, &scope)?;
                        }
                    }
                    Ok(())
                }
            },
        }
    }

    fn check_reads(
        &self,
        id: StateId,
        expr: &Expr,
        defined: &FxHashSet<SymbolId>,
    ) -> Result<(), String> {
        let mut reads = Reads::default();
        reads.visit_expr(expr);
        for symbol in &reads.symbols {
            if !reads.introduced.contains(&symbol.id) {
                self.check_local(id, symbol, defined)?;
            }
        }
        Ok(())
    }

    fn check_local(
        &self,
        id: StateId,
        symbol: &Symbol,
        defined: &FxHashSet<SymbolId>,
    ) -> Result<(), String> {
        if self.liveness.is_promoted(symbol.id) || defined.contains(&symbol.id) {
            Ok(())
        } else {
            Err(format!(
                "State {} uses local {} before its definition",
                id, symbol.name
            ))
        }
    }
}

#[derive(Default)]
struct Reads {
    symbols: Vec<Symbol>,
    introduced: FxHashSet<SymbolId>,
}

impl Visitor for Reads {
    fn visit_binding(&mut self, binding: &Binding) {
        self.introduced.insert(binding.id());
    }

    fn visit_symbol(&mut self, symbol: &Symbol) {
        self.symbols.push(symbol.clone());
    }
}
