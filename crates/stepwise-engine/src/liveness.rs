//! Cross-state liveness
//!
//! A binding whose value must survive a suspension cannot live in the
//! locals of one state activation. This pass records, with the builder's
//! state numbering, where every binding is defined and where it is used,
//! and promotes each binding used outside its defining state to an
//! automaton storage slot. Promoted bindings are renamed so the emitted
//! automaton never confuses them with its own fields.

use crate::anf::{AwaitPoint, Branch, Normalized, Op, Selector};
use crate::ast::rename::Renames;
use crate::ast::{Binding, Expr, Symbol, SymbolId, Visitor};
use crate::error::{LowerError, LowerResult};
use crate::fresh::{is_reserved, FreshNames};
use crate::fsm::walk::{walk_states, StateVisitor};
use crate::fsm::{SlotId, StateId};
use crate::options::LowerOptions;
use rustc_hash::{FxHashMap, FxHashSet};

/// Where a binding lives at run time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Storage {
    /// In the locals of a single state activation
    Local,
    /// In an automaton storage slot
    Promoted(SlotId),
}

/// Storage classification of every binding in a computation
#[derive(Debug, Clone, Default)]
pub struct Liveness {
    storage: FxHashMap<SymbolId, Storage>,
    /// Renamed promoted bindings, in slot order
    promoted: Vec<Binding>,
}

impl Liveness {
    /// Storage of a binding; bindings never seen are local
    pub fn storage(&self, id: SymbolId) -> Storage {
        self.storage.get(&id).copied().unwrap_or(Storage::Local)
    }

    pub fn slot(&self, id: SymbolId) -> Option<SlotId> {
        match self.storage(id) {
            Storage::Promoted(slot) => Some(slot),
            Storage::Local => None,
        }
    }

    pub fn is_promoted(&self, id: SymbolId) -> bool {
        self.slot(id).is_some()
    }

    pub fn promoted(&self) -> &[Binding] {
        &self.promoted
    }
}

/// Where a binding receives its value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DefSite {
    State(StateId),
    /// Written by the completion callback of a suspension point
    Callback,
}

/// Classify and rename the bindings of a normalized computation
pub fn analyze(
    normalized: Normalized,
    params: &[Binding],
    mut names: FreshNames,
    options: &LowerOptions,
) -> LowerResult<(Liveness, Normalized, FreshNames)> {
    let mut sites = Sites::default();
    for param in params {
        sites.define(param, DefSite::State(StateId::ENTRY));
    }
    walk_states(&normalized, &mut sites)?;

    let mut promoted: Vec<&Binding> = Vec::new();
    for id in &sites.order {
        let (binding, def) = &sites.defs[id];
        let uses = sites.uses.get(id).map(Vec::as_slice).unwrap_or(&[]);
        let escapes = match def {
            DefSite::Callback => true,
            DefSite::State(state) => uses.iter().any(|used| used != state),
        };
        if escapes {
            promoted.push(binding);
        }
    }
    for (id, uses) in &sites.uses {
        if !sites.defs.contains_key(id) {
            let state = uses.first().copied().unwrap_or(StateId::ENTRY);
            return Err(LowerError::internal(format!(
                "symbol {} used in state {} has no definition",
                id, state
            )));
        }
    }
    promoted.sort_by_key(|binding| binding.id());

    let mut renames = Renames::new();
    let mut liveness = Liveness::default();
    let mut taken = FxHashSet::default();
    for (index, binding) in promoted.into_iter().enumerate() {
        let name = names.name_with(&options.promoted_prefix, binding.name());
        if is_reserved(&name) || !taken.insert(name.clone()) {
            return Err(LowerError::internal(format!(
                "promoted name {} collides with another name",
                name
            )));
        }
        let slot = SlotId::new(index as u32);
        renames.insert(binding.id(), name);
        liveness.storage.insert(binding.id(), Storage::Promoted(slot));
        liveness.promoted.push(renames.binding(binding));
    }

    let normalized = normalized.renamed(&renames);
    Ok((liveness, normalized, names))
}

#[derive(Default)]
struct Sites {
    defs: FxHashMap<SymbolId, (Binding, DefSite)>,
    /// Definition order, so classification does not depend on hashing
    order: Vec<SymbolId>,
    uses: FxHashMap<SymbolId, Vec<StateId>>,
}

impl Sites {
    fn define(&mut self, binding: &Binding, site: DefSite) {
        if !self.defs.contains_key(&binding.id()) {
            self.order.push(binding.id());
            self.defs.insert(binding.id(), (binding.clone(), site));
        }
    }

    fn used(&mut self, symbol: &Symbol, state: StateId) {
        self.uses.entry(symbol.id).or_default().push(state);
    }

    /// Record every binding and reference inside an await-free expression.
    /// Bindings introduced inside it (nested lets, closure parameters) live
    /// and die within the same state.
    fn expr(&mut self, expr: &Expr, state: StateId) {
        let mut scan = ExprSites { sites: self, state };
        scan.visit_expr(expr);
    }
}

struct ExprSites<'s> {
    sites: &'s mut Sites,
    state: StateId,
}

impl Visitor for ExprSites<'_> {
    fn visit_binding(&mut self, binding: &Binding) {
        self.sites.define(binding, DefSite::State(self.state));
    }

    fn visit_symbol(&mut self, symbol: &Symbol) {
        self.sites.used(symbol, self.state);
    }
}

impl StateVisitor for Sites {
    fn op(&mut self, state: StateId, op: &Op) -> LowerResult<()> {
        match op {
            Op::Let { binding, init } => {
                if let Some(init) = init {
                    self.expr(init, state);
                }
                self.define(binding, DefSite::State(state));
            }
            Op::Assign { target, value } => {
                self.expr(value, state);
                self.used(target, state);
            }
            Op::Eval(expr) => self.expr(expr, state),
        }
        Ok(())
    }

    fn suspend(&mut self, state: StateId, point: &AwaitPoint, _resume: StateId) -> LowerResult<()> {
        self.expr(&point.future, state);
        self.define(&point.binding, DefSite::Callback);
        Ok(())
    }

    fn branch(&mut self, state: StateId, branch: &Branch, _targets: &[StateId]) -> LowerResult<()> {
        match &branch.selector {
            Selector::If { cond } => self.expr(cond, state),
            Selector::Match { scrutinee, cases } => {
                self.expr(scrutinee, state);
                for case in cases {
                    ExprSites { sites: self, state }.visit_pattern(&case.pattern);
                    if let Some(guard) = &case.guard {
                        self.expr(guard, state);
                    }
                }
            }
        }
        Ok(())
    }

    fn goto(&mut self, _state: StateId, _next: StateId) -> LowerResult<()> {
        Ok(())
    }

    fn complete(&mut self, state: StateId, result: &Expr) -> LowerResult<()> {
        self.expr(result, state);
        Ok(())
    }
}
