//! Fresh name generation
//!
//! The generator is a plain value threaded through the passes and handed
//! back with each pass's result, so there is no ambient symbol table.

use crate::ast::{Binding, Computation, Symbol, SymbolId, Type, Visitor};

/// Names used by the automaton itself; no binding may be renamed to one
pub const RESERVED_NAMES: &[&str] = &["state", "slots", "result", "context", "resume", "on_complete"];

/// Monotonic generator of symbol identities and printable names
#[derive(Debug, Clone)]
pub struct FreshNames {
    prefix: String,
    next_symbol: u32,
    counter: u32,
}

impl FreshNames {
    /// Create a generator whose identities start at `first_symbol`
    pub fn new(prefix: impl Into<String>, first_symbol: u32) -> Self {
        Self {
            prefix: prefix.into(),
            next_symbol: first_symbol,
            counter: 0,
        }
    }

    /// Create a generator that never reuses an identity found in `computation`
    pub fn for_computation(computation: &Computation, prefix: impl Into<String>) -> Self {
        let mut scan = MaxSymbol { max: None };
        for param in &computation.params {
            scan.visit_binding(param);
        }
        scan.visit_block(&computation.body);
        let first = scan.max.map_or(0, |id| id.as_u32() + 1);
        Self::new(prefix, first)
    }

    /// Generate a printable name `<prefix><hint>$<n>`
    pub fn name_with(&mut self, prefix: &str, hint: &str) -> String {
        let n = self.counter;
        self.counter += 1;
        format!("{}{}${}", prefix, hint, n)
    }

    /// Generate a printable name using the generator's own prefix
    pub fn name(&mut self, hint: &str) -> String {
        let prefix = self.prefix.clone();
        self.name_with(&prefix, hint)
    }

    /// Generate a new binding with a fresh identity and name
    pub fn binding(&mut self, hint: &str, ty: Type, mutable: bool) -> Binding {
        let id = SymbolId::new(self.next_symbol);
        self.next_symbol += 1;
        let name = self.name(hint);
        Binding::new(Symbol::new(id, name), ty, mutable)
    }

    /// Number of names handed out so far
    pub fn issued(&self) -> u32 {
        self.counter
    }
}

/// Check if a name is used by the automaton itself
pub fn is_reserved(name: &str) -> bool {
    RESERVED_NAMES.contains(&name)
}

struct MaxSymbol {
    max: Option<SymbolId>,
}

impl MaxSymbol {
    fn record(&mut self, id: SymbolId) {
        if self.max.map_or(true, |max| id > max) {
            self.max = Some(id);
        }
    }
}

impl Visitor for MaxSymbol {
    fn visit_binding(&mut self, binding: &Binding) {
        self.record(binding.id());
    }

    fn visit_symbol(&mut self, symbol: &Symbol) {
        self.record(symbol.id);
    }
}
