//! Lowering pipeline
//!
//! Runs the passes in order (usage check, normalization, liveness, state
//! partitioning) and emits the automaton. A usage error stops the pipeline
//! before anything is normalized.

use crate::analysis;
use crate::anf::normalize;
use crate::ast::Computation;
use crate::error::{LowerError, LowerResult};
use crate::fresh::FreshNames;
use crate::fsm::{build, emit, Automaton, StateMachine};
use crate::future_system::FutureSystem;
use crate::interp::Globals;
use crate::liveness::analyze;
use crate::options::LowerOptions;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// Lower a computation to its state machine without binding a runtime
pub fn compile(computation: &Computation, options: &LowerOptions) -> LowerResult<StateMachine> {
    if let Err(diagnostics) = analysis::check(computation) {
        warn!(
            computation = %computation.name,
            count = diagnostics.len(),
            "rejected unsupported await usage"
        );
        return Err(LowerError::Usage(diagnostics));
    }

    let names = FreshNames::for_computation(computation, options.temp_prefix.as_str());
    let (normalized, names) = normalize(computation, names)?;
    debug!(
        statements = normalized.stmts.len(),
        awaits = normalized.await_count(),
        branches = normalized.branch_count(),
        "normalized"
    );

    let params = normalized.params.clone();
    let (liveness, normalized, names) = analyze(normalized, &params, names, options)?;
    debug!(
        promoted = liveness.promoted().len(),
        fresh_names = names.issued(),
        "classified bindings"
    );

    let machine = build(&normalized, &liveness)?;
    debug!(states = machine.state_count(), "built state machine");

    if options.verify {
        machine.validate().map_err(LowerError::internal)?;
    }
    Ok(machine)
}

/// Lowers computations into automata bound to one future system
pub struct Lowering {
    options: LowerOptions,
    system: Arc<dyn FutureSystem>,
    globals: Arc<Globals>,
}

impl Lowering {
    pub fn new(system: Arc<dyn FutureSystem>, globals: Arc<Globals>) -> Self {
        Self::with_options(system, globals, LowerOptions::default())
    }

    pub fn with_options(
        system: Arc<dyn FutureSystem>,
        globals: Arc<Globals>,
        options: LowerOptions,
    ) -> Self {
        Self {
            options,
            system,
            globals,
        }
    }

    pub fn options(&self) -> &LowerOptions {
        &self.options
    }

    /// Lower and emit a computation
    #[instrument(skip_all, fields(computation = %computation.name))]
    pub fn lower(&self, computation: &Computation) -> LowerResult<Automaton> {
        let machine = compile(computation, &self.options)?;
        Ok(emit(machine, self.system.clone(), self.globals.clone()))
    }
}
