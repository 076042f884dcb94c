//! Stepwise Lowering Engine
//!
//! Lowers a direct-style computation containing `await` expressions into a
//! callback-driven state machine executed by an external asynchronous
//! runtime:
//! - **Analysis**: rejects suspension points in unsupported positions (`analysis`)
//! - **Normalization**: hoists suspension into statement position (`anf`)
//! - **Liveness**: promotes bindings that outlive a state (`liveness`)
//! - **State machines**: partitioning, verification and emission (`fsm`)
//! - **Evaluation**: the reference interpreter states run on (`interp`)
//!
//! # Example
//!
//! ```rust,ignore
//! use stepwise_engine::{Lowering, TreeBuilder, Type};
//!
//! let mut b = TreeBuilder::new();
//! let fetch = b.global("fetch", Type::function(vec![], Type::future(Type::Int)));
//! let awaited = b.await_(b.call(fetch, vec![]));
//! let body = Block::of(b.add(awaited, b.int(1)));
//! let computation = b.computation("plus_one", vec![], body);
//!
//! let lowering = Lowering::new(runtime, Arc::new(globals));
//! let automaton = lowering.lower(&computation)?;
//! let result = automaton.invoke(vec![])?;
//! ```

#![warn(rust_2018_idioms)]

/// Computation tree, construction API and traversal
pub mod ast;

/// Await usage validation
pub mod analysis;

/// Administrative normal form
pub mod anf;

/// Lowering errors
pub mod error;

/// Fresh name generation
pub mod fresh;

/// State machines and automata
pub mod fsm;

/// Future-system abstraction
pub mod future_system;

/// Tree-walking evaluation
pub mod interp;

/// Cross-state liveness
pub mod liveness;

/// Lowering options
pub mod options;

/// Lowering pipeline
pub mod pipeline;

pub use analysis::{AwaitContext, Diagnostic};
pub use ast::{Block, Computation, TreeBuilder, Type};
pub use error::{LowerError, LowerResult};
pub use fsm::{Automaton, PrettyPrint, StateId, StateMachine, Transition};
pub use future_system::{
    Callback, CompletionError, ContextId, FutureId, FutureSystem, Outcome, PromiseId, Thunk,
};
pub use interp::{evaluate_direct, Failure, Globals, Invoker, Value};
pub use liveness::{Liveness, Storage};
pub use options::LowerOptions;
pub use pipeline::{compile, Lowering};
