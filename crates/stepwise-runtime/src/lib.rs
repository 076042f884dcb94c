//! Stepwise Queue Runtime
//!
//! A deterministic [`FutureSystem`](stepwise_engine::FutureSystem) for
//! driving automata in tests and embedding hosts:
//! - **Promise table**: promises, their outcomes and pending callbacks
//! - **Context queues**: one `crossbeam-deque` injector per execution context
//!
//! Nothing runs on its own; the host drains the queues with
//! [`QueueRuntime::run_until_idle`].

#![warn(rust_2018_idioms)]

mod queue;
mod table;

pub use queue::QueueRuntime;
