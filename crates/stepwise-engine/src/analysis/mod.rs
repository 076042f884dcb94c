//! Pre-lowering analyses

pub mod await_usage;

pub use await_usage::{check, AwaitContext, Diagnostic};
