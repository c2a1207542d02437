//! Runtime for quad bytecode

pub mod runtime;

pub use runtime::machine::{
    Config, ExecutionResult, State, VM, VmError, WritePolicy, execute, run,
};
