//! Intermediate representation.
//!
//! An SSA-form graph organized as module → function → basic block →
//! instruction, stored in flat arenas addressed by stable ids. Values keep
//! explicit use-lists so passes can rewrite users without rescanning the
//! module.

mod types;
pub use types::*;

mod module;
pub use module::{
    BasicBlock, Function, GlobalVar, Instruction, Module, Use, ValueData, ValueKind,
};

mod builder;
pub use builder::FunctionBuilder;
