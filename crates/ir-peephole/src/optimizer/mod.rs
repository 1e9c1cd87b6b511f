//! IR peephole passes.
//!
//! Each pass is a self-contained sub-module working on one function at a
//! time. The top-level [`optimize_module`] runs them over every function
//! in declaration order.

use crate::ir::Module;
use crate::PeepholeOptions;
use anyhow::{Context, Result};
use log::info;

pub mod classify;

// ── Passes ───────────────────────────────────────────────────────────────────
pub mod identity_elim;

/// What a run of [`optimize_module`] changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassStats {
    /// Function definitions visited (declarations are skipped).
    pub functions: usize,
    /// Instructions erased by identity elimination.
    pub eliminated: usize,
}

/// Run all passes over `module`.
///
/// With `options.verify` set, the module is checked before and after; a
/// failed check is reported as an error.
pub fn optimize_module(module: &mut Module, options: &PeepholeOptions) -> Result<PassStats> {
    if options.verify {
        module.verify().context("module is malformed before optimization")?;
    }

    let mut stats = PassStats::default();
    let funcs: Vec<_> = module.func_ids().collect();
    for func in funcs {
        if module.function(func).is_declaration() {
            continue;
        }
        stats.functions += 1;
        stats.eliminated += identity_elim::eliminate(module, func, options.max_identity_bits);
    }

    if options.verify {
        module.verify().context("module is malformed after optimization")?;
    }
    info!(
        "eliminated {} instruction(s) across {} function(s)",
        stats.eliminated, stats.functions
    );
    Ok(stats)
}

// ── optimize_module integration tests ────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{FunctionBuilder, Opcode, Type};

    /// `f(x) = (x + 0) * 3`, plus an external declaration.
    fn sample_module() -> Module {
        let mut m = Module::new("sample");
        m.add_function("ext", Type::I32, &[Type::I32]);
        for name in ["f", "g"] {
            let f = m.add_function(name, Type::I32, &[Type::I32]);
            let mut b = FunctionBuilder::new(&mut m, f);
            b.block(None);
            let x = b.param(0);
            let zero = b.const_int(Type::I32, 0);
            let three = b.const_int(Type::I32, 3);
            let sum = b.add(x, zero);
            let prod = b.mul(sum, three);
            b.ret(Some(prod));
        }
        m
    }

    #[test]
    fn optimize_module_runs_over_every_definition() {
        let mut m = sample_module();
        let before = m.inst_count();
        let stats = optimize_module(&mut m, &PeepholeOptions::default()).unwrap();
        assert_eq!(
            stats,
            PassStats {
                functions: 2,
                eliminated: 2
            }
        );
        assert_eq!(m.inst_count(), before - 2);
        for name in ["f", "g"] {
            let f = m.find_function(name).unwrap();
            let entry = m.function(f).blocks()[0];
            let first = m.block(entry).insts()[0];
            assert_eq!(m.inst(first).opcode, Opcode::Mul);
            assert_eq!(m.inst(first).operand(0), m.function(f).params()[0]);
        }
    }

    #[test]
    fn max_identity_bits_bounds_matching() {
        let mut m = sample_module();
        let options = PeepholeOptions {
            max_identity_bits: 16,
            verify: true,
        };
        let stats = optimize_module(&mut m, &options).unwrap();
        assert_eq!(stats.eliminated, 0);
    }

    #[test]
    fn verify_reports_malformed_input() {
        let mut m = Module::new("bad");
        let f = m.add_function("f", Type::Void, &[]);
        m.add_block(f, None);
        let options = PeepholeOptions {
            verify: true,
            ..Default::default()
        };
        let err = optimize_module(&mut m, &options).unwrap_err();
        assert!(format!("{err:#}").contains("before optimization"), "{err:#}");
    }
}
