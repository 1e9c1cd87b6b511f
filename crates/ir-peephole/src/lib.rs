//! ir-peephole — identity arithmetic elimination for a textual SSA IR.
//!
//! Reads an LLVM-assembly-like module, removes `add x, 0` and `mul x, 1`
//! by forwarding `x` to every user, and prints the result. A read-only
//! analysis reports how often each function is called.

pub mod analysis;
pub mod ir;
pub mod optimizer;
pub mod parser;
pub mod printer;

// Re-export key types for convenience
pub use anyhow::{Context, Result};
use log::debug;
use optimizer::PassStats;

/// Configuration options for the peephole pipeline.
#[derive(Debug, Clone)]
pub struct PeepholeOptions {
    /// Widest integer constant (in bits) recognised as an identity element.
    pub max_identity_bits: u32,
    /// Check def-use integrity before and after the pass.
    pub verify: bool,
}

impl Default for PeepholeOptions {
    fn default() -> Self {
        Self {
            max_identity_bits: 32,
            verify: false,
        }
    }
}

/// Simplify a module given as text and return the printed result along
/// with what changed.
///
/// # Example
/// ```
/// use ir_peephole::{simplify_source, PeepholeOptions};
///
/// let src = "define i32 @f(i32 %x) {\n  %1 = add i32 %x, 0\n  ret i32 %1\n}\n";
/// let (out, stats) = simplify_source(src, &PeepholeOptions::default()).unwrap();
/// assert_eq!(stats.eliminated, 1);
/// assert!(out.contains("ret i32 %x"));
/// ```
pub fn simplify_source(source: &str, options: &PeepholeOptions) -> Result<(String, PassStats)> {
    let mut module = parser::parse_module(source).context("failed to parse module")?;
    debug!(
        "parsed module '{}': {} function(s), {} instruction(s)",
        module.name,
        module.num_functions(),
        module.inst_count()
    );

    let stats = optimizer::optimize_module(&mut module, options)?;

    Ok((printer::print_module(&module), stats))
}

/// Count call sites in a module given as text and return the report lines.
pub fn count_calls_in_source(source: &str) -> Result<Vec<String>> {
    let module = parser::parse_module(source).context("failed to parse module")?;
    let counts = analysis::count_calls(&module);
    debug!(
        "module '{}': {} call site(s), {} indirect",
        module.name,
        counts.total(),
        counts.indirect
    );
    Ok(counts.report_lines(&module.name))
}
