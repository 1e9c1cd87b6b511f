//! Identity arithmetic elimination.
//!
//! Removes `add x, 0` and `mul x, 1` (either operand order) by redirecting
//! every use of the result to the surviving operand `x`.
//!
//! ## Algorithm
//!
//! For each block in layout order:
//!
//! 1. Walk the instructions by position. For each match found by
//!    [`surviving_operand`], rewrite all uses of the result module-wide with
//!    [`Module::replace_all_uses_with`] and queue the instruction.
//! 2. Once the walk has finished, erase the queued instructions with one
//!    [`Module::erase_insts`] call, which rebuilds the block sequence once.
//!
//! Nothing is removed from a block while it is being walked. Later
//! instructions see the rewritten operands, so chains such as
//! `%b = add (add %x, 0), 0` collapse in a single sweep.

use super::classify::surviving_operand;
use crate::ir::{BlockId, FuncId, InstId, Module};
use log::{debug, trace};

/// Eliminate identity arithmetic in `func`. Returns the number of erased
/// instructions.
pub fn eliminate(module: &mut Module, func: FuncId, max_bits: u32) -> usize {
    let blocks = module.function(func).blocks().to_vec();
    let mut eliminated = 0;

    for bb in blocks {
        let doomed = scan_block(module, func, bb, max_bits);
        trace!(
            "@{}: {} matched {} of {} instruction(s)",
            module.function(func).name,
            bb,
            doomed.len(),
            module.block(bb).len()
        );
        module.erase_insts(bb, &doomed);
        eliminated += doomed.len();
    }
    eliminated
}

// ── Block scan ───────────────────────────────────────────────────────────────

/// Classify and rewrite every instruction of `bb`; returns the matched ones
/// in program order. The block itself is left untouched.
fn scan_block(module: &mut Module, func: FuncId, bb: BlockId, max_bits: u32) -> Vec<InstId> {
    let mut doomed = Vec::new();
    for pos in 0..module.block(bb).len() {
        let id = module.block(bb).insts()[pos];
        let Some(keep) = surviving_operand(module, id, max_bits) else {
            continue;
        };
        let inst = module.inst(id);
        let (result, survivor) = (inst.result(), inst.operand(keep));
        if survivor == result {
            // `%a = add %a, 0` can only sit in unreachable code; erasing it
            // would leave its own operand dangling.
            debug!("@{}: keeping self-referential {}", module.function(func).name, id);
            continue;
        }
        let rewritten = module.replace_all_uses_with(result, survivor);
        debug!(
            "@{}: {} `{}` folded into operand {} ({} use(s) rewritten)",
            module.function(func).name,
            id,
            module.inst(id).opcode,
            keep,
            rewritten
        );
        doomed.push(id);
    }
    doomed
}

// ── Tests ────────────────────────────────────────────────────────────────────
