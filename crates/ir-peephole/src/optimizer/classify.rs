//! Identity-operand classification.
//!
//! Decides whether a binary instruction is `x + 0`, `0 + x`, `x * 1` or
//! `1 * x`, and which operand survives if it is. Classification is pure: it
//! only reads opcodes and operand values.

use crate::ir::{InstId, Module, Opcode, ValueId};

/// The identity element folded for `opcode`, if any.
pub fn identity_for(opcode: Opcode) -> Option<i64> {
    match opcode {
        Opcode::Add => Some(0),
        Opcode::Mul => Some(1),
        _ => None,
    }
}

/// `true` when `value` is an integer constant no wider than `max_bits`
/// whose sign-extended value equals `identity`.
fn is_identity(module: &Module, value: ValueId, identity: i64, max_bits: u32) -> bool {
    module
        .value(value)
        .as_const_int()
        .is_some_and(|c| c.bit_width() <= max_bits && c.sext_value() == identity)
}

/// Index of the operand that replaces `inst` when the other operand is the
/// identity element of its opcode.
///
/// Operand 0 is tested first; operand 1 is only tested when operand 0 does
/// not match. So for `add i32 0, 0` the survivor is operand 1.
pub fn surviving_operand(module: &Module, inst: InstId, max_bits: u32) -> Option<usize> {
    let inst = module.inst(inst);
    let identity = identity_for(inst.opcode)?;
    if inst.num_operands() != 2 {
        return None;
    }
    if is_identity(module, inst.operand(0), identity, max_bits) {
        Some(1)
    } else if is_identity(module, inst.operand(1), identity, max_bits) {
        Some(0)
    } else {
        None
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────
