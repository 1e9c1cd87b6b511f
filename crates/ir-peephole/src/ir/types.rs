//! IR type definitions.
//!
//! Identifiers, value types, integer constants and the closed opcode set
//! shared by the module arena, the text reader/printer and the passes.

use std::fmt;

/// Unique identifier for a value in the module arena.
/// Constants, arguments, function references and instruction results are all values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ValueId(pub u32);

/// Unique identifier for an instruction in the module arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstId(pub u32);

/// Unique identifier for a basic block in the module arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockId(pub u32);

/// Generic index type with a phantom tag to distinguish different index spaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Idx<TAG> {
    idx: usize,
    _marker: std::marker::PhantomData<TAG>,
}

impl<TAG> Idx<TAG> {
    pub fn new(idx: usize) -> Self {
        Self {
            idx,
            _marker: std::marker::PhantomData,
        }
    }

    pub fn as_usize(&self) -> usize {
        self.idx
    }
}

/// Marker type for function indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FuncTag;

/// Index into `Module::functions` (declaration order).
pub type FuncId = Idx<FuncTag>;

/// Marker type for global variable indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GlobalTag;

/// Index into `Module::globals` (source order).
pub type GlobalId = Idx<GlobalTag>;

impl fmt::Display for ValueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

impl fmt::Display for InstId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "inst_{}", self.0)
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "block_{}", self.0)
    }
}

/// First-class value types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Type {
    Void,
    /// Integer of the given bit width (1..=64).
    Int(u32),
    /// Opaque pointer.
    Ptr,
}

impl Type {
    pub const I1: Type = Type::Int(1);
    pub const I32: Type = Type::Int(32);
    pub const I64: Type = Type::Int(64);

    pub fn is_void(&self) -> bool {
        matches!(self, Type::Void)
    }

    /// Bit width for integer types, `None` otherwise.
    pub fn int_width(&self) -> Option<u32> {
        match self {
            Type::Int(bits) => Some(*bits),
            _ => None,
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Void => write!(f, "void"),
            Type::Int(bits) => write!(f, "i{}", bits),
            Type::Ptr => write!(f, "ptr"),
        }
    }
}

/// Largest integer width the IR can hold.
pub const MAX_INT_BITS: u32 = 64;

/// Fixed-width integer constant.
///
/// The value is stored sign-extended from `bits`, so `i32 4294967295` and
/// `i32 -1` are the same constant and `i1 true` reads back as `-1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConstantInt {
    bits: u32,
    value: i64,
}

impl ConstantInt {
    /// Build a constant of width `bits`, truncating `raw` to that width and
    /// sign-extending it back.
    ///
    /// # Panics
    /// Panics if `bits` is zero or greater than [`MAX_INT_BITS`].
    pub fn new(bits: u32, raw: i64) -> Self {
        assert!(
            (1..=MAX_INT_BITS).contains(&bits),
            "unsupported integer width i{}",
            bits
        );
        let shift = MAX_INT_BITS - bits;
        Self {
            bits,
            value: (raw << shift) >> shift,
        }
    }

    pub fn bit_width(&self) -> u32 {
        self.bits
    }

    /// The value interpreted as a signed `bits`-wide integer.
    pub fn sext_value(&self) -> i64 {
        self.value
    }

    pub fn ty(&self) -> Type {
        Type::Int(self.bits)
    }
}

impl fmt::Display for ConstantInt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.bits == 1 {
            write!(f, "{}", if self.value != 0 { "true" } else { "false" })
        } else {
            write!(f, "{}", self.value)
        }
    }
}

/// Instruction opcodes. The set is closed; the reader rejects anything else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    // Integer arithmetic
    Add,
    Sub,
    Mul,
    SDiv,
    UDiv,
    SRem,
    URem,
    // Bitwise
    And,
    Or,
    Xor,
    Shl,
    LShr,
    AShr,
    // Other value-producing operations
    ICmp,
    Select,
    Phi,
    Call,
    Alloca,
    Load,
    Store,
    // Terminators
    Ret,
    Br,
    Unreachable,
}

impl Opcode {
    /// Two-operand integer arithmetic/bitwise opcodes.
    pub fn is_binary(&self) -> bool {
        matches!(
            self,
            Opcode::Add
                | Opcode::Sub
                | Opcode::Mul
                | Opcode::SDiv
                | Opcode::UDiv
                | Opcode::SRem
                | Opcode::URem
                | Opcode::And
                | Opcode::Or
                | Opcode::Xor
                | Opcode::Shl
                | Opcode::LShr
                | Opcode::AShr
        )
    }

    pub fn is_terminator(&self) -> bool {
        matches!(self, Opcode::Ret | Opcode::Br | Opcode::Unreachable)
    }

    /// Assembly mnemonic.
    pub fn mnemonic(&self) -> &'static str {
        match self {
            Opcode::Add => "add",
            Opcode::Sub => "sub",
            Opcode::Mul => "mul",
            Opcode::SDiv => "sdiv",
            Opcode::UDiv => "udiv",
            Opcode::SRem => "srem",
            Opcode::URem => "urem",
            Opcode::And => "and",
            Opcode::Or => "or",
            Opcode::Xor => "xor",
            Opcode::Shl => "shl",
            Opcode::LShr => "lshr",
            Opcode::AShr => "ashr",
            Opcode::ICmp => "icmp",
            Opcode::Select => "select",
            Opcode::Phi => "phi",
            Opcode::Call => "call",
            Opcode::Alloca => "alloca",
            Opcode::Load => "load",
            Opcode::Store => "store",
            Opcode::Ret => "ret",
            Opcode::Br => "br",
            Opcode::Unreachable => "unreachable",
        }
    }

    /// Inverse of [`Opcode::mnemonic`].
    pub fn from_mnemonic(s: &str) -> Option<Self> {
        let op = match s {
            "add" => Opcode::Add,
            "sub" => Opcode::Sub,
            "mul" => Opcode::Mul,
            "sdiv" => Opcode::SDiv,
            "udiv" => Opcode::UDiv,
            "srem" => Opcode::SRem,
            "urem" => Opcode::URem,
            "and" => Opcode::And,
            "or" => Opcode::Or,
            "xor" => Opcode::Xor,
            "shl" => Opcode::Shl,
            "lshr" => Opcode::LShr,
            "ashr" => Opcode::AShr,
            "icmp" => Opcode::ICmp,
            "select" => Opcode::Select,
            "phi" => Opcode::Phi,
            "call" => Opcode::Call,
            "alloca" => Opcode::Alloca,
            "load" => Opcode::Load,
            "store" => Opcode::Store,
            "ret" => Opcode::Ret,
            "br" => Opcode::Br,
            "unreachable" => Opcode::Unreachable,
            _ => return None,
        };
        Some(op)
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mnemonic())
    }
}

/// Integer comparison predicates for `icmp`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IntPredicate {
    Eq,
    Ne,
    Ugt,
    Uge,
    Ult,
    Ule,
    Sgt,
    Sge,
    Slt,
    Sle,
}

impl IntPredicate {
    pub fn as_str(&self) -> &'static str {
        match self {
            IntPredicate::Eq => "eq",
            IntPredicate::Ne => "ne",
            IntPredicate::Ugt => "ugt",
            IntPredicate::Uge => "uge",
            IntPredicate::Ult => "ult",
            IntPredicate::Ule => "ule",
            IntPredicate::Sgt => "sgt",
            IntPredicate::Sge => "sge",
            IntPredicate::Slt => "slt",
            IntPredicate::Sle => "sle",
        }
    }

    pub fn from_name(s: &str) -> Option<Self> {
        let pred = match s {
            "eq" => IntPredicate::Eq,
            "ne" => IntPredicate::Ne,
            "ugt" => IntPredicate::Ugt,
            "uge" => IntPredicate::Uge,
            "ult" => IntPredicate::Ult,
            "ule" => IntPredicate::Ule,
            "sgt" => IntPredicate::Sgt,
            "sge" => IntPredicate::Sge,
            "slt" => IntPredicate::Slt,
            "sle" => IntPredicate::Sle,
            _ => return None,
        };
        Some(pred)
    }
}

impl fmt::Display for IntPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Poison-generating flags carried by arithmetic instructions
/// (`nuw`, `nsw` on add/sub/mul/shl, `exact` on divisions and right shifts).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ArithFlags {
    pub nuw: bool,
    pub nsw: bool,
    pub exact: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_display() {
        assert_eq!(ValueId(3).to_string(), "v3");
        assert_eq!(InstId(7).to_string(), "inst_7");
        assert_eq!(BlockId(42).to_string(), "block_42");
    }

    #[test]
    fn test_type_display() {
        assert_eq!(Type::Void.to_string(), "void");
        assert_eq!(Type::I32.to_string(), "i32");
        assert_eq!(Type::Int(8).to_string(), "i8");
        assert_eq!(Type::Ptr.to_string(), "ptr");
    }

    #[test]
    fn test_constant_sign_extension() {
        assert_eq!(ConstantInt::new(32, 4294967295).sext_value(), -1);
        assert_eq!(ConstantInt::new(32, -1), ConstantInt::new(32, 0xffff_ffff));
        assert_eq!(ConstantInt::new(8, 255).sext_value(), -1);
        assert_eq!(ConstantInt::new(8, 127).sext_value(), 127);
        assert_eq!(ConstantInt::new(1, 1).sext_value(), -1);
        assert_eq!(ConstantInt::new(64, i64::MIN).sext_value(), i64::MIN);
    }

    #[test]
    fn test_constant_width_distinguishes() {
        assert_ne!(ConstantInt::new(32, 0), ConstantInt::new(64, 0));
        assert_eq!(ConstantInt::new(64, 0).bit_width(), 64);
    }

    #[test]
    #[should_panic(expected = "unsupported integer width")]
    fn test_constant_rejects_zero_width() {
        ConstantInt::new(0, 0);
    }

    #[test]
    fn test_constant_display() {
        assert_eq!(ConstantInt::new(32, -5).to_string(), "-5");
        assert_eq!(ConstantInt::new(1, 1).to_string(), "true");
        assert_eq!(ConstantInt::new(1, 0).to_string(), "false");
    }

    #[test]
    fn test_opcode_mnemonic_inverse() {
        for op in [
            Opcode::Add,
            Opcode::Mul,
            Opcode::AShr,
            Opcode::ICmp,
            Opcode::Phi,
            Opcode::Call,
            Opcode::Store,
            Opcode::Unreachable,
        ] {
            assert_eq!(Opcode::from_mnemonic(op.mnemonic()), Some(op));
        }
        assert_eq!(Opcode::from_mnemonic("fadd"), None);
    }

    #[test]
    fn test_opcode_classes() {
        assert!(Opcode::Add.is_binary());
        assert!(Opcode::Shl.is_binary());
        assert!(!Opcode::ICmp.is_binary());
        assert!(Opcode::Br.is_terminator());
        assert!(!Opcode::Call.is_terminator());
    }

    #[test]
    fn test_predicate_names() {
        assert_eq!(IntPredicate::from_name("slt"), Some(IntPredicate::Slt));
        assert_eq!(IntPredicate::Uge.to_string(), "uge");
        assert_eq!(IntPredicate::from_name("olt"), None);
    }
}
