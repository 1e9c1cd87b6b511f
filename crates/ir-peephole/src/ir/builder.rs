//! Instruction builder.
//!
//! [`FunctionBuilder`] appends instructions at the end of a current block,
//! inferring result types from operands the way the text format does. The
//! text reader builds every function through it, and tests use it to set up
//! graphs without going through text.

use super::module::Module;
use super::types::{BlockId, FuncId, InstId, IntPredicate, Opcode, Type, ValueId};

/// Builds the body of one function.
pub struct FunctionBuilder<'m> {
    module: &'m mut Module,
    func: FuncId,
    current: Option<BlockId>,
}

impl<'m> FunctionBuilder<'m> {
    pub fn new(module: &'m mut Module, func: FuncId) -> Self {
        Self {
            module,
            func,
            current: None,
        }
    }

    pub fn module(&mut self) -> &mut Module {
        self.module
    }

    pub fn func(&self) -> FuncId {
        self.func
    }

    /// Formal parameter `i` of the function being built.
    pub fn param(&self, i: usize) -> ValueId {
        self.module.function(self.func).params()[i]
    }

    /// Create a block, append it to the function and make it current.
    pub fn block(&mut self, name: Option<&str>) -> BlockId {
        let bb = self.module.add_block(self.func, name.map(str::to_string));
        self.current = Some(bb);
        bb
    }

    /// Make an existing block current.
    pub fn position_at_end(&mut self, bb: BlockId) {
        self.current = Some(bb);
    }

    pub fn current_block(&self) -> Option<BlockId> {
        self.current
    }

    pub fn const_int(&mut self, ty: Type, value: i64) -> ValueId {
        match ty {
            Type::Int(bits) => self.module.const_int(bits, value),
            other => panic!("integer constant of non-integer type {other}"),
        }
    }

    /// Append a raw instruction to the current block.
    ///
    /// # Panics
    /// Panics when no block is current.
    pub fn push(&mut self, opcode: Opcode, ty: Type, operands: Vec<ValueId>) -> InstId {
        let Some(bb) = self.current else {
            panic!("no current block to append `{opcode}` to");
        };
        self.module.append_inst(bb, opcode, ty, operands)
    }

    fn push_value(&mut self, opcode: Opcode, ty: Type, operands: Vec<ValueId>) -> ValueId {
        let id = self.push(opcode, ty, operands);
        self.module.inst(id).result()
    }

    /// Two-operand arithmetic; the result has the type of `lhs`.
    pub fn binary(&mut self, op: Opcode, lhs: ValueId, rhs: ValueId) -> ValueId {
        debug_assert!(op.is_binary(), "`{op}` is not a binary opcode");
        let ty = self.module.value(lhs).ty;
        self.push_value(op, ty, vec![lhs, rhs])
    }

    pub fn add(&mut self, lhs: ValueId, rhs: ValueId) -> ValueId {
        self.binary(Opcode::Add, lhs, rhs)
    }

    pub fn mul(&mut self, lhs: ValueId, rhs: ValueId) -> ValueId {
        self.binary(Opcode::Mul, lhs, rhs)
    }

    pub fn icmp(&mut self, pred: IntPredicate, lhs: ValueId, rhs: ValueId) -> ValueId {
        let id = self.push(Opcode::ICmp, Type::I1, vec![lhs, rhs]);
        self.module.inst_mut(id).predicate = Some(pred);
        self.module.inst(id).result()
    }

    pub fn phi(&mut self, ty: Type, incoming: &[(ValueId, BlockId)]) -> ValueId {
        let (values, blocks): (Vec<_>, Vec<_>) = incoming.iter().copied().unzip();
        let id = self.push(Opcode::Phi, ty, values);
        self.module.inst_mut(id).targets = blocks;
        self.module.inst(id).result()
    }

    /// Direct call; the callee reference is the last operand.
    pub fn call(&mut self, callee: FuncId, args: &[ValueId]) -> ValueId {
        let ret_ty = self.module.function(callee).ret_ty;
        let target = self.module.function(callee).as_value();
        let mut operands = args.to_vec();
        operands.push(target);
        self.push_value(Opcode::Call, ret_ty, operands)
    }

    /// Call through a function pointer.
    pub fn call_indirect(&mut self, ret_ty: Type, fp: ValueId, args: &[ValueId]) -> ValueId {
        let mut operands = args.to_vec();
        operands.push(fp);
        self.push_value(Opcode::Call, ret_ty, operands)
    }

    pub fn alloca(&mut self, ty: Type) -> ValueId {
        let id = self.push(Opcode::Alloca, Type::Ptr, vec![]);
        self.module.inst_mut(id).alloc_ty = Some(ty);
        self.module.inst(id).result()
    }

    pub fn load(&mut self, ty: Type, ptr: ValueId) -> ValueId {
        self.push_value(Opcode::Load, ty, vec![ptr])
    }

    pub fn store(&mut self, value: ValueId, ptr: ValueId) -> InstId {
        self.push(Opcode::Store, Type::Void, vec![value, ptr])
    }

    pub fn ret(&mut self, value: Option<ValueId>) -> InstId {
        self.push(Opcode::Ret, Type::Void, value.into_iter().collect())
    }

    pub fn br(&mut self, target: BlockId) -> InstId {
        let id = self.push(Opcode::Br, Type::Void, vec![]);
        self.module.inst_mut(id).targets = vec![target];
        id
    }

    pub fn cond_br(&mut self, cond: ValueId, if_true: BlockId, if_false: BlockId) -> InstId {
        let id = self.push(Opcode::Br, Type::Void, vec![cond]);
        self.module.inst_mut(id).targets = vec![if_true, if_false];
        id
    }

    pub fn unreachable(&mut self) -> InstId {
        self.push(Opcode::Unreachable, Type::Void, vec![])
    }
}
