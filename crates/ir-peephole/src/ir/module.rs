//! The module arena and its def-use graph.
//!
//! Every value, instruction and basic block lives in a flat arena owned by
//! [`Module`] and is addressed by a stable id. Each instruction keeps its
//! ordered operand list; each value keeps the list of `(user, operand)`
//! positions that read it, and every operand slot remembers where its entry
//! sits in that list so removing a use is O(1). All mutations below update
//! both sides in the same call, so the two views never disagree between calls.

use super::types::{
    ArithFlags, BlockId, ConstantInt, FuncId, GlobalId, InstId, IntPredicate, Opcode, Type,
    ValueId,
};
use anyhow::{bail, Result};
use std::collections::{HashMap, HashSet};

/// A single operand slot reading a value: operand `operand` of instruction `user`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Use {
    pub user: InstId,
    pub operand: usize,
}

/// What a value is.
#[derive(Debug, Clone, PartialEq)]
pub enum ValueKind {
    /// Integer constant (uniqued per module).
    ConstInt(ConstantInt),
    /// The null pointer constant.
    Null,
    /// Formal parameter `index` of `func`.
    Argument { func: FuncId, index: usize },
    /// Result of an instruction.
    Inst(InstId),
    /// Address of a function (call target or function pointer).
    Function(FuncId),
    /// Address of a module-level global variable.
    Global(GlobalId),
    /// Forward reference created while reading; resolved before the reader returns.
    Placeholder,
}

/// Arena entry for a value.
#[derive(Debug, Clone)]
pub struct ValueData {
    pub kind: ValueKind,
    pub ty: Type,
    /// Source name without the sigil. `None` for unnamed values, which the
    /// printer numbers.
    pub name: Option<String>,
    uses: Vec<Use>,
}

impl ValueData {
    fn new(kind: ValueKind, ty: Type) -> Self {
        Self {
            kind,
            ty,
            name: None,
            uses: Vec::new(),
        }
    }

    pub fn uses(&self) -> &[Use] {
        &self.uses
    }

    pub fn num_uses(&self) -> usize {
        self.uses.len()
    }

    pub fn has_uses(&self) -> bool {
        !self.uses.is_empty()
    }

    pub fn as_const_int(&self) -> Option<&ConstantInt> {
        match &self.kind {
            ValueKind::ConstInt(c) => Some(c),
            _ => None,
        }
    }
}

/// An instruction.
///
/// Operands, result and parent are managed by [`Module`]; the remaining
/// fields are plain data.
#[derive(Debug, Clone)]
pub struct Instruction {
    pub opcode: Opcode,
    /// Result type (`void` for instructions that produce nothing).
    pub ty: Type,
    /// Comparison predicate (`icmp` only).
    pub predicate: Option<IntPredicate>,
    pub flags: ArithFlags,
    /// Successor blocks for `br`, incoming blocks for `phi` (parallel to operands).
    pub targets: Vec<BlockId>,
    /// Allocated type for `alloca`.
    pub alloc_ty: Option<Type>,
    /// Explicit `align N`, kept so the printer can reproduce it.
    pub align: Option<u32>,
    operands: Vec<ValueId>,
    /// Position of each operand's entry in the use-list of the value it reads.
    use_slots: Vec<usize>,
    result: ValueId,
    parent: Option<BlockId>,
}

impl Instruction {
    pub fn operands(&self) -> &[ValueId] {
        &self.operands
    }

    pub fn operand(&self, i: usize) -> ValueId {
        self.operands[i]
    }

    pub fn num_operands(&self) -> usize {
        self.operands.len()
    }

    /// The value representing this instruction's result.
    pub fn result(&self) -> ValueId {
        self.result
    }

    pub fn parent(&self) -> Option<BlockId> {
        self.parent
    }
}

/// A straight-line sequence of instructions.
#[derive(Debug, Clone)]
pub struct BasicBlock {
    pub name: Option<String>,
    pub func: FuncId,
    insts: Vec<InstId>,
}

impl BasicBlock {
    /// Instructions in program order.
    pub fn insts(&self) -> &[InstId] {
        &self.insts
    }

    pub fn len(&self) -> usize {
        self.insts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.insts.is_empty()
    }
}

/// A function: either a declaration (no blocks) or a definition.
#[derive(Debug, Clone)]
pub struct Function {
    pub name: String,
    pub ret_ty: Type,
    /// Linkage/visibility keywords written between `define` and the return type.
    pub linkage: Vec<String>,
    /// Attribute group references written after the parameter list (`#0`).
    pub attrs: Vec<String>,
    /// Takes a variable argument list after the fixed parameters.
    pub vararg: bool,
    params: Vec<ValueId>,
    blocks: Vec<BlockId>,
    value: ValueId,
}

impl Function {
    pub fn params(&self) -> &[ValueId] {
        &self.params
    }

    /// Blocks in layout order; the first is the entry block.
    pub fn blocks(&self) -> &[BlockId] {
        &self.blocks
    }

    pub fn is_declaration(&self) -> bool {
        self.blocks.is_empty()
    }

    /// The value referring to this function (`@name`).
    pub fn as_value(&self) -> ValueId {
        self.value
    }
}

/// A global variable definition (`@name = ...`).
///
/// Only the name is interpreted; the definition line is kept verbatim for
/// the printer.
#[derive(Debug, Clone)]
pub struct GlobalVar {
    pub name: String,
    /// The whole source line, e.g. `@.str = private constant [3 x i8] c"hi\00"`.
    pub definition: String,
    value: ValueId,
}

impl GlobalVar {
    /// The `ptr` value referring to this global (`@name`).
    pub fn as_value(&self) -> ValueId {
        self.value
    }
}

/// Top-level container: functions plus the arenas backing them.
#[derive(Debug, Clone, Default)]
pub struct Module {
    /// Module identifier (`; ModuleID = '...'`), possibly empty.
    pub name: String,
    pub source_filename: Option<String>,
    /// `target datalayout`/`target triple` lines, reproduced verbatim.
    pub target_lines: Vec<String>,
    globals: Vec<GlobalVar>,
    functions: Vec<Function>,
    blocks: Vec<BasicBlock>,
    insts: Vec<Option<Instruction>>,
    values: Vec<ValueData>,
    const_pool: HashMap<ConstantInt, ValueId>,
    null_value: Option<ValueId>,
}

impl Module {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    // ─── Functions ─────────────────────────────────────────────────────────

    /// Append a function with unnamed parameters of the given types.
    pub fn add_function(&mut self, name: impl Into<String>, ret_ty: Type, params: &[Type]) -> FuncId {
        let id = FuncId::new(self.functions.len());
        let value = self.push_value(ValueData::new(ValueKind::Function(id), Type::Ptr));
        let params = params
            .iter()
            .enumerate()
            .map(|(index, ty)| {
                self.push_value(ValueData::new(ValueKind::Argument { func: id, index }, *ty))
            })
            .collect();
        self.functions.push(Function {
            name: name.into(),
            ret_ty,
            linkage: Vec::new(),
            attrs: Vec::new(),
            vararg: false,
            params,
            blocks: Vec::new(),
            value,
        });
        id
    }

    pub fn function(&self, id: FuncId) -> &Function {
        &self.functions[id.as_usize()]
    }

    pub fn function_mut(&mut self, id: FuncId) -> &mut Function {
        &mut self.functions[id.as_usize()]
    }

    pub fn num_functions(&self) -> usize {
        self.functions.len()
    }

    /// Function ids in declaration order.
    pub fn func_ids(&self) -> impl Iterator<Item = FuncId> {
        (0..self.functions.len()).map(FuncId::new)
    }

    pub fn functions(&self) -> impl Iterator<Item = (FuncId, &Function)> {
        self.functions
            .iter()
            .enumerate()
            .map(|(i, f)| (FuncId::new(i), f))
    }

    pub fn find_function(&self, name: &str) -> Option<FuncId> {
        self.functions
            .iter()
            .position(|f| f.name == name)
            .map(FuncId::new)
    }

    // ─── Globals ──────────────────────────────────────────────────────────

    /// Register a global variable whose definition is kept as written.
    pub fn add_global(
        &mut self,
        name: impl Into<String>,
        definition: impl Into<String>,
    ) -> GlobalId {
        let id = GlobalId::new(self.globals.len());
        let value = self.push_value(ValueData::new(ValueKind::Global(id), Type::Ptr));
        self.globals.push(GlobalVar {
            name: name.into(),
            definition: definition.into(),
            value,
        });
        id
    }

    pub fn global(&self, id: GlobalId) -> &GlobalVar {
        &self.globals[id.as_usize()]
    }

    /// Globals in source order.
    pub fn globals(&self) -> impl Iterator<Item = (GlobalId, &GlobalVar)> {
        self.globals
            .iter()
            .enumerate()
            .map(|(i, g)| (GlobalId::new(i), g))
    }

    // ─── Blocks ────────────────────────────────────────────────────────────

    /// Create a block owned by `func` but not yet placed in its layout.
    pub fn create_block(&mut self, func: FuncId, name: Option<String>) -> BlockId {
        let id = BlockId(self.blocks.len() as u32);
        self.blocks.push(BasicBlock {
            name,
            func,
            insts: Vec::new(),
        });
        id
    }

    /// Place a block created with [`Module::create_block`] at the end of its function.
    pub fn append_block(&mut self, block: BlockId) {
        let func = self.block(block).func;
        let layout = &mut self.functions[func.as_usize()].blocks;
        assert!(!layout.contains(&block), "{block} is already placed");
        layout.push(block);
    }

    /// Create a block and append it to `func`.
    pub fn add_block(&mut self, func: FuncId, name: Option<String>) -> BlockId {
        let id = self.create_block(func, name);
        self.append_block(id);
        id
    }

    pub fn block(&self, id: BlockId) -> &BasicBlock {
        &self.blocks[id.0 as usize]
    }

    // ─── Values ────────────────────────────────────────────────────────────

    fn push_value(&mut self, data: ValueData) -> ValueId {
        let id = ValueId(self.values.len() as u32);
        self.values.push(data);
        id
    }

    pub fn value(&self, id: ValueId) -> &ValueData {
        &self.values[id.0 as usize]
    }

    pub fn set_value_name(&mut self, id: ValueId, name: Option<String>) {
        self.values[id.0 as usize].name = name;
    }

    /// The uniqued integer constant of width `bits` holding `raw` (truncated
    /// to `bits` and sign-extended).
    pub fn const_int(&mut self, bits: u32, raw: i64) -> ValueId {
        let c = ConstantInt::new(bits, raw);
        if let Some(&id) = self.const_pool.get(&c) {
            return id;
        }
        let id = self.push_value(ValueData::new(ValueKind::ConstInt(c), c.ty()));
        self.const_pool.insert(c, id);
        id
    }

    pub fn null(&mut self) -> ValueId {
        if let Some(id) = self.null_value {
            return id;
        }
        let id = self.push_value(ValueData::new(ValueKind::Null, Type::Ptr));
        self.null_value = Some(id);
        id
    }

    /// A fresh forward-reference value.
    pub fn placeholder(&mut self, ty: Type, name: Option<String>) -> ValueId {
        let mut data = ValueData::new(ValueKind::Placeholder, ty);
        data.name = name;
        self.push_value(data)
    }

    // ─── Instructions ──────────────────────────────────────────────────────

    /// Append a new instruction at the end of `block`, registering a use for
    /// every operand. Returns the instruction id; its result value is
    /// available through [`Instruction::result`].
    pub fn append_inst(
        &mut self,
        block: BlockId,
        opcode: Opcode,
        ty: Type,
        operands: Vec<ValueId>,
    ) -> InstId {
        let id = InstId(self.insts.len() as u32);
        let result = self.push_value(ValueData::new(ValueKind::Inst(id), ty));
        let use_slots = operands
            .iter()
            .enumerate()
            .map(|(operand, &v)| self.add_use(v, Use { user: id, operand }))
            .collect();
        self.insts.push(Some(Instruction {
            opcode,
            ty,
            predicate: None,
            flags: ArithFlags::default(),
            targets: Vec::new(),
            alloc_ty: None,
            align: None,
            operands,
            use_slots,
            result,
            parent: Some(block),
        }));
        self.blocks[block.0 as usize].insts.push(id);
        id
    }

    /// # Panics
    /// Panics if the instruction has been erased.
    pub fn inst(&self, id: InstId) -> &Instruction {
        match &self.insts[id.0 as usize] {
            Some(inst) => inst,
            None => panic!("{id} has been erased"),
        }
    }

    /// Mutable access to the plain-data fields of an instruction.
    pub fn inst_mut(&mut self, id: InstId) -> &mut Instruction {
        match &mut self.insts[id.0 as usize] {
            Some(inst) => inst,
            None => panic!("{id} has been erased"),
        }
    }

    pub fn is_erased(&self, id: InstId) -> bool {
        self.insts[id.0 as usize].is_none()
    }

    /// The instruction defining `value`, if it is an instruction result.
    pub fn defining_inst(&self, value: ValueId) -> Option<InstId> {
        match self.value(value).kind {
            ValueKind::Inst(id) => Some(id),
            _ => None,
        }
    }

    /// Total number of instructions placed in blocks.
    pub fn inst_count(&self) -> usize {
        self.functions
            .iter()
            .flat_map(|f| f.blocks.iter())
            .map(|&b| self.block(b).len())
            .sum()
    }

    /// The statically known callee of a `call`, or `None` for indirect calls
    /// and non-call instructions.
    pub fn called_function(&self, id: InstId) -> Option<FuncId> {
        let inst = self.inst(id);
        if inst.opcode != Opcode::Call {
            return None;
        }
        let callee = *inst.operands.last()?;
        match self.value(callee).kind {
            ValueKind::Function(func) => Some(func),
            _ => None,
        }
    }

    // ─── Def-use mutation ──────────────────────────────────────────────────

    /// Record `u` at the end of `value`'s use-list; returns its position.
    fn add_use(&mut self, value: ValueId, u: Use) -> usize {
        let uses = &mut self.values[value.0 as usize].uses;
        uses.push(u);
        uses.len() - 1
    }

    /// Drop `u` from `value`'s use-list. The user must still be live.
    fn remove_use(&mut self, value: ValueId, u: Use) {
        let pos = self.inst(u.user).use_slots[u.operand];
        let uses = &mut self.values[value.0 as usize].uses;
        assert!(
            uses.get(pos) == Some(&u),
            "use-list of {value} is out of sync at position {pos}"
        );
        uses.swap_remove(pos);
        let moved = uses.get(pos).copied();
        if let Some(moved) = moved {
            self.inst_mut(moved.user).use_slots[moved.operand] = pos;
        }
    }

    /// Point operand `i` of `inst` at `value`.
    pub fn set_operand(&mut self, inst: InstId, i: usize, value: ValueId) {
        let old = self.inst(inst).operands[i];
        if old == value {
            return;
        }
        let u = Use {
            user: inst,
            operand: i,
        };
        self.remove_use(old, u);
        let slot = self.add_use(value, u);
        let data = self.inst_mut(inst);
        data.operands[i] = value;
        data.use_slots[i] = slot;
    }

    /// Redirect every use of `from` to `to`. Afterwards `from` has no uses
    /// and `to` has gained exactly the use sites `from` had.
    ///
    /// Returns the number of rewritten operand slots.
    pub fn replace_all_uses_with(&mut self, from: ValueId, to: ValueId) -> usize {
        if from == to {
            return 0;
        }
        let moved = std::mem::take(&mut self.values[from.0 as usize].uses);
        let base = self.values[to.0 as usize].uses.len();
        for (k, u) in moved.iter().enumerate() {
            let user = self.inst_mut(u.user);
            debug_assert_eq!(user.operands[u.operand], from, "use-list out of sync for {from}");
            user.operands[u.operand] = to;
            user.use_slots[u.operand] = base + k;
        }
        let count = moved.len();
        self.values[to.0 as usize].uses.extend(moved);
        count
    }

    /// Remove `id` from its block and drop the uses it holds on its operands.
    ///
    /// # Panics
    /// Panics if the instruction's result still has uses; callers must
    /// redirect them first.
    pub fn erase_inst(&mut self, id: InstId) {
        self.assert_unused(id);
        if let Some(block) = self.detach(id) {
            self.blocks[block.0 as usize].insts.retain(|&i| i != id);
        }
    }

    /// Erase every instruction in `ids` from `block` with a single pass over
    /// the block's sequence.
    ///
    /// # Panics
    /// Panics if any of them still has uses or does not belong to `block`.
    pub fn erase_insts(&mut self, block: BlockId, ids: &[InstId]) {
        for &id in ids {
            self.assert_unused(id);
            let parent = self.inst(id).parent;
            assert!(
                parent == Some(block),
                "cannot erase {id} from {block}: its parent is {parent:?}"
            );
        }
        let doomed: HashSet<InstId> = ids.iter().copied().collect();
        for &id in ids {
            if !self.is_erased(id) {
                self.detach(id);
            }
        }
        self.blocks[block.0 as usize]
            .insts
            .retain(|i| !doomed.contains(i));
    }

    fn assert_unused(&self, id: InstId) {
        let result = self.inst(id).result;
        let remaining = self.value(result).num_uses();
        assert!(
            remaining == 0,
            "cannot erase {id}: its result {result} still has {remaining} use(s)"
        );
    }

    /// Drop the uses `id` holds and free its arena slot, leaving the block
    /// sequence to the caller. Returns the former parent.
    fn detach(&mut self, id: InstId) -> Option<BlockId> {
        for operand in 0..self.inst(id).operands.len() {
            let v = self.inst(id).operands[operand];
            self.remove_use(v, Use { user: id, operand });
        }
        match self.insts[id.0 as usize].take() {
            Some(inst) => inst.parent,
            None => panic!("{id} has been erased"),
        }
    }

    // ─── Verification ──────────────────────────────────────────────────────

    /// Check def-use integrity and block structure in time linear in the
    /// size of the module.
    pub fn verify(&self) -> Result<()> {
        // Every operand edge points at its own use entry.
        for (idx, slot) in self.insts.iter().enumerate() {
            let Some(inst) = slot else { continue };
            let id = InstId(idx as u32);
            for (operand, &v) in inst.operands.iter().enumerate() {
                let Some(data) = self.values.get(v.0 as usize) else {
                    bail!("{id} operand {operand} refers to unknown value {v}");
                };
                let u = Use { user: id, operand };
                if data.uses.get(inst.use_slots[operand]) != Some(&u) {
                    bail!("{id} operand {operand} reads {v} but {v} does not record that use");
                }
            }
        }

        // Every use entry points back at the operand slot that owns it, so
        // no entry is stale or duplicated.
        for (idx, data) in self.values.iter().enumerate() {
            let v = ValueId(idx as u32);
            for (pos, u) in data.uses.iter().enumerate() {
                let Some(Some(user)) = self.insts.get(u.user.0 as usize) else {
                    bail!("{v} is used by erased or unknown instruction {}", u.user);
                };
                if user.operands.get(u.operand) != Some(&v) || user.use_slots[u.operand] != pos {
                    bail!(
                        "{v} records use by {} operand {} that does not point back to it",
                        u.user,
                        u.operand
                    );
                }
            }
            if data.kind == ValueKind::Placeholder && data.has_uses() {
                bail!(
                    "unresolved forward reference %{}",
                    data.name.as_deref().unwrap_or("?")
                );
            }
        }

        // Block sequences only hold live instructions they own, each placed once.
        let mut placements = vec![0usize; self.insts.len()];
        for (idx, bb) in self.blocks.iter().enumerate() {
            let block = BlockId(idx as u32);
            for &id in &bb.insts {
                let Some(Some(inst)) = self.insts.get(id.0 as usize) else {
                    bail!("{block} holds erased instruction {id}");
                };
                if inst.parent != Some(block) {
                    bail!("{id} is in {block} but its parent is {:?}", inst.parent);
                }
                placements[id.0 as usize] += 1;
            }
        }
        for (idx, slot) in self.insts.iter().enumerate() {
            let Some(inst) = slot else { continue };
            let n = placements[idx];
            if let Some(block) = inst.parent {
                if n != 1 {
                    bail!("{} is placed {n} time(s) in its parent {block}", InstId(idx as u32));
                }
            }
        }

        // Every block of a definition ends in its only terminator.
        for (_, func) in self.functions() {
            for &block in &func.blocks {
                let bb = self.block(block);
                for (pos, &id) in bb.insts.iter().enumerate() {
                    let last = pos + 1 == bb.insts.len();
                    let opcode = self.inst(id).opcode;
                    if opcode.is_terminator() != last {
                        bail!(
                            "@{}: {block} must end with exactly one terminator (found `{}` at position {pos})",
                            func.name,
                            opcode
                        );
                    }
                }
                if bb.insts.is_empty() {
                    bail!("@{}: {block} is empty", func.name);
                }
            }
        }
        Ok(())
    }
}
