//! FunctionBuilder: appends instructions to explicit blocks of one function.
//!
//! The builder has no notion of a "current" block; callers pass the block
//! they are appending to (lowering keeps it in the scope frame).

use super::*;

pub struct FunctionBuilder {
    id: FuncId,
    func: Function,
    /// Suffix for `then.N` / `else.N` / `merge.N` labels.
    branch_counter: u32,
}

impl FunctionBuilder {
    pub fn new(id: FuncId, name: &str, params: Vec<Param>, ret: Type) -> Self {
        Self {
            id,
            func: Function::new(name.to_string(), params, ret),
            branch_counter: 0,
        }
    }

    pub fn function(&self) -> &Function {
        &self.func
    }

    pub fn name(&self) -> &str {
        &self.func.name
    }

    pub fn return_type(&self) -> Type {
        self.func.ret
    }

    pub fn finish(self) -> (FuncId, Function) {
        (self.id, self.func)
    }

    // ── Blocks ────────────────────────────────────────────────────

    pub fn create_block(&mut self, label: impl Into<String>) -> BlockId {
        let id = BlockId(self.func.blocks.len() as u32);
        self.func.blocks.push(Block::new(label.into()));
        id
    }

    /// Next index for a conditional's block labels.
    pub fn next_branch_index(&mut self) -> u32 {
        let n = self.branch_counter;
        self.branch_counter += 1;
        n
    }

    pub fn is_terminated(&self, block: BlockId) -> bool {
        self.func
            .block(block)
            .is_some_and(|b| b.terminator.is_some())
    }

    /// Set the block's terminator. A block is terminated at most once; later
    /// calls are ignored so the first control transfer wins.
    pub fn terminate(&mut self, block: BlockId, term: Terminator) {
        if let Some(b) = self.func.blocks.get_mut(block.0 as usize) {
            if b.terminator.is_none() {
                b.terminator = Some(term);
            }
        }
    }

    // ── Registers and slots ───────────────────────────────────────

    pub fn fresh_reg(&mut self, ty: Type) -> Reg {
        let reg = Reg(self.func.regs.len() as u32);
        self.func.regs.push(ty);
        reg
    }

    pub fn reg_type(&self, reg: Reg) -> Type {
        self.func.reg_type(reg).unwrap_or(Type::Void)
    }

    fn push(&mut self, block: BlockId, inst: Inst) {
        if let Some(b) = self.func.blocks.get_mut(block.0 as usize) {
            b.insts.push(inst);
        }
    }

    // ── Instruction emitters ──────────────────────────────────────

    pub fn constant(&mut self, block: BlockId, value: Const) -> Reg {
        let dst = self.fresh_reg(value.ty());
        self.push(block, Inst::Const { dst, value });
        dst
    }

    pub fn str_addr(&mut self, block: BlockId, global: GlobalId) -> Reg {
        let dst = self.fresh_reg(Type::BytePtr);
        self.push(block, Inst::StrAddr { dst, global });
        dst
    }

    pub fn param(&mut self, block: BlockId, index: u32, ty: Type) -> Reg {
        let dst = self.fresh_reg(ty);
        self.push(block, Inst::Param { dst, index });
        dst
    }

    pub fn alloca(&mut self, block: BlockId, name: &str, ty: Type) -> SlotId {
        let slot = SlotId(self.func.slots.len() as u32);
        self.func.slots.push(Slot {
            name: name.to_string(),
            ty,
        });
        self.push(block, Inst::Alloca { slot });
        slot
    }

    pub fn load(&mut self, block: BlockId, slot: SlotId, ty: Type) -> Reg {
        let dst = self.fresh_reg(ty);
        self.push(block, Inst::Load { dst, slot });
        dst
    }

    pub fn store(&mut self, block: BlockId, slot: SlotId, src: Reg) {
        self.push(block, Inst::Store { slot, src });
    }

    pub fn binary(&mut self, block: BlockId, op: IntBinOp, lhs: Reg, rhs: Reg) -> Reg {
        let dst = self.fresh_reg(Type::Int64);
        self.push(block, Inst::Binary { dst, op, lhs, rhs });
        dst
    }

    pub fn cmp(&mut self, block: BlockId, op: CmpOp, lhs: Reg, rhs: Reg) -> Reg {
        let dst = self.fresh_reg(Type::Bool);
        self.push(block, Inst::Cmp { dst, op, lhs, rhs });
        dst
    }

    /// Emit a call. Returns the result register unless `ret` is `Void`.
    pub fn call(
        &mut self,
        block: BlockId,
        callee: Callee,
        args: Vec<Reg>,
        ret: Type,
    ) -> Option<Reg> {
        let dst = (ret != Type::Void).then(|| self.fresh_reg(ret));
        self.push(block, Inst::Call { dst, callee, args });
        dst
    }
}
