//! Structural checks run before a module is handed to a backend.
//!
//! Lowering only emits well-formed IR, so a failure here is a compiler bug or
//! a hand-built module; the backend refuses to translate either.

use std::fmt;

use super::*;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VerifyError {
    pub function: String,
    pub block: String,
    pub message: String,
}

impl fmt::Display for VerifyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}: {}", self.function, self.block, self.message)
    }
}

pub fn verify_module(module: &Module) -> Result<(), Vec<VerifyError>> {
    let mut errors = Vec::new();
    for func in &module.functions {
        verify_function(module, func, &mut errors);
    }
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn verify_function(module: &Module, func: &Function, errors: &mut Vec<VerifyError>) {
    if func.blocks.is_empty() {
        errors.push(VerifyError {
            function: func.name.clone(),
            block: "-".to_string(),
            message: "function has no body".to_string(),
        });
        return;
    }

    let mut defined = vec![false; func.regs.len()];
    for block in &func.blocks {
        let mut fail = |message: String| {
            errors.push(VerifyError {
                function: func.name.clone(),
                block: block.label.clone(),
                message,
            })
        };
        let ty = |reg: Reg| func.reg_type(reg);

        for inst in &block.insts {
            match inst {
                Inst::Store { slot, src } => match func.slots.get(slot.0 as usize) {
                    Some(s) if Some(s.ty) == ty(*src) => {}
                    Some(s) => fail(format!("store of {} into {} slot {}", src, s.ty, slot)),
                    None => fail(format!("store to unknown slot {}", slot)),
                },
                Inst::Load { slot, .. } | Inst::Alloca { slot } => {
                    if func.slots.get(slot.0 as usize).is_none() {
                        fail(format!("unknown slot {}", slot));
                    }
                }
                Inst::Binary { lhs, rhs, .. } | Inst::Cmp { lhs, rhs, .. } => {
                    if ty(*lhs) != Some(Type::Int64) || ty(*rhs) != Some(Type::Int64) {
                        fail(format!("integer operation on {}, {}", lhs, rhs));
                    }
                }
                Inst::StrAddr { global, .. } => {
                    if module.global(*global).is_none() {
                        fail(format!("unknown global .str.{}", global.0));
                    }
                }
                Inst::Call {
                    callee: Callee::Function(name),
                    args,
                    ..
                } => match module.find_function(name) {
                    Some((_, callee)) if callee.params.len() == args.len() => {}
                    Some(_) => fail(format!("call to {} with {} arguments", name, args.len())),
                    None => fail(format!("call to unknown function {}", name)),
                },
                Inst::Call {
                    callee: Callee::Builtin(Builtin::Print),
                    args,
                    ..
                } => {
                    if args.first().and_then(|r| ty(*r)) != Some(Type::BytePtr) {
                        fail("print needs a format string".to_string());
                    }
                }
                Inst::Const { .. } | Inst::Param { .. } => {}
            }
            if let Some(dst) = defines(inst) {
                match defined.get_mut(dst.0 as usize) {
                    Some(seen) if !*seen => *seen = true,
                    Some(_) => fail(format!("register {} defined twice", dst)),
                    None => fail(format!("register {} has no type", dst)),
                }
            }
        }

        match &block.terminator {
            None => fail("block has no terminator".to_string()),
            Some(Terminator::Return(value)) => {
                let found = value.and_then(ty).unwrap_or(Type::Void);
                if found != func.ret {
                    fail(format!("returns {} from a {} function", found, func.ret));
                }
            }
            Some(Terminator::Jump(target)) => {
                if func.block(*target).is_none() {
                    fail(format!("jump to unknown block {}", target.0));
                }
            }
            Some(Terminator::Branch {
                cond,
                then_dest,
                else_dest,
            }) => {
                if ty(*cond) != Some(Type::Bool) {
                    fail(format!("branch condition {} is not bool", cond));
                }
                if func.block(*then_dest).is_none() || func.block(*else_dest).is_none() {
                    fail("branch to unknown block".to_string());
                }
            }
            Some(Terminator::Unreachable) => {}
        }
    }
}

fn defines(inst: &Inst) -> Option<Reg> {
    match inst {
        Inst::Const { dst, .. }
        | Inst::StrAddr { dst, .. }
        | Inst::Param { dst, .. }
        | Inst::Load { dst, .. }
        | Inst::Binary { dst, .. }
        | Inst::Cmp { dst, .. } => Some(*dst),
        Inst::Call { dst, .. } => *dst,
        Inst::Alloca { .. } | Inst::Store { .. } => None,
    }
}
