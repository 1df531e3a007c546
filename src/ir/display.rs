//! Textual form of the IR, used by `--emit-ir`, tests and fingerprints.

use std::fmt;

use super::*;

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for Reg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "%{}", self.0)
    }
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${}", self.0)
    }
}

impl fmt::Display for Const {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Const::Int(v) => write!(f, "i64 {}", v),
            Const::Float(v) => write!(f, "f64 {:?}", v),
        }
    }
}

impl fmt::Display for Callee {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Callee::Function(name) => f.write_str(name),
            Callee::Builtin(builtin) => f.write_str(builtin.name()),
        }
    }
}

fn join_regs(regs: &[Reg]) -> String {
    regs.iter()
        .map(|r| r.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Instructions need the enclosing function for slot and global names.
struct InstDisplay<'a> {
    func: &'a Function,
    inst: &'a Inst,
}

impl fmt::Display for InstDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.inst {
            Inst::Const { dst, value } => write!(f, "{} = const {}", dst, value),
            Inst::StrAddr { dst, global } => write!(f, "{} = straddr .str.{}", dst, global.0),
            Inst::Param { dst, index } => write!(f, "{} = param {}", dst, index),
            Inst::Alloca { slot } => match self.func.slots.get(slot.0 as usize) {
                Some(s) => write!(f, "{} = alloca {} {}", slot, s.ty, s.name),
                None => write!(f, "{} = alloca ?", slot),
            },
            Inst::Load { dst, slot } => {
                let ty = self
                    .func
                    .reg_type(*dst)
                    .map(|t| t.as_str())
                    .unwrap_or("?");
                write!(f, "{} = load {} {}", dst, ty, slot)
            }
            Inst::Store { slot, src } => write!(f, "store {}, {}", slot, src),
            Inst::Binary { dst, op, lhs, rhs } => {
                write!(f, "{} = {} {}, {}", dst, op.as_str(), lhs, rhs)
            }
            Inst::Cmp { dst, op, lhs, rhs } => {
                write!(f, "{} = icmp {} {}, {}", dst, op.as_str(), lhs, rhs)
            }
            Inst::Call { dst, callee, args } => match dst {
                Some(dst) => write!(f, "{} = call {}({})", dst, callee, join_regs(args)),
                None => write!(f, "call {}({})", callee, join_regs(args)),
            },
        }
    }
}

struct TermDisplay<'a> {
    func: &'a Function,
    term: &'a Terminator,
}

impl TermDisplay<'_> {
    fn label(&self, id: BlockId) -> &str {
        self.func
            .block(id)
            .map(|b| b.label.as_str())
            .unwrap_or("?")
    }
}

impl fmt::Display for TermDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.term {
            Terminator::Return(Some(reg)) => write!(f, "ret {}", reg),
            Terminator::Return(None) => f.write_str("ret"),
            Terminator::Jump(target) => write!(f, "jump {}", self.label(*target)),
            Terminator::Branch {
                cond,
                then_dest,
                else_dest,
            } => write!(
                f,
                "br {}, {}, {}",
                cond,
                self.label(*then_dest),
                self.label(*else_dest)
            ),
            Terminator::Unreachable => f.write_str("unreachable"),
        }
    }
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let params: Vec<String> = self
            .params
            .iter()
            .map(|p| format!("{}: {}", p.name, p.ty))
            .collect();
        writeln!(f, "fn {}({}) -> {} {{", self.name, params.join(", "), self.ret)?;
        for block in &self.blocks {
            writeln!(f, "{}:", block.label)?;
            for inst in &block.insts {
                writeln!(f, "  {}", InstDisplay { func: self, inst })?;
            }
            match &block.terminator {
                Some(term) => writeln!(f, "  {}", TermDisplay { func: self, term })?,
                None => writeln!(f, "  <unterminated>")?,
            }
        }
        writeln!(f, "}}")
    }
}

impl fmt::Display for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "module {}", self.name)?;
        for global in &self.globals {
            writeln!(f, "global {} = {:?}", global.name, global.text())?;
        }
        for func in &self.functions {
            writeln!(f)?;
            write!(f, "{}", func)?;
        }
        Ok(())
    }
}
