//! Statement and control-flow lowering.

use crate::ast::{Block, Expr, Stmt, VarDecl};
use crate::ir::{BlockId, CmpOp, Const, Reg, Terminator, Type};
use crate::span::{Span, Spanned};

use super::error::{LowerError, LowerResult};
use super::scope::{Binding, Frame, Locals};
use super::Lowering;

impl Lowering {
    /// Lower statements in order into the current frame and return the last
    /// value produced. Statements after the path has returned are skipped
    /// with a single warning.
    pub(super) fn lower_block(&mut self, block: &Block) -> Option<Reg> {
        self.trace.step("creating block");
        let mut last = None;
        for (index, stmt) in block.stmts.iter().enumerate() {
            if self.scopes.has_returned() {
                let rest = &block.stmts[index..];
                let span = rest
                    .iter()
                    .map(|s| s.span)
                    .reduce(Span::merge)
                    .unwrap_or(stmt.span);
                self.trace
                    .step(format!("skipping {} unreachable statement(s)", rest.len()));
                self.warn("unreachable statement", span);
                break;
            }
            match self.lower_stmt(stmt) {
                Ok(value) => last = value,
                Err(err) => self.report(err),
            }
        }
        last
    }

    fn lower_stmt(&mut self, stmt: &Spanned<Stmt>) -> LowerResult<Option<Reg>> {
        match &stmt.node {
            Stmt::VarDecl(decl) => self.lower_var_decl(decl),
            Stmt::FnDecl(decl) => self.lower_function(decl),
            Stmt::If {
                cond,
                then_block,
                else_block,
            } => self.lower_if(cond, then_block, else_block.as_ref()),
            Stmt::Return(value) => {
                self.trace.step("creating return statement");
                let reg = self.lower_operand(value)?;
                let expected = self.builder.return_type();
                let found = self.builder.reg_type(reg);
                if expected != Type::Void && found != expected {
                    return Err(LowerError::TypeMismatch {
                        context: format!("return from `{}`", self.builder.name()),
                        expected,
                        found,
                    }
                    .at(value.span));
                }
                self.scopes.set_return_value(reg);
                Ok(Some(reg))
            }
            Stmt::Expr(expr) => {
                self.trace.step("creating expression statement");
                self.lower_expr(expr)
            }
            Stmt::Block(block) => Ok(self.lower_block(block)),
        }
    }

    // ─── Declarations ─────────────────────────────────────────────

    fn lower_var_decl(&mut self, decl: &VarDecl) -> LowerResult<Option<Reg>> {
        let name = &decl.name.node;
        self.trace.step(format!(
            "creating variable declaration {} {}",
            decl.ty.node, name
        ));
        let ty = Type::from_decl_name(&decl.ty.node)
            .ok_or_else(|| LowerError::UnknownType(decl.ty.node.clone()).at(decl.ty.span))?;

        if ty == Type::BytePtr {
            return self.lower_string_decl(decl).map(Some);
        }

        let block = self.current_block();
        let slot = self.builder.alloca(block, name, ty);
        self.scopes.bind(
            name,
            Binding {
                slot,
                ty,
                mutable: true,
            },
        );
        match &decl.init {
            Some(init) => self.lower_assign(&decl.name, init).map(Some),
            None => Ok(None),
        }
    }

    /// `String s = "...";` binds a read-only slot to a string constant.
    fn lower_string_decl(&mut self, decl: &VarDecl) -> LowerResult<Reg> {
        let init = match &decl.init {
            Some(init) if matches!(init.node, Expr::Str(_) | Expr::Invert(_)) => init,
            Some(init) => {
                return Err(LowerError::InvalidOperandKind(format!(
                    "String variable `{}` must be initialized with a string literal, found {}",
                    decl.name.node,
                    init.node.describe()
                ))
                .at(init.span))
            }
            None => {
                return Err(LowerError::InvalidOperandKind(format!(
                    "String variable `{}` needs a string literal initializer",
                    decl.name.node
                ))
                .at(decl.name.span))
            }
        };

        let block = self.current_block();
        let slot = self.builder.alloca(block, &decl.name.node, Type::BytePtr);
        self.scopes.bind(
            &decl.name.node,
            Binding {
                slot,
                ty: Type::BytePtr,
                mutable: false,
            },
        );
        let value = self.lower_operand(init)?;
        let found = self.builder.reg_type(value);
        if found != Type::BytePtr {
            return Err(LowerError::TypeMismatch {
                context: format!("declaration of `{}`", decl.name.node),
                expected: Type::BytePtr,
                found,
            }
            .at(init.span));
        }
        self.builder.store(block, slot, value);
        Ok(value)
    }

    // ─── Conditionals ─────────────────────────────────────────────

    fn lower_if(
        &mut self,
        cond: &Spanned<Expr>,
        then_block: &Block,
        else_block: Option<&Block>,
    ) -> LowerResult<Option<Reg>> {
        self.trace.step("creating conditional");
        let value = self.lower_operand(cond)?;
        let block = self.current_block();
        let flag = match self.builder.reg_type(value) {
            Type::Bool => value,
            Type::Int64 => {
                let zero = self.builder.constant(block, Const::Int(0));
                self.builder.cmp(block, CmpOp::Ne, value, zero)
            }
            other => {
                return Err(LowerError::InvalidOperandKind(format!(
                    "condition must be Int, found {}",
                    other.source_name()
                ))
                .at(cond.span))
            }
        };

        let n = self.builder.next_branch_index();
        let then_label = format!("then.{}", n);
        let else_label = format!("else.{}", n);
        let merge_label = format!("merge.{}", n);
        let then_bb = self.create_block(&then_label);
        let else_bb = else_block.map(|_| self.create_block(&else_label));
        let merge_bb = self.create_block(&merge_label);
        self.builder.terminate(
            block,
            Terminator::Branch {
                cond: flag,
                then_dest: then_bb,
                else_dest: else_bb.unwrap_or(merge_bb),
            },
        );

        let snapshot = self.scopes.locals();
        let mut reaches_merge = else_bb.is_none();
        reaches_merge |= self.lower_branch(then_bb, &then_label, &snapshot, then_block, merge_bb);
        if let (Some(bb), Some(body)) = (else_bb, else_block) {
            reaches_merge |= self.lower_branch(bb, &else_label, &snapshot, body, merge_bb);
        }

        self.trace.step(format!("continuing in block {}", merge_label));
        self.scopes.set_current_block(merge_bb, &merge_label, snapshot);
        if !reaches_merge {
            self.builder.terminate(merge_bb, Terminator::Unreachable);
            self.scopes.mark_diverged();
        }
        Ok(None)
    }

    /// Lower one arm in its own frame. Returns whether control falls
    /// through to `merge`.
    fn lower_branch(
        &mut self,
        block: BlockId,
        label: &str,
        snapshot: &Locals,
        body: &Block,
        merge: BlockId,
    ) -> bool {
        let (_, frame) = self.in_frame(block, label, Some(snapshot.clone()), |lw| {
            lw.lower_block(body)
        });
        self.close_branch(&frame, merge)
    }

    fn close_branch(&mut self, frame: &Frame, merge: BlockId) -> bool {
        if frame.diverged {
            return false;
        }
        match frame.pending_return {
            Some(value) => {
                self.emit_return(frame.block, value);
                false
            }
            None => {
                self.builder.terminate(frame.block, Terminator::Jump(merge));
                true
            }
        }
    }
}
