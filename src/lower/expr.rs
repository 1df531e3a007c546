//! Expression lowering.
//!
//! Every expression is lowered into the current frame's block. Operands are
//! evaluated left to right, and nothing here changes the current block.

use crate::ast::invert::invert_literal;
use crate::ast::{literal, BinOp, Expr, UnaryOp};
use crate::ir::{Builtin, Callee, CmpOp, Const, IntBinOp, Reg, Type};
use crate::span::{Span, Spanned};

use super::error::{LowerError, LowerResult};
use super::Lowering;

impl Lowering {
    /// Lower an expression. `None` is the result of a call to a `Void`
    /// function or to `print`.
    pub(super) fn lower_expr(&mut self, expr: &Spanned<Expr>) -> LowerResult<Option<Reg>> {
        let block = self.current_block();
        match &expr.node {
            Expr::Int(value) => {
                self.trace.step(format!("creating integer: {}", value));
                Ok(Some(self.builder.constant(block, Const::Int(*value))))
            }
            Expr::Double(value) => {
                self.trace.step(format!("creating double: {}", value));
                Ok(Some(self.builder.constant(block, Const::Float(*value))))
            }
            Expr::Str(raw) => {
                self.trace.step(format!("creating string: {}", raw));
                let global = self.module.add_string(&literal::unquote(raw));
                Ok(Some(self.builder.str_addr(block, global)))
            }
            Expr::Ident(name) => {
                self.trace
                    .step(format!("creating identifier reference: {}", name));
                let binding = self
                    .scopes
                    .lookup(name)
                    .ok_or_else(|| LowerError::UndeclaredVariable(name.clone()).at(expr.span))?;
                Ok(Some(self.builder.load(block, binding.slot, binding.ty)))
            }
            Expr::Call { callee, args } => self.lower_call(callee, args),
            Expr::Binary { op, lhs, rhs } => self.lower_binary(*op, lhs, rhs, expr.span).map(Some),
            Expr::Unary { op, operand } => self.lower_unary(*op, operand).map(Some),
            Expr::Invert(operand) => {
                self.trace.step("folding invert");
                let folded = invert_literal(operand).map_err(|e| {
                    LowerError::InvalidOperandKind(e.to_string()).at(operand.span)
                })?;
                self.lower_expr(&folded)
            }
            Expr::Assign { target, value } => self.lower_assign(target, value).map(Some),
        }
    }

    /// Lower an expression that must produce a value.
    pub(super) fn lower_operand(&mut self, expr: &Spanned<Expr>) -> LowerResult<Reg> {
        self.lower_expr(expr)?.ok_or_else(|| {
            LowerError::InvalidOperandKind(format!("{} produces no value", expr.node.describe()))
                .at(expr.span)
        })
    }

    fn reg_type(&self, reg: Reg) -> Type {
        self.builder.reg_type(reg)
    }

    // ─── Calls ────────────────────────────────────────────────────

    fn lower_call(
        &mut self,
        callee: &Spanned<String>,
        args: &[Spanned<Expr>],
    ) -> LowerResult<Option<Reg>> {
        self.trace.step(format!("creating method call: {}", callee.node));
        if let Some(builtin) = Builtin::from_name(&callee.node) {
            return self.lower_builtin(builtin, callee, args);
        }

        let (params, ret) = match self.module.find_function(&callee.node) {
            Some((_, func)) => (
                func.params.iter().map(|p| p.ty).collect::<Vec<_>>(),
                func.ret,
            ),
            None => {
                return Err(LowerError::UndefinedFunction(callee.node.clone()).at(callee.span))
            }
        };
        if params.len() != args.len() {
            return Err(LowerError::ArityMismatch {
                name: callee.node.clone(),
                expected: params.len(),
                found: args.len(),
            }
            .at(callee.span));
        }

        let mut regs = Vec::with_capacity(args.len());
        for (index, (arg, expected)) in args.iter().zip(params).enumerate() {
            let reg = self.lower_operand(arg)?;
            let found = self.reg_type(reg);
            if found != expected {
                return Err(LowerError::TypeMismatch {
                    context: format!("argument {} of `{}`", index + 1, callee.node),
                    expected,
                    found,
                }
                .at(arg.span));
            }
            regs.push(reg);
        }

        let block = self.current_block();
        Ok(self
            .builder
            .call(block, Callee::Function(callee.node.clone()), regs, ret))
    }

    /// `print(format, args...)`: the format must be a string; the remaining
    /// arguments may be any value.
    fn lower_builtin(
        &mut self,
        builtin: Builtin,
        callee: &Spanned<String>,
        args: &[Spanned<Expr>],
    ) -> LowerResult<Option<Reg>> {
        let Some(format) = args.first() else {
            return Err(LowerError::ArityMismatch {
                name: builtin.name().to_string(),
                expected: 1,
                found: 0,
            }
            .at(callee.span));
        };

        let mut regs = Vec::with_capacity(args.len());
        let format_reg = self.lower_operand(format)?;
        let found = self.reg_type(format_reg);
        if found != Type::BytePtr {
            return Err(LowerError::TypeMismatch {
                context: format!("format argument of `{}`", builtin.name()),
                expected: Type::BytePtr,
                found,
            }
            .at(format.span));
        }
        regs.push(format_reg);
        for arg in &args[1..] {
            regs.push(self.lower_operand(arg)?);
        }

        let block = self.current_block();
        Ok(self
            .builder
            .call(block, Callee::Builtin(builtin), regs, Type::Void))
    }

    // ─── Operators ────────────────────────────────────────────────

    fn lower_binary(
        &mut self,
        op: BinOp,
        lhs: &Spanned<Expr>,
        rhs: &Spanned<Expr>,
        span: Span,
    ) -> LowerResult<Reg> {
        self.trace.step(format!("creating binary operation {}", op));
        let l = self.lower_operand(lhs)?;
        let r = self.lower_operand(rhs)?;

        enum Kind {
            Arith(IntBinOp),
            Cmp(CmpOp),
        }
        let kind = match op {
            BinOp::Add => Kind::Arith(IntBinOp::Add),
            BinOp::Sub => Kind::Arith(IntBinOp::Sub),
            BinOp::Mul => Kind::Arith(IntBinOp::Mul),
            BinOp::Div => Kind::Arith(IntBinOp::SDiv),
            BinOp::Mod => Kind::Arith(IntBinOp::SRem),
            BinOp::Eq => Kind::Cmp(CmpOp::Eq),
            BinOp::Ne => Kind::Cmp(CmpOp::Ne),
            BinOp::Lt => Kind::Cmp(CmpOp::Slt),
            BinOp::Gt => Kind::Cmp(CmpOp::Sgt),
            BinOp::Le => Kind::Cmp(CmpOp::Sle),
            BinOp::Ge => Kind::Cmp(CmpOp::Sge),
            BinOp::Pow | BinOp::And | BinOp::Or => {
                return Err(LowerError::UnsupportedOperator(op).at(span))
            }
        };

        let (lt, rt) = (self.reg_type(l), self.reg_type(r));
        if lt != Type::Int64 || rt != Type::Int64 {
            return Err(LowerError::InvalidOperandKind(format!(
                "`{}` expects Int operands, found {} and {}",
                op,
                lt.source_name(),
                rt.source_name()
            ))
            .at(span));
        }

        // A zero divisor only known at run time still traps.
        if matches!(op, BinOp::Div | BinOp::Mod) && matches!(rhs.node, Expr::Int(0)) {
            return Err(LowerError::InvalidOperandKind(format!(
                "`{}` by a constant zero",
                op
            ))
            .at(rhs.span));
        }

        let block = self.current_block();
        Ok(match kind {
            Kind::Arith(op) => self.builder.binary(block, op, l, r),
            Kind::Cmp(op) => self.builder.cmp(block, op, l, r),
        })
    }

    /// `++x` / `--x` yield `x ± 1`. The variable itself is not updated.
    fn lower_unary(&mut self, op: UnaryOp, operand: &Spanned<Expr>) -> LowerResult<Reg> {
        self.trace.step(format!("creating unary operation {}", op));
        let value = self.lower_operand(operand)?;
        let ty = self.reg_type(value);
        if ty != Type::Int64 {
            return Err(LowerError::InvalidOperandKind(format!(
                "`{}` expects an Int operand, found {}",
                op,
                ty.source_name()
            ))
            .at(operand.span));
        }
        let block = self.current_block();
        let one = self.builder.constant(block, Const::Int(1));
        let arith = match op {
            UnaryOp::Increment => IntBinOp::Add,
            UnaryOp::Decrement => IntBinOp::Sub,
        };
        Ok(self.builder.binary(block, arith, value, one))
    }

    // ─── Assignment ───────────────────────────────────────────────

    /// Store into an existing mutable binding and yield the stored value.
    pub(super) fn lower_assign(
        &mut self,
        target: &Spanned<String>,
        value: &Spanned<Expr>,
    ) -> LowerResult<Reg> {
        self.trace
            .step(format!("creating assignment for {}", target.node));
        let binding = self
            .scopes
            .lookup(&target.node)
            .ok_or_else(|| LowerError::UndeclaredVariable(target.node.clone()).at(target.span))?;
        if !binding.mutable {
            return Err(LowerError::ReadOnlyAssignment(target.node.clone()).at(target.span));
        }

        let reg = self.lower_operand(value)?;
        let found = self.reg_type(reg);
        if found != binding.ty {
            return Err(LowerError::TypeMismatch {
                context: format!("assignment to `{}`", target.node),
                expected: binding.ty,
                found,
            }
            .at(value.span));
        }
        let block = self.current_block();
        self.builder.store(block, binding.slot, reg);
        Ok(reg)
    }
}
