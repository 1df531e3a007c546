//! AST → IR lowering.
//!
//! One `Lowering` context lives for a single `compile` call. It owns the
//! module under construction, the builder of the function currently being
//! filled, the scope stack, collected diagnostics and the trace.
//!
//! Lowering is a depth-first walk. Statements are the unit of recovery: a
//! failing statement is reported and skipped, and the walk goes on so that
//! every problem in the program is reported at once.

pub mod error;
mod expr;
pub mod scope;
mod stmt;
#[cfg(test)]
mod tests;

use std::mem;

use crate::ast;
use crate::config::CompileOptions;
use crate::diagnostic::Diagnostic;
use crate::ir::builder::FunctionBuilder;
use crate::ir::verify::verify_module;
use crate::ir::{BlockId, Builtin, Module, Param, Reg, Terminator, Type};
use crate::span::{Span, Spanned};
use crate::trace::Trace;

use error::{LowerError, LowerResult};
use scope::{Binding, Frame, Locals, ScopeStack};

/// A lowered program.
#[derive(Clone, Debug)]
pub struct Compiled {
    pub module: Module,
    /// Non-fatal diagnostics, such as unreachable statements.
    pub warnings: Vec<Diagnostic>,
    /// Numbered trace lines; empty unless `verbose` was set.
    pub trace: Vec<String>,
}

/// Lower a root block into a module whose first function is `main`.
///
/// Fails with every error diagnostic (warnings included) if any statement
/// could not be lowered.
pub fn compile(
    root: &ast::Block,
    options: &CompileOptions,
) -> Result<Compiled, Vec<Diagnostic>> {
    let mut module = Module::new(options.module_name.clone());
    let main_id = module.declare_function("main", Vec::new(), Type::Void);
    let mut lw = Lowering {
        module,
        builder: FunctionBuilder::new(main_id, "main", Vec::new(), Type::Void),
        scopes: ScopeStack::new(),
        diagnostics: Vec::new(),
        trace: Trace::new(options.verbose),
    };

    lw.trace.step("generating code");
    let entry = lw.create_block("entry");
    let (_, frame) = lw.in_frame(entry, "entry", None, |lw| lw.lower_block(root));
    lw.finish_body(frame, Span::dummy());
    lw.trace.step("code generation complete");

    let Lowering {
        mut module,
        builder,
        mut diagnostics,
        trace,
        ..
    } = lw;
    let (id, main) = builder.finish();
    module.define_function(id, main);

    if diagnostics.iter().any(Diagnostic::is_error) {
        return Err(diagnostics);
    }
    if let Err(errors) = verify_module(&module) {
        diagnostics.extend(errors.into_iter().map(|e| {
            Diagnostic::error(format!("malformed IR: {}", e), Span::dummy())
                .with_note("this is a compiler bug".to_string())
        }));
        return Err(diagnostics);
    }

    log::debug!(
        "lowered module `{}`: {} function(s), {} string(s)",
        module.name,
        module.functions.len(),
        module.globals.len()
    );
    Ok(Compiled {
        module,
        warnings: diagnostics,
        trace: trace.into_lines(),
    })
}

pub(crate) struct Lowering {
    module: Module,
    builder: FunctionBuilder,
    scopes: ScopeStack,
    diagnostics: Vec<Diagnostic>,
    trace: Trace,
}

impl Lowering {
    // ─── Frames and blocks ────────────────────────────────────────

    fn create_block(&mut self, label: &str) -> BlockId {
        self.trace.step(format!("creating block {}", label));
        self.builder.create_block(label)
    }

    /// Run `f` with a new frame on top of the scope stack. The frame is
    /// popped when `f` returns and handed back with `f`'s result.
    fn in_frame<T>(
        &mut self,
        block: BlockId,
        label: &str,
        inherited: Option<Locals>,
        f: impl FnOnce(&mut Self) -> T,
    ) -> (T, Frame) {
        self.trace.step(format!("pushing block {}", label));
        self.scopes.enter(block, label, inherited);
        let depth = self.scopes.depth();
        let out = f(self);
        debug_assert_eq!(self.scopes.depth(), depth, "unbalanced scope frames");
        let frame = self.scopes.leave();
        self.trace.step(format!("popping block {}", frame.label));
        (out, frame)
    }

    fn current_block(&self) -> BlockId {
        self.scopes.current_block()
    }

    /// `ret`, with the value only when the function returns one.
    fn emit_return(&mut self, block: BlockId, value: Reg) {
        let term = if self.builder.return_type() == Type::Void {
            Terminator::Return(None)
        } else {
            Terminator::Return(Some(value))
        };
        self.builder.terminate(block, term);
    }

    /// Terminate the last block of a function body.
    fn finish_body(&mut self, frame: Frame, name_span: Span) {
        if frame.diverged {
            return;
        }
        match frame.pending_return {
            Some(value) => self.emit_return(frame.block, value),
            None if self.builder.return_type() == Type::Void => {
                self.builder.terminate(frame.block, Terminator::Return(None))
            }
            None => {
                let name = self.builder.name().to_string();
                self.report(LowerError::MissingReturn(name).at(name_span));
                self.builder.terminate(frame.block, Terminator::Unreachable);
            }
        }
    }

    // ─── Diagnostics ──────────────────────────────────────────────

    fn report(&mut self, err: Spanned<LowerError>) {
        log::trace!("lowering error: {}", err.node);
        self.trace.step(format!("error: {}", err.node));
        self.diagnostics.push(err.into());
    }

    fn warn(&mut self, message: &str, span: Span) {
        self.diagnostics
            .push(Diagnostic::warning(message.to_string(), span));
    }

    // ─── Functions ────────────────────────────────────────────────

    /// Declare and lower a nested function. The function is declared before
    /// its body so the body can call it.
    fn lower_function(&mut self, decl: &ast::FnDecl) -> LowerResult<Option<Reg>> {
        let name = decl.name.node.as_str();
        if Builtin::from_name(name).is_some() || self.module.find_function(name).is_some() {
            return Err(LowerError::DuplicateFunction(name.to_string()).at(decl.name.span));
        }
        let ret = Type::from_return_name(&decl.return_ty.node).ok_or_else(|| {
            LowerError::UnknownType(decl.return_ty.node.clone()).at(decl.return_ty.span)
        })?;
        let params = decl
            .params
            .iter()
            .map(|p| {
                Type::from_decl_name(&p.ty.node)
                    .map(|ty| Param {
                        name: p.name.node.clone(),
                        ty,
                    })
                    .ok_or_else(|| LowerError::UnknownType(p.ty.node.clone()).at(p.ty.span))
            })
            .collect::<LowerResult<Vec<_>>>()?;

        self.trace.step(format!("creating function: {}", name));
        let id = self.module.declare_function(name, params.clone(), ret);
        let outer = mem::replace(
            &mut self.builder,
            FunctionBuilder::new(id, name, params.clone(), ret),
        );

        let entry = self.create_block("entry");
        let (_, frame) = self.in_frame(entry, "entry", None, |lw| {
            for (index, param) in params.iter().enumerate() {
                let arg = lw.builder.param(entry, index as u32, param.ty);
                let slot = lw.builder.alloca(entry, &param.name, param.ty);
                lw.builder.store(entry, slot, arg);
                lw.scopes.bind(
                    &param.name,
                    Binding {
                        slot,
                        ty: param.ty,
                        mutable: param.ty != Type::BytePtr,
                    },
                );
            }
            lw.lower_block(&decl.body)
        });
        self.finish_body(frame, decl.name.span);

        let (id, func) = mem::replace(&mut self.builder, outer).finish();
        self.module.define_function(id, func);
        Ok(None)
    }
}
