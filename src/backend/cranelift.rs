//! Cranelift translation of the block IR.
//!
//! IR registers map onto SSA values one to one, and IR stack slots onto
//! 8-byte explicit stack slots. `print` becomes a call to the host function
//! with the arguments spilled to a stack slot, one word each, and a second
//! slot holding one type tag byte per word.

use std::collections::HashMap;
use std::mem;

use cranelift::codegen::ir::{FuncRef, GlobalValue, StackSlot, StackSlotData, StackSlotKind};
use cranelift::codegen::isa::OwnedTargetIsa;
use cranelift::prelude::{
    settings, types, AbiParam, Block, Configurable, FunctionBuilder, FunctionBuilderContext,
    InstBuilder, IntCC, Signature, TrapCode, Value,
};
use cranelift_jit::{JITBuilder, JITModule};
use cranelift_module::{default_libcall_names, DataDescription, DataId, FuncId, Linkage, Module};
use cranelift_object::{ObjectBuilder, ObjectModule};

use super::BackendError;
use crate::ir::{self, Builtin, Callee, CmpOp, Const, Inst, IntBinOp, Reg, Terminator, Type};
use crate::runtime::{self, WordTag};

/// Slots hold one 64-bit word, 8-byte aligned.
const SLOT_SIZE: u32 = 8;
const SLOT_ALIGN_SHIFT: u8 = 3;

/// Cranelift code generator for the host machine.
#[derive(Clone, Copy, Debug, Default)]
pub struct CraneliftBackend;

impl CraneliftBackend {
    pub fn new() -> Self {
        Self
    }

    /// Compile `module` to a relocatable object file for the host. `main`
    /// is exported; the object imports the `print` host function.
    pub fn emit_object(&self, module: &ir::Module) -> Result<Vec<u8>, BackendError> {
        check(module)?;
        let isa = build_native_isa()?;
        let builder = ObjectBuilder::new(isa, module.name.as_str(), default_libcall_names())
            .map_err(codegen_error)?;
        let mut object = ObjectModule::new(builder);
        translate_module(&mut object, module)?;
        object
            .finish()
            .emit()
            .map_err(|err| BackendError::Emit(err.to_string()))
    }

    /// Compile `module` into executable memory in this process.
    pub fn jit(&self, module: &ir::Module) -> Result<JitProgram, BackendError> {
        check(module)?;
        let mut builder = JITBuilder::new(default_libcall_names()).map_err(codegen_error)?;
        builder.symbol(
            Builtin::Print.host_symbol(),
            runtime::sable_print as *const u8,
        );
        let mut jit = JITModule::new(builder);
        let ids = translate_module(&mut jit, module)?;
        jit.finalize_definitions().map_err(codegen_error)?;

        let functions = module
            .functions
            .iter()
            .filter_map(|f| {
                let id = *ids.get(&f.name)?;
                let entry = Entry {
                    id,
                    params: f.params.iter().map(|p| p.ty).collect(),
                    ret: f.ret,
                };
                Some((f.name.clone(), entry))
            })
            .collect();
        log::debug!("jit: finalized module `{}`", module.name);
        Ok(JitProgram {
            jit: Some(jit),
            functions,
        })
    }
}

// ─── JIT entry points ─────────────────────────────────────────────

struct Entry {
    id: FuncId,
    params: Vec<Type>,
    ret: Type,
}

/// A module compiled into executable memory. The memory is released when
/// the program is dropped.
pub struct JitProgram {
    jit: Option<JITModule>,
    functions: HashMap<String, Entry>,
}

impl JitProgram {
    fn entry(&self, name: &str) -> Result<(&Entry, *const u8), BackendError> {
        let entry = self
            .functions
            .get(name)
            .ok_or_else(|| BackendError::MissingFunction(name.to_string()))?;
        let jit = self
            .jit
            .as_ref()
            .ok_or_else(|| BackendError::Codegen("JIT memory was released".to_string()))?;
        Ok((entry, jit.get_finalized_function(entry.id)))
    }

    /// Run the program's `main`.
    pub fn run_main(&self) -> Result<(), BackendError> {
        self.call_void("main")
    }

    /// Call a function that takes no arguments and returns nothing.
    pub fn call_void(&self, name: &str) -> Result<(), BackendError> {
        let (entry, code) = self.entry(name)?;
        if !entry.params.is_empty() || entry.ret != Type::Void {
            return Err(BackendError::UnsupportedSignature {
                name: name.to_string(),
                reason: "expected no parameters and no result".to_string(),
            });
        }
        // SAFETY: the function was declared with an empty signature.
        let f: extern "C" fn() = unsafe { mem::transmute(code) };
        f();
        Ok(())
    }

    /// Call a function whose parameters and result are all `Int`.
    pub fn call_int(&self, name: &str, args: &[i64]) -> Result<i64, BackendError> {
        let (entry, code) = self.entry(name)?;
        let unsupported = |reason: String| BackendError::UnsupportedSignature {
            name: name.to_string(),
            reason,
        };
        if entry.ret != Type::Int64 || entry.params.iter().any(|ty| *ty != Type::Int64) {
            return Err(unsupported(
                "only Int parameters and Int results can be passed".to_string(),
            ));
        }
        if entry.params.len() != args.len() {
            return Err(unsupported(format!(
                "expects {} argument(s), got {}",
                entry.params.len(),
                args.len()
            )));
        }

        // SAFETY: the signature was checked above; every parameter and the
        // result are i64 in the platform calling convention.
        let result = unsafe {
            match *args {
                [] => mem::transmute::<*const u8, extern "C" fn() -> i64>(code)(),
                [a] => mem::transmute::<*const u8, extern "C" fn(i64) -> i64>(code)(a),
                [a, b] => mem::transmute::<*const u8, extern "C" fn(i64, i64) -> i64>(code)(a, b),
                [a, b, c] => {
                    mem::transmute::<*const u8, extern "C" fn(i64, i64, i64) -> i64>(code)(a, b, c)
                }
                [a, b, c, d] => mem::transmute::<
                    *const u8,
                    extern "C" fn(i64, i64, i64, i64) -> i64,
                >(code)(a, b, c, d),
                _ => return Err(unsupported("more than four arguments".to_string())),
            }
        };
        Ok(result)
    }
}

impl Drop for JitProgram {
    fn drop(&mut self) {
        if let Some(jit) = self.jit.take() {
            // SAFETY: no function pointer obtained from the module outlives `self`.
            unsafe { jit.free_memory() };
        }
    }
}

// ─── Module translation ───────────────────────────────────────────

struct Imports {
    print: FuncId,
    strings: Vec<DataId>,
    functions: HashMap<String, FuncId>,
    pointer: types::Type,
}

fn check(module: &ir::Module) -> Result<(), BackendError> {
    ir::verify::verify_module(module).map_err(|errors| {
        let messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
        BackendError::InvalidIr(messages.join("; "))
    })
}

fn translate_module<M: Module>(
    module: &mut M,
    ir_module: &ir::Module,
) -> Result<HashMap<String, FuncId>, BackendError> {
    let pointer = module.target_config().pointer_type();

    let mut print_sig = module.make_signature();
    print_sig.params.push(AbiParam::new(pointer));
    print_sig.params.push(AbiParam::new(pointer));
    print_sig.params.push(AbiParam::new(pointer));
    print_sig.params.push(AbiParam::new(types::I64));
    let print = module
        .declare_function(Builtin::Print.host_symbol(), Linkage::Import, &print_sig)
        .map_err(codegen_error)?;

    let mut strings = Vec::with_capacity(ir_module.globals.len());
    for global in &ir_module.globals {
        let id = module
            .declare_data(&format!("__sable{}", global.name), Linkage::Local, false, false)
            .map_err(codegen_error)?;
        let mut data = DataDescription::new();
        data.define(global.bytes.clone().into_boxed_slice());
        module.define_data(id, &data).map_err(codegen_error)?;
        strings.push(id);
    }

    let mut functions = HashMap::new();
    for func in &ir_module.functions {
        let sig = signature(module, func, pointer)?;
        let linkage = if func.name == "main" {
            Linkage::Export
        } else {
            Linkage::Local
        };
        let id = module
            .declare_function(&func.name, linkage, &sig)
            .map_err(codegen_error)?;
        functions.insert(func.name.clone(), id);
    }

    let imports = Imports {
        print,
        strings,
        functions,
        pointer,
    };

    let mut context = module.make_context();
    let mut builder_context = FunctionBuilderContext::new();
    for func in &ir_module.functions {
        let id = *imports
            .functions
            .get(&func.name)
            .ok_or_else(|| BackendError::InvalidIr(format!("undeclared function {}", func.name)))?;
        context.func.signature = signature(module, func, pointer)?;
        {
            let mut builder = FunctionBuilder::new(&mut context.func, &mut builder_context);
            translate_function(module, func, &imports, &mut builder)?;
            builder.seal_all_blocks();
            builder.finalize();
        }
        log::trace!("cranelift: defining `{}`", func.name);
        module
            .define_function(id, &mut context)
            .map_err(codegen_error)?;
        module.clear_context(&mut context);
    }

    Ok(imports.functions)
}

fn translate_function<M: Module>(
    module: &mut M,
    func: &ir::Function,
    imports: &Imports,
    b: &mut FunctionBuilder,
) -> Result<(), BackendError> {
    let blocks: Vec<Block> = func.blocks.iter().map(|_| b.create_block()).collect();
    let entry = *blocks
        .first()
        .ok_or_else(|| BackendError::InvalidIr(format!("function {} has no blocks", func.name)))?;
    b.append_block_params_for_function_params(entry);

    let slots: Vec<StackSlot> = func
        .slots
        .iter()
        .map(|_| {
            b.create_sized_stack_slot(StackSlotData::new(
                StackSlotKind::ExplicitSlot,
                SLOT_SIZE,
                SLOT_ALIGN_SHIFT,
            ))
        })
        .collect();

    let print = module.declare_func_in_func(imports.print, b.func);
    let mut callees: HashMap<&str, FuncRef> = HashMap::new();
    let mut strings: HashMap<u32, GlobalValue> = HashMap::new();
    let mut values: Vec<Option<Value>> = vec![None; func.regs.len()];

    let slot = |id: ir::SlotId| {
        slots
            .get(id.0 as usize)
            .copied()
            .ok_or_else(|| BackendError::InvalidIr(format!("unknown slot {}", id)))
    };
    let target = |id: ir::BlockId| {
        blocks
            .get(id.0 as usize)
            .copied()
            .ok_or_else(|| BackendError::InvalidIr(format!("unknown block {}", id.0)))
    };

    for (block, &clif_block) in func.blocks.iter().zip(&blocks) {
        b.switch_to_block(clif_block);

        for inst in &block.insts {
            match inst {
                Inst::Const { dst, value } => {
                    let v = match value {
                        Const::Int(n) => b.ins().iconst(types::I64, *n),
                        Const::Float(x) => b.ins().f64const(*x),
                    };
                    define(&mut values, *dst, v);
                }
                Inst::StrAddr { dst, global } => {
                    let gv = match strings.get(&global.0) {
                        Some(gv) => *gv,
                        None => {
                            let data = *imports.strings.get(global.0 as usize).ok_or_else(|| {
                                BackendError::InvalidIr(format!("unknown global .str.{}", global.0))
                            })?;
                            let gv = module.declare_data_in_func(data, b.func);
                            strings.insert(global.0, gv);
                            gv
                        }
                    };
                    let v = b.ins().global_value(imports.pointer, gv);
                    define(&mut values, *dst, v);
                }
                Inst::Param { dst, index } => {
                    let v = b
                        .block_params(entry)
                        .get(*index as usize)
                        .copied()
                        .ok_or_else(|| {
                            BackendError::InvalidIr(format!("no parameter {}", index))
                        })?;
                    define(&mut values, *dst, v);
                }
                // Slots are created up front.
                Inst::Alloca { .. } => {}
                Inst::Load { dst, slot: id } => {
                    let ty = value_type(func.reg_type(*dst), imports.pointer)?;
                    let v = b.ins().stack_load(ty, slot(*id)?, 0);
                    define(&mut values, *dst, v);
                }
                Inst::Store { slot: id, src } => {
                    let v = get(&values, *src)?;
                    b.ins().stack_store(v, slot(*id)?, 0);
                }
                Inst::Binary { dst, op, lhs, rhs } => {
                    let (l, r) = (get(&values, *lhs)?, get(&values, *rhs)?);
                    let v = match op {
                        IntBinOp::Add => b.ins().iadd(l, r),
                        IntBinOp::Sub => b.ins().isub(l, r),
                        IntBinOp::Mul => b.ins().imul(l, r),
                        IntBinOp::SDiv => b.ins().sdiv(l, r),
                        IntBinOp::SRem => b.ins().srem(l, r),
                    };
                    define(&mut values, *dst, v);
                }
                Inst::Cmp { dst, op, lhs, rhs } => {
                    let (l, r) = (get(&values, *lhs)?, get(&values, *rhs)?);
                    let v = b.ins().icmp(int_cc(*op), l, r);
                    define(&mut values, *dst, v);
                }
                Inst::Call {
                    dst,
                    callee: Callee::Function(name),
                    args,
                } => {
                    let fref = match callees.get(name.as_str()) {
                        Some(fref) => *fref,
                        None => {
                            let id = *imports.functions.get(name).ok_or_else(|| {
                                BackendError::InvalidIr(format!("unknown function {}", name))
                            })?;
                            let fref = module.declare_func_in_func(id, b.func);
                            callees.insert(name.as_str(), fref);
                            fref
                        }
                    };
                    let args = args
                        .iter()
                        .map(|r| get(&values, *r))
                        .collect::<Result<Vec<_>, _>>()?;
                    let call = b.ins().call(fref, &args);
                    if let Some(dst) = dst {
                        let v = b.inst_results(call).first().copied().ok_or_else(|| {
                            BackendError::InvalidIr(format!("{} returns no value", name))
                        })?;
                        define(&mut values, *dst, v);
                    }
                }
                Inst::Call {
                    callee: Callee::Builtin(Builtin::Print),
                    args,
                    ..
                } => {
                    let (format, rest) = args.split_first().ok_or_else(|| {
                        BackendError::InvalidIr("print without a format".to_string())
                    })?;
                    let format = get(&values, *format)?;
                    let words = b.create_sized_stack_slot(StackSlotData::new(
                        StackSlotKind::ExplicitSlot,
                        SLOT_SIZE * rest.len().max(1) as u32,
                        SLOT_ALIGN_SHIFT,
                    ));
                    let tags = b.create_sized_stack_slot(StackSlotData::new(
                        StackSlotKind::ExplicitSlot,
                        rest.len().max(1) as u32,
                        0,
                    ));
                    for (i, reg) in rest.iter().enumerate() {
                        let v = get(&values, *reg)?;
                        let ty = func.reg_type(*reg).ok_or_else(|| {
                            BackendError::InvalidIr(format!("register {} has no type", reg))
                        })?;
                        let tag = b.ins().iconst(types::I8, WordTag::of(ty) as i64);
                        b.ins().stack_store(tag, tags, i as i32);
                        let word = match ty {
                            Type::Bool => b.ins().uextend(types::I64, v),
                            Type::BytePtr if imports.pointer != types::I64 => {
                                b.ins().uextend(types::I64, v)
                            }
                            _ => v,
                        };
                        b.ins().stack_store(word, words, (8 * i) as i32);
                    }
                    let addr = b.ins().stack_addr(imports.pointer, words, 0);
                    let tag_addr = b.ins().stack_addr(imports.pointer, tags, 0);
                    let count = b.ins().iconst(types::I64, rest.len() as i64);
                    b.ins().call(print, &[format, addr, tag_addr, count]);
                }
            }
        }

        match &block.terminator {
            Some(Terminator::Return(Some(reg))) => {
                let v = get(&values, *reg)?;
                b.ins().return_(&[v]);
            }
            Some(Terminator::Return(None)) => {
                b.ins().return_(&[]);
            }
            Some(Terminator::Jump(dest)) => {
                b.ins().jump(target(*dest)?, &[]);
            }
            Some(Terminator::Branch {
                cond,
                then_dest,
                else_dest,
            }) => {
                let cond = get(&values, *cond)?;
                b.ins()
                    .brif(cond, target(*then_dest)?, &[], target(*else_dest)?, &[]);
            }
            Some(Terminator::Unreachable) => {
                b.ins().trap(TrapCode::unwrap_user(1));
            }
            None => {
                return Err(BackendError::InvalidIr(format!(
                    "block {} in {} has no terminator",
                    block.label, func.name
                )))
            }
        }
    }

    Ok(())
}

fn define(values: &mut [Option<Value>], reg: Reg, value: Value) {
    if let Some(slot) = values.get_mut(reg.0 as usize) {
        *slot = Some(value);
    }
}

fn get(values: &[Option<Value>], reg: Reg) -> Result<Value, BackendError> {
    values
        .get(reg.0 as usize)
        .copied()
        .flatten()
        .ok_or_else(|| BackendError::InvalidIr(format!("register {} used before definition", reg)))
}

fn int_cc(op: CmpOp) -> IntCC {
    match op {
        CmpOp::Eq => IntCC::Equal,
        CmpOp::Ne => IntCC::NotEqual,
        CmpOp::Slt => IntCC::SignedLessThan,
        CmpOp::Sgt => IntCC::SignedGreaterThan,
        CmpOp::Sle => IntCC::SignedLessThanOrEqual,
        CmpOp::Sge => IntCC::SignedGreaterThanOrEqual,
    }
}

fn value_type(ty: Option<Type>, pointer: types::Type) -> Result<types::Type, BackendError> {
    match ty {
        Some(Type::Int64) => Ok(types::I64),
        Some(Type::Float64) => Ok(types::F64),
        Some(Type::Bool) => Ok(types::I8),
        Some(Type::BytePtr) => Ok(pointer),
        Some(Type::Void) | None => Err(BackendError::InvalidIr(
            "void cannot be used as a value type".to_string(),
        )),
    }
}

fn signature<M: Module>(
    module: &M,
    func: &ir::Function,
    pointer: types::Type,
) -> Result<Signature, BackendError> {
    let mut sig = module.make_signature();
    for param in &func.params {
        sig.params
            .push(AbiParam::new(value_type(Some(param.ty), pointer)?));
    }
    if func.ret != Type::Void {
        sig.returns
            .push(AbiParam::new(value_type(Some(func.ret), pointer)?));
    }
    Ok(sig)
}

fn build_native_isa() -> Result<OwnedTargetIsa, BackendError> {
    let mut flags = settings::builder();
    flags.set("is_pic", "true").map_err(codegen_error)?;
    let isa_builder = cranelift_native::builder()
        .map_err(|msg| BackendError::UnsupportedHost(msg.to_string()))?;
    isa_builder
        .finish(settings::Flags::new(flags))
        .map_err(codegen_error)
}

fn codegen_error(err: impl std::fmt::Display) -> BackendError {
    BackendError::Codegen(err.to_string())
}
