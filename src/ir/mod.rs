//! Typed block IR between the AST and the backend.
//!
//! A `Module` owns string globals and functions. A `Function` is a list of
//! basic blocks; each block holds straight-line instructions and exactly one
//! terminator. Values live in virtual registers (`%N`), each with a fixed
//! type; variables live in stack slots (`$N`) accessed by `load`/`store`.
//! Registers, slots and blocks are numbered per function from zero, so the
//! same AST always lowers to the same text.

pub mod builder;
pub mod display;
pub mod verify;

// ─── Types ────────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Type {
    Void,
    Int64,
    Float64,
    /// Result of a comparison. Never stored in a slot.
    Bool,
    /// Pointer to the first byte of a read-only, NUL-terminated string.
    BytePtr,
}

impl Type {
    /// Resolve a declared variable or parameter type name.
    pub fn from_decl_name(name: &str) -> Option<Type> {
        match name {
            "Int" => Some(Type::Int64),
            "Double" => Some(Type::Float64),
            "String" => Some(Type::BytePtr),
            _ => None,
        }
    }

    /// Resolve a declared return type name. `Void` is only valid here.
    pub fn from_return_name(name: &str) -> Option<Type> {
        match name {
            "Void" => Some(Type::Void),
            other => Type::from_decl_name(other),
        }
    }

    /// The name a source program uses for this type.
    pub fn source_name(&self) -> &'static str {
        match self {
            Type::Void => "Void",
            Type::Int64 => "Int",
            Type::Float64 => "Double",
            Type::Bool => "Bool",
            Type::BytePtr => "String",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Type::Void => "void",
            Type::Int64 => "i64",
            Type::Float64 => "f64",
            Type::Bool => "bool",
            Type::BytePtr => "ptr",
        }
    }
}

// ─── Identifiers ──────────────────────────────────────────────────

/// A virtual register, defined exactly once.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Reg(pub u32);

/// A stack slot holding one variable.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SlotId(pub u32);

/// Index into `Function::blocks`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BlockId(pub u32);

/// Index into `Module::functions`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FuncId(pub u32);

/// Index into `Module::globals`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GlobalId(pub u32);

// ─── Instructions ─────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Const {
    Int(i64),
    Float(f64),
}

impl Const {
    pub fn ty(&self) -> Type {
        match self {
            Const::Int(_) => Type::Int64,
            Const::Float(_) => Type::Float64,
        }
    }
}

/// Integer arithmetic. Division and remainder are signed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IntBinOp {
    Add,
    Sub,
    Mul,
    SDiv,
    SRem,
}

impl IntBinOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            IntBinOp::Add => "add",
            IntBinOp::Sub => "sub",
            IntBinOp::Mul => "mul",
            IntBinOp::SDiv => "sdiv",
            IntBinOp::SRem => "srem",
        }
    }
}

/// Signed integer comparison.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Ne,
    Slt,
    Sgt,
    Sle,
    Sge,
}

impl CmpOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            CmpOp::Eq => "eq",
            CmpOp::Ne => "ne",
            CmpOp::Slt => "slt",
            CmpOp::Sgt => "sgt",
            CmpOp::Sle => "sle",
            CmpOp::Sge => "sge",
        }
    }
}

/// Host functions the language binds by name.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Builtin {
    /// Formatted output: a format string followed by any number of arguments.
    Print,
}

impl Builtin {
    pub fn from_name(name: &str) -> Option<Builtin> {
        match name {
            "print" => Some(Builtin::Print),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Builtin::Print => "print",
        }
    }

    /// Symbol the backend links the builtin against.
    pub fn host_symbol(&self) -> &'static str {
        match self {
            Builtin::Print => "__sable_print",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Callee {
    Function(String),
    Builtin(Builtin),
}

#[derive(Clone, Debug, PartialEq)]
pub enum Inst {
    /// dst = constant
    Const { dst: Reg, value: Const },
    /// dst = address of the first byte of a string global
    StrAddr { dst: Reg, global: GlobalId },
    /// dst = incoming argument `index`
    Param { dst: Reg, index: u32 },
    /// Reserve the storage for a declared variable.
    Alloca { slot: SlotId },
    /// dst = *slot
    Load { dst: Reg, slot: SlotId },
    /// *slot = src
    Store { slot: SlotId, src: Reg },
    /// dst = lhs op rhs
    Binary {
        dst: Reg,
        op: IntBinOp,
        lhs: Reg,
        rhs: Reg,
    },
    /// dst = lhs cmp rhs (Bool)
    Cmp {
        dst: Reg,
        op: CmpOp,
        lhs: Reg,
        rhs: Reg,
    },
    Call {
        dst: Option<Reg>,
        callee: Callee,
        args: Vec<Reg>,
    },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Terminator {
    Return(Option<Reg>),
    Jump(BlockId),
    Branch {
        cond: Reg,
        then_dest: BlockId,
        else_dest: BlockId,
    },
    Unreachable,
}

// ─── Containers ───────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq)]
pub struct Block {
    pub label: String,
    pub insts: Vec<Inst>,
    /// `None` only while the block is under construction.
    pub terminator: Option<Terminator>,
}

impl Block {
    pub fn new(label: String) -> Self {
        Self {
            label,
            insts: Vec::new(),
            terminator: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Slot {
    pub name: String,
    pub ty: Type,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Param {
    pub name: String,
    pub ty: Type,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Function {
    pub name: String,
    pub params: Vec<Param>,
    pub ret: Type,
    pub blocks: Vec<Block>,
    pub slots: Vec<Slot>,
    /// Type of every register, indexed by `Reg.0`.
    pub regs: Vec<Type>,
}

impl Function {
    pub fn new(name: String, params: Vec<Param>, ret: Type) -> Self {
        Self {
            name,
            params,
            ret,
            blocks: Vec::new(),
            slots: Vec::new(),
            regs: Vec::new(),
        }
    }

    pub fn reg_type(&self, reg: Reg) -> Option<Type> {
        self.regs.get(reg.0 as usize).copied()
    }

    pub fn block(&self, id: BlockId) -> Option<&Block> {
        self.blocks.get(id.0 as usize)
    }

    pub fn block_by_label(&self, label: &str) -> Option<&Block> {
        self.blocks.iter().find(|b| b.label == label)
    }

    /// A function declared but whose body has not been lowered yet.
    pub fn is_declaration(&self) -> bool {
        self.blocks.is_empty()
    }

    /// All instructions in block order.
    pub fn insts(&self) -> impl Iterator<Item = &Inst> {
        self.blocks.iter().flat_map(|b| b.insts.iter())
    }
}

/// A read-only byte array. `bytes` carries the trailing NUL.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Global {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl Global {
    /// The bytes without the trailing NUL, as text.
    pub fn text(&self) -> String {
        let bytes = self.bytes.strip_suffix(&[0]).unwrap_or(&self.bytes);
        String::from_utf8_lossy(bytes).into_owned()
    }
}

/// The compilation unit handed to the backend.
#[derive(Clone, Debug, PartialEq)]
pub struct Module {
    pub name: String,
    pub globals: Vec<Global>,
    pub functions: Vec<Function>,
}

impl Module {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            globals: Vec::new(),
            functions: Vec::new(),
        }
    }

    /// Add a string constant. Each call creates a new global, even for
    /// repeated text.
    pub fn add_string(&mut self, text: &str) -> GlobalId {
        let id = GlobalId(self.globals.len() as u32);
        let mut bytes = text.as_bytes().to_vec();
        bytes.push(0);
        self.globals.push(Global {
            name: format!(".str.{}", id.0),
            bytes,
        });
        id
    }

    /// Declare a function signature; its body is attached later with
    /// [`Module::define_function`].
    pub fn declare_function(&mut self, name: &str, params: Vec<Param>, ret: Type) -> FuncId {
        let id = FuncId(self.functions.len() as u32);
        self.functions
            .push(Function::new(name.to_string(), params, ret));
        id
    }

    pub fn define_function(&mut self, id: FuncId, function: Function) {
        if let Some(slot) = self.functions.get_mut(id.0 as usize) {
            *slot = function;
        }
    }

    pub fn find_function(&self, name: &str) -> Option<(FuncId, &Function)> {
        self.functions
            .iter()
            .enumerate()
            .find(|(_, f)| f.name == name)
            .map(|(i, f)| (FuncId(i as u32), f))
    }

    pub fn global(&self, id: GlobalId) -> Option<&Global> {
        self.globals.get(id.0 as usize)
    }

    /// BLAKE3 hash of the printed module. Equal modules hash equal.
    pub fn fingerprint(&self) -> blake3::Hash {
        blake3::hash(self.to_string().as_bytes())
    }
}
