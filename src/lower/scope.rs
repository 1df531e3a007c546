//! Scope stack: one frame per function body or conditional branch.
//!
//! A branch frame starts from a copy of the enclosing bindings. Bindings
//! name stack slots, so a copied binding still writes the outer variable's
//! storage; only new declarations are lost when the frame is popped.

use std::collections::BTreeMap;

use crate::ir::{BlockId, Reg, SlotId, Type};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Binding {
    pub slot: SlotId,
    pub ty: Type,
    pub mutable: bool,
}

pub type Locals = BTreeMap<String, Binding>;

#[derive(Clone, Debug)]
pub struct Frame {
    pub block: BlockId,
    pub locals: Locals,
    /// Value of a `return` seen on the current path, not yet emitted.
    pub pending_return: Option<Reg>,
    pub label: String,
    /// Every path through the frame has already returned.
    pub diverged: bool,
}

impl Frame {
    /// The path ended: either a return is pending or all branches returned.
    pub fn has_returned(&self) -> bool {
        self.pending_return.is_some() || self.diverged
    }
}

#[derive(Debug, Default)]
pub struct ScopeStack {
    frames: Vec<Frame>,
}

impl ScopeStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enter(&mut self, block: BlockId, label: &str, inherited: Option<Locals>) {
        self.frames.push(Frame {
            block,
            locals: inherited.unwrap_or_default(),
            pending_return: None,
            label: label.to_string(),
            diverged: false,
        });
    }

    /// Pop the top frame. Panics on an empty stack; frames are only popped by
    /// the code that pushed them.
    pub fn leave(&mut self) -> Frame {
        self.frames.pop().expect("scope stack underflow")
    }

    pub fn is_open(&self) -> bool {
        !self.frames.is_empty()
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    fn top(&self) -> &Frame {
        self.frames.last().expect("no open scope frame")
    }

    fn top_mut(&mut self) -> &mut Frame {
        self.frames.last_mut().expect("no open scope frame")
    }

    pub fn current_block(&self) -> BlockId {
        self.top().block
    }

    pub fn label(&self) -> &str {
        &self.top().label
    }

    /// Resolve a name in the top frame only; outer names are visible
    /// because they were copied in on entry.
    pub fn lookup(&self, name: &str) -> Option<Binding> {
        self.frames.last()?.locals.get(name).copied()
    }

    /// Bind a name in the top frame, replacing any earlier binding.
    pub fn bind(&mut self, name: &str, binding: Binding) {
        self.top_mut().locals.insert(name.to_string(), binding);
    }

    pub fn locals(&self) -> Locals {
        self.top().locals.clone()
    }

    pub fn set_return_value(&mut self, value: Reg) {
        self.top_mut().pending_return = Some(value);
    }

    pub fn pending_return_value(&self) -> Option<Reg> {
        self.top().pending_return
    }

    pub fn has_returned(&self) -> bool {
        self.frames.last().is_some_and(Frame::has_returned)
    }

    pub fn mark_diverged(&mut self) {
        self.top_mut().diverged = true;
    }

    /// Move the top frame to a new block (after a conditional), restoring
    /// the given bindings. Clears the pending return and divergence.
    pub fn set_current_block(&mut self, block: BlockId, label: &str, locals: Locals) {
        let frame = self.top_mut();
        frame.block = block;
        frame.label = label.to_string();
        frame.locals = locals;
        frame.pending_return = None;
        frame.diverged = false;
    }
}
