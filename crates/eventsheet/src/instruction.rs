//! Conditions and actions, and the ordered lists that own them.
//!
//! Code generators cache their output per instruction list; any structural
//! mutation anywhere below a list must reach that cache. Each instruction
//! and each list therefore carries a node of an upward-pointing
//! invalidation chain: marking a node stale walks its ancestors through
//! non-owning back-references.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use crate::expression::Expression;

/// One node of the cache-invalidation chain.
///
/// The parent reference is non-owning; a detached node simply stops
/// propagating.
#[derive(Debug)]
pub(crate) struct CacheNode {
    dirty: Cell<bool>,
    parent: RefCell<Weak<CacheNode>>,
}

impl CacheNode {
    /// A fresh node starts dirty: nothing has been generated from it yet.
    pub(crate) fn new() -> Rc<CacheNode> {
        Rc::new(CacheNode {
            dirty: Cell::new(true),
            parent: RefCell::new(Weak::new()),
        })
    }

    pub(crate) fn attach(&self, parent: &Rc<CacheNode>) {
        *self.parent.borrow_mut() = Rc::downgrade(parent);
    }

    pub(crate) fn is_dirty(&self) -> bool {
        self.dirty.get()
    }

    pub(crate) fn set_clean(&self) {
        self.dirty.set(false);
    }

    /// Mark this node and every ancestor stale.
    pub(crate) fn invalidate(&self) {
        self.dirty.set(true);
        let mut parent = self.parent.borrow().upgrade();
        while let Some(node) = parent {
            node.dirty.set(true);
            parent = node.parent.borrow().upgrade();
        }
    }
}

// ----------------------------------------------------------------------------

/// One condition or one action.
///
/// Parameters are positional and match the declared parameter order of the
/// instruction type's metadata. Some instruction types nest further
/// conditions or actions under `sub_instructions`.
#[derive(Debug)]
pub struct Instruction {
    instruction_type: String,
    /// Only meaningful when the instruction is used as a condition.
    inverted: bool,
    parameters: Vec<Expression>,
    sub_instructions: InstructionsList,
    cache: Rc<CacheNode>,
}

impl Instruction {
    pub fn new<S: Into<String>>(instruction_type: S) -> Instruction {
        let cache = CacheNode::new();
        let sub_instructions = InstructionsList::new();
        sub_instructions.cache.attach(&cache);
        Instruction {
            instruction_type: instruction_type.into(),
            inverted: false,
            parameters: Vec::new(),
            sub_instructions,
            cache,
        }
    }

    pub fn instruction_type(&self) -> &str {
        &self.instruction_type
    }

    pub fn set_instruction_type<S: Into<String>>(&mut self, instruction_type: S) {
        self.instruction_type = instruction_type.into();
        self.cache.invalidate();
    }

    pub fn is_inverted(&self) -> bool {
        self.inverted
    }

    pub fn set_inverted(&mut self, inverted: bool) {
        self.inverted = inverted;
        self.cache.invalidate();
    }

    pub fn parameters(&self) -> &[Expression] {
        &self.parameters
    }

    pub fn parameters_count(&self) -> usize {
        self.parameters.len()
    }

    pub fn parameter(&self, index: usize) -> Option<&Expression> {
        self.parameters.get(index)
    }

    /// The parameter at `index`, or a blank expression when the index is
    /// out of range.
    pub fn parameter_or_blank(&self, index: usize) -> Expression {
        self.parameters.get(index).cloned().unwrap_or_default()
    }

    /// Set the parameter at `index`, growing the list with blank
    /// expressions if needed.
    pub fn set_parameter(&mut self, index: usize, expression: Expression) {
        if index >= self.parameters.len() {
            self.parameters.resize_with(index + 1, Expression::default);
        }
        self.parameters[index] = expression;
        self.cache.invalidate();
    }

    pub fn set_parameters(&mut self, parameters: Vec<Expression>) {
        self.parameters = parameters;
        self.cache.invalidate();
    }

    pub fn set_parameters_count(&mut self, count: usize) {
        self.parameters.resize_with(count, Expression::default);
        self.cache.invalidate();
    }

    /// Direct mutable access to the parameters. Conservatively counts as a
    /// mutation.
    pub fn parameters_mut(&mut self) -> &mut Vec<Expression> {
        self.cache.invalidate();
        &mut self.parameters
    }

    pub fn sub_instructions(&self) -> &InstructionsList {
        &self.sub_instructions
    }

    /// Mutations of the sub-list propagate here through the chain.
    pub fn sub_instructions_mut(&mut self) -> &mut InstructionsList {
        &mut self.sub_instructions
    }

    pub fn is_dirty(&self) -> bool {
        self.cache.is_dirty()
    }

    /// Clear the stale flag of this instruction and everything below it,
    /// after regenerating from it.
    pub fn mark_clean(&self) {
        self.cache.set_clean();
        self.sub_instructions.mark_clean();
    }

    pub(crate) fn cache(&self) -> &Rc<CacheNode> {
        &self.cache
    }
}

impl Clone for Instruction {
    /// A deep, independent copy. The copy's invalidation chain is freshly
    /// wired and starts dirty; it is not attached to any list yet.
    fn clone(&self) -> Instruction {
        let cache = CacheNode::new();
        let sub_instructions = self.sub_instructions.clone();
        sub_instructions.cache.attach(&cache);
        Instruction {
            instruction_type: self.instruction_type.clone(),
            inverted: self.inverted,
            parameters: self.parameters.clone(),
            sub_instructions,
            cache,
        }
    }
}

impl PartialEq for Instruction {
    /// Value equality, ignoring the transient cache state.
    fn eq(&self, other: &Instruction) -> bool {
        self.instruction_type == other.instruction_type
            && self.inverted == other.inverted
            && self.parameters == other.parameters
            && self.sub_instructions == other.sub_instructions
    }
}

impl Eq for Instruction {}

// ----------------------------------------------------------------------------

/// An ordered sequence of owned instructions.
#[derive(Debug)]
pub struct InstructionsList {
    instructions: Vec<Instruction>,
    pub(crate) cache: Rc<CacheNode>,
}

impl Default for InstructionsList {
    fn default() -> InstructionsList {
        InstructionsList::new()
    }
}

impl InstructionsList {
    pub fn new() -> InstructionsList {
        InstructionsList {
            instructions: Vec::new(),
            cache: CacheNode::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Instruction> {
        self.instructions.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Instruction> {
        self.instructions.get_mut(index)
    }

    pub fn iter(&self) -> std::slice::Iter<Instruction> {
        self.instructions.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<Instruction> {
        self.instructions.iter_mut()
    }

    pub fn push(&mut self, instruction: Instruction) {
        let at = self.instructions.len();
        self.insert(instruction, at);
    }

    /// Insert at `position`, appending when the position is out of range.
    pub fn insert(&mut self, instruction: Instruction, position: usize) {
        instruction.cache.attach(&self.cache);
        let position = position.min(self.instructions.len());
        self.instructions.insert(position, instruction);
        self.cache.invalidate();
    }

    /// Copy-insert the instructions of `other` in `[begin, min(end, len-1)]`
    /// at `position`. A no-op when `begin` is out of range or `end < begin`.
    pub fn insert_range(
        &mut self,
        other: &InstructionsList,
        begin: usize,
        end: usize,
        position: usize,
    ) {
        if begin >= other.len() || end < begin {
            return;
        }
        let end = end.min(other.len() - 1);
        let mut position = position.min(self.instructions.len());
        for instruction in &other.instructions[begin..=end] {
            let copy = instruction.clone();
            copy.cache.attach(&self.cache);
            self.instructions.insert(position, copy);
            position += 1;
        }
        self.cache.invalidate();
    }

    pub fn remove_at(&mut self, index: usize) {
        if index < self.instructions.len() {
            self.instructions.remove(index);
            self.cache.invalidate();
        }
    }

    /// Remove the first instruction value-equal to `target`.
    pub fn remove_first(&mut self, target: &Instruction) {
        if let Some(index) = self
            .instructions
            .iter()
            .position(|instruction| instruction == target)
        {
            self.instructions.remove(index);
            self.cache.invalidate();
        }
    }

    pub fn clear(&mut self) {
        self.instructions.clear();
        self.cache.invalidate();
    }

    pub fn is_dirty(&self) -> bool {
        self.cache.is_dirty()
    }

    /// Clear the stale flags of this list and everything below it.
    pub fn mark_clean(&self) {
        self.cache.set_clean();
        for instruction in &self.instructions {
            instruction.mark_clean();
        }
    }
}

impl Clone for InstructionsList {
    /// A deep, independent copy with a freshly wired invalidation chain.
    fn clone(&self) -> InstructionsList {
        let cache = CacheNode::new();
        let instructions = self
            .instructions
            .iter()
            .map(|instruction| {
                let copy = instruction.clone();
                copy.cache.attach(&cache);
                copy
            })
            .collect();
        InstructionsList { instructions, cache }
    }
}

impl PartialEq for InstructionsList {
    fn eq(&self, other: &InstructionsList) -> bool {
        self.instructions == other.instructions
    }
}

impl Eq for InstructionsList {}

impl<'a> IntoIterator for &'a InstructionsList {
    type Item = &'a Instruction;
    type IntoIter = std::slice::Iter<'a, Instruction>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mutation_invalidates_ancestors() {
        let mut list = InstructionsList::new();
        let mut compound = Instruction::new("BuiltinCommonInstructions::And");
        compound
            .sub_instructions_mut()
            .push(Instruction::new("KeyPressed"));
        list.push(compound);
        list.mark_clean();
        assert!(!list.is_dirty());

        let nested = list
            .get_mut(0)
            .and_then(|i| i.sub_instructions_mut().get_mut(0))
            .unwrap();
        nested.set_parameter(0, Expression::new("\"Space\""));
        assert!(list.is_dirty());
        assert!(list.get(0).unwrap().is_dirty());
    }

    #[test]
    fn clone_is_independent_and_dirty() {
        let mut source = InstructionsList::new();
        let mut instruction = Instruction::new("VarScene");
        instruction.set_parameter(0, Expression::new("score"));
        source.push(instruction);
        source.mark_clean();

        let mut copy = source.clone();
        assert_eq!(copy, source);
        assert!(copy.is_dirty());

        copy.get_mut(0).unwrap().set_inverted(true);
        assert!(!source.get(0).unwrap().is_inverted());
        assert!(!source.is_dirty());
    }

    #[test]
    fn bulk_insert_range_bounds() {
        let mut source = InstructionsList::new();
        for name in ["a", "b", "c"] {
            source.push(Instruction::new(name));
        }

        let mut target = InstructionsList::new();
        target.insert_range(&source, 5, 2, 0);
        assert!(target.is_empty());
        target.insert_range(&source, 2, 0, 0);
        assert!(target.is_empty());

        target.insert_range(&source, 1, 100, 0);
        assert_eq!(target.len(), 2);
        assert_eq!(target.get(0).unwrap().instruction_type(), "b");
        assert_eq!(target.get(1).unwrap().instruction_type(), "c");
    }

    #[test]
    fn remove_first_match_only() {
        let mut list = InstructionsList::new();
        list.push(Instruction::new("Same"));
        list.push(Instruction::new("Same"));

        let target = Instruction::new("Same");
        list.remove_first(&target);
        assert_eq!(list.len(), 1);
        list.remove_first(&Instruction::new("Absent"));
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn out_of_range_parameter_is_blank() {
        let instruction = Instruction::new("Delete");
        assert!(instruction.parameter(3).is_none());
        assert!(instruction.parameter_or_blank(3).is_empty());
    }
}
