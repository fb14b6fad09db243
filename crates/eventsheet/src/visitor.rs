//! Traversal of the event tree.
//!
//! Workers are hook bundles; the walk functions own the iteration
//! discipline so no worker can get deletion-during-iteration wrong:
//! deleting the element at index `i` never advances `i`, because the next
//! element has just shifted into that slot. Hooks signal through return
//! values, never by unwinding.
//!
//! Two orthogonal axes: mutating vs read-only, and context-free vs scoped
//! (threading a nested local-variable scope through recursion).

use crate::event::{Event, EventsList, Variable, VariablesContainer};
use crate::expression::Expression;
use crate::instruction::{Instruction, InstructionsList};

/// What a mutating hook wants done with the element it just saw.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum VisitAction {
    Continue,
    /// Remove the visited element; its children are not visited.
    Delete,
}

// ----------------------------------------------------------------------------
// Context-free traversal

/// Hooks for a mutating traversal.
pub trait EventsWorker {
    fn on_events_list(&mut self, _events: &mut EventsList) {}
    fn on_event(&mut self, _event: &mut Event) -> VisitAction {
        VisitAction::Continue
    }
    fn on_instructions_list(&mut self, _instructions: &mut InstructionsList, _are_conditions: bool) {}
    fn on_instruction(&mut self, _instruction: &mut Instruction, _is_condition: bool) -> VisitAction {
        VisitAction::Continue
    }
    fn on_expression(&mut self, _expression: &mut Expression) {}
}

/// Visit every event in the list, depth first. Condition lists come
/// before action lists, then event-level expressions, then sub-events.
pub fn walk_events<W: EventsWorker + ?Sized>(worker: &mut W, events: &mut EventsList) {
    worker.on_events_list(events);
    let mut i = 0;
    while i < events.len() {
        let mut delete = false;
        if let Some(event) = events.get_mut(i) {
            if worker.on_event(event) == VisitAction::Delete {
                delete = true;
            } else {
                for list in event.condition_lists_mut() {
                    walk_instructions(worker, list, true);
                }
                for list in event.action_lists_mut() {
                    walk_instructions(worker, list, false);
                }
                for expression in event.expressions_mut() {
                    worker.on_expression(expression);
                }
                if let Some(sub_events) = event.sub_events_mut() {
                    walk_events(worker, sub_events);
                }
            }
        }
        if delete {
            events.remove_at(i);
        } else {
            i += 1;
        }
    }
}

/// Visit every instruction of the list, recursing into sub-instructions
/// and parameter expressions of each kept instruction.
pub fn walk_instructions<W: EventsWorker + ?Sized>(
    worker: &mut W,
    instructions: &mut InstructionsList,
    are_conditions: bool,
) {
    worker.on_instructions_list(instructions, are_conditions);
    let mut i = 0;
    while i < instructions.len() {
        let mut delete = false;
        if let Some(instruction) = instructions.get_mut(i) {
            if worker.on_instruction(instruction, are_conditions) == VisitAction::Delete {
                delete = true;
            } else {
                for expression in instruction.parameters_mut() {
                    worker.on_expression(expression);
                }
                walk_instructions(worker, instruction.sub_instructions_mut(), are_conditions);
            }
        }
        if delete {
            instructions.remove_at(i);
        } else {
            i += 1;
        }
    }
}

// ----------------------------------------------------------------------------
// Read-only traversal with early cancellation

/// Hooks for a read-only traversal. Returning `true` from any hook stops
/// the whole walk: every active loop unwinds without visiting remaining
/// siblings.
pub trait ReadOnlyEventsWorker {
    fn on_events_list(&mut self, _events: &EventsList) -> bool {
        false
    }
    fn on_event(&mut self, _event: &Event) -> bool {
        false
    }
    fn on_instruction(&mut self, _instruction: &Instruction, _is_condition: bool) -> bool {
        false
    }
    fn on_expression(&mut self, _expression: &Expression) -> bool {
        false
    }
}

/// Returns `true` if the walk was stopped early.
pub fn walk_events_readonly<W: ReadOnlyEventsWorker + ?Sized>(
    worker: &mut W,
    events: &EventsList,
) -> bool {
    if worker.on_events_list(events) {
        return true;
    }
    for event in events {
        if worker.on_event(event) {
            return true;
        }
        for list in event.condition_lists() {
            if walk_instructions_readonly(worker, list, true) {
                return true;
            }
        }
        for list in event.action_lists() {
            if walk_instructions_readonly(worker, list, false) {
                return true;
            }
        }
        if let Some(object) = event.object_to_pick() {
            if worker.on_expression(object) {
                return true;
            }
        }
        if let Some(sub_events) = event.sub_events() {
            if walk_events_readonly(worker, sub_events) {
                return true;
            }
        }
    }
    false
}

pub fn walk_instructions_readonly<W: ReadOnlyEventsWorker + ?Sized>(
    worker: &mut W,
    instructions: &InstructionsList,
    are_conditions: bool,
) -> bool {
    for instruction in instructions {
        if worker.on_instruction(instruction, are_conditions) {
            return true;
        }
        for expression in instruction.parameters() {
            if worker.on_expression(expression) {
                return true;
            }
        }
        if walk_instructions_readonly(worker, instruction.sub_instructions(), are_conditions) {
            return true;
        }
    }
    false
}

// ----------------------------------------------------------------------------
// Scoped traversal

/// The stack of local-variable frames in effect at the current point of a
/// scoped traversal. Inner frames shadow outer ones; frames push and pop
/// strictly with recursion, mirroring call/return.
#[derive(Debug, Clone, Default)]
pub struct EventsScope {
    frames: Vec<VariablesContainer>,
}

impl EventsScope {
    pub fn new() -> EventsScope {
        EventsScope::default()
    }

    /// Resolve a variable name against the innermost frame declaring it.
    pub fn get(&self, name: &str) -> Option<&Variable> {
        self.frames.iter().rev().find_map(|frame| frame.get(name))
    }

    pub fn has(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    fn push(&mut self, frame: VariablesContainer) {
        self.frames.push(frame);
    }

    fn pop(&mut self) {
        self.frames.pop();
    }
}

/// Hooks for a mutating traversal that threads the variable scope.
pub trait ScopedEventsWorker {
    fn on_event(&mut self, _event: &mut Event, _scope: &EventsScope) -> VisitAction {
        VisitAction::Continue
    }
    fn on_instruction(
        &mut self,
        _instruction: &mut Instruction,
        _is_condition: bool,
        _scope: &EventsScope,
    ) -> VisitAction {
        VisitAction::Continue
    }
    fn on_expression(&mut self, _expression: &mut Expression, _scope: &EventsScope) {}
}

/// Like [`walk_events`], but events declaring local variables layer them
/// onto the scope for themselves and their descendants only.
pub fn walk_events_scoped<W: ScopedEventsWorker + ?Sized>(
    worker: &mut W,
    events: &mut EventsList,
    scope: &mut EventsScope,
) {
    let mut i = 0;
    while i < events.len() {
        let frame = events
            .get(i)
            .and_then(|event| event.local_variables())
            .cloned();
        let pushed = frame.is_some();
        if let Some(frame) = frame {
            scope.push(frame);
        }

        let mut delete = false;
        if let Some(event) = events.get_mut(i) {
            if worker.on_event(event, scope) == VisitAction::Delete {
                delete = true;
            } else {
                for list in event.condition_lists_mut() {
                    walk_instructions_scoped(worker, list, true, scope);
                }
                for list in event.action_lists_mut() {
                    walk_instructions_scoped(worker, list, false, scope);
                }
                for expression in event.expressions_mut() {
                    worker.on_expression(expression, scope);
                }
                if let Some(sub_events) = event.sub_events_mut() {
                    walk_events_scoped(worker, sub_events, scope);
                }
            }
        }

        if pushed {
            scope.pop();
        }
        if delete {
            events.remove_at(i);
        } else {
            i += 1;
        }
    }
}

pub fn walk_instructions_scoped<W: ScopedEventsWorker + ?Sized>(
    worker: &mut W,
    instructions: &mut InstructionsList,
    are_conditions: bool,
    scope: &EventsScope,
) {
    let mut i = 0;
    while i < instructions.len() {
        let mut delete = false;
        if let Some(instruction) = instructions.get_mut(i) {
            if worker.on_instruction(instruction, are_conditions, scope) == VisitAction::Delete {
                delete = true;
            } else {
                for expression in instruction.parameters_mut() {
                    worker.on_expression(expression, scope);
                }
                walk_instructions_scoped(
                    worker,
                    instruction.sub_instructions_mut(),
                    are_conditions,
                    scope,
                );
            }
        }
        if delete {
            instructions.remove_at(i);
        } else {
            i += 1;
        }
    }
}

/// Hooks for a read-only scoped traversal; `true` stops the walk.
pub trait ReadOnlyScopedEventsWorker {
    fn on_event(&mut self, _event: &Event, _scope: &EventsScope) -> bool {
        false
    }
    fn on_instruction(
        &mut self,
        _instruction: &Instruction,
        _is_condition: bool,
        _scope: &EventsScope,
    ) -> bool {
        false
    }
    fn on_expression(&mut self, _expression: &Expression, _scope: &EventsScope) -> bool {
        false
    }
}

/// Returns `true` if the walk was stopped early. The scope is restored to
/// the caller's frames even on early exit.
pub fn walk_events_scoped_readonly<W: ReadOnlyScopedEventsWorker + ?Sized>(
    worker: &mut W,
    events: &EventsList,
    scope: &mut EventsScope,
) -> bool {
    for event in events {
        let pushed = match event.local_variables() {
            Some(variables) => {
                scope.push(variables.clone());
                true
            }
            None => false,
        };

        let stopped = visit_event_scoped_readonly(worker, event, scope);

        if pushed {
            scope.pop();
        }
        if stopped {
            return true;
        }
    }
    false
}

fn visit_event_scoped_readonly<W: ReadOnlyScopedEventsWorker + ?Sized>(
    worker: &mut W,
    event: &Event,
    scope: &mut EventsScope,
) -> bool {
    if worker.on_event(event, scope) {
        return true;
    }
    for list in event.condition_lists() {
        if walk_instructions_scoped_readonly(worker, list, true, scope) {
            return true;
        }
    }
    for list in event.action_lists() {
        if walk_instructions_scoped_readonly(worker, list, false, scope) {
            return true;
        }
    }
    if let Some(object) = event.object_to_pick() {
        if worker.on_expression(object, scope) {
            return true;
        }
    }
    if let Some(sub_events) = event.sub_events() {
        if walk_events_scoped_readonly(worker, sub_events, scope) {
            return true;
        }
    }
    false
}

pub fn walk_instructions_scoped_readonly<W: ReadOnlyScopedEventsWorker + ?Sized>(
    worker: &mut W,
    instructions: &InstructionsList,
    are_conditions: bool,
    scope: &EventsScope,
) -> bool {
    for instruction in instructions {
        if worker.on_instruction(instruction, are_conditions, scope) {
            return true;
        }
        for expression in instruction.parameters() {
            if worker.on_expression(expression, scope) {
                return true;
            }
        }
        if walk_instructions_scoped_readonly(worker, instruction.sub_instructions(), are_conditions, scope)
        {
            return true;
        }
    }
    false
}
