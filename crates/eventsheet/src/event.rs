//! The event tree: one polymorphic node kind per scripting construct.
//!
//! Events are a closed set of variants behind one capability surface, so
//! traversal and serialization code matches exhaustively instead of
//! relying on virtual dispatch with inherited defaults. Every event owns
//! its instruction lists and sub-events outright; copies are always deep.

use std::collections::HashMap;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use ahash::RandomState;
use indexmap::IndexMap;

use crate::error::{Context, Diagnostic, ErrorKind, Span};
use crate::expression::Expression;
use crate::instruction::{CacheNode, InstructionsList};

/// A stable identity for one event, unique within the process.
///
/// Clones receive a fresh id; identity searches (removal, containment,
/// moves) compare ids, never values.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct EventId(u64);

impl EventId {
    fn next() -> EventId {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        EventId(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

bitflags! {
    /// Editor-facing state bits carried by every event.
    #[derive(Default)]
    pub struct EventFlags: u8 {
        /// Sub-events are collapsed in the editor.
        const FOLDED = 1;
        /// The event is skipped entirely by code generation.
        const DISABLED = 1 << 1;
    }
}

// ----------------------------------------------------------------------------
// Local variables

/// One local variable's value.
#[derive(Debug, Clone, PartialEq)]
pub enum Variable {
    Number(f64),
    Text(String),
}

/// An ordered set of named local variables. Order is preserved so that
/// serialization round-trips byte-for-byte.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VariablesContainer {
    variables: IndexMap<String, Variable>,
}

impl VariablesContainer {
    pub fn new() -> VariablesContainer {
        VariablesContainer::default()
    }

    pub fn insert<S: Into<String>>(&mut self, name: S, value: Variable) {
        self.variables.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<&Variable> {
        self.variables.get(name)
    }

    pub fn has(&self, name: &str) -> bool {
        self.variables.contains_key(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<Variable> {
        self.variables.shift_remove(name)
    }

    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    pub fn iter(&self) -> indexmap::map::Iter<String, Variable> {
        self.variables.iter()
    }
}

// ----------------------------------------------------------------------------
// Event variants

/// The discriminant of an event's concrete variant.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum EventVariant {
    Standard,
    Branch,
    ForEach,
    Group,
    Link,
    Comment,
    Empty,
}

#[derive(Debug, PartialEq)]
pub(crate) enum EventKind {
    /// Conditions, actions, sub-events.
    Standard {
        conditions: InstructionsList,
        actions: InstructionsList,
        events: EventsList,
    },
    /// A branch may carry several condition blocks and declares local
    /// variables visible to everything beneath it.
    Branch {
        condition_blocks: Vec<InstructionsList>,
        actions: InstructionsList,
        events: EventsList,
        variables: VariablesContainer,
    },
    /// Repeats its sub-tree once per instance of the picked object.
    ForEach {
        object: Expression,
        conditions: InstructionsList,
        actions: InstructionsList,
        events: EventsList,
    },
    /// A purely organizational folder of events.
    Group {
        name: String,
        color: (u8, u8, u8),
        events: EventsList,
    },
    /// Includes a range of events from another event source at generation
    /// time.
    Link {
        target: String,
        include_start: Option<usize>,
        include_end: Option<usize>,
    },
    Comment {
        text: String,
    },
    /// The inert placeholder substituted for unknown event types.
    Empty,
}

/// One node of the scripting tree.
#[derive(Debug)]
pub struct Event {
    id: EventId,
    /// The first ancestor this event was (transitively) cloned from.
    /// Never keeps that ancestor alive; it may refer to a destroyed event.
    origin: Option<EventId>,
    flags: EventFlags,
    cache: Rc<CacheNode>,
    kind: EventKind,
}

impl Event {
    fn with_kind(kind: EventKind) -> Event {
        let event = Event {
            id: EventId::next(),
            origin: None,
            flags: EventFlags::default(),
            cache: CacheNode::new(),
            kind,
        };
        event.rewire();
        event
    }

    /// Point every owned list's invalidation chain at this event.
    fn rewire(&self) {
        match &self.kind {
            EventKind::Standard {
                conditions,
                actions,
                events,
            } => {
                conditions.cache.attach(&self.cache);
                actions.cache.attach(&self.cache);
                events.cache.attach(&self.cache);
            }
            EventKind::Branch {
                condition_blocks,
                actions,
                events,
                ..
            } => {
                for block in condition_blocks {
                    block.cache.attach(&self.cache);
                }
                actions.cache.attach(&self.cache);
                events.cache.attach(&self.cache);
            }
            EventKind::ForEach {
                conditions,
                actions,
                events,
                ..
            } => {
                conditions.cache.attach(&self.cache);
                actions.cache.attach(&self.cache);
                events.cache.attach(&self.cache);
            }
            EventKind::Group { events, .. } => events.cache.attach(&self.cache),
            EventKind::Link { .. } | EventKind::Comment { .. } | EventKind::Empty => {}
        }
    }

    pub fn standard() -> Event {
        Event::with_kind(EventKind::Standard {
            conditions: InstructionsList::new(),
            actions: InstructionsList::new(),
            events: EventsList::new(),
        })
    }

    pub fn branch() -> Event {
        Event::with_kind(EventKind::Branch {
            condition_blocks: vec![InstructionsList::new()],
            actions: InstructionsList::new(),
            events: EventsList::new(),
            variables: VariablesContainer::new(),
        })
    }

    pub fn for_each() -> Event {
        Event::with_kind(EventKind::ForEach {
            object: Expression::default(),
            conditions: InstructionsList::new(),
            actions: InstructionsList::new(),
            events: EventsList::new(),
        })
    }

    pub fn group<S: Into<String>>(name: S) -> Event {
        Event::with_kind(EventKind::Group {
            name: name.into(),
            color: (74, 176, 228),
            events: EventsList::new(),
        })
    }

    pub fn link<S: Into<String>>(target: S) -> Event {
        Event::with_kind(EventKind::Link {
            target: target.into(),
            include_start: None,
            include_end: None,
        })
    }

    pub fn comment<S: Into<String>>(text: S) -> Event {
        Event::with_kind(EventKind::Comment { text: text.into() })
    }

    pub fn empty() -> Event {
        Event::with_kind(EventKind::Empty)
    }

    // ------------------------------------------------------------------------
    // Identity and capabilities

    pub fn id(&self) -> EventId {
        self.id
    }

    /// The first ancestor this event was cloned from, if any.
    pub fn origin(&self) -> Option<EventId> {
        self.origin
    }

    pub fn variant(&self) -> EventVariant {
        match self.kind {
            EventKind::Standard { .. } => EventVariant::Standard,
            EventKind::Branch { .. } => EventVariant::Branch,
            EventKind::ForEach { .. } => EventVariant::ForEach,
            EventKind::Group { .. } => EventVariant::Group,
            EventKind::Link { .. } => EventVariant::Link,
            EventKind::Comment { .. } => EventVariant::Comment,
            EventKind::Empty => EventVariant::Empty,
        }
    }

    /// The registered type name of this event's variant.
    pub fn event_type(&self) -> &'static str {
        match self.variant() {
            EventVariant::Standard => "BuiltinCommonInstructions::Standard",
            EventVariant::Branch => "BuiltinCommonInstructions::Branch",
            EventVariant::ForEach => "BuiltinCommonInstructions::ForEach",
            EventVariant::Group => "BuiltinCommonInstructions::Group",
            EventVariant::Link => "BuiltinCommonInstructions::Link",
            EventVariant::Comment => "BuiltinCommonInstructions::Comment",
            EventVariant::Empty => "BuiltinCommonInstructions::Empty",
        }
    }

    /// Whether code generation produces anything for this event.
    pub fn is_executable(&self) -> bool {
        matches!(
            self.variant(),
            EventVariant::Standard | EventVariant::Branch | EventVariant::ForEach | EventVariant::Link
        )
    }

    pub fn can_have_sub_events(&self) -> bool {
        self.sub_events().is_some()
    }

    pub fn sub_events(&self) -> Option<&EventsList> {
        match &self.kind {
            EventKind::Standard { events, .. }
            | EventKind::Branch { events, .. }
            | EventKind::ForEach { events, .. }
            | EventKind::Group { events, .. } => Some(events),
            _ => None,
        }
    }

    pub fn sub_events_mut(&mut self) -> Option<&mut EventsList> {
        match &mut self.kind {
            EventKind::Standard { events, .. }
            | EventKind::Branch { events, .. }
            | EventKind::ForEach { events, .. }
            | EventKind::Group { events, .. } => Some(events),
            _ => None,
        }
    }

    pub fn can_have_local_variables(&self) -> bool {
        self.local_variables().is_some()
    }

    pub fn local_variables(&self) -> Option<&VariablesContainer> {
        match &self.kind {
            EventKind::Branch { variables, .. } => Some(variables),
            _ => None,
        }
    }

    pub fn local_variables_mut(&mut self) -> Option<&mut VariablesContainer> {
        match &mut self.kind {
            EventKind::Branch { variables, .. } => {
                self.cache.invalidate();
                Some(variables)
            }
            _ => None,
        }
    }

    /// Every condition list of this event, in declaration order. A branch
    /// exposes one list per condition block.
    pub fn condition_lists(&self) -> Vec<&InstructionsList> {
        match &self.kind {
            EventKind::Standard { conditions, .. } | EventKind::ForEach { conditions, .. } => {
                vec![conditions]
            }
            EventKind::Branch { condition_blocks, .. } => condition_blocks.iter().collect(),
            _ => Vec::new(),
        }
    }

    pub fn condition_lists_mut(&mut self) -> Vec<&mut InstructionsList> {
        match &mut self.kind {
            EventKind::Standard { conditions, .. } | EventKind::ForEach { conditions, .. } => {
                vec![conditions]
            }
            EventKind::Branch { condition_blocks, .. } => condition_blocks.iter_mut().collect(),
            _ => Vec::new(),
        }
    }

    pub fn action_lists(&self) -> Vec<&InstructionsList> {
        match &self.kind {
            EventKind::Standard { actions, .. }
            | EventKind::Branch { actions, .. }
            | EventKind::ForEach { actions, .. } => vec![actions],
            _ => Vec::new(),
        }
    }

    pub fn action_lists_mut(&mut self) -> Vec<&mut InstructionsList> {
        match &mut self.kind {
            EventKind::Standard { actions, .. }
            | EventKind::Branch { actions, .. }
            | EventKind::ForEach { actions, .. } => vec![actions],
            _ => Vec::new(),
        }
    }

    /// The event-level expressions outside any instruction, such as the
    /// object picked by a for-each event.
    pub fn expressions_mut(&mut self) -> Vec<&mut Expression> {
        match &mut self.kind {
            EventKind::ForEach { object, .. } => {
                self.cache.invalidate();
                vec![object]
            }
            _ => Vec::new(),
        }
    }

    /// Append a condition block to a branch event.
    pub fn add_condition_block(&mut self) -> Option<&mut InstructionsList> {
        match &mut self.kind {
            EventKind::Branch { condition_blocks, .. } => {
                let block = InstructionsList::new();
                block.cache.attach(&self.cache);
                condition_blocks.push(block);
                self.cache.invalidate();
                condition_blocks.last_mut()
            }
            _ => None,
        }
    }

    // ------------------------------------------------------------------------
    // Variant-specific accessors

    pub fn object_to_pick(&self) -> Option<&Expression> {
        match &self.kind {
            EventKind::ForEach { object, .. } => Some(object),
            _ => None,
        }
    }

    pub fn set_object_to_pick(&mut self, expression: Expression) {
        if let EventKind::ForEach { object, .. } = &mut self.kind {
            *object = expression;
            self.cache.invalidate();
        }
    }

    pub fn group_name(&self) -> Option<&str> {
        match &self.kind {
            EventKind::Group { name, .. } => Some(name),
            _ => None,
        }
    }

    pub fn set_group_name<S: Into<String>>(&mut self, new_name: S) {
        if let EventKind::Group { name, .. } = &mut self.kind {
            *name = new_name.into();
        }
    }

    pub fn group_color(&self) -> Option<(u8, u8, u8)> {
        match self.kind {
            EventKind::Group { color, .. } => Some(color),
            _ => None,
        }
    }

    pub fn set_group_color(&mut self, new_color: (u8, u8, u8)) {
        if let EventKind::Group { color, .. } = &mut self.kind {
            *color = new_color;
        }
    }

    pub fn link_target(&self) -> Option<&str> {
        match &self.kind {
            EventKind::Link { target, .. } => Some(target),
            _ => None,
        }
    }

    pub fn set_link_target<S: Into<String>>(&mut self, new_target: S) {
        if let EventKind::Link { target, .. } = &mut self.kind {
            *target = new_target.into();
            self.cache.invalidate();
        }
    }

    /// The half-open include range of a link event, if restricted.
    pub fn link_range(&self) -> Option<(Option<usize>, Option<usize>)> {
        match self.kind {
            EventKind::Link {
                include_start,
                include_end,
                ..
            } => Some((include_start, include_end)),
            _ => None,
        }
    }

    pub fn set_link_range(&mut self, start: Option<usize>, end: Option<usize>) {
        if let EventKind::Link {
            include_start,
            include_end,
            ..
        } = &mut self.kind
        {
            *include_start = start;
            *include_end = end;
            self.cache.invalidate();
        }
    }

    pub fn comment_text(&self) -> Option<&str> {
        match &self.kind {
            EventKind::Comment { text } => Some(text),
            _ => None,
        }
    }

    pub fn set_comment_text<S: Into<String>>(&mut self, new_text: S) {
        if let EventKind::Comment { text } = &mut self.kind {
            *text = new_text.into();
        }
    }

    // ------------------------------------------------------------------------
    // Flags and cache state

    pub fn is_folded(&self) -> bool {
        self.flags.contains(EventFlags::FOLDED)
    }

    pub fn set_folded(&mut self, folded: bool) {
        self.flags.set(EventFlags::FOLDED, folded);
    }

    pub fn is_disabled(&self) -> bool {
        self.flags.contains(EventFlags::DISABLED)
    }

    pub fn set_disabled(&mut self, disabled: bool) {
        self.flags.set(EventFlags::DISABLED, disabled);
        self.cache.invalidate();
    }

    pub fn is_dirty(&self) -> bool {
        self.cache.is_dirty()
    }

    /// Clear the stale flags of this event and everything below it.
    pub fn mark_clean(&self) {
        self.cache.set_clean();
        for list in self.condition_lists() {
            list.mark_clean();
        }
        for list in self.action_lists() {
            list.mark_clean();
        }
        if let Some(events) = self.sub_events() {
            events.mark_clean();
        }
    }

    pub(crate) fn cache(&self) -> &Rc<CacheNode> {
        &self.cache
    }
}

impl Clone for Event {
    /// A deep copy under a fresh id. The copy's provenance points at the
    /// *first* ancestor: cloning a clone still records the original.
    fn clone(&self) -> Event {
        let kind = match &self.kind {
            EventKind::Standard {
                conditions,
                actions,
                events,
            } => EventKind::Standard {
                conditions: conditions.clone(),
                actions: actions.clone(),
                events: events.clone(),
            },
            EventKind::Branch {
                condition_blocks,
                actions,
                events,
                variables,
            } => EventKind::Branch {
                condition_blocks: condition_blocks.clone(),
                actions: actions.clone(),
                events: events.clone(),
                variables: variables.clone(),
            },
            EventKind::ForEach {
                object,
                conditions,
                actions,
                events,
            } => EventKind::ForEach {
                object: object.clone(),
                conditions: conditions.clone(),
                actions: actions.clone(),
                events: events.clone(),
            },
            EventKind::Group { name, color, events } => EventKind::Group {
                name: name.clone(),
                color: *color,
                events: events.clone(),
            },
            EventKind::Link {
                target,
                include_start,
                include_end,
            } => EventKind::Link {
                target: target.clone(),
                include_start: *include_start,
                include_end: *include_end,
            },
            EventKind::Comment { text } => EventKind::Comment { text: text.clone() },
            EventKind::Empty => EventKind::Empty,
        };
        let copy = Event {
            id: EventId::next(),
            origin: Some(self.origin.unwrap_or(self.id)),
            flags: self.flags,
            cache: CacheNode::new(),
            kind,
        };
        copy.rewire();
        copy
    }
}

impl PartialEq for Event {
    /// Value equality, ignoring identity, provenance and cache state.
    fn eq(&self, other: &Event) -> bool {
        self.flags == other.flags && self.kind == other.kind
    }
}

// ----------------------------------------------------------------------------
// The list

/// An ordered sequence of owned events.
#[derive(Debug)]
pub struct EventsList {
    events: Vec<Event>,
    pub(crate) cache: Rc<CacheNode>,
}

impl Default for EventsList {
    fn default() -> EventsList {
        EventsList::new()
    }
}

impl EventsList {
    pub fn new() -> EventsList {
        EventsList {
            events: Vec::new(),
            cache: CacheNode::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Event> {
        self.events.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Event> {
        self.events.get_mut(index)
    }

    pub fn iter(&self) -> std::slice::Iter<Event> {
        self.events.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<Event> {
        self.events.iter_mut()
    }

    pub fn push(&mut self, event: Event) {
        let at = self.events.len();
        self.insert_event(event, at);
    }

    /// Insert at `position`, appending when the position is out of range.
    pub fn insert_event(&mut self, event: Event, position: usize) {
        event.cache.attach(&self.cache);
        let position = position.min(self.events.len());
        self.events.insert(position, event);
        self.cache.invalidate();
    }

    /// Ask the factory for a default event of `type_id` and insert it.
    /// Unknown types yield an inert empty event rather than failing.
    pub fn insert_new_event(
        &mut self,
        factory: &EventFactory,
        context: &Context,
        type_id: &str,
        position: usize,
    ) -> EventId {
        let event = factory.create(type_id, context);
        let id = event.id();
        self.insert_event(event, position);
        id
    }

    /// Whether the event with the given id is in this list, optionally
    /// searching sub-events too.
    pub fn contains(&self, id: EventId, recursive: bool) -> bool {
        self.events.iter().any(|event| {
            event.id() == id
                || (recursive
                    && event
                        .sub_events()
                        .map_or(false, |events| events.contains(id, true)))
        })
    }

    pub fn position_of(&self, id: EventId) -> Option<usize> {
        self.events.iter().position(|event| event.id() == id)
    }

    pub fn remove_at(&mut self, index: usize) {
        if index < self.events.len() {
            self.events.remove(index);
            self.cache.invalidate();
        }
    }

    /// Extract the top-level event with the given id, if present.
    pub fn remove_event(&mut self, id: EventId) -> Option<Event> {
        let index = self.position_of(id)?;
        let event = self.events.remove(index);
        self.cache.invalidate();
        Some(event)
    }

    /// Transfer the event with the given id into another list without an
    /// intermediate copy. Returns false if the event is not here.
    pub fn move_event_to(&mut self, id: EventId, target: &mut EventsList, position: usize) -> bool {
        match self.remove_event(id) {
            Some(event) => {
                target.insert_event(event, position);
                true
            }
            None => false,
        }
    }

    /// Copy-insert the events of `other` in `[begin, min(end, len-1)]` at
    /// `position`. A no-op when `begin` is out of range or `end < begin`.
    /// Each copy's provenance points at its ultimate original.
    pub fn insert_events(&mut self, other: &EventsList, begin: usize, end: usize, position: usize) {
        if begin >= other.len() || end < begin {
            return;
        }
        let end = end.min(other.len() - 1);
        let mut position = position.min(self.events.len());
        for event in &other.events[begin..=end] {
            let copy = event.clone();
            copy.cache.attach(&self.cache);
            self.events.insert(position, copy);
            position += 1;
        }
        self.cache.invalidate();
    }

    pub fn clear(&mut self) {
        self.events.clear();
        self.cache.invalidate();
    }

    pub fn is_dirty(&self) -> bool {
        self.cache.is_dirty()
    }

    /// Clear the stale flags of this list and everything below it.
    pub fn mark_clean(&self) {
        self.cache.set_clean();
        for event in &self.events {
            event.mark_clean();
        }
    }
}

impl Clone for EventsList {
    /// A deep, independent copy: no event is ever aliased between two
    /// lists. Each copied event records provenance to its first ancestor.
    fn clone(&self) -> EventsList {
        let cache = CacheNode::new();
        let events = self
            .events
            .iter()
            .map(|event| {
                let copy = event.clone();
                copy.cache.attach(&cache);
                copy
            })
            .collect();
        EventsList { events, cache }
    }
}

impl PartialEq for EventsList {
    fn eq(&self, other: &EventsList) -> bool {
        self.events == other.events
    }
}

impl<'a> IntoIterator for &'a EventsList {
    type Item = &'a Event;
    type IntoIter = std::slice::Iter<'a, Event>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

// ----------------------------------------------------------------------------
// The factory

type Builder = fn() -> Event;

/// Builds default events from their registered type names.
pub struct EventFactory {
    builders: HashMap<String, Builder, RandomState>,
}

impl Default for EventFactory {
    fn default() -> EventFactory {
        let mut factory = EventFactory {
            builders: HashMap::default(),
        };
        factory.register("BuiltinCommonInstructions::Standard", Event::standard);
        factory.register("BuiltinCommonInstructions::Branch", Event::branch);
        factory.register("BuiltinCommonInstructions::ForEach", Event::for_each);
        factory.register("BuiltinCommonInstructions::Group", || Event::group(""));
        factory.register("BuiltinCommonInstructions::Link", || Event::link(""));
        factory.register("BuiltinCommonInstructions::Comment", || Event::comment(""));
        factory.register("BuiltinCommonInstructions::Empty", Event::empty);
        factory
    }
}

impl EventFactory {
    pub fn new() -> EventFactory {
        EventFactory::default()
    }

    pub fn register<S: Into<String>>(&mut self, type_id: S, builder: Builder) {
        self.builders.insert(type_id.into(), builder);
    }

    pub fn knows(&self, type_id: &str) -> bool {
        self.builders.contains_key(type_id)
    }

    /// Build a default event of the named type. An unknown type is
    /// non-fatal: a warning is registered and an empty placeholder is
    /// returned so that loading a whole tree never aborts.
    pub fn create(&self, type_id: &str, context: &Context) -> Event {
        match self.builders.get(type_id) {
            Some(builder) => builder(),
            None => {
                context.register_error(
                    Diagnostic::new(
                        ErrorKind::UnknownEventType,
                        Span::at(0),
                        format!("unknown event type {:?}, substituting an empty event", type_id),
                    )
                    .set_severity(crate::error::Severity::Warning),
                );
                Event::empty()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clone_provenance_points_at_first_ancestor() {
        let original = Event::standard();
        let copy = original.clone();
        let copy_of_copy = copy.clone();
        assert_eq!(copy.origin(), Some(original.id()));
        assert_eq!(copy_of_copy.origin(), Some(original.id()));
        assert_ne!(copy.id(), original.id());
        assert_ne!(copy_of_copy.id(), copy.id());
    }

    #[test]
    fn contains_searches_sub_events_only_when_asked() {
        let mut root = EventsList::new();
        root.push(Event::standard());
        let nested = Event::comment("note");
        let nested_id = nested.id();
        root.get_mut(0)
            .unwrap()
            .sub_events_mut()
            .unwrap()
            .push(nested);

        assert!(!root.contains(nested_id, false));
        assert!(root.contains(nested_id, true));
    }

    #[test]
    fn move_between_lists_keeps_identity() {
        let mut source = EventsList::new();
        let mut target = EventsList::new();
        source.push(Event::standard());
        let id = source.get(0).unwrap().id();

        assert!(source.move_event_to(id, &mut target, 0));
        assert!(source.is_empty());
        assert_eq!(target.get(0).unwrap().id(), id);
        assert_eq!(target.get(0).unwrap().origin(), None);
    }

    #[test]
    fn bulk_insert_events_bounds() {
        let mut source = EventsList::new();
        for _ in 0..10 {
            source.push(Event::standard());
        }
        let mut target = EventsList::new();

        target.insert_events(&source, 5, 2, 0);
        assert!(target.is_empty());

        target.insert_events(&source, 0, 100, 0);
        assert_eq!(target.len(), 10);
        assert_eq!(target.get(0).unwrap().origin(), Some(source.get(0).unwrap().id()));
    }

    #[test]
    fn unknown_event_type_yields_empty_placeholder() {
        let factory = EventFactory::new();
        let context = Context::default();
        let event = factory.create("SomeExtension::Vanished", &context);
        assert_eq!(event.variant(), EventVariant::Empty);
        assert_eq!(context.errors().len(), 1);
    }

    #[test]
    fn disabled_flag_invalidates() {
        let mut list = EventsList::new();
        list.push(Event::standard());
        list.mark_clean();
        list.get_mut(0).unwrap().set_disabled(true);
        assert!(list.is_dirty());
    }
}
