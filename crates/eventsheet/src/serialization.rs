//! Serialization of the event tree through a generic element tree.
//!
//! Everything serializes into [`SerializerElement`]: a named bag of scalar
//! attributes plus an ordered list of named children. The element tree
//! itself derives serde, so any serde backend can persist it; the code
//! here only fixes the child/attribute names each type uses.
//!
//! Old project files are handled by an ordered list of pure migration
//! passes keyed by a `formatVersion` attribute detected on the root
//! element. An ambiguous legacy attribute (old and new name both present)
//! is never guessed at: the current value wins and a diagnostic records
//! the conflict.

use indexmap::IndexMap;
use serde_derive::{Deserialize, Serialize};

use crate::error::{Context, Diagnostic, ErrorKind, Severity, Span};
use crate::event::{Event, EventFactory, EventVariant, EventsList, Variable, VariablesContainer};
use crate::expression::Expression;
use crate::instruction::{Instruction, InstructionsList};

/// The format written by this version of the library.
pub const CURRENT_FORMAT_VERSION: u32 = 2;

/// One scalar attribute value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SerializerValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl SerializerValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            SerializerValue::Str(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            SerializerValue::Bool(value) => Some(*value),
            SerializerValue::Int(value) => Some(*value != 0),
            SerializerValue::Str(value) => match value.as_str() {
                "true" | "1" => Some(true),
                "false" | "0" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            SerializerValue::Int(value) => Some(*value),
            SerializerValue::Str(value) => value.parse().ok(),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            SerializerValue::Float(value) => Some(*value),
            SerializerValue::Int(value) => Some(*value as f64),
            SerializerValue::Str(value) => value.parse().ok(),
            _ => None,
        }
    }
}

impl From<&str> for SerializerValue {
    fn from(value: &str) -> SerializerValue {
        SerializerValue::Str(value.to_owned())
    }
}

impl From<String> for SerializerValue {
    fn from(value: String) -> SerializerValue {
        SerializerValue::Str(value)
    }
}

impl From<bool> for SerializerValue {
    fn from(value: bool) -> SerializerValue {
        SerializerValue::Bool(value)
    }
}

impl From<i64> for SerializerValue {
    fn from(value: i64) -> SerializerValue {
        SerializerValue::Int(value)
    }
}

impl From<f64> for SerializerValue {
    fn from(value: f64) -> SerializerValue {
        SerializerValue::Float(value)
    }
}

/// One node of the generic serialization tree.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SerializerElement {
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    attributes: IndexMap<String, SerializerValue>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    children: Vec<(String, SerializerElement)>,
}

impl SerializerElement {
    pub fn new() -> SerializerElement {
        SerializerElement::default()
    }

    pub fn set_attribute<S: Into<String>, V: Into<SerializerValue>>(&mut self, name: S, value: V) {
        self.attributes.insert(name.into(), value.into());
    }

    pub fn attribute(&self, name: &str) -> Option<&SerializerValue> {
        self.attributes.get(name)
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.attributes.contains_key(name)
    }

    pub fn string_attribute(&self, name: &str) -> Option<&str> {
        self.attribute(name).and_then(SerializerValue::as_str)
    }

    pub fn bool_attribute(&self, name: &str) -> Option<bool> {
        self.attribute(name).and_then(SerializerValue::as_bool)
    }

    pub fn int_attribute(&self, name: &str) -> Option<i64> {
        self.attribute(name).and_then(SerializerValue::as_int)
    }

    pub fn float_attribute(&self, name: &str) -> Option<f64> {
        self.attribute(name).and_then(SerializerValue::as_float)
    }

    /// Append a child with the given name and return it.
    pub fn add_child<S: Into<String>>(&mut self, name: S) -> &mut SerializerElement {
        let index = self.children.len();
        self.children.push((name.into(), SerializerElement::default()));
        &mut self.children[index].1
    }

    /// The first child with the given name, if any.
    pub fn child(&self, name: &str) -> Option<&SerializerElement> {
        self.children
            .iter()
            .find(|(child_name, _)| child_name == name)
            .map(|(_, element)| element)
    }

    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a SerializerElement> {
        self.children
            .iter()
            .filter(move |(child_name, _)| child_name == name)
            .map(|(_, element)| element)
    }

    pub fn children(&self) -> impl Iterator<Item = (&str, &SerializerElement)> {
        self.children
            .iter()
            .map(|(name, element)| (name.as_str(), element))
    }
}

// ----------------------------------------------------------------------------
// Instructions

pub fn serialize_instruction(instruction: &Instruction) -> SerializerElement {
    let mut element = SerializerElement::new();
    element.set_attribute("type", instruction.instruction_type());
    if instruction.is_inverted() {
        element.set_attribute("inverted", true);
    }
    {
        let parameters = element.add_child("parameters");
        for parameter in instruction.parameters() {
            parameters
                .add_child("parameter")
                .set_attribute("value", parameter.plain_string());
        }
    }
    if !instruction.sub_instructions().is_empty() {
        *element.add_child("subInstructions") = serialize_instructions(instruction.sub_instructions());
    }
    element
}

pub fn serialize_instructions(list: &InstructionsList) -> SerializerElement {
    let mut element = SerializerElement::new();
    for instruction in list {
        *element.add_child("instruction") = serialize_instruction(instruction);
    }
    element
}

pub fn unserialize_instruction(element: &SerializerElement) -> Instruction {
    let mut instruction = Instruction::new(element.string_attribute("type").unwrap_or(""));
    if element.bool_attribute("inverted").unwrap_or(false) {
        instruction.set_inverted(true);
    }
    if let Some(parameters) = element.child("parameters") {
        let parameters = parameters
            .children_named("parameter")
            .map(|parameter| Expression::new(parameter.string_attribute("value").unwrap_or("")))
            .collect();
        instruction.set_parameters(parameters);
    }
    if let Some(sub) = element.child("subInstructions") {
        fill_instructions(instruction.sub_instructions_mut(), sub);
    }
    instruction
}

fn fill_instructions(target: &mut InstructionsList, element: &SerializerElement) {
    for child in element.children_named("instruction") {
        target.push(unserialize_instruction(child));
    }
}

pub fn unserialize_instructions(element: &SerializerElement) -> InstructionsList {
    let mut list = InstructionsList::new();
    fill_instructions(&mut list, element);
    list
}

// ----------------------------------------------------------------------------
// Variables

fn serialize_variables(variables: &VariablesContainer) -> SerializerElement {
    let mut element = SerializerElement::new();
    for (name, variable) in variables.iter() {
        let child = element.add_child("variable");
        child.set_attribute("name", name.as_str());
        match variable {
            Variable::Number(value) => child.set_attribute("value", *value),
            Variable::Text(text) => child.set_attribute("text", text.as_str()),
        }
    }
    element
}

fn fill_variables(target: &mut VariablesContainer, element: &SerializerElement) {
    for variable in element.children_named("variable") {
        let name = variable.string_attribute("name").unwrap_or("").to_owned();
        if let Some(text) = variable.string_attribute("text") {
            target.insert(name, Variable::Text(text.to_owned()));
        } else {
            target.insert(
                name,
                Variable::Number(variable.float_attribute("value").unwrap_or(0.0)),
            );
        }
    }
}

// ----------------------------------------------------------------------------
// Events

pub fn serialize_event(event: &Event) -> SerializerElement {
    let mut element = SerializerElement::new();
    element.set_attribute("type", event.event_type());
    if event.is_folded() {
        element.set_attribute("folded", true);
    }
    if event.is_disabled() {
        element.set_attribute("disabled", true);
    }

    match event.variant() {
        EventVariant::Standard | EventVariant::ForEach => {
            if let Some(object) = event.object_to_pick() {
                element.set_attribute("object", object.plain_string());
            }
            if let Some(conditions) = event.condition_lists().first() {
                *element.add_child("conditions") = serialize_instructions(conditions);
            }
            if let Some(actions) = event.action_lists().first() {
                *element.add_child("actions") = serialize_instructions(actions);
            }
        }
        EventVariant::Branch => {
            {
                let lists = element.add_child("conditionsLists");
                for block in event.condition_lists() {
                    *lists.add_child("conditions") = serialize_instructions(block);
                }
            }
            if let Some(actions) = event.action_lists().first() {
                *element.add_child("actions") = serialize_instructions(actions);
            }
            // written only when non-empty; readers treat absence as empty
            if let Some(variables) = event.local_variables() {
                if !variables.is_empty() {
                    *element.add_child("variables") = serialize_variables(variables);
                }
            }
        }
        EventVariant::Group => {
            if let Some(name) = event.group_name() {
                element.set_attribute("name", name);
            }
            if let Some((r, g, b)) = event.group_color() {
                element.set_attribute("r", i64::from(r));
                element.set_attribute("g", i64::from(g));
                element.set_attribute("b", i64::from(b));
            }
        }
        EventVariant::Link => {
            if let Some(target) = event.link_target() {
                element.set_attribute("target", target);
            }
            if let Some((start, end)) = event.link_range() {
                if let Some(start) = start {
                    element.set_attribute("includeStart", start as i64);
                }
                if let Some(end) = end {
                    element.set_attribute("includeEnd", end as i64);
                }
            }
        }
        EventVariant::Comment => {
            element.set_attribute("comment", event.comment_text().unwrap_or(""));
        }
        EventVariant::Empty => {}
    }

    if let Some(sub_events) = event.sub_events() {
        if !sub_events.is_empty() {
            let events = element.add_child("events");
            for event in sub_events {
                *events.add_child("event") = serialize_event(event);
            }
        }
    }
    element
}

pub fn unserialize_event(
    element: &SerializerElement,
    factory: &EventFactory,
    context: &Context,
) -> Event {
    let type_id = element.string_attribute("type").unwrap_or("");
    let mut event = factory.create(type_id, context);

    event.set_folded(element.bool_attribute("folded").unwrap_or(false));
    event.set_disabled(element.bool_attribute("disabled").unwrap_or(false));

    match event.variant() {
        EventVariant::Standard | EventVariant::ForEach => {
            if let Some(object) = element.string_attribute("object") {
                event.set_object_to_pick(Expression::new(object));
            }
            if let Some(conditions) = element.child("conditions") {
                if let Some(target) = event.condition_lists_mut().into_iter().next() {
                    fill_instructions(target, conditions);
                }
            }
            if let Some(actions) = element.child("actions") {
                if let Some(target) = event.action_lists_mut().into_iter().next() {
                    fill_instructions(target, actions);
                }
            }
        }
        EventVariant::Branch => {
            if let Some(lists) = element.child("conditionsLists") {
                let blocks: Vec<&SerializerElement> = lists.children_named("conditions").collect();
                for _ in 1..blocks.len() {
                    event.add_condition_block();
                }
                for (target, block) in event.condition_lists_mut().into_iter().zip(blocks.iter().copied()) {
                    fill_instructions(target, block);
                }
            }
            if let Some(actions) = element.child("actions") {
                if let Some(target) = event.action_lists_mut().into_iter().next() {
                    fill_instructions(target, actions);
                }
            }
            // a missing "variables" child means an empty set
            if let Some(variables) = element.child("variables") {
                if let Some(target) = event.local_variables_mut() {
                    fill_variables(target, variables);
                }
            }
        }
        EventVariant::Group => {
            event.set_group_name(element.string_attribute("name").unwrap_or(""));
            let color = (
                element.int_attribute("r").unwrap_or(74).clamp(0, 255) as u8,
                element.int_attribute("g").unwrap_or(176).clamp(0, 255) as u8,
                element.int_attribute("b").unwrap_or(228).clamp(0, 255) as u8,
            );
            event.set_group_color(color);
        }
        EventVariant::Link => {
            event.set_link_target(element.string_attribute("target").unwrap_or(""));
            event.set_link_range(
                element.int_attribute("includeStart").map(|v| v.max(0) as usize),
                element.int_attribute("includeEnd").map(|v| v.max(0) as usize),
            );
        }
        EventVariant::Comment => {
            event.set_comment_text(element.string_attribute("comment").unwrap_or(""));
        }
        EventVariant::Empty => {}
    }

    if let Some(events) = element.child("events") {
        if let Some(target) = event.sub_events_mut() {
            fill_events(target, events, factory, context);
        }
    }
    event
}

fn fill_events(
    target: &mut EventsList,
    element: &SerializerElement,
    factory: &EventFactory,
    context: &Context,
) {
    for child in element.children_named("event") {
        target.push(unserialize_event(child, factory, context));
    }
}

pub fn serialize_events(list: &EventsList) -> SerializerElement {
    let mut element = SerializerElement::new();
    element.set_attribute("formatVersion", i64::from(CURRENT_FORMAT_VERSION));
    for event in list {
        *element.add_child("event") = serialize_event(event);
    }
    element
}

/// Load a whole event tree, applying migration passes first when the
/// detected format version is older than [`CURRENT_FORMAT_VERSION`].
pub fn unserialize_events(
    element: &SerializerElement,
    factory: &EventFactory,
    context: &Context,
) -> EventsList {
    let mut element = element.clone();
    migrate(&mut element, context);
    let mut list = EventsList::new();
    fill_events(&mut list, &element, factory, context);
    list
}

// ----------------------------------------------------------------------------
// Migration passes

type Migration = fn(&mut SerializerElement, &Context);

/// Ordered migration passes: each entry upgrades trees older than its
/// version. Applied strictly in order.
const MIGRATIONS: &[(u32, Migration)] = &[
    (1, migrate_localized_names),
    (2, migrate_automatism_names),
];

fn detected_version(element: &SerializerElement) -> u32 {
    element
        .int_attribute("formatVersion")
        .filter(|version| *version >= 0)
        .map(|version| version as u32)
        .unwrap_or(0)
}

/// Upgrade an element tree in place to the current format.
pub fn migrate(element: &mut SerializerElement, context: &Context) {
    let version = detected_version(element);
    for &(target, pass) in MIGRATIONS {
        if version < target {
            pass(element, context);
        }
    }
    element.set_attribute("formatVersion", i64::from(CURRENT_FORMAT_VERSION));
}

fn legacy_conflict(context: &Context, what: &str, legacy: &str, current: &str) {
    context.register_error(
        Diagnostic::new(
            ErrorKind::LegacyFormat,
            Span::at(0),
            format!(
                "both legacy {} {:?} and current {:?} are present; keeping the current value",
                what, legacy, current
            ),
        )
        .set_severity(Severity::Warning),
    );
}

/// Move the value of `legacy` to `current`. When both exist, the current
/// value wins and the conflict is surfaced rather than guessed at.
fn rename_attribute(
    element: &mut SerializerElement,
    legacy: &str,
    current: &str,
    context: &Context,
) {
    if !element.attributes.contains_key(legacy) {
        return;
    }
    if element.attributes.contains_key(current) {
        element.attributes.shift_remove(legacy);
        legacy_conflict(context, "attribute", legacy, current);
        return;
    }
    if let Some(value) = element.attributes.shift_remove(legacy) {
        element.attributes.insert(current.to_owned(), value);
    }
}

fn rename_children(
    element: &mut SerializerElement,
    legacy: &str,
    current: &str,
    context: &Context,
) {
    let has_current = element.children.iter().any(|(name, _)| name == current);
    let has_legacy = element.children.iter().any(|(name, _)| name == legacy);
    if !has_legacy {
        return;
    }
    if has_current {
        element.children.retain(|(name, _)| name != legacy);
        legacy_conflict(context, "element", legacy, current);
        return;
    }
    for (name, _) in &mut element.children {
        if name == legacy {
            *name = current.to_owned();
        }
    }
}

/// Format 0 -> 1: the earliest project files used localized (French)
/// attribute and element names.
fn migrate_localized_names(element: &mut SerializerElement, context: &Context) {
    rename_attribute(element, "Type", "type", context);
    rename_attribute(element, "Contraire", "inverted", context);
    rename_children(element, "Conditions", "conditions", context);
    rename_children(element, "Actions", "actions", context);
    rename_children(element, "Events", "events", context);
    rename_children(element, "Event", "event", context);
    for (_, child) in &mut element.children {
        migrate_localized_names(child, context);
    }
}

/// Format 1 -> 2: "automatism" was renamed to "behavior" in type names.
fn migrate_automatism_names(element: &mut SerializerElement, context: &Context) {
    if let Some(SerializerValue::Str(type_name)) = element.attributes.get_mut("type") {
        if type_name.contains("Automatism") {
            *type_name = type_name.replace("Automatism", "Behavior");
        }
    }
    for (_, child) in &mut element.children {
        migrate_automatism_names(child, context);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn element_attribute_coercions() {
        let mut element = SerializerElement::new();
        element.set_attribute("flag", "true");
        element.set_attribute("count", "12");
        assert_eq!(element.bool_attribute("flag"), Some(true));
        assert_eq!(element.int_attribute("count"), Some(12));
        assert_eq!(element.float_attribute("count"), Some(12.0));
        assert_eq!(element.string_attribute("missing"), None);
    }

    #[test]
    fn localized_rename_is_not_guessed_on_conflict() {
        let context = Context::default();
        let mut element = SerializerElement::new();
        element.set_attribute("Type", "Ancien");
        element.set_attribute("type", "Current");
        rename_attribute(&mut element, "Type", "type", &context);

        assert_eq!(element.string_attribute("type"), Some("Current"));
        assert!(!element.has_attribute("Type"));
        assert_eq!(context.errors().len(), 1);
        assert_eq!(context.errors()[0].kind(), ErrorKind::LegacyFormat);
    }

    #[test]
    fn automatism_type_names_upgrade() {
        let context = Context::default();
        let mut element = SerializerElement::new();
        element
            .add_child("event")
            .set_attribute("type", "PhysicsAutomatism::SetLinearVelocity");
        migrate(&mut element, &context);

        assert_eq!(
            element.child("event").unwrap().string_attribute("type"),
            Some("PhysicsBehavior::SetLinearVelocity")
        );
        assert_eq!(
            element.int_attribute("formatVersion"),
            Some(i64::from(CURRENT_FORMAT_VERSION))
        );
    }
}
