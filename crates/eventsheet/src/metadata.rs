//! The metadata catalog: which free, object-member and behavior-member
//! functions exist on the current platform, and their signatures.
//!
//! The catalog is an external collaborator from the parser's point of view:
//! it is read-only during a parse and registered dynamically by whoever
//! assembles the platform (built-in extensions, user extensions).

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use ahash::RandomState;
use phf::phf_map;

/// The opaque parameter categories. They carry no numeric meaning but their
/// contents still parse through the text grammar.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum OpaqueKind {
    Layer,
    Color,
    File,
    JoyAxis,
    Camera,
}

/// What sub-grammar a parameter's contents parse through.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum ParameterKind {
    /// A numeric sub-expression, parsed through the math grammar.
    Number,
    /// A string sub-expression, parsed through the text grammar.
    Text,
    /// An opaque category that still resolves through the text grammar.
    Opaque(OpaqueKind),
    /// An object or behavior name slot; never recursed into.
    Object,
}

impl ParameterKind {
    pub fn recurses_math(self) -> bool {
        self == ParameterKind::Number
    }

    pub fn recurses_text(self) -> bool {
        matches!(self, ParameterKind::Text | ParameterKind::Opaque(_))
    }
}

/// Legacy stringly-typed parameter tags, as found in old serialized projects.
static LEGACY_PARAMETER_TAGS: phf::Map<&'static str, ParameterKind> = phf_map! {
    "expression" => ParameterKind::Number,
    "number" => ParameterKind::Number,
    "string" => ParameterKind::Text,
    "layer" => ParameterKind::Opaque(OpaqueKind::Layer),
    "color" => ParameterKind::Opaque(OpaqueKind::Color),
    "file" => ParameterKind::Opaque(OpaqueKind::File),
    "joyaxis" => ParameterKind::Opaque(OpaqueKind::JoyAxis),
    "camera" => ParameterKind::Opaque(OpaqueKind::Camera),
    "object" => ParameterKind::Object,
    "behavior" => ParameterKind::Object,
};

impl ParameterKind {
    /// Resolve a legacy type tag to its closed kind, if known.
    pub fn from_legacy_tag(tag: &str) -> Option<ParameterKind> {
        LEGACY_PARAMETER_TAGS.get(tag).copied()
    }
}

/// The declared shape of one parameter slot.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParameterMetadata {
    pub kind: ParameterKind,
    /// May be left empty by the author; the declared default (or the
    /// grammar's own default) is substituted.
    pub optional: bool,
    /// Supplied by the code generator, never by the author. Completed with
    /// a blank placeholder expression during parsing.
    pub code_only: bool,
    pub default_value: String,
}

impl ParameterMetadata {
    pub fn new(kind: ParameterKind) -> ParameterMetadata {
        ParameterMetadata {
            kind,
            optional: false,
            code_only: false,
            default_value: String::new(),
        }
    }

    pub fn optional(mut self) -> ParameterMetadata {
        self.optional = true;
        self
    }

    pub fn code_only(mut self) -> ParameterMetadata {
        self.code_only = true;
        self
    }

    pub fn with_default<S: Into<String>>(mut self, default_value: S) -> ParameterMetadata {
        self.default_value = default_value.into();
        self
    }
}

/// The resolved signature of a callable expression.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExpressionMetadata {
    pub parameters: Vec<ParameterMetadata>,
}

impl ExpressionMetadata {
    pub fn new(parameters: Vec<ParameterMetadata>) -> ExpressionMetadata {
        ExpressionMetadata { parameters }
    }

    /// The fewest arguments a call may supply: optional and code-only
    /// parameters are excluded.
    pub fn minimum_parameter_count(&self) -> usize {
        self.parameters
            .iter()
            .filter(|p| !p.optional && !p.code_only)
            .count()
    }

    /// The most arguments a call may supply: only code-only parameters are
    /// excluded.
    pub fn maximum_parameter_count(&self) -> usize {
        self.parameters.iter().filter(|p| !p.code_only).count()
    }
}

fn next_identity() -> u64 {
    static NEXT: AtomicU64 = AtomicU64::new(1);
    NEXT.fetch_add(1, Ordering::Relaxed)
}

type Registry = HashMap<String, ExpressionMetadata, RandomState>;
type MemberRegistry = HashMap<(String, String), ExpressionMetadata, RandomState>;

/// The registry of callable signatures for one platform.
///
/// Math (number-returning) and text (string-returning) callables live in
/// separate namespaces, mirroring the two grammars. Member registries are
/// keyed by `(type, name)`.
#[derive(Debug, Default)]
pub struct MetadataCatalog {
    identity: u64,
    free_math: Registry,
    free_text: Registry,
    object_math: MemberRegistry,
    object_text: MemberRegistry,
    behavior_math: MemberRegistry,
    behavior_text: MemberRegistry,
}

impl MetadataCatalog {
    pub fn new() -> MetadataCatalog {
        MetadataCatalog {
            identity: next_identity(),
            ..Default::default()
        }
    }

    /// The identity token cached parse results are keyed by.
    pub fn identity(&self) -> u64 {
        self.identity
    }

    // ------------------------------------------------------------------------
    // Registration

    pub fn register_expression<S: Into<String>>(&mut self, name: S, metadata: ExpressionMetadata) {
        self.free_math.insert(name.into(), metadata);
    }

    pub fn register_str_expression<S: Into<String>>(&mut self, name: S, metadata: ExpressionMetadata) {
        self.free_text.insert(name.into(), metadata);
    }

    pub fn register_object_expression<T, S>(&mut self, object_type: T, name: S, metadata: ExpressionMetadata)
    where
        T: Into<String>,
        S: Into<String>,
    {
        self.object_math.insert((object_type.into(), name.into()), metadata);
    }

    pub fn register_object_str_expression<T, S>(&mut self, object_type: T, name: S, metadata: ExpressionMetadata)
    where
        T: Into<String>,
        S: Into<String>,
    {
        self.object_text.insert((object_type.into(), name.into()), metadata);
    }

    pub fn register_behavior_expression<T, S>(&mut self, behavior_type: T, name: S, metadata: ExpressionMetadata)
    where
        T: Into<String>,
        S: Into<String>,
    {
        self.behavior_math.insert((behavior_type.into(), name.into()), metadata);
    }

    pub fn register_behavior_str_expression<T, S>(&mut self, behavior_type: T, name: S, metadata: ExpressionMetadata)
    where
        T: Into<String>,
        S: Into<String>,
    {
        self.behavior_text.insert((behavior_type.into(), name.into()), metadata);
    }

    // ------------------------------------------------------------------------
    // Lookup

    pub fn has_expression(&self, name: &str) -> bool {
        self.free_math.contains_key(name)
    }

    pub fn get_expression(&self, name: &str) -> Option<&ExpressionMetadata> {
        self.free_math.get(name)
    }

    pub fn has_str_expression(&self, name: &str) -> bool {
        self.free_text.contains_key(name)
    }

    pub fn get_str_expression(&self, name: &str) -> Option<&ExpressionMetadata> {
        self.free_text.get(name)
    }

    pub fn get_object_expression(&self, object_type: &str, name: &str) -> Option<&ExpressionMetadata> {
        self.object_math.get(&(object_type.to_owned(), name.to_owned()))
    }

    pub fn has_object_expression(&self, object_type: &str, name: &str) -> bool {
        self.get_object_expression(object_type, name).is_some()
    }

    pub fn get_object_str_expression(&self, object_type: &str, name: &str) -> Option<&ExpressionMetadata> {
        self.object_text.get(&(object_type.to_owned(), name.to_owned()))
    }

    pub fn has_object_str_expression(&self, object_type: &str, name: &str) -> bool {
        self.get_object_str_expression(object_type, name).is_some()
    }

    pub fn get_behavior_expression(&self, behavior_type: &str, name: &str) -> Option<&ExpressionMetadata> {
        self.behavior_math.get(&(behavior_type.to_owned(), name.to_owned()))
    }

    pub fn has_behavior_expression(&self, behavior_type: &str, name: &str) -> bool {
        self.get_behavior_expression(behavior_type, name).is_some()
    }

    pub fn get_behavior_str_expression(&self, behavior_type: &str, name: &str) -> Option<&ExpressionMetadata> {
        self.behavior_text.get(&(behavior_type.to_owned(), name.to_owned()))
    }

    pub fn has_behavior_str_expression(&self, behavior_type: &str, name: &str) -> bool {
        self.get_behavior_str_expression(behavior_type, name).is_some()
    }
}

/// The scene's objects and behaviors, used to resolve object and behavior
/// *types* from the *names* written in expressions.
#[derive(Debug, Default)]
pub struct ObjectsContainer {
    identity: u64,
    /// Object name -> object type.
    objects: HashMap<String, String, RandomState>,
    /// Behavior name -> behavior type.
    behaviors: HashMap<String, String, RandomState>,
    /// Object name -> names of the behaviors attached to it.
    attached: HashMap<String, Vec<String>, RandomState>,
}

impl ObjectsContainer {
    pub fn new() -> ObjectsContainer {
        ObjectsContainer {
            identity: next_identity(),
            ..Default::default()
        }
    }

    /// The identity token cached parse results are keyed by.
    pub fn identity(&self) -> u64 {
        self.identity
    }

    pub fn insert_object<N, T>(&mut self, name: N, object_type: T)
    where
        N: Into<String>,
        T: Into<String>,
    {
        self.objects.insert(name.into(), object_type.into());
    }

    /// Declare a behavior of the given type and attach it to an object.
    pub fn attach_behavior<O, N, T>(&mut self, object_name: O, behavior_name: N, behavior_type: T)
    where
        O: Into<String>,
        N: Into<String>,
        T: Into<String>,
    {
        let behavior_name = behavior_name.into();
        self.behaviors.insert(behavior_name.clone(), behavior_type.into());
        self.attached
            .entry(object_name.into())
            .or_insert_with(Vec::new)
            .push(behavior_name);
    }

    /// The type of the named object, or `""` if it is unknown.
    pub fn get_type_of_object(&self, name: &str) -> &str {
        self.objects.get(name).map(String::as_str).unwrap_or("")
    }

    /// The type of the named behavior, or `""` if it is unknown.
    pub fn get_type_of_behavior(&self, name: &str) -> &str {
        self.behaviors.get(name).map(String::as_str).unwrap_or("")
    }

    /// The names of the behaviors attached to the named object.
    pub fn get_behaviors_of_object(&self, name: &str) -> &[String] {
        self.attached.get(name).map(Vec::as_slice).unwrap_or(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arity_window() {
        let metadata = ExpressionMetadata::new(vec![
            ParameterMetadata::new(ParameterKind::Number),
            ParameterMetadata::new(ParameterKind::Number).optional(),
            ParameterMetadata::new(ParameterKind::Number).code_only(),
            ParameterMetadata::new(ParameterKind::Text),
        ]);
        assert_eq!(metadata.minimum_parameter_count(), 2);
        assert_eq!(metadata.maximum_parameter_count(), 3);
    }

    #[test]
    fn legacy_tags() {
        assert_eq!(ParameterKind::from_legacy_tag("expression"), Some(ParameterKind::Number));
        assert_eq!(ParameterKind::from_legacy_tag("camera"), Some(ParameterKind::Opaque(OpaqueKind::Camera)));
        assert_eq!(ParameterKind::from_legacy_tag("inputStream"), None);
    }

    #[test]
    fn distinct_identities() {
        assert_ne!(MetadataCatalog::new().identity(), MetadataCatalog::new().identity());
        assert_ne!(ObjectsContainer::new().identity(), ObjectsContainer::new().identity());
    }
}
