extern crate eventsheet as es;

use es::ast::ExpressionNode;
use es::expression::Expression;
use es::metadata::{
    ExpressionMetadata, MetadataCatalog, ObjectsContainer, OpaqueKind, ParameterKind,
    ParameterMetadata,
};
use es::parser::parse_to_ast;
use es::{ErrorKind, Grammar, IdentifierPolicy, ParseEnv};

fn number() -> ParameterMetadata {
    ParameterMetadata::new(ParameterKind::Number)
}

fn text() -> ParameterMetadata {
    ParameterMetadata::new(ParameterKind::Text)
}

fn object() -> ParameterMetadata {
    ParameterMetadata::new(ParameterKind::Object)
}

fn catalog() -> MetadataCatalog {
    let mut catalog = MetadataCatalog::new();
    catalog.register_expression("Random", ExpressionMetadata::new(vec![number()]));
    catalog.register_expression(
        "Clamp",
        ExpressionMetadata::new(vec![number(), number().optional().with_default("100")]),
    );
    catalog.register_expression(
        "TimeDelta",
        ExpressionMetadata::new(vec![number().code_only(), number().optional()]),
    );
    catalog.register_str_expression("ToString", ExpressionMetadata::new(vec![number()]));
    catalog.register_str_expression(
        "SubStr",
        ExpressionMetadata::new(vec![text(), number(), number()]),
    );
    catalog.register_str_expression(
        "LayerColor",
        ExpressionMetadata::new(vec![ParameterMetadata::new(ParameterKind::Opaque(
            OpaqueKind::Layer,
        ))
        .optional()]),
    );
    catalog.register_object_expression("Sprite", "X", ExpressionMetadata::new(vec![object()]));
    catalog.register_behavior_expression(
        "PhysicsBehavior",
        "Mass",
        ExpressionMetadata::new(vec![object(), object()]),
    );
    catalog
}

fn container() -> ObjectsContainer {
    let mut container = ObjectsContainer::new();
    container.insert_object("Hero", "Sprite");
    container.insert_object("My Object", "Sprite");
    container.insert_object("Crate", "Sprite");
    container.attach_behavior("Hero", "Physics", "PhysicsBehavior");
    container
}

fn first_error(text: &str, grammar: Grammar, env: &ParseEnv) -> es::Diagnostic {
    let result = match grammar {
        Grammar::Math => es::validate_math(text, env),
        Grammar::Text => es::validate_text(text, env),
    };
    result.expect_err("expected a parse error")
}

#[test]
fn free_function_call() {
    let catalog = catalog();
    let container = container();
    let env = ParseEnv::new(&catalog, &container);

    assert!(es::validate_math("Random(10)", &env).is_ok());
    let parsed = parse_to_ast(&env, Grammar::Math, "Random(10)");
    assert!(parsed.is_valid());
    assert_eq!(parsed.nodes.len(), 1);
    match &parsed.nodes[0] {
        ExpressionNode::FreeFunctionCall { name, arguments, .. } => {
            assert_eq!(name, "Random");
            assert_eq!(arguments.len(), 1);
            assert_eq!(arguments[0], Expression::new("10"));
        }
        other => panic!("expected a free call, got {:?}", other),
    }
}

#[test]
fn calls_mix_with_plain_arithmetic() {
    let catalog = catalog();
    let container = container();
    let env = ParseEnv::new(&catalog, &container);

    assert!(es::validate_math("3.14 + Random(2) * 2", &env).is_ok());
    assert!(es::validate_math("Random(Random(3))", &env).is_ok());

    let parsed = parse_to_ast(&env, Grammar::Math, "1 + Random(2)");
    let kinds: Vec<&ExpressionNode> = parsed.nodes.iter().collect();
    assert_eq!(kinds.len(), 3);
    assert!(matches!(kinds[0], ExpressionNode::Number { text, .. } if text == "1"));
    assert!(matches!(kinds[1], ExpressionNode::Operator { symbol: '+', .. }));
    assert!(kinds[2].is_call());
}

#[test]
fn arity_window_is_enforced() {
    let catalog = catalog();
    let container = container();
    let env = ParseEnv::new(&catalog, &container);

    assert_eq!(
        first_error("Random()", Grammar::Math, &env).kind(),
        ErrorKind::TooFewArguments
    );
    assert_eq!(
        first_error("Random(1, 2)", Grammar::Math, &env).kind(),
        ErrorKind::TooManyArguments
    );
    // within the window: the optional parameter may be omitted
    assert!(es::validate_math("Clamp(5)", &env).is_ok());
    assert!(es::validate_math("Clamp(5, 8)", &env).is_ok());
}

#[test]
fn optional_parameter_gets_declared_default() {
    let catalog = catalog();
    let container = container();
    let env = ParseEnv::new(&catalog, &container);

    let parsed = parse_to_ast(&env, Grammar::Math, "Clamp(5)");
    assert!(parsed.is_valid());
    let arguments = parsed.nodes[0].arguments().unwrap();
    assert_eq!(arguments.len(), 2);
    assert_eq!(arguments[0].plain_string(), "5");
    assert_eq!(arguments[1].plain_string(), "100");
}

#[test]
fn code_only_parameter_gets_blank_placeholder() {
    let catalog = catalog();
    let container = container();
    let env = ParseEnv::new(&catalog, &container);

    // the author writes no arguments at all: min is 0
    let parsed = parse_to_ast(&env, Grammar::Math, "TimeDelta()");
    assert!(parsed.is_valid());
    let arguments = parsed.nodes[0].arguments().unwrap();
    assert_eq!(arguments.len(), 2);
    assert!(arguments[0].is_empty());
    // optional numeric parameter left empty falls back to "0"
    assert_eq!(arguments[1].plain_string(), "0");
}

#[test]
fn object_member_call_resolves_through_object_type() {
    let catalog = catalog();
    let container = container();
    let env = ParseEnv::new(&catalog, &container);

    let parsed = parse_to_ast(&env, Grammar::Math, "Hero.X()");
    assert!(parsed.is_valid());
    match &parsed.nodes[0] {
        ExpressionNode::ObjectFunctionCall {
            object_name,
            name,
            arguments,
            ..
        } => {
            assert_eq!(object_name, "Hero");
            assert_eq!(name, "X");
            // the object name occupies the first parameter slot
            assert_eq!(arguments[0].plain_string(), "Hero");
        }
        other => panic!("expected an object call, got {:?}", other),
    }
}

#[test]
fn tilde_stands_for_a_space_in_object_names() {
    let catalog = catalog();
    let container = container();
    let env = ParseEnv::new(&catalog, &container);

    let parsed = parse_to_ast(&env, Grammar::Math, "My~Object.X() + 1");
    assert!(parsed.is_valid());
    match &parsed.nodes[0] {
        ExpressionNode::ObjectFunctionCall { object_name, .. } => {
            assert_eq!(object_name, "My Object");
        }
        other => panic!("expected an object call, got {:?}", other),
    }
}

#[test]
fn behavior_call_requires_attachment() {
    let catalog = catalog();
    let container = container();
    let env = ParseEnv::new(&catalog, &container);

    let parsed = parse_to_ast(&env, Grammar::Math, "Hero.Physics::Mass()");
    assert!(parsed.is_valid());
    match &parsed.nodes[0] {
        ExpressionNode::BehaviorFunctionCall {
            object_name,
            behavior_name,
            name,
            arguments,
            ..
        } => {
            assert_eq!(object_name, "Hero");
            assert_eq!(behavior_name, "Physics");
            assert_eq!(name, "Mass");
            assert_eq!(arguments[0].plain_string(), "Hero");
            assert_eq!(arguments[1].plain_string(), "Physics");
        }
        other => panic!("expected a behavior call, got {:?}", other),
    }

    // Crate has no Physics behavior: under the strict policy this is a
    // dedicated diagnostic rather than a generic syntax failure.
    let strict = env.with_policy(IdentifierPolicy::Strict);
    assert_eq!(
        first_error("Crate.Physics::Mass()", Grammar::Math, &strict).kind(),
        ErrorKind::BehaviorNotAttached
    );
}

#[test]
fn lenient_policy_passes_unknown_identifiers_to_the_validator() {
    let catalog = catalog();
    let container = container();
    let env = ParseEnv::new(&catalog, &container);

    // unknown identifiers survive resolution but the residue is not
    // arithmetic, so the character validator reports them
    assert_eq!(
        first_error("Foo(1)", Grammar::Math, &env).kind(),
        ErrorKind::InvalidCharacter
    );
    // purely numeric text flows through untouched
    assert!(es::validate_math("3.5e2 + (1 - 2) % 3", &env).is_ok());
}

#[test]
fn strict_policy_reports_unknown_functions() {
    let catalog = catalog();
    let container = container();
    let env = ParseEnv::new(&catalog, &container).with_policy(IdentifierPolicy::Strict);

    let error = first_error("Foo(1)", Grammar::Math, &env);
    assert_eq!(error.kind(), ErrorKind::UnknownFunction);
    assert_eq!(error.span().start, 0);

    // parenthesized arithmetic is not mistaken for a call
    assert!(es::validate_math("(1+2)*3", &env).is_ok());
    assert!(es::validate_math("Random(8)", &env).is_ok());
}

#[test]
fn missing_call_parenthesis() {
    let catalog = catalog();
    let container = container();
    let env = ParseEnv::new(&catalog, &container);

    assert_eq!(
        first_error("Hero.X y", Grammar::Math, &env).kind(),
        ErrorKind::MissingParenthesis
    );
    assert_eq!(
        first_error("Random(1", Grammar::Math, &env).kind(),
        ErrorKind::UnterminatedParenthesis
    );
}

#[test]
fn sub_expression_errors_are_rebased_into_the_outer_expression() {
    let catalog = catalog();
    let container = container();
    let env = ParseEnv::new(&catalog, &container);

    let error = first_error("Random(Random())", Grammar::Math, &env);
    assert_eq!(error.kind(), ErrorKind::TooFewArguments);
    // the inner diagnostic sits at offset 6 of the parameter text and is
    // shifted by the enclosing call's name end
    assert_eq!(error.position(), 12);
}

#[test]
fn text_literal_segments() {
    let catalog = catalog();
    let container = container();
    let env = ParseEnv::new(&catalog, &container);

    let parsed = parse_to_ast(&env, Grammar::Text, r#""Hello""#);
    assert!(parsed.is_valid());
    assert!(matches!(&parsed.nodes[0], ExpressionNode::Text { text, .. } if text == "Hello"));

    // escaped quotes do not close the literal and are unescaped
    let parsed = parse_to_ast(&env, Grammar::Text, r#""Say \"hi\"""#);
    assert!(parsed.is_valid());
    assert!(
        matches!(&parsed.nodes[0], ExpressionNode::Text { text, .. } if text == r#"Say "hi""#)
    );
}

#[test]
fn text_concatenation_requires_an_explicit_plus() {
    let catalog = catalog();
    let container = container();
    let env = ParseEnv::new(&catalog, &container);

    assert!(es::validate_text(r#""a" + "b" + ToString(42)"#, &env).is_ok());

    let error = first_error(r#""a" "b""#, Grammar::Text, &env);
    assert_eq!(error.kind(), ErrorKind::MissingOperator);
    assert_eq!(error.position(), 4);

    assert_eq!(
        first_error(r#""a" ++ "b""#, Grammar::Text, &env).kind(),
        ErrorKind::MissingNumber
    );
}

#[test]
fn text_expression_must_contain_a_token() {
    let catalog = catalog();
    let container = container();
    let env = ParseEnv::new(&catalog, &container);

    assert_eq!(
        first_error("", Grammar::Text, &env).kind(),
        ErrorKind::EmptyExpression
    );
    assert_eq!(
        first_error("hello", Grammar::Text, &env).kind(),
        ErrorKind::EmptyExpression
    );
    assert_eq!(
        first_error(r#""abc"#, Grammar::Text, &env).kind(),
        ErrorKind::UnterminatedString
    );
    assert_eq!(
        first_error("Foo(1)", Grammar::Text, &env).kind(),
        ErrorKind::UnknownFunction
    );
    assert_eq!(
        first_error(r#""a" + "b" xyz"#, Grammar::Text, &env).kind(),
        ErrorKind::DanglingToken
    );
}

#[test]
fn quoted_parameters_protect_commas_and_parentheses() {
    let catalog = catalog();
    let container = container();
    let env = ParseEnv::new(&catalog, &container);

    let parsed = parse_to_ast(&env, Grammar::Text, r#"SubStr("a,b(c", 0, 1)"#);
    assert!(parsed.is_valid());
    let arguments = parsed.nodes[0].arguments().unwrap();
    assert_eq!(arguments.len(), 3);
    assert_eq!(arguments[0].plain_string(), r#""a,b(c""#);
    assert_eq!(arguments[1].plain_string(), " 0");
    assert_eq!(arguments[2].plain_string(), " 1");
}

#[test]
fn opaque_parameters_recurse_through_the_text_grammar() {
    let catalog = catalog();
    let container = container();
    let env = ParseEnv::new(&catalog, &container);

    assert!(es::validate_text(r#"LayerColor("background")"#, &env).is_ok());
    // the optional opaque parameter left out falls back to the empty text
    let parsed = parse_to_ast(&env, Grammar::Text, "LayerColor()");
    assert!(parsed.is_valid());
    assert_eq!(parsed.nodes[0].arguments().unwrap()[0].plain_string(), "\"\"");
}

#[test]
fn arity_failure_still_yields_a_diagnosed_call_node() {
    let catalog = catalog();
    let container = container();
    let env = ParseEnv::new(&catalog, &container);

    let parsed = parse_to_ast(&env, Grammar::Math, "Random(1, 2)");
    assert!(!parsed.is_valid());
    assert_eq!(
        parsed.error.as_ref().map(|e| e.kind()),
        Some(ErrorKind::TooManyArguments)
    );
    // the offending call is present in the tree with the diagnostic attached
    assert!(parsed.nodes[0].is_call());
    assert_eq!(
        parsed.nodes[0].diagnostic().map(|d| d.kind()),
        Some(ErrorKind::TooManyArguments)
    );
}

#[test]
fn cached_ast_tracks_environment_identity() {
    let catalog = catalog();
    let container = container();
    let env = ParseEnv::new(&catalog, &container);

    let expression = Expression::new("Random(3)");
    assert!(!expression.has_cached_ast());
    assert!(expression.ast(Grammar::Math, &env).is_valid());
    assert!(expression.has_cached_ast());

    // same identity: the cache is reused and stays valid
    assert!(expression.ast(Grammar::Math, &env).is_valid());

    // a different catalog identity must force a re-parse
    let bare_catalog = MetadataCatalog::new();
    let bare_env = ParseEnv::new(&bare_catalog, &container);
    assert!(!expression.ast(Grammar::Math, &bare_env).is_valid());

    // and back: never serve stale results for the original environment
    assert!(expression.ast(Grammar::Math, &env).is_valid());
}

#[test]
fn editing_the_text_invalidates_the_cache() {
    let catalog = catalog();
    let container = container();
    let env = ParseEnv::new(&catalog, &container);

    let mut expression = Expression::new("Random(3)");
    assert!(expression.ast(Grammar::Math, &env).is_valid());
    expression.set_plain_string("Random()");
    assert!(!expression.has_cached_ast());
    assert!(!expression.ast(Grammar::Math, &env).is_valid());
}
