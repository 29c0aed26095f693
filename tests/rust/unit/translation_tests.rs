use graphcypher::CompiledSchema;
use graphcypher::response::cursor::offset_to_cursor;
use graphcypher::translator::{
    self, Operation, SelectedField, TranslateOptions, TranslationError, translate,
};
use serde_json::{Value, json};
use test_case::test_case;

const TYPE_DEFS: &str = r#"
    type Author {
        name: String!
        books: [Book!]! @relationship(type: "WROTE", direction: OUT, properties: "Wrote")
        favourite: Shelfable @relationship(type: "FAVOURITE", direction: OUT)
    }
    type Book {
        title: String!
        authors: [Author!]! @relationship(type: "WROTE", direction: IN, properties: "Wrote")
    }
    type Magazine {
        title: String!
    }
    union Shelfable = Book | Magazine
    type Wrote @relationshipProperties {
        position: Int
    }
"#;

fn schema() -> CompiledSchema {
    CompiledSchema::from_sdl(TYPE_DEFS).expect("type defs compile")
}

fn error_kind(err: &TranslationError) -> &'static str {
    match err {
        TranslationError::Validation { .. } => "validation",
        TranslationError::UnknownField { .. } => "unknown_field",
        TranslationError::UnknownType { .. } => "unknown_type",
        TranslationError::CardinalityViolation { .. } => "cardinality",
    }
}

fn update_authors(args: Value) -> Operation {
    Operation::mutation("updateAuthors").with_args(args)
}

#[test]
fn test_union_value_with_two_members_is_rejected() {
    let op = update_authors(json!({
        "where": {"name": "Ann"},
        "connect": {"favourite": {
            "Book": {"where": {"node": {"title": "Dune"}}},
            "Magazine": {"where": {"node": {"title": "Wired"}}}
        }}
    }));
    let err = translate(&schema(), &op).unwrap_err();
    match err {
        TranslationError::Validation { path, message } => {
            assert_eq!(path, "updateAuthors.connect.favourite");
            assert!(message.contains("Book") && message.contains("Magazine"));
        }
        other => panic!("expected a validation error, got {:?}", other),
    }
}

#[test]
fn test_union_connect_targets_the_named_member() {
    let op = update_authors(json!({
        "where": {"name": "Ann"},
        "connect": {"favourite": {"Magazine": {"where": {"node": {"title": "Wired"}}}}}
    }));
    let text = translate(&schema(), &op).unwrap().statements.remove(0).text;
    assert!(text.contains("MATCH (this0:Magazine)\n    WHERE this0.title = $param1"));
    assert!(text.contains("MERGE (this)-[this1:FAVOURITE]->(this0)"));
    assert!(!text.contains("(this0:Book)"));
}

#[test_case(Operation::query("createAuthors"), "validation" ; "mutation root used as query")]
#[test_case(Operation::mutation("authors"), "validation" ; "query root used as mutation")]
#[test_case(Operation::query("publishers"), "unknown_type" ; "unknown root field")]
#[test_case(Operation::query("authors").with_args(json!({"first": 3})), "unknown_field" ; "unknown root argument")]
#[test_case(Operation::query("authors").with_args(json!({"where": {"name_FUZZY": "A"}})), "unknown_field" ; "unknown comparator")]
#[test_case(Operation::mutation("createAuthors").with_args(json!({"input": [{}]})), "validation" ; "required field missing")]
#[test_case(Operation::mutation("createAuthors").with_args(json!({"input": [{"name": 7}]})), "validation" ; "wrong scalar kind")]
#[test_case(update_authors(json!({"connect": {"favourite": {"Book": [{"where": {}}]}}})), "validation" ; "list given to singular relationship")]
#[test_case(update_authors(json!({"connect": {"favourite": {"Novel": {}}}})), "unknown_field" ; "unknown union member")]
#[test_case(update_authors(json!({"disconnect": {"books": [{"edge": {}}]}})), "unknown_field" ; "unknown disconnect key")]
#[test_case(update_authors(json!({"update": {"name": null}})), "validation" ; "required field nulled")]
fn test_invalid_operations_emit_nothing(op: Operation, expected: &str) {
    let err = translate(&schema(), &op).expect_err("operation should be rejected");
    assert_eq!(error_kind(&err), expected, "{}", err);
}

#[test]
fn test_depth_bound_applies_to_selections() {
    let nested = SelectedField::new("books").with_selection(vec![
        SelectedField::new("authors").with_selection(vec![SelectedField::new("name")]),
    ]);
    let op = Operation::query("authors").with_selection(vec![nested]);

    assert!(translator::translate_with_options(&schema(), &op, &TranslateOptions { max_depth: 2 }).is_ok());
    let err = translator::translate_with_options(&schema(), &op, &TranslateOptions { max_depth: 1 }).unwrap_err();
    assert!(matches!(err, TranslationError::Validation { ref path, .. } if path == "authors.books.authors"));
}

#[test]
fn test_values_are_always_parameters() {
    let hostile = "x\" }) DETACH DELETE n //";
    let op = Operation::query("authors")
        .with_args(json!({"where": {"name": hostile}}))
        .with_selection(vec![SelectedField::new("name")]);
    let statement = translate(&schema(), &op).unwrap().statements.remove(0);
    assert!(!statement.text.contains(hostile));
    assert!(!statement.text.contains("DETACH DELETE"));
    assert_eq!(statement.params["param0"], json!(hostile));
}

#[test]
fn test_edge_properties_written_on_create_are_read_back_through_connections() {
    let schema = schema();
    let create = Operation::mutation("createAuthors").with_args(json!({
        "input": [{
            "name": "Ann",
            "books": {"create": [{"node": {"title": "Dune"}, "edge": {"position": 1}}]}
        }]
    }));
    let statement = translate(&schema, &create).unwrap().statements.remove(0);
    assert!(statement.text.contains("CREATE (this0:Author)"));
    assert!(statement.text.contains(":WROTE]->"));
    assert!(statement.params.values().any(|v| v == &json!(1)));

    let read = Operation::query("authors").with_selection(vec![
        SelectedField::new("booksConnection").with_selection(vec![SelectedField::new("edges").with_selection(vec![
            SelectedField::new("properties").with_selection(vec![SelectedField::new("position")]),
            SelectedField::new("node").with_selection(vec![SelectedField::new("title")]),
        ])]),
    ]);
    let text = translate(&schema, &read).unwrap().statements.remove(0).text;
    assert!(text.contains("MATCH (this)-[this2:WROTE]->(this1:Book)"));
    assert!(text.contains(
        "RETURN { node: this1 { .title }, properties: this2 { __typename: \"Wrote\", .position } } AS edge0"
    ));
}

#[test]
fn test_cursor_past_the_last_offset_is_invalid() {
    let after = offset_to_cursor(usize::MAX);
    let op = Operation::query("authorsConnection")
        .with_args(json!({"after": after}))
        .with_selection(vec![SelectedField::new("totalCount")]);
    let err = translate(&schema(), &op).unwrap_err();
    assert_eq!(
        err,
        TranslationError::validation_with_context("authorsConnection.after", "invalid cursor")
    );
}

#[test]
fn test_delete_returns_no_node_data() {
    let op = Operation::mutation("deleteAuthors").with_args(json!({"where": {"name": "Ann"}}));
    let translated = translate(&schema(), &op).unwrap();
    assert_eq!(translated.response.data_field, None);
    assert_eq!(translated.response.column, "data");
    assert!(translated.statements[0].text.ends_with("DETACH DELETE this"));
}
