use graphcypher::translator::{Operation, SelectedField, TranslationError};
use graphcypher::translate;
use regex::Regex;
use serde_json::json;

use super::fixtures::schema;

fn statement_text(op: &Operation) -> String {
    translate(&schema(), op)
        .expect("operation translates")
        .statements
        .remove(0)
        .text
}

fn position(text: &str, needle: &str) -> usize {
    text.find(needle)
        .unwrap_or_else(|| panic!("`{}` not found in:\n{}", needle, text))
}

#[test]
fn test_connect_filtered_by_relationship_count() {
    let op = Operation::mutation("updateUsers")
        .with_args(json!({
            "where": {"name": "Ann"},
            "connect": {"likedPosts": [{"where": {"node": {"likesAggregate": {"count": 2}}}}]}
        }))
        .with_selection(vec![
            SelectedField::new("users").with_selection(vec![SelectedField::new("name")]),
        ]);
    let statement = translate(&schema(), &op).unwrap().statements.remove(0);

    let counted = Regex::new(
        r"(?s)MATCH \((this\d+):Post\)\n\s+CALL \{\n\s+WITH (this\d+)\n\s+MATCH \((this\d+)\)<-\[this\d+:LIKES\]-\((this\d+):User\)\n\s+RETURN count\((this\d+)\) = \$(param\d+) AS (var\d+)\n\s+\}\n\s+WITH \*\n\s+WHERE (var\d+) = true",
    )
    .unwrap();
    let captures = counted
        .captures(&statement.text)
        .unwrap_or_else(|| panic!("count subquery missing:\n{}", statement.text));
    let post = &captures[1];
    assert_eq!(&captures[2], post);
    assert_eq!(&captures[3], post);
    assert_eq!(&captures[4], &captures[5]);
    assert_eq!(&captures[7], &captures[8]);
    assert_eq!(statement.params[&captures[6]], json!(2));

    let merge = Regex::new(&format!(r"MERGE \(this\)-\[this\d+:LIKES\]->\({}\)", post)).unwrap();
    assert!(merge.is_match(&statement.text));
    assert!(statement.text.ends_with("RETURN collect(DISTINCT this { .name }) AS data"));
}

#[test]
fn test_aggregate_conditions_share_one_subquery() {
    let op = Operation::query("posts")
        .with_args(json!({
            "where": {"likesAggregate": {"AND": [
                {"edge": {"likedAt_MIN_LTE": "2024-01-01T00:00:00Z"}},
                {"node": {"name_SHORTEST_LT": 6}},
                {"count": 2}
            ]}}
        }))
        .with_selection(vec![SelectedField::new("name")]);
    let statement = translate(&schema(), &op).unwrap().statements.remove(0);

    assert!(statement
        .text
        .starts_with("MATCH (this:Post)\nCALL {\n    WITH this\n    MATCH (this)<-[this0:LIKES]-(this1:User)\n"));
    assert!(statement.text.contains(
        "min(this0.likedAt) <= datetime($param0) AND min(size(this1.name)) < $param1 AND count(this1) = $param2"
    ));
    assert_eq!(statement.text.matches("CALL {").count(), 1);
    assert!(statement.text.contains("WITH *\nWHERE var2 = true"));
    assert!(statement.text.ends_with("RETURN this { .name } AS this"));
    assert_eq!(statement.params["param0"], json!("2024-01-01T00:00:00Z"));
    assert_eq!(statement.params["param1"], json!(6));
    assert_eq!(statement.params["param2"], json!(2));
}

#[test]
fn test_nested_deletes_run_innermost_first() {
    let op = Operation::mutation("deleteUsers").with_args(json!({
        "where": {"name": "Ann"},
        "delete": {"likedPosts": [{
            "where": {"node": {"name": "Draft"}},
            "delete": {"comments": [{"where": {"node": {"text": "spam"}}}]}
        }]}
    }));
    let text = statement_text(&op);

    let comments = position(&text, "DETACH DELETE this2");
    let posts = position(&text, "DETACH DELETE this0");
    assert!(comments < posts);
    assert!(text.ends_with("\nDETACH DELETE this"));
    assert!(text.contains("MATCH (this)-[this1:LIKES]->(this0:Post)"));
    assert!(text.contains("MATCH (this0)-[this3:HAS_COMMENT]->(this2:Comment)"));
}

#[test]
fn test_nested_delete_rejects_unknown_relationship() {
    let op = Operation::mutation("deleteUsers").with_args(json!({
        "delete": {"likedPosts": [{"delete": {"authors": [{}]}}]}
    }));
    let err = translate(&schema(), &op).unwrap_err();
    assert_eq!(err, TranslationError::unknown_field("PostDeleteInput", "authors"));
}

#[test]
fn test_interface_connect_on_implementer_only_touches_that_type() {
    let op = Operation::mutation("updateActors").with_args(json!({
        "where": {"name": "Al"},
        "connect": {"productions": [{
            "where": {"node": {"title": "Heat"}},
            "connect": {"_on": {"Movie": [{"actors": [{"where": {"node": {"name": "Val"}}}]}]}}
        }]}
    }));
    let text = statement_text(&op);

    assert!(text.contains("MERGE (this)-[this1:ACTED_IN]->(this0)"));
    assert!(text.contains("CALL {\n        WITH this0\n        WITH this0\n        WHERE this0:Movie\n"));
    assert!(!text.contains("WHERE this0:Series"));
    let nested = Regex::new(r"MERGE \(this0\)<-\[this\d+:ACTED_IN\]-\(this\d+\)").unwrap();
    assert!(nested.is_match(&text), "{}", text);
}

#[test]
fn test_interface_connect_rejects_unknown_implementer() {
    let op = Operation::mutation("updateActors").with_args(json!({
        "connect": {"productions": [{"connect": {"_on": {"Play": [{}]}}}]}
    }));
    let err = translate(&schema(), &op).unwrap_err();
    assert!(matches!(err, TranslationError::UnknownField { ref field, .. } if field == "Play"));
}
