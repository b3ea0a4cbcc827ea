use pretty_assertions::assert_eq;
use querysql::prelude::*;

fn compile_json(json: &str, config: &SqlConfig) -> FilterResult<Clause> {
    let node = querysql::from_json(json).expect("Failed to decode filter");
    querysql::compile(&node, config)
}

#[test]
fn test_or_group_of_equals() {
    let clause = compile_json(
        r#"{
            "glue": "or",
            "rules": [
                { "field": "a", "condition": { "type": "equal", "filter": 1 } },
                { "field": "b", "condition": { "type": "equal", "filter": 2 } }
            ]
        }"#,
        &SqlConfig::new(),
    )
    .unwrap();

    assert_eq!(clause.sql, "( a = ? OR b = ? )");
    assert_eq!(clause.params, vec![Value::Int(1), Value::Int(2)]);
}

#[test]
fn test_degenerate_leaf_under_whitelist() {
    let config = SqlConfig::new().allow(["name", "age"]);
    let clause = compile_json(r#"{ "field": "", "condition": {} }"#, &config).unwrap();
    assert_eq!(clause, Clause::empty());

    let clause = compile_json("{}", &config).unwrap();
    assert_eq!(clause, Clause::empty());
}

#[test]
fn test_null_operator_emits_nothing() {
    let json = r#"{ "field": "a", "condition": { "type": null, "filter": 1 } }"#;

    let clause = compile_json(json, &SqlConfig::new().allow(["a"])).unwrap();
    assert_eq!(clause, Clause::empty());

    match compile_json(json, &SqlConfig::new().allow(["b"])) {
        Err(FilterError::FieldNotAllowed(field)) => assert_eq!(field, "a"),
        other => panic!("expected FieldNotAllowed, got {:?}", other),
    }
}

#[test]
fn test_whitelist_rejects_secret() {
    let config = SqlConfig::new().allow(["name", "age"]);
    let shapes = [
        r#"{ "field": "secret", "condition": { "type": "equal", "filter": 1 } }"#,
        r#"{ "field": "secret", "condition": { "type": "between", "filter": [1, 2] } }"#,
        r#"{ "field": "secret", "condition": { "type": "foo", "filter": 1 } }"#,
        r#"{ "field": "secret", "condition": {} }"#,
        r#"{ "field": "secret", "includes": [1, 2] }"#,
    ];

    for json in shapes {
        match compile_json(json, &config) {
            Err(FilterError::FieldNotAllowed(field)) => assert_eq!(field, "secret"),
            other => panic!("expected FieldNotAllowed for {}, got {:?}", json, other),
        }
    }
}

#[test]
fn test_whitelist_checked_inside_groups() {
    let config = SqlConfig::new().allow(["name"]);
    let res = compile_json(
        r#"{ "rules": [
            { "field": "name", "condition": { "type": "equal", "filter": "x" } },
            { "glue": "or", "rules": [
                { "field": "secret", "condition": { "type": "equal", "filter": "y" } }
            ] }
        ] }"#,
        &config,
    );
    assert!(matches!(res, Err(FilterError::FieldNotAllowed(f)) if f == "secret"));
}

#[test]
fn test_between_open_bounds() {
    let config = SqlConfig::new();
    let cases = [
        ("[18, null]", "age > ?", vec![Value::Int(18)]),
        ("[null, 65]", "age < ?", vec![Value::Int(65)]),
        ("[18, 65]", "( age > ? AND age < ? )", vec![Value::Int(18), Value::Int(65)]),
    ];

    for (filter, sql, params) in cases {
        let json = format!(
            r#"{{ "field": "age", "condition": {{ "type": "between", "filter": {} }} }}"#,
            filter
        );
        let clause = compile_json(&json, &config).unwrap();
        assert_eq!(clause.sql, sql);
        assert_eq!(clause.params, params);
    }
}

#[test]
fn test_range_arity_mismatch() {
    let config = SqlConfig::new();
    for op in ["between", "notBetween"] {
        for (filter, got) in [("[1]", 1), ("[1, 2, 3]", 3), ("7", 1), ("[]", 0)] {
            let json = format!(
                r#"{{ "field": "age", "condition": {{ "type": "{}", "filter": {} }} }}"#,
                op, filter
            );
            match compile_json(&json, &config) {
                Err(FilterError::ArityMismatch {
                    operator,
                    got: actual,
                    ..
                }) => {
                    assert_eq!(operator, op);
                    assert_eq!(actual, got);
                }
                other => panic!("expected ArityMismatch for {}, got {:?}", json, other),
            }
        }
    }
}

#[test]
fn test_unknown_operator() {
    let json = r#"{ "field": "name", "condition": { "type": "foo", "filter": "bar" } }"#;
    match compile_json(json, &SqlConfig::new()) {
        Err(FilterError::UnknownOperator(op)) => assert_eq!(op, "foo"),
        other => panic!("expected UnknownOperator, got {:?}", other),
    }
}

#[test]
fn test_custom_operation_output_is_verbatim() {
    let config = SqlConfig::new().operation(
        "foo",
        |field: &str, operator: &str, operand: &Operand| -> FilterResult<Clause> {
            Ok(Clause::new(
                format!("{} SOUNDS LIKE ? /* {} */", field, operator),
                vec![operand.single(operator)?.clone(), Value::Bool(true)],
            ))
        },
    );

    let clause = compile_json(
        r#"{ "field": "name", "condition": { "type": "foo", "filter": "bar" } }"#,
        &config,
    )
    .unwrap();
    assert_eq!(clause.sql, "name SOUNDS LIKE ? /* foo */");
    assert_eq!(clause.params, vec![Value::from("bar"), Value::Bool(true)]);
}

#[test]
fn test_custom_operation_error_propagates_unchanged() {
    let config = SqlConfig::new().operation(
        "fail",
        |_: &str, _: &str, _: &Operand| -> FilterResult<Clause> {
            Err(FilterError::operation("handler refused"))
        },
    );

    let res = compile_json(
        r#"{ "rules": [
            { "field": "a", "condition": { "type": "equal", "filter": 1 } },
            { "field": "b", "condition": { "type": "fail" } }
        ] }"#,
        &config,
    );
    match res {
        Err(FilterError::Operation(msg)) => assert_eq!(msg, "handler refused"),
        other => panic!("expected handler error, got {:?}", other),
    }
}

#[test]
fn test_builtins_are_not_overridden_by_operations() {
    let config = SqlConfig::new().operation(
        "equal",
        |_: &str, _: &str, _: &Operand| -> FilterResult<Clause> {
            Ok(Clause::new("overridden", Vec::new()))
        },
    );
    let clause = compile_json(
        r#"{ "field": "a", "condition": { "type": "equal", "filter": 1 } }"#,
        &config,
    )
    .unwrap();
    assert_eq!(clause.sql, "a = ?");
}

#[test]
fn test_template_operation_from_config_file() {
    let config = FileConfig::from_toml(
        r#"
        whitelist = ["name", "deleted_at"]

        [operations]
        regex = "{field} REGEXP ?"
        isNull = "{field} IS NULL"
        "#,
    )
    .unwrap()
    .into_sql_config()
    .unwrap();

    let clause = compile_json(
        r#"{ "rules": [
            { "field": "name", "condition": { "type": "regex", "filter": "^jo" } },
            { "field": "deleted_at", "condition": { "type": "isNull" } }
        ] }"#,
        &config,
    )
    .unwrap();
    assert_eq!(clause.sql, "( name REGEXP ? AND deleted_at IS NULL )");
    assert_eq!(clause.params, vec![Value::from("^jo")]);
}

#[test]
fn test_placeholders_match_params_in_nested_tree() {
    let json = r#"{
        "glue": "and",
        "rules": [
            { "field": "name", "condition": { "type": "beginsWith", "filter": "Jo" } },
            { "glue": "or", "rules": [
                { "field": "age", "condition": { "type": "notBetween", "filter": [18, 65] } },
                { "field": "role", "includes": ["admin", "owner"] },
                { "rules": [
                    { "field": "score", "condition": { "type": "greaterOrEqual", "filter": 9.5 } }
                ] }
            ] },
            { "field": "email", "condition": { "type": "notEndsWith", "filter": "@spam.io" } }
        ]
    }"#;
    let clause = compile_json(json, &SqlConfig::new()).unwrap();

    assert_eq!(
        clause.sql,
        "( name LIKE CONCAT(?, '%') AND ( ( age < ? OR age > ? ) OR role IN(?, ?) OR score >= ? ) AND email NOT LIKE CONCAT('%', ?) )"
    );
    assert_eq!(
        clause.params,
        vec![
            Value::from("Jo"),
            Value::Int(18),
            Value::Int(65),
            Value::from("admin"),
            Value::from("owner"),
            Value::Float(9.5),
            Value::from("@spam.io"),
        ]
    );
    assert_eq!(clause.sql.matches('?').count(), clause.params.len());
}

#[test]
fn test_compile_is_idempotent() {
    let node = querysql::from_json(
        r#"{ "glue": "or", "rules": [
            { "field": "a", "includes": [1, 2, 3] },
            { "field": "b", "condition": { "type": "contains", "filter": "x" } }
        ] }"#,
    )
    .unwrap();
    let config = SqlConfig::new().allow(["a", "b"]);

    let first = querysql::compile(&node, &config).unwrap();
    let second = querysql::compile(&node, &config).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_invalid_json() {
    assert!(matches!(
        querysql::from_json("{ not json"),
        Err(FilterError::Json(_))
    ));
}
