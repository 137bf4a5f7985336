#![no_main]

use arbitrary::Arbitrary;
use gridlite_core::{
    translate_search, translate_sort, ColumnInfo, SearchClause, SearchLogic, SortClause,
    TableSchema,
};
use libfuzzer_sys::fuzz_target;

#[derive(Arbitrary, Debug)]
enum Operand {
    Text(String),
    Integer(i64),
    Real(f64),
    Pair(i64, i64),
    Null,
}

#[derive(Arbitrary, Debug)]
struct Clause {
    field: String,
    operator: String,
    value: Operand,
}

#[derive(Arbitrary, Debug)]
struct Input {
    clauses: Vec<Clause>,
    sort: Vec<(String, String)>,
    or: bool,
}

fuzz_target!(|input: Input| {
    let schema = TableSchema::new(
        "people",
        vec![
            ColumnInfo::new("fname", "TEXT"),
            ColumnInfo::new("age", "INTEGER"),
            ColumnInfo::new("score", "REAL"),
            ColumnInfo::new("photo", "BLOB"),
            ColumnInfo::new("misc", ""),
        ],
    );

    let clauses: Vec<SearchClause> = input
        .clauses
        .into_iter()
        .take(32)
        .map(|c| {
            let value = match c.value {
                Operand::Text(s) => serde_json::Value::from(s),
                Operand::Integer(i) => serde_json::Value::from(i),
                Operand::Real(f) => serde_json::Value::from(f),
                Operand::Pair(a, b) => serde_json::json!([a, b]),
                Operand::Null => serde_json::Value::Null,
            };
            SearchClause::new(c.field, c.operator, value)
        })
        .collect();
    let logic = if input.or { SearchLogic::Or } else { SearchLogic::And };

    if let Ok(fragment) = translate_search(&schema, &clauses, logic) {
        // Every value is bound, never embedded
        let placeholders = fragment.condition.matches('?').count();
        assert_eq!(placeholders, fragment.params.len());
    }

    let sort: Vec<SortClause> = input
        .sort
        .into_iter()
        .take(8)
        .map(|(field, direction)| SortClause { field, direction })
        .collect();
    if let Ok(order_by) = translate_sort(&schema, &sort) {
        assert!(order_by.ends_with("rowid"));
    }
});
