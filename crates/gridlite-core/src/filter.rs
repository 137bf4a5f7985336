/// Grid search and sort translation
///
/// Turns the grid's search clauses into a parameterised WHERE fragment and
/// its sort clauses into an ORDER BY fragment. Field names are resolved
/// against a [`TableSchema`]; values are only ever bound, never written into
/// the SQL text.
use crate::error::{Error, Result};
use crate::schema::{quote_identifier, ColumnInfo, TableSchema};
use crate::value::Value;
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;

/// Escape character used in generated LIKE patterns
const LIKE_ESCAPE: char = '\\';

/// One search clause as sent by the grid
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SearchClause {
    pub field: String,
    pub operator: String,
    #[serde(default)]
    pub value: serde_json::Value,
}

impl SearchClause {
    pub fn new(
        field: impl Into<String>,
        operator: impl Into<String>,
        value: serde_json::Value,
    ) -> Self {
        Self {
            field: field.into(),
            operator: operator.into(),
            value,
        }
    }
}

/// One sort clause as sent by the grid
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SortClause {
    pub field: String,
    #[serde(default = "default_direction")]
    pub direction: String,
}

fn default_direction() -> String {
    "asc".to_string()
}

/// Keyword placed between all search clauses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchLogic {
    #[default]
    And,
    Or,
}

impl SearchLogic {
    fn as_sql(&self) -> &'static str {
        match self {
            SearchLogic::And => " AND ",
            SearchLogic::Or => " OR ",
        }
    }
}

impl FromStr for SearchLogic {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "AND" => Ok(SearchLogic::And),
            "OR" => Ok(SearchLogic::Or),
            other => Err(Error::MalformedRequest(format!(
                "search logic must be AND or OR, got '{}'",
                other
            ))),
        }
    }
}

/// Operators understood for TEXT and BLOB columns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextOperator {
    Is,
    Begins,
    Contains,
    Ends,
}

impl TextOperator {
    fn parse(operator: &str) -> Option<Self> {
        match operator {
            "is" => Some(TextOperator::Is),
            "begins" => Some(TextOperator::Begins),
            "contains" => Some(TextOperator::Contains),
            "ends" => Some(TextOperator::Ends),
            _ => None,
        }
    }
}

/// Operators understood for INTEGER, REAL and NUMERIC columns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumericOperator {
    Eq,
    Lt,
    Gt,
    Between,
}

impl NumericOperator {
    fn parse(operator: &str) -> Option<Self> {
        match operator {
            "is" | "=" => Some(NumericOperator::Eq),
            "less" | "<" => Some(NumericOperator::Lt),
            "more" | ">" => Some(NumericOperator::Gt),
            "between" => Some(NumericOperator::Between),
            _ => None,
        }
    }
}

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl FromStr for SortDirection {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asc" => Ok(SortDirection::Asc),
            "desc" => Ok(SortDirection::Desc),
            other => Err(Error::MalformedRequest(format!(
                "sort direction must be asc or desc, got '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortDirection::Asc => write!(f, "ASC"),
            SortDirection::Desc => write!(f, "DESC"),
        }
    }
}

/// A WHERE condition with its bound parameters, in placeholder order
#[derive(Debug, Clone, PartialEq, Default)]
pub struct WhereFragment {
    pub condition: String,
    pub params: Vec<Value>,
}

impl WhereFragment {
    pub fn is_empty(&self) -> bool {
        self.condition.is_empty()
    }

    /// Renders the fragment as a clause, or an empty string when there is
    /// no condition.
    pub fn to_sql(&self) -> String {
        if self.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", self.condition)
        }
    }
}

/// Translates search clauses into a WHERE fragment.
///
/// Each clause is resolved against `schema`, rendered as a parenthesised
/// predicate and joined with `logic`. No clause is ever dropped: a clause
/// that cannot be translated fails the whole search.
///
/// # Errors
///
/// - `UnknownColumn` if a field is not part of the schema
/// - `UnsupportedOperator` if the operator is not defined for the field's type
/// - `UnsupportedFieldType` if the field has no declared type
/// - `MalformedRequest` if a value does not fit the operator
pub fn translate_search(
    schema: &TableSchema,
    clauses: &[SearchClause],
    logic: SearchLogic,
) -> Result<WhereFragment> {
    let mut predicates = Vec::with_capacity(clauses.len());
    let mut params = Vec::with_capacity(clauses.len());

    for clause in clauses {
        let column = schema.column(&clause.field)?;
        let predicate = if column.category.is_textual() {
            text_predicate(column, clause, &mut params)?
        } else if column.category.is_numeric() {
            numeric_predicate(column, clause, &mut params)?
        } else {
            return Err(Error::UnsupportedFieldType {
                field: column.name.clone(),
                declared_type: column.declared_type.clone(),
            });
        };
        predicates.push(format!("({})", predicate));
    }

    Ok(WhereFragment {
        condition: predicates.join(logic.as_sql()),
        params,
    })
}

fn text_predicate(
    column: &ColumnInfo,
    clause: &SearchClause,
    params: &mut Vec<Value>,
) -> Result<String> {
    let operator =
        TextOperator::parse(&clause.operator).ok_or_else(|| unsupported(column, clause))?;
    let text = Value::text_from_json(&clause.value).ok_or_else(|| {
        Error::MalformedRequest(format!(
            "search value for field '{}' must be a string",
            column.name
        ))
    })?;
    let field = quote_identifier(&column.name);

    let (sql, pattern) = match operator {
        TextOperator::Is => (format!("{} = ?", field), text),
        TextOperator::Begins => (like(&field), format!("{}%", escape_like(&text))),
        TextOperator::Contains => (like(&field), format!("%{}%", escape_like(&text))),
        TextOperator::Ends => (like(&field), format!("%{}", escape_like(&text))),
    };
    params.push(Value::Text(pattern));
    Ok(sql)
}

fn numeric_predicate(
    column: &ColumnInfo,
    clause: &SearchClause,
    params: &mut Vec<Value>,
) -> Result<String> {
    let operator =
        NumericOperator::parse(&clause.operator).ok_or_else(|| unsupported(column, clause))?;
    let field = quote_identifier(&column.name);

    let sql = match operator {
        NumericOperator::Between => {
            let bounds = match &clause.value {
                serde_json::Value::Array(items) if items.len() == 2 => items,
                _ => {
                    return Err(Error::MalformedRequest(format!(
                        "'between' on field '{}' needs a two element array",
                        column.name
                    )))
                }
            };
            params.push(number(column, &bounds[0])?);
            params.push(number(column, &bounds[1])?);
            return Ok(format!("{} BETWEEN ? AND ?", field));
        }
        NumericOperator::Eq => format!("{} = ?", field),
        NumericOperator::Lt => format!("{} < ?", field),
        NumericOperator::Gt => format!("{} > ?", field),
    };
    params.push(number(column, &clause.value)?);
    Ok(sql)
}

fn number(column: &ColumnInfo, value: &serde_json::Value) -> Result<Value> {
    Value::number_from_json(value).ok_or_else(|| {
        Error::MalformedRequest(format!(
            "search value for field '{}' must be a number",
            column.name
        ))
    })
}

fn unsupported(column: &ColumnInfo, clause: &SearchClause) -> Error {
    Error::UnsupportedOperator {
        field: column.name.clone(),
        operator: clause.operator.clone(),
        category: column.category.as_str(),
    }
}

fn like(field: &str) -> String {
    format!("{} LIKE ? ESCAPE '{}'", field, LIKE_ESCAPE)
}

/// Escapes LIKE wildcards so the text matches literally.
pub fn escape_like(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        if ch == LIKE_ESCAPE || ch == '%' || ch == '_' {
            escaped.push(LIKE_ESCAPE);
        }
        escaped.push(ch);
    }
    escaped
}

/// Translates sort clauses into an ORDER BY clause.
///
/// `rowid` is always appended as the last key so that pages are stable
/// even when the requested keys contain duplicates.
///
/// # Errors
///
/// `UnknownColumn` for fields outside the schema and `MalformedRequest`
/// for directions other than asc/desc.
pub fn translate_sort(schema: &TableSchema, clauses: &[SortClause]) -> Result<String> {
    let mut keys = Vec::with_capacity(clauses.len() + 1);
    for clause in clauses {
        let column = schema.column(&clause.field)?;
        let direction: SortDirection = clause.direction.parse()?;
        keys.push(format!("{} {}", quote_identifier(&column.name), direction));
    }
    keys.push("rowid".to_string());
    Ok(format!(" ORDER BY {}", keys.join(", ")))
}
