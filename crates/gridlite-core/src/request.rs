/// Grid request and response types
///
/// Wire shapes of the w2ui grid protocol: the JSON document the grid sends
/// in its `request` parameter and the envelope every data endpoint returns.
use crate::error::{Error, Result};
use crate::filter::{SearchClause, SearchLogic, SortClause};
use crate::record::{Record, RECID};
use crate::value::Value;
use serde::ser::{Serialize, SerializeMap, Serializer};
use serde::Deserialize;

/// List request as sent by the grid.
///
/// Keys the grid sends that gridlite does not use (`cmd`, `selected`, ...)
/// are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GridRequest {
    #[serde(default)]
    pub table_name: Option<String>,
    #[serde(default, alias = "filters")]
    pub search: Vec<SearchClause>,
    #[serde(default, rename = "searchLogic", alias = "logic")]
    pub search_logic: Option<String>,
    #[serde(default)]
    pub sort: Vec<SortClause>,
    #[serde(default)]
    pub limit: Option<i64>,
    #[serde(default)]
    pub offset: Option<i64>,
}

impl GridRequest {
    /// Parses the grid's JSON document.
    pub fn from_json(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Checks required fields and converts into a [`QueryRequest`].
    ///
    /// # Errors
    ///
    /// `MalformedRequest` if `table_name` or `limit` is missing, if `limit`
    /// or `offset` is negative, or if the search logic is unknown.
    pub fn into_query(self) -> Result<QueryRequest> {
        let table_name = self
            .table_name
            .ok_or_else(|| Error::MalformedRequest("missing field 'table_name'".to_string()))?;
        let limit = self
            .limit
            .ok_or_else(|| Error::MalformedRequest("missing field 'limit'".to_string()))?;
        let offset = self.offset.unwrap_or(0);
        if limit < 0 || offset < 0 {
            return Err(Error::MalformedRequest(format!(
                "limit and offset must not be negative (limit {}, offset {})",
                limit, offset
            )));
        }
        let logic = match self.search_logic {
            Some(logic) => logic.parse()?,
            None => SearchLogic::default(),
        };

        Ok(QueryRequest {
            table_name,
            search: self.search,
            logic,
            sort: self.sort,
            limit: limit as u64,
            offset: offset as u64,
        })
    }
}

/// A validated list request
#[derive(Debug, Clone, PartialEq)]
pub struct QueryRequest {
    pub table_name: String,
    pub search: Vec<SearchClause>,
    pub logic: SearchLogic,
    pub sort: Vec<SortClause>,
    pub limit: u64,
    pub offset: u64,
}

impl QueryRequest {
    /// A request for the first `limit` rows of `table_name`.
    pub fn first_page(table_name: impl Into<String>, limit: u64) -> Self {
        Self {
            table_name: table_name.into(),
            search: Vec::new(),
            logic: SearchLogic::And,
            sort: Vec::new(),
            limit,
            offset: 0,
        }
    }

    pub fn with_search(mut self, clause: SearchClause) -> Self {
        self.search.push(clause);
        self
    }

    pub fn with_logic(mut self, logic: SearchLogic) -> Self {
        self.logic = logic;
        self
    }

    pub fn with_sort(mut self, clause: SortClause) -> Self {
        self.sort.push(clause);
        self
    }

    pub fn with_offset(mut self, offset: u64) -> Self {
        self.offset = offset;
        self
    }
}

/// Delete request as sent by the grid
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DeleteRequest {
    #[serde(default)]
    pub table_name: Option<String>,
    #[serde(default, alias = "selected")]
    pub recid: Vec<i64>,
}

impl DeleteRequest {
    pub fn from_json(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }
}

/// Save request as sent by the grid: one object per edited row, holding
/// `recid` and the changed fields.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SaveRequest {
    #[serde(default)]
    pub table_name: Option<String>,
    #[serde(default)]
    pub changes: Vec<serde_json::Map<String, serde_json::Value>>,
}

impl SaveRequest {
    pub fn from_json(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Splits every change into its row identifier and field assignments.
    ///
    /// # Errors
    ///
    /// `MalformedRequest` if a change has no integer `recid`, changes no
    /// field, or assigns a value that is not a scalar.
    pub fn row_changes(&self) -> Result<Vec<RowChange>> {
        self.changes
            .iter()
            .map(|change| -> Result<RowChange> {
                let recid = change
                    .get(RECID)
                    .and_then(serde_json::Value::as_i64)
                    .ok_or_else(|| {
                        Error::MalformedRequest("every change needs an integer 'recid'".into())
                    })?;
                let mut fields = Vec::with_capacity(change.len());
                for (name, value) in change {
                    if name == RECID {
                        continue;
                    }
                    let value = Value::from_json(value).ok_or_else(|| {
                        Error::MalformedRequest(format!(
                            "value for field '{}' must be a scalar",
                            name
                        ))
                    })?;
                    fields.push((name.clone(), value));
                }
                if fields.is_empty() {
                    return Err(Error::MalformedRequest(format!(
                        "change for recid {} does not modify any field",
                        recid
                    )));
                }
                Ok(RowChange { recid, fields })
            })
            .collect()
    }
}

/// Field assignments for one row
#[derive(Debug, Clone, PartialEq)]
pub struct RowChange {
    pub recid: i64,
    pub fields: Vec<(String, Value)>,
}

/// Response wrapper returned by every data endpoint
#[derive(Debug, Clone, PartialEq)]
pub enum Envelope {
    /// Page of records plus the number of rows matching the search
    Records { total: u64, records: Vec<Record> },
    /// Write operation completed
    Done,
    /// Request failed
    Error { message: String },
}

impl Envelope {
    pub fn error(err: &Error) -> Self {
        Envelope::Error {
            message: err.to_string(),
        }
    }

    pub fn is_success(&self) -> bool {
        !matches!(self, Envelope::Error { .. })
    }

    pub fn status(&self) -> &'static str {
        if self.is_success() {
            "success"
        } else {
            "error"
        }
    }
}

impl From<Result<Envelope>> for Envelope {
    fn from(result: Result<Envelope>) -> Self {
        result.unwrap_or_else(|err| Envelope::error(&err))
    }
}

impl Serialize for Envelope {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Envelope::Records { total, records } => {
                let mut map = serializer.serialize_map(Some(3))?;
                map.serialize_entry("status", self.status())?;
                map.serialize_entry("total", total)?;
                map.serialize_entry("records", records)?;
                map.end()
            }
            Envelope::Done => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("status", self.status())?;
                map.end()
            }
            Envelope::Error { message } => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("status", self.status())?;
                map.serialize_entry("message", message)?;
                map.end()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_w2ui_request() {
        let raw = r#"{
            "cmd": "get",
            "selected": [],
            "limit": 100,
            "offset": 0,
            "table_name": "test",
            "search": [{"field": "fname", "type": "text", "operator": "begins", "value": "Jo"}],
            "searchLogic": "OR",
            "sort": [{"field": "lname", "direction": "desc"}]
        }"#;
        let query = GridRequest::from_json(raw).unwrap().into_query().unwrap();
        assert_eq!(query.table_name, "test");
        assert_eq!(query.limit, 100);
        assert_eq!(query.logic, SearchLogic::Or);
        assert_eq!(query.search.len(), 1);
        assert_eq!(query.search[0].value, json!("Jo"));
        assert_eq!(query.sort[0].direction, "desc");
    }

    #[test]
    fn test_aliases_for_filters_and_logic() {
        let raw = r#"{"table_name": "test", "limit": 5,
                      "filters": [{"field": "fname", "operator": "is", "value": "Max"}],
                      "logic": "and"}"#;
        let query = GridRequest::from_json(raw).unwrap().into_query().unwrap();
        assert_eq!(query.search.len(), 1);
        assert_eq!(query.logic, SearchLogic::And);
        assert_eq!(query.offset, 0);
    }

    #[test]
    fn test_missing_required_fields() {
        let err = GridRequest::from_json(r#"{"limit": 5}"#)
            .unwrap()
            .into_query()
            .unwrap_err();
        assert_eq!(err.kind(), "MalformedRequest");

        let err = GridRequest::from_json(r#"{"table_name": "test"}"#)
            .unwrap()
            .into_query()
            .unwrap_err();
        assert!(err.to_string().contains("limit"));

        let err = GridRequest::from_json(r#"{"table_name": "test", "limit": -1}"#)
            .unwrap()
            .into_query()
            .unwrap_err();
        assert_eq!(err.kind(), "MalformedRequest");

        assert!(GridRequest::from_json("not json").is_err());
    }

    #[test]
    fn test_save_request_changes() {
        let raw = r#"{"table_name": "test",
                      "changes": [{"recid": 2, "email": "max@example.com"}]}"#;
        let changes = SaveRequest::from_json(raw).unwrap().row_changes().unwrap();
        assert_eq!(
            changes,
            vec![RowChange {
                recid: 2,
                fields: vec![("email".to_string(), Value::from("max@example.com"))],
            }]
        );

        let raw = r#"{"changes": [{"email": "x"}]}"#;
        let err = SaveRequest::from_json(raw).unwrap().row_changes().unwrap_err();
        assert_eq!(err.kind(), "MalformedRequest");

        let raw = r#"{"changes": [{"recid": 1}]}"#;
        assert!(SaveRequest::from_json(raw).unwrap().row_changes().is_err());
    }

    #[test]
    fn test_delete_request_accepts_selected() {
        let req = DeleteRequest::from_json(r#"{"table_name": "test", "selected": [1, 4]}"#)
            .unwrap();
        assert_eq!(req.recid, vec![1, 4]);
    }

    #[test]
    fn test_envelope_shapes() {
        let ok = Envelope::Records {
            total: 0,
            records: vec![],
        };
        assert_eq!(
            serde_json::to_value(&ok).unwrap(),
            json!({"status": "success", "total": 0, "records": []})
        );
        assert_eq!(
            serde_json::to_value(Envelope::Done).unwrap(),
            json!({"status": "success"})
        );

        let err = Envelope::error(&Error::UnknownTable("secret".into()));
        let value = serde_json::to_value(&err).unwrap();
        assert_eq!(value["status"], "error");
        assert!(value["message"].as_str().unwrap().starts_with("UnknownTable"));
    }
}
