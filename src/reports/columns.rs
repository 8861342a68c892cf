//! OLAP column catalog parsing.
//!
//! `GET v2/reports/olap/columns` answers in JSON on recent servers and in
//! XML on older ones:
//!
//! ```text
//! {"DishSum": {"name": "Сумма", "type": "MONEY", "aggregationAllowed": true, ...}, ...}
//!
//! <columns><column name="DishSum" caption="Сумма" type="MONEY" .../></columns>
//! ```
//!
//! [`PayloadFormat::detect`] picks the parser; both parsers are pure
//! functions of the payload text.

use std::collections::BTreeMap;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use serde::Serialize;
use serde_json::Value;

use crate::clients::truncate_chars;
use crate::reports::errors::{ReportError, SNIPPET_LIMIT};

const BOM: char = '\u{feff}';

/// Wire format of a column catalog response.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PayloadFormat {
    /// JSON object keyed by column id.
    Json,
    /// XML document with `column` elements.
    Xml,
}

impl PayloadFormat {
    /// Decides the format from the declared content type, falling back to
    /// the first non-whitespace character of the body.
    ///
    /// # Example
    ///
    /// ```rust
    /// use iiko_api::reports::PayloadFormat;
    ///
    /// assert_eq!(PayloadFormat::detect(Some("application/json; charset=utf-8"), ""), PayloadFormat::Json);
    /// assert_eq!(PayloadFormat::detect(Some("text/plain"), "  {\"a\": {}}"), PayloadFormat::Json);
    /// assert_eq!(PayloadFormat::detect(None, "<columns/>"), PayloadFormat::Xml);
    /// ```
    #[must_use]
    pub fn detect(content_type: Option<&str>, body: &str) -> Self {
        let declared_json =
            content_type.is_some_and(|ct| ct.to_ascii_lowercase().contains("json"));
        let looks_like_json = body.trim_start_matches(BOM).trim_start().starts_with('{');

        if declared_json || looks_like_json {
            Self::Json
        } else {
            Self::Xml
        }
    }
}

/// One column of an OLAP report type.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ColumnDescriptor {
    /// Column identifier used in report requests.
    pub id: String,
    /// Column name; equals `id` unless the server sent a display name.
    pub name: String,
    /// Human-readable caption.
    pub caption: String,
    /// Value type, e.g. `MONEY`, `STRING`, `DATETIME`.
    #[serde(rename = "type")]
    pub column_type: String,
    /// Whether the column may be used as an aggregate field.
    pub aggregation_allowed: bool,
    /// Whether the column may be used as a grouping field.
    pub grouping_allowed: bool,
    /// Whether the column may be filtered on.
    pub filtering_allowed: bool,
    /// Category tags.
    pub tags: Vec<String>,
    /// Any further attributes the server sent (XML catalogs only).
    pub extra: BTreeMap<String, String>,
}

impl ColumnDescriptor {
    /// Flattens the descriptor into string key/value pairs.
    ///
    /// Booleans render as `True`/`False` and tags are joined with `", "`;
    /// `tags` is omitted when there are none.
    ///
    /// # Example
    ///
    /// ```rust
    /// use iiko_api::reports::parse_columns_json;
    ///
    /// let columns = parse_columns_json(r#"{"DishSum": {"type": "MONEY", "aggregationAllowed": true}}"#).unwrap();
    /// let record = columns[0].to_record();
    /// assert_eq!(record["id"], "DishSum");
    /// assert_eq!(record["aggregationAllowed"], "True");
    /// assert_eq!(record["groupingAllowed"], "False");
    /// ```
    #[must_use]
    pub fn to_record(&self) -> BTreeMap<String, String> {
        let mut record = self.extra.clone();
        record.insert("id".to_string(), self.id.clone());
        record.insert("name".to_string(), self.name.clone());
        record.insert("caption".to_string(), self.caption.clone());
        record.insert("type".to_string(), self.column_type.clone());
        record.insert(
            "aggregationAllowed".to_string(),
            title_case_bool(self.aggregation_allowed),
        );
        record.insert(
            "groupingAllowed".to_string(),
            title_case_bool(self.grouping_allowed),
        );
        record.insert(
            "filteringAllowed".to_string(),
            title_case_bool(self.filtering_allowed),
        );
        if !self.tags.is_empty() {
            record.insert("tags".to_string(), self.tags.join(", "));
        }
        record
    }
}

fn title_case_bool(value: bool) -> String {
    let text = if value { "True" } else { "False" };
    text.to_string()
}

/// Parses a column catalog in the given format.
///
/// # Errors
///
/// See [`parse_columns_json`] and [`parse_columns_xml`].
pub fn parse_columns(
    format: PayloadFormat,
    body: &str,
) -> Result<Vec<ColumnDescriptor>, ReportError> {
    match format {
        PayloadFormat::Json => parse_columns_json(body),
        PayloadFormat::Xml => parse_columns_xml(body),
    }
}

/// Parses a JSON column catalog: an object keyed by column id.
///
/// # Errors
///
/// - [`ReportError::InvalidJson`] if the text is not valid JSON
/// - [`ReportError::UnexpectedPayload`] if it is not an object of objects
pub fn parse_columns_json(body: &str) -> Result<Vec<ColumnDescriptor>, ReportError> {
    let text = body.trim_start_matches(BOM);
    let data: Value = serde_json::from_str(text).map_err(|e| {
        let snippet = truncate_chars(text, SNIPPET_LIMIT);
        tracing::error!("Failed to parse JSON column catalog: {e}; payload starts with {snippet:?}");
        ReportError::InvalidJson {
            message: e.to_string(),
            snippet,
        }
    })?;

    let Value::Object(entries) = data else {
        return Err(ReportError::UnexpectedPayload {
            reason: format!("column catalog is a JSON {}, not an object", json_kind(&data)),
        });
    };

    entries
        .into_iter()
        .map(|(id, info)| {
            let Value::Object(info) = info else {
                return Err(ReportError::UnexpectedPayload {
                    reason: format!("column '{id}' is a JSON {}, not an object", json_kind(&info)),
                });
            };

            let display_name = info.get("name").and_then(Value::as_str);
            let flag = |key: &str| info.get(key).and_then(Value::as_bool).unwrap_or(false);
            let tags = info
                .get("tags")
                .and_then(Value::as_array)
                .map(|tags| {
                    tags.iter()
                        .map(|t| t.as_str().map_or_else(|| t.to_string(), str::to_string))
                        .collect()
                })
                .unwrap_or_default();

            Ok(ColumnDescriptor {
                name: display_name.unwrap_or(id.as_str()).to_string(),
                caption: display_name.unwrap_or_default().to_string(),
                column_type: info
                    .get("type")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
                aggregation_allowed: flag("aggregationAllowed"),
                grouping_allowed: flag("groupingAllowed"),
                filtering_allowed: flag("filteringAllowed"),
                tags,
                extra: BTreeMap::new(),
                id,
            })
        })
        .collect()
}

/// Parses an XML column catalog: every `column` element below the root.
///
/// A byte-order mark and surrounding whitespace are ignored; an empty
/// document yields an empty catalog.
///
/// # Errors
///
/// Returns [`ReportError::InvalidXml`] if the document is not well-formed.
pub fn parse_columns_xml(body: &str) -> Result<Vec<ColumnDescriptor>, ReportError> {
    let text = body.trim_start_matches(BOM).trim();
    if text.is_empty() {
        tracing::warn!("Empty XML column catalog");
        return Ok(Vec::new());
    }

    let mut reader = Reader::from_str(text);
    reader.config_mut().trim_text(true);

    let invalid = |message: String, position: u64| {
        let snippet = truncate_chars(text, SNIPPET_LIMIT);
        tracing::error!(
            "Failed to parse XML column catalog ({} chars): {message}; payload starts with {snippet:?}",
            text.chars().count()
        );
        ReportError::InvalidXml {
            message,
            position,
            snippet,
        }
    };

    let mut columns = Vec::new();
    let mut depth: usize = 0;
    let mut seen_root = false;

    loop {
        let event = reader
            .read_event()
            .map_err(|e| invalid(e.to_string(), reader.error_position()))?;

        match event {
            Event::Start(element) | Event::Empty(element) if depth == 0 && seen_root => {
                return Err(invalid(
                    format!(
                        "junk after document element: <{}>",
                        String::from_utf8_lossy(element.name().as_ref())
                    ),
                    reader.buffer_position(),
                ));
            }
            Event::Start(element) => {
                if depth > 0 && element.local_name().as_ref() == b"column" {
                    columns.push(
                        column_from_element(&element)
                            .map_err(|e| invalid(e, reader.buffer_position()))?,
                    );
                }
                seen_root = true;
                depth += 1;
            }
            Event::Empty(element) => {
                if depth > 0 && element.local_name().as_ref() == b"column" {
                    columns.push(
                        column_from_element(&element)
                            .map_err(|e| invalid(e, reader.buffer_position()))?,
                    );
                }
                seen_root = true;
            }
            Event::End(_) => depth = depth.saturating_sub(1),
            Event::Text(content) if depth == 0 => {
                return Err(invalid(
                    format!(
                        "text outside the document element: {:?}",
                        truncate_chars(&String::from_utf8_lossy(&content), 40)
                    ),
                    reader.buffer_position(),
                ));
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !seen_root {
        return Err(invalid(
            "no document element".to_string(),
            reader.buffer_position(),
        ));
    }
    if depth > 0 {
        return Err(invalid(
            format!("unexpected end of document: {depth} unclosed element(s)"),
            reader.buffer_position(),
        ));
    }

    Ok(columns)
}

fn column_from_element(element: &BytesStart<'_>) -> Result<ColumnDescriptor, String> {
    let mut column = ColumnDescriptor::default();

    for attribute in element.attributes() {
        let attribute = attribute.map_err(|e| e.to_string())?;
        let key = String::from_utf8_lossy(attribute.key.as_ref()).into_owned();
        let value = attribute
            .unescape_value()
            .map_err(|e| e.to_string())?
            .into_owned();

        match key.as_str() {
            "name" => column.name = value,
            "caption" => column.caption = value,
            "type" => column.column_type = value,
            "aggregationAllowed" => column.aggregation_allowed = value.eq_ignore_ascii_case("true"),
            "groupingAllowed" => column.grouping_allowed = value.eq_ignore_ascii_case("true"),
            "filteringAllowed" => column.filtering_allowed = value.eq_ignore_ascii_case("true"),
            _ => {
                column.extra.insert(key, value);
            }
        }
    }

    column.id.clone_from(&column.name);
    Ok(column)
}

const fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
