//! Typed values bound into generated SQL
//!
//! Incoming JSON (request bodies) and query-string values are coerced
//! against a column kind into a `SqlValue`, which carries its Postgres type
//! even when null.

use chrono::{DateTime, NaiveDate, Utc};
use serde_json::Value;
use sqlx::{Postgres, QueryBuilder};

use crate::{
    factory::schema::{Column, ColumnKind},
    utils::{parse_date, parse_datetime, validation},
};

pub const REQUIRED: &str = "This field is required.";
pub const NOT_NULL: &str = "This field may not be null.";
pub const NOT_BLANK: &str = "This field may not be blank.";
pub const NOT_A_STRING: &str = "Not a valid string.";
pub const NOT_AN_INTEGER: &str = "A valid integer is required.";
pub const NOT_A_BOOLEAN: &str = "Must be a valid boolean.";
pub const BAD_DATETIME: &str = "Datetime has wrong format. Use one of these formats instead: \
     YYYY-MM-DDThh:mm[:ss[.uuuuuu]][+HH:MM|-HH:MM|Z].";
pub const BAD_DATE: &str = "Date has wrong format. Use one of these formats instead: YYYY-MM-DD.";
pub const BAD_EMAIL: &str = "Enter a valid email address.";

/// A bindable value
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Int(Option<i64>),
    Text(Option<String>),
    Bool(Option<bool>),
    Timestamp(Option<DateTime<Utc>>),
    Date(Option<NaiveDate>),
}

impl SqlValue {
    /// Typed null for a column kind
    pub fn null_for(kind: ColumnKind) -> Self {
        match kind {
            ColumnKind::Id | ColumnKind::Integer => Self::Int(None),
            ColumnKind::Text { .. } | ColumnKind::Email { .. } | ColumnKind::Choice(_) => {
                Self::Text(None)
            }
            ColumnKind::Boolean => Self::Bool(None),
            ColumnKind::DateTime => Self::Timestamp(None),
            ColumnKind::Date => Self::Date(None),
        }
    }

    pub fn is_null(&self) -> bool {
        match self {
            Self::Int(v) => v.is_none(),
            Self::Text(v) => v.is_none(),
            Self::Bool(v) => v.is_none(),
            Self::Timestamp(v) => v.is_none(),
            Self::Date(v) => v.is_none(),
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(v) => *v,
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(v) => v.as_deref(),
            _ => None,
        }
    }

    /// Push this value as the next bind parameter
    pub fn push_bind(self, qb: &mut QueryBuilder<'static, Postgres>) {
        match self {
            Self::Int(v) => qb.push_bind(v),
            Self::Text(v) => qb.push_bind(v),
            Self::Bool(v) => qb.push_bind(v),
            Self::Timestamp(v) => qb.push_bind(v),
            Self::Date(v) => qb.push_bind(v),
        };
    }
}

/// Coerce a JSON value for `column`; `allow_null` comes from the field
pub fn coerce(column: &Column, raw: &Value, allow_null: bool) -> Result<SqlValue, String> {
    if raw.is_null() {
        return if allow_null {
            Ok(SqlValue::null_for(column.kind))
        } else {
            Err(NOT_NULL.to_string())
        };
    }

    match column.kind {
        ColumnKind::Id | ColumnKind::Integer => coerce_integer(raw).map(|v| SqlValue::Int(Some(v))),
        ColumnKind::Text { max_length } => {
            coerce_text(raw, column.blank, max_length).map(|v| SqlValue::Text(Some(v)))
        }
        ColumnKind::Email { max_length } => {
            let text = coerce_text(raw, column.blank, Some(max_length))?;
            if !text.is_empty() && validation::validate_email(&text).is_err() {
                return Err(BAD_EMAIL.to_string());
            }
            Ok(SqlValue::Text(Some(text)))
        }
        ColumnKind::Choice(choices) => {
            let text = match raw {
                Value::String(s) => s.clone(),
                Value::Number(n) => n.to_string(),
                _ => return Err(format!("\"{}\" is not a valid choice.", raw)),
            };
            if text.is_empty() && column.blank {
                return Ok(SqlValue::Text(Some(text)));
            }
            if !choices.contains(&text.as_str()) {
                return Err(format!("\"{}\" is not a valid choice.", text));
            }
            Ok(SqlValue::Text(Some(text)))
        }
        ColumnKind::Boolean => coerce_bool(raw).map(|v| SqlValue::Bool(Some(v))),
        ColumnKind::DateTime => match raw {
            Value::String(s) => parse_datetime(s)
                .map(|v| SqlValue::Timestamp(Some(v)))
                .ok_or_else(|| BAD_DATETIME.to_string()),
            _ => Err(BAD_DATETIME.to_string()),
        },
        ColumnKind::Date => match raw {
            Value::String(s) => parse_date(s)
                .map(|v| SqlValue::Date(Some(v)))
                .ok_or_else(|| BAD_DATE.to_string()),
            _ => Err(BAD_DATE.to_string()),
        },
    }
}

/// Coerce a query-string value for filtering
pub fn coerce_query(kind: ColumnKind, raw: &str) -> Result<SqlValue, String> {
    match kind {
        ColumnKind::Id | ColumnKind::Integer => raw
            .trim()
            .parse::<i64>()
            .map(|v| SqlValue::Int(Some(v)))
            .map_err(|_| "Enter a number.".to_string()),
        ColumnKind::Boolean => match raw.to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Ok(SqlValue::Bool(Some(true))),
            "false" | "0" | "no" | "off" => Ok(SqlValue::Bool(Some(false))),
            _ => Err(NOT_A_BOOLEAN.to_string()),
        },
        ColumnKind::DateTime => parse_datetime(raw)
            .map(|v| SqlValue::Timestamp(Some(v)))
            .ok_or_else(|| "Enter a valid date/time.".to_string()),
        ColumnKind::Date => parse_date(raw)
            .map(|v| SqlValue::Date(Some(v)))
            .ok_or_else(|| "Enter a valid date.".to_string()),
        ColumnKind::Choice(choices) => {
            if choices.contains(&raw) {
                Ok(SqlValue::Text(Some(raw.to_string())))
            } else {
                Err(format!(
                    "Select a valid choice. {} is not one of the available choices.",
                    raw
                ))
            }
        }
        ColumnKind::Text { .. } | ColumnKind::Email { .. } => Ok(SqlValue::Text(Some(raw.to_string()))),
    }
}

/// Primary key of a related object
pub fn coerce_pk(raw: &Value) -> Result<i64, String> {
    match raw {
        Value::Number(n) => n
            .as_i64()
            .ok_or_else(|| format!("Incorrect type. Expected pk value, received {}.", type_name(raw))),
        Value::String(s) => s
            .trim()
            .parse::<i64>()
            .map_err(|_| "Incorrect type. Expected pk value, received str.".to_string()),
        _ => Err(format!(
            "Incorrect type. Expected pk value, received {}.",
            type_name(raw)
        )),
    }
}

/// List of primary keys for a many-to-many field
pub fn coerce_pk_list(raw: &Value) -> Result<Vec<i64>, String> {
    let items = raw.as_array().ok_or_else(|| {
        format!(
            "Expected a list of items but got type \"{}\".",
            type_name(raw)
        )
    })?;

    let mut ids = Vec::with_capacity(items.len());
    for item in items {
        let id = coerce_pk(item)?;
        if !ids.contains(&id) {
            ids.push(id);
        }
    }
    Ok(ids)
}

fn coerce_integer(raw: &Value) -> Result<i64, String> {
    match raw {
        Value::Number(n) => match n.as_i64() {
            Some(v) => Ok(v),
            None => match n.as_f64() {
                Some(f) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => Ok(f as i64),
                _ => Err(NOT_AN_INTEGER.to_string()),
            },
        },
        Value::String(s) => s.trim().parse::<i64>().map_err(|_| NOT_AN_INTEGER.to_string()),
        _ => Err(NOT_AN_INTEGER.to_string()),
    }
}

/// Surrounding whitespace is dropped before the blank and length checks
fn coerce_text(raw: &Value, blank: bool, max_length: Option<usize>) -> Result<String, String> {
    let text = match raw {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return Err(NOT_A_STRING.to_string()),
    };

    if text.is_empty() && !blank {
        return Err(NOT_BLANK.to_string());
    }
    if let Some(max) = max_length {
        if text.chars().count() > max {
            return Err(format!(
                "Ensure this field has no more than {} characters.",
                max
            ));
        }
    }
    Ok(text)
}

fn coerce_bool(raw: &Value) -> Result<bool, String> {
    match raw {
        Value::Bool(b) => Ok(*b),
        Value::Number(n) => match n.as_i64() {
            Some(1) => Ok(true),
            Some(0) => Ok(false),
            _ => Err(NOT_A_BOOLEAN.to_string()),
        },
        Value::String(s) => match s.to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Ok(true),
            "false" | "0" | "no" | "off" => Ok(false),
            _ => Err(NOT_A_BOOLEAN.to_string()),
        },
        _ => Err(NOT_A_BOOLEAN.to_string()),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "int",
        Value::String(_) => "str",
        Value::Array(_) => "list",
        Value::Object(_) => "dict",
    }
}
