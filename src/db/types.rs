//! Database-agnostic type mappings.
//!
//! Result columns are decoded into [`Value`]s before they are scanned into
//! slots, so every backend funnels through the same small value model.
//!
//! # Architecture
//!
//! Type conversion uses a two-phase approach:
//! 1. `TypeCategory` classifies column types into logical categories
//! 2. Database-specific decoders handle the actual value extraction
//!
//! The type name consulted is the one reported for the value itself, which for
//! SQLite is the storage class of the stored value rather than the declared
//! column type.

use serde_json::Value as JsonValue;
use sqlx::mysql::MySqlRow;
use sqlx::postgres::PgRow;
use sqlx::sqlite::SqliteRow;
use sqlx::{Column, Row, TypeInfo, ValueRef};

use crate::error::DbResult;
use crate::models::{DatabaseType, Value};

// =============================================================================
// Type Classification
// =============================================================================

/// Logical category for database column types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeCategory {
    Integer,
    Float,
    Decimal,
    Boolean,
    Text,
    Binary,
    Json,
    Uuid,
    Timestamp,
    Date,
    Time,
}

/// Classify a database type name into a logical category.
pub fn categorize_type(type_name: &str, db: DatabaseType) -> TypeCategory {
    let lower = type_name.to_lowercase();
    let base = lower.trim_end_matches(" unsigned");

    // Decimal/Numeric - check first as it overlaps with "numeric" in float checks
    if base.contains("decimal") || base.contains("numeric") {
        // SQLite's NUMERIC is actually a float
        if db == DatabaseType::SQLite {
            return TypeCategory::Float;
        }
        return TypeCategory::Decimal;
    }

    match base {
        "bool" | "boolean" => TypeCategory::Boolean,
        "tinyint" | "smallint" | "mediumint" | "int" | "integer" | "bigint" | "int2"
        | "int4" | "int8" | "serial" | "smallserial" | "bigserial" => TypeCategory::Integer,
        "float" | "double" | "double precision" | "real" | "float4" | "float8" => {
            TypeCategory::Float
        }
        "json" | "jsonb" => TypeCategory::Json,
        // UUID (PostgreSQL)
        "uuid" => TypeCategory::Uuid,
        "bytea" | "blob" | "tinyblob" | "mediumblob" | "longblob" | "binary" | "varbinary" => {
            TypeCategory::Binary
        }
        "timestamptz" | "timestamp" | "datetime" => TypeCategory::Timestamp,
        "date" => TypeCategory::Date,
        "time" => TypeCategory::Time,
        // Default to text for everything else (varchar, text, char, enum, etc.)
        _ => TypeCategory::Text,
    }
}

// =============================================================================
// Row Decoding
// =============================================================================

/// Read column names and decoded values out of a backend row.
pub trait DecodeRow {
    fn column_names(&self) -> Vec<String>;

    /// Decode the value at `idx`; SQL NULL decodes to [`Value::Null`].
    fn decode_value(&self, idx: usize) -> DbResult<Value>;
}

impl DecodeRow for MySqlRow {
    fn column_names(&self) -> Vec<String> {
        self.columns().iter().map(|c| c.name().to_string()).collect()
    }

    fn decode_value(&self, idx: usize) -> DbResult<Value> {
        let raw = self.try_get_raw(idx)?;
        if raw.is_null() {
            return Ok(Value::Null);
        }
        let type_name = raw.type_info().name().to_string();
        let category = categorize_type(&type_name, DatabaseType::MySQL);
        mysql::decode_column(self, idx, &type_name, category)
    }
}

impl DecodeRow for PgRow {
    fn column_names(&self) -> Vec<String> {
        self.columns().iter().map(|c| c.name().to_string()).collect()
    }

    fn decode_value(&self, idx: usize) -> DbResult<Value> {
        let raw = self.try_get_raw(idx)?;
        if raw.is_null() {
            return Ok(Value::Null);
        }
        let type_name = raw.type_info().name().to_string();
        let category = categorize_type(&type_name, DatabaseType::PostgreSQL);
        postgres::decode_column(self, idx, &type_name, category)
    }
}

impl DecodeRow for SqliteRow {
    fn column_names(&self) -> Vec<String> {
        self.columns().iter().map(|c| c.name().to_string()).collect()
    }

    fn decode_value(&self, idx: usize) -> DbResult<Value> {
        let raw = self.try_get_raw(idx)?;
        if raw.is_null() {
            return Ok(Value::Null);
        }
        let type_name = raw.type_info().name().to_string();
        let category = categorize_type(&type_name, DatabaseType::SQLite);
        sqlite::decode_column(self, idx, category)
    }
}

// =============================================================================
// Database-Specific Decoders
// =============================================================================

mod mysql {
    use super::*;
    use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
    use sqlx::types::Decimal;

    pub fn decode_column(
        row: &MySqlRow,
        idx: usize,
        type_name: &str,
        category: TypeCategory,
    ) -> DbResult<Value> {
        let value = match category {
            TypeCategory::Integer => decode_integer(row, idx, type_name)?,
            TypeCategory::Boolean => Value::Bool(row.try_get::<bool, _>(idx)?),
            TypeCategory::Float if type_name.eq_ignore_ascii_case("float") => {
                Value::Float(f64::from(row.try_get::<f32, _>(idx)?))
            }
            TypeCategory::Float => Value::Float(row.try_get::<f64, _>(idx)?),
            TypeCategory::Decimal => Value::Text(row.try_get::<Decimal, _>(idx)?.to_string()),
            TypeCategory::Json => Value::Json(row.try_get::<JsonValue, _>(idx)?),
            TypeCategory::Binary => Value::Bytes(row.try_get::<Vec<u8>, _>(idx)?),
            TypeCategory::Timestamp => Value::Timestamp(row.try_get::<DateTime<Utc>, _>(idx)?),
            TypeCategory::Date => Value::Text(row.try_get::<NaiveDate, _>(idx)?.to_string()),
            TypeCategory::Time => Value::Text(row.try_get::<NaiveTime, _>(idx)?.to_string()),
            TypeCategory::Uuid | TypeCategory::Text => decode_text(row, idx)?,
        };
        Ok(value)
    }

    fn decode_integer(row: &MySqlRow, idx: usize, type_name: &str) -> DbResult<Value> {
        if !type_name.to_uppercase().ends_with("UNSIGNED") {
            return Ok(Value::Int(row.try_get::<i64, _>(idx)?));
        }
        let v = row.try_get::<u64, _>(idx)?;
        // BIGINT UNSIGNED above i64::MAX keeps its exact digits as text
        Ok(i64::try_from(v)
            .map(Value::Int)
            .unwrap_or_else(|_| Value::Text(v.to_string())))
    }

    fn decode_text(row: &MySqlRow, idx: usize) -> DbResult<Value> {
        // binary collations report text-like names but only decode as bytes
        match row.try_get::<String, _>(idx) {
            Ok(v) => Ok(Value::Text(v)),
            Err(_) => Ok(Value::Bytes(row.try_get::<Vec<u8>, _>(idx)?)),
        }
    }
}

mod postgres {
    use super::*;
    use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
    use sqlx::types::{Decimal, Uuid};

    pub fn decode_column(
        row: &PgRow,
        idx: usize,
        type_name: &str,
        category: TypeCategory,
    ) -> DbResult<Value> {
        let value = match category {
            TypeCategory::Integer => decode_integer(row, idx, type_name)?,
            TypeCategory::Boolean => Value::Bool(row.try_get::<bool, _>(idx)?),
            TypeCategory::Float if type_name == "FLOAT4" => {
                Value::Float(f64::from(row.try_get::<f32, _>(idx)?))
            }
            TypeCategory::Float => Value::Float(row.try_get::<f64, _>(idx)?),
            TypeCategory::Decimal => Value::Text(row.try_get::<Decimal, _>(idx)?.to_string()),
            TypeCategory::Json => Value::Json(row.try_get::<JsonValue, _>(idx)?),
            TypeCategory::Binary => Value::Bytes(row.try_get::<Vec<u8>, _>(idx)?),
            TypeCategory::Uuid => Value::Text(row.try_get::<Uuid, _>(idx)?.to_string()),
            TypeCategory::Timestamp if type_name == "TIMESTAMPTZ" => {
                Value::Timestamp(row.try_get::<DateTime<Utc>, _>(idx)?)
            }
            TypeCategory::Timestamp => {
                Value::Timestamp(row.try_get::<NaiveDateTime, _>(idx)?.and_utc())
            }
            TypeCategory::Date => Value::Text(row.try_get::<NaiveDate, _>(idx)?.to_string()),
            TypeCategory::Time => Value::Text(row.try_get::<NaiveTime, _>(idx)?.to_string()),
            TypeCategory::Text => Value::Text(row.try_get::<String, _>(idx)?),
        };
        Ok(value)
    }

    fn decode_integer(row: &PgRow, idx: usize, type_name: &str) -> DbResult<Value> {
        let v = match type_name {
            "INT2" => i64::from(row.try_get::<i16, _>(idx)?),
            "INT4" => i64::from(row.try_get::<i32, _>(idx)?),
            _ => row.try_get::<i64, _>(idx)?,
        };
        Ok(Value::Int(v))
    }
}

mod sqlite {
    use super::*;

    pub fn decode_column(row: &SqliteRow, idx: usize, category: TypeCategory) -> DbResult<Value> {
        let value = match category {
            TypeCategory::Integer => Value::Int(row.try_get::<i64, _>(idx)?),
            TypeCategory::Boolean => Value::Bool(row.try_get::<bool, _>(idx)?),
            TypeCategory::Float | TypeCategory::Decimal => {
                Value::Float(row.try_get::<f64, _>(idx)?)
            }
            TypeCategory::Binary => Value::Bytes(row.try_get::<Vec<u8>, _>(idx)?),
            // timestamps, dates and JSON documents are stored as text
            _ => Value::Text(row.try_get::<String, _>(idx)?),
        };
        Ok(value)
    }
}
