//! The mapping protocol between domain objects and result rows.
//!
//! A domain object implements [`Shaper`]: it can extrude a [`Translator`]
//! (a scratch "model" that exposes one typed [`Slot`] per column name) and
//! receive a filled-in translator back. Multi-row results go through a
//! [`Collector`], which hands out fresh shapers and accumulates them.
//!
//! Models are passed around as boxed trait objects, so a shaper receiving a
//! translator of a foreign type must reject it with [`DbError::UnknownType`].
//! [`downcast`] does that check.

use std::any::Any;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::Value as JsonValue;
use thiserror::Error;

use crate::error::{DbError, DbResult};
use crate::models::Value;

/// A value did not fit the slot it was scanned into.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("cannot store {found} value in {expected} slot")]
pub struct Mismatch {
    pub expected: &'static str,
    pub found: &'static str,
}

impl Mismatch {
    pub fn new(expected: &'static str, found: &'static str) -> Self {
        Self { expected, found }
    }
}

/// A typed, writable location for one column value.
///
/// `scan` stores a decoded column value; `value` reads the current content
/// back as a bindable argument. Scanning NULL into a non-optional slot resets
/// it to its zero value.
pub trait Slot: Send {
    fn scan(&mut self, value: Value) -> Result<(), Mismatch>;
    fn value(&self) -> Value;
}

/// Resolves column names to slots of a scratch model.
pub trait Translator: AsAny + Send {
    /// The slot for `name`, or `None` when the model has no such field.
    ///
    /// Unknown columns are skipped while reading and bound as NULL while saving.
    fn translate(&mut self, name: &str) -> Option<&mut dyn Slot>;
}

/// A domain object that can be read from and written to rows.
pub trait Shaper: AsAny + Send + Sync {
    /// Produce a fresh model populated from the object's current state.
    fn extrude(&self) -> Box<dyn Translator>;

    /// Absorb a filled model back into the object.
    ///
    /// Must fail with [`DbError::UnknownType`] if the model is of a foreign type.
    fn receive(&mut self, model: Box<dyn Translator>) -> DbResult<()>;
}

/// Accumulates multi-row results.
pub trait Collector: Send {
    /// A fresh shaper for the next row, or `None` to stop reading early.
    fn new_item(&mut self) -> Option<Box<dyn Shaper>>;

    /// Absorb a filled shaper.
    ///
    /// Must fail with [`DbError::UnknownType`] if the item is of a foreign type.
    fn collect(&mut self, item: Box<dyn Shaper>) -> DbResult<()>;
}

/// Upcast to `Any` so boxed models and items can be downcast to their concrete type.
pub trait AsAny: Any {
    fn into_any(self: Box<Self>) -> Box<dyn Any>;
    fn as_any(&self) -> &dyn Any;
}

impl<T: Any> AsAny for T {
    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Recover the concrete type of a boxed model or item.
///
/// ```ignore
/// fn receive(&mut self, model: Box<dyn Translator>) -> DbResult<()> {
///     let model = downcast::<UserModel, _>(model)?;
///     self.name = model.name.unwrap_or_default();
///     Ok(())
/// }
/// ```
pub fn downcast<T, M>(boxed: Box<M>) -> DbResult<Box<T>>
where
    T: Any,
    M: AsAny + ?Sized,
{
    boxed.into_any().downcast::<T>().map_err(|_| DbError::UnknownType)
}

macro_rules! integer_slot {
    ($($ty:ty => $name:literal),+ $(,)?) => {$(
        impl Slot for $ty {
            fn scan(&mut self, value: Value) -> Result<(), Mismatch> {
                *self = match value {
                    Value::Null => 0,
                    Value::Int(v) => <$ty>::try_from(v).map_err(|_| Mismatch::new($name, "out-of-range int"))?,
                    Value::Bool(v) => <$ty>::from(v),
                    Value::Text(s) => s.trim().parse().map_err(|_| Mismatch::new($name, "text"))?,
                    other => return Err(Mismatch::new($name, other.type_name())),
                };
                Ok(())
            }

            fn value(&self) -> Value {
                Value::Int(i64::from(*self))
            }
        }
    )+};
}

integer_slot!(i64 => "i64", i32 => "i32", i16 => "i16");

macro_rules! float_slot {
    ($($ty:ty => $name:literal),+ $(,)?) => {$(
        impl Slot for $ty {
            fn scan(&mut self, value: Value) -> Result<(), Mismatch> {
                *self = match value {
                    Value::Null => 0.0,
                    Value::Float(v) => v as $ty,
                    Value::Int(v) => v as $ty,
                    // exact decimals arrive as text
                    Value::Text(s) => s.trim().parse().map_err(|_| Mismatch::new($name, "text"))?,
                    other => return Err(Mismatch::new($name, other.type_name())),
                };
                Ok(())
            }

            fn value(&self) -> Value {
                Value::Float(f64::from(*self))
            }
        }
    )+};
}

float_slot!(f64 => "f64", f32 => "f32");

impl Slot for bool {
    fn scan(&mut self, value: Value) -> Result<(), Mismatch> {
        *self = match value {
            Value::Null => false,
            Value::Bool(v) => v,
            Value::Int(v) => v != 0,
            other => return Err(Mismatch::new("bool", other.type_name())),
        };
        Ok(())
    }

    fn value(&self) -> Value {
        Value::Bool(*self)
    }
}

impl Slot for String {
    fn scan(&mut self, value: Value) -> Result<(), Mismatch> {
        let found = value.type_name();
        *self = match value {
            Value::Null => String::new(),
            Value::Text(s) => s,
            other => other
                .to_text()
                .ok_or_else(|| Mismatch::new("string", found))?,
        };
        Ok(())
    }

    fn value(&self) -> Value {
        Value::Text(self.clone())
    }
}

impl Slot for Vec<u8> {
    fn scan(&mut self, value: Value) -> Result<(), Mismatch> {
        *self = match value {
            Value::Null => Vec::new(),
            Value::Bytes(b) => b,
            Value::Text(s) => s.into_bytes(),
            other => return Err(Mismatch::new("bytes", other.type_name())),
        };
        Ok(())
    }

    fn value(&self) -> Value {
        Value::Bytes(self.clone())
    }
}

impl Slot for JsonValue {
    fn scan(&mut self, value: Value) -> Result<(), Mismatch> {
        *self = match value {
            Value::Null => JsonValue::Null,
            Value::Json(v) => v,
            Value::Text(s) => {
                serde_json::from_str(&s).map_err(|_| Mismatch::new("json", "non-json text"))?
            }
            Value::Bool(v) => JsonValue::Bool(v),
            Value::Int(v) => JsonValue::from(v),
            Value::Float(v) => JsonValue::from(v),
            other => return Err(Mismatch::new("json", other.type_name())),
        };
        Ok(())
    }

    fn value(&self) -> Value {
        Value::Json(self.clone())
    }
}

impl Slot for DateTime<Utc> {
    fn scan(&mut self, value: Value) -> Result<(), Mismatch> {
        *self = match value {
            Value::Null => DateTime::<Utc>::default(),
            Value::Timestamp(v) => v,
            // SQLite keeps timestamps as text
            Value::Text(s) => parse_timestamp(&s).ok_or(Mismatch::new("timestamp", "text"))?,
            other => return Err(Mismatch::new("timestamp", other.type_name())),
        };
        Ok(())
    }

    fn value(&self) -> Value {
        Value::Timestamp(*self)
    }
}

fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(text) {
        return Some(ts.with_timezone(&Utc));
    }
    ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
        .map(|naive| naive.and_utc())
}

impl Slot for Value {
    fn scan(&mut self, value: Value) -> Result<(), Mismatch> {
        *self = value;
        Ok(())
    }

    fn value(&self) -> Value {
        self.clone()
    }
}

/// Nullable slot: NULL scans to `None` and `None` binds as NULL.
impl<T: Slot + Default> Slot for Option<T> {
    fn scan(&mut self, value: Value) -> Result<(), Mismatch> {
        if value.is_null() {
            *self = None;
            return Ok(());
        }
        let mut inner = T::default();
        inner.scan(value)?;
        *self = Some(inner);
        Ok(())
    }

    fn value(&self) -> Value {
        self.as_ref().map_or(Value::Null, Slot::value)
    }
}
