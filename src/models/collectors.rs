//! Ready-made collectors for common result shapes.
//!
//! - [`Strings`] keeps the first column of each row as text.
//! - [`Ints`] keeps the first column of each row as an integer.
//! - [`RawList`] keeps every column of each row as text, keyed by column name.

use std::collections::HashMap;

use crate::error::DbResult;
use crate::models::mapping::{Collector, Mismatch, Shaper, Slot, Translator, downcast};
use crate::models::Value;

/// Shaper and model for a single text value taken from the first column.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct StringItem {
    value: Option<String>,
    first: Option<String>,
}

impl Translator for StringItem {
    fn translate(&mut self, name: &str) -> Option<&mut dyn Slot> {
        // the first column name resolved wins, later columns are dropped
        if self.first.as_deref().is_some_and(|first| first != name) {
            return None;
        }
        self.first = Some(name.to_string());
        Some(&mut self.value)
    }
}

impl Shaper for StringItem {
    fn extrude(&self) -> Box<dyn Translator> {
        Box::new(StringItem::default())
    }

    fn receive(&mut self, model: Box<dyn Translator>) -> DbResult<()> {
        let model = downcast::<StringItem, _>(model)?;
        self.value = model.value;
        Ok(())
    }
}

/// Collects the first column of every row as text; NULL becomes an empty string.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Strings(pub Vec<String>);

impl Strings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_inner(self) -> Vec<String> {
        self.0
    }
}

impl std::ops::Deref for Strings {
    type Target = Vec<String>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Collector for Strings {
    fn new_item(&mut self) -> Option<Box<dyn Shaper>> {
        Some(Box::new(StringItem::default()))
    }

    fn collect(&mut self, item: Box<dyn Shaper>) -> DbResult<()> {
        let item = downcast::<StringItem, _>(item)?;
        self.0.push(item.value.unwrap_or_default());
        Ok(())
    }
}

/// Shaper and model for a single integer taken from the first column.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct IntItem {
    value: Option<i64>,
    first: Option<String>,
}

impl Translator for IntItem {
    fn translate(&mut self, name: &str) -> Option<&mut dyn Slot> {
        if self.first.as_deref().is_some_and(|first| first != name) {
            return None;
        }
        self.first = Some(name.to_string());
        Some(&mut self.value)
    }
}

impl Shaper for IntItem {
    fn extrude(&self) -> Box<dyn Translator> {
        Box::new(IntItem::default())
    }

    fn receive(&mut self, model: Box<dyn Translator>) -> DbResult<()> {
        let model = downcast::<IntItem, _>(model)?;
        self.value = model.value;
        Ok(())
    }
}

/// Collects the first column of every row as an integer; NULL becomes zero.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Ints(pub Vec<i64>);

impl Ints {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_inner(self) -> Vec<i64> {
        self.0
    }
}

impl std::ops::Deref for Ints {
    type Target = Vec<i64>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Collector for Ints {
    fn new_item(&mut self) -> Option<Box<dyn Shaper>> {
        Some(Box::new(IntItem::default()))
    }

    fn collect(&mut self, item: Box<dyn Shaper>) -> DbResult<()> {
        let item = downcast::<IntItem, _>(item)?;
        self.0.push(item.value.unwrap_or_default());
        Ok(())
    }
}

/// Shaper and model holding every column of a row as text.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct RawItem {
    columns: HashMap<String, RawText>,
}

impl RawItem {
    /// Column values keyed by name; NULL columns are absent.
    pub fn into_map(self) -> HashMap<String, String> {
        self.columns
            .into_iter()
            .filter_map(|(name, text)| text.0.map(|t| (name, t)))
            .collect()
    }
}

/// Textual slot that keeps NULL distinguishable from the empty string.
#[derive(Debug, Default, Clone, PartialEq)]
struct RawText(Option<String>);

impl Slot for RawText {
    fn scan(&mut self, value: Value) -> Result<(), Mismatch> {
        self.0 = match value {
            Value::Null => None,
            // non-UTF-8 bytes stay readable as lossy text
            Value::Bytes(bytes) => Some(String::from_utf8_lossy(&bytes).into_owned()),
            other => other.to_text(),
        };
        Ok(())
    }

    fn value(&self) -> Value {
        self.0.clone().into()
    }
}

impl Translator for RawItem {
    fn translate(&mut self, name: &str) -> Option<&mut dyn Slot> {
        Some(self.columns.entry(name.to_string()).or_default())
    }
}

impl Shaper for RawItem {
    fn extrude(&self) -> Box<dyn Translator> {
        Box::new(RawItem::default())
    }

    fn receive(&mut self, model: Box<dyn Translator>) -> DbResult<()> {
        let model = downcast::<RawItem, _>(model)?;
        self.columns = model.columns;
        Ok(())
    }
}

/// Collects every row as a map from column name to text.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct RawList(pub Vec<HashMap<String, String>>);

impl RawList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_inner(self) -> Vec<HashMap<String, String>> {
        self.0
    }
}

impl std::ops::Deref for RawList {
    type Target = Vec<HashMap<String, String>>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Collector for RawList {
    fn new_item(&mut self) -> Option<Box<dyn Shaper>> {
        Some(Box::new(RawItem::default()))
    }

    fn collect(&mut self, item: Box<dyn Shaper>) -> DbResult<()> {
        let item = downcast::<RawItem, _>(item)?;
        self.0.push(item.into_map());
        Ok(())
    }
}
