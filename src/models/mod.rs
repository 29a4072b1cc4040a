//! Data models: values, the row-mapping protocol and stock collectors.

pub mod collectors;
pub mod connection;
pub mod mapping;
pub mod value;

// Re-export commonly used types
pub use collectors::{IntItem, Ints, RawItem, RawList, StringItem, Strings};
pub use connection::{DatabaseType, masked_connection_string};
pub use mapping::{AsAny, Collector, Mismatch, Shaper, Slot, Translator, downcast};
pub use value::Value;
