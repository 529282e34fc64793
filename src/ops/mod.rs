//! Operation catalogue shared by the receiver and the gateway.

pub mod catalog;
pub mod fields;

pub use catalog::{all, by_name, by_path, by_tool, Operation, OperationKind};
pub use fields::{Fallback, FieldError, FieldKind, FieldSpec};
