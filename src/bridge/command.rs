//! Queued commands and their positional arguments.

use std::fmt;

use serde_json::Value;
use uuid::Uuid;

use crate::host::{HostError, HostResult, Plane, Vec3};
use crate::ops::FieldSpec;

/// A request to run one operation on the host thread.
///
/// Commands are created by the receiver, consumed exactly once by the pump
/// and never retried.
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    /// Correlation id echoed to the POST caller.
    pub id: Uuid,
    /// Operation name; selects the handler by exact match.
    pub operation: String,
    /// Positional arguments in catalogue field order.
    pub args: Args,
}

impl Command {
    /// Creates a command with a fresh id.
    pub fn new(operation: impl Into<String>, args: impl Into<Args>) -> Self {
        Self {
            id: Uuid::new_v4(),
            operation: operation.into(),
            args: args.into(),
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}", self.operation)?;
        for value in &self.args.values {
            write!(f, ", {value}")?;
        }
        f.write_str(")")
    }
}

/// Positional command arguments with typed accessors.
///
/// Accessors fail with [`HostError::InvalidArgument`], which the pump turns
/// into a failed result like any other host error.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Args {
    values: Vec<Value>,
    names: Vec<&'static str>,
}

impl From<Vec<Value>> for Args {
    fn from(values: Vec<Value>) -> Self {
        Self {
            values,
            names: Vec::new(),
        }
    }
}

impl Args {
    /// Arguments labelled with their catalogue field names.
    #[must_use]
    pub fn named(fields: &[FieldSpec], values: Vec<Value>) -> Self {
        Self {
            values,
            names: fields.iter().map(|f| f.name).collect(),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    #[must_use]
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    fn name(&self, index: usize) -> String {
        self.names
            .get(index)
            .map_or_else(|| format!("argument {index}"), |n| (*n).to_string())
    }

    fn wrong(&self, index: usize, expected: &str) -> HostError {
        let got = self
            .values
            .get(index)
            .map_or_else(|| "nothing".to_string(), ToString::to_string);
        HostError::invalid(self.name(index), format!("expected {expected}, got {got}"))
    }

    fn value(&self, index: usize) -> Option<&Value> {
        self.values.get(index).filter(|v| !v.is_null())
    }

    pub fn number(&self, index: usize) -> HostResult<f64> {
        self.value(index)
            .and_then(Value::as_f64)
            .ok_or_else(|| self.wrong(index, "a number"))
    }

    pub fn opt_number(&self, index: usize) -> HostResult<Option<f64>> {
        match self.value(index) {
            None => Ok(None),
            Some(_) => self.number(index).map(Some),
        }
    }

    pub fn integer(&self, index: usize) -> HostResult<i64> {
        self.value(index)
            .and_then(Value::as_i64)
            .ok_or_else(|| self.wrong(index, "an integer"))
    }

    pub fn opt_integer(&self, index: usize) -> HostResult<Option<i64>> {
        match self.value(index) {
            None => Ok(None),
            Some(_) => self.integer(index).map(Some),
        }
    }

    /// A non-negative integer used as an index or count.
    pub fn index(&self, index: usize) -> HostResult<usize> {
        let n = self.integer(index)?;
        usize::try_from(n).map_err(|_| {
            HostError::invalid(self.name(index), format!("must not be negative, got {n}"))
        })
    }

    pub fn boolean(&self, index: usize) -> HostResult<bool> {
        self.value(index)
            .and_then(Value::as_bool)
            .ok_or_else(|| self.wrong(index, "a boolean"))
    }

    pub fn text(&self, index: usize) -> HostResult<&str> {
        self.value(index)
            .and_then(Value::as_str)
            .ok_or_else(|| self.wrong(index, "a string"))
    }

    pub fn point(&self, index: usize) -> HostResult<Vec3> {
        self.value(index)
            .and_then(as_point)
            .ok_or_else(|| self.wrong(index, "a point [x, y, z]"))
    }

    pub fn points(&self, index: usize) -> HostResult<Vec<Vec3>> {
        self.value(index)
            .and_then(Value::as_array)
            .and_then(|items| items.iter().map(as_point).collect())
            .ok_or_else(|| self.wrong(index, "a list of points"))
    }

    /// An origin plane; `null` means XY.
    pub fn plane(&self, index: usize) -> HostResult<Plane> {
        match self.value(index) {
            None => Ok(Plane::Xy),
            Some(_) => self
                .text(index)?
                .parse()
                .map_err(|e: String| HostError::invalid(self.name(index), e)),
        }
    }

    /// Parses a text argument with `FromStr`.
    pub fn parse<T>(&self, index: usize) -> HostResult<T>
    where
        T: std::str::FromStr<Err = String>,
    {
        self.text(index)?
            .parse()
            .map_err(|e| HostError::invalid(self.name(index), e))
    }
}

fn as_point(value: &Value) -> Option<Vec3> {
    let items = value.as_array()?;
    if !(2..=3).contains(&items.len()) {
        return None;
    }
    let mut p = [0.0; 3];
    for (slot, item) in p.iter_mut().zip(items) {
        *slot = item.as_f64()?;
    }
    Some(p)
}
