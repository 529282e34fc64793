//! Cached model parameters, refreshed once per pump tick.

use std::sync::{PoisonError, RwLock};

use serde_json::{json, Value};

use crate::host::ModelParameter;

/// Read cache of the design's model parameters.
#[derive(Debug, Default)]
pub struct ParameterSnapshot {
    inner: RwLock<Vec<ModelParameter>>,
}

impl ParameterSnapshot {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn replace(&self, parameters: Vec<ModelParameter>) {
        *self.inner.write().unwrap_or_else(PoisonError::into_inner) = parameters;
    }

    #[must_use]
    pub fn count(&self) -> usize {
        self.inner.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Body of `GET /count_parameters`.
    #[must_use]
    pub fn count_json(&self) -> Value {
        json!({ "user_parameter_count": self.count() })
    }

    /// Body of `GET /list_parameters`.
    #[must_use]
    pub fn list_json(&self) -> Value {
        let params = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        let entries: Vec<Value> = params
            .iter()
            .map(|p| {
                json!({
                    "Name": p.name,
                    "Wert": format!("{:?}", p.value),
                    "Einheit": p.unit,
                    "Expression": p.expression,
                })
            })
            .collect();
        json!({ "ModelParameter": entries })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_uses_wire_keys() {
        let snapshot = ParameterSnapshot::new();
        snapshot.replace(vec![ModelParameter {
            name: "d1".into(),
            value: 5.0,
            unit: "cm".into(),
            expression: "5 cm".into(),
        }]);
        assert_eq!(snapshot.count_json(), json!({"user_parameter_count": 1}));
        assert_eq!(
            snapshot.list_json(),
            json!({"ModelParameter": [
                {"Name": "d1", "Wert": "5.0", "Einheit": "cm", "Expression": "5 cm"}
            ]})
        );
    }
}
